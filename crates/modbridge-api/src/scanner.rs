//! Source scanning.
//!
//! Walks every source directory, inspects each module file that the
//! registry has not seen yet, and records the bridges it yields.
//!
//! Failures are handled in two tiers:
//! - Per file: always caught and logged; the scan moves to the next file.
//! - Per source: caught only when recoverable (IO and walk failures);
//!   anything else is returned to the caller. Sources scanned before the
//!   error stay in the registry.

use crate::bridge::BridgeCatalog;
use crate::inspector::ModuleInspector;
use crate::registry::ModuleRegistry;
use modbridge_runtime::{
    module_files, BridgeContract, RuntimeError, RuntimeResult, SourceDirectory, SourceLayout,
    MODULE_EXTENSION,
};
use serde::Serialize;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

/// Counters for one scan invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanReport {
    /// Directories scanned, in order.
    pub sources: Vec<PathBuf>,

    /// Module files found across all sources.
    pub files_seen: usize,

    /// Files skipped because an earlier scan recorded them.
    pub files_known: usize,

    /// Files inspected successfully.
    pub files_inspected: usize,

    /// Files whose inspection failed.
    pub files_failed: usize,

    /// Bridges constructed.
    pub instances: usize,
}

/// Scans source directories for bridge modules.
#[derive(Debug, Clone)]
pub struct Scanner {
    layout: SourceLayout,
    extension: String,
    contract: BridgeContract,
}

impl Scanner {
    /// Create a scanner with the default extension and contract.
    pub fn new(layout: SourceLayout) -> Self {
        Self {
            layout,
            extension: MODULE_EXTENSION.to_string(),
            contract: BridgeContract::default(),
        }
    }

    /// Use a different module file extension.
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    /// Use a different bridge contract.
    pub fn with_contract(mut self, contract: BridgeContract) -> Self {
        self.contract = contract;
        self
    }

    /// The source layout.
    pub fn layout(&self) -> &SourceLayout {
        &self.layout
    }

    /// The bridge contract.
    pub fn contract(&self) -> &BridgeContract {
        &self.contract
    }

    /// The module file extension.
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Scan every source using the process environment.
    pub fn scan<C: 'static>(
        &self,
        catalog: &BridgeCatalog<C>,
        registry: &mut ModuleRegistry<C>,
    ) -> RuntimeResult<ScanReport> {
        self.scan_with(catalog, registry, |name| std::env::var_os(name))
    }

    /// Scan every source with a custom environment lookup.
    pub fn scan_with<C: 'static, F>(
        &self,
        catalog: &BridgeCatalog<C>,
        registry: &mut ModuleRegistry<C>,
        env: F,
    ) -> RuntimeResult<ScanReport>
    where
        F: Fn(&str) -> Option<OsString>,
    {
        let mut report = ScanReport::default();

        // Scan each source as soon as it is resolved.
        if let Some(source) = self.layout.well_known_source() {
            self.scan_logged(&source, catalog, registry, &mut report)?;
        }

        for manager in &self.layout.managers {
            if let Some(source) = manager.source_with(&env)? {
                self.scan_logged(&source, catalog, registry, &mut report)?;
            }
        }

        info!(
            "Scan complete: {} file(s) inspected, {} bridge(s) loaded",
            report.files_inspected, report.instances
        );
        Ok(report)
    }

    fn scan_logged<C: 'static>(
        &self,
        source: &SourceDirectory,
        catalog: &BridgeCatalog<C>,
        registry: &mut ModuleRegistry<C>,
        report: &mut ScanReport,
    ) -> RuntimeResult<()> {
        info!("Scanning {} folder {:?}...", source.kind, source.path);

        match self.scan_source(source, catalog, registry, report) {
            Ok(()) => report.sources.push(source.path.clone()),
            Err(e) if e.is_recoverable() => {
                error!("Failed to scan {:?}: {}", source.path, e);
            }
            Err(e) => return Err(e),
        }

        Ok(())
    }

    /// Inspect the module files of one source directory.
    pub fn scan_source<C: 'static>(
        &self,
        source: &SourceDirectory,
        catalog: &BridgeCatalog<C>,
        registry: &mut ModuleRegistry<C>,
        report: &mut ScanReport,
    ) -> RuntimeResult<()> {
        let files = module_files(&source.path, &self.extension)?;
        let inspector = ModuleInspector::new(&self.contract, catalog);

        for file in files {
            report.files_seen += 1;

            if registry.record_if_new(&file) {
                debug!("Already scanned {:?}", file);
                report.files_known += 1;
                continue;
            }

            match inspector.inspect(&file) {
                Ok(instances) => {
                    report.files_inspected += 1;
                    report.instances += instances.len();
                    registry.set_instances(&file, instances);
                }
                Err(e) => {
                    log_file_error(&file, &e);
                    report.files_failed += 1;
                    registry.set_instances(&file, Vec::new());
                }
            }
        }

        Ok(())
    }
}

fn log_file_error(file: &Path, e: &RuntimeError) {
    match e {
        RuntimeError::InvalidImage(msg) => {
            debug!("Invalid module image, skipping {:?}: {}", file, msg);
        }
        other => error!("Failed to inspect {:?}: {}", file, other),
    }
}
