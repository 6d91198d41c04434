//! Host session.
//!
//! A [`BridgeHost`] owns everything one host session needs: the scanner,
//! the factory catalog, and the module registry. The host calls
//! [`BridgeHost::scan`] at startup, [`BridgeHost::activate`] when it reaches
//! its add-on initialization point, and [`BridgeHost::shutdown`] on exit.

use crate::bridge::BridgeCatalog;
use crate::dispatch::{activate_all, deactivate_all, DispatchReport};
use crate::registry::ModuleRegistry;
use crate::scanner::{ScanReport, Scanner};
use modbridge_runtime::RuntimeResult;
use std::ffi::OsString;
use tracing::info;

/// One host session's bridge state.
pub struct BridgeHost<C> {
    scanner: Scanner,
    catalog: BridgeCatalog<C>,
    registry: ModuleRegistry<C>,
    shut_down: bool,
}

impl<C: 'static> BridgeHost<C> {
    /// Create a session.
    pub fn new(scanner: Scanner, catalog: BridgeCatalog<C>) -> Self {
        Self {
            scanner,
            catalog,
            registry: ModuleRegistry::new(),
            shut_down: false,
        }
    }

    /// Scan all sources. Files recorded by an earlier scan are skipped.
    pub fn scan(&mut self) -> RuntimeResult<ScanReport> {
        self.scanner.scan(&self.catalog, &mut self.registry)
    }

    /// Scan with a custom environment lookup.
    pub fn scan_with<F>(&mut self, env: F) -> RuntimeResult<ScanReport>
    where
        F: Fn(&str) -> Option<OsString>,
    {
        self.scanner.scan_with(&self.catalog, &mut self.registry, env)
    }

    /// Forward activation to every discovered bridge.
    pub fn activate(&mut self, context: &C) -> DispatchReport {
        if self.registry.instance_count() == 0 {
            return DispatchReport::default();
        }
        activate_all(&mut self.registry, context)
    }

    /// Forward teardown to every discovered bridge. Runs once.
    pub fn shutdown(&mut self) -> DispatchReport {
        if self.shut_down {
            return DispatchReport::default();
        }
        self.shut_down = true;

        let report = deactivate_all(&mut self.registry);
        info!("Bridge host shut down ({} bridge(s) unloaded)", report.succeeded);
        report
    }

    /// Whether `shutdown` has run.
    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    /// The scanner.
    pub fn scanner(&self) -> &Scanner {
        &self.scanner
    }

    /// The factory catalog.
    pub fn catalog(&self) -> &BridgeCatalog<C> {
        &self.catalog
    }

    /// Mutable access to the factory catalog, for late registrations.
    pub fn catalog_mut(&mut self) -> &mut BridgeCatalog<C> {
        &mut self.catalog
    }

    /// The module registry.
    pub fn registry(&self) -> &ModuleRegistry<C> {
        &self.registry
    }
}
