//! Module inspection.
//!
//! Reads a module image's metadata, filters its type table through the
//! bridge contract, and constructs the surviving types through the
//! catalog. Nothing from the module itself is executed.

use crate::bridge::{BridgeCatalog, BridgeInstance};
use modbridge_runtime::{BridgeContract, ModuleImage, ModuleMetadata, RuntimeResult, TypeRecord};
use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info};

/// A type that implements the bridge capability, as seen by a dry run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BridgeDescriptor {
    /// Fully-qualified type name.
    pub type_name: String,

    /// Whether the catalog has a factory for the type.
    pub resolvable: bool,

    /// Whether the type carries the opt-in tag.
    pub opted_in: bool,
}

impl BridgeDescriptor {
    /// Whether inspection would instantiate this type.
    pub fn would_load(&self) -> bool {
        self.resolvable && self.opted_in
    }
}

/// Types in `metadata` that implement the capability, deduplicated by name.
pub fn capability_types<'a>(
    metadata: &'a ModuleMetadata,
    contract: &BridgeContract,
) -> Vec<&'a TypeRecord> {
    let mut seen = HashSet::new();
    let mut found = Vec::new();

    for record in &metadata.types {
        if contract.is_candidate(record) && seen.insert(record.full_name.as_str()) {
            found.push(record);
        }
    }

    found
}

/// Inspects module files against a contract and a factory catalog.
pub struct ModuleInspector<'a, C> {
    contract: &'a BridgeContract,
    catalog: &'a BridgeCatalog<C>,
}

impl<'a, C: 'static> ModuleInspector<'a, C> {
    /// Create an inspector.
    pub fn new(contract: &'a BridgeContract, catalog: &'a BridgeCatalog<C>) -> Self {
        Self { contract, catalog }
    }

    /// Inspect one module file and construct its bridges.
    pub fn inspect(&self, path: &Path) -> RuntimeResult<Vec<BridgeInstance<C>>> {
        let metadata = ModuleImage::read_metadata(path)?;
        Ok(self.instantiate(path, &metadata))
    }

    /// Construct the bridges described by already-read metadata.
    pub fn instantiate(&self, path: &Path, metadata: &ModuleMetadata) -> Vec<BridgeInstance<C>> {
        let candidates = capability_types(metadata, self.contract);
        let mut instances = Vec::new();

        for record in candidates {
            let Some(factory) = self.catalog.resolve(&record.full_name) else {
                debug!(
                    "No factory registered for '{}' in {:?}",
                    record.full_name, path
                );
                continue;
            };

            if !self.contract.is_opted_in(&record.tags) {
                debug!(
                    "Skipping '{}' in {:?}: not tagged as a bridge",
                    record.full_name, path
                );
                continue;
            }

            let Some(bridge) = factory() else {
                continue;
            };

            info!(
                "Initialised bridge from third-party mod sources: '{}'",
                record.full_name
            );
            instances.push(BridgeInstance::new(record.full_name.clone(), path, bridge));
        }

        if instances.is_empty() {
            debug!("No bridges to load in {:?}", path);
        }

        instances
    }

    /// Describe capability types in a module without constructing anything.
    pub fn describe(&self, path: &Path) -> RuntimeResult<Vec<BridgeDescriptor>> {
        let metadata = ModuleImage::read_metadata(path)?;

        Ok(capability_types(&metadata, self.contract)
            .into_iter()
            .map(|record| BridgeDescriptor {
                type_name: record.full_name.clone(),
                resolvable: self.catalog.contains(&record.full_name),
                opted_in: self.contract.is_opted_in(&record.tags),
            })
            .collect())
    }
}
