//! Registry of inspected module files.
//!
//! Every module path is recorded before inspection starts, so a file is
//! inspected at most once per registry lifetime. An entry becomes visible
//! to [`ModuleRegistry::entries`] once its instances have been set.

use crate::bridge::BridgeInstance;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Bridges discovered in one module file.
pub struct ModuleEntry<C> {
    /// Module file path.
    pub path: PathBuf,

    /// Bridges found in the file, in discovery order.
    pub instances: Vec<BridgeInstance<C>>,

    complete: bool,
}

impl<C> ModuleEntry<C> {
    /// Whether inspection of this file has finished.
    pub fn is_complete(&self) -> bool {
        self.complete
    }
}

/// Process-lifetime map from module path to bridge instances.
pub struct ModuleRegistry<C> {
    entries: Vec<ModuleEntry<C>>,
    index: HashMap<PathBuf, usize>,
}

impl<C> ModuleRegistry<C> {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Record a module path.
    ///
    /// Returns `true` if the path was already present, in which case it
    /// must not be inspected again.
    pub fn record_if_new(&mut self, path: &Path) -> bool {
        if self.index.contains_key(path) {
            return true;
        }

        self.index.insert(path.to_path_buf(), self.entries.len());
        self.entries.push(ModuleEntry {
            path: path.to_path_buf(),
            instances: Vec::new(),
            complete: false,
        });
        false
    }

    /// Store the instances found in a module and mark it complete.
    ///
    /// Records the path first if it was never recorded.
    pub fn set_instances(&mut self, path: &Path, instances: Vec<BridgeInstance<C>>) {
        self.record_if_new(path);
        if let Some(&i) = self.index.get(path) {
            let entry = &mut self.entries[i];
            entry.instances = instances;
            entry.complete = true;
        }
    }

    /// Check if a path has been recorded.
    pub fn contains(&self, path: &Path) -> bool {
        self.index.contains_key(path)
    }

    /// Get a completed entry by path.
    pub fn get(&self, path: &Path) -> Option<&ModuleEntry<C>> {
        self.index
            .get(path)
            .map(|&i| &self.entries[i])
            .filter(|entry| entry.complete)
    }

    /// Completed entries in insertion order.
    pub fn entries(&self) -> impl Iterator<Item = &ModuleEntry<C>> {
        self.entries.iter().filter(|entry| entry.complete)
    }

    /// Completed entries in insertion order, mutably.
    pub fn entries_mut(&mut self) -> impl Iterator<Item = &mut ModuleEntry<C>> {
        self.entries.iter_mut().filter(|entry| entry.complete)
    }

    /// Get the number of recorded module paths.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if no path has been recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total bridges across completed entries.
    pub fn instance_count(&self) -> usize {
        self.entries().map(|entry| entry.instances.len()).sum()
    }
}

impl<C> Default for ModuleRegistry<C> {
    fn default() -> Self {
        Self::new()
    }
}
