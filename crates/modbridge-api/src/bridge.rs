//! The bridge trait and its factory catalog.
//!
//! Add-on types opt in to the bridge in two places: their module metadata
//! lists the `modbridge.Bridge` interface with a `description = "bridge"`
//! tag, and the host registers a factory for the type's fully-qualified
//! name. Discovery matches the two; nothing is constructed without both.

use modbridge_runtime::RuntimeResult;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Lifecycle contract implemented by every bridged add-on.
///
/// `C` is the host context forwarded on activation.
pub trait Bridge<C>: Send {
    /// Called once when the host reaches its add-on initialization point.
    fn on_load(&mut self, context: &C) -> RuntimeResult<()>;

    /// Called when the host shuts the bridge down.
    fn on_dispose(&mut self) -> RuntimeResult<()>;
}

/// Constructor registered for one bridge type.
///
/// Returning `None` means the type could not produce an instance.
pub type BridgeFactory<C> = Box<dyn Fn() -> Option<Box<dyn Bridge<C>>> + Send + Sync>;

/// Registered constructors, keyed by fully-qualified type name.
pub struct BridgeCatalog<C> {
    factories: HashMap<String, BridgeFactory<C>>,
}

impl<C: 'static> BridgeCatalog<C> {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register a factory for a type name, replacing any previous one.
    pub fn register<F>(&mut self, type_name: impl Into<String>, factory: F)
    where
        F: Fn() -> Option<Box<dyn Bridge<C>>> + Send + Sync + 'static,
    {
        self.factories.insert(type_name.into(), Box::new(factory));
    }

    /// Register a type constructed through `Default`.
    pub fn register_default<T>(&mut self, type_name: impl Into<String>)
    where
        T: Bridge<C> + Default + 'static,
    {
        self.register(type_name, || Some(Box::new(T::default()) as Box<dyn Bridge<C>>));
    }

    /// Look up the factory for a type name.
    pub fn resolve(&self, type_name: &str) -> Option<&BridgeFactory<C>> {
        self.factories.get(type_name)
    }

    /// Check if a type name has a factory.
    pub fn contains(&self, type_name: &str) -> bool {
        self.factories.contains_key(type_name)
    }

    /// Construct a bridge for a type name.
    pub fn construct(&self, type_name: &str) -> Option<Box<dyn Bridge<C>>> {
        self.resolve(type_name).and_then(|factory| factory())
    }

    /// Registered type names, sorted.
    pub fn type_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Get the number of registered factories.
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// Check if the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl<C: 'static> Default for BridgeCatalog<C> {
    fn default() -> Self {
        Self::new()
    }
}

/// A live bridge created from a module's metadata.
pub struct BridgeInstance<C> {
    type_name: String,
    module: PathBuf,
    bridge: Box<dyn Bridge<C>>,
    loaded: bool,
    disposed: bool,
}

impl<C> BridgeInstance<C> {
    /// Wrap a constructed bridge.
    pub fn new(
        type_name: impl Into<String>,
        module: impl Into<PathBuf>,
        bridge: Box<dyn Bridge<C>>,
    ) -> Self {
        Self {
            type_name: type_name.into(),
            module: module.into(),
            bridge,
            loaded: false,
            disposed: false,
        }
    }

    /// Fully-qualified type name.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Module file the type was found in.
    pub fn module(&self) -> &Path {
        &self.module
    }

    /// Whether `on_load` has completed successfully.
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Whether `on_dispose` has been called.
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Forward activation to the bridge.
    pub fn load(&mut self, context: &C) -> RuntimeResult<()> {
        self.bridge.on_load(context)?;
        self.loaded = true;
        Ok(())
    }

    /// Forward teardown to the bridge. Later calls are no-ops.
    pub fn dispose(&mut self) -> RuntimeResult<()> {
        if self.disposed {
            return Ok(());
        }
        self.disposed = true;
        self.bridge.on_dispose()
    }
}

impl<C> fmt::Debug for BridgeInstance<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BridgeInstance")
            .field("type_name", &self.type_name)
            .field("module", &self.module)
            .field("loaded", &self.loaded)
            .field("disposed", &self.disposed)
            .finish()
    }
}
