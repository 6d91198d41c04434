//! Lifecycle dispatch to registered bridges.
//!
//! A failing bridge is logged and recorded in the [`DispatchReport`];
//! dispatch then moves on to the next instance.

use crate::registry::ModuleRegistry;
use serde::Serialize;
use std::path::PathBuf;
use tracing::{error, info};

/// A bridge that failed during dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchFailure {
    /// Module file the bridge came from.
    pub module: PathBuf,

    /// Fully-qualified type name.
    pub type_name: String,

    /// Error message.
    pub error: String,
}

/// Outcome of one dispatch pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    /// Bridges that handled the call.
    pub succeeded: usize,

    /// Bridges that returned an error.
    pub failures: Vec<DispatchFailure>,
}

impl DispatchReport {
    /// Total bridges the call was forwarded to.
    pub fn invoked(&self) -> usize {
        self.succeeded + self.failures.len()
    }

    /// Check if every bridge succeeded.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

fn module_label(path: &std::path::Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Call `on_load` on every bridge, in registry order.
pub fn activate_all<C>(registry: &mut ModuleRegistry<C>, context: &C) -> DispatchReport {
    let mut report = DispatchReport::default();

    for entry in registry.entries_mut() {
        let label = module_label(&entry.path);

        for instance in entry.instances.iter_mut() {
            match instance.load(context) {
                Ok(()) => {
                    info!("On load '{}' ({})", label, instance.type_name());
                    report.succeeded += 1;
                }
                Err(e) => {
                    error!(
                        "Bridge '{}' from '{}' failed to load: {}",
                        instance.type_name(),
                        label,
                        e
                    );
                    report.failures.push(DispatchFailure {
                        module: entry.path.clone(),
                        type_name: instance.type_name().to_string(),
                        error: e.to_string(),
                    });
                }
            }
        }
    }

    report
}

/// Call `on_dispose` on every bridge not yet disposed, in registry order.
pub fn deactivate_all<C>(registry: &mut ModuleRegistry<C>) -> DispatchReport {
    let mut report = DispatchReport::default();

    for entry in registry.entries_mut() {
        let label = module_label(&entry.path);

        for instance in entry.instances.iter_mut() {
            if instance.is_disposed() {
                continue;
            }

            match instance.dispose() {
                Ok(()) => {
                    info!("Unloaded bridge '{}' ({})", label, instance.type_name());
                    report.succeeded += 1;
                }
                Err(e) => {
                    error!(
                        "Bridge '{}' from '{}' failed to unload: {}",
                        instance.type_name(),
                        label,
                        e
                    );
                    report.failures.push(DispatchFailure {
                        module: entry.path.clone(),
                        type_name: instance.type_name().to_string(),
                        error: e.to_string(),
                    });
                }
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::{Bridge, BridgeInstance};
    use modbridge_runtime::{RuntimeError, RuntimeResult};
    use std::path::Path;
    use std::sync::{Arc, Mutex};

    type Log = Arc<Mutex<Vec<String>>>;

    struct Recorder {
        name: &'static str,
        fail_load: bool,
        log: Log,
    }

    impl Bridge<u32> for Recorder {
        fn on_load(&mut self, context: &u32) -> RuntimeResult<()> {
            self.log
                .lock()
                .unwrap()
                .push(format!("load {} {}", self.name, context));
            if self.fail_load {
                return Err(RuntimeError::lifecycle(self.name, "boom"));
            }
            Ok(())
        }

        fn on_dispose(&mut self) -> RuntimeResult<()> {
            self.log.lock().unwrap().push(format!("dispose {}", self.name));
            Ok(())
        }
    }

    fn registry(log: &Log, specs: &[(&str, &'static str, bool)]) -> ModuleRegistry<u32> {
        let mut registry = ModuleRegistry::new();
        for &(module, name, fail_load) in specs {
            let path = Path::new(module);
            let bridge = Recorder {
                name,
                fail_load,
                log: Arc::clone(log),
            };
            registry.record_if_new(path);
            registry.set_instances(path, vec![BridgeInstance::new(name, path, Box::new(bridge))]);
        }
        registry
    }

    #[test]
    fn test_activate_in_order_with_context() {
        let log = Log::default();
        let mut registry = registry(&log, &[("/a.bmod", "A", false), ("/b.bmod", "B", false)]);

        let report = activate_all(&mut registry, &7);
        assert_eq!(report.succeeded, 2);
        assert!(report.is_clean());
        assert_eq!(*log.lock().unwrap(), vec!["load A 7", "load B 7"]);
    }

    #[test]
    fn test_failure_does_not_stop_dispatch() {
        let log = Log::default();
        let mut registry = registry(&log, &[("/a.bmod", "A", true), ("/b.bmod", "B", false)]);

        let report = activate_all(&mut registry, &1);
        assert_eq!(report.invoked(), 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].type_name, "A");
        assert_eq!(report.failures[0].module, PathBuf::from("/a.bmod"));
        assert_eq!(*log.lock().unwrap(), vec!["load A 1", "load B 1"]);
    }

    #[test]
    fn test_deactivate_once() {
        let log = Log::default();
        let mut registry = registry(&log, &[("/a.bmod", "A", false)]);

        assert_eq!(deactivate_all(&mut registry).succeeded, 1);
        assert_eq!(deactivate_all(&mut registry).invoked(), 0);
        assert_eq!(*log.lock().unwrap(), vec!["dispose A"]);
    }

    #[test]
    fn test_empty_registry() {
        let mut registry: ModuleRegistry<u32> = ModuleRegistry::new();
        assert_eq!(activate_all(&mut registry, &0).invoked(), 0);
        assert_eq!(deactivate_all(&mut registry).invoked(), 0);
    }
}
