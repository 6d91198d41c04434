//! Bridges built into the host.
//!
//! A module can list one of these type names in its metadata to get a bridge
//! without shipping one of its own. [`TraceBridge`] logs each lifecycle call,
//! which is useful when checking that a module is picked up at all.

use crate::context::HostContext;
use chrono::{DateTime, Utc};
use modbridge_api::{Bridge, BridgeCatalog};
use modbridge_runtime::RuntimeResult;
use tracing::info;

/// Type name modules use to request the trace bridge.
pub const TRACE_BRIDGE: &str = "modbridge.host.TraceBridge";

/// Logs activation and teardown.
#[derive(Debug, Default)]
pub struct TraceBridge {
    loaded_at: Option<DateTime<Utc>>,
}

impl TraceBridge {
    /// When `on_load` last ran.
    pub fn loaded_at(&self) -> Option<DateTime<Utc>> {
        self.loaded_at
    }
}

impl Bridge<HostContext> for TraceBridge {
    fn on_load(&mut self, context: &HostContext) -> RuntimeResult<()> {
        let now = Utc::now();
        info!(
            "Trace bridge loaded for {} (session {}, {}ms after start)",
            context.game,
            context.session_id,
            (now - context.started_at).num_milliseconds()
        );
        self.loaded_at = Some(now);
        Ok(())
    }

    fn on_dispose(&mut self) -> RuntimeResult<()> {
        match self.loaded_at {
            Some(at) => info!("Trace bridge disposed (loaded at {})", at),
            None => info!("Trace bridge disposed before it was loaded"),
        }
        Ok(())
    }
}

/// Catalog with every built-in bridge registered.
pub fn builtin_catalog() -> BridgeCatalog<HostContext> {
    let mut catalog = BridgeCatalog::new();
    catalog.register_default::<TraceBridge>(TRACE_BRIDGE);
    catalog
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog() {
        let catalog = builtin_catalog();
        assert!(catalog.contains(TRACE_BRIDGE));
        assert_eq!(catalog.type_names(), vec![TRACE_BRIDGE]);
    }

    #[test]
    fn test_trace_bridge_lifecycle() {
        let context = HostContext::new("/games/cs2", "CitiesSkylines2");
        let mut bridge = TraceBridge::default();
        assert!(bridge.loaded_at().is_none());

        bridge.on_load(&context).unwrap();
        assert!(bridge.loaded_at().is_some());
        bridge.on_dispose().unwrap();
    }
}
