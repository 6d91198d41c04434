//! Activation context handed to every bridge.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use uuid::Uuid;

/// State of the running host, passed to `Bridge::on_load`.
#[derive(Debug, Clone, Serialize)]
pub struct HostContext {
    /// Unique id of this host session
    pub session_id: Uuid,
    /// When the session started
    pub started_at: DateTime<Utc>,
    /// Host installation directory
    pub host_root: PathBuf,
    /// Game identifier
    pub game: String,
}

impl HostContext {
    /// Create a context for a session starting now.
    pub fn new(host_root: impl Into<PathBuf>, game: impl Into<String>) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            started_at: Utc::now(),
            host_root: host_root.into(),
            game: game.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sessions_are_unique() {
        let a = HostContext::new("/games/cs2", "CitiesSkylines2");
        let b = HostContext::new("/games/cs2", "CitiesSkylines2");
        assert_ne!(a.session_id, b.session_id);
        assert_eq!(a.host_root, PathBuf::from("/games/cs2"));
        assert!(a.started_at <= Utc::now());
    }
}
