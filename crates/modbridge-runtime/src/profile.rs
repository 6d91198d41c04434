//! Active profile resolution for third-party mod managers.
//!
//! Mod managers keep one directory per profile under a common root:
//!
//! ```text
//! <profiles root>/
//!   Default/BepInEx/plugins/...
//!   Modded/BepInEx/plugins/...
//! ```
//!
//! The active profile is the one whose nested plugin directory holds the
//! most recently modified file. Candidates are evaluated in path order and
//! only a strictly newer timestamp replaces the current best, so ties go to
//! the lexicographically smallest profile.

use crate::error::RuntimeResult;
use crate::sources::walk_files;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::debug;

/// A profile directory that contains the nested plugin path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileCandidate {
    /// The profile directory itself.
    pub profile: PathBuf,

    /// The nested plugin directory inside the profile.
    pub plugin_path: PathBuf,

    /// Most recent modification time of any file under `plugin_path`.
    pub last_modified: DateTime<Utc>,
}

/// Most recent modification time of any file beneath `dir`, following links.
///
/// Returns `None` when the directory holds no files.
pub fn most_recent_modified(dir: &Path) -> RuntimeResult<Option<SystemTime>> {
    let mut latest: Option<SystemTime> = None;

    for entry in walk_files(dir)? {
        let modified = entry.metadata()?.modified()?;
        if latest.map_or(true, |current| modified > current) {
            latest = Some(modified);
        }
    }

    Ok(latest)
}

/// List the profiles under `root` that contain `nested`.
///
/// Candidates come back sorted by profile path. A missing root yields an
/// empty list.
pub fn profile_candidates(root: &Path, nested: &Path) -> RuntimeResult<Vec<ProfileCandidate>> {
    if !root.is_dir() {
        return Ok(Vec::new());
    }

    let mut profiles: Vec<PathBuf> = std::fs::read_dir(root)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();
    profiles.sort();

    let mut candidates = Vec::new();
    for profile in profiles {
        let plugin_path = profile.join(nested);
        if !plugin_path.is_dir() {
            debug!("Skipping profile {:?}: no {:?}", profile, nested);
            continue;
        }

        match most_recent_modified(&plugin_path)? {
            Some(modified) => candidates.push(ProfileCandidate {
                profile,
                plugin_path,
                last_modified: DateTime::<Utc>::from(modified),
            }),
            None => debug!("Skipping profile {:?}: plugin directory is empty", profile),
        }
    }

    Ok(candidates)
}

/// Pick the most recently modified candidate.
pub fn select_active(candidates: Vec<ProfileCandidate>) -> Option<ProfileCandidate> {
    let mut best: Option<ProfileCandidate> = None;

    for candidate in candidates {
        let newer = best
            .as_ref()
            .map_or(true, |current| candidate.last_modified > current.last_modified);
        if newer {
            best = Some(candidate);
        }
    }

    best
}

/// Resolve the active profile's plugin directory under `root`.
pub fn resolve_active_profile(root: &Path, nested: &Path) -> RuntimeResult<Option<PathBuf>> {
    let candidates = profile_candidates(root, nested)?;
    let active = select_active(candidates);

    if let Some(ref candidate) = active {
        debug!(
            "Active profile under {:?}: {:?} (modified {})",
            root, candidate.profile, candidate.last_modified
        );
    }

    Ok(active.map(|candidate| candidate.plugin_path))
}

/// Derive a profiles root from a module-invocation file path.
///
/// Takes the file's parent directory and walks up `parent_steps` more
/// levels. For `<root>/<profile>/BepInEx/core/loader.dll` with three steps
/// this yields `<root>`. Relative paths are resolved against the current
/// directory, and walking stops at the filesystem root.
pub fn fallback_profiles_root(invoke_path: &Path, parent_steps: usize) -> RuntimeResult<PathBuf> {
    let absolute = if invoke_path.is_absolute() {
        invoke_path.to_path_buf()
    } else {
        std::env::current_dir()?.join(invoke_path)
    };

    let mut current = absolute.parent().unwrap_or(absolute.as_path());
    for _ in 0..parent_steps {
        match current.parent() {
            Some(parent) => current = parent,
            None => {
                debug!("Fallback for {:?} stopped at {:?}", invoke_path, current);
                break;
            }
        }
    }

    Ok(current.to_path_buf())
}
