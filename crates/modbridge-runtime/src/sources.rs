//! Source directory discovery.
//!
//! Add-on modules are scanned from the following locations (in order):
//!
//! 1. The host's well-known plugin directory
//! 2. The active profile of each configured mod manager
//!
//! Every qualifying directory is scanned; later sources never hide modules
//! found in earlier ones.

use crate::error::{RuntimeError, RuntimeResult};
use crate::profile::{fallback_profiles_root, resolve_active_profile};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fmt;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, error, info};
use walkdir::{DirEntry, WalkDir};

/// Nested plugin path used by the host and by mod manager profiles.
pub const DEFAULT_PLUGIN_SUBPATH: &str = "BepInEx/plugins";

/// Environment variable holding the loader's invocation path.
pub const DOORSTOP_INVOKE_VAR: &str = "DOORSTOP_INVOKE_DLL_PATH";

/// Where a source directory came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// The host's own plugin directory.
    WellKnown,
    /// A mod manager's active profile.
    Manager(String),
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::WellKnown => write!(f, "well-known"),
            SourceKind::Manager(name) => write!(f, "{}", name),
        }
    }
}

/// A directory that may contain module files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDirectory {
    /// Path to the directory.
    pub path: PathBuf,

    /// Where the directory came from.
    pub kind: SourceKind,
}

/// Fallback used when a manager's profiles root is missing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvFallback {
    /// Environment variable holding a module-invocation file path.
    pub variable: String,

    /// Levels to walk up from the file's directory to the profiles root.
    pub parent_steps: usize,
}

/// Directory convention of one mod manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagerLayout {
    /// Manager name, used in logs.
    pub name: String,

    /// Directory holding one sub-directory per profile.
    pub profiles_root: PathBuf,

    /// Plugin path nested inside each profile.
    pub nested_path: PathBuf,

    /// Fallback when `profiles_root` does not exist.
    #[serde(default)]
    pub fallback: Option<EnvFallback>,
}

/// All locations to scan for one host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLayout {
    /// The host's own plugin directory.
    pub well_known: PathBuf,

    /// Mod manager conventions, in scan order.
    #[serde(default)]
    pub managers: Vec<ManagerLayout>,
}

/// Get the user configuration directory mod managers store profiles in.
pub fn manager_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|dirs| dirs.config_dir().to_path_buf())
}

impl ManagerLayout {
    /// Thunderstore Mod Manager layout for a game.
    pub fn thunderstore(config_dir: &Path, game: &str) -> Self {
        Self {
            name: "thunderstore".to_string(),
            profiles_root: config_dir
                .join("Thunderstore Mod Manager")
                .join("DataFolder")
                .join(game)
                .join("profiles"),
            nested_path: PathBuf::from(DEFAULT_PLUGIN_SUBPATH),
            fallback: None,
        }
    }

    /// r2modman layout for a game, falling back to the loader's location.
    pub fn r2modman(config_dir: &Path, game: &str) -> Self {
        Self {
            name: "r2modman".to_string(),
            profiles_root: config_dir
                .join("r2modmanPlus-local")
                .join(game)
                .join("profiles"),
            nested_path: PathBuf::from(DEFAULT_PLUGIN_SUBPATH),
            fallback: Some(EnvFallback {
                variable: DOORSTOP_INVOKE_VAR.to_string(),
                parent_steps: 3,
            }),
        }
    }

    /// Resolve this manager's active plugin directory.
    ///
    /// `env` looks up environment variables, so callers and tests can
    /// control the fallback.
    pub fn resolve_with<F>(&self, env: F) -> RuntimeResult<Option<PathBuf>>
    where
        F: Fn(&str) -> Option<OsString>,
    {
        self.check_nested_path()?;

        if self.profiles_root.is_dir() {
            return resolve_active_profile(&self.profiles_root, &self.nested_path);
        }

        let Some(fallback) = &self.fallback else {
            debug!(
                "{}: profiles root {:?} not found",
                self.name, self.profiles_root
            );
            return Ok(None);
        };

        let invoke_path = match env(fallback.variable.as_str()) {
            Some(value) if !value.is_empty() => PathBuf::from(value),
            _ => {
                debug!(
                    "{}: profiles root not found and {} is not set",
                    self.name, fallback.variable
                );
                return Ok(None);
            }
        };

        let root = fallback_profiles_root(&invoke_path, fallback.parent_steps)?;
        debug!("{}: using fallback profiles root {:?}", self.name, root);
        resolve_active_profile(&root, &self.nested_path)
    }

    /// Resolve this manager's source directory.
    ///
    /// Recoverable failures are logged and yield `None`; any other error is
    /// returned.
    pub fn source_with<F>(&self, env: F) -> RuntimeResult<Option<SourceDirectory>>
    where
        F: Fn(&str) -> Option<OsString>,
    {
        match self.resolve_with(env) {
            Ok(Some(path)) => {
                info!("Active {} profile: {:?}", self.name, path);
                Ok(Some(SourceDirectory {
                    path,
                    kind: SourceKind::Manager(self.name.clone()),
                }))
            }
            Ok(None) => Ok(None),
            Err(e) if e.is_recoverable() => {
                error!("Failed to resolve {} profile: {}", self.name, e);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// The nested path must stay inside each profile directory.
    fn check_nested_path(&self) -> RuntimeResult<()> {
        let escapes = self
            .nested_path
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(RuntimeError::InvalidPath(format!(
                "{}: nested path {:?} must be relative to the profile",
                self.name, self.nested_path
            )));
        }
        Ok(())
    }
}

impl SourceLayout {
    /// Default layout for a host installed at `host_root`.
    pub fn for_host(host_root: &Path, game: &str) -> Self {
        let managers = match manager_config_dir() {
            Some(config_dir) => vec![
                ManagerLayout::thunderstore(&config_dir, game),
                ManagerLayout::r2modman(&config_dir, game),
            ],
            None => Vec::new(),
        };

        Self {
            well_known: host_root.join(DEFAULT_PLUGIN_SUBPATH),
            managers,
        }
    }

    /// The well-known directory, if it exists.
    pub fn well_known_source(&self) -> Option<SourceDirectory> {
        if !self.well_known.is_dir() {
            debug!("Well-known plugin directory {:?} not found", self.well_known);
            return None;
        }

        Some(SourceDirectory {
            path: self.well_known.clone(),
            kind: SourceKind::WellKnown,
        })
    }

    /// Build the ordered source set using the process environment.
    pub fn build(&self) -> RuntimeResult<Vec<SourceDirectory>> {
        self.build_with(|name| std::env::var_os(name))
    }

    /// Build the ordered source set with a custom environment lookup.
    ///
    /// A manager whose resolution fails with a recoverable error is logged
    /// and skipped. Any other error is returned.
    pub fn build_with<F>(&self, env: F) -> RuntimeResult<Vec<SourceDirectory>>
    where
        F: Fn(&str) -> Option<OsString>,
    {
        let mut sources: Vec<SourceDirectory> = self.well_known_source().into_iter().collect();

        for manager in &self.managers {
            if let Some(source) = manager.source_with(&env)? {
                sources.push(source);
            }
        }

        Ok(sources)
    }
}

/// Files beneath `dir`, following symbolic links.
///
/// Links whose target is missing are skipped. Any other walk failure,
/// including a link loop, is returned.
pub(crate) fn walk_files(dir: &Path) -> RuntimeResult<Vec<DirEntry>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(dir).follow_links(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() > 0 && is_not_found(&e) => {
                debug!("Skipping dangling link {:?}", e.path());
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        if entry.file_type().is_file() {
            files.push(entry);
        }
    }

    Ok(files)
}

fn is_not_found(e: &walkdir::Error) -> bool {
    e.io_error().map(|io| io.kind()) == Some(ErrorKind::NotFound)
}

/// List module files with `extension` beneath `dir`, sorted by path.
pub fn module_files(dir: &Path, extension: &str) -> RuntimeResult<Vec<PathBuf>> {
    if !dir.exists() {
        return Err(RuntimeError::Io(std::io::Error::new(
            ErrorKind::NotFound,
            format!("source directory {:?} not found", dir),
        )));
    }

    let mut files: Vec<PathBuf> = walk_files(dir)?
        .into_iter()
        .filter(|entry| {
            entry
                .path()
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
        })
        .map(|entry| entry.into_path())
        .collect();

    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn no_env(_: &str) -> Option<OsString> {
        None
    }

    fn manager(name: &str, root: &Path) -> ManagerLayout {
        ManagerLayout {
            name: name.to_string(),
            profiles_root: root.to_path_buf(),
            nested_path: PathBuf::from(DEFAULT_PLUGIN_SUBPATH),
            fallback: None,
        }
    }

    fn add_profile(root: &Path, profile: &str) -> PathBuf {
        let plugins = root.join(profile).join(DEFAULT_PLUGIN_SUBPATH);
        std::fs::create_dir_all(&plugins).unwrap();
        std::fs::write(plugins.join("mod.bmod"), b"x").unwrap();
        plugins
    }

    #[test]
    fn test_well_known_first() {
        let temp_dir = TempDir::new().unwrap();
        let well_known = temp_dir.path().join("host/BepInEx/plugins");
        std::fs::create_dir_all(&well_known).unwrap();
        let ts_root = temp_dir.path().join("ts");
        let active = add_profile(&ts_root, "Default");

        let layout = SourceLayout {
            well_known: well_known.clone(),
            managers: vec![manager("thunderstore", &ts_root)],
        };

        let sources = layout.build_with(no_env).unwrap();
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].path, well_known);
        assert_eq!(sources[0].kind, SourceKind::WellKnown);
        assert_eq!(sources[1].path, active);
        assert_eq!(sources[1].kind, SourceKind::Manager("thunderstore".to_string()));
    }

    #[test]
    fn test_missing_well_known_is_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let layout = SourceLayout {
            well_known: temp_dir.path().join("missing"),
            managers: vec![],
        };
        assert!(layout.build_with(no_env).unwrap().is_empty());
    }

    #[test]
    fn test_fallback_from_environment() {
        let temp_dir = TempDir::new().unwrap();
        let profiles = temp_dir.path().join("profiles");
        let active = add_profile(&profiles, "Default");
        let invoke = profiles.join("Default/BepInEx/core/loader.dll");

        let mut layout = manager("r2modman", &temp_dir.path().join("absent"));
        layout.fallback = Some(EnvFallback {
            variable: DOORSTOP_INVOKE_VAR.to_string(),
            parent_steps: 3,
        });

        let resolved = layout
            .resolve_with(|name| {
                assert_eq!(name, DOORSTOP_INVOKE_VAR);
                Some(invoke.clone().into_os_string())
            })
            .unwrap();
        assert_eq!(resolved, Some(active));
    }

    #[test]
    fn test_fallback_without_variable() {
        let temp_dir = TempDir::new().unwrap();
        let mut layout = manager("r2modman", &temp_dir.path().join("absent"));
        layout.fallback = Some(EnvFallback {
            variable: DOORSTOP_INVOKE_VAR.to_string(),
            parent_steps: 3,
        });

        assert!(layout.resolve_with(no_env).unwrap().is_none());
        assert!(layout
            .resolve_with(|_| Some(OsString::new()))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_shallow_fallback_yields_no_source() {
        let temp_dir = TempDir::new().unwrap();
        let mut r2 = manager("r2modman", &temp_dir.path().join("absent"));
        r2.fallback = Some(EnvFallback {
            variable: DOORSTOP_INVOKE_VAR.to_string(),
            parent_steps: 3,
        });

        let layout = SourceLayout {
            well_known: temp_dir.path().join("missing"),
            managers: vec![r2],
        };

        let sources = layout
            .build_with(|_| Some(OsString::from("/loader.dll")))
            .unwrap();
        assert!(sources.is_empty());
    }

    #[test]
    fn test_escaping_nested_path_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let ts_root = temp_dir.path().join("ts");
        add_profile(&ts_root, "Default");

        for nested in ["/etc/plugins", "../outside"] {
            let mut layout = manager("thunderstore", &ts_root);
            layout.nested_path = PathBuf::from(nested);

            let err = layout.resolve_with(no_env).unwrap_err();
            assert!(matches!(err, RuntimeError::InvalidPath(_)));
            assert!(!err.is_recoverable());
        }
    }

    #[test]
    fn test_unrecoverable_manager_error_propagates() {
        let temp_dir = TempDir::new().unwrap();
        let mut bad = manager("bad", &temp_dir.path().join("bad"));
        bad.nested_path = PathBuf::from("../plugins");

        let layout = SourceLayout {
            well_known: temp_dir.path().join("missing"),
            managers: vec![bad],
        };

        let err = layout.build_with(no_env).unwrap_err();
        assert!(matches!(err, RuntimeError::InvalidPath(_)));
    }

    #[test]
    fn test_module_files_recursive_and_filtered() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path();
        std::fs::create_dir_all(dir.join("a/b")).unwrap();
        std::fs::write(dir.join("top.bmod"), b"x").unwrap();
        std::fs::write(dir.join("a/b/deep.BMOD"), b"x").unwrap();
        std::fs::write(dir.join("a/notes.txt"), b"x").unwrap();
        std::fs::create_dir_all(dir.join("dir.bmod")).unwrap();

        let files = module_files(dir, "bmod").unwrap();
        assert_eq!(files, vec![dir.join("a/b/deep.BMOD"), dir.join("top.bmod")]);
    }

    #[test]
    fn test_module_files_missing_dir_is_recoverable() {
        let temp_dir = TempDir::new().unwrap();
        let err = module_files(&temp_dir.path().join("gone"), "bmod").unwrap_err();
        assert!(err.is_recoverable());
    }

    #[cfg(unix)]
    #[test]
    fn test_module_files_follows_links() {
        use std::os::unix::fs::symlink;

        let temp_dir = TempDir::new().unwrap();
        let store = temp_dir.path().join("store");
        let plugins = temp_dir.path().join("plugins");
        std::fs::create_dir_all(store.join("pack")).unwrap();
        std::fs::create_dir_all(&plugins).unwrap();
        std::fs::write(store.join("A.bmod"), b"x").unwrap();
        std::fs::write(store.join("pack/B.bmod"), b"x").unwrap();

        symlink(store.join("A.bmod"), plugins.join("A.bmod")).unwrap();
        symlink(store.join("pack"), plugins.join("pack")).unwrap();
        symlink(store.join("gone.bmod"), plugins.join("Dangling.bmod")).unwrap();

        let files = module_files(&plugins, "bmod").unwrap();
        assert_eq!(files, vec![plugins.join("A.bmod"), plugins.join("pack/B.bmod")]);
    }

    #[cfg(unix)]
    #[test]
    fn test_module_files_link_loop_is_recoverable() {
        let temp_dir = TempDir::new().unwrap();
        let plugins = temp_dir.path().join("plugins");
        std::fs::create_dir_all(&plugins).unwrap();
        std::fs::write(plugins.join("A.bmod"), b"x").unwrap();
        std::os::unix::fs::symlink(&plugins, plugins.join("loop")).unwrap();

        let err = module_files(&plugins, "bmod").unwrap_err();
        assert!(matches!(err, RuntimeError::Walk(_)));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_source_kind_display() {
        assert_eq!(SourceKind::WellKnown.to_string(), "well-known");
        assert_eq!(SourceKind::Manager("r2modman".into()).to_string(), "r2modman");
    }
}
