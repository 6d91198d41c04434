//! Integration tests for modbridge-runtime.
//!
//! These tests cover:
//! - Module image reading from disk
//! - Active profile resolution across manager roots
//! - Source set construction
//! - Module file enumeration

use filetime::{set_file_mtime, FileTime};
use modbridge_runtime::{
    module_files, resolve_active_profile, BridgeContract, ManagerLayout, ModuleImage,
    ModuleMetadata, RuntimeError, SourceKind, SourceLayout, TypeRecord, BRIDGE_CAPABILITY,
    DEFAULT_PLUGIN_SUBPATH, DESCRIPTION_TAG, MODULE_EXTENSION,
};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

// ==============================================================================
// Test Fixture Helpers
// ==============================================================================

/// Write a module image with the given type records.
fn create_module(dir: &Path, filename: &str, types: Vec<TypeRecord>) -> PathBuf {
    std::fs::create_dir_all(dir).unwrap();

    let mut metadata = ModuleMetadata::new(filename.trim_end_matches(".bmod"));
    metadata.version = Some("1.0.0".to_string());
    metadata.types = types;

    let path = dir.join(filename);
    ModuleImage::write(&path, &metadata, b"\x7fopaque payload").unwrap();
    path
}

/// Create a profile with one module whose mtime is pinned.
fn create_profile(root: &Path, profile: &str, mtime: i64) -> PathBuf {
    let plugins = root.join(profile).join(DEFAULT_PLUGIN_SUBPATH);
    let module = create_module(&plugins, "addon.bmod", vec![]);
    set_file_mtime(&module, FileTime::from_unix_time(mtime, 0)).unwrap();
    plugins
}

fn manager(name: &str, root: &Path) -> ManagerLayout {
    ManagerLayout {
        name: name.to_string(),
        profiles_root: root.to_path_buf(),
        nested_path: PathBuf::from(DEFAULT_PLUGIN_SUBPATH),
        fallback: None,
    }
}

fn no_env(_: &str) -> Option<OsString> {
    None
}

// ==============================================================================
// Module Image Tests
// ==============================================================================

#[test]
fn test_read_metadata_from_disk() {
    let temp_dir = TempDir::new().unwrap();
    let path = create_module(
        temp_dir.path(),
        "Example.bmod",
        vec![
            TypeRecord::new("Example.Entry")
                .with_interface(BRIDGE_CAPABILITY)
                .with_tag(DESCRIPTION_TAG, "Bridge"),
            TypeRecord::new("Example.Helper"),
        ],
    );

    let metadata = ModuleImage::read_metadata(&path).unwrap();
    assert_eq!(metadata.name, "Example");
    assert_eq!(metadata.version.as_deref(), Some("1.0.0"));
    assert_eq!(metadata.types.len(), 2);

    let contract = BridgeContract::default();
    let accepted: Vec<&str> = metadata
        .types
        .iter()
        .filter(|t| contract.accepts(t))
        .map(|t| t.full_name.as_str())
        .collect();
    assert_eq!(accepted, vec!["Example.Entry"]);
}

#[test]
fn test_read_metadata_foreign_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("native.bmod");
    std::fs::write(&path, b"MZ\x90\x00this is a PE file, not a module image").unwrap();

    let err = ModuleImage::read_metadata(&path).unwrap_err();
    assert!(matches!(err, RuntimeError::InvalidImage(_)));
}

#[test]
fn test_read_metadata_empty_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("empty.bmod");
    std::fs::write(&path, b"").unwrap();

    let err = ModuleImage::read_metadata(&path).unwrap_err();
    assert!(matches!(err, RuntimeError::InvalidImage(_)));
}

#[test]
fn test_read_metadata_missing_file() {
    let temp_dir = TempDir::new().unwrap();
    let err = ModuleImage::read_metadata(&temp_dir.path().join("gone.bmod")).unwrap_err();
    assert!(matches!(err, RuntimeError::Io(_)));
}

// ==============================================================================
// Profile Resolution Tests
// ==============================================================================

#[test]
fn test_resolver_picks_maximum_of_many() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();

    let mut expected = None;
    for (i, mtime) in [3_000, 12_000, 7_000, 11_999, 1].iter().enumerate() {
        let plugins = create_profile(root, &format!("profile-{}", i), *mtime);
        if *mtime == 12_000 {
            expected = Some(plugins);
        }
    }

    let active = resolve_active_profile(root, Path::new(DEFAULT_PLUGIN_SUBPATH)).unwrap();
    assert_eq!(active, expected);
}

#[test]
fn test_resolver_nonexistent_root() {
    let active =
        resolve_active_profile(Path::new("/definitely/not/here"), Path::new("plugins")).unwrap();
    assert!(active.is_none());
}

// ==============================================================================
// Source Set Tests
// ==============================================================================

#[test]
fn test_only_manager_with_nested_path_is_included() {
    let temp_dir = TempDir::new().unwrap();

    let ts_root = temp_dir.path().join("thunderstore");
    let active = create_profile(&ts_root, "Default", 5_000);

    // Profiles exist, but none has the nested plugin path.
    let r2_root = temp_dir.path().join("r2modman");
    std::fs::create_dir_all(r2_root.join("Default/BepInEx/config")).unwrap();
    std::fs::create_dir_all(r2_root.join("Other")).unwrap();

    let layout = SourceLayout {
        well_known: temp_dir.path().join("host/missing"),
        managers: vec![manager("thunderstore", &ts_root), manager("r2modman", &r2_root)],
    };

    let sources = layout.build_with(no_env).unwrap();
    assert_eq!(sources.len(), 1);
    assert_eq!(sources[0].path, active);
    assert_eq!(sources[0].kind, SourceKind::Manager("thunderstore".to_string()));
}

#[test]
fn test_all_sources_in_order() {
    let temp_dir = TempDir::new().unwrap();
    let host = temp_dir.path().join("host");
    std::fs::create_dir_all(host.join(DEFAULT_PLUGIN_SUBPATH)).unwrap();

    let ts_root = temp_dir.path().join("ts");
    let r2_root = temp_dir.path().join("r2");
    create_profile(&ts_root, "A", 100);
    create_profile(&r2_root, "B", 200);

    let mut layout = SourceLayout::for_host(&host, "ExampleGame");
    layout.managers = vec![manager("ts", &ts_root), manager("r2", &r2_root)];

    let kinds: Vec<SourceKind> = layout
        .build_with(no_env)
        .unwrap()
        .into_iter()
        .map(|s| s.kind)
        .collect();
    assert_eq!(
        kinds,
        vec![
            SourceKind::WellKnown,
            SourceKind::Manager("ts".to_string()),
            SourceKind::Manager("r2".to_string()),
        ]
    );
}

#[test]
fn test_default_layout_paths() {
    let layout = SourceLayout::for_host(Path::new("/games/Example"), "ExampleGame");
    assert_eq!(
        layout.well_known,
        PathBuf::from("/games/Example").join(DEFAULT_PLUGIN_SUBPATH)
    );

    for manager in &layout.managers {
        assert!(manager.profiles_root.ends_with("ExampleGame/profiles"));
    }
    if let Some(r2) = layout.managers.iter().find(|m| m.name == "r2modman") {
        assert!(r2.fallback.is_some());
    }
}

// ==============================================================================
// Module Enumeration Tests
// ==============================================================================

#[test]
fn test_module_files_under_profile() {
    let temp_dir = TempDir::new().unwrap();
    let plugins = temp_dir.path().join("plugins");
    create_module(&plugins.join("AuthorA-Mod"), "ModA.bmod", vec![]);
    create_module(&plugins.join("AuthorB-Mod/lib"), "ModB.bmod", vec![]);
    std::fs::write(plugins.join("AuthorA-Mod/manifest.json"), b"{}").unwrap();

    let files = module_files(&plugins, MODULE_EXTENSION).unwrap();
    assert_eq!(files.len(), 2);
    assert!(files.iter().all(|f| f.extension().unwrap() == "bmod"));
}
