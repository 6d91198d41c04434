//! Configuration file loading and management
//!
//! This module handles loading and parsing the host configuration from
//! `$XDG_CONFIG_HOME/modbridge/config.toml`. If the configuration file doesn't
//! exist, a default configuration is created with documented comments.

use anyhow::{Context, Result};
use modbridge_runtime::{
    BridgeContract, EnvFallback, ManagerLayout, SourceLayout, BRIDGE_CAPABILITY, BRIDGE_SENTINEL,
    DEFAULT_PLUGIN_SUBPATH, DESCRIPTION_TAG, MODULE_EXTENSION,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main host configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Host installation settings
    #[serde(default)]
    pub host: HostConfig,
    /// Module scanning settings
    #[serde(default)]
    pub scan: ScanConfig,
    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Additional mod managers, scanned after the built-in ones
    #[serde(default)]
    pub managers: Vec<ManagerConfig>,
}

/// Host installation configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HostConfig {
    /// Host installation directory
    /// If None, uses the current working directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,
    /// Game identifier used in mod manager paths
    /// Default: "CitiesSkylines2"
    pub game: String,
    /// Plugin directory relative to the host root
    /// Default: "BepInEx/plugins"
    pub plugin_subpath: PathBuf,
    /// Whether to include the Thunderstore and r2modman layouts
    /// Default: true
    pub default_managers: bool,
}

/// Module scanning configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScanConfig {
    /// Module file extension, without the dot
    /// Default: "bmod"
    pub extension: String,
    /// Interface a type must list to be considered
    /// Default: "modbridge.Bridge"
    pub capability: String,
    /// Metadata tag holding the opt-in marker
    /// Default: "description"
    pub tag: String,
    /// Opt-in marker value, compared case-insensitively
    /// Default: "bridge"
    pub sentinel: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    /// Overridden by `RUST_LOG` when set
    /// Default: "info"
    pub level: String,
}

/// A user-defined mod manager layout
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ManagerConfig {
    /// Manager name, used in logs
    pub name: String,
    /// Directory holding one sub-directory per profile
    pub profiles_root: PathBuf,
    /// Plugin path nested inside each profile
    #[serde(default = "default_nested_path")]
    pub nested_path: PathBuf,
    /// Environment variable holding a loader file path, used when
    /// `profiles_root` is missing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_env: Option<String>,
    /// Levels to walk up from the loader file's directory
    /// Default: 3
    #[serde(default = "default_parent_steps")]
    pub fallback_parent_steps: usize,
}

fn default_nested_path() -> PathBuf {
    PathBuf::from(DEFAULT_PLUGIN_SUBPATH)
}

fn default_parent_steps() -> usize {
    3
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            root: None,
            game: "CitiesSkylines2".to_string(),
            plugin_subpath: default_nested_path(),
            default_managers: true,
        }
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            extension: MODULE_EXTENSION.to_string(),
            capability: BRIDGE_CAPABILITY.to_string(),
            tag: DESCRIPTION_TAG.to_string(),
            sentinel: BRIDGE_SENTINEL.to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl ManagerConfig {
    /// Convert to the runtime's manager layout.
    pub fn to_layout(&self) -> ManagerLayout {
        ManagerLayout {
            name: self.name.clone(),
            profiles_root: self.profiles_root.clone(),
            nested_path: self.nested_path.clone(),
            fallback: self.fallback_env.as_ref().map(|variable| EnvFallback {
                variable: variable.clone(),
                parent_steps: self.fallback_parent_steps,
            }),
        }
    }
}

impl Config {
    /// Load configuration from the specified path
    ///
    /// # Arguments
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    /// The parsed configuration or an error if loading/parsing fails
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from the default XDG config location
    ///
    /// If the configuration file doesn't exist, creates a default configuration
    /// file with documented comments.
    pub fn load_default() -> Result<Self> {
        let config_path = Self::default_config_path()?;

        if !config_path.exists() {
            Self::create_default_file(&config_path)?;
        }

        Self::load(&config_path)
    }

    /// Get the default configuration file path
    ///
    /// Returns `$XDG_CONFIG_HOME/modbridge/config.toml`
    pub fn default_config_path() -> Result<PathBuf> {
        let dirs = directories::ProjectDirs::from("", "raibid-labs", "modbridge")
            .context("Failed to determine project directories")?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Create a default configuration file with documented comments
    pub fn create_default_file(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        fs::write(path, Self::default_config_content())
            .with_context(|| format!("Failed to write default config file: {}", path.display()))?;

        tracing::info!("Created default configuration file at: {}", path.display());
        Ok(())
    }

    /// Generate the default configuration file content with comments
    pub fn default_config_content() -> String {
        r#"# Modbridge Host Configuration
# This file configures where modbridge-host looks for add-on modules.

[host]
# Host installation directory
# If not specified, defaults to the current working directory
# root = "/path/to/game"

# Game identifier used in mod manager profile paths
# Default: "CitiesSkylines2"
game = "CitiesSkylines2"

# Plugin directory relative to the host root
# Default: "BepInEx/plugins"
plugin_subpath = "BepInEx/plugins"

# Scan the Thunderstore Mod Manager and r2modman profiles
# Default: true
default_managers = true

[scan]
# Module file extension
# Default: "bmod"
extension = "bmod"

# Interface a module type must implement to be bridged
# Default: "modbridge.Bridge"
capability = "modbridge.Bridge"

# Metadata tag and value a type must carry to opt in
# The value is compared case-insensitively
tag = "description"
sentinel = "bridge"

[logging]
# Log level: trace, debug, info, warn, error
# RUST_LOG takes precedence when set
# Default: "info"
level = "info"

# Additional mod managers
# Each manager is configured with:
# - name: Name shown in logs
# - profiles_root: Directory holding one sub-directory per profile
# - nested_path: Plugin path inside a profile (default: "BepInEx/plugins")
# - fallback_env: Variable holding a loader file path, used when
#   profiles_root is missing (optional)
# - fallback_parent_steps: Levels to walk up from that file's directory;
#   0 uses the directory itself (default: 3)

# Example: Gale mod manager
# [[managers]]
# name = "gale"
# profiles_root = "/home/user/.local/share/com.kesomannen.gale/CitiesSkylines2/profiles"
"#
        .to_string()
    }

    /// Validate the configuration
    ///
    /// Ensures all configuration values are valid and within acceptable ranges.
    pub fn validate(&self) -> Result<()> {
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            anyhow::bail!(
                "Invalid logging.level: {}. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            );
        }

        let extension = self.scan.extension.trim();
        if extension.is_empty() || extension.starts_with('.') {
            anyhow::bail!(
                "scan.extension must be non-empty and given without a leading dot, got '{}'",
                self.scan.extension
            );
        }

        if self.scan.capability.trim().is_empty() {
            anyhow::bail!("scan.capability must not be empty");
        }

        if self.scan.tag.trim().is_empty() {
            anyhow::bail!("scan.tag must not be empty");
        }

        if self.scan.sentinel.trim().is_empty() {
            anyhow::bail!("scan.sentinel must not be empty");
        }

        if self.host.game.trim().is_empty() {
            anyhow::bail!("host.game must not be empty");
        }

        for manager in &self.managers {
            if manager.name.trim().is_empty() {
                anyhow::bail!("Manager name must not be empty");
            }
        }

        Ok(())
    }

    /// Get the host root directory
    ///
    /// Returns the configured root or the current working directory
    pub fn host_root(&self) -> Result<PathBuf> {
        if let Some(ref root) = self.host.root {
            return Ok(root.clone());
        }

        std::env::current_dir().context("Failed to determine current directory")
    }

    /// Build the source layout for this configuration
    pub fn to_source_layout(&self) -> Result<SourceLayout> {
        let root = self.host_root()?;

        let mut layout = if self.host.default_managers {
            SourceLayout::for_host(&root, &self.host.game)
        } else {
            SourceLayout {
                well_known: PathBuf::new(),
                managers: Vec::new(),
            }
        };

        layout.well_known = root.join(&self.host.plugin_subpath);
        layout
            .managers
            .extend(self.managers.iter().map(ManagerConfig::to_layout));

        Ok(layout)
    }

    /// Build the bridge contract for this configuration
    pub fn to_contract(&self) -> BridgeContract {
        BridgeContract {
            capability: self.scan.capability.clone(),
            tag: self.scan.tag.clone(),
            sentinel: self.scan.sentinel.clone(),
        }
    }
}
