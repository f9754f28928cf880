//! TOML-based configuration for the shell.
//!
//! Reads and writes `ShellConfig` to the platform-appropriate config file:
//! - Windows:  `%APPDATA%\Webtop\config.toml`
//! - Linux:    `~/.config/webtop/config.toml`
//! - macOS:    `~/Library/Application Support/Webtop/config.toml`
//!
//! An explicit path (the `--config` flag) overrides the platform location.
//!
//! ```toml
//! [shell]
//! owner_key = "guest"
//! log_level = "info"
//!
//! [gestures]
//! swipe_threshold = 50.0
//!
//! [[apps]]
//! app_id = "terminal"
//! title = "Terminal"
//! multi_instance = true
//! ```
//!
//! Every field has a `#[serde(default = ...)]`, so a partial file (or none at
//! all on first run) still produces a complete configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use webtop_core::{AppSpec, DeviceThresholds, GestureThresholds, Size};

use crate::application::device_detector::DetectorSettings;
use crate::application::shell::ShellSettings;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level shell configuration stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ShellConfig {
    #[serde(default)]
    pub shell: GeneralConfig,
    #[serde(default)]
    pub gestures: GestureConfig,
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub icons: IconConfig,
    /// App registry consulted by `launch`.
    #[serde(default)]
    pub apps: Vec<AppSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeneralConfig {
    /// Key under which the icon layout is persisted.
    #[serde(default = "default_owner_key")]
    pub owner_key: String,
    /// `tracing` level used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GestureConfig {
    #[serde(default = "default_swipe_threshold")]
    pub swipe_threshold: f64,
    #[serde(default = "default_edge_margin")]
    pub edge_margin: f64,
    /// Height below the top inset where a downward swipe closes a window.
    #[serde(default = "default_close_zone")]
    pub close_zone: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeviceConfig {
    #[serde(default = "default_mobile_max_width")]
    pub mobile_max_width: f64,
    #[serde(default = "default_tablet_max_width")]
    pub tablet_max_width: f64,
    #[serde(default = "default_desktop_top_inset")]
    pub desktop_top_inset: f64,
    #[serde(default = "default_mobile_top_inset")]
    pub mobile_top_inset: f64,
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    #[serde(default = "default_keyboard_shrink_ratio")]
    pub keyboard_shrink_ratio: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IconConfig {
    #[serde(default = "default_icon_extent")]
    pub width: f64,
    #[serde(default = "default_icon_extent")]
    pub height: f64,
    /// Icon layout file.  Defaults to `icons.toml` next to the config file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_path: Option<PathBuf>,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_owner_key() -> String {
    "guest".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_swipe_threshold() -> f64 {
    GestureThresholds::default().swipe_threshold
}
fn default_edge_margin() -> f64 {
    GestureThresholds::default().edge_margin
}
fn default_close_zone() -> f64 {
    crate::application::window_manager::DEFAULT_CLOSE_ZONE
}
fn default_mobile_max_width() -> f64 {
    DeviceThresholds::default().mobile_max_width
}
fn default_tablet_max_width() -> f64 {
    DeviceThresholds::default().tablet_max_width
}
fn default_desktop_top_inset() -> f64 {
    DeviceThresholds::default().desktop_top_inset
}
fn default_mobile_top_inset() -> f64 {
    DeviceThresholds::default().mobile_top_inset
}
fn default_debounce_ms() -> u64 {
    DetectorSettings::default().debounce_ms
}
fn default_keyboard_shrink_ratio() -> f64 {
    DetectorSettings::default().keyboard_shrink_ratio
}
fn default_icon_extent() -> f64 {
    80.0
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            owner_key: default_owner_key(),
            log_level: default_log_level(),
        }
    }
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            swipe_threshold: default_swipe_threshold(),
            edge_margin: default_edge_margin(),
            close_zone: default_close_zone(),
        }
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            mobile_max_width: default_mobile_max_width(),
            tablet_max_width: default_tablet_max_width(),
            desktop_top_inset: default_desktop_top_inset(),
            mobile_top_inset: default_mobile_top_inset(),
            debounce_ms: default_debounce_ms(),
            keyboard_shrink_ratio: default_keyboard_shrink_ratio(),
        }
    }
}

impl Default for IconConfig {
    fn default() -> Self {
        Self {
            width: default_icon_extent(),
            height: default_icon_extent(),
            store_path: None,
        }
    }
}

// ── Conversions into runtime settings ─────────────────────────────────────────

impl GestureConfig {
    pub fn thresholds(&self) -> GestureThresholds {
        GestureThresholds {
            swipe_threshold: self.swipe_threshold,
            edge_margin: self.edge_margin,
        }
    }
}

impl DeviceConfig {
    pub fn detector_settings(&self) -> DetectorSettings {
        DetectorSettings {
            thresholds: DeviceThresholds {
                mobile_max_width: self.mobile_max_width,
                tablet_max_width: self.tablet_max_width,
                desktop_top_inset: self.desktop_top_inset,
                mobile_top_inset: self.mobile_top_inset,
            },
            debounce_ms: self.debounce_ms,
            keyboard_shrink_ratio: self.keyboard_shrink_ratio,
        }
    }
}

impl IconConfig {
    pub fn icon_size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

impl ShellConfig {
    /// The runtime settings handed to [`Shell::new`](crate::application::shell::Shell::new).
    pub fn shell_settings(&self) -> ShellSettings {
        ShellSettings {
            owner_key: self.shell.owner_key.clone(),
            gestures: self.gestures.thresholds(),
            detector: self.device.detector_settings(),
            close_zone: self.gestures.close_zone,
            icon_size: self.icons.icon_size(),
            apps: self.apps.clone(),
        }
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Determines the platform-appropriate directory for the config file.
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    platform_config_dir().ok_or(ConfigError::NoPlatformConfigDir)
}

/// Resolves the full path to the config file.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("config.toml"))
}

/// Loads `ShellConfig` from `path` (or the platform location), returning the
/// defaults when the file does not exist yet.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config(path: Option<&Path>) -> Result<ShellConfig, ConfigError> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => config_file_path()?,
    };

    match std::fs::read_to_string(&path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ShellConfig::default()),
        Err(source) => Err(ConfigError::Io { path, source }),
    }
}

/// Writes `config` to `path`, creating parent directories as needed.
pub fn save_config(config: &ShellConfig, path: &Path) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Writes the effective configuration (file values merged over defaults) to
/// `path` or the platform location, filling in every missing key.  Returns
/// the path written.
pub fn write_effective_config(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => config_file_path()?,
    };
    let config = load_config(Some(&path))?;
    save_config(&config, &path)?;
    Ok(path)
}

/// Where the icon layout lives when `[icons] store_path` is unset.
pub fn default_icon_store_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("icons.toml"))
}

/// Resolves the platform config base directory including the `webtop` leaf.
fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("Webtop"))
    }

    #[cfg(target_os = "linux")]
    {
        // XDG_CONFIG_HOME or ~/.config
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("webtop"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("Webtop")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
