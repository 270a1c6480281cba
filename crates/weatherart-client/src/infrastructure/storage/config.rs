//! TOML-based configuration for the `weatherart` tool.
//!
//! Reads and writes [`AppConfig`] to the platform-appropriate config file:
//! - Windows:  `%APPDATA%\WeatherArt\config.toml`
//! - Linux:    `~/.config/weatherart/config.toml`
//! - macOS:    `~/Library/Application Support/WeatherArt/config.toml`
//!
//! A different file can be given with `--config`.
//!
//! # Example file
//!
//! ```toml
//! [device]
//! address = "192.168.1.20"
//! mac = "AA:BB:CC:DD:EE:FF"
//! category = "MY-C0002"
//!
//! [wake]
//! enabled = true
//! wait_secs = 8
//!
//! [timeouts]
//! connect = 15
//! upload = 25
//!
//! [cleanup]
//! day_policy = "local"
//! ```
//!
//! # Serde default values (for beginners)
//!
//! Every field is annotated with `#[serde(default = "some_fn")]` and every
//! section with `#[serde(default)]`, so an empty file (or no file at all) is a
//! valid configuration.  Only the values a user wants to change need to be
//! written down.

use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use weatherart_core::domain::artwork::MY_PHOTOS_CATEGORY;
use weatherart_core::domain::endpoint::{DEFAULT_CONTROL_PORT, DEFAULT_WAKE_PORT};
use weatherart_core::{DayPolicy, DeviceEndpoint, MacAddress};

use crate::application::device_session::SessionConfig;
use crate::application::publish_artwork::UploadSettings;
use crate::infrastructure::network::ArtChannelConfig;

/// File name of the pairing token, relative to the config directory.
pub const TOKEN_FILE_NAME: &str = "token.txt";
/// File name of the last uploaded id, relative to the config directory.
pub const LAST_ID_FILE_NAME: &str = "last_uploaded_id.txt";

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level configuration stored on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub wake: WakeConfig,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    #[serde(default)]
    pub cleanup: CleanupConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// How to find and talk to the display.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeviceConfig {
    /// Fixed IP address.  When absent, the address is looked up from `mac`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<IpAddr>,
    /// Hardware address, used for neighbour lookup and wake.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mac: Option<MacAddress>,
    #[serde(default = "default_control_port")]
    pub port: u16,
    /// Use TLS (`wss://`) on the art channel.
    #[serde(default = "default_true")]
    pub secure: bool,
    /// Name shown on the TV's pairing prompt.
    #[serde(default = "default_client_name")]
    pub client_name: String,
    /// Category uploads are filed under and cleanups act on.
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default = "default_matte")]
    pub matte: String,
    /// Pairing token file; defaults to `token.txt` in the config directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_file: Option<PathBuf>,
}

/// Wake-on-LAN settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WakeConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_broadcast")]
    pub broadcast: IpAddr,
    #[serde(default = "default_wake_port")]
    pub port: u16,
    /// Seconds to wait after sending the magic packet.
    #[serde(default = "default_wake_wait")]
    pub wait_secs: u64,
}

/// Timeouts and retry policy, in seconds unless the name says otherwise.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimeoutConfig {
    #[serde(default = "default_connect_timeout")]
    pub connect: u64,
    #[serde(default = "default_connect_attempts")]
    pub connect_attempts: u32,
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
    /// How long the user has to approve pairing on the TV.
    #[serde(default = "default_authorization_timeout")]
    pub authorization: u64,
    #[serde(default = "default_request_timeout")]
    pub request: u64,
    #[serde(default = "default_upload_timeout")]
    pub upload: u64,
}

/// Settings for `remove-today`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CleanupConfig {
    /// `"local"`, `"utc"` or `"fixed:<+/-minutes>"`.
    #[serde(default)]
    pub day_policy: DayPolicy,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StorageConfig {
    /// Last uploaded id file; defaults to `last_uploaded_id.txt` in the
    /// config directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_id_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// `tracing` level: `"error"`, `"warn"`, `"info"`, `"debug"`, `"trace"`.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Optional plain-text log file, appended to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_true() -> bool {
    true
}
fn default_control_port() -> u16 {
    DEFAULT_CONTROL_PORT
}
fn default_client_name() -> String {
    "WeatherArt".to_string()
}
fn default_category() -> String {
    MY_PHOTOS_CATEGORY.to_string()
}
fn default_matte() -> String {
    "none".to_string()
}
fn default_broadcast() -> IpAddr {
    IpAddr::V4(Ipv4Addr::BROADCAST)
}
fn default_wake_port() -> u16 {
    DEFAULT_WAKE_PORT
}
fn default_wake_wait() -> u64 {
    8
}
fn default_connect_timeout() -> u64 {
    15
}
fn default_connect_attempts() -> u32 {
    3
}
fn default_retry_backoff_ms() -> u64 {
    2000
}
fn default_authorization_timeout() -> u64 {
    30
}
fn default_request_timeout() -> u64 {
    15
}
fn default_upload_timeout() -> u64 {
    25
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            address: None,
            mac: None,
            port: default_control_port(),
            secure: default_true(),
            client_name: default_client_name(),
            category: default_category(),
            matte: default_matte(),
            token_file: None,
        }
    }
}

impl Default for WakeConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            broadcast: default_broadcast(),
            port: default_wake_port(),
            wait_secs: default_wake_wait(),
        }
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect: default_connect_timeout(),
            connect_attempts: default_connect_attempts(),
            retry_backoff_ms: default_retry_backoff_ms(),
            authorization: default_authorization_timeout(),
            request: default_request_timeout(),
            upload: default_upload_timeout(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

// ── Conversions into runtime settings ─────────────────────────────────────────

impl AppConfig {
    /// The device address and wake parameters.
    pub fn to_endpoint(&self) -> DeviceEndpoint {
        DeviceEndpoint {
            address: self.device.address,
            mac: self.device.mac,
            control_port: self.device.port,
            wake_port: self.wake.port,
            wake_broadcast: self.wake.broadcast,
        }
    }

    /// Timeouts, retry policy and wake behaviour for a session.
    pub fn to_session_config(&self) -> SessionConfig {
        let t = &self.timeouts;
        SessionConfig {
            connect_timeout: Duration::from_secs(t.connect),
            connect_attempts: t.connect_attempts.max(1),
            retry_backoff: Duration::from_millis(t.retry_backoff_ms),
            authorization_timeout: Duration::from_secs(t.authorization),
            request_timeout: Duration::from_secs(t.request),
            upload_timeout: Duration::from_secs(t.upload),
            wake: self.wake.enabled,
            wake_grace: Duration::from_secs(self.wake.wait_secs),
        }
    }

    /// Art channel settings with the given pairing token.
    pub fn to_channel_config(&self, token: Option<String>) -> ArtChannelConfig {
        ArtChannelConfig {
            secure: self.device.secure,
            client_name: self.device.client_name.clone(),
            token,
        }
    }

    pub fn to_upload_settings(&self, replace_last: bool) -> UploadSettings {
        UploadSettings {
            category: self.device.category.clone(),
            matte: self.device.matte.clone(),
            replace_last,
        }
    }

    /// Path of the pairing token file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoPlatformConfigDir`] if no file is configured
    /// and the config directory cannot be determined.
    pub fn token_path(&self) -> Result<PathBuf, ConfigError> {
        state_path(self.device.token_file.as_deref(), TOKEN_FILE_NAME)
    }

    /// Path of the last uploaded id file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoPlatformConfigDir`] if no file is configured
    /// and the config directory cannot be determined.
    pub fn last_id_path(&self) -> Result<PathBuf, ConfigError> {
        state_path(self.storage.last_id_file.as_deref(), LAST_ID_FILE_NAME)
    }
}

fn state_path(configured: Option<&Path>, default_name: &str) -> Result<PathBuf, ConfigError> {
    match configured {
        Some(path) => Ok(path.to_path_buf()),
        None => Ok(config_dir()?.join(default_name)),
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Determines the platform-appropriate directory for the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] when the platform config base
/// directory cannot be determined from the environment.
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    platform_config_dir().ok_or(ConfigError::NoPlatformConfigDir)
}

/// Resolves the full path to the default config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] if the base directory cannot be
/// determined.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("config.toml"))
}

/// Loads `AppConfig` from the default location.
///
/// # Errors
///
/// See [`load_config_from`].
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from(&config_file_path()?)
}

/// Loads `AppConfig` from `path`, returning `AppConfig::default()` if the
/// file does not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config_from(path: &Path) -> Result<AppConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(AppConfig::default()),
        Err(e) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Persists `config` to `path`, creating parent directories as needed.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_config(config: &AppConfig, path: &Path) -> Result<(), ConfigError> {
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

/// Resolves the platform config directory, including the `WeatherArt` part.
fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("WeatherArt"))
    }

    #[cfg(target_os = "linux")]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("weatherart"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("WeatherArt")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
