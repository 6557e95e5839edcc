//! Configuration loading and resolution
//!
//! Resolution priority (highest first):
//! 1. Command-line arguments (applied by the binary after resolution)
//! 2. Environment variables (`ROLLCALL_*`)
//! 3. TOML config file
//! 4. Compiled defaults
//!
//! A missing TOML file is not an error: the service logs a warning and starts
//! with defaults. A TOML file that exists but does not parse is an error.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{info, warn};

/// Default HTTP port for rollcall-reconciler
pub const DEFAULT_PORT: u16 = 5780;

/// Attendance percentage at or above which a pending participation is approved
pub const DEFAULT_ATTENDANCE_THRESHOLD: f64 = 75.0;

/// Roster rows processed per ingestion step before yielding
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// Largest workbook accepted for ingestion (50 MiB)
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 50 * 1024 * 1024;

/// Rows scanned from the top of the sheet when looking for the header
pub const DEFAULT_HEADER_SCAN_ROWS: usize = 100;

/// Per-call timeout for ParticipationStore requests
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;

/// Environment variable naming an explicit config file
pub const CONFIG_PATH_ENV: &str = "ROLLCALL_CONFIG";

/// Top-level configuration for the reconciliation service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcilerConfig {
    /// Address the HTTP server binds to
    pub bind_address: String,

    /// HTTP server port
    pub port: u16,

    /// Base URL of the external ParticipationStore API
    pub store_base_url: String,

    /// Number of events buffered by the broadcast bus before lagging receivers drop events
    pub event_bus_capacity: usize,

    /// Decision policy
    pub policy: PolicyConfig,

    /// Roster ingestion limits
    pub ingest: IngestConfig,

    /// ParticipationStore client settings
    pub store: StoreConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Decision policy settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Attendance percentage (0-100) required for automatic approval
    pub attendance_threshold: f64,
}

/// Roster ingestion settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Rows per cooperative chunk
    pub chunk_size: usize,

    /// Upload size cap in bytes
    pub max_upload_bytes: u64,

    /// Rows scanned for the header row
    pub header_scan_rows: usize,
}

/// ParticipationStore client settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Timeout applied to every remote call
    pub request_timeout_ms: u64,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            store_base_url: "http://127.0.0.1:3000/api".to_string(),
            event_bus_capacity: 256,
            policy: PolicyConfig::default(),
            ingest: IngestConfig::default(),
            store: StoreConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            attendance_threshold: DEFAULT_ATTENDANCE_THRESHOLD,
        }
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            header_scan_rows: DEFAULT_HEADER_SCAN_ROWS,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
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

impl ReconcilerConfig {
    /// Apply `ROLLCALL_*` environment overrides on top of the current values
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Some(port) = env_override::<u16>("ROLLCALL_PORT")? {
            self.port = port;
        }
        if let Some(url) = env_override::<String>("ROLLCALL_STORE_URL")? {
            self.store_base_url = url;
        }
        if let Some(threshold) = env_override::<f64>("ROLLCALL_ATTENDANCE_THRESHOLD")? {
            self.policy.attendance_threshold = threshold;
        }
        if let Some(chunk_size) = env_override::<usize>("ROLLCALL_CHUNK_SIZE")? {
            self.ingest.chunk_size = chunk_size;
        }
        if let Some(max_bytes) = env_override::<u64>("ROLLCALL_MAX_UPLOAD_BYTES")? {
            self.ingest.max_upload_bytes = max_bytes;
        }
        Ok(())
    }

    /// Reject values the reconciler cannot operate with
    pub fn validate(&self) -> Result<()> {
        let threshold = self.policy.attendance_threshold;
        if !(0.0..=100.0).contains(&threshold) {
            return Err(Error::Config(format!(
                "attendance_threshold must be within 0-100, got {}",
                threshold
            )));
        }
        if self.ingest.chunk_size == 0 {
            return Err(Error::Config("chunk_size must be greater than 0".to_string()));
        }
        if self.ingest.max_upload_bytes == 0 {
            return Err(Error::Config(
                "max_upload_bytes must be greater than 0".to_string(),
            ));
        }
        if self.ingest.header_scan_rows == 0 {
            return Err(Error::Config(
                "header_scan_rows must be greater than 0".to_string(),
            ));
        }
        if self.store_base_url.trim().is_empty() {
            return Err(Error::Config("store_base_url must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Read an environment variable and parse it, treating unset as `None`
fn env_override<T: FromStr>(name: &str) -> Result<Option<T>> {
    match std::env::var(name) {
        Ok(raw) if raw.trim().is_empty() => Ok(None),
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| Error::Config(format!("{} has an invalid value: {:?}", name, raw))),
        Err(_) => Ok(None),
    }
}

/// Platform config file location: `<config_dir>/rollcall/reconciler.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("rollcall").join("reconciler.toml"))
}

/// Load configuration from a TOML file
///
/// Returns compiled defaults (with a warning) when the file does not exist.
pub fn load_toml_config(path: &Path) -> Result<ReconcilerConfig> {
    if !path.exists() {
        warn!(
            "Config file {} not found, using built-in defaults",
            path.display()
        );
        return Ok(ReconcilerConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read TOML failed ({}): {}", path.display(), e)))?;

    let config: ReconcilerConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML failed ({}): {}", path.display(), e)))?;

    info!("Loaded configuration from {}", path.display());
    Ok(config)
}

/// Resolves the effective configuration from file, environment and defaults
pub struct ConfigResolver {
    explicit_path: Option<PathBuf>,
}

impl ConfigResolver {
    /// Create resolver; `explicit_path` comes from the `--config` argument
    pub fn new(explicit_path: Option<PathBuf>) -> Self {
        Self { explicit_path }
    }

    /// Config file that will be consulted, if any
    ///
    /// Priority: explicit path → `ROLLCALL_CONFIG` → platform default
    pub fn config_path(&self) -> Option<PathBuf> {
        if let Some(path) = &self.explicit_path {
            return Some(path.clone());
        }
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            if !path.trim().is_empty() {
                return Some(PathBuf::from(path));
            }
        }
        default_config_path()
    }

    /// Resolve and validate the configuration
    pub fn resolve(&self) -> Result<ReconcilerConfig> {
        let mut config = match self.config_path() {
            Some(path) => load_toml_config(&path)?,
            None => {
                warn!("No config directory available on this platform, using built-in defaults");
                ReconcilerConfig::default()
            }
        };

        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }
}
