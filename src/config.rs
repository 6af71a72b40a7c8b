//! QRFORGE runtime configuration handling

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level configuration structure persisted to disk or environment
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QrforgeConfig {
    /// Remote generation service settings
    pub service: ServiceOptions,
    /// Temp file and share settings
    pub output: OutputOptions,
    /// Photo library location and permission grants
    pub photos: PhotoOptions,
    /// Logging configuration
    pub logging: LoggingOptions,
}

impl QrforgeConfig {
    /// Load configuration from an explicit path or fall back to discovered defaults.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let mut config = if let Some(path) = explicit_path {
            Self::from_file(path)?
        } else if let Some(path) = Self::discover_file()? {
            tracing::info!("Using configuration file: {}", path.display());
            Self::from_file(&path)?
        } else {
            tracing::debug!("No qrforge.toml / qrforge.yaml found, using defaults");
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Attempt to locate a configuration file in common locations.
    fn discover_file() -> Result<Option<PathBuf>> {
        let cwd =
            env::current_dir().map_err(|e| Error::Config(format!("Failed to read cwd: {e}")))?;
        for candidate in ["qrforge.toml", "qrforge.yaml", "qrforge.yml"] {
            let path = cwd.join(candidate);
            if path.exists() {
                return Ok(Some(path));
            }
        }

        if let Some(xdg_config) = env::var_os("XDG_CONFIG_HOME") {
            let base = PathBuf::from(xdg_config).join("qrforge");
            for candidate in ["config.toml", "config.yaml"] {
                let path = base.join(candidate);
                if path.exists() {
                    return Ok(Some(path));
                }
            }
        }

        Ok(None)
    }

    /// Read configuration from a concrete file path.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {e}", path.display())))?;

        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("")
            .to_ascii_lowercase()
            .as_str()
        {
            "toml" => toml::from_str(&contents).map_err(|e| {
                Error::Config(format!("Failed to parse TOML {}: {e}", path.display()))
            }),
            "yaml" | "yml" => serde_yaml::from_str(&contents).map_err(|e| {
                Error::Config(format!("Failed to parse YAML {}: {e}", path.display()))
            }),
            other => Err(Error::Config(format!(
                "Unsupported config format '{}', expected toml/yaml",
                other
            ))),
        }
    }

    /// Apply environment variable overrides after file/default loading.
    fn apply_env_overrides(&mut self) {
        self.service.apply_env_overrides();
        self.output.apply_env_overrides();
        self.photos.apply_env_overrides();
        self.logging.apply_env_overrides();
    }
}

/// Where and how to reach the QR generation service
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceOptions {
    /// Full URL of the generate endpoint
    pub endpoint: String,
    /// Request timeout in seconds; `0` waits indefinitely
    pub timeout_secs: u64,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:5000/generate".to_string(),
            timeout_secs: 30,
        }
    }
}

impl ServiceOptions {
    pub(crate) fn apply_env_overrides(&mut self) {
        if let Ok(endpoint) = env::var("QRFORGE_ENDPOINT") {
            self.endpoint = endpoint;
        }
        if let Ok(timeout) = env::var("QRFORGE_TIMEOUT_SECS") {
            if let Ok(parsed) = timeout.parse::<u64>() {
                self.timeout_secs = parsed;
            }
        }
    }

    /// Timeout applied to the single request, if any.
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

/// Temp file location and share mechanism
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputOptions {
    /// Directory receiving `QR-<timestamp>.png` files
    pub cache_dir: PathBuf,
    /// Program invoked with the temp file path to share it
    pub share_command: String,
}

impl Default for OutputOptions {
    fn default() -> Self {
        let cache_root = env::var_os("XDG_CACHE_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(env::temp_dir);
        Self {
            cache_dir: cache_root.join("qrforge"),
            share_command: "xdg-open".to_string(),
        }
    }
}

impl OutputOptions {
    pub(crate) fn apply_env_overrides(&mut self) {
        if let Ok(dir) = env::var("QRFORGE_CACHE_DIR") {
            self.cache_dir = PathBuf::from(dir);
        }
        if let Ok(command) = env::var("QRFORGE_SHARE_COMMAND") {
            if !command.trim().is_empty() {
                self.share_command = command;
            }
        }
    }
}

/// Photo library directory and the grants backing its permission gates
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PhotoOptions {
    /// Directory acting as the user's photo library
    pub library_dir: PathBuf,
    /// Whether picking a logo from the library is permitted
    pub allow_read: bool,
    /// Whether saving into the library is permitted
    pub allow_write: bool,
}

impl Default for PhotoOptions {
    fn default() -> Self {
        let library_dir = env::var_os("XDG_PICTURES_DIR")
            .map(PathBuf::from)
            .or_else(|| env::var_os("HOME").map(|home| PathBuf::from(home).join("Pictures")))
            .unwrap_or_else(|| PathBuf::from("Pictures"));
        Self {
            library_dir,
            allow_read: true,
            allow_write: true,
        }
    }
}

impl PhotoOptions {
    pub(crate) fn apply_env_overrides(&mut self) {
        if let Ok(dir) = env::var("QRFORGE_LIBRARY_DIR") {
            self.library_dir = PathBuf::from(dir);
        }
        if let Ok(read) = env::var("QRFORGE_PHOTOS_READ") {
            if let Some(value) = parse_flag(&read) {
                self.allow_read = value;
            }
        }
        if let Ok(write) = env::var("QRFORGE_PHOTOS_WRITE") {
            if let Some(value) = parse_flag(&write) {
                self.allow_write = value;
            }
        }
    }
}

/// Structured logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingOptions {
    /// Default log level (overridable via `QRFORGE_LOG_LEVEL`)
    pub level: String,
    /// Optional log file path for teeing structured logs
    pub file: Option<PathBuf>,
    /// Force ANSI colors in stderr logging
    pub color: bool,
    /// Optional log rotation strategy applied to `file`
    pub rotation: Option<LogRotation>,
}

impl Default for LoggingOptions {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            file: None,
            color: true,
            rotation: None,
        }
    }
}

impl LoggingOptions {
    pub(crate) fn apply_env_overrides(&mut self) {
        if let Ok(level) = env::var("QRFORGE_LOG_LEVEL") {
            self.level = level;
        }
        if let Ok(file) = env::var("QRFORGE_LOG_FILE") {
            self.file = Some(PathBuf::from(file));
        }
        if let Ok(color) = env::var("QRFORGE_LOG_COLOR") {
            if let Some(value) = parse_flag(&color) {
                self.color = value;
            }
        }
        if let Ok(rotation) = env::var("QRFORGE_LOG_ROTATION") {
            if let Some(parsed) = LogRotation::from_str(&rotation) {
                self.rotation = Some(parsed);
            }
        }
    }
}

/// Supported log rotation policies for file sinks
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    /// Rotate log files once per hour
    Hourly,
    /// Rotate log files once per day
    Daily,
}

impl LogRotation {
    fn from_str(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "hourly" => Some(Self::Hourly),
            "daily" => Some(Self::Daily),
            _ => None,
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_point_at_local_service() {
        let config = QrforgeConfig::default();
        assert_eq!(config.service.endpoint, "http://127.0.0.1:5000/generate");
        assert_eq!(config.service.timeout(), Some(Duration::from_secs(30)));
        assert!(config.photos.allow_read);
        assert!(config.photos.allow_write);
        assert!(config.output.cache_dir.ends_with("qrforge"));
    }

    #[test]
    fn zero_timeout_waits_indefinitely() {
        let service = ServiceOptions {
            timeout_secs: 0,
            ..ServiceOptions::default()
        };
        assert_eq!(service.timeout(), None);
    }

    #[test]
    fn parses_partial_toml() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[service]\nendpoint = \"http://qr.local/generate\"\n\n[photos]\nallow_write = false\n\n[logging]\nrotation = \"daily\""
        )
        .unwrap();

        let config = QrforgeConfig::from_file(file.path()).unwrap();
        assert_eq!(config.service.endpoint, "http://qr.local/generate");
        assert_eq!(config.service.timeout_secs, 30);
        assert!(config.photos.allow_read);
        assert!(!config.photos.allow_write);
        assert_eq!(config.logging.rotation, Some(LogRotation::Daily));
    }

    #[test]
    fn parses_yaml() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "service:\n  timeout_secs: 5\noutput:\n  share_command: open").unwrap();

        let config = QrforgeConfig::from_file(file.path()).unwrap();
        assert_eq!(config.service.timeout_secs, 5);
        assert_eq!(config.output.share_command, "open");
    }

    #[test]
    fn rejects_unknown_extension() {
        let file = tempfile::Builder::new().suffix(".ini").tempfile().unwrap();
        let err = QrforgeConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn flag_parsing() {
        assert_eq!(parse_flag("ON"), Some(true));
        assert_eq!(parse_flag("no"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }
}
