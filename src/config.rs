//! YAML configuration for the store, the reference table and view refresh.

use serde::Deserialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("invalid config: {0}")]
    Parse(#[from] serde_yaml::Error),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub reference: ReferenceConfig,
    pub refresh: RefreshConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub path: PathBuf,
    pub media_dir: PathBuf, // X-ray copies land here
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            path: PathBuf::from("./clinic.db"),
            media_dir: PathBuf::from("./media"),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ReferenceConfig {
    /// Replaces the bundled diagnosis code list when set.
    pub codes_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    pub interval_ms: u64,
}

impl RefreshConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl Default for RefreshConfig {
    fn default() -> Self {
        RefreshConfig { interval_ms: 5000 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig { filter: "info".to_string() }
    }
}

/// Loads the config at `path`. A missing file yields the defaults.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&raw)
}

pub fn parse_config(raw: &str) -> Result<Config, ConfigError> {
    if raw.trim().is_empty() {
        return Ok(Config::default());
    }
    Ok(serde_yaml::from_str(raw)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let config = parse_config("storage:\n  path: /tmp/x.db\nrefresh:\n  interval_ms: 500\n").unwrap();
        assert_eq!(config.storage.path, PathBuf::from("/tmp/x.db"));
        assert_eq!(config.storage.media_dir, PathBuf::from("./media"));
        assert_eq!(config.refresh.interval(), Duration::from_millis(500));
        assert_eq!(config.logging.filter, "info");
        assert!(config.reference.codes_path.is_none());
    }

    #[test]
    fn missing_file_is_default() {
        let config = load_config(Path::new("/definitely/not/here.yaml")).unwrap();
        assert_eq!(config.refresh.interval_ms, 5000);
    }

    #[test]
    fn malformed_yaml_is_rejected() {
        assert!(matches!(parse_config("storage: [1, 2"), Err(ConfigError::Parse(_))));
    }
}
