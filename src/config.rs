use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::constants::DEFAULT_COMMIT_INTERVAL;

fn default_commit_interval_secs() -> u64 {
    DEFAULT_COMMIT_INTERVAL.as_secs()
}

fn default_true() -> bool {
    true
}

/// Session store configuration (maps to the [store] section in TOML)
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Seconds between automatic commits of the batching transaction (default: 15)
    #[serde(default = "default_commit_interval_secs")]
    pub commit_interval_secs: u64,
    /// Open the session file in WAL journal mode (default: true)
    #[serde(default = "default_true")]
    pub wal: bool,
    /// Hold an exclusive `<db>.lock` file while writing (default: true)
    #[serde(default = "default_true")]
    pub lock_file: bool,
    /// Commit interval override with sub-second precision, not read from TOML
    #[serde(skip)]
    pub commit_interval_override: Option<Duration>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            commit_interval_secs: default_commit_interval_secs(),
            wal: true,
            lock_file: true,
            commit_interval_override: None,
        }
    }
}

impl StoreConfig {
    pub fn commit_interval(&self) -> Duration {
        self.commit_interval_override
            .unwrap_or_else(|| Duration::from_secs(self.commit_interval_secs))
    }

    /// Same configuration with a custom commit interval
    pub fn with_commit_interval(mut self, interval: Duration) -> Self {
        self.commit_interval_override = Some(interval);
        self
    }
}

/// Configuration file structure
#[derive(Debug, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub store: StoreConfig,
}

impl ConfigFile {
    pub fn parse(text: &str) -> Result<Self, String> {
        toml::from_str(text).map_err(|e| format!("Invalid config: {}", e))
    }

    pub fn load(path: &Path) -> Result<Self, String> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file '{}': {}", path.display(), e))?;
        Self::parse(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_section_missing() {
        let config = ConfigFile::parse("").unwrap();
        assert_eq!(config.store.commit_interval(), Duration::from_secs(15));
        assert!(config.store.wal);
        assert!(config.store.lock_file);
    }

    #[test]
    fn test_store_section() {
        let config = ConfigFile::parse(
            r#"
            [store]
            commit_interval_secs = 5
            wal = false
            "#,
        )
        .unwrap();
        assert_eq!(config.store.commit_interval(), Duration::from_secs(5));
        assert!(!config.store.wal);
        assert!(config.store.lock_file);
    }

    #[test]
    fn test_override_wins() {
        let config = StoreConfig::default().with_commit_interval(Duration::from_millis(50));
        assert_eq!(config.commit_interval(), Duration::from_millis(50));
    }

    #[test]
    fn test_rejects_bad_type() {
        assert!(ConfigFile::parse("[store]\ncommit_interval_secs = \"soon\"").is_err());
    }
}
