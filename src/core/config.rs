use anyhow::{Context, Result, bail};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use std::{fs, path::PathBuf};
use tracing::debug;

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind: "127.0.0.1:8080".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Memory,
    Disk,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub data_path: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct YahooProviderConfig {
    pub base_url: String,
    #[serde(default = "default_rate_cache_ttl_secs")]
    pub rate_cache_ttl_secs: u64,
}

fn default_rate_cache_ttl_secs() -> u64 {
    60
}

impl Default for YahooProviderConfig {
    fn default() -> Self {
        YahooProviderConfig {
            base_url: "https://query1.finance.yahoo.com".to_string(),
            rate_cache_ttl_secs: default_rate_cache_ttl_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct ProvidersConfig {
    pub yahoo: YahooProviderConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct NotifierConfig {
    /// Upper bound for a single webhook delivery attempt.
    pub timeout_ms: u64,
    /// Maximum number of deliveries in flight during one fan-out run.
    pub concurrency: usize,
}

impl NotifierConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for NotifierConfig {
    fn default() -> Self {
        NotifierConfig {
            timeout_ms: 5000,
            concurrency: 16,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub providers: ProvidersConfig,
    pub notifier: NotifierConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("dev", "ratehook", "ratehook")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn default_data_path(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.store.data_path {
            return Ok(PathBuf::from(custom_path));
        }
        let proj_dirs = ProjectDirs::from("dev", "ratehook", "ratehook")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.data_dir().to_path_buf())
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        // serde_yaml rejects an empty document, treat it as "all defaults"
        if config_str.trim().is_empty() {
            debug!("Config file is empty, using defaults");
            return Ok(Self::default());
        }

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.notifier.timeout_ms == 0 {
            bail!("notifier.timeout_ms must be greater than zero");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_deserialization() {
        let yaml_str = r#"
server:
  bind: "0.0.0.0:9000"
store:
  backend: disk
  data_path: "/var/lib/ratehook"
providers:
  yahoo:
    base_url: "http://example.com/yahoo"
    rate_cache_ttl_secs: 0
notifier:
  timeout_ms: 1500
  concurrency: 4
"#;

        let config: AppConfig = serde_yaml::from_str(yaml_str).expect("Failed to deserialize");
        assert_eq!(config.server.bind, "0.0.0.0:9000");
        assert_eq!(config.store.backend, StoreBackend::Disk);
        assert_eq!(
            config.default_data_path().unwrap(),
            PathBuf::from("/var/lib/ratehook")
        );
        assert_eq!(config.providers.yahoo.base_url, "http://example.com/yahoo");
        assert_eq!(config.providers.yahoo.rate_cache_ttl_secs, 0);
        assert_eq!(config.notifier.timeout(), Duration::from_millis(1500));
        assert_eq!(config.notifier.concurrency, 4);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let yaml_str = r#"
providers:
  yahoo:
    base_url: "http://localhost:1234"
"#;
        let config: AppConfig = serde_yaml::from_str(yaml_str).unwrap();
        assert_eq!(config.server.bind, "127.0.0.1:8080");
        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert!(config.store.data_path.is_none());
        assert_eq!(config.providers.yahoo.base_url, "http://localhost:1234");
        assert_eq!(config.providers.yahoo.rate_cache_ttl_secs, 60);
        assert_eq!(config.notifier.timeout_ms, 5000);
        assert_eq!(config.notifier.concurrency, 16);
    }

    #[test]
    fn test_load_from_path_handles_empty_file() -> Result<()> {
        let file = tempfile::NamedTempFile::new()?;
        fs::write(file.path(), "\n")?;

        let config = AppConfig::load_from_path(file.path())?;
        assert_eq!(config.server.bind, "127.0.0.1:8080");
        Ok(())
    }

    #[test]
    fn test_load_from_path_reports_bad_yaml() {
        let file = tempfile::NamedTempFile::new().unwrap();
        fs::write(file.path(), "store:\n  backend: cassandra\n").unwrap();

        let err = AppConfig::load_from_path(file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_load_from_path_rejects_zero_timeout() {
        let file = tempfile::NamedTempFile::new().unwrap();
        fs::write(file.path(), "notifier:\n  timeout_ms: 0\n").unwrap();

        let err = AppConfig::load_from_path(file.path()).unwrap_err();
        assert!(err.to_string().contains("Invalid config file"));
        assert!(format!("{err:#}").contains("timeout_ms"));
    }

    #[test]
    fn test_load_from_missing_path() {
        let err = AppConfig::load_from_path("/definitely/not/here.yaml").unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
