//! Host configuration

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::domain::RetryPolicy;
use crate::error::HostError;

/// Tunables for the plugin host.
///
/// Resolution order: built-in defaults, then an optional `plugbay.toml`, then
/// `PLUGBAY_*` environment variables. CLI flags are applied on top by the
/// binary.
#[derive(Debug, Clone)]
pub struct HostConfig {
    /// Directory observed for plugin artifacts
    pub plugins_dir: PathBuf,
    /// Replace live endpoint plugins in place instead of unload-then-load
    pub enable_hot_swap: bool,
    /// How long a hot-swapped-out instance stays alive for in-flight requests
    pub grace_period: Duration,
    /// Quiet period that coalesces bursts of filesystem events per path
    pub debounce: Duration,
    /// Attempts to map a freshly written library before giving up
    pub load_retries: u32,
    /// Pause between library load attempts
    pub load_retry_delay: Duration,
    /// Overall budget for the file readability probe
    pub readable_budget: Duration,
    /// Pause between readability probes
    pub readable_interval: Duration,
    /// CORS origins forwarded to the web host
    pub allowed_origins: Vec<String>,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            plugins_dir: PathBuf::from("plugins"),
            enable_hot_swap: true,
            grace_period: Duration::from_secs(30),
            debounce: Duration::from_millis(250),
            load_retries: 5,
            load_retry_delay: Duration::from_millis(100),
            readable_budget: Duration::from_secs(5),
            readable_interval: Duration::from_millis(100),
            allowed_origins: Vec::new(),
        }
    }
}

/// Subset of options accepted from `plugbay.toml`
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    plugins_dir: Option<PathBuf>,
    enable_hot_swap: Option<bool>,
    grace_period_secs: Option<u64>,
    debounce_ms: Option<u64>,
    allowed_origins: Option<Vec<String>>,
}

impl HostConfig {
    /// Defaults, then the config file (when present), then the environment.
    pub fn from_sources(file: Option<&Path>) -> Result<Self, HostError> {
        let mut config = Self::default();
        if let Some(path) = file
            && path.exists()
        {
            let content = std::fs::read_to_string(path)?;
            let parsed: FileConfig =
                toml::from_str(&content).map_err(|e| HostError::Config(e.to_string()))?;
            config.apply_file(parsed);
        }
        config.apply_env(std::env::vars());
        Ok(config)
    }

    fn apply_file(&mut self, file: FileConfig) {
        if let Some(dir) = file.plugins_dir {
            self.plugins_dir = dir;
        }
        if let Some(v) = file.enable_hot_swap {
            self.enable_hot_swap = v;
        }
        if let Some(secs) = file.grace_period_secs {
            self.grace_period = Duration::from_secs(secs);
        }
        if let Some(ms) = file.debounce_ms {
            self.debounce = Duration::from_millis(ms);
        }
        if let Some(origins) = file.allowed_origins {
            self.allowed_origins = origins;
        }
    }

    fn apply_env(&mut self, vars: impl Iterator<Item = (String, String)>) {
        for (key, value) in vars {
            match key.as_str() {
                "PLUGBAY_PLUGINS_DIR" => self.plugins_dir = PathBuf::from(value),
                "PLUGBAY_ENABLE_HOT_SWAP" => {
                    if let Ok(v) = value.parse() {
                        self.enable_hot_swap = v;
                    }
                }
                "PLUGBAY_GRACE_PERIOD_SECS" => {
                    if let Ok(v) = value.parse() {
                        self.grace_period = Duration::from_secs(v);
                    }
                }
                "PLUGBAY_DEBOUNCE_MS" => {
                    if let Ok(v) = value.parse() {
                        self.debounce = Duration::from_millis(v);
                    }
                }
                "PLUGBAY_ALLOWED_ORIGINS" => {
                    self.allowed_origins = value
                        .split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect();
                }
                _ => {}
            }
        }
    }

    pub(crate) fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            attempts: self.load_retries,
            delay: self.load_retry_delay,
            readable_budget: self.readable_budget,
            readable_interval: self.readable_interval,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Iterator<Item = (String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<Vec<_>>()
            .into_iter()
    }

    #[test]
    fn test_defaults() {
        let config = HostConfig::default();
        assert_eq!(config.plugins_dir, PathBuf::from("plugins"));
        assert!(config.enable_hot_swap);
        assert_eq!(config.grace_period, Duration::from_secs(30));
        assert_eq!(config.load_retries, 5);
    }

    #[test]
    fn test_apply_env_overrides() {
        let mut config = HostConfig::default();
        config.apply_env(env(&[
            ("PLUGBAY_PLUGINS_DIR", "/opt/mods"),
            ("PLUGBAY_ENABLE_HOT_SWAP", "false"),
            ("PLUGBAY_GRACE_PERIOD_SECS", "5"),
            ("PLUGBAY_ALLOWED_ORIGINS", "https://a.example, https://b.example"),
            ("UNRELATED", "ignored"),
        ]));
        assert_eq!(config.plugins_dir, PathBuf::from("/opt/mods"));
        assert!(!config.enable_hot_swap);
        assert_eq!(config.grace_period, Duration::from_secs(5));
        assert_eq!(
            config.allowed_origins,
            vec!["https://a.example", "https://b.example"]
        );
    }

    #[test]
    fn test_apply_env_rejects_garbage_values() {
        let mut config = HostConfig::default();
        config.apply_env(env(&[("PLUGBAY_GRACE_PERIOD_SECS", "soon")]));
        assert_eq!(config.grace_period, Duration::from_secs(30));
    }

    #[test]
    fn test_apply_file() {
        let parsed: FileConfig = toml::from_str(
            r#"
            plugins_dir = "/var/lib/plugbay"
            grace_period_secs = 10
            debounce_ms = 100
            allowed_origins = ["https://ui.example"]
            "#,
        )
        .unwrap();
        let mut config = HostConfig::default();
        config.apply_file(parsed);
        assert_eq!(config.plugins_dir, PathBuf::from("/var/lib/plugbay"));
        assert_eq!(config.grace_period, Duration::from_secs(10));
        assert_eq!(config.debounce, Duration::from_millis(100));
        assert_eq!(config.allowed_origins, vec!["https://ui.example"]);
    }

    #[test]
    fn test_from_sources_missing_file_uses_defaults() {
        let config = HostConfig::from_sources(Some(Path::new("/nonexistent/plugbay.toml"))).unwrap();
        assert!(config.enable_hot_swap);
    }
}
