use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::retry::RetryPolicy;

/// Default API location when neither the config file nor the environment set one.
pub const DEFAULT_BASE_URL: &str = "http://localhost:5000/api/v1";

/// Environment variable that overrides `api.base_url`.
pub const BASE_URL_ENV: &str = "API_BASE_URL";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
  pub api: ApiConfig,
  pub cache: CacheConfig,
  pub retry: RetryConfig,
  pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
  pub base_url: String,
  /// Request timeout applied by the transport
  pub timeout_secs: u64,
  /// Extra headers sent with every request
  pub headers: BTreeMap<String, String>,
  /// Trace every request and response even in release builds
  pub dev_logging: bool,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      base_url: DEFAULT_BASE_URL.to_string(),
      timeout_secs: 30,
      headers: BTreeMap::new(),
      dev_logging: false,
    }
  }
}

/// Stale windows per query kind, in seconds.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
  /// Disable to send every read to the network
  pub enabled: bool,
  pub list_stale_secs: u64,
  pub detail_stale_secs: u64,
  pub latest_stale_secs: u64,
  pub related_stale_secs: u64,
  pub stats_stale_secs: u64,
  pub infinite_stale_secs: u64,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      enabled: true,
      list_stale_secs: 5 * 60,
      detail_stale_secs: 10 * 60,
      latest_stale_secs: 2 * 60,
      related_stale_secs: 10 * 60,
      stats_stale_secs: 30 * 60,
      infinite_stale_secs: 5 * 60,
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
  pub retries: u32,
  pub initial_delay_ms: u64,
  pub backoff_factor: u32,
}

impl Default for RetryConfig {
  fn default() -> Self {
    let policy = RetryPolicy::default();
    Self {
      retries: policy.retries,
      initial_delay_ms: policy.initial_delay.as_millis() as u64,
      backoff_factor: policy.backoff_factor,
    }
  }
}

impl From<&RetryConfig> for RetryPolicy {
  fn from(config: &RetryConfig) -> Self {
    RetryPolicy {
      retries: config.retries,
      initial_delay: Duration::from_millis(config.initial_delay_ms),
      backoff_factor: config.backoff_factor,
    }
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LogConfig {
  /// Write logs to daily files in this directory instead of stderr
  pub directory: Option<PathBuf>,
  /// `EnvFilter` directive used when `RUST_LOG` is unset
  pub filter: Option<String>,
}

impl Config {
  /// Load configuration from file, then apply environment overrides.
  ///
  /// Search order:
  /// 1. Explicit path if provided (must exist)
  /// 2. ./eo-archive.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/eo-archive/config.yaml
  ///
  /// No file at all is fine; defaults are used.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    let mut config = match path {
      Some(p) => Self::load_from_path(&p)?,
      None => Config::default(),
    };
    config.apply_env(std::env::var(BASE_URL_ENV).ok());
    config.api.base_url = config.api.base_url.trim_end_matches('/').to_string();

    Ok(config)
  }

  fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("eo-archive.yaml");
    if local.exists() {
      return Some(local);
    }

    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("eo-archive").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    let config: Config = serde_yaml::from_str(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))?;

    Ok(config)
  }

  fn apply_env(&mut self, base_url: Option<String>) {
    if let Some(url) = base_url.filter(|u| !u.trim().is_empty()) {
      self.api.base_url = url;
    }
  }

  pub fn retry_policy(&self) -> RetryPolicy {
    RetryPolicy::from(&self.retry)
  }
}
