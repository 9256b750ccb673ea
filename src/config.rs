use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::fallback::ApiMode;

/// Environment variable overriding `api.base_url`.
pub const ENV_API_URL: &str = "HRMS_API_URL";
/// Environment variable forcing mock mode.
pub const ENV_FORCE_MOCK: &str = "HRMS_FORCE_MOCK";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub api: ApiConfig,
  #[serde(default)]
  pub fallback: FallbackConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  /// Backend base URL, e.g. "http://localhost:8000". Unset means mock mode
  /// unless `mode` says otherwise.
  pub base_url: Option<String>,
  /// Explicit routing mode: remote, mock, or fallback
  pub mode: Option<ApiMode>,
  /// Force mock mode regardless of everything else
  #[serde(default)]
  pub force_mock: bool,
  /// Bound on each backend request, in milliseconds
  #[serde(default = "default_timeout_ms")]
  pub timeout_ms: u64,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      base_url: None,
      mode: None,
      force_mock: false,
      timeout_ms: default_timeout_ms(),
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FallbackConfig {
  /// Keep the local store on disk (otherwise it lives in memory)
  #[serde(default = "default_persist")]
  pub persist: bool,
  /// Database file for the local store (defaults to the data directory)
  pub path: Option<PathBuf>,
  /// Artificial delay added to every local store operation
  #[serde(default = "default_latency_ms")]
  pub simulated_latency_ms: u64,
  /// Reject employees whose id already exists in the local store
  #[serde(default)]
  pub unique_employee_ids: bool,
}

impl Default for FallbackConfig {
  fn default() -> Self {
    Self {
      persist: default_persist(),
      path: None,
      simulated_latency_ms: default_latency_ms(),
      unique_employee_ids: false,
    }
  }
}

fn default_timeout_ms() -> u64 {
  2000
}

fn default_persist() -> bool {
  true
}

fn default_latency_ms() -> u64 {
  50
}

impl Config {
  /// Load configuration from file, then apply environment overrides.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./hrms.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/hrms/config.yaml
  ///
  /// With no file found, defaults are used.
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

    // No file is fine: everything has a default, see config.example.yaml
    let config = match path {
      Some(p) => Self::load_from_path(&p)?,
      None => Config::default(),
    };

    Ok(config.with_overrides(
      std::env::var(ENV_API_URL).ok(),
      std::env::var(ENV_FORCE_MOCK).ok().as_deref().map(parse_flag),
    ))
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("hrms.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("hrms").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::from_yaml(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  pub fn from_yaml(contents: &str) -> Result<Self> {
    // An empty file is a valid, all-defaults config
    if contents.trim().is_empty() {
      return Ok(Config::default());
    }
    serde_yaml::from_str(contents).map_err(|e| eyre!("{}", e))
  }

  /// Apply overrides from the environment or the command line.
  /// `None` leaves the current value alone.
  pub fn with_overrides(mut self, base_url: Option<String>, force_mock: Option<bool>) -> Self {
    if let Some(url) = base_url {
      self.api.base_url = Some(url);
    }
    if let Some(force) = force_mock {
      self.api.force_mock = force;
    }
    self
  }

  /// The backend URL, if one is configured.
  pub fn base_url(&self) -> Option<&str> {
    self
      .api
      .base_url
      .as_deref()
      .map(str::trim)
      .filter(|url| !url.is_empty())
  }

  /// Decide the routing mode for this process.
  ///
  /// Force-mock wins, then an explicit mode, then the presence of a base URL.
  pub fn resolve_mode(&self) -> Result<ApiMode> {
    if self.api.force_mock {
      return Ok(ApiMode::Mock);
    }

    let mode = match (self.api.mode, self.base_url()) {
      (Some(mode), _) => mode,
      (None, Some(_)) => ApiMode::Fallback,
      (None, None) => ApiMode::Mock,
    };

    if mode != ApiMode::Mock && self.base_url().is_none() {
      return Err(eyre!(
        "api.mode is '{}' but no backend URL is configured. Set api.base_url or {}.",
        mode,
        ENV_API_URL
      ));
    }

    Ok(mode)
  }

  pub fn timeout(&self) -> Duration {
    Duration::from_millis(self.api.timeout_ms)
  }

  pub fn simulated_latency(&self) -> Duration {
    Duration::from_millis(self.fallback.simulated_latency_ms)
  }
}

/// Interpret an environment flag: 1, true, yes and on are truthy.
pub fn parse_flag(value: &str) -> bool {
  matches!(
    value.trim().to_lowercase().as_str(),
    "1" | "true" | "yes" | "on"
  )
}
