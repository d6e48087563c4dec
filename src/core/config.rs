use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::profiler::SamplerConfig;
use crate::error::{ProcwatchError, Result};

pub const MAX_BAR_WIDTH: usize = 200;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Seconds between sampling cycles
    pub interval_secs: f64,
    /// Points kept per history series
    pub history_capacity: usize,
    /// Upper bound for a single OS query
    pub query_timeout_ms: u64,
    /// Timed out cycles in a row before the session fails
    pub max_consecutive_timeouts: u32,
    /// Path whose filesystem is reported in host metrics
    pub disk_path: String,
    /// Width of the usage bars (cosmetic)
    pub bar_width: usize,
    /// Also terminate the target on a normal shutdown
    pub terminate_on_exit: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            interval_secs: 1.0,
            history_capacity: crate::core::profiler::DEFAULT_HISTORY_SIZE,
            query_timeout_ms: 2000,
            max_consecutive_timeouts: 3,
            disk_path: default_disk_path().to_string(),
            bar_width: 50,
            terminate_on_exit: true,
        }
    }
}

#[cfg(windows)]
fn default_disk_path() -> &'static str {
    "C:\\"
}

#[cfg(not(windows))]
fn default_disk_path() -> &'static str {
    "/"
}

impl Config {
    /// Load from the user config file, falling back to defaults when absent.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let data = fs::read_to_string(path).map_err(|e| {
            ProcwatchError::config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        if data.trim().is_empty() {
            return Ok(Config::default());
        }

        serde_json::from_str(&data)
            .map_err(|e| ProcwatchError::config(format!("Invalid config file {:?}: {}", path, e)))
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_string_pretty(self)?;
        fs::write(path, data)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| ProcwatchError::config("Could not determine config directory"))?;

        Ok(config_dir.join("procwatch").join("config.json"))
    }

    pub fn validate(&self) -> Result<()> {
        if !self.interval_secs.is_finite() || self.interval_secs <= 0.0 {
            return Err(ProcwatchError::config(format!(
                "interval must be a positive number of seconds, got {}",
                self.interval_secs
            )));
        }
        if self.history_capacity == 0 {
            return Err(ProcwatchError::config("history capacity must be at least 1"));
        }
        if self.query_timeout_ms == 0 {
            return Err(ProcwatchError::config("query timeout must be at least 1 ms"));
        }
        if self.max_consecutive_timeouts == 0 {
            return Err(ProcwatchError::config(
                "max consecutive timeouts must be at least 1",
            ));
        }
        if self.bar_width == 0 || self.bar_width > MAX_BAR_WIDTH {
            return Err(ProcwatchError::config(format!(
                "bar width must be between 1 and {}, got {}",
                MAX_BAR_WIDTH, self.bar_width
            )));
        }
        if self.disk_path.trim().is_empty() {
            return Err(ProcwatchError::config("disk path must not be empty"));
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs_f64(self.interval_secs)
    }

    /// Sampler settings derived from this config.
    pub fn sampler_config(&self, max_cycles: Option<u64>) -> SamplerConfig {
        SamplerConfig {
            interval: self.interval(),
            query_timeout: Duration::from_millis(self.query_timeout_ms),
            max_consecutive_timeouts: self.max_consecutive_timeouts,
            history_capacity: self.history_capacity,
            terminate_on_stop: self.terminate_on_exit,
            terminate_on_failure: true,
            max_cycles,
        }
    }
}
