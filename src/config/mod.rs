use crate::errors::{AppError, AppResult};
use crate::models::slot::{Slot, default_slots};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Which `GpioLines` implementation drives the slots.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Sysfs,
    Simulated,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: String,
    #[serde(default = "default_listen")]
    pub listen: String,
    #[serde(default = "default_threshold_cm")]
    pub threshold_cm: f64,
    #[serde(default = "default_sweep_interval_ms")]
    pub sweep_interval_ms: u64,
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
    #[serde(default = "default_trigger_pulse_us")]
    pub trigger_pulse_us: u64,
    #[serde(default = "default_echo_timeout_ms")]
    pub echo_timeout_ms: u64,
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_backend")]
    pub backend: Backend,
    #[serde(default = "default_slots")]
    pub slots: Vec<Slot>,
    /// Object distance (cm) per slot id answered by the simulated backend.
    /// Slots not listed see nothing in range.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub simulated_cm: BTreeMap<u32, f64>,
}

fn default_listen() -> String {
    "127.0.0.1:5055".to_string()
}
fn default_threshold_cm() -> f64 {
    10.0
}
fn default_sweep_interval_ms() -> u64 {
    1000
}
fn default_settle_ms() -> u64 {
    50
}
fn default_trigger_pulse_us() -> u64 {
    10
}
fn default_echo_timeout_ms() -> u64 {
    40
}
fn default_history_limit() -> usize {
    50
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_backend() -> Backend {
    Backend::Sysfs
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: Self::database_file().to_string_lossy().to_string(),
            listen: default_listen(),
            threshold_cm: default_threshold_cm(),
            sweep_interval_ms: default_sweep_interval_ms(),
            settle_ms: default_settle_ms(),
            trigger_pulse_us: default_trigger_pulse_us(),
            echo_timeout_ms: default_echo_timeout_ms(),
            history_limit: default_history_limit(),
            log_level: default_log_level(),
            backend: default_backend(),
            slots: default_slots(),
            simulated_cm: BTreeMap::new(),
        }
    }
}

/// Timing of one trigger/echo cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EchoTiming {
    pub settle: Duration,
    pub trigger_pulse: Duration,
    pub echo_timeout: Duration,
}

impl Default for EchoTiming {
    fn default() -> Self {
        Self {
            settle: Duration::from_millis(default_settle_ms()),
            trigger_pulse: Duration::from_micros(default_trigger_pulse_us()),
            echo_timeout: Duration::from_millis(default_echo_timeout_ms()),
        }
    }
}

impl Config {
    /// Return the standard configuration directory (`~/.parkmon`)
    pub fn config_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".parkmon")
    }

    /// Return the full path of the config file
    pub fn config_file() -> PathBuf {
        Self::config_dir().join("parkmon.conf")
    }

    /// Return the full path of the SQLite database
    pub fn database_file() -> PathBuf {
        Self::config_dir().join("parkmon.sqlite")
    }

    /// Load configuration from `path` (or the standard location).
    /// A missing file yields the defaults; an unreadable or malformed one is an error.
    pub fn load(path: Option<&Path>) -> AppResult<Self> {
        let path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(Self::config_file);

        let cfg = if path.exists() {
            let content = fs::read_to_string(&path)?;
            serde_yaml::from_str(&content)
                .map_err(|e| AppError::Config(format!("{}: {}", path.display(), e)))?
        } else {
            Config::default()
        };

        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject slot tables that would make two slots share a line or an id.
    pub fn validate(&self) -> AppResult<()> {
        if self.slots.is_empty() {
            return Err(AppError::Config("at least one slot must be configured".into()));
        }

        let mut ids = HashSet::new();
        let mut pins = HashSet::new();
        for slot in &self.slots {
            if slot.id == 0 {
                return Err(AppError::Config("slot id 0 is reserved".into()));
            }
            if !ids.insert(slot.id) {
                return Err(AppError::Config(format!("duplicate slot id {}", slot.id)));
            }
            for pin in slot.pins() {
                if !pins.insert(pin) {
                    return Err(AppError::Config(format!(
                        "line {} assigned twice (slot {})",
                        pin, slot.id
                    )));
                }
            }
        }

        for (id, cm) in &self.simulated_cm {
            if !ids.contains(id) {
                return Err(AppError::Config(format!(
                    "simulated_cm names unknown slot {}",
                    id
                )));
            }
            if !cm.is_finite() || *cm < 0.0 {
                return Err(AppError::Config(format!(
                    "simulated_cm for slot {} must be a non-negative distance",
                    id
                )));
            }
        }

        if self.threshold_cm <= 0.0 {
            return Err(AppError::Config("threshold_cm must be positive".into()));
        }
        if self.echo_timeout_ms == 0 {
            return Err(AppError::Config("echo_timeout_ms must be positive".into()));
        }

        Ok(())
    }

    pub fn echo_timing(&self) -> EchoTiming {
        EchoTiming {
            settle: Duration::from_millis(self.settle_ms),
            trigger_pulse: Duration::from_micros(self.trigger_pulse_us),
            echo_timeout: Duration::from_millis(self.echo_timeout_ms),
        }
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }

    /// Initialize configuration and database files
    pub fn init_all(custom_db: Option<String>, is_test: bool) -> AppResult<Config> {
        let dir = Self::config_dir();
        if !is_test {
            fs::create_dir_all(&dir)?;
        }

        // DB name: user provided or default
        let db_path = match custom_db {
            Some(name) => {
                let p = Path::new(&name);
                if p.is_absolute() {
                    p.to_path_buf()
                } else {
                    dir.join(p)
                }
            }
            None => Self::database_file(),
        };

        let config = Config {
            database: db_path.to_string_lossy().to_string(),
            ..Config::default()
        };

        // Write config file
        if !is_test {
            let yaml = serde_yaml::to_string(&config)
                .map_err(|e| AppError::Config(e.to_string()))?;
            let mut file = fs::File::create(Self::config_file())?;
            file.write_all(yaml.as_bytes())?;
        }

        if let Some(parent) = db_path.parent() {
            fs::create_dir_all(parent)?;
        }

        Ok(config)
    }
}
