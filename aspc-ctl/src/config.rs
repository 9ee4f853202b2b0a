//! Configuration for aspc-ctl
//!
//! Loaded once at startup from a TOML file (see `aspc_common::config` for
//! how the file is located). Every key is optional; command-line arguments
//! override the file.
//!
//! ```toml
//! port = 5780
//! junctions = ["J001", "J002"]
//! tick_interval_ms = 1000
//!
//! [channel]
//! backend = "sqlite"
//! db_path = "/var/lib/aspc/commands.db"
//!
//! [simulation]
//! enabled = true
//! spike_probability = 0.1
//!
//! [tuning]
//! fairness_cap = 2
//! max_green_s = 60
//!
//! [tuning.pcu_weights]
//! bus = 3.0
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use aspc_common::config::{load_toml, LoggingConfig};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::signal::ControllerTuning;

/// Where override commands are stored between submission and polling
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ChannelBackend {
    /// Process-local store; commands are lost on restart
    #[default]
    Memory,
    /// SQLite table shared by every process pointed at the same file
    Sqlite,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChannelConfig {
    #[serde(default)]
    pub backend: ChannelBackend,
    /// Database file for the sqlite backend
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            backend: ChannelBackend::default(),
            db_path: default_db_path(),
        }
    }
}

/// Synthetic demand generator settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimulationConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_simulation_interval_ms")]
    pub interval_ms: u64,
    /// Chance per reading that one approach surges
    #[serde(default = "default_spike_probability")]
    pub spike_probability: f64,
    /// Fixed seed for reproducible runs
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_ms: default_simulation_interval_ms(),
            spike_probability: default_spike_probability(),
            seed: None,
        }
    }
}

/// Top-level service configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Junction ids this instance may observe; all are started at boot
    #[serde(default = "default_junctions")]
    pub junctions: Vec<String>,

    /// Scheduling interval for every junction controller
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Upper bound on one command poll before the tick proceeds without it
    #[serde(default = "default_poll_timeout_ms")]
    pub poll_timeout_ms: u64,

    #[serde(default = "default_event_bus_capacity")]
    pub event_bus_capacity: usize,

    #[serde(default)]
    pub channel: ChannelConfig,

    #[serde(default)]
    pub simulation: SimulationConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub tuning: ControllerTuning,
}

fn default_port() -> u16 {
    5780
}

fn default_junctions() -> Vec<String> {
    (1..=5).map(|n| format!("J{:03}", n)).collect()
}

fn default_tick_interval_ms() -> u64 {
    1000
}

fn default_poll_timeout_ms() -> u64 {
    250
}

fn default_event_bus_capacity() -> usize {
    1000
}

fn default_db_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("aspc")
        .join("commands.db")
}

fn default_simulation_interval_ms() -> u64 {
    2000
}

fn default_spike_probability() -> f64 {
    0.1
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: default_port(),
            junctions: default_junctions(),
            tick_interval_ms: default_tick_interval_ms(),
            poll_timeout_ms: default_poll_timeout_ms(),
            event_bus_capacity: default_event_bus_capacity(),
            channel: ChannelConfig::default(),
            simulation: SimulationConfig::default(),
            logging: LoggingConfig::default(),
            tuning: ControllerTuning::default(),
        }
    }
}

impl Config {
    /// Load from `path` (or defaults) and validate
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config: Config = load_toml(path)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.tick_interval_ms == 0 {
            return Err(Error::Config("tick_interval_ms must be positive".to_string()));
        }
        if self.poll_timeout_ms == 0 {
            return Err(Error::Config("poll_timeout_ms must be positive".to_string()));
        }
        if self.event_bus_capacity == 0 {
            return Err(Error::Config("event_bus_capacity must be positive".to_string()));
        }
        if let Some(blank) = self.junctions.iter().find(|j| j.trim().is_empty()) {
            return Err(Error::Config(format!("invalid junction id '{}'", blank)));
        }
        let p = self.simulation.spike_probability;
        if !(0.0..=1.0).contains(&p) {
            return Err(Error::Config(format!(
                "simulation.spike_probability must be within [0, 1] (got {})",
                p
            )));
        }
        self.tuning.validate().map_err(Error::Config)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aspc_common::events::Direction;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.port, 5780);
        assert_eq!(config.junctions, vec!["J001", "J002", "J003", "J004", "J005"]);
        assert_eq!(config.channel.backend, ChannelBackend::Memory);
        assert!(!config.simulation.enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
port = 6000
junctions = ["A1"]

[channel]
backend = "sqlite"

[tuning]
initial_phase = "W"
"#
        )
        .unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.port, 6000);
        assert_eq!(config.junctions, vec!["A1"]);
        assert_eq!(config.channel.backend, ChannelBackend::Sqlite);
        assert_eq!(config.tuning.initial_phase, Direction::West);
        assert_eq!(config.tick_interval_ms, 1000);
    }

    #[test]
    fn test_invalid_tuning_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[tuning]\nmin_green_s = 90\n").unwrap();
        let err = Config::load(Some(file.path())).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_spike_probability_bounds() {
        let mut config = Config::default();
        config.simulation.spike_probability = 1.5;
        assert!(config.validate().is_err());
    }
}
