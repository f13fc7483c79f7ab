//! Run configuration, loadable from TOML.
//!
//! ```toml
//! end_time = 100.0
//! trace_events = true
//!
//! [logging]
//! filter = "desim=debug"
//!
//! [checkpoint]
//! period = 11.0
//! dir = "checkpoints"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

use crate::checkpoint::{CheckpointStore, DirectoryStore, MemoryStore};
use crate::error::{SimError, SimResult};

/// Configuration of one simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Horizon used by `SimulationEngine::run_configured`.
    pub end_time: f64,

    /// Log every dispatched event through a `TracingObserver`.
    pub trace_events: bool,

    pub logging: LoggingConfig,

    pub checkpoint: Option<CheckpointConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// An `EnvFilter` directive, e.g. `"info"` or `"desim=trace"`.
    pub filter: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointConfig {
    /// Simulated time between checkpoints.
    pub period: f64,

    /// Directory for checkpoint files; checkpoints stay in memory if unset.
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            end_time: f64::INFINITY,
            trace_events: false,
            logging: LoggingConfig::default(),
            checkpoint: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

impl SimulationConfig {
    pub fn from_toml_str(content: &str) -> SimResult<Self> {
        let config: Self = toml::from_str(content).map_err(|e| SimError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> SimResult<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Save configuration to file.
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> SimResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| SimError::Config(e.to_string()))?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Reject a NaN or negative end time and a non-positive checkpoint
    /// period.
    pub fn validate(&self) -> SimResult<()> {
        if self.end_time.is_nan() || self.end_time < 0.0 {
            return Err(SimError::InvalidTime(format!("end_time must be >= 0, but is {}", self.end_time)));
        }
        if let Some(checkpoint) = &self.checkpoint {
            if checkpoint.period <= 0.0 || !checkpoint.period.is_finite() {
                return Err(SimError::InvalidPeriod(checkpoint.period));
            }
        }
        Ok(())
    }
}

impl CheckpointConfig {
    /// The configured checkpoint store.
    pub fn store<S>(&self) -> SimResult<Box<dyn CheckpointStore<S>>>
    where
        S: Clone + Serialize + DeserializeOwned + 'static,
    {
        let store: Box<dyn CheckpointStore<S>> = match &self.dir {
            Some(dir) => Box::new(DirectoryStore::new(dir)?),
            None => Box::new(MemoryStore::new()),
        };
        Ok(store)
    }
}

/// Install a global `tracing` subscriber filtered by `config.filter`.
///
/// Returns `Ok(false)` if a subscriber was already installed.
pub fn init_tracing(config: &LoggingConfig) -> SimResult<bool> {
    let filter = EnvFilter::try_new(&config.filter).map_err(|e| SimError::Config(e.to_string()))?;
    Ok(tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .is_ok())
}
