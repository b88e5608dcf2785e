//! TOML configuration loading and validation.

use std::path::{Path, PathBuf};

use allotment::{AlwaysRebalance, BuyOnly, PlanOptions, RoundingPolicy, Strategy};
use serde::Deserialize;

use crate::error::{Error, Result};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub broker: BrokerConfig,
    #[serde(default)]
    pub planner: PlannerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BrokerConfig {
    /// JSON file with account snapshots and quotes.
    #[serde(default = "default_snapshot_file")]
    pub snapshot_file: String,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            snapshot_file: default_snapshot_file(),
        }
    }
}

fn default_snapshot_file() -> String {
    "snapshot.json".into()
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlannerConfig {
    #[serde(default)]
    pub rounding: RoundingPolicy,
    /// Sell overweight and untargeted positions. Turn off for taxable accounts.
    #[serde(default = "default_true")]
    pub allow_sells: bool,
    #[serde(default)]
    pub drift_threshold_pct: f64,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            rounding: RoundingPolicy::default(),
            allow_sells: true,
            drift_threshold_pct: 0.0,
        }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_dir")]
    pub dir: String,
    #[serde(default = "default_audit_file")]
    pub audit_file: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: default_log_dir(),
            audit_file: default_audit_file(),
        }
    }
}

fn default_log_dir() -> String {
    "./logs".into()
}
fn default_audit_file() -> String {
    "audit.jsonl".into()
}

impl Config {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::ConfigRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_toml(&contents)
    }

    /// Parse and validate a TOML string.
    pub fn from_toml(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate config invariants. Call again after applying CLI overrides.
    pub fn validate(&self) -> Result<()> {
        if self.broker.snapshot_file.trim().is_empty() {
            return Err(Error::Config("snapshot_file must not be empty".into()));
        }
        if self.logging.dir.trim().is_empty() {
            return Err(Error::Config("logging dir must not be empty".into()));
        }
        if self.logging.audit_file.trim().is_empty() {
            return Err(Error::Config("audit_file must not be empty".into()));
        }
        let threshold = self.planner.drift_threshold_pct;
        if !threshold.is_finite() || !(0.0..=100.0).contains(&threshold) {
            return Err(Error::Config(format!(
                "drift_threshold_pct must be in [0, 100], got {threshold}"
            )));
        }
        Ok(())
    }

    /// Full path to the audit log file.
    pub fn audit_path(&self) -> PathBuf {
        Path::new(&self.logging.dir).join(&self.logging.audit_file)
    }

    pub fn snapshot_path(&self) -> PathBuf {
        PathBuf::from(&self.broker.snapshot_file)
    }

    pub fn plan_options(&self) -> PlanOptions {
        PlanOptions {
            rounding: self.planner.rounding,
            drift_threshold_pct: self.planner.drift_threshold_pct,
        }
    }

    /// `AlwaysRebalance` when sells are allowed, `BuyOnly` otherwise.
    pub fn strategy(&self) -> Box<dyn Strategy> {
        let options = self.plan_options();
        if self.planner.allow_sells {
            Box::new(AlwaysRebalance::new(options))
        } else {
            Box::new(BuyOnly::new(options))
        }
    }
}
