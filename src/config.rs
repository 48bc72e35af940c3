//! Configuration for the detector trainer and the segment service

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors for loading or validating configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Hyperparameters and policy for training the phantom-jam detector
///
/// # Example
/// ```
/// use phantom_jam::config::DetectorConfig;
///
/// let config = DetectorConfig::default();
/// assert_eq!(config.eps, 0.55);
/// assert_eq!(config.min_samples, 4);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// DBSCAN neighborhood radius in standardized feature space
    pub eps: f64,

    /// DBSCAN minimum neighborhood size (the point itself included)
    pub min_samples: usize,

    /// Share of rows held out for evaluation
    pub test_fraction: f64,

    /// Seed for the stratified split
    pub seed: u64,

    /// Percentile of jam-row anomaly scores used as the threshold when the
    /// training partition contains jams
    ///
    /// Low values favor recall on jams over false positives.
    pub jam_percentile: f64,

    /// Percentile of all training anomaly scores used when the training
    /// partition has no jam rows
    pub fallback_percentile: f64,

    /// Compress the saved artifact with zstd
    pub compress: bool,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            eps: 0.55,
            min_samples: 4,
            test_fraction: 0.20,
            seed: 42,
            jam_percentile: 30.0,
            fallback_percentile: 95.0,
            compress: true,
        }
    }
}

impl DetectorConfig {
    /// Parse a TOML document; absent keys keep their defaults
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML config file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Override the split seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.eps.is_finite() && self.eps > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "eps must be a positive number, got {}",
                self.eps
            )));
        }
        if self.min_samples == 0 {
            return Err(ConfigError::Invalid(
                "min_samples must be at least 1".to_string(),
            ));
        }
        if !(self.test_fraction > 0.0 && self.test_fraction < 1.0) {
            return Err(ConfigError::Invalid(format!(
                "test_fraction must be in (0, 1), got {}",
                self.test_fraction
            )));
        }
        for (name, p) in [
            ("jam_percentile", self.jam_percentile),
            ("fallback_percentile", self.fallback_percentile),
        ] {
            if !(0.0..=100.0).contains(&p) {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be in [0, 100], got {p}"
                )));
            }
        }
        Ok(())
    }
}

/// Default development origins allowed by CORS
pub const DEFAULT_CORS_ORIGINS: [&str; 2] = ["http://localhost:3000", "http://127.0.0.1:3000"];

/// Segment query service configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    /// Dataset loaded once at startup
    pub dataset_path: PathBuf,

    /// Bind address
    pub host: String,

    /// Server port
    pub port: u16,

    /// Origins allowed to call the API from a browser
    pub cors_origins: Vec<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            dataset_path: PathBuf::from("dataset.csv"),
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_origins: DEFAULT_CORS_ORIGINS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl ServiceConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from any key lookup, falling back to defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        Self {
            dataset_path: lookup("DATASET_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.dataset_path),

            host: lookup("HOST").unwrap_or(defaults.host),

            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),

            cors_origins: lookup("CORS_ORIGINS")
                .map(|v| {
                    v.split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(String::from)
                        .collect()
                })
                .unwrap_or(defaults.cors_origins),
        }
    }
}
