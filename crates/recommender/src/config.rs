//! Recommender configuration
//!
//! Layered loading: built-in defaults, then an optional
//! `config/recommender.{toml,yaml,json}` file, then environment variables with
//! the `RECOMMENDER` prefix and `__` as the section separator
//! (e.g. `RECOMMENDER_FACTORIZATION__STEPS=2000`).

use crate::dataset::MAX_RAW_RATING;
use crate::error::{RecommenderError, Result};
use serde::{Deserialize, Serialize};

/// Top-level recommender configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RecommenderConfig {
    /// Gradient descent parameters
    pub factorization: FactorizationConfig,

    /// K-means parameters used for factor seeding
    pub clustering: ClusteringConfig,

    /// Rating survey parameters
    pub survey: SurveyConfig,

    /// Rating dataset location
    pub dataset: DatasetConfig,

    /// Log output
    pub logging: LoggingConfig,

    /// Report rendering
    pub output: OutputConfig,
}

/// SGD matrix factorization parameters
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FactorizationConfig {
    /// Maximum number of epochs (default: 5000)
    pub steps: usize,

    /// Learning rate (default: 0.0002)
    pub alpha: f64,

    /// L2 regularization weight (default: 0.02)
    pub beta: f64,

    /// Early-stop threshold on the accumulated epoch error (default: 0.001)
    pub tolerance: f64,

    /// Emit a debug log line every N epochs, 0 disables (default: 500)
    pub log_every: usize,
}

impl Default for FactorizationConfig {
    fn default() -> Self {
        Self {
            steps: 5000,
            alpha: 0.0002,
            beta: 0.02,
            tolerance: 0.001,
            log_every: 500,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClusteringConfig {
    /// RNG seed for k-means++ seeding (default: 42)
    pub seed: u64,

    /// Lloyd iterations per run (default: 300)
    pub max_iterations: usize,

    /// Centroid shift tolerance (default: 1e-4)
    pub tolerance: f64,

    /// Independent restarts, lowest inertia wins (default: 10)
    pub n_init: usize,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            max_iterations: 300,
            tolerance: 1e-4,
            n_init: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SurveyConfig {
    /// Number of items the new user is asked to rate (default: 8)
    pub items_to_rate: usize,

    /// Number of recommendations returned (default: 5)
    pub recommendations: usize,

    /// Lowest accepted rating (default: 1)
    pub min_rating: u8,

    /// Highest accepted rating, also the normalization divisor (default: 5)
    pub max_rating: u8,
}

impl Default for SurveyConfig {
    fn default() -> Self {
        Self {
            items_to_rate: 8,
            recommendations: 5,
            min_rating: 1,
            max_rating: 5,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatasetConfig {
    /// CSV file path (default: data.csv)
    pub path: String,

    /// Single-byte field delimiter (default: ";")
    pub delimiter: String,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            path: "data.csv".to_string(),
            delimiter: ";".to_string(),
        }
    }
}

impl DatasetConfig {
    pub fn delimiter_byte(&self) -> Result<u8> {
        match self.delimiter.as_bytes() {
            [byte] => Ok(*byte),
            _ => Err(RecommenderError::configuration_key(
                format!(
                    "delimiter must be a single byte, got {:?}",
                    self.delimiter
                ),
                "dataset.delimiter",
            )),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when RUST_LOG is unset (default: info)
    pub level: String,

    /// JSON log lines instead of human-readable ones
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Print the report as JSON instead of a numbered list
    pub json: bool,
}

impl RecommenderConfig {
    /// Load configuration from `.env`, config file and environment
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let settings = config::Config::builder()
            .add_source(config::File::with_name("config/recommender").required(false))
            .add_source(
                config::Environment::with_prefix("RECOMMENDER")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let f = &self.factorization;
        if f.steps == 0 {
            return Err(RecommenderError::configuration_key(
                "steps must be greater than 0",
                "factorization.steps",
            ));
        }
        if !f.alpha.is_finite() || f.alpha < 0.0 {
            return Err(RecommenderError::configuration_key(
                format!("alpha must be a non-negative number, got {}", f.alpha),
                "factorization.alpha",
            ));
        }
        if !f.beta.is_finite() || f.beta < 0.0 {
            return Err(RecommenderError::configuration_key(
                format!("beta must be a non-negative number, got {}", f.beta),
                "factorization.beta",
            ));
        }

        let c = &self.clustering;
        if c.n_init == 0 {
            return Err(RecommenderError::configuration_key(
                "n_init must be greater than 0",
                "clustering.n_init",
            ));
        }
        if c.max_iterations == 0 {
            return Err(RecommenderError::configuration_key(
                "max_iterations must be greater than 0",
                "clustering.max_iterations",
            ));
        }

        let s = &self.survey;
        if s.items_to_rate == 0 {
            return Err(RecommenderError::configuration_key(
                "items_to_rate must be greater than 0",
                "survey.items_to_rate",
            ));
        }
        // 0 is reserved for "unrated"
        if s.min_rating == 0 || s.min_rating > s.max_rating {
            return Err(RecommenderError::configuration_key(
                format!(
                    "rating scale {}..={} is invalid, the lower bound must be at least 1",
                    s.min_rating, s.max_rating
                ),
                "survey.min_rating",
            ));
        }
        // Survey answers and dataset ratings share one scale
        if s.max_rating != MAX_RAW_RATING {
            return Err(RecommenderError::configuration_key(
                format!(
                    "max_rating must be {} to match the dataset, got {}",
                    MAX_RAW_RATING, s.max_rating
                ),
                "survey.max_rating",
            ));
        }

        self.dataset.delimiter_byte()?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = RecommenderConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.factorization.steps, 5000);
        assert_eq!(config.factorization.alpha, 0.0002);
        assert_eq!(config.factorization.beta, 0.02);
        assert_eq!(config.survey.items_to_rate, 8);
        assert_eq!(config.dataset.delimiter_byte().unwrap(), b';');
    }

    #[test]
    fn test_zero_steps_rejected() {
        let mut config = RecommenderConfig::default();
        config.factorization.steps = 0;
        let err = config.validate().unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_zero_lower_rating_bound_rejected() {
        let mut config = RecommenderConfig::default();
        config.survey.min_rating = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rating_ceiling_must_match_dataset() {
        let mut config = RecommenderConfig::default();
        config.survey.max_rating = 3;
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            RecommenderError::Configuration { ref key, .. } if key.as_deref() == Some("survey.max_rating")
        ));

        config.survey.max_rating = 7;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_multi_byte_delimiter_rejected() {
        let mut config = RecommenderConfig::default();
        config.dataset.delimiter = ";;".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let settings = config::Config::builder()
            .add_source(config::File::from_str(
                "[factorization]\nsteps = 100\n",
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap();
        let config: RecommenderConfig = settings.try_deserialize().unwrap();

        assert_eq!(config.factorization.steps, 100);
        assert_eq!(config.factorization.beta, 0.02);
        assert_eq!(config.clustering.seed, 42);
    }
}
