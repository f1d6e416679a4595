//! Error types for the recommendation pipeline

use crate::survey::RatingError;

pub type Result<T> = std::result::Result<T, RecommenderError>;

#[derive(Debug, thiserror::Error)]
pub enum RecommenderError {
    #[error("Configuration error: {message}")]
    Configuration {
        message: String,
        key: Option<String>,
    },

    #[error("Index {index} out of range for {len} users")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Invalid rating: {0}")]
    InvalidRating(#[from] RatingError),

    #[error("Dataset error: {0}")]
    Dataset(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Background task failed: {0}")]
    Task(String),
}

impl RecommenderError {
    pub fn configuration(message: impl Into<String>) -> Self {
        RecommenderError::Configuration {
            message: message.into(),
            key: None,
        }
    }

    pub fn configuration_key(message: impl Into<String>, key: impl Into<String>) -> Self {
        RecommenderError::Configuration {
            message: message.into(),
            key: Some(key.into()),
        }
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, RecommenderError::Configuration { .. })
    }
}

impl From<config::ConfigError> for RecommenderError {
    fn from(err: config::ConfigError) -> Self {
        RecommenderError::configuration(err.to_string())
    }
}

impl From<tokio::task::JoinError> for RecommenderError {
    fn from(err: tokio::task::JoinError) -> Self {
        RecommenderError::Task(err.to_string())
    }
}
