//! Video Recommender
//!
//! Predicts unseen ratings from a sparse user-item rating matrix and ranks
//! the unseen items for one user:
//!
//! 1. `clustering`: k-means partitions of users and items seed the latent
//!    factor matrices P and Q
//! 2. `matrix_factorization`: regularized SGD fits P and Q to the observed
//!    (non-zero) ratings
//! 3. `recommendation`: nR = P·Qᵗ, unrated items ranked by predicted score
//!
//! `dataset`, `survey` and `pipeline` wrap the core for a single new user.
//!
//! A rating of 0 means "not rated" everywhere in this crate. Ratings are
//! therefore restricted to a scale starting at 1; lowering that bound would
//! silently turn real ratings into missing ones.

pub mod clustering;
pub mod config;
pub mod dataset;
pub mod error;
pub mod logging;
pub mod matrix_factorization;
pub mod pipeline;
pub mod recommendation;
pub mod survey;

// Re-export key types
pub use clustering::{initialize, ClusterInitializer, KMeans, KMeansFit};
pub use self::config::{
    ClusteringConfig, DatasetConfig, FactorizationConfig, LoggingConfig, OutputConfig,
    RecommenderConfig, SurveyConfig,
};
pub use dataset::{normalize, Dataset};
pub use error::{RecommenderError, Result};
pub use logging::init_logging;
pub use matrix_factorization::{factorize, predict, FactorizationOutcome, MatrixFactorization};
pub use pipeline::{PendingRecommendation, RecommendationReport, RecommendationRequest};
pub use recommendation::{recommend, GenerateRecommendations, Recommendation, DEFAULT_RECOMMENDATIONS};
pub use survey::{parse_rating, select_items, Rating, RatingError, UserRatings};

use std::ops::RangeInclusive;
use std::sync::Arc;

/// Recommender engine instance
pub struct RecommenderEngine {
    config: RecommenderConfig,
}

impl RecommenderEngine {
    pub fn new(config: RecommenderConfig) -> Self {
        Self { config }
    }

    pub fn with_default_config() -> Self {
        Self::new(RecommenderConfig::default())
    }

    pub fn config(&self) -> &RecommenderConfig {
        &self.config
    }

    /// Accepted rating scale
    pub fn rating_scale(&self) -> RangeInclusive<u8> {
        self.config.survey.min_rating..=self.config.survey.max_rating
    }

    /// Load the configured dataset
    pub fn load_dataset(&self) -> Result<Dataset> {
        Dataset::load(&self.config.dataset.path, self.config.dataset.delimiter_byte()?)
    }

    /// Validate one survey answer against the configured scale
    pub fn parse_rating(&self, input: &str) -> std::result::Result<Rating, RatingError> {
        survey::parse_rating(input, self.rating_scale())
    }

    /// Build a request carrying this engine's parameters
    pub fn request(&self, dataset: Arc<Dataset>, user_ratings: UserRatings) -> RecommendationRequest {
        RecommendationRequest::new(dataset, user_ratings, self.config.survey.recommendations)
            .with_factorization(self.config.factorization.clone())
            .with_clustering(self.config.clustering.clone())
            .with_scale_max(self.config.survey.max_rating)
    }

    /// Run a request on the calling thread
    pub fn recommend(&self, request: RecommendationRequest) -> Result<RecommendationReport> {
        pipeline::run(request)
    }

    /// Run a request on the blocking pool
    pub fn spawn(&self, request: RecommendationRequest) -> PendingRecommendation {
        pipeline::spawn(request)
    }
}

#[cfg(test)]
mod tests;

#[cfg(test)]
mod engine_tests {
    use super::*;

    #[test]
    fn test_engine_creation() {
        let engine = RecommenderEngine::with_default_config();
        assert_eq!(engine.config().factorization.steps, 5000);
        assert_eq!(engine.config().survey.recommendations, 5);
        assert_eq!(engine.rating_scale(), 1..=5);
    }

    #[test]
    fn test_engine_request_uses_config() {
        let mut config = RecommenderConfig::default();
        config.survey.recommendations = 2;
        config.factorization.steps = 10;
        let engine = RecommenderEngine::new(config);

        let dataset = Arc::new(
            Dataset::from_parts(
                vec!["a".into(), "b".into()],
                vec!["x".into(), "y".into()],
                ndarray::array![[1u8, 2]],
            )
            .unwrap(),
        );
        let request = engine.request(dataset, UserRatings::new(2));

        assert_eq!(request.count, 2);
        assert_eq!(request.factorization.steps, 10);
        assert_eq!(request.scale_max, 5);
    }

    #[test]
    fn test_engine_parse_rating() {
        let engine = RecommenderEngine::with_default_config();
        assert!(engine.parse_rating("3").is_ok());
        assert!(matches!(
            engine.parse_rating("9"),
            Err(RatingError::OutOfRange { .. })
        ));
    }
}
