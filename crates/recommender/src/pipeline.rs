//! Recommendation request pipeline
//!
//! Each request carries its own snapshot of the dataset and the new user's
//! answers; nothing survives between requests. `run` is the blocking
//! pipeline, `spawn` moves it onto tokio's blocking pool so an interactive
//! caller keeps responding while the factorization runs.

use crate::clustering::ClusterInitializer;
use crate::config::{ClusteringConfig, FactorizationConfig};
use crate::dataset::{normalize, Dataset};
use crate::error::{RecommenderError, Result};
use crate::matrix_factorization::MatrixFactorization;
use crate::recommendation::{GenerateRecommendations, Recommendation};
use crate::survey::UserRatings;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, info_span};
use uuid::Uuid;

/// Everything one recommendation request needs
#[derive(Debug, Clone)]
pub struct RecommendationRequest {
    pub request_id: Uuid,
    pub dataset: Arc<Dataset>,
    pub user_ratings: UserRatings,
    /// Number of recommendations to return
    pub count: usize,
    /// Divisor used to bring raw ratings into [0, 1]
    pub scale_max: u8,
    pub factorization: FactorizationConfig,
    pub clustering: ClusteringConfig,
}

impl RecommendationRequest {
    pub fn new(dataset: Arc<Dataset>, user_ratings: UserRatings, count: usize) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            dataset,
            user_ratings,
            count,
            scale_max: 5,
            factorization: FactorizationConfig::default(),
            clustering: ClusteringConfig::default(),
        }
    }

    pub fn with_factorization(mut self, config: FactorizationConfig) -> Self {
        self.factorization = config;
        self
    }

    pub fn with_clustering(mut self, config: ClusteringConfig) -> Self {
        self.clustering = config;
        self
    }

    pub fn with_scale_max(mut self, scale_max: u8) -> Self {
        self.scale_max = scale_max;
        self
    }
}

/// Outcome of a request
#[derive(Debug, Clone, Serialize)]
pub struct RecommendationReport {
    pub request_id: Uuid,
    pub recommendations: Vec<Recommendation>,
    /// Factorization epochs run
    pub epochs: usize,
    pub final_error: f64,
    pub converged: bool,
    pub generated_at: DateTime<Utc>,
}

/// Run the whole pipeline on the calling thread
///
/// Steps:
/// 1. Append the new user's row and normalize ratings to [0, 1]
/// 2. K = number of distinct themes
/// 3. Seed P and Q from k-means partitions
/// 4. Fit P and Q with SGD
/// 5. nR = P·Qᵗ, rank the new user's unrated items
pub fn run(request: RecommendationRequest) -> Result<RecommendationReport> {
    let span = info_span!("recommendation", request_id = %request.request_id);
    let _guard = span.enter();

    let dataset = &request.dataset;
    let raw = dataset.with_user(request.user_ratings.as_row())?;
    let ratings = normalize(&raw, request.scale_max);
    let (n, m) = ratings.dim();
    let k = dataset.theme_count();
    let user_index = n - 1;

    info!(
        users = n,
        items = m,
        latent_factors = k,
        rated = request.user_ratings.rated_count(),
        "starting recommendation"
    );

    let (p, q) = ClusterInitializer::new(request.clustering.clone()).initialize(&ratings, n, m, k)?;

    let outcome = MatrixFactorization::new(request.factorization.clone()).fit(&ratings, p, q, k)?;
    let predictions = MatrixFactorization::predict(&outcome.user_factors, &outcome.item_factors);

    let recommendations = GenerateRecommendations::execute(
        user_index,
        &ratings,
        &predictions,
        dataset.titles(),
        dataset.themes(),
        request.count,
    )?;

    info!(count = recommendations.len(), "recommendations ready");

    Ok(RecommendationReport {
        request_id: request.request_id,
        recommendations,
        epochs: outcome.epochs,
        final_error: outcome.final_error,
        converged: outcome.converged,
        generated_at: Utc::now(),
    })
}

/// Handle to a pipeline running on the blocking pool
pub struct PendingRecommendation {
    request_id: Uuid,
    handle: JoinHandle<Result<RecommendationReport>>,
}

impl PendingRecommendation {
    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the report; a panicked or cancelled task becomes `Task`
    pub async fn wait(self) -> Result<RecommendationReport> {
        match self.handle.await {
            Ok(result) => result,
            Err(err) => Err(RecommenderError::from(err)),
        }
    }
}

/// Submit the pipeline to the tokio blocking pool
///
/// Must be called from within a tokio runtime.
pub fn spawn(request: RecommendationRequest) -> PendingRecommendation {
    let request_id = request.request_id;
    let handle = tokio::task::spawn_blocking(move || run(request));
    PendingRecommendation { request_id, handle }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::survey::parse_rating;
    use ndarray::array;

    fn dataset() -> Arc<Dataset> {
        Arc::new(
            Dataset::from_parts(
                vec!["drama".into(), "comedy".into(), "drama".into(), "comedy".into()],
                vec!["A".into(), "B".into(), "C".into(), "D".into()],
                array![[5u8, 0, 4, 1], [0, 5, 1, 4], [4, 1, 5, 0]],
            )
            .unwrap(),
        )
    }

    fn fast() -> FactorizationConfig {
        FactorizationConfig {
            steps: 200,
            alpha: 0.01,
            ..FactorizationConfig::default()
        }
    }

    #[test]
    fn test_run_recommends_only_unrated_items() {
        let mut answers = UserRatings::new(4);
        answers.set(0, parse_rating("5", 1..=5).unwrap());
        answers.set(3, parse_rating("2", 1..=5).unwrap());

        let request = RecommendationRequest::new(dataset(), answers, 5).with_factorization(fast());
        let request_id = request.request_id;
        let report = run(request).unwrap();

        assert_eq!(report.request_id, request_id);
        let items: Vec<usize> = report.recommendations.iter().map(|r| r.item_index).collect();
        assert_eq!(items.len(), 2);
        assert!(items.iter().all(|i| *i == 1 || *i == 2));
        assert!(report.epochs <= 200);
    }

    #[test]
    fn test_run_rejects_wrong_row_length() {
        let request = RecommendationRequest::new(dataset(), UserRatings::new(3), 5);
        assert!(run(request).is_err());
    }

    #[tokio::test]
    async fn test_spawn_delivers_report() {
        let mut answers = UserRatings::new(4);
        answers.set(1, parse_rating("4", 1..=5).unwrap());

        let request = RecommendationRequest::new(dataset(), answers, 2).with_factorization(fast());
        let pending = spawn(request);
        let request_id = pending.request_id();

        let report = pending.wait().await.unwrap();
        assert_eq!(report.request_id, request_id);
        assert_eq!(report.recommendations.len(), 2);
    }
}
