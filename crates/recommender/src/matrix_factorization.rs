//! Matrix Factorization using regularized Stochastic Gradient Descent
//!
//! Fits user factors P (N x K) and item factors Q (M x K) so that P·Qᵗ
//! approximates the observed entries of the rating matrix R. An entry is
//! observed iff it is strictly positive; 0 marks "not rated".
//!
//! Updates are applied per observed entry, in row-major order, and for each
//! latent dimension `k` the user factor is updated first. The item update for
//! the same `k` reads the already-updated user factor.

use crate::config::FactorizationConfig;
use crate::error::{RecommenderError, Result};
use ndarray::Array2;
use tracing::{debug, info};

/// Fitted factors and training statistics
#[derive(Debug, Clone)]
pub struct FactorizationOutcome {
    /// User latent factors: [num_users x latent_factors]
    pub user_factors: Array2<f64>,
    /// Item latent factors: [num_items x latent_factors]
    pub item_factors: Array2<f64>,
    /// Epochs actually run
    pub epochs: usize,
    /// Accumulated error of the last epoch
    pub final_error: f64,
    /// Whether the error dropped below the tolerance before the epoch cap
    pub converged: bool,
}

/// SGD-based matrix factorization
pub struct MatrixFactorization {
    config: FactorizationConfig,
}

impl MatrixFactorization {
    pub fn new(config: FactorizationConfig) -> Self {
        Self { config }
    }

    pub fn with_default_config() -> Self {
        Self::new(FactorizationConfig::default())
    }

    pub fn config(&self) -> &FactorizationConfig {
        &self.config
    }

    /// Train P and Q against the observed entries of `r`
    ///
    /// Takes ownership of the seed factors and hands back the refined ones.
    /// Runs at most `steps` epochs and stops after the first epoch whose
    /// accumulated error is below `tolerance`. There is no divergence guard.
    pub fn fit(
        &self,
        r: &Array2<f64>,
        mut p: Array2<f64>,
        mut q: Array2<f64>,
        k: usize,
    ) -> Result<FactorizationOutcome> {
        let (n, m) = r.dim();
        if p.dim() != (n, k) {
            return Err(RecommenderError::configuration(format!(
                "user factors are {}x{}, expected {}x{}",
                p.nrows(),
                p.ncols(),
                n,
                k
            )));
        }
        if q.dim() != (m, k) {
            return Err(RecommenderError::configuration(format!(
                "item factors are {}x{}, expected {}x{}",
                q.nrows(),
                q.ncols(),
                m,
                k
            )));
        }

        let alpha = self.config.alpha;
        let beta = self.config.beta;
        let mut epochs = 0;
        let mut error = 0.0;
        let mut converged = false;

        for step in 0..self.config.steps {
            error = Self::epoch(r, &mut p, &mut q, k, alpha, beta);
            epochs = step + 1;

            if self.config.log_every > 0 && step % self.config.log_every == 0 {
                debug!("SGD epoch {}: error = {:.6}", step, error);
            }

            if error < self.config.tolerance {
                converged = true;
                break;
            }
        }

        info!(
            epochs,
            error,
            converged,
            observed = Self::observed_entries(r),
            "matrix factorization finished"
        );

        Ok(FactorizationOutcome {
            user_factors: p,
            item_factors: q,
            epochs,
            final_error: error,
            converged,
        })
    }

    /// One pass over every observed entry; returns the accumulated error
    fn epoch(
        r: &Array2<f64>,
        p: &mut Array2<f64>,
        q: &mut Array2<f64>,
        k: usize,
        alpha: f64,
        beta: f64,
    ) -> f64 {
        let mut error = 0.0;

        for (i, ratings) in r.outer_iter().enumerate() {
            for (j, &rating) in ratings.iter().enumerate() {
                if !(rating > 0.0) {
                    continue;
                }

                let mut user = p.row_mut(i);
                let mut item = q.row_mut(j);

                let prediction = user.dot(&item);
                let eij = rating - prediction;

                error += eij * eij;
                for f in 0..k {
                    error += (beta / 2.0) * (user[f] * user[f] + item[f] * item[f]);
                }

                for f in 0..k {
                    user[f] += alpha * (2.0 * eij * item[f] - beta * user[f]);
                    item[f] += alpha * (2.0 * eij * user[f] - beta * item[f]);
                }
            }
        }

        error
    }

    /// Count of entries that take part in training
    pub fn observed_entries(r: &Array2<f64>) -> usize {
        r.iter().filter(|&&v| v > 0.0).count()
    }

    /// Reconstruct the full prediction matrix nR = P·Qᵗ
    pub fn predict(user_factors: &Array2<f64>, item_factors: &Array2<f64>) -> Array2<f64> {
        user_factors.dot(&item_factors.t())
    }
}

/// `factorize(R, P, Q, K, steps, alpha, beta) -> (P, Q)`
pub fn factorize(
    r: &Array2<f64>,
    p: Array2<f64>,
    q: Array2<f64>,
    k: usize,
    steps: usize,
    alpha: f64,
    beta: f64,
) -> Result<(Array2<f64>, Array2<f64>)> {
    let engine = MatrixFactorization::new(FactorizationConfig {
        steps,
        alpha,
        beta,
        ..FactorizationConfig::default()
    });
    let outcome = engine.fit(r, p, q, k)?;
    Ok((outcome.user_factors, outcome.item_factors))
}

/// Prediction matrix nR = P·Qᵗ
pub fn predict(user_factors: &Array2<f64>, item_factors: &Array2<f64>) -> Array2<f64> {
    MatrixFactorization::predict(user_factors, item_factors)
}
