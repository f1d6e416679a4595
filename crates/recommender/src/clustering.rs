//! Cluster-seeded latent factor initialization
//!
//! Users (rows of R) and items (rows of Rᵗ) are partitioned independently with
//! k-means. Each cluster-id sequence, scaled by 1/K, is rotated once per
//! latent column by `c * floor(len / K)` positions and the rotations are
//! stacked as columns. Every user or item therefore carries its membership
//! signal in all K columns at phase-shifted offsets instead of a one-hot
//! encoding.

use crate::config::ClusteringConfig;
use crate::error::{RecommenderError, Result};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

/// Result of a k-means fit
#[derive(Debug, Clone)]
pub struct KMeansFit {
    /// Cluster id per sample, in `[0, n_clusters)`
    pub labels: Vec<usize>,
    /// Centroids: [n_clusters x n_features]
    pub centroids: Array2<f64>,
    /// Sum of squared distances to the assigned centroid
    pub inertia: f64,
    /// Lloyd iterations of the winning run
    pub iterations: usize,
}

/// K-means with k-means++ seeding and Lloyd iterations
#[derive(Debug, Clone)]
pub struct KMeans {
    n_clusters: usize,
    max_iterations: usize,
    tolerance: f64,
    n_init: usize,
    seed: u64,
}

impl KMeans {
    pub fn new(n_clusters: usize) -> Self {
        Self::from_config(n_clusters, &ClusteringConfig::default())
    }

    pub fn from_config(n_clusters: usize, config: &ClusteringConfig) -> Self {
        Self {
            n_clusters,
            max_iterations: config.max_iterations.max(1),
            tolerance: config.tolerance,
            n_init: config.n_init.max(1),
            seed: config.seed,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Cluster the rows of `data`
    pub fn fit(&self, data: ArrayView2<f64>) -> Result<KMeansFit> {
        let n_samples = data.nrows();
        let k = self.n_clusters;

        if k == 0 {
            return Err(RecommenderError::configuration_key(
                "number of clusters must be greater than 0",
                "k",
            ));
        }
        if n_samples < k {
            return Err(RecommenderError::configuration_key(
                format!(
                    "cannot form {} clusters from {} samples",
                    k, n_samples
                ),
                "k",
            ));
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut best: Option<KMeansFit> = None;

        for run in 0..self.n_init {
            let fit = self.lloyd(data, &mut rng);
            debug!(
                "k-means run {}: inertia = {:.6}, iterations = {}",
                run, fit.inertia, fit.iterations
            );
            let better = best
                .as_ref()
                .map(|current| fit.inertia < current.inertia)
                .unwrap_or(true);
            if better {
                best = Some(fit);
            }
        }

        best.ok_or_else(|| RecommenderError::configuration("k-means produced no run"))
    }

    fn lloyd(&self, data: ArrayView2<f64>, rng: &mut StdRng) -> KMeansFit {
        let k = self.n_clusters;
        let mut centroids = Self::kmeans_plus_plus(data, k, rng);
        let mut labels = vec![0usize; data.nrows()];
        let mut iterations = 0;

        for iteration in 0..self.max_iterations {
            iterations = iteration + 1;
            Self::assign(data, &centroids, &mut labels);

            let mut updated = Array2::<f64>::zeros(centroids.raw_dim());
            let mut counts = vec![0usize; k];
            for (row, &label) in data.axis_iter(Axis(0)).zip(labels.iter()) {
                let mut target = updated.row_mut(label);
                target += &row;
                counts[label] += 1;
            }

            for c in 0..k {
                if counts[c] > 0 {
                    updated.row_mut(c).mapv_inplace(|v| v / counts[c] as f64);
                } else {
                    // Empty cluster: move it onto the worst-fitted sample
                    let far = Self::farthest_sample(data, &centroids, &labels);
                    updated.row_mut(c).assign(&data.row(far));
                    labels[far] = c;
                }
            }

            let shift: f64 = centroids
                .iter()
                .zip(updated.iter())
                .map(|(a, b)| (a - b).powi(2))
                .sum();
            centroids = updated;

            if shift <= self.tolerance {
                break;
            }
        }

        Self::assign(data, &centroids, &mut labels);
        let inertia = data
            .axis_iter(Axis(0))
            .zip(labels.iter())
            .map(|(row, &label)| squared_distance(row, centroids.row(label)))
            .sum();

        KMeansFit {
            labels,
            centroids,
            inertia,
            iterations,
        }
    }

    /// k-means++: first centroid uniform, the rest sampled proportionally to D²
    fn kmeans_plus_plus(data: ArrayView2<f64>, k: usize, rng: &mut StdRng) -> Array2<f64> {
        let n = data.nrows();
        let mut centroids = Array2::<f64>::zeros((k, data.ncols()));
        let first = rng.gen_range(0..n);
        centroids.row_mut(0).assign(&data.row(first));

        let mut nearest: Array1<f64> = data
            .axis_iter(Axis(0))
            .map(|row| squared_distance(row, centroids.row(0)))
            .collect();

        for c in 1..k {
            let total: f64 = nearest.sum();
            let chosen = if total > 0.0 {
                let mut target = rng.gen::<f64>() * total;
                let mut chosen = n - 1;
                for (idx, &d) in nearest.iter().enumerate() {
                    if target < d {
                        chosen = idx;
                        break;
                    }
                    target -= d;
                }
                chosen
            } else {
                rng.gen_range(0..n)
            };

            centroids.row_mut(c).assign(&data.row(chosen));
            for (idx, row) in data.axis_iter(Axis(0)).enumerate() {
                let d = squared_distance(row, centroids.row(c));
                if d < nearest[idx] {
                    nearest[idx] = d;
                }
            }
        }

        centroids
    }

    fn assign(data: ArrayView2<f64>, centroids: &Array2<f64>, labels: &mut [usize]) {
        for (row, label) in data.axis_iter(Axis(0)).zip(labels.iter_mut()) {
            let mut best = 0;
            let mut best_distance = f64::INFINITY;
            for (c, centroid) in centroids.axis_iter(Axis(0)).enumerate() {
                let d = squared_distance(row, centroid);
                if d < best_distance {
                    best_distance = d;
                    best = c;
                }
            }
            *label = best;
        }
    }

    fn farthest_sample(data: ArrayView2<f64>, centroids: &Array2<f64>, labels: &[usize]) -> usize {
        data.axis_iter(Axis(0))
            .zip(labels.iter())
            .map(|(row, &label)| squared_distance(row, centroids.row(label)))
            .enumerate()
            .fold((0, f64::NEG_INFINITY), |(best_idx, best_d), (idx, d)| {
                if d > best_d {
                    (idx, d)
                } else {
                    (best_idx, best_d)
                }
            })
            .0
    }
}

fn squared_distance(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum()
}

/// Builds seed factor matrices (P, Q) from k-means partitions of R
pub struct ClusterInitializer {
    config: ClusteringConfig,
}

impl ClusterInitializer {
    pub fn new(config: ClusteringConfig) -> Self {
        Self { config }
    }

    pub fn with_default_config() -> Self {
        Self::new(ClusteringConfig::default())
    }

    /// Returns P (N x K) and Q (M x K) with entries in `[0, (K-1)/K]`
    ///
    /// # Errors
    ///
    /// Returns a `Configuration` error if any dimension is zero, if `n`/`m`
    /// disagree with the shape of `r`, or if `k` exceeds `n` or `m`.
    pub fn initialize(
        &self,
        r: &Array2<f64>,
        n: usize,
        m: usize,
        k: usize,
    ) -> Result<(Array2<f64>, Array2<f64>)> {
        if n == 0 || m == 0 {
            return Err(RecommenderError::configuration(format!(
                "rating matrix must have positive dimensions, got {}x{}",
                n, m
            )));
        }
        if r.dim() != (n, m) {
            return Err(RecommenderError::configuration(format!(
                "rating matrix is {}x{} but N={} and M={} were given",
                r.nrows(),
                r.ncols(),
                n,
                m
            )));
        }
        if k == 0 {
            return Err(RecommenderError::configuration_key(
                "number of latent factors must be greater than 0",
                "k",
            ));
        }
        if k > n || k > m {
            return Err(RecommenderError::configuration_key(
                format!(
                    "K={} exceeds the number of users ({}) or items ({})",
                    k, n, m
                ),
                "k",
            ));
        }

        let kmeans = KMeans::from_config(k, &self.config);

        let users = kmeans.fit(r.view())?;
        debug!(
            "user clustering: inertia = {:.6}, iterations = {}",
            users.inertia, users.iterations
        );
        let p = seed_factors(&users.labels, k);

        let items = kmeans.fit(r.t())?;
        debug!(
            "item clustering: inertia = {:.6}, iterations = {}",
            items.inertia, items.iterations
        );
        let q = seed_factors(&items.labels, k);

        Ok((p, q))
    }
}

/// Stacks K rotations of `labels / k` as columns
///
/// Column `c` is the sequence rolled right by `c * floor(len / k)`: the value
/// at position `i` lands at `(i + shift) mod len`.
pub fn seed_factors(labels: &[usize], k: usize) -> Array2<f64> {
    let len = labels.len();
    let mut factors = Array2::<f64>::zeros((len, k));
    if len == 0 || k == 0 {
        return factors;
    }

    let step = len / k;
    for c in 0..k {
        let shift = (c * step) % len;
        for (i, &label) in labels.iter().enumerate() {
            factors[[(i + shift) % len, c]] = label as f64 / k as f64;
        }
    }
    factors
}

/// `initialize(R, N, M, K)` with the default clustering configuration
pub fn initialize(
    r: &Array2<f64>,
    n: usize,
    m: usize,
    k: usize,
) -> Result<(Array2<f64>, Array2<f64>)> {
    ClusterInitializer::with_default_config().initialize(r, n, m, k)
}
