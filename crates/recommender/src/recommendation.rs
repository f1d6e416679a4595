//! Top-N Recommendation
//!
//! Ranks the items a user has not rated by their predicted score.

use crate::error::{RecommenderError, Result};
use ndarray::Array2;
use serde::Serialize;
use std::cmp::Ordering;

/// A single ranked recommendation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    /// Column of the item in the rating matrix
    pub item_index: usize,
    pub title: String,
    pub theme: String,
    /// Predicted normalized rating
    pub score: f64,
}

/// Generate top-N recommendations for one user
///
/// Steps:
/// 1. Collect candidates: items whose rating is exactly 0 (unrated)
/// 2. Sort by predicted score, descending; equal scores keep item order and
///    NaN scores go last
/// 3. Keep the first `n`
pub struct GenerateRecommendations;

/// Number of recommendations when the caller does not choose one
pub const DEFAULT_RECOMMENDATIONS: usize = 3;

impl GenerateRecommendations {
    pub fn execute(
        user_index: usize,
        ratings: &Array2<f64>,
        predictions: &Array2<f64>,
        titles: &[String],
        themes: &[String],
        n: usize,
    ) -> Result<Vec<Recommendation>> {
        let (num_users, num_items) = ratings.dim();
        if user_index >= num_users {
            return Err(RecommenderError::IndexOutOfRange {
                index: user_index,
                len: num_users,
            });
        }
        if predictions.dim() != ratings.dim() {
            return Err(RecommenderError::configuration(format!(
                "prediction matrix is {}x{} but rating matrix is {}x{}",
                predictions.nrows(),
                predictions.ncols(),
                num_users,
                num_items
            )));
        }
        if titles.len() != num_items || themes.len() != num_items {
            return Err(RecommenderError::configuration(format!(
                "expected {} titles and themes, got {} and {}",
                num_items,
                titles.len(),
                themes.len()
            )));
        }

        let predicted = predictions.row(user_index);
        let mut candidates: Vec<(usize, f64)> = ratings
            .row(user_index)
            .iter()
            .enumerate()
            .filter(|(_, &rating)| rating == 0.0)
            .map(|(item, _)| (item, predicted[item]))
            .collect();

        // Stable: ties stay in ascending item order
        candidates.sort_by(|a, b| by_score_desc(a.1, b.1));
        candidates.truncate(n);

        Ok(candidates
            .into_iter()
            .map(|(item, score)| Recommendation {
                item_index: item,
                title: titles[item].clone(),
                theme: themes[item].clone(),
                score,
            })
            .collect())
    }
}

/// Descending total order with NaN after every number
fn by_score_desc(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (false, false) => b.total_cmp(&a),
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
    }
}

/// `recommend(userIndex, R, nR, titles, themes, n)`
pub fn recommend(
    user_index: usize,
    ratings: &Array2<f64>,
    predictions: &Array2<f64>,
    titles: &[String],
    themes: &[String],
    n: usize,
) -> Result<Vec<Recommendation>> {
    GenerateRecommendations::execute(user_index, ratings, predictions, titles, themes, n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn labels(prefix: &str, count: usize) -> Vec<String> {
        (0..count).map(|i| format!("{prefix}{i}")).collect()
    }

    #[test]
    fn test_only_unrated_items_are_candidates() {
        let r = array![[0.2, 0.0, 0.0, 1.0]];
        let nr = array![[0.9, 0.1, 0.5, 0.99]];

        let recs = recommend(0, &r, &nr, &labels("t", 4), &labels("g", 4), 10).unwrap();

        let items: Vec<usize> = recs.iter().map(|r| r.item_index).collect();
        assert_eq!(items, vec![2, 1]);
        assert_eq!(recs[0].title, "t2");
        assert_eq!(recs[0].theme, "g2");
        assert_eq!(recs[0].score, 0.5);
    }

    #[test]
    fn test_ties_keep_item_order() {
        let r = array![[0.0, 0.0, 0.0, 0.0]];
        let nr = array![[0.3, 0.7, 0.3, 0.7]];

        let recs = recommend(0, &r, &nr, &labels("t", 4), &labels("g", 4), 4).unwrap();

        let items: Vec<usize> = recs.iter().map(|r| r.item_index).collect();
        assert_eq!(items, vec![1, 3, 0, 2]);
    }

    #[test]
    fn test_truncates_to_n() {
        let r = array![[0.0, 0.0, 0.0]];
        let nr = array![[0.1, 0.2, 0.3]];

        let recs = recommend(0, &r, &nr, &labels("t", 3), &labels("g", 3), 2).unwrap();
        assert_eq!(recs.len(), 2);

        let none = recommend(0, &r, &nr, &labels("t", 3), &labels("g", 3), 0).unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn test_fully_rated_user_gets_nothing() {
        let r = array![[0.2, 0.4], [0.0, 0.6]];
        let nr = array![[0.5, 0.5], [0.5, 0.5]];

        let recs = recommend(0, &r, &nr, &labels("t", 2), &labels("g", 2), 3).unwrap();
        assert!(recs.is_empty());
    }

    #[test]
    fn test_nan_scores_rank_last() {
        let nan = f64::NAN;
        let r = Array2::<f64>::zeros((1, 7));
        let nr = array![[nan, 0.4, nan, f64::INFINITY, -0.2, nan, 0.4]];

        let recs = recommend(0, &r, &nr, &labels("t", 7), &labels("g", 7), 7).unwrap();

        let items: Vec<usize> = recs.iter().map(|r| r.item_index).collect();
        assert_eq!(items, vec![3, 1, 6, 4, 0, 2, 5]);
    }

    #[test]
    fn test_user_index_out_of_range() {
        let r = array![[0.0, 0.4]];
        let nr = array![[0.5, 0.5]];

        let err = recommend(1, &r, &nr, &labels("t", 2), &labels("g", 2), 3).unwrap_err();
        assert!(matches!(
            err,
            RecommenderError::IndexOutOfRange { index: 1, len: 1 }
        ));
    }

    #[test]
    fn test_label_length_mismatch() {
        let r = array![[0.0, 0.4]];
        let nr = array![[0.5, 0.5]];

        let err = recommend(0, &r, &nr, &labels("t", 1), &labels("g", 2), 3).unwrap_err();
        assert!(err.is_configuration());
    }
}
