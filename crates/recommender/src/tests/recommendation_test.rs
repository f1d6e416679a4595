//! Recommendation ranking tests

use crate::clustering::initialize;
use crate::matrix_factorization::{factorize, predict};
use crate::recommendation::{recommend, DEFAULT_RECOMMENDATIONS};
use ndarray::{array, Array2};
use proptest::prelude::*;

fn labels(prefix: &str, count: usize) -> Vec<String> {
    (0..count).map(|i| format!("{prefix} {i}")).collect()
}

#[test]
fn test_small_matrix_scenario() {
    let r = array![[1.0, 0.0, 0.8], [0.0, 0.6, 0.0], [0.4, 0.0, 0.0]];
    let titles = labels("Video", 3);
    let themes = labels("Theme", 3);

    let (p, q) = initialize(&r, 3, 3, 2).unwrap();
    let (p, q) = factorize(&r, p, q, 2, 20, 0.0002, 0.02).unwrap();
    let nr = predict(&p, &q);

    let recs = recommend(0, &r, &nr, &titles, &themes, 2).unwrap();

    assert!(recs.len() <= 2);
    assert!(recs.iter().all(|rec| rec.item_index == 1 || rec.item_index == 2));
    assert!(recs.windows(2).all(|w| w[0].score >= w[1].score));
    for rec in &recs {
        assert_eq!(rec.title, titles[rec.item_index]);
        assert_eq!(rec.theme, themes[rec.item_index]);
        assert_eq!(rec.score, nr[[0, rec.item_index]]);
    }
}

#[test]
fn test_default_count_is_three() {
    assert_eq!(DEFAULT_RECOMMENDATIONS, 3);

    let r = Array2::<f64>::zeros((1, 5));
    let nr = array![[0.1, 0.5, 0.4, 0.3, 0.2]];

    let recs = recommend(0, &r, &nr, &labels("t", 5), &labels("g", 5), DEFAULT_RECOMMENDATIONS)
        .unwrap();
    let items: Vec<usize> = recs.iter().map(|r| r.item_index).collect();
    assert_eq!(items, vec![1, 2, 3]);
}

#[test]
fn test_negative_scores_still_ranked() {
    let r = array![[0.0, 0.0, 0.2]];
    let nr = array![[-0.4, -0.1, 0.9]];

    let recs = recommend(0, &r, &nr, &labels("t", 3), &labels("g", 3), 5).unwrap();
    let items: Vec<usize> = recs.iter().map(|r| r.item_index).collect();
    assert_eq!(items, vec![1, 0]);
}

proptest! {
    #[test]
    fn prop_ranking_invariants(
        m in 1usize..12,
        rated in prop::collection::vec(prop::bool::ANY, 12),
        scores in prop::collection::vec(0u8..6, 12),
        n in 0usize..15,
    ) {
        let r = Array2::from_shape_fn((1, m), |(_, j)| if rated[j] { 0.6 } else { 0.0 });
        // Coarse scores so ties are common
        let nr = Array2::from_shape_fn((1, m), |(_, j)| f64::from(scores[j]) / 5.0);

        let recs = recommend(0, &r, &nr, &labels("t", m), &labels("g", m), n).unwrap();
        let candidates = (0..m).filter(|&j| !rated[j]).count();

        prop_assert_eq!(recs.len(), n.min(candidates));
        for rec in &recs {
            prop_assert_eq!(r[[0, rec.item_index]], 0.0);
        }
        for pair in recs.windows(2) {
            prop_assert!(pair[0].score >= pair[1].score);
            if pair[0].score == pair[1].score {
                prop_assert!(pair[0].item_index < pair[1].item_index);
            }
        }
    }
}

proptest! {
    #[test]
    fn prop_nan_scores_never_break_ranking(
        scores in prop::collection::vec(prop::option::weighted(0.66, -2.0f64..2.0), 1..80),
    ) {
        let m = scores.len();
        let r = Array2::<f64>::zeros((1, m));
        let nr = Array2::from_shape_fn((1, m), |(_, j)| scores[j].unwrap_or(f64::NAN));

        let recs = recommend(0, &r, &nr, &labels("t", m), &labels("g", m), m).unwrap();
        prop_assert_eq!(recs.len(), m);

        let finite = scores.iter().filter(|s| s.is_some()).count();
        for rec in &recs[..finite] {
            prop_assert!(!rec.score.is_nan());
        }
        for pair in recs[..finite].windows(2) {
            prop_assert!(pair[0].score >= pair[1].score);
        }
        for rec in &recs[finite..] {
            prop_assert!(rec.score.is_nan());
        }
        for pair in recs[finite..].windows(2) {
            prop_assert!(pair[0].item_index < pair[1].item_index);
        }
    }
}
