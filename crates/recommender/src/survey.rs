//! Rating survey for a new user
//!
//! Picks the items a newcomer is asked to rate and validates the answers.

use rand::seq::{IteratorRandom, SliceRandom};
use rand::Rng;
use std::collections::HashSet;
use std::ops::RangeInclusive;

/// Why a rating answer was rejected
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RatingError {
    #[error("{0:?} is not a whole number")]
    NotANumber(String),

    #[error("rating must be between {min} and {max}, got {value}")]
    OutOfRange { value: i64, min: u8, max: u8 },
}

/// A validated rating on the survey scale
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Rating(u8);

impl Rating {
    pub fn value(self) -> u8 {
        self.0
    }
}

/// Parse a user's answer into a rating on `scale`
///
/// # Examples
///
/// ```
/// use video_recommender::survey::{parse_rating, RatingError};
///
/// assert_eq!(parse_rating(" 4 ", 1..=5).unwrap().value(), 4);
/// assert!(matches!(parse_rating("6", 1..=5), Err(RatingError::OutOfRange { .. })));
/// assert!(matches!(parse_rating("four", 1..=5), Err(RatingError::NotANumber(_))));
/// ```
pub fn parse_rating(input: &str, scale: RangeInclusive<u8>) -> Result<Rating, RatingError> {
    let trimmed = input.trim();
    let value: i64 = trimmed
        .parse()
        .map_err(|_| RatingError::NotANumber(trimmed.to_string()))?;

    let (min, max) = (*scale.start(), *scale.end());
    if value < i64::from(min) || value > i64::from(max) {
        return Err(RatingError::OutOfRange { value, min, max });
    }

    Ok(Rating(value as u8))
}

/// Choose the items to put in front of a new user
///
/// One random item per theme, in order of first appearance, then a random
/// sample of the remaining items until `count` is reached. When there are
/// more themes than `count`, every theme still gets one item.
pub fn select_items<R: Rng + ?Sized>(themes: &[String], count: usize, rng: &mut R) -> Vec<usize> {
    let mut order: Vec<&String> = Vec::new();
    let mut by_theme: Vec<Vec<usize>> = Vec::new();
    for (item, theme) in themes.iter().enumerate() {
        match order.iter().position(|t| *t == theme) {
            Some(slot) => by_theme[slot].push(item),
            None => {
                order.push(theme);
                by_theme.push(vec![item]);
            }
        }
    }

    let mut selected: Vec<usize> = by_theme
        .iter()
        .filter_map(|items| items.choose(&mut *rng).copied())
        .collect();

    let remaining = count.saturating_sub(selected.len());
    if remaining > 0 {
        let taken: HashSet<usize> = selected.iter().copied().collect();
        let available = (0..themes.len()).filter(|item| !taken.contains(item));
        let mut extra = available.choose_multiple(rng, remaining);
        extra.shuffle(rng);
        selected.extend(extra);
    }

    selected
}

/// The new user's answers, as a full rating row
#[derive(Debug, Clone)]
pub struct UserRatings {
    row: Vec<u8>,
}

impl UserRatings {
    pub fn new(num_items: usize) -> Self {
        Self {
            row: vec![0; num_items],
        }
    }

    /// Record a rating; returns false if `item` is out of range
    pub fn set(&mut self, item: usize, rating: Rating) -> bool {
        match self.row.get_mut(item) {
            Some(slot) => {
                *slot = rating.value();
                true
            }
            None => false,
        }
    }

    pub fn rated_count(&self) -> usize {
        self.row.iter().filter(|&&v| v > 0).count()
    }

    pub fn as_row(&self) -> &[u8] {
        &self.row
    }
}
