//! Rating dataset loading
//!
//! File layout (no header record, `;` separated by default):
//!
//! ```text
//! Comedy;Drama;Comedy        <- item themes
//! Title A;Title B;Title C    <- item titles
//! 5;0;3                      <- one row of 0-5 ratings per user, 0 = unrated
//! 0;4;1
//! ```

use crate::error::{RecommenderError, Result};
use csv::ReaderBuilder;
use ndarray::Array2;
use std::collections::HashSet;
use std::path::Path;
use tracing::info;

/// Highest raw rating the dataset may contain
pub const MAX_RAW_RATING: u8 = 5;

/// Items (themes, titles) and the users' raw ratings
#[derive(Debug, Clone)]
pub struct Dataset {
    themes: Vec<String>,
    titles: Vec<String>,
    /// Raw ratings: [num_users x num_items], 0 = unrated
    ratings: Array2<u8>,
}

impl Dataset {
    pub fn from_parts(themes: Vec<String>, titles: Vec<String>, ratings: Array2<u8>) -> Result<Self> {
        if themes.is_empty() {
            return Err(RecommenderError::Dataset("dataset has no items".to_string()));
        }
        if themes.len() != titles.len() {
            return Err(RecommenderError::Dataset(format!(
                "{} themes but {} titles",
                themes.len(),
                titles.len()
            )));
        }
        if ratings.ncols() != themes.len() {
            return Err(RecommenderError::Dataset(format!(
                "rating rows have {} columns, expected {}",
                ratings.ncols(),
                themes.len()
            )));
        }
        if let Some(bad) = ratings.iter().find(|&&v| v > MAX_RAW_RATING) {
            return Err(RecommenderError::Dataset(format!(
                "rating {} is outside 0..={}",
                bad, MAX_RAW_RATING
            )));
        }

        Ok(Self {
            themes,
            titles,
            ratings,
        })
    }

    /// Load a dataset from a delimited file
    pub fn load(path: impl AsRef<Path>, delimiter: u8) -> Result<Self> {
        let path = path.as_ref();
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .delimiter(delimiter)
            .flexible(true)
            .from_path(path)?;

        let mut records = reader.records();

        let themes = match records.next() {
            Some(record) => trimmed(&record?),
            None => {
                return Err(RecommenderError::Dataset(
                    "missing theme line".to_string(),
                ))
            }
        };
        let titles = match records.next() {
            Some(record) => trimmed(&record?),
            None => {
                return Err(RecommenderError::Dataset(
                    "missing title line".to_string(),
                ))
            }
        };

        let num_items = themes.len();
        let mut values = Vec::new();
        let mut num_users = 0;

        for (offset, record) in records.enumerate() {
            let record = record?;
            let line = offset + 3;

            if record.len() != num_items {
                return Err(RecommenderError::Dataset(format!(
                    "line {}: expected {} ratings, found {}",
                    line,
                    num_items,
                    record.len()
                )));
            }

            for (column, cell) in record.iter().enumerate() {
                let value: u8 = cell.trim().parse().map_err(|_| {
                    RecommenderError::Dataset(format!(
                        "line {}, column {}: {:?} is not an integer rating",
                        line,
                        column + 1,
                        cell
                    ))
                })?;
                values.push(value);
            }
            num_users += 1;
        }

        let ratings = Array2::from_shape_vec((num_users, num_items), values)
            .map_err(|e| RecommenderError::Dataset(e.to_string()))?;
        let dataset = Self::from_parts(themes, titles, ratings)?;

        info!(
            path = %path.display(),
            users = dataset.num_users(),
            items = dataset.num_items(),
            themes = dataset.theme_count(),
            "loaded rating dataset"
        );

        Ok(dataset)
    }

    pub fn themes(&self) -> &[String] {
        &self.themes
    }

    pub fn titles(&self) -> &[String] {
        &self.titles
    }

    pub fn ratings(&self) -> &Array2<u8> {
        &self.ratings
    }

    pub fn num_users(&self) -> usize {
        self.ratings.nrows()
    }

    pub fn num_items(&self) -> usize {
        self.themes.len()
    }

    /// Number of distinct themes, used as the latent dimension K
    pub fn theme_count(&self) -> usize {
        self.themes.iter().collect::<HashSet<_>>().len()
    }

    /// Raw ratings with `row` appended as the last user
    pub fn with_user(&self, row: &[u8]) -> Result<Array2<u8>> {
        if row.len() != self.num_items() {
            return Err(RecommenderError::Dataset(format!(
                "user row has {} ratings, expected {}",
                row.len(),
                self.num_items()
            )));
        }

        let mut ratings = self.ratings.clone();
        ratings
            .push_row(ndarray::ArrayView1::from(row))
            .map_err(|e| RecommenderError::Dataset(e.to_string()))?;
        Ok(ratings)
    }
}

/// Scale raw ratings into [0, 1]; unrated cells stay 0
pub fn normalize(ratings: &Array2<u8>, scale_max: u8) -> Array2<f64> {
    let divisor = f64::from(scale_max.max(1));
    ratings.mapv(|v| f64::from(v) / divisor)
}

fn trimmed(record: &csv::StringRecord) -> Vec<String> {
    record.iter().map(|field| field.trim().to_string()).collect()
}
