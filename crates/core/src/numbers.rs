//! Bounds for number-pronunciation practice.

use rand::Rng;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum NumberRangeError {
    #[error("not a whole number: {0:?}")]
    NotANumber(String),

    #[error("minimum ({min}) must be smaller than maximum ({max})")]
    Inverted { min: i64, max: i64 },
}

/// Inclusive range the practice draws numbers from. Always `min < max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumberRange {
    min: i64,
    max: i64,
}

impl NumberRange {
    /// # Errors
    ///
    /// Returns `NumberRangeError::Inverted` unless `min < max`.
    pub fn new(min: i64, max: i64) -> Result<Self, NumberRangeError> {
        if min >= max {
            return Err(NumberRangeError::Inverted { min, max });
        }
        Ok(Self { min, max })
    }

    /// Parse both bounds from user-entered text.
    ///
    /// # Errors
    ///
    /// Returns `NumberRangeError::NotANumber` for non-integer input and
    /// `NumberRangeError::Inverted` when the bounds are not ascending.
    pub fn parse(min: &str, max: &str) -> Result<Self, NumberRangeError> {
        let parse = |raw: &str| {
            raw.trim()
                .parse::<i64>()
                .map_err(|_| NumberRangeError::NotANumber(raw.to_string()))
        };
        Self::new(parse(min)?, parse(max)?)
    }

    #[must_use]
    pub fn min(&self) -> i64 {
        self.min
    }

    #[must_use]
    pub fn max(&self) -> i64 {
        self.max
    }

    /// Uniformly pick a number in `[min, max]`.
    pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> i64 {
        rng.random_range(self.min..=self.max)
    }
}
