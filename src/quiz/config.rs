//! Quiz configuration
//!
//! This module defines the ordered list of questions a session is played
//! from, along with the shared duration validator used by the game options.

use std::time::Duration;

use garde::Validate;
use serde::{Deserialize, Serialize};

use super::question::QuestionConfig;
use crate::constants::quiz::*;

/// Validation result type for duration validation
type ValidationResult = garde::Result;

/// Validates that a duration falls within specified bounds.
///
/// This is a custom validation function for use with the `garde` crate.
/// It checks if the duration in seconds is within the inclusive range
/// defined by `MIN_SECONDS` and `MAX_SECONDS`.
///
/// # Errors
///
/// Returns a `garde::Error` if the duration is outside the specified bounds.
pub fn validate_duration<const MIN_SECONDS: u64, const MAX_SECONDS: u64>(
    val: &Duration,
    _ctx: &(),
) -> ValidationResult {
    if (MIN_SECONDS..=MAX_SECONDS).contains(&val.as_secs()) {
        Ok(())
    } else {
        Err(garde::Error::new(format!(
            "outside of bounds [{MIN_SECONDS},{MAX_SECONDS}]",
        )))
    }
}

/// A complete quiz: title plus the ordered questions, one per round
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Validate)]
pub struct Quiz {
    /// Title shown on the setup and results screens
    #[garde(length(chars, max = MAX_TITLE_LENGTH))]
    pub title: String,

    /// Questions in play order
    #[garde(length(min = MIN_ROUND_COUNT, max = MAX_ROUND_COUNT), dive)]
    pub questions: Vec<QuestionConfig>,
}

impl Quiz {
    /// Creates a quiz from a title and its questions
    pub fn new(title: impl Into<String>, questions: Vec<QuestionConfig>) -> Self {
        Self {
            title: title.into(),
            questions,
        }
    }

    /// Returns the number of rounds in this quiz
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    /// Checks if this quiz contains any questions
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Shuffles the questions and keeps at most `count` of them
    ///
    /// The same `seed` always produces the same order.
    #[must_use]
    pub fn shuffled(mut self, seed: u64, count: usize) -> Self {
        fastrand::Rng::with_seed(seed).shuffle(&mut self.questions);
        self.questions.truncate(count);
        self
    }
}
