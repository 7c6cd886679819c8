//! Media handling for questions (images, video, audio)
//!
//! This module defines the media that can accompany a question. Images are
//! shown alongside the prompt, while audio and video have to be played back
//! before the team starts its discussion.

use garde::Validate;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

use crate::constants::media::{MAX_ALT_LENGTH, MAX_URL_LENGTH};

/// Validation result type for segment validation
type ValidationResult = garde::Result;

/// Represents any kind of media content that can be attached to a question
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Validate)]
pub enum Media {
    /// Still image shown with the question
    Image(#[garde(dive)] Image),
    /// Video clip, optionally trimmed to a segment
    Video(#[garde(dive)] Clip),
    /// Audio clip, optionally trimmed to a segment
    Audio(#[garde(dive)] Clip),
}

impl Media {
    /// Whether this media has to be played before the discussion starts
    pub fn requires_playback(&self) -> bool {
        matches!(self, Self::Video(_) | Self::Audio(_))
    }
}

/// An image stored on the media service
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Validate)]
pub struct Image {
    /// Location of the image
    #[garde(length(min = 1, max = MAX_URL_LENGTH))]
    pub url: String,
    /// Alternative text for accessibility and display fallbacks
    #[garde(length(max = MAX_ALT_LENGTH))]
    pub alt: String,
}

/// A playable clip with an optional segment, in seconds
#[skip_serializing_none]
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Validate)]
#[garde(allow_unvalidated)]
pub struct Clip {
    /// Location of the clip
    #[garde(length(min = 1, max = MAX_URL_LENGTH))]
    pub url: String,
    /// Second at which playback starts
    #[serde(default)]
    pub start: Option<f64>,
    /// Second at which playback ends; must come after `start`
    #[serde(default)]
    #[garde(custom(validate_segment_end(self.start)))]
    pub end: Option<f64>,
}

/// Checks that a segment end lies strictly after its start
fn validate_segment_end(
    start: Option<f64>,
) -> impl FnOnce(&Option<f64>, &()) -> ValidationResult {
    move |end, _ctx| match (start, *end) {
        (Some(start), _) if start < 0. => Err(garde::Error::new("segment start is negative")),
        (Some(start), Some(end)) if end <= start => {
            Err(garde::Error::new("segment end must come after its start"))
        }
        (None, Some(end)) if end <= 0. => Err(garde::Error::new("segment end must be positive")),
        _ => Ok(()),
    }
}
