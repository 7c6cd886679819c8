//! Question configuration
//!
//! A question is the unit a round is built from: the prompt, the expected
//! answer, optional media and the kind of answer the team has to give.

use garde::Validate;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

use super::media::Media;
use crate::constants::question::*;

/// Kind of audio challenge attached to a question
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, derive_more::Display)]
pub enum AudioChallengeType {
    /// Create an original rhythm pattern
    RhythmCreation,
    /// Repeat a rhythm played from the reference audio
    RhythmRepeat,
    /// Reproduce a reference sound as closely as possible
    SoundMatch,
    /// Sing along to the reference (karaoke)
    Singing,
}

impl AudioChallengeType {
    /// Whether the challenge compares against a reference recording
    pub fn requires_reference_audio(self) -> bool {
        !matches!(self, Self::RhythmCreation)
    }
}

/// How the team answers a question
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum QuestionKind {
    /// Free text answer, timed by the answer timer
    #[default]
    Text,
    /// Recorded answer, gated on a captured recording instead of a timer
    AudioChallenge(AudioChallengeType),
}

impl QuestionKind {
    /// Whether the answer phase waits for a recording
    pub fn is_audio_challenge(self) -> bool {
        matches!(self, Self::AudioChallenge(_))
    }
}

/// Difficulty level used when generating hints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Difficulty {
    /// Reveals first letters and word count
    Easy,
    /// Reveals character and word count
    #[default]
    Medium,
    /// Reveals only the overall shape of the answer
    Hard,
}

/// Checks that challenges played against a reference come with audio
fn validate_reference_audio(
    media: Option<&Media>,
) -> impl FnOnce(&QuestionKind, &()) -> garde::Result + '_ {
    move |kind, _ctx| match (kind, media) {
        (QuestionKind::AudioChallenge(challenge), media)
            if challenge.requires_reference_audio()
                && !matches!(media, Some(Media::Audio(_))) =>
        {
            Err(garde::Error::new(format!("{challenge} needs reference audio")))
        }
        _ => Ok(()),
    }
}

/// Configuration for a single question
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct QuestionConfig {
    /// The prompt read to the team
    #[garde(length(chars, min = 1, max = MAX_QUESTION_LENGTH))]
    pub question: String,
    /// The expected answer
    #[garde(length(chars, min = 1, max = MAX_ANSWER_LENGTH))]
    pub answer: String,
    /// Accompanying media
    #[garde(dive)]
    #[serde(default)]
    pub media: Option<Media>,
    /// How the team answers
    #[garde(custom(validate_reference_audio(self.media.as_ref())))]
    #[serde(default)]
    pub kind: QuestionKind,
    /// Extra context revealed with the answer
    #[garde(length(chars, max = MAX_ADDITIONAL_INFO_LENGTH))]
    #[serde(default)]
    pub additional_info: Option<String>,
    /// Minimum recording score (percent) for audio challenges
    #[garde(range(min = 0., max = 100.))]
    #[serde(default)]
    pub passing_score: Option<f64>,
}

impl QuestionConfig {
    /// Creates a plain text question
    pub fn text(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
            media: None,
            kind: QuestionKind::Text,
            additional_info: None,
            passing_score: None,
        }
    }

    /// Attaches media to the question
    #[must_use]
    pub fn with_media(mut self, media: Media) -> Self {
        self.media = Some(media);
        self
    }

    /// Changes how the team answers the question
    #[must_use]
    pub fn with_kind(mut self, kind: QuestionKind) -> Self {
        self.kind = kind;
        self
    }

    /// Whether the round needs a media playback phase
    pub fn requires_playback(&self) -> bool {
        self.media.as_ref().is_some_and(Media::requires_playback)
    }

    /// Recording score needed to pass an audio challenge
    pub fn passing_score(&self) -> f64 {
        self.passing_score.unwrap_or(DEFAULT_PASSING_SCORE)
    }

    /// Builds a hint about the expected answer
    ///
    /// Easier difficulties reveal more of the answer.
    pub fn hint(&self, difficulty: Difficulty) -> String {
        let words = self.answer.split_whitespace().collect::<Vec<_>>();
        let word_count = words.len();
        let char_count = self.answer.chars().count();
        let plural = if word_count == 1 { "" } else { "s" };

        match difficulty {
            Difficulty::Easy => {
                let first_letters = words
                    .iter()
                    .filter_map(|word| word.chars().next())
                    .collect::<String>();
                format!(
                    "The answer begins with \"{first_letters}\" and has {word_count} word{plural}."
                )
            }
            Difficulty::Medium => {
                format!("The answer has {char_count} characters in {word_count} word{plural}.")
            }
            Difficulty::Hard => {
                if word_count > 1 {
                    format!("The answer is a {word_count}-word term.")
                } else {
                    format!("The answer is a single word with {char_count} letters.")
                }
            }
        }
    }
}
