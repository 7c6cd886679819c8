//! Per-round records
//!
//! A [`RoundData`] is created for every question before play begins. It is
//! only mutated while its round is in the discussion or answer phase, and it
//! is left untouched once the round has been judged.

use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use thiserror::Error;
use web_time::SystemTime;

use crate::{
    constants::answer_text::{MAX_LENGTH, MAX_NOTES_LENGTH},
    judge::{Submission, Verdict},
    quiz::{
        media::Media,
        question::{QuestionConfig, QuestionKind},
    },
    roster::Roster,
};

/// A recording captured for an audio challenge
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recording {
    /// Where the recorder stored the file
    pub uri: String,
    /// File name
    pub name: String,
    /// MIME type, e.g. `audio/m4a`
    pub mime_type: String,
    /// Score (percent) assigned by the audio analysis, once available
    pub score: Option<f64>,
}

/// Reasons a manual submission is refused
#[derive(Error, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionError {
    /// Nothing was typed
    #[error("answer cannot be empty")]
    EmptyAnswer,
    /// Several players are on the team and none was picked
    #[error("select the player who answered")]
    PlayerNotSelected,
    /// The picked player is not on the team
    #[error("player is not on the team")]
    UnknownPlayer,
    /// An audio challenge was submitted before anything was recorded
    #[error("record your answer first")]
    RecordingMissing,
    /// The text exceeds its length limit
    #[error("text is too long")]
    TooLong,
}

/// Everything known about a single round
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundData {
    /// The prompt
    pub question: String,
    /// The expected answer
    pub correct_answer: String,
    /// The team's answer, empty until typed
    pub team_answer: String,
    /// Player credited with the answer
    pub player_who_answered: Option<String>,
    /// Set when the round is judged
    pub is_correct: bool,
    /// Free-form notes taken during the discussion
    pub discussion_notes: String,
    /// Judge commentary shown during feedback
    pub explanation: Option<String>,
    /// When the round was judged
    pub answered_at: Option<SystemTime>,
    /// Media attached to the question
    pub media: Option<Media>,
    /// How the team answers
    pub kind: QuestionKind,
    /// Recording score needed to pass an audio challenge
    pub passing_score: f64,
    /// Extra context revealed with the answer
    pub additional_info: Option<String>,
    /// Recording captured for an audio challenge
    pub recording: Option<Recording>,
}

impl From<&QuestionConfig> for RoundData {
    fn from(config: &QuestionConfig) -> Self {
        Self {
            question: config.question.clone(),
            correct_answer: config.answer.clone(),
            team_answer: String::new(),
            player_who_answered: None,
            is_correct: false,
            discussion_notes: String::new(),
            explanation: None,
            answered_at: None,
            media: config.media.clone(),
            kind: config.kind,
            passing_score: config.passing_score(),
            additional_info: config.additional_info.clone(),
            recording: None,
        }
    }
}

impl RoundData {
    /// Whether the round has been judged
    pub fn is_answered(&self) -> bool {
        self.answered_at.is_some()
    }

    /// Whether the round needs a media playback phase
    pub fn requires_playback(&self) -> bool {
        self.media.as_ref().is_some_and(Media::requires_playback)
    }

    /// Replaces the team answer
    ///
    /// # Errors
    ///
    /// Returns `SubmissionError::TooLong` if the answer exceeds its limit.
    pub fn set_answer(&mut self, answer: String) -> Result<(), SubmissionError> {
        if answer.chars().count() > MAX_LENGTH {
            return Err(SubmissionError::TooLong);
        }
        self.team_answer = answer;
        Ok(())
    }

    /// Replaces the discussion notes
    ///
    /// # Errors
    ///
    /// Returns `SubmissionError::TooLong` if the notes exceed their limit.
    pub fn set_notes(&mut self, notes: String) -> Result<(), SubmissionError> {
        if notes.chars().count() > MAX_NOTES_LENGTH {
            return Err(SubmissionError::TooLong);
        }
        self.discussion_notes = notes;
        Ok(())
    }

    /// Picks the player credited with the answer
    ///
    /// # Errors
    ///
    /// Returns `SubmissionError::UnknownPlayer` if the player is not on a
    /// non-empty roster.
    pub fn set_player(
        &mut self,
        player: Option<String>,
        roster: &Roster,
    ) -> Result<(), SubmissionError> {
        if player
            .as_deref()
            .is_some_and(|player| !roster.is_empty() && !roster.contains(player))
        {
            return Err(SubmissionError::UnknownPlayer);
        }
        self.player_who_answered = player;
        Ok(())
    }

    /// Player to credit, falling back to the only player of the team
    pub fn attributed_player(&self, roster: &Roster) -> Option<String> {
        self.player_who_answered
            .clone()
            .or_else(|| roster.sole_player().map(ToOwned::to_owned))
    }

    /// Checks that a manual submission can go ahead
    ///
    /// # Errors
    ///
    /// * `SubmissionError::RecordingMissing` - Audio challenge without a recording
    /// * `SubmissionError::EmptyAnswer` - Text answer is blank
    /// * `SubmissionError::PlayerNotSelected` - Several players and none picked
    /// * `SubmissionError::UnknownPlayer` - Picked player is not on the team
    pub fn validate_submission(&self, roster: &Roster) -> Result<(), SubmissionError> {
        if self.kind.is_audio_challenge() {
            if self.recording.is_none() {
                return Err(SubmissionError::RecordingMissing);
            }
        } else if self.team_answer.trim().is_empty() {
            return Err(SubmissionError::EmptyAnswer);
        }

        match &self.player_who_answered {
            Some(player) if !roster.is_empty() && !roster.contains(player) => {
                Err(SubmissionError::UnknownPlayer)
            }
            None if roster.requires_attribution() => Err(SubmissionError::PlayerNotSelected),
            _ => Ok(()),
        }
    }

    /// View of this round handed to a judge
    pub fn submission(&self) -> Submission<'_> {
        Submission {
            team_answer: &self.team_answer,
            correct_answer: &self.correct_answer,
            kind: self.kind,
            recording: self.recording.as_ref(),
            passing_score: self.passing_score,
        }
    }

    /// Stores the verdict, finalizing the round
    pub fn record_verdict(&mut self, verdict: Verdict, player: Option<String>) {
        self.is_correct = verdict.is_correct;
        self.explanation = verdict.explanation;
        self.player_who_answered = player;
        self.answered_at = Some(SystemTime::now());
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::quiz::question::AudioChallengeType;

    fn text_round() -> RoundData {
        RoundData::from(&QuestionConfig::text("Capital of France?", "Paris"))
    }

    fn audio_round() -> RoundData {
        RoundData::from(
            &QuestionConfig::text("Sing the chorus", "chorus")
                .with_kind(QuestionKind::AudioChallenge(AudioChallengeType::Singing)),
        )
    }

    fn pair() -> Roster {
        Roster::with_players("Owls", ["Anna", "Boris"]).unwrap()
    }

    #[test]
    fn test_round_from_question() {
        let round = text_round();
        assert_eq!(round.question, "Capital of France?");
        assert_eq!(round.correct_answer, "Paris");
        assert!(round.team_answer.is_empty());
        assert!(!round.is_answered());
        assert!(!round.requires_playback());
    }

    #[test]
    fn test_empty_answer_rejected() {
        let mut round = text_round();
        round.set_answer("   ".to_string()).unwrap();
        assert_eq!(
            round.validate_submission(&Roster::new("Owls").unwrap()),
            Err(SubmissionError::EmptyAnswer)
        );
    }

    #[test]
    fn test_player_required_with_several_players() {
        let roster = pair();
        let mut round = text_round();
        round.set_answer("Paris".to_string()).unwrap();

        assert_eq!(
            round.validate_submission(&roster),
            Err(SubmissionError::PlayerNotSelected)
        );

        round.set_player(Some("Boris".to_string()), &roster).unwrap();
        assert_eq!(round.validate_submission(&roster), Ok(()));
    }

    #[test]
    fn test_single_player_is_attributed() {
        let roster = Roster::with_players("Owls", ["Anna"]).unwrap();
        let mut round = text_round();
        round.set_answer("Paris".to_string()).unwrap();

        assert_eq!(round.validate_submission(&roster), Ok(()));
        assert_eq!(round.attributed_player(&roster), Some("Anna".to_string()));
    }

    #[test]
    fn test_unknown_player_rejected() {
        let roster = pair();
        let mut round = text_round();
        assert_eq!(
            round.set_player(Some("Zoe".to_string()), &roster),
            Err(SubmissionError::UnknownPlayer)
        );
        assert_eq!(round.player_who_answered, None);
    }

    #[test]
    fn test_audio_challenge_needs_recording() {
        let roster = Roster::new("Owls").unwrap();
        let mut round = audio_round();
        assert_eq!(
            round.validate_submission(&roster),
            Err(SubmissionError::RecordingMissing)
        );

        round.recording = Some(Recording {
            uri: "file:///tmp/take.m4a".to_string(),
            name: "take.m4a".to_string(),
            mime_type: "audio/m4a".to_string(),
            score: Some(80.),
        });
        assert_eq!(round.validate_submission(&roster), Ok(()));
    }

    #[test]
    fn test_text_limits() {
        let mut round = text_round();
        assert_eq!(
            round.set_answer("a".repeat(MAX_LENGTH + 1)),
            Err(SubmissionError::TooLong)
        );
        assert_eq!(
            round.set_notes("a".repeat(MAX_NOTES_LENGTH + 1)),
            Err(SubmissionError::TooLong)
        );
        assert!(round.set_notes("Paris or Lyon?".to_string()).is_ok());
    }

    #[test]
    fn test_record_verdict_finalizes() {
        let mut round = text_round();
        round.set_answer("Paris".to_string()).unwrap();
        round.record_verdict(
            Verdict::correct().with_explanation("Well done"),
            Some("Anna".to_string()),
        );

        assert!(round.is_answered());
        assert!(round.is_correct);
        assert_eq!(round.explanation.as_deref(), Some("Well done"));
        assert_eq!(round.player_who_answered.as_deref(), Some("Anna"));
    }

    #[test]
    fn test_submission_view() {
        let mut round = text_round();
        round.set_answer("paris".to_string()).unwrap();
        let submission = round.submission();
        assert_eq!(submission.team_answer, "paris");
        assert_eq!(submission.correct_answer, "Paris");
        assert_eq!(submission.kind, QuestionKind::Text);
        assert!(submission.recording.is_none());
    }
}
