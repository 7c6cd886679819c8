//! Answer judging
//!
//! Deciding whether a team answer is right is delegated to a [`Judge`]. The
//! session does not care whether the verdict comes from a local string
//! comparison or from a remote service; it only reacts to the returned
//! [`Verdict`] or [`JudgeError`].

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use thiserror::Error;

use crate::{quiz::question::QuestionKind, round::Recording};

/// Similarity needed for a short answer to be accepted despite typos
const SIMILARITY_THRESHOLD: f64 = 0.8;

/// Answers with at most this many words get typo tolerance
const SHORT_ANSWER_WORDS: usize = 2;

/// Everything a judge gets to see about a submission
#[derive(Debug, Clone, Copy)]
pub struct Submission<'a> {
    /// What the team submitted
    pub team_answer: &'a str,
    /// What the question expects
    pub correct_answer: &'a str,
    /// How the question is answered
    pub kind: QuestionKind,
    /// Captured recording for audio challenges
    pub recording: Option<&'a Recording>,
    /// Recording score (percent) needed to pass an audio challenge
    pub passing_score: f64,
}

/// Outcome of judging a submission
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    /// Whether the answer counts as correct
    pub is_correct: bool,
    /// Commentary shown during feedback
    pub explanation: Option<String>,
}

impl Verdict {
    /// A correct verdict without commentary
    pub fn correct() -> Self {
        Self {
            is_correct: true,
            explanation: None,
        }
    }

    /// An incorrect verdict without commentary
    pub fn incorrect() -> Self {
        Self {
            is_correct: false,
            explanation: None,
        }
    }

    /// Attaches commentary to the verdict
    #[must_use]
    pub fn with_explanation(mut self, explanation: impl Into<String>) -> Self {
        self.explanation = Some(explanation.into());
        self
    }
}

/// Errors a judge can report instead of a verdict
#[derive(Error, Serialize, Debug, Clone, PartialEq, Eq)]
pub enum JudgeError {
    /// The judge could not be reached or cannot judge this submission
    #[error("judge unavailable: {0}")]
    Unavailable(String),
    /// The judge refused the submission
    #[error("submission rejected: {0}")]
    Rejected(String),
}

/// Decides whether a submission is correct
pub trait Judge {
    /// Judges a single submission
    ///
    /// # Errors
    ///
    /// Returns a [`JudgeError`] when no verdict could be reached; the round
    /// then stays open so the submission can be retried.
    fn judge(&self, submission: &Submission<'_>) -> Result<Verdict, JudgeError>;
}

impl<F> Judge for F
where
    F: Fn(&Submission<'_>) -> Result<Verdict, JudgeError>,
{
    fn judge(&self, submission: &Submission<'_>) -> Result<Verdict, JudgeError> {
        self(submission)
    }
}

/// Judge that compares answers on the device
///
/// Text answers are normalized (case, punctuation, spacing) and accepted on
/// an exact match, when one contains the other, or for short answers when
/// they are at least 80% similar. Audio challenges are accepted when the
/// recording's score reaches the passing score.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalJudge;

impl Judge for LocalJudge {
    fn judge(&self, submission: &Submission<'_>) -> Result<Verdict, JudgeError> {
        match submission.kind {
            QuestionKind::Text => Ok(judge_text(
                submission.team_answer,
                submission.correct_answer,
            )),
            QuestionKind::AudioChallenge(_) => {
                let recording = submission
                    .recording
                    .ok_or_else(|| JudgeError::Unavailable("no recording captured".to_owned()))?;
                let score = recording.score.ok_or_else(|| {
                    JudgeError::Unavailable("recording has not been scored".to_owned())
                })?;
                let verdict = if score >= submission.passing_score {
                    Verdict::correct()
                } else {
                    Verdict::incorrect()
                };
                Ok(verdict.with_explanation(format!(
                    "Recording scored {score:.0}%, {:.0}% needed",
                    submission.passing_score
                )))
            }
        }
    }
}

fn judge_text(team_answer: &str, correct_answer: &str) -> Verdict {
    let team = normalize_answer(team_answer);
    let correct = normalize_answer(correct_answer);

    if team.is_empty() || correct.is_empty() {
        return Verdict::incorrect()
            .with_explanation(format!("The correct answer was \"{correct_answer}\""));
    }

    if team == correct {
        return Verdict::correct();
    }

    if team.contains(&correct) || correct.contains(&team) {
        return Verdict::correct()
            .with_explanation(format!("Accepted as a match for \"{correct_answer}\""));
    }

    if correct.split(' ').count() <= SHORT_ANSWER_WORDS
        && similarity(&team, &correct) >= SIMILARITY_THRESHOLD
    {
        return Verdict::correct()
            .with_explanation(format!("Close enough to \"{correct_answer}\""));
    }

    Verdict::incorrect().with_explanation(format!("The correct answer was \"{correct_answer}\""))
}

/// Normalizes an answer for comparison
///
/// Lowercases, strips punctuation and quotes, and collapses runs of
/// whitespace into a single space. Letters of any script are kept.
pub fn normalize_answer(answer: &str) -> String {
    answer
        .to_lowercase()
        .chars()
        .filter(|c| !is_ignored_punctuation(*c))
        .collect::<String>()
        .split_whitespace()
        .join(" ")
}

fn is_ignored_punctuation(c: char) -> bool {
    matches!(
        c,
        '.' | ','
            | '/'
            | '#'
            | '!'
            | '$'
            | '%'
            | '^'
            | '&'
            | '*'
            | ';'
            | ':'
            | '{'
            | '}'
            | '='
            | '-'
            | '_'
            | '`'
            | '~'
            | '('
            | ')'
            | '"'
            | '\''
            | '“'
            | '”'
            | '‘'
            | '’'
            | '«'
            | '»'
    )
}

/// `1 - distance / longest`, in `[0, 1]`
fn similarity(a: &str, b: &str) -> f64 {
    let longest = a.chars().count().max(b.chars().count());
    if longest == 0 {
        return 0.;
    }
    1. - levenshtein(a, b) as f64 / longest as f64
}

fn levenshtein(a: &str, b: &str) -> usize {
    let a = a.chars().collect_vec();
    let b = b.chars().collect_vec();

    let mut previous = (0..=b.len()).collect_vec();
    let mut current = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = previous[j] + usize::from(ca != cb);
            current[j + 1] = substitution
                .min(previous[j + 1] + 1)
                .min(current[j] + 1);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[b.len()]
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::quiz::question::AudioChallengeType;
    use rstest::rstest;

    fn text_submission<'a>(team_answer: &'a str, correct_answer: &'a str) -> Submission<'a> {
        Submission {
            team_answer,
            correct_answer,
            kind: QuestionKind::Text,
            recording: None,
            passing_score: 60.,
        }
    }

    fn recording(score: Option<f64>) -> Recording {
        Recording {
            uri: "file:///tmp/take.m4a".to_string(),
            name: "take.m4a".to_string(),
            mime_type: "audio/m4a".to_string(),
            score,
        }
    }

    #[rstest]
    #[case("Paris", "Paris", true)]
    #[case("  PARIS  ", "paris", true)]
    #[case("paris!", "Paris", true)]
    #[case("«Москва»", "москва", true)]
    #[case("the city of Paris", "Paris", true)]
    #[case("Pariss", "Paris", true)]
    #[case("Tolstoi", "Tolstoy", true)]
    #[case("London", "Paris", false)]
    #[case("", "Paris", false)]
    #[case("...", "Paris", false)]
    #[case("the quick brown fax", "the quick brown fox", false)]
    fn test_local_judge_text(#[case] team: &str, #[case] correct: &str, #[case] expected: bool) {
        let verdict = LocalJudge.judge(&text_submission(team, correct)).unwrap();
        assert_eq!(verdict.is_correct, expected, "{team:?} vs {correct:?}");
    }

    #[test]
    fn test_exact_match_has_no_explanation() {
        let verdict = LocalJudge.judge(&text_submission("Paris", "paris")).unwrap();
        assert_eq!(verdict, Verdict::correct());
    }

    #[test]
    fn test_incorrect_explains_correct_answer() {
        let verdict = LocalJudge.judge(&text_submission("Rome", "Paris")).unwrap();
        assert!(!verdict.is_correct);
        assert_eq!(
            verdict.explanation.as_deref(),
            Some("The correct answer was \"Paris\"")
        );
    }

    #[test]
    fn test_normalize_answer() {
        assert_eq!(normalize_answer("  Hello,   WORLD!  "), "hello world");
        assert_eq!(normalize_answer("“Война и мир”"), "война и мир");
        assert_eq!(normalize_answer("rock-n-roll"), "rocknroll");
    }

    #[test]
    fn test_levenshtein() {
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("abc", "abc"), 0);
        assert_eq!(levenshtein("мир", "мор"), 1);
    }

    #[test]
    fn test_audio_challenge_uses_recording_score() {
        let passing = recording(Some(72.));
        let failing = recording(Some(40.));
        let kind = QuestionKind::AudioChallenge(AudioChallengeType::Singing);

        let submission = |recording| Submission {
            team_answer: "",
            correct_answer: "song",
            kind,
            recording,
            passing_score: 60.,
        };

        assert!(LocalJudge.judge(&submission(Some(&passing))).unwrap().is_correct);
        assert!(!LocalJudge.judge(&submission(Some(&failing))).unwrap().is_correct);
    }

    #[test]
    fn test_audio_challenge_without_score_is_unavailable() {
        let unscored = recording(None);
        let submission = Submission {
            team_answer: "",
            correct_answer: "song",
            kind: QuestionKind::AudioChallenge(AudioChallengeType::RhythmRepeat),
            recording: Some(&unscored),
            passing_score: 60.,
        };
        assert!(matches!(
            LocalJudge.judge(&submission),
            Err(JudgeError::Unavailable(_))
        ));
    }

    #[test]
    fn test_closure_judge() {
        let judge = |_: &Submission<'_>| -> Result<Verdict, JudgeError> {
            Err(JudgeError::Rejected("offline".to_owned()))
        };
        assert_eq!(
            judge.judge(&text_submission("a", "b")),
            Err(JudgeError::Rejected("offline".to_owned()))
        );
    }
}
