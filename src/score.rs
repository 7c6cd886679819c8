//! Score accumulation and results
//!
//! Once the last round is judged, the ordered round records are handed to a
//! [`ScoreAccumulator`]. Everything it reports is derived from those records:
//! the team score, the percentage of correct answers, per-player breakdowns
//! and the texts shown on the results screen.

use serde::{Deserialize, Serialize};

use crate::round::RoundData;

/// Number of missed questions mentioned in the feedback
const FEEDBACK_TOPIC_LIMIT: usize = 3;

/// Number of characters used as a topic for very short questions
const SHORT_TOPIC_LENGTH: usize = 15;

/// How a single player did over the game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerPerformance {
    /// Player name
    pub player: String,
    /// Rounds the player answered correctly
    pub correct: usize,
    /// Rounds credited to the player
    pub total: usize,
    /// `100 * correct / total`
    pub percentage: f64,
}

/// Letter grade for a game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, derive_more::Display)]
pub enum Grade {
    /// 90% and above
    #[display("A+")]
    APlus,
    /// 80% and above
    A,
    /// 70% and above
    B,
    /// 60% and above
    C,
    /// 50% and above
    D,
    /// Below 50%
    F,
}

impl Grade {
    /// Grade for a percentage of correct answers
    pub fn from_percentage(percentage: f64) -> Self {
        match percentage {
            p if p >= 90. => Self::APlus,
            p if p >= 80. => Self::A,
            p if p >= 70. => Self::B,
            p if p >= 60. => Self::C,
            p if p >= 50. => Self::D,
            _ => Self::F,
        }
    }
}

/// Payload submitted to the challenge completion endpoint
#[derive(Debug, Clone, Serialize)]
pub struct ChallengeCompletion {
    /// Rounds answered correctly
    pub score: usize,
    /// Rounds played
    pub total_rounds: usize,
    /// Percentage of correct answers
    pub correct_percentage: f64,
    /// Whether the minimum score was met
    pub completed: bool,
    /// Name of the team that played
    pub team_name: String,
    /// Every round in play order
    pub rounds_data: Vec<RoundData>,
}

/// Serialization helper for ScoreAccumulator struct
#[derive(Deserialize)]
struct ScoreAccumulatorSerde {
    rounds: Vec<RoundData>,
}

/// Tallies a finished game
///
/// The per-player breakdown is computed on first use and cached.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "ScoreAccumulatorSerde")]
pub struct ScoreAccumulator {
    rounds: Vec<RoundData>,

    /// Per-player breakdown (computed once when needed)
    #[serde(skip)]
    performances: once_cell_serde::sync::OnceCell<Vec<PlayerPerformance>>,
}

impl From<ScoreAccumulatorSerde> for ScoreAccumulator {
    fn from(serde: ScoreAccumulatorSerde) -> Self {
        Self::new(serde.rounds)
    }
}

impl ScoreAccumulator {
    /// Creates an accumulator over judged rounds
    pub fn new(rounds: Vec<RoundData>) -> Self {
        Self {
            rounds,
            performances: once_cell_serde::sync::OnceCell::new(),
        }
    }

    /// Rounds in play order
    pub fn rounds(&self) -> &[RoundData] {
        &self.rounds
    }

    /// Number of rounds answered correctly
    pub fn score(&self) -> usize {
        self.rounds.iter().filter(|round| round.is_correct).count()
    }

    /// Number of rounds played
    pub fn total_rounds(&self) -> usize {
        self.rounds.len()
    }

    /// Percentage of rounds answered correctly
    ///
    /// A game always has at least one round; with none this reports `0`.
    pub fn correct_percentage(&self) -> f64 {
        match self.total_rounds() {
            0 => 0.,
            total => 100. * self.score() as f64 / total as f64,
        }
    }

    /// Whether the game passes an optional minimum percentage
    ///
    /// No minimum always passes.
    pub fn meets_minimum_score(&self, minimum: Option<f64>) -> bool {
        minimum.is_none_or(|minimum| self.correct_percentage() >= minimum)
    }

    /// Letter grade for the game
    pub fn grade(&self) -> Grade {
        Grade::from_percentage(self.correct_percentage())
    }

    /// Encouragement shown on the results screen
    pub fn results_message(&self) -> &'static str {
        match self.correct_percentage() {
            p if p >= 90. => "Outstanding! Your team showcased exceptional knowledge!",
            p if p >= 70. => "Great job! Your team has impressive knowledge!",
            p if p >= 50. => "Good effort! Your team did well!",
            p if p >= 30. => "Nice try! Keep learning and you'll improve!",
            _ => "Don't give up! Every game is a learning opportunity!",
        }
    }

    fn compute_performances(&self) -> Vec<PlayerPerformance> {
        let mut performances: Vec<PlayerPerformance> = Vec::new();

        for round in &self.rounds {
            let Some(player) = round.player_who_answered.as_deref() else {
                continue;
            };

            let index = match performances.iter().position(|p| p.player == player) {
                Some(index) => index,
                None => {
                    performances.push(PlayerPerformance {
                        player: player.to_owned(),
                        correct: 0,
                        total: 0,
                        percentage: 0.,
                    });
                    performances.len() - 1
                }
            };

            let performance = &mut performances[index];
            performance.total += 1;
            if round.is_correct {
                performance.correct += 1;
            }
        }

        for performance in &mut performances {
            performance.percentage = 100. * performance.correct as f64 / performance.total as f64;
        }

        performances
    }

    /// Per-player breakdown, ordered by first appearance
    ///
    /// Rounds nobody was credited with are left out.
    pub fn player_performances(&self) -> &[PlayerPerformance] {
        self.performances.get_or_init(|| self.compute_performances())
    }

    /// Player with the most correct answers, earliest on ties
    pub fn strongest_player(&self) -> Option<&PlayerPerformance> {
        self.player_performances()
            .iter()
            .reduce(|best, p| if p.correct > best.correct { p } else { best })
    }

    /// Host commentary on the whole game
    ///
    /// Names the strongest player when they answered more than one round,
    /// then lists up to three topics of missed questions.
    pub fn feedback(&self) -> String {
        let mut feedback = String::new();

        if let Some(best) = self.strongest_player().filter(|best| best.total > 1) {
            feedback += &format!(
                "{} was your strongest player, answering {} out of {} questions correctly. ",
                best.player, best.correct, best.total
            );
        }

        let topics = self
            .rounds
            .iter()
            .filter(|round| !round.is_correct)
            .take(FEEDBACK_TOPIC_LIMIT)
            .map(|round| topic(&round.question))
            .collect::<Vec<_>>();

        if topics.is_empty() {
            feedback += "Your team showed excellent knowledge across all question categories!";
        } else {
            feedback += &format!(
                "The team struggled most with questions about {}. Consider studying these topics more for next time!",
                topics.join(", ")
            );
        }

        feedback
    }

    /// Payload for the challenge completion endpoint
    pub fn completion(&self, team_name: &str, minimum: Option<f64>) -> ChallengeCompletion {
        ChallengeCompletion {
            score: self.score(),
            total_rounds: self.total_rounds(),
            correct_percentage: self.correct_percentage(),
            completed: self.meets_minimum_score(minimum),
            team_name: team_name.to_owned(),
            rounds_data: self.rounds.clone(),
        }
    }
}

/// Short topic label for a question
fn topic(question: &str) -> String {
    let words = question.split(' ').collect::<Vec<_>>();
    if words.len() > 3 {
        words[1..4].join(" ")
    } else {
        question.chars().take(SHORT_TOPIC_LENGTH).collect()
    }
}
