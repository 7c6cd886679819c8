//! Core game logic and state management
//!
//! This module contains the [`GameSession`], which walks a team through the
//! rounds of a quiz. Every round goes through the same phases:
//!
//! ```text
//! Waiting -> Question -> [MediaPlayback] -> Discussion -> Answer -> Feedback
//!                ^                                                     |
//!                +---------------------- next round -------------------+
//! ```
//!
//! The session is driven from the outside: user input arrives as
//! [`Action`]s through [`GameSession::apply`], and timer ticks scheduled by
//! the session come back through [`GameSession::receive_alarm`]. Everything
//! the presentation layer needs to know is announced through a [`Tunnel`].

use std::fmt::Debug;

use garde::Validate;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use tracing::{debug, info, warn};
use web_time::{Duration, SystemTime};

use super::{
    AlarmMessage,
    constants::timing::*,
    judge::{Judge, JudgeError},
    quiz::{
        config::{Quiz, validate_duration},
        media::Media,
        question::{Difficulty, QuestionKind},
    },
    roster::{self, Roster},
    round::{Recording, RoundData, SubmissionError},
    score::{ChallengeCompletion, Grade, PlayerPerformance, ScoreAccumulator},
    session::{Id, Tunnel},
    timer::{self, AnswerTimer, Countdown, CountdownEvent, Tick, TimerEvent},
};

/// Phases a round goes through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, derive_more::Display)]
pub enum GamePhase {
    /// Before the first round, while the team gets ready
    Waiting,
    /// The question is shown
    Question,
    /// Audio or video attached to the question is playing
    MediaPlayback,
    /// The team discusses against the round timer
    Discussion,
    /// The team enters its answer against the answer timer
    Answer,
    /// The verdict is shown
    Feedback,
}

/// Overall state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, derive_more::Display)]
pub enum State {
    /// A phase is running
    #[display("{_0}")]
    Active(GamePhase),
    /// A phase is on hold with its timer stopped
    #[display("paused {_0}")]
    Paused(GamePhase),
    /// The game is over, either completed or abandoned
    #[display("done")]
    Done,
}

impl State {
    /// The running phase, if any
    pub fn phase(self) -> Option<GamePhase> {
        match self {
            Self::Active(phase) => Some(phase),
            Self::Paused(_) | Self::Done => None,
        }
    }
}

/// Configuration options for a session
#[serde_with::serde_as]
#[skip_serializing_none]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct Options {
    /// Length of the discussion phase
    #[garde(custom(validate_duration::<MIN_ROUND_TIME, MAX_ROUND_TIME>))]
    #[serde_as(as = "serde_with::DurationMilliSeconds<u64>")]
    pub round_time: Duration,
    /// Grace period of the answer timer before anything is typed
    #[garde(custom(validate_duration::<MIN_TYPING_TIME, MAX_TYPING_TIME>))]
    #[serde_as(as = "serde_with::DurationMilliSeconds<u64>")]
    pub typing_time: Duration,
    /// Window to finish the answer once typing started
    #[garde(custom(validate_duration::<MIN_COMPLETION_TIME, MAX_COMPLETION_TIME>))]
    #[serde_as(as = "serde_with::DurationMilliSeconds<u64>")]
    pub completion_time: Duration,
    /// Percentage of correct answers needed to complete a challenge
    #[garde(range(min = 0., max = 100.))]
    pub minimum_score: Option<f64>,
    /// Whether questions are announced with a hint
    #[garde(skip)]
    pub show_hints: bool,
    /// How much the hints give away
    #[garde(skip)]
    pub hint_difficulty: Difficulty,
    /// Whether verdicts come from the AI host rather than the local judge
    #[garde(skip)]
    pub ai_host: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            round_time: Duration::from_secs(DEFAULT_ROUND_TIME),
            typing_time: Duration::from_secs(DEFAULT_TYPING_TIME),
            completion_time: Duration::from_secs(DEFAULT_COMPLETION_TIME),
            minimum_score: None,
            show_hints: false,
            hint_difficulty: Difficulty::default(),
            ai_host: false,
        }
    }
}

/// Inputs that move a session forward
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, derive_more::Display)]
pub enum Action {
    /// Add a player while waiting
    #[display("AddPlayer")]
    AddPlayer(String),
    /// Remove a player while waiting
    #[display("RemovePlayer")]
    RemovePlayer(String),
    /// Leave the waiting screen for the first question
    Start,
    /// Leave the question for media playback or discussion
    StartDiscussion,
    /// The media player finished loading
    MediaReady,
    /// The media segment finished playing
    MediaEnded,
    /// The team skipped the media
    SkipMedia,
    /// The team is ready to answer before the discussion time is up
    EndDiscussion,
    /// The team answer changed
    #[display("SetAnswer")]
    SetAnswer(String),
    /// The discussion notes changed
    #[display("SetNotes")]
    SetNotes(String),
    /// The player credited with the answer changed
    #[display("SetPlayer")]
    SetPlayer(Option<String>),
    /// The recorder delivered a recording
    #[display("RecordingCaptured")]
    RecordingCaptured(Recording),
    /// Submit the answer for judging
    SubmitAnswer,
    /// Leave the feedback for the next round or the results
    Next,
    /// Put the running phase on hold
    Pause,
    /// Continue a paused phase
    Resume,
}

/// Errors reported by a session
#[derive(thiserror::Error, Serialize, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The action does not apply in the current state
    #[error("{action} is not allowed while {state}")]
    NotAllowed {
        /// Name of the rejected action
        action: String,
        /// State the session was in
        state: State,
    },
    /// The submission failed validation
    #[error(transparent)]
    Submission(#[from] SubmissionError),
    /// The judge could not reach a verdict
    #[error(transparent)]
    Judge(#[from] JudgeError),
    /// The roster refused a player
    #[error(transparent)]
    Roster(#[from] roster::Error),
}

/// Update messages sent to the presentation layer about state changes
#[skip_serializing_none]
#[derive(Debug, Serialize, Clone)]
pub enum UpdateMessage {
    /// The team changed while waiting
    Waiting {
        /// Name of the team
        team_name: String,
        /// Players in joining order
        players: Vec<String>,
    },
    /// A question is shown
    Question {
        /// Round index
        index: usize,
        /// Number of rounds
        count: usize,
        /// The prompt
        question: String,
        /// Media attached to the question
        media: Option<Media>,
        /// Hint, when hints are enabled
        hint: Option<String>,
    },
    /// The question media has to be played
    MediaPlayback {
        /// Round index
        index: usize,
        /// Media to play
        media: Option<Media>,
    },
    /// The media player is ready
    MediaReady {
        /// Round index
        index: usize,
    },
    /// The discussion started
    Discussion {
        /// Round index
        index: usize,
        /// Discussion countdown
        timer: timer::Snapshot,
    },
    /// The answer phase started
    Answer {
        /// Round index
        index: usize,
        /// How the team answers
        kind: QuestionKind,
        /// Answer timer, absent for audio challenges
        timer: Option<timer::Snapshot>,
    },
    /// The round was judged
    Feedback {
        /// Round index
        index: usize,
        /// Number of rounds
        count: usize,
        /// The finalized round
        round: RoundData,
        /// Team score so far
        score: usize,
        /// Whether the verdict should be presented by the AI host
        ai_host: bool,
    },
    /// The running phase was put on hold
    Paused(GamePhase),
    /// The paused phase continues
    Resumed(GamePhase),
    /// Something has to be shown to the team before it can continue
    Alert(Error),
    /// The game is over
    Summary(SummaryMessage),
}

/// Sync messages describing the whole current state
///
/// These are sent when the presentation layer (re)attaches to a session.
#[skip_serializing_none]
#[derive(Debug, Serialize, Clone)]
pub enum SyncMessage {
    /// Waiting for the team to start
    Waiting {
        /// Name of the team
        team_name: String,
        /// Players in joining order
        players: Vec<String>,
        /// Number of rounds
        count: usize,
    },
    /// A question is shown
    Question {
        /// Round index
        index: usize,
        /// Number of rounds
        count: usize,
        /// The prompt
        question: String,
        /// Media attached to the question
        media: Option<Media>,
        /// Hint, when hints are enabled
        hint: Option<String>,
    },
    /// The question media is playing
    MediaPlayback {
        /// Round index
        index: usize,
        /// Number of rounds
        count: usize,
        /// Media being played
        media: Option<Media>,
    },
    /// The team is discussing
    Discussion {
        /// Round index
        index: usize,
        /// Number of rounds
        count: usize,
        /// Answer typed so far
        team_answer: String,
        /// Notes taken so far
        notes: String,
        /// Discussion countdown
        timer: timer::Snapshot,
    },
    /// The team is answering
    Answer {
        /// Round index
        index: usize,
        /// Number of rounds
        count: usize,
        /// How the team answers
        kind: QuestionKind,
        /// Answer typed so far
        team_answer: String,
        /// Player credited so far
        player: Option<String>,
        /// Answer timer, absent for audio challenges
        timer: Option<timer::Snapshot>,
    },
    /// The verdict is shown
    Feedback {
        /// Round index
        index: usize,
        /// Number of rounds
        count: usize,
        /// The finalized round
        round: RoundData,
        /// Team score so far
        score: usize,
        /// Whether the verdict should be presented by the AI host
        ai_host: bool,
    },
    /// A phase is on hold
    Paused {
        /// Round index
        index: usize,
        /// Number of rounds
        count: usize,
        /// Phase on hold
        phase: GamePhase,
    },
    /// The game was completed
    Summary(SummaryMessage),
    /// The game was left before completion
    Abandoned,
}

/// Results of a completed game
#[serde_with::serde_as]
#[skip_serializing_none]
#[derive(Debug, Serialize, Clone)]
pub struct SummaryMessage {
    /// Name of the team
    pub team_name: String,
    /// Rounds answered correctly
    pub score: usize,
    /// Rounds played
    pub total_rounds: usize,
    /// Percentage of correct answers
    pub correct_percentage: f64,
    /// Whether the configured minimum was met
    pub meets_minimum_score: bool,
    /// Letter grade
    pub grade: Grade,
    /// Encouragement
    pub message: String,
    /// Host commentary
    pub feedback: String,
    /// Per-player breakdown in order of first appearance
    pub players: Vec<PlayerPerformance>,
    /// Every round in play order
    pub rounds: Vec<RoundData>,
    /// Time from the first question to the end of the last round
    #[serde_as(as = "Option<serde_with::DurationMilliSeconds<u64>>")]
    pub duration: Option<Duration>,
    /// Whether the commentary should be presented by the AI host
    pub ai_host: bool,
}

/// A team playing through a quiz
#[derive(Serialize, Deserialize)]
pub struct GameSession {
    /// Identifies the session in logs and completion payloads
    id: Id,
    /// Questions being played
    quiz: Quiz,
    /// Session configuration
    options: Options,
    /// The team
    roster: Roster,
    /// One record per question, in play order
    rounds: Vec<RoundData>,
    /// Index of the round being played
    current_round: usize,
    /// Rounds answered correctly so far
    score: usize,
    /// Current state
    state: State,
    /// Discussion countdown
    discussion: Countdown,
    /// Answer timer
    answer_timer: AnswerTimer,
    /// When the first question was shown
    started_at: Option<SystemTime>,
    /// When the game ended
    finished_at: Option<SystemTime>,
    /// Tally of a completed game
    results: Option<ScoreAccumulator>,
}

impl Debug for GameSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameSession")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("current_round", &self.current_round)
            .finish_non_exhaustive()
    }
}

fn announce<T: Tunnel>(tunnel: &T, message: impl Into<super::UpdateMessage>) {
    tunnel.send_message(&message.into());
}

fn discussion_ticks<S: FnMut(AlarmMessage, Duration)>(
    index: usize,
    mut schedule: S,
) -> impl FnMut(Tick, Duration) {
    move |tick, delay| schedule(AlarmMessage::Discussion { index, tick }, delay)
}

fn answer_ticks<S: FnMut(AlarmMessage, Duration)>(
    index: usize,
    mut schedule: S,
) -> impl FnMut(Tick, Duration) {
    move |tick, delay| schedule(AlarmMessage::Answer { index, tick }, delay)
}

// Convenience methods
impl GameSession {
    fn current(&self) -> &RoundData {
        &self.rounds[self.current_round]
    }

    fn current_mut(&mut self) -> &mut RoundData {
        &mut self.rounds[self.current_round]
    }

    fn hint(&self) -> Option<String> {
        self.options.show_hints.then(|| {
            self.quiz.questions[self.current_round].hint(self.options.hint_difficulty)
        })
    }

    fn is_audio_challenge(&self) -> bool {
        self.current().kind.is_audio_challenge()
    }
}

impl GameSession {
    /// Creates a session waiting for the team to start
    ///
    /// `quiz` and `options` are expected to have passed validation.
    ///
    /// # Panics
    ///
    /// In debug builds, panics if the quiz has no questions.
    pub fn new(id: Id, quiz: Quiz, options: Options, roster: Roster) -> Self {
        debug_assert!(!quiz.is_empty(), "a game needs at least one question");
        let rounds = quiz.questions.iter().map(RoundData::from).collect_vec();

        Self {
            id,
            discussion: Countdown::new(options.round_time.as_secs()),
            answer_timer: AnswerTimer::new(
                options.typing_time.as_secs(),
                options.completion_time.as_secs(),
            ),
            quiz,
            options,
            roster,
            rounds,
            current_round: 0,
            score: 0,
            state: State::Active(GamePhase::Waiting),
            started_at: None,
            finished_at: None,
            results: None,
        }
    }

    /// Session identifier
    pub fn id(&self) -> Id {
        self.id
    }

    /// Current state
    pub fn state(&self) -> State {
        self.state
    }

    /// Session configuration
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// The team
    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    /// Index of the round being played
    pub fn current_round(&self) -> usize {
        self.current_round
    }

    /// Number of rounds
    pub fn round_count(&self) -> usize {
        self.rounds.len()
    }

    /// Rounds answered correctly so far
    pub fn score(&self) -> usize {
        self.score
    }

    /// All round records in play order
    pub fn rounds(&self) -> &[RoundData] {
        &self.rounds
    }

    /// Discussion countdown
    pub fn discussion(&self) -> &Countdown {
        &self.discussion
    }

    /// Answer timer
    pub fn answer_timer(&self) -> &AnswerTimer {
        &self.answer_timer
    }

    /// When the first question was shown
    pub fn started_at(&self) -> Option<SystemTime> {
        self.started_at
    }

    /// When the game ended
    pub fn finished_at(&self) -> Option<SystemTime> {
        self.finished_at
    }

    /// How long the game ran, once it has started and ended
    pub fn duration(&self) -> Option<Duration> {
        let (started_at, finished_at) = self.started_at.zip(self.finished_at)?;
        finished_at.duration_since(started_at).ok()
    }

    /// Tally of the game, once it has been completed
    pub fn results(&self) -> Option<&ScoreAccumulator> {
        self.results.as_ref()
    }

    /// Applies a user action
    ///
    /// Actions that do not apply to the current state are rejected and leave
    /// the session untouched.
    ///
    /// # Arguments
    ///
    /// * `action` - What the team did
    /// * `judge` - Decides correctness when the answer is submitted
    /// * `schedule_message` - Function to schedule timer alarms
    /// * `tunnel` - Where state changes are announced
    ///
    /// # Errors
    ///
    /// * `Error::NotAllowed` - The action does not apply right now
    /// * `Error::Submission` - The answer, notes or player were refused
    /// * `Error::Judge` - The judge failed; the round stays in the answer phase
    /// * `Error::Roster` - A player could not be added
    pub fn apply<J, S, T>(
        &mut self,
        action: Action,
        judge: &J,
        mut schedule_message: S,
        tunnel: &T,
    ) -> Result<(), Error>
    where
        J: Judge + ?Sized,
        S: FnMut(AlarmMessage, Duration),
        T: Tunnel,
    {
        use GamePhase::*;

        match (action, self.state) {
            (Action::AddPlayer(name), State::Active(Waiting)) => {
                let name = self.roster.add_player(&name)?;
                debug!(session = %self.id, player = %name, "Player joined");
                self.announce_roster(tunnel);
            }
            (Action::RemovePlayer(name), State::Active(Waiting)) => {
                if self.roster.remove_player(&name) {
                    debug!(session = %self.id, player = %name, "Player left");
                    self.announce_roster(tunnel);
                }
            }
            (Action::Start, State::Active(Waiting)) => {
                self.started_at = Some(SystemTime::now());
                info!(
                    session = %self.id,
                    team = %self.roster.team_name(),
                    rounds = self.rounds.len(),
                    ai_host = self.options.ai_host,
                    "Game started"
                );
                self.enter_question(tunnel);
            }
            (Action::StartDiscussion, State::Active(Question)) => {
                if self.current().requires_playback() {
                    self.enter_media_playback(tunnel);
                } else {
                    self.enter_discussion(&mut schedule_message, tunnel);
                }
            }
            (Action::MediaReady, State::Active(MediaPlayback)) => {
                debug!(session = %self.id, round = self.current_round, "Media ready");
                announce(
                    tunnel,
                    UpdateMessage::MediaReady {
                        index: self.current_round,
                    },
                );
            }
            (Action::MediaEnded | Action::SkipMedia, State::Active(MediaPlayback)) => {
                self.enter_discussion(&mut schedule_message, tunnel);
            }
            (Action::EndDiscussion, State::Active(Discussion)) => {
                self.enter_answer(&mut schedule_message, tunnel);
            }
            (Action::SetAnswer(answer), State::Active(phase @ (Discussion | Answer))) => {
                let typed = !answer.trim().is_empty();
                self.current_mut().set_answer(answer)?;
                if typed && phase == Answer && !self.is_audio_challenge() {
                    self.start_completion_phase(&mut schedule_message, tunnel);
                }
            }
            (Action::SetNotes(notes), State::Active(Discussion | Answer)) => {
                self.current_mut().set_notes(notes)?;
            }
            (Action::SetPlayer(player), State::Active(Discussion | Answer)) => {
                self.rounds[self.current_round].set_player(player, &self.roster)?;
            }
            (Action::RecordingCaptured(recording), State::Active(Answer))
                if self.is_audio_challenge() =>
            {
                debug!(
                    session = %self.id,
                    round = self.current_round,
                    uri = %recording.uri,
                    "Recording captured"
                );
                self.current_mut().recording = Some(recording);
            }
            (Action::SubmitAnswer, State::Active(Answer)) => {
                self.submit(judge, self.answer_timer.has_auto_submitted(), tunnel)?;
            }
            (Action::Next, State::Active(Feedback)) => {
                if self.current_round + 1 >= self.rounds.len() {
                    self.finish(tunnel);
                } else {
                    self.current_round += 1;
                    self.enter_question(tunnel);
                }
            }
            (Action::Pause, State::Active(phase)) if phase != Waiting => {
                self.pause(phase, tunnel);
            }
            (Action::Resume, State::Paused(phase)) => {
                self.resume(phase, &mut schedule_message, tunnel);
            }
            (action, state) => {
                warn!(session = %self.id, %action, %state, "Rejected action");
                return Err(Error::NotAllowed {
                    action: action.to_string(),
                    state,
                });
            }
        }

        Ok(())
    }

    fn announce_roster<T: Tunnel>(&self, tunnel: &T) {
        announce(
            tunnel,
            UpdateMessage::Waiting {
                team_name: self.roster.team_name().to_owned(),
                players: self.roster.players().to_vec(),
            },
        );
    }

    fn enter_question<T: Tunnel>(&mut self, tunnel: &T) {
        self.state = State::Active(GamePhase::Question);
        debug!(session = %self.id, round = self.current_round, "Entered question phase");

        let round = self.current();
        announce(
            tunnel,
            UpdateMessage::Question {
                index: self.current_round,
                count: self.rounds.len(),
                question: round.question.clone(),
                media: round.media.clone(),
                hint: self.hint(),
            },
        );
    }

    fn enter_media_playback<T: Tunnel>(&mut self, tunnel: &T) {
        self.state = State::Active(GamePhase::MediaPlayback);
        debug!(session = %self.id, round = self.current_round, "Entered media playback");

        announce(
            tunnel,
            UpdateMessage::MediaPlayback {
                index: self.current_round,
                media: self.current().media.clone(),
            },
        );
    }

    fn enter_discussion<S: FnMut(AlarmMessage, Duration), T: Tunnel>(
        &mut self,
        schedule_message: S,
        tunnel: &T,
    ) {
        self.state = State::Active(GamePhase::Discussion);
        debug!(session = %self.id, round = self.current_round, "Entered discussion phase");

        self.discussion.restart(
            self.options.round_time.as_secs(),
            discussion_ticks(self.current_round, schedule_message),
        );

        announce(
            tunnel,
            UpdateMessage::Discussion {
                index: self.current_round,
                timer: self.discussion.snapshot(),
            },
        );
    }

    fn enter_answer<S: FnMut(AlarmMessage, Duration), T: Tunnel>(
        &mut self,
        schedule_message: S,
        tunnel: &T,
    ) {
        self.discussion.cancel();
        self.state = State::Active(GamePhase::Answer);
        self.answer_timer.reset();
        debug!(session = %self.id, round = self.current_round, "Entered answer phase");

        let audio = self.is_audio_challenge();
        if !audio {
            let ticks = answer_ticks(self.current_round, schedule_message);
            if self.current().team_answer.trim().is_empty() {
                self.answer_timer.start(ticks);
            } else {
                self.answer_timer.start_completion_phase(ticks);
            }
        }

        announce(
            tunnel,
            UpdateMessage::Answer {
                index: self.current_round,
                kind: self.current().kind,
                timer: (!audio).then(|| self.answer_timer.snapshot()),
            },
        );
    }

    fn start_completion_phase<S: FnMut(AlarmMessage, Duration), T: Tunnel>(
        &mut self,
        schedule_message: S,
        tunnel: &T,
    ) {
        if self
            .answer_timer
            .start_completion_phase(answer_ticks(self.current_round, schedule_message))
        {
            debug!(session = %self.id, round = self.current_round, "Completion phase started");
            announce(
                tunnel,
                timer::UpdateMessage::AnswerTick(self.answer_timer.snapshot()),
            );
        }
    }

    /// Judges the current round and moves to feedback
    ///
    /// Forced submissions come from the answer timer and skip validation.
    fn submit<J: Judge + ?Sized, T: Tunnel>(
        &mut self,
        judge: &J,
        forced: bool,
        tunnel: &T,
    ) -> Result<(), Error> {
        let index = self.current_round;

        if !forced {
            if let Err(error) = self.rounds[index].validate_submission(&self.roster) {
                debug!(session = %self.id, round = index, %error, "Submission refused");
                let error = Error::from(error);
                announce(tunnel, UpdateMessage::Alert(error.clone()));
                return Err(error);
            }
        }

        let verdict = match judge.judge(&self.rounds[index].submission()) {
            Ok(verdict) => verdict,
            Err(error) => {
                warn!(session = %self.id, round = index, %error, "Judge failed, answer phase kept");
                let error = Error::from(error);
                announce(tunnel, UpdateMessage::Alert(error.clone()));
                return Err(error);
            }
        };

        self.answer_timer.stop();

        let player = self.rounds[index].attributed_player(&self.roster);
        let round = &mut self.rounds[index];
        round.record_verdict(verdict, player);
        if round.is_correct {
            self.score += 1;
        }

        self.state = State::Active(GamePhase::Feedback);
        info!(
            session = %self.id,
            round = index,
            correct = self.rounds[index].is_correct,
            forced,
            score = self.score,
            "Round judged"
        );

        announce(
            tunnel,
            UpdateMessage::Feedback {
                index,
                count: self.rounds.len(),
                round: self.rounds[index].clone(),
                score: self.score,
                ai_host: self.options.ai_host,
            },
        );

        Ok(())
    }

    fn pause<T: Tunnel>(&mut self, phase: GamePhase, tunnel: &T) {
        match phase {
            GamePhase::Discussion => self.discussion.cancel(),
            GamePhase::Answer => self.answer_timer.cancel(),
            _ => (),
        }

        self.state = State::Paused(phase);
        info!(session = %self.id, round = self.current_round, %phase, "Game paused");
        announce(tunnel, UpdateMessage::Paused(phase));
    }

    fn resume<S: FnMut(AlarmMessage, Duration), T: Tunnel>(
        &mut self,
        phase: GamePhase,
        schedule_message: S,
        tunnel: &T,
    ) {
        self.state = State::Active(phase);

        match phase {
            GamePhase::Discussion => self
                .discussion
                .start(discussion_ticks(self.current_round, schedule_message)),
            GamePhase::Answer if !self.is_audio_challenge() => self
                .answer_timer
                .resume(answer_ticks(self.current_round, schedule_message)),
            _ => (),
        }

        info!(session = %self.id, round = self.current_round, %phase, "Game resumed");
        announce(tunnel, UpdateMessage::Resumed(phase));
    }

    fn finish<T: Tunnel>(&mut self, tunnel: &T) {
        self.state = State::Done;
        self.finished_at = Some(SystemTime::now());

        let results = ScoreAccumulator::new(self.rounds.clone());
        info!(
            session = %self.id,
            score = results.score(),
            rounds = results.total_rounds(),
            percentage = results.correct_percentage(),
            "Game completed"
        );
        self.results = Some(results);

        if let Some(summary) = self.summary() {
            announce(tunnel, UpdateMessage::Summary(summary));
        }
    }

    /// Handles a timer alarm scheduled by this session
    ///
    /// Alarms for another round, another phase, or a cancelled timer are
    /// ignored. When the discussion time runs out the session moves to the
    /// answer phase; when the answer time runs out the answer is submitted as
    /// it stands.
    pub fn receive_alarm<J, S, T>(
        &mut self,
        message: AlarmMessage,
        judge: &J,
        mut schedule_message: S,
        tunnel: &T,
    ) where
        J: Judge + ?Sized,
        S: FnMut(AlarmMessage, Duration),
        T: Tunnel,
    {
        match message {
            AlarmMessage::Discussion { index, tick } => {
                if self.state != State::Active(GamePhase::Discussion) || index != self.current_round
                {
                    debug!(session = %self.id, round = index, "Ignored discussion alarm");
                    return;
                }

                match self
                    .discussion
                    .tick(tick, discussion_ticks(index, &mut schedule_message))
                {
                    CountdownEvent::Stale => {
                        debug!(session = %self.id, round = index, "Ignored stale discussion tick");
                    }
                    CountdownEvent::Ticked(_) => announce(
                        tunnel,
                        timer::UpdateMessage::DiscussionTick(self.discussion.snapshot()),
                    ),
                    CountdownEvent::Expired => {
                        debug!(session = %self.id, round = index, "Discussion time is up");
                        self.enter_answer(&mut schedule_message, tunnel);
                    }
                }
            }
            AlarmMessage::Answer { index, tick } => {
                if self.state != State::Active(GamePhase::Answer) || index != self.current_round {
                    debug!(session = %self.id, round = index, "Ignored answer alarm");
                    return;
                }

                match self
                    .answer_timer
                    .tick(tick, answer_ticks(index, &mut schedule_message))
                {
                    TimerEvent::Stale => {
                        debug!(session = %self.id, round = index, "Ignored stale answer tick");
                    }
                    TimerEvent::Ticked(_) => announce(
                        tunnel,
                        timer::UpdateMessage::AnswerTick(self.answer_timer.snapshot()),
                    ),
                    TimerEvent::AutoSubmit => {
                        info!(session = %self.id, round = index, "Answer time is up, submitting");
                        if let Err(error) = self.submit(judge, true, tunnel) {
                            debug!(
                                session = %self.id,
                                round = index,
                                %error,
                                "Automatic submission pending retry"
                            );
                        }
                    }
                }
            }
        }
    }

    /// Abandons the session
    ///
    /// Pending alarms become stale, an unjudged recording is dropped and the
    /// tunnel is closed. No summary is produced.
    pub fn mark_as_done<T: Tunnel>(&mut self, tunnel: T) {
        self.discussion.cancel();
        self.answer_timer.cancel();

        if let Some(round) = self.rounds.get_mut(self.current_round) {
            if !round.is_answered() {
                round.recording = None;
            }
        }

        if self.results.is_none() {
            info!(session = %self.id, round = self.current_round, "Game abandoned");
        }

        self.state = State::Done;
        self.finished_at.get_or_insert_with(SystemTime::now);

        tunnel.close();
    }

    /// Results of a completed game
    pub fn summary(&self) -> Option<SummaryMessage> {
        let results = self.results.as_ref()?;

        Some(SummaryMessage {
            team_name: self.roster.team_name().to_owned(),
            score: results.score(),
            total_rounds: results.total_rounds(),
            correct_percentage: results.correct_percentage(),
            meets_minimum_score: results.meets_minimum_score(self.options.minimum_score),
            grade: results.grade(),
            message: results.results_message().to_owned(),
            feedback: results.feedback(),
            players: results.player_performances().to_vec(),
            rounds: results.rounds().to_vec(),
            duration: self.duration(),
            ai_host: self.options.ai_host,
        })
    }

    /// Payload for the challenge completion endpoint, once the game is completed
    pub fn completion(&self) -> Option<ChallengeCompletion> {
        self.results
            .as_ref()
            .map(|results| results.completion(self.roster.team_name(), self.options.minimum_score))
    }

    /// Sends the full current state, e.g. when a screen is (re)mounted
    pub fn sync<T: Tunnel>(&self, tunnel: &T) {
        tunnel.send_state(&self.state_message());
    }

    /// Returns the message necessary to synchronize the presentation layer
    pub fn state_message(&self) -> super::SyncMessage {
        let index = self.current_round;
        let count = self.rounds.len();

        let message = match self.state {
            State::Active(GamePhase::Waiting) => SyncMessage::Waiting {
                team_name: self.roster.team_name().to_owned(),
                players: self.roster.players().to_vec(),
                count,
            },
            State::Active(GamePhase::Question) => SyncMessage::Question {
                index,
                count,
                question: self.current().question.clone(),
                media: self.current().media.clone(),
                hint: self.hint(),
            },
            State::Active(GamePhase::MediaPlayback) => SyncMessage::MediaPlayback {
                index,
                count,
                media: self.current().media.clone(),
            },
            State::Active(GamePhase::Discussion) => SyncMessage::Discussion {
                index,
                count,
                team_answer: self.current().team_answer.clone(),
                notes: self.current().discussion_notes.clone(),
                timer: self.discussion.snapshot(),
            },
            State::Active(GamePhase::Answer) => SyncMessage::Answer {
                index,
                count,
                kind: self.current().kind,
                team_answer: self.current().team_answer.clone(),
                player: self.current().player_who_answered.clone(),
                timer: (!self.is_audio_challenge()).then(|| self.answer_timer.snapshot()),
            },
            State::Active(GamePhase::Feedback) => SyncMessage::Feedback {
                index,
                count,
                round: self.current().clone(),
                score: self.score,
                ai_host: self.options.ai_host,
            },
            State::Paused(phase) => SyncMessage::Paused {
                index,
                count,
                phase,
            },
            State::Done => self
                .summary()
                .map_or(SyncMessage::Abandoned, SyncMessage::Summary),
        };

        message.into()
    }
}
