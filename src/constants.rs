//! Configuration constants for the What-Where-When game engine
//!
//! This module contains all the configuration limits and constraints
//! used throughout the engine to ensure data integrity and provide
//! consistent boundaries for quizzes, rosters and timers.

/// Quiz level configuration constants
pub mod quiz {
    /// Minimum number of rounds (questions) in a single game
    pub const MIN_ROUND_COUNT: usize = 1;
    /// Maximum number of rounds (questions) in a single game
    pub const MAX_ROUND_COUNT: usize = 50;
    /// Maximum length of a quiz title in characters
    pub const MAX_TITLE_LENGTH: usize = 200;
}

/// Question configuration constants
pub mod question {
    /// Maximum length of the question text in characters
    pub const MAX_QUESTION_LENGTH: usize = 500;
    /// Maximum length of the correct answer in characters
    pub const MAX_ANSWER_LENGTH: usize = 500;
    /// Maximum length of the additional information shown with a question
    pub const MAX_ADDITIONAL_INFO_LENGTH: usize = 1000;
    /// Passing score (percent) for audio-challenge recordings when a question sets none
    pub const DEFAULT_PASSING_SCORE: f64 = 60.0;
}

/// Media attachment configuration constants
pub mod media {
    /// Maximum length of a media URL
    pub const MAX_URL_LENGTH: usize = 2048;
    /// Maximum length of alt text for accessibility
    pub const MAX_ALT_LENGTH: usize = 200;
}

/// Timing configuration constants, in seconds
pub mod timing {
    /// Minimum discussion time
    pub const MIN_ROUND_TIME: u64 = 10;
    /// Maximum discussion time
    pub const MAX_ROUND_TIME: u64 = 300;
    /// Default discussion time
    pub const DEFAULT_ROUND_TIME: u64 = 60;
    /// Minimum grace period before the team starts typing an answer
    pub const MIN_TYPING_TIME: u64 = 1;
    /// Maximum grace period before the team starts typing an answer
    pub const MAX_TYPING_TIME: u64 = 60;
    /// Default grace period before the team starts typing an answer
    pub const DEFAULT_TYPING_TIME: u64 = 5;
    /// Minimum time to finish an answer once typing has started
    pub const MIN_COMPLETION_TIME: u64 = 5;
    /// Maximum time to finish an answer once typing has started
    pub const MAX_COMPLETION_TIME: u64 = 120;
    /// Default time to finish an answer once typing has started
    pub const DEFAULT_COMPLETION_TIME: u64 = 15;
}

/// Team roster configuration constants
pub mod roster {
    /// Maximum length of a team name in characters
    pub const MAX_TEAM_NAME_LENGTH: usize = 50;
    /// Maximum length of a player name in characters
    pub const MAX_PLAYER_NAME_LENGTH: usize = 30;
    /// Maximum number of players in a team
    pub const MAX_PLAYER_COUNT: usize = 12;
}

/// Free text entered during a round
pub mod answer_text {
    /// Maximum length of a team answer in characters
    pub const MAX_LENGTH: usize = 500;
    /// Maximum length of discussion notes in characters
    pub const MAX_NOTES_LENGTH: usize = 2000;
}
