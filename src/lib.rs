//! # What? Where? When? Game Library
//!
//! This library provides the core game logic for team play of "What? Where?
//! When?" style quizzes. It walks a team through timed rounds of discussion
//! and answering, judges the answers, and tallies the results once the last
//! round is played.

#![cfg_attr(all(coverage_nightly, test), feature(coverage_attribute))]
#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::too_many_arguments)]
#![allow(clippy::similar_names)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::ignored_unit_patterns)]
#![allow(clippy::struct_field_names)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::wildcard_imports)]
use serde::{Deserialize, Serialize};

pub mod constants;

pub mod game;
pub mod judge;
pub mod quiz;
pub mod roster;
pub mod round;
pub mod score;
pub mod session;
pub mod timer;

/// Messages sent to synchronize the presentation layer with a session
#[derive(Debug, Serialize, Clone, derive_more::From)]
pub enum SyncMessage {
    /// General game synchronization messages
    Game(game::SyncMessage),
}

impl SyncMessage {
    /// Converts the sync message to a JSON string for transmission
    ///
    /// # Panics
    ///
    /// This method panics if serialization fails, which should never happen
    /// with the default JSON serializer for well-formed data.
    pub fn to_message(&self) -> String {
        serde_json::to_string(self).expect("default serializer cannot fail")
    }
}

/// Messages sent to update specific aspects of the presentation
///
/// Phase changes come from the game itself, while the once-a-second
/// countdown updates come from the timers.
#[derive(Debug, Serialize, Clone, derive_more::From)]
pub enum UpdateMessage {
    /// General game update messages
    Game(game::UpdateMessage),
    /// Countdown updates
    Timer(timer::UpdateMessage),
}

impl UpdateMessage {
    /// Converts the update message to a JSON string for transmission
    ///
    /// # Panics
    ///
    /// This method panics if serialization fails, which should never happen
    /// with the default JSON serializer for well-formed data.
    pub fn to_message(&self) -> String {
        serde_json::to_string(self).expect("default serializer cannot fail")
    }
}

/// Alarm messages for the timers of a round
///
/// The host delivers each alarm back to the session once its delay has
/// elapsed. Alarms carry the round they were scheduled for so that late
/// deliveries can be told apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlarmMessage {
    /// Tick of the discussion countdown
    Discussion {
        /// Round the tick was scheduled in
        index: usize,
        /// The scheduled tick
        tick: timer::Tick,
    },
    /// Tick of the answer timer
    Answer {
        /// Round the tick was scheduled in
        index: usize,
        /// The scheduled tick
        tick: timer::Tick,
    },
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::{game::GamePhase, timer::Countdown};

    #[test]
    fn test_sync_message_to_message() {
        let sync_msg = SyncMessage::Game(game::SyncMessage::Waiting {
            team_name: "Owls".to_string(),
            players: vec!["Player1".to_string(), "Player2".to_string()],
            count: 3,
        });
        let json_str = sync_msg.to_message();

        assert!(json_str.contains("Game"));
        assert!(json_str.contains("Waiting"));
        assert!(json_str.contains("Player2"));
    }

    #[test]
    fn test_update_message_to_message() {
        let update_msg = UpdateMessage::from(game::UpdateMessage::Paused(GamePhase::Discussion));
        assert_eq!(update_msg.to_message(), r#"{"Game":{"Paused":"Discussion"}}"#);
    }

    #[test]
    fn test_timer_update_to_message() {
        let snapshot = Countdown::new(60).snapshot();
        let update_msg = UpdateMessage::from(timer::UpdateMessage::DiscussionTick(snapshot));
        let json_str = update_msg.to_message();

        assert!(json_str.starts_with(r#"{"Timer":{"DiscussionTick":"#));
        assert!(json_str.contains(r#""time_left":60"#));
        assert!(!json_str.contains("phase"));
    }
}
