//! Presentation session management
//!
//! This module defines the trait for tunneling messages between the game
//! engine and the presentation layer that renders the current phase, along
//! with the identifier used to tell game sessions apart.

use std::{fmt::Display, str::FromStr};

use serde_with::{DeserializeFromStr, SerializeDisplay};
use uuid::Uuid;

use super::{SyncMessage, UpdateMessage};

/// A unique identifier for a game session
///
/// The identifier shows up in logs and in the challenge completion payload
/// so that results can be matched with the backend session.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, DeserializeFromStr, SerializeDisplay,
)]
pub struct Id(Uuid);

impl Id {
    /// Creates a new random session ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for Id {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for Id {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for Id {
    type Err = uuid::Error;

    /// Parses an ID from a UUID string
    ///
    /// # Errors
    ///
    /// Returns a `uuid::Error` if the string is not a valid UUID.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::from_str(s)?))
    }
}

/// Trait for sending messages to the presentation layer
///
/// Implementations might render directly to a screen, forward over a
/// bridge to a native UI, or record messages for tests.
pub trait Tunnel {
    /// Sends an update message
    ///
    /// Update messages notify the presentation layer about changes that
    /// affect its current view, such as a phase change or a timer tick.
    ///
    /// # Arguments
    ///
    /// * `message` - The update message to send
    fn send_message(&self, message: &UpdateMessage);

    /// Sends a state synchronization message
    ///
    /// Sync messages carry a full snapshot of the current phase, typically
    /// sent when a screen is (re)mounted.
    ///
    /// # Arguments
    ///
    /// * `state` - The synchronization message to send
    fn send_state(&self, state: &SyncMessage);

    /// Closes the tunnel
    ///
    /// Called once the session is finished and nothing else will be sent.
    fn close(self);
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_id_round_trips_through_string() {
        let id = Id::new();
        let parsed: Id = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_id_rejects_garbage() {
        assert!("not-a-uuid".parse::<Id>().is_err());
    }

    #[test]
    fn test_id_serializes_as_string() {
        let id = Id::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{id}\""));
    }
}
