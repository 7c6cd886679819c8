//! Team roster management and validation
//!
//! A game is played by a single team. This module keeps the team name and
//! its players, making sure names are unique, short enough and free of
//! inappropriate content.

use std::collections::HashSet;

use heck::ToTitleCase;
use rustrict::CensorStr;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::roster::*;

/// Generates a random team name such as "Brave Otter"
pub fn random_team_name() -> String {
    petname::petname(2, " ")
        .unwrap_or_else(|| "Quiz Team".to_owned())
        .to_title_case()
}

/// Serialization helper for Roster struct
#[derive(Deserialize)]
struct RosterSerde {
    team_name: String,
    players: Vec<String>,
}

/// The team playing a session
///
/// Players keep the order in which they were added, which is also the
/// order offered when picking who answered.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "RosterSerde")]
pub struct Roster {
    team_name: String,
    players: Vec<String>,

    /// Set of all player names for quick uniqueness checks (not serialized)
    #[serde(skip_serializing)]
    existing: HashSet<String>,
}

impl From<RosterSerde> for Roster {
    fn from(serde: RosterSerde) -> Self {
        let RosterSerde { team_name, players } = serde;
        let existing = players.iter().cloned().collect();
        Self {
            team_name,
            players,
            existing,
        }
    }
}

impl Default for Roster {
    fn default() -> Self {
        Self {
            team_name: random_team_name(),
            players: Vec::new(),
            existing: HashSet::new(),
        }
    }
}

/// Errors that can occur while building a roster
#[derive(Error, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The requested name is already in use by another player
    #[error("name already in-use")]
    Used,
    /// The name is empty or contains only whitespace
    #[error("name cannot be empty")]
    Empty,
    /// The name contains inappropriate content
    #[error("name is inappropriate")]
    Sinful,
    /// The name exceeds the maximum allowed length
    #[error("name is too long")]
    TooLong,
    /// The team cannot take any more players
    #[error("team is full")]
    Full,
}

fn clean_name(name: &str, max_length: usize) -> Result<&str, Error> {
    let name = rustrict::trim_whitespace(name);
    if name.chars().count() > max_length {
        return Err(Error::TooLong);
    }
    if name.is_empty() {
        return Err(Error::Empty);
    }
    if name.is_inappropriate() {
        return Err(Error::Sinful);
    }
    Ok(name)
}

impl Roster {
    /// Creates an empty roster for the named team
    ///
    /// # Errors
    ///
    /// * `Error::TooLong` - Name exceeds the team name limit
    /// * `Error::Empty` - Name is empty after trimming whitespace
    /// * `Error::Sinful` - Name contains inappropriate content
    pub fn new(team_name: &str) -> Result<Self, Error> {
        let team_name = clean_name(team_name, MAX_TEAM_NAME_LENGTH)?;
        Ok(Self {
            team_name: team_name.to_owned(),
            players: Vec::new(),
            existing: HashSet::new(),
        })
    }

    /// Creates a roster and adds every listed player in order
    ///
    /// # Errors
    ///
    /// Fails with the first error met while validating the team name or a
    /// player name.
    pub fn with_players<'a>(
        team_name: &str,
        players: impl IntoIterator<Item = &'a str>,
    ) -> Result<Self, Error> {
        let mut roster = Self::new(team_name)?;
        for player in players {
            roster.add_player(player)?;
        }
        Ok(roster)
    }

    /// Name of the team
    pub fn team_name(&self) -> &str {
        &self.team_name
    }

    /// Players in the order they joined
    pub fn players(&self) -> &[String] {
        &self.players
    }

    /// Number of players
    pub fn len(&self) -> usize {
        self.players.len()
    }

    /// Checks if the team has no players
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Whether a player with exactly this name is on the team
    pub fn contains(&self, name: &str) -> bool {
        self.existing.contains(name)
    }

    /// The only player, if the team has exactly one
    pub fn sole_player(&self) -> Option<&str> {
        match self.players.as_slice() {
            [player] => Some(player),
            _ => None,
        }
    }

    /// Whether a submission has to name the player who answered
    pub fn requires_attribution(&self) -> bool {
        self.players.len() > 1
    }

    /// Adds a player after validation
    ///
    /// # Returns
    ///
    /// The cleaned name that was added
    ///
    /// # Errors
    ///
    /// * `Error::Full` - The team already has the maximum number of players
    /// * `Error::TooLong` - Name exceeds the player name limit
    /// * `Error::Empty` - Name is empty after trimming whitespace
    /// * `Error::Sinful` - Name contains inappropriate content
    /// * `Error::Used` - Name is already taken by another player
    pub fn add_player(&mut self, name: &str) -> Result<String, Error> {
        if self.players.len() >= MAX_PLAYER_COUNT {
            return Err(Error::Full);
        }
        let name = clean_name(name, MAX_PLAYER_NAME_LENGTH)?;
        if !self.existing.insert(name.to_owned()) {
            return Err(Error::Used);
        }
        self.players.push(name.to_owned());
        Ok(name.to_owned())
    }

    /// Removes a player, returning whether they were on the team
    pub fn remove_player(&mut self, name: &str) -> bool {
        if !self.existing.remove(name) {
            return false;
        }
        self.players.retain(|player| player != name);
        true
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_roster_add_and_lookup() {
        let mut roster = Roster::new("Owls").unwrap();

        assert_eq!(roster.add_player("  Anna  "), Ok("Anna".to_string()));
        roster.add_player("Boris").unwrap();

        assert_eq!(roster.team_name(), "Owls");
        assert_eq!(roster.players(), ["Anna", "Boris"]);
        assert!(roster.contains("Anna"));
        assert!(!roster.contains("anna"));
        assert_eq!(roster.len(), 2);
    }

    #[test]
    fn test_roster_team_name_validation() {
        assert_eq!(Roster::new("   ").unwrap_err(), Error::Empty);
        assert_eq!(
            Roster::new(&"a".repeat(MAX_TEAM_NAME_LENGTH + 1)).unwrap_err(),
            Error::TooLong
        );
        assert!(Roster::new(&"a".repeat(MAX_TEAM_NAME_LENGTH)).is_ok());
        assert_eq!(Roster::new("shit").unwrap_err(), Error::Sinful);
    }

    #[test]
    fn test_roster_player_name_validation() {
        let mut roster = Roster::new("Owls").unwrap();

        assert_eq!(roster.add_player(""), Err(Error::Empty));
        assert_eq!(roster.add_player("\t\n"), Err(Error::Empty));
        assert_eq!(
            roster.add_player(&"a".repeat(MAX_PLAYER_NAME_LENGTH + 1)),
            Err(Error::TooLong)
        );
        assert_eq!(roster.add_player("fuck"), Err(Error::Sinful));
        assert!(roster.is_empty());
    }

    #[test]
    fn test_roster_cyrillic_length_counts_chars() {
        let mut roster = Roster::new("Совы").unwrap();
        let name = "Я".repeat(MAX_PLAYER_NAME_LENGTH);
        assert!(roster.add_player(&name).is_ok());
    }

    #[test]
    fn test_roster_duplicate_error() {
        let mut roster = Roster::new("Owls").unwrap();
        roster.add_player("Anna").unwrap();
        assert_eq!(roster.add_player("Anna"), Err(Error::Used));
        assert_eq!(roster.add_player("  Anna "), Err(Error::Used));
    }

    #[test]
    fn test_roster_full() {
        let mut roster = Roster::new("Owls").unwrap();
        for i in 0..MAX_PLAYER_COUNT {
            roster.add_player(&format!("Player {i}")).unwrap();
        }
        assert_eq!(roster.add_player("One more"), Err(Error::Full));
    }

    #[test]
    fn test_roster_remove_player() {
        let mut roster = Roster::with_players("Owls", ["Anna", "Boris"]).unwrap();
        assert!(roster.remove_player("Anna"));
        assert!(!roster.remove_player("Anna"));
        assert_eq!(roster.players(), ["Boris"]);
        assert_eq!(roster.add_player("Anna"), Ok("Anna".to_string()));
    }

    #[test]
    fn test_roster_attribution() {
        let solo = Roster::with_players("Owls", ["Anna"]).unwrap();
        assert_eq!(solo.sole_player(), Some("Anna"));
        assert!(!solo.requires_attribution());

        let pair = Roster::with_players("Owls", ["Anna", "Boris"]).unwrap();
        assert_eq!(pair.sole_player(), None);
        assert!(pair.requires_attribution());
    }

    #[test]
    fn test_roster_serialization_rebuilds_lookup() {
        let original = Roster::with_players("Owls", ["Anna", "Boris"]).unwrap();

        let serialized = serde_json::to_string(&original).unwrap();
        assert_eq!(
            serialized,
            r#"{"team_name":"Owls","players":["Anna","Boris"]}"#
        );

        let mut roster: Roster = serde_json::from_str(&serialized).unwrap();
        assert!(roster.contains("Boris"));
        assert_eq!(roster.add_player("Anna"), Err(Error::Used));
    }

    #[test]
    fn test_random_team_name() {
        let name = random_team_name();
        assert!(!name.is_empty());
        assert!(Roster::default().team_name().chars().count() > 0);
    }

    #[test]
    fn test_error_display() {
        assert_eq!(Error::Used.to_string(), "name already in-use");
        assert_eq!(Error::Empty.to_string(), "name cannot be empty");
        assert_eq!(Error::Sinful.to_string(), "name is inappropriate");
        assert_eq!(Error::TooLong.to_string(), "name is too long");
        assert_eq!(Error::Full.to_string(), "team is full");
    }
}
