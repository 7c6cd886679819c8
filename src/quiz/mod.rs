//! Quiz content and configuration
//!
//! This module contains what a game is played from: the quiz itself, its
//! questions and the media they carry.

pub mod config;
pub mod media;
pub mod question;
