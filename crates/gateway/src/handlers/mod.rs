//! Request handlers

pub mod callback;
pub mod decks;
pub mod generate;
pub mod health;
pub mod jobs;
pub mod review;
pub mod suggestions;
pub mod uploads;
