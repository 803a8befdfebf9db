//! # LearnSmart Common Library
//!
//! Shared code for the LearnSmart backend including:
//! - Database initialization and settings access
//! - Configuration loading
//! - Password hashing and bearer token helpers
//! - Gamification rules (leveling curve, badges, streaks, achievements)
//! - Course record transformation and learner preferences

pub mod achievements;
pub mod auth;
pub mod badges;
pub mod config;
pub mod course;
pub mod db;
pub mod error;
pub mod leveling;
pub mod preferences;
pub mod streak;

pub use error::{Error, Result};
pub use leveling::LevelProgress;
