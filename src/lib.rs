//! Timing and transform engine for judge-line rhythm charts.
//!
//! Charts follow the RPE JSON layout: a tempo timeline in beats, judge lines
//! driven by eased event tracks, and notes scrolling towards those lines.

pub mod config;
pub mod core;
pub mod error;
pub mod game;

pub use error::{Error, Result};
