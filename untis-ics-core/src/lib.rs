//! untis-ics core library
//!
//! Fetches a WebUntis timetable, turns its lessons into calendar events,
//! merges double periods and encodes the result as an ICS feed.

pub mod error;
pub mod generator;
pub mod ics;
pub mod mapper;
pub mod merger;
pub mod providers;
pub mod types;
pub mod window;

// Re-export core types and error handling
pub use error::{Error, Result};
pub use types::*;
