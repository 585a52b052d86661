//! Core shared types for the event agent pipeline.

#![warn(missing_docs, clippy::pedantic)]

mod error;
mod ids;
mod record;

/// Error type and result alias shared across the workspace.
pub use error::{Error, Result};
/// Identifiers for runs, events, and attendees.
pub use ids::{AttendeeId, EventId, RunId};
/// Catalog records and the catalog's name comparison rule.
pub use record::{Attendee, Event, names_match};
