//! Domain store for the event agent pipeline.
//!
//! The pipeline consumes the [`DomainStore`] capability; [`InMemoryStore`] is
//! the in-process implementation used by the demo front end and tests.

#![warn(missing_docs, clippy::pedantic)]

mod error;
mod memory;
mod store;

pub use error::{StoreError, StoreResult};
pub use memory::{InMemoryStore, SEED_ATTENDEES, SEED_EVENTS};
pub use store::{DomainStore, format_catalog};
