//! Catalog records shared by the store and the pipeline.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::ids::{AttendeeId, EventId};

/// Compares two names the way the catalog does: ignoring case and
/// surrounding whitespace.
#[must_use]
pub fn names_match(left: &str, right: &str) -> bool {
    left.trim().to_lowercase() == right.trim().to_lowercase()
}

/// An event in the catalog.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    id: EventId,
    name: String,
}

impl Event {
    /// Creates an event record.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRecord`] when the name is blank.
    pub fn new(id: EventId, name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(Error::invalid_record("event", "name cannot be empty"));
        }
        Ok(Self { id, name })
    }

    /// Returns the event identifier.
    #[must_use]
    pub const fn id(&self) -> EventId {
        self.id
    }

    /// Returns the display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns `true` when `name` refers to this event (case-insensitive).
    #[must_use]
    pub fn is_named(&self, name: &str) -> bool {
        names_match(&self.name, name)
    }
}

/// A person registered for exactly one event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attendee {
    id: AttendeeId,
    event_id: EventId,
    name: String,
    email: String,
}

impl Attendee {
    /// Creates an attendee record. Content is not validated beyond what the
    /// store requires.
    #[must_use]
    pub fn new(
        id: AttendeeId,
        event_id: EventId,
        name: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            id,
            event_id,
            name: name.into(),
            email: email.into(),
        }
    }

    /// Returns the attendee identifier.
    #[must_use]
    pub const fn id(&self) -> AttendeeId {
        self.id
    }

    /// Returns the identifier of the owning event.
    #[must_use]
    pub const fn event_id(&self) -> EventId {
        self.event_id
    }

    /// Returns the attendee name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the attendee email.
    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_names_compare_case_insensitively() {
        let event = Event::new(EventId::new(1), "Developer Meetup").unwrap();
        assert!(event.is_named("developer meetup"));
        assert!(event.is_named("  DEVELOPER MEETUP "));
        assert!(!event.is_named("Developer"));
    }

    #[test]
    fn blank_event_names_are_rejected() {
        let err = Event::new(EventId::new(1), "   ").expect_err("blank");
        assert!(matches!(err, Error::InvalidRecord { kind: "event", .. }));
    }

    #[test]
    fn attendee_serializes_with_flat_ids() {
        let attendee = Attendee::new(
            AttendeeId::new(3),
            EventId::new(1),
            "Ann Lee",
            "ann@example.com",
        );
        let value = serde_json::to_value(&attendee).unwrap();
        assert_eq!(value["id"], 3);
        assert_eq!(value["event_id"], 1);
        assert_eq!(value["name"], "Ann Lee");
    }
}
