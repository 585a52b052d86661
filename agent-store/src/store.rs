//! The store capability consumed by the pipeline.

use agent_primitives::{Attendee, Event};
use async_trait::async_trait;

use crate::error::StoreResult;

/// Event catalog plus append-only attendee list.
///
/// Name lookups compare case-insensitively. Implementations must assign
/// attendee ids uniquely even under concurrent `add_attendee` calls.
#[async_trait]
pub trait DomainStore: Send + Sync {
    /// Returns every event in catalog order.
    async fn list_events(&self) -> StoreResult<Vec<Event>>;

    /// Resolves an event by name.
    async fn find_event(&self, name: &str) -> StoreResult<Option<Event>>;

    /// Returns the attendees of the named event, or an empty list when the
    /// event is unknown.
    async fn list_attendees(&self, event_name: &str) -> StoreResult<Vec<Attendee>>;

    /// Returns every attendee in registration order.
    async fn all_attendees(&self) -> StoreResult<Vec<Attendee>>;

    /// Registers an attendee for the named event.
    ///
    /// Fails with [`StoreError::EventNotFound`](crate::StoreError::EventNotFound)
    /// without mutating anything when the event is unknown.
    async fn add_attendee(&self, event_name: &str, name: &str, email: &str)
    -> StoreResult<Attendee>;

    /// Appends an event to the catalog.
    async fn add_event(&self, name: &str) -> StoreResult<Event>;

    /// Serialises the catalog for use as model context.
    async fn catalog_context(&self) -> StoreResult<String> {
        Ok(format_catalog(&self.list_events().await?))
    }
}

/// Formats events one per line as `id: name`.
#[must_use]
pub fn format_catalog(events: &[Event]) -> String {
    events
        .iter()
        .map(|event| format!("{}: {}", event.id(), event.name()))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_primitives::EventId;

    #[test]
    fn formats_one_event_per_line() {
        let events = vec![
            Event::new(EventId::new(1), "Developer Meetup").unwrap(),
            Event::new(EventId::new(2), "AI Conference").unwrap(),
        ];
        assert_eq!(format_catalog(&events), "1: Developer Meetup\n2: AI Conference");
        assert_eq!(format_catalog(&[]), "");
    }
}
