//! In-process store guarded by a single async read/write lock.

use agent_primitives::{Attendee, AttendeeId, Event, EventId};
use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::store::DomainStore;

/// Events every fresh demo store starts with.
pub const SEED_EVENTS: [&str; 2] = ["Developer Meetup", "AI Conference"];

/// Attendees every fresh demo store starts with, as `(event, name, email)`.
pub const SEED_ATTENDEES: [(&str, &str, &str); 2] = [
    ("Developer Meetup", "John Doe", "john@example.com"),
    ("AI Conference", "Jane Smith", "jane@example.com"),
];

#[derive(Debug)]
struct CatalogInner {
    events: Vec<Event>,
    attendees: Vec<Attendee>,
    next_event: EventId,
    next_attendee: AttendeeId,
}

impl CatalogInner {
    fn empty() -> Self {
        Self {
            events: Vec::new(),
            attendees: Vec::new(),
            next_event: EventId::new(1),
            next_attendee: AttendeeId::new(1),
        }
    }

    fn event_named(&self, name: &str) -> Option<&Event> {
        self.events.iter().find(|event| event.is_named(name))
    }

    fn push_event(&mut self, name: &str) -> StoreResult<Event> {
        if self.event_named(name).is_some() {
            return Err(StoreError::DuplicateEvent {
                name: name.to_owned(),
            });
        }
        let event = Event::new(self.next_event, name.trim())?;
        self.next_event = self.next_event.next();
        self.events.push(event.clone());
        Ok(event)
    }

    fn push_attendee(&mut self, event_name: &str, name: &str, email: &str) -> StoreResult<Attendee> {
        let event_id = self
            .event_named(event_name)
            .map(Event::id)
            .ok_or_else(|| StoreError::EventNotFound {
                name: event_name.to_owned(),
            })?;
        let attendee = Attendee::new(self.next_attendee, event_id, name, email);
        self.next_attendee = self.next_attendee.next();
        self.attendees.push(attendee.clone());
        Ok(attendee)
    }
}

/// Store keeping the catalog in memory.
///
/// Attendee ids come from a counter advanced under the write lock, so
/// concurrent registrations never share or skip an id.
#[derive(Debug)]
pub struct InMemoryStore {
    inner: RwLock<CatalogInner>,
}

impl InMemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(CatalogInner::empty()),
        }
    }

    /// Creates a store holding the demo catalog: two events with one
    /// attendee each.
    ///
    /// # Errors
    ///
    /// Propagates record validation failures.
    pub fn seeded() -> StoreResult<Self> {
        Self::from_records(&SEED_EVENTS, &SEED_ATTENDEES)
    }

    /// Creates a store from event names and `(event, name, email)` triples,
    /// assigning ids in order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DuplicateEvent`] for repeated event names and
    /// [`StoreError::EventNotFound`] for attendees of unknown events.
    pub fn from_records(events: &[&str], attendees: &[(&str, &str, &str)]) -> StoreResult<Self> {
        let mut inner = CatalogInner::empty();
        for name in events {
            inner.push_event(name)?;
        }
        for (event, name, email) in attendees {
            inner.push_attendee(event, name, email)?;
        }
        Ok(Self {
            inner: RwLock::new(inner),
        })
    }

    /// Returns `(events, attendees)` currently stored.
    pub async fn counts(&self) -> (usize, usize) {
        let guard = self.inner.read().await;
        (guard.events.len(), guard.attendees.len())
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DomainStore for InMemoryStore {
    async fn list_events(&self) -> StoreResult<Vec<Event>> {
        Ok(self.inner.read().await.events.clone())
    }

    async fn find_event(&self, name: &str) -> StoreResult<Option<Event>> {
        Ok(self.inner.read().await.event_named(name).cloned())
    }

    async fn list_attendees(&self, event_name: &str) -> StoreResult<Vec<Attendee>> {
        let guard = self.inner.read().await;
        let Some(event_id) = guard.event_named(event_name).map(Event::id) else {
            return Ok(Vec::new());
        };
        Ok(guard
            .attendees
            .iter()
            .filter(|attendee| attendee.event_id() == event_id)
            .cloned()
            .collect())
    }

    async fn all_attendees(&self) -> StoreResult<Vec<Attendee>> {
        Ok(self.inner.read().await.attendees.clone())
    }

    async fn add_attendee(
        &self,
        event_name: &str,
        name: &str,
        email: &str,
    ) -> StoreResult<Attendee> {
        let mut guard = self.inner.write().await;
        let attendee = guard.push_attendee(event_name, name, email)?;
        debug!(
            attendee_id = %attendee.id(),
            event_id = %attendee.event_id(),
            "attendee registered"
        );
        Ok(attendee)
    }

    async fn add_event(&self, name: &str) -> StoreResult<Event> {
        let mut guard = self.inner.write().await;
        let event = guard.push_event(name)?;
        debug!(event_id = %event.id(), name = %event.name(), "event added");
        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::sync::Arc;

    use super::*;

    #[tokio::test]
    async fn seeded_catalog_context() {
        let store = InMemoryStore::seeded().unwrap();
        assert_eq!(
            store.catalog_context().await.unwrap(),
            "1: Developer Meetup\n2: AI Conference"
        );
        assert_eq!(store.counts().await, (2, 2));
    }

    #[tokio::test]
    async fn registration_round_trip_is_case_insensitive() {
        let store = InMemoryStore::seeded().unwrap();
        let added = store
            .add_attendee("Developer Meetup", "Ann Lee", "ann@example.com")
            .await
            .unwrap();
        assert_eq!(added.id(), AttendeeId::new(3));
        assert_eq!(added.event_id(), EventId::new(1));

        let attendees = store.list_attendees("developer meetup").await.unwrap();
        let names: Vec<_> = attendees.iter().map(Attendee::name).collect();
        assert_eq!(names, ["John Doe", "Ann Lee"]);
        assert!(attendees.iter().any(|a| a.id() == added.id()));
    }

    #[tokio::test]
    async fn unknown_event_registration_does_not_mutate() {
        let store = InMemoryStore::seeded().unwrap();
        let before = store.all_attendees().await.unwrap();

        let err = store
            .add_attendee("Nonexistent Event", "X", "y@z.com")
            .await
            .expect_err("unknown event");
        assert!(err.is_event_not_found());
        assert_eq!(err.to_string(), "Event not found");

        assert_eq!(store.all_attendees().await.unwrap(), before);
    }

    #[tokio::test]
    async fn listing_is_idempotent_without_writes() {
        let store = InMemoryStore::seeded().unwrap();
        assert_eq!(
            store.list_events().await.unwrap(),
            store.list_events().await.unwrap()
        );
        assert_eq!(
            store.list_attendees("AI Conference").await.unwrap(),
            store.list_attendees("ai conference").await.unwrap()
        );
        assert!(store.list_attendees("Nowhere").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn duplicate_event_names_are_rejected() {
        let store = InMemoryStore::seeded().unwrap();
        let err = store.add_event("ai conference").await.expect_err("dup");
        assert!(matches!(err, StoreError::DuplicateEvent { .. }));

        let event = store.add_event("Rust Workshop").await.unwrap();
        assert_eq!(event.id(), EventId::new(3));
        assert!(store.find_event("RUST WORKSHOP").await.unwrap().is_some());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_registrations_get_distinct_ids() {
        const N: usize = 64;
        let store = Arc::new(InMemoryStore::seeded().unwrap());

        let handles = (0..N)
            .map(|i| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    store
                        .add_attendee("AI Conference", &format!("Guest {i}"), "guest@example.com")
                        .await
                })
            })
            .collect::<Vec<_>>();

        let ids = futures::future::join_all(handles)
            .await
            .into_iter()
            .map(|joined| joined.unwrap().unwrap().id().get())
            .collect::<BTreeSet<_>>();

        assert_eq!(ids.len(), N);
        let expected = (3..3 + N as u64).collect::<BTreeSet<_>>();
        assert_eq!(ids, expected);
    }

    #[test]
    fn attendees_of_unknown_events_fail_construction() {
        let err = InMemoryStore::from_records(&["A"], &[("B", "x", "y")]).expect_err("dangling");
        assert!(err.is_event_not_found());
    }
}
