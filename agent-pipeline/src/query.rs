//! Information queries answered from the domain store.

use agent_primitives::{Attendee, Event, EventId};
use agent_store::{DomainStore, StoreResult};
use serde::{Deserialize, Serialize};

/// What kind of information the user asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryType {
    /// Every event with attendee counts.
    ListEvents,
    /// Attendees of the named events, or of all events.
    GetAttendees,
    /// Attendees whose name contains a term.
    SearchAttendee,
    /// Totals and per-event counts.
    CountAttendees,
    /// Attendees whose email contains a term.
    FindByEmail,
    /// Catalog overview. Unknown values decode to this.
    #[serde(other)]
    GeneralInfo,
}

impl QueryType {
    /// Every variant, in the order the extraction prompt lists them.
    pub const ALL: [Self; 6] = [
        Self::ListEvents,
        Self::GetAttendees,
        Self::SearchAttendee,
        Self::CountAttendees,
        Self::FindByEmail,
        Self::GeneralInfo,
    ];

    /// Returns the wire label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ListEvents => "list_events",
            Self::GetAttendees => "get_attendees",
            Self::SearchAttendee => "search_attendee",
            Self::CountAttendees => "count_attendees",
            Self::FindByEmail => "find_by_email",
            Self::GeneralInfo => "general_info",
        }
    }
}

/// Intent and entities extracted from an info request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfoQuery {
    /// Requested operation.
    pub query_type: QueryType,
    /// Event names the user mentioned, possibly empty.
    pub events_mentioned: Vec<String>,
    /// Name search term, empty when not applicable.
    pub attendee_name: String,
    /// Email search term, empty when not applicable.
    pub attendee_email: String,
    /// Whether the user only wants counts.
    pub wants_count: bool,
}

impl InfoQuery {
    /// Creates a query of `query_type` with every entity empty.
    #[must_use]
    pub const fn new(query_type: QueryType) -> Self {
        Self {
            query_type,
            events_mentioned: Vec::new(),
            attendee_name: String::new(),
            attendee_email: String::new(),
            wants_count: false,
        }
    }
}

/// One event in a `list_events` answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventListing {
    /// Event id.
    pub id: EventId,
    /// Event name.
    pub name: String,
    /// Number of registered attendees.
    pub attendee_count: usize,
    /// Registered attendees, omitted when only counts were requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attendees: Option<Vec<Attendee>>,
}

/// One event in a `get_attendees` answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventAttendees {
    /// Event name as requested.
    pub event_name: String,
    /// Number of matching attendees.
    pub attendee_count: usize,
    /// Matching attendees.
    pub attendees: Vec<Attendee>,
}

/// One hit of a name or email search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendeeMatch {
    /// Attendee name.
    pub name: String,
    /// Attendee email.
    pub email: String,
    /// Name of the event the attendee is registered for.
    pub event: String,
}

/// Per-event attendee count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventCount {
    /// Event name.
    pub event_name: String,
    /// Number of registered attendees.
    pub attendee_count: usize,
}

/// Answer to `count_attendees`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceStatistics {
    /// Number of events.
    pub total_events: usize,
    /// Number of attendees across all events.
    pub total_attendees: usize,
    /// Per-event counts in catalog order.
    pub events: Vec<EventCount>,
}

/// One event in a `general_info` overview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSummary {
    /// Event id.
    pub id: EventId,
    /// Event name.
    pub name: String,
    /// Number of registered attendees.
    pub attendee_count: usize,
}

/// Answer to `general_info`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogOverview {
    /// Number of events.
    pub total_events: usize,
    /// Number of attendees across all events.
    pub total_attendees: usize,
    /// Event summaries in catalog order.
    pub events: Vec<EventSummary>,
}

/// Store answer, tagged by the query type that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "query_type", rename_all = "snake_case")]
pub enum QueryResult {
    /// See [`QueryType::ListEvents`].
    ListEvents {
        /// Listed events.
        events: Vec<EventListing>,
    },
    /// See [`QueryType::GetAttendees`].
    GetAttendees {
        /// Per-event attendee lists.
        events: Vec<EventAttendees>,
    },
    /// See [`QueryType::SearchAttendee`].
    SearchAttendee {
        /// Matches.
        results: Vec<AttendeeMatch>,
    },
    /// See [`QueryType::CountAttendees`].
    CountAttendees {
        /// Counts.
        statistics: AttendanceStatistics,
    },
    /// See [`QueryType::FindByEmail`].
    FindByEmail {
        /// Matches.
        results: Vec<AttendeeMatch>,
    },
    /// See [`QueryType::GeneralInfo`].
    GeneralInfo {
        /// Overview.
        overview: CatalogOverview,
    },
}

impl QueryResult {
    /// Returns the query type this result answers.
    #[must_use]
    pub const fn query_type(&self) -> QueryType {
        match self {
            Self::ListEvents { .. } => QueryType::ListEvents,
            Self::GetAttendees { .. } => QueryType::GetAttendees,
            Self::SearchAttendee { .. } => QueryType::SearchAttendee,
            Self::CountAttendees { .. } => QueryType::CountAttendees,
            Self::FindByEmail { .. } => QueryType::FindByEmail,
            Self::GeneralInfo { .. } => QueryType::GeneralInfo,
        }
    }
}

fn attendees_of(attendees: &[Attendee], event: EventId) -> Vec<Attendee> {
    attendees
        .iter()
        .filter(|attendee| attendee.event_id() == event)
        .cloned()
        .collect()
}

fn count_of(attendees: &[Attendee], event: EventId) -> usize {
    attendees
        .iter()
        .filter(|attendee| attendee.event_id() == event)
        .count()
}

/// Case-insensitive substring search over one attendee field.
///
/// A blank term matches nothing.
fn search(
    events: &[Event],
    attendees: &[Attendee],
    term: &str,
    field: impl Fn(&Attendee) -> &str,
) -> Vec<AttendeeMatch> {
    let needle = term.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }

    attendees
        .iter()
        .filter(|attendee| field(attendee).to_lowercase().contains(&needle))
        .filter_map(|attendee| {
            events
                .iter()
                .find(|event| event.id() == attendee.event_id())
                .map(|event| AttendeeMatch {
                    name: attendee.name().to_owned(),
                    email: attendee.email().to_owned(),
                    event: event.name().to_owned(),
                })
        })
        .collect()
}

/// Runs `query` against `store`. Read-only.
///
/// # Errors
///
/// Propagates store failures.
pub async fn execute_query(store: &dyn DomainStore, query: &InfoQuery) -> StoreResult<QueryResult> {
    let events = store.list_events().await?;
    let attendees = store.all_attendees().await?;

    let result = match query.query_type {
        QueryType::ListEvents => QueryResult::ListEvents {
            events: events
                .iter()
                .map(|event| {
                    let registered = attendees_of(&attendees, event.id());
                    EventListing {
                        id: event.id(),
                        name: event.name().to_owned(),
                        attendee_count: registered.len(),
                        attendees: (!query.wants_count).then_some(registered),
                    }
                })
                .collect(),
        },
        QueryType::GetAttendees => {
            let mut listed = Vec::new();
            if query.events_mentioned.is_empty() {
                for event in &events {
                    let registered = attendees_of(&attendees, event.id());
                    listed.push(EventAttendees {
                        event_name: event.name().to_owned(),
                        attendee_count: registered.len(),
                        attendees: registered,
                    });
                }
            } else {
                for name in &query.events_mentioned {
                    let registered = store.list_attendees(name).await?;
                    listed.push(EventAttendees {
                        event_name: name.clone(),
                        attendee_count: registered.len(),
                        attendees: registered,
                    });
                }
            }
            QueryResult::GetAttendees { events: listed }
        }
        QueryType::SearchAttendee => QueryResult::SearchAttendee {
            results: search(&events, &attendees, &query.attendee_name, Attendee::name),
        },
        QueryType::CountAttendees => QueryResult::CountAttendees {
            statistics: AttendanceStatistics {
                total_events: events.len(),
                total_attendees: attendees.len(),
                events: events
                    .iter()
                    .map(|event| EventCount {
                        event_name: event.name().to_owned(),
                        attendee_count: count_of(&attendees, event.id()),
                    })
                    .collect(),
            },
        },
        QueryType::FindByEmail => QueryResult::FindByEmail {
            results: search(&events, &attendees, &query.attendee_email, Attendee::email),
        },
        QueryType::GeneralInfo => QueryResult::GeneralInfo {
            overview: CatalogOverview {
                total_events: events.len(),
                total_attendees: attendees.len(),
                events: events
                    .iter()
                    .map(|event| EventSummary {
                        id: event.id(),
                        name: event.name().to_owned(),
                        attendee_count: count_of(&attendees, event.id()),
                    })
                    .collect(),
            },
        },
    };

    Ok(result)
}

#[cfg(test)]
mod tests {
    use agent_store::InMemoryStore;
    use serde_json::json;

    use super::*;

    fn query(query_type: QueryType) -> InfoQuery {
        InfoQuery::new(query_type)
    }

    async fn run(query: &InfoQuery) -> QueryResult {
        let store = InMemoryStore::seeded().unwrap();
        execute_query(&store, query).await.unwrap()
    }

    #[test]
    fn unknown_query_type_decodes_as_general_info() {
        let parsed: InfoQuery = serde_json::from_value(json!({
            "query_type": "weather_report",
            "events_mentioned": [],
            "attendee_name": "",
            "attendee_email": "",
            "wants_count": false
        }))
        .unwrap();
        assert_eq!(parsed.query_type, QueryType::GeneralInfo);
    }

    #[tokio::test]
    async fn list_events_omits_attendees_when_counting() {
        let mut counting = query(QueryType::ListEvents);
        counting.wants_count = true;
        let value = serde_json::to_value(run(&counting).await).unwrap();
        assert_eq!(
            value,
            json!({
                "query_type": "list_events",
                "events": [
                    {"id": 1, "name": "Developer Meetup", "attendee_count": 1},
                    {"id": 2, "name": "AI Conference", "attendee_count": 1}
                ]
            })
        );

        let QueryResult::ListEvents { events } = run(&query(QueryType::ListEvents)).await else {
            panic!("wrong variant");
        };
        let first = events[0].attendees.as_deref().unwrap_or_default();
        assert_eq!(first[0].name(), "John Doe");
    }

    #[tokio::test]
    async fn get_attendees_matches_names_case_insensitively() {
        let mut named = query(QueryType::GetAttendees);
        named.events_mentioned = vec!["ai conference".into(), "Rust Camp".into()];
        let QueryResult::GetAttendees { events } = run(&named).await else {
            panic!("wrong variant");
        };
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_name, "ai conference");
        assert_eq!(events[0].attendees[0].name(), "Jane Smith");
        assert_eq!(events[1].attendee_count, 0);
        assert!(events[1].attendees.is_empty());
    }

    #[tokio::test]
    async fn get_attendees_without_names_covers_every_event() {
        let QueryResult::GetAttendees { events } = run(&query(QueryType::GetAttendees)).await else {
            panic!("wrong variant");
        };
        let names: Vec<_> = events.iter().map(|e| e.event_name.as_str()).collect();
        assert_eq!(names, ["Developer Meetup", "AI Conference"]);
    }

    #[tokio::test]
    async fn search_attendee_finds_jane() {
        let mut search = query(QueryType::SearchAttendee);
        search.attendee_name = "jane".into();
        assert_eq!(
            run(&search).await,
            QueryResult::SearchAttendee {
                results: vec![AttendeeMatch {
                    name: "Jane Smith".into(),
                    email: "jane@example.com".into(),
                    event: "AI Conference".into(),
                }]
            }
        );
    }

    #[tokio::test]
    async fn blank_search_terms_match_nothing() {
        let mut by_name = query(QueryType::SearchAttendee);
        by_name.attendee_name = "   ".into();
        assert_eq!(
            run(&by_name).await,
            QueryResult::SearchAttendee { results: vec![] }
        );
        assert_eq!(
            run(&query(QueryType::FindByEmail)).await,
            QueryResult::FindByEmail { results: vec![] }
        );
    }

    #[tokio::test]
    async fn find_by_email_is_case_insensitive() {
        let mut by_email = query(QueryType::FindByEmail);
        by_email.attendee_email = "JOHN@".into();
        let QueryResult::FindByEmail { results } = run(&by_email).await else {
            panic!("wrong variant");
        };
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].event, "Developer Meetup");
    }

    #[tokio::test]
    async fn count_attendees_on_seed() {
        let QueryResult::CountAttendees { statistics } =
            run(&query(QueryType::CountAttendees)).await
        else {
            panic!("wrong variant");
        };
        assert_eq!(statistics.total_events, 2);
        assert_eq!(statistics.total_attendees, 2);
        assert!(statistics.events.iter().all(|e| e.attendee_count == 1));
    }

    #[tokio::test]
    async fn general_info_overview() {
        let result = run(&query(QueryType::GeneralInfo)).await;
        assert_eq!(result.query_type(), QueryType::GeneralInfo);
        let QueryResult::GeneralInfo { overview } = result else {
            panic!("wrong variant");
        };
        assert_eq!(overview.events[1].id, EventId::new(2));
        assert_eq!(overview.total_attendees, 2);
    }
}
