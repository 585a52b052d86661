//! Info-request intent extraction.

use std::sync::Arc;

use agent_adapters::traits::InferenceRequest;
use agent_prompts::{FieldKind, OutputSchema, SchemaResult};
use agent_store::DomainStore;

use super::CompletionCall;
use crate::error::PipelineResult;
use crate::query::{InfoQuery, QueryResult, QueryType, execute_query};

const EXTRACTOR_PREAMBLE: &str = "Extract the query intent and entities from the user's request. \
Determine what type of information they're asking for:\n\
- list_events: User wants to see all available events\n\
- get_attendees: User wants attendees for specific event(s)\n\
- search_attendee: User is looking for a specific person\n\
- count_attendees: User wants statistics/counts\n\
- find_by_email: User is searching by email\n\
- general_info: General information request\n\n\
Available events in the system:\n";

/// Schema requested from the completion service.
///
/// # Errors
///
/// Never fails for the fixed field set; the result type follows the builder.
pub fn schema() -> SchemaResult<OutputSchema> {
    let query_types = QueryType::ALL
        .iter()
        .map(|kind| kind.as_str().to_owned())
        .collect();

    OutputSchema::builder("info_request_extraction")
        .described_field(
            "query_type",
            FieldKind::StringEnum(query_types),
            "Type of information request",
        )
        .described_field(
            "events_mentioned",
            FieldKind::StringArray,
            "List of event names mentioned (can be empty)",
        )
        .described_field(
            "attendee_name",
            FieldKind::String,
            "Name of attendee to search for (empty string if not applicable)",
        )
        .described_field(
            "attendee_email",
            FieldKind::String,
            "Email of attendee to search for (empty string if not applicable)",
        )
        .described_field(
            "wants_count",
            FieldKind::Boolean,
            "Whether user wants counts/statistics",
        )
        .build()
}

/// Extracts an [`InfoQuery`] and answers it from the store.
#[derive(Clone)]
pub struct InfoRequestStage {
    call: CompletionCall,
    store: Arc<dyn DomainStore>,
}

impl std::fmt::Debug for InfoRequestStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InfoRequestStage")
            .field("call", &self.call)
            .finish_non_exhaustive()
    }
}

impl InfoRequestStage {
    /// Creates the stage around a completion call and the store it queries.
    #[must_use]
    pub fn new(call: CompletionCall, store: Arc<dyn DomainStore>) -> Self {
        Self { call, store }
    }

    /// Determines what the user is asking for. The prompt lists the event
    /// names currently in the store.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Service`](crate::PipelineError::Service) on
    /// call failure or a malformed reply, and
    /// [`PipelineError::Store`](crate::PipelineError::Store) if the catalog
    /// cannot be read.
    pub async fn extract(&self, text: &str) -> PipelineResult<InfoQuery> {
        let events = self.store.list_events().await?;
        let mut system = String::from(EXTRACTOR_PREAMBLE);
        let listing = events
            .iter()
            .map(|event| format!("- {}", event.name()))
            .collect::<Vec<_>>()
            .join("\n");
        system.push_str(&listing);

        let request =
            InferenceRequest::new(system, text).with_response_schema(schema()?);
        self.call.json(request).await
    }

    /// Answers an extracted query from the store.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Store`](crate::PipelineError::Store) on store
    /// failure.
    pub async fn execute(&self, query: &InfoQuery) -> PipelineResult<QueryResult> {
        Ok(execute_query(self.store.as_ref(), query).await?)
    }
}

#[cfg(test)]
mod tests {
    use agent_adapters::scripted::ScriptedAdapter;
    use agent_store::InMemoryStore;
    use serde_json::json;

    use super::*;
    use crate::error::StageKind;

    fn stage(adapter: &Arc<ScriptedAdapter>) -> InfoRequestStage {
        InfoRequestStage::new(
            CompletionCall::new(StageKind::InfoExtraction, adapter.clone()),
            Arc::new(InMemoryStore::seeded().unwrap()),
        )
    }

    #[tokio::test]
    async fn prompt_lists_catalog_event_names() {
        let adapter = Arc::new(ScriptedAdapter::new().then_json(&json!({
            "query_type": "count_attendees",
            "events_mentioned": [],
            "attendee_name": "",
            "attendee_email": "",
            "wants_count": true
        })));
        let query = stage(&adapter).extract("How many people?").await.unwrap();
        assert_eq!(query.query_type, QueryType::CountAttendees);
        assert!(query.wants_count);

        let requests = adapter.requests();
        let prompt = requests[0].instructions();
        assert!(prompt.ends_with("Available events in the system:\n- Developer Meetup\n- AI Conference"));
        let schema = requests[0].response_schema().map(OutputSchema::json_schema);
        assert_eq!(
            schema.as_ref().and_then(|s| s.pointer("/properties/query_type/enum/5")),
            Some(&json!("general_info"))
        );
    }

    #[tokio::test]
    async fn executes_against_the_shared_store() {
        let adapter = Arc::new(ScriptedAdapter::new());
        let mut query = InfoQuery::new(QueryType::SearchAttendee);
        query.attendee_name = "jane".into();
        let QueryResult::SearchAttendee { results } = stage(&adapter).execute(&query).await.unwrap()
        else {
            panic!("wrong variant");
        };
        assert_eq!(results[0].event, "AI Conference");
        assert_eq!(adapter.call_count(), 0);
    }
}
