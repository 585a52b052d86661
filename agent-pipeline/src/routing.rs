//! Category dispatch.

use std::fmt;
use std::sync::Arc;

use agent_primitives::Attendee;
use agent_store::DomainStore;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::PipelineResult;
use crate::query::QueryResult;
use crate::stages::categorization::{Categorization, Category};
use crate::stages::info_request::InfoRequestStage;
use crate::stages::registration::RegistrationStage;

/// Message carried by [`RouteResult::NoRoute`].
pub const NO_ROUTE_MESSAGE: &str = "No matching route.";

/// Error carried by [`RouteResult::RegistrationFailed`] when extraction left
/// the attendee name or email blank.
pub const MISSING_ATTENDEE_MESSAGE: &str = "Missing attendee name or email";

/// What routing produced for one request. Serialised verbatim into the
/// composition prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum RouteResult {
    /// The attendee was registered.
    Registered(Attendee),
    /// Registration named an unknown event or lacked attendee details.
    RegistrationFailed {
        /// `Event not found` or [`MISSING_ATTENDEE_MESSAGE`].
        error: String,
    },
    /// Answer to an info request.
    Query(QueryResult),
    /// No handler exists for the category.
    NoRoute {
        /// Always [`NO_ROUTE_MESSAGE`].
        message: String,
    },
}

impl RouteResult {
    fn no_route() -> Self {
        Self::NoRoute {
            message: NO_ROUTE_MESSAGE.to_owned(),
        }
    }
}

/// Dispatches a categorized request to its handler.
#[derive(Clone)]
pub struct Router {
    registration: RegistrationStage,
    info: InfoRequestStage,
    store: Arc<dyn DomainStore>,
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("registration", &self.registration)
            .field("info", &self.info)
            .finish_non_exhaustive()
    }
}

impl Router {
    /// Creates a router over the two extraction stages and the store.
    #[must_use]
    pub fn new(
        registration: RegistrationStage,
        info: InfoRequestStage,
        store: Arc<dyn DomainStore>,
    ) -> Self {
        Self {
            registration,
            info,
            store,
        }
    }

    /// Routes the request according to its category.
    ///
    /// An unknown event or a blank attendee name or email during registration
    /// is recovered into [`RouteResult::RegistrationFailed`]; nothing is
    /// written in either case.
    ///
    /// # Errors
    ///
    /// Propagates extraction failures and store failures other than an
    /// unknown event.
    pub async fn route(
        &self,
        categorization: &Categorization,
        text: &str,
        catalog: &str,
    ) -> PipelineResult<RouteResult> {
        match &categorization.category {
            Category::Registration => self.register(text, catalog).await,
            Category::InfoRequest => {
                let query = self.info.extract(text).await?;
                debug!(query_type = query.query_type.as_str(), "info query extracted");
                Ok(RouteResult::Query(self.info.execute(&query).await?))
            }
            Category::Other => Ok(RouteResult::no_route()),
            Category::Unrecognized(raw) => {
                warn!(category = %raw, "unrecognised category, no route");
                Ok(RouteResult::no_route())
            }
        }
    }

    async fn register(&self, text: &str, catalog: &str) -> PipelineResult<RouteResult> {
        let request = self.registration.extract(text, catalog).await?;
        if request.attendee_name.trim().is_empty() || request.attendee_email.trim().is_empty() {
            warn!(event = %request.event_name, "registration without attendee name or email");
            return Ok(RouteResult::RegistrationFailed {
                error: MISSING_ATTENDEE_MESSAGE.to_owned(),
            });
        }
        match self
            .store
            .add_attendee(
                &request.event_name,
                &request.attendee_name,
                &request.attendee_email,
            )
            .await
        {
            Ok(attendee) => Ok(RouteResult::Registered(attendee)),
            Err(err) if err.is_event_not_found() => {
                warn!(event = %request.event_name, "registration for unknown event");
                Ok(RouteResult::RegistrationFailed {
                    error: err.to_string(),
                })
            }
            Err(err) => Err(err.into()),
        }
    }
}
