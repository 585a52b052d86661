//! Completion-service adapters used by the pipeline stages.
//!
//! [`traits`] defines the [`ModelAdapter`](traits::ModelAdapter) capability;
//! [`openai`] talks to a hosted model and [`scripted`] replays canned replies.

#![warn(missing_docs, clippy::pedantic)]

pub mod openai;
pub mod scripted;
pub mod traits;

mod http_client;
