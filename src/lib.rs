//! Adapters for LLM inference endpoints and guardrail-checked vector search.
//!
//! [`inferencer::create_inferencer`] picks an inference client from an
//! [`config::InferencerConfig`]; every client assembles its prompt with
//! [`inferencer::prompt`]. [`storage::guardrails::GuardRailsVectorStorage`]
//! decorates any [`storage::VectorStorage`] with [`guardrails::Guardrail`]
//! checks.

pub mod config;
pub mod errors;
pub mod guardrails;
pub mod http_handler;
pub mod inferencer;
pub mod storage;
pub mod types;

pub use errors::RagError;
pub use inferencer::{create_inferencer, Inferencer, InferencerProvider};
pub use types::{ChatMessage, Chunk, InferenceMetadata, InferenceResult, Role, SearchRecord};
