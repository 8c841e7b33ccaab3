//! Client for the remote question-generation service.
//!
//! The service is asynchronous: a submission returns immediately and the
//! generated questions arrive later on one of the API's callback endpoints.
//! [`types`] holds both the outbound request bodies and the callback
//! payloads, since both sides of the exchange share the wire format.

pub mod api;
pub mod types;

pub use api::{GenerationApi, GenerationApiError, GenerationGateway};
