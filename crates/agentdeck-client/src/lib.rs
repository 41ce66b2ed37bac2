//! Client for the agentdeck multi-agent workflow backend.
//!
//! The backend exposes a small REST surface (run start, session and message
//! reads, workspace file reads) plus a per-session server-sent event stream
//! carrying workflow progress. This crate owns the wire layer: typed request
//! and response structs, the HTTP client, and the run-stream transport.

pub mod client;
pub mod config;
pub mod stream;
pub mod types;

pub use client::{ApiClient, ApiClientConfig, ApiError};
pub use config::{ModelOverrides, ResolvedBaseUrl};
pub use stream::RunStream;
pub use types::{
    ChatMessage, MessageId, MessageRole, ModelCatalog, RunEvent, RunRequest, RunStarted,
    RunStatus, Session,
};
