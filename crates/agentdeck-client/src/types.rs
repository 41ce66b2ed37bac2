//! Wire types for the agentdeck backend REST and run-stream surface.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Rendered in place of a missing or blank session title.
pub const UNTITLED_SESSION: &str = "Untitled";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Session {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    #[must_use]
    pub fn display_title(&self) -> &str {
        match self.title.as_deref().map(str::trim) {
            Some(title) if !title.is_empty() => title,
            _ => UNTITLED_SESSION,
        }
    }
}

/// Message identity. Backend-assigned identifiers and locally-generated
/// optimistic identifiers live in separate variants, so the two can never
/// collide no matter how the backend allocates its integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(from = "i64")]
pub enum MessageId {
    /// Assigned by the timeline for an optimistic entry; never leaves the
    /// process and never appears on the wire.
    Local(u64),
    /// Assigned by the backend.
    Remote(i64),
}

impl From<i64> for MessageId {
    fn from(id: i64) -> Self {
        Self::Remote(id)
    }
}

impl MessageId {
    #[must_use]
    pub const fn is_local(self) -> bool {
        matches!(self, Self::Local(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Agent,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChatMessage {
    pub id: MessageId,
    pub session_id: String,
    pub role: MessageRole,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub node: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub meta: Option<Value>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunRequest {
    pub user_request: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub architect_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coder_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviewer_model: Option<String>,
}

impl RunRequest {
    #[must_use]
    pub fn new(user_request: impl Into<String>) -> Self {
        Self {
            user_request: user_request.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunStarted {
    pub session_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// The deployed backend spells per-node progress as `"success"`.
    #[serde(alias = "success")]
    Progress,
    Complete,
    Error,
}

impl RunStatus {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Error)
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Progress => "progress",
            Self::Complete => "complete",
            Self::Error => "error",
        }
    }
}

/// One item from the per-session run stream. Transient; never persisted.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RunEvent {
    #[serde(default)]
    pub node: Option<String>,
    pub status: RunStatus,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub plan: Option<Value>,
}

impl RunEvent {
    /// A connection-level failure rendered as a stream event, so transport
    /// errors and workflow errors reach the consumer through one path.
    #[must_use]
    pub fn transport_error(message: impl Into<String>) -> Self {
        Self {
            node: None,
            status: RunStatus::Error,
            message: Some(message.into()),
            plan: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkspaceFilesResponse {
    pub files: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FileContentResponse {
    pub content: String,
}

/// Per-role model catalog backing the optional run-start overrides.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModelCatalog {
    #[serde(default)]
    pub architect: Vec<String>,
    #[serde(default)]
    pub coder: Vec<String>,
    #[serde(default)]
    pub reviewer: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_message_ids_decode_as_remote() {
        let message: ChatMessage = serde_json::from_str(
            r#"{
                "id": 7,
                "session_id": "s1",
                "role": "agent",
                "content": "done",
                "node": "reviewer",
                "created_at": "2026-08-05T12:00:00Z",
                "meta": {"feedback": "ok"}
            }"#,
        )
        .expect("message decodes");

        assert_eq!(message.id, MessageId::Remote(7));
        assert!(!message.id.is_local());
        assert_eq!(message.role, MessageRole::Agent);
        assert_eq!(message.node.as_deref(), Some("reviewer"));
    }

    #[test]
    fn run_status_accepts_deployed_success_spelling() {
        let event: RunEvent =
            serde_json::from_str(r#"{"node": "coder", "status": "success"}"#).expect("decodes");
        assert_eq!(event.status, RunStatus::Progress);
        assert!(!event.status.is_terminal());

        let event: RunEvent =
            serde_json::from_str(r#"{"status": "complete", "message": "Workflow finished."}"#)
                .expect("decodes");
        assert_eq!(event.status, RunStatus::Complete);
        assert!(event.status.is_terminal());
    }

    #[test]
    fn blank_session_titles_render_as_untitled() {
        let session: Session = serde_json::from_str(
            r#"{"id": "s1", "title": "  ", "created_at": "2026-08-05T12:00:00Z"}"#,
        )
        .expect("session decodes");
        assert_eq!(session.display_title(), UNTITLED_SESSION);

        let session: Session =
            serde_json::from_str(r#"{"id": "s2", "created_at": "2026-08-05T12:00:00Z"}"#)
                .expect("session decodes");
        assert_eq!(session.display_title(), UNTITLED_SESSION);

        let session: Session = serde_json::from_str(
            r#"{"id": "s3", "title": "add logging", "created_at": "2026-08-05T12:00:00Z"}"#,
        )
        .expect("session decodes");
        assert_eq!(session.display_title(), "add logging");
    }

    #[test]
    fn run_request_omits_unset_model_overrides() {
        let encoded =
            serde_json::to_value(RunRequest::new("add logging")).expect("request encodes");
        assert_eq!(
            encoded,
            serde_json::json!({"user_request": "add logging"})
        );
    }
}
