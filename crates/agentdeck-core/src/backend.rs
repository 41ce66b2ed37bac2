//! Seam between the reconciliation engine and the backend wire client.

use async_trait::async_trait;

use agentdeck_client::client::{ApiClient, ApiError};
use agentdeck_client::stream::RunStream;
use agentdeck_client::types::{ChatMessage, RunRequest, RunStarted, Session};

/// Everything the engine needs from the backend. `ApiClient` is the
/// production implementation; tests stand in a channel-fed fake.
#[async_trait]
pub trait AgentBackend: Send + Sync {
    async fn start_run(&self, request: &RunRequest) -> Result<RunStarted, ApiError>;

    async fn sessions(&self) -> Result<Vec<Session>, ApiError>;

    async fn chat_history(&self, session_id: &str) -> Result<Vec<ChatMessage>, ApiError>;

    async fn workspace_files(&self) -> Result<Vec<String>, ApiError>;

    async fn workspace_file(&self, path: &str) -> Result<String, ApiError>;

    /// Opening never fails synchronously; connection errors arrive as
    /// `Error`-status events on the returned stream.
    fn open_run_stream(&self, session_id: &str) -> RunStream;
}

#[async_trait]
impl AgentBackend for ApiClient {
    async fn start_run(&self, request: &RunRequest) -> Result<RunStarted, ApiError> {
        self.start_run(request).await
    }

    async fn sessions(&self) -> Result<Vec<Session>, ApiError> {
        self.sessions().await
    }

    async fn chat_history(&self, session_id: &str) -> Result<Vec<ChatMessage>, ApiError> {
        self.chat_history(session_id).await
    }

    async fn workspace_files(&self) -> Result<Vec<String>, ApiError> {
        self.workspace_files().await.map(|response| response.files)
    }

    async fn workspace_file(&self, path: &str) -> Result<String, ApiError> {
        self.workspace_file(path)
            .await
            .map(|response| response.content)
    }

    fn open_run_stream(&self, session_id: &str) -> RunStream {
        self.open_run_stream(session_id)
    }
}
