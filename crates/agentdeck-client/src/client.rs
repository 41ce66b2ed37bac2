//! Typed HTTP client for the backend REST surface.

use std::time::Duration;

use reqwest::StatusCode;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use uuid::Uuid;

use crate::config;
use crate::stream::RunStream;
use crate::types::{
    ChatMessage, FileContentResponse, ModelCatalog, RunRequest, RunStarted, Session,
    WorkspaceFilesResponse,
};

pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_REQUEST_ATTEMPTS: usize = 2;

#[derive(Debug, Clone)]
pub struct ApiClientConfig {
    pub base_url: String,
    pub timeout_ms: u64,
    pub request_attempts: usize,
}

impl ApiClientConfig {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            request_attempts: DEFAULT_REQUEST_ATTEMPTS,
        }
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("deck_base_url_missing")]
    BaseUrlMissing,
    #[error("deck_invalid_path")]
    InvalidPath,
    #[error("deck_request_failed:{message}")]
    Request { message: String },
    #[error("deck_read_failed:{message}")]
    Read { message: String },
    #[error("deck_http_{status}:{body}")]
    Http { status: StatusCode, body: String },
    #[error("deck_json_decode_failed:{message}")]
    Decode { message: String },
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    timeout: Duration,
    request_attempts: usize,
    http: reqwest::Client,
}

impl ApiClient {
    pub fn new(client_config: ApiClientConfig) -> Result<Self, ApiError> {
        let base_url = normalize_base_url(&client_config.base_url)?;
        Ok(Self {
            base_url,
            timeout: Duration::from_millis(client_config.timeout_ms.max(250)),
            request_attempts: client_config.request_attempts.max(1),
            http: reqwest::Client::new(),
        })
    }

    /// Builds a client against the environment-resolved base URL.
    pub fn from_env() -> Result<Self, ApiError> {
        let resolved = config::resolve_base_url();
        tracing::debug!(source = %resolved.source, base_url = %resolved.base_url, "backend base url resolved");
        Self::new(ApiClientConfig::new(resolved.base_url))
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn endpoint(&self, path: &str) -> Option<String> {
        let trimmed = path.trim();
        if trimmed.is_empty() {
            return None;
        }
        if trimmed.starts_with('/') {
            Some(format!("{}{}", self.base_url, trimmed))
        } else {
            Some(format!("{}/{}", self.base_url, trimmed))
        }
    }

    #[must_use]
    pub fn run_start_path() -> &'static str {
        "/api/agent/run"
    }

    #[must_use]
    pub fn run_stream_path(session_id: &str) -> String {
        format!("/api/agent/stream/{}", session_id.trim())
    }

    #[must_use]
    pub fn sessions_path() -> &'static str {
        "/api/chat/sessions"
    }

    #[must_use]
    pub fn chat_history_path(session_id: &str) -> String {
        format!("/api/chat/history/{}", session_id.trim())
    }

    #[must_use]
    pub fn workspace_files_path() -> &'static str {
        "/api/workspace/files"
    }

    #[must_use]
    pub fn workspace_file_path(path: &str) -> String {
        format!("/api/workspace/file?path={}", urlencoding::encode(path))
    }

    #[must_use]
    pub fn models_path() -> &'static str {
        "/api/models"
    }

    pub async fn start_run(&self, request: &RunRequest) -> Result<RunStarted, ApiError> {
        self.post_json(Self::run_start_path(), request).await
    }

    pub async fn sessions(&self) -> Result<Vec<Session>, ApiError> {
        self.get_json(Self::sessions_path()).await
    }

    pub async fn chat_history(&self, session_id: &str) -> Result<Vec<ChatMessage>, ApiError> {
        self.get_json(Self::chat_history_path(session_id).as_str())
            .await
    }

    pub async fn workspace_files(&self) -> Result<WorkspaceFilesResponse, ApiError> {
        self.get_json(Self::workspace_files_path()).await
    }

    pub async fn workspace_file(&self, path: &str) -> Result<FileContentResponse, ApiError> {
        self.get_json(Self::workspace_file_path(path).as_str())
            .await
    }

    pub async fn model_catalog(&self) -> Result<ModelCatalog, ApiError> {
        self.get_json(Self::models_path()).await
    }

    /// Opens the per-session run stream. Connection failures surface as
    /// `Error`-status events on the returned stream, never here.
    #[must_use]
    pub fn open_run_stream(&self, session_id: &str) -> RunStream {
        let url = format!("{}{}", self.base_url, Self::run_stream_path(session_id));
        RunStream::open(self.http.clone(), url)
    }

    async fn get_json<T>(&self, path: &str) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
    {
        let url = self.endpoint(path).ok_or(ApiError::InvalidPath)?;
        let mut last_error: Option<String> = None;

        for attempt in 0..self.request_attempts {
            let request = self
                .http
                .get(url.as_str())
                .header("x-request-id", format!("req_{}", Uuid::new_v4().simple()))
                .timeout(self.timeout);

            match request.send().await {
                Ok(response) => return decode_json_response(response).await,
                Err(error) => {
                    last_error = Some(error.to_string());
                    if attempt + 1 >= self.request_attempts {
                        break;
                    }
                }
            }
        }

        Err(ApiError::Request {
            message: last_error.unwrap_or_else(|| "unknown".to_string()),
        })
    }

    // POSTs are sent exactly once: run-start is not idempotent, and a retry
    // after an ambiguous send failure could start a second run.
    async fn post_json<Req, Res>(&self, path: &str, payload: &Req) -> Result<Res, ApiError>
    where
        Req: Serialize + ?Sized,
        Res: DeserializeOwned,
    {
        let url = self.endpoint(path).ok_or(ApiError::InvalidPath)?;
        let request = self
            .http
            .post(url.as_str())
            .header("x-request-id", format!("req_{}", Uuid::new_v4().simple()))
            .timeout(self.timeout)
            .json(payload);

        match request.send().await {
            Ok(response) => decode_json_response(response).await,
            Err(error) => Err(ApiError::Request {
                message: error.to_string(),
            }),
        }
    }
}

pub fn format_http_error(status: StatusCode, body: &[u8]) -> ApiError {
    let body = non_empty_string(String::from_utf8_lossy(body).to_string())
        .unwrap_or_else(|| "<empty>".to_string());
    ApiError::Http { status, body }
}

fn normalize_base_url(base_url: &str) -> Result<String, ApiError> {
    let trimmed = base_url.trim();
    if trimmed.is_empty() {
        return Err(ApiError::BaseUrlMissing);
    }
    Ok(trimmed.trim_end_matches('/').to_string())
}

async fn decode_json_response<T>(response: reqwest::Response) -> Result<T, ApiError>
where
    T: DeserializeOwned,
{
    let status = response.status();
    let bytes = response.bytes().await.map_err(|error| ApiError::Read {
        message: error.to_string(),
    })?;

    if !status.is_success() {
        return Err(format_http_error(status, &bytes));
    }

    serde_json::from_slice::<T>(&bytes).map_err(|error| ApiError::Decode {
        message: error.to_string(),
    })
}

fn non_empty_string(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_builder_normalizes_paths() {
        let client = ApiClient::new(ApiClientConfig::new("http://deck.example.com/"))
            .expect("client builds");

        assert_eq!(
            client.endpoint("/api/chat/sessions"),
            Some("http://deck.example.com/api/chat/sessions".to_string())
        );
        assert_eq!(
            client.endpoint("api/chat/sessions"),
            Some("http://deck.example.com/api/chat/sessions".to_string())
        );
        assert_eq!(client.endpoint(""), None);
    }

    #[test]
    fn path_helpers_are_deterministic() {
        assert_eq!(ApiClient::run_start_path(), "/api/agent/run");
        assert_eq!(
            ApiClient::run_stream_path(" s1 "),
            "/api/agent/stream/s1"
        );
        assert_eq!(ApiClient::sessions_path(), "/api/chat/sessions");
        assert_eq!(
            ApiClient::chat_history_path("abc"),
            "/api/chat/history/abc"
        );
        assert_eq!(ApiClient::workspace_files_path(), "/api/workspace/files");
        assert_eq!(
            ApiClient::workspace_file_path("src/main.rs"),
            "/api/workspace/file?path=src%2Fmain.rs"
        );
        assert_eq!(ApiClient::models_path(), "/api/models");
    }

    #[test]
    fn http_error_mapping_preserves_shape() {
        let error = format_http_error(StatusCode::BAD_GATEWAY, b" gateway failed ");
        assert_eq!(error.to_string(), "deck_http_502 Bad Gateway:gateway failed");

        let empty_body = format_http_error(StatusCode::SERVICE_UNAVAILABLE, b" ");
        assert_eq!(
            empty_body.to_string(),
            "deck_http_503 Service Unavailable:<empty>"
        );
    }

    #[test]
    fn base_url_missing_is_rejected() {
        let result = ApiClient::new(ApiClientConfig::new("   "));
        assert!(matches!(result, Err(ApiError::BaseUrlMissing)));
    }
}
