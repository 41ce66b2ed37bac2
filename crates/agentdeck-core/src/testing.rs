//! Channel-fed fake backend shared by the unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::mpsc;

use agentdeck_client::client::ApiError;
use agentdeck_client::stream::RunStream;
use agentdeck_client::types::{
    ChatMessage, MessageRole, RunEvent, RunRequest, RunStarted, RunStatus, Session,
};

use crate::backend::AgentBackend;

pub(crate) fn session(id: &str, title: &str) -> Session {
    Session {
        id: id.to_string(),
        title: Some(title.to_string()),
        created_at: Utc::now(),
    }
}

pub(crate) fn remote_message(
    id: i64,
    session_id: &str,
    role: MessageRole,
    content: &str,
) -> ChatMessage {
    ChatMessage {
        id: id.into(),
        session_id: session_id.to_string(),
        role,
        content: content.to_string(),
        node: None,
        created_at: Utc::now(),
        meta: None,
    }
}

pub(crate) fn progress_event(node: &str) -> RunEvent {
    RunEvent {
        node: Some(node.to_string()),
        status: RunStatus::Progress,
        message: None,
        plan: None,
    }
}

pub(crate) fn complete_event() -> RunEvent {
    RunEvent {
        node: None,
        status: RunStatus::Complete,
        message: Some("Workflow finished.".to_string()),
        plan: None,
    }
}

pub(crate) fn error_event(message: &str) -> RunEvent {
    RunEvent {
        node: None,
        status: RunStatus::Error,
        message: Some(message.to_string()),
        plan: None,
    }
}

fn request_error(message: &str) -> ApiError {
    ApiError::Request {
        message: message.to_string(),
    }
}

pub(crate) struct MockBackend {
    run_results: Mutex<VecDeque<Result<String, String>>>,
    sessions: Mutex<Result<Vec<Session>, String>>,
    histories: Mutex<HashMap<String, Vec<ChatMessage>>>,
    files: Mutex<Result<Vec<String>, String>>,
    file_contents: Mutex<HashMap<String, String>>,
    streams: Mutex<VecDeque<mpsc::Receiver<RunEvent>>>,
    pub(crate) run_requests: Mutex<Vec<RunRequest>>,
}

impl MockBackend {
    pub(crate) fn new() -> Self {
        Self {
            run_results: Mutex::new(VecDeque::new()),
            sessions: Mutex::new(Ok(Vec::new())),
            histories: Mutex::new(HashMap::new()),
            files: Mutex::new(Ok(Vec::new())),
            file_contents: Mutex::new(HashMap::new()),
            streams: Mutex::new(VecDeque::new()),
            run_requests: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn queue_run_ok(&self, session_id: &str) {
        self.run_results
            .lock()
            .expect("lock")
            .push_back(Ok(session_id.to_string()));
    }

    pub(crate) fn queue_run_err(&self, message: &str) {
        self.run_results
            .lock()
            .expect("lock")
            .push_back(Err(message.to_string()));
    }

    pub(crate) fn set_sessions(&self, sessions: Vec<Session>) {
        *self.sessions.lock().expect("lock") = Ok(sessions);
    }

    pub(crate) fn fail_sessions(&self, message: &str) {
        *self.sessions.lock().expect("lock") = Err(message.to_string());
    }

    pub(crate) fn set_history(&self, session_id: &str, messages: Vec<ChatMessage>) {
        self.histories
            .lock()
            .expect("lock")
            .insert(session_id.to_string(), messages);
    }

    pub(crate) fn set_files(&self, files: Vec<String>) {
        *self.files.lock().expect("lock") = Ok(files);
    }

    pub(crate) fn fail_files(&self, message: &str) {
        *self.files.lock().expect("lock") = Err(message.to_string());
    }

    pub(crate) fn set_file_content(&self, path: &str, content: &str) {
        self.file_contents
            .lock()
            .expect("lock")
            .insert(path.to_string(), content.to_string());
    }

    /// Queues the receiver the next `open_run_stream` call hands out and
    /// returns the paired sender for the test to feed.
    pub(crate) fn queue_stream(&self) -> mpsc::Sender<RunEvent> {
        let (event_tx, event_rx) = mpsc::channel(64);
        self.streams.lock().expect("lock").push_back(event_rx);
        event_tx
    }
}

#[async_trait]
impl AgentBackend for MockBackend {
    async fn start_run(&self, request: &RunRequest) -> Result<RunStarted, ApiError> {
        self.run_requests
            .lock()
            .expect("lock")
            .push(request.clone());
        match self.run_results.lock().expect("lock").pop_front() {
            Some(Ok(session_id)) => Ok(RunStarted { session_id }),
            Some(Err(message)) => Err(request_error(&message)),
            None => Err(request_error("no queued run result")),
        }
    }

    async fn sessions(&self) -> Result<Vec<Session>, ApiError> {
        self.sessions
            .lock()
            .expect("lock")
            .clone()
            .map_err(|message| request_error(&message))
    }

    async fn chat_history(&self, session_id: &str) -> Result<Vec<ChatMessage>, ApiError> {
        self.histories
            .lock()
            .expect("lock")
            .get(session_id)
            .cloned()
            .ok_or_else(|| request_error("no history for session"))
    }

    async fn workspace_files(&self) -> Result<Vec<String>, ApiError> {
        self.files
            .lock()
            .expect("lock")
            .clone()
            .map_err(|message| request_error(&message))
    }

    async fn workspace_file(&self, path: &str) -> Result<String, ApiError> {
        self.file_contents
            .lock()
            .expect("lock")
            .get(path)
            .cloned()
            .ok_or_else(|| request_error("file read failed"))
    }

    fn open_run_stream(&self, _session_id: &str) -> RunStream {
        match self.streams.lock().expect("lock").pop_front() {
            Some(event_rx) => RunStream::from_receiver(event_rx),
            None => {
                // No queued stream: hand out one that ends immediately.
                let (_event_tx, event_rx) = mpsc::channel(1);
                RunStream::from_receiver(event_rx)
            }
        }
    }
}
