//! Run lifecycle orchestration.
//!
//! One coordinator instance owns one run at a time, end to end: optimistic
//! append, run-start request, run-stream consumption, and the terminal
//! reconciliation that makes the server's view authoritative. Every error
//! path lands back in `Idle`; nothing here is fatal to the process.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;

use agentdeck_client::config::{
    DEFAULT_STREAM_IDLE_TIMEOUT, ModelOverrides, resolve_stream_idle_timeout,
};
use agentdeck_client::stream::RunStream;
use agentdeck_client::types::{RunRequest, RunStatus};

use crate::activity::ActivityLog;
use crate::backend::AgentBackend;
use crate::session::SessionStore;
use crate::timeline::{MessageTimeline, PENDING_SESSION_ID};
use crate::workspace::WorkspaceMirror;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RunPhase {
    Idle,
    Submitting,
    Streaming,
    Finalizing,
}

impl RunPhase {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Submitting => "submitting",
            Self::Streaming => "streaming",
            Self::Finalizing => "finalizing",
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SubmitOutcome {
    /// The run started and its stream is live.
    Started,
    /// Another run is in flight; the submission was a no-op.
    Busy,
    /// Blank input; nothing was sent.
    EmptyRequest,
    /// The run-start request failed. The optimistic entry stays visible.
    RequestFailed,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RunOutcome {
    Completed,
    Failed { message: String },
    /// No event arrived within the idle window.
    Stalled,
    /// The stream ended without a terminal event.
    Disconnected,
}

impl RunOutcome {
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Failed { .. } => "failed",
            Self::Stalled => "stalled",
            Self::Disconnected => "disconnected",
        }
    }
}

#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    pub stream_idle_timeout: Duration,
    pub model_overrides: ModelOverrides,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            stream_idle_timeout: DEFAULT_STREAM_IDLE_TIMEOUT,
            model_overrides: ModelOverrides::default(),
        }
    }
}

impl CoordinatorConfig {
    #[must_use]
    pub fn from_env() -> Self {
        let (stream_idle_timeout, source) = resolve_stream_idle_timeout();
        tracing::debug!(source = %source, "stream idle timeout resolved");
        Self {
            stream_idle_timeout,
            model_overrides: ModelOverrides::from_env(),
        }
    }
}

/// Explicitly constructed over an injected backend; holds at most one live
/// run-stream connection at any time, and no other component may open or
/// close it.
pub struct RunCoordinator<B: AgentBackend> {
    backend: Arc<B>,
    pub sessions: SessionStore,
    pub timeline: MessageTimeline,
    pub activity: ActivityLog,
    pub workspace: WorkspaceMirror,
    config: CoordinatorConfig,
    phase: RunPhase,
    stream: Option<RunStream>,
    active_run_session: Option<String>,
    last_error: Option<String>,
}

impl<B: AgentBackend> RunCoordinator<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self::with_config(backend, CoordinatorConfig::default())
    }

    pub fn with_config(backend: Arc<B>, config: CoordinatorConfig) -> Self {
        Self {
            backend,
            sessions: SessionStore::default(),
            timeline: MessageTimeline::default(),
            activity: ActivityLog::default(),
            workspace: WorkspaceMirror::default(),
            config,
            phase: RunPhase::Idle,
            stream: None,
            active_run_session: None,
            last_error: None,
        }
    }

    #[must_use]
    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    #[must_use]
    pub fn has_live_stream(&self) -> bool {
        self.stream.is_some()
    }

    /// Session owning the in-flight run, if any. Survives session switches:
    /// the run stays owned by the session that started it.
    #[must_use]
    pub fn active_run_session(&self) -> Option<&str> {
        self.active_run_session.as_deref()
    }

    /// Starts a run for the given request. A submission while a run is in
    /// flight is a no-op for the caller.
    pub async fn submit(&mut self, user_request: &str) -> SubmitOutcome {
        if self.phase != RunPhase::Idle {
            return SubmitOutcome::Busy;
        }
        let trimmed = user_request.trim();
        if trimmed.is_empty() {
            return SubmitOutcome::EmptyRequest;
        }

        self.phase = RunPhase::Submitting;
        self.last_error = None;
        self.activity.clear();

        let optimistic_session = self
            .sessions
            .current()
            .unwrap_or(PENDING_SESSION_ID)
            .to_string();
        self.timeline.append_optimistic(&optimistic_session, trimmed);
        self.activity.push(format!("> Starting task: {trimmed}"));

        let request = self
            .config
            .model_overrides
            .apply_to(RunRequest::new(trimmed));
        let started = match self.backend.start_run(&request).await {
            Ok(started) => started,
            Err(error) => {
                // The optimistic entry stays visible uncorrected; the next
                // authoritative reload replaces it.
                self.report(format!("run start failed: {error}"));
                self.phase = RunPhase::Idle;
                return SubmitOutcome::RequestFailed;
            }
        };

        self.activity
            .push(format!("> Session started: {}", started.session_id));
        self.sessions.set_current(started.session_id.clone());
        if let Err(error) = self.sessions.refresh(self.backend.as_ref()).await {
            self.report(format!("session list refresh failed: {error}"));
        }

        self.stream = Some(self.backend.open_run_stream(&started.session_id));
        self.active_run_session = Some(started.session_id);
        self.phase = RunPhase::Streaming;
        SubmitOutcome::Started
    }

    /// Consumes stream events until the run reaches a terminal state.
    /// Progress events touch only the activity log; the message timeline
    /// changes solely through authoritative reconciliation. Returns `None`
    /// when no run is streaming.
    pub async fn pump(&mut self) -> Option<RunOutcome> {
        if self.phase != RunPhase::Streaming {
            return None;
        }

        loop {
            let next = {
                let stream = self.stream.as_mut()?;
                timeout(self.config.stream_idle_timeout, stream.recv()).await
            };

            match next {
                Err(_elapsed) => {
                    self.fail_run("run stream stalled: no event within the idle window".to_string());
                    return Some(RunOutcome::Stalled);
                }
                Ok(None) => {
                    self.fail_run("run stream closed before completion".to_string());
                    return Some(RunOutcome::Disconnected);
                }
                Ok(Some(event)) => match event.status {
                    RunStatus::Progress => {
                        if let Some(node) = event.node.as_deref() {
                            self.activity.push(format!("> Agent [{node}] active..."));
                        }
                    }
                    RunStatus::Error => {
                        let message = event
                            .message
                            .unwrap_or_else(|| "workflow failed".to_string());
                        self.fail_run(message.clone());
                        return Some(RunOutcome::Failed { message });
                    }
                    RunStatus::Complete => {
                        self.phase = RunPhase::Finalizing;
                        self.close_stream();
                        self.activity.push("> Workflow completed.");
                        self.finalize().await;
                        self.phase = RunPhase::Idle;
                        return Some(RunOutcome::Completed);
                    }
                },
            }
        }
    }

    /// Loads a session's history and makes it current. On failure the prior
    /// timeline and selection are retained.
    pub async fn select_session(&mut self, session_id: &str) -> bool {
        match self.backend.chat_history(session_id).await {
            Ok(messages) => {
                self.timeline.replace_with_authoritative(messages);
                self.sessions.set_current(session_id.to_string());
                self.activity.clear();
                self.activity
                    .push(format!("> Loaded history for session: {session_id}"));
                true
            }
            Err(error) => {
                self.report(format!("history load failed: {error}"));
                false
            }
        }
    }

    /// Clears the current session and timeline without contacting the
    /// backend; a session only materializes server-side once a run starts.
    /// An in-flight run keeps streaming, owned by its originating session.
    pub fn start_new(&mut self) {
        self.sessions.clear_current();
        self.timeline.clear();
        self.activity.clear();
    }

    pub async fn refresh_sessions(&mut self) -> bool {
        match self.sessions.refresh(self.backend.as_ref()).await {
            Ok(()) => true,
            Err(error) => {
                self.report(format!("session list refresh failed: {error}"));
                false
            }
        }
    }

    pub async fn refresh_workspace(&mut self) -> bool {
        match self.workspace.refresh_files(self.backend.as_ref()).await {
            Ok(()) => true,
            Err(error) => {
                self.report(format!("workspace refresh failed: {error}"));
                false
            }
        }
    }

    pub async fn select_file(&mut self, path: &str) {
        self.workspace
            .select_file(self.backend.as_ref(), path)
            .await;
    }

    /// Completion-side reconciliation: reload the run session's history and
    /// the workspace listing concurrently, install whichever results land,
    /// and make the run's session current again even if the user navigated
    /// away mid-run.
    async fn finalize(&mut self) {
        let Some(run_session) = self.active_run_session.take() else {
            return;
        };

        let (history, files) = tokio::join!(
            self.backend.chat_history(&run_session),
            self.backend.workspace_files(),
        );

        match history {
            Ok(messages) => {
                self.timeline.replace_with_authoritative(messages);
                self.sessions.set_current(run_session);
            }
            Err(error) => self.report(format!("history reload failed: {error}")),
        }
        match files {
            Ok(files) => self.workspace.install_files(files),
            Err(error) => self.report(format!("workspace refresh failed: {error}")),
        }
    }

    fn fail_run(&mut self, message: String) {
        self.close_stream();
        self.active_run_session = None;
        self.report(message);
        self.phase = RunPhase::Idle;
    }

    fn close_stream(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.close();
        }
    }

    fn report(&mut self, message: String) {
        tracing::warn!(error = %message, "run coordinator error");
        self.activity.push(format!("> Error: {message}"));
        self.last_error = Some(message);
    }
}
