//! Session list cache and current-session identity.

use agentdeck_client::client::ApiError;
use agentdeck_client::types::Session;

use crate::backend::AgentBackend;

/// Read-through cache of the backend's session list, in the order the server
/// returned it, plus the identity of the current session (or none, for a
/// fresh unsaved state). Sessions are created server-side when a run starts;
/// this store never mutates or deletes them.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: Vec<Session>,
    current: Option<String>,
}

impl SessionStore {
    #[must_use]
    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    #[must_use]
    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn set_current(&mut self, session_id: impl Into<String>) {
        self.current = Some(session_id.into());
    }

    pub fn clear_current(&mut self) {
        self.current = None;
    }

    /// Replaces the cached list from the backend. A failed fetch leaves the
    /// previous list untouched.
    pub async fn refresh<B: AgentBackend>(&mut self, backend: &B) -> Result<(), ApiError> {
        match backend.sessions().await {
            Ok(sessions) => {
                self.sessions = sessions;
                Ok(())
            }
            Err(error) => {
                tracing::warn!(error = %error, "session list refresh failed");
                Err(error)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockBackend, session};

    #[tokio::test]
    async fn refresh_replaces_the_cached_list() {
        let backend = MockBackend::new();
        backend.set_sessions(vec![session("s2", "second"), session("s1", "first")]);

        let mut store = SessionStore::default();
        store.refresh(&backend).await.expect("refresh succeeds");
        assert_eq!(store.sessions().len(), 2);
        assert_eq!(store.sessions()[0].id, "s2");
    }

    #[tokio::test]
    async fn failed_refresh_retains_the_previous_list() {
        let backend = MockBackend::new();
        backend.set_sessions(vec![session("s1", "first")]);

        let mut store = SessionStore::default();
        store.refresh(&backend).await.expect("refresh succeeds");

        backend.fail_sessions("backend down");
        assert!(store.refresh(&backend).await.is_err());
        assert_eq!(store.sessions().len(), 1);
        assert_eq!(store.sessions()[0].id, "s1");
    }

    #[test]
    fn current_session_identity_is_explicit() {
        let mut store = SessionStore::default();
        assert_eq!(store.current(), None);

        store.set_current("s1");
        assert_eq!(store.current(), Some("s1"));

        store.clear_current();
        assert_eq!(store.current(), None);
    }
}
