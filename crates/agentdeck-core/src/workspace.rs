//! On-demand snapshot of the remote workspace.

use agentdeck_client::client::ApiError;

use crate::backend::AgentBackend;

/// Shown in place of file content when the read fails, so the viewer always
/// has something renderable.
pub const FILE_READ_SENTINEL: &str = "Error reading file.";

/// File listing plus the content of at most one selected file. Both are
/// replaced wholesale; nothing is cached across selections.
#[derive(Debug, Default)]
pub struct WorkspaceMirror {
    files: Vec<String>,
    selected: Option<String>,
    content: Option<String>,
    last_error: Option<String>,
}

impl WorkspaceMirror {
    #[must_use]
    pub fn files(&self) -> &[String] {
        &self.files
    }

    #[must_use]
    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    #[must_use]
    pub fn content(&self) -> Option<&str> {
        self.content.as_deref()
    }

    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Replaces the file listing wholesale. A failed fetch leaves the
    /// previous listing untouched.
    pub async fn refresh_files<B: AgentBackend>(&mut self, backend: &B) -> Result<(), ApiError> {
        match backend.workspace_files().await {
            Ok(files) => {
                self.install_files(files);
                Ok(())
            }
            Err(error) => {
                tracing::warn!(error = %error, "workspace file list refresh failed");
                self.last_error = Some(error.to_string());
                Err(error)
            }
        }
    }

    pub fn install_files(&mut self, files: Vec<String>) {
        self.files = files;
        self.last_error = None;
    }

    /// Fetches content for exactly one path and replaces the bound content,
    /// leaving the rest of the snapshot untouched. Every selection is a
    /// fresh fetch; a failed read binds the sentinel instead of erroring.
    pub async fn select_file<B: AgentBackend>(&mut self, backend: &B, path: &str) {
        self.selected = Some(path.to_string());
        match backend.workspace_file(path).await {
            Ok(content) => {
                self.content = Some(content);
                self.last_error = None;
            }
            Err(error) => {
                tracing::warn!(error = %error, path, "workspace file read failed");
                self.content = Some(FILE_READ_SENTINEL.to_string());
                self.last_error = Some(error.to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockBackend;

    #[tokio::test]
    async fn refresh_replaces_the_listing_wholesale() {
        let backend = MockBackend::new();
        backend.set_files(vec!["a.py".to_string(), "b.py".to_string()]);

        let mut mirror = WorkspaceMirror::default();
        mirror.refresh_files(&backend).await.expect("refresh succeeds");
        assert_eq!(mirror.files(), ["a.py", "b.py"]);

        backend.set_files(vec!["c.py".to_string()]);
        mirror.refresh_files(&backend).await.expect("refresh succeeds");
        assert_eq!(mirror.files(), ["c.py"]);
    }

    #[tokio::test]
    async fn failed_refresh_retains_the_previous_listing() {
        let backend = MockBackend::new();
        backend.set_files(vec!["a.py".to_string()]);

        let mut mirror = WorkspaceMirror::default();
        mirror.refresh_files(&backend).await.expect("refresh succeeds");

        backend.fail_files("backend down");
        assert!(mirror.refresh_files(&backend).await.is_err());
        assert_eq!(mirror.files(), ["a.py"]);
        assert!(mirror.last_error().is_some());
    }

    #[tokio::test]
    async fn selecting_a_readable_file_binds_its_content() {
        let backend = MockBackend::new();
        backend.set_file_content("a.py", "print('hi')");

        let mut mirror = WorkspaceMirror::default();
        mirror.select_file(&backend, "a.py").await;
        assert_eq!(mirror.selected(), Some("a.py"));
        assert_eq!(mirror.content(), Some("print('hi')"));
        assert_eq!(mirror.last_error(), None);
    }

    #[tokio::test]
    async fn unreadable_files_bind_the_sentinel_not_an_error() {
        let backend = MockBackend::new();

        let mut mirror = WorkspaceMirror::default();
        mirror.select_file(&backend, "missing.py").await;
        assert_eq!(mirror.selected(), Some("missing.py"));
        assert_eq!(mirror.content(), Some(FILE_READ_SENTINEL));
        assert!(mirror.last_error().is_some());
    }
}
