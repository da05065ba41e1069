//! Directory-backed document.
//!
//! Each style element is a file `<escaped id>.css` under the root directory.
//! Ids are escaped so that ids derived from source paths (`src/app.css`) stay
//! inside the root: bytes other than ASCII alphanumerics, `.`, `-` and `_`
//! become `%XX`. A reload spawns the configured shell command, if any, on the
//! current tokio runtime without waiting for it. Style files are small and
//! written synchronously from the payload listener.

use std::path::{Path, PathBuf};

use tokio::process::Command;
use tokio::runtime::Handle;

use tracing::{debug, info};

use swarm_core::error::{SwarmError, SwarmResult};
use swarm_core::platform::Platform;

use crate::document::Document;

/// Document whose style elements live as files in a directory.
#[derive(Debug, Clone)]
pub struct DirectoryDocument {
    root: PathBuf,
    on_reload: Option<String>,
    reloads: usize,
}

impl DirectoryDocument {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            on_reload: None,
            reloads: 0,
        }
    }

    /// Shell command run on every page reload.
    pub fn on_reload(mut self, command: impl Into<String>) -> Self {
        self.on_reload = Some(command.into());
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// How many reloads were requested.
    pub fn reload_count(&self) -> usize {
        self.reloads
    }

    /// Path of the file backing the style element `id`.
    pub fn style_path(&self, id: &str) -> PathBuf {
        self.root.join(format!("{}.css", escape_id(id)))
    }

    fn write_style(&self, id: &str, css: &str) -> SwarmResult<()> {
        std::fs::create_dir_all(&self.root)?;
        let path = self.style_path(id);
        std::fs::write(&path, css)?;
        debug!("wrote {} bytes to {}", css.len(), path.display());
        Ok(())
    }
}

impl Document for DirectoryDocument {
    fn has_style(&self, id: &str) -> bool {
        self.style_path(id).is_file()
    }

    fn append_style(&mut self, id: &str, css: &str) -> SwarmResult<()> {
        self.write_style(id, css)
    }

    fn replace_style_text(&mut self, id: &str, css: &str) -> SwarmResult<()> {
        if !self.has_style(id) {
            return Err(SwarmError::Document(format!("no style file for id '{id}'")));
        }
        self.write_style(id, css)
    }

    fn reload(&mut self) -> SwarmResult<()> {
        self.reloads += 1;
        let Some(command) = &self.on_reload else {
            return Ok(());
        };

        let runtime = Handle::try_current().map_err(|e| {
            SwarmError::Document(format!("cannot run '{command}' outside a tokio runtime: {e}"))
        })?;

        let (shell, flag) = Platform::current().shell();
        let mut child = Command::new(shell)
            .arg(flag)
            .arg(command)
            .current_dir(&self.root)
            .spawn()
            .map_err(|e| SwarmError::Document(format!("failed to run '{command}': {e}")))?;
        info!(
            "reload command '{command}' started (pid {})",
            child.id().unwrap_or_default()
        );

        let command = command.clone();
        runtime.spawn(async move {
            match child.wait().await {
                Ok(status) => debug!("reload command '{command}' exited with {status}"),
                Err(e) => debug!("failed to wait for reload command '{command}': {e}"),
            }
        });
        Ok(())
    }
}

/// Escape an element id into a file name stem.
fn escape_id(id: &str) -> String {
    let mut escaped = String::with_capacity(id.len());
    for byte in id.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'.' | b'-' | b'_') {
            escaped.push(byte as char);
        } else {
            escaped.push_str(&format!("%{byte:02X}"));
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_id() {
        assert_eq!(escape_id("app"), "app");
        assert_eq!(escape_id("src/app.css"), "src%2Fapp.css");
        assert_eq!(escape_id("a b\\c"), "a%20b%5Cc");
    }

    #[test]
    fn test_append_then_replace() {
        let dir = tempfile::tempdir().unwrap();
        let mut doc = DirectoryDocument::new(dir.path().join("styles"));

        assert!(!doc.has_style("app"));
        doc.append_style("app", "body{color:blue}").unwrap();
        assert!(doc.has_style("app"));

        doc.replace_style_text("app", "body{color:red}").unwrap();
        let css = std::fs::read_to_string(doc.style_path("app")).unwrap();
        assert_eq!(css, "body{color:red}");
    }

    #[test]
    fn test_path_like_ids_stay_in_root() {
        let dir = tempfile::tempdir().unwrap();
        let mut doc = DirectoryDocument::new(dir.path());
        doc.append_style("../outside/app.css", "a{}").unwrap();

        let path = doc.style_path("../outside/app.css");
        assert_eq!(path.parent().unwrap(), dir.path());
        assert!(path.is_file());
    }

    #[test]
    fn test_replace_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut doc = DirectoryDocument::new(dir.path());
        assert!(matches!(
            doc.replace_style_text("app", "a{}"),
            Err(SwarmError::Document(_))
        ));
    }

    #[test]
    fn test_reload_without_command_only_counts() {
        let dir = tempfile::tempdir().unwrap();
        let mut doc = DirectoryDocument::new(dir.path());
        doc.reload().unwrap();
        assert_eq!(doc.reload_count(), 1);
    }

    #[test]
    fn test_reload_command_needs_runtime() {
        let dir = tempfile::tempdir().unwrap();
        let mut doc = DirectoryDocument::new(dir.path()).on_reload("true");
        assert!(matches!(doc.reload(), Err(SwarmError::Document(_))));
        assert_eq!(doc.reload_count(), 1);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_reload_runs_command_in_root() {
        let dir = tempfile::tempdir().unwrap();
        let mut doc = DirectoryDocument::new(dir.path()).on_reload("touch reloaded");
        doc.reload().unwrap();

        let marker = dir.path().join("reloaded");
        for _ in 0..100 {
            if marker.exists() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }
        assert!(marker.exists());
    }
}
