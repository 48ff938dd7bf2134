//! File watching for the watch loop.

use std::path::{Path, PathBuf};

use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::server::ServerError;

/// Recursive watcher over a directory tree.
///
/// Changed paths are forwarded on the channel returned by [`FileWatcher::new`];
/// dropping the watcher stops the stream.
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
    root: PathBuf,
}

impl FileWatcher {
    /// Watch `root` recursively. Returns the watcher and the path stream.
    pub fn new(root: &Path) -> Result<(Self, mpsc::UnboundedReceiver<PathBuf>), ServerError> {
        let root = root
            .canonicalize()
            .map_err(|e| ServerError::Watch(format!("{}: {}", root.display(), e)))?;
        let (tx, rx) = mpsc::unbounded_channel();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            match res {
                Ok(event) if is_change(&event.kind) => {
                    for path in event.paths {
                        let _ = tx.send(path);
                    }
                }
                Ok(_) => {}
                Err(e) => tracing::warn!("File watch error: {}", e),
            }
        })
        .map_err(|e| ServerError::Watch(e.to_string()))?;

        watcher
            .watch(&root, RecursiveMode::Recursive)
            .map_err(|e| ServerError::Watch(e.to_string()))?;

        tracing::debug!("Watching {}", root.display());

        Ok((
            Self {
                _watcher: watcher,
                root,
            },
            rx,
        ))
    }

    /// Canonical watched root.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

fn is_change(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::Duration;
    use tempfile::tempdir;

    #[tokio::test]
    async fn reports_created_files() {
        let temp = tempdir().unwrap();
        let (watcher, mut rx) = FileWatcher::new(temp.path()).unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;
        fs::write(temp.path().join("index.html"), "<p>hi</p>").unwrap();

        let path = tokio::time::timeout(Duration::from_secs(3), rx.recv())
            .await
            .expect("timeout waiting for file watch event")
            .expect("channel should not be closed");

        assert_eq!(path.file_name().unwrap(), "index.html");
        assert!(path.starts_with(watcher.root()));
    }

    #[test]
    fn missing_root_is_an_error() {
        let temp = tempdir().unwrap();
        assert!(FileWatcher::new(&temp.path().join("missing")).is_err());
    }
}
