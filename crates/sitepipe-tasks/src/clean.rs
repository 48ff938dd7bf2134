//! Clean task: delete the build output tree.

use std::path::PathBuf;

use async_trait::async_trait;
use sitepipe_graph::{Task, TaskError};

use crate::error::AssetError;

/// Removes the build directory recursively. An absent directory is fine.
pub struct CleanTask {
    target: PathBuf,
}

impl CleanTask {
    pub fn new(target: impl Into<PathBuf>) -> Self {
        Self {
            target: target.into(),
        }
    }

    /// Delete the target; returns whether anything was removed.
    pub async fn clean(&self) -> Result<bool, AssetError> {
        match tokio::fs::remove_dir_all(&self.target).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(AssetError::io(&self.target, e)),
        }
    }
}

#[async_trait]
impl Task for CleanTask {
    fn name(&self) -> &str {
        "clean"
    }

    async fn run(&self) -> Result<(), TaskError> {
        if self.clean().await? {
            tracing::debug!("Removed {}", self.target.display());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[tokio::test]
    async fn removes_whole_tree() {
        let temp = tempdir().unwrap();
        let dist = temp.path().join("dist");
        fs::create_dir_all(dist.join("css")).unwrap();
        fs::write(dist.join("css/old.css"), "a{}").unwrap();

        let task = CleanTask::new(&dist);
        assert!(task.clean().await.unwrap());
        assert!(!dist.exists());
    }

    #[tokio::test]
    async fn absent_target_is_not_an_error() {
        let temp = tempdir().unwrap();
        let task = CleanTask::new(temp.path().join("dist"));

        assert!(!task.clean().await.unwrap());
        assert!(task.run().await.is_ok());
    }
}
