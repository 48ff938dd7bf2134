//! The unit of work the scheduler runs.

use std::future::Future;

use async_trait::async_trait;

/// Errors returned by a task run.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error(transparent)]
    Failed(Box<dyn std::error::Error + Send + Sync>),

    #[error("{0}")]
    Message(String),
}

impl TaskError {
    /// Wrap any error as a task failure.
    pub fn failed(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Failed(Box::new(err))
    }
}

/// A named unit of the pipeline.
///
/// Runs are stateless given the filesystem: calling `run` twice on unchanged
/// input must produce the same output.
#[async_trait]
pub trait Task: Send + Sync {
    /// Name used in logs and to address the task from the CLI.
    fn name(&self) -> &str;

    /// Run the task to completion.
    async fn run(&self) -> Result<(), TaskError>;
}

/// A task backed by an async closure.
pub struct FnTask<F> {
    name: String,
    func: F,
}

impl<F, Fut> FnTask<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), TaskError>> + Send,
{
    /// Create a task from a name and a closure producing the run future.
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

#[async_trait]
impl<F, Fut> Task for FnTask<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), TaskError>> + Send,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self) -> Result<(), TaskError> {
        (self.func)().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fn_task_runs_closure() {
        let task = FnTask::new("noop", || async { Ok(()) });

        assert_eq!(task.name(), "noop");
        assert!(task.run().await.is_ok());
    }

    #[test]
    fn wraps_io_errors() {
        let err = TaskError::failed(std::io::Error::other("disk full"));
        assert_eq!(err.to_string(), "disk full");
    }
}
