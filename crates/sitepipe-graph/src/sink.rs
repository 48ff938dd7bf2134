//! Reload notification capability handed to tasks.

use std::sync::Mutex;

/// Emitted by a task when a run has finished writing its output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReloadEvent {
    /// Name of the task that completed
    pub task: String,

    /// Written files, relative to the build root, `/`-separated
    pub files: Vec<String>,
}

impl ReloadEvent {
    pub fn new(task: impl Into<String>, files: Vec<String>) -> Self {
        Self {
            task: task.into(),
            files,
        }
    }

    /// True when every written file is a stylesheet, so clients can swap
    /// styles in place instead of reloading the page.
    pub fn is_css_only(&self) -> bool {
        !self.files.is_empty() && self.files.iter().all(|f| f.ends_with(".css"))
    }
}

/// Receiver of task completion events.
pub trait ReloadSink: Send + Sync {
    fn notify(&self, event: ReloadEvent);
}

/// Sink that drops every event (one-shot builds).
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl ReloadSink for NullSink {
    fn notify(&self, _event: ReloadEvent) {}
}

/// Sink that keeps every event it receives.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<ReloadEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events received so far, in arrival order.
    pub fn events(&self) -> Vec<ReloadEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl ReloadSink for RecordingSink {
    fn notify(&self, event: ReloadEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
