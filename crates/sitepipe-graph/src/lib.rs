//! Task graph for sitepipe.
//!
//! Tasks are composed into an explicit [`TaskGraph`] value (series and
//! parallel groups) and executed by a [`Scheduler`]. Tasks receive their
//! collaborators at construction; the only one shared across the pipeline is
//! the [`ReloadSink`] that live-reload listens on.

pub mod graph;
pub mod scheduler;
pub mod sink;
pub mod task;

pub use graph::TaskGraph;
pub use scheduler::{GraphError, RunFailure, RunReport, Scheduler, TaskOutcome};
pub use sink::{NullSink, RecordingSink, ReloadEvent, ReloadSink};
pub use task::{FnTask, Task, TaskError};
