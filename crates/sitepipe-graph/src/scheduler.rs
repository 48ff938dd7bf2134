//! Executes a [`TaskGraph`].

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::graph::TaskGraph;
use crate::task::{Task, TaskError};

/// Errors produced by a graph run.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("Task '{task}' failed: {source}")]
    TaskFailed {
        task: String,
        #[source]
        source: TaskError,
    },

    #[error("Task '{0}' panicked")]
    TaskPanicked(String),

    #[error("{} of {} branches of '{group}' failed; first: {}", .failures.len(), .total, first_failure(.failures))]
    BranchesFailed {
        group: String,
        total: usize,
        failures: Vec<GraphError>,
    },
}

fn first_failure(failures: &[GraphError]) -> String {
    failures
        .first()
        .map(|e| e.to_string())
        .unwrap_or_default()
}

impl GraphError {
    /// Names of the leaf tasks that failed.
    pub fn failed_tasks(&self) -> Vec<String> {
        match self {
            Self::TaskFailed { task, .. } | Self::TaskPanicked(task) => vec![task.clone()],
            Self::BranchesFailed { failures, .. } => {
                failures.iter().flat_map(|f| f.failed_tasks()).collect()
            }
        }
    }
}

/// Outcome of a single leaf task.
#[derive(Debug, Clone)]
pub struct TaskOutcome {
    /// Task name
    pub name: String,

    /// Wall time of the run
    pub duration: Duration,

    /// Whether the run succeeded
    pub succeeded: bool,
}

/// Summary of a graph run.
#[derive(Debug, Default)]
pub struct RunReport {
    /// Leaf tasks in completion order
    pub outcomes: Vec<TaskOutcome>,

    /// Total wall time
    pub duration: Duration,
}

impl RunReport {
    /// Names of the tasks that ran, in completion order.
    pub fn completed(&self) -> Vec<&str> {
        self.outcomes.iter().map(|o| o.name.as_str()).collect()
    }

    /// Names of the tasks that ran and failed.
    pub fn failed(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|o| !o.succeeded)
            .map(|o| o.name.as_str())
            .collect()
    }
}

/// A failed graph run, with the outcomes of every task that did run.
#[derive(Debug)]
pub struct RunFailure {
    pub report: RunReport,
    pub error: GraphError,
}

impl fmt::Display for RunFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.error, f)
    }
}

impl std::error::Error for RunFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        std::error::Error::source(&self.error)
    }
}

type Outcomes = Arc<Mutex<Vec<TaskOutcome>>>;
type NodeFuture = Pin<Box<dyn Future<Output = Result<(), GraphError>> + Send>>;

/// Runs task graphs.
///
/// Series steps run in order and stop at the first failure. Parallel branches
/// are spawned together and always joined, so one failing branch never
/// cancels its siblings.
#[derive(Debug, Default, Clone, Copy)]
pub struct Scheduler;

impl Scheduler {
    pub fn new() -> Self {
        Self
    }

    /// Run `graph` to completion.
    ///
    /// The report is returned on both paths; on failure it sits next to the
    /// error in [`RunFailure`].
    pub async fn run(&self, graph: &TaskGraph) -> Result<RunReport, RunFailure> {
        let start = Instant::now();
        let outcomes: Outcomes = Arc::new(Mutex::new(Vec::new()));

        let result = run_node(graph.clone(), Arc::clone(&outcomes)).await;

        let report = RunReport {
            outcomes: outcomes
                .lock()
                .map(|mut o| std::mem::take(&mut *o))
                .unwrap_or_default(),
            duration: start.elapsed(),
        };

        match result {
            Ok(()) => Ok(report),
            Err(error) => Err(RunFailure { report, error }),
        }
    }
}

fn run_node(node: TaskGraph, outcomes: Outcomes) -> NodeFuture {
    Box::pin(async move {
        match node {
            TaskGraph::Task(task) => run_leaf(task, outcomes).await,

            TaskGraph::Series { name, steps } => {
                tracing::debug!(group = %name, steps = steps.len(), "series start");
                for step in steps {
                    run_node(step, Arc::clone(&outcomes)).await?;
                }
                Ok(())
            }

            TaskGraph::Parallel { name, branches } => {
                tracing::debug!(group = %name, branches = branches.len(), "parallel start");
                let total = branches.len();

                let handles: Vec<_> = branches
                    .into_iter()
                    .map(|branch| {
                        let branch_name = branch.name().to_string();
                        let handle = tokio::spawn(run_node(branch, Arc::clone(&outcomes)));
                        (branch_name, handle)
                    })
                    .collect();

                let mut failures = Vec::new();
                for (branch_name, handle) in handles {
                    match handle.await {
                        Ok(Ok(())) => {}
                        Ok(Err(e)) => failures.push(e),
                        Err(_) => failures.push(GraphError::TaskPanicked(branch_name)),
                    }
                }

                if failures.is_empty() {
                    Ok(())
                } else {
                    Err(GraphError::BranchesFailed {
                        group: name,
                        total,
                        failures,
                    })
                }
            }
        }
    })
}

async fn run_leaf(task: Arc<dyn Task>, outcomes: Outcomes) -> Result<(), GraphError> {
    let name = task.name().to_string();
    tracing::info!("Starting '{}'", name);
    let start = Instant::now();

    let result = tokio::spawn(async move { task.run().await }).await;
    let duration = start.elapsed();

    let (succeeded, result) = match result {
        Ok(Ok(())) => {
            tracing::info!("Finished '{}' after {}ms", name, duration.as_millis());
            (true, Ok(()))
        }
        Ok(Err(source)) => {
            tracing::error!("'{}' errored after {}ms: {}", name, duration.as_millis(), source);
            (
                false,
                Err(GraphError::TaskFailed {
                    task: name.clone(),
                    source,
                }),
            )
        }
        Err(_) => {
            tracing::error!("'{}' panicked after {}ms", name, duration.as_millis());
            (false, Err(GraphError::TaskPanicked(name.clone())))
        }
    };

    if let Ok(mut outcomes) = outcomes.lock() {
        outcomes.push(TaskOutcome {
            name,
            duration,
            succeeded,
        });
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::FnTask;
    use std::sync::atomic::{AtomicUsize, Ordering};

    type Log = Arc<Mutex<Vec<String>>>;

    fn logging_task(name: &'static str, log: &Log) -> TaskGraph {
        let log = Arc::clone(log);
        TaskGraph::task(Arc::new(FnTask::new(name, move || {
            let log = Arc::clone(&log);
            async move {
                log.lock().unwrap().push(name.to_string());
                Ok(())
            }
        })))
    }

    fn failing_task(name: &'static str) -> TaskGraph {
        TaskGraph::task(Arc::new(FnTask::new(name, || async {
            Err(TaskError::Message("invalid stylesheet".into()))
        })))
    }

    #[tokio::test]
    async fn series_runs_in_order() {
        let log: Log = Arc::default();
        let graph = TaskGraph::series(
            "build",
            vec![
                logging_task("clean", &log),
                logging_task("css", &log),
                logging_task("fontsStyle", &log),
            ],
        );

        let report = Scheduler::new().run(&graph).await.unwrap();

        assert_eq!(*log.lock().unwrap(), vec!["clean", "css", "fontsStyle"]);
        assert_eq!(report.completed(), vec!["clean", "css", "fontsStyle"]);
    }

    #[tokio::test]
    async fn series_stops_at_first_failure() {
        let log: Log = Arc::default();
        let graph = TaskGraph::series(
            "build",
            vec![
                logging_task("clean", &log),
                failing_task("css"),
                logging_task("fontsStyle", &log),
            ],
        );

        let err = Scheduler::new().run(&graph).await.unwrap_err();

        assert_eq!(*log.lock().unwrap(), vec!["clean"]);
        assert_eq!(err.error.failed_tasks(), vec!["css"]);
        assert_eq!(err.report.completed(), vec!["clean", "css"]);
        assert_eq!(err.report.failed(), vec!["css"]);
    }

    #[tokio::test]
    async fn parallel_failure_does_not_cancel_siblings() {
        let log: Log = Arc::default();
        let graph = TaskGraph::parallel(
            "assets",
            vec![
                failing_task("css"),
                logging_task("html", &log),
                logging_task("js", &log),
            ],
        );

        let err = Scheduler::new().run(&graph).await.unwrap_err();

        let mut ran = log.lock().unwrap().clone();
        ran.sort();
        assert_eq!(ran, vec!["html", "js"]);

        let mut outcomes: Vec<_> = err
            .report
            .outcomes
            .iter()
            .map(|o| (o.name.as_str(), o.succeeded))
            .collect();
        outcomes.sort();
        assert_eq!(outcomes, vec![("css", false), ("html", true), ("js", true)]);

        match err.error {
            GraphError::BranchesFailed { total, failures, .. } => {
                assert_eq!(total, 3);
                assert_eq!(failures.len(), 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn parallel_failure_halts_enclosing_series() {
        let log: Log = Arc::default();
        let graph = TaskGraph::series(
            "build",
            vec![
                TaskGraph::parallel("assets", vec![failing_task("css"), logging_task("html", &log)]),
                logging_task("fontsStyle", &log),
            ],
        );

        assert!(Scheduler::new().run(&graph).await.is_err());
        assert_eq!(*log.lock().unwrap(), vec!["html"]);
    }

    #[tokio::test]
    async fn reports_panics_as_failures() {
        let graph = TaskGraph::task(Arc::new(FnTask::new("boom", || async {
            if true {
                panic!("transformer crashed");
            }
            Ok(())
        })));

        let err = Scheduler::new().run(&graph).await.unwrap_err();
        assert_eq!(err.report.failed(), vec!["boom"]);
        assert!(matches!(err.error, GraphError::TaskPanicked(name) if name == "boom"));
    }

    #[tokio::test]
    async fn shared_leaf_runs_once_per_reference() {
        let counter = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&counter);
        let task: Arc<dyn Task> = Arc::new(FnTask::new("css", move || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        }));

        let graph = TaskGraph::series(
            "twice",
            vec![TaskGraph::task(Arc::clone(&task)), TaskGraph::task(task)],
        );

        Scheduler::new().run(&graph).await.unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }
}
