//! CLI subcommands.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use sitepipe_graph::{ReloadSink, Scheduler, TaskGraph};
use sitepipe_tasks::TaskSet;

use crate::config::Config;

pub mod build;
pub mod init;
pub mod run;
pub mod watch;

/// Every named entry point, wired to `sink`.
pub(crate) fn task_set(config: &Config, root: &Path, sink: Arc<dyn ReloadSink>) -> TaskSet {
    TaskSet::new(
        Arc::new(config.catalog(root)),
        config.pipeline_options(),
        Arc::new(config.converter()),
        sink,
    )
}

/// Run `graph` and log a summary.
pub(crate) async fn execute(graph: &TaskGraph) -> Result<()> {
    let report = match Scheduler::new().run(graph).await {
        Ok(report) => report,
        Err(failure) => {
            tracing::error!(
                "'{}' failed ({}); completed: {}",
                graph.name(),
                failure.report.failed().join(", "),
                failure
                    .report
                    .outcomes
                    .iter()
                    .filter(|o| o.succeeded)
                    .map(|o| o.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
            return Err(failure.into());
        }
    };

    tracing::info!(
        "Finished '{}': {} tasks in {}ms",
        graph.name(),
        report.outcomes.len(),
        report.duration.as_millis()
    );

    Ok(())
}
