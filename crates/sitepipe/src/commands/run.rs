//! Run a single named task.

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Result};
use sitepipe_graph::NullSink;

use crate::config::Config;

/// Run the task called `name`.
pub async fn run(config: &Config, root: &Path, name: &str) -> Result<()> {
    let set = super::task_set(config, root, Arc::new(NullSink));

    let Some(graph) = set.get(name) else {
        bail!(
            "Unknown task '{}'. Available: {}",
            name,
            set.names().join(", ")
        );
    };

    super::execute(graph).await
}
