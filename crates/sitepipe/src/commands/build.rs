//! One-shot build command.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use sitepipe_graph::NullSink;

use crate::config::Config;

/// Run the build command.
pub async fn run(config: &Config, root: &Path) -> Result<()> {
    tracing::info!("Building {}...", root.join(&config.project.source).display());

    let set = super::task_set(config, root, Arc::new(NullSink));
    super::execute(set.build()).await?;

    tracing::info!("Output: {}", set.catalog().build_root().display());
    Ok(())
}
