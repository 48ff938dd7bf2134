//! Watch mode: build, rebuild on change and serve with live reload.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use sitepipe_graph::TaskGraph;
use sitepipe_server::{DevServer, DevServerConfig, ReloadHub, WatchLoop};

use crate::config::Config;

/// Run the watch command. Returns only if every branch stops.
pub async fn run(config: &Config, root: &Path) -> Result<()> {
    let hub = ReloadHub::new();
    let set = super::task_set(config, root, Arc::new(hub.clone()));

    let watch_loop = WatchLoop::from_task_set(&set, config.debounce())
        .context("Failed to set up the watch loop")?;

    let server = DevServer::new(
        DevServerConfig {
            root: set.catalog().build_root(),
            port: config.server.port,
            host: config.server.host.clone(),
            open: config.server.open,
        },
        hub,
    );

    let graph = TaskGraph::parallel(
        "watch",
        vec![
            set.build().clone(),
            TaskGraph::task(Arc::new(watch_loop)),
            TaskGraph::task(Arc::new(server)),
        ],
    );

    super::execute(&graph).await
}
