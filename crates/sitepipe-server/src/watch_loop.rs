//! Watch loop: maps source changes to asset kinds and rebuilds them.
//!
//! Every kind has its own queue. A queue waits for a trigger, sleeps for the
//! debounce window, drains whatever piled up and runs its task once, so a
//! burst of saves turns into a single rebuild and a change arriving during a
//! rebuild causes exactly one follow-up run. Queues never wait on each other.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sitepipe_graph::{Scheduler, Task, TaskError, TaskGraph};
use sitepipe_tasks::sources::to_slash;
use sitepipe_tasks::{AssetKind, PathCatalog, SourceSet, TaskSet};
use tokio::sync::mpsc;

use crate::server::ServerError;
use crate::watcher::FileWatcher;

/// Window in which repeated triggers for one kind are merged.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(100);

/// Maps changed paths to the asset kinds whose watch globs match them.
#[derive(Debug, Clone)]
pub struct WatchRouter {
    root: PathBuf,
    routes: Vec<(AssetKind, SourceSet)>,
}

impl WatchRouter {
    pub fn new(catalog: &PathCatalog) -> Result<Self, ServerError> {
        let root = catalog
            .root()
            .canonicalize()
            .unwrap_or_else(|_| catalog.root().to_path_buf());

        let mut routes = Vec::new();
        for kind in AssetKind::ALL {
            let watch = &catalog.get(kind).watch;
            if !watch.is_empty() {
                routes.push((kind, SourceSet::new(&root, watch)?));
            }
        }

        Ok(Self { root, routes })
    }

    /// Kinds affected by a change to `path`.
    ///
    /// Absolute paths outside the project root match nothing. Relative paths
    /// are taken as relative to the root.
    pub fn route(&self, path: &Path) -> Vec<AssetKind> {
        let relative = if path.is_absolute() {
            match path.strip_prefix(&self.root) {
                Ok(relative) => relative,
                Err(_) => return Vec::new(),
            }
        } else {
            path
        };

        let relative = to_slash(relative);
        self.routes
            .iter()
            .filter(|(_, set)| set.matches(&relative))
            .map(|(kind, _)| *kind)
            .collect()
    }

    /// Kinds that have watch globs.
    pub fn kinds(&self) -> impl Iterator<Item = AssetKind> + '_ {
        self.routes.iter().map(|(kind, _)| *kind)
    }
}

/// Long-lived task rebuilding asset kinds as their sources change.
pub struct WatchLoop {
    catalog: Arc<PathCatalog>,
    router: WatchRouter,
    tasks: BTreeMap<AssetKind, TaskGraph>,
    debounce: Duration,
}

impl WatchLoop {
    pub fn new(
        catalog: Arc<PathCatalog>,
        tasks: BTreeMap<AssetKind, TaskGraph>,
        debounce: Duration,
    ) -> Result<Self, ServerError> {
        let router = WatchRouter::new(&catalog)?;
        Ok(Self {
            catalog,
            router,
            tasks,
            debounce,
        })
    }

    /// Watch loop rebuilding with the asset tasks of `set`.
    pub fn from_task_set(set: &TaskSet, debounce: Duration) -> Result<Self, ServerError> {
        let tasks = AssetKind::ALL
            .into_iter()
            .map(|kind| (kind, set.asset_task(kind).clone()))
            .collect();
        Self::new(Arc::clone(set.catalog()), tasks, debounce)
    }

    /// Route every path from `changes` to its kind queues until the stream
    /// ends, then let the queues finish pending work.
    pub async fn dispatch(&self, mut changes: mpsc::UnboundedReceiver<PathBuf>) {
        let mut queues = BTreeMap::new();
        let mut handles = Vec::new();

        for kind in self.router.kinds() {
            let Some(task) = self.tasks.get(&kind) else {
                continue;
            };
            let (tx, rx) = mpsc::unbounded_channel();
            queues.insert(kind, tx);
            handles.push(tokio::spawn(run_queue(
                kind,
                task.clone(),
                self.debounce,
                rx,
            )));
        }

        while let Some(path) = changes.recv().await {
            let kinds = self.router.route(&path);
            if kinds.is_empty() {
                tracing::debug!("Ignoring change to {}", path.display());
                continue;
            }

            for kind in kinds {
                if let Some(queue) = queues.get(&kind) {
                    tracing::debug!("{} changed, queueing {}", path.display(), kind.task_name());
                    let _ = queue.send(());
                }
            }
        }

        drop(queues);
        for handle in handles {
            if let Err(e) = handle.await {
                tracing::error!("Watch queue stopped: {}", e);
            }
        }
    }
}

async fn run_queue(
    kind: AssetKind,
    task: TaskGraph,
    debounce: Duration,
    mut triggers: mpsc::UnboundedReceiver<()>,
) {
    let scheduler = Scheduler::new();

    while triggers.recv().await.is_some() {
        tokio::time::sleep(debounce).await;

        let mut merged = 0;
        while triggers.try_recv().is_ok() {
            merged += 1;
        }
        if merged > 0 {
            tracing::debug!("{}: merged {} more changes", kind.task_name(), merged);
        }

        if let Err(e) = scheduler.run(&task).await {
            tracing::error!("Rebuild of '{}' failed: {}", kind.task_name(), e);
        }
    }
}

#[async_trait]
impl Task for WatchLoop {
    fn name(&self) -> &str {
        "watchLoop"
    }

    async fn run(&self) -> Result<(), TaskError> {
        let (_watcher, changes) = FileWatcher::new(&self.catalog.source_root())?;
        tracing::info!("Watching {} for changes", self.catalog.source_root().display());

        self.dispatch(changes).await;
        Ok(())
    }
}
