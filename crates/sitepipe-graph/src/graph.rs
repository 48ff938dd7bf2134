//! Series/parallel composition of tasks.

use std::fmt;
use std::sync::Arc;

use crate::task::Task;

/// A tree of tasks composed in series and in parallel.
///
/// Cloning is cheap: leaves are reference counted, so the same task value can
/// appear under several entry points (e.g. `css` on its own and inside
/// `build`).
#[derive(Clone)]
pub enum TaskGraph {
    /// A single task
    Task(Arc<dyn Task>),

    /// Steps run one after another; the first failure stops the group
    Series { name: String, steps: Vec<TaskGraph> },

    /// Branches run concurrently; every branch runs to completion
    Parallel {
        name: String,
        branches: Vec<TaskGraph>,
    },
}

impl TaskGraph {
    /// Leaf node for a task.
    pub fn task(task: Arc<dyn Task>) -> Self {
        Self::Task(task)
    }

    /// Run `steps` in order.
    pub fn series(name: impl Into<String>, steps: Vec<TaskGraph>) -> Self {
        Self::Series {
            name: name.into(),
            steps,
        }
    }

    /// Run `branches` concurrently.
    pub fn parallel(name: impl Into<String>, branches: Vec<TaskGraph>) -> Self {
        Self::Parallel {
            name: name.into(),
            branches,
        }
    }

    /// Name of this node.
    pub fn name(&self) -> &str {
        match self {
            Self::Task(task) => task.name(),
            Self::Series { name, .. } | Self::Parallel { name, .. } => name,
        }
    }

    /// Names of all leaf tasks, depth-first in declaration order.
    pub fn names(&self) -> Vec<String> {
        let mut names = Vec::new();
        self.collect_names(&mut names);
        names
    }

    fn collect_names(&self, out: &mut Vec<String>) {
        match self {
            Self::Task(task) => out.push(task.name().to_string()),
            Self::Series { steps: children, .. } | Self::Parallel { branches: children, .. } => {
                for child in children {
                    child.collect_names(out);
                }
            }
        }
    }
}

impl fmt::Debug for TaskGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Task(task) => write!(f, "Task({})", task.name()),
            Self::Series { name, steps } => f
                .debug_struct("Series")
                .field("name", name)
                .field("steps", steps)
                .finish(),
            Self::Parallel { name, branches } => f
                .debug_struct("Parallel")
                .field("name", name)
                .field("branches", branches)
                .finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::FnTask;

    fn leaf(name: &'static str) -> TaskGraph {
        TaskGraph::task(Arc::new(FnTask::new(name, || async { Ok(()) })))
    }

    #[test]
    fn lists_leaf_names_in_declaration_order() {
        let graph = TaskGraph::series(
            "build",
            vec![
                leaf("clean"),
                TaskGraph::parallel("assets", vec![leaf("html"), leaf("css")]),
                leaf("fontsStyle"),
            ],
        );

        assert_eq!(graph.name(), "build");
        assert_eq!(graph.names(), vec!["clean", "html", "css", "fontsStyle"]);
    }

    #[test]
    fn debug_shows_structure() {
        let graph = TaskGraph::parallel("p", vec![leaf("a")]);
        let debug = format!("{:?}", graph);

        assert!(debug.contains("Parallel"));
        assert!(debug.contains("Task(a)"));
    }
}
