//! Watch loop and live-reload development server for sitepipe.
//!
//! [`WatchLoop`] rebuilds asset kinds as their sources change and
//! [`DevServer`] serves the build directory, pushing [`ReloadMessage`]s to
//! connected browsers through the [`ReloadHub`] the tasks report to.

pub mod server;
pub mod watch_loop;
pub mod watcher;
pub mod websocket;

pub use server::{DevServer, DevServerConfig, ServerError};
pub use watch_loop::{WatchLoop, WatchRouter, DEFAULT_DEBOUNCE};
pub use watcher::FileWatcher;
pub use websocket::{ReloadHub, ReloadMessage};
