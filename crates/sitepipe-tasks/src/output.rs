//! Helpers shared by the asset tasks for writing output and reporting it.

use std::fs;
use std::path::{Path, PathBuf};

use sitepipe_graph::{ReloadEvent, ReloadSink};

use crate::error::AssetError;
use crate::sources::to_slash;

/// Write `contents` to `path`, creating parent directories.
pub fn write_file(path: &Path, contents: impl AsRef<[u8]>) -> Result<(), AssetError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| AssetError::io(parent, e))?;
    }
    fs::write(path, contents).map_err(|e| AssetError::io(path, e))
}

/// Read a UTF-8 source file.
pub fn read_source(path: &Path) -> Result<String, AssetError> {
    fs::read_to_string(path).map_err(|e| AssetError::io(path, e))
}

/// Run blocking transformation work off the async runtime.
pub async fn blocking<T, F>(work: F) -> Result<T, AssetError>
where
    F: FnOnce() -> Result<T, AssetError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| AssetError::Join(e.to_string()))?
}

/// Tell the reload sink that `task` wrote `files`.
pub fn notify_written(sink: &dyn ReloadSink, task: &str, build_root: &Path, files: &[PathBuf]) {
    let files = files
        .iter()
        .map(|f| to_slash(f.strip_prefix(build_root).unwrap_or(f)))
        .collect();
    sink.notify(ReloadEvent::new(task, files));
}

/// `dir/stem.ext` for a source file's relative path, keeping subdirectories.
pub fn with_extension(dir: &Path, relative: &Path, ext: &str) -> PathBuf {
    dir.join(relative).with_extension(ext)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sitepipe_graph::RecordingSink;
    use tempfile::tempdir;

    #[test]
    fn writes_into_missing_directories() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("dist/css/style.css");

        write_file(&path, "a{}").unwrap();

        assert_eq!(fs::read_to_string(path).unwrap(), "a{}");
    }

    #[test]
    fn reports_paths_relative_to_build_root() {
        let sink = RecordingSink::new();
        let root = Path::new("/p/dist");

        notify_written(
            &sink,
            "css",
            root,
            &[root.join("css/style.css"), root.join("css/style.min.css")],
        );

        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].files, vec!["css/style.css", "css/style.min.css"]);
    }

    #[test]
    fn swaps_extension_keeping_subdirs() {
        let out = with_extension(Path::new("/d/img"), Path::new("icons/logo.png"), "webp");
        assert_eq!(out, PathBuf::from("/d/img/icons/logo.webp"));
    }
}
