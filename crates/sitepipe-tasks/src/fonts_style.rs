//! fontsStyle: fills the font manifest partial from the built fonts.
//!
//! The manifest is generated once. While it is empty, the build fonts
//! directory is scanned and one include line is appended per font family
//! (file name up to the first `.`). As soon as it has content the task does
//! nothing, so hand edits survive later builds.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sitepipe_graph::{Task, TaskError};
use tokio::io::AsyncWriteExt;

use crate::error::AssetError;
use crate::paths::{AssetKind, PathCatalog};

/// How repeated families are suppressed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DedupMode {
    /// Skip an entry only when its family equals the previous entry's family
    #[default]
    Consecutive,

    /// Emit each family once, wherever it appears
    Global,
}

/// What a manifest run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestOutcome {
    /// The manifest already had content; nothing was written
    AlreadyPopulated,

    /// The manifest was empty and `lines` include lines were appended
    Generated { lines: usize },
}

/// Family name of a fonts directory entry: everything before the first `.`.
pub fn family_name(entry: &str) -> &str {
    entry.split('.').next().unwrap_or(entry)
}

/// Include directive for one family.
pub fn manifest_line(family: &str) -> String {
    format!(
        "@include font(\"{0}\", \"{0}\", \"400\", \"normal\");\r\n",
        family
    )
}

/// Include lines for `entries`, in the order given.
pub fn manifest_lines<S: AsRef<str>>(entries: &[S], mode: DedupMode) -> Vec<String> {
    let mut lines = Vec::new();

    match mode {
        DedupMode::Consecutive => {
            let mut previous: Option<&str> = None;
            for entry in entries {
                let family = family_name(entry.as_ref());
                if previous != Some(family) {
                    lines.push(manifest_line(family));
                }
                previous = Some(family);
            }
        }
        DedupMode::Global => {
            let mut seen = HashSet::new();
            for entry in entries {
                let family = family_name(entry.as_ref());
                if seen.insert(family) {
                    lines.push(manifest_line(family));
                }
            }
        }
    }

    lines
}

/// Generate `manifest` from the entries of `fonts_dir` if it is empty.
///
/// Directory entries are processed sorted by file name. A missing fonts
/// directory yields no lines; a missing manifest is an error.
pub async fn generate_manifest(
    manifest: &Path,
    fonts_dir: &Path,
    mode: DedupMode,
) -> Result<ManifestOutcome, AssetError> {
    let content = match tokio::fs::read(manifest).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(AssetError::ManifestMissing(manifest.to_path_buf()))
        }
        Err(e) => return Err(AssetError::io(manifest, e)),
    };

    if !content.is_empty() {
        return Ok(ManifestOutcome::AlreadyPopulated);
    }

    tokio::fs::write(manifest, "")
        .await
        .map_err(|e| AssetError::io(manifest, e))?;

    let entries = list_entries(fonts_dir).await?;
    let lines = manifest_lines(&entries, mode);

    let mut file = tokio::fs::OpenOptions::new()
        .append(true)
        .open(manifest)
        .await
        .map_err(|e| AssetError::io(manifest, e))?;

    for line in &lines {
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| AssetError::io(manifest, e))?;
    }
    file.flush().await.map_err(|e| AssetError::io(manifest, e))?;

    Ok(ManifestOutcome::Generated { lines: lines.len() })
}

async fn list_entries(dir: &Path) -> Result<Vec<String>, AssetError> {
    let mut read_dir = match tokio::fs::read_dir(dir).await {
        Ok(read_dir) => read_dir,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(AssetError::io(dir, e)),
    };

    let mut entries = Vec::new();
    while let Some(entry) = read_dir
        .next_entry()
        .await
        .map_err(|e| AssetError::io(dir, e))?
    {
        entries.push(entry.file_name().to_string_lossy().into_owned());
    }

    entries.sort();
    Ok(entries)
}

/// Task wrapper around [`generate_manifest`].
pub struct FontsStyleTask {
    manifest: PathBuf,
    fonts_dir: PathBuf,
    mode: DedupMode,
}

impl FontsStyleTask {
    pub fn new(catalog: &PathCatalog, mode: DedupMode) -> Self {
        Self {
            manifest: catalog.font_manifest(),
            fonts_dir: catalog.build_dir(AssetKind::Fonts),
            mode,
        }
    }
}

#[async_trait]
impl Task for FontsStyleTask {
    fn name(&self) -> &str {
        "fontsStyle"
    }

    async fn run(&self) -> Result<(), TaskError> {
        match generate_manifest(&self.manifest, &self.fonts_dir, self.mode).await? {
            ManifestOutcome::AlreadyPopulated => {
                tracing::debug!("{} already populated", self.manifest.display());
            }
            ManifestOutcome::Generated { lines } => {
                tracing::info!("Wrote {} font includes to {}", lines, self.manifest.display());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::tempdir;

    const UNSORTED: [&str; 3] = ["Roboto-400.woff", "Roboto-400.woff2", "OpenSans-400.woff"];

    #[test]
    fn takes_family_before_first_dot() {
        assert_eq!(family_name("Roboto-400.woff2"), "Roboto-400");
        assert_eq!(family_name("font.min.woff"), "font");
        assert_eq!(family_name("noext"), "noext");
    }

    #[test]
    fn suppresses_consecutive_duplicates() {
        let lines = manifest_lines(&UNSORTED, DedupMode::Consecutive);

        assert_eq!(
            lines,
            vec![
                "@include font(\"Roboto-400\", \"Roboto-400\", \"400\", \"normal\");\r\n",
                "@include font(\"OpenSans-400\", \"OpenSans-400\", \"400\", \"normal\");\r\n",
            ]
        );
    }

    #[test]
    fn consecutive_mode_repeats_interleaved_families() {
        let entries = ["A.woff", "B.woff", "A.woff2"];

        assert_eq!(manifest_lines(&entries, DedupMode::Consecutive).len(), 3);
        assert_eq!(manifest_lines(&entries, DedupMode::Global).len(), 2);
    }

    #[tokio::test]
    async fn populates_empty_manifest() {
        let temp = tempdir().unwrap();
        let manifest = temp.path().join("fonts.scss");
        let fonts = temp.path().join("fonts");
        fs::write(&manifest, "").unwrap();
        fs::create_dir_all(&fonts).unwrap();
        for name in UNSORTED {
            fs::write(fonts.join(name), b"").unwrap();
        }

        let outcome = generate_manifest(&manifest, &fonts, DedupMode::Consecutive)
            .await
            .unwrap();

        assert_eq!(outcome, ManifestOutcome::Generated { lines: 2 });
        assert_eq!(
            fs::read_to_string(&manifest).unwrap(),
            concat!(
                "@include font(\"OpenSans-400\", \"OpenSans-400\", \"400\", \"normal\");\r\n",
                "@include font(\"Roboto-400\", \"Roboto-400\", \"400\", \"normal\");\r\n",
            )
        );
    }

    #[tokio::test]
    async fn populated_manifest_is_left_alone() {
        let temp = tempdir().unwrap();
        let manifest = temp.path().join("fonts.scss");
        let fonts = temp.path().join("fonts");
        fs::create_dir_all(&fonts).unwrap();
        fs::write(fonts.join("Lato.woff"), b"").unwrap();
        fs::write(&manifest, "@include font(...);\r\n").unwrap();

        let outcome = generate_manifest(&manifest, &fonts, DedupMode::Consecutive)
            .await
            .unwrap();

        assert_eq!(outcome, ManifestOutcome::AlreadyPopulated);
        assert_eq!(fs::read_to_string(&manifest).unwrap(), "@include font(...);\r\n");
    }

    #[tokio::test]
    async fn second_run_is_a_no_op() {
        let temp = tempdir().unwrap();
        let manifest = temp.path().join("fonts.scss");
        let fonts = temp.path().join("fonts");
        fs::create_dir_all(&fonts).unwrap();
        fs::write(fonts.join("Lato.woff"), b"").unwrap();
        fs::write(&manifest, "").unwrap();

        generate_manifest(&manifest, &fonts, DedupMode::Consecutive).await.unwrap();
        let first = fs::read_to_string(&manifest).unwrap();
        let outcome = generate_manifest(&manifest, &fonts, DedupMode::Consecutive)
            .await
            .unwrap();

        assert_eq!(outcome, ManifestOutcome::AlreadyPopulated);
        assert_eq!(fs::read_to_string(&manifest).unwrap(), first);
    }

    #[tokio::test]
    async fn missing_fonts_dir_leaves_manifest_empty() {
        let temp = tempdir().unwrap();
        let manifest = temp.path().join("fonts.scss");
        fs::write(&manifest, "").unwrap();

        let outcome = generate_manifest(&manifest, &temp.path().join("nope"), DedupMode::Global)
            .await
            .unwrap();

        assert_eq!(outcome, ManifestOutcome::Generated { lines: 0 });
        assert_eq!(fs::read_to_string(&manifest).unwrap(), "");
    }

    #[tokio::test]
    async fn missing_manifest_is_an_error() {
        let temp = tempdir().unwrap();
        let err = generate_manifest(
            &temp.path().join("fonts.scss"),
            temp.path(),
            DedupMode::Consecutive,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, AssetError::ManifestMissing(_)));
    }
}
