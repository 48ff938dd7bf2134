//! Font tasks: TTF → WOFF/WOFF2 and OTF → TTF, through a font converter.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use sitepipe_graph::{Task, TaskError};
use tokio::process::Command;

use crate::error::AssetError;
use crate::paths::{AssetKind, PathCatalog};
use crate::sources::SourceSet;

/// Converts a font file to the format implied by the output extension.
#[async_trait]
pub trait FontConverter: Send + Sync {
    async fn convert(&self, input: &Path, output: &Path) -> Result<(), AssetError>;
}

/// Runs an external program for every conversion.
///
/// The command template is an argv list in which `{input}` and `{output}`
/// are replaced with the file paths.
#[derive(Debug, Clone)]
pub struct ExternalConverter {
    command: Vec<String>,
}

impl ExternalConverter {
    pub fn new(command: Vec<String>) -> Self {
        Self { command }
    }

    /// FontForge script mode; picks the format from the output extension.
    pub fn fontforge() -> Self {
        Self::new(default_command())
    }

    fn argv(&self, input: &Path, output: &Path) -> Vec<String> {
        let input = input.display().to_string();
        let output = output.display().to_string();
        self.command
            .iter()
            .map(|arg| arg.replace("{input}", &input).replace("{output}", &output))
            .collect()
    }
}

/// Default converter command line.
pub fn default_command() -> Vec<String> {
    ["fontforge", "-lang=ff", "-c", "Open($1); Generate($2)", "{input}", "{output}"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for ExternalConverter {
    fn default() -> Self {
        Self::fontforge()
    }
}

#[async_trait]
impl FontConverter for ExternalConverter {
    async fn convert(&self, input: &Path, output: &Path) -> Result<(), AssetError> {
        let argv = self.argv(input, output);
        let (program, args) = argv.split_first().ok_or_else(|| AssetError::Tool {
            program: String::new(),
            message: "empty font converter command".to_string(),
        })?;

        let result = Command::new(program)
            .args(args)
            .output()
            .await
            .map_err(|e| AssetError::Tool {
                program: program.clone(),
                message: if e.kind() == std::io::ErrorKind::NotFound {
                    "not found on PATH".to_string()
                } else {
                    e.to_string()
                },
            })?;

        if !result.status.success() {
            return Err(AssetError::Tool {
                program: program.clone(),
                message: format!(
                    "{} ({})",
                    String::from_utf8_lossy(&result.stderr).trim(),
                    result.status
                ),
            });
        }

        Ok(())
    }
}

/// Convert every source matched by `patterns` into each of `exts` inside
/// `out_dir`, returning the written paths.
async fn convert_all(
    root: &Path,
    patterns: &[String],
    out_dir: &Path,
    exts: &[&str],
    converter: &dyn FontConverter,
) -> Result<Vec<PathBuf>, AssetError> {
    let set = SourceSet::new(root, patterns)?;

    let mut written = Vec::new();
    for file in set.files()? {
        for ext in exts {
            let out = out_dir.join(&file.relative).with_extension(ext);
            if let Some(parent) = out.parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| AssetError::io(parent, e))?;
            }
            tracing::debug!("font: {} -> {}", file.path.display(), out.display());
            converter.convert(&file.path, &out).await?;
            written.push(out);
        }
    }

    Ok(written)
}

/// Builds `dist/fonts` from the TTF sources.
pub struct FontsTask {
    catalog: Arc<PathCatalog>,
    converter: Arc<dyn FontConverter>,
}

impl FontsTask {
    pub fn new(catalog: Arc<PathCatalog>, converter: Arc<dyn FontConverter>) -> Self {
        Self { catalog, converter }
    }
}

#[async_trait]
impl Task for FontsTask {
    fn name(&self) -> &str {
        AssetKind::Fonts.task_name()
    }

    async fn run(&self) -> Result<(), TaskError> {
        let written = convert_all(
            self.catalog.root(),
            &self.catalog.get(AssetKind::Fonts).src,
            &self.catalog.build_dir(AssetKind::Fonts),
            &["woff", "woff2"],
            self.converter.as_ref(),
        )
        .await?;

        tracing::debug!("fonts: wrote {} files", written.len());
        Ok(())
    }
}

/// Converts OpenType sources to TTF next to them.
pub struct Otf2TtfTask {
    catalog: Arc<PathCatalog>,
    converter: Arc<dyn FontConverter>,
}

impl Otf2TtfTask {
    pub fn new(catalog: Arc<PathCatalog>, converter: Arc<dyn FontConverter>) -> Self {
        Self { catalog, converter }
    }
}

#[async_trait]
impl Task for Otf2TtfTask {
    fn name(&self) -> &str {
        "otf2ttf"
    }

    async fn run(&self) -> Result<(), TaskError> {
        let written = convert_all(
            self.catalog.root(),
            &self.catalog.otf_src(),
            &self.catalog.otf_dest(),
            &["ttf"],
            self.converter.as_ref(),
        )
        .await?;

        tracing::debug!("otf2ttf: wrote {} files", written.len());
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    /// Copies the input and tags it with the output extension.
    pub(crate) struct CopyConverter;

    #[async_trait]
    impl FontConverter for CopyConverter {
        async fn convert(&self, input: &Path, output: &Path) -> Result<(), AssetError> {
            let mut bytes = tokio::fs::read(input)
                .await
                .map_err(|e| AssetError::io(input, e))?;
            bytes.extend_from_slice(output.extension().unwrap().as_encoded_bytes());
            tokio::fs::write(output, bytes)
                .await
                .map_err(|e| AssetError::io(output, e))
        }
    }

    #[test]
    fn substitutes_paths_into_template() {
        let converter = ExternalConverter::new(vec![
            "conv".into(),
            "--in={input}".into(),
            "{output}".into(),
        ]);

        assert_eq!(
            converter.argv(Path::new("a.ttf"), Path::new("out/a.woff")),
            vec!["conv", "--in=a.ttf", "out/a.woff"]
        );
    }

    #[tokio::test]
    async fn converts_ttf_to_both_web_formats() {
        let temp = tempdir().unwrap();
        let fonts = temp.path().join("src/fonts");
        fs::create_dir_all(&fonts).unwrap();
        fs::write(fonts.join("Roboto-400.ttf"), b"ttf").unwrap();
        fs::write(fonts.join("Ignored.otf"), b"otf").unwrap();

        let catalog = Arc::new(PathCatalog::new(temp.path()));
        FontsTask::new(catalog, Arc::new(CopyConverter)).run().await.unwrap();

        let dist = temp.path().join("dist/fonts");
        assert_eq!(fs::read(dist.join("Roboto-400.woff")).unwrap(), b"ttfwoff");
        assert_eq!(fs::read(dist.join("Roboto-400.woff2")).unwrap(), b"ttfwoff2");
        assert!(!dist.join("Ignored.woff").exists());
    }

    #[tokio::test]
    async fn otf2ttf_writes_next_to_sources() {
        let temp = tempdir().unwrap();
        let fonts = temp.path().join("src/fonts");
        fs::create_dir_all(&fonts).unwrap();
        fs::write(fonts.join("Lato.otf"), b"otf").unwrap();

        let catalog = Arc::new(PathCatalog::new(temp.path()));
        Otf2TtfTask::new(catalog, Arc::new(CopyConverter)).run().await.unwrap();

        assert_eq!(fs::read(fonts.join("Lato.ttf")).unwrap(), b"otfttf");
    }

    #[tokio::test]
    async fn no_sources_creates_no_directories() {
        let temp = tempdir().unwrap();
        let catalog = Arc::new(PathCatalog::new(temp.path()));

        FontsTask::new(Arc::clone(&catalog), Arc::new(CopyConverter))
            .run()
            .await
            .unwrap();
        Otf2TtfTask::new(catalog, Arc::new(CopyConverter)).run().await.unwrap();

        assert!(!temp.path().join("dist/fonts").exists());
        assert!(!temp.path().join("src/fonts").exists());
    }

    #[tokio::test]
    async fn rebuild_is_byte_identical() {
        let temp = tempdir().unwrap();
        let fonts = temp.path().join("src/fonts");
        fs::create_dir_all(&fonts).unwrap();
        fs::write(fonts.join("Roboto-400.ttf"), b"ttf").unwrap();

        let catalog = Arc::new(PathCatalog::new(temp.path()));
        let task = FontsTask::new(catalog, Arc::new(CopyConverter));
        let dist = temp.path().join("dist/fonts");

        task.run().await.unwrap();
        let first = (
            fs::read(dist.join("Roboto-400.woff")).unwrap(),
            fs::read(dist.join("Roboto-400.woff2")).unwrap(),
        );
        task.run().await.unwrap();

        assert_eq!(fs::read(dist.join("Roboto-400.woff")).unwrap(), first.0);
        assert_eq!(fs::read(dist.join("Roboto-400.woff2")).unwrap(), first.1);
    }

    #[tokio::test]
    async fn missing_converter_is_reported() {
        let temp = tempdir().unwrap();
        let input = temp.path().join("a.ttf");
        fs::write(&input, b"ttf").unwrap();

        let converter = ExternalConverter::new(vec![
            "sitepipe-no-such-font-tool".into(),
            "{input}".into(),
        ]);
        let err = converter
            .convert(&input, &temp.path().join("a.woff"))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("not found on PATH"));
    }
}
