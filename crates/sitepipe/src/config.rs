//! `sitepipe.toml` loading.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use sitepipe_tasks::{
    fonts::default_command, AssetKind, CssOptions, DedupMode, ExternalConverter, ImageOptions,
    JsOptions, PathCatalog, PipelineOptions,
};

/// Configuration file structure (sitepipe.toml).
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub project: ProjectConfig,
    #[serde(default)]
    pub paths: BTreeMap<AssetKind, PathOverride>,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub watch: WatchConfig,
    #[serde(default)]
    pub css: CssConfig,
    #[serde(default)]
    pub js: JsConfig,
    #[serde(default)]
    pub images: ImagesConfig,
    #[serde(default)]
    pub fonts: FontsConfig,
}

#[derive(Debug, Deserialize)]
pub struct ProjectConfig {
    #[serde(default = "default_source")]
    pub source: String,
    #[serde(default = "default_output")]
    pub output: String,
}

/// Replacement globs for one asset kind.
#[derive(Debug, Default, Deserialize)]
pub struct PathOverride {
    pub src: Option<Vec<String>>,
    pub watch: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_open")]
    pub open: bool,
}

#[derive(Debug, Deserialize)]
pub struct WatchConfig {
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

#[derive(Debug, Deserialize)]
pub struct CssConfig {
    #[serde(default = "default_browsers")]
    pub browsers: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct JsConfig {
    #[serde(default = "default_js_target")]
    pub target: String,
}

#[derive(Debug, Deserialize)]
pub struct ImagesConfig {
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
}

#[derive(Debug, Deserialize)]
pub struct FontsConfig {
    #[serde(default)]
    pub dedup: DedupMode,
    /// Converter argv; `{input}` and `{output}` are substituted
    #[serde(default = "default_command")]
    pub converter: Vec<String>,
}

fn default_source() -> String {
    "src".to_string()
}
fn default_output() -> String {
    "dist".to_string()
}
fn default_port() -> u16 {
    3000
}
fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_open() -> bool {
    true
}
fn default_debounce_ms() -> u64 {
    100
}
fn default_browsers() -> Vec<String> {
    CssOptions::default().browsers
}
fn default_js_target() -> String {
    JsOptions::default().target
}
fn default_jpeg_quality() -> u8 {
    ImageOptions::default().jpeg_quality
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            source: default_source(),
            output: default_output(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            open: default_open(),
        }
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
        }
    }
}

impl Default for CssConfig {
    fn default() -> Self {
        Self {
            browsers: default_browsers(),
        }
    }
}

impl Default for JsConfig {
    fn default() -> Self {
        Self {
            target: default_js_target(),
        }
    }
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            jpeg_quality: default_jpeg_quality(),
        }
    }
}

impl Default for FontsConfig {
    fn default() -> Self {
        Self {
            dedup: DedupMode::default(),
            converter: default_command(),
        }
    }
}

impl Config {
    /// Load configuration from `path` if it exists.
    /// Returns an error if the file exists but is malformed.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("{} not found, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        tracing::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Path catalog rooted at `root` with the overrides applied.
    pub fn catalog(&self, root: impl Into<PathBuf>) -> PathCatalog {
        let mut catalog =
            PathCatalog::with_dirs(root, &self.project.source, &self.project.output);

        for (kind, paths) in &self.paths {
            if let Some(src) = &paths.src {
                catalog.set_src(*kind, src.clone());
            }
            if let Some(watch) = &paths.watch {
                catalog.set_watch(*kind, watch.clone());
            }
        }

        catalog
    }

    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            css: CssOptions {
                browsers: self.css.browsers.clone(),
            },
            js: JsOptions {
                target: self.js.target.clone(),
            },
            images: ImageOptions {
                jpeg_quality: self.images.jpeg_quality,
            },
            fonts_dedup: self.fonts.dedup,
        }
    }

    pub fn converter(&self) -> ExternalConverter {
        ExternalConverter::new(self.fonts.converter.clone())
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.watch.debounce_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_uses_defaults() {
        let temp = tempdir().unwrap();
        let config = Config::load(&temp.path().join("sitepipe.toml")).unwrap();

        assert_eq!(config.project.source, "src");
        assert_eq!(config.project.output, "dist");
        assert_eq!(config.server.port, 3000);
        assert!(config.server.open);
        assert_eq!(config.debounce(), Duration::from_millis(100));
        assert_eq!(config.css.browsers, vec!["last 5 versions"]);
        assert_eq!(config.fonts.dedup, DedupMode::Consecutive);
        assert_eq!(config.fonts.converter[0], "fontforge");
    }

    #[test]
    fn parses_sections_and_overrides() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("sitepipe.toml");
        fs::write(
            &path,
            r#"
[project]
output = "public"

[paths.css]
src = ["src/scss/main.scss"]

[paths.img]
watch = []

[server]
port = 8080
open = false

[fonts]
dedup = "global"
"#,
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        let catalog = config.catalog("/site");

        assert_eq!(config.server.port, 8080);
        assert!(!config.server.open);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.fonts.dedup, DedupMode::Global);
        assert_eq!(catalog.build_root(), PathBuf::from("/site/public"));
        assert_eq!(catalog.get(AssetKind::Css).src, vec!["src/scss/main.scss"]);
        assert!(catalog.get(AssetKind::Img).watch.is_empty());
        assert_eq!(catalog.get(AssetKind::Js).src, vec!["src/js/script.js"]);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("sitepipe.toml");
        fs::write(&path, "[server]\nport = \"not a number\"").unwrap();

        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn rejects_unknown_kind() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("sitepipe.toml");
        fs::write(&path, "[paths.video]\nsrc = []").unwrap();

        assert!(Config::load(&path).is_err());
    }
}
