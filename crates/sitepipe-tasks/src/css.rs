//! CSS task: SCSS → grouped, prefixed CSS plus a minified copy.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use lightningcss::rules::CssRule;
use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};
use lightningcss::traits::ToCss;
use sitepipe_graph::{ReloadSink, Task, TaskError};

use crate::error::AssetError;
use crate::output::{blocking, notify_written, with_extension, write_file};
use crate::paths::{AssetKind, PathCatalog};
use crate::sources::SourceSet;

/// Stylesheet options.
#[derive(Debug, Clone)]
pub struct CssOptions {
    /// Browserslist queries used for vendor prefixing
    pub browsers: Vec<String>,
}

impl Default for CssOptions {
    fn default() -> Self {
        Self {
            browsers: vec!["last 5 versions".to_string()],
        }
    }
}

/// Compiled stylesheet in both output flavours.
#[derive(Debug, Clone)]
pub struct CssOutput {
    pub expanded: String,
    pub minified: String,
}

/// Compiles the SCSS entry points.
pub struct CssTask {
    catalog: Arc<PathCatalog>,
    options: CssOptions,
    sink: Arc<dyn ReloadSink>,
}

impl CssTask {
    pub fn new(catalog: Arc<PathCatalog>, options: CssOptions, sink: Arc<dyn ReloadSink>) -> Self {
        Self {
            catalog,
            options,
            sink,
        }
    }

    /// Compile every entry point and return the written paths.
    pub fn build(catalog: &PathCatalog, options: &CssOptions) -> Result<Vec<PathBuf>, AssetError> {
        let set = SourceSet::new(catalog.root(), &catalog.get(AssetKind::Css).src)?;
        let out_dir = catalog.build_dir(AssetKind::Css);
        let mut written = Vec::new();

        for file in set.files()? {
            tracing::debug!("css: {}", file.path.display());
            let css = compile_scss(&file.path)?;
            let output = process_css(&css, &file.path, &options.browsers)?;

            let plain = with_extension(&out_dir, &file.relative, "css");
            let min = with_extension(&out_dir, &file.relative, "min.css");
            write_file(&plain, output.expanded)?;
            write_file(&min, output.minified)?;
            written.push(plain);
            written.push(min);
        }

        Ok(written)
    }
}

#[async_trait]
impl Task for CssTask {
    fn name(&self) -> &str {
        AssetKind::Css.task_name()
    }

    async fn run(&self) -> Result<(), TaskError> {
        let catalog = Arc::clone(&self.catalog);
        let options = self.options.clone();
        let written = blocking(move || CssTask::build(&catalog, &options)).await?;

        notify_written(self.sink.as_ref(), self.name(), &self.catalog.build_root(), &written);
        Ok(())
    }
}

/// Compile an SCSS entry point in expanded style.
pub fn compile_scss(path: &Path) -> Result<String, AssetError> {
    let mut options = grass::Options::default().style(grass::OutputStyle::Expanded);
    if let Some(dir) = path.parent() {
        options = options.load_path(dir);
    }

    grass::from_path(path, &options).map_err(|e| AssetError::transform(path, e))
}

/// Group media queries, add vendor prefixes and print both flavours.
pub fn process_css(css: &str, path: &Path, browsers: &[String]) -> Result<CssOutput, AssetError> {
    let mut stylesheet = StyleSheet::parse(
        css,
        ParserOptions {
            filename: path.display().to_string(),
            ..ParserOptions::default()
        },
    )
    .map_err(|e| AssetError::transform(path, format!("CSS parse error: {}", e)))?;

    group_media_queries(&mut stylesheet.rules.0, path)?;

    let targets = Targets {
        browsers: resolve_browsers(browsers, path)?,
        ..Targets::default()
    };

    stylesheet
        .minify(MinifyOptions {
            targets: targets.clone(),
            ..MinifyOptions::default()
        })
        .map_err(|e| AssetError::transform(path, format!("CSS transform error: {}", e)))?;

    let expanded = stylesheet
        .to_css(PrinterOptions {
            targets: targets.clone(),
            ..PrinterOptions::default()
        })
        .map_err(|e| AssetError::transform(path, format!("CSS print error: {}", e)))?;

    let minified = stylesheet
        .to_css(PrinterOptions {
            minify: true,
            targets,
            ..PrinterOptions::default()
        })
        .map_err(|e| AssetError::transform(path, format!("CSS minify error: {}", e)))?;

    Ok(CssOutput {
        expanded: expanded.code,
        minified: minified.code,
    })
}

fn resolve_browsers(queries: &[String], path: &Path) -> Result<Option<Browsers>, AssetError> {
    if queries.is_empty() {
        return Ok(None);
    }
    Browsers::from_browserslist(queries.iter().map(String::as_str))
        .map_err(|e| AssetError::transform(path, format!("browserslist error: {}", e)))
}

/// Merge `@media` blocks with identical queries and move them after all
/// other rules, in order of first appearance.
fn group_media_queries(rules: &mut Vec<CssRule<'_>>, path: &Path) -> Result<(), AssetError> {
    let mut plain = Vec::with_capacity(rules.len());
    let mut groups: Vec<(String, CssRule<'_>)> = Vec::new();

    for rule in rules.drain(..) {
        match rule {
            CssRule::Media(media) => {
                let key = media
                    .query
                    .to_css_string(PrinterOptions::default())
                    .map_err(|e| AssetError::transform(path, format!("CSS media error: {}", e)))?;

                match groups.iter_mut().find(|(k, _)| *k == key) {
                    Some((_, CssRule::Media(existing))) => existing.rules.0.extend(media.rules.0),
                    _ => groups.push((key, CssRule::Media(media))),
                }
            }
            other => plain.push(other),
        }
    }

    rules.extend(plain);
    rules.extend(groups.into_iter().map(|(_, rule)| rule));
    Ok(())
}
