//! JS task: resolve includes, transpile with oxc, emit a minified copy.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use oxc_allocator::Allocator;
use oxc_codegen::{Codegen, CodegenOptions};
use oxc_minifier::{Minifier, MinifierOptions};
use oxc_parser::Parser;
use oxc_semantic::SemanticBuilder;
use oxc_span::SourceType;
use oxc_transformer::{TransformOptions, Transformer};
use sitepipe_graph::{ReloadSink, Task, TaskError};

use crate::error::AssetError;
use crate::include::resolve_includes;
use crate::output::{blocking, notify_written, read_source, with_extension, write_file};
use crate::paths::{AssetKind, PathCatalog};
use crate::sources::SourceSet;

/// Script options.
#[derive(Debug, Clone)]
pub struct JsOptions {
    /// ECMAScript version the output must run on (e.g. `es2015`)
    pub target: String,
}

impl Default for JsOptions {
    fn default() -> Self {
        Self {
            target: "es2015".to_string(),
        }
    }
}

/// Transpiled script in both output flavours.
#[derive(Debug, Clone)]
pub struct JsOutput {
    pub code: String,
    pub minified: String,
}

/// Builds the script entry points.
pub struct JsTask {
    catalog: Arc<PathCatalog>,
    options: JsOptions,
    sink: Arc<dyn ReloadSink>,
}

impl JsTask {
    pub fn new(catalog: Arc<PathCatalog>, options: JsOptions, sink: Arc<dyn ReloadSink>) -> Self {
        Self {
            catalog,
            options,
            sink,
        }
    }

    /// Build every entry point and return the written paths.
    pub fn build(catalog: &PathCatalog, options: &JsOptions) -> Result<Vec<PathBuf>, AssetError> {
        let set = SourceSet::new(catalog.root(), &catalog.get(AssetKind::Js).src)?;
        let out_dir = catalog.build_dir(AssetKind::Js);
        let mut written = Vec::new();

        for file in set.files()? {
            tracing::debug!("js: {}", file.path.display());
            let source = resolve_includes(&read_source(&file.path)?, &file.path)?;
            let output = transpile(&source, &file.path, &options.target)?;

            let plain = with_extension(&out_dir, &file.relative, "js");
            let min = with_extension(&out_dir, &file.relative, "min.js");
            write_file(&plain, output.code)?;
            write_file(&min, output.minified)?;
            written.push(plain);
            written.push(min);
        }

        Ok(written)
    }
}

#[async_trait]
impl Task for JsTask {
    fn name(&self) -> &str {
        AssetKind::Js.task_name()
    }

    async fn run(&self) -> Result<(), TaskError> {
        let catalog = Arc::clone(&self.catalog);
        let options = self.options.clone();
        let written = blocking(move || JsTask::build(&catalog, &options)).await?;

        notify_written(self.sink.as_ref(), self.name(), &self.catalog.build_root(), &written);
        Ok(())
    }
}

/// Parse `source`, lower it to `target` and print plain and minified code.
pub fn transpile(source: &str, path: &Path, target: &str) -> Result<JsOutput, AssetError> {
    let allocator = Allocator::default();
    let source_type = SourceType::from_path(path).unwrap_or_default();

    let parsed = Parser::new(&allocator, source, source_type).parse();
    if let Some(err) = parsed.errors.first() {
        return Err(AssetError::transform(path, format!("JS parse error: {}", err)));
    }
    if parsed.panicked {
        return Err(AssetError::transform(path, "JS parser gave up"));
    }
    let mut program = parsed.program;

    let options = TransformOptions::from_target(target)
        .map_err(|e| AssetError::transform(path, format!("invalid JS target '{}': {}", target, e)))?;
    let scoping = SemanticBuilder::new().build(&program).semantic.into_scoping();
    let transformed =
        Transformer::new(&allocator, path, &options).build_with_scoping(scoping, &mut program);
    if let Some(err) = transformed.errors.first() {
        return Err(AssetError::transform(path, format!("JS transform error: {}", err)));
    }

    let code = Codegen::new().build(&program).code;

    let minified = Minifier::new(MinifierOptions::default()).build(&allocator, &mut program);
    let minified = Codegen::new()
        .with_options(CodegenOptions::minify())
        .with_scoping(minified.scoping)
        .build(&program)
        .code;

    Ok(JsOutput { code, minified })
}
