//! Named entry points.
//!
//! [`TaskSet`] builds every task once and exposes them, together with the
//! composed `build` graph, under the names the CLI accepts.

use std::collections::BTreeMap;
use std::sync::Arc;

use sitepipe_graph::{ReloadSink, TaskGraph};

use crate::clean::CleanTask;
use crate::css::{CssOptions, CssTask};
use crate::fonts::{FontConverter, FontsTask, Otf2TtfTask};
use crate::fonts_style::{DedupMode, FontsStyleTask};
use crate::html::HtmlTask;
use crate::images::{ImageOptions, ImagesTask};
use crate::js::{JsOptions, JsTask};
use crate::paths::{AssetKind, PathCatalog};
use crate::sprite::SpriteTask;

/// Per-task options collected from configuration.
#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    pub css: CssOptions,
    pub js: JsOptions,
    pub images: ImageOptions,
    pub fonts_dedup: DedupMode,
}

/// All runnable entry points, by name.
pub struct TaskSet {
    catalog: Arc<PathCatalog>,
    graphs: BTreeMap<String, TaskGraph>,
}

impl TaskSet {
    pub fn new(
        catalog: Arc<PathCatalog>,
        options: PipelineOptions,
        converter: Arc<dyn FontConverter>,
        sink: Arc<dyn ReloadSink>,
    ) -> Self {
        let html = TaskGraph::task(Arc::new(HtmlTask::new(
            Arc::clone(&catalog),
            Arc::clone(&sink),
        )));
        let css = TaskGraph::task(Arc::new(CssTask::new(
            Arc::clone(&catalog),
            options.css,
            Arc::clone(&sink),
        )));
        let js = TaskGraph::task(Arc::new(JsTask::new(
            Arc::clone(&catalog),
            options.js,
            Arc::clone(&sink),
        )));
        let images = TaskGraph::task(Arc::new(ImagesTask::new(
            Arc::clone(&catalog),
            options.images,
            Arc::clone(&sink),
        )));
        let fonts = TaskGraph::task(Arc::new(FontsTask::new(
            Arc::clone(&catalog),
            Arc::clone(&converter),
        )));
        let fonts_style = TaskGraph::task(Arc::new(FontsStyleTask::new(
            &catalog,
            options.fonts_dedup,
        )));
        let clean = TaskGraph::task(Arc::new(CleanTask::new(catalog.build_root())));
        let otf2ttf = TaskGraph::task(Arc::new(Otf2TtfTask::new(
            Arc::clone(&catalog),
            converter,
        )));
        let sprite = TaskGraph::task(Arc::new(SpriteTask::new(Arc::clone(&catalog))));

        let build = TaskGraph::series(
            "build",
            vec![
                clean.clone(),
                TaskGraph::parallel(
                    "assets",
                    vec![
                        html.clone(),
                        css.clone(),
                        js.clone(),
                        images.clone(),
                        fonts.clone(),
                    ],
                ),
                fonts_style.clone(),
            ],
        );

        let mut graphs = BTreeMap::new();
        for graph in [html, css, js, images, fonts, fonts_style, clean, otf2ttf, sprite] {
            graphs.insert(graph.name().to_string(), graph);
        }
        graphs.insert("build".to_string(), build);

        Self { catalog, graphs }
    }

    pub fn catalog(&self) -> &Arc<PathCatalog> {
        &self.catalog
    }

    /// Entry point by name (`build`, `css`, `spriteSVG`, ...).
    pub fn get(&self, name: &str) -> Option<&TaskGraph> {
        self.graphs.get(name)
    }

    /// All entry point names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.graphs.keys().map(String::as_str).collect()
    }

    /// `clean`, then the five asset tasks in parallel, then `fontsStyle`.
    pub fn build(&self) -> &TaskGraph {
        &self.graphs["build"]
    }

    /// Task that rebuilds one asset kind.
    pub fn asset_task(&self, kind: AssetKind) -> &TaskGraph {
        &self.graphs[kind.task_name()]
    }
}
