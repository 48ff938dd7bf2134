//! HTML task: resolve includes, add WebP `<picture>` sources, write pages.

use std::path::PathBuf;
use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::{Captures, Regex};
use sitepipe_graph::{ReloadSink, Task, TaskError};

use crate::error::AssetError;
use crate::include::resolve_includes;
use crate::output::{blocking, notify_written, read_source, write_file};
use crate::paths::{AssetKind, PathCatalog};
use crate::sources::SourceSet;

static PICTURE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<picture\b.*?</picture>").expect("Invalid picture regex"));

static IMG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<img\b[^>]*?\bsrc\s*=\s*["']([^"']+)["'][^>]*>"#).expect("Invalid img regex")
});

/// Builds top-level pages from `src/*.html`.
pub struct HtmlTask {
    catalog: Arc<PathCatalog>,
    sink: Arc<dyn ReloadSink>,
}

impl HtmlTask {
    pub fn new(catalog: Arc<PathCatalog>, sink: Arc<dyn ReloadSink>) -> Self {
        Self { catalog, sink }
    }

    /// Build every page and return the written paths.
    pub fn build(catalog: &PathCatalog) -> Result<Vec<PathBuf>, AssetError> {
        let set = SourceSet::new(catalog.root(), &catalog.get(AssetKind::Html).src)?;
        let out_dir = catalog.build_dir(AssetKind::Html);
        let mut written = Vec::new();

        for file in set.files()? {
            tracing::debug!("html: {}", file.path.display());
            let source = read_source(&file.path)?;
            let html = webp_html(&resolve_includes(&source, &file.path)?);

            let out = out_dir.join(&file.relative);
            write_file(&out, html)?;
            written.push(out);
        }

        Ok(written)
    }
}

#[async_trait]
impl Task for HtmlTask {
    fn name(&self) -> &str {
        AssetKind::Html.task_name()
    }

    async fn run(&self) -> Result<(), TaskError> {
        let catalog = Arc::clone(&self.catalog);
        let written = blocking(move || HtmlTask::build(&catalog)).await?;

        notify_written(self.sink.as_ref(), self.name(), &self.catalog.build_root(), &written);
        Ok(())
    }
}

/// Wrap raster `<img>` tags in a `<picture>` offering the WebP variant.
///
/// Images already inside a `<picture>` and non-raster sources are left as-is.
pub fn webp_html(html: &str) -> String {
    let mut output = String::with_capacity(html.len());
    let mut last = 0;

    for picture in PICTURE_RE.find_iter(html) {
        output.push_str(&wrap_images(&html[last..picture.start()]));
        output.push_str(picture.as_str());
        last = picture.end();
    }
    output.push_str(&wrap_images(&html[last..]));

    output
}

fn wrap_images(fragment: &str) -> String {
    IMG_RE
        .replace_all(fragment, |caps: &Captures| {
            let img = &caps[0];
            match webp_source(&caps[1]) {
                Some(webp) => format!(
                    r#"<picture><source srcset="{}" type="image/webp">{}</picture>"#,
                    webp, img
                ),
                None => img.to_string(),
            }
        })
        .into_owned()
}

/// `photo.jpg` → `photo.webp` for jpg/jpeg/png sources.
fn webp_source(src: &str) -> Option<String> {
    let (path, query) = match src.find(['?', '#']) {
        Some(idx) => src.split_at(idx),
        None => (src, ""),
    };
    let (stem, ext) = path.rsplit_once('.')?;

    match ext.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" | "png" => Some(format!("{stem}.webp{query}")),
        _ => None,
    }
}
