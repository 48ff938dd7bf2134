//! Images task: WebP copies of raster sources plus optimized originals.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::codecs::webp::WebPEncoder;
use image::DynamicImage;
use rayon::prelude::*;
use sitepipe_graph::{ReloadSink, Task, TaskError};

use crate::error::AssetError;
use crate::output::{blocking, notify_written, with_extension, write_file};
use crate::paths::{AssetKind, PathCatalog};
use crate::sources::{SourceFile, SourceSet};

/// Image encoding options.
#[derive(Debug, Clone)]
pub struct ImageOptions {
    /// Quality used when re-encoding JPEG sources (1-100)
    pub jpeg_quality: u8,
}

impl Default for ImageOptions {
    fn default() -> Self {
        Self { jpeg_quality: 75 }
    }
}

/// How a source image is handled by the optimization pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Jpeg,
    Png,
    /// Copied byte for byte (svg, gif, ico, webp)
    Passthrough,
}

impl Format {
    fn of(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();

        match ext.as_str() {
            "jpg" | "jpeg" => Format::Jpeg,
            "png" => Format::Png,
            _ => Format::Passthrough,
        }
    }

    fn has_webp_variant(self) -> bool {
        self != Format::Passthrough
    }
}

/// Builds `dist/img`.
pub struct ImagesTask {
    catalog: Arc<PathCatalog>,
    options: ImageOptions,
    sink: Arc<dyn ReloadSink>,
}

impl ImagesTask {
    pub fn new(catalog: Arc<PathCatalog>, options: ImageOptions, sink: Arc<dyn ReloadSink>) -> Self {
        Self {
            catalog,
            options,
            sink,
        }
    }

    /// Run both passes and return the written paths.
    pub fn build(catalog: &PathCatalog, options: &ImageOptions) -> Result<Vec<PathBuf>, AssetError> {
        let set = SourceSet::new(catalog.root(), &catalog.get(AssetKind::Img).src)?;
        let out_dir = catalog.build_dir(AssetKind::Img);
        let files = set.files()?;

        // WebP pass
        let webp: Vec<PathBuf> = files
            .par_iter()
            .filter(|f| Format::of(&f.path).has_webp_variant())
            .map(|f| write_webp(f, &out_dir))
            .collect::<Result<_, _>>()?;

        // Optimization pass over the same sources
        let optimized: Vec<PathBuf> = files
            .par_iter()
            .map(|f| write_optimized(f, &out_dir, options))
            .collect::<Result<_, _>>()?;

        let mut written = webp;
        written.extend(optimized);
        written.sort();
        Ok(written)
    }
}

#[async_trait]
impl Task for ImagesTask {
    fn name(&self) -> &str {
        AssetKind::Img.task_name()
    }

    async fn run(&self) -> Result<(), TaskError> {
        let catalog = Arc::clone(&self.catalog);
        let options = self.options.clone();
        let written = blocking(move || ImagesTask::build(&catalog, &options)).await?;

        notify_written(self.sink.as_ref(), self.name(), &self.catalog.build_root(), &written);
        Ok(())
    }
}

fn decode(path: &Path) -> Result<DynamicImage, AssetError> {
    image::open(path).map_err(|e| AssetError::transform(path, format!("image decode error: {}", e)))
}

fn write_webp(file: &SourceFile, out_dir: &Path) -> Result<PathBuf, AssetError> {
    tracing::debug!("webp: {}", file.path.display());
    let img = decode(&file.path)?;
    let img = if img.color().has_alpha() {
        DynamicImage::ImageRgba8(img.to_rgba8())
    } else {
        DynamicImage::ImageRgb8(img.to_rgb8())
    };

    let mut encoded = Vec::new();
    img.write_with_encoder(WebPEncoder::new_lossless(&mut encoded))
        .map_err(|e| AssetError::transform(&file.path, format!("WebP encode error: {}", e)))?;

    let out = with_extension(out_dir, &file.relative, "webp");
    write_file(&out, encoded)?;
    Ok(out)
}

fn write_optimized(
    file: &SourceFile,
    out_dir: &Path,
    options: &ImageOptions,
) -> Result<PathBuf, AssetError> {
    let out = out_dir.join(&file.relative);

    let bytes = match Format::of(&file.path) {
        Format::Passthrough => fs::read(&file.path).map_err(|e| AssetError::io(&file.path, e))?,
        Format::Jpeg => {
            let img = DynamicImage::ImageRgb8(decode(&file.path)?.to_rgb8());
            let mut encoded = Vec::new();
            img.write_with_encoder(JpegEncoder::new_with_quality(&mut encoded, options.jpeg_quality))
                .map_err(|e| AssetError::transform(&file.path, format!("JPEG encode error: {}", e)))?;
            encoded
        }
        Format::Png => {
            let img = decode(&file.path)?;
            let mut encoded = Vec::new();
            img.write_with_encoder(PngEncoder::new_with_quality(
                &mut encoded,
                CompressionType::Best,
                FilterType::Adaptive,
            ))
            .map_err(|e| AssetError::transform(&file.path, format!("PNG encode error: {}", e)))?;
            encoded
        }
    };

    write_file(&out, bytes)?;
    Ok(out)
}
