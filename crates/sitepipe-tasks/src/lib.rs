//! Asset tasks for sitepipe.
//!
//! Each asset kind (html, css, js, images, fonts) has a task that reads the
//! sources matched by its [`PathSet`], hands them to the transformation
//! library for that kind and writes the results under the build root.
//! [`TaskSet`] wires the tasks into the named entry points the CLI exposes.

pub mod clean;
pub mod css;
pub mod error;
pub mod fonts;
pub mod fonts_style;
pub mod html;
pub mod images;
pub mod include;
pub mod js;
pub mod output;
pub mod paths;
pub mod pipeline;
pub mod sources;
pub mod sprite;

pub use clean::CleanTask;
pub use css::{CssOptions, CssTask};
pub use error::AssetError;
pub use fonts::{ExternalConverter, FontConverter, FontsTask, Otf2TtfTask};
pub use fonts_style::{DedupMode, FontsStyleTask, ManifestOutcome};
pub use html::HtmlTask;
pub use images::{ImageOptions, ImagesTask};
pub use js::{JsOptions, JsTask};
pub use paths::{AssetKind, PathCatalog, PathSet};
pub use pipeline::{PipelineOptions, TaskSet};
pub use sources::{SourceFile, SourceSet};
pub use sprite::SpriteTask;
