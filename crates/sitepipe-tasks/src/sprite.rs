//! SVG sprite task (stack mode) with an example page.

use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use minijinja::{context, Environment};
use regex::Regex;
use sitepipe_graph::{Task, TaskError};

use crate::error::AssetError;
use crate::output::{blocking, read_source, write_file};
use crate::paths::PathCatalog;
use crate::sources::SourceSet;

static PROLOG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<\?xml.*?\?>|<!DOCTYPE[^>]*>|<!--.*?-->").expect("Invalid prolog regex")
});

static ROOT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<svg\b([^>]*)>(.*)</svg>").expect("Invalid svg root regex")
});

static ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([A-Za-z_:][-A-Za-z0-9_:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)')"#)
        .expect("Invalid attribute regex")
});

const EXAMPLE_TEMPLATE: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>SVG sprite example</title>
  <style>
    body { font-family: system-ui, sans-serif; padding: 2rem; }
    ul { list-style: none; display: flex; flex-wrap: wrap; gap: 1.5rem; padding: 0; }
    li { text-align: center; }
    img { width: 48px; height: 48px; display: block; margin: 0 auto 0.5rem; }
    code { font-size: 0.8rem; }
  </style>
</head>
<body>
  <h1>{{ icons | length }} icons</h1>
  <ul>
  {% for icon in icons %}
    <li><img src="{{ sprite }}#{{ icon }}" alt="{{ icon }}"><code>#{{ icon }}</code></li>
  {% endfor %}
  </ul>
</body>
</html>
"##;

/// One icon of the sprite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Icon {
    /// Fragment id (file stem)
    pub id: String,
    /// `viewBox` of the source document
    pub view_box: Option<String>,
    /// Markup inside the source `<svg>` element
    pub body: String,
}

/// Assembles `src/iconsprite/*.svg` into `img/icons/icons.svg`.
pub struct SpriteTask {
    catalog: Arc<PathCatalog>,
}

impl SpriteTask {
    pub fn new(catalog: Arc<PathCatalog>) -> Self {
        Self { catalog }
    }

    /// Write the sprite and its example page; returns the written paths.
    pub fn build(catalog: &PathCatalog) -> Result<Vec<PathBuf>, AssetError> {
        let set = SourceSet::new(catalog.root(), &catalog.sprite_src())?;

        let mut icons = Vec::new();
        for file in set.files()? {
            let id = file
                .path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("icon")
                .to_string();
            icons.push(parse_icon(&id, &read_source(&file.path)?, &file.path)?);
        }

        if icons.is_empty() {
            return Ok(Vec::new());
        }

        let dest = catalog.sprite_dest();
        let sprite_path = dest.join("icons").join("icons.svg");
        let example_path = dest.join("stack").join("sprite.stack.html");

        write_file(&sprite_path, render_sprite(&icons))?;
        write_file(&example_path, render_example(&icons, "../icons/icons.svg", &example_path)?)?;

        Ok(vec![sprite_path, example_path])
    }
}

#[async_trait]
impl Task for SpriteTask {
    fn name(&self) -> &str {
        "spriteSVG"
    }

    async fn run(&self) -> Result<(), TaskError> {
        let catalog = Arc::clone(&self.catalog);
        let written = blocking(move || SpriteTask::build(&catalog)).await?;
        tracing::debug!("spriteSVG: wrote {} files", written.len());
        Ok(())
    }
}

/// Extract the root element's `viewBox` and inner markup.
pub fn parse_icon(id: &str, source: &str, path: &Path) -> Result<Icon, AssetError> {
    let cleaned = PROLOG_RE.replace_all(source, "");
    let caps = ROOT_RE
        .captures(&cleaned)
        .ok_or_else(|| AssetError::transform(path, "no <svg> root element"))?;

    let mut view_box = None;
    let mut width = None;
    let mut height = None;
    for attr in ATTR_RE.captures_iter(&caps[1]) {
        let value = attr
            .get(2)
            .or_else(|| attr.get(3))
            .map(|m| m.as_str().to_string());
        match &attr[1] {
            "viewBox" => view_box = value,
            "width" => width = value,
            "height" => height = value,
            _ => {}
        }
    }

    let view_box = view_box.or_else(|| match (width, height) {
        (Some(w), Some(h)) => Some(format!(
            "0 0 {} {}",
            w.trim_end_matches("px"),
            h.trim_end_matches("px")
        )),
        _ => None,
    });

    Ok(Icon {
        id: id.to_string(),
        view_box,
        body: caps[2].trim().to_string(),
    })
}

/// Stack-mode sprite: every icon is a nested `<svg>` shown only when it is
/// the `:target` of the URL fragment.
pub fn render_sprite(icons: &[Icon]) -> String {
    let mut out = String::from(
        r#"<?xml version="1.0" encoding="utf-8"?><svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink"><style>:root>svg{display:none}:root>svg:target{display:block}</style>"#,
    );

    for icon in icons {
        out.push_str("<svg");
        if let Some(view_box) = &icon.view_box {
            out.push_str(&format!(r#" viewBox="{}""#, view_box));
        }
        out.push_str(&format!(
            r#" id="{}" xmlns="http://www.w3.org/2000/svg">{}</svg>"#,
            icon.id, icon.body
        ));
    }

    out.push_str("</svg>");
    out
}

fn render_example(icons: &[Icon], sprite: &str, path: &Path) -> Result<String, AssetError> {
    let template_error = |e: minijinja::Error| AssetError::transform(path, format!("template error: {}", e));

    // Not named *.html so URLs are not HTML-escaped.
    let mut env = Environment::new();
    env.add_template("sprite-example", EXAMPLE_TEMPLATE)
        .map_err(template_error)?;

    let ids: Vec<&str> = icons.iter().map(|i| i.id.as_str()).collect();
    env.get_template("sprite-example")
        .and_then(|tmpl| tmpl.render(context! { icons => ids, sprite => sprite }))
        .map_err(template_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn parses_view_box_and_body() {
        let icon = parse_icon(
            "arrow",
            r#"<?xml version="1.0"?><!-- exported --><svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 24 24"><path d="M0 0h24"/></svg>"#,
            Path::new("arrow.svg"),
        )
        .unwrap();

        assert_eq!(icon.view_box.as_deref(), Some("0 0 24 24"));
        assert_eq!(icon.body, r#"<path d="M0 0h24"/>"#);
    }

    #[test]
    fn derives_view_box_from_size() {
        let icon = parse_icon("x", r#"<svg width="16px" height="16"></svg>"#, Path::new("x.svg"))
            .unwrap();
        assert_eq!(icon.view_box.as_deref(), Some("0 0 16 16"));
    }

    #[test]
    fn rejects_non_svg_files() {
        assert!(parse_icon("x", "<html></html>", Path::new("x.svg")).is_err());
    }

    #[test]
    fn builds_sprite_and_example_page() {
        let temp = tempdir().unwrap();
        let icons = temp.path().join("src/iconsprite");
        fs::create_dir_all(&icons).unwrap();
        fs::write(icons.join("b-close.svg"), r#"<svg viewBox="0 0 10 10"><circle r="4"/></svg>"#)
            .unwrap();
        fs::write(icons.join("a-menu.svg"), r#"<svg viewBox="0 0 10 10"><rect/></svg>"#).unwrap();

        let written = SpriteTask::build(&PathCatalog::new(temp.path())).unwrap();
        assert_eq!(written.len(), 2);

        let sprite = fs::read_to_string(temp.path().join("dist/img/icons/icons.svg")).unwrap();
        let menu = sprite.find(r#"id="a-menu""#).unwrap();
        let close = sprite.find(r#"id="b-close""#).unwrap();
        assert!(menu < close);

        let example =
            fs::read_to_string(temp.path().join("dist/img/stack/sprite.stack.html")).unwrap();
        assert!(example.contains("../icons/icons.svg#b-close"));
        assert!(example.contains("2 icons"));
    }

    #[test]
    fn no_icons_writes_nothing() {
        let temp = tempdir().unwrap();
        assert!(SpriteTask::build(&PathCatalog::new(temp.path())).unwrap().is_empty());
        assert!(!temp.path().join("dist").exists());
    }
}
