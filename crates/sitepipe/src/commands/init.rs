//! Scaffold a project.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

const FILES: &[(&str, &str)] = &[
    ("sitepipe.toml", DEFAULT_CONFIG),
    ("src/index.html", DEFAULT_INDEX),
    ("src/_header.html", DEFAULT_HEADER),
    ("src/scss/style.scss", DEFAULT_STYLE),
    ("src/scss/fonts.scss", ""),
    ("src/js/script.js", DEFAULT_SCRIPT),
];

const DIRS: &[&str] = &["src/img", "src/fonts", "src/iconsprite"];

/// Run the init command in `root`.
pub async fn run(root: &Path, yes: bool) -> Result<()> {
    tracing::info!("Initializing sitepipe in {}...", root.display());

    for dir in DIRS {
        let path = root.join(dir);
        fs::create_dir_all(&path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
    }

    for (name, contents) in FILES {
        let path = root.join(name);
        if path.exists() && !yes {
            tracing::warn!("{} already exists. Use --yes to overwrite.", name);
            continue;
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(&path, contents).with_context(|| format!("Failed to write {}", name))?;
        tracing::info!("Created {}", name);
    }

    tracing::info!("Initialization complete!");
    tracing::info!("Run 'sitepipe' to build, watch and serve.");

    Ok(())
}

const DEFAULT_CONFIG: &str = r#"# sitepipe configuration

[project]
source = "src"
output = "dist"

# Override the globs of an asset kind (html, css, js, img, fonts):
# [paths.css]
# src = ["src/scss/style.scss"]
# watch = ["src/scss/**/*.scss"]

[server]
port = 3000
host = "127.0.0.1"
open = true

[watch]
debounce_ms = 100

[css]
browsers = ["last 5 versions"]

[js]
target = "es2015"

[images]
jpeg_quality = 75

[fonts]
# "consecutive" or "global"
dedup = "consecutive"
"#;

const DEFAULT_INDEX: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>sitepipe</title>
  <link rel="stylesheet" href="css/style.min.css">
</head>
<body>
  @@include('_header.html', {"title": "Hello"})
  <script src="js/script.min.js"></script>
</body>
</html>
"#;

const DEFAULT_HEADER: &str = r#"<header>
  <h1>@@title</h1>
</header>
"#;

const DEFAULT_STYLE: &str = r#"@mixin font($font_name, $file_name, $weight, $style) {
  @font-face {
    font-family: $font_name;
    font-display: swap;
    src: url("../fonts/#{$file_name}.woff2") format("woff2"),
      url("../fonts/#{$file_name}.woff") format("woff");
    font-weight: #{$weight};
    font-style: #{$style};
  }
}

@import "fonts";

body {
  margin: 0;
  font-family: sans-serif;
}
"#;

const DEFAULT_SCRIPT: &str = r#"const greet = (name) => `Hello, ${name}`;

document.addEventListener("DOMContentLoaded", () => {
  console.log(greet("sitepipe"));
});
"#;
