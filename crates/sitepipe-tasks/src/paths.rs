//! Path catalog: where each asset kind is read from, written to and watched.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A category of build artifact with its own source, build and watch paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Html,
    Css,
    Js,
    Img,
    Fonts,
}

impl AssetKind {
    pub const ALL: [AssetKind; 5] = [
        AssetKind::Html,
        AssetKind::Css,
        AssetKind::Js,
        AssetKind::Img,
        AssetKind::Fonts,
    ];

    /// Catalog key (`img` for images).
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetKind::Html => "html",
            AssetKind::Css => "css",
            AssetKind::Js => "js",
            AssetKind::Img => "img",
            AssetKind::Fonts => "fonts",
        }
    }

    /// Name of the task that builds this kind.
    pub fn task_name(&self) -> &'static str {
        match self {
            AssetKind::Img => "images",
            other => other.as_str(),
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssetKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "html" => Ok(AssetKind::Html),
            "css" => Ok(AssetKind::Css),
            "js" => Ok(AssetKind::Js),
            "img" | "images" => Ok(AssetKind::Img),
            "fonts" => Ok(AssetKind::Fonts),
            other => Err(format!(
                "unknown asset kind: {other} (expected html, css, js, img or fonts)"
            )),
        }
    }
}

/// Source globs, build directory and watch globs for one asset kind.
///
/// Globs are relative to the project root and use `/` separators. A source
/// glob starting with `!` excludes what it matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSet {
    /// Source patterns, negations allowed
    pub src: Vec<String>,

    /// Output directory, relative to the project root
    pub build: PathBuf,

    /// Patterns that trigger a rebuild of this kind
    pub watch: Vec<String>,
}

/// Path configuration for a whole project.
#[derive(Debug, Clone)]
pub struct PathCatalog {
    root: PathBuf,
    source_dir: String,
    build_dir: String,
    sets: BTreeMap<AssetKind, PathSet>,
}

impl PathCatalog {
    /// Catalog with the default `src`/`dist` layout under `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_dirs(root, "src", "dist")
    }

    /// Catalog with custom source and build directory names.
    pub fn with_dirs(root: impl Into<PathBuf>, source_dir: &str, build_dir: &str) -> Self {
        let src = source_dir.trim_end_matches('/').to_string();
        let dist = build_dir.trim_end_matches('/').to_string();
        let img_glob = format!("{src}/img/**/*.{{jpg,png,svg,gif,ico,webp}}");

        let mut sets = BTreeMap::new();
        sets.insert(
            AssetKind::Html,
            PathSet {
                src: vec![format!("{src}/*.html"), format!("!{src}/_*.html")],
                build: PathBuf::from(&dist),
                watch: vec![format!("{src}/**/*.html")],
            },
        );
        sets.insert(
            AssetKind::Css,
            PathSet {
                src: vec![format!("{src}/scss/style.scss")],
                build: PathBuf::from(format!("{dist}/css")),
                watch: vec![format!("{src}/scss/**/*.scss")],
            },
        );
        sets.insert(
            AssetKind::Js,
            PathSet {
                src: vec![format!("{src}/js/script.js")],
                build: PathBuf::from(format!("{dist}/js")),
                watch: vec![format!("{src}/js/**/*.js")],
            },
        );
        sets.insert(
            AssetKind::Img,
            PathSet {
                src: vec![img_glob.clone()],
                build: PathBuf::from(format!("{dist}/img")),
                watch: vec![img_glob],
            },
        );
        sets.insert(
            AssetKind::Fonts,
            PathSet {
                src: vec![format!("{src}/fonts/*.ttf")],
                build: PathBuf::from(format!("{dist}/fonts")),
                watch: vec![],
            },
        );

        Self {
            root: root.into(),
            source_dir: src,
            build_dir: dist,
            sets,
        }
    }

    /// Project root all patterns are relative to.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute source directory.
    pub fn source_root(&self) -> PathBuf {
        self.root.join(&self.source_dir)
    }

    /// Absolute build directory (also the clean target and the served root).
    pub fn build_root(&self) -> PathBuf {
        self.root.join(&self.build_dir)
    }

    /// Path set for `kind`.
    pub fn get(&self, kind: AssetKind) -> &PathSet {
        // Every kind is inserted by `with_dirs`; the map is never shrunk.
        &self.sets[&kind]
    }

    /// Replace the source patterns of `kind`.
    pub fn set_src(&mut self, kind: AssetKind, src: Vec<String>) {
        if let Some(set) = self.sets.get_mut(&kind) {
            set.src = src;
        }
    }

    /// Replace the watch patterns of `kind`.
    pub fn set_watch(&mut self, kind: AssetKind, watch: Vec<String>) {
        if let Some(set) = self.sets.get_mut(&kind) {
            set.watch = watch;
        }
    }

    /// Absolute output directory for `kind`.
    pub fn build_dir(&self, kind: AssetKind) -> PathBuf {
        self.root.join(&self.get(kind).build)
    }

    /// Icons assembled by the sprite task.
    pub fn sprite_src(&self) -> Vec<String> {
        vec![format!("{}/iconsprite/*.svg", self.source_dir)]
    }

    /// Directory the sprite task writes into.
    pub fn sprite_dest(&self) -> PathBuf {
        self.build_dir(AssetKind::Img)
    }

    /// OpenType fonts converted by the otf2ttf task.
    pub fn otf_src(&self) -> Vec<String> {
        vec![format!("{}/fonts/*.otf", self.source_dir)]
    }

    /// Directory the otf2ttf task writes into (next to the TTF sources).
    pub fn otf_dest(&self) -> PathBuf {
        self.source_root().join("fonts")
    }

    /// Stylesheet partial maintained by the fontsStyle task.
    pub fn font_manifest(&self) -> PathBuf {
        self.source_root().join("scss").join("fonts.scss")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_layout_matches_src_dist() {
        let catalog = PathCatalog::new("/project");

        assert_eq!(
            catalog.get(AssetKind::Html).src,
            vec!["src/*.html", "!src/_*.html"]
        );
        assert_eq!(catalog.build_dir(AssetKind::Css), PathBuf::from("/project/dist/css"));
        assert_eq!(catalog.build_root(), PathBuf::from("/project/dist"));
        assert_eq!(
            catalog.font_manifest(),
            PathBuf::from("/project/src/scss/fonts.scss")
        );
        assert!(catalog.get(AssetKind::Fonts).watch.is_empty());
    }

    #[test]
    fn custom_dirs_propagate_to_every_kind() {
        let catalog = PathCatalog::with_dirs("/p", "assets/", "public");

        for kind in AssetKind::ALL {
            let set = catalog.get(kind);
            assert!(set.build.starts_with("public"), "{kind}");
            assert!(set.src.iter().all(|p| p.trim_start_matches('!').starts_with("assets/")));
        }
        assert_eq!(catalog.otf_dest(), PathBuf::from("/p/assets/fonts"));
    }

    #[test]
    fn overrides_replace_patterns() {
        let mut catalog = PathCatalog::new("/p");
        catalog.set_src(AssetKind::Js, vec!["src/js/*.js".into()]);
        catalog.set_watch(AssetKind::Css, vec!["src/**/*.scss".into()]);

        assert_eq!(catalog.get(AssetKind::Js).src, vec!["src/js/*.js"]);
        assert_eq!(catalog.get(AssetKind::Css).watch, vec!["src/**/*.scss"]);
    }

    #[test]
    fn parses_kind_names() {
        assert_eq!("images".parse::<AssetKind>().unwrap(), AssetKind::Img);
        assert_eq!(" CSS ".parse::<AssetKind>().unwrap(), AssetKind::Css);
        assert!("sass".parse::<AssetKind>().is_err());
        assert_eq!(AssetKind::Img.task_name(), "images");
    }
}
