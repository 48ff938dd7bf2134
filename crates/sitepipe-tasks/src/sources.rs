//! Glob source sets with negation support.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobBuilder, GlobMatcher, GlobSet, GlobSetBuilder};
use walkdir::WalkDir;

use crate::error::AssetError;

/// A matched source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Absolute path
    pub path: PathBuf,

    /// Path relative to the glob base of the pattern that matched it
    pub relative: PathBuf,
}

/// A positive pattern plus the static directory it is rooted at.
#[derive(Debug, Clone)]
struct Include {
    base: PathBuf,
    matcher: GlobMatcher,
}

/// Compiled set of source patterns.
///
/// Patterns are relative to `root`. `*` does not cross directory separators;
/// use `**` for that. Patterns starting with `!` remove matches from the set.
#[derive(Debug, Clone)]
pub struct SourceSet {
    root: PathBuf,
    includes: Vec<Include>,
    exclude: GlobSet,
}

impl SourceSet {
    /// Compile `patterns` relative to `root`.
    pub fn new<S: AsRef<str>>(root: &Path, patterns: &[S]) -> Result<Self, AssetError> {
        let mut includes = Vec::new();
        let mut exclude = GlobSetBuilder::new();

        for pattern in patterns {
            let pattern = pattern.as_ref().trim();
            if let Some(negated) = pattern.strip_prefix('!') {
                exclude.add(compile(negated)?);
            } else {
                includes.push(Include {
                    base: glob_base(pattern),
                    matcher: compile(pattern)?.compile_matcher(),
                });
            }
        }

        let exclude = exclude.build().map_err(|e| AssetError::Pattern {
            pattern: "<exclusions>".to_string(),
            message: e.to_string(),
        })?;

        Ok(Self {
            root: root.to_path_buf(),
            includes,
            exclude,
        })
    }

    /// True when `rel_path` (relative to the root, `/`-separated) is part of
    /// the set.
    pub fn matches(&self, rel_path: &str) -> bool {
        !self.exclude.is_match(rel_path) && self.includes.iter().any(|i| i.matcher.is_match(rel_path))
    }

    /// All files currently matching the set, sorted by path.
    ///
    /// A pattern that matches nothing contributes nothing; it is not an error.
    /// Unreadable directories below an existing base are.
    pub fn files(&self) -> Result<Vec<SourceFile>, AssetError> {
        let mut seen = HashSet::new();
        let mut files = Vec::new();

        for include in &self.includes {
            let base_dir = self.root.join(&include.base);
            if !base_dir.is_dir() {
                continue;
            }

            for entry in WalkDir::new(&base_dir)
                .follow_links(true)
                .sort_by_file_name()
                .into_iter()
            {
                let entry = entry.map_err(walk_error)?;
                let path = entry.path();
                if !entry.file_type().is_file() {
                    continue;
                }

                let rel = match path.strip_prefix(&self.root) {
                    Ok(rel) => to_slash(rel),
                    Err(_) => continue,
                };

                if !include.matcher.is_match(&rel) || self.exclude.is_match(&rel) {
                    continue;
                }

                if seen.insert(path.to_path_buf()) {
                    files.push(SourceFile {
                        path: path.to_path_buf(),
                        relative: path.strip_prefix(&base_dir).unwrap_or(path).to_path_buf(),
                    });
                }
            }
        }

        files.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(files)
    }
}

fn walk_error(err: walkdir::Error) -> AssetError {
    let path = err.path().map(Path::to_path_buf).unwrap_or_default();
    let source = err
        .into_io_error()
        .unwrap_or_else(|| std::io::Error::other("filesystem loop"));
    AssetError::io(path, source)
}

fn compile(pattern: &str) -> Result<Glob, AssetError> {
    GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .map_err(|e| AssetError::Pattern {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })
}

/// Static directory prefix of a glob.
///
/// `src/img/**/*.png` has base `src/img`; a pattern without wildcards has its
/// parent directory as base.
pub fn glob_base(pattern: &str) -> PathBuf {
    let parts: Vec<&str> = pattern.split('/').collect();
    let is_magic = |part: &&str| part.contains(['*', '?', '[', '{']);

    let static_len = parts.iter().take_while(|p| !is_magic(p)).count();
    let base_len = if static_len == parts.len() {
        static_len.saturating_sub(1)
    } else {
        static_len
    };

    parts[..base_len]
        .iter()
        .filter(|p| !p.is_empty() && **p != ".")
        .collect()
}

/// Render a relative path with `/` separators.
pub fn to_slash(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
