//! `@@include` resolution for HTML and JS fragments.
//!
//! Supported forms:
//!
//! ```text
//! @@include('_header.html')
//! @@include('_header.html', {"title": "Home"})
//! ```
//!
//! Paths are relative to the file containing the directive. Inside an
//! included fragment, `@@title` is replaced by the matching context value.
//! Fragments may include other fragments; contexts are inherited.

use std::path::Path;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde_json::{Map, Value};

use crate::error::AssetError;
use crate::output::read_source;

/// Deepest include nesting accepted before assuming a cycle.
pub const MAX_INCLUDE_DEPTH: usize = 32;

static INCLUDE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"@@include\(\s*['"]([^'"]+)['"]\s*(?:,\s*(\{[\s\S]*?\})\s*)?\)"#)
        .expect("valid include regex")
});

static VAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@@([A-Za-z_][A-Za-z0-9_]*)").expect("valid variable regex"));

/// Resolve all include directives in `source`, a file located at `path`.
pub fn resolve_includes(source: &str, path: &Path) -> Result<String, AssetError> {
    resolve(source, path, &Map::new(), 0)
}

fn resolve(
    source: &str,
    path: &Path,
    context: &Map<String, Value>,
    depth: usize,
) -> Result<String, AssetError> {
    if depth > MAX_INCLUDE_DEPTH {
        return Err(AssetError::transform(
            path,
            format!("includes nested deeper than {MAX_INCLUDE_DEPTH} levels"),
        ));
    }

    let dir = path.parent().unwrap_or(Path::new(""));
    let mut output = String::with_capacity(source.len());
    let mut last = 0;

    for caps in INCLUDE_RE.captures_iter(source) {
        let whole = caps.get(0).map(|m| m.range()).unwrap_or(0..0);
        output.push_str(&source[last..whole.start]);
        last = whole.end;

        let target = dir.join(&caps[1]);
        let mut inner_context = context.clone();
        if let Some(raw) = caps.get(2) {
            let parsed: Map<String, Value> = serde_json::from_str(raw.as_str()).map_err(|e| {
                AssetError::transform(path, format!("invalid include context for {}: {}", &caps[1], e))
            })?;
            inner_context.extend(parsed);
        }

        let fragment = read_source(&target).map_err(|_| {
            AssetError::transform(path, format!("included file not found: {}", target.display()))
        })?;
        let fragment = substitute(&fragment, &inner_context);

        output.push_str(&resolve(&fragment, &target, &inner_context, depth + 1)?);
    }

    output.push_str(&source[last..]);
    Ok(output)
}

/// Replace `@@name` with context values; unknown names are left alone.
fn substitute(source: &str, context: &Map<String, Value>) -> String {
    if context.is_empty() {
        return source.to_string();
    }

    VAR_RE
        .replace_all(source, |caps: &Captures| match context.get(&caps[1]) {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn inlines_fragments_relative_to_includer() {
        let temp = tempdir().unwrap();
        fs::create_dir_all(temp.path().join("parts")).unwrap();
        fs::write(temp.path().join("parts/_nav.html"), "<nav></nav>").unwrap();
        fs::write(
            temp.path().join("_header.html"),
            "<header>@@include('parts/_nav.html')</header>",
        )
        .unwrap();

        let page = temp.path().join("index.html");
        let out = resolve_includes("<body>@@include('_header.html')</body>", &page).unwrap();

        assert_eq!(out, "<body><header><nav></nav></header></body>");
    }

    #[test]
    fn substitutes_context_values() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("_head.html"), "<title>@@title</title>@@unknown").unwrap();

        let page = temp.path().join("index.html");
        let out = resolve_includes(
            r#"@@include("_head.html", {"title": "Home"})"#,
            &page,
        )
        .unwrap();

        assert_eq!(out, "<title>Home</title>@@unknown");
    }

    #[test]
    fn nested_fragments_inherit_context() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("_inner.html"), "<h1>@@title</h1>").unwrap();
        fs::write(temp.path().join("_outer.html"), "@@include('_inner.html')").unwrap();

        let page = temp.path().join("index.html");
        let out =
            resolve_includes(r#"@@include('_outer.html', {"title": "Deep"})"#, &page).unwrap();

        assert_eq!(out, "<h1>Deep</h1>");
    }

    #[test]
    fn missing_fragment_is_an_error() {
        let temp = tempdir().unwrap();
        let page = temp.path().join("index.html");

        let err = resolve_includes("@@include('_missing.html')", &page).unwrap_err();
        assert!(err.to_string().contains("_missing.html"));
    }

    #[test]
    fn detects_include_cycles() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("_a.html"), "@@include('_b.html')").unwrap();
        fs::write(temp.path().join("_b.html"), "@@include('_a.html')").unwrap();

        let page = temp.path().join("index.html");
        let err = resolve_includes("@@include('_a.html')", &page).unwrap_err();

        assert!(err.to_string().contains("nested deeper"));
    }

    #[test]
    fn leaves_text_without_directives_untouched() {
        let out = resolve_includes("const a = 1;", Path::new("script.js")).unwrap();
        assert_eq!(out, "const a = 1;");
    }
}
