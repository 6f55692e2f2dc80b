//! C/C++ source scanner.
//!
//! Lists the header and source files of one directory (non-recursive) and
//! extracts `#include` directives line by line. Nothing is preprocessed:
//! directives inside `#if 0` blocks count, commented-out ones do not.

use anyhow::{Context, Result};
use regex::Regex;
use serde::Serialize;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static INCLUDE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*#\s*include\s*(?:"(?P<quote>[^"]*)"|<(?P<angle>[^>]*)>)"#)
        .unwrap_or_else(|e| panic!("include regex: {e}"))
});

/// One `#include` directive found in source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IncludeDirective {
    /// The text between the delimiters, e.g. `core/foo.h`.
    pub name: String,
    /// `<name>` rather than `"name"`.
    pub angle: bool,
    /// Line number, 1-indexed.
    pub line: usize,
    /// Byte span of `name` within its line.
    #[serde(skip)]
    pub span: Range<usize>,
}

/// Lists files in `dir` (not its subdirectories) whose extension is in
/// `extensions`, sorted by path.
pub fn collect_sources(dir: &Path, extensions: &[String]) -> Result<Vec<PathBuf>> {
    let pattern = format!("{}/*", glob::Pattern::escape(&dir.to_string_lossy()));
    let mut files = Vec::new();

    for entry in glob::glob(&pattern).with_context(|| format!("Bad pattern {pattern}"))? {
        let path = entry?;
        if path.is_file() && has_known_extension(&path, extensions) {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}

/// Extension match is exact, so `Foo.H` is not a header unless `H` is listed.
pub fn has_known_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| extensions.iter().any(|known| known == e))
}

/// Matches a single line against the include directive grammar.
pub fn parse_line(line: &str) -> Option<(String, bool, Range<usize>)> {
    let caps = INCLUDE_RE.captures(line)?;
    if let Some(m) = caps.name("quote") {
        Some((m.as_str().to_string(), false, m.range()))
    } else {
        caps.name("angle")
            .map(|m| (m.as_str().to_string(), true, m.range()))
    }
}

/// Lazily yields every include directive in `source`.
pub fn parse_includes(source: &str) -> impl Iterator<Item = IncludeDirective> + '_ {
    source.lines().enumerate().filter_map(|(idx, line)| {
        parse_line(line).map(|(name, angle, span)| IncludeDirective {
            name,
            angle,
            line: idx + 1,
            span,
        })
    })
}

/// Reads a file and extracts its include directives.
pub fn extract_includes(file: &Path) -> Result<Vec<IncludeDirective>> {
    let source = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    Ok(parse_includes(&source).collect())
}
