//! File-system mutations: moving headers and rewriting include directives.
//!
//! Directive rewrites only touch the name span of lines that parse as
//! `#include` directives, so the same text in comments or string literals
//! stays as it is. Line endings are preserved.

use crate::analyzer::{IncludeFix, Move};
use crate::error::IncludeError;
use crate::scanner;
use anyhow::{Context, Result};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};

/// Moves `from` to `to`, creating missing parent directories.
///
/// Refuses to overwrite an existing destination.
pub fn move_file(from: &Path, to: &Path) -> Result<()> {
    if to.exists() {
        return Err(IncludeError::DestinationExists {
            from: from.to_path_buf(),
            to: to.to_path_buf(),
        }
        .into());
    }
    if let Some(parent) = to.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::rename(from, to)
        .with_context(|| format!("Failed to move {} to {}", from.display(), to.display()))
}

pub fn apply_moves(moves: &[Move]) -> Result<()> {
    for m in moves {
        move_file(&m.from, &m.to)?;
    }
    Ok(())
}

/// Rewrites quote-include names in `content` according to `replacements`
/// (1-indexed line → (old name, new name)), returning the new text and the
/// lines that were rewritten. A line is only rewritten when its directive
/// still reads the old name; the same text on any other line is left alone.
///
/// All replacements are decided against the original text in a single pass,
/// so one replacement's output is never fed into another.
pub fn apply_replacements(
    content: &str,
    replacements: &HashMap<usize, (&str, &str)>,
) -> (String, HashSet<usize>) {
    let mut result = String::with_capacity(content.len());
    let mut applied = HashSet::new();

    for (idx, segment) in content.split_inclusive('\n').enumerate() {
        let line = segment.trim_end_matches(['\n', '\r']);
        let parsed = scanner::parse_line(line).filter(|(_, angle, _)| !angle);
        let line_no = idx + 1;
        match parsed.and_then(|(name, _, span)| {
            replacements
                .get(&line_no)
                .filter(|(old, _)| *old == name)
                .map(|(_, new)| (*new, span))
        }) {
            Some((new, span)) => {
                result.push_str(&segment[..span.start]);
                result.push_str(new);
                result.push_str(&segment[span.end..]);
                applied.insert(line_no);
            }
            None => result.push_str(segment),
        }
    }

    (result, applied)
}

/// Applies every fix to its file. Each file is read and written once.
///
/// Fails if any fix's directive is no longer present.
pub fn apply_include_fixes(fixes: &[IncludeFix]) -> Result<()> {
    let mut by_file: BTreeMap<&PathBuf, Vec<&IncludeFix>> = BTreeMap::new();
    for fix in fixes {
        by_file.entry(&fix.file).or_default().push(fix);
    }

    for (file, fixes) in by_file {
        let content = std::fs::read_to_string(file)
            .with_context(|| format!("Failed to read {}", file.display()))?;
        let replacements: HashMap<usize, (&str, &str)> = fixes
            .iter()
            .map(|f| (f.line, (f.old_text.as_str(), f.new_text.as_str())))
            .collect();

        let (new_content, applied) = apply_replacements(&content, &replacements);
        if let Some(missing) = fixes.iter().find(|f| !applied.contains(&f.line)) {
            return Err(IncludeError::DirectiveNotFound {
                file: file.clone(),
                line: missing.line,
                text: missing.old_text.clone(),
            }
            .into());
        }

        std::fs::write(file, new_content)
            .with_context(|| format!("Failed to write {}", file.display()))?;
    }

    Ok(())
}
