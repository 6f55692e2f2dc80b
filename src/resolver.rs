//! Include name resolution against an ordered list of directories.

use crate::error::IncludeError;
use anyhow::Result;
use std::path::{Component, Path, PathBuf};

/// Finds the one file that `name` refers to when looked up in `dirs`.
///
/// Every directory is tried; a hit requires `dir/name` to be an existing
/// regular file. When nothing matches, `name` has a directory component and
/// `basename_fallback` is set, the lookup is retried with only the final path
/// segment. `Ok(None)` means the include is external (system or third-party).
///
/// More than one distinct match is an [`IncludeError::AmbiguousResolution`].
pub fn resolve(name: &str, dirs: &[PathBuf], basename_fallback: bool) -> Result<Option<PathBuf>> {
    if let Some(found) = find_unique(name, dirs)? {
        return Ok(Some(found));
    }

    if basename_fallback {
        let path = Path::new(name);
        if path.parent().is_some_and(|p| !p.as_os_str().is_empty())
            && let Some(base) = path.file_name().and_then(|b| b.to_str())
        {
            return find_unique(base, dirs);
        }
    }

    Ok(None)
}

fn find_unique(name: &str, dirs: &[PathBuf]) -> Result<Option<PathBuf>> {
    let mut found: Vec<PathBuf> = Vec::new();
    for dir in dirs {
        let candidate = normalize(&dir.join(name));
        if candidate.is_file() && !found.contains(&candidate) {
            found.push(candidate);
        }
    }

    match found.len() {
        0 => Ok(None),
        1 => Ok(found.pop()),
        _ => Err(IncludeError::AmbiguousResolution {
            name: name.to_string(),
            candidates: found,
        }
        .into()),
    }
}

/// Include texts for `target` relative to each directory in `search_path`
/// that contains it, in search-path order, using `/` separators.
///
/// An empty result means no directory in the search path is an ancestor of
/// `target`, i.e. the file cannot be included from there at all.
pub fn relative_includes(target: &Path, search_path: &[PathBuf]) -> Vec<String> {
    let mut texts: Vec<String> = Vec::new();
    for dir in search_path {
        let Ok(rel) = target.strip_prefix(dir) else {
            continue;
        };
        let Some(parts) = rel
            .components()
            .map(|c| c.as_os_str().to_str())
            .collect::<Option<Vec<_>>>()
        else {
            continue;
        };
        let text = parts.join("/");
        if !parts.is_empty() && !texts.contains(&text) {
            texts.push(text);
        }
    }
    texts
}

/// Folds `.` and `..` components without touching the file system.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}
