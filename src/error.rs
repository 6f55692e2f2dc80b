//! Typed failures that abort a run.
//!
//! Everything else is carried through `anyhow` with context. These variants
//! exist so callers (and tests) can tell the fatal cases apart with
//! `anyhow::Error::downcast_ref`.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IncludeError {
    /// The same include name matched more than one file across the search dirs.
    #[error("ambiguous include \"{name}\" resolves to {} files: {}", .candidates.len(), join_paths(.candidates))]
    AmbiguousResolution {
        name: String,
        candidates: Vec<PathBuf>,
    },

    /// A header must become public but cannot be moved under the public root.
    #[error("{} must be public but does not lie under the source root", .path.display())]
    Unpromotable { path: PathBuf },

    #[error("cannot move {} to {}: destination exists", .from.display(), .to.display())]
    DestinationExists { from: PathBuf, to: PathBuf },

    #[error("no include directive for \"{text}\" on {}:{line}", .file.display())]
    DirectiveNotFound {
        file: PathBuf,
        line: usize,
        text: String,
    },

    #[error("includes did not converge after {iterations} iterations")]
    NonConvergence { iterations: usize },

    #[error("aborted by user")]
    Aborted,
}

fn join_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
