//! Source tree layout and configuration.
//!
//! A tree has a public-include root (`inc` by default) and a private-source
//! root (`src`), each holding module subdirectories. The layout can be tuned
//! with an `incfix.toml` at the tree root; every key is optional.
//!
//! Parse directories are discovered on demand rather than stored, because
//! moving a header into the public tree can create directories that did not
//! exist when the layout was loaded.

use crate::error::IncludeError;
use crate::resolver::normalize;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Name of the configuration file looked up at the tree root.
pub const CONFIG_FILE: &str = "incfix.toml";

pub const DEFAULT_EXTENSIONS: &[&str] = &["h", "hpp", "hxx", "hh", "inl", "c", "cc", "cpp", "cxx"];

const DEFAULT_MAX_ITERATIONS: usize = 64;

/// Raw contents of `incfix.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LayoutConfig {
    pub public_root: Option<PathBuf>,
    pub source_root: Option<PathBuf>,
    /// Restrict parsing to these module subdirectories of both roots.
    pub modules: Option<Vec<String>>,
    /// Directories that are parsed but never moved, e.g. test sources.
    pub extra_dirs: Vec<PathBuf>,
    /// Additional global include roots. Searched, never parsed.
    pub include_roots: Vec<PathBuf>,
    pub extensions: Option<Vec<String>>,
    pub basename_fallback: Option<bool>,
    pub max_iterations: Option<usize>,
}

impl LayoutConfig {
    /// Reads and parses a TOML layout file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Loads `incfix.toml` from `root` if present, otherwise the defaults.
    pub fn discover(root: &Path) -> Result<Self> {
        let candidate = root.join(CONFIG_FILE);
        if candidate.is_file() {
            Self::load(&candidate)
        } else {
            Ok(Self::default())
        }
    }
}

/// Resolved, absolute layout of a source tree.
#[derive(Debug, Clone)]
pub struct Layout {
    pub root: PathBuf,
    pub public_root: PathBuf,
    pub source_root: PathBuf,
    pub modules: Option<Vec<String>>,
    pub extra_dirs: Vec<PathBuf>,
    pub include_roots: Vec<PathBuf>,
    pub extensions: Vec<String>,
    pub basename_fallback: bool,
    pub max_iterations: usize,
}

impl Layout {
    /// Default layout (`inc` / `src`) rooted at `root`.
    pub fn new(root: &Path) -> Result<Self> {
        Self::from_config(root, LayoutConfig::default())
    }

    /// Builds a layout from a parsed config. Relative paths in the config are
    /// taken relative to the canonicalized `root`.
    pub fn from_config(root: &Path, config: LayoutConfig) -> Result<Self> {
        let root = std::fs::canonicalize(root)
            .with_context(|| format!("Failed to resolve tree root {}", root.display()))?;
        let under_root = |p: &Path| normalize(&root.join(p));

        Ok(Self {
            public_root: under_root(config.public_root.as_deref().unwrap_or(Path::new("inc"))),
            source_root: under_root(config.source_root.as_deref().unwrap_or(Path::new("src"))),
            modules: config.modules,
            extra_dirs: config.extra_dirs.iter().map(|p| under_root(p)).collect(),
            include_roots: config.include_roots.iter().map(|p| under_root(p)).collect(),
            extensions: config.extensions.unwrap_or_else(|| {
                DEFAULT_EXTENSIONS.iter().map(|e| (*e).to_string()).collect()
            }),
            basename_fallback: config.basename_fallback.unwrap_or(true),
            max_iterations: config.max_iterations.unwrap_or(DEFAULT_MAX_ITERATIONS),
            root,
        })
    }

    /// Global include roots: the public root first, then any external roots.
    pub fn global_roots(&self) -> Vec<PathBuf> {
        let mut roots = vec![self.public_root.clone()];
        roots.extend(self.include_roots.iter().cloned());
        roots
    }

    /// Directories whose files become graph nodes, in a stable order.
    ///
    /// That is the public root itself, every directory below each module
    /// directory of both roots, and the configured extra directories. Files
    /// sitting directly in the source root are not parsed.
    pub fn parse_dirs(&self) -> Result<Vec<PathBuf>> {
        let mut dirs = Vec::new();
        if self.public_root.is_dir() {
            dirs.push(self.public_root.clone());
        }

        for base in [&self.public_root, &self.source_root] {
            for module in self.module_dirs(base)? {
                for entry in WalkDir::new(&module)
                    .sort_by_file_name()
                    .into_iter()
                    .filter_entry(|e| e.depth() == 0 || !is_hidden(e))
                {
                    let entry = entry?;
                    if entry.file_type().is_dir() {
                        push_unique(&mut dirs, entry.into_path());
                    }
                }
            }
        }

        for extra in &self.extra_dirs {
            if extra.is_dir() {
                push_unique(&mut dirs, extra.clone());
            }
        }

        Ok(dirs)
    }

    fn module_dirs(&self, base: &Path) -> Result<Vec<PathBuf>> {
        if !base.is_dir() {
            return Ok(Vec::new());
        }

        if let Some(modules) = &self.modules {
            return Ok(modules
                .iter()
                .map(|m| base.join(m))
                .filter(|p| p.is_dir())
                .collect());
        }

        let mut dirs = Vec::new();
        for entry in WalkDir::new(base)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry?;
            if entry.file_type().is_dir() && !is_hidden(&entry) {
                dirs.push(entry.into_path());
            }
        }
        Ok(dirs)
    }

    /// Candidate directories for resolving one include directive.
    ///
    /// Quote includes look next to the includer first; angle includes only use
    /// the global roots. Both then fall through to every parse directory.
    pub fn lookup_dirs(&self, includer: &Path, angle: bool, parse_dirs: &[PathBuf]) -> Vec<PathBuf> {
        let mut dirs = Vec::new();
        if !angle && let Some(parent) = includer.parent() {
            dirs.push(parent.to_path_buf());
        }
        for dir in self.global_roots().into_iter().chain(parse_dirs.iter().cloned()) {
            push_unique(&mut dirs, dir);
        }
        dirs
    }

    /// Directories an include may be written relative to, for the text check.
    pub fn search_path(&self, includer: &Path, angle: bool) -> Vec<PathBuf> {
        let mut dirs = Vec::new();
        if !angle && let Some(parent) = includer.parent() {
            dirs.push(parent.to_path_buf());
        }
        for root in self.global_roots() {
            push_unique(&mut dirs, root);
        }
        dirs
    }

    pub fn is_public(&self, path: &Path) -> bool {
        path.starts_with(&self.public_root)
    }

    /// True for files found through an external include root.
    pub fn is_external(&self, path: &Path) -> bool {
        self.include_roots.iter().any(|r| path.starts_with(r))
    }

    /// Where a private file lands once it is made public.
    ///
    /// `src/<module>/foo.h` maps to `inc/<module>/foo.h`; the relative path under
    /// the source root is kept as is.
    pub fn public_destination(&self, path: &Path) -> Result<PathBuf> {
        if self.is_public(path) {
            return Err(IncludeError::Unpromotable {
                path: path.to_path_buf(),
            }
            .into());
        }
        let relative = path
            .strip_prefix(&self.source_root)
            .map_err(|_| IncludeError::Unpromotable {
                path: path.to_path_buf(),
            })?;
        Ok(self.public_root.join(relative))
    }
}

fn is_hidden(entry: &walkdir::DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .is_some_and(|s| s.starts_with('.'))
}

fn push_unique(dirs: &mut Vec<PathBuf>, dir: PathBuf) {
    if !dirs.contains(&dir) {
        dirs.push(dir);
    }
}
