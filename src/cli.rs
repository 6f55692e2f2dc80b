//! Command-line interface definitions.
//!
//! Defines the argument parser and subcommands using clap's derive API.
//! Every subcommand takes the same tree-selection flags; the layout they
//! describe is loaded once per invocation.

use anyhow::Result;
use clap::{Parser, Subcommand};
use incfix::layout::{Layout, LayoutConfig};
use std::path::PathBuf;

/// Keep public headers closed over their includes and include paths concise.
#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,
}

/// Flags that select and describe the source tree.
#[derive(Debug, clap::Args)]
pub struct TreeArgs {
    /// Root of the source tree.
    #[arg(short, long, default_value = ".")]
    pub root: PathBuf,

    /// Layout file. Defaults to `incfix.toml` under the root when it exists.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Public-include root, relative to the tree root (default `inc`).
    #[arg(long)]
    pub public_root: Option<PathBuf>,

    /// Private-source root, relative to the tree root (default `src`).
    #[arg(long)]
    pub source_root: Option<PathBuf>,
}

impl TreeArgs {
    /// Loads the layout file and applies command-line overrides.
    pub fn load(&self, max_iterations: Option<usize>) -> Result<Layout> {
        let mut config = match &self.config {
            Some(path) => LayoutConfig::load(path)?,
            None => LayoutConfig::discover(&self.root)?,
        };
        if let Some(public_root) = &self.public_root {
            config.public_root = Some(public_root.clone());
        }
        if let Some(source_root) = &self.source_root {
            config.source_root = Some(source_root.clone());
        }
        if max_iterations.is_some() {
            config.max_iterations = max_iterations;
        }
        Layout::from_config(&self.root, config)
    }
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Report public-header leaks and non-concise includes without changing anything.
    Check {
        #[command(flatten)]
        tree: TreeArgs,

        /// Emit JSON instead of human-readable output.
        #[arg(long)]
        json: bool,

        /// Print additional diagnostics to stderr.
        #[arg(short, long)]
        verbose: bool,
    },

    /// Move headers and rewrite includes until the tree is at its fixed point.
    Fix {
        #[command(flatten)]
        tree: TreeArgs,

        /// Actually modify files (default is dry-run).
        #[arg(long)]
        write: bool,

        /// Confirm each pass before it is applied.
        #[arg(short, long)]
        interactive: bool,

        /// Give up after this many graph rebuilds.
        #[arg(long)]
        max_iterations: Option<usize>,

        /// Print additional diagnostics to stderr.
        #[arg(short, long)]
        verbose: bool,
    },

    /// Dump the include graph as node-link JSON.
    Graph {
        #[command(flatten)]
        tree: TreeArgs,

        /// Write to this file instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List what a file transitively includes, or what includes it.
    Deps {
        #[command(flatten)]
        tree: TreeArgs,

        /// File to query.
        file: PathBuf,

        /// Show files that include FILE instead.
        #[arg(long)]
        reverse: bool,
    },

    /// List files that would be parsed without processing them.
    Scan {
        #[command(flatten)]
        tree: TreeArgs,
    },
}
