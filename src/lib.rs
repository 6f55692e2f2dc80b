//! incfix library for keeping C/C++ public headers self-contained.
//!
//! A tree has a public-include root and a private-source root. Anything a
//! public header transitively includes must itself be public, and every
//! include should be written in the shortest form that still resolves. The
//! workflow is:
//!
//! 1. **Scanning**: list header/source files per directory and extract `#include` directives
//! 2. **Graph**: resolve each directive to a file and link includer to included
//! 3. **Analysis**: find private headers reachable from public ones and includes
//!    written in a longer or unreachable form
//! 4. **Rewriting**: move headers into the public tree and rewrite directives
//!
//! The [`driver::Driver`] repeats these steps on a freshly built graph until
//! a pass changes nothing.
//!
//! # Example
//!
//! ```no_run
//! use incfix::{analyzer, driver::Driver, layout::Layout};
//! use std::path::Path;
//!
//! let layout = Layout::new(Path::new("./project")).unwrap();
//!
//! let report = analyzer::detect(&layout).unwrap();
//! println!("{} public leaks", report.leaks.len());
//!
//! let outcome = Driver::new(&layout).run().unwrap();
//! println!("moved {}, rewrote {}", outcome.moved(), outcome.edited());
//! ```

pub mod analyzer;
pub mod driver;
pub mod error;
pub mod graph;
pub mod layout;
pub mod resolver;
pub mod rewriter;
pub mod scanner;

// Re-export commonly used types at crate root
pub use analyzer::{DetectionResult, Diagnostics, IncludeFix, Move};
pub use error::IncludeError;
pub use graph::IncludeGraph;
pub use scanner::IncludeDirective;
