//! Visibility and include-text analysis.
//!
//! Works on one graph snapshot and only plans: which private headers leak
//! through the public tree, which include directives are not written in their
//! shortest form, and which included files cannot be reached from their
//! includer at all. Applying the plan is the rewriter's job.

use crate::graph::IncludeGraph;
use crate::layout::Layout;
use crate::resolver;
use anyhow::Result;
use petgraph::graph::NodeIndex;
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Relocation of a private file into the public tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Move {
    pub from: PathBuf,
    pub to: PathBuf,
    /// Includers that make the move necessary.
    pub required_by: Vec<PathBuf>,
}

/// A directive to rewrite in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IncludeFix {
    pub file: PathBuf,
    pub line: usize,
    pub old_text: String,
    pub new_text: String,
}

/// Result of checking every include's written form.
#[derive(Debug, Default, Serialize)]
pub struct TextAnalysis {
    pub fixes: Vec<IncludeFix>,
    /// Included files no search-path directory of their includer can reach.
    pub possibly_public: BTreeSet<PathBuf>,
    /// Angle includes whose text differs from the shortest form. Left alone.
    pub angle_skipped: usize,
}

/// Summary statistics from a detection run.
#[derive(Debug, Default, Serialize)]
pub struct Diagnostics {
    pub files_scanned: usize,
    pub total_includes: usize,
    pub resolved_includes: usize,
    pub public_headers: usize,
    pub public_leaks: usize,
    pub text_fixes: usize,
    pub possibly_public: usize,
    pub angle_skipped: usize,
}

/// Complete detection results for one pass over the tree.
#[derive(Debug, Serialize)]
pub struct DetectionResult {
    pub leaks: Vec<Move>,
    pub promotions: Vec<Move>,
    pub fixes: Vec<IncludeFix>,
    pub diagnostics: Diagnostics,
}

impl DetectionResult {
    pub fn is_clean(&self) -> bool {
        self.leaks.is_empty() && self.promotions.is_empty() && self.fixes.is_empty()
    }
}

/// Private files reachable from some public header, with their destinations.
///
/// Files under an external include root are exempt. A reachable file that
/// is neither external nor under the source root cannot be moved and fails
/// the analysis.
pub fn find_public_leaks(graph: &IncludeGraph, layout: &Layout) -> Result<Vec<Move>> {
    let public = graph.public_nodes();
    let transitive = graph.reachable_from(public.iter().copied());

    let mut moves = Vec::new();
    for &idx in transitive.difference(&public) {
        let node = graph.node(idx);
        if layout.is_external(&node.path) {
            continue;
        }
        moves.push(Move {
            from: node.path.clone(),
            to: layout.public_destination(&node.path)?,
            required_by: includers_within(graph, idx, &transitive),
        });
    }

    moves.sort_by(|a, b| a.from.cmp(&b.from));
    Ok(moves)
}

fn includers_within(graph: &IncludeGraph, idx: NodeIndex, set: &BTreeSet<NodeIndex>) -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = graph
        .includers(idx)
        .filter(|n| graph.node_index(&n.path).is_some_and(|i| set.contains(&i)))
        .map(|n| n.path.clone())
        .collect();
    paths.sort();
    paths
}

/// Compares each include's written text against its shortest valid form.
///
/// Quote includes are expressed relative to the includer's directory first,
/// then the global roots; angle includes only against the global roots and
/// are never rewritten. Includes of unparsed files are skipped.
///
/// A shorter text is only proposed if the graph builder would resolve it
/// back to the same file, without ambiguity. When no candidate qualifies the
/// written text stays.
pub fn find_include_fixes(graph: &IncludeGraph, layout: &Layout) -> TextAnalysis {
    let mut analysis = TextAnalysis::default();

    for (includer, included, edge) in graph.directives() {
        if !included.known {
            continue;
        }

        let search_path = layout.search_path(&includer.path, edge.angle_include);
        let candidates = resolver::relative_includes(&included.path, &search_path);
        if candidates.is_empty() {
            analysis.possibly_public.insert(included.path.clone());
            continue;
        }

        let lookup = layout.lookup_dirs(&includer.path, edge.angle_include, graph.parse_dirs());
        let fallback = layout.basename_fallback && !edge.angle_include;
        let Some(best) = candidates
            .into_iter()
            .find(|text| resolves_to(text, &lookup, fallback, &included.path))
        else {
            continue;
        };

        if best == edge.include_path {
            continue;
        }
        if edge.angle_include {
            analysis.angle_skipped += 1;
            continue;
        }
        analysis.fixes.push(IncludeFix {
            file: includer.path.clone(),
            line: edge.line,
            old_text: edge.include_path.clone(),
            new_text: best,
        });
    }

    analysis
        .fixes
        .sort_by(|a, b| (&a.file, a.line).cmp(&(&b.file, b.line)));
    analysis
}

fn resolves_to(text: &str, dirs: &[PathBuf], fallback: bool, target: &Path) -> bool {
    matches!(resolver::resolve(text, dirs, fallback), Ok(Some(found)) if found == target)
}

/// Moves that make each of `paths` public, listing the includers that
/// could not reach it.
pub fn plan_promotions(
    graph: &IncludeGraph,
    paths: &BTreeSet<PathBuf>,
    layout: &Layout,
) -> Result<Vec<Move>> {
    paths
        .iter()
        .map(|path| {
            Ok(Move {
                from: path.clone(),
                to: layout.public_destination(path)?,
                required_by: direct_includers(graph, path),
            })
        })
        .collect()
}

fn direct_includers(graph: &IncludeGraph, path: &Path) -> Vec<PathBuf> {
    let Some(idx) = graph.node_index(path) else {
        return Vec::new();
    };
    let mut paths: Vec<PathBuf> = graph.includers(idx).map(|n| n.path.clone()).collect();
    paths.sort();
    paths
}

/// Builds the graph once and reports everything a fix run would address
/// first, without touching the tree.
pub fn detect(layout: &Layout) -> Result<DetectionResult> {
    let graph = IncludeGraph::build(layout)?;
    let leaks = find_public_leaks(&graph, layout)?;
    let text = find_include_fixes(&graph, layout);
    let promotions = plan_promotions(&graph, &text.possibly_public, layout)?;

    let diagnostics = Diagnostics {
        files_scanned: graph.files_scanned(),
        total_includes: graph.includes_seen(),
        resolved_includes: graph.directives().count(),
        public_headers: graph.public_nodes().len(),
        public_leaks: leaks.len(),
        text_fixes: text.fixes.len(),
        possibly_public: text.possibly_public.len(),
        angle_skipped: text.angle_skipped,
    };

    Ok(DetectionResult {
        leaks,
        promotions,
        fixes: text.fixes,
        diagnostics,
    })
}
