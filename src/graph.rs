//! Include dependency graph.
//!
//! One node per file, one edge per includer → included pair. The graph is a
//! snapshot of the tree at build time: any move or rewrite invalidates it and
//! the caller builds a new one.
//!
//! Two directives in one file that resolve to the same target share an
//! edge, but each is kept in the directive list so its text can be checked.
//!
//! Cycles are ordinary structure here (`a.h` ↔ `b.h` through include guards is
//! common), so every traversal tracks visited nodes.

use crate::layout::Layout;
use crate::resolver;
use crate::scanner;
use anyhow::Result;
use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Dfs, EdgeRef, Reversed};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

/// A file seen during the scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileNode {
    pub path: PathBuf,
    /// The file itself was parsed, not just referenced.
    pub known: bool,
    /// The file lies under the public-include root.
    pub public: bool,
}

/// How one file includes another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IncludeEdge {
    /// Literal text written between the delimiters.
    pub include_path: String,
    pub angle_include: bool,
    /// Line of the directive in the includer, 1-indexed.
    pub line: usize,
}

#[derive(Debug, Default)]
pub struct IncludeGraph {
    graph: DiGraph<FileNode, IncludeEdge>,
    node_map: HashMap<PathBuf, NodeIndex>,
    /// Every resolved directive, in scan order.
    directives: Vec<(NodeIndex, NodeIndex, IncludeEdge)>,
    /// Directories parsed for this build, kept so later name lookups see
    /// the same tree the graph was built from.
    parse_dirs: Vec<PathBuf>,
    files_scanned: usize,
    includes_seen: usize,
}

impl IncludeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scans every parse directory of `layout` and links resolved includes.
    ///
    /// Includes that resolve nowhere are dropped as external. An ambiguous
    /// include aborts the build.
    pub fn build(layout: &Layout) -> Result<Self> {
        let parse_dirs = layout.parse_dirs()?;
        let mut graph = Self::new();

        for dir in &parse_dirs {
            for file in scanner::collect_sources(dir, &layout.extensions)? {
                let from = graph.mark_known(&file, layout.is_public(&file));
                graph.files_scanned += 1;

                for directive in scanner::extract_includes(&file)? {
                    graph.includes_seen += 1;
                    let dirs = layout.lookup_dirs(&file, directive.angle, &parse_dirs);
                    let fallback = layout.basename_fallback && !directive.angle;
                    let Some(target) = resolver::resolve(&directive.name, &dirs, fallback)? else {
                        continue;
                    };
                    let to = graph.ensure_node(&target, layout.is_public(&target));
                    graph.add_include(
                        from,
                        to,
                        IncludeEdge {
                            include_path: directive.name,
                            angle_include: directive.angle,
                            line: directive.line,
                        },
                    );
                }
            }
        }

        graph.parse_dirs = parse_dirs;
        Ok(graph)
    }

    /// Returns the node for `path`, creating an unparsed one if needed.
    pub fn ensure_node(&mut self, path: &Path, public: bool) -> NodeIndex {
        if let Some(&idx) = self.node_map.get(path) {
            return idx;
        }
        let idx = self.graph.add_node(FileNode {
            path: path.to_path_buf(),
            known: false,
            public,
        });
        self.node_map.insert(path.to_path_buf(), idx);
        idx
    }

    /// Returns the node for `path` with `known` set.
    pub fn mark_known(&mut self, path: &Path, public: bool) -> NodeIndex {
        let idx = self.ensure_node(path, public);
        self.graph[idx].known = true;
        idx
    }

    /// Records a directive and adds or overwrites the edge `from → to`.
    pub fn add_include(&mut self, from: NodeIndex, to: NodeIndex, edge: IncludeEdge) {
        self.directives.push((from, to, edge.clone()));
        self.graph.update_edge(from, to, edge);
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn files_scanned(&self) -> usize {
        self.files_scanned
    }

    pub fn includes_seen(&self) -> usize {
        self.includes_seen
    }

    pub fn parse_dirs(&self) -> &[PathBuf] {
        &self.parse_dirs
    }

    pub fn node_index(&self, path: &Path) -> Option<NodeIndex> {
        self.node_map.get(path).copied()
    }

    pub fn node(&self, idx: NodeIndex) -> &FileNode {
        &self.graph[idx]
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeIndex, &FileNode)> {
        self.graph
            .node_indices()
            .map(move |idx| (idx, &self.graph[idx]))
    }

    /// Every edge as `(includer, included, edge)`.
    pub fn edges(&self) -> impl Iterator<Item = (&FileNode, &FileNode, &IncludeEdge)> {
        self.graph
            .edge_references()
            .map(move |e| (&self.graph[e.source()], &self.graph[e.target()], e.weight()))
    }

    /// Every resolved directive as `(includer, included, directive)`,
    /// including ones that share an edge.
    pub fn directives(&self) -> impl Iterator<Item = (&FileNode, &FileNode, &IncludeEdge)> {
        self.directives
            .iter()
            .map(move |(from, to, edge)| (&self.graph[*from], &self.graph[*to], edge))
    }

    pub fn public_nodes(&self) -> BTreeSet<NodeIndex> {
        self.nodes()
            .filter(|(_, n)| n.public)
            .map(|(idx, _)| idx)
            .collect()
    }

    /// Seeds plus everything reachable from them along include edges.
    ///
    /// Depth-first, pre-order; the visited set is shared across seeds so each
    /// node is expanded once.
    pub fn reachable_from(&self, seeds: impl IntoIterator<Item = NodeIndex>) -> BTreeSet<NodeIndex> {
        let mut reached = BTreeSet::new();
        let mut dfs = Dfs::empty(&self.graph);
        for seed in seeds {
            dfs.move_to(seed);
            while let Some(idx) = dfs.next(&self.graph) {
                reached.insert(idx);
            }
        }
        reached
    }

    /// Nodes reachable from `start`, in DFS pre-order, starting with `start`.
    ///
    /// With `reversed` the edges are followed backwards, answering "who
    /// includes this file" instead of "what does this file include".
    pub fn reachable_from_single(&self, start: NodeIndex, reversed: bool) -> Vec<NodeIndex> {
        let mut order = Vec::new();
        if reversed {
            let rev = Reversed(&self.graph);
            let mut dfs = Dfs::new(rev, start);
            while let Some(idx) = dfs.next(rev) {
                order.push(idx);
            }
        } else {
            let mut dfs = Dfs::new(&self.graph, start);
            while let Some(idx) = dfs.next(&self.graph) {
                order.push(idx);
            }
        }
        order
    }

    /// Paths transitively included by `path`, excluding itself.
    pub fn includes_of(&self, path: &Path) -> Option<Vec<&Path>> {
        self.related(path, false)
    }

    /// Paths that transitively include `path`, excluding itself.
    pub fn included_by(&self, path: &Path) -> Option<Vec<&Path>> {
        self.related(path, true)
    }

    fn related(&self, path: &Path, reversed: bool) -> Option<Vec<&Path>> {
        let start = self.node_index(path)?;
        Some(
            self.reachable_from_single(start, reversed)
                .into_iter()
                .skip(1)
                .map(|idx| self.graph[idx].path.as_path())
                .collect(),
        )
    }

    /// Direct includers of a node.
    pub fn includers(&self, idx: NodeIndex) -> impl Iterator<Item = &FileNode> {
        self.graph
            .neighbors_directed(idx, Direction::Incoming)
            .map(move |n| &self.graph[n])
    }

    /// Node-link view of the graph for JSON output.
    pub fn snapshot(&self) -> GraphSnapshot {
        let nodes = self
            .graph
            .node_weights()
            .map(|n| SnapshotNode {
                id: n.path.display().to_string(),
                known: n.known,
                public: n.public,
            })
            .collect();
        let links = self
            .edges()
            .map(|(from, to, edge)| SnapshotLink {
                source: from.path.display().to_string(),
                target: to.path.display().to_string(),
                include_path: edge.include_path.clone(),
                angle_include: edge.angle_include,
                line: edge.line,
            })
            .collect();
        GraphSnapshot {
            directed: true,
            multigraph: false,
            nodes,
            links,
        }
    }
}

/// Serializable node-link form of an [`IncludeGraph`].
#[derive(Debug, Serialize)]
pub struct GraphSnapshot {
    pub directed: bool,
    pub multigraph: bool,
    pub nodes: Vec<SnapshotNode>,
    pub links: Vec<SnapshotLink>,
}

#[derive(Debug, Serialize)]
pub struct SnapshotNode {
    pub id: String,
    pub known: bool,
    pub public: bool,
}

#[derive(Debug, Serialize)]
pub struct SnapshotLink {
    pub source: String,
    pub target: String,
    pub include_path: String,
    pub angle_include: bool,
    pub line: usize,
}
