//! End-to-end runs of the convergence loop against on-disk trees.

use incfix::driver::{Driver, PassKind};
use incfix::graph::IncludeGraph;
use incfix::layout::Layout;
use incfix::{IncludeError, analyzer, resolver};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use walkdir::WalkDir;

fn fixture(name: &str) -> (TempDir, Layout) {
    let src = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name);
    let tmp = TempDir::new().unwrap();
    for entry in WalkDir::new(&src) {
        let entry = entry.unwrap();
        let dest = tmp.path().join(entry.path().strip_prefix(&src).unwrap());
        if entry.file_type().is_dir() {
            fs::create_dir_all(&dest).unwrap();
        } else {
            fs::copy(entry.path(), &dest).unwrap();
        }
    }
    let layout = Layout::new(tmp.path()).unwrap();
    (tmp, layout)
}

fn write_tree(files: &[(&str, &str)]) -> (TempDir, Layout) {
    let tmp = TempDir::new().unwrap();
    for (rel, content) in files {
        let path = tmp.path().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }
    let layout = Layout::new(tmp.path()).unwrap();
    (tmp, layout)
}

/// Relative path → contents for every file under `root`.
fn contents(root: &Path) -> BTreeMap<PathBuf, String> {
    WalkDir::new(root)
        .into_iter()
        .map(|e| e.unwrap())
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            (
                e.path().strip_prefix(root).unwrap().to_path_buf(),
                fs::read_to_string(e.path()).unwrap(),
            )
        })
        .collect()
}

fn assert_public_closure(layout: &Layout) {
    let graph = IncludeGraph::build(layout).unwrap();
    let public = graph.public_nodes();
    for idx in graph.reachable_from(public.iter().copied()) {
        let node = graph.node(idx);
        assert!(node.public, "{} reachable from a public header", node.path.display());
    }
}

#[test]
fn tracker_converges() {
    let (_tmp, layout) = fixture("tracker");
    let outcome = Driver::new(&layout).run().unwrap();

    let kinds: Vec<_> = outcome.passes.iter().map(|p| p.kind).collect();
    assert_eq!(
        kinds,
        vec![PassKind::PublicClosure, PassKind::Promotion, PassKind::IncludeText]
    );
    assert_eq!(outcome.iterations, 4);
    assert_eq!(outcome.moved(), 3);
    assert_eq!(outcome.edited(), 4);

    for moved in ["tracking/BodyTarget.h", "tracking/Clamp.h", "shared/BlobExtractor.h"] {
        assert!(layout.public_root.join(moved).is_file(), "{moved} not public");
        assert!(!layout.source_root.join(moved).exists(), "{moved} left behind");
    }

    assert_public_closure(&layout);
}

#[test]
fn rewrites_only_directive_lines() {
    let (_tmp, layout) = fixture("tracker");
    Driver::new(&layout).run().unwrap();

    let cpp = fs::read_to_string(layout.source_root.join("tracking/TrackingSystem.cpp")).unwrap();
    let expected = r#"#include "tracking/TrackingSystem.h"
#include "tracking/Clamp.h"
#include "shared/BlobExtractor.h"
// #include "tracking/Unused.h"

#include <Eigen/Core>
#include <vector>

namespace tracking {
// Keep "TrackingSystem.h" in this comment untouched.
void update(TrackingSystem &sys) { (void)shared::extractBlob(); }
} // namespace tracking
"#;
    assert_eq!(cpp, expected);

    let camera = fs::read_to_string(layout.public_root.join("shared/CameraParams.h")).unwrap();
    assert!(camera.contains("#include \"Types.h\"\n"));
    let blob_cpp = fs::read_to_string(layout.source_root.join("shared/BlobExtractor.cpp")).unwrap();
    assert!(blob_cpp.starts_with("#include \"shared/BlobExtractor.h\"\n"));
}

#[test]
fn second_run_is_a_no_op() {
    let (tmp, layout) = fixture("tracker");
    Driver::new(&layout).run().unwrap();
    let before = contents(tmp.path());

    let outcome = Driver::new(&layout).run().unwrap();
    assert!(outcome.is_noop());
    assert_eq!(outcome.iterations, 1);
    assert_eq!(contents(tmp.path()), before);
    assert!(analyzer::detect(&layout).unwrap().is_clean());
}

#[test]
fn promotion_pass_applies_no_text_fixes() {
    let (_tmp, layout) = fixture("tracker");
    let mut seen = Vec::new();
    Driver::new(&layout)
        .run_with(|pass| {
            seen.push((pass.kind, pass.iteration, pass.fixes.len()));
            Ok(true)
        })
        .unwrap();

    assert_eq!(
        seen,
        vec![
            (PassKind::PublicClosure, 1, 0),
            (PassKind::Promotion, 2, 0),
            (PassKind::IncludeText, 3, 4),
        ]
    );
}

#[test]
fn promotion_is_planned_while_text_fixes_are_pending() {
    let (_tmp, layout) = write_tree(&[
        ("inc/core/api.h", ""),
        ("src/io/reader.cpp", "#include \"core/api.h\"\n#include \"Clamp.h\"\n#include \"old/local.h\"\n"),
        ("src/io/local.h", ""),
        ("src/math/Clamp.h", ""),
    ]);
    let graph = IncludeGraph::build(&layout).unwrap();
    let text = analyzer::find_include_fixes(&graph, &layout);
    assert_eq!(text.possibly_public.len(), 1);
    assert_eq!(text.fixes.len(), 1);

    let before = contents(layout.root.as_path());
    let mut first = None;
    let _ = Driver::new(&layout).run_with(|pass| {
        first = Some((pass.kind, pass.fixes.len()));
        Ok(false)
    });
    assert_eq!(first, Some((PassKind::Promotion, 0)));
    assert_eq!(contents(layout.root.as_path()), before);
}

#[test]
fn corrected_text_resolves_to_the_same_file() {
    let (_tmp, layout) = fixture("tracker");
    let file_name = |p: &Path| p.file_name().unwrap().to_string_lossy().to_string();

    // Moves keep file names, so (includer, line) -> included name identifies
    // each include across the run.
    let before = IncludeGraph::build(&layout).unwrap();
    let targets: BTreeMap<(String, usize), String> = before
        .directives()
        .map(|(from, to, edge)| ((file_name(&from.path), edge.line), file_name(&to.path)))
        .collect();

    Driver::new(&layout).run().unwrap();

    let after = IncludeGraph::build(&layout).unwrap();
    assert_eq!(after.directives().count(), before.directives().count());
    for (includer, included, edge) in after.directives() {
        assert_eq!(
            targets[&(file_name(&includer.path), edge.line)],
            file_name(&included.path)
        );
        if edge.angle_include {
            continue;
        }
        let dirs = layout.lookup_dirs(&includer.path, false, after.parse_dirs());
        let resolved = resolver::resolve(&edge.include_path, &dirs, false)
            .unwrap()
            .unwrap_or_else(|| panic!("{} no longer resolves", edge.include_path));
        assert_eq!(resolved, included.path);
    }
}

#[test]
fn shortening_never_introduces_ambiguity() {
    let (tmp, layout) = write_tree(&[
        ("inc/core/api.h", "#include \"core/types.h\"\n"),
        ("inc/core/more.h", "#include \"../core/types.h\"\n"),
        ("inc/core/types.h", ""),
        ("src/io/types.h", ""),
    ]);

    let outcome = Driver::new(&layout).run().unwrap();
    assert_eq!(outcome.edited(), 1);
    assert_eq!(
        fs::read_to_string(layout.public_root.join("core/api.h")).unwrap(),
        "#include \"core/types.h\"\n"
    );
    assert_eq!(
        fs::read_to_string(layout.public_root.join("core/more.h")).unwrap(),
        "#include \"core/types.h\"\n"
    );

    let before = contents(tmp.path());
    assert!(Driver::new(&layout).run().unwrap().is_noop());
    assert_eq!(contents(tmp.path()), before);
}

#[test]
fn ambiguous_include_aborts_without_mutation() {
    let (tmp, layout) = write_tree(&[
        ("inc/core/api.h", "#include \"detail.h\"\n"),
        ("src/a/dup.h", ""),
        ("src/b/dup.h", ""),
        ("src/a/user.cpp", "#include \"dup.h\"\n"),
        ("src/core/detail.h", ""),
    ]);
    let before = contents(tmp.path());

    let err = Driver::new(&layout).run().unwrap_err();
    match err.downcast_ref::<IncludeError>() {
        Some(IncludeError::AmbiguousResolution { name, candidates }) => {
            assert_eq!(name, "dup.h");
            assert_eq!(
                candidates,
                &vec![
                    layout.source_root.join("a/dup.h"),
                    layout.source_root.join("b/dup.h"),
                ]
            );
        }
        other => panic!("expected ambiguity, got {other:?}"),
    }
    assert_eq!(contents(tmp.path()), before);
}

#[test]
fn include_cycle_terminates() {
    let (_tmp, layout) = write_tree(&[
        ("inc/core/A.h", "#pragma once\n#include \"B.h\"\n"),
        ("src/core/B.h", "#pragma once\n#include \"A.h\"\n"),
    ]);

    let graph = IncludeGraph::build(&layout).unwrap();
    let a = graph.node_index(&layout.public_root.join("core/A.h")).unwrap();
    let reached: Vec<_> = graph
        .reachable_from([a])
        .into_iter()
        .map(|i| graph.node(i).path.clone())
        .collect();
    assert_eq!(
        reached,
        vec![
            layout.public_root.join("core/A.h"),
            layout.source_root.join("core/B.h"),
        ]
    );

    let outcome = Driver::new(&layout).run().unwrap();
    assert_eq!(outcome.moved(), 1);
    assert_eq!(outcome.edited(), 0);
    assert!(layout.public_root.join("core/B.h").is_file());
    assert_public_closure(&layout);
}

#[test]
fn unpromotable_header_fails_the_run() {
    let tmp = TempDir::new().unwrap();
    for (rel, content) in [
        ("src/core/impl.cpp", "#include \"helpers.h\"\n"),
        ("tests/unit/helpers.h", ""),
        ("tests/unit/helpers_test.cpp", "#include \"helpers.h\"\n"),
    ] {
        let path = tmp.path().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }
    let config = incfix::layout::LayoutConfig {
        extra_dirs: vec![PathBuf::from("tests/unit")],
        ..Default::default()
    };
    let layout = Layout::from_config(tmp.path(), config).unwrap();

    let err = Driver::new(&layout).run().unwrap_err();
    assert!(matches!(
        err.downcast_ref::<IncludeError>(),
        Some(IncludeError::Unpromotable { .. })
    ));
}
