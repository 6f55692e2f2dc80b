//! incfix: enforce public-header closure and concise include paths.
//!
//! Scans a C/C++ tree's include graph, moves private headers that public
//! headers depend on into the public tree, and rewrites include directives
//! into their shortest resolvable form.

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use dialoguer::Confirm;
use incfix::analyzer::{self, DetectionResult};
use incfix::driver::{Driver, Pass, PassKind};
use incfix::graph::IncludeGraph;
use incfix::layout::Layout;
use incfix::scanner;
use incfix::{IncludeFix, Move};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

mod cli;

use cli::{Args, Commands, TreeArgs};

fn main() -> ExitCode {
    let args = Args::parse();

    match run(args) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{} {err:#}", "error:".red().bold());
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<ExitCode> {
    match args.command {
        Commands::Check {
            tree,
            json,
            verbose,
        } => cmd_check(&tree, json, verbose),
        Commands::Fix {
            tree,
            write,
            interactive,
            max_iterations,
            verbose,
        } => cmd_fix(&tree, write, interactive, max_iterations, verbose),
        Commands::Graph { tree, output } => cmd_graph(&tree, output),
        Commands::Deps {
            tree,
            file,
            reverse,
        } => cmd_deps(&tree, &file, reverse),
        Commands::Scan { tree } => cmd_scan(&tree),
    }
}

fn cmd_check(tree: &TreeArgs, json_output: bool, verbose: bool) -> Result<ExitCode> {
    let layout = tree.load(None)?;
    if verbose {
        print_layout(&layout)?;
    }

    let result = analyzer::detect(&layout)?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_detection_result(&result, &layout, verbose, false);
    }

    Ok(if result.is_clean() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn cmd_fix(
    tree: &TreeArgs,
    write: bool,
    interactive: bool,
    max_iterations: Option<usize>,
    verbose: bool,
) -> Result<ExitCode> {
    let layout = tree.load(max_iterations)?;
    if verbose {
        print_layout(&layout)?;
    }

    if !write {
        let result = analyzer::detect(&layout)?;
        print_detection_result(&result, &layout, verbose, true);
        if !result.is_clean() {
            println!("\n{} Use --write to apply changes", "hint:".cyan().bold());
        }
        return Ok(ExitCode::SUCCESS);
    }

    let outcome = Driver::new(&layout).run_with(|pass| {
        print_pass(pass, &layout);
        if interactive {
            Confirm::new()
                .with_prompt("Apply these changes?")
                .default(true)
                .interact()
                .context("Failed to read confirmation")
        } else {
            Ok(true)
        }
    })?;

    if outcome.is_noop() {
        println!("{} Tree is already at its fixed point", "ok:".green().bold());
    } else {
        println!(
            "\n{} Converged after {} iteration(s): {} file(s) moved, {} include(s) rewritten",
            "ok:".green().bold(),
            outcome.iterations,
            outcome.moved(),
            outcome.edited()
        );
    }

    Ok(ExitCode::SUCCESS)
}

fn cmd_graph(tree: &TreeArgs, output: Option<PathBuf>) -> Result<ExitCode> {
    let layout = tree.load(None)?;
    let graph = IncludeGraph::build(&layout)?;
    let json = serde_json::to_string_pretty(&graph.snapshot())?;

    match output {
        Some(path) => {
            std::fs::write(&path, json)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!(
                "{} Wrote {} nodes and {} links to {}",
                "info:".blue().bold(),
                graph.node_count(),
                graph.edge_count(),
                path.display()
            );
        }
        None => println!("{json}"),
    }

    Ok(ExitCode::SUCCESS)
}

fn cmd_deps(tree: &TreeArgs, file: &Path, reverse: bool) -> Result<ExitCode> {
    let layout = tree.load(None)?;
    let graph = IncludeGraph::build(&layout)?;
    let path = std::fs::canonicalize(file)
        .with_context(|| format!("Failed to resolve {}", file.display()))?;
    if !scanner::has_known_extension(&path, &layout.extensions) {
        anyhow::bail!(
            "{} is not a header or source file (known extensions: {})",
            file.display(),
            layout.extensions.join(", ")
        );
    }

    let related = if reverse {
        graph.included_by(&path)
    } else {
        graph.includes_of(&path)
    };
    let Some(related) = related else {
        anyhow::bail!("{} is not part of the include graph", file.display());
    };

    let heading = if reverse { "Included by" } else { "Includes" };
    println!("{} {} file(s):", heading.bold(), related.len());
    for p in related {
        println!("  {}", display_path(&layout, p));
    }

    Ok(ExitCode::SUCCESS)
}

fn cmd_scan(tree: &TreeArgs) -> Result<ExitCode> {
    let layout = tree.load(None)?;

    let mut files = Vec::new();
    for dir in layout.parse_dirs()? {
        files.extend(scanner::collect_sources(&dir, &layout.extensions)?);
    }

    println!("Would scan {} files:", files.len());
    for file in files {
        println!("  {}", display_path(&layout, &file));
    }

    Ok(ExitCode::SUCCESS)
}

fn display_path(layout: &Layout, path: &Path) -> String {
    path.strip_prefix(&layout.root)
        .unwrap_or(path)
        .display()
        .to_string()
}

fn print_layout(layout: &Layout) -> Result<()> {
    eprintln!(
        "{} Tree {} (public {}, private {})",
        "info:".blue().bold(),
        layout.root.display(),
        display_path(layout, &layout.public_root),
        display_path(layout, &layout.source_root)
    );
    eprintln!(
        "{} {} parse directories",
        "info:".blue().bold(),
        layout.parse_dirs()?.len()
    );
    if !layout.source_root.is_dir() {
        eprintln!(
            "{} Source root {} does not exist",
            "warn:".yellow().bold(),
            layout.source_root.display()
        );
    }
    Ok(())
}

fn print_detection_result(result: &DetectionResult, layout: &Layout, verbose: bool, dry_run: bool) {
    let d = &result.diagnostics;

    if verbose {
        println!(
            "\n{} Files: {}, Includes: {} ({} resolved), Public headers: {}",
            "Diagnostics:".bold(),
            d.files_scanned,
            d.total_includes,
            d.resolved_includes,
            d.public_headers
        );
        println!(
            "             Leaks: {}, Unreachable: {}, Text fixes: {}, Angle skipped: {}",
            d.public_leaks, d.possibly_public, d.text_fixes, d.angle_skipped
        );
    }

    if result.is_clean() {
        println!("{} No include problems found", "ok:".green().bold());
        return;
    }

    let verb = if dry_run { "Would move" } else { "Leaks" };
    print_moves(verb, "private header(s) reachable from public headers", &result.leaks, layout);
    print_moves(verb, "header(s) unreachable from their includers", &result.promotions, layout);

    if !result.fixes.is_empty() {
        let verb = if dry_run { "Would update" } else { "Found" };
        println!(
            "\n{} {} non-concise include(s):",
            verb.yellow().bold(),
            result.fixes.len()
        );
        print_fixes(&result.fixes, layout);
    }
}

fn print_moves(verb: &str, what: &str, moves: &[Move], layout: &Layout) {
    if moves.is_empty() {
        return;
    }
    println!("\n{} {} {}:", verb.red().bold(), moves.len(), what);
    for m in moves {
        println!(
            "  {} {} {}",
            display_path(layout, &m.from).red(),
            "->".green(),
            display_path(layout, &m.to).green()
        );
        for includer in &m.required_by {
            println!("    {} {}", "via".dimmed(), display_path(layout, includer).dimmed());
        }
    }
}

fn print_fixes(fixes: &[IncludeFix], layout: &Layout) {
    for fix in fixes {
        let loc = format!("{}:{}", display_path(layout, &fix.file), fix.line);
        println!(
            "  {} {} {} {}",
            loc.dimmed(),
            format!("\"{}\"", fix.old_text).red(),
            "->".green(),
            format!("\"{}\"", fix.new_text).green()
        );
    }
}

fn print_pass(pass: &Pass, layout: &Layout) {
    let label = match pass.kind {
        PassKind::PublicClosure => "Making reachable headers public",
        PassKind::Promotion => "Promoting unreachable headers",
        PassKind::IncludeText => "Rewriting includes",
    };
    println!(
        "\n{} {} (iteration {})",
        "Updating:".yellow().bold(),
        label,
        pass.iteration
    );
    for m in &pass.moves {
        println!(
            "  {} {} {}",
            display_path(layout, &m.from).red(),
            "->".green(),
            display_path(layout, &m.to).green()
        );
    }
    print_fixes(&pass.fixes, layout);
}
