//! Convergence loop.
//!
//! Each iteration builds a fresh graph, then runs at most one category of
//! correction before rebuilding:
//!
//! ```text
//! Start ──build──▶ EnsurePublicClosure ──no leaks──▶ CorrectIncludeText ──clean──▶ Done
//!   ▲                     │ moved                       │ promoted / rewrote
//!   └─────────────────────┴─────────────────────────────┘
//! ```
//!
//! Visibility always settles before include text is touched, since moving a
//! header changes how every include of it has to be written. Text fixes are
//! also held back while any include cannot be reached at all: those targets
//! get promoted first and the text is reconsidered on the next graph.

use crate::analyzer::{self, IncludeFix, Move};
use crate::error::IncludeError;
use crate::graph::IncludeGraph;
use crate::layout::Layout;
use crate::rewriter;
use anyhow::Result;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PassKind {
    /// Private headers reachable from public ones were moved.
    PublicClosure,
    /// Headers some includer could not reach were moved.
    Promotion,
    /// Include directives were rewritten to their shortest form.
    IncludeText,
}

/// One batch of mutations applied between two graph builds.
#[derive(Debug, Clone, Serialize)]
pub struct Pass {
    pub iteration: usize,
    pub kind: PassKind,
    pub moves: Vec<Move>,
    pub fixes: Vec<IncludeFix>,
}

#[derive(Debug, Default, Serialize)]
pub struct Outcome {
    /// Number of graph builds, including the final clean one.
    pub iterations: usize,
    pub passes: Vec<Pass>,
}

impl Outcome {
    pub fn moved(&self) -> usize {
        self.passes.iter().map(|p| p.moves.len()).sum()
    }

    pub fn edited(&self) -> usize {
        self.passes.iter().map(|p| p.fixes.len()).sum()
    }

    /// The tree was already at its fixed point.
    pub fn is_noop(&self) -> bool {
        self.passes.is_empty()
    }
}

enum State {
    Start,
    EnsurePublicClosure(IncludeGraph),
    CorrectIncludeText(IncludeGraph),
    Done,
}

pub struct Driver<'a> {
    layout: &'a Layout,
}

impl<'a> Driver<'a> {
    pub fn new(layout: &'a Layout) -> Self {
        Self { layout }
    }

    /// Runs to the fixed point, applying every pass.
    pub fn run(&self) -> Result<Outcome> {
        self.run_with(|_| Ok(true))
    }

    /// Runs to the fixed point, asking `confirm` before each pass is applied.
    ///
    /// A `false` answer stops the run with [`IncludeError::Aborted`]; the
    /// declined pass leaves the tree untouched.
    pub fn run_with<F>(&self, mut confirm: F) -> Result<Outcome>
    where
        F: FnMut(&Pass) -> Result<bool>,
    {
        let mut outcome = Outcome::default();
        let mut state = State::Start;

        loop {
            state = match state {
                State::Start => {
                    if outcome.iterations >= self.layout.max_iterations {
                        return Err(IncludeError::NonConvergence {
                            iterations: outcome.iterations,
                        }
                        .into());
                    }
                    outcome.iterations += 1;
                    State::EnsurePublicClosure(IncludeGraph::build(self.layout)?)
                }
                State::EnsurePublicClosure(graph) => {
                    let moves = analyzer::find_public_leaks(&graph, self.layout)?;
                    if moves.is_empty() {
                        State::CorrectIncludeText(graph)
                    } else {
                        self.apply(&mut outcome, &mut confirm, PassKind::PublicClosure, moves, Vec::new())?;
                        State::Start
                    }
                }
                State::CorrectIncludeText(graph) => {
                    let text = analyzer::find_include_fixes(&graph, self.layout);
                    if !text.possibly_public.is_empty() {
                        let moves =
                            analyzer::plan_promotions(&graph, &text.possibly_public, self.layout)?;
                        self.apply(&mut outcome, &mut confirm, PassKind::Promotion, moves, Vec::new())?;
                        State::Start
                    } else if !text.fixes.is_empty() {
                        self.apply(&mut outcome, &mut confirm, PassKind::IncludeText, Vec::new(), text.fixes)?;
                        State::Start
                    } else {
                        State::Done
                    }
                }
                State::Done => return Ok(outcome),
            };
        }
    }

    fn apply<F>(
        &self,
        outcome: &mut Outcome,
        confirm: &mut F,
        kind: PassKind,
        moves: Vec<Move>,
        fixes: Vec<IncludeFix>,
    ) -> Result<()>
    where
        F: FnMut(&Pass) -> Result<bool>,
    {
        let pass = Pass {
            iteration: outcome.iterations,
            kind,
            moves,
            fixes,
        };
        if !confirm(&pass)? {
            return Err(IncludeError::Aborted.into());
        }

        rewriter::apply_moves(&pass.moves)?;
        rewriter::apply_include_fixes(&pass.fixes)?;
        outcome.passes.push(pass);
        Ok(())
    }
}
