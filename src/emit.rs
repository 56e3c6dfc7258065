//! Orchestrates the tree-to-rules compilation: leaf paths are collected,
//! minimized into per-feature ranges and handed to an emission strategy that
//! turns them into match-action table entries.
//!
//! Two strategies are provided:
//! 1. `DirectEmitter`: one range-match entry per reachable leaf, matching the
//!    constrained features only, with strictly increasing priorities.
//! 2. `DecomposedEmitter`: interns each distinct `(feature, range)` into a
//!    small code (one range table per feature) and emits one exact-match entry
//!    per leaf keyed by the tuple of codes.
//!
//! Every run owns its emitter, so priorities and codes never leak between runs.

mod decomposed;
mod direct;

pub use decomposed::{DecomposedEmitter, RangeOverlap};
pub use direct::DirectEmitter;

use crate::config::{CompilerConfig, Strategy};
use crate::error::Result;
use crate::minimize::{LeafRule, Minimized, Range, RangeMinimizer};
use crate::paths::LeafPaths;
use crate::results::CompileSummary;
use crate::tree::DecisionTree;

/// One key column of an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchField {
    /// Range match on the registry feature at position `feature`.
    Range { feature: usize, range: Range },
    /// Exact match on a code.
    Exact(u32),
}

/// Which table an entry populates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// Direct strategy: full classification in one range-match lookup.
    Classify,
    /// Decomposed strategy: range table of one feature, yielding a code.
    FeatureCode { feature: usize },
    /// Decomposed strategy: exact-match composition of codes.
    Composition,
}

/// A single match-action table line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub kind: EntryKind,
    pub table: String,
    pub action: String,
    pub matches: Vec<MatchField>,
    pub params: Vec<i64>,
    /// Present for range-match tables only.
    pub priority: Option<u32>,
}

/// Turns minimized leaves into table entries, in leaf-visitation order.
pub trait EmitStrategy {
    fn strategy(&self) -> Strategy;

    /// Appends the entries produced by `rule` to `entries`.
    fn emit(&mut self, rule: &LeafRule, entries: &mut Vec<Entry>);

    /// Hook invoked once every leaf has been emitted.
    fn finish(&mut self, _summary: &mut CompileSummary) {}
}

/// Result of one compilation run.
#[derive(Debug, Clone)]
pub struct Compilation {
    pub strategy: Strategy,
    pub entries: Vec<Entry>,
    pub summary: CompileSummary,
}

/// Compiles `tree` with `strategy` against the registry and tables of `config`.
///
/// # Errors
/// `UnknownFeature` when a path tests a feature the registry does not know.
/// Unreachable leaves are skipped and counted, never reported as errors.
pub fn compile(tree: &DecisionTree, config: &CompilerConfig, strategy: Strategy) -> Result<Compilation> {
    match strategy {
        Strategy::Direct => {
            let mut emitter = DirectEmitter::new(&config.features, &config.tables);
            compile_with(tree, config, &mut emitter)
        }
        Strategy::Decomposed => {
            let mut emitter = DecomposedEmitter::new(&config.features, &config.tables);
            compile_with(tree, config, &mut emitter)
        }
    }
}

/// Runs the pipeline with a caller-provided emitter.
pub fn compile_with<E: EmitStrategy>(tree: &DecisionTree, config: &CompilerConfig, emitter: &mut E) -> Result<Compilation> {
    let minimizer = RangeMinimizer::new(tree, &config.features);
    let mut entries = Vec::new();
    let mut summary = CompileSummary::new(emitter.strategy());

    for path in LeafPaths::new(tree) {
        summary.leaves += 1;
        match minimizer.minimize(&path)? {
            Minimized::Reachable(rule) => {
                emitter.emit(&rule, &mut entries);
                summary.reachable += 1;
            }
            Minimized::Unreachable { leaf, feature } => {
                log::debug!("Leaf {} is unreachable: empty range for feature '{}'", leaf, feature);
                summary.unreachable += 1;
            }
        }
    }

    summary.entries = entries.len();
    emitter.finish(&mut summary);
    log::info!(
        "Compiled {} leaves ({} unreachable) into {} entries with the {} strategy",
        summary.leaves,
        summary.unreachable,
        summary.entries,
        summary.strategy
    );

    Ok(Compilation { strategy: emitter.strategy(), entries, summary })
}
