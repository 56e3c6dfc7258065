//! Direct strategy: one range-match entry per reachable leaf.

use crate::config::{FeatureRegistry, Strategy, TableNames};
use crate::minimize::LeafRule;
use crate::results::CompileSummary;

use super::{EmitStrategy, Entry, EntryKind, MatchField};

/// Emits `table_add <table> <action> <ranges...> => <label> <priority>` lines.
///
/// Only features constrained on the leaf's path appear in the key, in
/// registry order. A leaf with no constraint at all (a tree that is a single
/// leaf) matches the full domain of every feature instead, since a key with
/// no field cannot be installed.
pub struct DirectEmitter<'a> {
    registry: &'a FeatureRegistry,
    tables: &'a TableNames,
    /// Priority of the next entry. Starts at 1, one per emitted entry.
    next_priority: u32,
}

impl<'a> DirectEmitter<'a> {
    pub fn new(registry: &'a FeatureRegistry, tables: &'a TableNames) -> Self {
        DirectEmitter { registry, tables, next_priority: 1 }
    }
}

impl EmitStrategy for DirectEmitter<'_> {
    fn strategy(&self) -> Strategy {
        Strategy::Direct
    }

    fn emit(&mut self, rule: &LeafRule, entries: &mut Vec<Entry>) {
        let matches: Vec<MatchField> = if rule.constrained_count() == 0 {
            (0..self.registry.len())
                .map(|feature| MatchField::Range { feature, range: rule.range_or_domain(feature, self.registry) })
                .collect()
        } else {
            rule.ranges
                .iter()
                .enumerate()
                .filter_map(|(feature, range)| range.map(|range| MatchField::Range { feature, range }))
                .collect()
        };

        let priority = self.next_priority;
        self.next_priority += 1;

        entries.push(Entry {
            kind: EntryKind::Classify,
            table: self.tables.direct_table.clone(),
            action: self.tables.direct_action.clone(),
            matches,
            params: vec![rule.label],
            priority: Some(priority),
        });
    }

    fn finish(&mut self, summary: &mut CompileSummary) {
        summary.range_entries = (self.next_priority - 1) as usize;
    }
}
