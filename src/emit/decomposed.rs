//! Decomposed strategy: per-feature range tables producing interned codes,
//! followed by one exact-match composition table keyed by the code tuple.

use rustc_hash::{FxBuildHasher, FxHashMap};

use crate::config::{FeatureRegistry, Strategy, TableNames};
use crate::minimize::{LeafRule, Range};
use crate::results::CompileSummary;

use super::{EmitStrategy, Entry, EntryKind, MatchField};

/// Two distinct ranges interned for the same feature that share at least one
/// value. A packet in the shared span can only ever receive one of the codes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeOverlap {
    pub feature: String,
    pub first: (u32, Range),
    pub second: (u32, Range),
}

/// Interns `(feature, range)` pairs into codes in first-seen order, starting
/// at 1. Every feature appears in every composition key: an unconstrained
/// feature is interned as its full domain.
pub struct DecomposedEmitter<'a> {
    registry: &'a FeatureRegistry,
    tables: &'a TableNames,
    codes: FxHashMap<(usize, Range), u32>,
    /// Interned ranges per registry feature, in allocation order.
    ranges_by_feature: Vec<Vec<(u32, Range)>>,
    next_code: u32,
    composition_entries: usize,
    overlaps: Vec<RangeOverlap>,
}

impl<'a> DecomposedEmitter<'a> {
    pub fn new(registry: &'a FeatureRegistry, tables: &'a TableNames) -> Self {
        DecomposedEmitter {
            registry,
            tables,
            codes: FxHashMap::with_capacity_and_hasher(64, FxBuildHasher::default()),
            ranges_by_feature: vec![Vec::new(); registry.len()],
            next_code: 1,
            composition_entries: 0,
            overlaps: Vec::new(),
        }
    }

    /// Returns the code of `(feature, range)`, emitting a range-table entry the
    /// first time the pair is seen.
    fn intern(&mut self, feature: usize, range: Range, entries: &mut Vec<Entry>) -> u32 {
        if let Some(&code) = self.codes.get(&(feature, range)) {
            return code;
        }

        let code = self.next_code;
        self.next_code += 1;
        self.codes.insert((feature, range), code);
        self.ranges_by_feature[feature].push((code, range));

        let name = &self.registry.get(feature).name;
        entries.push(Entry {
            kind: EntryKind::FeatureCode { feature },
            table: self.tables.feature_table(name),
            action: self.tables.feature_action(name),
            matches: vec![MatchField::Range { feature, range }],
            params: vec![code as i64],
            priority: Some(code),
        });
        code
    }

    /// Number of distinct `(feature, range)` pairs interned so far.
    pub fn distinct_codes(&self) -> usize {
        self.codes.len()
    }

    /// Overlapping ranges found by the last `finish`.
    pub fn overlaps(&self) -> &[RangeOverlap] {
        &self.overlaps
    }

    fn find_overlaps(&self) -> Vec<RangeOverlap> {
        let mut overlaps = Vec::new();
        for (feature, interned) in self.ranges_by_feature.iter().enumerate() {
            let mut sorted = interned.clone();
            sorted.sort_by_key(|&(code, range)| (range.lo, range.hi, code));
            for (i, &(code_a, a)) in sorted.iter().enumerate() {
                // Sorted by `lo`: once `b.lo > a.hi`, no later range can overlap `a`.
                for &(code_b, b) in sorted[i + 1..].iter().take_while(|(_, b)| b.lo <= a.hi) {
                    let (first, second) = if code_a < code_b { ((code_a, a), (code_b, b)) } else { ((code_b, b), (code_a, a)) };
                    overlaps.push(RangeOverlap { feature: self.registry.get(feature).name.clone(), first, second });
                }
            }
        }
        overlaps.sort_by_key(|o| (o.first.0, o.second.0));
        overlaps
    }
}

impl EmitStrategy for DecomposedEmitter<'_> {
    fn strategy(&self) -> Strategy {
        Strategy::Decomposed
    }

    fn emit(&mut self, rule: &LeafRule, entries: &mut Vec<Entry>) {
        let mut key = Vec::with_capacity(self.registry.len());
        for feature in 0..self.registry.len() {
            let range = rule.range_or_domain(feature, self.registry);
            key.push(MatchField::Exact(self.intern(feature, range, entries)));
        }

        entries.push(Entry {
            kind: EntryKind::Composition,
            table: self.tables.code_table.clone(),
            action: self.tables.code_action.clone(),
            matches: key,
            params: vec![rule.label],
            priority: None,
        });
        self.composition_entries += 1;
    }

    fn finish(&mut self, summary: &mut CompileSummary) {
        self.overlaps = self.find_overlaps();
        for overlap in &self.overlaps {
            log::warn!(
                "Feature '{}': range {} (code {}) overlaps range {} (code {}); the shared span always resolves to one code",
                overlap.feature,
                overlap.first.1,
                overlap.first.0,
                overlap.second.1,
                overlap.second.0
            );
        }
        summary.range_entries = self.codes.len();
        summary.code_entries = self.composition_entries;
        summary.distinct_codes = self.codes.len();
        summary.overlapping_ranges = self.overlaps.len();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(ranges: Vec<Option<Range>>, label: i64) -> LeafRule {
        LeafRule { leaf: 0, ranges, label }
    }

    fn codes_of(entry: &Entry) -> Vec<u32> {
        entry
            .matches
            .iter()
            .map(|m| match m {
                MatchField::Exact(code) => *code,
                other => panic!("composition key holds a non-exact field: {other:?}"),
            })
            .collect()
    }

    #[test]
    fn test_first_leaf_allocates_one_code_per_feature() {
        let registry = FeatureRegistry::default();
        let tables = TableNames::default();
        let mut emitter = DecomposedEmitter::new(&registry, &tables);
        let mut entries = Vec::new();

        emitter.emit(&rule(vec![None, Some(Range::new(0, 40)), None], 0), &mut entries);

        assert_eq!(entries.len(), 4);
        assert_eq!(entries[0].table, "ml_feature_iat");
        assert_eq!(entries[0].action, "set_code_iat");
        assert_eq!(entries[0].matches, vec![MatchField::Range { feature: 0, range: Range::new(0, 100_000_000_000) }]);
        assert_eq!(entries[1].table, "ml_feature_len");
        assert_eq!(entries[1].params, vec![2]);
        assert_eq!(entries[1].priority, Some(2));
        assert_eq!(entries[2].kind, EntryKind::FeatureCode { feature: 2 });
        assert_eq!(entries[3].kind, EntryKind::Composition);
        assert_eq!(entries[3].table, "ml_code");
        assert_eq!(codes_of(&entries[3]), vec![1, 2, 3]);
        assert_eq!(entries[3].params, vec![0]);
        assert_eq!(entries[3].priority, None);
    }

    #[test]
    fn test_shared_ranges_reuse_codes() {
        let registry = FeatureRegistry::default();
        let tables = TableNames::default();
        let mut emitter = DecomposedEmitter::new(&registry, &tables);
        let mut entries = Vec::new();

        emitter.emit(&rule(vec![Some(Range::new(0, 10)), Some(Range::new(0, 40)), None], 0), &mut entries);
        emitter.emit(&rule(vec![Some(Range::new(0, 10)), Some(Range::new(41, 65535)), None], 1), &mut entries);

        // Second leaf only introduces the new `len` range.
        assert_eq!(entries.len(), 4 + 2);
        assert_eq!(entries[4].matches, vec![MatchField::Range { feature: 1, range: Range::new(41, 65535) }]);
        assert_eq!(entries[4].priority, Some(4));
        assert_eq!(codes_of(&entries[5]), vec![1, 4, 3]);
        assert_eq!(emitter.distinct_codes(), 4);
    }

    #[test]
    fn test_overlaps_are_reported() {
        let registry = FeatureRegistry::default();
        let tables = TableNames::default();
        let mut emitter = DecomposedEmitter::new(&registry, &tables);
        let mut entries = Vec::new();

        emitter.emit(&rule(vec![None, Some(Range::new(0, 40)), None], 0), &mut entries);
        emitter.emit(&rule(vec![None, Some(Range::new(41, 65535)), None], 1), &mut entries);
        // `len` left unconstrained: its full domain overlaps both split ranges.
        emitter.emit(&rule(vec![Some(Range::new(5, 9)), None, None], 2), &mut entries);

        let mut summary = CompileSummary::new(Strategy::Decomposed);
        emitter.finish(&mut summary);

        let overlaps = emitter.overlaps();
        assert_eq!(overlaps.len(), 3);
        assert!(overlaps.iter().all(|o| o.feature == "len" || o.feature == "iat"));
        assert_eq!(overlaps[0].feature, "iat");
        assert_eq!(overlaps[0].first, (1, Range::new(0, 100_000_000_000)));
        assert_eq!(overlaps[0].second, (5, Range::new(5, 9)));
        assert_eq!(summary.overlapping_ranges, 3);
        assert_eq!(summary.code_entries, 3);
        assert_eq!(summary.distinct_codes, 6);
        assert_eq!(summary.range_entries, 6);
    }

    #[test]
    fn test_disjoint_ranges_have_no_overlap() {
        let registry = FeatureRegistry::default();
        let tables = TableNames::default();
        let mut emitter = DecomposedEmitter::new(&registry, &tables);
        let mut entries = Vec::new();

        emitter.emit(&rule(vec![Some(Range::new(0, 10)), Some(Range::new(0, 40)), Some(Range::new(0, 131070))], 0), &mut entries);
        emitter.emit(&rule(vec![Some(Range::new(11, 100_000_000_000)), Some(Range::new(41, 65535)), Some(Range::new(0, 131070))], 1), &mut entries);

        let mut summary = CompileSummary::new(Strategy::Decomposed);
        emitter.finish(&mut summary);
        assert!(emitter.overlaps().is_empty());
        assert_eq!(summary.distinct_codes, 5);
    }
}
