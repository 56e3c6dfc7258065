//! Software model of the switch tables populated by the emitted entries, used
//! to check that a compiled rule set classifies like the tree it came from.
//!
//! Range-match lookups select, among matching entries, the one with the lowest
//! priority value. For rule sets compiled from a well-formed tree at most one
//! direct entry matches any input, so the choice only matters for decomposed
//! range tables whose ranges overlap.

use std::collections::HashMap;

use crate::config::FeatureRegistry;
use crate::emit::{Entry, EntryKind, MatchField};
use crate::minimize::Range;
use crate::predict::Sample;
use crate::tree::DecisionTree;
use crate::utils::floor_threshold;

/// Tables rebuilt from a flat entry list.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    /// Direct entries: `(priority, ranges, label)`.
    classify: Vec<(u32, Vec<(usize, Range)>, i64)>,
    /// Per registry feature: `(priority, range, code)`.
    feature_codes: Vec<Vec<(u32, Range, u32)>>,
    composition: HashMap<Vec<u32>, i64>,
}

impl RuleSet {
    pub fn from_entries(entries: &[Entry], feature_count: usize) -> Self {
        let mut rules = RuleSet { feature_codes: vec![Vec::new(); feature_count], ..RuleSet::default() };

        for entry in entries {
            let label = entry.params.first().copied().unwrap_or_default();
            let priority = entry.priority.unwrap_or(u32::MAX);
            match entry.kind {
                EntryKind::Classify => {
                    let ranges = entry
                        .matches
                        .iter()
                        .filter_map(|m| match *m {
                            MatchField::Range { feature, range } => Some((feature, range)),
                            MatchField::Exact(_) => None,
                        })
                        .collect();
                    rules.classify.push((priority, ranges, label));
                }
                EntryKind::FeatureCode { feature } => {
                    for m in &entry.matches {
                        if let MatchField::Range { range, .. } = *m {
                            rules.feature_codes[feature].push((priority, range, label as u32));
                        }
                    }
                }
                EntryKind::Composition => {
                    let key = entry
                        .matches
                        .iter()
                        .filter_map(|m| match *m {
                            MatchField::Exact(code) => Some(code),
                            MatchField::Range { .. } => None,
                        })
                        .collect();
                    rules.composition.insert(key, label);
                }
            }
        }
        rules
    }

    /// Classifies one input given in registry feature order. `None` is a table miss.
    pub fn classify(&self, values: &[i64]) -> Option<i64> {
        if !self.classify.is_empty() {
            return self
                .classify
                .iter()
                .filter(|(_, ranges, _)| ranges.iter().all(|(feature, range)| range.contains(values[*feature])))
                .min_by_key(|(priority, _, _)| *priority)
                .map(|(_, _, label)| *label);
        }

        let mut key = Vec::with_capacity(self.feature_codes.len());
        for (feature, table) in self.feature_codes.iter().enumerate() {
            let code = table
                .iter()
                .filter(|(_, range, _)| range.contains(values[feature]))
                .min_by_key(|(priority, _, _)| *priority)
                .map(|(_, _, code)| *code)?;
            key.push(code);
        }
        self.composition.get(&key).copied()
    }
}

/// A sample on which the rules and the tree disagree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mismatch {
    pub row: usize,
    pub tree_label: i64,
    /// `None` when no entry matched.
    pub rule_label: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerifyReport {
    pub checked: usize,
    pub mismatches: Vec<Mismatch>,
}

impl VerifyReport {
    pub fn is_equivalent(&self) -> bool {
        self.mismatches.is_empty()
    }
}

/// Runs every sample through both the tree and the rule set.
///
/// Feature values are floored first, as the switch only sees integers; the
/// tree is evaluated on the same floored values. Registry features the tree
/// does not know are fed their domain minimum.
pub fn verify(tree: &DecisionTree, registry: &FeatureRegistry, entries: &[Entry], samples: &[Sample]) -> VerifyReport {
    let rules = RuleSet::from_entries(entries, registry.len());
    let columns: Vec<Option<usize>> =
        registry.iter().map(|domain| tree.feature_names().iter().position(|name| *name == domain.name)).collect();

    let mut report = VerifyReport::default();
    for (row, sample) in samples.iter().enumerate() {
        let floored: Vec<f64> = sample.values.iter().map(|&v| floor_threshold(v) as f64).collect();
        let switch_values: Vec<i64> = columns
            .iter()
            .enumerate()
            .map(|(feature, column)| match column {
                Some(col) => floored.get(*col).map(|&v| v as i64).unwrap_or(0),
                None => registry.get(feature).min,
            })
            .collect();

        let tree_label = tree.predict(&floored);
        let rule_label = rules.classify(&switch_values);
        report.checked += 1;
        if rule_label != Some(tree_label) {
            report.mismatches.push(Mismatch { row, tree_label, rule_label });
        }
    }
    report
}
