//! Human-readable listing of a tree: the thresholds used per feature, then one
//! `IF ... THEN ...` line per leaf, either with the raw split conditions or
//! with the minimized integer bounds.

use std::fs;
use std::path::Path;

use crate::config::FeatureRegistry;
use crate::error::{CompileError, Result};
use crate::minimize::{Minimized, RangeMinimizer};
use crate::paths::LeafPaths;
use crate::tree::DecisionTree;

/// `<name> = [t1, t2, ...];` for each split feature, in order of first
/// appearance among the reachable nodes. Thresholds are truncated and sorted,
/// duplicates kept.
pub fn threshold_listing(tree: &DecisionTree) -> String {
    let mut order: Vec<usize> = Vec::new();
    let mut thresholds: Vec<Vec<i64>> = vec![Vec::new(); tree.feature_names().len()];

    for id in 0..tree.node_count() {
        if !tree.is_reachable(id) || tree.is_leaf(id) {
            continue;
        }
        let feature = tree.feature(id);
        if !order.contains(&feature) {
            order.push(feature);
        }
        thresholds[feature].push(tree.threshold(id).trunc() as i64);
    }

    let mut out = String::new();
    for feature in order {
        let values = &mut thresholds[feature];
        values.sort_unstable();
        let joined = values.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(", ");
        out.push_str(&format!("{} = [{}];\n", tree.feature_name(feature), joined));
    }
    out
}

/// One line per leaf with the raw conditions of its path, e.g.
/// `\t IF len<=40.5 and iat>1000.0 THEN 1;`.
pub fn raw_rules(tree: &DecisionTree) -> String {
    let mut out = String::new();
    for path in LeafPaths::new(tree) {
        let clause: Vec<String> = path
            .constraints
            .iter()
            .map(|c| format!("{}{}{:?}", tree.feature_name(c.feature), c.direction, c.threshold))
            .collect();
        out.push_str(&format!("\t IF {} THEN {};\n", clause.join(" and "), path.label));
    }
    out
}

/// One line per reachable leaf with the minimized integer bounds. A bound equal
/// to the domain limit is left out. Unreachable leaves are omitted.
pub fn minimized_rules(tree: &DecisionTree, registry: &FeatureRegistry) -> Result<String> {
    let minimizer = RangeMinimizer::new(tree, registry);
    let mut out = String::new();
    for path in LeafPaths::new(tree) {
        let rule = match minimizer.minimize(&path)? {
            Minimized::Reachable(rule) => rule,
            Minimized::Unreachable { leaf, feature } => {
                log::debug!("Leaf {} omitted from listing: impossible range on '{}'", leaf, feature);
                continue;
            }
        };

        let mut clause = Vec::new();
        for (feature, range) in rule.ranges.iter().enumerate() {
            let Some(range) = range else { continue };
            let domain = registry.get(feature);
            if range.lo != domain.min {
                clause.push(format!("{}<={}", range.lo, domain.name));
            }
            if range.hi != domain.max {
                clause.push(format!("{}<={}", domain.name, range.hi));
            }
        }
        out.push_str(&format!("\t IF {} THEN {};\n", clause.join(" and "), rule.label));
    }
    Ok(out)
}

/// Renders the full listing: thresholds, then raw or minimized leaf rules.
pub fn render_listing(tree: &DecisionTree, registry: &FeatureRegistry, minimized: bool) -> Result<String> {
    let mut out = threshold_listing(tree);
    if minimized {
        out.push_str(&minimized_rules(tree, registry)?);
    } else {
        out.push_str(&raw_rules(tree));
    }
    Ok(out)
}

pub fn write_listing<P: AsRef<Path>>(path: P, tree: &DecisionTree, registry: &FeatureRegistry, minimized: bool) -> Result<()> {
    let path = path.as_ref();
    let listing = render_listing(tree, registry, minimized)?;
    fs::write(path, listing).map_err(|e| CompileError::io(path, e))?;
    log::info!("Wrote tree listing to {:?}", path);
    Ok(())
}
