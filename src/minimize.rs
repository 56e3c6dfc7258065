//! Folds the split conditions of a leaf path into at most one closed integer
//! interval per feature.
//!
//! Bounds are tracked on the raw decision values first, `(lower, upper)` with
//! `feature > lower` and `feature <= upper`, exactly like the split tests
//! themselves. Only once the whole path has been folded is each bound turned
//! into an inclusive integer: `lo = floor(lower) + 1`, `hi = floor(upper)`.
//! Converting once per feature avoids compounding the rounding.

use std::fmt;

use crate::config::FeatureRegistry;
use crate::error::{CompileError, Result};
use crate::paths::{Direction, LeafPath};
use crate::tree::{DecisionTree, NodeId};
use crate::utils::floor_threshold;

/// Raw `(lower, upper)` bounds per registry feature, `(-inf, +inf)` when untouched.
pub type BoundsMap = Vec<(f64, f64)>;

/// Closed interval `[lo, hi]` over one feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Range {
    pub lo: i64,
    pub hi: i64,
}

impl Range {
    pub fn new(lo: i64, hi: i64) -> Self {
        debug_assert!(lo <= hi, "empty range [{lo}, {hi}]");
        Range { lo, hi }
    }

    #[inline]
    pub fn contains(&self, value: i64) -> bool {
        self.lo <= value && value <= self.hi
    }

    #[inline]
    pub fn overlaps(&self, other: &Range) -> bool {
        self.lo <= other.hi && other.lo <= self.hi
    }
}

/// Rendered the way the switch CLI expects a range key: `lo->hi`.
impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}", self.lo, self.hi)
    }
}

/// Minimized form of one reachable leaf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafRule {
    pub leaf: NodeId,
    /// Indexed by registry position; `None` when the path never tests the feature.
    pub ranges: Vec<Option<Range>>,
    pub label: i64,
}

impl LeafRule {
    #[inline]
    pub fn range(&self, feature: usize) -> Option<Range> {
        self.ranges[feature]
    }

    /// The constrained range, or the feature's full domain when unconstrained.
    pub fn range_or_domain(&self, feature: usize, registry: &FeatureRegistry) -> Range {
        self.ranges[feature].unwrap_or_else(|| {
            let domain = registry.get(feature);
            Range::new(domain.min, domain.max)
        })
    }

    pub fn constrained_count(&self) -> usize {
        self.ranges.iter().filter(|r| r.is_some()).count()
    }
}

/// Outcome of minimizing one leaf path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Minimized {
    Reachable(LeafRule),
    /// The conditions on `feature` cannot all hold; the leaf is never selected.
    Unreachable { leaf: NodeId, feature: String },
}

/// Turns leaf paths into `LeafRule`s against a fixed domain registry.
pub struct RangeMinimizer<'a> {
    registry: &'a FeatureRegistry,
    /// Tree feature index -> registry position, `None` when the registry lacks it.
    feature_map: Vec<Option<usize>>,
    feature_names: Vec<String>,
}

impl<'a> RangeMinimizer<'a> {
    pub fn new(tree: &DecisionTree, registry: &'a FeatureRegistry) -> Self {
        let feature_map = tree.feature_names().iter().map(|name| registry.position(name)).collect();
        RangeMinimizer { registry, feature_map, feature_names: tree.feature_names().to_vec() }
    }

    /// Folds the constraints of `path` into one range per mentioned feature.
    ///
    /// # Errors
    /// `UnknownFeature` when a constraint tests a feature absent from the registry.
    pub fn minimize(&self, path: &LeafPath) -> Result<Minimized> {
        let mut bounds: BoundsMap = vec![(f64::NEG_INFINITY, f64::INFINITY); self.registry.len()];
        let mut mentioned = vec![false; self.registry.len()];

        for constraint in &path.constraints {
            let feature = self.feature_map[constraint.feature].ok_or_else(|| CompileError::UnknownFeature {
                node: constraint.node,
                feature: self.feature_names[constraint.feature].clone(),
            })?;
            mentioned[feature] = true;
            let (lower, upper) = &mut bounds[feature];
            match constraint.direction {
                // feature <= threshold tightens the upper bound
                Direction::Left => *upper = upper.min(constraint.threshold),
                // feature > threshold tightens the lower bound
                Direction::Right => *lower = lower.max(constraint.threshold),
            }
        }

        let mut ranges = vec![None; self.registry.len()];
        for (feature, &(lower, upper)) in bounds.iter().enumerate() {
            if !mentioned[feature] {
                continue;
            }
            let domain = self.registry.get(feature);
            let lo = if lower == f64::NEG_INFINITY {
                domain.min
            } else {
                floor_threshold(lower).saturating_add(1).max(domain.min)
            };
            let hi = if upper == f64::INFINITY { domain.max } else { floor_threshold(upper).min(domain.max) };

            if lo > hi {
                return Ok(Minimized::Unreachable { leaf: path.leaf, feature: domain.name.clone() });
            }
            ranges[feature] = Some(Range::new(lo, hi));
        }

        Ok(Minimized::Reachable(LeafRule { leaf: path.leaf, ranges, label: path.label }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FeatureDomain;
    use crate::paths::PathConstraint;
    use crate::tree::TreeData;

    fn single_leaf_tree() -> DecisionTree {
        let data = TreeData {
            features: vec![-2],
            thresholds: vec![-2.0],
            children_left: vec![-1],
            children_right: vec![-1],
            values: vec![vec![1.0]],
            ..TreeData::default()
        };
        DecisionTree::from_data(data, &FeatureRegistry::default()).unwrap()
    }

    fn constraint(feature: usize, direction: Direction, threshold: f64) -> PathConstraint {
        PathConstraint { node: 0, feature, direction, threshold }
    }

    fn path(constraints: Vec<PathConstraint>) -> LeafPath {
        LeafPath { leaf: 7, constraints, label: 1 }
    }

    fn reachable(m: Minimized) -> LeafRule {
        match m {
            Minimized::Reachable(rule) => rule,
            other => panic!("expected a reachable leaf, got {other:?}"),
        }
    }

    #[test]
    fn test_left_edge_keeps_floor() {
        let registry = FeatureRegistry::default();
        let tree = single_leaf_tree();
        let minimizer = RangeMinimizer::new(&tree, &registry);

        let rule = reachable(minimizer.minimize(&path(vec![constraint(1, Direction::Left, 40.5)])).unwrap());
        assert_eq!(rule.range(1), Some(Range::new(0, 40)));
        assert_eq!(rule.range(0), None);
        assert_eq!(rule.range(2), None);
        assert_eq!(rule.constrained_count(), 1);
        assert_eq!(rule.label, 1);
    }

    #[test]
    fn test_right_edge_floors_then_increments() {
        let registry = FeatureRegistry::default();
        let tree = single_leaf_tree();
        let minimizer = RangeMinimizer::new(&tree, &registry);

        let rule = reachable(minimizer.minimize(&path(vec![constraint(1, Direction::Right, 40.5)])).unwrap());
        assert_eq!(rule.range(1), Some(Range::new(41, 65535)));

        let rule = reachable(minimizer.minimize(&path(vec![constraint(1, Direction::Right, 40.0)])).unwrap());
        assert_eq!(rule.range(1), Some(Range::new(41, 65535)));
    }

    #[test]
    fn test_constraints_intersect() {
        let registry = FeatureRegistry::default();
        let tree = single_leaf_tree();
        let minimizer = RangeMinimizer::new(&tree, &registry);

        let rule = reachable(
            minimizer
                .minimize(&path(vec![
                    constraint(0, Direction::Left, 1000.5),
                    constraint(0, Direction::Right, 10.5),
                    constraint(0, Direction::Left, 5000.5), // looser, must not widen
                    constraint(0, Direction::Right, 2.5),   // looser, must not widen
                    constraint(2, Direction::Right, 3.5),
                ]))
                .unwrap(),
        );
        assert_eq!(rule.range(0), Some(Range::new(11, 1000)));
        assert_eq!(rule.range(2), Some(Range::new(4, 131070)));
        assert_eq!(rule.range_or_domain(1, &registry), Range::new(0, 65535));
    }

    #[test]
    fn test_contradiction_is_unreachable() {
        let registry = FeatureRegistry::default();
        let tree = single_leaf_tree();
        let minimizer = RangeMinimizer::new(&tree, &registry);

        let result = minimizer
            .minimize(&path(vec![constraint(0, Direction::Left, 10.0), constraint(0, Direction::Right, 20.0)]))
            .unwrap();
        assert_eq!(result, Minimized::Unreachable { leaf: 7, feature: "iat".to_string() });

        // Adjacent thresholds leave no integer in between.
        let result = minimizer
            .minimize(&path(vec![constraint(1, Direction::Right, 10.2), constraint(1, Direction::Left, 10.8)]))
            .unwrap();
        assert!(matches!(result, Minimized::Unreachable { .. }));
    }

    #[test]
    fn test_threshold_outside_domain() {
        let registry = FeatureRegistry::default();
        let tree = single_leaf_tree();
        let minimizer = RangeMinimizer::new(&tree, &registry);

        let result = minimizer.minimize(&path(vec![constraint(1, Direction::Left, -0.5)])).unwrap();
        assert!(matches!(result, Minimized::Unreachable { .. }));

        let rule = reachable(minimizer.minimize(&path(vec![constraint(1, Direction::Left, 1e9)])).unwrap());
        assert_eq!(rule.range(1), Some(Range::new(0, 65535)));
    }

    #[test]
    fn test_unknown_feature_names_the_node() {
        let registry = FeatureRegistry::new(vec![FeatureDomain { name: "len".into(), min: 0, max: 1500 }]).unwrap();
        let tree = single_leaf_tree(); // feature names: iat, len, diffLen
        let minimizer = RangeMinimizer::new(&tree, &registry);

        let mut p = path(vec![constraint(1, Direction::Left, 100.0), constraint(0, Direction::Left, 5.0)]);
        p.constraints[1].node = 3;
        match minimizer.minimize(&p).unwrap_err() {
            CompileError::UnknownFeature { node, feature } => {
                assert_eq!(node, 3);
                assert_eq!(feature, "iat");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_range_helpers() {
        let r = Range::new(0, 40);
        assert!(r.contains(0) && r.contains(40) && !r.contains(41));
        assert!(r.overlaps(&Range::new(40, 50)));
        assert!(!r.overlaps(&Range::new(41, 50)));
        assert_eq!(r.to_string(), "0->40");
    }
}
