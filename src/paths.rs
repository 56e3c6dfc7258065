//! Enumerates every root-to-leaf path of a `DecisionTree` together with the
//! chain of split conditions that leads to the leaf.

use std::fmt;

use crate::tree::{DecisionTree, NodeId};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Left,  // <= threshold
    Right, // > threshold
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Left => write!(f, "<="),
            Direction::Right => write!(f, ">"),
        }
    }
}

/// One split condition taken on the way to a leaf.
#[derive(Clone, Debug, PartialEq)]
pub struct PathConstraint {
    /// Internal node that produced the condition.
    pub node: NodeId,
    /// Tree feature index tested by `node`.
    pub feature: usize,
    pub direction: Direction,
    pub threshold: f64,
}

/// A leaf and the ordered conditions (root first) that reach it.
#[derive(Clone, Debug, PartialEq)]
pub struct LeafPath {
    pub leaf: NodeId,
    pub constraints: Vec<PathConstraint>,
    pub label: i64,
}

/// Lazy depth-first walk over the leaves of a tree, left branch before right
/// branch at every internal node.
///
/// Each pending frame owns its own copy of the constraint list, so conditions
/// pushed while descending left are never visible on the right branch. The
/// explicit stack keeps very deep trees off the call stack.
pub struct LeafPaths<'a> {
    tree: &'a DecisionTree,
    stack: Vec<(NodeId, Vec<PathConstraint>)>,
}

impl<'a> LeafPaths<'a> {
    pub fn new(tree: &'a DecisionTree) -> Self {
        LeafPaths { tree, stack: vec![(tree.root(), Vec::new())] }
    }
}

impl Iterator for LeafPaths<'_> {
    type Item = LeafPath;

    fn next(&mut self) -> Option<LeafPath> {
        while let Some((node_id, constraints)) = self.stack.pop() {
            if self.tree.is_leaf(node_id) {
                return Some(LeafPath { leaf: node_id, constraints, label: self.tree.leaf_label(node_id) });
            }

            let feature = self.tree.feature(node_id);
            let threshold = self.tree.threshold(node_id);

            // === RIGHT branch (> threshold), popped after the whole left subtree ===
            let mut right = constraints.clone();
            right.push(PathConstraint { node: node_id, feature, direction: Direction::Right, threshold });
            self.stack.push((self.tree.right(node_id), right));

            // === LEFT branch (<= threshold) ===
            let mut left = constraints;
            left.push(PathConstraint { node: node_id, feature, direction: Direction::Left, threshold });
            self.stack.push((self.tree.left(node_id), left));
        }
        None
    }
}

/// Collects every leaf path of `tree` in visitation order.
pub fn extract_paths(tree: &DecisionTree) -> Vec<LeafPath> {
    LeafPaths::new(tree).collect()
}
