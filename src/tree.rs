//! Defines the immutable decision tree consumed by the compiler: an arena of
//! nodes addressed by index, stored as parallel arrays (Structure of Arrays)
//! with scikit-learn style sentinels, plus the JSON loader and validation.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::config::FeatureRegistry;
use crate::error::{CompileError, Result};
use crate::utils::get_majority_class;

/// Type alias for a node identifier within the tree arena.
pub type NodeId = usize;

// --- Sklearn-Style Sentinels ---
/// Sentinel value for child ids (children_left, children_right) indicating a leaf node.
pub const CHILD_LEAF_SENTINEL: i64 = -1;
/// Sentinel value for feature index indicating a leaf node.
pub const FEATURE_LEAF_SENTINEL: i64 = -2;
/// Sentinel f64 value for threshold indicating a leaf node.
pub const THRESHOLD_LEAF_SENTINEL_F64: f64 = -2.0;
// --- End Sentinels ---

/// Raw tree arrays as exported from a trained scikit-learn `DecisionTreeClassifier`.
///
/// `features[i]`, `thresholds[i]`, `children_left[i]`, `children_right[i]` and
/// `values[i]` all describe node `i`; node 0 is the root.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct TreeData {
    /// Semantic name for each feature index. Defaults to the registry order.
    #[serde(default)]
    pub feature_names: Option<Vec<String>>,
    /// Label emitted for each class index. Defaults to `0..n_classes`.
    #[serde(default)]
    pub classes: Option<Vec<i64>>,
    /// Feature index tested at the node, or -2 for leaves.
    pub features: Vec<i64>,
    /// Split threshold, or -2.0 for leaves.
    pub thresholds: Vec<f64>,
    /// Child taken when `feature <= threshold`, or -1 for leaves.
    pub children_left: Vec<i64>,
    /// Child taken when `feature > threshold`, or -1 for leaves.
    pub children_right: Vec<i64>,
    /// Per-class sample counts. Only leaves are read.
    pub values: Vec<Vec<f64>>,
}

/// Immutable, validated binary decision tree.
///
/// Every reachable internal node has exactly two children, every reachable node
/// is reached exactly once from the root, and every split feature index maps to
/// a name. The compiler relies on these invariants and never re-checks them.
#[derive(Debug, Clone)]
pub struct DecisionTree {
    // --- SoA Data Storage ---
    features: Vec<i64>,
    thresholds: Vec<f64>,
    children_left: Vec<i64>,
    children_right: Vec<i64>,
    values: Vec<Vec<f64>>,
    // --- Precomputed ---
    /// Majority class index for leaves, `usize::MAX` for internal nodes.
    leaf_classes: Vec<usize>,
    /// Set for nodes the validated walk reached from the root.
    reachable: Vec<bool>,
    feature_names: Vec<String>,
    classes: Vec<i64>,
}

impl DecisionTree {
    /// Loads a tree from a JSON file. Feature names missing from the file are
    /// taken from `registry` in order.
    pub fn load<P: AsRef<Path>>(path: P, registry: &FeatureRegistry) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| CompileError::io(path, e))?;
        let tree = Self::from_json(&content, registry)?;
        log::info!(
            "Loaded tree from {:?}: {} nodes, {} leaves, {} classes",
            path,
            tree.node_count(),
            tree.leaf_count(),
            tree.n_classes()
        );
        Ok(tree)
    }

    pub fn from_json(content: &str, registry: &FeatureRegistry) -> Result<Self> {
        let data: TreeData = serde_json::from_str(content)?;
        Self::from_data(data, registry)
    }

    /// Validates the raw arrays and freezes them into a `DecisionTree`.
    pub fn from_data(data: TreeData, registry: &FeatureRegistry) -> Result<Self> {
        let n = data.features.len();
        if n == 0 {
            return Err(CompileError::structural(0, "tree has no nodes"));
        }
        if data.thresholds.len() != n
            || data.children_left.len() != n
            || data.children_right.len() != n
            || data.values.len() != n
        {
            return Err(CompileError::structural(
                0,
                format!(
                    "inconsistent array lengths (features {}, thresholds {}, children_left {}, children_right {}, values {})",
                    n,
                    data.thresholds.len(),
                    data.children_left.len(),
                    data.children_right.len(),
                    data.values.len()
                ),
            ));
        }

        let feature_names = data.feature_names.unwrap_or_else(|| registry.names());
        let n_classes = match &data.classes {
            Some(classes) => classes.len(),
            None => data.values[0].len(),
        };
        let classes = data.classes.unwrap_or_else(|| (0..n_classes as i64).collect());

        let mut tree = DecisionTree {
            features: data.features,
            thresholds: data.thresholds,
            children_left: data.children_left,
            children_right: data.children_right,
            values: data.values,
            leaf_classes: vec![usize::MAX; n],
            reachable: vec![false; n],
            feature_names,
            classes,
        };
        tree.validate_and_resolve_leaves()?;
        Ok(tree)
    }

    /// Walks the tree from the root with an explicit stack, checking structure
    /// and computing the majority class of every leaf.
    fn validate_and_resolve_leaves(&mut self) -> Result<()> {
        let n = self.features.len();
        let n_classes = self.classes.len();
        let mut visited = vec![false; n];
        let mut stack: Vec<NodeId> = vec![0];

        while let Some(id) = stack.pop() {
            if visited[id] {
                return Err(CompileError::structural(id, "node is reached more than once (shared or cyclic child reference)"));
            }
            visited[id] = true;

            let left = self.children_left[id];
            let right = self.children_right[id];

            match (left == CHILD_LEAF_SENTINEL, right == CHILD_LEAF_SENTINEL) {
                (true, true) => {
                    let counts = &self.values[id];
                    if counts.is_empty() {
                        return Err(CompileError::structural(id, "leaf has an empty class-count vector"));
                    }
                    if counts.len() != n_classes {
                        return Err(CompileError::structural(
                            id,
                            format!("leaf has {} class counts but the tree declares {} classes", counts.len(), n_classes),
                        ));
                    }
                    self.leaf_classes[id] = get_majority_class(counts);
                }
                (true, false) | (false, true) => {
                    return Err(CompileError::structural(id, "internal node has exactly one child"));
                }
                (false, false) => {
                    let feature = self.features[id];
                    if feature < 0 || feature as usize >= self.feature_names.len() {
                        return Err(CompileError::structural(
                            id,
                            format!("feature index {} is outside the feature table (0..{})", feature, self.feature_names.len()),
                        ));
                    }
                    if !self.thresholds[id].is_finite() {
                        return Err(CompileError::structural(id, "split threshold is not a finite number"));
                    }
                    for child in [left, right] {
                        if child < 0 || child as usize >= n {
                            return Err(CompileError::structural(id, format!("child index {} is out of range (0..{})", child, n)));
                        }
                        if child as usize == id {
                            return Err(CompileError::structural(id, "node references itself as a child"));
                        }
                    }
                    // Right first, so the left subtree is validated first.
                    stack.push(right as NodeId);
                    stack.push(left as NodeId);
                }
            }
        }

        let orphans = visited.iter().filter(|&&v| !v).count();
        if orphans > 0 {
            log::debug!("{} node(s) are not reachable from the root and will be ignored", orphans);
        }
        self.reachable = visited;
        Ok(())
    }

    // --- Accessors ---

    /// The root is always node 0.
    #[inline(always)]
    pub fn root(&self) -> NodeId {
        0
    }

    /// A node is a leaf iff it has no children.
    /// # Panics
    /// Panics if the `id` is out of bounds.
    #[inline(always)]
    pub fn is_leaf(&self, id: NodeId) -> bool {
        self.children_left[id] == CHILD_LEAF_SENTINEL
    }

    /// Orphan nodes are never validated and must not be read.
    #[inline(always)]
    pub fn is_reachable(&self, id: NodeId) -> bool {
        self.reachable[id]
    }

    /// Feature index tested by an internal node.
    #[inline(always)]
    pub fn feature(&self, id: NodeId) -> usize {
        debug_assert!(!self.is_leaf(id), "Called feature on a leaf node");
        self.features[id] as usize
    }

    #[inline(always)]
    pub fn threshold(&self, id: NodeId) -> f64 {
        self.thresholds[id]
    }

    /// Child taken when `feature <= threshold`.
    #[inline(always)]
    pub fn left(&self, id: NodeId) -> NodeId {
        debug_assert!(!self.is_leaf(id), "Called left on a leaf node");
        self.children_left[id] as NodeId
    }

    /// Child taken when `feature > threshold`.
    #[inline(always)]
    pub fn right(&self, id: NodeId) -> NodeId {
        debug_assert!(!self.is_leaf(id), "Called right on a leaf node");
        self.children_right[id] as NodeId
    }

    /// Majority class index of a leaf.
    #[inline(always)]
    pub fn leaf_class(&self, id: NodeId) -> usize {
        debug_assert!(self.is_leaf(id), "Called leaf_class on an internal node");
        self.leaf_classes[id]
    }

    /// Classification label of a leaf (its majority class mapped through `classes`).
    #[inline(always)]
    pub fn leaf_label(&self, id: NodeId) -> i64 {
        self.classes[self.leaf_class(id)]
    }

    pub fn class_counts(&self, id: NodeId) -> &[f64] {
        &self.values[id]
    }

    pub fn feature_name(&self, feature: usize) -> &str {
        &self.feature_names[feature]
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn classes(&self) -> &[i64] {
        &self.classes
    }

    pub fn n_classes(&self) -> usize {
        self.classes.len()
    }

    pub fn node_count(&self) -> usize {
        self.features.len()
    }

    /// Number of leaves reachable from the root.
    pub fn leaf_count(&self) -> usize {
        self.leaf_classes.iter().filter(|&&c| c != usize::MAX).count()
    }

    /// Predicts the label of one feature vector by walking from the root.
    ///
    /// `sample[i]` is the value of tree feature index `i`. Missing trailing
    /// values are treated as 0.
    pub fn predict(&self, sample: &[f64]) -> i64 {
        let mut node = self.root();
        while !self.is_leaf(node) {
            let value = sample.get(self.feature(node)).copied().unwrap_or(0.0);
            node = if value <= self.threshold(node) { self.left(node) } else { self.right(node) };
        }
        self.leaf_label(node)
    }
}
