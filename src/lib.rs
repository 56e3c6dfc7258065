//! Compiles a trained binary decision tree over numeric traffic features into
//! range-match table entries for a programmable switch, so that classification
//! happens with table lookups instead of tree traversal.
//!
//! Pipeline: `DecisionTree` -> `paths` (root-to-leaf conditions) ->
//! `minimize` (one closed range per feature) -> `emit` (direct or decomposed
//! entries) -> `writer` (switch CLI commands).

pub mod config;
pub mod dump;
pub mod emit;
pub mod error;
pub mod minimize;
pub mod paths;
pub mod predict;
pub mod results;
pub mod simulate;
pub mod tree;
pub mod utils;
pub mod writer;

pub use config::{CompilerConfig, FeatureDomain, FeatureRegistry, Strategy, TableNames};
pub use emit::{compile, Compilation, Entry};
pub use error::{CompileError, Result};
pub use tree::DecisionTree;
