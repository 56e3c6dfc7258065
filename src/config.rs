//! Compiler configuration: the per-feature domain registry, the target table
//! names and the emission strategy. Defaults reproduce the traffic classifier
//! deployment (`iat`, `len`, `diffLen` feeding `MyIngress.ml_code`).

use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CompileError, Result};

// --- Feature Domains ---
// Engineering constants, not learned from data.
// Format: (feature_name, domain_min, domain_max)
const IAT_DOMAIN: (&str, i64, i64) = ("iat", 0, 100 * 1000 * 1_000_000); // 100 seconds, in microseconds
const LEN_DOMAIN: (&str, i64, i64) = ("len", 0, 0xFFFF); // max size of an IP packet
const DIFF_LEN_DOMAIN: (&str, i64, i64) = ("diffLen", 0, 2 * 0xFFFF); // twice the packet size

pub const DEFAULT_DOMAINS: [(&str, i64, i64); 3] = [IAT_DOMAIN, LEN_DOMAIN, DIFF_LEN_DOMAIN];

// --- Table Names ---
pub const DEFAULT_DIRECT_TABLE: &str = "MyIngress.ml_code";
pub const DEFAULT_DIRECT_ACTION: &str = "set_result";
pub const DEFAULT_FEATURE_TABLE_PREFIX: &str = "ml_feature_";
pub const DEFAULT_FEATURE_ACTION_PREFIX: &str = "set_code_";
pub const DEFAULT_CODE_TABLE: &str = "ml_code";
pub const DEFAULT_CODE_ACTION: &str = "set_result";

/// Full span `[min, max]` a feature can ever take.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureDomain {
    pub name: String,
    pub min: i64,
    pub max: i64,
}

/// Ordered set of known features. The order fixes the column order of
/// every composite match key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureRegistry {
    features: Vec<FeatureDomain>,
}

impl FeatureRegistry {
    /// Builds a registry, rejecting empty sets, duplicate names and inverted domains.
    pub fn new(features: Vec<FeatureDomain>) -> Result<Self> {
        let registry = FeatureRegistry { features };
        registry.validate()?;
        Ok(registry)
    }

    fn validate(&self) -> Result<()> {
        if self.features.is_empty() {
            return Err(CompileError::Config("feature registry is empty".into()));
        }
        for (i, feature) in self.features.iter().enumerate() {
            if feature.min > feature.max {
                return Err(CompileError::Config(format!(
                    "feature '{}' has an empty domain [{}, {}]",
                    feature.name, feature.min, feature.max
                )));
            }
            if self.features[..i].iter().any(|f| f.name == feature.name) {
                return Err(CompileError::Config(format!("feature '{}' is declared twice", feature.name)));
            }
        }
        Ok(())
    }

    /// Position of `name` in the registry order.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.features.iter().position(|f| f.name == name)
    }

    #[inline]
    pub fn get(&self, index: usize) -> &FeatureDomain {
        &self.features[index]
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FeatureDomain> {
        self.features.iter()
    }

    pub fn names(&self) -> Vec<String> {
        self.features.iter().map(|f| f.name.clone()).collect()
    }
}

impl Default for FeatureRegistry {
    fn default() -> Self {
        FeatureRegistry {
            features: DEFAULT_DOMAINS
                .iter()
                .map(|&(name, min, max)| FeatureDomain { name: name.to_string(), min, max })
                .collect(),
        }
    }
}

/// Names of the tables and actions the emitted commands populate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableNames {
    pub direct_table: String,
    pub direct_action: String,
    pub feature_table_prefix: String,
    pub feature_action_prefix: String,
    pub code_table: String,
    pub code_action: String,
}

impl TableNames {
    pub fn feature_table(&self, feature: &str) -> String {
        format!("{}{}", self.feature_table_prefix, feature)
    }

    pub fn feature_action(&self, feature: &str) -> String {
        format!("{}{}", self.feature_action_prefix, feature)
    }
}

impl Default for TableNames {
    fn default() -> Self {
        TableNames {
            direct_table: DEFAULT_DIRECT_TABLE.to_string(),
            direct_action: DEFAULT_DIRECT_ACTION.to_string(),
            feature_table_prefix: DEFAULT_FEATURE_TABLE_PREFIX.to_string(),
            feature_action_prefix: DEFAULT_FEATURE_ACTION_PREFIX.to_string(),
            code_table: DEFAULT_CODE_TABLE.to_string(),
            code_action: DEFAULT_CODE_ACTION.to_string(),
        }
    }
}

/// How leaf rules are turned into table entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// One range-match entry per reachable leaf.
    #[default]
    Direct,
    /// Per-feature range tables emitting codes, plus an exact-match code table.
    Decomposed,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Direct => write!(f, "direct"),
            Strategy::Decomposed => write!(f, "decomposed"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    pub features: FeatureRegistry,
    pub tables: TableNames,
}

impl CompilerConfig {
    /// Loads a JSON configuration file. Missing fields take their defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| CompileError::io(path, e))?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let config: CompilerConfig = serde_json::from_str(content)?;
        config.features.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registry_order() {
        let registry = FeatureRegistry::default();
        assert_eq!(registry.names(), vec!["iat", "len", "diffLen"]);
        assert_eq!(registry.get(1).max, 65535);
        assert_eq!(registry.get(0).max, 100_000_000_000);
        assert_eq!(registry.position("diffLen"), Some(2));
        assert_eq!(registry.position("ttl"), None);
    }

    #[test]
    fn test_registry_rejects_bad_domains() {
        let inverted = vec![FeatureDomain { name: "len".into(), min: 10, max: 5 }];
        assert!(matches!(FeatureRegistry::new(inverted), Err(CompileError::Config(_))));

        let duplicated = vec![
            FeatureDomain { name: "len".into(), min: 0, max: 5 },
            FeatureDomain { name: "len".into(), min: 0, max: 9 },
        ];
        assert!(matches!(FeatureRegistry::new(duplicated), Err(CompileError::Config(_))));

        assert!(matches!(FeatureRegistry::new(Vec::new()), Err(CompileError::Config(_))));
    }

    #[test]
    fn test_config_from_partial_json() {
        let config = CompilerConfig::from_json(
            r#"{ "features": [ { "name": "len", "min": 0, "max": 1500 } ],
                 "tables": { "direct_table": "Ingress.classify" } }"#,
        )
        .unwrap();
        assert_eq!(config.features.len(), 1);
        assert_eq!(config.tables.direct_table, "Ingress.classify");
        assert_eq!(config.tables.direct_action, DEFAULT_DIRECT_ACTION);
        assert_eq!(config.tables.feature_table("len"), "ml_feature_len");
        assert_eq!(config.tables.feature_action("len"), "set_code_len");

        let defaults = CompilerConfig::from_json("{}").unwrap();
        assert_eq!(defaults, CompilerConfig::default());
    }

    #[test]
    fn test_config_rejects_empty_registry() {
        assert!(CompilerConfig::from_json(r#"{ "features": [] }"#).is_err());
    }

    #[test]
    fn test_strategy_display() {
        assert_eq!(Strategy::Direct.to_string(), "direct");
        assert_eq!(Strategy::Decomposed.to_string(), "decomposed");
    }
}
