//! Gradient-boosted tree inference.
//!
//! Inference-only: the artifact is produced by offline training and loaded
//! at startup. The JSON shape is a list of regression trees in flattened
//! pre-order (child indices always point forward), whose summed outputs are
//! squashed through a sigmoid:
//!
//! ```json
//! {
//!   "base_score": 0.0,
//!   "trees": [
//!     { "nodes": [
//!       { "feature": "amount", "threshold": 50000.0, "left": 1, "right": 2 },
//!       { "value": -1.2 },
//!       { "value": 0.8 }
//!     ]}
//!   ]
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use payguard_core::error::{EngineError, Result};

use crate::features::{FeatureName, FeatureVector};
use crate::model::Classifier;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum TreeNode {
    Split {
        feature: FeatureName,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f64,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Tree {
    nodes: Vec<TreeNode>,
}

impl Tree {
    fn output(&self, features: &FeatureVector) -> Result<f64> {
        let mut node = 0usize;
        // Forward-only child indices bound the walk by the node count.
        for _ in 0..self.nodes.len() {
            match self
                .nodes
                .get(node)
                .ok_or_else(|| EngineError::model(format!("node index {node} out of range")))?
            {
                TreeNode::Leaf { value } => return Ok(*value),
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if features.get(*feature) < *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
        Err(EngineError::model("tree walk did not reach a leaf"))
    }
}

/// A trained gradient-boosted tree ensemble.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoostedModel {
    #[serde(default)]
    base_score: f64,
    trees: Vec<Tree>,
}

impl GradientBoostedModel {
    /// Load and validate a model artifact.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| EngineError::model(format!("read {}: {e}", path.display())))?;
        Self::from_json(&contents)
    }

    /// Parse and validate a model artifact from its JSON text.
    pub fn from_json(json: &str) -> Result<Self> {
        let model: Self =
            serde_json::from_str(json).map_err(|e| EngineError::model(e.to_string()))?;
        model.validate()?;
        Ok(model)
    }

    /// Number of trees in the ensemble.
    #[must_use]
    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }

    /// Structural validation: every tree non-empty, every split's children
    /// in range and strictly forward so a walk must terminate.
    fn validate(&self) -> Result<()> {
        for (t, tree) in self.trees.iter().enumerate() {
            if tree.nodes.is_empty() {
                return Err(EngineError::model(format!("tree {t} has no nodes")));
            }
            for (i, node) in tree.nodes.iter().enumerate() {
                if let TreeNode::Split { left, right, .. } = node {
                    for child in [*left, *right] {
                        if child <= i || child >= tree.nodes.len() {
                            return Err(EngineError::model(format!(
                                "tree {t}: split {i} has invalid child {child}"
                            )));
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Positive-class probability for the given features.
    pub fn predict_probability(&self, features: &FeatureVector) -> Result<f64> {
        let mut margin = self.base_score;
        for tree in &self.trees {
            margin += tree.output(features)?;
        }
        Ok(sigmoid(margin))
    }
}

impl Classifier for GradientBoostedModel {
    fn predict(&self, features: &FeatureVector) -> Result<f64> {
        self.predict_probability(features)
    }

    fn name(&self) -> &'static str {
        "gbdt"
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIMPLE_ARTIFACT: &str = r#"{
        "base_score": 0.0,
        "trees": [
            { "nodes": [
                { "feature": "amount", "threshold": 50000.0, "left": 1, "right": 2 },
                { "value": -2.0 },
                { "value": 2.0 }
            ]},
            { "nodes": [
                { "feature": "amount_velocity", "threshold": 5.0, "left": 1, "right": 2 },
                { "value": -0.5 },
                { "value": 1.5 }
            ]}
        ]
    }"#;

    fn features(amount: f64, velocity: f64) -> FeatureVector {
        FeatureVector {
            amount,
            amount_velocity: velocity,
            ..FeatureVector::default()
        }
    }

    #[test]
    fn test_artifact_parses_and_validates() {
        let model = GradientBoostedModel::from_json(SIMPLE_ARTIFACT).unwrap();
        assert_eq!(model.tree_count(), 2);
    }

    #[test]
    fn test_prediction_separates_regimes() {
        let model = GradientBoostedModel::from_json(SIMPLE_ARTIFACT).unwrap();

        let low = model.predict_probability(&features(100.0, 0.0)).unwrap();
        let high = model
            .predict_probability(&features(90_000.0, 8.0))
            .unwrap();

        // margin -2.5 vs +3.5
        assert!(low < 0.1, "low: {low}");
        assert!(high > 0.9, "high: {high}");
        assert!((0.0..=1.0).contains(&low));
        assert!((0.0..=1.0).contains(&high));
    }

    #[test]
    fn test_single_leaf_tree_is_a_constant() {
        let artifact = r#"{ "trees": [ { "nodes": [ { "value": 0.0 } ] } ] }"#;
        let model = GradientBoostedModel::from_json(artifact).unwrap();
        let p = model.predict_probability(&features(1.0, 0.0)).unwrap();
        assert!((p - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_backward_child_rejected() {
        let artifact = r#"{
            "trees": [ { "nodes": [
                { "feature": "amount", "threshold": 1.0, "left": 0, "right": 1 },
                { "value": 0.0 }
            ]}]
        }"#;
        assert!(GradientBoostedModel::from_json(artifact).is_err());
    }

    #[test]
    fn test_out_of_range_child_rejected() {
        let artifact = r#"{
            "trees": [ { "nodes": [
                { "feature": "amount", "threshold": 1.0, "left": 1, "right": 7 },
                { "value": 0.0 }
            ]}]
        }"#;
        assert!(GradientBoostedModel::from_json(artifact).is_err());
    }

    #[test]
    fn test_empty_tree_rejected() {
        let artifact = r#"{ "trees": [ { "nodes": [] } ] }"#;
        assert!(GradientBoostedModel::from_json(artifact).is_err());
    }

    #[test]
    fn test_garbage_json_rejected() {
        assert!(GradientBoostedModel::from_json("not a model").is_err());
    }
}
