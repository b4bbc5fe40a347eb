//! Prediction results returned by the backend models.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Probability above which a single model labels a patient high risk.
pub const DECISION_THRESHOLD: f64 = 0.5;

/// Binary label attached to a single model's output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskClass {
    High,
    Low,
}

impl RiskClass {
    #[must_use]
    pub fn from_probability(probability: f64) -> Self {
        if probability > DECISION_THRESHOLD {
            Self::High
        } else {
            Self::Low
        }
    }

    #[must_use]
    pub const fn is_high(self) -> bool {
        matches!(self, Self::High)
    }
}

impl fmt::Display for RiskClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::High => write!(f, "High"),
            Self::Low => write!(f, "Low"),
        }
    }
}

/// Model family reported by the comparison endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelFamily {
    Traditional,
    Ensemble,
    DeepLearning,
    #[serde(other)]
    Other,
}

/// Response of the batch prediction endpoints, one per submitted row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub risk_score: f64,
    pub risk_level: RiskClass,
    pub model_used: String,
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contributing_factors: Option<BTreeMap<String, f64>>,
}

/// One model's verdict inside a comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelPrediction {
    pub model_key: String,
    pub model_name: String,
    /// Absent on `best_model`.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub family: Option<ModelFamily>,
    /// Reported test accuracy in percent. Absent on `best_model`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
    pub risk_score: f64,
    pub risk_level: RiskClass,
    pub confidence: f64,
}

/// Server-side tally of model agreement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Consensus {
    pub high_risk_count: u32,
    pub low_risk_count: u32,
    pub total_models: u32,
}

impl Consensus {
    /// `high + low == total`
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.high_risk_count.checked_add(self.low_risk_count) == Some(self.total_models)
    }

    /// Majority label; ties resolve to high risk.
    #[must_use]
    pub const fn majority(&self) -> RiskClass {
        if self.high_risk_count >= self.low_risk_count {
            RiskClass::High
        } else {
            RiskClass::Low
        }
    }

    /// Fraction of models agreeing with the majority.
    #[must_use]
    pub fn agreement(&self) -> f64 {
        if self.total_models == 0 {
            return 0.0;
        }
        let majority = self.high_risk_count.max(self.low_risk_count);
        f64::from(majority) / f64::from(self.total_models)
    }
}

/// Response of the `/predict/*/compare` endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompareResult {
    pub all_models: Vec<ModelPrediction>,
    pub best_model: ModelPrediction,
    pub consensus: Consensus,
}

/// Feature attribution map returned by `/explain/shap`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShapExplanation(pub BTreeMap<String, f64>);

/// One entry of a ranked attribution list.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureImportance {
    pub feature: String,
    pub weight: f64,
}

impl FeatureImportance {
    #[must_use]
    pub fn increases_risk(&self) -> bool {
        self.weight > 0.0
    }
}

impl ShapExplanation {
    /// Features ordered by absolute weight, largest first.
    ///
    /// Ties keep alphabetical order.
    #[must_use]
    pub fn ranked(&self) -> Vec<FeatureImportance> {
        let mut ranked: Vec<FeatureImportance> = self
            .0
            .iter()
            .map(|(feature, weight)| FeatureImportance {
                feature: feature.clone(),
                weight: *weight,
            })
            .collect();
        ranked.sort_by(|a, b| b.weight.abs().total_cmp(&a.weight.abs()));
        ranked
    }

    #[must_use]
    pub fn top(&self, n: usize) -> Vec<FeatureImportance> {
        let mut ranked = self.ranked();
        ranked.truncate(n);
        ranked
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
