//! Display model for a multi-model comparison.
//!
//! The backend computes the best model and the consensus tally; this module
//! only resolves the best model against the full list, orders the list for
//! display, and rejects responses whose parts disagree with each other.

use thiserror::Error;

use super::prediction::{CompareResult, Consensus, ModelPrediction, RiskClass};

/// A comparison response whose parts contradict each other.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShapeDrift {
    #[error("comparison returned no models")]
    NoModels,

    #[error("best model {0} is not among the compared models")]
    UnknownBestModel(String),

    #[error("consensus counts {high} high + {low} low do not add up to {total}")]
    InconsistentTally { high: u32, low: u32, total: u32 },

    #[error("consensus reports {reported} models but {actual} were returned")]
    ModelCountMismatch { reported: u32, actual: usize },
}

/// Comparison reshaped for display.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonView {
    /// Entry from `all_models` matching the backend's `best_model` key.
    pub best: ModelPrediction,
    /// All models, highest confidence first.
    pub models: Vec<ModelPrediction>,
    /// Passed through from the backend unchanged.
    pub consensus: Consensus,
}

impl ComparisonView {
    /// Build the view, checking the response invariants.
    ///
    /// # Errors
    /// Returns [`ShapeDrift`] if the best model is missing from the list or
    /// the consensus tally disagrees with the list.
    pub fn from_result(result: CompareResult) -> Result<Self, ShapeDrift> {
        let CompareResult {
            mut all_models,
            best_model,
            consensus,
        } = result;

        if all_models.is_empty() {
            return Err(ShapeDrift::NoModels);
        }

        if usize::try_from(consensus.total_models).ok() != Some(all_models.len()) {
            return Err(ShapeDrift::ModelCountMismatch {
                reported: consensus.total_models,
                actual: all_models.len(),
            });
        }

        if !consensus.is_consistent() {
            return Err(ShapeDrift::InconsistentTally {
                high: consensus.high_risk_count,
                low: consensus.low_risk_count,
                total: consensus.total_models,
            });
        }

        // Stable sort keeps backend order among equal confidences.
        all_models.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

        let best = all_models
            .iter()
            .find(|m| m.model_key == best_model.model_key)
            .cloned()
            .ok_or(ShapeDrift::UnknownBestModel(best_model.model_key))?;

        Ok(Self {
            best,
            models: all_models,
            consensus,
        })
    }

    /// Models disagreeing with the consensus majority.
    #[must_use]
    pub fn dissenters(&self) -> Vec<&ModelPrediction> {
        let majority = self.consensus.majority();
        self.models
            .iter()
            .filter(|m| m.risk_level != majority)
            .collect()
    }

    /// Mean risk score across every compared model.
    #[must_use]
    pub fn mean_risk_score(&self) -> f64 {
        #[allow(clippy::cast_precision_loss)]
        let n = self.models.len() as f64;
        self.models.iter().map(|m| m.risk_score).sum::<f64>() / n
    }

    #[must_use]
    pub fn is_unanimous(&self) -> bool {
        let first: Option<RiskClass> = self.models.first().map(|m| m.risk_level);
        first.is_some_and(|level| self.models.iter().all(|m| m.risk_level == level))
    }
}
