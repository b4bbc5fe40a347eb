//! Model evaluation and system statistics served by `/admin/*`.

use serde::{Deserialize, Serialize};

use super::prediction::ModelFamily;

/// Headline scores of one model. Accuracy, precision, recall and F1 are
/// percentages; AUC is a 0–1 fraction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelMetrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub auc: f64,
}

/// One row of `GET /admin/models`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelStatus {
    pub name: String,
    pub key: String,
    #[serde(rename = "type")]
    pub family: ModelFamily,
    pub status: String,
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub auc: f64,
}

impl ModelStatus {
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status.eq_ignore_ascii_case("active")
    }

    #[must_use]
    pub const fn metrics(&self) -> ModelMetrics {
        ModelMetrics {
            accuracy: self.accuracy,
            precision: self.precision,
            recall: self.recall,
            f1_score: self.f1_score,
            auc: self.auc,
        }
    }
}

/// Most accurate model in a status list.
#[must_use]
pub fn most_accurate(models: &[ModelStatus]) -> Option<&ModelStatus> {
    models.iter().max_by(|a, b| a.accuracy.total_cmp(&b.accuracy))
}

/// Binary confusion matrix; positive means heart disease.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfusionMatrix {
    pub true_negative: u64,
    pub false_positive: u64,
    pub false_negative: u64,
    pub true_positive: u64,
}

#[allow(clippy::cast_precision_loss)]
fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

impl ConfusionMatrix {
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.true_negative + self.false_positive + self.false_negative + self.true_positive
    }

    #[must_use]
    pub fn accuracy(&self) -> f64 {
        ratio(self.true_positive + self.true_negative, self.total())
    }

    /// True positive rate (recall).
    #[must_use]
    pub fn sensitivity(&self) -> f64 {
        ratio(self.true_positive, self.true_positive + self.false_negative)
    }

    /// True negative rate.
    #[must_use]
    pub fn specificity(&self) -> f64 {
        ratio(self.true_negative, self.true_negative + self.false_positive)
    }

    #[must_use]
    pub fn precision(&self) -> f64 {
        ratio(self.true_positive, self.true_positive + self.false_positive)
    }

    #[must_use]
    pub fn f1_score(&self) -> f64 {
        let (p, r) = (self.precision(), self.sensitivity());
        if p + r <= 0.0 {
            0.0
        } else {
            2.0 * p * r / (p + r)
        }
    }
}

/// Response of `GET /admin/stats`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemStats {
    pub total_predictions: u64,
    /// Percentage.
    pub uptime: f64,
    /// Milliseconds.
    pub avg_response_time: f64,
}

/// Response of `GET /admin/database-stats`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseStats {
    pub total_patients: u64,
    pub total_events: u64,
    pub total_documents: u64,
    pub active_plans: u64,
    pub high_risk_count: u64,
    pub medium_risk_count: u64,
    pub low_risk_count: u64,
}

impl DatabaseStats {
    /// Risk counts cover every patient.
    #[must_use]
    pub const fn risk_counts_consistent(&self) -> bool {
        self.high_risk_count + self.medium_risk_count + self.low_risk_count == self.total_patients
    }
}

/// Metrics and confusion matrix for one model, fetched together.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelEvaluation {
    pub metrics: ModelMetrics,
    pub confusion: ConfusionMatrix,
}
