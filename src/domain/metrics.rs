//! Summary figures for the patient dashboard.

use serde::{Deserialize, Serialize};

use super::patient::{Patient, RiskLevel};

/// Accuracy shown on the dashboard until a live figure is wired in.
pub const PLACEHOLDER_ACCURACY: f64 = 0.94;

/// Dashboard header figures.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardMetrics {
    /// Mean prediction confidence, 0–1.
    pub model_confidence: f64,
    pub accuracy: f64,
    pub high_risk_count: usize,
    pub total_count: usize,
}

/// Compute dashboard figures; all zero for an empty list.
#[must_use]
pub fn calculate_metrics(patients: &[Patient]) -> DashboardMetrics {
    if patients.is_empty() {
        return DashboardMetrics::default();
    }

    let total: f64 = patients.iter().map(|p| p.confidence).sum();
    #[allow(clippy::cast_precision_loss)]
    let model_confidence = total / patients.len() as f64;

    DashboardMetrics {
        model_confidence,
        accuracy: PLACEHOLDER_ACCURACY,
        high_risk_count: patients
            .iter()
            .filter(|p| p.risk_level == RiskLevel::High)
            .count(),
        total_count: patients.len(),
    }
}

/// Patient counts per risk level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskDistribution {
    pub low: usize,
    pub medium: usize,
    pub high: usize,
}

impl RiskDistribution {
    #[must_use]
    pub fn from_patients(patients: &[Patient]) -> Self {
        patients.iter().fold(Self::default(), |mut dist, p| {
            match p.risk_level {
                RiskLevel::Low => dist.low += 1,
                RiskLevel::Medium => dist.medium += 1,
                RiskLevel::High => dist.high += 1,
            }
            dist
        })
    }

    #[must_use]
    pub const fn total(&self) -> usize {
        self.low + self.medium + self.high
    }

    #[must_use]
    pub const fn count(&self, level: RiskLevel) -> usize {
        match level {
            RiskLevel::Low => self.low,
            RiskLevel::Medium => self.medium,
            RiskLevel::High => self.high,
        }
    }

    /// Share of patients at `level`, 0 when empty.
    #[must_use]
    pub fn share(&self, level: RiskLevel) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let share = self.count(level) as f64 / total as f64;
        share
    }
}
