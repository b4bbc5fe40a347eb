//! Patient records as exchanged with the prediction backend.
//!
//! The backend stores patients as flat rows. Dashboard fields use
//! camelCase on the wire (`riskLevel`, `healthScore`), health metric
//! columns keep the dataset names (`BMI_Class`, `MAP_Class`, ...).

use serde::{Deserialize, Serialize};

use super::derivation::{health_score, prediction_confidence};
use super::wire;

/// Risk probability at or above which a patient is classified high risk.
pub const HIGH_RISK_THRESHOLD: f64 = 0.7;

/// Risk probability at or above which a patient is classified medium risk.
pub const MEDIUM_RISK_THRESHOLD: f64 = 0.4;

/// Risk tier shown on the patient list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    /// No significant indicators
    Low,
    /// Follow-up recommended
    Medium,
    /// Intervention recommended
    High,
}

impl RiskLevel {
    /// Classify a model risk probability.
    #[must_use]
    pub fn from_risk_score(risk_score: f64) -> Self {
        if risk_score >= HIGH_RISK_THRESHOLD {
            Self::High
        } else if risk_score >= MEDIUM_RISK_THRESHOLD {
            Self::Medium
        } else {
            Self::Low
        }
    }

    /// Get a human-readable description.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Low => "Low risk - No significant indicators",
            Self::Medium => "Medium risk - Follow-up recommended",
            Self::High => "High risk - Immediate consultation advised",
        }
    }

    /// Display color (RGB).
    #[must_use]
    pub fn color(&self) -> (u8, u8, u8) {
        match self {
            Self::Low => (16, 185, 129),     // Emerald (#10B981)
            Self::Medium => (251, 191, 36),  // Amber (#FBBF24)
            Self::High => (244, 63, 94),     // Rose (#F43F5E)
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "LOW"),
            Self::Medium => write!(f, "MEDIUM"),
            Self::High => write!(f, "HIGH"),
        }
    }
}

/// Lifestyle metric columns stored on a patient row, in wire codes.
///
/// All optional: patients registered before metrics were captured have none.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthMetrics {
    #[serde(default, deserialize_with = "wire::optional_code", skip_serializing_if = "Option::is_none")]
    pub cholesterol: Option<u8>,

    #[serde(default, deserialize_with = "wire::optional_code", skip_serializing_if = "Option::is_none")]
    pub gluc: Option<u8>,

    #[serde(default, deserialize_with = "wire::optional_code", skip_serializing_if = "Option::is_none")]
    pub smoke: Option<u8>,

    #[serde(default, deserialize_with = "wire::optional_code", skip_serializing_if = "Option::is_none")]
    pub alco: Option<u8>,

    #[serde(default, deserialize_with = "wire::optional_code", skip_serializing_if = "Option::is_none")]
    pub active: Option<u8>,

    #[serde(default, deserialize_with = "wire::optional_code", skip_serializing_if = "Option::is_none")]
    pub age_bin: Option<u8>,

    #[serde(
        rename = "BMI_Class",
        default,
        deserialize_with = "wire::optional_code",
        skip_serializing_if = "Option::is_none"
    )]
    pub bmi_class: Option<u8>,

    #[serde(
        rename = "MAP_Class",
        default,
        deserialize_with = "wire::optional_code",
        skip_serializing_if = "Option::is_none"
    )]
    pub map_class: Option<u8>,

    #[serde(default, deserialize_with = "wire::optional_code", skip_serializing_if = "Option::is_none")]
    pub cluster: Option<u8>,
}

impl HealthMetrics {
    /// Whether every lifestyle column needed for a prediction is present.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.cholesterol.is_some()
            && self.gluc.is_some()
            && self.smoke.is_some()
            && self.alco.is_some()
            && self.active.is_some()
            && self.age_bin.is_some()
            && self.bmi_class.is_some()
            && self.map_class.is_some()
    }
}

/// Patient record as returned by `GET /patients`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    pub id: String,
    pub name: String,
    pub age: u32,
    pub gender: String,

    #[serde(rename = "riskLevel")]
    pub risk_level: RiskLevel,

    /// 0–100, higher is healthier
    #[serde(rename = "healthScore", deserialize_with = "wire::score")]
    pub health_score: u8,

    /// Model confidence (0.0 to 1.0)
    pub confidence: f64,

    /// Model risk probability (0.0 to 1.0), when a prediction was recorded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_score: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blood_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,

    #[serde(flatten)]
    pub metrics: HealthMetrics,
}

impl Patient {
    /// Whether the stored health score follows the canonical
    /// `round((1 - risk_score) * 100)` relation.
    ///
    /// Returns `None` when no risk score was recorded.
    #[must_use]
    pub fn health_score_is_canonical(&self) -> Option<bool> {
        self.risk_score
            .map(|risk| health_score(risk) == self.health_score)
    }

    /// Gender as the 0/1 code used by the models (1 = male).
    #[must_use]
    pub fn gender_code(&self) -> u8 {
        gender_code(&self.gender)
    }
}

/// Map a free-text gender to the model code (1 = male, 0 = female).
#[must_use]
pub fn gender_code(gender: &str) -> u8 {
    match gender.trim().to_ascii_lowercase().as_str() {
        "male" | "m" | "nam" | "1" => 1,
        _ => 0,
    }
}

/// Body of `POST /patients` and `PUT /patients/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientInput {
    pub name: String,
    pub age: u32,
    pub gender: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blood_type: Option<String>,

    #[serde(rename = "riskLevel")]
    pub risk_level: RiskLevel,

    #[serde(rename = "healthScore")]
    pub health_score: u8,

    pub confidence: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_score: Option<f64>,

    #[serde(flatten)]
    pub metrics: HealthMetrics,
}

impl PatientInput {
    /// New patient with the backend's defaults (low risk, score 70, confidence 0.5).
    #[must_use]
    pub fn new(name: impl Into<String>, age: u32, gender: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            age,
            gender: gender.into(),
            phone: None,
            address: None,
            blood_type: None,
            risk_level: RiskLevel::Low,
            health_score: 70,
            confidence: 0.5,
            risk_score: None,
            metrics: HealthMetrics::default(),
        }
    }

    /// Attach lifestyle metrics.
    #[must_use]
    pub fn with_metrics(mut self, metrics: HealthMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    /// Record a model risk probability and derive the dashboard fields from it.
    ///
    /// `riskLevel`, `healthScore` and `confidence` all follow from the one
    /// probability so they cannot disagree.
    #[must_use]
    pub fn with_risk_score(mut self, risk_score: f64) -> Self {
        let risk = risk_score.clamp(0.0, 1.0);
        self.risk_score = Some(risk);
        self.risk_level = RiskLevel::from_risk_score(risk);
        self.health_score = health_score(risk);
        self.confidence = prediction_confidence(risk);
        self
    }

    /// Validate the fields the intake form constrains.
    ///
    /// # Errors
    /// Returns every violated constraint.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.name.trim().is_empty() {
            errors.push("Name must not be empty".to_string());
        }
        if !(1..=120).contains(&self.age) {
            errors.push(format!("Age {} out of range [1, 120]", self.age));
        }
        if self.health_score > 100 {
            errors.push(format!("Health score {} out of range [0, 100]", self.health_score));
        }
        if !(0.0..=1.0).contains(&self.confidence) {
            errors.push(format!("Confidence {} out of range [0, 1]", self.confidence));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl From<&Patient> for PatientInput {
    fn from(patient: &Patient) -> Self {
        Self {
            name: patient.name.clone(),
            age: patient.age,
            gender: patient.gender.clone(),
            phone: patient.phone.clone(),
            address: patient.address.clone(),
            blood_type: patient.blood_type.clone(),
            risk_level: patient.risk_level,
            health_score: patient.health_score,
            confidence: patient.confidence,
            risk_score: patient.risk_score,
            metrics: patient.metrics,
        }
    }
}

/// `{success, message}` acknowledgement returned by delete endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Acknowledgement {
    pub success: bool,
    #[serde(default)]
    pub message: String,
}
