//! Domain layer: Transit types and pure computations.
//!
//! Everything here is I/O free. Types mirror the backend's JSON contract;
//! the derivation helpers and aggregates reshape that data for requests and
//! display.

pub mod admin;
mod comparison;
pub mod derivation;
pub mod examination;
mod features;
pub mod history;
mod metrics;
mod patient;
mod prediction;
pub mod treatment;
mod wire;

pub use comparison::{ComparisonView, ShapeDrift};
pub use derivation::{
    estimate_cluster, health_score, prediction_confidence, ClusterFeatures, ClusterWeights,
};
pub use features::{
    ClinicalInput, LifestyleInput, LifestyleMeasurements, PredictionBatch, CLINICAL_FEATURE_NAMES,
    LIFESTYLE_FEATURE_NAMES,
};
pub use metrics::{calculate_metrics, DashboardMetrics, RiskDistribution, PLACEHOLDER_ACCURACY};
pub use patient::{
    gender_code, Acknowledgement, HealthMetrics, Patient, PatientInput, RiskLevel,
    HIGH_RISK_THRESHOLD, MEDIUM_RISK_THRESHOLD,
};
pub use prediction::{
    CompareResult, Consensus, FeatureImportance, ModelFamily, ModelPrediction, PredictionResponse,
    RiskClass, ShapExplanation, DECISION_THRESHOLD,
};
