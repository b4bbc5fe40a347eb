//! Prediction service: risk assessment, model comparison and explanations.

use std::sync::Arc;

use crate::domain::{
    estimate_cluster, health_score, prediction_confidence, ClinicalInput, ClusterWeights, CompareResult, ComparisonView,
    FeatureImportance, LifestyleInput, LifestyleMeasurements, PatientInput, PredictionResponse, RiskClass,
    RiskLevel,
};
use crate::ports::{GatewayError, PredictionBackend};
use crate::{CardiolensError, Result};

/// A model verdict mapped onto the dashboard's three-level scale.
#[derive(Debug, Clone, PartialEq)]
pub struct RiskAssessment {
    /// Model probability of disease, clamped to `[0, 1]`
    pub risk_score: f64,
    /// The model's own two-class label
    pub risk_class: RiskClass,
    /// Dashboard level derived from `risk_score`
    pub risk_level: RiskLevel,
    pub health_score: u8,
    pub confidence: f64,
    pub model_used: String,
}

impl From<PredictionResponse> for RiskAssessment {
    fn from(response: PredictionResponse) -> Self {
        let risk_score = response.risk_score.clamp(0.0, 1.0);
        Self {
            risk_score,
            risk_class: response.risk_level,
            risk_level: RiskLevel::from_risk_score(risk_score),
            health_score: health_score(risk_score),
            confidence: prediction_confidence(risk_score),
            model_used: response.model_used,
        }
    }
}

fn invalid(errors: Vec<String>) -> CardiolensError {
    CardiolensError::Validation(errors.join("; "))
}

/// Service over the prediction endpoints.
pub struct PredictionService<P>
where
    P: PredictionBackend,
{
    backend: Arc<P>,
}

impl<P> PredictionService<P>
where
    P: PredictionBackend,
{
    /// Create a new prediction service.
    pub fn new(backend: Arc<P>) -> Self {
        Self { backend }
    }

    /// Predict one lifestyle vector.
    ///
    /// # Errors
    /// Returns [`CardiolensError::Validation`] before any request if a code
    /// is out of range, or the gateway error.
    pub async fn assess_lifestyle(&self, input: &LifestyleInput) -> Result<RiskAssessment> {
        input.validate().map_err(invalid)?;
        let response = self.backend.predict_lifestyle_one(input).await?;
        Ok(RiskAssessment::from(response))
    }

    /// Predict one clinical vector.
    ///
    /// # Errors
    /// Returns [`CardiolensError::Validation`] before any request if a field
    /// is out of range, or the gateway error.
    pub async fn assess_clinical(&self, input: &ClinicalInput) -> Result<RiskAssessment> {
        input.validate().map_err(invalid)?;
        let response = self.backend.predict_clinical_one(input).await?;
        Ok(RiskAssessment::from(response))
    }

    /// Predict a batch of lifestyle vectors, one assessment per row.
    ///
    /// # Errors
    /// Returns the first validation failure (prefixed with its row index),
    /// or the gateway error.
    pub async fn assess_lifestyle_batch(&self, batch: &[LifestyleInput]) -> Result<Vec<RiskAssessment>> {
        for (row, input) in batch.iter().enumerate() {
            input
                .validate()
                .map_err(|errors| CardiolensError::Validation(format!("row {row}: {}", errors.join("; "))))?;
        }

        let responses = self.backend.predict_lifestyle(batch).await?;
        if responses.len() != batch.len() {
            tracing::warn!(sent = batch.len(), received = responses.len(), "prediction count mismatch");
        }
        Ok(responses.into_iter().map(RiskAssessment::from).collect())
    }

    /// Run every lifestyle model and reshape the result for display.
    ///
    /// # Errors
    /// Returns the gateway error, or [`GatewayError::ShapeDrift`] if the
    /// response contradicts itself.
    pub async fn compare_lifestyle(&self, input: &LifestyleInput) -> Result<ComparisonView> {
        input.validate().map_err(invalid)?;
        let result = self.backend.compare_lifestyle(input).await?;
        view("compare lifestyle", result)
    }

    /// Run every clinical model and reshape the result for display.
    ///
    /// # Errors
    /// Returns the gateway error, or [`GatewayError::ShapeDrift`] if the
    /// response contradicts itself.
    pub async fn compare_clinical(&self, input: &ClinicalInput) -> Result<ComparisonView> {
        input.validate().map_err(invalid)?;
        let result = self.backend.compare_clinical(input).await?;
        view("compare clinical", result)
    }

    /// Feature attributions for a clinical prediction, strongest first.
    ///
    /// `top` limits the list; `None` returns every feature.
    ///
    /// # Errors
    /// Returns the gateway error.
    pub async fn explain(&self, input: &ClinicalInput, top: Option<usize>) -> Result<Vec<FeatureImportance>> {
        input.validate().map_err(invalid)?;
        let explanation = self.backend.explain(input).await?;
        Ok(match top {
            Some(n) => explanation.top(n),
            None => explanation.ranked(),
        })
    }

    /// Fill an intake form from raw measurements.
    ///
    /// Bins the measurements, estimates the cluster with the intake weight
    /// table, runs the lifestyle model and stamps the derived risk fields.
    ///
    /// # Errors
    /// Returns [`CardiolensError::Validation`] for a non-positive height, or
    /// the gateway error.
    pub async fn prepare_intake(
        &self,
        input: PatientInput,
        measurements: &LifestyleMeasurements,
    ) -> Result<PatientInput> {
        let features = LifestyleInput::from_measurements(measurements)
            .ok_or_else(|| CardiolensError::Validation("height must be positive".to_string()))?;
        let cluster = estimate_cluster(
            &features.cluster_features(),
            measurements.age,
            &ClusterWeights::CREATE_PATIENT,
        );

        let assessment = self.assess_lifestyle(&features).await?;
        tracing::debug!(cluster, risk = %assessment.risk_level, "intake assessed");

        Ok(input
            .with_metrics(features.to_metrics(cluster))
            .with_risk_score(assessment.risk_score))
    }
}

fn view(operation: &'static str, result: CompareResult) -> Result<ComparisonView> {
    ComparisonView::from_result(result).map_err(|drift| {
        tracing::error!(operation, error = %drift, "comparison response is inconsistent");
        CardiolensError::Gateway(GatewayError::from(drift))
    })
}
