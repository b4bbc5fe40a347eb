//! Prediction port: risk models served by the backend.

use async_trait::async_trait;

use super::GatewayError;
use crate::domain::{ClinicalInput, CompareResult, LifestyleInput, PredictionResponse, ShapExplanation};

/// Backend prediction operations.
#[async_trait]
pub trait PredictionBackend: Send + Sync {
    /// Predict a batch of lifestyle vectors; one response per row, in order.
    ///
    /// # Errors
    /// Returns error if the request fails or the body cannot be decoded.
    async fn predict_lifestyle(&self, batch: &[LifestyleInput]) -> Result<Vec<PredictionResponse>, GatewayError>;

    /// Predict a batch of clinical vectors; one response per row, in order.
    ///
    /// # Errors
    /// Returns error if the request fails or the body cannot be decoded.
    async fn predict_clinical(&self, batch: &[ClinicalInput]) -> Result<Vec<PredictionResponse>, GatewayError>;

    /// Run every lifestyle model on one vector.
    ///
    /// # Errors
    /// Returns error if the request fails or the body cannot be decoded.
    async fn compare_lifestyle(&self, input: &LifestyleInput) -> Result<CompareResult, GatewayError>;

    /// Run every clinical model on one vector.
    ///
    /// # Errors
    /// Returns error if the request fails or the body cannot be decoded.
    async fn compare_clinical(&self, input: &ClinicalInput) -> Result<CompareResult, GatewayError>;

    /// Per-feature attribution for a clinical prediction.
    ///
    /// # Errors
    /// Returns error if the request fails or the body cannot be decoded.
    async fn explain(&self, input: &ClinicalInput) -> Result<ShapExplanation, GatewayError>;

    /// Predict a single lifestyle vector as a one-element batch.
    ///
    /// # Errors
    /// Returns [`GatewayError::EmptyPrediction`] if the backend answers
    /// with an empty array.
    async fn predict_lifestyle_one(&self, input: &LifestyleInput) -> Result<PredictionResponse, GatewayError> {
        first_prediction(
            "predict lifestyle",
            self.predict_lifestyle(std::slice::from_ref(input)).await?,
        )
    }

    /// Predict a single clinical vector as a one-element batch.
    ///
    /// # Errors
    /// Returns [`GatewayError::EmptyPrediction`] if the backend answers
    /// with an empty array.
    async fn predict_clinical_one(&self, input: &ClinicalInput) -> Result<PredictionResponse, GatewayError> {
        first_prediction(
            "predict clinical",
            self.predict_clinical(std::slice::from_ref(input)).await?,
        )
    }
}

fn first_prediction(
    operation: &'static str,
    responses: Vec<PredictionResponse>,
) -> Result<PredictionResponse, GatewayError> {
    responses.into_iter().next().ok_or_else(|| {
        tracing::error!(operation, "backend returned no prediction");
        GatewayError::EmptyPrediction { operation }
    })
}
