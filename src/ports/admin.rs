//! Administration port: model evaluation and system statistics.

use async_trait::async_trait;

use super::GatewayError;
use crate::domain::admin::{ConfusionMatrix, DatabaseStats, ModelMetrics, ModelStatus, SystemStats};

/// Backend administration operations.
///
/// `model` selects a model by key (e.g. `cardio_rf`); `None` asks for the
/// backend's default model.
#[async_trait]
pub trait AdminBackend: Send + Sync {
    /// # Errors
    /// Returns error if the request fails or the body cannot be decoded.
    async fn model_metrics(&self, model: Option<&str>) -> Result<ModelMetrics, GatewayError>;

    /// # Errors
    /// Returns error if the request fails or the body cannot be decoded.
    async fn model_status(&self) -> Result<Vec<ModelStatus>, GatewayError>;

    /// # Errors
    /// Returns error if the request fails or the body cannot be decoded.
    async fn confusion_matrix(&self, model: Option<&str>) -> Result<ConfusionMatrix, GatewayError>;

    /// # Errors
    /// Returns error if the request fails or the body cannot be decoded.
    async fn system_stats(&self) -> Result<SystemStats, GatewayError>;

    /// # Errors
    /// Returns error if the request fails or the body cannot be decoded.
    async fn database_stats(&self) -> Result<DatabaseStats, GatewayError>;

    /// Liveness probe. Never fails; any error maps to `false`.
    async fn is_reachable(&self) -> bool;
}
