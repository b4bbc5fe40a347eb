//! Model evaluation and administration views.

use std::sync::Arc;

use super::cache::{QueryCache, QueryKey, Resource};
use crate::domain::admin::{most_accurate, DatabaseStats, ModelEvaluation, ModelStatus, SystemStats};
use crate::ports::AdminBackend;
use crate::Result;

/// Service over the administration endpoints.
pub struct EvaluationService<A>
where
    A: AdminBackend,
{
    backend: Arc<A>,
    cache: Arc<QueryCache>,
}

impl<A> EvaluationService<A>
where
    A: AdminBackend,
{
    /// Create a new evaluation service.
    pub fn new(backend: Arc<A>, cache: Arc<QueryCache>) -> Self {
        Self { backend, cache }
    }

    /// Metrics and confusion matrix for one model, fetched concurrently.
    ///
    /// `None` selects the backend's default model.
    ///
    /// # Errors
    /// Fails if either request fails.
    pub async fn evaluate(&self, model: Option<&str>) -> Result<ModelEvaluation> {
        let (metrics, confusion) = tokio::try_join!(
            self.backend.model_metrics(model),
            self.backend.confusion_matrix(model),
        )?;

        // Reported metrics are percentages.
        let derived = confusion.accuracy() * 100.0;
        if confusion.total() > 0 && (derived - metrics.accuracy).abs() > 1.0 {
            tracing::debug!(
                model = model.unwrap_or("default"),
                reported = metrics.accuracy,
                derived,
                "reported accuracy differs from confusion matrix"
            );
        }

        Ok(ModelEvaluation { metrics, confusion })
    }

    /// # Errors
    /// Returns error if the backend call fails and nothing is cached.
    pub async fn models(&self) -> Result<Vec<ModelStatus>> {
        let backend = &self.backend;
        Ok(self
            .cache
            .fetch(QueryKey::new(Resource::Admin, "models"), || backend.model_status())
            .await?)
    }

    /// The active model with the highest reported accuracy.
    ///
    /// # Errors
    /// Returns error if the model list cannot be loaded.
    pub async fn best_model(&self) -> Result<Option<ModelStatus>> {
        let models = self.models().await?;
        let active: Vec<ModelStatus> = models.into_iter().filter(ModelStatus::is_active).collect();
        Ok(most_accurate(&active).cloned())
    }

    /// # Errors
    /// Returns error if the backend call fails and nothing is cached.
    pub async fn system_stats(&self) -> Result<SystemStats> {
        let backend = &self.backend;
        Ok(self
            .cache
            .fetch(QueryKey::new(Resource::Admin, "system"), || backend.system_stats())
            .await?)
    }

    /// # Errors
    /// Returns error if the backend call fails and nothing is cached.
    pub async fn database_stats(&self) -> Result<DatabaseStats> {
        let backend = &self.backend;
        let stats = self
            .cache
            .fetch(QueryKey::new(Resource::Admin, "database"), || backend.database_stats())
            .await?;

        if !stats.risk_counts_consistent() {
            tracing::warn!(total = stats.total_patients, "risk counts do not add up to the patient total");
        }
        Ok(stats)
    }

    /// Backend liveness; never fails.
    pub async fn backend_online(&self) -> bool {
        self.backend.is_reachable().await
    }
}
