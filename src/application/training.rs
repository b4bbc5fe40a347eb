//! Continuous-learning service: examinations, diagnoses and export.

use std::sync::Arc;

use super::cache::{QueryCache, QueryKey, Resource};
use crate::domain::examination::{
    ClinicalExaminationInput, DiagnosisUpdate, Examination, ExaminationKind, LifestyleExaminationInput,
    MarkTrainedReceipt, TrainingExport, TrainingOverview, TrainingStats,
};
use crate::ports::TrainingBackend;
use crate::{CardiolensError, Result};

/// Service driving the examination lifecycle.
pub struct TrainingService<B>
where
    B: TrainingBackend,
{
    backend: Arc<B>,
    cache: Arc<QueryCache>,
}

impl<B> TrainingService<B>
where
    B: TrainingBackend,
{
    /// Create a new training service.
    pub fn new(backend: Arc<B>, cache: Arc<QueryCache>) -> Self {
        Self { backend, cache }
    }

    fn invalidate(&self) {
        self.cache
            .invalidate_all(&[Resource::Examinations, Resource::TrainingStats]);
    }

    /// Stage counts for both pipelines.
    ///
    /// # Errors
    /// Returns error if the backend call fails and nothing is cached.
    pub async fn overview(&self) -> Result<TrainingOverview> {
        let backend = &self.backend;
        let overview = self
            .cache
            .fetch(QueryKey::all(Resource::TrainingStats), || {
                backend.training_overview()
            })
            .await?;

        if !overview.is_consistent() {
            tracing::warn!("training totals do not match the per-pipeline counts");
        }
        Ok(overview)
    }

    /// Stage counts for one pipeline.
    ///
    /// # Errors
    /// Returns error if the backend call fails and nothing is cached.
    pub async fn stats(&self, kind: ExaminationKind) -> Result<TrainingStats> {
        let backend = &self.backend;
        Ok(self
            .cache
            .fetch(QueryKey::new(Resource::TrainingStats, kind.as_str()), || {
                backend.examination_stats(kind)
            })
            .await?)
    }

    /// # Errors
    /// Returns error if the backend call fails and nothing is cached.
    pub async fn examinations(&self, kind: ExaminationKind) -> Result<Vec<Examination>> {
        let backend = &self.backend;
        Ok(self
            .cache
            .fetch(QueryKey::new(Resource::Examinations, kind.as_str()), || {
                backend.list_examinations(kind)
            })
            .await?)
    }

    /// # Errors
    /// Returns error if the backend call fails and nothing is cached.
    pub async fn patient_examinations(&self, kind: ExaminationKind, patient_id: &str) -> Result<Vec<Examination>> {
        let backend = &self.backend;
        let key = QueryKey::new(Resource::Examinations, format!("{kind}/{patient_id}"));
        Ok(self
            .cache
            .fetch(key, || backend.patient_examinations(kind, patient_id))
            .await?)
    }

    /// Validate and record a lifestyle examination.
    ///
    /// # Errors
    /// Returns [`CardiolensError::Validation`] before any request if a code
    /// is out of range, or the gateway error.
    pub async fn record_lifestyle(&self, input: &LifestyleExaminationInput) -> Result<Examination> {
        input
            .features
            .validate()
            .map_err(|errors| CardiolensError::Validation(errors.join("; ")))?;

        let exam = self.backend.create_lifestyle_examination(input).await?;
        self.invalidate();
        tracing::info!(exam_id = exam.id, prediction = exam.model_prediction, "lifestyle examination recorded");
        Ok(exam)
    }

    /// Validate and record a clinical examination.
    ///
    /// # Errors
    /// Returns [`CardiolensError::Validation`] before any request if a code
    /// is out of range, or the gateway error.
    pub async fn record_clinical(&self, input: &ClinicalExaminationInput) -> Result<Examination> {
        input
            .features
            .validate()
            .map_err(|errors| CardiolensError::Validation(errors.join("; ")))?;

        let exam = self.backend.create_clinical_examination(input).await?;
        self.invalidate();
        tracing::info!(exam_id = exam.id, prediction = exam.model_prediction, "clinical examination recorded");
        Ok(exam)
    }

    /// Attach a doctor diagnosis (0 = no disease, 1 = disease).
    ///
    /// # Errors
    /// Returns [`CardiolensError::Validation`] if `diagnosis` is not 0 or 1,
    /// or the gateway error.
    pub async fn diagnose(&self, kind: ExaminationKind, exam_id: u64, diagnosis: u8) -> Result<Examination> {
        let update = DiagnosisUpdate::new(diagnosis).map_err(CardiolensError::Validation)?;
        let exam = self.backend.update_diagnosis(kind, exam_id, update).await?;
        self.invalidate();

        if exam.model_was_right() == Some(false) {
            tracing::info!(%kind, exam_id, "doctor diagnosis contradicts model prediction");
        }
        Ok(exam)
    }

    /// # Errors
    /// Returns the gateway error.
    pub async fn export(&self, kind: ExaminationKind) -> Result<TrainingExport> {
        let export = self.backend.export_training_data(kind).await?;
        let (positive, negative) = export.class_balance();
        tracing::info!(%kind, rows = export.data.len(), positive, negative, "training data exported");
        Ok(export)
    }

    /// Mark every training-ready examination of `kind` as trained.
    ///
    /// Returns `None` without a write when nothing is ready.
    ///
    /// # Errors
    /// Returns the gateway error.
    pub async fn complete_round(&self, kind: ExaminationKind) -> Result<Option<MarkTrainedReceipt>> {
        let ready = self.backend.training_ready(kind).await?;
        if ready.is_empty() {
            return Ok(None);
        }

        let ids: Vec<u64> = ready.iter().map(|e| e.id).collect();
        let receipt = self.backend.mark_trained(kind, &ids).await?;
        self.invalidate();
        tracing::info!(%kind, marked = receipt.marked_count, "training round completed");
        Ok(Some(receipt))
    }
}
