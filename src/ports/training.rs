//! Training port: examinations and the continuous-learning export.

use async_trait::async_trait;

use super::GatewayError;
use crate::domain::examination::{
    ClinicalExaminationInput, DiagnosisUpdate, Examination, ExaminationKind, LifestyleExaminationInput,
    MarkTrainedReceipt, TrainingExport, TrainingOverview, TrainingStats,
};

/// Backend operations on examinations.
#[async_trait]
pub trait TrainingBackend: Send + Sync {
    /// Stage counts for both pipelines and their sum.
    ///
    /// # Errors
    /// Returns error if the request fails or the body cannot be decoded.
    async fn training_overview(&self) -> Result<TrainingOverview, GatewayError>;

    /// Stage counts for one pipeline.
    ///
    /// # Errors
    /// Returns error if the request fails or the body cannot be decoded.
    async fn examination_stats(&self, kind: ExaminationKind) -> Result<TrainingStats, GatewayError>;

    /// # Errors
    /// Returns error if the request fails or the body cannot be decoded.
    async fn list_examinations(&self, kind: ExaminationKind) -> Result<Vec<Examination>, GatewayError>;

    /// # Errors
    /// Returns error if the request fails or the body cannot be decoded.
    async fn patient_examinations(
        &self,
        kind: ExaminationKind,
        patient_id: &str,
    ) -> Result<Vec<Examination>, GatewayError>;

    /// Diagnosed examinations not yet used for training.
    ///
    /// # Errors
    /// Returns error if the request fails or the body cannot be decoded.
    async fn training_ready(&self, kind: ExaminationKind) -> Result<Vec<Examination>, GatewayError>;

    /// Record a lifestyle examination; the backend attaches its prediction.
    ///
    /// # Errors
    /// Returns error if the request fails or the body cannot be decoded.
    async fn create_lifestyle_examination(
        &self,
        input: &LifestyleExaminationInput,
    ) -> Result<Examination, GatewayError>;

    /// Record a clinical examination; the backend attaches its prediction.
    ///
    /// # Errors
    /// Returns error if the request fails or the body cannot be decoded.
    async fn create_clinical_examination(
        &self,
        input: &ClinicalExaminationInput,
    ) -> Result<Examination, GatewayError>;

    /// Attach the doctor's diagnosis; returns the updated row.
    ///
    /// # Errors
    /// Returns a `Status` error with 404 when the examination does not exist.
    async fn update_diagnosis(
        &self,
        kind: ExaminationKind,
        exam_id: u64,
        update: DiagnosisUpdate,
    ) -> Result<Examination, GatewayError>;

    /// # Errors
    /// Returns error if the request fails or the body cannot be decoded.
    async fn mark_trained(&self, kind: ExaminationKind, exam_ids: &[u64]) -> Result<MarkTrainedReceipt, GatewayError>;

    /// # Errors
    /// Returns error if the request fails or the body cannot be decoded.
    async fn export_training_data(&self, kind: ExaminationKind) -> Result<TrainingExport, GatewayError>;
}
