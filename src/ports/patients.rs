//! Patient records port: patients, medical history, documents and plans.

use async_trait::async_trait;

use super::GatewayError;
use crate::domain::history::{EkgPoint, MedicalDocument, MedicalEvent, NewDocument, NewMedicalEvent};
use crate::domain::treatment::{Treatment, TreatmentPlan, TreatmentPlanReceipt};
use crate::domain::{Acknowledgement, Patient, PatientInput};

/// Backend operations on patient records.
///
/// Each method issues exactly one request. Nothing is retried or cached.
#[async_trait]
pub trait PatientRepository: Send + Sync {
    /// List every patient.
    ///
    /// # Errors
    /// Returns error if the request fails or the body cannot be decoded.
    async fn list_patients(&self) -> Result<Vec<Patient>, GatewayError>;

    /// Fetch one patient by id (e.g. `BN-2024-0001`).
    ///
    /// # Errors
    /// Returns a `Status` error with 404 when the patient does not exist.
    async fn get_patient(&self, id: &str) -> Result<Patient, GatewayError>;

    /// Register a patient; the backend assigns the id.
    ///
    /// # Errors
    /// Returns error if the request fails or the body cannot be decoded.
    async fn create_patient(&self, input: &PatientInput) -> Result<Patient, GatewayError>;

    /// Replace a patient's editable fields.
    ///
    /// # Errors
    /// Returns a `Status` error with 404 when the patient does not exist.
    async fn update_patient(&self, id: &str, input: &PatientInput) -> Result<Patient, GatewayError>;

    /// # Errors
    /// Returns a `Status` error with 404 when the patient does not exist.
    async fn delete_patient(&self, id: &str) -> Result<Acknowledgement, GatewayError>;

    /// Medical events of a patient.
    ///
    /// # Errors
    /// Returns error if the request fails or the body cannot be decoded.
    async fn patient_history(&self, patient_id: &str) -> Result<Vec<MedicalEvent>, GatewayError>;

    /// # Errors
    /// Returns error if the request fails or the body cannot be decoded.
    async fn create_medical_event(&self, event: &NewMedicalEvent) -> Result<MedicalEvent, GatewayError>;

    /// # Errors
    /// Returns a `Status` error with 404 when the event does not exist.
    async fn delete_medical_event(&self, event_id: u64) -> Result<Acknowledgement, GatewayError>;

    /// 24-hour heart-rate series.
    ///
    /// # Errors
    /// Returns error if the request fails or the body cannot be decoded.
    async fn ekg_series(&self, patient_id: &str) -> Result<Vec<EkgPoint>, GatewayError>;

    /// # Errors
    /// Returns error if the request fails or the body cannot be decoded.
    async fn list_documents(&self, patient_id: &str) -> Result<Vec<MedicalDocument>, GatewayError>;

    /// # Errors
    /// Returns error if the request fails or the body cannot be decoded.
    async fn create_document(&self, document: &NewDocument) -> Result<MedicalDocument, GatewayError>;

    /// Treatment catalogue.
    ///
    /// # Errors
    /// Returns error if the request fails or the body cannot be decoded.
    async fn list_treatments(&self) -> Result<Vec<Treatment>, GatewayError>;

    /// # Errors
    /// Returns error if the request fails or the body cannot be decoded.
    async fn save_treatment_plan(&self, plan: &TreatmentPlan) -> Result<TreatmentPlanReceipt, GatewayError>;
}
