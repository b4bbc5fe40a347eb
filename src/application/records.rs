//! Patient records service: cached reads, invalidating writes.

use std::sync::Arc;

use super::cache::{QueryCache, QueryKey, Resource};
use crate::domain::history::{
    sort_newest_first, EkgPoint, EkgSummary, MedicalDocument, MedicalEvent, NewDocument, NewMedicalEvent,
};
use crate::domain::treatment::{Treatment, TreatmentPlan, TreatmentPlanReceipt};
use crate::domain::{
    calculate_metrics, Acknowledgement, DashboardMetrics, Patient, PatientInput, RiskDistribution, RiskLevel,
};
use crate::ports::PatientRepository;
use crate::{CardiolensError, Result};

/// Dashboard header: metrics plus risk breakdown over the patient list.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardSummary {
    pub metrics: DashboardMetrics,
    pub distribution: RiskDistribution,
    /// Patients whose stored health score disagrees with their risk score.
    pub inconsistent_scores: usize,
}

/// Patient records, history, documents and treatment plans.
pub struct PatientService<R>
where
    R: PatientRepository,
{
    repository: Arc<R>,
    cache: Arc<QueryCache>,
}

impl<R> PatientService<R>
where
    R: PatientRepository,
{
    /// Create a new patient service.
    pub fn new(repository: Arc<R>, cache: Arc<QueryCache>) -> Self {
        Self { repository, cache }
    }

    /// # Errors
    /// Returns error if the backend call fails and nothing is cached.
    pub async fn patients(&self) -> Result<Vec<Patient>> {
        let repo = &self.repository;
        Ok(self
            .cache
            .fetch(QueryKey::all(Resource::Patients), || repo.list_patients())
            .await?)
    }

    /// # Errors
    /// Returns error if the backend call fails and nothing is cached.
    pub async fn patient(&self, id: &str) -> Result<Patient> {
        let repo = &self.repository;
        Ok(self
            .cache
            .fetch(QueryKey::new(Resource::Patients, id), || repo.get_patient(id))
            .await?)
    }

    /// Validate and register a patient.
    ///
    /// # Errors
    /// Returns [`CardiolensError::Validation`] before any request if the
    /// input is invalid, or the gateway error.
    pub async fn create_patient(&self, input: &PatientInput) -> Result<Patient> {
        input
            .validate()
            .map_err(|errors| CardiolensError::Validation(errors.join("; ")))?;

        let created = self.repository.create_patient(input).await?;
        self.cache.invalidate(Resource::Patients);
        tracing::info!(patient_id = %created.id, risk = %created.risk_level, "patient created");
        Ok(created)
    }

    /// # Errors
    /// Returns [`CardiolensError::Validation`] before any request if the
    /// input is invalid, or the gateway error.
    pub async fn update_patient(&self, id: &str, input: &PatientInput) -> Result<Patient> {
        input
            .validate()
            .map_err(|errors| CardiolensError::Validation(errors.join("; ")))?;

        let updated = self.repository.update_patient(id, input).await?;
        self.cache.invalidate(Resource::Patients);
        Ok(updated)
    }

    /// Delete a patient and drop everything cached about them.
    ///
    /// # Errors
    /// Returns the gateway error.
    pub async fn delete_patient(&self, id: &str) -> Result<Acknowledgement> {
        let ack = self.repository.delete_patient(id).await?;
        self.cache.invalidate_all(&[
            Resource::Patients,
            Resource::History,
            Resource::Ekg,
            Resource::Documents,
            Resource::Examinations,
        ]);
        tracing::info!(patient_id = %id, "patient deleted");
        Ok(ack)
    }

    /// Medical events, newest first.
    ///
    /// # Errors
    /// Returns error if the backend call fails and nothing is cached.
    pub async fn history(&self, patient_id: &str) -> Result<Vec<MedicalEvent>> {
        let repo = &self.repository;
        let mut events = self
            .cache
            .fetch(QueryKey::new(Resource::History, patient_id), || {
                repo.patient_history(patient_id)
            })
            .await?;
        sort_newest_first(&mut events);
        Ok(events)
    }

    /// # Errors
    /// Returns error if the title is empty, or the gateway error.
    pub async fn add_event(&self, event: &NewMedicalEvent) -> Result<MedicalEvent> {
        if event.title.trim().is_empty() {
            return Err(CardiolensError::Validation("event title is empty".to_string()));
        }
        let created = self.repository.create_medical_event(event).await?;
        self.cache.invalidate(Resource::History);
        Ok(created)
    }

    /// # Errors
    /// Returns the gateway error.
    pub async fn delete_event(&self, event_id: u64) -> Result<Acknowledgement> {
        let ack = self.repository.delete_medical_event(event_id).await?;
        self.cache.invalidate(Resource::History);
        Ok(ack)
    }

    /// EKG series with its summary; `None` summary for an empty series.
    ///
    /// # Errors
    /// Returns error if the backend call fails and nothing is cached.
    pub async fn ekg(&self, patient_id: &str) -> Result<(Vec<EkgPoint>, Option<EkgSummary>)> {
        let repo = &self.repository;
        let series = self
            .cache
            .fetch(QueryKey::new(Resource::Ekg, patient_id), || repo.ekg_series(patient_id))
            .await?;
        let summary = EkgSummary::from_series(&series);
        Ok((series, summary))
    }

    /// # Errors
    /// Returns error if the backend call fails and nothing is cached.
    pub async fn documents(&self, patient_id: &str) -> Result<Vec<MedicalDocument>> {
        let repo = &self.repository;
        Ok(self
            .cache
            .fetch(QueryKey::new(Resource::Documents, patient_id), || {
                repo.list_documents(patient_id)
            })
            .await?)
    }

    /// # Errors
    /// Returns the gateway error.
    pub async fn add_document(&self, document: &NewDocument) -> Result<MedicalDocument> {
        let created = self.repository.create_document(document).await?;
        self.cache.invalidate(Resource::Documents);
        Ok(created)
    }

    /// # Errors
    /// Returns error if the backend call fails and nothing is cached.
    pub async fn treatments(&self) -> Result<Vec<Treatment>> {
        let repo = &self.repository;
        Ok(self
            .cache
            .fetch(QueryKey::all(Resource::Treatments), || repo.list_treatments())
            .await?)
    }

    /// Save a plan after checking its treatments exist in the catalogue.
    ///
    /// # Errors
    /// Returns [`CardiolensError::Validation`] for unknown treatment ids, or
    /// the gateway error.
    pub async fn save_plan(&self, plan: &TreatmentPlan) -> Result<TreatmentPlanReceipt> {
        let catalogue = self.treatments().await?;
        let unknown = plan.unknown_treatments(&catalogue);
        if !unknown.is_empty() {
            return Err(CardiolensError::Validation(format!(
                "unknown treatments: {}",
                unknown.join(", ")
            )));
        }

        let receipt = self.repository.save_treatment_plan(plan).await?;
        tracing::info!(
            patient_id = %plan.patient_id,
            treatments = plan.treatments.len(),
            plan_id = ?receipt.plan_id,
            "treatment plan saved"
        );
        Ok(receipt)
    }

    /// Dashboard figures over the current patient list.
    ///
    /// # Errors
    /// Returns error if the patient list cannot be loaded.
    pub async fn dashboard(&self) -> Result<DashboardSummary> {
        let patients = self.patients().await?;
        let inconsistent_scores = patients
            .iter()
            .filter(|p| p.health_score_is_canonical() == Some(false))
            .count();

        if inconsistent_scores > 0 {
            tracing::debug!(inconsistent_scores, "patients with non-canonical health scores");
        }

        Ok(DashboardSummary {
            metrics: calculate_metrics(&patients),
            distribution: RiskDistribution::from_patients(&patients),
            inconsistent_scores,
        })
    }

    /// High-risk patients, lowest health score first.
    ///
    /// # Errors
    /// Returns error if the patient list cannot be loaded.
    pub async fn high_risk_patients(&self) -> Result<Vec<Patient>> {
        let mut patients: Vec<Patient> = self
            .patients()
            .await?
            .into_iter()
            .filter(|p| p.risk_level == RiskLevel::High)
            .collect();
        patients.sort_by_key(|p| p.health_score);
        Ok(patients)
    }
}
