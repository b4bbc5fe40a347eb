//! HTTP adapter: reqwest implementation of every backend port.
//!
//! One client is shared by all operations. Each operation issues exactly
//! one request, logs failures with its operation label, and returns the
//! failure unchanged. There is no retry, caching or authentication here.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::domain::admin::{ConfusionMatrix, DatabaseStats, ModelMetrics, ModelStatus, SystemStats};
use crate::domain::examination::{
    ClinicalExaminationInput, DiagnosisUpdate, Examination, ExaminationKind, LifestyleExaminationInput,
    MarkTrainedReceipt, TrainingExport, TrainingOverview, TrainingStats,
};
use crate::domain::history::{EkgPoint, MedicalDocument, MedicalEvent, NewDocument, NewMedicalEvent};
use crate::domain::treatment::{Treatment, TreatmentPlan, TreatmentPlanReceipt};
use crate::domain::{
    Acknowledgement, ClinicalInput, CompareResult, LifestyleInput, Patient, PatientInput, PredictionBatch,
    PredictionResponse, ShapExplanation,
};
use crate::ports::{AdminBackend, GatewayError, PatientRepository, PredictionBackend, TrainingBackend};

/// Base URL used when neither the runtime nor the build environment sets one.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

const API_URL_ENV: &str = "CARDIOLENS_API_URL";
const API_TIMEOUT_ENV: &str = "CARDIOLENS_API_TIMEOUT_MS";
const HEALTH_TIMEOUT_ENV: &str = "CARDIOLENS_HEALTH_TIMEOUT_MS";

/// Connection settings for the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    /// Base URL without trailing slash
    pub base_url: String,

    /// Per-request timeout for regular operations
    pub timeout: Duration,

    /// Timeout of the liveness probe
    pub health_timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: option_env!("CARDIOLENS_API_URL")
                .unwrap_or(DEFAULT_BASE_URL)
                .to_string(),
            timeout: Duration::from_millis(10_000),
            health_timeout: Duration::from_millis(3_000),
        }
    }
}

fn positive_millis(value: Option<String>) -> Option<Duration> {
    let ms = value?.trim().parse::<u64>().ok()?;
    (ms > 0).then(|| Duration::from_millis(ms))
}

impl GatewayConfig {
    /// Load config overrides from environment (best-effort).
    ///
    /// Supported:
    /// - CARDIOLENS_API_URL
    /// - CARDIOLENS_API_TIMEOUT_MS
    /// - CARDIOLENS_HEALTH_TIMEOUT_MS
    #[must_use]
    pub fn from_env_or_default() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Self::from_env_or_default`] with an injectable lookup.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Self::default();

        if let Some(url) = lookup(API_URL_ENV) {
            let url = url.trim();
            if !url.is_empty() {
                cfg.base_url = url.to_string();
            }
        }
        if let Some(timeout) = positive_millis(lookup(API_TIMEOUT_ENV)) {
            cfg.timeout = timeout;
        }
        if let Some(timeout) = positive_millis(lookup(HEALTH_TIMEOUT_ENV)) {
            cfg.health_timeout = timeout;
        }

        cfg
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

/// REST client for the prediction backend.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: Client,
    base_url: String,
    health_timeout: Duration,
}

impl HttpGateway {
    /// Create a gateway configured from the environment.
    ///
    /// # Errors
    /// Returns [`GatewayError::Client`] if the HTTP client cannot be built.
    pub fn new() -> Result<Self, GatewayError> {
        Self::with_config(GatewayConfig::from_env_or_default())
    }

    /// Create a gateway with explicit configuration.
    ///
    /// # Errors
    /// Returns [`GatewayError::Client`] if the base URL is empty or the
    /// HTTP client cannot be built.
    pub fn with_config(config: GatewayConfig) -> Result<Self, GatewayError> {
        let base_url = config.base_url.trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(GatewayError::Client("empty base URL".to_string()));
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| GatewayError::Client(format!("failed to build HTTP client: {e}")))?;

        tracing::debug!(base_url = %base_url, timeout = ?config.timeout, "HTTP gateway ready");

        Ok(Self {
            client,
            base_url,
            health_timeout: config.health_timeout,
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Send one request and decode a 2xx body as `T`.
    async fn execute<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> Result<T, GatewayError> {
        let response = request.send().await.map_err(|source| {
            tracing::error!(operation, error = %source, timeout = source.is_timeout(), "request failed");
            GatewayError::Transport { operation, source }
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|source| {
            tracing::error!(operation, error = %source, "failed to read response body");
            GatewayError::Transport { operation, source }
        })?;

        if !status.is_success() {
            tracing::error!(operation, status = status.as_u16(), body_len = body.len(), "backend returned error status");
            return Err(GatewayError::Status {
                operation,
                status,
                body,
            });
        }

        serde_json::from_str(&body).map_err(|source| {
            tracing::error!(operation, error = %source, "malformed response body");
            GatewayError::Decode { operation, source }
        })
    }

    async fn get<T: DeserializeOwned>(&self, operation: &'static str, path: &str) -> Result<T, GatewayError> {
        self.execute(operation, self.client.get(self.url(path))).await
    }

    async fn get_for_model<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        path: &str,
        model: Option<&str>,
    ) -> Result<T, GatewayError> {
        let mut request = self.client.get(self.url(path));
        if let Some(model) = model {
            request = request.query(&[("model", model)]);
        }
        self.execute(operation, request).await
    }

    async fn post<B, T>(&self, operation: &'static str, path: &str, body: &B) -> Result<T, GatewayError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        self.execute(operation, self.client.post(self.url(path)).json(body)).await
    }

    async fn put<B, T>(&self, operation: &'static str, path: &str, body: &B) -> Result<T, GatewayError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        self.execute(operation, self.client.put(self.url(path)).json(body)).await
    }

    async fn delete<T: DeserializeOwned>(&self, operation: &'static str, path: &str) -> Result<T, GatewayError> {
        self.execute(operation, self.client.delete(self.url(path))).await
    }
}

#[async_trait]
impl PatientRepository for HttpGateway {
    async fn list_patients(&self) -> Result<Vec<Patient>, GatewayError> {
        self.get("list patients", "/patients").await
    }

    async fn get_patient(&self, id: &str) -> Result<Patient, GatewayError> {
        self.get("get patient", &format!("/patients/{id}")).await
    }

    async fn create_patient(&self, input: &PatientInput) -> Result<Patient, GatewayError> {
        self.post("create patient", "/patients", input).await
    }

    async fn update_patient(&self, id: &str, input: &PatientInput) -> Result<Patient, GatewayError> {
        self.put("update patient", &format!("/patients/{id}"), input).await
    }

    async fn delete_patient(&self, id: &str) -> Result<Acknowledgement, GatewayError> {
        self.delete("delete patient", &format!("/patients/{id}")).await
    }

    async fn patient_history(&self, patient_id: &str) -> Result<Vec<MedicalEvent>, GatewayError> {
        self.get("patient history", &format!("/patients/{patient_id}/history"))
            .await
    }

    async fn create_medical_event(&self, event: &NewMedicalEvent) -> Result<MedicalEvent, GatewayError> {
        let path = format!("/patients/{}/history", event.patient_id);
        self.post("create medical event", &path, event).await
    }

    async fn delete_medical_event(&self, event_id: u64) -> Result<Acknowledgement, GatewayError> {
        self.delete("delete medical event", &format!("/events/{event_id}"))
            .await
    }

    async fn ekg_series(&self, patient_id: &str) -> Result<Vec<EkgPoint>, GatewayError> {
        self.get("ekg series", &format!("/patients/{patient_id}/ekg"))
            .await
    }

    async fn list_documents(&self, patient_id: &str) -> Result<Vec<MedicalDocument>, GatewayError> {
        self.get("list documents", &format!("/patients/{patient_id}/documents"))
            .await
    }

    async fn create_document(&self, document: &NewDocument) -> Result<MedicalDocument, GatewayError> {
        let path = format!("/patients/{}/documents", document.patient_id);
        self.post("create document", &path, document).await
    }

    async fn list_treatments(&self) -> Result<Vec<Treatment>, GatewayError> {
        self.get("list treatments", "/treatments").await
    }

    async fn save_treatment_plan(&self, plan: &TreatmentPlan) -> Result<TreatmentPlanReceipt, GatewayError> {
        self.post("save treatment plan", "/treatments/plan", plan).await
    }
}

#[async_trait]
impl PredictionBackend for HttpGateway {
    async fn predict_lifestyle(&self, batch: &[LifestyleInput]) -> Result<Vec<PredictionResponse>, GatewayError> {
        let body = PredictionBatch { patients: batch };
        self.post("predict lifestyle", "/predict/lifestyle", &body).await
    }

    async fn predict_clinical(&self, batch: &[ClinicalInput]) -> Result<Vec<PredictionResponse>, GatewayError> {
        let body = PredictionBatch { patients: batch };
        self.post("predict clinical", "/predict/clinical", &body).await
    }

    async fn compare_lifestyle(&self, input: &LifestyleInput) -> Result<CompareResult, GatewayError> {
        self.post("compare lifestyle models", "/predict/lifestyle/compare", input)
            .await
    }

    async fn compare_clinical(&self, input: &ClinicalInput) -> Result<CompareResult, GatewayError> {
        self.post("compare clinical models", "/predict/clinical/compare", input)
            .await
    }

    async fn explain(&self, input: &ClinicalInput) -> Result<ShapExplanation, GatewayError> {
        self.post("explain prediction", "/explain/shap", input).await
    }
}

#[async_trait]
impl TrainingBackend for HttpGateway {
    async fn training_overview(&self) -> Result<TrainingOverview, GatewayError> {
        self.get("training stats", "/training/stats").await
    }

    async fn examination_stats(&self, kind: ExaminationKind) -> Result<TrainingStats, GatewayError> {
        self.get("examination stats", &format!("/examinations/{kind}/stats"))
            .await
    }

    async fn list_examinations(&self, kind: ExaminationKind) -> Result<Vec<Examination>, GatewayError> {
        self.get("list examinations", &format!("/examinations/{kind}"))
            .await
    }

    async fn patient_examinations(
        &self,
        kind: ExaminationKind,
        patient_id: &str,
    ) -> Result<Vec<Examination>, GatewayError> {
        let path = format!("/examinations/{kind}/patient/{patient_id}");
        self.get("patient examinations", &path).await
    }

    async fn training_ready(&self, kind: ExaminationKind) -> Result<Vec<Examination>, GatewayError> {
        self.get("training-ready examinations", &format!("/examinations/{kind}/training-ready"))
            .await
    }

    async fn create_lifestyle_examination(
        &self,
        input: &LifestyleExaminationInput,
    ) -> Result<Examination, GatewayError> {
        self.post("create lifestyle examination", "/examinations/lifestyle", input)
            .await
    }

    async fn create_clinical_examination(
        &self,
        input: &ClinicalExaminationInput,
    ) -> Result<Examination, GatewayError> {
        self.post("create clinical examination", "/examinations/clinical", input)
            .await
    }

    async fn update_diagnosis(
        &self,
        kind: ExaminationKind,
        exam_id: u64,
        update: DiagnosisUpdate,
    ) -> Result<Examination, GatewayError> {
        let path = format!("/examinations/{kind}/{exam_id}/diagnosis");
        self.put("update diagnosis", &path, &update).await
    }

    async fn mark_trained(&self, kind: ExaminationKind, exam_ids: &[u64]) -> Result<MarkTrainedReceipt, GatewayError> {
        let path = format!("/examinations/{kind}/mark-trained");
        self.post("mark examinations trained", &path, exam_ids).await
    }

    async fn export_training_data(&self, kind: ExaminationKind) -> Result<TrainingExport, GatewayError> {
        self.get("export training data", &format!("/training/export/{kind}"))
            .await
    }
}

#[async_trait]
impl AdminBackend for HttpGateway {
    async fn model_metrics(&self, model: Option<&str>) -> Result<ModelMetrics, GatewayError> {
        self.get_for_model("model metrics", "/admin/metrics", model).await
    }

    async fn model_status(&self) -> Result<Vec<ModelStatus>, GatewayError> {
        self.get("model status", "/admin/models").await
    }

    async fn confusion_matrix(&self, model: Option<&str>) -> Result<ConfusionMatrix, GatewayError> {
        self.get_for_model("confusion matrix", "/admin/confusion", model)
            .await
    }

    async fn system_stats(&self) -> Result<SystemStats, GatewayError> {
        self.get("system stats", "/admin/stats").await
    }

    async fn database_stats(&self) -> Result<DatabaseStats, GatewayError> {
        self.get("database stats", "/admin/database-stats").await
    }

    async fn is_reachable(&self) -> bool {
        let probe = self
            .client
            .get(self.url("/docs"))
            .timeout(self.health_timeout)
            .send()
            .await;

        match probe {
            Ok(response) if response.status().is_success() => true,
            Ok(response) => {
                tracing::warn!(status = response.status().as_u16(), "backend health probe failed");
                false
            }
            Err(e) => {
                tracing::warn!(error = %e, timeout = e.is_timeout(), "backend unreachable");
                false
            }
        }
    }
}
