//! Medical history: events, EKG series and documents owned by a patient.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize, Serializer};

/// Date format the backend expects on event writes.
pub const EVENT_DATE_FORMAT: &str = "%d/%m/%Y";

/// Resting heart-rate band used to flag EKG samples, in bpm.
pub const NORMAL_HEART_RATE: (u32, u32) = (60, 100);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Test,
    Medication,
    Hospitalization,
    Surgery,
    Checkup,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

/// A stored medical event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicalEvent {
    pub id: u64,
    /// As stored by the backend; usually `DD/MM/YYYY`.
    pub date: String,
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub title: String,
    pub description: String,
    pub doctor: String,
    pub severity: Severity,
}

impl MedicalEvent {
    /// Parse the stored date, accepting `DD/MM/YYYY` or ISO `YYYY-MM-DD`.
    #[must_use]
    pub fn parsed_date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(&self.date, EVENT_DATE_FORMAT)
            .or_else(|_| NaiveDate::parse_from_str(&self.date, "%Y-%m-%d"))
            .ok()
    }
}

fn event_date<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(&date.format(EVENT_DATE_FORMAT))
}

/// Body of `POST /patients/{id}/history`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewMedicalEvent {
    pub patient_id: String,
    #[serde(serialize_with = "event_date")]
    pub date: NaiveDate,
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub title: String,
    pub description: String,
    pub doctor: String,
    pub severity: Severity,
}

/// Events newest first; unparseable dates sort last.
pub fn sort_newest_first(events: &mut [MedicalEvent]) {
    events.sort_by(|a, b| b.parsed_date().cmp(&a.parsed_date()));
}

/// One EKG sample: `HH:MM` and heart rate in bpm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EkgPoint {
    pub time: String,
    pub value: u32,
}

impl EkgPoint {
    #[must_use]
    pub const fn is_abnormal(&self) -> bool {
        self.value < NORMAL_HEART_RATE.0 || self.value > NORMAL_HEART_RATE.1
    }
}

/// Aggregate over an EKG series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EkgSummary {
    pub min: u32,
    pub max: u32,
    pub mean: f64,
    pub abnormal_samples: usize,
}

impl EkgSummary {
    /// Summarize a series. Returns `None` for an empty series.
    #[must_use]
    pub fn from_series(series: &[EkgPoint]) -> Option<Self> {
        let min = series.iter().map(|p| p.value).min()?;
        let max = series.iter().map(|p| p.value).max()?;
        let total: u64 = series.iter().map(|p| u64::from(p.value)).sum();
        #[allow(clippy::cast_precision_loss)]
        let mean = total as f64 / series.len() as f64;

        Some(Self {
            min,
            max,
            mean,
            abnormal_samples: series.iter().filter(|p| p.is_abnormal()).count(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    Pdf,
    Xray,
    Lab,
    Report,
    Image,
    #[serde(other)]
    Other,
}

/// A stored document record. `size` is a display string such as `"2.4 MB"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicalDocument {
    pub id: u64,
    pub name: String,
    #[serde(rename = "type")]
    pub document_type: DocumentType,
    pub date: String,
    pub size: String,
}

/// Body of `POST /patients/{id}/documents`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewDocument {
    pub patient_id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub document_type: DocumentType,
    pub date: String,
    pub size: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
}
