//! Examinations feeding the continuous-learning loop.
//!
//! An examination is created with the model's prediction and no diagnosis,
//! receives a doctor diagnosis (0 or 1), and is then marked as used for
//! training once exported.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::Add;

use serde::{Deserialize, Serialize};

use super::features::LifestyleInput;
use super::wire;

/// Which examination pipeline a request targets; used as a path segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExaminationKind {
    Lifestyle,
    Clinical,
}

impl ExaminationKind {
    pub const ALL: [Self; 2] = [Self::Lifestyle, Self::Clinical];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Lifestyle => "lifestyle",
            Self::Clinical => "clinical",
        }
    }
}

impl fmt::Display for ExaminationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Position of an examination in the training lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExaminationStage {
    PendingDiagnosis,
    ReadyForTraining,
    Trained,
}

/// A stored examination row.
///
/// The backend echoes the feature columns of the examination alongside the
/// lifecycle fields; they are kept verbatim in `features`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Examination {
    pub id: u64,
    pub patient_id: String,
    pub exam_date: String,
    /// 0 = low risk, 1 = high risk
    #[serde(deserialize_with = "wire::code")]
    pub model_prediction: u8,
    pub model_confidence: f64,
    #[serde(default, deserialize_with = "wire::optional_code")]
    pub doctor_diagnosis: Option<u8>,
    #[serde(default)]
    pub diagnosis_date: Option<String>,
    #[serde(default)]
    pub is_used_for_training: bool,
    #[serde(flatten)]
    pub features: BTreeMap<String, serde_json::Value>,
}

impl Examination {
    #[must_use]
    pub const fn stage(&self) -> ExaminationStage {
        if self.is_used_for_training {
            ExaminationStage::Trained
        } else if self.doctor_diagnosis.is_some() {
            ExaminationStage::ReadyForTraining
        } else {
            ExaminationStage::PendingDiagnosis
        }
    }

    /// Whether the doctor confirmed the model. `None` until diagnosed.
    #[must_use]
    pub fn model_was_right(&self) -> Option<bool> {
        self.doctor_diagnosis.map(|d| d == self.model_prediction)
    }
}

/// Body of `POST /examinations/lifestyle`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LifestyleExaminationInput {
    pub patient_id: String,
    pub exam_date: String,
    #[serde(flatten)]
    pub features: LifestyleInput,
}

/// Binned clinical features recorded with a clinical examination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClinicalExamFeatures {
    pub sex: u8,
    pub age_bin: u8,
    /// Chest pain type, 0–3
    pub cp: u8,
    pub bp_class: u8,
    pub chol_class: u8,
    /// Fasting blood sugar > 120 mg/dL
    pub fbs: u8,
    pub restecg: u8,
    pub thalach_class: u8,
    /// Exercise-induced angina
    pub exang: u8,
    pub oldpeak_class: u8,
    pub slope: u8,
    /// Major vessels colored by fluoroscopy, 0–4
    pub ca: u8,
    /// 1 normal, 2 fixed defect, 3 reversible defect
    pub thal: u8,
}

impl ClinicalExamFeatures {
    /// # Errors
    /// Returns validation errors as a vector of strings.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let checks: [(&str, u8, u8, u8); 13] = [
            ("sex", self.sex, 0, 1),
            ("age_bin", self.age_bin, 0, 4),
            ("cp", self.cp, 0, 3),
            ("bp_class", self.bp_class, 0, 3),
            ("chol_class", self.chol_class, 0, 2),
            ("fbs", self.fbs, 0, 1),
            ("restecg", self.restecg, 0, 2),
            ("thalach_class", self.thalach_class, 0, 3),
            ("exang", self.exang, 0, 1),
            ("oldpeak_class", self.oldpeak_class, 0, 3),
            ("slope", self.slope, 0, 2),
            ("ca", self.ca, 0, 4),
            ("thal", self.thal, 1, 3),
        ];

        let errors: Vec<String> = checks
            .iter()
            .filter(|(_, value, lo, hi)| !(*lo..=*hi).contains(value))
            .map(|(name, value, lo, hi)| format!("{name} {value} out of range [{lo}, {hi}]"))
            .collect();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Body of `POST /examinations/clinical`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClinicalExaminationInput {
    pub patient_id: String,
    pub exam_date: String,
    #[serde(flatten)]
    pub features: ClinicalExamFeatures,
}

/// Body of `PUT /examinations/{kind}/{id}/diagnosis`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosisUpdate {
    pub doctor_diagnosis: u8,
}

impl DiagnosisUpdate {
    /// # Errors
    /// Returns a message if `diagnosis` is not 0 or 1.
    pub fn new(diagnosis: u8) -> Result<Self, String> {
        if diagnosis > 1 {
            return Err(format!("doctor_diagnosis {diagnosis} must be 0 or 1"));
        }
        Ok(Self {
            doctor_diagnosis: diagnosis,
        })
    }
}

impl From<bool> for DiagnosisUpdate {
    fn from(has_disease: bool) -> Self {
        Self {
            doctor_diagnosis: u8::from(has_disease),
        }
    }
}

/// Counts of examinations per lifecycle stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingStats {
    pub total_examinations: u64,
    pub pending_diagnosis: u64,
    pub ready_for_training: u64,
    pub already_trained: u64,
}

impl TrainingStats {
    /// Tally a list of examinations locally.
    #[must_use]
    pub fn from_examinations(exams: &[Examination]) -> Self {
        exams.iter().fold(Self::default(), |mut stats, exam| {
            stats.total_examinations += 1;
            match exam.stage() {
                ExaminationStage::PendingDiagnosis => stats.pending_diagnosis += 1,
                ExaminationStage::ReadyForTraining => stats.ready_for_training += 1,
                ExaminationStage::Trained => stats.already_trained += 1,
            }
            stats
        })
    }

    /// Fraction of examinations carrying a doctor diagnosis.
    #[must_use]
    pub fn labelled_ratio(&self) -> f64 {
        if self.total_examinations == 0 {
            return 0.0;
        }
        let labelled = self.total_examinations.saturating_sub(self.pending_diagnosis);
        #[allow(clippy::cast_precision_loss)]
        let ratio = labelled as f64 / self.total_examinations as f64;
        ratio
    }
}

impl Add for TrainingStats {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            total_examinations: self.total_examinations + rhs.total_examinations,
            pending_diagnosis: self.pending_diagnosis + rhs.pending_diagnosis,
            ready_for_training: self.ready_for_training + rhs.ready_for_training,
            already_trained: self.already_trained + rhs.already_trained,
        }
    }
}

/// Response of `GET /training/stats`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingOverview {
    pub lifestyle: TrainingStats,
    pub clinical: TrainingStats,
    pub total: TrainingStats,
}

impl TrainingOverview {
    #[must_use]
    pub fn for_kind(&self, kind: ExaminationKind) -> TrainingStats {
        match kind {
            ExaminationKind::Lifestyle => self.lifestyle,
            ExaminationKind::Clinical => self.clinical,
        }
    }

    /// `total` equals the sum of both pipelines.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.lifestyle + self.clinical == self.total
    }
}

/// Response of `GET /training/export/{kind}`.
///
/// An empty export carries only `message` and an empty `data` array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingExport {
    pub message: String,
    #[serde(default)]
    pub feature_columns: Option<Vec<String>>,
    #[serde(default)]
    pub target_column: Option<String>,
    #[serde(default)]
    pub data: Vec<serde_json::Map<String, serde_json::Value>>,
}

impl TrainingExport {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Count of `(positive, negative)` rows by target column.
    ///
    /// Rows with a missing or non-binary target are skipped.
    #[must_use]
    pub fn class_balance(&self) -> (usize, usize) {
        let Some(target) = self.target_column.as_deref() else {
            return (0, 0);
        };

        self.data
            .iter()
            .filter_map(|row| row.get(target).and_then(serde_json::Value::as_f64))
            .fold((0, 0), |(pos, neg), value| {
                if (value - 1.0).abs() < f64::EPSILON {
                    (pos + 1, neg)
                } else if value.abs() < f64::EPSILON {
                    (pos, neg + 1)
                } else {
                    (pos, neg)
                }
            })
    }
}

/// Response of `POST /examinations/{kind}/mark-trained`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkTrainedReceipt {
    pub success: bool,
    pub marked_count: u64,
}
