//! Feature vectors sent to the prediction endpoints.
//!
//! Field order and encoding are part of the wire contract: the backend
//! scales the columns positionally before running its models.

use serde::{Deserialize, Serialize};

use super::derivation::{
    age_bin, blood_pressure_class, bmi, bmi_class, cholesterol_class, glucose_class, ClusterFeatures,
};
use super::patient::{HealthMetrics, Patient};

/// Lifestyle model feature names, in wire order.
pub const LIFESTYLE_FEATURE_NAMES: [&str; 10] = [
    "gender",
    "age_bin",
    "BMI_Class",
    "MAP_Class",
    "cholesterol",
    "gluc",
    "smoke",
    "alco",
    "active",
    "history",
];

/// Clinical model feature names, in wire order.
pub const CLINICAL_FEATURE_NAMES: [&str; 11] = [
    "Age",
    "Sex",
    "ChestPainType",
    "RestingBP",
    "Cholesterol",
    "FastingBS",
    "RestingECG",
    "MaxHR",
    "ExerciseAngina",
    "Oldpeak",
    "ST_Slope",
];

/// Behavioral feature vector for the lifestyle (cardio) models.
///
/// All fields are integer category codes, not raw units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifestyleInput {
    /// 1 = male, 0 = female
    pub gender: u8,
    /// 0–4, see [`age_bin`]
    pub age_bin: u8,
    /// 0–3, see [`bmi_class`]
    #[serde(rename = "BMI_Class")]
    pub bmi_class: u8,
    /// 0–3, see [`blood_pressure_class`]
    #[serde(rename = "MAP_Class")]
    pub map_class: u8,
    /// 1–3
    pub cholesterol: u8,
    /// 1–3
    pub gluc: u8,
    pub smoke: u8,
    pub alco: u8,
    pub active: u8,
    /// Prior cardiovascular history: 0 = none, 1 = present
    pub history: u8,
}

/// Raw measurements from the intake form, before binning.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LifestyleMeasurements {
    pub male: bool,
    pub age: u32,
    pub weight_kg: f64,
    pub height_cm: f64,
    pub systolic_bp: f64,
    pub total_cholesterol: f64,
    pub fasting_glucose: f64,
    pub smoker: bool,
    pub drinks_alcohol: bool,
    pub physically_active: bool,
    pub cardiac_history: bool,
}

impl LifestyleInput {
    /// Bin raw measurements into the wire codes.
    ///
    /// Returns `None` when BMI cannot be computed (non-positive height).
    #[must_use]
    pub fn from_measurements(m: &LifestyleMeasurements) -> Option<Self> {
        let bmi = bmi(m.weight_kg, m.height_cm)?;
        Some(Self {
            gender: u8::from(m.male),
            age_bin: age_bin(m.age),
            bmi_class: bmi_class(bmi),
            map_class: blood_pressure_class(m.systolic_bp),
            cholesterol: cholesterol_class(m.total_cholesterol),
            gluc: glucose_class(m.fasting_glucose),
            smoke: u8::from(m.smoker),
            alco: u8::from(m.drinks_alcohol),
            active: u8::from(m.physically_active),
            history: u8::from(m.cardiac_history),
        })
    }

    /// Build from the metric columns stored on a patient row.
    ///
    /// Returns `None` if any required column is missing.
    #[must_use]
    pub fn from_patient(patient: &Patient, history: bool) -> Option<Self> {
        let m = &patient.metrics;
        Some(Self {
            gender: patient.gender_code(),
            age_bin: m.age_bin.unwrap_or_else(|| age_bin(patient.age)),
            bmi_class: m.bmi_class?,
            map_class: m.map_class?,
            cholesterol: m.cholesterol?,
            gluc: m.gluc?,
            smoke: m.smoke?,
            alco: m.alco?,
            active: m.active?,
            history: u8::from(history),
        })
    }

    /// Convert to a vector in wire order.
    #[must_use]
    pub fn to_vec(&self) -> Vec<u8> {
        vec![
            self.gender,
            self.age_bin,
            self.bmi_class,
            self.map_class,
            self.cholesterol,
            self.gluc,
            self.smoke,
            self.alco,
            self.active,
            self.history,
        ]
    }

    /// Risk flags for [`estimate_cluster`](super::derivation::estimate_cluster).
    #[must_use]
    pub const fn cluster_features(&self) -> ClusterFeatures {
        ClusterFeatures {
            cholesterol: self.cholesterol,
            glucose: self.gluc,
            bmi_class: self.bmi_class,
            blood_pressure: self.map_class,
            smoking: self.smoke,
            alcohol: self.alco,
            active: self.active,
        }
    }

    /// Metric columns to store on the patient row.
    #[must_use]
    pub const fn to_metrics(&self, cluster: u8) -> HealthMetrics {
        HealthMetrics {
            cholesterol: Some(self.cholesterol),
            gluc: Some(self.gluc),
            smoke: Some(self.smoke),
            alco: Some(self.alco),
            active: Some(self.active),
            age_bin: Some(self.age_bin),
            bmi_class: Some(self.bmi_class),
            map_class: Some(self.map_class),
            cluster: Some(cluster),
        }
    }

    /// Check every code against its allowed range.
    ///
    /// # Errors
    /// Returns validation errors as a vector of strings.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let checks: [(&str, u8, u8, u8); 10] = [
            ("gender", self.gender, 0, 1),
            ("age_bin", self.age_bin, 0, 4),
            ("BMI_Class", self.bmi_class, 0, 3),
            ("MAP_Class", self.map_class, 0, 3),
            ("cholesterol", self.cholesterol, 1, 3),
            ("gluc", self.gluc, 1, 3),
            ("smoke", self.smoke, 0, 1),
            ("alco", self.alco, 0, 1),
            ("active", self.active, 0, 1),
            ("history", self.history, 0, 1),
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

/// Test-result feature vector for the clinical (heart) models.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[allow(non_snake_case)]
pub struct ClinicalInput {
    /// Age in years
    pub Age: u32,
    /// 1 = male, 0 = female
    pub Sex: u8,
    /// ATA = 0, NAP = 1, ASY = 2, TA = 3
    pub ChestPainType: u8,
    /// Resting systolic pressure, mmHg
    pub RestingBP: u32,
    /// Serum cholesterol, mg/dL
    pub Cholesterol: u32,
    /// Fasting blood sugar > 120 mg/dL
    pub FastingBS: u8,
    /// Normal = 0, ST = 1, LVH = 2
    pub RestingECG: u8,
    /// Maximum heart rate achieved
    pub MaxHR: u32,
    /// N = 0, Y = 1
    pub ExerciseAngina: u8,
    /// ST depression
    pub Oldpeak: f64,
    /// Up = 0, Flat = 1, Down = 2
    pub ST_Slope: u8,
}

impl ClinicalInput {
    /// Convert to a vector in wire order.
    #[must_use]
    pub fn to_vec(&self) -> Vec<f64> {
        vec![
            f64::from(self.Age),
            f64::from(self.Sex),
            f64::from(self.ChestPainType),
            f64::from(self.RestingBP),
            f64::from(self.Cholesterol),
            f64::from(self.FastingBS),
            f64::from(self.RestingECG),
            f64::from(self.MaxHR),
            f64::from(self.ExerciseAngina),
            self.Oldpeak,
            f64::from(self.ST_Slope),
        ]
    }

    /// Validate that all features are within expected ranges.
    ///
    /// # Errors
    /// Returns validation errors as a vector of strings.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if !(1..=120).contains(&self.Age) {
            errors.push(format!("Age {} out of range [1, 120]", self.Age));
        }
        if self.Sex > 1 {
            errors.push(format!("Sex {} must be 0 or 1", self.Sex));
        }
        if self.ChestPainType > 3 {
            errors.push(format!("ChestPainType {} out of range [0, 3]", self.ChestPainType));
        }
        if !(50..=250).contains(&self.RestingBP) {
            errors.push(format!("RestingBP {} out of range [50, 250]", self.RestingBP));
        }
        if self.Cholesterol > 700 {
            errors.push(format!("Cholesterol {} out of range [0, 700]", self.Cholesterol));
        }
        if self.FastingBS > 1 {
            errors.push(format!("FastingBS {} must be 0 or 1", self.FastingBS));
        }
        if self.RestingECG > 2 {
            errors.push(format!("RestingECG {} out of range [0, 2]", self.RestingECG));
        }
        if !(40..=250).contains(&self.MaxHR) {
            errors.push(format!("MaxHR {} out of range [40, 250]", self.MaxHR));
        }
        if self.ExerciseAngina > 1 {
            errors.push(format!("ExerciseAngina {} must be 0 or 1", self.ExerciseAngina));
        }
        if !(-5.0..=10.0).contains(&self.Oldpeak) {
            errors.push(format!("Oldpeak {} out of range [-5, 10]", self.Oldpeak));
        }
        if self.ST_Slope > 2 {
            errors.push(format!("ST_Slope {} out of range [0, 2]", self.ST_Slope));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Body of the batch prediction endpoints: `{"patients": [...]}`.
#[derive(Debug, Clone, Serialize)]
pub struct PredictionBatch<'a, T> {
    pub patients: &'a [T],
}
