//! Derivation helpers: raw measurements to the category codes the
//! prediction backend expects.
//!
//! Every function here is a pure step function. The thresholds are part of
//! the wire contract; the backend models were trained on these bins.

use serde::{Deserialize, Serialize};

/// Age bucket (`age_bin` feature): `<35, <45, <55, <65, 65+` → 0–4.
#[must_use]
pub fn age_bin(age: u32) -> u8 {
    match age {
        0..=34 => 0,
        35..=44 => 1,
        45..=54 => 2,
        55..=64 => 3,
        _ => 4,
    }
}

/// Cholesterol code from total cholesterol in mg/dL: 1 normal, 2 above normal, 3 well above.
#[must_use]
pub fn cholesterol_class(total_mg_dl: f64) -> u8 {
    if total_mg_dl < 200.0 {
        1
    } else if total_mg_dl < 240.0 {
        2
    } else {
        3
    }
}

/// Glucose code from fasting glucose in mg/dL: 1 normal, 2 prediabetic, 3 diabetic.
#[must_use]
pub fn glucose_class(fasting_mg_dl: f64) -> u8 {
    if fasting_mg_dl < 100.0 {
        1
    } else if fasting_mg_dl < 126.0 {
        2
    } else {
        3
    }
}

/// Body mass index from weight (kg) and height (cm).
///
/// Returns `None` for a non-positive height.
#[must_use]
pub fn bmi(weight_kg: f64, height_cm: f64) -> Option<f64> {
    if height_cm <= 0.0 || !height_cm.is_finite() || !weight_kg.is_finite() {
        return None;
    }
    let meters = height_cm / 100.0;
    Some(weight_kg / (meters * meters))
}

/// `BMI_Class`: 0 underweight, 1 normal, 2 overweight, 3 obese.
#[must_use]
pub fn bmi_class(bmi: f64) -> u8 {
    if bmi < 18.5 {
        0
    } else if bmi < 25.0 {
        1
    } else if bmi < 30.0 {
        2
    } else {
        3
    }
}

/// `MAP_Class` from systolic pressure in mmHg: 0 low, 1 normal, 2 elevated, 3 high.
#[must_use]
pub fn blood_pressure_class(systolic_mm_hg: f64) -> u8 {
    if systolic_mm_hg < 90.0 {
        0
    } else if systolic_mm_hg < 120.0 {
        1
    } else if systolic_mm_hg < 140.0 {
        2
    } else {
        3
    }
}

/// Canonical health score: `round((1 - risk_score) * 100)`.
///
/// Older patient rows carry hand-entered scores that do not follow this
/// relation; new records are always derived through here.
#[must_use]
pub fn health_score(risk_score: f64) -> u8 {
    let clamped = risk_score.clamp(0.0, 1.0);
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let score = ((1.0 - clamped) * 100.0).round() as u8;
    score
}

/// Confidence of a binary prediction: distance of the probability from the
/// decision boundary, expressed as the probability of the predicted class.
#[must_use]
pub fn prediction_confidence(risk_score: f64) -> f64 {
    let clamped = risk_score.clamp(0.0, 1.0);
    if clamped > 0.5 {
        clamped
    } else {
        1.0 - clamped
    }
}

/// Risk-flag inputs for the cluster heuristic, in wire codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterFeatures {
    /// Cholesterol code (1–3)
    pub cholesterol: u8,
    /// Glucose code (1–3)
    pub glucose: u8,
    /// BMI class (0–3)
    pub bmi_class: u8,
    /// Blood pressure class (0–3)
    pub blood_pressure: u8,
    /// 0 = no, 1 = yes
    pub smoking: u8,
    /// 0 = no, 1 = yes
    pub alcohol: u8,
    /// 0 = inactive, 1 = active
    pub active: u8,
}

/// Point table for [`estimate_cluster`].
///
/// Two tables are in use: [`ClusterWeights::CREATE_PATIENT`] for new
/// patient intake and [`ClusterWeights::SIMULATION`] for the what-if
/// simulator. They are kept separate; callers pick one explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClusterWeights {
    /// Points for cholesterol code 2 and 3
    pub cholesterol: [u32; 2],
    /// Points for glucose code 2 and 3
    pub glucose: [u32; 2],
    /// Points for BMI class 2 (overweight) and 3 (obese)
    pub bmi: [u32; 2],
    /// Points for blood pressure class 2 and 3
    pub blood_pressure: [u32; 2],
    pub smoking: u32,
    pub alcohol: u32,
    pub inactive: u32,
    /// `(minimum age, points)` for the middle and senior age bands
    pub age: [(u32, u32); 2],
    /// Minimum score for clusters 1, 2, 3 and 4
    pub thresholds: [u32; 4],
}

impl ClusterWeights {
    /// Table used when registering a new patient.
    pub const CREATE_PATIENT: Self = Self {
        cholesterol: [1, 2],
        glucose: [1, 2],
        bmi: [1, 2],
        blood_pressure: [1, 2],
        smoking: 1,
        alcohol: 1,
        inactive: 1,
        age: [(50, 1), (60, 2)],
        thresholds: [2, 4, 7, 10],
    };

    /// Table used by the risk simulator; blood pressure, cholesterol and
    /// smoking weigh heavier.
    pub const SIMULATION: Self = Self {
        cholesterol: [1, 3],
        glucose: [1, 2],
        bmi: [1, 2],
        blood_pressure: [2, 3],
        smoking: 2,
        alcohol: 1,
        inactive: 1,
        age: [(55, 1), (65, 2)],
        thresholds: [3, 6, 9, 12],
    };

    /// Highest score this table can produce.
    #[must_use]
    pub fn max_score(&self) -> u32 {
        self.cholesterol[1]
            + self.glucose[1]
            + self.bmi[1]
            + self.blood_pressure[1]
            + self.smoking
            + self.alcohol
            + self.inactive
            + self.age[1].1
    }
}

fn graded(code: u8, moderate_code: u8, points: [u32; 2]) -> u32 {
    if code > moderate_code {
        points[1]
    } else if code == moderate_code {
        points[0]
    } else {
        0
    }
}

/// Weighted risk score behind [`estimate_cluster`].
#[must_use]
pub fn cluster_score(features: &ClusterFeatures, age: u32, weights: &ClusterWeights) -> u32 {
    let mut score = 0;
    score += graded(features.cholesterol, 2, weights.cholesterol);
    score += graded(features.glucose, 2, weights.glucose);
    score += graded(features.bmi_class, 2, weights.bmi);
    score += graded(features.blood_pressure, 2, weights.blood_pressure);
    if features.smoking == 1 {
        score += weights.smoking;
    }
    if features.alcohol == 1 {
        score += weights.alcohol;
    }
    if features.active == 0 {
        score += weights.inactive;
    }

    let [(middle_age, middle_points), (senior_age, senior_points)] = weights.age;
    if age >= senior_age {
        score += senior_points;
    } else if age >= middle_age {
        score += middle_points;
    }
    score
}

/// Heuristic `cluster` feature (0–4) from risk flags.
///
/// This is an estimate sent alongside the lifestyle features, not a trained
/// clustering model.
#[must_use]
pub fn estimate_cluster(features: &ClusterFeatures, age: u32, weights: &ClusterWeights) -> u8 {
    let score = cluster_score(features, age, weights);
    let reached = weights.thresholds.iter().filter(|&&t| score >= t).count();
    // At most four thresholds.
    #[allow(clippy::cast_possible_truncation)]
    let cluster = reached as u8;
    cluster
}
