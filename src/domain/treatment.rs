//! Treatment catalogue and per-patient treatment plans.

use serde::{Deserialize, Serialize};

/// Urgency bucket of a treatment protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TreatmentCategory {
    Critical,
    Stable,
}

/// An entry of the `/treatments` catalogue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Treatment {
    pub id: String,
    pub name: String,
    /// Free text such as `"Medication"` or `"Lifestyle"`.
    #[serde(rename = "type")]
    pub kind: String,
    pub category: TreatmentCategory,
    pub icon: String,
}

/// A sticky note placed on the plan board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanNote {
    pub id: String,
    pub text: String,
    pub x: f64,
    pub y: f64,
    pub color: String,
}

/// Body of `POST /treatments/plan`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreatmentPlan {
    pub patient_id: String,
    /// Treatment ids from the catalogue.
    pub treatments: Vec<String>,
    pub notes: Vec<PlanNote>,
}

impl TreatmentPlan {
    #[must_use]
    pub fn new(patient_id: impl Into<String>) -> Self {
        Self {
            patient_id: patient_id.into(),
            treatments: Vec::new(),
            notes: Vec::new(),
        }
    }

    /// Add a treatment once; repeated ids are ignored.
    pub fn add_treatment(&mut self, treatment_id: impl Into<String>) -> bool {
        let id = treatment_id.into();
        if self.treatments.contains(&id) {
            return false;
        }
        self.treatments.push(id);
        true
    }

    pub fn remove_treatment(&mut self, treatment_id: &str) -> bool {
        let before = self.treatments.len();
        self.treatments.retain(|id| id != treatment_id);
        self.treatments.len() != before
    }

    /// Ids referenced by the plan that are missing from `catalogue`.
    #[must_use]
    pub fn unknown_treatments<'a>(&'a self, catalogue: &[Treatment]) -> Vec<&'a str> {
        self.treatments
            .iter()
            .filter(|id| !catalogue.iter().any(|t| &t.id == *id))
            .map(String::as_str)
            .collect()
    }
}

/// Response of `POST /treatments/plan`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreatmentPlanReceipt {
    pub success: bool,
    pub message: String,
    #[serde(default)]
    pub plan_id: Option<String>,
}
