use serde::{Deserialize, Serialize};

/// One medicine line on a stored prescription.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedicineEntry {
    pub name: String,
    pub dosage: String,
    pub timing: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
}

/// Diagnosis block attached to a prescription or produced by the fallback.
///
/// Either copied verbatim from a historical record or returned whole by the
/// generative fallback; the two are never field-merged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Diagnosis {
    #[serde(default)]
    pub primary_condition: String,
    #[serde(default)]
    pub secondary_conditions: Vec<String>,
    #[serde(default)]
    pub ayurvedic_analysis: String,
}

impl Diagnosis {
    pub fn is_empty(&self) -> bool {
        self.primary_condition.is_empty()
            && self.secondary_conditions.is_empty()
            && self.ayurvedic_analysis.is_empty()
    }
}

/// A finalized prescription as submitted for persistence. The patient is
/// described by intake attributes, not an id; identity resolution decides
/// whether an existing record is reused.
#[derive(Debug, Clone, Deserialize)]
pub struct PrescriptionSubmission {
    pub patient: super::patient::PatientIntake,
    pub symptoms: Vec<String>,
    #[serde(default)]
    pub health_conditions: Vec<String>,
    #[serde(default)]
    pub diagnosis: Diagnosis,
    pub medicines: Vec<MedicineEntry>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// A prescription as persisted by the record store. Read-only to the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrescriptionRecord {
    pub id: i64,
    pub user_id: i64,
    pub patient_id: i64,
    pub symptoms: Vec<String>,
    pub health_conditions: Vec<String>,
    pub diagnosis: Diagnosis,
    pub medicines: Vec<MedicineEntry>,
    pub notes: Option<String>,
    pub created_at: i64,
}
