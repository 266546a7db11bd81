use serde::{Deserialize, Serialize};

/// A patient record owned by one practitioner.
///
/// Patients carry no external identifier at intake: the same person is
/// recognized across prescriptions only by (name, age, gender), resolved by
/// the engine's identity policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub age: i64,
    pub gender: String,
    pub phone: Option<String>,
    pub created_at: i64,
}

/// Patient attributes collected with a prescription submission.
#[derive(Debug, Clone, Deserialize)]
pub struct PatientIntake {
    pub name: String,
    pub age: i64,
    pub gender: String,
    pub phone: Option<String>,
}
