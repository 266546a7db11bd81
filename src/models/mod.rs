//! Data models for the Vidhya API.

pub mod patient;
pub mod prescription;
pub mod recommendation;
pub mod user;

pub use patient::{Patient, PatientIntake};
pub use prescription::{Diagnosis, MedicineEntry, PrescriptionRecord, PrescriptionSubmission};
pub use recommendation::{
    AiMedicine, AiRecommendation, MedicineRecommendation, RecommendationQuery,
    RecommendationResponse, Source, SourceInfo,
};
pub use user::User;
