//! Hybrid recommendation engine.
//!
//! Blends previously recorded prescriptions with a generative fallback:
//! history is scored for similarity first, and the fallback is consulted
//! only when the historical yield falls short of the target. All working
//! state is request-local; the engine holds only injected handles.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, instrument};

use crate::ai::AiService;
use crate::db::Database;
use crate::error::{AppError, FallbackError};
use crate::models::{PrescriptionSubmission, RecommendationQuery, RecommendationResponse, SourceInfo};

pub mod diagnosis;
pub mod identity;
pub mod merge;
pub mod similarity;

/// How many scored candidates are kept for merging, independent of the
/// recommendation target count.
pub const CANDIDATE_POOL_LIMIT: usize = 10;

pub struct RecommendationEngine {
    store: Database,
    ai: Arc<AiService>,
    /// Strict timeout around the single fallback await point.
    fallback_timeout_secs: u64,
}

/// Ids produced by persisting a finalized prescription.
#[derive(Debug, Serialize)]
pub struct SavedPrescription {
    pub prescription_id: i64,
    pub patient_id: i64,
    /// Whether identity resolution created a new patient record.
    pub patient_created: bool,
}

impl RecommendationEngine {
    pub fn new(store: Database, ai: Arc<AiService>, fallback_timeout_secs: u64) -> Self {
        Self {
            store,
            ai,
            fallback_timeout_secs,
        }
    }

    /// Run one recommendation request end to end.
    ///
    /// A store or fallback failure aborts the whole request; there is no
    /// partial-success path that silently degrades to historical-only
    /// results.
    #[instrument(skip(self, query), fields(
        symptoms = query.symptoms.len(),
        conditions = query.health_conditions.len(),
        target = query.target_count,
    ))]
    pub async fn recommend(
        &self,
        query: &RecommendationQuery,
    ) -> Result<RecommendationResponse, AppError> {
        let candidates = self.store.list_prescriptions(query.user_id).await?;
        let scored = similarity::score(query, candidates, CANDIDATE_POOL_LIMIT);
        debug!(matches = scored.len(), "scored historical candidates");

        let outcome = merge::merge(&scored, query.target_count, |count| {
            let ai = Arc::clone(&self.ai);
            let symptoms = query.symptoms.clone();
            let conditions = query.health_conditions.clone();
            let timeout_secs = self.fallback_timeout_secs;
            async move {
                match tokio::time::timeout(
                    Duration::from_secs(timeout_secs),
                    ai.generate(&symptoms, &conditions, count),
                )
                .await
                {
                    Ok(result) => result,
                    Err(_) => Err(FallbackError::Timeout(timeout_secs)),
                }
            }
        })
        .await?;

        let diagnosis = diagnosis::resolve(&scored, outcome.ai_diagnosis);
        let total_count = outcome.medicines.len();
        Ok(RecommendationResponse {
            diagnosis,
            medicines: outcome.medicines,
            source_info: SourceInfo {
                historical_count: outcome.historical_count,
                ai_count: outcome.ai_count,
                total_count,
            },
        })
    }

    /// Persist a finalized prescription, resolving patient identity first so
    /// repeat submissions for the same person reuse one patient record.
    #[instrument(skip(self, submission))]
    pub async fn save_prescription(
        &self,
        user_id: i64,
        submission: PrescriptionSubmission,
    ) -> Result<SavedPrescription, AppError> {
        let existing = self.store.list_patients(user_id).await?;
        let intake = &submission.patient;
        let (patient_id, patient_created) =
            match identity::resolve(&existing, &intake.name, intake.age, &intake.gender) {
                Some(patient) => (patient.id, false),
                None => {
                    let id = self
                        .store
                        .create_patient(
                            user_id,
                            &intake.name,
                            intake.age,
                            &intake.gender,
                            intake.phone.as_deref(),
                        )
                        .await?;
                    (id, true)
                }
            };

        let prescription_id = self
            .store
            .create_prescription(
                user_id,
                patient_id,
                &submission.symptoms,
                &submission.health_conditions,
                &submission.diagnosis,
                &submission.medicines,
                submission.notes.as_deref(),
            )
            .await?;

        Ok(SavedPrescription {
            prescription_id,
            patient_id,
            patient_created,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Diagnosis, MedicineEntry, PatientIntake, Source};
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn engine_with_mock_ai(server: &MockServer) -> (RecommendationEngine, Database, i64) {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        let owner = db
            .create_user("dr@vidhya.in", "hash", "Dr. Sharma", None, None)
            .await
            .unwrap();
        let ai = Arc::new(AiService::new("test-key".into(), Some(server.uri()), None));
        (RecommendationEngine::new(db.clone(), ai, 5), db, owner)
    }

    fn ai_reply(count: usize) -> serde_json::Value {
        let medicines: Vec<_> = (0..count)
            .map(|i| {
                json!({
                    "name": format!("AI Medicine {i}"),
                    "description": "generated",
                    "recommended_dosage": "10ml",
                    "timing": "Before meals"
                })
            })
            .collect();
        let content = json!({
            "diagnosis": {
                "primary_condition": "Pratishyaya",
                "secondary_conditions": [],
                "ayurvedic_analysis": "Kapha aggravation"
            },
            "medicines": medicines
        })
        .to_string();
        json!({ "choices": [ { "message": { "role": "assistant", "content": content } } ] })
    }

    fn submission(name: &str, age: i64, gender: &str) -> PrescriptionSubmission {
        PrescriptionSubmission {
            patient: PatientIntake {
                name: name.to_string(),
                age,
                gender: gender.to_string(),
                phone: None,
            },
            symptoms: vec!["fever".to_string()],
            health_conditions: vec![],
            diagnosis: Diagnosis {
                primary_condition: "Jwara".to_string(),
                secondary_conditions: vec![],
                ayurvedic_analysis: String::new(),
            },
            medicines: vec![MedicineEntry {
                name: "Dabur Honitus".to_string(),
                dosage: "10ml syrup".to_string(),
                timing: "After meals".to_string(),
                duration: None,
            }],
            notes: None,
        }
    }

    #[tokio::test]
    async fn one_historical_record_plus_ai_fills_target() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(ai_reply(7)))
            .mount(&server)
            .await;

        let (engine, _db, owner) = engine_with_mock_ai(&server).await;
        engine.save_prescription(owner, submission("Ravi", 40, "Male")).await.unwrap();

        let query = RecommendationQuery {
            symptoms: vec!["fever".to_string(), "cough".to_string()],
            health_conditions: vec![],
            user_id: Some(owner),
            target_count: 8,
        };
        let response = engine.recommend(&query).await.unwrap();

        assert_eq!(response.medicines.len(), 8);
        assert_eq!(response.source_info.historical_count, 1);
        assert_eq!(response.source_info.ai_count, 7);
        assert_eq!(response.source_info.total_count, 8);

        let first = &response.medicines[0];
        assert_eq!(first.name, "Dabur Honitus");
        assert_eq!(first.source, Source::Historical);
        // "fever" matched once: score 2*1 + 0.
        assert_eq!(first.similarity_score, Some(2));
        assert!(response.medicines[1..].iter().all(|m| m.source == Source::Ai));

        // Historical diagnosis outranks the AI's "Pratishyaya".
        assert_eq!(response.diagnosis.primary_condition, "Jwara");
    }

    #[tokio::test]
    async fn empty_history_uses_ai_diagnosis() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(ai_reply(3)))
            .mount(&server)
            .await;

        let (engine, _db, owner) = engine_with_mock_ai(&server).await;
        let query = RecommendationQuery {
            symptoms: vec!["sneezing".to_string()],
            health_conditions: vec![],
            user_id: Some(owner),
            target_count: 8,
        };
        let response = engine.recommend(&query).await.unwrap();

        assert_eq!(response.source_info.historical_count, 0);
        assert_eq!(response.source_info.ai_count, 3);
        assert_eq!(response.diagnosis.primary_condition, "Pratishyaya");
    }

    #[tokio::test]
    async fn fallback_failure_fails_the_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let (engine, _db, owner) = engine_with_mock_ai(&server).await;
        let query = RecommendationQuery {
            symptoms: vec!["fever".to_string()],
            health_conditions: vec![],
            user_id: Some(owner),
            target_count: 8,
        };
        let err = engine.recommend(&query).await.unwrap_err();
        assert!(matches!(err, AppError::Fallback(FallbackError::Status(503))));
    }

    #[tokio::test]
    async fn slow_fallback_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(ai_reply(8))
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let db = Database::connect("sqlite::memory:").await.unwrap();
        let owner = db
            .create_user("dr@vidhya.in", "hash", "Dr. Sharma", None, None)
            .await
            .unwrap();
        let ai = Arc::new(AiService::new("test-key".into(), Some(server.uri()), None));
        let engine = RecommendationEngine::new(db, ai, 1);

        let query = RecommendationQuery {
            symptoms: vec!["fever".to_string()],
            health_conditions: vec![],
            user_id: Some(owner),
            target_count: 8,
        };
        let err = engine.recommend(&query).await.unwrap_err();
        assert!(matches!(err, AppError::Fallback(FallbackError::Timeout(1))));
    }

    #[tokio::test]
    async fn repeat_submissions_reuse_the_patient_record() {
        let server = MockServer::start().await;
        let (engine, db, owner) = engine_with_mock_ai(&server).await;

        let first = engine
            .save_prescription(owner, submission("Ravi", 40, "Male"))
            .await
            .unwrap();
        assert!(first.patient_created);

        // Same identity key, different casing.
        let second = engine
            .save_prescription(owner, submission("ravi", 40, "male"))
            .await
            .unwrap();
        assert!(!second.patient_created);
        assert_eq!(second.patient_id, first.patient_id);

        // Different age is a different patient.
        let third = engine
            .save_prescription(owner, submission("Ravi", 41, "Male"))
            .await
            .unwrap();
        assert!(third.patient_created);
        assert_ne!(third.patient_id, first.patient_id);

        assert_eq!(db.list_patients(owner).await.unwrap().len(), 2);
    }
}
