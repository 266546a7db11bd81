//! Merging historical and AI-sourced medicine recommendations.
//!
//! Historical entries always come first and are never dropped in favor of AI
//! entries; the fallback is only consulted for the shortfall, and not at all
//! when history already fills the target.

use std::collections::HashSet;
use std::future::Future;

use crate::error::FallbackError;
use crate::models::{Diagnosis, MedicineRecommendation, Source};

use super::similarity::ScoredCandidate;

/// Result of one merge. `historical_count` and `ai_count` measure what each
/// source produced before the final cap, not what survived it.
#[derive(Debug)]
pub struct MergeOutcome {
    pub medicines: Vec<MedicineRecommendation>,
    pub historical_count: usize,
    pub ai_count: usize,
    /// Diagnosis returned by the fallback, when it ran.
    pub ai_diagnosis: Option<Diagnosis>,
}

/// Combine candidate prescriptions with the generative fallback into one
/// deduplicated list capped at `target_count`.
///
/// `fallback` receives the number of additional medicines wanted; that count
/// is advisory and whatever comes back is taken as-is. A fallback error
/// fails the whole merge even though historical entries were already
/// collected.
pub async fn merge<F, Fut>(
    candidates: &[ScoredCandidate],
    target_count: usize,
    fallback: F,
) -> Result<MergeOutcome, FallbackError>
where
    F: FnOnce(usize) -> Fut,
    Fut: Future<Output = Result<crate::models::AiRecommendation, FallbackError>>,
{
    // Dedup by exact medicine name, scoped to this request only.
    let mut seen: HashSet<String> = HashSet::new();
    let mut medicines: Vec<MedicineRecommendation> = Vec::new();

    // Step 1: collect every distinct name across all candidates, best
    // candidate first, stored medicine order within each. No cap yet.
    for candidate in candidates {
        for entry in &candidate.record.medicines {
            if entry.name.is_empty() {
                continue;
            }
            if !seen.insert(entry.name.clone()) {
                continue;
            }
            medicines.push(MedicineRecommendation {
                name: entry.name.clone(),
                description: format!(
                    "Previously prescribed for similar symptoms ({} symptom and {} condition matches)",
                    candidate.symptom_matches, candidate.condition_matches
                ),
                dosage: entry.dosage.clone(),
                timing: entry.timing.clone(),
                source: Source::Historical,
                similarity_score: Some(candidate.similarity_score),
                precautions: None,
            });
        }
    }
    let historical_count = medicines.len();

    // Step 2: consult the fallback only for a shortfall.
    let mut ai_count = 0;
    let mut ai_diagnosis = None;
    if historical_count < target_count {
        let generated = fallback(target_count - historical_count).await?;
        ai_count = generated.medicines.len();
        ai_diagnosis = Some(generated.diagnosis);
        for entry in generated.medicines {
            medicines.push(MedicineRecommendation {
                name: entry.name,
                description: entry.description,
                dosage: entry.recommended_dosage,
                timing: entry.timing,
                source: Source::Ai,
                similarity_score: None,
                precautions: entry.precautions,
            });
        }
    }

    // Step 3: historical-then-AI order is already in place; cap the list.
    medicines.truncate(target_count);

    Ok(MergeOutcome {
        medicines,
        historical_count,
        ai_count,
        ai_diagnosis,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AiMedicine, AiRecommendation, MedicineEntry, PrescriptionRecord};

    fn candidate(id: i64, score: u32, names: &[&str]) -> ScoredCandidate {
        ScoredCandidate {
            record: PrescriptionRecord {
                id,
                user_id: 1,
                patient_id: 1,
                symptoms: vec![],
                health_conditions: vec![],
                diagnosis: Diagnosis::default(),
                medicines: names
                    .iter()
                    .map(|n| MedicineEntry {
                        name: n.to_string(),
                        dosage: "2 tablets".to_string(),
                        timing: "After meals".to_string(),
                        duration: None,
                    })
                    .collect(),
                notes: None,
                created_at: 0,
            },
            similarity_score: score,
            symptom_matches: score / 2,
            condition_matches: score % 2,
        }
    }

    fn ai_medicines(count: usize) -> AiRecommendation {
        AiRecommendation {
            diagnosis: Diagnosis {
                primary_condition: "Jwara".to_string(),
                ..Default::default()
            },
            medicines: (0..count)
                .map(|i| AiMedicine {
                    name: format!("AI Medicine {i}"),
                    description: "generated".to_string(),
                    recommended_dosage: "10ml".to_string(),
                    timing: "Before meals".to_string(),
                    precautions: None,
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn fallback_not_invoked_when_history_fills_target() {
        let candidates = vec![candidate(1, 4, &["A", "B", "C"])];
        // The fallback errors if called; success proves it never ran.
        let outcome = merge(&candidates, 3, |_| async {
            Err(FallbackError::Malformed("must not be called".into()))
        })
        .await
        .unwrap();

        assert_eq!(outcome.historical_count, 3);
        assert_eq!(outcome.ai_count, 0);
        assert!(outcome.ai_diagnosis.is_none());
    }

    #[tokio::test]
    async fn dedup_keeps_entry_from_higher_scoring_candidate() {
        let candidates = vec![
            candidate(1, 6, &["Triphala Churna", "Ashwagandharishta"]),
            candidate(2, 2, &["Triphala Churna", "Brahmi Vati"]),
        ];
        let outcome = merge(&candidates, 8, |_| async { Ok(ai_medicines(0)) })
            .await
            .unwrap();

        let triphala: Vec<_> = outcome
            .medicines
            .iter()
            .filter(|m| m.name == "Triphala Churna")
            .collect();
        assert_eq!(triphala.len(), 1);
        assert_eq!(triphala[0].similarity_score, Some(6));
        assert_eq!(outcome.historical_count, 3);
    }

    #[tokio::test]
    async fn dedup_is_case_sensitive_exact_match() {
        let candidates = vec![candidate(1, 2, &["Triphala Churna", "triphala churna"])];
        let outcome = merge(&candidates, 8, |_| async { Ok(ai_medicines(0)) })
            .await
            .unwrap();
        assert_eq!(outcome.historical_count, 2);
    }

    #[tokio::test]
    async fn empty_names_are_skipped_entirely() {
        let candidates = vec![candidate(1, 2, &["", "Dabur Honitus", ""])];
        let outcome = merge(&candidates, 8, |_| async { Ok(ai_medicines(0)) })
            .await
            .unwrap();
        assert_eq!(outcome.historical_count, 1);
        assert_eq!(outcome.medicines[0].name, "Dabur Honitus");
    }

    #[tokio::test]
    async fn fallback_receives_the_shortfall() {
        let candidates = vec![candidate(1, 2, &["A", "B", "C"])];
        let outcome = merge(&candidates, 8, |count| async move {
            assert_eq!(count, 5);
            Ok(ai_medicines(5))
        })
        .await
        .unwrap();

        assert_eq!(outcome.historical_count, 3);
        assert_eq!(outcome.ai_count, 5);
        assert_eq!(outcome.medicines.len(), 8);
        assert_eq!(
            outcome.ai_diagnosis.as_ref().map(|d| d.primary_condition.as_str()),
            Some("Jwara")
        );
    }

    #[tokio::test]
    async fn historical_entries_precede_ai_and_result_is_capped() {
        let candidates = vec![candidate(1, 2, &["A", "B"])];
        // Fallback over-delivers; the cap still holds.
        let outcome = merge(&candidates, 4, |_| async { Ok(ai_medicines(7)) })
            .await
            .unwrap();

        assert_eq!(outcome.medicines.len(), 4);
        assert_eq!(outcome.medicines[0].source, Source::Historical);
        assert_eq!(outcome.medicines[1].source, Source::Historical);
        assert_eq!(outcome.medicines[2].source, Source::Ai);
        assert_eq!(outcome.medicines[3].source, Source::Ai);
        // Counts report work done, not what survived the cap.
        assert_eq!(outcome.ai_count, 7);
    }

    #[tokio::test]
    async fn excess_historical_entries_are_kept_over_ai_and_then_capped() {
        let candidates = vec![candidate(1, 2, &["A", "B", "C", "D", "E"])];
        let outcome = merge(&candidates, 3, |_| async {
            Err(FallbackError::Malformed("must not be called".into()))
        })
        .await
        .unwrap();

        assert_eq!(outcome.historical_count, 5);
        assert_eq!(outcome.medicines.len(), 3);
        assert!(outcome.medicines.iter().all(|m| m.source == Source::Historical));
    }

    #[tokio::test]
    async fn fallback_failure_fails_the_merge() {
        let candidates = vec![candidate(1, 2, &["A"])];
        let err = merge(&candidates, 8, |_| async {
            Err(FallbackError::Timeout(30))
        })
        .await
        .unwrap_err();
        assert!(matches!(err, FallbackError::Timeout(30)));
    }
}
