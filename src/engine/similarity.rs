//! Similarity scoring over historical prescriptions.
//!
//! Symptoms are weighted twice as heavily as health conditions: symptom
//! overlap is the stronger signal that two cases call for the same
//! medicines.

use crate::models::{PrescriptionRecord, RecommendationQuery};

/// A historical prescription plus its relevance to the current query.
///
/// Only constructed for positive scores; a zero score means no match and the
/// candidate never appears.
#[derive(Debug, Clone)]
pub struct ScoredCandidate {
    pub record: PrescriptionRecord,
    pub similarity_score: u32,
    pub symptom_matches: u32,
    pub condition_matches: u32,
}

fn normalize(items: &[String]) -> Vec<String> {
    items.iter().map(|s| s.trim().to_lowercase()).collect()
}

/// Score `candidates` against `query` and return matches ranked best-first,
/// capped at `limit`.
///
/// Candidates must arrive most-recent-first; the sort is stable, so equal
/// scores keep that order rather than applying any secondary tiebreak.
pub fn score(
    query: &RecommendationQuery,
    candidates: Vec<PrescriptionRecord>,
    limit: usize,
) -> Vec<ScoredCandidate> {
    let query_symptoms = normalize(&query.symptoms);
    let query_conditions = normalize(&query.health_conditions);

    let mut scored: Vec<ScoredCandidate> = candidates
        .into_iter()
        .filter_map(|record| {
            let record_symptoms = normalize(&record.symptoms);
            let record_conditions = normalize(&record.health_conditions);

            let symptom_matches = query_symptoms
                .iter()
                .filter(|s| record_symptoms.contains(s))
                .count() as u32;
            let condition_matches = query_conditions
                .iter()
                .filter(|c| record_conditions.contains(c))
                .count() as u32;

            let similarity_score = symptom_matches * 2 + condition_matches;
            (similarity_score > 0).then(|| ScoredCandidate {
                record,
                similarity_score,
                symptom_matches,
                condition_matches,
            })
        })
        .collect();

    scored.sort_by(|a, b| b.similarity_score.cmp(&a.similarity_score));
    scored.truncate(limit);
    scored
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Diagnosis;
    use test_case::test_case;

    fn record(id: i64, symptoms: &[&str], conditions: &[&str]) -> PrescriptionRecord {
        PrescriptionRecord {
            id,
            user_id: 1,
            patient_id: 1,
            symptoms: symptoms.iter().map(|s| s.to_string()).collect(),
            health_conditions: conditions.iter().map(|s| s.to_string()).collect(),
            diagnosis: Diagnosis::default(),
            medicines: vec![],
            notes: None,
            created_at: 0,
        }
    }

    fn query(symptoms: &[&str], conditions: &[&str]) -> RecommendationQuery {
        RecommendationQuery {
            symptoms: symptoms.iter().map(|s| s.to_string()).collect(),
            health_conditions: conditions.iter().map(|s| s.to_string()).collect(),
            user_id: None,
            target_count: 8,
        }
    }

    #[test]
    fn empty_query_matches_nothing() {
        let candidates = vec![record(1, &["fever", "cough"], &["diabetes"])];
        assert!(score(&query(&[], &[]), candidates, 10).is_empty());
    }

    #[test_case(&["fever"], &[], 2, 1, 0; "one symptom")]
    #[test_case(&["fever", "cough"], &[], 4, 2, 0; "two symptoms")]
    #[test_case(&[], &["diabetes"], 1, 0, 1; "one condition")]
    #[test_case(&["fever"], &["diabetes"], 3, 1, 1; "symptom and condition")]
    fn score_weights_symptoms_twice(
        symptoms: &[&str],
        conditions: &[&str],
        expected_score: u32,
        expected_symptoms: u32,
        expected_conditions: u32,
    ) {
        let candidates = vec![record(1, &["fever", "cough"], &["diabetes"])];
        let scored = score(&query(symptoms, conditions), candidates, 10);
        assert_eq!(scored.len(), 1);
        assert_eq!(scored[0].similarity_score, expected_score);
        assert_eq!(scored[0].symptom_matches, expected_symptoms);
        assert_eq!(scored[0].condition_matches, expected_conditions);
    }

    #[test]
    fn matching_normalizes_case_and_whitespace() {
        let candidates = vec![record(1, &["  Fever ", "COUGH"], &[])];
        let scored = score(&query(&["fever", " cough  "], &[]), candidates, 10);
        assert_eq!(scored.len(), 1);
        assert_eq!(scored[0].symptom_matches, 2);
    }

    #[test]
    fn zero_score_candidates_are_discarded() {
        let candidates = vec![
            record(1, &["headache"], &[]),
            record(2, &["fever"], &[]),
        ];
        let scored = score(&query(&["fever"], &[]), candidates, 10);
        assert_eq!(scored.len(), 1);
        assert_eq!(scored[0].record.id, 2);
    }

    #[test]
    fn sort_is_descending_and_stable_on_ties() {
        // 2 and 3 tie on score; most-recent-first input order must survive.
        let candidates = vec![
            record(1, &["fever"], &[]),
            record(2, &["fever", "cough"], &[]),
            record(3, &["fever", "cough"], &[]),
        ];
        let scored = score(&query(&["fever", "cough"], &[]), candidates, 10);
        let ids: Vec<i64> = scored.iter().map(|c| c.record.id).collect();
        assert_eq!(ids, vec![2, 3, 1]);
    }

    #[test]
    fn output_is_truncated_to_limit() {
        let candidates = (1..=5).map(|i| record(i, &["fever"], &[])).collect();
        let scored = score(&query(&["fever"], &[]), candidates, 2);
        assert_eq!(scored.len(), 2);
        // Truncation keeps the best-ranked (here: input order, all tied).
        assert_eq!(scored[0].record.id, 1);
    }

    #[test]
    fn match_counts_never_exceed_query_lengths() {
        // Duplicate symptom in the record must not inflate the count.
        let candidates = vec![record(1, &["fever", "fever", "fever"], &[])];
        let scored = score(&query(&["fever"], &[]), candidates, 10);
        assert_eq!(scored[0].symptom_matches, 1);
        assert_eq!(scored[0].similarity_score, 2);
    }
}
