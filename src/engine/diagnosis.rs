//! Diagnosis selection between historical and AI-derived sources.

use crate::models::Diagnosis;

use super::similarity::ScoredCandidate;

/// Pick the diagnosis that accompanies a recommendation.
///
/// A historical record, however sparse its diagnosis text, represents a
/// decision a practitioner already made, so the best-scoring candidate's
/// diagnosis wins verbatim over anything freshly generated; the two are
/// never field-merged. With no history, the AI diagnosis is used; with
/// neither, all fields stay empty.
pub fn resolve(candidates: &[ScoredCandidate], ai_diagnosis: Option<Diagnosis>) -> Diagnosis {
    if let Some(best) = candidates.first() {
        return best.record.diagnosis.clone();
    }
    ai_diagnosis.unwrap_or_default()
}
