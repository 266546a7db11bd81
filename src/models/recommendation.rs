use serde::{Deserialize, Serialize};

use super::prescription::Diagnosis;

/// Number of medicines a recommendation aims to return.
pub const DEFAULT_TARGET_COUNT: usize = 8;

/// One recommendation request. Immutable for the duration of the request.
#[derive(Debug, Clone, Deserialize)]
pub struct RecommendationQuery {
    pub symptoms: Vec<String>,
    #[serde(default)]
    pub health_conditions: Vec<String>,
    /// Scopes the historical search to one practitioner; `None` searches
    /// system-wide.
    #[serde(skip)]
    pub user_id: Option<i64>,
    #[serde(default = "default_target_count")]
    pub target_count: usize,
}

fn default_target_count() -> usize {
    DEFAULT_TARGET_COUNT
}

/// Where a recommended medicine came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Historical,
    Ai,
}

/// One medicine in a merged recommendation list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedicineRecommendation {
    pub name: String,
    pub description: String,
    pub dosage: String,
    pub timing: String,
    pub source: Source,
    /// Similarity score of the originating record; historical entries only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity_score: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub precautions: Option<String>,
}

/// How much of the final list each source contributed. Counts reflect work
/// done before truncation, not necessarily what survived the cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SourceInfo {
    pub historical_count: usize,
    pub ai_count: usize,
    pub total_count: usize,
}

/// Final engine output handed to the HTTP layer.
#[derive(Debug, Clone, Serialize)]
pub struct RecommendationResponse {
    pub diagnosis: Diagnosis,
    pub medicines: Vec<MedicineRecommendation>,
    pub source_info: SourceInfo,
}

/// One medicine as returned by the generative fallback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiMedicine {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub recommended_dosage: String,
    #[serde(default)]
    pub timing: String,
    #[serde(default)]
    pub precautions: Option<String>,
}

/// Structured payload parsed from a fallback response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AiRecommendation {
    #[serde(default)]
    pub diagnosis: Diagnosis,
    #[serde(default)]
    pub medicines: Vec<AiMedicine>,
}
