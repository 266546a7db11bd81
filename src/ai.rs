//! Generative fallback client.
//!
//! Talks to an OpenAI-compatible chat-completions endpoint. The engine only
//! consumes the structured response; prompt design aside, no medical content
//! originates here. Malformed output beyond structural parsing is not
//! reinterpreted: it fails the whole recommendation request.

use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, instrument};

use crate::error::FallbackError;
use crate::models::AiRecommendation;

const DEFAULT_BASE_URL: &str = "https://api.openai.com";
const DEFAULT_MODEL: &str = "gpt-4o";

pub struct AiService {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl AiService {
    pub fn new(api_key: String, base_url: Option<String>, model: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            api_key,
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        }
    }

    /// Ask the model to diagnose and suggest `count` Ayurvedic medicines for
    /// the given symptoms and health conditions.
    ///
    /// The requested count is advisory: the model's own output length is
    /// returned as-is and capped later by the merger.
    #[instrument(skip(self, symptoms, health_conditions), fields(model = %self.model))]
    pub async fn generate(
        &self,
        symptoms: &[String],
        health_conditions: &[String],
        count: usize,
    ) -> Result<AiRecommendation, FallbackError> {
        let prompt = build_prompt(symptoms, health_conditions, count);

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&json!({
                "model": self.model,
                "messages": [
                    {
                        "role": "system",
                        "content": "You are an expert Ayurvedic doctor. Always respond with valid JSON only."
                    },
                    { "role": "user", "content": prompt }
                ],
                "temperature": 0.7,
                "max_tokens": 2000
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(FallbackError::Status(response.status().as_u16()));
        }

        let body: Value = response.json().await?;
        let content = body["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| FallbackError::Malformed("missing message content".into()))?;

        debug!(len = content.len(), "fallback responded");
        parse_recommendation(content)
    }
}

fn build_prompt(symptoms: &[String], health_conditions: &[String], count: usize) -> String {
    format!(
        "You are an expert Ayurvedic doctor. Based on the following patient \
         information, first diagnose the possible disease(s), then suggest \
         appropriate Ayurvedic medicines.\n\n\
         Symptoms: {}\n\
         Health Conditions: {}\n\n\
         STEP 1: DIAGNOSIS\n\
         Provide the primary possible condition, secondary possible conditions, \
         and a brief explanation in Ayurvedic terms (Vata/Pitta/Kapha imbalance \
         if relevant).\n\n\
         STEP 2: MEDICINE RECOMMENDATIONS\n\
         Provide EXACTLY {count} Ayurvedic medicines, mixing proprietary branded \
         products (Himalaya, Dabur, Baidyanath, Patanjali, Zandu and similar) \
         with classical formulations (e.g. Triphala, Dashamularishta). Each \
         medicine should be a polyherbal formulation; name the key constituent \
         herbs in the description and prefer commonly available products across \
         dosage forms (tablets, syrups, churnas, capsules).\n\n\
         Format your response as a JSON object:\n\
         {{\n\
           \"diagnosis\": {{\n\
             \"primary_condition\": \"...\",\n\
             \"secondary_conditions\": [\"...\"],\n\
             \"ayurvedic_analysis\": \"...\"\n\
           }},\n\
           \"medicines\": [\n\
             {{\n\
               \"name\": \"Brand + product name\",\n\
               \"description\": \"What it treats and key ingredients\",\n\
               \"recommended_dosage\": \"Specific dosage with form\",\n\
               \"timing\": \"When to take\",\n\
               \"precautions\": \"Important precautions if any\"\n\
             }}\n\
           ]\n\
         }}\n\n\
         IMPORTANT: Return ONLY the JSON object with diagnosis and EXACTLY \
         {count} medicines, no additional text.",
        symptoms.join(", "),
        health_conditions.join(", "),
        count = count,
    )
}

/// Extract the JSON object from a model reply that may be wrapped in code
/// fences or surrounding prose.
fn parse_recommendation(content: &str) -> Result<AiRecommendation, FallbackError> {
    let start = content
        .find('{')
        .ok_or_else(|| FallbackError::Malformed("no JSON object in reply".into()))?;
    let end = content
        .rfind('}')
        .ok_or_else(|| FallbackError::Malformed("no JSON object in reply".into()))?;
    if end < start {
        return Err(FallbackError::Malformed("no JSON object in reply".into()));
    }
    serde_json::from_str(&content[start..=end])
        .map_err(|e| FallbackError::Malformed(e.to_string()))
}
