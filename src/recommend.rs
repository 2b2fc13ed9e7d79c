//! Recommendation service.
//!
//! Validates incoming requests, renders the recommendation prompt, makes one
//! call to the model provider and hands back the model text verbatim together
//! with an echo of the inputs.

use crate::error::{OptionExt, Result, ShopFilterError};
use crate::filters::FilterCollection;
use crate::llm::{check_temperature, GenerationOptions, LlmClient};
use crate::prompts::build_filter_recommendation_prompt;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use tracing::{debug, info};

/// Markdown code fence (optionally tagged `json`) around one object
static FENCED_JSON: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```(?:json)?\s*(\{.*\})\s*```").expect("fenced JSON pattern is valid")
});

/// Body of `POST /api/generate`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerateRequest {
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default, rename = "maxTokens")]
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub text: String,
    pub model: String,
    pub prompt: String,
}

/// Body of `POST /api/generate-filtered`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilteredRecommendationRequest {
    #[serde(default)]
    pub filters_applied: Option<FilterCollection>,
    #[serde(default)]
    pub current_query: Option<String>,
    #[serde(default)]
    pub past_queries: Option<Vec<String>>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default, rename = "maxTokens")]
    pub max_tokens: Option<u32>,
}

/// Model text plus the effective inputs (absent filters/history echoed as their defaults).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilteredRecommendationResponse {
    pub text: String,
    pub model: String,
    pub prompt: String,
    pub filters_applied: FilterCollection,
    pub current_query: String,
    pub past_queries: Vec<String>,
}

/// Facade over prompt construction and the model provider.
#[derive(Debug, Clone)]
pub struct RecommendationService {
    llm: LlmClient,
}

impl RecommendationService {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }

    pub fn default_model(&self) -> &str {
        self.llm.default_model()
    }

    /// Forward a caller-written prompt unchanged.
    pub async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse> {
        let prompt = non_blank(request.prompt).ok_or_validation("Prompt is required")?;
        let options = generation_options(request.model, request.temperature, request.max_tokens)?;

        info!(prompt_chars = prompt.len(), "Generate request");

        let completion = self.llm.complete(&prompt, &options).await?;

        Ok(GenerateResponse {
            text: completion.text,
            model: completion.model,
            prompt,
        })
    }

    /// Build the filter recommendation prompt from session state and forward it.
    pub async fn generate_filtered(
        &self,
        request: FilteredRecommendationRequest,
    ) -> Result<FilteredRecommendationResponse> {
        let current_query =
            non_blank(request.current_query).ok_or_validation("current_query is required")?;
        let filters = request.filters_applied.unwrap_or_default();
        filters.validate()?;
        let past_queries = request.past_queries.unwrap_or_default();
        let options = generation_options(request.model, request.temperature, request.max_tokens)?;

        info!(
            query = %current_query,
            past_queries = past_queries.len(),
            brands = filters.brands.len(),
            "Filtered recommendation request"
        );

        let prompt = build_filter_recommendation_prompt(&filters, &current_query, &past_queries)?;
        let completion = self.llm.complete(&prompt, &options).await?;

        Ok(FilteredRecommendationResponse {
            text: completion.text,
            model: completion.model,
            prompt,
            filters_applied: filters,
            current_query,
            past_queries,
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn generation_options(
    model: Option<String>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
) -> Result<GenerationOptions> {
    if let Some(t) = temperature {
        check_temperature(t).map_err(ShopFilterError::Validation)?;
    }
    if max_tokens == Some(0) {
        return Err(ShopFilterError::Validation("maxTokens must be positive".to_string()));
    }
    Ok(GenerationOptions {
        model: non_blank(model),
        temperature,
        max_tokens,
    })
}

/// Decode a filter collection out of model output.
///
/// Accepts bare JSON, a fenced code block, or an object embedded in prose.
/// Returns `None` when nothing decodes into a valid collection.
pub fn parse_recommended_filters(text: &str) -> Option<FilterCollection> {
    let json_str = extract_json(text)?;
    match FilterCollection::from_json_str(&json_str) {
        Ok(filters) => Some(filters),
        Err(e) => {
            let preview: String = text.chars().take(200).collect();
            debug!(
                error = %e,
                content_preview = %preview,
                "Model output is not a filter collection"
            );
            None
        }
    }
}

/// Extract the JSON object from model output.
fn extract_json(content: &str) -> Option<String> {
    let trimmed = content.trim();

    if let Some(body) = FENCED_JSON.captures(trimmed).and_then(|c| c.get(1)) {
        return Some(body.as_str().to_string());
    }

    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    (start < end).then(|| trimmed[start..=end].to_string())
}
