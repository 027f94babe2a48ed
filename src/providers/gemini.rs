//! Gemini provider implementation using the `models/{model}:generateContent` API.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::credentials::ApiKey;

use super::{
    check_http_response, CompletionRequest, CompletionResponse, FinishReason, LlmProvider,
    ProviderError, Role, UsageStats,
};

/// Default API base used when none is configured.
pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

const JSON_MIME_TYPE: &str = "application/json";

// ---------------------------------------------------------------------------
// Wire types (pub for integration testing)
// ---------------------------------------------------------------------------

/// `generateContent` request body.
#[doc(hidden)]
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiRequest {
    /// Conversation contents.
    pub contents: Vec<GeminiContent>,
    /// Optional system instruction.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<GeminiContent>,
    /// Sampling and output settings.
    pub generation_config: GenerationConfig,
}

/// A content entry (one message) in Gemini format.
#[doc(hidden)]
#[derive(Debug, Serialize, Deserialize)]
pub struct GeminiContent {
    /// Role: "user" or "model"; absent for system instructions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Content parts.
    #[serde(default)]
    pub parts: Vec<GeminiPart>,
}

/// A single content part.
#[doc(hidden)]
#[derive(Debug, Serialize, Deserialize)]
pub struct GeminiPart {
    /// Text of the part.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Set on reasoning summaries, which are not part of the answer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thought: Option<bool>,
}

/// Generation settings.
#[doc(hidden)]
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    /// Sampling temperature.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Maximum output tokens.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
    /// Response MIME type (`application/json` for structured output).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_mime_type: Option<String>,
    /// Response schema for structured output.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_schema: Option<Value>,
    /// Reasoning budget settings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thinking_config: Option<ThinkingConfig>,
}

/// Reasoning budget settings.
#[doc(hidden)]
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThinkingConfig {
    /// Reasoning-token budget.
    pub thinking_budget: u32,
}

/// `generateContent` response body.
#[doc(hidden)]
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiResponse {
    /// Response candidates.
    #[serde(default)]
    pub candidates: Vec<GeminiCandidate>,
    /// Token usage.
    #[serde(default)]
    pub usage_metadata: Option<GeminiUsage>,
    /// Model version that served the response.
    #[serde(default)]
    pub model_version: Option<String>,
    /// Prompt-level feedback (set when the prompt itself was blocked).
    #[serde(default)]
    pub prompt_feedback: Option<PromptFeedback>,
}

/// A response candidate.
#[doc(hidden)]
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiCandidate {
    /// Candidate content.
    #[serde(default)]
    pub content: Option<GeminiContent>,
    /// Why generation stopped.
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Gemini usage statistics.
#[doc(hidden)]
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiUsage {
    /// Prompt token count.
    #[serde(default)]
    pub prompt_token_count: Option<u32>,
    /// Candidate token count.
    #[serde(default)]
    pub candidates_token_count: Option<u32>,
}

/// Prompt-level feedback.
#[doc(hidden)]
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    /// Block reason, if the prompt was rejected.
    #[serde(default)]
    pub block_reason: Option<String>,
}

// ---------------------------------------------------------------------------
// Provider
// ---------------------------------------------------------------------------

/// Gemini `generateContent` provider.
#[derive(Debug, Clone)]
pub struct GeminiProvider {
    model_name: String,
    api_base: String,
    api_key: ApiKey,
    client: reqwest::Client,
}

impl GeminiProvider {
    /// Create a provider for `model_name` against the public endpoint.
    pub fn new(model_name: String, api_key: ApiKey) -> Self {
        Self::with_api_base(model_name, GEMINI_API_BASE.to_owned(), api_key)
    }

    /// Create a provider against a custom API base (proxies, tests).
    pub fn with_api_base(model_name: String, api_base: String, api_key: ApiKey) -> Self {
        Self {
            model_name,
            api_base: api_base.trim_end_matches('/').to_owned(),
            api_key,
            client: reqwest::Client::new(),
        }
    }

    /// Full `generateContent` URL for this provider's model.
    pub fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.api_base, self.model_name)
    }
}

// ---------------------------------------------------------------------------
// Request / Response builders (pub for integration testing)
// ---------------------------------------------------------------------------

/// Build a Gemini request from a completion request.
#[doc(hidden)]
pub fn build_request(request: &CompletionRequest) -> GeminiRequest {
    let contents = request
        .messages
        .iter()
        .map(|msg| {
            let role = match msg.role {
                Role::User => "user",
                Role::Model => "model",
            };
            GeminiContent {
                role: Some(role.to_owned()),
                parts: vec![text_part(&msg.text)],
            }
        })
        .collect();

    let system_instruction = request.system.as_ref().map(|system| GeminiContent {
        role: None,
        parts: vec![text_part(system)],
    });

    let generation_config = GenerationConfig {
        temperature: request.temperature,
        max_output_tokens: request.max_tokens,
        response_mime_type: request
            .response_schema
            .as_ref()
            .map(|_| JSON_MIME_TYPE.to_owned()),
        response_schema: request.response_schema.clone(),
        thinking_config: request
            .reasoning_budget
            .map(|thinking_budget| ThinkingConfig { thinking_budget }),
    };

    GeminiRequest {
        contents,
        system_instruction,
        generation_config,
    }
}

fn text_part(text: &str) -> GeminiPart {
    GeminiPart {
        text: Some(text.to_owned()),
        thought: None,
    }
}

/// Parse a Gemini response into a completion response.
///
/// Reasoning parts (`"thought": true`) are dropped; the remaining text parts
/// of the first candidate are concatenated.
///
/// # Errors
///
/// Returns `ProviderError::Parse` if the body cannot be deserialized or
/// carries no candidate.
#[doc(hidden)]
pub fn parse_response(body: &str, requested_model: &str) -> Result<CompletionResponse, ProviderError> {
    let resp: GeminiResponse =
        serde_json::from_str(body).map_err(|e| ProviderError::Parse(e.to_string()))?;

    let Some(candidate) = resp.candidates.into_iter().next() else {
        let reason = resp
            .prompt_feedback
            .and_then(|f| f.block_reason)
            .unwrap_or_else(|| "no candidates".to_owned());
        return Err(ProviderError::Parse(format!("empty response: {reason}")));
    };

    let text: String = candidate
        .content
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter(|part| part.thought != Some(true))
                .filter_map(|part| part.text)
                .collect()
        })
        .unwrap_or_default();

    let finish_reason = match candidate.finish_reason.as_deref() {
        Some("STOP") | None => FinishReason::Stop,
        Some("MAX_TOKENS") => FinishReason::MaxTokens,
        Some("SAFETY") => FinishReason::Safety,
        Some(other) => FinishReason::Other(other.to_owned()),
    };

    let usage = resp
        .usage_metadata
        .map(|u| UsageStats {
            input_tokens: u.prompt_token_count.unwrap_or(0),
            output_tokens: u.candidates_token_count.unwrap_or(0),
        })
        .unwrap_or_default();

    Ok(CompletionResponse {
        text,
        finish_reason,
        usage,
        model: resp
            .model_version
            .unwrap_or_else(|| requested_model.to_owned()),
    })
}

// ---------------------------------------------------------------------------
// Trait impl
// ---------------------------------------------------------------------------

#[async_trait::async_trait]
impl LlmProvider for GeminiProvider {
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        let api_request = build_request(&request);

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", self.api_key.expose())
            .header("content-type", "application/json")
            .json(&api_request)
            .send()
            .await?;

        let payload = check_http_response(response).await?;
        let parsed = parse_response(&payload, &self.model_name)?;
        tracing::debug!(
            model = %parsed.model,
            input_tokens = parsed.usage.input_tokens,
            output_tokens = parsed.usage.output_tokens,
            "completion received"
        );
        Ok(parsed)
    }

    fn supports_structured_output(&self) -> bool {
        true
    }

    fn model_id(&self) -> &str {
        &self.model_name
    }
}
