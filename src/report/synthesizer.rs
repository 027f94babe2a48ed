//! One-shot structured analysis of a finished session.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::config::ArgosConfig;
use crate::providers::{CompletionRequest, LlmProvider, Message, ProviderError};
use crate::rubric::{ConfigurationError, Domain, RubricTable};
use crate::transcript::Transcript;

use super::prompt::build_analysis_prompt;
use super::schema::{attach_provenance, response_schema, AnalysisResult, ModelAnalysis};

/// Reasons an analysis attempt produced no usable report.
///
/// Never surfaced by [`ReportSynthesizer::analyze`]; kept for logging and for
/// callers of [`ReportSynthesizer::try_analyze`].
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    /// Domain has no rubric.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    /// The analysis call exceeded its time bound.
    #[error("analysis timed out after {0:?}")]
    Timeout(Duration),
    /// The provider failed.
    #[error(transparent)]
    Provider(#[from] ProviderError),
    /// The model returned nothing.
    #[error("analysis reply is empty")]
    EmptyReply,
    /// The reply is not valid JSON or misses required fields.
    #[error("analysis reply is malformed: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Produces the final [`AnalysisResult`] of a session.
#[derive(Clone)]
pub struct ReportSynthesizer {
    provider: Arc<dyn LlmProvider>,
    rubrics: Arc<RubricTable>,
    tutor_name: String,
    temperature: f32,
    timeout: Duration,
}

impl std::fmt::Debug for ReportSynthesizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportSynthesizer")
            .field("model", &self.provider.model_id())
            .field("temperature", &self.temperature)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ReportSynthesizer {
    /// Create a synthesizer backed by `provider` (usually the analysis model).
    pub fn new(provider: Arc<dyn LlmProvider>, rubrics: Arc<RubricTable>, config: &ArgosConfig) -> Self {
        Self {
            provider,
            rubrics,
            tutor_name: config.tutor.name.clone(),
            temperature: config.models.analysis_temperature,
            timeout: config.analysis.timeout(),
        }
    }

    /// Override the time bound of the analysis call.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Analyze a finished session. Never fails.
    ///
    /// Any failure (timeout, transport, malformed reply, missing rubric)
    /// yields [`AnalysisResult::fallback`], which still carries the transcript
    /// and the declaration.
    pub async fn analyze(
        &self,
        transcript: &Transcript,
        topic: &str,
        domain: Domain,
        declaration: &str,
    ) -> AnalysisResult {
        match self.try_analyze(transcript, topic, domain, declaration).await {
            Ok(result) => {
                info!(
                    domain = %domain,
                    turns = transcript.len(),
                    discernment = result.disciplinary_discernment_score,
                    "analysis complete"
                );
                result
            }
            Err(e) => {
                warn!(error = %e, domain = %domain, "analysis failed, using fallback report");
                AnalysisResult::fallback(transcript, declaration)
            }
        }
    }

    /// Single analysis attempt, surfacing the failure reason.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError`] on any failure.
    pub async fn try_analyze(
        &self,
        transcript: &Transcript,
        topic: &str,
        domain: Domain,
        declaration: &str,
    ) -> Result<AnalysisResult, ReportError> {
        let rubric = self.rubrics.get(domain)?;
        let prompt = build_analysis_prompt(rubric, topic, transcript, declaration, &self.tutor_name);

        let request = CompletionRequest {
            messages: vec![Message::user(prompt)],
            system: None,
            temperature: Some(self.temperature),
            response_schema: self
                .provider
                .supports_structured_output()
                .then(response_schema),
            reasoning_budget: Some(domain.reasoning_budget(true)),
            max_tokens: None,
        };

        let response = tokio::time::timeout(self.timeout, self.provider.complete(request))
            .await
            .map_err(|_| ReportError::Timeout(self.timeout))??;

        let body = strip_code_fence(&response.text);
        if body.is_empty() {
            return Err(ReportError::EmptyReply);
        }
        let analysis: ModelAnalysis = serde_json::from_str(body)?;

        Ok(attach_provenance(analysis, transcript, declaration))
    }
}

/// Remove a surrounding Markdown code fence, if any.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
