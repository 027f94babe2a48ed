//! Validated, retried, time-bounded forwarding of one student turn.
//!
//! Every failure below is turned into a renderable [`Reply`] by
//! [`super::TutorSession::send`]; nothing here reaches the caller as a panic
//! or an unhandled error.

use std::time::Duration;

use tracing::{debug, warn};

use crate::config::ExchangeConfig;
use crate::providers::{CompletionRequest, CompletionResponse, LlmProvider, ProviderError};

/// Reply shown when the student submits an empty message.
pub const EMPTY_MESSAGE_REPLY: &str = "Message vide.";
/// Reply shown when the student message exceeds the length limit.
pub const TOO_LONG_REPLY: &str = "Message trop long.";
/// Reply shown when every attempt failed.
pub const APOLOGY_REPLY: &str = "Erreur technique. Le tuteur n'a pas pu répondre, renvoie ton message.";

/// Errors raised while forwarding a turn.
#[derive(Debug, thiserror::Error)]
pub enum ExchangeError {
    /// Message is blank after trimming.
    #[error("message is empty")]
    EmptyMessage,
    /// Message exceeds the character limit.
    #[error("message is {chars} characters long, limit is {limit}")]
    MessageTooLong {
        /// Actual length in characters.
        chars: usize,
        /// Configured limit.
        limit: usize,
    },
    /// A single attempt exceeded its time bound.
    #[error("model call timed out after {0:?}")]
    Timeout(Duration),
    /// The provider failed.
    #[error(transparent)]
    Provider(#[from] ProviderError),
    /// The model answered with no text.
    #[error("model returned an empty reply")]
    EmptyReply,
    /// Every attempt failed.
    #[error("gave up after {attempts} attempts, last error: {last}")]
    Exhausted {
        /// Attempts made.
        attempts: u32,
        /// Rendering of the last error.
        last: String,
    },
}

impl ExchangeError {
    /// Plain-language message shown in place of the tutor reply.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::EmptyMessage => EMPTY_MESSAGE_REPLY,
            Self::MessageTooLong { .. } => TOO_LONG_REPLY,
            Self::Timeout(_) | Self::Provider(_) | Self::EmptyReply | Self::Exhausted { .. } => {
                APOLOGY_REPLY
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Accepted message length, in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageLimits {
    /// Minimum characters after trimming.
    pub min_chars: usize,
    /// Maximum characters.
    pub max_chars: usize,
}

impl MessageLimits {
    /// Limits from the exchange config.
    pub fn from_config(config: &ExchangeConfig) -> Self {
        Self {
            min_chars: config.min_message_chars,
            max_chars: config.max_message_chars,
        }
    }
}

impl Default for MessageLimits {
    fn default() -> Self {
        Self::from_config(&ExchangeConfig::default())
    }
}

/// Check a student message before any network call.
///
/// # Errors
///
/// Returns [`ExchangeError::EmptyMessage`] or [`ExchangeError::MessageTooLong`].
pub fn validate_message(text: &str, limits: MessageLimits) -> Result<(), ExchangeError> {
    if text.trim().chars().count() < limits.min_chars.max(1) {
        return Err(ExchangeError::EmptyMessage);
    }
    let chars = text.chars().count();
    if chars > limits.max_chars {
        return Err(ExchangeError::MessageTooLong {
            chars,
            limit: limits.max_chars,
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Retry
// ---------------------------------------------------------------------------

/// Attempt cap, exponential backoff, and per-attempt timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts before giving up (first call included).
    pub max_attempts: u32,
    /// Delay after the first failed attempt.
    pub base_delay: Duration,
    /// Upper bound on one attempt.
    pub timeout: Duration,
}

impl RetryPolicy {
    /// Policy from the exchange config.
    pub fn from_config(config: &ExchangeConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            base_delay: config.base_delay(),
            timeout: config.timeout(),
        }
    }

    /// Single attempt, no backoff.
    pub fn single(timeout: Duration) -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
            timeout,
        }
    }

    /// Delay after the zero-based failed `attempt`: `base * 2^attempt`.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2_u32.saturating_pow(attempt))
    }

    /// Every delay the policy can wait, in order.
    pub fn delays(&self) -> Vec<Duration> {
        (0..self.max_attempts.saturating_sub(1))
            .map(|attempt| self.delay_after(attempt))
            .collect()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&ExchangeConfig::default())
    }
}

/// Call the provider under `policy`.
///
/// Each attempt is bounded by `policy.timeout`; failed attempts are followed
/// by [`RetryPolicy::delay_after`] before the next one.
///
/// # Errors
///
/// Returns [`ExchangeError::Exhausted`] once every attempt has failed.
pub async fn complete_with_retry(
    provider: &dyn LlmProvider,
    request: &CompletionRequest,
    policy: &RetryPolicy,
) -> Result<CompletionResponse, ExchangeError> {
    let mut last_error = String::from("no attempt made");
    for attempt in 0..policy.max_attempts {
        let outcome = tokio::time::timeout(policy.timeout, provider.complete(request.clone()))
            .await
            .map_err(|_| ExchangeError::Timeout(policy.timeout))
            .and_then(|result| result.map_err(ExchangeError::from))
            .and_then(|response| {
                if response.text.trim().is_empty() {
                    Err(ExchangeError::EmptyReply)
                } else {
                    Ok(response)
                }
            });

        match outcome {
            Ok(response) => {
                debug!(attempt, model = %response.model, "model replied");
                return Ok(response);
            }
            Err(e) => {
                warn!(attempt, error = %e, model = provider.model_id(), "model call failed");
                last_error = e.to_string();
            }
        }

        if attempt.saturating_add(1) < policy.max_attempts {
            tokio::time::sleep(policy.delay_after(attempt)).await;
        }
    }

    Err(ExchangeError::Exhausted {
        attempts: policy.max_attempts,
        last: last_error,
    })
}

// ---------------------------------------------------------------------------
// Reply
// ---------------------------------------------------------------------------

/// What happened to a forwarded turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyOutcome {
    /// The model answered; the exchange was appended to the history.
    Delivered,
    /// The message failed validation and was never sent.
    Rejected,
    /// Every attempt failed; the text is the apology.
    Failed,
}

/// Renderable result of [`super::TutorSession::send`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Tutor reply, or the user-facing error text.
    pub text: String,
    /// Milliseconds between submission and reply, for delivered replies.
    pub elapsed_ms: Option<u64>,
    /// Outcome of the exchange.
    pub outcome: ReplyOutcome,
}

impl Reply {
    /// Reply for a failed or rejected exchange.
    pub fn from_error(error: &ExchangeError) -> Self {
        let outcome = match error {
            ExchangeError::EmptyMessage | ExchangeError::MessageTooLong { .. } => {
                ReplyOutcome::Rejected
            }
            _ => ReplyOutcome::Failed,
        };
        Self {
            text: error.user_message().to_owned(),
            elapsed_ms: None,
            outcome,
        }
    }

    /// Whether the model actually answered.
    pub fn is_delivered(&self) -> bool {
        self.outcome == ReplyOutcome::Delivered
    }
}
