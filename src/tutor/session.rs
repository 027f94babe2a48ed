//! Session configurator and the conversational channel it opens.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::ArgosConfig;
use crate::providers::{CompletionRequest, LlmProvider, Message};
use crate::rubric::{ConfigurationError, Domain, RubricTable};
use crate::transcript::{SocraticMode, Turn, TurnRole};

use super::exchange::{complete_with_retry, validate_message, MessageLimits, Reply, ReplyOutcome, RetryPolicy};
use super::instructions::{build_instruction, find_forbidden_praise, InstructionOptions, KICKOFF_PROMPT};

/// Builds tutor sessions from mode, topic, and domain.
///
/// Holds the immutable configuration shared by every session it creates.
#[derive(Clone)]
pub struct SessionConfigurator {
    provider: Arc<dyn LlmProvider>,
    rubrics: Arc<RubricTable>,
    options: InstructionOptions,
    temperature: f32,
    policy: RetryPolicy,
    limits: MessageLimits,
}

impl std::fmt::Debug for SessionConfigurator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionConfigurator")
            .field("model", &self.provider.model_id())
            .field("tutor_name", &self.options.tutor_name)
            .field("temperature", &self.temperature)
            .field("policy", &self.policy)
            .finish()
    }
}

impl SessionConfigurator {
    /// Create a configurator backed by `provider`.
    pub fn new(provider: Arc<dyn LlmProvider>, rubrics: Arc<RubricTable>, config: &ArgosConfig) -> Self {
        Self {
            provider,
            rubrics,
            options: InstructionOptions {
                tutor_name: config.tutor.name.clone(),
                include_level_descriptions: true,
            },
            temperature: config.models.chat_temperature,
            policy: RetryPolicy::from_config(&config.exchange),
            limits: MessageLimits::from_config(&config.exchange),
        }
    }

    /// Override the retry policy of sessions created from now on.
    #[must_use]
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// System instruction a session would receive, without opening it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::MissingRubric`] when `domain` has no
    /// rubric.
    pub fn instruction(
        &self,
        mode: SocraticMode,
        topic: &str,
        domain: Domain,
    ) -> Result<String, ConfigurationError> {
        let rubric = self.rubrics.get(domain)?;
        Ok(build_instruction(mode, rubric, topic, &self.options))
    }

    /// Open a tutor session, seeded with `prior_turns` when resuming.
    ///
    /// Prior turns are role-mapped and keep their order, so a resumed session
    /// continues with full context.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::MissingRubric`] when `domain` has no
    /// rubric.
    pub fn create_session(
        &self,
        mode: SocraticMode,
        topic: &str,
        domain: Domain,
        prior_turns: &[Turn],
    ) -> Result<TutorSession, ConfigurationError> {
        let system_instruction = self.instruction(mode, topic, domain)?;
        let history: Vec<Message> = prior_turns.iter().map(turn_to_message).collect();

        info!(
            mode = %mode,
            domain = %domain,
            prior_turns = history.len(),
            model = self.provider.model_id(),
            "tutor session opened"
        );

        Ok(TutorSession {
            provider: Arc::clone(&self.provider),
            system_instruction,
            temperature: self.temperature,
            reasoning_budget: domain.reasoning_budget(false),
            history,
            policy: self.policy,
            limits: self.limits,
            mode,
            domain,
        })
    }
}

fn turn_to_message(turn: &Turn) -> Message {
    match turn.role {
        TurnRole::Student => Message::user(turn.text.clone()),
        TurnRole::Agent => Message::model(turn.text.clone()),
    }
}

/// A stateful conversation with the tutor.
///
/// [`TutorSession::send`] takes `&mut self`, so a session can have at most
/// one request in flight.
pub struct TutorSession {
    provider: Arc<dyn LlmProvider>,
    system_instruction: String,
    temperature: f32,
    reasoning_budget: u32,
    history: Vec<Message>,
    policy: RetryPolicy,
    limits: MessageLimits,
    mode: SocraticMode,
    domain: Domain,
}

impl std::fmt::Debug for TutorSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TutorSession")
            .field("mode", &self.mode)
            .field("domain", &self.domain)
            .field("history_len", &self.history.len())
            .field("temperature", &self.temperature)
            .field("reasoning_budget", &self.reasoning_budget)
            .finish()
    }
}

impl TutorSession {
    /// Conversation history forwarded with every request.
    pub fn history(&self) -> &[Message] {
        &self.history
    }

    /// System instruction of this session.
    pub fn system_instruction(&self) -> &str {
        &self.system_instruction
    }

    /// Sampling temperature of this session.
    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    /// Reasoning budget of this session.
    pub fn reasoning_budget(&self) -> u32 {
        self.reasoning_budget
    }

    /// Pedagogical mode.
    pub fn mode(&self) -> SocraticMode {
        self.mode
    }

    /// Disciplinary domain.
    pub fn domain(&self) -> Domain {
        self.domain
    }

    /// Ask the tutor to open the dialogue.
    ///
    /// Returns `None` when the session already has history (resumed
    /// sessions continue where they stopped).
    pub async fn open(&mut self) -> Option<Reply> {
        if !self.history.is_empty() {
            return None;
        }
        Some(self.send(KICKOFF_PROMPT).await)
    }

    /// Forward one student message and return a renderable reply.
    ///
    /// Invalid messages are rejected without a model call. Transport
    /// failures are retried under the session's [`RetryPolicy`]; once
    /// exhausted, the reply carries a fixed apology. The history only grows
    /// on delivered replies.
    pub async fn send(&mut self, text: &str) -> Reply {
        if let Err(e) = validate_message(text, self.limits) {
            debug!(error = %e, "student message rejected");
            return Reply::from_error(&e);
        }

        let request = self.request_for(text);
        let started = tokio::time::Instant::now();

        match complete_with_retry(self.provider.as_ref(), &request, &self.policy).await {
            Ok(response) => {
                let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
                if let Some(word) = find_forbidden_praise(&response.text) {
                    warn!(word, "tutor reply contains a forbidden praise word");
                }
                self.history.push(Message::user(text));
                self.history.push(Message::model(response.text.clone()));
                Reply {
                    text: response.text,
                    elapsed_ms: Some(elapsed_ms),
                    outcome: ReplyOutcome::Delivered,
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "tutor exchange failed");
                Reply::from_error(&e)
            }
        }
    }

    fn request_for(&self, text: &str) -> CompletionRequest {
        let mut messages = self.history.clone();
        messages.push(Message::user(text));
        CompletionRequest {
            messages,
            system: Some(self.system_instruction.clone()),
            temperature: Some(self.temperature),
            response_schema: None,
            reasoning_budget: Some(self.reasoning_budget),
            max_tokens: None,
        }
    }
}
