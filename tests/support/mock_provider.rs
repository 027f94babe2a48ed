//! Scripted `LlmProvider` shared by the tutor and report tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use argos::providers::{
    CompletionRequest, CompletionResponse, FinishReason, LlmProvider, ProviderError, UsageStats,
};

/// One scripted outcome.
pub enum Step {
    /// Reply with this text.
    Reply(String),
    /// Fail with an HTTP 503.
    Fail,
    /// Sleep this long, then reply with the text.
    Slow(Duration, String),
}

/// Provider that plays back a script and records every request.
///
/// Once the script is exhausted every call fails.
pub struct ScriptedProvider {
    script: Mutex<VecDeque<Step>>,
    calls: Arc<AtomicU32>,
    requests: Mutex<Vec<CompletionRequest>>,
    call_times: Mutex<Vec<tokio::time::Instant>>,
}

impl ScriptedProvider {
    pub fn new(script: Vec<Step>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            calls: Arc::new(AtomicU32::new(0)),
            requests: Mutex::new(Vec::new()),
            call_times: Mutex::new(Vec::new()),
        }
    }

    pub fn replying(texts: &[&str]) -> Self {
        Self::new(texts.iter().map(|t| Step::Reply((*t).to_owned())).collect())
    }

    pub fn failing() -> Self {
        Self::new(Vec::new())
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        match self.requests.lock() {
            Ok(guard) => guard.clone(),
            Err(err) => panic!("requests lock poisoned: {err}"),
        }
    }

    pub fn call_times(&self) -> Vec<tokio::time::Instant> {
        match self.call_times.lock() {
            Ok(guard) => guard.clone(),
            Err(err) => panic!("call_times lock poisoned: {err}"),
        }
    }
}

fn response(text: String) -> CompletionResponse {
    CompletionResponse {
        text,
        finish_reason: FinishReason::Stop,
        usage: UsageStats::default(),
        model: "mock-model".to_owned(),
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut guard) = self.requests.lock() {
            guard.push(request);
        }
        if let Ok(mut guard) = self.call_times.lock() {
            guard.push(tokio::time::Instant::now());
        }

        let step = self.script.lock().ok().and_then(|mut s| s.pop_front());
        match step {
            Some(Step::Reply(text)) => Ok(response(text)),
            Some(Step::Slow(delay, text)) => {
                tokio::time::sleep(delay).await;
                Ok(response(text))
            }
            Some(Step::Fail) | None => Err(ProviderError::HttpStatus {
                status: 503,
                body: "service unavailable".to_owned(),
            }),
        }
    }

    fn supports_structured_output(&self) -> bool {
        true
    }

    fn model_id(&self) -> &str {
        "mock-model"
    }
}
