//! Session configuration and the append-only turn transcript.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::rubric::{ConfigurationError, Domain};

/// Pedagogical mode of a dialogue session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SocraticMode {
    /// The student defends their own reasoning under Socratic questioning.
    #[serde(rename = "DEFENSE", alias = "TUTOR")]
    Defense,
    /// The student audits a deliberately flawed AI-generated text.
    #[serde(rename = "AUDIT", alias = "CRITIC")]
    Audit,
}

impl SocraticMode {
    /// Wire name (`DEFENSE` or `AUDIT`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Defense => "DEFENSE",
            Self::Audit => "AUDIT",
        }
    }
}

impl fmt::Display for SocraticMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SocraticMode {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "defense" | "tutor" => Ok(Self::Defense),
            "audit" | "critic" => Ok(Self::Audit),
            _ => Err(ConfigurationError::UnknownMode(s.to_owned())),
        }
    }
}

/// Author of a turn.
///
/// Serialized as `user` / `model` so exported sessions stay readable by
/// earlier tooling; `student` / `agent` are accepted on read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TurnRole {
    /// The student.
    #[serde(rename = "user", alias = "student")]
    Student,
    /// The tutor agent.
    #[serde(rename = "model", alias = "agent")]
    Agent,
}

/// One message of the dialogue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Turn {
    /// Unique turn identifier.
    pub id: String,
    /// Who wrote the turn.
    pub role: TurnRole,
    /// Verbatim text.
    pub text: String,
    /// Creation time, milliseconds since the Unix epoch.
    pub timestamp: i64,
    /// Milliseconds elapsed since the previous agent turn (student turns only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_time_ms: Option<u64>,
}

impl Turn {
    /// Build a turn stamped at `at`.
    pub fn new(role: TurnRole, text: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            text: text.into(),
            timestamp: at.timestamp_millis(),
            response_time_ms: None,
        }
    }

    /// Reflection time in whole seconds, if recorded.
    pub fn reflection_secs(&self) -> Option<u64> {
        self.response_time_ms.map(|ms| ms.checked_div(1000).unwrap_or(0))
    }
}

/// Ordered, append-only sequence of turns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Transcript {
    turns: Vec<Turn>,
    /// Number of turns restored from an earlier session.
    #[serde(skip)]
    restored: usize,
}

impl Transcript {
    /// Empty transcript.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap turns restored from an export, keeping their order.
    ///
    /// Agent turns restored here never serve as the reference for a later
    /// reflection time.
    pub fn from_turns(turns: Vec<Turn>) -> Self {
        let restored = turns.len();
        Self { turns, restored }
    }

    /// Append a student turn, recording the reflection time since the most
    /// recent agent turn of the current session.
    pub fn push_student(&mut self, text: impl Into<String>, at: DateTime<Utc>) -> &Turn {
        let mut turn = Turn::new(TurnRole::Student, text, at);
        turn.response_time_ms = self.live_agent().and_then(|agent| {
            let elapsed = turn.timestamp.saturating_sub(agent.timestamp);
            u64::try_from(elapsed).ok()
        });
        self.push(turn)
    }

    /// Most recent agent turn appended after any restored turns.
    fn live_agent(&self) -> Option<&Turn> {
        self.turns
            .get(self.restored..)?
            .iter()
            .rev()
            .find(|t| t.role == TurnRole::Agent)
    }

    /// Append an agent turn.
    pub fn push_agent(&mut self, text: impl Into<String>, at: DateTime<Utc>) -> &Turn {
        self.push(Turn::new(TurnRole::Agent, text, at))
    }

    fn push(&mut self, turn: Turn) -> &Turn {
        self.turns.push(turn);
        let last = self.turns.len().saturating_sub(1);
        &self.turns[last]
    }

    /// Most recent agent turn.
    pub fn last_agent(&self) -> Option<&Turn> {
        self.turns.iter().rev().find(|t| t.role == TurnRole::Agent)
    }

    /// All turns in insertion order.
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Number of turns.
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Whether no turn has been recorded.
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Consume into the underlying turns.
    pub fn into_turns(self) -> Vec<Turn> {
        self.turns
    }
}

/// Immutable settings of one dialogue session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfig {
    /// Student display name.
    pub student_name: String,
    /// Topic under discussion, interpolated verbatim into prompts.
    pub topic: String,
    /// Pedagogical mode.
    pub mode: SocraticMode,
    /// Disciplinary domain.
    pub domain: Domain,
}
