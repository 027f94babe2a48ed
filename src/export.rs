//! JSON session export and import.
//!
//! An export is self-contained: metadata, the analysis record, the turn
//! transcript, and the AI-usage declaration. Importing it rebuilds the
//! [`SessionConfig`] and the turns needed to resume the dialogue.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::report::AnalysisResult;
use crate::rubric::Domain;
use crate::transcript::{SessionConfig, SocraticMode, Transcript, Turn};

/// Prefix of every export file name.
pub const FILE_PREFIX: &str = "DES-Rapport-";

/// Errors raised while writing or reading an export.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// Filesystem failure.
    #[error("failed to access {path}: {source}")]
    Io {
        /// File involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// Content is not a valid export.
    #[error("invalid session export: {0}")]
    Json(#[from] serde_json::Error),
    /// Export predates domain tracking and no domain was supplied.
    #[error("export has no domain; pass one explicitly")]
    MissingDomain,
}

/// Descriptive header of an export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportMetadata {
    /// Export time.
    pub date: DateTime<Utc>,
    /// Student display name.
    pub student: String,
    /// Session topic.
    pub topic: String,
    /// Pedagogical mode.
    pub mode: SocraticMode,
    /// Disciplinary domain; absent in older exports.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<Domain>,
    /// Prompt version the session ran with.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_version: Option<String>,
}

/// Full export document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionExport {
    /// Header.
    pub metadata: ExportMetadata,
    /// Final report.
    pub analysis: AnalysisResult,
    /// Turns in dialogue order.
    pub transcript: Vec<Turn>,
    /// Student's AI-usage declaration.
    pub ai_declaration: String,
}

impl SessionExport {
    /// Assemble an export dated `date`.
    pub fn new(
        config: &SessionConfig,
        analysis: AnalysisResult,
        transcript: &Transcript,
        declaration: &str,
        prompt_version: Option<&str>,
        date: DateTime<Utc>,
    ) -> Self {
        Self {
            metadata: ExportMetadata {
                date,
                student: config.student_name.clone(),
                topic: config.topic.clone(),
                mode: config.mode,
                domain: Some(config.domain),
                prompt_version: prompt_version.map(str::to_owned),
            },
            analysis,
            transcript: transcript.turns().to_vec(),
            ai_declaration: declaration.to_owned(),
        }
    }

    /// Pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::Json`] if serialization fails.
    pub fn to_json_pretty(&self) -> Result<String, ExportError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse an export.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::Json`] on malformed content.
    pub fn from_json(json: &str) -> Result<Self, ExportError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Write the export to `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError`] on serialization or filesystem failure.
    pub fn write_to(&self, path: &Path) -> Result<(), ExportError> {
        let json = self.to_json_pretty()?;
        std::fs::write(path, json).map_err(|source| ExportError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Read an export from `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError`] on filesystem failure or malformed content.
    pub fn read_from(path: &Path) -> Result<Self, ExportError> {
        let json = std::fs::read_to_string(path).map_err(|source| ExportError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Rebuild the session configuration.
    ///
    /// `fallback_domain` is used only when the export carries no domain.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::MissingDomain`] when neither is available.
    pub fn session_config(&self, fallback_domain: Option<Domain>) -> Result<SessionConfig, ExportError> {
        let domain = self
            .metadata
            .domain
            .or(fallback_domain)
            .ok_or(ExportError::MissingDomain)?;
        Ok(SessionConfig {
            student_name: self.metadata.student.clone(),
            topic: self.metadata.topic.clone(),
            mode: self.metadata.mode,
            domain,
        })
    }

    /// Transcript in dialogue order, ready to seed a resumed session.
    pub fn transcript(&self) -> Transcript {
        Transcript::from_turns(self.transcript.clone())
    }

    /// File name for this export.
    pub fn suggested_file_name(&self) -> String {
        file_name_for(&self.metadata.student)
    }
}

/// Name used when the student name leaves nothing usable.
pub const FALLBACK_FILE_STEM: &str = "session";

/// Characters that cannot appear in a file name on common filesystems.
const RESERVED_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Export file name for `student`.
///
/// Whitespace runs, reserved characters, and control characters become `-`,
/// and leading dots are dropped, so the result always names a single file
/// inside the output directory.
pub fn file_name_for(student: &str) -> String {
    let replaced: String = student
        .chars()
        .map(|c| {
            if c.is_whitespace() || c.is_control() || RESERVED_CHARS.contains(&c) {
                ' '
            } else {
                c
            }
        })
        .collect();
    let name = replaced.split_whitespace().collect::<Vec<_>>().join("-");
    let stem = name.trim_start_matches(['.', '-']);
    let stem = if stem.is_empty() { FALLBACK_FILE_STEM } else { stem };
    format!("{FILE_PREFIX}{stem}.json")
}
