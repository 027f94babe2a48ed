//! Structured-output contract of the analysis call and the final report record.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::rubric::{LEVEL_PARTIAL, RUBRIC_MAX_TOTAL};
use crate::transcript::{Transcript, Turn};

/// Score given to every sub-score of a fallback report.
pub const SCORE_SENTINEL: u32 = 0;

/// Upper bound of every sub-score.
pub const SCORE_MAX: u32 = 100;

/// Summary of a fallback report.
pub const FALLBACK_SUMMARY: &str = "Erreur analyse.";
/// Strength placeholder of a fallback report.
pub const FALLBACK_STRENGTH: &str = "Analyse indisponible : aucun point fort n'a pu être évalué.";
/// Weakness placeholder of a fallback report.
pub const FALLBACK_WEAKNESS: &str =
    "Analyse indisponible : relance la génération du rapport ou consulte la transcription.";
/// AI usage narrative of a fallback report.
pub const FALLBACK_AI_USAGE: &str = "Erreur.";

/// Fields the model must always return.
pub const REQUIRED_FIELDS: [&str; 7] = [
    "summary",
    "reasoningScore",
    "disciplinaryDiscernmentScore",
    "aiDeclarationCoherenceScore",
    "keyStrengths",
    "weaknesses",
    "aiUsageAnalysis",
];

/// JSON schema sent with the analysis request.
pub fn response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "summary": { "type": "STRING" },
            "reasoningScore": { "type": "INTEGER" },
            "clarityScore": { "type": "INTEGER" },
            "skepticismScore": { "type": "INTEGER" },
            "processScore": { "type": "INTEGER" },
            "reflectionScore": { "type": "INTEGER" },
            "disciplinaryDiscernmentScore": { "type": "INTEGER" },
            "aiDeclarationCoherenceScore": { "type": "INTEGER" },
            "keyStrengths": { "type": "ARRAY", "items": { "type": "STRING" } },
            "weaknesses": { "type": "ARRAY", "items": { "type": "STRING" } },
            "aiUsageAnalysis": { "type": "STRING" }
        },
        "required": REQUIRED_FIELDS,
    })
}

/// What the model returns, before any local post-processing.
///
/// Scores are signed so out-of-range values parse and get clamped instead
/// of failing the whole report.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelAnalysis {
    /// Narrative synthesis.
    pub summary: String,
    /// Quality of reasoning.
    pub reasoning_score: i64,
    /// Clarity of expression.
    #[serde(default)]
    pub clarity_score: i64,
    /// Methodical skepticism.
    #[serde(default)]
    pub skepticism_score: i64,
    /// Iteration and revision.
    #[serde(default)]
    pub process_score: i64,
    /// Metacognition.
    #[serde(default)]
    pub reflection_score: i64,
    /// Sum of the rubric criteria (0, 10, or 20 each).
    pub disciplinary_discernment_score: i64,
    /// Consistency between the AI-usage declaration and observed behavior.
    pub ai_declaration_coherence_score: i64,
    /// Observed strengths.
    pub key_strengths: Vec<String>,
    /// Points of vigilance.
    pub weaknesses: Vec<String>,
    /// Narrative on the AI-usage declaration.
    pub ai_usage_analysis: String,
}

/// The final, immutable report of a session.
///
/// Carries its own copy of the transcript and declaration so an export is
/// self-contained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    /// Narrative synthesis.
    pub summary: String,
    /// Quality of reasoning, 0–100.
    pub reasoning_score: u32,
    /// Clarity of expression, 0–100.
    pub clarity_score: u32,
    /// Methodical skepticism, 0–100.
    pub skepticism_score: u32,
    /// Iteration and revision, 0–100.
    pub process_score: u32,
    /// Metacognition, 0–100.
    pub reflection_score: u32,
    /// Rubric sum, 0–100 in steps of 10.
    pub disciplinary_discernment_score: u32,
    /// Declaration coherence, 0–100.
    pub ai_declaration_coherence_score: u32,
    /// Observed strengths.
    pub key_strengths: Vec<String>,
    /// Points of vigilance.
    pub weaknesses: Vec<String>,
    /// Narrative on the AI-usage declaration.
    pub ai_usage_analysis: String,
    /// Transcript the report was computed from.
    pub transcript: Vec<Turn>,
    /// Student's AI-usage declaration.
    pub ai_declaration: String,
}

impl AnalysisResult {
    /// Report returned when the analysis could not be produced.
    pub fn fallback(transcript: &Transcript, declaration: &str) -> Self {
        Self {
            summary: FALLBACK_SUMMARY.to_owned(),
            reasoning_score: SCORE_SENTINEL,
            clarity_score: SCORE_SENTINEL,
            skepticism_score: SCORE_SENTINEL,
            process_score: SCORE_SENTINEL,
            reflection_score: SCORE_SENTINEL,
            disciplinary_discernment_score: SCORE_SENTINEL,
            ai_declaration_coherence_score: SCORE_SENTINEL,
            key_strengths: vec![FALLBACK_STRENGTH.to_owned()],
            weaknesses: vec![FALLBACK_WEAKNESS.to_owned()],
            ai_usage_analysis: FALLBACK_AI_USAGE.to_owned(),
            transcript: transcript.turns().to_vec(),
            ai_declaration: declaration.to_owned(),
        }
    }

    /// Every sub-score with its display label, in report order.
    pub fn scores(&self) -> [(&'static str, u32); 7] {
        [
            ("Raisonnement", self.reasoning_score),
            ("Clarté", self.clarity_score),
            ("Esprit critique", self.skepticism_score),
            ("Processus & itération", self.process_score),
            ("Métacognition", self.reflection_score),
            ("Discernement disciplinaire", self.disciplinary_discernment_score),
            ("Cohérence de la déclaration IA", self.ai_declaration_coherence_score),
        ]
    }
}

/// Merge the model's answer with the locally held inputs.
///
/// Scores are clamped to 0–100 and the discernment score is floored to a
/// multiple of 10. The transcript and declaration always come from the
/// caller, never from the model.
pub fn attach_provenance(
    analysis: ModelAnalysis,
    transcript: &Transcript,
    declaration: &str,
) -> AnalysisResult {
    AnalysisResult {
        summary: analysis.summary,
        reasoning_score: clamp_score(analysis.reasoning_score),
        clarity_score: clamp_score(analysis.clarity_score),
        skepticism_score: clamp_score(analysis.skepticism_score),
        process_score: clamp_score(analysis.process_score),
        reflection_score: clamp_score(analysis.reflection_score),
        disciplinary_discernment_score: discernment_score(analysis.disciplinary_discernment_score),
        ai_declaration_coherence_score: clamp_score(analysis.ai_declaration_coherence_score),
        key_strengths: analysis.key_strengths,
        weaknesses: analysis.weaknesses,
        ai_usage_analysis: analysis.ai_usage_analysis,
        transcript: transcript.turns().to_vec(),
        ai_declaration: declaration.to_owned(),
    }
}

fn clamp_score(raw: i64) -> u32 {
    u32::try_from(raw.clamp(0, i64::from(SCORE_MAX))).unwrap_or(SCORE_SENTINEL)
}

fn discernment_score(raw: i64) -> u32 {
    let clamped = clamp_score(raw).min(RUBRIC_MAX_TOTAL);
    let remainder = clamped.checked_rem(LEVEL_PARTIAL).unwrap_or(0);
    clamped.saturating_sub(remainder)
}
