//! End-of-session analysis.
//!
//! [`ReportSynthesizer::analyze`] sends the transcript, rubric, and AI-usage
//! declaration to the analysis model in one structured-output call. It never
//! fails: any problem yields [`AnalysisResult::fallback`].

pub mod prompt;
pub mod render;
pub mod schema;
pub mod synthesizer;

pub use render::render_text;
pub use schema::{AnalysisResult, ModelAnalysis};
pub use synthesizer::{ReportError, ReportSynthesizer};
