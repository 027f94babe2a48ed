//! Plain-text rendering of a report for the terminal.

use std::fmt::Write as _;

use crate::transcript::{SessionConfig, TurnRole};

use super::prompt::STUDENT_TAG;
use super::schema::AnalysisResult;

/// Render `result` as a readable text report.
pub fn render_text(config: &SessionConfig, result: &AnalysisResult) -> String {
    let mut doc = String::new();

    let _ = writeln!(doc, "RAPPORT DE DIALOGUE SOCRATIQUE");
    let _ = writeln!(doc, "Étudiant·e : {}", config.student_name);
    let _ = writeln!(doc, "Sujet : {}", config.topic);
    let _ = writeln!(doc, "Mode : {} | Domaine : {}", config.mode, config.domain);
    let _ = writeln!(doc);

    let _ = writeln!(doc, "Scores");
    for (label, score) in result.scores() {
        let _ = writeln!(doc, "  {label:<32} {score:>3}/100");
    }
    let _ = writeln!(doc);

    let _ = writeln!(doc, "Synthèse");
    let _ = writeln!(doc, "{}", result.summary);
    let _ = writeln!(doc);

    write_list(&mut doc, "Points forts", &result.key_strengths);
    write_list(&mut doc, "Points de vigilance", &result.weaknesses);

    let _ = writeln!(doc, "Usage de l'IA");
    let _ = writeln!(doc, "Déclaration : {}", result.ai_declaration);
    let _ = writeln!(doc, "{}", result.ai_usage_analysis);
    let _ = writeln!(doc);

    let _ = writeln!(doc, "Transcription");
    for turn in &result.transcript {
        let tag = match turn.role {
            TurnRole::Student => STUDENT_TAG,
            TurnRole::Agent => "[IA]",
        };
        let _ = writeln!(doc, "{tag} : {}", turn.text);
    }

    doc
}

fn write_list(doc: &mut String, title: &str, items: &[String]) {
    let _ = writeln!(doc, "{title}");
    for item in items {
        let _ = writeln!(doc, "  - {item}");
    }
    let _ = writeln!(doc);
}
