//! Analysis prompt: rubric, scoring policy, role-tagged transcript, and the
//! student's AI-usage declaration.

use std::fmt::Write as _;

use crate::rubric::{DisciplineRubric, LEVEL_ABSENT, LEVEL_FULL, LEVEL_PARTIAL, RUBRIC_MAX_TOTAL};
use crate::transcript::{Transcript, Turn, TurnRole};

/// Tag placed in front of student turns.
pub const STUDENT_TAG: &str = "[Étudiant·e]";

/// Word target of the narrative summary.
pub const SUMMARY_WORDS: u32 = 180;

/// Declaration recorded when the student leaves it blank.
pub const NO_DECLARATION: &str = "Aucune déclaration fournie.";

/// Trimmed declaration, or [`NO_DECLARATION`] when blank.
pub fn normalize_declaration(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        NO_DECLARATION.to_owned()
    } else {
        trimmed.to_owned()
    }
}

/// Build the single prompt sent to the analysis model.
pub fn build_analysis_prompt(
    rubric: &DisciplineRubric,
    topic: &str,
    transcript: &Transcript,
    declaration: &str,
    tutor_name: &str,
) -> String {
    let mut doc = String::new();

    let _ = writeln!(
        doc,
        "Tu es l'évaluateur·rice d'une session de dialogue socratique menée par {tutor_name}."
    );
    let _ = writeln!(doc, "Sujet : {topic}");
    let _ = writeln!(doc, "Domaine : {}", rubric.label);
    let _ = writeln!(doc);

    write_rubric(&mut doc, rubric);
    write_scoring_policy(&mut doc);

    let _ = writeln!(doc, "## TRANSCRIPTION");
    if transcript.is_empty() {
        let _ = writeln!(doc, "(aucun échange)");
    }
    for turn in transcript.turns() {
        let _ = writeln!(doc, "{}", render_turn(turn, tutor_name));
    }
    let _ = writeln!(doc);

    let _ = writeln!(doc, "## DÉCLARATION D'USAGE DE L'IA");
    let _ = writeln!(doc, "{}", declaration.trim());
    let _ = writeln!(doc);

    let _ = writeln!(doc, "## FORMAT");
    let _ = writeln!(
        doc,
        "Réponds uniquement par un objet JSON conforme au schéma fourni. \
         `summary` : synthèse d'environ {SUMMARY_WORDS} mots, en français, \
         en écriture inclusive. `keyStrengths` et `weaknesses` : au moins un élément \
         chacun, appuyé sur un passage de la transcription."
    );

    doc
}

fn write_rubric(doc: &mut String, rubric: &DisciplineRubric) {
    let _ = writeln!(doc, "## RÉFÉRENTIEL ({} points)", rubric.max_total());
    for (index, criterion) in rubric.criteria.iter().enumerate() {
        let _ = writeln!(doc, "{}. {}", index.saturating_add(1), criterion.label());
        for level in criterion.levels() {
            let _ = writeln!(doc, "  - {} pts : {}", level.score, level.description);
        }
    }
    let _ = writeln!(doc);
}

fn write_scoring_policy(doc: &mut String) {
    let _ = writeln!(doc, "## NOTATION");
    let _ = writeln!(
        doc,
        "- `disciplinaryDiscernmentScore` : somme des critères du référentiel, \
         chacun noté {LEVEL_ABSENT}, {LEVEL_PARTIAL} ou {LEVEL_FULL}, \
         total entre 0 et {RUBRIC_MAX_TOTAL}."
    );
    let _ = writeln!(
        doc,
        "- `reasoningScore`, `clarityScore`, `skepticismScore`, `processScore`, \
         `reflectionScore` : 0 à 100, sans note plancher. Un score n'est accordé \
         que sur une preuve explicite dans la transcription."
    );
    let _ = writeln!(
        doc,
        "- `aiDeclarationCoherenceScore` : 0 à 100, cohérence entre la déclaration \
         et le comportement observé pendant le dialogue."
    );
    let _ = writeln!(
        doc,
        "- Les temps de réflexion très courts suivis de réponses longues et \
         polies sont un indice d'usage d'un outil externe, à signaler sans conclure."
    );
    let _ = writeln!(doc);
}

fn render_turn(turn: &Turn, tutor_name: &str) -> String {
    match turn.role {
        TurnRole::Student => match turn.reflection_secs() {
            Some(secs) => format!("{STUDENT_TAG} (réflexion : {secs} s) : {}", turn.text),
            None => format!("{STUDENT_TAG} : {}", turn.text),
        },
        TurnRole::Agent => format!("[{tutor_name}] : {}", turn.text),
    }
}
