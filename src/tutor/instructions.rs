//! System-instruction builder for tutor sessions.
//!
//! `(mode, rubric, topic) -> instruction text`, with no network dependency.
//! The language policy (forbidden praise, turn protocol, phase contract) is
//! kept in declarative tables so it can change independently of the rubrics.
//!
//! The dialogue phases are a contract stated to the model. Nothing in this
//! crate tracks or enforces the current phase.

use std::fmt::Write as _;
use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};

use crate::rubric::{DefectProfile, DisciplineRubric};
use crate::transcript::SocraticMode;

/// Message sent on behalf of the student to make the tutor open the session.
pub const KICKOFF_PROMPT: &str =
    "Démarre la session selon le protocole pédagogique strict en me tutoyant.";

/// Line that introduces the stimulus text in AUDIT mode.
pub const STIMULUS_MARKER: &str = "TEXTE À AUDITER :";

/// Label of the first trailer line ("Requirement:").
pub const TRAILER_REQUIREMENT: &str = "Exigence:";
/// Label of the second trailer line ("Check:").
pub const TRAILER_CHECK: &str = "Contrôle:";

/// Target word-count band of a tutor reply.
pub const REPLY_WORD_BAND: (u32, u32) = (70, 140);

/// Praise and encouragement the tutor must never use.
pub const FORBIDDEN_PRAISE: &[&str] = &[
    "bravo",
    "excellent",
    "excellente",
    "parfait",
    "parfaite",
    "génial",
    "géniale",
    "félicitations",
    "formidable",
    "impressionnant",
    "très bien",
    "bien joué",
    "bonne question",
];

/// Register and addressing rules.
pub const LANGUAGE_RULES: &[&str] = &[
    "Tutoiement systématique, en français.",
    "Écriture inclusive (étudiant·e, il·elle).",
    "Registre sobre et sceptique.",
];

/// Per-reply rules of the turn-taking protocol.
pub const TURN_PROTOCOL: &[&str] = &[
    "Une seule question par message.",
    "Interdit de donner la réponse, même partiellement.",
    "Interdit de reformuler la réponse de l'étudiant·e à sa place.",
    "Interdit d'enchaîner des sous-questions déguisées.",
];

/// One stage of Socratic depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseContract {
    /// Zero-based phase index.
    pub index: u8,
    /// Phase name.
    pub name: &'static str,
    /// What the tutor works on during the phase.
    pub goal: &'static str,
}

/// The phase sequence, in order.
pub const PHASES: [PhaseContract; 5] = [
    PhaseContract {
        index: 0,
        name: "Exploration",
        goal: "faire émerger la position initiale et le vocabulaire de l'étudiant·e",
    },
    PhaseContract {
        index: 1,
        name: "Clarification",
        goal: "exiger des définitions et des distinctions précises",
    },
    PhaseContract {
        index: 2,
        name: "Mécanisme",
        goal: "faire expliciter le comment et le pourquoi",
    },
    PhaseContract {
        index: 3,
        name: "Vérification",
        goal: "confronter la position à des preuves, des tests et des contre-exemples",
    },
    PhaseContract {
        index: 4,
        name: "Mise à l'épreuve / Transfert",
        goal: "éprouver la position sur un cas limite ou dans un autre contexte",
    },
];

/// First phase from which the two-line trailer is mandatory.
pub const TRAILER_FROM_PHASE: u8 = 2;

/// Options that do not depend on the session itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstructionOptions {
    /// Tutor display name.
    pub tutor_name: String,
    /// Embed the partial and full level descriptions under each criterion.
    pub include_level_descriptions: bool,
}

impl Default for InstructionOptions {
    fn default() -> Self {
        Self {
            tutor_name: "ARGOS".to_owned(),
            include_level_descriptions: true,
        }
    }
}

/// Build the system instruction for a session.
///
/// `topic` is interpolated verbatim: the operator is trusted and the only
/// consumer is the model.
pub fn build_instruction(
    mode: SocraticMode,
    rubric: &DisciplineRubric,
    topic: &str,
    options: &InstructionOptions,
) -> String {
    let mut doc = build_common(rubric, topic, options);
    doc.push('\n');
    match mode {
        SocraticMode::Defense => push_defense(&mut doc),
        SocraticMode::Audit => push_audit(&mut doc, DefectProfile::for_domain(rubric.domain)),
    }
    doc
}

fn build_common(rubric: &DisciplineRubric, topic: &str, options: &InstructionOptions) -> String {
    let mut doc = String::with_capacity(4096);

    let _ = writeln!(
        doc,
        "IDENTITÉ : Tu es {}, agent du Dialogue Évaluatif Socratique. Sujet : \"{topic}\". Domaine : \"{}\".\n",
        options.tutor_name, rubric.label
    );

    doc.push_str("RÉFÉRENTIEL DISCIPLINAIRE (À OBSERVER) :\n");
    doc.push_str(
        "L'étudiant·e doit démontrer sa maîtrise des critères suivants propres à la discipline :\n",
    );
    for criterion in &rubric.criteria {
        let _ = writeln!(doc, "- {}", criterion.label());
        if options.include_level_descriptions {
            for level in criterion.non_zero_levels() {
                let _ = writeln!(doc, "  - {} pts : {}", level.score, level.description);
            }
        }
    }
    doc.push('\n');

    doc.push_str("LANGUE : ");
    doc.push_str(&LANGUAGE_RULES.join(" "));
    doc.push_str("\n\n");

    doc.push_str(
        "TON : Aucun compliment, aucun encouragement, aucune formule d'approbation. \
         Tu constates, tu questionnes, tu ne félicites jamais.\n\n",
    );

    doc.push_str("PRINCIPE D'ÉVALUATION :\n");
    doc.push_str(
        "- Identifie l'intention : Explorer (flou), Vérifier (demande de validation), Défendre (thèse).\n",
    );
    doc.push_str("- Appuie-toi sur les critères ci-dessus pour poser tes questions.\n");
    doc.push_str(
        "- Si l'étudiant·e reste au niveau \"sens commun\", pousse-le·la vers l'un des critères disciplinaires.\n\n",
    );

    doc.push_str("CONTRÔLE :\n");
    for rule in TURN_PROTOCOL {
        let _ = writeln!(doc, "- {rule}");
    }
    let (min_words, max_words) = REPLY_WORD_BAND;
    let _ = writeln!(doc, "- Longueur : {min_words}-{max_words} mots.");
    doc.push('\n');

    doc.push_str("PHASES DU DIALOGUE :\n");
    for phase in &PHASES {
        let _ = writeln!(doc, "{}. {} : {}.", phase.index, phase.name, phase.goal);
    }
    doc.push_str(
        "Ne passe jamais à la phase suivante sans matériau exploitable pour la phase en cours.\n\n",
    );

    let _ = writeln!(
        doc,
        "TRACE OBLIGATOIRE (phases {TRAILER_FROM_PHASE}+) : termine chaque message par exactement deux lignes :"
    );
    let _ = writeln!(
        doc,
        "{TRAILER_REQUIREMENT} ce que ta prochaine réponse doit contenir."
    );
    let _ = writeln!(
        doc,
        "{TRAILER_CHECK} la condition vérifiable qui invaliderait cette réponse.\n"
    );

    doc.push_str(
        "ANTI-GAMING : Détecte les copier-coller ou les réponses trop rapides par rapport à la complexité demandée.\n",
    );
    doc
}

fn push_defense(doc: &mut String) {
    doc.push_str(
        "MODE : DÉFENSE. Objectif : éprouver la solidité du raisonnement de l'étudiant·e \
         sur les critères disciplinaires cités.\n",
    );
}

fn push_audit(doc: &mut String, defects: DefectProfile) {
    doc.push_str("MODE : AUDIT.\n");
    let _ = writeln!(
        doc,
        "Ton premier message présente un texte plausible de 150 à 250 mots sur le sujet, \
         introduit par la ligne \"{STIMULUS_MARKER}\"."
    );
    let _ = writeln!(
        doc,
        "Ce texte contient exactement 3 défauts ({}), un par catégorie :",
        defects.summary
    );
    for (position, (slot, rendering)) in (1_u8..).zip(defects.slots()) {
        let _ = writeln!(doc, "{position}. {} (ici : {rendering})", slot.label());
    }
    doc.push_str("Ne révèle ni l'emplacement ni la nature des défauts.\n");
    doc.push_str(
        "SUIVI : tiens à jour l'état de chaque défaut (non repéré, repéré, corrigé et vérifié).\n",
    );
    doc.push_str(
        "Ne demande jamais de tout recommencer : à chaque tour, redemande uniquement \
         l'élément manquant ou le plus faible.\n",
    );
    doc.push_str(
        "Force l'étudiant·e à proposer des protocoles de vérification ancrés dans les critères disciplinaires.\n",
    );
}

/// Every [`FORBIDDEN_PRAISE`] entry as one whole-word, case-insensitive
/// alternation. `None` only if the table cannot compile.
static PRAISE_PATTERN: LazyLock<Option<Regex>> = LazyLock::new(|| {
    let alternation = FORBIDDEN_PRAISE
        .iter()
        .map(|word| regex::escape(word))
        .collect::<Vec<_>>()
        .join("|");
    RegexBuilder::new(&format!(r"\b(?:{alternation})\b"))
        .case_insensitive(true)
        .build()
        .ok()
});

/// First forbidden praise word found in `text`, matched as a whole word,
/// case-insensitively.
pub fn find_forbidden_praise(text: &str) -> Option<&'static str> {
    let found = PRAISE_PATTERN.as_ref()?.find(text)?.as_str().to_lowercase();
    FORBIDDEN_PRAISE.iter().copied().find(|word| *word == found)
}
