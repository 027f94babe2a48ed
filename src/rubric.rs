//! Discipline rubrics used to steer the tutor and to score the final report.
//!
//! A [`RubricTable`] is built once at startup (usually from
//! [`RubricTable::builtin`]) and shared read-only by the session configurator
//! and the report synthesizer. Every [`Criterion`] carries exactly three score
//! levels (0, 10, 20); five criteria therefore sum to 100 at the maximum level.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Score awarded when a criterion is not demonstrated.
pub const LEVEL_ABSENT: u32 = 0;
/// Score awarded when a criterion is partially demonstrated.
pub const LEVEL_PARTIAL: u32 = 10;
/// Score awarded when a criterion is fully demonstrated.
pub const LEVEL_FULL: u32 = 20;

/// Maximum total a rubric must reach when every criterion is at [`LEVEL_FULL`].
pub const RUBRIC_MAX_TOTAL: u32 = 100;

/// Number of criteria every rubric carries.
pub const CRITERIA_PER_RUBRIC: usize = 5;

/// The only accepted level scale, in order.
const LEVEL_SCALE: [u32; 3] = [LEVEL_ABSENT, LEVEL_PARTIAL, LEVEL_FULL];

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Programmer errors raised while configuring a session or a report.
///
/// The terminal driver only ever supplies closed-set values, so these are
/// not expected at runtime.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigurationError {
    /// Domain key is not one of the known disciplines.
    #[error("unknown domain '{0}'")]
    UnknownDomain(String),
    /// Mode key is not one of the known pedagogical modes.
    #[error("unknown mode '{0}'")]
    UnknownMode(String),
    /// Domain is valid but the rubric table carries no entry for it.
    #[error("no rubric registered for domain '{0}'")]
    MissingRubric(Domain),
    /// Rubric violates the level/total invariants.
    #[error("invalid rubric for domain '{domain}': {reason}")]
    InvalidRubric {
        /// Offending domain.
        domain: Domain,
        /// What was wrong.
        reason: String,
    },
}

// ---------------------------------------------------------------------------
// Domain
// ---------------------------------------------------------------------------

/// Disciplinary domain of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    /// Closed notions: definitions, rules, protocols.
    ClosedNotion,
    /// Debate, thesis defense, humanities and social sciences.
    DebateThesis,
    /// Scientific, technical, and health topics.
    ScientificTechnical,
}

impl Domain {
    /// All domains, in display order.
    pub const ALL: [Domain; 3] = [
        Domain::ClosedNotion,
        Domain::DebateThesis,
        Domain::ScientificTechnical,
    ];

    /// Stable wire key (`closed_notion`, `debate_thesis`, `scientific_technical`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ClosedNotion => "closed_notion",
            Self::DebateThesis => "debate_thesis",
            Self::ScientificTechnical => "scientific_technical",
        }
    }

    /// Reasoning-token budget granted to the model for this domain.
    ///
    /// Analysis calls get twice the conversational budget.
    pub fn reasoning_budget(self, analysis: bool) -> u32 {
        let base: u32 = match self {
            Self::ClosedNotion => 1024,
            Self::DebateThesis => 2048,
            Self::ScientificTechnical => 3072,
        };
        if analysis {
            base.saturating_mul(2)
        } else {
            base
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Domain {
    type Err = ConfigurationError;

    /// Accepts the wire key plus the `-` and `/` spellings
    /// (`debate-thesis`, `debate/thesis`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', '/', ' '], "_");
        match normalized.as_str() {
            "closed_notion" => Ok(Self::ClosedNotion),
            "debate_thesis" => Ok(Self::DebateThesis),
            "scientific_technical" => Ok(Self::ScientificTechnical),
            _ => Err(ConfigurationError::UnknownDomain(s.to_owned())),
        }
    }
}

// ---------------------------------------------------------------------------
// Criteria
// ---------------------------------------------------------------------------

/// One score level of a criterion and what performance there looks like.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreLevel {
    /// Points awarded at this level.
    pub score: u32,
    /// Observable behavior expected at this level.
    pub description: String,
}

/// A scored rubric criterion with exactly three levels (0, 10, 20).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Criterion {
    label: String,
    levels: [ScoreLevel; 3],
}

impl Criterion {
    /// Build a criterion from its label and the descriptions of the absent,
    /// partial, and full levels.
    pub fn new(
        label: impl Into<String>,
        absent: impl Into<String>,
        partial: impl Into<String>,
        full: impl Into<String>,
    ) -> Self {
        Self {
            label: label.into(),
            levels: [
                ScoreLevel {
                    score: LEVEL_ABSENT,
                    description: absent.into(),
                },
                ScoreLevel {
                    score: LEVEL_PARTIAL,
                    description: partial.into(),
                },
                ScoreLevel {
                    score: LEVEL_FULL,
                    description: full.into(),
                },
            ],
        }
    }

    /// Criterion label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// The three levels in increasing score order.
    pub fn levels(&self) -> &[ScoreLevel; 3] {
        &self.levels
    }

    /// Levels above zero (partial, full), used in tutor instructions.
    pub fn non_zero_levels(&self) -> impl Iterator<Item = &ScoreLevel> {
        self.levels.iter().filter(|level| level.score > LEVEL_ABSENT)
    }

    /// Highest attainable score.
    pub fn max_score(&self) -> u32 {
        self.levels
            .iter()
            .map(|level| level.score)
            .max()
            .unwrap_or(LEVEL_ABSENT)
    }

    fn has_standard_levels(&self) -> bool {
        self.levels.iter().map(|level| level.score).eq(LEVEL_SCALE)
    }
}

// ---------------------------------------------------------------------------
// Rubric
// ---------------------------------------------------------------------------

/// The scored criteria for one discipline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisciplineRubric {
    /// Domain this rubric grades.
    pub domain: Domain,
    /// Human-readable domain label interpolated into prompts.
    pub label: String,
    /// Ordered criteria, exactly [`CRITERIA_PER_RUBRIC`] of them.
    pub criteria: Vec<Criterion>,
}

impl DisciplineRubric {
    /// Sum of every criterion's maximum level.
    pub fn max_total(&self) -> u32 {
        self.criteria
            .iter()
            .fold(0_u32, |acc, c| acc.saturating_add(c.max_score()))
    }

    /// Labels of all criteria, in order.
    pub fn criterion_labels(&self) -> impl Iterator<Item = &str> {
        self.criteria.iter().map(Criterion::label)
    }

    /// Check the criterion count, the 0/10/20 scale, and the 100-point maximum.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::InvalidRubric`] when the rubric does not
    /// have five criteria, a criterion's levels are not exactly 0, 10 and 20,
    /// or the maxima do not sum to 100.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.criteria.len() != CRITERIA_PER_RUBRIC {
            return Err(ConfigurationError::InvalidRubric {
                domain: self.domain,
                reason: format!(
                    "{} criteria, expected {CRITERIA_PER_RUBRIC}",
                    self.criteria.len()
                ),
            });
        }
        if let Some(bad) = self.criteria.iter().find(|c| !c.has_standard_levels()) {
            return Err(ConfigurationError::InvalidRubric {
                domain: self.domain,
                reason: format!(
                    "levels of '{}' must be {LEVEL_ABSENT}/{LEVEL_PARTIAL}/{LEVEL_FULL}",
                    bad.label()
                ),
            });
        }
        let total = self.max_total();
        if total != RUBRIC_MAX_TOTAL {
            return Err(ConfigurationError::InvalidRubric {
                domain: self.domain,
                reason: format!("criteria maxima sum to {total}, expected {RUBRIC_MAX_TOTAL}"),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// AUDIT defect profile
// ---------------------------------------------------------------------------

/// The three defect slots every AUDIT stimulus text must contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DefectSlot {
    /// A false fact or datum.
    Factual,
    /// A broken inference.
    Logical,
    /// A claim stretched beyond its valid scope.
    Overgeneralization,
}

impl DefectSlot {
    /// All slots in the order they are introduced to the model.
    pub const ALL: [DefectSlot; 3] = [
        DefectSlot::Factual,
        DefectSlot::Logical,
        DefectSlot::Overgeneralization,
    ];

    /// Generic category name as written in instructions.
    pub fn label(self) -> &'static str {
        match self {
            Self::Factual => "factuel",
            Self::Logical => "logique",
            Self::Overgeneralization => "généralisation abusive",
        }
    }
}

/// How each defect slot is rendered in a given discipline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefectProfile {
    /// Domain-specific rendering of the factual, logical, and
    /// over-generalization slots, in [`DefectSlot::ALL`] order.
    pub renderings: [&'static str; 3],
    /// One-line summary of the kind of errors to plant.
    pub summary: &'static str,
}

impl DefectProfile {
    /// Built-in profile for a domain.
    pub fn for_domain(domain: Domain) -> Self {
        match domain {
            Domain::ClosedNotion => Self {
                renderings: [
                    "définition inexacte",
                    "condition d'usage erronée",
                    "contre-exemple ignoré",
                ],
                summary: "erreurs sur règles, définitions ou conditions d'application",
            },
            Domain::DebateThesis => Self {
                renderings: ["factuel", "logique", "généralisation abusive"],
                summary: "erreurs factuelles, logiques ou de généralisation",
            },
            Domain::ScientificTechnical => Self {
                renderings: [
                    "donnée erronée",
                    "causalité non prouvée",
                    "périmètre de validité ignoré",
                ],
                summary: "erreurs sur données, causalités ou conditions de validité",
            },
        }
    }

    /// Slots paired with their domain rendering.
    pub fn slots(&self) -> impl Iterator<Item = (DefectSlot, &'static str)> + '_ {
        DefectSlot::ALL.into_iter().zip(self.renderings)
    }
}

// ---------------------------------------------------------------------------
// Table
// ---------------------------------------------------------------------------

/// Immutable, process-wide table of rubrics keyed by domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RubricTable {
    rubrics: BTreeMap<Domain, DisciplineRubric>,
}

impl RubricTable {
    /// Build a table from explicit rubrics, validating each one.
    ///
    /// # Errors
    ///
    /// Returns the first rubric invariant violation found.
    pub fn from_rubrics(
        rubrics: impl IntoIterator<Item = DisciplineRubric>,
    ) -> Result<Self, ConfigurationError> {
        let mut table = BTreeMap::new();
        for rubric in rubrics {
            rubric.validate()?;
            table.insert(rubric.domain, rubric);
        }
        Ok(Self { rubrics: table })
    }

    /// The built-in rubrics for every [`Domain`].
    pub fn builtin() -> Self {
        let rubrics = [closed_notion(), debate_thesis(), scientific_technical()]
            .into_iter()
            .map(|r| (r.domain, r))
            .collect();
        Self { rubrics }
    }

    /// Look up the rubric for a domain.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::MissingRubric`] when the table has no
    /// entry for `domain`.
    pub fn get(&self, domain: Domain) -> Result<&DisciplineRubric, ConfigurationError> {
        self.rubrics
            .get(&domain)
            .ok_or(ConfigurationError::MissingRubric(domain))
    }

    /// Iterate rubrics in domain order.
    pub fn iter(&self) -> impl Iterator<Item = &DisciplineRubric> {
        self.rubrics.values()
    }

    /// Number of rubrics in the table.
    pub fn len(&self) -> usize {
        self.rubrics.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.rubrics.is_empty()
    }
}

impl Default for RubricTable {
    fn default() -> Self {
        Self::builtin()
    }
}

fn closed_notion() -> DisciplineRubric {
    DisciplineRubric {
        domain: Domain::ClosedNotion,
        label: "Notion Fermée / Règles".to_owned(),
        criteria: vec![
            Criterion::new(
                "Précision de la définition (usage des termes exacts)",
                "Définition absente, circulaire ou formulée en termes vagues.",
                "Définition reconnaissable mais approximative ou incomplète.",
                "Définition exacte, termes techniques employés à bon escient.",
            ),
            Criterion::new(
                "Identification exhaustive des conditions d'application",
                "Aucune condition d'application n'est mentionnée.",
                "Certaines conditions citées, d'autres oubliées ou confondues.",
                "Toutes les conditions nécessaires sont énoncées et justifiées.",
            ),
            Criterion::new(
                "Capacité à identifier un contre-exemple invalide",
                "Accepte un contre-exemple invalide sans le questionner.",
                "Soupçonne le contre-exemple sans expliquer pourquoi il échoue.",
                "Rejette le contre-exemple en nommant la condition violée.",
            ),
            Criterion::new(
                "Distinguer le concept de ses illustrations superficielles",
                "Confond le concept avec un exemple particulier.",
                "Sépare concept et exemple sans en tirer de conséquence.",
                "Explique ce qui, dans l'exemple, relève ou non du concept.",
            ),
            Criterion::new(
                "Respect strict de la syntaxe ou du protocole métier",
                "Le protocole ou la syntaxe attendus sont ignorés.",
                "Protocole suivi avec des écarts non signalés.",
                "Protocole appliqué rigoureusement, écarts repérés et corrigés.",
            ),
        ],
    }
}

fn debate_thesis() -> DisciplineRubric {
    DisciplineRubric {
        domain: Domain::DebateThesis,
        label: "Débat / Thèse / SHS".to_owned(),
        criteria: vec![
            Criterion::new(
                "Identification et critique des prémisses (présupposés)",
                "Les présupposés de la thèse restent implicites.",
                "Un présupposé est nommé mais pas discuté.",
                "Les présupposés sont explicités et leur solidité est examinée.",
            ),
            Criterion::new(
                "Évaluation de la force probante des arguments mobilisés",
                "Tous les arguments sont traités comme également valables.",
                "Hiérarchise les arguments sans critère explicite.",
                "Pèse chaque argument selon sa source et sa portée.",
            ),
            Criterion::new(
                "Reconnaissance et traitement des biais cognitifs (confirmation, ancrage)",
                "Aucun biais n'est repéré, y compris dans son propre raisonnement.",
                "Nomme un biais chez autrui sans l'appliquer à soi.",
                "Repère ses propres biais et ajuste sa position en conséquence.",
            ),
            Criterion::new(
                "Capacité à habiter la perspective adverse (décentrement)",
                "La position adverse est caricaturée ou ignorée.",
                "La position adverse est restituée sans en saisir la logique.",
                "Reconstruit la meilleure version de l'argument adverse.",
            ),
            Criterion::new(
                "Cohérence logique du système argumentatif global",
                "Contradictions non résolues entre les affirmations.",
                "Cohérence globale avec des tensions laissées ouvertes.",
                "Système argumentatif cohérent, tensions identifiées et traitées.",
            ),
        ],
    }
}

fn scientific_technical() -> DisciplineRubric {
    DisciplineRubric {
        domain: Domain::ScientificTechnical,
        label: "Scientifique / Technique / Santé".to_owned(),
        criteria: vec![
            Criterion::new(
                "Recours aux données probantes (Evidence-Based)",
                "Affirmations sans appui sur des données.",
                "Données évoquées sans source ni niveau de preuve.",
                "Données sourcées, niveau de preuve qualifié.",
            ),
            Criterion::new(
                "Identification des variables et des liens de causalité",
                "Corrélation et causalité sont confondues.",
                "Variables identifiées, lien causal supposé sans mécanisme.",
                "Variables, confondants et mécanisme causal explicités.",
            ),
            Criterion::new(
                "Précision du périmètre de validité d'une affirmation",
                "Les affirmations sont présentées comme universelles.",
                "Des limites sont évoquées sans être délimitées.",
                "Le domaine de validité est borné avec précision.",
            ),
            Criterion::new(
                "Usage du doute méthodique (réfutabilité de Popper)",
                "Aucune condition de réfutation n'est envisagée.",
                "Admet que la thèse pourrait être fausse sans dire comment.",
                "Formule une observation précise qui invaliderait la thèse.",
            ),
            Criterion::new(
                "Rigueur de la méthodologie de vérification proposée",
                "Aucune méthode de vérification proposée.",
                "Méthode esquissée, protocole incomplet ou non reproductible.",
                "Protocole de vérification complet, reproductible et contrôlé.",
            ),
        ],
    }
}
