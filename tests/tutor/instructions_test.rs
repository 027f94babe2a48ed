//! System instruction content for both modes and every domain.

use argos::rubric::{DefectProfile, DefectSlot, Domain, RubricTable};
use argos::transcript::SocraticMode;
use argos::tutor::instructions::{
    build_instruction, find_forbidden_praise, InstructionOptions, FORBIDDEN_PRAISE, PHASES,
    STIMULUS_MARKER, TRAILER_CHECK, TRAILER_REQUIREMENT,
};

fn instruction(mode: SocraticMode, domain: Domain, topic: &str) -> String {
    let table = RubricTable::builtin();
    let rubric = match table.get(domain) {
        Ok(rubric) => rubric,
        Err(err) => panic!("builtin rubric should exist: {err}"),
    };
    build_instruction(mode, rubric, topic, &InstructionOptions::default())
}

#[test]
fn defense_debate_instruction_names_topic_domain_and_criteria() {
    let topic = "La liberté d'expression doit-elle avoir des limites ?";
    let doc = instruction(SocraticMode::Defense, Domain::DebateThesis, topic);

    assert!(doc.contains(topic));

    let table = RubricTable::builtin();
    let rubric = match table.get(Domain::DebateThesis) {
        Ok(rubric) => rubric,
        Err(err) => panic!("debate rubric should exist: {err}"),
    };
    assert!(doc.contains(&rubric.label));
    let labels: Vec<&str> = rubric.criterion_labels().collect();
    assert_eq!(labels.len(), 5);
    for label in labels {
        assert!(doc.contains(label), "missing criterion: {label}");
    }

    assert_eq!(find_forbidden_praise(&doc), None);
    assert!(!doc.contains(STIMULUS_MARKER));
}

#[test]
fn audit_instruction_carries_stimulus_and_three_defect_slots() {
    for domain in Domain::ALL {
        let doc = instruction(SocraticMode::Audit, domain, "Le cycle de l'eau");

        assert!(doc.contains(STIMULUS_MARKER), "{domain}");
        for slot in DefectSlot::ALL {
            assert!(doc.contains(slot.label()), "{domain}: {}", slot.label());
        }
        for (_, rendering) in DefectProfile::for_domain(domain).slots() {
            assert!(doc.contains(rendering), "{domain}: {rendering}");
        }
        assert_eq!(find_forbidden_praise(&doc), None, "{domain}");
    }
}

#[test]
fn every_instruction_lists_the_phase_contract_and_trailer() {
    for mode in [SocraticMode::Defense, SocraticMode::Audit] {
        let doc = instruction(mode, Domain::ScientificTechnical, "La vaccination");
        for phase in PHASES {
            assert!(doc.contains(phase.name), "{mode}: {}", phase.name);
        }
        assert!(doc.contains(TRAILER_REQUIREMENT));
        assert!(doc.contains(TRAILER_CHECK));
    }
}

#[test]
fn instruction_uses_configured_tutor_name() {
    let table = RubricTable::builtin();
    let rubric = match table.get(Domain::ClosedNotion) {
        Ok(rubric) => rubric,
        Err(err) => panic!("closed notion rubric should exist: {err}"),
    };
    let options = InstructionOptions {
        tutor_name: "SOCRATE".to_owned(),
        include_level_descriptions: true,
    };
    let doc = build_instruction(SocraticMode::Defense, rubric, "Le subjonctif", &options);
    assert!(doc.contains("SOCRATE"));
}

#[test]
fn praise_detection_matches_whole_words_only() {
    assert_eq!(find_forbidden_praise("Bravo pour cette piste."), Some("bravo"));
    assert_eq!(find_forbidden_praise("C'est PARFAIT."), Some("parfait"));
    assert_eq!(find_forbidden_praise("Un travail imparfait."), None);
    assert!(FORBIDDEN_PRAISE.contains(&"bravo"));
}
