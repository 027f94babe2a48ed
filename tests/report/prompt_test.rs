//! Analysis prompt content.

use chrono::{Duration, Utc};

use argos::report::prompt::{build_analysis_prompt, STUDENT_TAG};
use argos::rubric::{Domain, RubricTable};
use argos::transcript::Transcript;

#[test]
fn prompt_embeds_rubric_levels_transcript_and_declaration() {
    let table = RubricTable::builtin();
    let rubric = match table.get(Domain::ScientificTechnical) {
        Ok(rubric) => rubric,
        Err(err) => panic!("rubric should exist: {err}"),
    };

    let start = Utc::now();
    let mut transcript = Transcript::new();
    transcript.push_agent("Qu'est-ce qu'un vaccin ?", start);
    transcript.push_student("Un antigène atténué.", start + Duration::seconds(42));

    let prompt = build_analysis_prompt(
        rubric,
        "La vaccination",
        &transcript,
        "J'ai utilisé un assistant pour reformuler.",
        "ARGOS",
    );

    assert!(prompt.contains("La vaccination"));
    assert!(prompt.contains(&rubric.label));
    for criterion in &rubric.criteria {
        assert!(prompt.contains(criterion.label()));
        for level in criterion.levels() {
            assert!(prompt.contains(&level.description), "{}", level.description);
        }
    }
    assert!(prompt.contains("[ARGOS] : Qu'est-ce qu'un vaccin ?"));
    assert!(prompt.contains(&format!("{STUDENT_TAG} (réflexion : 42 s) : Un antigène atténué.")));
    assert!(prompt.contains("J'ai utilisé un assistant pour reformuler."));
}

#[test]
fn empty_transcript_is_stated_explicitly() {
    let table = RubricTable::builtin();
    let rubric = match table.get(Domain::ClosedNotion) {
        Ok(rubric) => rubric,
        Err(err) => panic!("rubric should exist: {err}"),
    };
    let prompt = build_analysis_prompt(rubric, "x", &Transcript::new(), "Aucune.", "ARGOS");
    assert!(prompt.contains("(aucun échange)"));
}
