//! Report synthesis: merge of valid replies and the fallback record.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::json;

use argos::config::ArgosConfig;
use argos::report::schema::{FALLBACK_SUMMARY, SCORE_SENTINEL};
use argos::report::{AnalysisResult, ReportError, ReportSynthesizer};
use argos::rubric::{Domain, RubricTable};
use argos::transcript::Transcript;

use crate::mock_provider::{ScriptedProvider, Step};

fn synthesizer(provider: &Arc<ScriptedProvider>) -> ReportSynthesizer {
    ReportSynthesizer::new(
        Arc::clone(provider) as Arc<dyn argos::providers::LlmProvider>,
        Arc::new(RubricTable::builtin()),
        &ArgosConfig::default(),
    )
}

fn sample_transcript() -> Transcript {
    let now = Utc::now();
    let mut transcript = Transcript::new();
    transcript.push_agent("Que défends-tu ?", now);
    transcript.push_student("Que la démocratie suppose le conflit.", now);
    transcript
}

fn assert_is_fallback(result: &AnalysisResult, transcript: &Transcript, declaration: &str) {
    for (label, score) in result.scores() {
        assert_eq!(score, SCORE_SENTINEL, "{label}");
    }
    assert_eq!(result.summary, FALLBACK_SUMMARY);
    assert!(!result.key_strengths.is_empty());
    assert!(result.key_strengths.iter().all(|s| !s.trim().is_empty()));
    assert!(!result.weaknesses.is_empty());
    assert!(result.weaknesses.iter().all(|s| !s.trim().is_empty()));
    assert_eq!(result.transcript, transcript.turns());
    assert_eq!(result.ai_declaration, declaration);
}

#[tokio::test]
async fn failing_transport_yields_the_fallback_report() {
    let provider = Arc::new(ScriptedProvider::failing());
    let transcript = sample_transcript();

    let result = synthesizer(&provider)
        .analyze(&transcript, "La démocratie", Domain::DebateThesis, "Aucune.")
        .await;

    assert_is_fallback(&result, &transcript, "Aucune.");
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn malformed_reply_yields_the_fallback_report() {
    let provider = Arc::new(ScriptedProvider::replying(&["{\"summary\": \"incomplet\""]));
    let transcript = sample_transcript();

    let result = synthesizer(&provider)
        .analyze(&transcript, "La démocratie", Domain::DebateThesis, "Aucune.")
        .await;

    assert_is_fallback(&result, &transcript, "Aucune.");
}

#[tokio::test]
async fn reply_missing_required_fields_is_malformed() {
    let provider = Arc::new(ScriptedProvider::replying(&[r#"{"summary": "ok"}"#]));
    let transcript = sample_transcript();

    let result = synthesizer(&provider)
        .try_analyze(&transcript, "La démocratie", Domain::DebateThesis, "Aucune.")
        .await;

    assert!(matches!(result, Err(ReportError::Malformed(_))));
}

#[tokio::test(start_paused = true)]
async fn slow_analysis_yields_the_fallback_report() {
    let provider = Arc::new(ScriptedProvider::new(vec![Step::Slow(
        Duration::from_secs(600),
        "{}".to_owned(),
    )]));
    let transcript = sample_transcript();

    let result = synthesizer(&provider)
        .analyze(&transcript, "La démocratie", Domain::DebateThesis, "Aucune.")
        .await;

    assert_is_fallback(&result, &transcript, "Aucune.");
}

#[tokio::test]
async fn valid_reply_is_merged_with_local_transcript_and_declaration() {
    let reply = json!({
        "summary": "L'étudiant·e construit une thèse argumentée.",
        "reasoningScore": 72,
        "clarityScore": 65,
        "skepticismScore": 140,
        "processScore": 50,
        "reflectionScore": -3,
        "disciplinaryDiscernmentScore": 67,
        "aiDeclarationCoherenceScore": 80,
        "keyStrengths": ["Distingue conflit et violence."],
        "weaknesses": ["Peu de sources."],
        "aiUsageAnalysis": "Déclaration cohérente.",
        "transcript": [],
        "aiDeclaration": "texte inventé par le modèle"
    })
    .to_string();
    let provider = Arc::new(ScriptedProvider::replying(&[reply.as_str()]));
    let transcript = sample_transcript();
    let declaration = "Correcteur orthographique uniquement.";

    let result = synthesizer(&provider)
        .analyze(&transcript, "La démocratie", Domain::DebateThesis, declaration)
        .await;

    assert_eq!(result.summary, "L'étudiant·e construit une thèse argumentée.");
    assert_eq!(result.reasoning_score, 72);
    assert_eq!(result.skepticism_score, 100);
    assert_eq!(result.reflection_score, 0);
    assert_eq!(result.disciplinary_discernment_score, 60);
    assert_eq!(result.transcript, transcript.turns());
    assert_eq!(result.ai_declaration, declaration);

    let requests = provider.requests();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].response_schema.is_some());
    assert_eq!(requests[0].reasoning_budget, Some(4096));
}

#[tokio::test]
async fn fenced_json_reply_is_accepted() {
    let body = json!({
        "summary": "Synthèse.",
        "reasoningScore": 40,
        "disciplinaryDiscernmentScore": 40,
        "aiDeclarationCoherenceScore": 50,
        "keyStrengths": ["a"],
        "weaknesses": ["b"],
        "aiUsageAnalysis": "c"
    });
    let reply = format!("```json\n{body}\n```");
    let provider = Arc::new(ScriptedProvider::replying(&[reply.as_str()]));

    let result = synthesizer(&provider)
        .try_analyze(&sample_transcript(), "x", Domain::ClosedNotion, "Aucune.")
        .await;

    match result {
        Ok(result) => {
            assert_eq!(result.reasoning_score, 40);
            assert_eq!(result.clarity_score, 0);
        }
        Err(err) => panic!("fenced reply should parse: {err}"),
    }
}
