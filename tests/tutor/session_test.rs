//! Session configuration, resume seeding, and per-turn validation.

use std::sync::Arc;

use chrono::Utc;

use argos::config::ArgosConfig;
use argos::providers::Role;
use argos::rubric::{ConfigurationError, Domain, RubricTable};
use argos::transcript::{SocraticMode, Transcript};
use argos::tutor::exchange::{APOLOGY_REPLY, EMPTY_MESSAGE_REPLY, TOO_LONG_REPLY};
use argos::tutor::instructions::KICKOFF_PROMPT;
use argos::tutor::{ReplyOutcome, SessionConfigurator};

use crate::mock_provider::ScriptedProvider;

fn configurator(provider: &Arc<ScriptedProvider>) -> SessionConfigurator {
    SessionConfigurator::new(
        Arc::clone(provider) as Arc<dyn argos::providers::LlmProvider>,
        Arc::new(RubricTable::builtin()),
        &ArgosConfig::default(),
    )
}

#[tokio::test]
async fn invalid_messages_never_reach_the_provider() {
    let provider = Arc::new(ScriptedProvider::replying(&["unused"]));
    let mut session = match configurator(&provider).create_session(
        SocraticMode::Defense,
        "La photosynthèse",
        Domain::ScientificTechnical,
        &[],
    ) {
        Ok(session) => session,
        Err(err) => panic!("session should open: {err}"),
    };

    let empty = session.send("   \n\t").await;
    assert_eq!(empty.text, EMPTY_MESSAGE_REPLY);
    assert_eq!(empty.outcome, ReplyOutcome::Rejected);

    let too_long = session.send(&"a".repeat(2001)).await;
    assert_eq!(too_long.text, TOO_LONG_REPLY);
    assert_eq!(too_long.outcome, ReplyOutcome::Rejected);

    assert_eq!(provider.calls(), 0);
    assert!(session.history().is_empty());
}

#[tokio::test]
async fn message_at_the_length_limit_is_forwarded() {
    let provider = Arc::new(ScriptedProvider::replying(&["Précise ta définition."]));
    let mut session = match configurator(&provider).create_session(
        SocraticMode::Defense,
        "La photosynthèse",
        Domain::ScientificTechnical,
        &[],
    ) {
        Ok(session) => session,
        Err(err) => panic!("session should open: {err}"),
    };

    let reply = session.send(&"é".repeat(2000)).await;
    assert!(reply.is_delivered());
    assert!(reply.elapsed_ms.is_some());
    assert_eq!(provider.calls(), 1);
    assert_eq!(session.history().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn exhausted_transport_yields_the_apology() {
    let provider = Arc::new(ScriptedProvider::failing());
    let mut session = match configurator(&provider).create_session(
        SocraticMode::Audit,
        "Les biais cognitifs",
        Domain::DebateThesis,
        &[],
    ) {
        Ok(session) => session,
        Err(err) => panic!("session should open: {err}"),
    };

    let reply = session.send("Je pense que le texte exagère.").await;

    assert_eq!(reply.text, APOLOGY_REPLY);
    assert_eq!(reply.outcome, ReplyOutcome::Failed);
    assert_eq!(provider.calls(), 3);
    assert!(session.history().is_empty());
}

#[tokio::test]
async fn resumed_session_keeps_prior_turns_in_order() {
    let now = Utc::now();
    let mut transcript = Transcript::new();
    transcript.push_agent("Que sais-tu des accords du participe ?", now);
    transcript.push_student("Il s'accorde avec le sujet.", now);
    transcript.push_agent("Toujours ?", now);
    transcript.push_student("Pas avec avoir.", now);

    let provider = Arc::new(ScriptedProvider::replying(&["Donne un exemple."]));
    let mut session = match configurator(&provider).create_session(
        SocraticMode::Defense,
        "Le participe passé",
        Domain::ClosedNotion,
        transcript.turns(),
    ) {
        Ok(session) => session,
        Err(err) => panic!("session should resume: {err}"),
    };

    let roles: Vec<Role> = session.history().iter().map(|m| m.role).collect();
    assert_eq!(roles, vec![Role::Model, Role::User, Role::Model, Role::User]);
    let texts: Vec<&str> = session.history().iter().map(|m| m.text.as_str()).collect();
    let expected: Vec<&str> = transcript.turns().iter().map(|t| t.text.as_str()).collect();
    assert_eq!(texts, expected);

    assert!(session.open().await.is_none());
    assert_eq!(provider.calls(), 0);

    let reply = session.send("Sauf si le COD est placé avant.").await;
    assert!(reply.is_delivered());

    let requests = provider.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].messages.len(), 5);
    assert_eq!(requests[0].messages[4].role, Role::User);
}

#[tokio::test]
async fn fresh_session_opens_with_the_kickoff_prompt() {
    let provider = Arc::new(ScriptedProvider::replying(&["Quelle est ta thèse ?"]));
    let mut session = match configurator(&provider).create_session(
        SocraticMode::Defense,
        "Le travail",
        Domain::DebateThesis,
        &[],
    ) {
        Ok(session) => session,
        Err(err) => panic!("session should open: {err}"),
    };

    let reply = match session.open().await {
        Some(reply) => reply,
        None => panic!("fresh session should send the kickoff"),
    };
    assert_eq!(reply.text, "Quelle est ta thèse ?");

    let requests = provider.requests();
    assert_eq!(requests[0].messages[0].text, KICKOFF_PROMPT);
    assert_eq!(requests[0].reasoning_budget, Some(2048));
    assert!(requests[0].response_schema.is_none());
    let system = requests[0].system.clone().unwrap_or_default();
    assert!(system.contains("Le travail"));
}

#[test]
fn unknown_domain_is_a_configuration_error() {
    let parsed = "astrologie".parse::<Domain>();
    assert_eq!(
        parsed,
        Err(ConfigurationError::UnknownDomain("astrologie".to_owned()))
    );
}

#[test]
fn missing_rubric_is_a_configuration_error() {
    let table = match RubricTable::from_rubrics(Vec::new()) {
        Ok(table) => table,
        Err(err) => panic!("empty table should build: {err}"),
    };
    let provider = Arc::new(ScriptedProvider::failing());
    let configurator =
        SessionConfigurator::new(provider, Arc::new(table), &ArgosConfig::default());

    let result = configurator.instruction(SocraticMode::Defense, "x", Domain::ClosedNotion);
    assert_eq!(result, Err(ConfigurationError::MissingRubric(Domain::ClosedNotion)));
}
