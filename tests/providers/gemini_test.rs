//! Gemini provider wire format tests.

use serde_json::json;

use argos::credentials::ApiKey;
use argos::providers::gemini::{build_request, parse_response, GeminiProvider};
use argos::providers::{CompletionRequest, FinishReason, Message, ProviderError};

fn chat_request() -> CompletionRequest {
    CompletionRequest {
        messages: vec![
            Message::user("Démarre."),
            Message::model("Que sais-tu du sujet ?"),
            Message::user("Peu de choses."),
        ],
        system: Some("Tu es ARGOS.".to_owned()),
        temperature: Some(0.7),
        response_schema: None,
        reasoning_budget: Some(2048),
        max_tokens: None,
    }
}

#[test]
fn build_request_maps_roles_and_system_instruction() {
    let req = build_request(&chat_request());
    let value = match serde_json::to_value(&req) {
        Ok(value) => value,
        Err(err) => panic!("request should serialize: {err}"),
    };

    assert_eq!(value["contents"][0]["role"], "user");
    assert_eq!(value["contents"][1]["role"], "model");
    assert_eq!(value["contents"][2]["parts"][0]["text"], "Peu de choses.");
    assert_eq!(value["systemInstruction"]["parts"][0]["text"], "Tu es ARGOS.");
    assert!(value["systemInstruction"].get("role").is_none());
    assert_eq!(value["generationConfig"]["thinkingConfig"]["thinkingBudget"], 2048);
    assert!(value["generationConfig"].get("responseMimeType").is_none());
}

#[test]
fn build_request_with_schema_asks_for_json() {
    let mut request = chat_request();
    request.response_schema = Some(json!({"type": "OBJECT"}));
    let value = match serde_json::to_value(build_request(&request)) {
        Ok(value) => value,
        Err(err) => panic!("request should serialize: {err}"),
    };

    assert_eq!(value["generationConfig"]["responseMimeType"], "application/json");
    assert_eq!(value["generationConfig"]["responseSchema"]["type"], "OBJECT");
}

#[test]
fn parse_response_skips_reasoning_parts() {
    let body = json!({
        "candidates": [{
            "content": {"role": "model", "parts": [
                {"text": "réflexion interne", "thought": true},
                {"text": "Pourquoi "},
                {"text": "penses-tu cela ?"}
            ]},
            "finishReason": "STOP"
        }],
        "usageMetadata": {"promptTokenCount": 30, "candidatesTokenCount": 9},
        "modelVersion": "gemini-3-pro-preview-001"
    });

    let resp = match parse_response(&body.to_string(), "gemini-3-pro-preview") {
        Ok(resp) => resp,
        Err(err) => panic!("response should parse: {err}"),
    };
    assert_eq!(resp.text, "Pourquoi penses-tu cela ?");
    assert_eq!(resp.finish_reason, FinishReason::Stop);
    assert_eq!(resp.usage.input_tokens, 30);
    assert_eq!(resp.usage.output_tokens, 9);
    assert_eq!(resp.model, "gemini-3-pro-preview-001");
}

#[test]
fn parse_response_maps_finish_reasons() {
    let body = json!({
        "candidates": [{"content": {"parts": [{"text": "..."}]}, "finishReason": "MAX_TOKENS"}]
    });
    let resp = match parse_response(&body.to_string(), "m") {
        Ok(resp) => resp,
        Err(err) => panic!("response should parse: {err}"),
    };
    assert_eq!(resp.finish_reason, FinishReason::MaxTokens);
    assert_eq!(resp.model, "m");
}

#[test]
fn parse_response_without_candidates_reports_block_reason() {
    let body = json!({"promptFeedback": {"blockReason": "SAFETY"}});
    match parse_response(&body.to_string(), "m") {
        Err(ProviderError::Parse(msg)) => assert!(msg.contains("SAFETY")),
        Err(other) => panic!("expected parse error, got: {other}"),
        Ok(_) => panic!("blocked prompt should not parse"),
    }
}

#[test]
fn parse_response_rejects_invalid_json() {
    assert!(matches!(
        parse_response("not json", "m"),
        Err(ProviderError::Parse(_))
    ));
}

#[test]
fn endpoint_joins_base_and_model() {
    let provider = GeminiProvider::with_api_base(
        "gemini-3-pro-preview".to_owned(),
        "http://localhost:9000/v1beta/".to_owned(),
        ApiKey::new("k"),
    );
    assert_eq!(
        provider.endpoint(),
        "http://localhost:9000/v1beta/models/gemini-3-pro-preview:generateContent"
    );
}
