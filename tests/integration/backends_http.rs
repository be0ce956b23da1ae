//! HTTP backends against a local mock server

use serde_json::json;
use treatise::provider::{
    BackendSettings, GatewayBackend, HuggingFaceBackend, ModelBackend, OpenAiBackend,
    TogetherBackend,
};
use treatise::router::Router;
use treatise::ApiError;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::integration::test_utils::quick_policy;

fn settings_for(server: &MockServer) -> BackendSettings {
    BackendSettings {
        base_url: Some(server.uri()),
        ..BackendSettings::default()
    }
}

fn chat_reply(text: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": text},
            "finish_reason": "stop"
        }]
    })
}

#[tokio::test]
async fn gateway_posts_chat_completion() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({
            "model": "gpt-4o",
            "messages": [{"role": "user", "content": "Write a conclusion"}],
            "stream": false
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_reply("In conclusion.")))
        .expect(1)
        .mount(&server)
        .await;

    let backend = GatewayBackend::new(&settings_for(&server)).unwrap();
    let text = backend
        .generate_content("gpt-4o", "Write a conclusion")
        .await
        .unwrap();
    assert_eq!(text, "In conclusion.");
}

#[tokio::test]
async fn gateway_ranks_catalogue_and_lists_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/models"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"id": "llama2-70b"}, {"id": "claude-2"}, "gpt-4o", {"id": "mixtral"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let backend = GatewayBackend::new(&settings_for(&server)).unwrap();
    let first = backend.list_models().await.unwrap();
    assert_eq!(first, vec!["gpt-4o", "claude-2", "llama2-70b", "mixtral"]);
    let second = backend.list_models().await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn gateway_uses_default_catalogue_when_listing_fails() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/models"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .mount(&server)
        .await;

    let backend = GatewayBackend::new(&settings_for(&server)).unwrap();
    let models = backend.list_models().await.unwrap();
    assert_eq!(
        models,
        vec!["gpt-4o", "gpt-4", "claude-2", "gpt-3.5-turbo", "llama2-70b"]
    );
}

#[tokio::test]
async fn gateway_treats_blank_reply_as_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_reply("   ")))
        .mount(&server)
        .await;

    let backend = GatewayBackend::new(&settings_for(&server)).unwrap();
    let err = backend.generate_content("gpt-4o", "x").await.unwrap_err();
    assert!(matches!(err, ApiError::ProviderRequestFailed(_)));
}

#[tokio::test]
async fn openai_sends_credentials_and_filters_models() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/models"))
        .and(header("authorization", "Bearer sk-test"))
        .and(header("openai-organization", "org-42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {"id": "whisper-1"},
                {"id": "gpt-4o"},
                {"id": "dall-e-3"},
                {"id": "gpt-3.5-turbo"}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_reply("Hello")))
        .expect(1)
        .mount(&server)
        .await;

    let settings = BackendSettings {
        api_key: Some("sk-test".to_string()),
        organization: Some("org-42".to_string()),
        ..settings_for(&server)
    };
    let backend = OpenAiBackend::new(&settings).unwrap();

    let models = backend.list_models().await.unwrap();
    assert_eq!(models, vec!["gpt-3.5-turbo", "gpt-4o"]);
    assert_eq!(backend.list_models().await.unwrap(), models);
    assert_eq!(backend.generate_content("gpt-4o", "Hi").await.unwrap(), "Hello");
}

#[tokio::test]
async fn huggingface_posts_to_model_path() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/meta-llama/Llama-2-70b-chat-hf"))
        .and(header("authorization", "Bearer hf-token"))
        .and(body_partial_json(json!({"inputs": "Describe qubits"})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([{"generated_text": "Qubits are two-level systems."}])),
        )
        .mount(&server)
        .await;

    let settings = BackendSettings {
        api_key: Some("hf-token".to_string()),
        ..settings_for(&server)
    };
    let backend = HuggingFaceBackend::new(&settings).unwrap();
    let text = backend
        .generate_content("meta-llama/Llama-2-70b-chat-hf", "Describe qubits")
        .await
        .unwrap();
    assert_eq!(text, "Qubits are two-level systems.");
}

#[tokio::test]
async fn huggingface_error_carries_status_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("Model is currently loading"))
        .mount(&server)
        .await;

    let backend = HuggingFaceBackend::new(&settings_for(&server)).unwrap();
    match backend.generate_content("google/gemma-7b-it", "x").await {
        Err(ApiError::ProviderRequestFailed(message)) => {
            assert!(message.contains("503"), "{}", message);
            assert!(message.contains("Model is currently loading"), "{}", message);
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

#[tokio::test]
async fn together_sends_stop_sequence_and_reads_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/completions"))
        .and(body_partial_json(json!({
            "model": "togethercomputer/llama-2-70b-chat",
            "prompt": "Summarise",
            "stop": ["</s>"]
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"choices": [{"text": "Summary."}]})),
        )
        .mount(&server)
        .await;

    let settings = BackendSettings {
        base_url: Some(format!("{}/v1/completions", server.uri())),
        ..BackendSettings::default()
    };
    let backend = TogetherBackend::new(&settings).unwrap();
    let text = backend
        .generate_content("togethercomputer/llama-2-70b-chat", "Summarise")
        .await
        .unwrap();
    assert_eq!(text, "Summary.");
}

#[tokio::test]
async fn router_falls_back_to_next_gateway_model() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({"model": "gpt-4o"})))
        .respond_with(ResponseTemplate::new(500).set_body_string("rate limited"))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({"model": "claude-2"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_reply("From claude")))
        .expect(1)
        .mount(&server)
        .await;

    let settings = BackendSettings {
        models: vec!["gpt-4o".to_string(), "claude-2".to_string()],
        ..settings_for(&server)
    };
    let backend = GatewayBackend::new(&settings).unwrap();
    let router = Router::new(std::sync::Arc::new(backend), quick_policy());

    let text = router.route("gpt-4o", "Write").await.unwrap();
    assert_eq!(text, "From claude");
}

#[tokio::test]
async fn router_reports_exhaustion_when_every_model_fails() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let settings = BackendSettings {
        models: vec!["gpt-4o".to_string(), "gpt-4".to_string(), "claude-2".to_string()],
        ..settings_for(&server)
    };
    let backend = GatewayBackend::new(&settings).unwrap();
    let router = Router::new(std::sync::Arc::new(backend), quick_policy());

    let err = router.route("gpt-4o", "Write").await.unwrap_err();
    assert_eq!(err.attempted_models(), Some(3));
}
