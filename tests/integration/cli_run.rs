//! CLI dispatch against a mocked gateway
//!
//! `RunContext::execute` owns its runtime, so these are plain tests; the mock server
//! lives on a separate runtime kept alive for the duration of each test.

use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tokio::runtime::Runtime;
use treatise::cli::{Commands, RunContext, RunOutcome};
use treatise::config::AppConfig;
use treatise::document::StructureMode;
use treatise::progress::RunStatus;
use treatise::provider::BackendSettings;
use treatise::retry::RetryConfig;
use treatise::ApiError;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const INDEX_REPLY: &str = "# Outline\n## Introduction\n## Qubits\n## Quantum Gates\n## Conclusion";

fn mock_gateway(runtime: &Runtime) -> MockServer {
    runtime.block_on(async {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": INDEX_REPLY}}]
            })))
            .mount(&server)
            .await;
        server
    })
}

fn config_for(server: &MockServer, models: &[&str], converter_args: Vec<String>) -> AppConfig {
    let mut config = AppConfig::default();
    let mut providers = HashMap::new();
    providers.insert(
        "gateway".to_string(),
        BackendSettings {
            base_url: Some(server.uri()),
            models: models.iter().map(|m| m.to_string()).collect(),
            ..BackendSettings::default()
        },
    );
    config.providers = providers;
    config.retry = RetryConfig {
        max_retries: 1,
        initial_delay_ms: 1,
        backoff_factor: 1.0,
        max_jitter_ms: 0,
    };
    config.output.converter = "sh".to_string();
    config.output.converter_args = converter_args;
    config.logging.color = false;
    config
}

/// Stand-in for pandoc: `$1` is the markdown input, `$3` the output path
fn fake_pandoc(dir: &Path, body: &str) -> Vec<String> {
    let script = dir.join("fake-pandoc.sh");
    std::fs::write(&script, format!("#!/bin/sh\n{}\n", body)).unwrap();
    vec![script.display().to_string()]
}

fn generate(topic: &str, format: &str, output_dir: PathBuf) -> Commands {
    Commands::Generate {
        topic: topic.to_string(),
        model: None,
        structure: StructureMode::Automatic,
        chapters: None,
        words: None,
        references: false,
        citation_style: None,
        output_dir: Some(output_dir),
        format: format.to_string(),
    }
}

#[cfg(unix)]
#[test]
fn generate_streams_ndjson_until_complete() {
    let runtime = Runtime::new().unwrap();
    let server = mock_gateway(&runtime);
    let workspace = TempDir::new().unwrap();
    let args = fake_pandoc(workspace.path(), "cp \"$1\" \"$3\"");
    let context = RunContext::from_config(
        workspace.path().to_path_buf(),
        config_for(&server, &["gpt-4o"], args),
    )
    .unwrap();

    let output_dir = workspace.path().join("papers");
    let mut out = Vec::new();
    let outcome = context
        .execute(&generate("Quantum Computing", "json", output_dir.clone()), &mut out)
        .unwrap();
    assert_eq!(outcome, RunOutcome::Finished(RunStatus::Complete));
    assert_eq!(outcome.exit_code(), 0);

    let stdout = String::from_utf8(out).unwrap();
    let events: Vec<Value> = stdout
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert!(events.len() > 10);
    let seqs: Vec<u64> = events.iter().map(|e| e["seq"].as_u64().unwrap()).collect();
    assert_eq!(seqs, (1..=events.len() as u64).collect::<Vec<_>>());

    let last = events.last().unwrap();
    assert_eq!(last["status"], "complete");
    assert_eq!(last["progress"], 100.0);
    let md_file = last["md_file"].as_str().unwrap();
    let docx_file = last["docx_file"].as_str().unwrap();
    assert!(output_dir.join(md_file).exists());
    assert!(output_dir.join(docx_file).exists());

    let subs = last["steps"][3]["subSteps"].as_array().unwrap();
    let labels: Vec<&str> = subs.iter().map(|s| s["text"].as_str().unwrap()).collect();
    assert_eq!(labels, vec!["Chapter 1: Qubits", "Chapter 2: Quantum Gates"]);
    drop(server);
}

#[cfg(unix)]
#[test]
fn failed_conversion_exits_with_partial_success() {
    let runtime = Runtime::new().unwrap();
    let server = mock_gateway(&runtime);
    let workspace = TempDir::new().unwrap();
    let args = fake_pandoc(workspace.path(), "echo 'pandoc: not installed' >&2\nexit 1");
    let context = RunContext::from_config(
        workspace.path().to_path_buf(),
        config_for(&server, &["gpt-4o"], args),
    )
    .unwrap();

    let mut out = Vec::new();
    let outcome = context
        .execute(
            &generate("Quantum Computing", "text", workspace.path().join("papers")),
            &mut out,
        )
        .unwrap();
    assert_eq!(outcome.exit_code(), 2);

    let stdout = String::from_utf8(out).unwrap();
    assert!(stdout.contains("Paper generated but Word conversion failed"));
    assert!(stdout.contains("pandoc: not installed"));
    assert!(stdout.contains("chapter 2/2"));
}

#[test]
fn models_lists_ranked_catalogue() {
    let runtime = Runtime::new().unwrap();
    let server = mock_gateway(&runtime);
    let workspace = TempDir::new().unwrap();
    let context = RunContext::from_config(
        workspace.path().to_path_buf(),
        config_for(&server, &["mixtral", "gpt-4", "gpt-4o"], Vec::new()),
    )
    .unwrap();

    let mut out = Vec::new();
    let outcome = context
        .execute(
            &Commands::Models {
                format: "json".to_string(),
            },
            &mut out,
        )
        .unwrap();
    assert_eq!(outcome.exit_code(), 0);

    let listing: Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(listing["provider"], "gateway");
    assert_eq!(listing["models"], json!(["gpt-4o", "gpt-4", "mixtral"]));
    assert_eq!(listing["total"], 3);
}

#[test]
fn empty_topic_fails_without_a_status() {
    let runtime = Runtime::new().unwrap();
    let server = mock_gateway(&runtime);
    let workspace = TempDir::new().unwrap();
    let context = RunContext::from_config(
        workspace.path().to_path_buf(),
        config_for(&server, &["gpt-4o"], Vec::new()),
    )
    .unwrap();

    let mut out = Vec::new();
    let outcome = context
        .execute(&generate("", "text", workspace.path().join("papers")), &mut out)
        .unwrap();
    assert_eq!(outcome, RunOutcome::Failed);
    assert!(String::from_utf8(out)
        .unwrap()
        .contains("error: Research subject is required"));
}

#[test]
fn unknown_provider_is_rejected_at_startup() {
    let workspace = TempDir::new().unwrap();
    let config = AppConfig {
        provider: "carrier-pigeon".to_string(),
        ..AppConfig::default()
    };
    let err = RunContext::from_config(workspace.path().to_path_buf(), config)
        .err()
        .unwrap();
    assert!(matches!(err, ApiError::ConfigError(_)));
    assert!(err.to_string().contains("Unsupported AI provider"));
}

#[test]
fn missing_explicit_config_file_is_an_error() {
    let workspace = TempDir::new().unwrap();
    let missing = workspace.path().join("nope.toml");
    let result = RunContext::new(workspace.path().to_path_buf(), Some(missing));
    assert!(matches!(result, Err(ApiError::ConfigError(_))));
}
