//! End-to-end runs of the progress orchestrator over a scripted backend

use futures::StreamExt;
use std::sync::Arc;
use tempfile::TempDir;
use treatise::document::{PlanOptions, StructureMode};
use treatise::progress::{ChapterProgress, RunStatus, StepId, StepStatus};
use treatise::provider::ScriptedBackend;
use treatise::task::AbortOutcome;
use treatise::GenerationRequest;

use crate::integration::test_utils::{drain, orchestrator_with, CopyConverter, FailingConverter};

fn manual_request(topic: &str) -> GenerationRequest {
    GenerationRequest::new(topic, "gpt-4o").with_structure(StructureMode::Manual)
}

#[tokio::test]
async fn manual_run_produces_markdown_and_docx() {
    let dir = TempDir::new().unwrap();
    let backend = Arc::new(ScriptedBackend::new("scripted", Vec::new()));
    let orchestrator = orchestrator_with(backend.clone(), Arc::new(CopyConverter), &dir);

    let mut run = orchestrator.start(manual_request("Quantum Computing"));
    let events = drain(&mut run).await;

    assert!(run.is_finished());
    // index, introduction, three chapters, conclusion
    assert_eq!(backend.call_count(), 6);
    let first_prompt = &backend.calls()[0].prompt;
    assert!(first_prompt.contains("detailed index for a research paper about Quantum Computing"));
    assert!(first_prompt.contains("Chapter 1: Literature Review, Chapter 2: Methodology"));

    let chapters_published = events
        .iter()
        .find(|e| e.update_steps == Some(true))
        .expect("sub-steps published");
    assert_eq!(
        chapters_published.state.sub_steps().len(),
        3,
        "manual plan has three chapters"
    );

    let last = events.last().unwrap();
    assert_eq!(last.status, Some(RunStatus::Complete));
    assert!(last.state.steps.iter().all(|s| s.status == StepStatus::Complete));
    let md_file = last.md_file.clone().expect("md_file");
    let docx_file = last.docx_file.clone().expect("docx_file");
    assert_eq!(last.artifact_paths.as_ref().map(Vec::len), Some(2));

    let output = dir.path().join("output");
    assert!(output.join(&docx_file).exists());
    let markdown = std::fs::read_to_string(output.join(&md_file)).unwrap();
    assert!(markdown.starts_with("# Research Paper: Quantum Computing\n"));
    for heading in [
        "## Index",
        "## Introduction",
        "## Chapter 1: Literature Review",
        "## Chapter 2: Methodology",
        "## Chapter 3: Results and Discussion",
        "## Conclusion",
    ] {
        assert!(markdown.contains(heading), "missing {}", heading);
    }
    assert!(orchestrator.tasks().is_empty());
}

#[tokio::test]
async fn conversion_failure_is_partial_success_with_markdown_only() {
    let dir = TempDir::new().unwrap();
    let backend = Arc::new(ScriptedBackend::new("scripted", Vec::new()));
    let orchestrator = orchestrator_with(backend, Arc::new(FailingConverter), &dir);

    let mut run = orchestrator.start(manual_request("Quantum Computing"));
    let events = drain(&mut run).await;
    let last = events.last().unwrap();

    assert_eq!(last.status, Some(RunStatus::PartialSuccess));
    assert!(last.md_file.is_some());
    assert!(last.docx_file.is_none());
    assert!(last
        .message
        .as_deref()
        .unwrap()
        .starts_with("Paper generated but Word conversion failed:"));
    assert_eq!(last.state.step(StepId::Convert).status, StepStatus::Error);
    assert!(dir
        .path()
        .join("output")
        .join(last.md_file.as_ref().unwrap())
        .exists());
}

#[tokio::test]
async fn abort_between_chapter_discovery_and_writing() {
    let dir = TempDir::new().unwrap();
    let backend = Arc::new(ScriptedBackend::new("scripted", Vec::new()));
    let orchestrator = orchestrator_with(backend.clone(), Arc::new(CopyConverter), &dir);

    let mut run = orchestrator.start(manual_request("Quantum Computing"));
    let task_id = run.task_id();

    let mut seen = Vec::new();
    while let Some(event) = run.next_event().await {
        let chapters_determined = event.update_steps == Some(true);
        seen.push(event);
        if chapters_determined {
            break;
        }
    }
    assert_eq!(orchestrator.abort(&task_id), AbortOutcome::Aborted);

    let terminal = run.next_event().await.expect("terminal event");
    assert_eq!(terminal.status, Some(RunStatus::Aborted));
    assert!(run.next_event().await.is_none());

    assert!(seen.iter().all(|e| e.chapter_progress.is_none()));
    assert!(terminal.chapter_progress.is_none());
    assert_eq!(backend.call_count(), 1, "only the index was generated");
    assert_eq!(orchestrator.abort(&task_id), AbortOutcome::NotFound);
}

#[tokio::test]
async fn abort_after_completion_is_not_found() {
    let dir = TempDir::new().unwrap();
    let backend = Arc::new(ScriptedBackend::new("scripted", Vec::new()));
    let orchestrator = orchestrator_with(backend, Arc::new(CopyConverter), &dir);

    let run = orchestrator.start(manual_request("Quantum Computing"));
    let task_id = run.task_id();
    let events: Vec<_> = run.into_stream().collect().await;

    assert_eq!(events.last().unwrap().status, Some(RunStatus::Complete));
    assert_eq!(orchestrator.abort(&task_id), AbortOutcome::NotFound);
}

#[tokio::test]
async fn dropping_a_run_releases_its_task() {
    let dir = TempDir::new().unwrap();
    let backend = Arc::new(ScriptedBackend::new("scripted", Vec::new()));
    let orchestrator = orchestrator_with(backend, Arc::new(CopyConverter), &dir);

    let run = orchestrator.start(manual_request("Quantum Computing"));
    let task_id = run.task_id();
    assert_eq!(orchestrator.tasks().len(), 1);
    drop(run);
    assert_eq!(orchestrator.abort(&task_id), AbortOutcome::NotFound);
}

#[tokio::test]
async fn automatic_failure_falls_back_to_manual_structure() {
    let dir = TempDir::new().unwrap();
    let backend = Arc::new(
        ScriptedBackend::new("scripted", Vec::new()).fail_when("outline", "index service down"),
    );
    let orchestrator = orchestrator_with(backend, Arc::new(CopyConverter), &dir);

    let mut run = orchestrator.start(GenerationRequest::new("Quantum Computing", "gpt-4o"));
    let events = drain(&mut run).await;

    let failure = events
        .iter()
        .find(|e| e.warning.is_some())
        .expect("index failure snapshot");
    assert_eq!(failure.state.step(StepId::Index).status, StepStatus::Error);
    assert!(failure
        .warning
        .as_deref()
        .unwrap()
        .contains("Failed to generate automatic structure"));
    assert!(events
        .iter()
        .any(|e| e.message.as_deref() == Some("Falling back to manual structure")));
    assert!(events.iter().any(|e| e.state.progress == 25.0));

    let last = events.last().unwrap();
    assert_eq!(last.status, Some(RunStatus::Complete));
    let labels: Vec<&str> = last
        .state
        .sub_steps()
        .iter()
        .map(|s| s.label.as_str())
        .collect();
    assert_eq!(
        labels,
        vec![
            "Chapter 1: Literature Review",
            "Chapter 2: Methodology",
            "Chapter 3: Results and Discussion"
        ]
    );
}

#[tokio::test]
async fn failed_fallback_ends_the_run() {
    let dir = TempDir::new().unwrap();
    let backend = Arc::new(
        ScriptedBackend::new("scripted", Vec::new())
            .fail_when("outline", "down")
            .fail_when("detailed index", "still down"),
    );
    let orchestrator = orchestrator_with(backend, Arc::new(CopyConverter), &dir);

    let mut run = orchestrator.start(GenerationRequest::new("Quantum Computing", "gpt-4o"));
    let events = drain(&mut run).await;
    let last = events.last().unwrap();

    assert!(last
        .error
        .as_deref()
        .unwrap()
        .starts_with("Failed to generate even fallback content:"));
    assert!(last.status.is_none());
    assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);
    assert!(orchestrator.tasks().is_empty());
}

#[tokio::test]
async fn manual_index_failure_is_terminal() {
    let dir = TempDir::new().unwrap();
    let backend =
        Arc::new(ScriptedBackend::new("scripted", Vec::new()).fail_when("detailed index", "nope"));
    let orchestrator = orchestrator_with(backend, Arc::new(CopyConverter), &dir);

    let mut run = orchestrator.start(manual_request("Quantum Computing"));
    let events = drain(&mut run).await;

    assert!(events
        .last()
        .unwrap()
        .error
        .as_deref()
        .unwrap()
        .starts_with("Failed to generate manual index:"));
    assert!(events.iter().all(|e| e.message.as_deref() != Some("Falling back to manual structure")));
}

#[tokio::test]
async fn requested_chapter_count_is_padded_and_progress_interpolates() {
    let dir = TempDir::new().unwrap();
    let backend = Arc::new(
        ScriptedBackend::new("scripted", Vec::new())
            .respond_when("outline", "# Outline\n## Introduction\n## Qubits\n## Gates\n## Conclusion"),
    );
    let orchestrator = orchestrator_with(backend, Arc::new(CopyConverter), &dir);

    let request = GenerationRequest::new("Quantum Computing", "gpt-4o").with_options(PlanOptions {
        chapter_count: Some(5),
        word_count: Some(7000),
        include_references: true,
        citation_style: None,
    });
    let mut run = orchestrator.start(request);
    let events = drain(&mut run).await;

    let starts: Vec<(usize, f64)> = events
        .iter()
        .filter_map(|e| match &e.chapter_progress {
            Some(ChapterProgress::Chapter {
                current,
                duration: None,
                ..
            }) => Some((*current, e.state.progress)),
            _ => None,
        })
        .collect();
    assert_eq!(
        starts,
        vec![(1, 40.0), (2, 50.0), (3, 60.0), (4, 70.0), (5, 80.0)]
    );

    let summary = events
        .iter()
        .find_map(|e| match e.chapter_progress {
            Some(ChapterProgress::Summary { total_chapters, .. }) => Some(total_chapters),
            _ => None,
        })
        .unwrap();
    assert_eq!(summary, 5);

    let last = events.last().unwrap();
    let labels: Vec<&str> = last.state.sub_steps().iter().map(|s| s.label.as_str()).collect();
    assert_eq!(
        labels,
        vec![
            "Chapter 1: Qubits",
            "Chapter 2: Gates",
            "Chapter 3: Literature Review",
            "Chapter 4: Methodology",
            "Chapter 5: Results"
        ]
    );
    let markdown =
        std::fs::read_to_string(dir.path().join("output").join(last.md_file.as_ref().unwrap()))
            .unwrap();
    assert!(markdown.contains("# Outline"));
    assert!(markdown.contains("Target approximately 1000 words."));
    assert!(markdown.trim_end().ends_with("in APA format for this research paper about Quantum Computing."));
}

#[tokio::test]
async fn fallback_models_fill_in_for_a_failing_model() {
    let dir = TempDir::new().unwrap();
    let backend = Arc::new(
        ScriptedBackend::new("gateway", vec!["gpt-4o".to_string(), "claude-2".to_string()])
            .with_model_fallback(true)
            .fail_model("gpt-4o"),
    );
    let orchestrator = orchestrator_with(backend.clone(), Arc::new(CopyConverter), &dir);

    let mut run = orchestrator.start(manual_request("Quantum Computing"));
    let events = drain(&mut run).await;

    assert_eq!(events.last().unwrap().status, Some(RunStatus::Complete));
    assert!(events.iter().all(|e| e.warning.is_none()));
    assert!(backend.models_called().iter().any(|m| m == "claude-2"));
}
