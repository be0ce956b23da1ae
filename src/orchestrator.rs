//! Progress Orchestrator
//!
//! Drives one generation run through six ordered steps and yields a progress event
//! after every transition. A run is a lazy state machine: nothing happens until the
//! caller asks for the next event, so cancellation observed at a step boundary never
//! races with work already under way.

use crate::converter::DocumentConverter;
use crate::document::writer::{render_markdown, write_markdown, OutputFiles, RenderedSection, SectionOutcome};
use crate::document::{DocumentAssembler, GenerationPlan, PlanOptions, SectionBody, StructureMode};
use crate::error::ApiError;
use crate::progress::{
    format_duration, ChapterProgress, ProgressEvent, ProgressState, RunStatus, StepId,
};
use crate::router::Router;
use crate::task::{AbortOutcome, TaskHandle, TaskStore};
use chrono::Utc;
use futures::stream::{self, BoxStream, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

const PREPARED: f64 = 10.0;
const INDEXED: f64 = 20.0;
const INDEXED_WITH_FALLBACK: f64 = 25.0;
const DETERMINING_CHAPTERS: f64 = 30.0;
const WRITING: f64 = 40.0;
const WRITING_SPAN: f64 = 50.0;
const WRITTEN: f64 = 90.0;
const FINALIZED: f64 = 95.0;
const DONE: f64 = 100.0;

/// One request for a document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub topic: String,
    pub model: String,
    pub structure: StructureMode,
    #[serde(default)]
    pub options: PlanOptions,
}

impl GenerationRequest {
    pub fn new(topic: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            model: model.into(),
            structure: StructureMode::Automatic,
            options: PlanOptions::default(),
        }
    }

    pub fn with_structure(mut self, structure: StructureMode) -> Self {
        self.structure = structure;
        self
    }

    pub fn with_options(mut self, options: PlanOptions) -> Self {
        self.options = options;
        self
    }

    pub fn validate(&self) -> Result<(), ApiError> {
        if self.topic.trim().is_empty() {
            return Err(ApiError::InvalidRequest(
                "Research subject is required".to_string(),
            ));
        }
        if self.model.trim().is_empty() {
            return Err(ApiError::InvalidRequest("A model is required".to_string()));
        }
        self.options.validate()
    }
}

/// Entry point: starts runs, aborts them, and answers catalogue queries.
pub struct Orchestrator {
    router: Arc<Router>,
    assembler: DocumentAssembler,
    converter: Arc<dyn DocumentConverter>,
    tasks: Arc<dyn TaskStore>,
    output_dir: PathBuf,
}

impl Orchestrator {
    pub fn new(
        router: Arc<Router>,
        converter: Arc<dyn DocumentConverter>,
        tasks: Arc<dyn TaskStore>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            assembler: DocumentAssembler::new(router.clone()),
            router,
            converter,
            tasks,
            output_dir: output_dir.into(),
        }
    }

    /// Register a task and return its (not yet started) run
    pub fn start(&self, request: GenerationRequest) -> GenerationRun {
        let handle = TaskHandle::new();
        let task_id = handle.task_id;
        self.tasks.put(handle);
        info!(%task_id, topic = %request.topic, model = %request.model, "Generation task registered");

        GenerationRun {
            task_id,
            request,
            router: self.router.clone(),
            assembler: self.assembler.clone(),
            converter: self.converter.clone(),
            lease: TaskLease {
                store: self.tasks.clone(),
                task_id,
                released: false,
            },
            output_dir: self.output_dir.clone(),
            state: ProgressState::new(),
            phase: Phase::Begin,
            pending: VecDeque::new(),
            seq: 0,
            files: None,
            plan: None,
            outcomes: Vec::new(),
            chapters: Vec::new(),
        }
    }

    pub fn abort(&self, task_id: &Uuid) -> AbortOutcome {
        let outcome = self.tasks.request_abort(task_id);
        info!(%task_id, ?outcome, "Abort requested");
        outcome
    }

    pub async fn list_models(&self) -> Result<Vec<String>, ApiError> {
        self.router.list_models().await
    }

    pub fn tasks(&self) -> Arc<dyn TaskStore> {
        self.tasks.clone()
    }
}

/// Removes the task from the store when the run ends or is dropped.
struct TaskLease {
    store: Arc<dyn TaskStore>,
    task_id: Uuid,
    released: bool,
}

impl TaskLease {
    fn abort_requested(&self) -> bool {
        self.store.is_abort_requested(&self.task_id)
    }

    fn release(&mut self) {
        if !self.released {
            self.store.delete(&self.task_id);
            self.released = true;
        }
    }
}

impl Drop for TaskLease {
    fn drop(&mut self) {
        self.release();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Begin,
    EnterPrepare,
    Prepare,
    EnterIndex,
    Index,
    IndexFallback,
    EnterChapters,
    Chapters,
    EnterWrite,
    ChapterStart(usize),
    ChapterWork(usize, ChapterClock),
    WriteDone,
    EnterFinalize,
    Finalize,
    EnterConvert,
    Convert,
    Finished,
}

impl Phase {
    /// Cancellation is only honoured here
    fn is_step_boundary(self) -> bool {
        matches!(
            self,
            Phase::EnterPrepare
                | Phase::EnterIndex
                | Phase::EnterChapters
                | Phase::EnterWrite
                | Phase::EnterFinalize
                | Phase::EnterConvert
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ChapterClock(Instant);

/// A single in-flight generation. Finite and not restartable.
pub struct GenerationRun {
    task_id: Uuid,
    request: GenerationRequest,
    router: Arc<Router>,
    assembler: DocumentAssembler,
    converter: Arc<dyn DocumentConverter>,
    lease: TaskLease,
    output_dir: PathBuf,
    state: ProgressState,
    phase: Phase,
    pending: VecDeque<ProgressEvent>,
    seq: u64,
    files: Option<OutputFiles>,
    plan: Option<GenerationPlan>,
    outcomes: Vec<Option<SectionOutcome>>,
    /// Plan positions of chapter sections
    chapters: Vec<usize>,
}

impl GenerationRun {
    pub fn task_id(&self) -> Uuid {
        self.task_id
    }

    pub fn state(&self) -> &ProgressState {
        &self.state
    }

    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Finished && self.pending.is_empty()
    }

    /// Next event, or `None` once the terminal event has been taken
    pub async fn next_event(&mut self) -> Option<ProgressEvent> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Some(event);
            }
            if self.phase == Phase::Finished {
                return None;
            }
            if self.phase.is_step_boundary() && self.lease.abort_requested() {
                self.finish_aborted();
                continue;
            }
            self.advance().await;
        }
    }

    pub fn into_stream(self) -> BoxStream<'static, ProgressEvent> {
        stream::unfold(self, |mut run| async move {
            run.next_event().await.map(|event| (event, run))
        })
        .boxed()
    }

    async fn advance(&mut self) {
        match self.phase {
            Phase::Begin => self.begin(),
            Phase::EnterPrepare => self.enter(StepId::Prepare, None, Phase::Prepare),
            Phase::Prepare => self.prepare(),
            Phase::EnterIndex => self.enter(StepId::Index, None, Phase::Index),
            Phase::Index => self.index().await,
            Phase::IndexFallback => self.index_fallback().await,
            Phase::EnterChapters => self.enter(
                StepId::DetermineChapters,
                Some(DETERMINING_CHAPTERS),
                Phase::Chapters,
            ),
            Phase::Chapters => self.determine_chapters(),
            Phase::EnterWrite => self.enter(StepId::WriteContent, None, Phase::ChapterStart(0)),
            Phase::ChapterStart(k) => self.chapter_start(k),
            Phase::ChapterWork(k, clock) => self.chapter_work(k, clock).await,
            Phase::WriteDone => self.write_done(),
            Phase::EnterFinalize => self.enter(StepId::Finalize, None, Phase::Finalize),
            Phase::Finalize => self.finalize().await,
            Phase::EnterConvert => self.enter(StepId::Convert, None, Phase::Convert),
            Phase::Convert => self.convert().await,
            Phase::Finished => {}
        }
    }

    fn snapshot(&mut self) -> ProgressEvent {
        self.seq += 1;
        ProgressEvent::snapshot(self.task_id, self.seq, &self.state)
    }

    fn emit(&mut self, event: ProgressEvent) {
        self.pending.push_back(event);
    }

    fn finish(&mut self, event: ProgressEvent) {
        self.pending.push_back(event);
        self.phase = Phase::Finished;
        self.lease.release();
    }

    fn finish_with_error(&mut self, error: String) {
        warn!(task_id = %self.task_id, %error, "Generation failed");
        let mut event = self.snapshot();
        event.error = Some(error);
        self.finish(event);
    }

    fn finish_aborted(&mut self) {
        info!(task_id = %self.task_id, step = self.state.current_step, "Generation aborted");
        let mut event = self.snapshot();
        event.status = Some(RunStatus::Aborted);
        event.message = Some(ApiError::Aborted.to_string());
        self.finish(event);
    }

    fn enter(&mut self, step: StepId, progress: Option<f64>, next: Phase) {
        self.state.start(step);
        if let Some(progress) = progress {
            self.state.advance_to(progress);
        }
        info!(task_id = %self.task_id, step = step.index(), "{}", step.label());
        let event = self.snapshot();
        self.emit(event);
        self.phase = next;
    }

    fn begin(&mut self) {
        let event = self.snapshot();
        self.emit(event);
        match self.request.validate() {
            Ok(()) => self.phase = Phase::EnterPrepare,
            Err(ApiError::InvalidRequest(reason)) => self.finish_with_error(reason),
            Err(err) => self.finish_with_error(err.to_string()),
        }
    }

    fn prepare(&mut self) {
        match OutputFiles::allocate(&self.output_dir) {
            Ok(files) => {
                self.files = Some(files);
                self.state.complete(StepId::Prepare);
                self.state.advance_to(PREPARED);
                let event = self.snapshot();
                self.emit(event);
                self.phase = Phase::EnterIndex;
            }
            Err(err) => {
                self.state.fail(StepId::Prepare, err.to_string());
                self.finish_with_error(format!("Failed to prepare output files: {}", err));
            }
        }
    }

    async fn index(&mut self) {
        let result = self
            .assembler
            .build_plan(
                &self.request.topic,
                &self.request.model,
                self.request.structure,
                &self.request.options,
            )
            .await;

        match (result, self.request.structure) {
            (Ok(plan), _) => self.accept_plan(plan, INDEXED),
            (Err(ApiError::Aborted), _) => self.finish_aborted(),
            (Err(err), StructureMode::Automatic) => {
                warn!(task_id = %self.task_id, error = %err, "Automatic structure failed");
                self.state.fail(StepId::Index, err.to_string());
                let mut event = self.snapshot();
                event.warning = Some(err.to_string());
                self.emit(event);

                let mut event = self.snapshot();
                event.message = Some("Falling back to manual structure".to_string());
                self.emit(event);
                self.phase = Phase::IndexFallback;
            }
            (Err(err), StructureMode::Manual) => {
                self.state.fail(StepId::Index, err.to_string());
                self.finish_with_error(format!("Failed to generate manual index: {}", err));
            }
        }
    }

    async fn index_fallback(&mut self) {
        let result = self
            .assembler
            .build_plan(
                &self.request.topic,
                &self.request.model,
                StructureMode::Manual,
                &self.request.options,
            )
            .await;

        match result {
            Ok(plan) => self.accept_plan(plan, INDEXED_WITH_FALLBACK),
            Err(ApiError::Aborted) => self.finish_aborted(),
            Err(err) => {
                self.state.fail(StepId::Index, err.to_string());
                self.finish_with_error(format!(
                    "Failed to generate even fallback content: {}",
                    err
                ));
            }
        }
    }

    fn accept_plan(&mut self, plan: GenerationPlan, progress: f64) {
        self.outcomes = vec![None; plan.len()];
        self.plan = Some(plan);
        self.state.complete(StepId::Index);
        self.state.advance_to(progress);
        let event = self.snapshot();
        self.emit(event);
        self.phase = Phase::EnterChapters;
    }

    fn determine_chapters(&mut self) {
        let Some(plan) = self.plan.as_ref() else {
            self.finish_with_error("No generation plan available".to_string());
            return;
        };
        if let Err(err) = plan.validate() {
            self.state.fail(StepId::DetermineChapters, err.to_string());
            self.finish_with_error(err.to_string());
            return;
        }

        let names: Vec<String> = plan.chapter_names().into_iter().map(str::to_string).collect();
        self.chapters = plan.chapter_indices();
        self.state.set_chapters(&names);
        self.state.complete(StepId::DetermineChapters);
        self.state.advance_to(WRITING);
        info!(task_id = %self.task_id, chapters = names.len(), "Chapters determined");

        let mut event = self.snapshot();
        event.update_steps = Some(true);
        self.emit(event);
        self.phase = Phase::EnterWrite;
    }

    fn chapter_name(&self, k: usize) -> String {
        self.plan
            .as_ref()
            .and_then(|plan| plan.sections().get(self.chapters[k]))
            .and_then(|section| section.chapter_name())
            .unwrap_or_default()
            .to_string()
    }

    fn chapter_start(&mut self, k: usize) {
        let total = self.chapters.len();
        if k >= total {
            self.phase = Phase::WriteDone;
            return;
        }

        self.state.start_chapter(k, Utc::now().to_rfc3339());
        self.state
            .advance_to(WRITING + (k as f64) * WRITING_SPAN / (total as f64));
        let mut event = self.snapshot();
        event.chapter_progress = Some(ChapterProgress::Chapter {
            current: k + 1,
            total,
            chapter: self.chapter_name(k),
            percent: percent(k + 1, total),
            duration: None,
            error: None,
        });
        self.emit(event);
        self.phase = Phase::ChapterWork(k, ChapterClock(Instant::now()));
    }

    async fn chapter_work(&mut self, k: usize, clock: ChapterClock) {
        let total = self.chapters.len();
        let position = self.chapters[k];
        let result = self.resolve(position).await;
        let duration = format_duration(clock.0.elapsed());

        let mut chapter_error = None;
        let mut warning = None;
        match result {
            Ok(text) => {
                self.outcomes[position] = Some(SectionOutcome::Generated(text));
                self.state.complete_chapter(k, duration.clone());
            }
            Err(ApiError::Aborted) => {
                self.finish_aborted();
                return;
            }
            Err(err) => {
                warn!(task_id = %self.task_id, chapter = k + 1, error = %err, "Chapter generation failed");
                self.outcomes[position] = Some(SectionOutcome::Failed(err.to_string()));
                self.state.fail_chapter(k, duration.clone(), err.to_string());
                chapter_error = Some(err.to_string());
                warning = Some(format!("Failed to generate chapter {} after retries", k + 1));
            }
        }

        self.state
            .advance_to(WRITING + ((k + 1) as f64) * WRITING_SPAN / (total as f64));
        let mut event = self.snapshot();
        event.chapter_progress = Some(ChapterProgress::Chapter {
            current: k + 1,
            total,
            chapter: self.chapter_name(k),
            percent: percent(k + 1, total),
            duration: Some(duration),
            error: chapter_error,
        });
        event.warning = warning;
        self.emit(event);
        self.phase = if k + 1 < total {
            Phase::ChapterStart(k + 1)
        } else {
            Phase::WriteDone
        };
    }

    fn write_done(&mut self) {
        self.state.complete(StepId::WriteContent);
        self.state.advance_to(WRITTEN);
        let mut event = self.snapshot();
        event.chapter_progress = Some(ChapterProgress::Summary {
            complete: true,
            total_chapters: self.chapters.len(),
        });
        self.emit(event);
        self.phase = Phase::EnterFinalize;
    }

    async fn finalize(&mut self) {
        let mut warnings = Vec::new();
        for position in 0..self.outcomes.len() {
            if self.outcomes[position].is_some() {
                continue;
            }
            let outcome = match self.section_body(position) {
                Some(SectionBody::Literal(content)) => SectionOutcome::Literal(content),
                Some(SectionBody::Prompt(_)) => match self.resolve(position).await {
                    Ok(text) => SectionOutcome::Generated(text),
                    Err(ApiError::Aborted) => {
                        self.finish_aborted();
                        return;
                    }
                    Err(err) => {
                        let title = self.section_title(position);
                        warn!(task_id = %self.task_id, section = %title, error = %err, "Section generation failed");
                        warnings.push(format!("Failed to generate {}: {}", title, err));
                        SectionOutcome::Failed(err.to_string())
                    }
                },
                None => continue,
            };
            self.outcomes[position] = Some(outcome);
        }

        let (Some(plan), Some(files)) = (self.plan.as_ref(), self.files.as_ref()) else {
            self.finish_with_error("No generation plan available".to_string());
            return;
        };
        let rendered: Vec<RenderedSection> = plan
            .sections()
            .iter()
            .zip(&self.outcomes)
            .filter_map(|(section, outcome)| {
                outcome
                    .clone()
                    .map(|outcome| RenderedSection::new(section.title.clone(), outcome))
            })
            .collect();
        let markdown = render_markdown(plan.topic(), &rendered);

        if let Err(err) = write_markdown(&files.markdown, &markdown) {
            self.state.fail(StepId::Finalize, err.to_string());
            self.finish_with_error(format!("Failed to write document: {}", err));
            return;
        }
        info!(task_id = %self.task_id, path = %files.markdown.display(), "Document written");

        self.state.complete(StepId::Finalize);
        self.state.advance_to(FINALIZED);
        let mut event = self.snapshot();
        if !warnings.is_empty() {
            event.warning = Some(warnings.join("; "));
        }
        self.emit(event);
        self.phase = Phase::EnterConvert;
    }

    async fn convert(&mut self) {
        let Some(files) = self.files.clone() else {
            self.finish_with_error("No output files allocated".to_string());
            return;
        };

        match self.converter.convert(&files.markdown, &files.docx).await {
            Ok(()) => {
                self.state.complete(StepId::Convert);
                self.state.advance_to(DONE);
                let mut event = self.snapshot();
                event.status = Some(RunStatus::Complete);
                event.message = Some("Research paper generated successfully".to_string());
                event.md_file = Some(files.markdown_name());
                event.docx_file = Some(files.docx_name());
                event.artifact_paths = Some(vec![
                    files.markdown.display().to_string(),
                    files.docx.display().to_string(),
                ]);
                info!(task_id = %self.task_id, "Generation complete");
                self.finish(event);
            }
            Err(err) => {
                warn!(task_id = %self.task_id, error = %err, "Conversion failed, keeping markdown");
                self.state.fail(StepId::Convert, err.to_string());
                self.state.advance_to(DONE);
                let mut event = self.snapshot();
                event.status = Some(RunStatus::PartialSuccess);
                event.message = Some(format!("Paper generated but Word conversion failed: {}", err));
                event.md_file = Some(files.markdown_name());
                event.artifact_paths = Some(vec![files.markdown.display().to_string()]);
                self.finish(event);
            }
        }
    }

    fn section_body(&self, position: usize) -> Option<SectionBody> {
        self.plan
            .as_ref()
            .and_then(|plan| plan.sections().get(position))
            .map(|section| section.body.clone())
    }

    fn section_title(&self, position: usize) -> String {
        self.plan
            .as_ref()
            .and_then(|plan| plan.sections().get(position))
            .map(|section| section.title.clone())
            .unwrap_or_default()
    }

    async fn resolve(&self, position: usize) -> Result<String, ApiError> {
        match self.section_body(position) {
            Some(SectionBody::Literal(content)) => Ok(content),
            Some(SectionBody::Prompt(prompt)) => self.router.route(&self.request.model, &prompt).await,
            None => Err(ApiError::InvalidRequest(format!(
                "no section at position {}",
                position
            ))),
        }
    }
}

fn percent(done: usize, total: usize) -> f64 {
    if total == 0 {
        return 100.0;
    }
    ((done as f64) * 1000.0 / (total as f64)).round() / 10.0
}
