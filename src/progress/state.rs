//! Mutable progress record for one generation run.

use serde::{Deserialize, Serialize};

/// Lifecycle of a step or chapter sub-step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepStatus {
    Pending,
    InProgress,
    Complete,
    Error,
}

impl StepStatus {
    /// Complete, or failed and then recovered from
    pub fn is_settled(self) -> bool {
        matches!(self, StepStatus::Complete | StepStatus::Error)
    }
}

/// The six ordered steps of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepId {
    Prepare,
    Index,
    DetermineChapters,
    WriteContent,
    Finalize,
    Convert,
}

impl StepId {
    pub const ALL: [StepId; 6] = [
        StepId::Prepare,
        StepId::Index,
        StepId::DetermineChapters,
        StepId::WriteContent,
        StepId::Finalize,
        StepId::Convert,
    ];

    pub fn index(self) -> usize {
        match self {
            StepId::Prepare => 0,
            StepId::Index => 1,
            StepId::DetermineChapters => 2,
            StepId::WriteContent => 3,
            StepId::Finalize => 4,
            StepId::Convert => 5,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            StepId::Prepare => "Preparing document structure...",
            StepId::Index => "Generating index/table of contents...",
            StepId::DetermineChapters => "Determining chapters...",
            StepId::WriteContent => "Writing content...",
            StepId::Finalize => "Finalizing document...",
            StepId::Convert => "Converting to Word format...",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChapterSubStep {
    pub id: String,
    #[serde(rename = "text")]
    pub label: String,
    pub status: StepStatus,
    #[serde(rename = "startTime", default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub id: usize,
    #[serde(rename = "text")]
    pub label: String,
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(rename = "subSteps", default, skip_serializing_if = "Option::is_none")]
    pub sub_steps: Option<Vec<ChapterSubStep>>,
}

/// Step list plus the overall percentage; snapshotted into every event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressState {
    pub steps: Vec<Step>,
    pub progress: f64,
    pub current_step: usize,
}

impl Default for ProgressState {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressState {
    pub fn new() -> Self {
        let steps = StepId::ALL
            .iter()
            .map(|id| Step {
                id: id.index(),
                label: id.label().to_string(),
                status: StepStatus::Pending,
                message: None,
                sub_steps: None,
            })
            .collect();
        Self {
            steps,
            progress: 0.0,
            current_step: 0,
        }
    }

    pub fn step(&self, id: StepId) -> &Step {
        &self.steps[id.index()]
    }

    fn step_mut(&mut self, id: StepId) -> &mut Step {
        &mut self.steps[id.index()]
    }

    /// True once every step before `id` is complete or recovered from
    pub fn can_start(&self, id: StepId) -> bool {
        self.steps[..id.index()].iter().all(|s| s.status.is_settled())
    }

    pub fn start(&mut self, id: StepId) {
        debug_assert!(self.can_start(id), "step {:?} started out of order", id);
        self.current_step = id.index();
        let step = self.step_mut(id);
        step.status = StepStatus::InProgress;
        step.message = None;
    }

    pub fn complete(&mut self, id: StepId) {
        self.step_mut(id).status = StepStatus::Complete;
    }

    pub fn fail(&mut self, id: StepId, message: impl Into<String>) {
        let step = self.step_mut(id);
        step.status = StepStatus::Error;
        step.message = Some(message.into());
    }

    /// Raise the percentage; never moves backwards and never exceeds 100.
    pub fn advance_to(&mut self, progress: f64) {
        let clamped = progress.clamp(0.0, 100.0);
        if clamped > self.progress {
            self.progress = clamped;
        }
    }

    /// Publish one pending sub-step per chapter under WriteContent
    pub fn set_chapters<S: AsRef<str>>(&mut self, chapters: &[S]) {
        let sub_steps = chapters
            .iter()
            .enumerate()
            .map(|(i, name)| ChapterSubStep {
                id: format!("chapter_{}", i),
                label: format!("Chapter {}: {}", i + 1, name.as_ref()),
                status: StepStatus::Pending,
                start_time: None,
                duration: None,
                message: None,
            })
            .collect();
        self.step_mut(StepId::WriteContent).sub_steps = Some(sub_steps);
    }

    pub fn sub_steps(&self) -> &[ChapterSubStep] {
        self.step(StepId::WriteContent)
            .sub_steps
            .as_deref()
            .unwrap_or(&[])
    }

    fn sub_step_mut(&mut self, index: usize) -> Option<&mut ChapterSubStep> {
        self.step_mut(StepId::WriteContent)
            .sub_steps
            .as_mut()
            .and_then(|subs| subs.get_mut(index))
    }

    pub fn start_chapter(&mut self, index: usize, start_time: String) {
        if let Some(sub) = self.sub_step_mut(index) {
            sub.status = StepStatus::InProgress;
            sub.start_time = Some(start_time);
        }
    }

    pub fn complete_chapter(&mut self, index: usize, duration: String) {
        if let Some(sub) = self.sub_step_mut(index) {
            sub.status = StepStatus::Complete;
            sub.duration = Some(duration);
        }
    }

    pub fn fail_chapter(&mut self, index: usize, duration: String, message: impl Into<String>) {
        if let Some(sub) = self.sub_step_mut(index) {
            sub.status = StepStatus::Error;
            sub.duration = Some(duration);
            sub.message = Some(message.into());
        }
    }
}

/// Seconds with one decimal, as shown in sub-step durations
pub fn format_duration(elapsed: std::time::Duration) -> String {
    format!("{:.1}s", elapsed.as_secs_f64())
}
