//! Event schema for the progress stream.

use crate::progress::state::ProgressState;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Terminal outcome carried by the last event of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Complete,
    PartialSuccess,
    Aborted,
}

/// Per-chapter detail during WriteContent, or the closing summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChapterProgress {
    Chapter {
        current: usize,
        total: usize,
        chapter: String,
        percent: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        duration: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    Summary {
        complete: bool,
        total_chapters: usize,
    },
}

/// Full snapshot of a run's state plus the one-off fields of this transition.
/// Later events supersede earlier ones; they are not deltas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub task_id: Uuid,
    pub seq: u64,
    pub ts: String,
    #[serde(flatten)]
    pub state: ProgressState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chapter_progress: Option<ChapterProgress>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_steps: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<RunStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub md_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docx_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_paths: Option<Vec<String>>,
}

impl ProgressEvent {
    pub fn snapshot(task_id: Uuid, seq: u64, state: &ProgressState) -> Self {
        Self {
            task_id,
            seq,
            ts: now_millis().to_string(),
            state: state.clone(),
            chapter_progress: None,
            update_steps: None,
            warning: None,
            error: None,
            status: None,
            message: None,
            md_file: None,
            docx_file: None,
            artifact_paths: None,
        }
    }

    /// No event follows a terminal one
    pub fn is_terminal(&self) -> bool {
        self.status.is_some() || self.error.is_some()
    }
}

pub fn now_millis() -> u128 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}
