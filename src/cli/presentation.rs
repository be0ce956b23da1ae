//! Presentation for progress events and model listings, text and json.

use crate::error::ApiError;
use crate::progress::{ChapterProgress, ProgressEvent, RunStatus, StepStatus};
use comfy_table::Table;
use owo_colors::OwoColorize;
use serde_json::json;

/// One NDJSON line per event
pub fn format_event_json(event: &ProgressEvent) -> Result<String, ApiError> {
    Ok(serde_json::to_string(event)?)
}

/// Turns the snapshot stream into human-readable lines, printing only what changed.
pub struct TextRenderer {
    last_statuses: Vec<StepStatus>,
    color: bool,
}

impl TextRenderer {
    pub fn new(color: bool) -> Self {
        Self {
            last_statuses: Vec::new(),
            color,
        }
    }

    pub fn render(&mut self, event: &ProgressEvent) -> Vec<String> {
        let mut lines = Vec::new();

        if event.seq == 1 {
            lines.push(format!("Task {}", event.task_id));
        }

        for step in &event.state.steps {
            let previous = self.last_statuses.get(step.id).copied();
            if previous == Some(step.status) || (previous.is_none() && step.status == StepStatus::Pending) {
                continue;
            }
            let line = match step.status {
                StepStatus::InProgress => format!("{:>3.0}% {}", event.state.progress, step.label),
                StepStatus::Complete => self.ok(&format!("{:>3.0}% done: {}", event.state.progress, step.label)),
                StepStatus::Error => self.bad(&format!(
                    "{:>3.0}% failed: {} {}",
                    event.state.progress,
                    step.label,
                    step.message.as_deref().unwrap_or_default()
                )),
                StepStatus::Pending => continue,
            };
            lines.push(line);
        }
        self.last_statuses = event.state.steps.iter().map(|s| s.status).collect();

        match &event.chapter_progress {
            Some(ChapterProgress::Chapter {
                current,
                total,
                chapter,
                duration: None,
                ..
            }) => lines.push(format!("     chapter {}/{}: {}", current, total, chapter)),
            Some(ChapterProgress::Chapter {
                current,
                total,
                duration: Some(duration),
                error,
                ..
            }) => {
                let summary = format!("     chapter {}/{} finished in {}", current, total, duration);
                lines.push(if error.is_some() { self.bad(&summary) } else { summary });
            }
            Some(ChapterProgress::Summary { total_chapters, .. }) => {
                lines.push(format!("     {} chapters written", total_chapters));
            }
            None => {}
        }

        if let Some(warning) = &event.warning {
            lines.push(self.warn(&format!("warning: {}", warning)));
        }
        if let Some(message) = event.message.as_ref().filter(|_| event.status.is_none()) {
            lines.push(message.clone());
        }
        if let Some(error) = &event.error {
            lines.push(self.bad(&format!("error: {}", error)));
        }
        if let Some(status) = event.status {
            lines.push(self.terminal_line(event, status));
        }
        lines
    }

    fn terminal_line(&self, event: &ProgressEvent, status: RunStatus) -> String {
        let message = event.message.clone().unwrap_or_default();
        match status {
            RunStatus::Complete => {
                let artifacts = event.artifact_paths.clone().unwrap_or_default().join(", ");
                self.ok(&format!("{}\n  {}", message, artifacts))
            }
            RunStatus::PartialSuccess => {
                let artifacts = event.artifact_paths.clone().unwrap_or_default().join(", ");
                self.warn(&format!("{}\n  {}", message, artifacts))
            }
            RunStatus::Aborted => self.warn(&message),
        }
    }

    fn ok(&self, text: &str) -> String {
        if self.color {
            text.green().to_string()
        } else {
            text.to_string()
        }
    }

    fn warn(&self, text: &str) -> String {
        if self.color {
            text.yellow().to_string()
        } else {
            text.to_string()
        }
    }

    fn bad(&self, text: &str) -> String {
        if self.color {
            text.red().to_string()
        } else {
            text.to_string()
        }
    }
}

pub fn format_models_text(provider: &str, models: &[String]) -> String {
    if models.is_empty() {
        return format!("No models available from provider '{}'.", provider);
    }
    let mut table = Table::new();
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.set_header(vec!["Rank", "Model"]);
    for (i, model) in models.iter().enumerate() {
        table.add_row(vec![(i + 1).to_string(), model.clone()]);
    }
    format!("Provider: {}\n{}\n\nTotal: {} model(s)", provider, table, models.len())
}

pub fn format_models_json(provider: &str, models: &[String]) -> Result<String, ApiError> {
    let out = json!({ "provider": provider, "models": models, "total": models.len() });
    Ok(serde_json::to_string_pretty(&out)?)
}
