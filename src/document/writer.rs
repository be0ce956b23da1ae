//! Markdown assembly and output file allocation.

use crate::error::ApiError;
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

const FILE_STEM: &str = "research_paper";

/// Paths of the intermediate markdown file and the converted document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFiles {
    pub markdown: PathBuf,
    pub docx: PathBuf,
}

impl OutputFiles {
    /// Pick fresh `research_paper_{8 hex}` names inside `dir`, creating it if needed.
    pub fn allocate(dir: &Path) -> Result<Self, ApiError> {
        fs::create_dir_all(dir)?;
        let simple = Uuid::new_v4().simple().to_string();
        let stem = format!("{}_{}", FILE_STEM, &simple[..8]);
        Ok(Self {
            markdown: dir.join(format!("{}.md", stem)),
            docx: dir.join(format!("{}.docx", stem)),
        })
    }

    pub fn markdown_name(&self) -> String {
        file_name(&self.markdown)
    }

    pub fn docx_name(&self) -> String {
        file_name(&self.docx)
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// How one section's body was obtained
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionOutcome {
    Literal(String),
    Generated(String),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedSection {
    pub title: String,
    pub outcome: SectionOutcome,
}

impl RenderedSection {
    pub fn new(title: impl Into<String>, outcome: SectionOutcome) -> Self {
        Self {
            title: title.into(),
            outcome,
        }
    }
}

/// Inline text written in place of a section that could not be generated
pub fn error_placeholder(error: &str) -> String {
    format!("[Error generating this section: {}]", error)
}

pub fn render_markdown(topic: &str, sections: &[RenderedSection]) -> String {
    let mut out = format!("# Research Paper: {}\n\n", topic);
    for section in sections {
        match &section.outcome {
            SectionOutcome::Literal(content) if content.trim_start().starts_with('#') => {
                out.push_str(content.trim_end());
                out.push_str("\n\n");
            }
            SectionOutcome::Literal(content) | SectionOutcome::Generated(content) => {
                push_section(&mut out, &section.title, content);
            }
            SectionOutcome::Failed(error) => {
                push_section(&mut out, &section.title, &error_placeholder(error));
            }
        }
    }
    out
}

fn push_section(out: &mut String, title: &str, body: &str) {
    out.push_str("## ");
    out.push_str(title);
    out.push_str("\n\n");
    out.push_str(body.trim());
    out.push_str("\n\n");
}

pub fn write_markdown(path: &Path, content: &str) -> Result<(), ApiError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)?;
    Ok(())
}
