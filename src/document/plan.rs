//! Generation plan: the ordered sections of one document and how each is produced.

use crate::error::ApiError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How the chapter list is decided
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StructureMode {
    /// Chapters derived from an AI-generated index
    Automatic,
    /// Fixed three-chapter template
    Manual,
}

impl StructureMode {
    pub fn as_str(self) -> &'static str {
        match self {
            StructureMode::Automatic => "automatic",
            StructureMode::Manual => "manual",
        }
    }
}

impl fmt::Display for StructureMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StructureMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "automatic" | "auto" => Ok(StructureMode::Automatic),
            "manual" => Ok(StructureMode::Manual),
            other => Err(format!(
                "unknown structure '{}' (expected 'automatic' or 'manual')",
                other
            )),
        }
    }
}

/// Optional constraints on the generated document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanOptions {
    /// Exact number of chapters; `None` lets the index decide
    pub chapter_count: Option<usize>,
    /// Target total word count
    pub word_count: Option<usize>,
    pub include_references: bool,
    pub citation_style: Option<String>,
}

impl PlanOptions {
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.chapter_count == Some(0) {
            return Err(ApiError::InvalidRequest(
                "chapter count must be at least 1".to_string(),
            ));
        }
        if self.word_count == Some(0) {
            return Err(ApiError::InvalidRequest(
                "word count must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Per-chapter word target: the total split across chapters plus
    /// introduction and conclusion
    pub fn words_per_chapter(&self, chapters: usize) -> Option<usize> {
        self.word_count.map(|total| total / (chapters + 2))
    }
}

/// Role of a section within the document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SectionKind {
    Index,
    Introduction,
    Chapter { number: usize, name: String },
    Conclusion,
    References,
}

/// Either already-rendered markdown or a prompt to resolve through the router
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum SectionBody {
    Literal(String),
    Prompt(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub title: String,
    pub kind: SectionKind,
    pub body: SectionBody,
}

impl Section {
    pub fn literal(title: impl Into<String>, kind: SectionKind, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            kind,
            body: SectionBody::Literal(content.into()),
        }
    }

    pub fn prompt(title: impl Into<String>, kind: SectionKind, prompt: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            kind,
            body: SectionBody::Prompt(prompt.into()),
        }
    }

    pub fn is_literal(&self) -> bool {
        matches!(self.body, SectionBody::Literal(_))
    }

    /// Chapter name without the "Chapter N:" prefix
    pub fn chapter_name(&self) -> Option<&str> {
        match &self.kind {
            SectionKind::Chapter { name, .. } => Some(name),
            _ => None,
        }
    }
}

/// Ordered sections of one document. Built once per request and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationPlan {
    topic: String,
    mode: StructureMode,
    sections: Vec<Section>,
}

impl GenerationPlan {
    pub fn new(topic: impl Into<String>, mode: StructureMode, sections: Vec<Section>) -> Self {
        Self {
            topic: topic.into(),
            mode,
            sections,
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn mode(&self) -> StructureMode {
        self.mode
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Positions of chapter sections, in document order
    pub fn chapter_indices(&self) -> Vec<usize> {
        self.sections
            .iter()
            .enumerate()
            .filter(|(_, s)| matches!(s.kind, SectionKind::Chapter { .. }))
            .map(|(i, _)| i)
            .collect()
    }

    pub fn chapter_names(&self) -> Vec<&str> {
        self.sections.iter().filter_map(Section::chapter_name).collect()
    }

    /// Check the structural invariants: one literal index first, at least one
    /// non-empty chapter, and a conclusion last (or just before references).
    pub fn validate(&self) -> Result<(), ApiError> {
        let invalid = |reason: &str| ApiError::StructureFailed {
            mode: self.mode.to_string(),
            reason: reason.to_string(),
        };

        let first = self.sections.first().ok_or_else(|| invalid("plan is empty"))?;
        if first.kind != SectionKind::Index || !first.is_literal() {
            return Err(invalid("first section must be a literal index"));
        }
        let index_count = self
            .sections
            .iter()
            .filter(|s| s.kind == SectionKind::Index)
            .count();
        if index_count != 1 {
            return Err(invalid("plan must contain exactly one index"));
        }

        let names = self.chapter_names();
        if names.is_empty() {
            return Err(invalid("plan has no chapters"));
        }
        if names.iter().any(|name| name.trim().is_empty()) {
            return Err(invalid("chapter titles must not be empty"));
        }

        let kinds: Vec<&SectionKind> = self.sections.iter().map(|s| &s.kind).collect();
        let ends_correctly = match kinds.as_slice() {
            [.., SectionKind::Conclusion, SectionKind::References] => true,
            [.., SectionKind::Conclusion] => true,
            _ => false,
        };
        if !ends_correctly {
            return Err(invalid("plan must end with a conclusion or references"));
        }
        Ok(())
    }
}
