//! Document Assembler: turns a topic and model into a [`GenerationPlan`].
//!
//! Automatic plans derive their chapters from a generated index; manual plans use a
//! fixed three-chapter template whose index is generated up front. The assembler
//! never swaps modes on its own; falling back is the orchestrator's decision.

use crate::document::outline::{chapters_or_default, fit_chapter_count, DEFAULT_CHAPTERS};
use crate::document::plan::{GenerationPlan, PlanOptions, Section, SectionKind, StructureMode};
use crate::document::prompts;
use crate::error::ApiError;
use crate::router::Router;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Clone)]
pub struct DocumentAssembler {
    router: Arc<Router>,
}

impl DocumentAssembler {
    pub fn new(router: Arc<Router>) -> Self {
        Self { router }
    }

    pub async fn build_plan(
        &self,
        topic: &str,
        model: &str,
        mode: StructureMode,
        options: &PlanOptions,
    ) -> Result<GenerationPlan, ApiError> {
        let plan = match mode {
            StructureMode::Automatic => self.build_automatic(topic, model, options).await,
            StructureMode::Manual => self.build_manual(topic, model).await,
        }
        .map_err(|err| match err {
            ApiError::Aborted => ApiError::Aborted,
            err @ ApiError::StructureFailed { .. } => err,
            other => ApiError::StructureFailed {
                mode: mode.to_string(),
                reason: other.to_string(),
            },
        })?;

        info!(
            mode = %mode,
            sections = plan.len(),
            chapters = plan.chapter_indices().len(),
            "Generation plan built"
        );
        Ok(plan)
    }

    async fn build_automatic(
        &self,
        topic: &str,
        model: &str,
        options: &PlanOptions,
    ) -> Result<GenerationPlan, ApiError> {
        options.validate()?;

        let index_prompt = prompts::automatic_index_prompt(topic, options);
        let index_content = self.router.route(model, &index_prompt).await?;

        let mut chapters = chapters_or_default(&index_content);
        if let Some(requested) = options.chapter_count {
            if chapters.len() != requested {
                debug!(found = chapters.len(), requested, "Adjusting chapter count");
            }
            chapters = fit_chapter_count(chapters, requested);
        }

        let words_per_chapter = options.words_per_chapter(chapters.len());
        let mut sections = Vec::with_capacity(chapters.len() + 4);
        sections.push(Section::literal("Index", SectionKind::Index, index_content));
        sections.push(Section::prompt(
            "Introduction",
            SectionKind::Introduction,
            prompts::introduction_prompt(topic, options.word_count),
        ));
        for (i, chapter) in chapters.into_iter().enumerate() {
            let number = i + 1;
            sections.push(Section::prompt(
                format!("Chapter {}: {}", number, chapter),
                SectionKind::Chapter {
                    number,
                    name: chapter.clone(),
                },
                prompts::chapter_prompt(&chapter, topic, words_per_chapter),
            ));
        }
        sections.push(Section::prompt(
            "Conclusion",
            SectionKind::Conclusion,
            prompts::conclusion_prompt(topic),
        ));
        if options.include_references {
            sections.push(Section::prompt(
                "References",
                SectionKind::References,
                prompts::references_prompt(topic, options.citation_style.as_deref()),
            ));
        }

        Ok(GenerationPlan::new(topic, StructureMode::Automatic, sections))
    }

    async fn build_manual(&self, topic: &str, model: &str) -> Result<GenerationPlan, ApiError> {
        let mut sections = manual_sections(topic);

        let titles: Vec<String> = sections[1..].iter().map(|s| s.title.clone()).collect();
        let index_prompt = prompts::manual_index_prompt(topic, &titles);
        let index_content = self.router.route(model, &index_prompt).await?;
        sections[0] = Section::literal("Index", SectionKind::Index, index_content);

        Ok(GenerationPlan::new(topic, StructureMode::Manual, sections))
    }
}

/// Manual template with the index still a placeholder
fn manual_sections(topic: &str) -> Vec<Section> {
    let mut sections = vec![
        Section::literal("Index", SectionKind::Index, prompts::INDEX_PLACEHOLDER),
        Section::prompt(
            "Introduction",
            SectionKind::Introduction,
            prompts::introduction_prompt(topic, None),
        ),
    ];
    for (i, chapter) in DEFAULT_CHAPTERS.iter().enumerate() {
        let number = i + 1;
        sections.push(Section::prompt(
            format!("Chapter {}: {}", number, chapter),
            SectionKind::Chapter {
                number,
                name: chapter.to_string(),
            },
            prompts::manual_chapter_prompt(chapter, topic),
        ));
    }
    sections.push(Section::prompt(
        "Conclusion",
        SectionKind::Conclusion,
        prompts::conclusion_prompt(topic),
    ));
    sections
}
