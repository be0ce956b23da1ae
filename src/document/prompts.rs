//! Prompt templates for each kind of section.

use crate::document::plan::PlanOptions;

pub const DEFAULT_CITATION_STYLE: &str = "APA";

/// Shown in the index slot of a manual plan until the real index arrives
pub const INDEX_PLACEHOLDER: &str = "[Index will be generated first]";

pub fn automatic_index_prompt(topic: &str, options: &PlanOptions) -> String {
    let mut prompt = format!("Create a research paper outline about {}", topic);
    if let Some(count) = options.chapter_count {
        prompt.push_str(&format!(" with exactly {} main chapters", count));
    }
    if let Some(words) = options.word_count {
        prompt.push_str(&format!(" targeting approximately {} words", words));
    }
    prompt.push_str(". Use markdown format.");
    prompt
}

pub fn manual_index_prompt(topic: &str, section_titles: &[String]) -> String {
    format!(
        "Generate a detailed index for a research paper about {} with chapters: {}. Use markdown format.",
        topic,
        section_titles.join(", ")
    )
}

pub fn introduction_prompt(topic: &str, word_count: Option<usize>) -> String {
    let mut prompt = format!(
        "Write a comprehensive introduction for a research paper about {}.",
        topic
    );
    if let Some(words) = word_count {
        prompt.push_str(&format!(" Target word count: {} words.", words));
    }
    prompt
}

pub fn chapter_prompt(chapter: &str, topic: &str, words_per_chapter: Option<usize>) -> String {
    let mut prompt = format!(
        "Write a detailed chapter about '{}' for a research paper about {}. \
         Provide comprehensive coverage of this aspect, including relevant theories, examples, and analysis.",
        chapter, topic
    );
    if let Some(words) = words_per_chapter {
        prompt.push_str(&format!(" Target approximately {} words.", words));
    }
    prompt
}

pub fn conclusion_prompt(topic: &str) -> String {
    format!(
        "Write a conclusion section for a research paper about {}.",
        topic
    )
}

pub fn references_prompt(topic: &str, citation_style: Option<&str>) -> String {
    format!(
        "Generate a references section in {} format for this research paper about {}.",
        citation_style.unwrap_or(DEFAULT_CITATION_STYLE),
        topic
    )
}

/// Canned prompts for the fixed manual chapters, keyed by chapter name
pub fn manual_chapter_prompt(chapter: &str, topic: &str) -> String {
    match chapter {
        "Literature Review" => format!(
            "Create a detailed literature review chapter about {}.",
            topic
        ),
        "Methodology" => format!(
            "Describe the research methodology for a study about {}.",
            topic
        ),
        "Results and Discussion" => format!(
            "Present hypothetical results and discussion for a research paper about {}. \
             Analyze findings and compare with existing literature.",
            topic
        ),
        other => chapter_prompt(other, topic, None),
    }
}
