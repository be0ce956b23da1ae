//! Chapter discovery from generated index markdown.

/// Used when an index yields no chapters at all
pub const DEFAULT_CHAPTERS: [&str; 3] = ["Literature Review", "Methodology", "Results and Discussion"];

/// Titles appended, in order, when fewer chapters than requested were found
pub const PADDING_CHAPTERS: [&str; 4] = ["Literature Review", "Methodology", "Results", "Discussion"];

/// Headings that frame the document rather than name a chapter
const FRAMING_HEADINGS: [&str; 3] = ["introduction", "conclusion", "references"];

/// Collect level-2 (`## `) headings, skipping framing sections and empty titles.
pub fn extract_chapters(index_content: &str) -> Vec<String> {
    index_content
        .lines()
        .filter_map(|line| line.trim().strip_prefix("## "))
        .map(str::trim)
        .filter(|title| !title.is_empty())
        .filter(|title| {
            !FRAMING_HEADINGS
                .iter()
                .any(|framing| title.eq_ignore_ascii_case(framing))
        })
        .map(str::to_string)
        .collect()
}

/// Extracted chapters, or the default triple when the index has none
pub fn chapters_or_default(index_content: &str) -> Vec<String> {
    let chapters = extract_chapters(index_content);
    if chapters.is_empty() {
        DEFAULT_CHAPTERS.iter().map(|c| c.to_string()).collect()
    } else {
        chapters
    }
}

/// Truncate or pad `chapters` to exactly `requested` entries.
/// Padding draws from [`PADDING_CHAPTERS`] in order, wrapping if more are needed.
pub fn fit_chapter_count(mut chapters: Vec<String>, requested: usize) -> Vec<String> {
    if chapters.len() >= requested {
        chapters.truncate(requested);
        return chapters;
    }
    let missing = requested - chapters.len();
    chapters.extend(
        PADDING_CHAPTERS
            .iter()
            .cycle()
            .take(missing)
            .map(|c| c.to_string()),
    );
    chapters
}
