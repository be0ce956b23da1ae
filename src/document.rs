//! Document planning and assembly.
//!
//! A [`GenerationPlan`] is built once per request by the [`DocumentAssembler`] and
//! rendered to markdown by the writer once every section has been resolved.

pub mod assembler;
pub mod outline;
pub mod plan;
pub mod prompts;
pub mod writer;

pub use assembler::DocumentAssembler;
pub use outline::{chapters_or_default, extract_chapters, fit_chapter_count};
pub use plan::{GenerationPlan, PlanOptions, Section, SectionBody, SectionKind, StructureMode};
pub use writer::{render_markdown, OutputFiles, RenderedSection, SectionOutcome};
