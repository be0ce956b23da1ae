//! Chapter discovery and plan construction over arbitrary index text

use proptest::prelude::*;
use std::sync::Arc;
use treatise::document::{
    extract_chapters, fit_chapter_count, DocumentAssembler, PlanOptions, SectionKind, StructureMode,
};
use treatise::provider::ScriptedBackend;
use treatise::retry::RetryPolicy;
use treatise::router::Router;

/// Index-like text: a mix of headings at several levels and prose
fn index_text() -> impl Strategy<Value = String> {
    let line = prop_oneof![
        "[A-Za-z ]{0,20}".prop_map(|t| format!("## {}", t)),
        "[A-Za-z ]{0,20}".prop_map(|t| format!("# {}", t)),
        "[A-Za-z ]{0,20}".prop_map(|t| format!("### {}", t)),
        Just("## Introduction".to_string()),
        Just("## conclusion".to_string()),
        Just("## References".to_string()),
        "[A-Za-z .,]{0,40}",
    ];
    prop::collection::vec(line, 0..12).prop_map(|lines| lines.join("\n"))
}

#[test]
fn test_extracted_chapters_are_never_empty_or_framing() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&index_text(), |index| {
            for title in extract_chapters(&index) {
                prop_assert!(!title.trim().is_empty());
                prop_assert_eq!(title.trim(), title.as_str());
                let lower = title.to_lowercase();
                prop_assert!(lower != "introduction" && lower != "conclusion" && lower != "references");
                prop_assert!(index
                    .lines()
                    .filter_map(|l| l.trim().strip_prefix("## "))
                    .any(|heading| heading.trim() == title));
            }
            Ok(())
        })
        .unwrap();
}

proptest! {
    #[test]
    fn fitted_chapters_have_requested_length_and_keep_prefix(
        chapters in prop::collection::vec("[A-Za-z]{1,12}", 0..10),
        requested in 1usize..12,
    ) {
        let fitted = fit_chapter_count(chapters.clone(), requested);
        prop_assert_eq!(fitted.len(), requested);
        let kept = chapters.len().min(requested);
        prop_assert_eq!(&fitted[..kept], &chapters[..kept]);
    }

    #[test]
    fn per_chapter_words_never_exceed_total(total in 1usize..100_000, chapters in 1usize..40) {
        let options = PlanOptions {
            word_count: Some(total),
            ..PlanOptions::default()
        };
        let per_chapter = options.words_per_chapter(chapters).unwrap();
        prop_assert!(per_chapter * (chapters + 2) <= total);
    }
}

#[test]
fn test_automatic_plans_are_always_valid() {
    let mut runner = proptest::test_runner::TestRunner::new(proptest::test_runner::Config {
        cases: 64,
        ..proptest::test_runner::Config::default()
    });
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();

    runner
        .run(
            &(index_text(), prop::option::of(1usize..8), any::<bool>()),
            |(index, chapter_count, include_references)| {
                let backend = Arc::new(
                    ScriptedBackend::new("scripted", Vec::new()).respond_when("outline", index.clone()),
                );
                let router = Arc::new(Router::new(backend, RetryPolicy::no_retry()));
                let assembler = DocumentAssembler::new(router);
                let options = PlanOptions {
                    chapter_count,
                    include_references,
                    ..PlanOptions::default()
                };

                let plan = runtime
                    .block_on(assembler.build_plan("Topic", "m", StructureMode::Automatic, &options))
                    .unwrap();
                prop_assert!(plan.validate().is_ok());
                if let Some(count) = chapter_count {
                    prop_assert_eq!(plan.chapter_indices().len(), count);
                }
                let last = &plan.sections()[plan.len() - 1].kind;
                if include_references {
                    prop_assert_eq!(last, &SectionKind::References);
                } else {
                    prop_assert_eq!(last, &SectionKind::Conclusion);
                }
                Ok(())
            },
        )
        .unwrap();
}
