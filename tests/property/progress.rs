//! Progress bookkeeping under arbitrary update sequences

use proptest::prelude::*;
use treatise::progress::{ProgressEvent, ProgressState, StepId, StepStatus};
use uuid::Uuid;

proptest! {
    #[test]
    fn progress_never_decreases_and_stays_in_range(updates in prop::collection::vec(-50.0f64..200.0, 0..40)) {
        let mut state = ProgressState::new();
        let mut previous = state.progress;
        for value in updates {
            state.advance_to(value);
            prop_assert!(state.progress >= previous);
            prop_assert!((0.0..=100.0).contains(&state.progress));
            previous = state.progress;
        }
    }

    #[test]
    fn chapter_sub_steps_follow_chapter_order(names in prop::collection::vec("[A-Za-z ]{1,16}", 1..10)) {
        let mut state = ProgressState::new();
        state.set_chapters(&names);
        let subs = state.sub_steps();
        prop_assert_eq!(subs.len(), names.len());
        for (i, (sub, name)) in subs.iter().zip(&names).enumerate() {
            prop_assert_eq!(&sub.id, &format!("chapter_{}", i));
            prop_assert_eq!(&sub.label, &format!("Chapter {}: {}", i + 1, name));
            prop_assert_eq!(sub.status, StepStatus::Pending);
        }
    }

    #[test]
    fn snapshots_serialize_with_flattened_state(seq in 1u64..10_000, progress in 0.0f64..100.0) {
        let mut state = ProgressState::new();
        state.start(StepId::Prepare);
        state.advance_to(progress);
        let event = ProgressEvent::snapshot(Uuid::new_v4(), seq, &state);
        let value = serde_json::to_value(&event).unwrap();
        prop_assert_eq!(value["seq"].as_u64(), Some(seq));
        prop_assert_eq!(value["steps"].as_array().map(Vec::len), Some(6));
        prop_assert_eq!(value["current_step"].as_u64(), Some(0));
        prop_assert!(value.get("status").is_none());
    }
}
