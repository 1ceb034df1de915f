//! Sync lifecycle state machine tests.
//!
//! Covers the full 6x6 transition matrix: 7 valid transitions, terminal
//! and self-transition rejections, and record-level validation with
//! context preserved in the error.

// ─── Terminal classification ────────────────────────────────────────────────

mod is_terminal {
    use issuesync::types::SyncState;

    #[test]
    fn idle_is_not_terminal() {
        assert!(!SyncState::Idle.is_terminal());
    }

    #[test]
    fn resolving_is_not_terminal() {
        assert!(!SyncState::Resolving.is_terminal());
    }

    #[test]
    fn mutating_is_not_terminal() {
        assert!(!SyncState::Mutating.is_terminal());
    }

    #[test]
    fn retrying_is_not_terminal() {
        assert!(!SyncState::Retrying.is_terminal());
    }

    #[test]
    fn done_is_terminal() {
        assert!(SyncState::Done.is_terminal());
    }

    #[test]
    fn failed_is_terminal() {
        assert!(SyncState::Failed.is_terminal());
    }
}

// ─── Valid transitions (7 total) ────────────────────────────────────────────

mod valid_transitions {
    use issuesync::types::SyncState;

    #[test]
    fn idle_to_resolving() {
        assert!(SyncState::Idle.can_transition_to(SyncState::Resolving));
    }

    #[test]
    fn resolving_to_mutating() {
        assert!(SyncState::Resolving.can_transition_to(SyncState::Mutating));
    }

    #[test]
    fn resolving_to_failed() {
        assert!(SyncState::Resolving.can_transition_to(SyncState::Failed));
    }

    #[test]
    fn mutating_to_done() {
        assert!(SyncState::Mutating.can_transition_to(SyncState::Done));
    }

    #[test]
    fn mutating_to_retrying() {
        assert!(SyncState::Mutating.can_transition_to(SyncState::Retrying));
    }

    #[test]
    fn mutating_to_failed() {
        assert!(SyncState::Mutating.can_transition_to(SyncState::Failed));
    }

    #[test]
    fn retrying_to_mutating() {
        assert!(SyncState::Retrying.can_transition_to(SyncState::Mutating));
    }

    #[test]
    fn retrying_to_failed() {
        assert!(SyncState::Retrying.can_transition_to(SyncState::Failed));
    }
}

// ─── Invalid transitions ────────────────────────────────────────────────────

mod invalid_transitions {
    use issuesync::types::SyncState;

    const ALL: [SyncState; 6] = [
        SyncState::Idle,
        SyncState::Resolving,
        SyncState::Mutating,
        SyncState::Retrying,
        SyncState::Done,
        SyncState::Failed,
    ];

    #[test]
    fn self_transitions_rejected() {
        for state in ALL {
            assert!(
                !state.can_transition_to(state),
                "{state} should not transition to itself"
            );
        }
    }

    #[test]
    fn terminal_states_reject_all_transitions() {
        for terminal in [SyncState::Done, SyncState::Failed] {
            for target in ALL {
                assert!(
                    !terminal.can_transition_to(target),
                    "{terminal} should not transition to {target}"
                );
            }
        }
    }

    #[test]
    fn retrying_never_reenters_resolving() {
        assert!(!SyncState::Retrying.can_transition_to(SyncState::Resolving));
    }

    #[test]
    fn idle_cannot_skip_resolution() {
        assert!(!SyncState::Idle.can_transition_to(SyncState::Mutating));
        assert!(!SyncState::Idle.can_transition_to(SyncState::Done));
        assert!(!SyncState::Idle.can_transition_to(SyncState::Failed));
    }

    #[test]
    fn resolving_cannot_finish_directly() {
        assert!(!SyncState::Resolving.can_transition_to(SyncState::Done));
        assert!(!SyncState::Resolving.can_transition_to(SyncState::Retrying));
    }
}

// ─── Record-level validation ────────────────────────────────────────────────

mod record {
    use issuesync::types::{SyncRecord, SyncState};

    #[test]
    fn full_success_path() {
        let mut record = SyncRecord::new("ABC-1");
        record.transition_to(SyncState::Resolving).unwrap();
        record.transition_to(SyncState::Mutating).unwrap();
        record.transition_to(SyncState::Retrying).unwrap();
        record.transition_to(SyncState::Mutating).unwrap();
        record.transition_to(SyncState::Done).unwrap();
        assert!(record.state.is_terminal());
    }

    #[test]
    fn rejected_transition_preserves_state_and_context() {
        let mut record = SyncRecord::new("ABC-1");
        record.transition_to(SyncState::Resolving).unwrap();

        let err = record.transition_to(SyncState::Retrying).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("ABC-1"));
        assert!(message.contains("resolving"));
        assert!(message.contains("retrying"));
        assert_eq!(record.state, SyncState::Resolving);
    }

    #[test]
    fn validate_transition_matches_can_transition() {
        for from in [
            SyncState::Idle,
            SyncState::Resolving,
            SyncState::Mutating,
            SyncState::Retrying,
            SyncState::Done,
            SyncState::Failed,
        ] {
            for to in [
                SyncState::Idle,
                SyncState::Resolving,
                SyncState::Mutating,
                SyncState::Retrying,
                SyncState::Done,
                SyncState::Failed,
            ] {
                assert_eq!(
                    from.validate_transition("k", to).is_ok(),
                    from.can_transition_to(to),
                    "mismatch for {from} -> {to}"
                );
            }
        }
    }
}
