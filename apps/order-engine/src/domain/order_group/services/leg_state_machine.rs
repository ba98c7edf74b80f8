//! Leg State Machine Service
//!
//! Validates leg status transitions.

use crate::domain::order_group::errors::OrderGroupError;
use crate::domain::order_group::value_objects::LegStatus;
use crate::domain::shared::LegId;

/// Leg state machine.
pub struct LegStateMachine;

impl LegStateMachine {
    /// Check if a transition is valid.
    #[must_use]
    pub const fn is_valid_transition(from: LegStatus, to: LegStatus) -> bool {
        matches!(
            (from, to),
            // From Created
            (LegStatus::Created, LegStatus::Submitted)
                | (LegStatus::Created, LegStatus::Triggered)
                | (LegStatus::Created, LegStatus::Cancelled)
                | (LegStatus::Created, LegStatus::Rejected)
                // From Triggered
                | (LegStatus::Triggered, LegStatus::Submitted)
                | (LegStatus::Triggered, LegStatus::Cancelled)
                | (LegStatus::Triggered, LegStatus::Rejected)
                // From Submitted
                | (LegStatus::Submitted, LegStatus::PartiallyFilled)
                | (LegStatus::Submitted, LegStatus::Filled)
                | (LegStatus::Submitted, LegStatus::Cancelled)
                | (LegStatus::Submitted, LegStatus::Rejected)
                // From PartiallyFilled
                | (LegStatus::PartiallyFilled, LegStatus::PartiallyFilled)
                | (LegStatus::PartiallyFilled, LegStatus::Filled)
                | (LegStatus::PartiallyFilled, LegStatus::Cancelled)
        )
    }

    /// Validate a transition.
    ///
    /// # Errors
    ///
    /// Returns error if the transition is invalid.
    pub fn validate_transition(
        leg_id: &LegId,
        from: LegStatus,
        to: LegStatus,
    ) -> Result<(), OrderGroupError> {
        if Self::is_valid_transition(from, to) {
            Ok(())
        } else {
            Err(OrderGroupError::InvalidStateTransition {
                leg_id: leg_id.clone(),
                from,
                to,
            })
        }
    }

    /// All valid next states from a given state.
    #[must_use]
    pub fn valid_next_states(from: LegStatus) -> Vec<LegStatus> {
        match from {
            LegStatus::Created => vec![
                LegStatus::Submitted,
                LegStatus::Triggered,
                LegStatus::Cancelled,
                LegStatus::Rejected,
            ],
            LegStatus::Triggered => vec![
                LegStatus::Submitted,
                LegStatus::Cancelled,
                LegStatus::Rejected,
            ],
            LegStatus::Submitted => vec![
                LegStatus::PartiallyFilled,
                LegStatus::Filled,
                LegStatus::Cancelled,
                LegStatus::Rejected,
            ],
            LegStatus::PartiallyFilled => vec![
                LegStatus::PartiallyFilled,
                LegStatus::Filled,
                LegStatus::Cancelled,
            ],
            LegStatus::Filled | LegStatus::Cancelled | LegStatus::Rejected => vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [LegStatus; 7] = [
        LegStatus::Created,
        LegStatus::Submitted,
        LegStatus::Triggered,
        LegStatus::PartiallyFilled,
        LegStatus::Filled,
        LegStatus::Cancelled,
        LegStatus::Rejected,
    ];

    #[test]
    fn terminal_states_have_no_exits() {
        for from in ALL.iter().filter(|s| s.is_terminal()) {
            for to in ALL {
                assert!(
                    !LegStateMachine::is_valid_transition(*from, to),
                    "{from} -> {to} should be invalid"
                );
            }
        }
    }

    #[test]
    fn next_states_agree_with_transition_table() {
        for from in ALL {
            let next = LegStateMachine::valid_next_states(from);
            for to in ALL {
                assert_eq!(
                    next.contains(&to),
                    LegStateMachine::is_valid_transition(from, to),
                    "{from} -> {to}"
                );
            }
        }
    }

    #[test]
    fn partial_fill_cannot_be_rejected() {
        let err = LegStateMachine::validate_transition(
            &LegId::new("leg-1"),
            LegStatus::PartiallyFilled,
            LegStatus::Rejected,
        )
        .unwrap_err();
        assert!(err.is_conflict());
    }

    #[test]
    fn trigger_legs_pass_through_triggered() {
        assert!(LegStateMachine::is_valid_transition(
            LegStatus::Created,
            LegStatus::Triggered
        ));
        assert!(LegStateMachine::is_valid_transition(
            LegStatus::Triggered,
            LegStatus::Submitted
        ));
        assert!(!LegStateMachine::is_valid_transition(
            LegStatus::Triggered,
            LegStatus::Filled
        ));
    }
}
