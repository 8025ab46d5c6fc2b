//! Rejections of the change-PIN state machine.

use thiserror::Error;

use super::event::ChangePinEvent;
use super::state::ChangePinState;
use crate::core::{Event, State};

/// Why an event was rejected. The machine state is untouched in both cases.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    /// The event is not defined for the current state. This is a caller bug.
    #[error("Illegal transition from state '{state}' via event '{event}'")]
    IllegalTransition { event: String, state: String },

    /// The confirmation differs from the first new-PIN entry.
    #[error("New PIN confirmation does not match the new PIN")]
    PinMismatch,
}

impl TransitionError {
    pub(crate) fn illegal(event: &ChangePinEvent, state: &ChangePinState) -> Self {
        Self::IllegalTransition {
            event: event.name().to_string(),
            state: state.name().to_string(),
        }
    }

    pub fn is_illegal_transition(&self) -> bool {
        matches!(self, Self::IllegalTransition { .. })
    }
}
