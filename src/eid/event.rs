//! The closed set of card-interaction events consumed by flow coordinators.

use serde::{Deserialize, Serialize};

use super::error::EidInteractionError;

/// High-level card-interaction event.
///
/// Produced by [`EidInteractionManager`](super::EidInteractionManager) from
/// the framework callbacks, in callback order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EidInteractionEvent {
    /// No task running. Emitted after a task was cancelled.
    Idle,
    CardInsertionRequested,
    CardRecognized,
    CardRemoved,
    PinChangeStarted,
    /// The card wants the (old) PIN. `attempts` is the card's retry counter.
    PinRequested { attempts: u8 },
    NewPinRequested,
    CanRequested,
    PukRequested,
    PinChangeSucceeded,
    AuthenticationStarted,
    AuthenticationSucceededWithRedirect { redirect_url: String },
    Error(EidInteractionError),
}

impl EidInteractionEvent {
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}
