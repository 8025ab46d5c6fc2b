//! Card events the change-PIN machine cares about.

use crate::eid::{EidInteractionError, EidInteractionEvent};
use crate::flow::ChangePinEvent;

/// Machine event standing for a card event, if the machine needs to know.
///
/// Card presence and progress events only drive the UI and map to `None`.
/// A PUK request ends the change-PIN flow as a blocked card; unblocking is
/// a separate flow.
pub fn machine_event_for(event: &EidInteractionEvent) -> Option<ChangePinEvent> {
    match event {
        EidInteractionEvent::PinRequested { .. } => Some(ChangePinEvent::FrameworkRequestsPin),
        EidInteractionEvent::NewPinRequested => Some(ChangePinEvent::FrameworkRequestsNewPin),
        EidInteractionEvent::CanRequested => Some(ChangePinEvent::FrameworkRequestsCan),
        EidInteractionEvent::PukRequested => {
            Some(ChangePinEvent::Error(EidInteractionError::CardBlocked))
        }
        EidInteractionEvent::PinChangeSucceeded => Some(ChangePinEvent::Finish),
        EidInteractionEvent::Error(error) => Some(ChangePinEvent::Error(error.clone())),
        EidInteractionEvent::Idle
        | EidInteractionEvent::CardInsertionRequested
        | EidInteractionEvent::CardRecognized
        | EidInteractionEvent::CardRemoved
        | EidInteractionEvent::PinChangeStarted
        | EidInteractionEvent::AuthenticationStarted
        | EidInteractionEvent::AuthenticationSucceededWithRedirect { .. } => None,
    }
}
