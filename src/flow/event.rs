//! Inputs of the change-PIN state machine.

use serde::{Deserialize, Serialize};

use super::context::{Pin, PinChangeFlags};
use crate::core::Event;
use crate::eid::EidInteractionError;

/// User-driven and card-driven inputs to [`next_state`](super::next_state).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangePinEvent {
    StartPinChange {
        identification_pending: bool,
        transport_pin: bool,
    },
    EnterOldPin(Pin),
    ConfirmNewPinIntro,
    EnterNewPin(Pin),
    ConfirmNewPin(Pin),
    RetryNewPinConfirmation,
    FrameworkRequestsPin,
    FrameworkRequestsNewPin,
    FrameworkRequestsCan,
    Finish,
    Error(EidInteractionError),
    ProceedAfterError,
    Back,
    Invalidate,
}

impl ChangePinEvent {
    pub fn start(flags: PinChangeFlags) -> Self {
        Self::StartPinChange {
            identification_pending: flags.identification_pending,
            transport_pin: flags.transport_pin,
        }
    }
}

impl Event for ChangePinEvent {
    fn name(&self) -> &str {
        match self {
            Self::StartPinChange { .. } => "StartPinChange",
            Self::EnterOldPin(_) => "EnterOldPin",
            Self::ConfirmNewPinIntro => "ConfirmNewPinIntro",
            Self::EnterNewPin(_) => "EnterNewPin",
            Self::ConfirmNewPin(_) => "ConfirmNewPin",
            Self::RetryNewPinConfirmation => "RetryNewPinConfirmation",
            Self::FrameworkRequestsPin => "FrameworkRequestsPin",
            Self::FrameworkRequestsNewPin => "FrameworkRequestsNewPin",
            Self::FrameworkRequestsCan => "FrameworkRequestsCan",
            Self::Finish => "Finish",
            Self::Error(_) => "Error",
            Self::ProceedAfterError => "ProceedAfterError",
            Self::Back => "Back",
            Self::Invalidate => "Invalidate",
        }
    }
}
