//! States of the change-PIN dialogue.

use serde::{Deserialize, Serialize};

use super::context::{FlowContext, Pin, PinChangeFlags};
use crate::core::State;

/// One phase of the change-PIN dialogue.
///
/// Non-terminal variants carry what is needed to resume or step back.
/// Those payloads include the entered PINs, which `Serialize` writes in
/// plain text; see [`Pin`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangePinState {
    /// No flow in progress.
    #[default]
    Invalid,

    /// Waiting for the current secret (transport or personal PIN).
    OldPinInput(PinChangeFlags),

    /// The card rejected the old PIN; the chosen new PIN is kept.
    OldPinRetry { flags: PinChangeFlags, new_pin: Pin },

    /// Interstitial before the new PIN is collected.
    NewPinIntro { flags: PinChangeFlags, old_pin: Pin },

    NewPinInput { flags: PinChangeFlags, old_pin: Pin },

    /// Waiting for the repeated entry; `new_pin` holds the first one.
    NewPinConfirmation(FlowContext),

    /// Both secrets collected, card communication about to begin.
    StartCardInteraction(FlowContext),

    /// Earlier card session ended; waiting for the card to be presented again.
    ReadyForSubsequentScan(FlowContext),

    /// The card wants the old PIN.
    FrameworkReadyForPinInput(FlowContext),

    /// The card wants the new PIN.
    FrameworkReadyForNewPinInput(FlowContext),

    /// The card requires CAN verification before the next PIN attempt.
    /// `short_flow` is set when no scan had completed before the request.
    CanRequested {
        context: FlowContext,
        short_flow: bool,
    },

    /// Recoverable card or process failure. `first_scan` decides whether a
    /// retry restarts the card interaction or cancels the flow.
    ProcessFailed {
        context: FlowContext,
        first_scan: bool,
    },

    CardDeactivated,
    CardBlocked,
    UnknownError,
    Finished,
    Cancelled,
}

impl ChangePinState {
    /// Flags of the running flow, if the state still carries them.
    pub fn flags(&self) -> Option<PinChangeFlags> {
        match self {
            Self::OldPinInput(flags)
            | Self::OldPinRetry { flags, .. }
            | Self::NewPinIntro { flags, .. }
            | Self::NewPinInput { flags, .. } => Some(*flags),
            _ => self.context().map(|context| context.flags),
        }
    }

    /// Flags and both secrets, once both have been collected.
    pub fn context(&self) -> Option<&FlowContext> {
        match self {
            Self::NewPinConfirmation(context)
            | Self::StartCardInteraction(context)
            | Self::ReadyForSubsequentScan(context)
            | Self::FrameworkReadyForPinInput(context)
            | Self::FrameworkReadyForNewPinInput(context)
            | Self::CanRequested { context, .. }
            | Self::ProcessFailed { context, .. } => Some(context),
            _ => None,
        }
    }

    pub fn old_pin(&self) -> Option<&Pin> {
        match self {
            Self::NewPinIntro { old_pin, .. } | Self::NewPinInput { old_pin, .. } => Some(old_pin),
            _ => self.context().map(|context| &context.old_pin),
        }
    }

    pub fn new_pin(&self) -> Option<&Pin> {
        match self {
            Self::OldPinRetry { new_pin, .. } => Some(new_pin),
            _ => self.context().map(|context| &context.new_pin),
        }
    }
}

impl State for ChangePinState {
    fn name(&self) -> &str {
        match self {
            Self::Invalid => "Invalid",
            Self::OldPinInput(_) => "OldPinInput",
            Self::OldPinRetry { .. } => "OldPinRetry",
            Self::NewPinIntro { .. } => "NewPinIntro",
            Self::NewPinInput { .. } => "NewPinInput",
            Self::NewPinConfirmation(_) => "NewPinConfirmation",
            Self::StartCardInteraction(_) => "StartCardInteraction",
            Self::ReadyForSubsequentScan(_) => "ReadyForSubsequentScan",
            Self::FrameworkReadyForPinInput(_) => "FrameworkReadyForPinInput",
            Self::FrameworkReadyForNewPinInput(_) => "FrameworkReadyForNewPinInput",
            Self::CanRequested { .. } => "CanRequested",
            Self::ProcessFailed { .. } => "ProcessFailed",
            Self::CardDeactivated => "CardDeactivated",
            Self::CardBlocked => "CardBlocked",
            Self::UnknownError => "UnknownError",
            Self::Finished => "Finished",
            Self::Cancelled => "Cancelled",
        }
    }

    fn is_final(&self) -> bool {
        matches!(
            self,
            Self::Finished
                | Self::Cancelled
                | Self::CardDeactivated
                | Self::CardBlocked
                | Self::UnknownError
        )
    }

    fn is_error(&self) -> bool {
        matches!(
            self,
            Self::ProcessFailed { .. }
                | Self::CardDeactivated
                | Self::CardBlocked
                | Self::UnknownError
        )
    }
}
