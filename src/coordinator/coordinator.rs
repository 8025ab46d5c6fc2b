//! The change-PIN coordinator: user actions and card events in, card
//! commands out.
//!
//! The machine decides what is legal. The coordinator validates typed
//! secrets, translates card events, and smooths over card behavior the
//! transition table does not model: a PIN request that arrives while the
//! user is re-entering the old PIN, and a repeated CAN request after a
//! wrong CAN.

use log::{debug, info, trace, warn};
use stillwater::effect::Effect;
use stillwater::prelude::*;
use thiserror::Error;
use tokio::sync::watch;

use super::bridge::machine_event_for;
use super::commands::{command_for, execute, CardCommand, CardCommands};
use crate::config::FlowConfig;
use crate::core::State;
use crate::eid::{EidError, EidEventStream, EidInteractionEvent};
use crate::flow::{
    ChangePinEvent, ChangePinState, ChangePinStateMachine, FlowSnapshot, Pin, PinChangeFlags,
    TransitionError,
};
use crate::policy::{PinPolicy, PinViolation, SecretKind};

/// Errors surfaced to the UI layer driving a [`ChangePinCoordinator`].
#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error("invalid secret: {violations:?}")]
    InvalidSecret { violations: Vec<PinViolation> },

    #[error("the card is not asking for a CAN")]
    CanNotRequested,

    #[error(transparent)]
    Card(#[from] EidError),
}

/// Outcome of confirming the new PIN.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Confirmation {
    Confirmed,
    /// Entries differed; the user is asked to confirm again.
    Mismatch,
}

/// Drives a [`ChangePinStateMachine`] from user actions and card events,
/// and sends the machine's card commands to `Env`.
pub struct ChangePinCoordinator<Env: CardCommands> {
    machine: ChangePinStateMachine,
    card: Env,
    policy: PinPolicy,
    /// The card asked for the PIN again while the user was re-entering it.
    pin_request_pending: bool,
    /// The card rejected the last CAN and asked for it again.
    can_incorrect: bool,
}

impl<Env: CardCommands> ChangePinCoordinator<Env> {
    pub fn new(card: Env) -> Self {
        Self::with_config(card, &FlowConfig::default())
    }

    pub fn with_config(card: Env, config: &FlowConfig) -> Self {
        Self {
            machine: ChangePinStateMachine::with_config(config),
            card,
            policy: config.pin_policy,
            pin_request_pending: false,
            can_incorrect: false,
        }
    }

    pub fn state(&self) -> &ChangePinState {
        self.machine.current_state()
    }

    pub fn machine(&self) -> &ChangePinStateMachine {
        &self.machine
    }

    pub fn subscribe(&self) -> watch::Receiver<FlowSnapshot> {
        self.machine.subscribe()
    }

    /// Whether the card turned down the CAN submitted last. Cleared by the
    /// next `submit_can` or transition.
    pub fn can_incorrect(&self) -> bool {
        self.can_incorrect
    }

    pub async fn start_pin_change(
        &mut self,
        identification_pending: bool,
        transport_pin: bool,
    ) -> Result<ChangePinState, CoordinatorError> {
        self.pin_request_pending = false;
        let flags = PinChangeFlags::new(identification_pending, transport_pin);
        self.apply(ChangePinEvent::start(flags)).await
    }

    /// Enter the old PIN, or re-enter it after the card rejected it.
    pub async fn enter_old_pin(&mut self, value: &str) -> Result<ChangePinState, CoordinatorError> {
        let pin = match self.state().flags() {
            Some(flags) => self.checked(PinPolicy::old_pin_kind(flags), value)?,
            None => Pin::new(value),
        };
        self.apply(ChangePinEvent::EnterOldPin(pin)).await
    }

    pub async fn confirm_new_pin_intro(&mut self) -> Result<ChangePinState, CoordinatorError> {
        self.apply(ChangePinEvent::ConfirmNewPinIntro).await
    }

    pub async fn enter_new_pin(&mut self, value: &str) -> Result<ChangePinState, CoordinatorError> {
        let pin = self.checked(SecretKind::PersonalPin, value)?;
        self.apply(ChangePinEvent::EnterNewPin(pin)).await
    }

    /// Confirm the new PIN. A mismatch sends the user back to entering it.
    pub async fn confirm_new_pin(&mut self, value: &str) -> Result<Confirmation, CoordinatorError> {
        match self.apply(ChangePinEvent::ConfirmNewPin(Pin::new(value))).await {
            Ok(_) => Ok(Confirmation::Confirmed),
            Err(CoordinatorError::Transition(TransitionError::PinMismatch)) => {
                self.apply(ChangePinEvent::RetryNewPinConfirmation).await?;
                Ok(Confirmation::Mismatch)
            }
            Err(error) => Err(error),
        }
    }

    /// Hand the CAN to the card. The machine moves on once the card asks
    /// for the PIN again; a repeated CAN request instead sets
    /// [`can_incorrect`](Self::can_incorrect).
    pub async fn submit_can(&mut self, value: &str) -> Result<(), CoordinatorError> {
        if !matches!(self.state(), ChangePinState::CanRequested { .. }) {
            return Err(CoordinatorError::CanNotRequested);
        }
        let can = self.checked(SecretKind::Can, value)?;
        self.can_incorrect = false;
        self.run_command(CardCommand::SubmitCan(can)).await
    }

    pub async fn proceed_after_error(&mut self) -> Result<ChangePinState, CoordinatorError> {
        self.apply(ChangePinEvent::ProceedAfterError).await
    }

    /// Step back one screen. Leaving a card interaction cancels the task.
    pub async fn back(&mut self) -> Result<ChangePinState, CoordinatorError> {
        let leaves_card = matches!(
            self.state(),
            ChangePinState::StartCardInteraction(_) | ChangePinState::FrameworkReadyForPinInput(_)
        );
        let next = self.apply(ChangePinEvent::Back).await?;
        if leaves_card {
            self.pin_request_pending = false;
            self.run_command(CardCommand::CancelTask).await?;
        }
        Ok(next)
    }

    /// Abandon the flow from any state.
    pub async fn cancel(&mut self) -> Result<(), CoordinatorError> {
        self.pin_request_pending = false;
        self.apply(ChangePinEvent::Invalidate).await?;
        self.run_command(CardCommand::CancelTask).await
    }

    /// Feed one card event to the machine. Returns the new state, or `None`
    /// when the event does not concern the machine.
    pub async fn handle_card_event(
        &mut self,
        event: EidInteractionEvent,
    ) -> Result<Option<ChangePinState>, CoordinatorError> {
        if let EidInteractionEvent::Error(error) = &event {
            warn!("card reported {:?}", error.redacted());
        }
        match machine_event_for(&event) {
            // The card asks again after a wrong CAN; the flow stays put.
            Some(ChangePinEvent::FrameworkRequestsCan)
                if matches!(self.state(), ChangePinState::CanRequested { .. }) =>
            {
                warn!("CAN incorrect, waiting for another attempt");
                self.can_incorrect = true;
                Ok(None)
            }
            Some(machine_event) => self.apply(machine_event).await.map(Some),
            None => {
                trace!("card event {:?} does not concern the flow", event);
                Ok(None)
            }
        }
    }

    /// Consume card events until the flow reaches a final state or the
    /// stream ends.
    pub async fn run(
        &mut self,
        events: &mut EidEventStream,
    ) -> Result<ChangePinState, CoordinatorError> {
        while !self.machine.is_final() {
            let Some(event) = events.next().await else {
                debug!("card event stream ended in {}", self.state().name());
                break;
            };
            self.handle_card_event(event).await?;
        }
        Ok(self.state().clone())
    }

    async fn apply(&mut self, event: ChangePinEvent) -> Result<ChangePinState, CoordinatorError> {
        let mut next = self.machine.transition(event)?;
        self.can_incorrect = false;

        if matches!(next, ChangePinState::OldPinRetry { .. }) {
            self.pin_request_pending = true;
        } else if self.pin_request_pending
            && matches!(next, ChangePinState::ReadyForSubsequentScan(_))
        {
            self.pin_request_pending = false;
            next = self.machine.transition(ChangePinEvent::FrameworkRequestsPin)?;
        }

        if next.is_final() {
            self.pin_request_pending = false;
            if next == ChangePinState::Finished {
                info!("PIN changed");
            }
        }

        if let Some(command) = command_for(&next) {
            self.run_command(command).await?;
        }
        Ok(next)
    }

    async fn run_command(&self, command: CardCommand) -> Result<(), CoordinatorError> {
        execute::<Env>(command).run(&self.card).await?;
        Ok(())
    }

    fn checked(&self, kind: SecretKind, value: &str) -> Result<Pin, CoordinatorError> {
        self.policy
            .check(kind, value)
            .map_err(|violations| CoordinatorError::InvalidSecret { violations })
    }
}
