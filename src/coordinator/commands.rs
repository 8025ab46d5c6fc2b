//! Commands sent to the card, executed as effects.
//!
//! Deciding WHICH command a state calls for is pure ([`command_for`]);
//! performing it is an effect run against a [`CardCommands`] environment.

use stillwater::effect::BoxedEffect;
use stillwater::prelude::*;

use crate::core::State;
use crate::eid::{EidError, EidInteractionManager, WorkflowController};
use crate::flow::{ChangePinState, Pin};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CardCommand {
    /// Cancel whatever runs and start a fresh PIN change task.
    StartPinChange,
    SubmitPin(Pin),
    SubmitNewPin(Pin),
    SubmitCan(Pin),
    CancelTask,
}

/// Environment able to carry out [`CardCommand`]s.
pub trait CardCommands: Clone + Send + Sync + 'static {
    fn start_pin_change(&self) -> Result<(), EidError>;
    fn submit_pin(&self, pin: &Pin) -> Result<(), EidError>;
    fn submit_new_pin(&self, pin: &Pin) -> Result<(), EidError>;
    fn submit_can(&self, can: &Pin) -> Result<(), EidError>;
    fn cancel_task(&self);
}

impl<C: WorkflowController + 'static> CardCommands for EidInteractionManager<C> {
    fn start_pin_change(&self) -> Result<(), EidError> {
        EidInteractionManager::cancel_task(self);
        self.change_pin()
    }

    fn submit_pin(&self, pin: &Pin) -> Result<(), EidError> {
        self.provide_pin(pin.expose())
    }

    fn submit_new_pin(&self, pin: &Pin) -> Result<(), EidError> {
        self.provide_new_pin(pin.expose())
    }

    fn submit_can(&self, can: &Pin) -> Result<(), EidError> {
        self.provide_can(can.expose())
    }

    fn cancel_task(&self) {
        EidInteractionManager::cancel_task(self);
    }
}

/// The card command a freshly entered state calls for.
pub fn command_for(state: &ChangePinState) -> Option<CardCommand> {
    match state {
        ChangePinState::StartCardInteraction(_) => Some(CardCommand::StartPinChange),
        ChangePinState::FrameworkReadyForPinInput(context) => {
            Some(CardCommand::SubmitPin(context.old_pin.clone()))
        }
        ChangePinState::FrameworkReadyForNewPinInput(context) => {
            Some(CardCommand::SubmitNewPin(context.new_pin.clone()))
        }
        state if state.is_final() => Some(CardCommand::CancelTask),
        _ => None,
    }
}

/// Effect performing `command` against the environment.
pub fn execute<Env: CardCommands>(command: CardCommand) -> BoxedEffect<(), EidError, Env> {
    from_fn(move |env: &Env| match &command {
        CardCommand::StartPinChange => env.start_pin_change(),
        CardCommand::SubmitPin(pin) => env.submit_pin(pin),
        CardCommand::SubmitNewPin(pin) => env.submit_new_pin(pin),
        CardCommand::SubmitCan(can) => env.submit_can(can),
        CardCommand::CancelTask => {
            env.cancel_task();
            Ok(())
        }
    })
    .boxed()
}
