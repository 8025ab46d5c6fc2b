//! The change-PIN transition table and the machine that owns its state.

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use uuid::Uuid;

use super::context::{FlowContext, PinChangeFlags};
use super::error::TransitionError;
use super::event::ChangePinEvent;
use super::state::ChangePinState;
use crate::config::{FlowConfig, DEFAULT_BREADCRUMB_LIMIT};
use crate::core::{Event, State, StateHistory, StateTransition};
use crate::eid::EidInteractionError;

/// The latest `(event, state)` pair, as published to subscribers.
///
/// Serializing a snapshot writes any PINs it carries in plain text.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowSnapshot {
    pub event: ChangePinEvent,
    pub state: ChangePinState,
}

/// Compute the state following `current` on `event`.
///
/// Pure and total: every combination is either listed as legal or rejected
/// with [`TransitionError::IllegalTransition`]. Each event arm names all
/// states explicitly, so a new state variant does not compile until every
/// event has decided about it.
pub fn next_state(
    current: &ChangePinState,
    event: &ChangePinEvent,
) -> Result<ChangePinState, TransitionError> {
    use ChangePinEvent as E;
    use ChangePinState as S;

    let illegal = || Err(TransitionError::illegal(event, current));

    match event {
        E::StartPinChange {
            identification_pending,
            transport_pin,
        } => match current {
            S::Invalid => Ok(S::OldPinInput(PinChangeFlags::new(
                *identification_pending,
                *transport_pin,
            ))),
            S::OldPinInput(_)
            | S::OldPinRetry { .. }
            | S::NewPinIntro { .. }
            | S::NewPinInput { .. }
            | S::NewPinConfirmation(_)
            | S::StartCardInteraction(_)
            | S::ReadyForSubsequentScan(_)
            | S::FrameworkReadyForPinInput(_)
            | S::FrameworkReadyForNewPinInput(_)
            | S::CanRequested { .. }
            | S::ProcessFailed { .. }
            | S::CardDeactivated
            | S::CardBlocked
            | S::UnknownError
            | S::Finished
            | S::Cancelled => illegal(),
        },

        E::EnterOldPin(old_pin) => match current {
            S::OldPinInput(flags) => Ok(S::NewPinIntro {
                flags: *flags,
                old_pin: old_pin.clone(),
            }),
            S::OldPinRetry { flags, new_pin } => Ok(S::ReadyForSubsequentScan(FlowContext::new(
                *flags,
                old_pin.clone(),
                new_pin.clone(),
            ))),
            S::Invalid
            | S::NewPinIntro { .. }
            | S::NewPinInput { .. }
            | S::NewPinConfirmation(_)
            | S::StartCardInteraction(_)
            | S::ReadyForSubsequentScan(_)
            | S::FrameworkReadyForPinInput(_)
            | S::FrameworkReadyForNewPinInput(_)
            | S::CanRequested { .. }
            | S::ProcessFailed { .. }
            | S::CardDeactivated
            | S::CardBlocked
            | S::UnknownError
            | S::Finished
            | S::Cancelled => illegal(),
        },

        E::ConfirmNewPinIntro => match current {
            S::NewPinIntro { flags, old_pin } => Ok(S::NewPinInput {
                flags: *flags,
                old_pin: old_pin.clone(),
            }),
            S::Invalid
            | S::OldPinInput(_)
            | S::OldPinRetry { .. }
            | S::NewPinInput { .. }
            | S::NewPinConfirmation(_)
            | S::StartCardInteraction(_)
            | S::ReadyForSubsequentScan(_)
            | S::FrameworkReadyForPinInput(_)
            | S::FrameworkReadyForNewPinInput(_)
            | S::CanRequested { .. }
            | S::ProcessFailed { .. }
            | S::CardDeactivated
            | S::CardBlocked
            | S::UnknownError
            | S::Finished
            | S::Cancelled => illegal(),
        },

        E::EnterNewPin(new_pin) => match current {
            S::NewPinInput { flags, old_pin } => Ok(S::NewPinConfirmation(FlowContext::new(
                *flags,
                old_pin.clone(),
                new_pin.clone(),
            ))),
            S::Invalid
            | S::OldPinInput(_)
            | S::OldPinRetry { .. }
            | S::NewPinIntro { .. }
            | S::NewPinConfirmation(_)
            | S::StartCardInteraction(_)
            | S::ReadyForSubsequentScan(_)
            | S::FrameworkReadyForPinInput(_)
            | S::FrameworkReadyForNewPinInput(_)
            | S::CanRequested { .. }
            | S::ProcessFailed { .. }
            | S::CardDeactivated
            | S::CardBlocked
            | S::UnknownError
            | S::Finished
            | S::Cancelled => illegal(),
        },

        E::ConfirmNewPin(confirmation) => match current {
            S::NewPinConfirmation(context) if *confirmation == context.new_pin => {
                Ok(S::StartCardInteraction(context.clone()))
            }
            S::NewPinConfirmation(_) => Err(TransitionError::PinMismatch),
            S::Invalid
            | S::OldPinInput(_)
            | S::OldPinRetry { .. }
            | S::NewPinIntro { .. }
            | S::NewPinInput { .. }
            | S::StartCardInteraction(_)
            | S::ReadyForSubsequentScan(_)
            | S::FrameworkReadyForPinInput(_)
            | S::FrameworkReadyForNewPinInput(_)
            | S::CanRequested { .. }
            | S::ProcessFailed { .. }
            | S::CardDeactivated
            | S::CardBlocked
            | S::UnknownError
            | S::Finished
            | S::Cancelled => illegal(),
        },

        E::RetryNewPinConfirmation => match current {
            S::NewPinConfirmation(context) => Ok(S::NewPinInput {
                flags: context.flags,
                old_pin: context.old_pin.clone(),
            }),
            S::Invalid
            | S::OldPinInput(_)
            | S::OldPinRetry { .. }
            | S::NewPinIntro { .. }
            | S::NewPinInput { .. }
            | S::StartCardInteraction(_)
            | S::ReadyForSubsequentScan(_)
            | S::FrameworkReadyForPinInput(_)
            | S::FrameworkReadyForNewPinInput(_)
            | S::CanRequested { .. }
            | S::ProcessFailed { .. }
            | S::CardDeactivated
            | S::CardBlocked
            | S::UnknownError
            | S::Finished
            | S::Cancelled => illegal(),
        },

        E::FrameworkRequestsPin => match current {
            S::StartCardInteraction(context)
            | S::ReadyForSubsequentScan(context)
            | S::CanRequested { context, .. } => Ok(S::FrameworkReadyForPinInput(context.clone())),
            // Asked again without success in between: the old PIN was wrong.
            S::FrameworkReadyForPinInput(context) => Ok(S::OldPinRetry {
                flags: context.flags,
                new_pin: context.new_pin.clone(),
            }),
            S::Invalid
            | S::OldPinInput(_)
            | S::OldPinRetry { .. }
            | S::NewPinIntro { .. }
            | S::NewPinInput { .. }
            | S::NewPinConfirmation(_)
            | S::FrameworkReadyForNewPinInput(_)
            | S::ProcessFailed { .. }
            | S::CardDeactivated
            | S::CardBlocked
            | S::UnknownError
            | S::Finished
            | S::Cancelled => illegal(),
        },

        E::FrameworkRequestsNewPin => match current {
            S::FrameworkReadyForPinInput(context) | S::ReadyForSubsequentScan(context) => {
                Ok(S::FrameworkReadyForNewPinInput(context.clone()))
            }
            S::Invalid
            | S::OldPinInput(_)
            | S::OldPinRetry { .. }
            | S::NewPinIntro { .. }
            | S::NewPinInput { .. }
            | S::NewPinConfirmation(_)
            | S::StartCardInteraction(_)
            | S::FrameworkReadyForNewPinInput(_)
            | S::CanRequested { .. }
            | S::ProcessFailed { .. }
            | S::CardDeactivated
            | S::CardBlocked
            | S::UnknownError
            | S::Finished
            | S::Cancelled => illegal(),
        },

        E::FrameworkRequestsCan => match current {
            S::StartCardInteraction(context) | S::FrameworkReadyForPinInput(context) => {
                Ok(S::CanRequested {
                    context: context.clone(),
                    short_flow: true,
                })
            }
            S::ReadyForSubsequentScan(context) => Ok(S::CanRequested {
                context: context.clone(),
                short_flow: false,
            }),
            S::Invalid
            | S::OldPinInput(_)
            | S::OldPinRetry { .. }
            | S::NewPinIntro { .. }
            | S::NewPinInput { .. }
            | S::NewPinConfirmation(_)
            | S::FrameworkReadyForNewPinInput(_)
            | S::CanRequested { .. }
            | S::ProcessFailed { .. }
            | S::CardDeactivated
            | S::CardBlocked
            | S::UnknownError
            | S::Finished
            | S::Cancelled => illegal(),
        },

        E::Finish => match current {
            S::StartCardInteraction(_)
            | S::ReadyForSubsequentScan(_)
            | S::CanRequested { .. }
            | S::FrameworkReadyForNewPinInput(_) => Ok(S::Finished),
            S::Invalid
            | S::OldPinInput(_)
            | S::OldPinRetry { .. }
            | S::NewPinIntro { .. }
            | S::NewPinInput { .. }
            | S::NewPinConfirmation(_)
            | S::FrameworkReadyForPinInput(_)
            | S::ProcessFailed { .. }
            | S::CardDeactivated
            | S::CardBlocked
            | S::UnknownError
            | S::Finished
            | S::Cancelled => illegal(),
        },

        E::Error(error) => match current {
            S::StartCardInteraction(context) | S::FrameworkReadyForPinInput(context) => {
                Ok(error_state(error, context, true))
            }
            S::ReadyForSubsequentScan(context) | S::CanRequested { context, .. } => {
                Ok(error_state(error, context, false))
            }
            S::Invalid
            | S::OldPinInput(_)
            | S::OldPinRetry { .. }
            | S::NewPinIntro { .. }
            | S::NewPinInput { .. }
            | S::NewPinConfirmation(_)
            | S::FrameworkReadyForNewPinInput(_)
            | S::ProcessFailed { .. }
            | S::CardDeactivated
            | S::CardBlocked
            | S::UnknownError
            | S::Finished
            | S::Cancelled => illegal(),
        },

        E::ProceedAfterError => match current {
            S::ProcessFailed {
                context,
                first_scan: true,
            } => Ok(S::StartCardInteraction(context.clone())),
            S::ProcessFailed {
                first_scan: false, ..
            } => Ok(S::Cancelled),
            S::Invalid
            | S::OldPinInput(_)
            | S::OldPinRetry { .. }
            | S::NewPinIntro { .. }
            | S::NewPinInput { .. }
            | S::NewPinConfirmation(_)
            | S::StartCardInteraction(_)
            | S::ReadyForSubsequentScan(_)
            | S::FrameworkReadyForPinInput(_)
            | S::FrameworkReadyForNewPinInput(_)
            | S::CanRequested { .. }
            | S::CardDeactivated
            | S::CardBlocked
            | S::UnknownError
            | S::Finished
            | S::Cancelled => illegal(),
        },

        E::Back => match current {
            S::OldPinInput(_) => Ok(S::Invalid),
            S::NewPinIntro { flags, .. } => Ok(S::OldPinInput(*flags)),
            S::NewPinInput { flags, old_pin } => Ok(S::NewPinIntro {
                flags: *flags,
                old_pin: old_pin.clone(),
            }),
            S::NewPinConfirmation(context)
            | S::StartCardInteraction(context)
            | S::FrameworkReadyForPinInput(context) => Ok(S::NewPinInput {
                flags: context.flags,
                old_pin: context.old_pin.clone(),
            }),
            S::Invalid
            | S::OldPinRetry { .. }
            | S::ReadyForSubsequentScan(_)
            | S::FrameworkReadyForNewPinInput(_)
            | S::CanRequested { .. }
            | S::ProcessFailed { .. }
            | S::CardDeactivated
            | S::CardBlocked
            | S::UnknownError
            | S::Finished
            | S::Cancelled => illegal(),
        },

        E::Invalidate => Ok(S::Invalid),
    }
}

fn error_state(
    error: &EidInteractionError,
    context: &FlowContext,
    first_scan: bool,
) -> ChangePinState {
    match error {
        EidInteractionError::CardDeactivated => ChangePinState::CardDeactivated,
        EidInteractionError::CardBlocked => ChangePinState::CardBlocked,
        EidInteractionError::ProcessFailed { .. } => ChangePinState::ProcessFailed {
            context: context.clone(),
            first_scan,
        },
        EidInteractionError::FrameworkError { .. }
        | EidInteractionError::ChangingPinFailed
        | EidInteractionError::UnknownReader => ChangePinState::UnknownError,
    }
}

/// Owner of the current change-PIN state.
///
/// One instance lives for the whole process and is reused across attempts;
/// `Invalidate` resets it. Transitions take `&mut self`, so callers hand
/// events in one at a time.
///
/// # Example
///
/// ```rust
/// use pinflow::flow::{ChangePinEvent, ChangePinState, ChangePinStateMachine, Pin};
///
/// let mut machine = ChangePinStateMachine::new();
/// machine.transition(ChangePinEvent::StartPinChange {
///     identification_pending: false,
///     transport_pin: true,
/// }).unwrap();
/// machine.transition(ChangePinEvent::EnterOldPin(Pin::new("12345"))).unwrap();
///
/// assert!(matches!(machine.current_state(), ChangePinState::NewPinIntro { .. }));
/// assert!(machine.transition(ChangePinEvent::Finish).is_err());
/// ```
#[derive(Debug)]
pub struct ChangePinStateMachine {
    snapshot: FlowSnapshot,
    publisher: watch::Sender<FlowSnapshot>,
    history: StateHistory,
    session: Option<Uuid>,
}

impl Default for ChangePinStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangePinStateMachine {
    /// Create a machine in `Invalid` keeping the default number of breadcrumbs.
    pub fn new() -> Self {
        Self::with_state(ChangePinState::Invalid)
    }

    /// Create a machine in `Invalid`, configured by `config`.
    pub fn with_config(config: &FlowConfig) -> Self {
        let history = match config.breadcrumb_limit {
            Some(limit) => StateHistory::bounded(limit),
            None => StateHistory::new(),
        };
        Self::resume(ChangePinState::Invalid, history)
    }

    /// Create a machine resuming from `initial`.
    ///
    /// A non-`Invalid` initial state opens a session right away.
    pub fn with_state(initial: ChangePinState) -> Self {
        Self::resume(initial, StateHistory::bounded(DEFAULT_BREADCRUMB_LIMIT))
    }

    fn resume(initial: ChangePinState, history: StateHistory) -> Self {
        let session = (initial != ChangePinState::Invalid).then(Uuid::new_v4);
        let snapshot = FlowSnapshot {
            event: ChangePinEvent::Invalidate,
            state: initial,
        };
        let (publisher, _) = watch::channel(snapshot.clone());
        Self {
            snapshot,
            publisher,
            history,
            session,
        }
    }

    pub fn current_state(&self) -> &ChangePinState {
        &self.snapshot.state
    }

    pub fn snapshot(&self) -> &FlowSnapshot {
        &self.snapshot
    }

    /// Subscribe to `(event, state)` updates. Receivers only see the latest pair.
    pub fn subscribe(&self) -> watch::Receiver<FlowSnapshot> {
        self.publisher.subscribe()
    }

    pub fn history(&self) -> &StateHistory {
        &self.history
    }

    /// Id of the flow attempt in progress, if any.
    pub fn session_id(&self) -> Option<Uuid> {
        self.session
    }

    pub fn is_final(&self) -> bool {
        self.snapshot.state.is_final()
    }

    /// Apply `event` and return the new state.
    ///
    /// On error nothing changes: no state update is published and no
    /// breadcrumb is recorded.
    pub fn transition(&mut self, event: ChangePinEvent) -> Result<ChangePinState, TransitionError> {
        let from = &self.snapshot.state;
        debug!("{}  ===={}===>  ???", from.name(), event.name());

        let next = match next_state(from, &event) {
            Ok(next) => next,
            Err(error) => {
                warn!("{}  ===={}===>  rejected: {}", from.name(), event.name(), error);
                return Err(error);
            }
        };

        if matches!(event, ChangePinEvent::StartPinChange { .. }) {
            self.session = Some(Uuid::new_v4());
        }

        let breadcrumb = StateTransition::between(from, &event, &next, self.session);
        debug!("{}", breadcrumb.describe());
        self.history = self.history.record(breadcrumb);

        if matches!(event, ChangePinEvent::Invalidate) {
            self.session = None;
        }

        self.snapshot = FlowSnapshot {
            event,
            state: next.clone(),
        };
        self.publisher.send_replace(self.snapshot.clone());
        Ok(next)
    }
}
