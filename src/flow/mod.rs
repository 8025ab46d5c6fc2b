//! The PIN/CAN/PUK change protocol state machine.
//!
//! The card firmware decides at runtime whether it wants the PIN, the CAN
//! or the PUK next, and every wrong answer advances a retry counter on the
//! card. The machine encodes which answers are legal at which point:
//! [`next_state`] is the pure transition table, [`ChangePinStateMachine`]
//! owns the current state, publishes it and keeps a breadcrumb trail.
//!
//! Illegal combinations are rejected with
//! [`TransitionError::IllegalTransition`] instead of being ignored, and a
//! mismatching new-PIN confirmation is a separate
//! [`TransitionError::PinMismatch`] that leaves the machine in
//! `NewPinConfirmation`.

mod context;
mod error;
mod event;
mod machine;
mod state;

pub use context::{FlowContext, Pin, PinChangeFlags};
pub use error::TransitionError;
pub use event::ChangePinEvent;
pub use machine::{next_state, ChangePinStateMachine, FlowSnapshot};
pub use state::ChangePinState;
