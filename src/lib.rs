//! Pinflow: changing eID card PINs as a pure state machine
//!
//! Changing the PIN of a German eID card over NFC is a conversation with
//! the card: it may ask for the old PIN, the CAN or the PUK, retry
//! counters tick down on every wrong answer, and the user can back out or
//! remove the card at any point. Pinflow keeps that conversation in a pure
//! transition table and pushes the side effects to the edges.
//!
//! # Modules
//!
//! - [`flow`]: the change-PIN states, events and [`ChangePinStateMachine`]
//! - [`eid`]: normalizes card framework callbacks into
//!   [`EidInteractionEvent`]s and guards the single running card task
//! - [`coordinator`]: connects the two and issues card commands as effects
//! - [`policy`]: format checks for entered secrets
//! - [`config`]: secret formats and breadcrumb retention
//! - [`core`]: the `State`/`Event` traits and the breadcrumb trail
//!
//! # Example
//!
//! ```rust
//! use pinflow::flow::{ChangePinEvent, ChangePinState, ChangePinStateMachine, Pin};
//!
//! let mut machine = ChangePinStateMachine::new();
//! machine.transition(ChangePinEvent::StartPinChange {
//!     identification_pending: false,
//!     transport_pin: true,
//! }).unwrap();
//! machine.transition(ChangePinEvent::EnterOldPin(Pin::new("12345"))).unwrap();
//! machine.transition(ChangePinEvent::ConfirmNewPinIntro).unwrap();
//! machine.transition(ChangePinEvent::EnterNewPin(Pin::new("123456"))).unwrap();
//! let state = machine.transition(ChangePinEvent::ConfirmNewPin(Pin::new("123456"))).unwrap();
//!
//! assert!(matches!(state, ChangePinState::StartCardInteraction(_)));
//! assert_eq!(machine.history().len(), 5);
//! ```

pub mod config;
pub mod coordinator;
pub mod core;
pub mod eid;
pub mod flow;
pub mod policy;

// Re-export commonly used types
pub use config::FlowConfig;
pub use coordinator::{ChangePinCoordinator, CoordinatorError};
pub use core::{Event, State, StateHistory, StateTransition};
pub use eid::{EidInteractionError, EidInteractionEvent, EidInteractionManager};
pub use flow::{ChangePinEvent, ChangePinState, ChangePinStateMachine, Pin, TransitionError};
