//! Wiring between the change-PIN machine, the user and the card.
//!
//! [`ChangePinCoordinator`] turns user actions into machine events, feeds
//! normalized card events through [`machine_event_for`], and after every
//! transition runs the card command the new state calls for
//! ([`command_for`]) as an effect against a [`CardCommands`] environment.
//! In production that environment is an
//! [`EidInteractionManager`](crate::eid::EidInteractionManager); tests plug
//! in a recorder.

mod bridge;
mod commands;
#[allow(clippy::module_inception)]
mod coordinator;

pub use bridge::machine_event_for;
pub use commands::{command_for, execute, CardCommand, CardCommands};
pub use coordinator::{ChangePinCoordinator, Confirmation, CoordinatorError};
