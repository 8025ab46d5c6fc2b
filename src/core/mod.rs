//! Core state machine abstractions.
//!
//! This module contains the pure, domain-neutral pieces shared by the flow:
//! - State and event classification via the `State` and `Event` traits
//! - Immutable breadcrumb history of transitions
//!
//! Nothing in here performs I/O.

mod history;
mod state;

pub use history::{StateHistory, StateTransition};
pub use state::{Event, State};
