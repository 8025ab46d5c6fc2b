//! Card-event normalization adapter.
//!
//! Turns the card framework's asynchronous callbacks into one ordered stream
//! of [`EidInteractionEvent`]s and forwards the coordinators' answers
//! (PIN, new PIN, CAN) back to the framework.
//!
//! # Example
//!
//! ```rust
//! use pinflow::eid::{EidInteractionEvent, EidInteractionManager, WorkflowCallback, WorkflowController};
//!
//! struct Offline;
//!
//! impl WorkflowController for Offline {
//!     fn start(&self) {}
//!     fn stop(&self) {}
//!     fn start_change_pin(&self) {}
//!     fn start_authentication(&self, _tc_token_url: &str) {}
//!     fn set_pin(&self, _pin: &str) {}
//!     fn set_new_pin(&self, _pin: &str) {}
//!     fn set_can(&self, _can: &str) {}
//! }
//!
//! let (manager, mut events) = EidInteractionManager::new(Offline);
//! manager.change_pin().unwrap();
//! manager.handle_callback(WorkflowCallback::InsertCard { error: None });
//! manager.cancel_task();
//!
//! assert_eq!(events.try_next(), Some(EidInteractionEvent::CardInsertionRequested));
//! assert_eq!(events.try_next(), Some(EidInteractionEvent::Idle));
//! ```

pub mod error;
pub mod event;
pub mod manager;
pub mod sdk;

pub use error::{EidError, EidInteractionError, RedactedEidInteractionError};
pub use event::EidInteractionEvent;
pub use manager::{normalize, EidEventStream, EidInteractionManager, EidTask};
pub use sdk::{AuthResult, Card, Reader, ResultCodes, WorkflowCallback, WorkflowController};
