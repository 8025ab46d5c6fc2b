//! Classification traits for machine states and events.
//!
//! Both traits are pure: they only inspect a value and never change it.
//! The breadcrumb trail and the log lines are built from these names, so a
//! name must never expose the payload of a variant.

use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Trait for state machine states.
///
/// # Example
///
/// ```rust
/// use pinflow::core::State;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
/// enum ScanState {
///     Waiting,
///     Reading,
///     Done,
///     Failed,
/// }
///
/// impl State for ScanState {
///     fn name(&self) -> &str {
///         match self {
///             Self::Waiting => "Waiting",
///             Self::Reading => "Reading",
///             Self::Done => "Done",
///             Self::Failed => "Failed",
///         }
///     }
///
///     fn is_final(&self) -> bool {
///         matches!(self, Self::Done | Self::Failed)
///     }
///
///     fn is_error(&self) -> bool {
///         matches!(self, Self::Failed)
///     }
/// }
///
/// assert!(ScanState::Failed.is_final());
/// assert!(!ScanState::Reading.is_error());
/// ```
pub trait State:
    Clone + PartialEq + Debug + Serialize + for<'de> Deserialize<'de> + Send + Sync
{
    /// Get the state's name for display/logging.
    fn name(&self) -> &str;

    /// Check if this is a final (terminal) state.
    ///
    /// Final states end a flow attempt. Default implementation returns `false`.
    fn is_final(&self) -> bool {
        false
    }

    /// Check if this is an error state.
    ///
    /// Error states are not necessarily final: a recoverable failure may
    /// still offer a way back into the flow. Default implementation returns
    /// `false`.
    fn is_error(&self) -> bool {
        false
    }
}

/// Trait for inputs fed to a state machine.
pub trait Event: Clone + PartialEq + Debug + Send + Sync {
    /// Get the event's name for display/logging.
    fn name(&self) -> &str;
}
