//! Breadcrumb trail of state transitions.
//!
//! Only names are recorded, never state payloads, so the trail can be
//! attached to diagnostics without leaking secrets carried by a state.

use super::state::{Event, State};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;
use uuid::Uuid;

/// Record of a single state transition.
///
/// # Example
///
/// ```rust
/// use pinflow::core::StateTransition;
/// use chrono::Utc;
///
/// let transition = StateTransition {
///     from: "Invalid".to_string(),
///     via: "StartPinChange".to_string(),
///     to: "OldPinInput".to_string(),
///     timestamp: Utc::now(),
///     session: None,
/// };
/// assert_eq!(transition.describe(), "Invalid  ====StartPinChange===>  OldPinInput");
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StateTransition {
    /// Name of the state being left
    pub from: String,
    /// Name of the event that caused the transition
    pub via: String,
    /// Name of the state being entered
    pub to: String,
    /// When the transition occurred
    pub timestamp: DateTime<Utc>,
    /// Flow session the transition belongs to, if one was open
    pub session: Option<Uuid>,
}

impl StateTransition {
    /// Build a record from the actual state and event values.
    pub fn between<S: State, E: Event>(from: &S, via: &E, to: &S, session: Option<Uuid>) -> Self {
        Self {
            from: from.name().to_string(),
            via: via.name().to_string(),
            to: to.name().to_string(),
            timestamp: Utc::now(),
            session,
        }
    }

    /// Single-line description used for logs.
    pub fn describe(&self) -> String {
        format!("{}  ===={}===>  {}", self.from, self.via, self.to)
    }
}

/// Ordered, optionally bounded history of state transitions.
///
/// History is immutable: `record` returns a new history with the transition
/// added. When a limit is set, the oldest entries are dropped first.
///
/// # Example
///
/// ```rust
/// use pinflow::core::{StateHistory, StateTransition};
/// use chrono::Utc;
///
/// let step = |from: &str, to: &str| StateTransition {
///     from: from.to_string(),
///     via: "Next".to_string(),
///     to: to.to_string(),
///     timestamp: Utc::now(),
///     session: None,
/// };
///
/// let history = StateHistory::new()
///     .record(step("A", "B"))
///     .record(step("B", "C"));
///
/// assert_eq!(history.get_path(), vec!["A", "B", "C"]);
/// ```
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StateHistory {
    transitions: VecDeque<StateTransition>,
    limit: Option<usize>,
}

impl StateHistory {
    /// Create a new, unbounded, empty history.
    pub fn new() -> Self {
        Self {
            transitions: VecDeque::new(),
            limit: None,
        }
    }

    /// Create an empty history keeping at most `limit` entries.
    pub fn bounded(limit: usize) -> Self {
        Self {
            transitions: VecDeque::new(),
            limit: Some(limit),
        }
    }

    /// Record a transition, returning a new history.
    pub fn record(&self, transition: StateTransition) -> Self {
        let mut transitions = self.transitions.clone();
        transitions.push_back(transition);
        if let Some(limit) = self.limit {
            while transitions.len() > limit {
                transitions.pop_front();
            }
        }
        Self {
            transitions,
            limit: self.limit,
        }
    }

    /// Names of the states traversed: the first recorded `from`, then the
    /// `to` of each transition.
    pub fn get_path(&self) -> Vec<&str> {
        let mut path = Vec::new();
        if let Some(first) = self.transitions.front() {
            path.push(first.from.as_str());
        }
        for transition in &self.transitions {
            path.push(transition.to.as_str());
        }
        path
    }

    /// Elapsed time between the first and last recorded transition.
    pub fn duration(&self) -> Option<Duration> {
        if let (Some(first), Some(last)) = (self.transitions.front(), self.transitions.back()) {
            last.timestamp
                .signed_duration_since(first.timestamp)
                .to_std()
                .ok()
        } else {
            None
        }
    }

    /// All retained transitions, oldest first.
    pub fn transitions(&self) -> impl Iterator<Item = &StateTransition> {
        self.transitions.iter()
    }

    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }

    pub fn last(&self) -> Option<&StateTransition> {
        self.transitions.back()
    }
}
