//! Secret kinds and the ways an entered secret can be malformed.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Which secret the user is typing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SecretKind {
    /// 5-digit PIN from the PIN letter
    TransportPin,
    /// Self-chosen 6-digit PIN
    PersonalPin,
    /// Card Access Number printed on the card
    Can,
}

impl fmt::Display for SecretKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TransportPin => write!(f, "transport PIN"),
            Self::PersonalPin => write!(f, "personal PIN"),
            Self::Can => write!(f, "CAN"),
        }
    }
}

/// A format problem with an entered secret.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PinViolation {
    #[error("{kind} is empty")]
    Empty { kind: SecretKind },

    #[error("{kind} must have {expected} digits (got {actual})")]
    WrongLength {
        kind: SecretKind,
        expected: usize,
        actual: usize,
    },

    #[error("{kind} contains a non-digit at position {position}")]
    NonDigit { kind: SecretKind, position: usize },
}
