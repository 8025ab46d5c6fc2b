//! Format rules for PINs and CANs using Validation.

use serde::{Deserialize, Serialize};
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;

use crate::flow::{Pin, PinChangeFlags};
use crate::policy::violations::{PinViolation, SecretKind};

pub const TRANSPORT_PIN_LENGTH: usize = 5;
pub const PERSONAL_PIN_LENGTH: usize = 6;
pub const CAN_LENGTH: usize = 6;

/// Expected digit counts per secret kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PinPolicy {
    pub transport_pin_length: usize,
    pub personal_pin_length: usize,
    pub can_length: usize,
}

impl Default for PinPolicy {
    fn default() -> Self {
        Self {
            transport_pin_length: TRANSPORT_PIN_LENGTH,
            personal_pin_length: PERSONAL_PIN_LENGTH,
            can_length: CAN_LENGTH,
        }
    }
}

impl PinPolicy {
    pub fn length_of(&self, kind: SecretKind) -> usize {
        match kind {
            SecretKind::TransportPin => self.transport_pin_length,
            SecretKind::PersonalPin => self.personal_pin_length,
            SecretKind::Can => self.can_length,
        }
    }

    /// Kind of the old secret in a flow started with `flags`.
    pub fn old_pin_kind(flags: PinChangeFlags) -> SecretKind {
        if flags.transport_pin {
            SecretKind::TransportPin
        } else {
            SecretKind::PersonalPin
        }
    }

    /// Check `value`, accumulating ALL violations.
    pub fn validate(
        &self,
        kind: SecretKind,
        value: &str,
    ) -> Validation<(), NonEmptyVec<PinViolation>> {
        if value.is_empty() {
            return Validation::fail(PinViolation::Empty { kind });
        }

        let expected = self.length_of(kind);
        let actual = value.chars().count();
        let length = if actual == expected {
            Validation::success(())
        } else {
            Validation::fail(PinViolation::WrongLength {
                kind,
                expected,
                actual,
            })
        };

        let digits = match value.chars().position(|c| !c.is_ascii_digit()) {
            Some(position) => Validation::fail(PinViolation::NonDigit { kind, position }),
            None => Validation::success(()),
        };

        Validation::all_vec(vec![length, digits]).map(|_| ())
    }

    /// Validate and wrap `value` as a [`Pin`].
    pub fn check(&self, kind: SecretKind, value: &str) -> Result<Pin, Vec<PinViolation>> {
        match self.validate(kind, value) {
            Validation::Success(_) => Ok(Pin::new(value)),
            Validation::Failure(errors) => Err(errors.iter().cloned().collect()),
        }
    }
}
