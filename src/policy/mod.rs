//! Format validation for the secrets a user types.
//!
//! Uses Stillwater's `Validation` so a single check reports every problem
//! with the input (wrong length AND a stray letter), not just the first.
//!
//! # Example
//!
//! ```rust
//! use pinflow::policy::{PinPolicy, SecretKind};
//!
//! let policy = PinPolicy::default();
//! assert!(policy.validate(SecretKind::TransportPin, "12345").is_success());
//!
//! let violations = policy.check(SecretKind::PersonalPin, "12x").unwrap_err();
//! assert_eq!(violations.len(), 2);
//! ```

pub mod rules;
pub mod violations;

pub use rules::{PinPolicy, CAN_LENGTH, PERSONAL_PIN_LENGTH, TRANSPORT_PIN_LENGTH};
pub use violations::{PinViolation, SecretKind};
