//! Values threaded through one change-PIN attempt.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A secret typed by the user: transport PIN, personal PIN or CAN.
///
/// `Debug` never prints the digits, so states and events carrying a `Pin`
/// are safe to log.
///
/// Serialization is NOT redacted: `Serialize` writes the digits in plain
/// text, and so does every type embedding a `Pin` (`FlowContext`,
/// `ChangePinState`, `ChangePinEvent`, `FlowSnapshot`). Never persist or
/// transmit those values; log them with `Debug` or record breadcrumbs,
/// which carry names only.
///
/// ```rust
/// use pinflow::flow::Pin;
///
/// let pin = Pin::new("123456");
/// assert_eq!(format!("{pin:?}"), "Pin(******)");
/// assert_eq!(pin.expose(), "123456");
/// assert_eq!(serde_json::to_string(&pin).unwrap(), "\"123456\"");
/// ```
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pin(String);

impl Pin {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The raw digits, for handing to the card.
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Pin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pin({})", "*".repeat(self.len()))
    }
}

impl From<&str> for Pin {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Pin {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Flags fixed by `StartPinChange` and carried unchanged to the end of the flow.
///
/// They select routing and copy in the UI; the transition table never looks at them.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinChangeFlags {
    /// An identification is waiting to run once the PIN is set.
    pub identification_pending: bool,
    /// The old secret is the 5-digit transport PIN from the PIN letter.
    pub transport_pin: bool,
}

impl PinChangeFlags {
    pub fn new(identification_pending: bool, transport_pin: bool) -> Self {
        Self {
            identification_pending,
            transport_pin,
        }
    }
}

/// Everything needed to talk to the card: flags plus both secrets.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowContext {
    pub flags: PinChangeFlags,
    pub old_pin: Pin,
    pub new_pin: Pin,
}

impl FlowContext {
    pub fn new(flags: PinChangeFlags, old_pin: Pin, new_pin: Pin) -> Self {
        Self {
            flags,
            old_pin,
            new_pin,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_output_hides_digits() {
        let context = FlowContext::new(
            PinChangeFlags::new(false, true),
            Pin::new("12345"),
            Pin::new("987654"),
        );

        let rendered = format!("{context:?}");
        assert!(!rendered.contains("12345"));
        assert!(!rendered.contains("987654"));
        assert!(rendered.contains("Pin(*****)"));
    }

    #[test]
    fn pin_serializes_as_plain_string() {
        let json = serde_json::to_string(&Pin::new("123456")).unwrap();
        assert_eq!(json, "\"123456\"");
    }

    #[test]
    fn serialized_context_exposes_secrets_debug_does_not() {
        let context = FlowContext::new(
            PinChangeFlags::new(false, true),
            Pin::new("12345"),
            Pin::new("987654"),
        );

        let json = serde_json::to_string(&context).unwrap();

        assert!(json.contains("12345"));
        assert!(json.contains("987654"));
        assert!(!format!("{context:?}").contains("987654"));
    }

    #[test]
    fn pin_length_counts_characters() {
        assert_eq!(Pin::from("12345").len(), 5);
        assert!(Pin::from(String::new()).is_empty());
    }
}
