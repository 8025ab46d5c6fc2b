//! Card-level failures and adapter usage errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::manager::EidTask;

/// Failures reported by the card or the card framework.
///
/// These travel inside [`EidInteractionEvent::Error`](super::EidInteractionEvent::Error)
/// and are fed to the change-PIN machine unchanged.
#[derive(Clone, Debug, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum EidInteractionError {
    #[error("card framework error: {message}")]
    FrameworkError { message: String },

    #[error("card blocked, PUK required")]
    CardBlocked,

    #[error("card deactivated")]
    CardDeactivated,

    #[error("process failed (result minor: {result_minor:?}, reason: {result_reason:?})")]
    ProcessFailed {
        redirect_url: Option<String>,
        result_minor: Option<String>,
        result_reason: Option<String>,
    },

    #[error("changing the PIN failed")]
    ChangingPinFailed,

    #[error("unknown card reader")]
    UnknownReader,
}

impl EidInteractionError {
    pub fn framework(message: impl Into<String>) -> Self {
        Self::FrameworkError {
            message: message.into(),
        }
    }

    /// Form safe to hand to an issue tracker.
    ///
    /// Card state errors carry no diagnostic value and map to `None`;
    /// redirect URLs are dropped since they may contain session tokens.
    pub fn redacted(&self) -> Option<RedactedEidInteractionError> {
        match self {
            Self::FrameworkError { .. } => Some(RedactedEidInteractionError::FrameworkError),
            Self::ProcessFailed {
                result_minor,
                result_reason,
                ..
            } => Some(RedactedEidInteractionError::ProcessFailed {
                result_minor: result_minor.clone(),
                result_reason: result_reason.clone(),
            }),
            Self::ChangingPinFailed => Some(RedactedEidInteractionError::ChangingPinFailed),
            Self::CardBlocked | Self::CardDeactivated | Self::UnknownReader => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum RedactedEidInteractionError {
    #[error("framework error")]
    FrameworkError,

    #[error("process failed (result minor: {result_minor:?}, reason: {result_reason:?})")]
    ProcessFailed {
        result_minor: Option<String>,
        result_reason: Option<String>,
    },

    #[error("changing PIN failed")]
    ChangingPinFailed,
}

/// Misuse of the interaction manager.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum EidError {
    #[error("a {running:?} task is already running, cancel it first")]
    TaskAlreadyRunning { running: EidTask },

    #[error("no task running")]
    NoTaskRunning,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redaction_drops_redirect_url() {
        let error = EidInteractionError::ProcessFailed {
            redirect_url: Some("https://service.example/done?token=secret".to_string()),
            result_minor: Some("cardRemoved".to_string()),
            result_reason: None,
        };

        let redacted = error.redacted().unwrap();
        assert!(!redacted.to_string().contains("secret"));
        assert_eq!(
            redacted,
            RedactedEidInteractionError::ProcessFailed {
                result_minor: Some("cardRemoved".to_string()),
                result_reason: None,
            }
        );
    }

    #[test]
    fn card_state_errors_are_not_reported() {
        assert!(EidInteractionError::CardBlocked.redacted().is_none());
        assert!(EidInteractionError::CardDeactivated.redacted().is_none());
        assert!(EidInteractionError::UnknownReader.redacted().is_none());
    }

    #[test]
    fn framework_error_hides_message() {
        let error = EidInteractionError::framework("Bad state: 1234");
        assert_eq!(
            error.redacted(),
            Some(RedactedEidInteractionError::FrameworkError)
        );
    }
}
