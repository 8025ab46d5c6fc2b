//! Configuration errors.

use thiserror::Error;

use crate::policy::SecretKind;

/// Errors that can occur when building or loading a [`FlowConfig`](super::FlowConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid {kind} length {length}. Secrets need at least one digit")]
    InvalidSecretLength { kind: SecretKind, length: usize },

    #[error("Breadcrumb limit must be at least 1. Leave it unset for an unbounded trail")]
    ZeroBreadcrumbLimit,

    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}
