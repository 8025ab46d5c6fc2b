//! Flow configuration: secret formats and breadcrumb retention.
//!
//! Built with [`FlowConfigBuilder`] or loaded from JSON; both paths validate.
//!
//! ```rust
//! use pinflow::config::FlowConfig;
//!
//! let config = FlowConfig::from_json(r#"{ "breadcrumb_limit": 64 }"#).unwrap();
//! assert_eq!(config.breadcrumb_limit, Some(64));
//! assert_eq!(config.pin_policy.transport_pin_length, 5);
//! ```

pub mod builder;
pub mod error;

pub use builder::FlowConfigBuilder;
pub use error::ConfigError;

use serde::{Deserialize, Serialize};

use crate::policy::{PinPolicy, SecretKind};

pub const DEFAULT_BREADCRUMB_LIMIT: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowConfig {
    pub pin_policy: PinPolicy,
    /// Maximum breadcrumbs kept by the machine; `None` keeps all.
    pub breadcrumb_limit: Option<usize>,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            pin_policy: PinPolicy::default(),
            breadcrumb_limit: Some(DEFAULT_BREADCRUMB_LIMIT),
        }
    }
}

impl FlowConfig {
    pub fn builder() -> FlowConfigBuilder {
        FlowConfigBuilder::new()
    }

    /// Parse and validate a JSON document. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for kind in [SecretKind::TransportPin, SecretKind::PersonalPin, SecretKind::Can] {
            let length = self.pin_policy.length_of(kind);
            if length == 0 {
                return Err(ConfigError::InvalidSecretLength { kind, length });
            }
        }
        if self.breadcrumb_limit == Some(0) {
            return Err(ConfigError::ZeroBreadcrumbLimit);
        }
        Ok(())
    }
}
