//! Builder for flow configuration.

use crate::config::error::ConfigError;
use crate::config::FlowConfig;
use crate::policy::PinPolicy;

/// Builder for [`FlowConfig`] with a fluent API. Unset fields keep their defaults.
#[derive(Debug, Clone, Default)]
pub struct FlowConfigBuilder {
    config: FlowConfig,
}

impl FlowConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transport_pin_length(mut self, length: usize) -> Self {
        self.config.pin_policy.transport_pin_length = length;
        self
    }

    pub fn personal_pin_length(mut self, length: usize) -> Self {
        self.config.pin_policy.personal_pin_length = length;
        self
    }

    pub fn can_length(mut self, length: usize) -> Self {
        self.config.pin_policy.can_length = length;
        self
    }

    /// Replace the whole policy.
    pub fn pin_policy(mut self, policy: PinPolicy) -> Self {
        self.config.pin_policy = policy;
        self
    }

    /// Keep at most `limit` breadcrumbs.
    pub fn breadcrumb_limit(mut self, limit: usize) -> Self {
        self.config.breadcrumb_limit = Some(limit);
        self
    }

    /// Keep every breadcrumb.
    pub fn unbounded_breadcrumbs(mut self) -> Self {
        self.config.breadcrumb_limit = None;
        self
    }

    /// Build the configuration.
    /// Returns an error if a value is out of range.
    pub fn build(self) -> Result<FlowConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::SecretKind;

    #[test]
    fn builder_keeps_defaults() {
        let config = FlowConfigBuilder::new().build().unwrap();
        assert_eq!(config, FlowConfig::default());
    }

    #[test]
    fn fluent_api_builds_config() {
        let config = FlowConfigBuilder::new()
            .transport_pin_length(5)
            .personal_pin_length(8)
            .can_length(6)
            .breadcrumb_limit(32)
            .build()
            .unwrap();

        assert_eq!(config.pin_policy.personal_pin_length, 8);
        assert_eq!(config.breadcrumb_limit, Some(32));
    }

    #[test]
    fn builder_rejects_zero_length() {
        let result = FlowConfigBuilder::new().can_length(0).build();

        assert!(matches!(
            result,
            Err(ConfigError::InvalidSecretLength {
                kind: SecretKind::Can,
                length: 0
            })
        ));
    }

    #[test]
    fn builder_rejects_zero_breadcrumb_limit() {
        let result = FlowConfigBuilder::new().breadcrumb_limit(0).build();
        assert!(matches!(result, Err(ConfigError::ZeroBreadcrumbLimit)));
    }

    #[test]
    fn unbounded_breadcrumbs_clears_limit() {
        let config = FlowConfigBuilder::new()
            .unbounded_breadcrumbs()
            .build()
            .unwrap();
        assert_eq!(config.breadcrumb_limit, None);
    }
}
