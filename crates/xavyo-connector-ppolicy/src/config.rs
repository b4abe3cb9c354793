//! Mapper configuration.
//!
//! The lockout duration is stored the way the admin console stores component
//! options: as a string. It is parsed and validated when the mapper is
//! built, so a bad value is reported once instead of on every lookup.

use serde::{Deserialize, Serialize};

use crate::error::{PpolicyError, PpolicyResult};
use crate::lockout::LockoutPolicy;

/// Component option holding the lockout duration in seconds.
pub const CONFIG_LOCKOUT_DURATION: &str = "ldap.ppolicy.lockout.duration";

/// Kind of value a configuration property accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigPropertyType {
    String,
}

/// Metadata describing one configuration option to the admin console.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigProperty {
    pub name: String,
    pub label: String,
    pub help_text: String,
    #[serde(rename = "type")]
    pub property_type: ConfigPropertyType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
}

/// Configuration for the ppolicy mapper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PpolicyMapperConfig {
    /// Seconds an account stays locked after a lockout; `"0"` means forever.
    #[serde(
        rename = "ldap.ppolicy.lockout.duration",
        default = "default_lockout_duration"
    )]
    pub lockout_duration: String,

    /// Lock-time scheme used by the directory.
    #[serde(default)]
    pub policy: LockoutPolicy,
}

fn default_lockout_duration() -> String {
    "0".to_string()
}

impl Default for PpolicyMapperConfig {
    fn default() -> Self {
        Self {
            lockout_duration: default_lockout_duration(),
            policy: LockoutPolicy::default(),
        }
    }
}

impl PpolicyMapperConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the component's JSON configuration.
    ///
    /// # Errors
    ///
    /// Returns [`PpolicyError::InvalidConfiguration`] if the JSON does not
    /// match the expected shape or fails validation.
    pub fn from_json(value: serde_json::Value) -> PpolicyResult<Self> {
        let config: Self = serde_json::from_value(value).map_err(|e| {
            PpolicyError::invalid_configuration(format!("malformed mapper configuration: {e}"))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Set the lockout duration in seconds.
    #[must_use]
    pub fn with_lockout_duration(mut self, secs: u64) -> Self {
        self.lockout_duration = secs.to_string();
        self
    }

    /// Set the lock-time scheme.
    #[must_use]
    pub fn with_policy(mut self, policy: LockoutPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Lockout duration in seconds.
    ///
    /// # Errors
    ///
    /// Returns [`PpolicyError::InvalidConfiguration`] unless the stored value
    /// is a non-negative integer.
    pub fn lockout_duration_secs(&self) -> PpolicyResult<u64> {
        let raw = self.lockout_duration.trim();
        raw.parse::<u64>().map_err(|_| {
            PpolicyError::invalid_configuration(format!(
                "{CONFIG_LOCKOUT_DURATION} must be a non-negative number of seconds, got '{raw}'"
            ))
        })
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`PpolicyError::InvalidConfiguration`] on an invalid duration.
    pub fn validate(&self) -> PpolicyResult<()> {
        self.lockout_duration_secs().map(|_| ())
    }

    /// Options exposed to the admin console.
    pub fn config_properties() -> Vec<ConfigProperty> {
        vec![ConfigProperty {
            name: CONFIG_LOCKOUT_DURATION.to_string(),
            label: "ppolicy pwdLockoutDuration".to_string(),
            help_text: "Time in seconds the user is locked out of their account after a \
                        lockout incident. Set this to the value in pwdLockoutDuration. \
                        0 means forever."
                .to_string(),
            property_type: ConfigPropertyType::String,
            default_value: Some(default_lockout_duration()),
        }]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_config() {
        let config = PpolicyMapperConfig::new();
        assert_eq!(config.lockout_duration, "0");
        assert_eq!(config.lockout_duration_secs().unwrap(), 0);
        assert_eq!(config.policy, LockoutPolicy::Ppolicy);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_json() {
        let config = PpolicyMapperConfig::from_json(json!({
            "ldap.ppolicy.lockout.duration": "300",
            "policy": "legacy"
        }))
        .unwrap();

        assert_eq!(config.lockout_duration_secs().unwrap(), 300);
        assert_eq!(config.policy, LockoutPolicy::Legacy);
    }

    #[test]
    fn test_from_json_defaults() {
        let config = PpolicyMapperConfig::from_json(json!({})).unwrap();
        assert_eq!(config, PpolicyMapperConfig::default());
    }

    #[test]
    fn test_invalid_durations_rejected() {
        for raw in ["-1", "five", "", "1.5"] {
            let config = PpolicyMapperConfig {
                lockout_duration: raw.to_string(),
                ..PpolicyMapperConfig::default()
            };
            let err = config.validate().unwrap_err();
            assert!(
                matches!(err, PpolicyError::InvalidConfiguration { .. }),
                "expected '{raw}' to be rejected"
            );
        }
    }

    #[test]
    fn test_from_json_rejects_bad_shape() {
        let err = PpolicyMapperConfig::from_json(json!({ "policy": "sunbird" })).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_CONFIG");

        let err = PpolicyMapperConfig::from_json(json!({
            "ldap.ppolicy.lockout.duration": "-30"
        }))
        .unwrap_err();
        assert_eq!(err.error_code(), "INVALID_CONFIG");
    }

    #[test]
    fn test_whitespace_tolerated() {
        let config = PpolicyMapperConfig {
            lockout_duration: " 600 ".to_string(),
            ..PpolicyMapperConfig::default()
        };
        assert_eq!(config.lockout_duration_secs().unwrap(), 600);
    }

    #[test]
    fn test_builder() {
        let config = PpolicyMapperConfig::new()
            .with_lockout_duration(900)
            .with_policy(LockoutPolicy::Legacy);
        assert_eq!(config.lockout_duration, "900");
        assert_eq!(config.policy, LockoutPolicy::Legacy);
    }

    #[test]
    fn test_config_properties() {
        let props = PpolicyMapperConfig::config_properties();
        assert_eq!(props.len(), 1);
        assert_eq!(props[0].name, CONFIG_LOCKOUT_DURATION);
        assert_eq!(props[0].label, "ppolicy pwdLockoutDuration");
        assert_eq!(props[0].property_type, ConfigPropertyType::String);
        assert_eq!(props[0].default_value.as_deref(), Some("0"));
        assert!(props[0].help_text.ends_with("0 means forever."));
    }
}
