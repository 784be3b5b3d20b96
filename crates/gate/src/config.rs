//! Serialized configuration surface for the global policy.
//!
//! ```json
//! { "recognized": 1048576, "unrecognized": true }
//! ```
//!
//! Each slot accepts: absent or `null` (no limit), a non-negative integer (bytes), or a
//! boolean, `true` meaning always reject and `false` meaning never check. Booleans are
//! only valid for the `unrecognized` slot; the check happens when the
//! [`PolicyStore`](crate::PolicyStore) is built. Predicates can't be serialized and are
//! attached on the [`PolicyStoreBuilder`](crate::PolicyStoreBuilder) instead.

use serde::Deserialize;

use crate::error::ConfigError;
use crate::limit::SizeLimit;
use crate::policy::PolicySlot;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyConfig {
    #[serde(default)]
    pub recognized: Option<LimitValue>,
    #[serde(default)]
    pub unrecognized: Option<LimitValue>,
}

/// One slot as written in the configuration.
///
/// Integers are read as `u64` first, so the whole byte range is accepted. A negative
/// integer lands in `Negative` and is refused when the policy is built, with the value
/// in the error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum LimitValue {
    Flag(bool),
    Bytes(u64),
    Negative(i64),
}

impl PolicyConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::invalid(e.to_string()))
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self, ConfigError> {
        serde_json::from_value(value).map_err(|e| ConfigError::invalid(e.to_string()))
    }
}

impl LimitValue {
    pub(crate) fn into_size_limit(self, slot: PolicySlot) -> Result<SizeLimit, ConfigError> {
        match self {
            Self::Flag(true) => Ok(SizeLimit::AlwaysReject),
            Self::Flag(false) => Ok(SizeLimit::NeverCheck),
            Self::Bytes(value) => Ok(SizeLimit::Numeric(value)),
            Self::Negative(value) => Err(ConfigError::negative(slot, value)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_config() {
        let config = PolicyConfig::from_json(r#"{"recognized": 1000, "unrecognized": 500}"#).unwrap();

        assert_eq!(config.recognized, Some(LimitValue::Bytes(1000)));
        assert_eq!(config.unrecognized, Some(LimitValue::Bytes(500)));
    }

    #[test]
    fn absent_and_null_are_unset() {
        let config = PolicyConfig::from_json(r#"{"recognized": null}"#).unwrap();

        assert_eq!(config, PolicyConfig::default());
    }

    #[test]
    fn booleans_are_flags() {
        let config = PolicyConfig::from_json(r#"{"unrecognized": true}"#).unwrap();
        assert_eq!(config.unrecognized, Some(LimitValue::Flag(true)));
        assert_eq!(LimitValue::Flag(true).into_size_limit(PolicySlot::Unrecognized), Ok(SizeLimit::AlwaysReject));
        assert_eq!(LimitValue::Flag(false).into_size_limit(PolicySlot::Unrecognized), Ok(SizeLimit::NeverCheck));
    }

    #[test]
    fn negative_bytes_fail() {
        let config = PolicyConfig::from_json(r#"{"recognized": -1}"#).unwrap();

        assert_eq!(
            config.recognized.unwrap().into_size_limit(PolicySlot::Recognized),
            Err(ConfigError::negative(PolicySlot::Recognized, -1))
        );
    }

    #[test]
    fn full_u64_range_is_accepted() {
        let config = PolicyConfig::from_json(r#"{"recognized": 18446744073709551615}"#).unwrap();

        assert_eq!(config.recognized, Some(LimitValue::Bytes(u64::MAX)));
        assert_eq!(config.recognized.unwrap().into_size_limit(PolicySlot::Recognized), Ok(SizeLimit::Numeric(u64::MAX)));
    }

    #[test]
    fn malformed_config_is_rejected() {
        assert!(matches!(PolicyConfig::from_json(r#"{"recognized": "1mb"}"#), Err(ConfigError::Invalid { .. })));
        assert!(matches!(PolicyConfig::from_json(r#"{"recognized": 1.5}"#), Err(ConfigError::Invalid { .. })));
        assert!(matches!(PolicyConfig::from_json(r#"{"recognised": 10}"#), Err(ConfigError::Invalid { .. })));
    }
}
