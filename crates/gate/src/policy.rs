//! The global size policy.
//!
//! A [`PolicyStore`] holds two defaults: one for destinations the routing table
//! recognizes and one for everything else. It is validated once by
//! [`PolicyStoreBuilder::build`] and never mutated afterwards; share it behind an `Arc`.
//!
//! Validation rules:
//! - a negative byte count fails, it is never clamped to zero
//! - assigning a slot twice with different values fails
//! - `AlwaysReject` and `NeverCheck` are refused for the recognized slot
//! - an absent slot is [`SizeLimit::Unset`], never "zero bytes allowed"

use std::fmt;
use std::fmt::{Display, Formatter};

use crate::config::PolicyConfig;
use crate::error::ConfigError;
use crate::limit::{RequestInfo, SizeLimit};
use crate::utils::ensure;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PolicySlot {
    Recognized,
    Unrecognized,
}

impl Display for PolicySlot {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Recognized => f.write_str("recognized"),
            Self::Unrecognized => f.write_str("unrecognized"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PolicyStore {
    recognized_default: SizeLimit,
    unrecognized_default: SizeLimit,
}

impl PolicyStore {
    pub fn builder() -> PolicyStoreBuilder {
        PolicyStoreBuilder::new()
    }

    /// A policy enforcing no limit anywhere
    pub fn unlimited() -> Self {
        Self::default()
    }

    pub fn from_config(config: PolicyConfig) -> Result<Self, ConfigError> {
        Self::builder().config(config).build()
    }

    pub fn recognized_default(&self) -> &SizeLimit {
        &self.recognized_default
    }

    pub fn unrecognized_default(&self) -> &SizeLimit {
        &self.unrecognized_default
    }

    #[inline]
    pub fn default_for(&self, recognized: bool) -> &SizeLimit {
        if recognized { &self.recognized_default } else { &self.unrecognized_default }
    }
}

impl TryFrom<PolicyConfig> for PolicyStore {
    type Error = ConfigError;

    fn try_from(config: PolicyConfig) -> Result<Self, Self::Error> {
        Self::from_config(config)
    }
}

#[derive(Debug, Default)]
pub struct PolicyStoreBuilder {
    recognized: Option<SizeLimit>,
    unrecognized: Option<SizeLimit>,
    // the first error wins, later assignments are ignored
    error: Option<ConfigError>,
}

impl PolicyStoreBuilder {
    fn new() -> Self {
        Self::default()
    }

    pub fn recognized(self, limit: impl Into<SizeLimit>) -> Self {
        self.assign(PolicySlot::Recognized, limit.into())
    }

    pub fn unrecognized(self, limit: impl Into<SizeLimit>) -> Self {
        self.assign(PolicySlot::Unrecognized, limit.into())
    }

    pub fn recognized_predicate<F>(self, f: F) -> Self
    where
        F: Fn(&RequestInfo<'_>, Option<u64>) -> bool + Send + Sync + 'static,
    {
        self.assign(PolicySlot::Recognized, SizeLimit::predicate(f))
    }

    pub fn unrecognized_predicate<F>(self, f: F) -> Self
    where
        F: Fn(&RequestInfo<'_>, Option<u64>) -> bool + Send + Sync + 'static,
    {
        self.assign(PolicySlot::Unrecognized, SizeLimit::predicate(f))
    }

    /// Applies the slots present in a serialized config; absent slots are left untouched.
    pub fn config(mut self, config: PolicyConfig) -> Self {
        for (slot, value) in [(PolicySlot::Recognized, config.recognized), (PolicySlot::Unrecognized, config.unrecognized)] {
            let Some(value) = value else {
                continue;
            };

            self = match value.into_size_limit(slot) {
                Ok(limit) => self.assign(slot, limit),
                Err(e) => self.fail(e),
            };
        }
        self
    }

    pub fn build(self) -> Result<PolicyStore, ConfigError> {
        if let Some(e) = self.error {
            return Err(e);
        }

        let recognized_default = self.recognized.unwrap_or_default();
        ensure!(
            !recognized_default.is_unrecognized_only(),
            ConfigError::shape_not_allowed(PolicySlot::Recognized, &recognized_default)
        );

        Ok(PolicyStore { recognized_default, unrecognized_default: self.unrecognized.unwrap_or_default() })
    }

    fn assign(mut self, slot: PolicySlot, limit: SizeLimit) -> Self {
        if self.error.is_some() {
            return self;
        }

        let current = match slot {
            PolicySlot::Recognized => &mut self.recognized,
            PolicySlot::Unrecognized => &mut self.unrecognized,
        };

        match current {
            Some(existing) if *existing != limit => {
                let error = ConfigError::conflicting(slot, &*existing, &limit);
                self.fail(error)
            }
            _ => {
                *current = Some(limit);
                self
            }
        }
    }

    fn fail(mut self, error: ConfigError) -> Self {
        self.error.get_or_insert(error);
        self
    }
}
