//! Effective limit resolution.
//!
//! The first defined value wins:
//!
//! 1. the destination's override, when the destination is recognized and carries one
//! 2. the destination's own declared cap
//! 3. the policy default for the recognition status
//!
//! An override of `null` is a defined value: it resolves to [`SizeLimit::Unset`] and
//! stops the search, even when the global default is stricter.
//!
//! A settings block that can't be parsed never falls through to a looser level. The
//! destination then rejects every request carrying a body, with
//! [`LimitSource::InvalidOverride`] as the source.

use std::sync::Arc;

use http::Method;
use tracing::error;

use crate::cache::{OverrideCache, RouteKey};
use crate::destination::{DestinationDescriptor, DestinationOverride};
use crate::error::OverrideError;
use crate::limit::SizeLimit;
use crate::policy::PolicyStore;

/// Which precedence level produced the effective limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitSource {
    Override,
    DeclaredCap,
    RecognizedDefault,
    UnrecognizedDefault,
    /// The destination's override is malformed
    InvalidOverride,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedLimit {
    limit: SizeLimit,
    source: LimitSource,
}

impl ResolvedLimit {
    pub fn new(limit: SizeLimit, source: LimitSource) -> Self {
        Self { limit, source }
    }

    pub fn limit(&self) -> &SizeLimit {
        &self.limit
    }

    pub fn source(&self) -> LimitSource {
        self.source
    }

    pub fn into_limit(self) -> SizeLimit {
        self.limit
    }
}

#[derive(Debug)]
pub struct LimitResolver {
    policy: Arc<PolicyStore>,
    cache: OverrideCache,
    reject_all: SizeLimit,
}

impl LimitResolver {
    pub fn new(policy: impl Into<Arc<PolicyStore>>) -> Self {
        Self { policy: policy.into(), cache: OverrideCache::new(), reject_all: SizeLimit::predicate(|_, _| true) }
    }

    pub fn policy(&self) -> &PolicyStore {
        &self.policy
    }

    pub fn cache(&self) -> &OverrideCache {
        &self.cache
    }

    pub fn resolve(&self, method: &Method, destination: Option<&DestinationDescriptor>) -> ResolvedLimit {
        let Some(destination) = destination else {
            return ResolvedLimit::new(self.policy.unrecognized_default().clone(), LimitSource::UnrecognizedDefault);
        };

        match self.lookup_override(method, destination) {
            Ok(Some(destination_override)) => {
                return ResolvedLimit::new(destination_override.size_limit(), LimitSource::Override);
            }
            Ok(None) => {}
            Err(e) => {
                error!(route = destination.route(), cause = %e, "invalid destination override, rejecting requests with a body");
                return ResolvedLimit::new(self.reject_all.clone(), LimitSource::InvalidOverride);
            }
        }

        if let Some(cap) = destination.declared_cap() {
            return ResolvedLimit::new(SizeLimit::Numeric(cap), LimitSource::DeclaredCap);
        }

        ResolvedLimit::new(self.policy.recognized_default().clone(), LimitSource::RecognizedDefault)
    }

    fn lookup_override(
        &self,
        method: &Method,
        destination: &DestinationDescriptor,
    ) -> Result<Option<DestinationOverride>, OverrideError> {
        let key = RouteKey::new(method.clone(), destination);
        self.cache.get_or_try_insert_with(&key, || destination.parse_override())
    }
}
