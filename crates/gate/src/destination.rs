//! The routing side of the gate.
//!
//! The gate never routes requests itself. It asks a [`DestinationResolver`] once per
//! request and reads two things from the matched [`DestinationDescriptor`]: the route's
//! own declared size cap, and an optional settings block stored under
//! [`GATE_SETTINGS_KEY`] that may carry a [`DestinationOverride`].

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::{Map, Value};

use crate::error::{OverrideError, ResolveError};
use crate::facts::RequestFacts;
use crate::limit::SizeLimit;

/// The key under which a destination stores its gate settings block
pub const GATE_SETTINGS_KEY: &str = "micro_gate";

const OVERRIDE_LIMIT_FIELD: &str = "limit";

static NEXT_DESTINATION_ID: AtomicU64 = AtomicU64::new(0);

/// Finds the destination a request is addressed to.
#[cfg_attr(test, mockall::automock)]
pub trait DestinationResolver: Send + Sync {
    /// Returns `Ok(None)` when the request does not match any known destination.
    fn resolve(&self, facts: &RequestFacts) -> Result<Option<Arc<DestinationDescriptor>>, ResolveError>;
}

impl<T: DestinationResolver + ?Sized> DestinationResolver for Arc<T> {
    fn resolve(&self, facts: &RequestFacts) -> Result<Option<Arc<DestinationDescriptor>>, ResolveError> {
        (**self).resolve(facts)
    }
}

impl<T: DestinationResolver + ?Sized> DestinationResolver for Box<T> {
    fn resolve(&self, facts: &RequestFacts) -> Result<Option<Arc<DestinationDescriptor>>, ResolveError> {
        (**self).resolve(facts)
    }
}

/// Identifies one destination descriptor for the lifetime of the process.
///
/// Every [`DestinationDescriptor::new`] draws a fresh id; clones keep it. Two route items
/// sharing a path pattern (told apart by host, by a filter, or by a trailing slash) are
/// still distinct destinations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DestinationId(u64);

impl DestinationId {
    fn next() -> Self {
        Self(NEXT_DESTINATION_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// A recognized destination as exposed by the routing table.
#[derive(Debug, Clone, PartialEq)]
pub struct DestinationDescriptor {
    id: DestinationId,
    route: Arc<str>,
    declared_cap: Option<u64>,
    settings: Map<String, Value>,
}

impl DestinationDescriptor {
    /// Creates a descriptor for the given route pattern, e.g. `/users/{id}`.
    ///
    /// The route should come from a bounded set such as the route table: overrides are
    /// memoized per destination for the life of the process.
    pub fn new(route: impl Into<Arc<str>>) -> Self {
        Self { id: DestinationId::next(), route: route.into(), declared_cap: None, settings: Map::new() }
    }

    pub fn id(&self) -> DestinationId {
        self.id
    }

    pub fn with_declared_cap(mut self, cap: u64) -> Self {
        self.declared_cap = Some(cap);
        self
    }

    pub fn with_settings(mut self, key: impl Into<String>, value: Value) -> Self {
        self.settings.insert(key.into(), value);
        self
    }

    pub fn with_override(self, destination_override: DestinationOverride) -> Self {
        self.with_settings(GATE_SETTINGS_KEY, destination_override.to_settings())
    }

    pub fn route(&self) -> &str {
        &self.route
    }

    pub(crate) fn shared_route(&self) -> &Arc<str> {
        &self.route
    }

    pub fn declared_cap(&self) -> Option<u64> {
        self.declared_cap
    }

    pub fn settings(&self, key: &str) -> Option<&Value> {
        self.settings.get(key)
    }

    pub fn gate_settings(&self) -> Option<&Value> {
        self.settings(GATE_SETTINGS_KEY)
    }

    /// Parses the override carried by the gate settings block.
    ///
    /// `Ok(None)` means the destination carries no override.
    pub fn parse_override(&self) -> Result<Option<DestinationOverride>, OverrideError> {
        match self.gate_settings() {
            Some(settings) => DestinationOverride::from_settings(settings),
            None => Ok(None),
        }
    }
}

/// A per-destination override of the global policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestinationOverride {
    Limit(u64),
    /// `null` in the settings block: no limit at all for this destination
    Disabled,
}

impl DestinationOverride {
    pub fn size_limit(self) -> SizeLimit {
        match self {
            Self::Limit(n) => SizeLimit::Numeric(n),
            Self::Disabled => SizeLimit::Unset,
        }
    }

    /// Reads `{"limit": <non-negative integer> | null}`; a missing `limit` field means no override.
    pub fn from_settings(settings: &Value) -> Result<Option<Self>, OverrideError> {
        let Value::Object(settings) = settings else {
            return Err(OverrideError::NotAnObject { found: settings.to_string() });
        };

        match settings.get(OVERRIDE_LIMIT_FIELD) {
            None => Ok(None),
            Some(Value::Null) => Ok(Some(Self::Disabled)),
            Some(Value::Number(number)) => match (number.as_u64(), number.as_i64()) {
                (Some(limit), _) => Ok(Some(Self::Limit(limit))),
                (None, Some(value)) => Err(OverrideError::NegativeLimit { value }),
                (None, None) => Err(OverrideError::InvalidLimit { found: number.to_string() }),
            },
            Some(other) => Err(OverrideError::InvalidLimit { found: other.to_string() }),
        }
    }

    pub fn to_settings(self) -> Value {
        let limit = match self {
            Self::Limit(n) => Value::from(n),
            Self::Disabled => Value::Null,
        };

        let mut settings = Map::new();
        settings.insert(OVERRIDE_LIMIT_FIELD.to_string(), limit);
        Value::Object(settings)
    }
}
