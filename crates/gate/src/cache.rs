//! Process-wide memoization of per-destination overrides.
//!
//! Reading a destination's override means parsing its settings block, so the result is
//! kept in an [`OverrideCache`] keyed by `(method, destination id)`. Reads are lock-free
//! through [`ArcSwap`]; a miss computes the value and publishes a new map with
//! read-copy-update. Two threads racing on the same key both compute the same value and
//! the first published one stays.
//!
//! The cache grows with the number of distinct destinations, which is bounded by the
//! route table. It can also be filled upfront with [`OverrideCache::warm`]. Every miss
//! copies the map, so destinations are expected to be created once at startup and not
//! per request.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwap;
use http::Method;

use crate::destination::{DestinationDescriptor, DestinationId, DestinationOverride};

/// Cache key of one destination as seen by one method.
///
/// The route pattern is carried for logging only, the destination id already tells
/// destinations apart.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RouteKey {
    method: Method,
    destination: DestinationId,
    route: Arc<str>,
}

impl RouteKey {
    pub fn new(method: Method, destination: &DestinationDescriptor) -> Self {
        Self { method, destination: destination.id(), route: Arc::clone(destination.shared_route()) }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn destination(&self) -> DestinationId {
        self.destination
    }

    pub fn route(&self) -> &str {
        &self.route
    }
}

type Entries = HashMap<RouteKey, Option<DestinationOverride>>;

pub struct OverrideCache {
    entries: ArcSwap<Entries>,
}

impl OverrideCache {
    pub fn new() -> Self {
        Self { entries: ArcSwap::from_pointee(HashMap::new()) }
    }

    /// `None` on a miss, `Some(None)` when the destination is known to carry no override
    pub fn get(&self, key: &RouteKey) -> Option<Option<DestinationOverride>> {
        self.entries.load().get(key).copied()
    }

    /// Returns the cached override, computing and inserting it on a miss.
    ///
    /// Errors from `f` are returned as is and nothing is cached, the next lookup
    /// computes again.
    pub fn get_or_try_insert_with<F, E>(&self, key: &RouteKey, f: F) -> Result<Option<DestinationOverride>, E>
    where
        F: FnOnce() -> Result<Option<DestinationOverride>, E>,
    {
        if let Some(cached) = self.get(key) {
            return Ok(cached);
        }

        let value = f()?;
        self.entries.rcu(|current| {
            let mut next = Entries::clone(current);
            next.entry(key.clone()).or_insert(value);
            next
        });
        Ok(value)
    }

    /// Pre-populates the cache, e.g. from the full route table at startup.
    pub fn warm<I>(&self, entries: I)
    where
        I: IntoIterator<Item = (RouteKey, Option<DestinationOverride>)>,
    {
        let entries = entries.into_iter().collect::<Vec<_>>();
        if entries.is_empty() {
            return;
        }

        self.entries.rcu(|current| {
            let mut next = Entries::clone(current);
            for (key, value) in &entries {
                next.entry(key.clone()).or_insert(*value);
            }
            next
        });
    }

    pub fn len(&self) -> usize {
        self.entries.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.load().is_empty()
    }
}

impl Default for OverrideCache {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for OverrideCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OverrideCache").field("len", &self.len()).finish()
    }
}
