//! The route table.
//!
//! A [`Router`] maps path patterns (matchit syntax) to route items. Each item carries a
//! filter and the [`DestinationDescriptor`] the gate reads: the route's declared size cap
//! and its settings, including an optional gate override. The router is the gate's
//! [`DestinationResolver`]; a request matching no item is unrecognized.
//!
//! Overrides are validated when the router is built, so a malformed settings block stops
//! startup instead of being skipped at request time.

pub mod filter;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use filter::{AllFilter, Filter};
use http::Method;
use micro_gate::{
    DestinationDescriptor, DestinationOverride, DestinationResolver, GATE_SETTINGS_KEY, OverrideError, RequestFacts, ResolveError,
    RouteKey,
};
use serde_json::Value;
use thiserror::Error;
use tracing::trace;

type RouterFilter = dyn Filter + Send + Sync + 'static;
type InnerRouter<T> = matchit::Router<T>;

pub struct Router {
    inner_router: InnerRouter<Vec<RouterItem>>,
    override_entries: Vec<(RouteKey, Option<DestinationOverride>)>,
}

pub struct RouterItem {
    filter: Box<RouterFilter>,
    destination: Arc<DestinationDescriptor>,
}

#[derive(Error, Debug)]
pub enum RouterBuildError {
    #[error("invalid route '{route}': {reason}")]
    InvalidRoute { route: String, reason: String },

    #[error("invalid gate override on route '{route}': {source}")]
    InvalidOverride {
        route: String,
        #[source]
        source: OverrideError,
    },
}

impl Router {
    pub fn builder() -> RouterBuilder {
        RouterBuilder::new()
    }

    /// The items registered for the pattern matching `path`, empty when nothing matches.
    pub fn at(&self, path: &str) -> &[RouterItem] {
        self.inner_router
            .at(path)
            .map(|matched| matched.value.as_slice())
            .map_err(|e| trace!(path, cause = %e, "no route matched"))
            .unwrap_or(&[])
    }

    /// Every `(method, route)` override known at build time, for warming the override cache.
    ///
    /// Items without a method filter are left out, their cache key is only known per request.
    pub fn override_entries(&self) -> &[(RouteKey, Option<DestinationOverride>)] {
        &self.override_entries
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router").field("override_entries", &self.override_entries).finish_non_exhaustive()
    }
}

impl DestinationResolver for Router {
    fn resolve(&self, facts: &RequestFacts) -> Result<Option<Arc<DestinationDescriptor>>, ResolveError> {
        let destination =
            self.at(facts.path()).iter().find(|item| item.filter.matches(facts)).map(|item| Arc::clone(&item.destination));
        Ok(destination)
    }
}

impl RouterItem {
    pub fn filter(&self) -> &RouterFilter {
        self.filter.as_ref()
    }

    pub fn destination(&self) -> &Arc<DestinationDescriptor> {
        &self.destination
    }
}

#[derive(Default)]
pub struct RouterBuilder {
    data: HashMap<String, Vec<RouterItemBuilder>>,
}

impl RouterBuilder {
    fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, route: impl Into<String>, item_builder: RouterItemBuilder) -> Self {
        let vec = self.data.entry(route.into()).or_default();
        vec.push(item_builder);
        self
    }

    pub fn build(self) -> Result<Router, RouterBuildError> {
        let mut inner_router = InnerRouter::new();
        let mut override_entries = Vec::new();

        for (path, items) in self.data {
            let mut router_items = Vec::with_capacity(items.len());
            for item_builder in items {
                let methods = item_builder.methods.clone();
                let item = item_builder.build(&path);

                let destination_override = item
                    .destination
                    .parse_override()
                    .map_err(|source| RouterBuildError::InvalidOverride { route: path.clone(), source })?;
                override_entries
                    .extend(methods.into_iter().map(|method| (RouteKey::new(method, &item.destination), destination_override)));

                router_items.push(item);
            }

            inner_router
                .insert(path.clone(), router_items)
                .map_err(|e| RouterBuildError::InvalidRoute { route: path, reason: e.to_string() })?;
        }

        Ok(Router { inner_router, override_entries })
    }
}

macro_rules! method_router_filter {
    ($method:ident, $method_name:ident, $upper_case_method:ident) => {
        pub fn $method() -> RouterItemBuilder {
            let mut filters = filter::all_filter();
            filters.and(filter::$method_name());
            RouterItemBuilder { filters, methods: vec![Method::$upper_case_method], declared_cap: None, settings: Vec::new() }
        }
    };
}

method_router_filter!(get, get_method, GET);
method_router_filter!(post, post_method, POST);
method_router_filter!(put, put_method, PUT);
method_router_filter!(delete, delete_method, DELETE);
method_router_filter!(head, head_method, HEAD);
method_router_filter!(options, options_method, OPTIONS);
method_router_filter!(connect, connect_method, CONNECT);
method_router_filter!(patch, patch_method, PATCH);
method_router_filter!(trace, trace_method, TRACE);

/// An item matching any method.
pub fn any() -> RouterItemBuilder {
    RouterItemBuilder { filters: filter::all_filter(), methods: Vec::new(), declared_cap: None, settings: Vec::new() }
}

pub struct RouterItemBuilder {
    filters: AllFilter,
    methods: Vec<Method>,
    declared_cap: Option<u64>,
    settings: Vec<(String, Value)>,
}

impl RouterItemBuilder {
    pub fn with<F: Filter + Send + Sync + 'static>(mut self, filter: F) -> Self {
        self.filters.and(filter);
        self
    }

    /// The route's own size cap, used when no override applies
    pub fn declared_cap(mut self, cap: u64) -> Self {
        self.declared_cap = Some(cap);
        self
    }

    /// Attaches a settings block under `key`; the gate reads the one under [`GATE_SETTINGS_KEY`].
    pub fn settings(mut self, key: impl Into<String>, value: Value) -> Self {
        self.settings.push((key.into(), value));
        self
    }

    pub fn limit_override(self, destination_override: DestinationOverride) -> Self {
        self.settings(GATE_SETTINGS_KEY, destination_override.to_settings())
    }

    fn build(self, route: &str) -> RouterItem {
        let mut destination = DestinationDescriptor::new(route);
        if let Some(cap) = self.declared_cap {
            destination = destination.with_declared_cap(cap);
        }
        for (key, value) in self.settings {
            destination = destination.with_settings(key, value);
        }

        RouterItem { filter: Box::new(self.filters), destination: Arc::new(destination) }
    }
}
