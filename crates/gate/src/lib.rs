//! Request admission on declared payload size
//!
//! This crate decides whether an incoming HTTP request may proceed, based only on the
//! size its head declares, before a single byte of the body is read. Oversized uploads
//! are refused cheaply instead of being buffered and thrown away.
//!
//! # Features
//!
//! - Separate defaults for recognized and unrecognized destinations
//! - Per-destination overrides, memoized in a lock-free cache
//! - Numeric, boolean and predicate limits
//! - `413 Payload Too Large` for known routes, `404 Not Found` for everything else
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use http::Request;
//! use http::header::CONTENT_LENGTH;
//! use micro_gate::{AdmissionGate, DestinationDescriptor, DestinationResolver, PolicyStore, RequestFacts, ResolveError, Verdict};
//!
//! struct OnlyUpload(Arc<DestinationDescriptor>);
//!
//! impl DestinationResolver for OnlyUpload {
//!     fn resolve(&self, facts: &RequestFacts) -> Result<Option<Arc<DestinationDescriptor>>, ResolveError> {
//!         Ok((facts.path() == "/upload").then(|| Arc::clone(&self.0)))
//!     }
//! }
//!
//! let policy = PolicyStore::builder().recognized(1000).unrecognized(500).build().unwrap();
//! let gate = AdmissionGate::new(OnlyUpload(Arc::new(DestinationDescriptor::new("/upload"))), policy);
//!
//! let request = Request::post("/upload").header(CONTENT_LENGTH, 1500).body(()).unwrap();
//! let admission = gate.check(&RequestFacts::from_request(&request));
//!
//! assert_eq!(admission.verdict(), Verdict::RejectOversized { limit: Some(1000) });
//! ```
//!
//! Descriptors are created once, with the routing table, and handed out by the resolver.
//! Each one is a distinct destination to the override cache, so a resolver building a
//! fresh descriptor per request would grow the cache without bound.

mod cache;
mod decision;
mod destination;
mod emitter;
mod error;
mod facts;
mod gate;
mod limit;
mod resolver;
mod utils;

pub mod config;
pub mod policy;

pub use cache::{OverrideCache, RouteKey};
pub use decision::{Verdict, decide};
pub use destination::{DestinationDescriptor, DestinationOverride, DestinationResolver, GATE_SETTINGS_KEY};
pub use emitter::{PlainTextEmitter, ResponseEmitter};
pub use error::{ConfigError, OverrideError, Rejection, ResolveError};
pub use facts::RequestFacts;
pub use gate::{Admission, AdmissionGate};
pub use limit::{RequestInfo, SizeLimit, SizePredicate};
pub use policy::{PolicySlot, PolicyStore, PolicyStoreBuilder};
pub use resolver::{LimitResolver, LimitSource, ResolvedLimit};
