//! The admission gate.
//!
//! [`AdmissionGate::check`] runs once per request, after the head is parsed and before any
//! body byte is read. It resolves the destination, picks the effective limit and returns
//! the [`Verdict`] together with what it found, so the transport can hand the destination
//! on to the handler without resolving it a second time.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::decision::{Verdict, decide};
use crate::destination::{DestinationDescriptor, DestinationResolver};
use crate::facts::RequestFacts;
use crate::policy::PolicyStore;
use crate::resolver::{LimitResolver, ResolvedLimit};

#[derive(Debug)]
pub struct AdmissionGate<R> {
    resolver: R,
    limits: LimitResolver,
}

impl<R: DestinationResolver> AdmissionGate<R> {
    pub fn new(resolver: R, policy: impl Into<Arc<PolicyStore>>) -> Self {
        Self { resolver, limits: LimitResolver::new(policy) }
    }

    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    pub fn limits(&self) -> &LimitResolver {
        &self.limits
    }

    pub fn check(&self, facts: &RequestFacts) -> Admission {
        let destination = match self.resolver.resolve(facts) {
            Ok(destination) => destination,
            Err(e) => {
                warn!(method = %facts.method(), path = facts.path(), cause = %e, "destination lookup failed, treating request as unrecognized");
                None
            }
        };

        let limit = self.limits.resolve(facts.method(), destination.as_deref());
        let verdict = decide(facts, limit.limit(), destination.as_deref());

        if verdict.is_continue() {
            debug!(
                method = %facts.method(),
                path = facts.path(),
                declared_size = ?facts.declared_size(),
                limit = %limit.limit(),
                source = ?limit.source(),
                "request admitted"
            );
        } else {
            warn!(
                method = %facts.method(),
                path = facts.path(),
                declared_size = ?facts.declared_size(),
                limit = %limit.limit(),
                source = ?limit.source(),
                verdict = ?verdict,
                "request rejected before reading body"
            );
        }

        Admission { verdict, destination, limit }
    }
}

/// The outcome of [`AdmissionGate::check`].
#[derive(Debug, Clone)]
pub struct Admission {
    verdict: Verdict,
    destination: Option<Arc<DestinationDescriptor>>,
    limit: ResolvedLimit,
}

impl Admission {
    pub fn verdict(&self) -> Verdict {
        self.verdict
    }

    pub fn is_admitted(&self) -> bool {
        self.verdict.is_continue()
    }

    pub fn destination(&self) -> Option<&Arc<DestinationDescriptor>> {
        self.destination.as_ref()
    }

    pub fn limit(&self) -> &ResolvedLimit {
        &self.limit
    }

    pub fn into_destination(self) -> Option<Arc<DestinationDescriptor>> {
        self.destination
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::destination::{DestinationOverride, MockDestinationResolver};
    use crate::error::{ResolveError, Rejection};
    use crate::limit::SizeLimit;
    use crate::resolver::LimitSource;
    use http::header::CONTENT_LENGTH;
    use http::{Method, Request};

    fn post(path: &str, size: u64) -> RequestFacts {
        RequestFacts::from_request(&Request::builder().method(Method::POST).uri(path).header(CONTENT_LENGTH, size).body(()).unwrap())
    }

    /// `/api/data` plain, `/upload` with a 2000 byte override, `/open` with a disabled limit
    fn routing_table() -> MockDestinationResolver {
        let api_data = Arc::new(DestinationDescriptor::new("/api/data"));
        let upload = Arc::new(DestinationDescriptor::new("/upload").with_override(DestinationOverride::Limit(2000)));
        let open = Arc::new(DestinationDescriptor::new("/open").with_override(DestinationOverride::Disabled));

        let mut resolver = MockDestinationResolver::new();
        resolver.expect_resolve().returning(move |facts| {
            let destination = match facts.path() {
                "/api/data" => &api_data,
                "/upload" => &upload,
                "/open" => &open,
                _ => return Ok(None),
            };
            Ok(Some(Arc::clone(destination)))
        });
        resolver
    }

    fn gate(recognized: u64, unrecognized: u64) -> AdmissionGate<MockDestinationResolver> {
        let policy = PolicyStore::builder().recognized(recognized).unrecognized(unrecognized).build().unwrap();
        AdmissionGate::new(routing_table(), policy)
    }

    #[test]
    fn zero_length_on_known_route() {
        let admission = gate(1000, 500).check(&post("/api/data", 0));

        assert!(admission.is_admitted());
        assert_eq!(admission.destination().map(|d| d.route()), Some("/api/data"));
    }

    #[test]
    fn oversized_on_unknown_route_is_not_found() {
        let admission = gate(1000, 500).check(&post("/missing", 900));

        assert_eq!(admission.verdict(), Verdict::RejectUnrecognized);
        assert_eq!(admission.verdict().rejection(), Some(Rejection::UnrecognizedRejected));
        assert!(admission.destination().is_none());
        assert_eq!(admission.limit().source(), LimitSource::UnrecognizedDefault);
    }

    #[test]
    fn oversized_on_known_route_is_payload_too_large() {
        let admission = gate(1000, 500).check(&post("/api/data", 1001));

        assert_eq!(admission.verdict(), Verdict::RejectOversized { limit: Some(1000) });
    }

    #[test]
    fn override_raises_the_limit() {
        let gate = gate(1000, 500);

        let admission = gate.check(&post("/upload", 1500));
        assert!(admission.is_admitted());
        assert_eq!(admission.limit().source(), LimitSource::Override);

        let admission = gate.check(&post("/upload", 2001));
        assert_eq!(admission.verdict(), Verdict::RejectOversized { limit: Some(2000) });
    }

    #[test]
    fn disabled_override_ignores_default() {
        let admission = gate(500, 500).check(&post("/open", 100_000));

        assert!(admission.is_admitted());
        assert_eq!(admission.limit().limit(), &SizeLimit::Unset);
    }

    #[test]
    fn always_reject_unrecognized() {
        let policy = PolicyStore::builder().unrecognized(SizeLimit::AlwaysReject).build().unwrap();
        let gate = AdmissionGate::new(routing_table(), policy);

        assert_eq!(gate.check(&post("/missing", 0)).verdict(), Verdict::RejectImmediate);
        assert!(gate.check(&post("/api/data", 0)).is_admitted());
    }

    #[test]
    fn never_check_unrecognized() {
        let policy = PolicyStore::builder().unrecognized(SizeLimit::NeverCheck).build().unwrap();
        let gate = AdmissionGate::new(routing_table(), policy);

        assert!(gate.check(&post("/missing", u64::MAX)).is_admitted());
    }

    #[test]
    fn resolves_once_per_request() {
        let mut resolver = MockDestinationResolver::new();
        resolver.expect_resolve().times(1).returning(|_| Ok(Some(Arc::new(DestinationDescriptor::new("/")))));
        let gate = AdmissionGate::new(resolver, PolicyStore::unlimited());

        assert!(gate.check(&post("/", 10)).is_admitted());
    }

    #[test]
    fn resolver_failure_counts_as_unrecognized() {
        let mut resolver = MockDestinationResolver::new();
        resolver.expect_resolve().returning(|_| Err(ResolveError::new("routing table unavailable")));
        let policy = PolicyStore::builder().recognized(1000).unrecognized(10).build().unwrap();
        let gate = AdmissionGate::new(resolver, policy);

        let admission = gate.check(&post("/api/data", 11));

        assert_eq!(admission.verdict(), Verdict::RejectUnrecognized);
        assert_eq!(admission.limit().source(), LimitSource::UnrecognizedDefault);
    }

    #[test]
    fn overrides_are_cached_per_route() {
        let gate = gate(1000, 500);

        gate.check(&post("/upload", 1));
        gate.check(&post("/upload", 1));
        gate.check(&post("/api/data", 1));
        gate.check(&post("/missing", 1));

        assert_eq!(gate.limits().cache().len(), 2);
    }
}
