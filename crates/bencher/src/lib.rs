use micro_gate::{AdmissionGate, DestinationOverride, PolicyStore};
use micro_gate_web::Router;
use micro_gate_web::router::{post, put};

#[derive(Debug, Copy, Clone)]
pub struct RequestCase {
    name: &'static str,
    group: CaseGroup,
    head: &'static str,
}

impl RequestCase {
    pub const fn new(name: &'static str, group: CaseGroup, head: &'static str) -> Self {
        Self { name, group, head }
    }

    pub const fn admitted(name: &'static str, head: &'static str) -> Self {
        Self::new(name, CaseGroup::Admitted, head)
    }

    pub const fn rejected(name: &'static str, head: &'static str) -> Self {
        Self::new(name, CaseGroup::Rejected, head)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn group(&self) -> CaseGroup {
        self.group
    }

    /// The raw request head, blank line included
    pub fn head(&self) -> &'static str {
        self.head
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CaseGroup {
    Admitted,
    Rejected,
}

/// Route table shared by the benchmarks: defaults of 1000 / 500 bytes, `/upload` raised to 2000.
pub fn fixture_gate() -> AdmissionGate<Router> {
    let router = Router::builder()
        .route("/api/data", post())
        .route("/upload", post().limit_override(DestinationOverride::Limit(2000)))
        .route("/files/{name}", put().declared_cap(4096))
        .build()
        .expect("fixture routes should be valid");
    let policy = PolicyStore::builder().recognized(1000).unrecognized(500).build().expect("fixture policy should be valid");

    let gate = AdmissionGate::new(router, policy);
    gate.limits().cache().warm(gate.resolver().override_entries().iter().cloned());
    gate
}
