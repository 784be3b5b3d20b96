//! Composable route filters.
//!
//! A path may carry several route items; filters pick the one a request belongs to.
//! They only see [`RequestFacts`], so routing stays a pure function of the request head
//! and the gate can run it before any body byte is read.
//!
//! # Examples
//!
//! ```
//! use micro_gate_web::router::filter::{all_filter, host, post_method};
//!
//! let mut filter = all_filter();
//! filter.and(post_method()).and(host("files.example.com"));
//! ```

use http::Method;
use micro_gate::RequestFacts;

/// Filters must be `Send + Sync`, the route table is shared by every connection.
pub trait Filter: Send + Sync {
    fn matches(&self, facts: &RequestFacts) -> bool;
}

struct FnFilter<F: Fn(&RequestFacts) -> bool>(F);

impl<F: Fn(&RequestFacts) -> bool + Send + Sync> Filter for FnFilter<F> {
    fn matches(&self, facts: &RequestFacts) -> bool {
        (self.0)(facts)
    }
}

/// Creates a filter from a closure.
///
/// ```
/// use micro_gate_web::router::filter::fn_filter;
///
/// let declared_only = fn_filter(|facts| !facts.has_transfer_encoding());
/// ```
pub fn fn_filter<F>(f: F) -> impl Filter
where
    F: Fn(&RequestFacts) -> bool + Send + Sync,
{
    FnFilter(f)
}

pub fn true_filter() -> TrueFilter {
    TrueFilter
}

pub fn false_filter() -> FalseFilter {
    FalseFilter
}

#[derive(Debug)]
pub struct TrueFilter;

impl Filter for TrueFilter {
    #[inline]
    fn matches(&self, _facts: &RequestFacts) -> bool {
        true
    }
}

#[derive(Debug)]
pub struct FalseFilter;

impl Filter for FalseFilter {
    #[inline]
    fn matches(&self, _facts: &RequestFacts) -> bool {
        false
    }
}

pub fn any_filter() -> AnyFilter {
    AnyFilter::new()
}

/// OR composition; an empty chain matches everything.
pub struct AnyFilter {
    filters: Vec<Box<dyn Filter>>,
}

impl AnyFilter {
    fn new() -> Self {
        Self { filters: vec![] }
    }

    pub fn or<F: Filter + 'static>(&mut self, filter: F) -> &mut Self {
        self.filters.push(Box::new(filter));
        self
    }
}

impl Filter for AnyFilter {
    fn matches(&self, facts: &RequestFacts) -> bool {
        self.filters.is_empty() || self.filters.iter().any(|filter| filter.matches(facts))
    }
}

pub fn all_filter() -> AllFilter {
    AllFilter::new()
}

/// AND composition; an empty chain matches everything.
pub struct AllFilter {
    filters: Vec<Box<dyn Filter>>,
}

impl AllFilter {
    fn new() -> Self {
        Self { filters: vec![] }
    }

    pub fn and<F: Filter + 'static>(&mut self, filter: F) -> &mut Self {
        self.filters.push(Box::new(filter));
        self
    }
}

impl Filter for AllFilter {
    fn matches(&self, facts: &RequestFacts) -> bool {
        self.filters.iter().all(|filter| filter.matches(facts))
    }
}

#[derive(Debug)]
pub struct MethodFilter(Method);

impl MethodFilter {
    pub fn method(&self) -> &Method {
        &self.0
    }
}

impl Filter for MethodFilter {
    fn matches(&self, facts: &RequestFacts) -> bool {
        self.0.eq(facts.method())
    }
}

macro_rules! method_filter {
    ($method:ident, $upper_case_method:ident) => {
        #[doc = concat!("Creates a filter that matches HTTP ", stringify!($upper_case_method), " requests.")]
        #[inline]
        pub fn $method() -> MethodFilter {
            MethodFilter(Method::$upper_case_method)
        }
    };
}

method_filter!(get_method, GET);
method_filter!(post_method, POST);
method_filter!(put_method, PUT);
method_filter!(delete_method, DELETE);
method_filter!(head_method, HEAD);
method_filter!(options_method, OPTIONS);
method_filter!(connect_method, CONNECT);
method_filter!(patch_method, PATCH);
method_filter!(trace_method, TRACE);

/// Matches the request host, compared without port and case-insensitively.
pub fn host(host: impl Into<String>) -> HostFilter {
    HostFilter(host.into().to_ascii_lowercase())
}

#[derive(Debug)]
pub struct HostFilter(String);

impl Filter for HostFilter {
    fn matches(&self, facts: &RequestFacts) -> bool {
        facts.host() == Some(self.0.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header::{CONTENT_LENGTH, HOST};
    use http::Request;

    fn facts(method: Method, host: Option<&str>) -> RequestFacts {
        let mut builder = Request::builder().method(method).uri("/upload").header(CONTENT_LENGTH, 10);
        if let Some(host) = host {
            builder = builder.header(HOST, host);
        }
        RequestFacts::from_request(&builder.body(()).unwrap())
    }

    #[test]
    fn method_filters() {
        let post = facts(Method::POST, None);

        assert!(post_method().matches(&post));
        assert!(!get_method().matches(&post));
        assert!(!put_method().matches(&post));
    }

    #[test]
    fn host_filter_ignores_port_and_case() {
        let filter = host("Files.Example.com");

        assert!(filter.matches(&facts(Method::POST, Some("files.example.com:8080"))));
        assert!(filter.matches(&facts(Method::POST, Some("FILES.EXAMPLE.COM"))));
        assert!(!filter.matches(&facts(Method::POST, Some("example.com"))));
        assert!(!filter.matches(&facts(Method::POST, None)));
    }

    #[test]
    fn empty_chains_match() {
        let facts = facts(Method::GET, None);

        assert!(all_filter().matches(&facts));
        assert!(any_filter().matches(&facts));
        assert!(true_filter().matches(&facts));
        assert!(!false_filter().matches(&facts));
    }

    #[test]
    fn composed() {
        let mut all = all_filter();
        all.and(post_method()).and(host("a.com"));

        let mut any = any_filter();
        any.or(get_method()).or(put_method());

        assert!(all.matches(&facts(Method::POST, Some("a.com"))));
        assert!(!all.matches(&facts(Method::POST, Some("b.com"))));
        assert!(any.matches(&facts(Method::PUT, None)));
        assert!(!any.matches(&facts(Method::POST, None)));
    }

    #[test]
    fn closure_filter() {
        let declared = fn_filter(|facts| facts.declared_size().is_some());

        assert!(declared.matches(&facts(Method::POST, None)));
    }
}
