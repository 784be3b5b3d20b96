//! The admission decision.
//!
//! [`decide`] is a pure function of the request facts, the effective limit and the
//! recognition status. A declared size equal to the limit is admitted, only a strictly
//! greater one is rejected.

use crate::destination::DestinationDescriptor;
use crate::error::Rejection;
use crate::facts::RequestFacts;
use crate::limit::{RequestInfo, SizeLimit};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Continue,
    /// A recognized destination received a body above its limit; `None` when a predicate decided
    RejectOversized { limit: Option<u64> },
    /// An unrecognized destination received a body above the unrecognized limit
    RejectUnrecognized,
    /// The policy rejects the request whatever its size
    RejectImmediate,
}

impl Verdict {
    #[inline]
    pub fn is_continue(&self) -> bool {
        matches!(self, Self::Continue)
    }

    pub fn rejection(&self) -> Option<Rejection> {
        match self {
            Self::Continue => None,
            Self::RejectOversized { limit } => Some(Rejection::OversizedPayload { limit: *limit }),
            Self::RejectUnrecognized | Self::RejectImmediate => Some(Rejection::UnrecognizedRejected),
        }
    }

    pub fn into_result(self) -> Result<(), Rejection> {
        match self.rejection() {
            Some(rejection) => Err(rejection),
            None => Ok(()),
        }
    }
}

pub fn decide(facts: &RequestFacts, limit: &SizeLimit, destination: Option<&DestinationDescriptor>) -> Verdict {
    if !facts.expects_body() {
        return Verdict::Continue;
    }

    let recognized = destination.is_some();
    let declared_size = facts.declared_size();

    let exceeded = match limit {
        SizeLimit::Unset | SizeLimit::NeverCheck => return Verdict::Continue,
        SizeLimit::AlwaysReject => return Verdict::RejectImmediate,
        // a streamed body without Content-Length has no size to compare yet
        SizeLimit::Numeric(n) => declared_size.is_some_and(|size| size > *n),
        SizeLimit::Predicate(predicate) => predicate.rejects(&RequestInfo::new(facts, destination), declared_size),
    };

    match (exceeded, recognized) {
        (false, _) => Verdict::Continue,
        (true, true) => Verdict::RejectOversized { limit: limit.bytes() },
        (true, false) => Verdict::RejectUnrecognized,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header::{CONTENT_LENGTH, TRANSFER_ENCODING};
    use http::{Method, Request};

    fn with_length(length: u64) -> RequestFacts {
        RequestFacts::from_request(&Request::builder().method(Method::POST).uri("/").header(CONTENT_LENGTH, length).body(()).unwrap())
    }

    fn without_body() -> RequestFacts {
        RequestFacts::from_request(&Request::builder().method(Method::POST).uri("/").body(()).unwrap())
    }

    fn chunked() -> RequestFacts {
        RequestFacts::from_request(
            &Request::builder().method(Method::POST).uri("/").header(TRANSFER_ENCODING, "chunked").body(()).unwrap(),
        )
    }

    fn recognized() -> DestinationDescriptor {
        DestinationDescriptor::new("/")
    }

    #[test]
    fn admitted_iff_within_numeric_limit() {
        let destination = recognized();
        for limit in [0u64, 1, 500, 1000] {
            for size in [0u64, 1, 499, 500, 501, 999, 1000, 1001, 100_000] {
                let verdict = decide(&with_length(size), &SizeLimit::Numeric(limit), Some(&destination));
                assert_eq!(verdict.is_continue(), size <= limit, "size {size} limit {limit}");
            }
        }
    }

    #[test]
    fn equal_size_is_admitted() {
        assert_eq!(decide(&with_length(500), &SizeLimit::Numeric(500), Some(&recognized())), Verdict::Continue);
    }

    #[test]
    fn oversized_recognized_reports_limit() {
        let verdict = decide(&with_length(1500), &SizeLimit::Numeric(1000), Some(&recognized()));

        assert_eq!(verdict, Verdict::RejectOversized { limit: Some(1000) });
        assert_eq!(verdict.into_result(), Err(Rejection::OversizedPayload { limit: Some(1000) }));
    }

    #[test]
    fn oversized_unrecognized_is_not_found() {
        let verdict = decide(&with_length(900), &SizeLimit::Numeric(500), None);

        assert_eq!(verdict, Verdict::RejectUnrecognized);
        assert_eq!(verdict.rejection(), Some(Rejection::UnrecognizedRejected));
    }

    #[test]
    fn unset_admits_any_size() {
        assert_eq!(decide(&with_length(u64::MAX), &SizeLimit::Unset, Some(&recognized())), Verdict::Continue);
        assert_eq!(decide(&with_length(u64::MAX), &SizeLimit::Unset, None), Verdict::Continue);
    }

    #[test]
    fn no_body_is_admitted_even_against_zero() {
        assert_eq!(decide(&without_body(), &SizeLimit::Numeric(0), Some(&recognized())), Verdict::Continue);
        assert_eq!(decide(&without_body(), &SizeLimit::AlwaysReject, None), Verdict::Continue);
        assert_eq!(decide(&without_body(), &SizeLimit::predicate(|_, _| true), None), Verdict::Continue);
    }

    #[test]
    fn always_reject_rejects_zero_length() {
        let verdict = decide(&with_length(0), &SizeLimit::AlwaysReject, None);

        assert_eq!(verdict, Verdict::RejectImmediate);
        assert_eq!(verdict.rejection(), Some(Rejection::UnrecognizedRejected));
    }

    #[test]
    fn never_check_continues() {
        assert_eq!(decide(&with_length(u64::MAX), &SizeLimit::NeverCheck, None), Verdict::Continue);
        assert_eq!(decide(&chunked(), &SizeLimit::NeverCheck, None), Verdict::Continue);
    }

    #[test]
    fn chunked_body_against_numeric_limit() {
        assert_eq!(decide(&chunked(), &SizeLimit::Numeric(0), Some(&recognized())), Verdict::Continue);
        assert_eq!(decide(&chunked(), &SizeLimit::AlwaysReject, None), Verdict::RejectImmediate);
    }

    #[test]
    fn predicate_sees_size_and_destination() {
        let limit = SizeLimit::predicate(|info, size| info.is_recognized() && size.is_some_and(|size| size > 10));

        assert_eq!(decide(&with_length(11), &limit, Some(&recognized())), Verdict::RejectOversized { limit: None });
        assert_eq!(decide(&with_length(10), &limit, Some(&recognized())), Verdict::Continue);
        assert_eq!(decide(&with_length(11), &limit, None), Verdict::Continue);
    }

    #[test]
    fn predicate_on_unrecognized() {
        let limit = SizeLimit::predicate(|info, _| *info.facts().method() == Method::PUT);

        assert_eq!(decide(&with_length(1), &limit, None), Verdict::Continue);

        let put = RequestFacts::from_request(&Request::builder().method(Method::PUT).uri("/").header(CONTENT_LENGTH, 1).body(()).unwrap());
        assert_eq!(decide(&put, &limit, None), Verdict::RejectUnrecognized);
    }

    #[test]
    fn predicate_on_chunked_gets_no_size() {
        let limit = SizeLimit::predicate(|_, size| size.is_none());

        assert_eq!(decide(&chunked(), &limit, Some(&recognized())), Verdict::RejectOversized { limit: None });
    }
}
