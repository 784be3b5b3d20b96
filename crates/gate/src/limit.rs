//! Size limit shapes.
//!
//! A [`SizeLimit`] is the single value a policy slot, a destination override or a
//! route's declared cap resolves to. Only one shape is active per resolved policy.
//!
//! - [`SizeLimit::Unset`]: no limit is enforced
//! - [`SizeLimit::Numeric`]: reject when the declared size is strictly greater
//! - [`SizeLimit::AlwaysReject`]: reject every request carrying a body (unrecognized slot only)
//! - [`SizeLimit::NeverCheck`]: skip size evaluation (unrecognized slot only)
//! - [`SizeLimit::Predicate`]: a user callback decides whether to reject

use std::fmt;
use std::fmt::{Debug, Display, Formatter};
use std::sync::Arc;

use crate::destination::DestinationDescriptor;
use crate::facts::RequestFacts;

/// What a [`SizePredicate`] can see about the request under evaluation.
#[derive(Debug, Clone, Copy)]
pub struct RequestInfo<'a> {
    facts: &'a RequestFacts,
    destination: Option<&'a DestinationDescriptor>,
}

impl<'a> RequestInfo<'a> {
    pub fn new(facts: &'a RequestFacts, destination: Option<&'a DestinationDescriptor>) -> Self {
        Self { facts, destination }
    }

    pub fn facts(&self) -> &'a RequestFacts {
        self.facts
    }

    /// The matched destination, `None` when the routing table did not recognize the request
    pub fn destination(&self) -> Option<&'a DestinationDescriptor> {
        self.destination
    }

    #[inline]
    pub fn is_recognized(&self) -> bool {
        self.destination.is_some()
    }
}

type PredicateFn = dyn Fn(&RequestInfo<'_>, Option<u64>) -> bool + Send + Sync;

/// A shared callback returning `true` when the request must be rejected.
///
/// The second argument is the declared size, `None` when the request only announced a
/// `Transfer-Encoding`.
#[derive(Clone)]
pub struct SizePredicate {
    f: Arc<PredicateFn>,
}

impl SizePredicate {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&RequestInfo<'_>, Option<u64>) -> bool + Send + Sync + 'static,
    {
        Self { f: Arc::new(f) }
    }

    #[inline]
    pub fn rejects(&self, info: &RequestInfo<'_>, declared_size: Option<u64>) -> bool {
        (self.f)(info, declared_size)
    }
}

impl Debug for SizePredicate {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("SizePredicate(..)")
    }
}

/// Two predicates are equal only when they share the same callback.
impl PartialEq for SizePredicate {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.f, &other.f)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum SizeLimit {
    #[default]
    Unset,
    Numeric(u64),
    AlwaysReject,
    NeverCheck,
    Predicate(SizePredicate),
}

impl SizeLimit {
    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(&RequestInfo<'_>, Option<u64>) -> bool + Send + Sync + 'static,
    {
        Self::Predicate(SizePredicate::new(f))
    }

    #[inline]
    pub fn is_unset(&self) -> bool {
        matches!(self, Self::Unset)
    }

    /// The byte threshold, only known for [`SizeLimit::Numeric`]
    #[inline]
    pub fn bytes(&self) -> Option<u64> {
        match self {
            Self::Numeric(n) => Some(*n),
            _ => None,
        }
    }

    /// `AlwaysReject` and `NeverCheck` only make sense for requests the router doesn't know.
    #[inline]
    pub fn is_unrecognized_only(&self) -> bool {
        matches!(self, Self::AlwaysReject | Self::NeverCheck)
    }
}

impl From<u64> for SizeLimit {
    fn from(bytes: u64) -> Self {
        Self::Numeric(bytes)
    }
}

impl Display for SizeLimit {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unset => f.write_str("unset"),
            Self::Numeric(n) => write!(f, "{n} bytes"),
            Self::AlwaysReject => f.write_str("always-reject"),
            Self::NeverCheck => f.write_str("never-check"),
            Self::Predicate(_) => f.write_str("predicate"),
        }
    }
}
