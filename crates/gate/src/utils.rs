/// Returns early with an error if the condition does not hold.
///
/// ```ignore
/// ensure!(!limit.is_unrecognized_only(), ConfigError::shape_not_allowed(slot, limit));
/// ```
macro_rules! ensure {
    ($predicate:expr, $error:expr) => {
        if !$predicate {
            return Err($error);
        }
    };
}

pub(crate) use ensure;
