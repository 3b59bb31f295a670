//! Unique test data backed by ULIDs.

use ulid::Ulid;

/// `{prefix}-{ulid}`. Also a valid idempotency key for any ASCII prefix.
///
/// ```
/// use backend_test_support::unique_helpers::unique_str;
///
/// let a = unique_str("key");
/// let b = unique_str("key");
/// assert_ne!(a, b);
/// assert!(a.starts_with("key-"));
/// ```
pub fn unique_str(prefix: &str) -> String {
    format!("{}-{}", prefix, Ulid::new())
}
