//! Fail-soft recovery policy for gateway calls.
//!
//! The storefront never blocks a page on a table-store outage: every
//! gateway failure crossing a page-fetch boundary is logged and converted
//! into a default value. This is availability-over-correctness, chosen on
//! purpose; the policy lives in one object so tests can pin the exact
//! fallback per error kind.

use crate::gateway::GatewayError;

/// Default-on-error wrapper for gateway results.
///
/// `Copy` and stateless; held by value wherever a fallback boundary
/// exists so the boundary is visible in the type, not buried in a catch
/// block.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailSoft;

impl FailSoft {
    /// Unwrap `result`, falling back to `T::default()` on any gateway
    /// error. The failure is logged under `op` and never re-thrown.
    pub fn recover<T: Default>(self, op: &'static str, result: Result<T, GatewayError>) -> T {
        self.recover_or(op, result, T::default())
    }

    /// Unwrap `result`, falling back to `fallback` on any gateway error.
    pub fn recover_or<T>(self, op: &'static str, result: Result<T, GatewayError>, fallback: T) -> T {
        match result {
            Ok(value) => value,
            Err(GatewayError::NotFound(what)) => {
                tracing::debug!(op, what = %what, "no matching record, using fallback");
                fallback
            }
            Err(err) => {
                tracing::warn!(op, error = %err, "gateway call failed, using fallback");
                fallback
            }
        }
    }
}
