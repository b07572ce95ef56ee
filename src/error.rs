//! Errors raised when a query is composed from malformed input.

use thiserror::Error;

/// A precondition violated while composing a query.
///
/// These are caller bugs rather than runtime conditions, so nothing in the
/// crate retries or recovers from them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("field name must not be empty ({operation})")]
    EmptyField { operation: &'static str },

    #[error("phrase value for field `{field}` must not be empty")]
    EmptyValue { field: String },

    #[error("range on field `{field}` is inverted: {min} > {max}")]
    InvertedRange { field: String, min: i64, max: i64 },

    #[error("user id at position {position} is empty")]
    EmptyUserId { position: usize },
}
