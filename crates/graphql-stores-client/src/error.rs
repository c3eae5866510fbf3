//! Client error types.

use thiserror::Error;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Failures of the GraphQL client itself.
///
/// Errors reported by the GraphQL server travel inside result envelopes as
/// [`GraphQLError`](crate::GraphQLError) values and never show up here.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ClientError {
	/// The operation text is not a valid GraphQL document.
	#[error("invalid GraphQL document: {0}")]
	InvalidDocument(String),

	/// The cache holds no complete result for the operation.
	#[error("cache miss for operation {0}")]
	CacheMiss(String),

	/// Writing to the cache failed.
	#[error("cache write failed: {0}")]
	CacheWrite(String),

	/// The transport failed before a GraphQL response was received.
	#[error("network error: {0}")]
	Network(String),

	/// The client or query has been shut down.
	#[error("client closed")]
	Closed,

	/// Any other client-specific failure.
	#[error("{0}")]
	Other(String),
}
