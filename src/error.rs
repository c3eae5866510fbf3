//! Bridge error types.

use graphql_stores_client::ClientError;
use graphql_stores_core::{ScheduleError, ScopeError};
use thiserror::Error;

use crate::settings::SettingsError;

/// Result type for bridge operations.
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Errors surfaced by the bridge.
///
/// Cache misses during a hydration pre-read never appear here; they only
/// mean the query starts without an initial value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum BridgeError {
	/// The client failed, e.g. a cache seed was rejected.
	#[error(transparent)]
	Client(#[from] ClientError),

	/// A scope rule was broken, e.g. providing a client after mount.
	#[error(transparent)]
	Scope(#[from] ScopeError),

	/// The standalone scheduler could not defer the end of a restoring window.
	#[error(transparent)]
	Schedule(#[from] ScheduleError),

	/// Settings could not be loaded.
	#[error(transparent)]
	Settings(#[from] SettingsError),

	/// No client was provided in the scope or any of its ancestors.
	#[error("no GraphQL client provided for scope {0}")]
	NoClient(usize),
}
