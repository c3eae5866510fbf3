//! Result envelopes and shared value types

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Operation variables.
///
/// Structural equality of two variable sets is plain `==`.
pub type Variables = serde_json::Map<String, Value>;

/// How a watched query uses the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FetchPolicy {
	/// Answer from the cache, go to the network only on a miss.
	#[default]
	CacheFirst,
	/// Answer from the cache and always refresh from the network.
	CacheAndNetwork,
	/// Always go to the network, store the result in the cache.
	NetworkOnly,
	/// Never go to the network.
	CacheOnly,
	/// Always go to the network, leave the cache alone.
	NoCache,
}

/// Progress of a watched query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NetworkStatus {
	/// First load in flight.
	Loading,
	/// Variables changed, new load in flight.
	SetVariables,
	/// Pagination request in flight.
	FetchMore,
	/// Explicit refetch in flight.
	Refetch,
	/// Poll request in flight.
	Poll,
	/// Idle with a result.
	#[default]
	Ready,
	/// Idle with errors.
	Error,
}

impl NetworkStatus {
	/// Whether a request is in flight.
	pub fn is_in_flight(self) -> bool {
		!matches!(self, Self::Ready | Self::Error)
	}
}

/// A GraphQL error reported in a response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphQLError {
	/// Human-readable description.
	pub message: String,
	/// Path of the field that failed, if any.
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub path: Vec<Value>,
}

impl GraphQLError {
	/// Creates an error with no path.
	pub fn new(message: impl Into<String>) -> Self {
		Self {
			message: message.into(),
			path: Vec::new(),
		}
	}
}

/// One result pushed by a watched query.
///
/// `data` is `None` while nothing has been loaded.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryEnvelope {
	/// Result data.
	pub data: Option<Value>,
	/// Whether a request is in flight.
	pub loading: bool,
	/// Detailed progress.
	pub network_status: NetworkStatus,
	/// Errors reported by the server alongside (or instead of) data.
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub errors: Vec<GraphQLError>,
}

impl QueryEnvelope {
	/// A settled envelope carrying `data`.
	pub fn from_data(data: Value) -> Self {
		Self {
			data: Some(data),
			loading: false,
			network_status: NetworkStatus::Ready,
			errors: Vec::new(),
		}
	}

	/// An envelope for a first load still in flight.
	pub fn loading() -> Self {
		Self {
			data: None,
			loading: true,
			network_status: NetworkStatus::Loading,
			errors: Vec::new(),
		}
	}

	/// An envelope carrying server errors and no data.
	pub fn from_errors(errors: Vec<GraphQLError>) -> Self {
		Self {
			data: None,
			loading: false,
			network_status: NetworkStatus::Error,
			errors,
		}
	}

	/// Whether the server reported errors.
	pub fn has_errors(&self) -> bool {
		!self.errors.is_empty()
	}
}

/// Result of a mutation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MutationResult {
	/// Result data.
	pub data: Option<Value>,
	/// Errors reported by the server.
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub errors: Vec<GraphQLError>,
}

/// One event pushed by a GraphQL subscription.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SubscriptionEnvelope {
	/// Event data.
	pub data: Option<Value>,
	/// Errors reported by the server.
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub errors: Vec<GraphQLError>,
}

impl SubscriptionEnvelope {
	/// An event carrying `data`.
	pub fn from_data(data: Value) -> Self {
		Self {
			data: Some(data),
			errors: Vec::new(),
		}
	}
}
