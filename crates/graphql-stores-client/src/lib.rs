//! graphql-stores-client - GraphQL Client Interface
//!
//! The seam between graphql-stores and a concrete GraphQL client. A client
//! owns its cache, network transport and polling timers; this crate only
//! describes what the stores need from it.
//!
//! - [`GraphQLClient`]: watch, read, write, mutate and subscribe
//! - [`LiveQuery`]: a watched query that pushes [`QueryEnvelope`]s and can be
//!   refetched, paginated, polled and merged with subscription data
//! - [`ClientHandle`]: a shared client with a stable identity
//! - [`GraphQLDocument`]: a validated operation text
//!
//! GraphQL errors returned by a server are data ([`GraphQLError`] inside an
//! envelope). [`ClientError`] is reserved for failures of the client itself.

#![warn(missing_docs)]

pub mod client;
pub mod document;
pub mod error;
pub mod options;
pub mod types;

pub use client::{ClientHandle, ClientId, GraphQLClient, LiveQuery};
pub use document::{GraphQLDocument, OperationKind};
pub use error::{ClientError, ClientResult};
pub use options::{
	FetchMoreOptions, MergeFn, MutationOptions, QueryOptions, SubscribeToMoreOptions,
	SubscriptionOptions, UpdateQueryFn, WriteQueryOptions,
};
pub use types::{
	FetchPolicy, GraphQLError, MutationResult, NetworkStatus, QueryEnvelope, SubscriptionEnvelope,
	Variables,
};
