//! Client and live query traits
//!
//! Both traits are object safe and single-threaded: async methods are
//! declared with `#[async_trait(?Send)]` so implementations can hold `Rc`
//! state, as browser clients do.

use std::fmt;
use std::ops::Deref;
use std::rc::Rc;
use std::time::Duration;

use async_trait::async_trait;
use graphql_stores_core::{Next, Observable, Subscription};
use serde_json::Value;

use crate::error::ClientResult;
use crate::options::{
	FetchMoreOptions, MutationOptions, QueryOptions, SubscribeToMoreOptions, SubscriptionOptions,
	UpdateQueryFn, WriteQueryOptions,
};
use crate::types::{MutationResult, QueryEnvelope, SubscriptionEnvelope, Variables};

/// A GraphQL client: cache, transport and query execution.
#[async_trait(?Send)]
pub trait GraphQLClient {
	/// Starts watching a query.
	///
	/// The client may begin fetching or polling right away, whether or not
	/// anyone subscribes to the returned query.
	fn watch_query(&self, options: &QueryOptions) -> Rc<dyn LiveQuery>;

	/// Reads a query synchronously from the cache.
	///
	/// `Ok(None)` means the cache answered with an empty result. A miss is
	/// reported as an error.
	fn read_query(&self, options: &QueryOptions) -> ClientResult<Option<Value>>;

	/// Writes data for a query into the cache.
	fn write_query(&self, options: &WriteQueryOptions) -> ClientResult<()>;

	/// Executes a mutation.
	async fn mutate(&self, options: &MutationOptions) -> ClientResult<MutationResult>;

	/// Opens a GraphQL subscription.
	fn subscribe(&self, options: &SubscriptionOptions) -> Rc<dyn Observable<SubscriptionEnvelope>>;
}

/// A watched query owned by a client.
#[async_trait(?Send)]
pub trait LiveQuery {
	/// Variables the query currently runs with.
	fn variables(&self) -> Variables;

	/// Pushes every result envelope to `next` until the token is cancelled.
	fn subscribe(&self, next: Next<QueryEnvelope>) -> Subscription;

	/// The current result.
	async fn result(&self) -> ClientResult<QueryEnvelope>;

	/// Re-executes the query, optionally with new variables.
	async fn refetch(&self, variables: Option<Variables>) -> ClientResult<QueryEnvelope>;

	/// Loads another page and merges it into the result.
	async fn fetch_more(&self, options: FetchMoreOptions) -> ClientResult<QueryEnvelope>;

	/// Replaces the query's options.
	async fn set_options(&self, options: QueryOptions) -> ClientResult<QueryEnvelope>;

	/// Rewrites the cached result locally.
	fn update_query(&self, map: UpdateQueryFn);

	/// Starts polling at `interval`.
	fn start_polling(&self, interval: Duration);

	/// Stops polling.
	fn stop_polling(&self);

	/// Merges a subscription's events into the result until the token is cancelled.
	fn subscribe_to_more(&self, options: SubscribeToMoreOptions) -> Subscription;
}

impl Observable<QueryEnvelope> for dyn LiveQuery {
	fn subscribe(&self, next: Next<QueryEnvelope>) -> Subscription {
		LiveQuery::subscribe(self, next)
	}
}

/// Identity of a shared client: the address of its allocation.
///
/// Stable while any handle to the client is alive. A client created after
/// every handle to an earlier one was dropped may reuse its identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClientId(usize);

impl ClientId {
	fn of(client: &Rc<dyn GraphQLClient>) -> Self {
		Self(Rc::as_ptr(client).cast::<()>() as usize)
	}
}

impl fmt::Display for ClientId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "client-{:#x}", self.0)
	}
}

/// A shared client with a stable identity.
///
/// Every handle wrapping the same `Rc` has the same identity, so clones and
/// handles rebuilt with [`ClientHandle::from_rc`] share restoring windows.
/// [`ClientHandle::new`] allocates, so each call yields a new identity.
#[derive(Clone)]
pub struct ClientHandle {
	id: ClientId,
	client: Rc<dyn GraphQLClient>,
}

impl ClientHandle {
	/// Moves `client` into a new shared allocation.
	pub fn new<C: GraphQLClient + 'static>(client: C) -> Self {
		Self::from_rc(Rc::new(client))
	}

	/// Wraps an already shared client; the identity follows the allocation.
	pub fn from_rc(client: Rc<dyn GraphQLClient>) -> Self {
		Self {
			id: ClientId::of(&client),
			client,
		}
	}

	/// The identity of this handle.
	pub fn id(&self) -> ClientId {
		self.id
	}

	/// Whether both handles share an identity.
	pub fn same_client(&self, other: &ClientHandle) -> bool {
		self.id == other.id
	}
}

impl Deref for ClientHandle {
	type Target = dyn GraphQLClient;

	fn deref(&self) -> &Self::Target {
		&*self.client
	}
}

impl fmt::Debug for ClientHandle {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("ClientHandle").field(&self.id).finish()
	}
}
