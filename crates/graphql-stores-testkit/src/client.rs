//! In-memory GraphQL client
//!
//! [`MockClient`] keeps a normalized-enough cache keyed by document text and
//! variables, records every call, and hands out [`MockLiveQuery`] instances
//! the test drives by hand.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::{Rc, Weak};

use async_trait::async_trait;
use graphql_stores_client::{
	ClientError, ClientHandle, ClientResult, FetchPolicy, GraphQLClient, GraphQLDocument, LiveQuery,
	MutationOptions, MutationResult, QueryEnvelope, QueryOptions, SubscriptionEnvelope,
	SubscriptionOptions, Variables, WriteQueryOptions,
};
use graphql_stores_core::Observable;
use serde_json::Value;
use tracing::debug;

use crate::live_query::{MockLiveQuery, SubscriptionSources, source_for};
use crate::source::PushSource;

/// A call made on a [`MockClient`].
#[derive(Debug, Clone, PartialEq)]
pub enum ClientCall {
	/// `watch_query`.
	WatchQuery {
		/// Document text.
		query: String,
		/// Variables.
		variables: Variables,
	},
	/// `read_query`.
	ReadQuery {
		/// Document text.
		query: String,
		/// Variables.
		variables: Variables,
	},
	/// `write_query`.
	WriteQuery {
		/// Document text.
		query: String,
		/// Variables.
		variables: Variables,
		/// Data written.
		data: Value,
	},
	/// `mutate`.
	Mutate {
		/// Document text.
		mutation: String,
		/// Variables.
		variables: Variables,
	},
	/// `subscribe`.
	Subscribe {
		/// Document text.
		query: String,
		/// Variables.
		variables: Variables,
	},
}

struct CacheEntry {
	query: GraphQLDocument,
	variables: Variables,
	data: Value,
}

#[derive(Default)]
struct MockState {
	cache: RefCell<Vec<CacheEntry>>,
	fail_next_write: Cell<bool>,
	mutation_results: RefCell<VecDeque<ClientResult<MutationResult>>>,
	calls: RefCell<Vec<ClientCall>>,
	live_queries: RefCell<Vec<MockLiveQuery>>,
	sources: SubscriptionSources,
	shared: RefCell<Weak<MockClient>>,
}

/// An in-memory [`GraphQLClient`].
///
/// Clones share state, so a test can keep one clone for inspection and hand
/// another to the code under test.
///
/// # Examples
///
/// ```
/// use graphql_stores_client::{GraphQLClient, GraphQLDocument, WriteQueryOptions};
/// use graphql_stores_testkit::MockClient;
/// use serde_json::json;
///
/// let client = MockClient::new();
/// let doc = GraphQLDocument::parse("query Me { me { id } }").unwrap();
/// let seed = WriteQueryOptions::new(doc, json!({"me": {"id": 1}}));
///
/// client.write_query(&seed).unwrap();
/// assert_eq!(client.read_query(&seed.as_query()).unwrap(), Some(json!({"me": {"id": 1}})));
/// ```
#[derive(Clone, Default)]
pub struct MockClient {
	state: Rc<MockState>,
}

impl MockClient {
	/// Creates a client with an empty cache.
	pub fn new() -> Self {
		Self::default()
	}

	/// A handle to this client.
	///
	/// Handles taken while another is alive share its identity, the way an
	/// application shares one client instance.
	pub fn handle(&self) -> ClientHandle {
		let mut shared = self.state.shared.borrow_mut();
		let client = match shared.upgrade() {
			Some(client) => client,
			None => {
				let client = Rc::new(self.clone());
				*shared = Rc::downgrade(&client);
				client
			}
		};
		ClientHandle::from_rc(client)
	}

	/// Makes the next `write_query` fail.
	pub fn fail_next_write(&self) {
		self.state.fail_next_write.set(true);
	}

	/// Queues the outcome of the next `mutate`.
	///
	/// Unscripted mutations resolve to an empty result.
	pub fn push_mutation_result(&self, result: ClientResult<MutationResult>) {
		self.state.mutation_results.borrow_mut().push_back(result);
	}

	/// Every call recorded so far.
	pub fn calls(&self) -> Vec<ClientCall> {
		self.state.calls.borrow().clone()
	}

	/// Number of `write_query` calls.
	pub fn write_count(&self) -> usize {
		self.state
			.calls
			.borrow()
			.iter()
			.filter(|c| matches!(c, ClientCall::WriteQuery { .. }))
			.count()
	}

	/// Every live query handed out, oldest first.
	pub fn live_queries(&self) -> Vec<MockLiveQuery> {
		self.state.live_queries.borrow().clone()
	}

	/// The most recently watched query.
	pub fn last_live_query(&self) -> Option<MockLiveQuery> {
		self.state.live_queries.borrow().last().cloned()
	}

	/// The push source backing subscriptions to `document`.
	pub fn subscription_source(&self, document: &GraphQLDocument) -> Rc<PushSource<SubscriptionEnvelope>> {
		source_for(&self.state.sources, document.as_str())
	}

	/// Cached data for `options`, bypassing call recording.
	pub fn cached(&self, options: &QueryOptions) -> Option<Value> {
		self.state
			.cache
			.borrow()
			.iter()
			.find(|e| e.query == options.query && e.variables == options.variables)
			.map(|e| e.data.clone())
	}

	fn record(&self, call: ClientCall) {
		self.state.calls.borrow_mut().push(call);
	}
}

#[async_trait(?Send)]
impl GraphQLClient for MockClient {
	fn watch_query(&self, options: &QueryOptions) -> Rc<dyn LiveQuery> {
		self.record(ClientCall::WatchQuery {
			query: options.query.as_str().to_string(),
			variables: options.variables.clone(),
		});

		let current = match options.fetch_policy {
			FetchPolicy::NetworkOnly | FetchPolicy::NoCache => None,
			_ => self
				.cached(options)
				.filter(|data| !data.is_null())
				.map(QueryEnvelope::from_data),
		};
		debug!(query = options.query.label(), cached = current.is_some(), "mock watch");

		let live = MockLiveQuery::new(options.clone(), current, self.state.sources.clone());
		self.state.live_queries.borrow_mut().push(live.clone());
		Rc::new(live)
	}

	fn read_query(&self, options: &QueryOptions) -> ClientResult<Option<Value>> {
		self.record(ClientCall::ReadQuery {
			query: options.query.as_str().to_string(),
			variables: options.variables.clone(),
		});
		match self.cached(options) {
			Some(Value::Null) => Ok(None),
			Some(data) => Ok(Some(data)),
			None => Err(ClientError::CacheMiss(options.query.label().to_string())),
		}
	}

	fn write_query(&self, options: &WriteQueryOptions) -> ClientResult<()> {
		self.record(ClientCall::WriteQuery {
			query: options.query.as_str().to_string(),
			variables: options.variables.clone(),
			data: options.data.clone(),
		});

		if self.state.fail_next_write.replace(false) {
			return Err(ClientError::CacheWrite("scripted failure".to_string()));
		}
		if !options.data.is_object() && !options.data.is_null() {
			return Err(ClientError::CacheWrite(format!(
				"data for {} must be an object",
				options.query.label()
			)));
		}

		{
			let mut cache = self.state.cache.borrow_mut();
			match cache
				.iter_mut()
				.find(|e| e.query == options.query && e.variables == options.variables)
			{
				Some(entry) => entry.data = options.data.clone(),
				None => cache.push(CacheEntry {
					query: options.query.clone(),
					variables: options.variables.clone(),
					data: options.data.clone(),
				}),
			}
		}

		// Broadcast to watchers of the same query, as a normalized cache would.
		let watchers: Vec<MockLiveQuery> = self
			.state
			.live_queries
			.borrow()
			.iter()
			.filter(|live| live.watches(&options.as_query()))
			.cloned()
			.collect();
		for live in watchers {
			live.emit(QueryEnvelope::from_data(options.data.clone()));
		}
		Ok(())
	}

	async fn mutate(&self, options: &MutationOptions) -> ClientResult<MutationResult> {
		self.record(ClientCall::Mutate {
			mutation: options.mutation.as_str().to_string(),
			variables: options.variables.clone(),
		});
		let result = self
			.state
			.mutation_results
			.borrow_mut()
			.pop_front()
			.unwrap_or_else(|| Ok(MutationResult::default()));

		if result.is_ok() {
			let watchers: Vec<MockLiveQuery> = self
				.state
				.live_queries
				.borrow()
				.iter()
				.filter(|live| options.refetch_queries.contains(&live.options().query))
				.cloned()
				.collect();
			for live in watchers {
				live.run_refetch(None);
			}
		}
		result
	}

	fn subscribe(&self, options: &SubscriptionOptions) -> Rc<dyn Observable<SubscriptionEnvelope>> {
		self.record(ClientCall::Subscribe {
			query: options.query.as_str().to_string(),
			variables: options.variables.clone(),
		});
		source_for(&self.state.sources, options.query.as_str())
	}
}

impl fmt::Debug for MockClient {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("MockClient")
			.field("cache_entries", &self.state.cache.borrow().len())
			.field("calls", &self.state.calls.borrow().len())
			.field("live_queries", &self.state.live_queries.borrow().len())
			.finish()
	}
}
