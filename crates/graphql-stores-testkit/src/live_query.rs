//! In-memory watched query

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use async_trait::async_trait;
use graphql_stores_client::{
	ClientError, ClientResult, FetchMoreOptions, LiveQuery, QueryEnvelope, QueryOptions,
	SubscribeToMoreOptions, SubscriptionEnvelope, UpdateQueryFn, Variables,
};
use graphql_stores_core::{Next, Observable, Subscription};
use serde_json::Value;
use tracing::debug;

use crate::source::PushSource;

type Observer = Rc<RefCell<Next<QueryEnvelope>>>;

pub(crate) type SubscriptionSources =
	Rc<RefCell<BTreeMap<String, Rc<PushSource<SubscriptionEnvelope>>>>>;

pub(crate) fn source_for(sources: &SubscriptionSources, document: &str) -> Rc<PushSource<SubscriptionEnvelope>> {
	sources
		.borrow_mut()
		.entry(document.to_string())
		.or_insert_with(|| Rc::new(PushSource::new()))
		.clone()
}

/// A call made on a [`MockLiveQuery`].
#[derive(Debug, Clone, PartialEq)]
pub enum LiveQueryCall {
	/// `refetch` with the variables passed.
	Refetch(Option<Variables>),
	/// `fetch_more` with the merged page variables.
	FetchMore(Variables),
	/// `set_options` with the new variables.
	SetOptions(Variables),
	/// `update_query`.
	UpdateQuery,
	/// `start_polling`.
	StartPolling(Duration),
	/// `stop_polling`.
	StopPolling,
	/// `subscribe_to_more` with the subscription document text.
	SubscribeToMore(String),
}

struct LiveState {
	options: RefCell<QueryOptions>,
	current: RefCell<Option<QueryEnvelope>>,
	observers: Rc<RefCell<BTreeMap<u64, Observer>>>,
	next_id: Cell<u64>,
	opened: Cell<usize>,
	calls: RefCell<Vec<LiveQueryCall>>,
	network: RefCell<Option<Value>>,
	pages: RefCell<VecDeque<Value>>,
	polling: Cell<Option<Duration>>,
	sources: SubscriptionSources,
}

/// A watched query whose results are driven by the test.
///
/// Subscribing replays the current result, the way a cache-backed client
/// does. Network results arrive through [`MockLiveQuery::emit`] or, for
/// `refetch`, from [`MockLiveQuery::respond_with`].
#[derive(Clone)]
pub struct MockLiveQuery {
	state: Rc<LiveState>,
}

impl MockLiveQuery {
	pub(crate) fn new(
		options: QueryOptions,
		current: Option<QueryEnvelope>,
		sources: SubscriptionSources,
	) -> Self {
		Self {
			state: Rc::new(LiveState {
				options: RefCell::new(options),
				current: RefCell::new(current),
				observers: Rc::new(RefCell::new(BTreeMap::new())),
				next_id: Cell::new(0),
				opened: Cell::new(0),
				calls: RefCell::new(Vec::new()),
				network: RefCell::new(None),
				pages: RefCell::new(VecDeque::new()),
				polling: Cell::new(None),
				sources,
			}),
		}
	}

	/// Pushes `envelope` to every observer and makes it the current result.
	pub fn emit(&self, envelope: QueryEnvelope) {
		*self.state.current.borrow_mut() = Some(envelope.clone());
		let observers: Vec<Observer> = self.state.observers.borrow().values().cloned().collect();
		debug!(observers = observers.len(), "mock live query emitting");
		for observer in observers {
			(observer.borrow_mut())(envelope.clone());
		}
	}

	/// Data the next `refetch` resolves with.
	pub fn respond_with(&self, data: Value) {
		*self.state.network.borrow_mut() = Some(data);
	}

	/// Queues a page for the next `fetch_more`.
	pub fn push_page(&self, page: Value) {
		self.state.pages.borrow_mut().push_back(page);
	}

	/// The current result, if any.
	pub fn current(&self) -> Option<QueryEnvelope> {
		self.state.current.borrow().clone()
	}

	/// The options the query currently runs with.
	pub fn options(&self) -> QueryOptions {
		self.state.options.borrow().clone()
	}

	/// Observers currently attached.
	pub fn observer_count(&self) -> usize {
		self.state.observers.borrow().len()
	}

	/// Subscriptions opened so far, including cancelled ones.
	pub fn subscribe_count(&self) -> usize {
		self.state.opened.get()
	}

	/// Every call recorded so far.
	pub fn calls(&self) -> Vec<LiveQueryCall> {
		self.state.calls.borrow().clone()
	}

	/// Number of `refetch` calls.
	pub fn refetch_count(&self) -> usize {
		self.state
			.calls
			.borrow()
			.iter()
			.filter(|c| matches!(c, LiveQueryCall::Refetch(_)))
			.count()
	}

	/// Poll interval in effect.
	pub fn polling(&self) -> Option<Duration> {
		self.state.polling.get()
	}

	/// Whether this query watches `options`' document and variables.
	pub(crate) fn watches(&self, options: &QueryOptions) -> bool {
		let own = self.state.options.borrow();
		own.query == options.query && own.variables == options.variables
	}

	/// Runs a refetch: re-emits the scripted network data, or the current result.
	pub(crate) fn run_refetch(&self, variables: Option<Variables>) -> QueryEnvelope {
		self.record(LiveQueryCall::Refetch(variables.clone()));
		if let Some(variables) = variables {
			self.state.options.borrow_mut().variables = variables;
		}
		let network = self.state.network.borrow_mut().take();
		let envelope = match network {
			Some(data) => QueryEnvelope::from_data(data),
			None => self.current().unwrap_or_else(QueryEnvelope::loading),
		};
		self.emit(envelope.clone());
		envelope
	}

	fn record(&self, call: LiveQueryCall) {
		self.state.calls.borrow_mut().push(call);
	}
}

#[async_trait(?Send)]
impl LiveQuery for MockLiveQuery {
	fn variables(&self) -> Variables {
		self.state.options.borrow().variables.clone()
	}

	fn subscribe(&self, next: Next<QueryEnvelope>) -> Subscription {
		let id = self.state.next_id.get();
		self.state.next_id.set(id + 1);
		self.state.opened.set(self.state.opened.get() + 1);

		let observer: Observer = Rc::new(RefCell::new(next));
		self.state.observers.borrow_mut().insert(id, observer.clone());

		let current = self.current();
		if let Some(envelope) = current {
			(observer.borrow_mut())(envelope);
		}

		let observers = Rc::downgrade(&self.state.observers);
		Subscription::new(move || {
			if let Some(observers) = observers.upgrade() {
				observers.borrow_mut().remove(&id);
			}
		})
	}

	async fn result(&self) -> ClientResult<QueryEnvelope> {
		Ok(self.current().unwrap_or_else(QueryEnvelope::loading))
	}

	async fn refetch(&self, variables: Option<Variables>) -> ClientResult<QueryEnvelope> {
		Ok(self.run_refetch(variables))
	}

	async fn fetch_more(&self, options: FetchMoreOptions) -> ClientResult<QueryEnvelope> {
		let mut variables = self.variables();
		variables.extend(options.variables.clone());
		self.record(LiveQueryCall::FetchMore(variables));

		let page = self
			.state
			.pages
			.borrow_mut()
			.pop_front()
			.ok_or_else(|| ClientError::Network("no page queued".to_string()))?;

		let previous = self.current().and_then(|e| e.data);
		let merged = match (&options.update_query, previous) {
			(Some(merge), Some(previous)) => merge(&previous, &page),
			_ => page,
		};
		let envelope = QueryEnvelope::from_data(merged);
		self.emit(envelope.clone());
		Ok(envelope)
	}

	async fn set_options(&self, options: QueryOptions) -> ClientResult<QueryEnvelope> {
		self.record(LiveQueryCall::SetOptions(options.variables.clone()));
		*self.state.options.borrow_mut() = options;
		Ok(self.current().unwrap_or_else(QueryEnvelope::loading))
	}

	fn update_query(&self, map: UpdateQueryFn) {
		self.record(LiveQueryCall::UpdateQuery);
		let previous = self.current().and_then(|e| e.data);
		let variables = self.variables();
		if let Some(data) = map(previous.as_ref(), &variables) {
			self.emit(QueryEnvelope::from_data(data));
		}
	}

	fn start_polling(&self, interval: Duration) {
		self.record(LiveQueryCall::StartPolling(interval));
		self.state.polling.set(Some(interval));
	}

	fn stop_polling(&self) {
		self.record(LiveQueryCall::StopPolling);
		self.state.polling.set(None);
	}

	fn subscribe_to_more(&self, options: SubscribeToMoreOptions) -> Subscription {
		self.record(LiveQueryCall::SubscribeToMore(options.document.as_str().to_string()));
		let source = source_for(&self.state.sources, options.document.as_str());
		let target = Rc::downgrade(&self.state);
		let merge = options.update_query.clone();

		source.subscribe(Box::new(move |event: SubscriptionEnvelope| {
			let (Some(state), Some(data)) = (target.upgrade(), event.data) else {
				return;
			};
			let query = MockLiveQuery { state };
			let previous = query.current().and_then(|e| e.data);
			let next = match (&merge, previous) {
				(Some(merge), Some(previous)) => merge(&previous, &data),
				_ => data,
			};
			query.emit(QueryEnvelope::from_data(next));
		}))
	}
}

impl fmt::Debug for MockLiveQuery {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("MockLiveQuery")
			.field("query", &self.state.options.borrow().query.label())
			.field("observers", &self.observer_count())
			.field("current", &self.state.current.borrow())
			.finish()
	}
}
