//! Query bridge
//!
//! [`query`] turns a client's watched query into a lazy [`Readable`] store.
//!
//! When the client is inside a restoring window, the cache is read
//! synchronously first and the store starts with that result. The watched
//! query usually re-emits the same result as soon as it is subscribed; the
//! store drops that one re-emission so consumers do not render the cached
//! result twice. See [`DedupWindow`]. Every other push reaches subscribers,
//! even one equal to the current value.
//!
//! ## Example
//!
//! ```ignore
//! let feed = query(&session, &client, &QueryOptions::new(feed_query));
//!
//! let _sub = feed.subscribe(|envelope| match envelope {
//!     Some(envelope) if !envelope.loading => render(&envelope.data),
//!     _ => render_spinner(),
//! });
//! ```

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use graphql_stores_client::{
	ClientHandle, ClientResult, FetchMoreOptions, LiveQuery, QueryEnvelope, QueryOptions,
	SubscribeToMoreOptions, UpdateQueryFn, Variables,
};
use graphql_stores_core::{Readable, Setter, Subscription, observe};
use tracing::{debug, trace};

use crate::hydration::HydrationSession;
use crate::settings::QuerySettings;

/// One-shot duplicate suppression for a single activation of a query store.
///
/// The first value of every activation is the relay's current value, which
/// the store already holds; it only initializes the window. After that each
/// value is a push from the watched query.
///
/// ```text
/// Unarmed --value--> Spent   (current)
/// Armed   --value--> Fired   (current)
/// Fired   --value--> Spent   (drop)
/// Spent   --value--> Spent   (push)
/// ```
///
/// A window is armed only when the store starts with an initial value, so at
/// most one push is ever dropped per activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DedupWindow {
	/// Not initialized; no duplicate expected.
	Unarmed,
	/// Not initialized; the first push will be the duplicate.
	Armed,
	/// Initialized; the next push is the duplicate.
	Fired,
	/// Initialized, nothing left to drop.
	Spent,
}

/// What to do with a value admitted by a [`DedupWindow`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
	/// The relay's current value: store it, notifying only if it changed.
	Current,
	/// A push from the watched query: always deliver it.
	Push,
	/// The re-emission of the initial value: drop it.
	Drop,
}

impl DedupWindow {
	/// The starting state for a store that does or does not have an initial value.
	pub fn new(has_initial: bool) -> Self {
		if has_initial { Self::Armed } else { Self::Unarmed }
	}

	/// Consumes one value. Returns the next state and how to treat the value.
	pub fn admit(self) -> (Self, Admission) {
		match self {
			Self::Unarmed => (Self::Spent, Admission::Current),
			Self::Armed => (Self::Fired, Admission::Current),
			Self::Fired => (Self::Spent, Admission::Drop),
			Self::Spent => (Self::Spent, Admission::Push),
		}
	}
}

/// A watched query exposed as a lazy store plus its control surface.
///
/// The store holds `None` until the first result arrives. Clones share the
/// store, the watched query and the subscription history.
#[derive(Clone)]
pub struct QueryHandle {
	store: Readable<Option<QueryEnvelope>>,
	live: Rc<dyn LiveQuery>,
	subscribed: Rc<Cell<bool>>,
	settings: QuerySettings,
	label: Rc<str>,
}

/// Bridges `options` on `client` into a [`QueryHandle`] with default settings.
pub fn query(session: &HydrationSession, client: &ClientHandle, options: &QueryOptions) -> QueryHandle {
	query_with_settings(session, client, options, QuerySettings::default())
}

/// Bridges `options` on `client` into a [`QueryHandle`].
///
/// The client starts watching right away, whether or not the handle is ever
/// subscribed.
pub fn query_with_settings(
	session: &HydrationSession,
	client: &ClientHandle,
	options: &QueryOptions,
	settings: QuerySettings,
) -> QueryHandle {
	let label: Rc<str> = Rc::from(options.query.label());
	let initial = read_initial(session, client, options);
	let live = client.watch_query(options);

	let relay = observe(live.clone(), initial.clone());
	let subscribed = Rc::new(Cell::new(false));
	let armed = initial.is_some();

	let store = {
		let subscribed = subscribed.clone();
		let label = label.clone();
		Readable::new(initial, move |set: Setter<Option<QueryEnvelope>>| {
			subscribed.set(true);
			trace!(query = &*label, armed, "query store activated");

			let window = Cell::new(DedupWindow::new(armed));
			let label = label.clone();
			relay.subscribe(move |value| {
				let (next, admission) = window.get().admit();
				window.set(next);
				match admission {
					Admission::Current => set.set(value.clone()),
					Admission::Push => set.replace(value.clone()),
					Admission::Drop => {
						debug!(query = &*label, "dropped re-emission of the hydrated result")
					}
				}
			})
		})
	};

	QueryHandle {
		store,
		live,
		subscribed,
		settings,
		label,
	}
}

/// Reads the cache while `client` is restoring; any failure means no initial value.
fn read_initial(
	session: &HydrationSession,
	client: &ClientHandle,
	options: &QueryOptions,
) -> Option<QueryEnvelope> {
	if !session.is_restoring(client) {
		return None;
	}
	match client.read_query(options) {
		Ok(Some(data)) => Some(QueryEnvelope::from_data(data)),
		Ok(None) => {
			debug!(query = options.query.label(), "hydration pre-read returned no data");
			None
		}
		Err(error) => {
			debug!(query = options.query.label(), %error, "hydration pre-read failed");
			None
		}
	}
}

impl QueryHandle {
	/// Subscribes to the store; `run` gets the current value first.
	pub fn subscribe<F>(&self, run: F) -> Subscription
	where
		F: Fn(&Option<QueryEnvelope>) + 'static,
	{
		self.store.subscribe(run)
	}

	/// The current value, activating the store for the duration of the read.
	pub fn get(&self) -> Option<QueryEnvelope> {
		self.store.get()
	}

	/// The underlying store, for composing with other stores.
	pub fn store(&self) -> &Readable<Option<QueryEnvelope>> {
		&self.store
	}

	/// Whether the store has ever been activated.
	pub fn has_subscribed(&self) -> bool {
		self.subscribed.get()
	}

	/// Variables the watched query currently runs with.
	pub fn variables(&self) -> Variables {
		self.live.variables()
	}

	/// Re-executes the query.
	///
	/// If the store was never subscribed and `variables` equal the current
	/// ones, the current result is returned without a network round trip.
	/// `None` never counts as equal.
	pub async fn refetch(&self, variables: Option<Variables>) -> ClientResult<QueryEnvelope> {
		if self.settings.skip_redundant_refetch
			&& !self.has_subscribed()
			&& variables.as_ref() == Some(&self.live.variables())
		{
			debug!(query = &*self.label, "skipped refetch of an unobserved query");
			return self.live.result().await;
		}
		self.live.refetch(variables).await
	}

	/// The watched query's current result.
	pub async fn result(&self) -> ClientResult<QueryEnvelope> {
		self.live.result().await
	}

	/// Loads another page into the result.
	pub async fn fetch_more(&self, options: FetchMoreOptions) -> ClientResult<QueryEnvelope> {
		self.live.fetch_more(options).await
	}

	/// Replaces the watched query's options.
	pub async fn set_options(&self, options: QueryOptions) -> ClientResult<QueryEnvelope> {
		self.live.set_options(options).await
	}

	/// Rewrites the cached result locally.
	pub fn update_query(&self, map: UpdateQueryFn) {
		self.live.update_query(map)
	}

	/// Starts polling at `interval`.
	pub fn start_polling(&self, interval: Duration) {
		self.live.start_polling(interval)
	}

	/// Stops polling.
	pub fn stop_polling(&self) {
		self.live.stop_polling()
	}

	/// Merges a subscription's events into the result until the token is cancelled.
	pub fn subscribe_to_more(&self, options: SubscribeToMoreOptions) -> Subscription {
		self.live.subscribe_to_more(options)
	}
}

impl fmt::Debug for QueryHandle {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("QueryHandle")
			.field("query", &&*self.label)
			.field("subscribers", &self.store.subscriber_count())
			.field("has_subscribed", &self.has_subscribed())
			.finish()
	}
}
