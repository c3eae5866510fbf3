//! Query bridge integration tests
//!
//! Success Criteria:
//! 1. A query made inside a restoring window starts from the cached result
//! 2. The watched query's re-emission of that result is dropped exactly once
//! 3. Outside a restoring window the store starts empty, even with a warm cache
//! 4. `refetch` skips the network only for unobserved queries with unchanged variables
//! 5. Every subscribe/unsubscribe cycle activates and tears down the watch once
//! 6. Control methods reach the watched query unchanged

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use graphql_stores::{
	Admission, ClientHandle, DedupWindow, FetchMoreOptions, FetchPolicy, GraphQLClient, GraphQLDocument,
	HydrationSession, QueryEnvelope, QueryHandle, QueryOptions, QuerySettings,
	SubscribeToMoreOptions, Subscription, SubscriptionEnvelope, Variables, WriteQueryOptions, query,
	query_with_settings, restore,
};
use graphql_stores_core::DeferredScheduler;
use graphql_stores_testkit::fixtures::*;
use graphql_stores_testkit::{ClientCall, LiveQueryCall, MockClient, MockLiveQuery};
use proptest::prelude::*;
use rstest::*;
use serde_json::{Value, json};

// ============================================================================
// Helpers
// ============================================================================

type Log = Rc<RefCell<Vec<Option<QueryEnvelope>>>>;

fn record(handle: &QueryHandle) -> (Log, Subscription) {
	let log: Log = Rc::new(RefCell::new(Vec::new()));
	let sink = log.clone();
	let sub = handle.subscribe(move |value| sink.borrow_mut().push(value.clone()));
	(log, sub)
}

fn data(log: &Log) -> Vec<Option<Value>> {
	log.borrow()
		.iter()
		.map(|entry| entry.as_ref().and_then(|e| e.data.clone()))
		.collect()
}

fn live(client: &MockClient) -> MockLiveQuery {
	client.last_live_query().expect("query was watched")
}

/// Restores `seed` on `handle`; the window stays open until the returned
/// scheduler runs.
fn hydrate(
	session: &HydrationSession,
	handle: &ClientHandle,
	seed: &WriteQueryOptions,
) -> DeferredScheduler {
	let scheduler = DeferredScheduler::new();
	restore(session, handle, &scheduler, seed).unwrap();
	scheduler
}

fn page(n: usize) -> Value {
	json!({ "feed": { "page": n } })
}

// ============================================================================
// Hydration
// ============================================================================

#[rstest]
fn test_restore_then_query_starts_from_cache(mock_client: MockClient, user_seed: WriteQueryOptions) {
	let session = HydrationSession::new();
	let handle = mock_client.handle();
	let _window = hydrate(&session, &handle, &user_seed);

	let user = query(&session, &handle, &user_seed.as_query());
	let (log, _sub) = record(&user);

	assert_eq!(
		*log.borrow(),
		vec![Some(QueryEnvelope::from_data(user_seed.data.clone()))]
	);
}

#[rstest]
fn test_hydrated_reemission_dropped_once(mock_client: MockClient, user_seed: WriteQueryOptions) {
	let session = HydrationSession::new();
	let handle = mock_client.handle();
	let _window = hydrate(&session, &handle, &user_seed);

	let user = query(&session, &handle, &user_seed.as_query());
	let (log, _sub) = record(&user);
	let watched = live(&mock_client);

	// The watch replayed the cached result on subscribe and it was dropped
	assert_eq!(watched.subscribe_count(), 1);
	assert_eq!(log.borrow().len(), 1);

	watched.emit(QueryEnvelope::from_data(json!({"user": {"id": 1, "name": "Grace"}})));
	watched.emit(QueryEnvelope::from_data(json!({"user": {"id": 1, "name": "Lin"}})));

	assert_eq!(
		data(&log),
		vec![
			Some(user_seed.data.clone()),
			Some(json!({"user": {"id": 1, "name": "Grace"}})),
			Some(json!({"user": {"id": 1, "name": "Lin"}})),
		]
	);
}

#[rstest]
fn test_separately_taken_handles_share_window(
	mock_client: MockClient,
	user_seed: WriteQueryOptions,
) {
	let session = HydrationSession::new();
	let restoring = mock_client.handle();
	let _window = hydrate(&session, &restoring, &user_seed);

	let user = query(&session, &mock_client.handle(), &user_seed.as_query());

	assert_eq!(user.get(), Some(QueryEnvelope::from_data(user_seed.data.clone())));
}

#[rstest]
fn test_no_restore_starts_pending(mock_client: MockClient, user_query: GraphQLDocument) {
	let session = HydrationSession::new();
	let handle = mock_client.handle();

	let user = query(&session, &handle, &QueryOptions::new(user_query));
	let (log, _sub) = record(&user);
	assert_eq!(*log.borrow(), vec![None]);

	live(&mock_client).emit(QueryEnvelope::from_data(json!({"user": null})));

	assert_eq!(data(&log), vec![None, Some(json!({"user": null}))]);
}

#[rstest]
fn test_closed_window_ignores_warm_cache(mock_client: MockClient, user_seed: WriteQueryOptions) {
	let session = HydrationSession::new();
	let handle = mock_client.handle();
	let window = hydrate(&session, &handle, &user_seed);
	window.run_pending();

	let user = query(&session, &handle, &user_seed.as_query());

	// No synchronous pre-read: the store starts empty and the watch's own
	// cache replay comes through as an ordinary value
	let (log, _sub) = record(&user);
	assert_eq!(data(&log), vec![None, Some(user_seed.data.clone())]);
	assert!(
		!mock_client
			.calls()
			.iter()
			.any(|c| matches!(c, ClientCall::ReadQuery { .. }))
	);
}

#[rstest]
fn test_preread_miss_is_swallowed(mock_client: MockClient, user_seed: WriteQueryOptions) {
	let session = HydrationSession::new();
	let handle = mock_client.handle();
	let _window = hydrate(&session, &handle, &user_seed);

	// Same client, different query: the cache has nothing for it
	let other = QueryOptions::new(document("query Settings { settings { theme } }"));
	let settings = query(&session, &handle, &other);

	assert_eq!(settings.get(), None);
	assert!(
		mock_client
			.calls()
			.iter()
			.any(|c| matches!(c, ClientCall::ReadQuery { query, .. } if query == other.query.as_str()))
	);
}

#[rstest]
fn test_preread_of_null_gives_no_initial_value(mock_client: MockClient, user_query: GraphQLDocument) {
	let session = HydrationSession::new();
	let handle = mock_client.handle();
	let seed = WriteQueryOptions::new(user_query, Value::Null);
	let _window = hydrate(&session, &handle, &seed);

	let user = query(&session, &handle, &seed.as_query());
	let (log, _sub) = record(&user);

	assert_eq!(*log.borrow(), vec![None]);
}

#[rstest]
fn test_network_only_value_after_seed_is_dropped(
	mock_client: MockClient,
	user_seed: WriteQueryOptions,
) {
	let session = HydrationSession::new();
	let handle = mock_client.handle();
	let _window = hydrate(&session, &handle, &user_seed);

	let options = user_seed.as_query().fetch_policy(FetchPolicy::NetworkOnly);
	let user = query(&session, &handle, &options);
	let (log, _sub) = record(&user);
	let watched = live(&mock_client);

	watched.emit(QueryEnvelope::loading());
	watched.emit(QueryEnvelope::from_data(json!({"user": {"id": 1, "name": "Ada L."}})));

	assert_eq!(
		data(&log),
		vec![
			Some(user_seed.data.clone()),
			Some(json!({"user": {"id": 1, "name": "Ada L."}})),
		]
	);
}

#[rstest]
fn test_repeated_pushes_are_delivered(mock_client: MockClient, user_query: GraphQLDocument) {
	let session = HydrationSession::new();
	let options = QueryOptions::new(user_query).fetch_policy(FetchPolicy::NetworkOnly);
	let user = query(&session, &mock_client.handle(), &options);
	let (log, _sub) = record(&user);
	let watched = live(&mock_client);

	let polled = QueryEnvelope::from_data(json!({"user": {"id": 1}}));
	for _ in 0..3 {
		watched.emit(polled.clone());
	}

	assert_eq!(
		*log.borrow(),
		vec![None, Some(polled.clone()), Some(polled.clone()), Some(polled)]
	);
}

#[rstest]
fn test_only_first_repeat_of_seed_is_dropped(mock_client: MockClient, user_seed: WriteQueryOptions) {
	let session = HydrationSession::new();
	let handle = mock_client.handle();
	let _window = hydrate(&session, &handle, &user_seed);

	let options = user_seed.as_query().fetch_policy(FetchPolicy::NetworkOnly);
	let user = query(&session, &handle, &options);
	let (log, _sub) = record(&user);
	let watched = live(&mock_client);

	let seeded = QueryEnvelope::from_data(user_seed.data.clone());
	watched.emit(seeded.clone());
	watched.emit(seeded.clone());
	watched.emit(seeded.clone());

	assert_eq!(*log.borrow(), vec![Some(seeded.clone()); 3]);
}

// ============================================================================
// Subscription lifecycle
// ============================================================================

#[rstest]
fn test_cycles_activate_and_tear_down_once(mock_client: MockClient, user_query: GraphQLDocument) {
	let session = HydrationSession::new();
	let handle = mock_client.handle();
	let feed = query(&session, &handle, &QueryOptions::new(user_query));
	let watched = live(&mock_client);
	assert_eq!(watched.subscribe_count(), 0);

	for cycle in 1..=2 {
		let (_log, sub) = record(&feed);
		let (_other, second) = record(&feed);
		assert_eq!(watched.subscribe_count(), cycle);
		assert_eq!(watched.observer_count(), 1);

		sub.unsubscribe();
		assert_eq!(watched.observer_count(), 1);
		second.unsubscribe();
		assert_eq!(watched.observer_count(), 0);
	}
}

#[rstest]
fn test_each_activation_gets_its_own_window(mock_client: MockClient, user_seed: WriteQueryOptions) {
	let session = HydrationSession::new();
	let handle = mock_client.handle();
	let _window = hydrate(&session, &handle, &user_seed);
	let user = query(&session, &handle, &user_seed.as_query());
	let watched = live(&mock_client);

	let (_first, sub) = record(&user);
	watched.emit(QueryEnvelope::from_data(page(1)));
	drop(sub);

	// Second activation: the watch replays page 1, which is dropped, then page 2 passes
	let (second, _sub) = record(&user);
	watched.emit(QueryEnvelope::from_data(page(2)));

	assert_eq!(data(&second), vec![Some(page(1)), Some(page(2))]);
}

#[rstest]
fn test_get_counts_as_subscription(mock_client: MockClient, user_query: GraphQLDocument) {
	let session = HydrationSession::new();
	let user = query(&session, &mock_client.handle(), &QueryOptions::new(user_query));
	assert!(!user.has_subscribed());

	assert_eq!(user.get(), None);

	assert!(user.has_subscribed());
	assert_eq!(live(&mock_client).observer_count(), 0);
}

#[rstest]
fn test_watch_starts_before_subscribe(mock_client: MockClient, user_query: GraphQLDocument) {
	let session = HydrationSession::new();
	let _user = query(&session, &mock_client.handle(), &QueryOptions::new(user_query));

	assert_eq!(mock_client.live_queries().len(), 1);
}

// ============================================================================
// Refetch
// ============================================================================

#[rstest]
#[tokio::test]
async fn test_refetch_skipped_when_unobserved_and_unchanged(
	mock_client: MockClient,
	user_seed: WriteQueryOptions,
	user_variables: Variables,
) {
	let session = HydrationSession::new();
	mock_client.write_query(&user_seed).unwrap();
	let user = query(&session, &mock_client.handle(), &user_seed.as_query());
	let watched = live(&mock_client);

	let result = user.refetch(Some(user_variables)).await.unwrap();

	assert_eq!(watched.refetch_count(), 0);
	assert_eq!(result.data, Some(user_seed.data.clone()));
}

#[rstest]
#[tokio::test]
async fn test_refetch_with_new_variables_goes_to_network(
	mock_client: MockClient,
	user_seed: WriteQueryOptions,
) {
	let session = HydrationSession::new();
	let user = query(&session, &mock_client.handle(), &user_seed.as_query());
	let watched = live(&mock_client);

	let mut next = Variables::new();
	next.insert("id".to_string(), json!(2));
	user.refetch(Some(next.clone())).await.unwrap();

	assert_eq!(watched.calls(), vec![LiveQueryCall::Refetch(Some(next.clone()))]);
	assert_eq!(user.variables(), next);
}

#[rstest]
#[tokio::test]
async fn test_refetch_without_variables_goes_to_network(
	mock_client: MockClient,
	user_seed: WriteQueryOptions,
) {
	let session = HydrationSession::new();
	let user = query(&session, &mock_client.handle(), &user_seed.as_query());

	user.refetch(None).await.unwrap();

	assert_eq!(live(&mock_client).refetch_count(), 1);
}

#[rstest]
#[tokio::test]
async fn test_refetch_after_subscribe_goes_to_network(
	mock_client: MockClient,
	user_seed: WriteQueryOptions,
	user_variables: Variables,
) {
	let session = HydrationSession::new();
	let user = query(&session, &mock_client.handle(), &user_seed.as_query());
	let watched = live(&mock_client);
	watched.respond_with(json!({"user": {"id": 1, "name": "Ada"}}));

	// Still counts after the subscriber left
	record(&user).1.unsubscribe();
	let result = user.refetch(Some(user_variables)).await.unwrap();

	assert_eq!(watched.refetch_count(), 1);
	assert_eq!(result.data, Some(json!({"user": {"id": 1, "name": "Ada"}})));
}

#[rstest]
#[tokio::test]
async fn test_refetch_skip_can_be_disabled(
	mock_client: MockClient,
	user_seed: WriteQueryOptions,
	user_variables: Variables,
) {
	let session = HydrationSession::new();
	let settings = QuerySettings {
		skip_redundant_refetch: false,
	};
	let user = query_with_settings(&session, &mock_client.handle(), &user_seed.as_query(), settings);

	user.refetch(Some(user_variables)).await.unwrap();

	assert_eq!(live(&mock_client).refetch_count(), 1);
}

// ============================================================================
// Control passthrough
// ============================================================================

#[rstest]
#[tokio::test]
async fn test_fetch_more_reaches_store(mock_client: MockClient, user_query: GraphQLDocument) {
	let session = HydrationSession::new();
	let feed = query(&session, &mock_client.handle(), &QueryOptions::new(user_query));
	let watched = live(&mock_client);
	let (log, _sub) = record(&feed);

	watched.emit(QueryEnvelope::from_data(json!([1, 2])));
	watched.push_page(json!([3]));
	let merged = feed
		.fetch_more(FetchMoreOptions::new().variable("offset", json!(2)).update_query(|prev, page| {
			let mut all = prev.as_array().cloned().unwrap_or_default();
			all.extend(page.as_array().cloned().unwrap_or_default());
			Value::Array(all)
		}))
		.await
		.unwrap();

	assert_eq!(merged.data, Some(json!([1, 2, 3])));
	assert_eq!(data(&log).last(), Some(&Some(json!([1, 2, 3]))));
	assert!(matches!(&watched.calls()[0], LiveQueryCall::FetchMore(vars) if vars["offset"] == json!(2)));
}

#[rstest]
#[tokio::test]
async fn test_set_options_and_result(mock_client: MockClient, user_seed: WriteQueryOptions) {
	let session = HydrationSession::new();
	let user = query(&session, &mock_client.handle(), &user_seed.as_query());

	assert!(user.result().await.unwrap().loading);

	let next = user_seed.as_query().variable("id", json!(9));
	user.set_options(next.clone()).await.unwrap();

	assert_eq!(user.variables()["id"], json!(9));
	assert_eq!(live(&mock_client).options(), next);
}

#[rstest]
fn test_update_query_and_polling(mock_client: MockClient, user_query: GraphQLDocument) {
	let session = HydrationSession::new();
	let counter = query(&session, &mock_client.handle(), &QueryOptions::new(user_query));
	let watched = live(&mock_client);
	let (log, _sub) = record(&counter);

	counter.update_query(Box::new(|_, _| Some(json!({"count": 1}))));
	counter.update_query(Box::new(|_, _| None));
	counter.start_polling(Duration::from_secs(5));
	assert_eq!(watched.polling(), Some(Duration::from_secs(5)));
	counter.stop_polling();

	assert_eq!(watched.polling(), None);
	assert_eq!(data(&log), vec![None, Some(json!({"count": 1}))]);
	assert_eq!(
		watched.calls(),
		vec![
			LiveQueryCall::UpdateQuery,
			LiveQueryCall::UpdateQuery,
			LiveQueryCall::StartPolling(Duration::from_secs(5)),
			LiveQueryCall::StopPolling,
		]
	);
}

#[rstest]
fn test_subscribe_to_more_merges_events(
	mock_client: MockClient,
	user_query: GraphQLDocument,
	post_added_subscription: GraphQLDocument,
) {
	let session = HydrationSession::new();
	let feed = query(&session, &mock_client.handle(), &QueryOptions::new(user_query));
	let watched = live(&mock_client);
	let (log, _sub) = record(&feed);
	watched.emit(QueryEnvelope::from_data(json!({"posts": [1]})));

	let more = feed.subscribe_to_more(
		SubscribeToMoreOptions::new(post_added_subscription.clone()).update_query(|prev, event| {
			let mut posts = prev["posts"].as_array().cloned().unwrap_or_default();
			posts.push(event["postAdded"].clone());
			json!({ "posts": posts })
		}),
	);
	let events = mock_client.subscription_source(&post_added_subscription);
	events.push(SubscriptionEnvelope::from_data(json!({"postAdded": 2})));
	more.unsubscribe();
	events.push(SubscriptionEnvelope::from_data(json!({"postAdded": 3})));

	assert_eq!(data(&log).last(), Some(&Some(json!({"posts": [1, 2]}))));
	assert_eq!(events.observer_count(), 0);
}

// ============================================================================
// Property-based
// ============================================================================

proptest! {
	/// With a seed, the first pushed value is dropped and the rest pass,
	/// repeats included; without one, everything passes.
	#[test]
	fn prop_dedup_invariant(pages in proptest::collection::vec(0usize..3, 1..12), seeded in any::<bool>()) {
		let client = MockClient::new();
		let handle = client.handle();
		let session = HydrationSession::new();
		let seed = WriteQueryOptions::new(document("query Feed { feed { page } }"), json!({"feed": null}));
		let _window = if seeded { Some(hydrate(&session, &handle, &seed)) } else { None };

		// Network-only: the watch does not replay the cache, every push comes from the test
		let options = seed.as_query().fetch_policy(FetchPolicy::NetworkOnly);
		let feed = query(&session, &handle, &options);
		let (log, _sub) = record(&feed);
		let watched = live(&client);
		for n in &pages {
			watched.emit(QueryEnvelope::from_data(page(*n)));
		}

		let mut expected = Vec::new();
		if seeded {
			expected.push(Some(seed.data.clone()));
			expected.extend(pages[1..].iter().map(|n| Some(page(*n))));
		} else {
			expected.push(None);
			expected.extend(pages.iter().map(|n| Some(page(*n))));
		}
		prop_assert_eq!(data(&log), expected);
	}

	/// No sequence of values ever passes through more than one suppression.
	#[test]
	fn prop_at_most_once_suppression(has_initial in any::<bool>(), values in 0usize..64) {
		let mut window = DedupWindow::new(has_initial);
		let mut suppressed = 0;
		for _ in 0..values {
			let (next, admission) = window.admit();
			if admission == Admission::Drop {
				suppressed += 1;
			}
			window = next;
		}
		prop_assert!(suppressed <= 1);
		if !has_initial {
			prop_assert_eq!(suppressed, 0);
		}
	}
}
