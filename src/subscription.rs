//! Subscription passthrough

use graphql_stores_client::{ClientHandle, SubscriptionEnvelope, SubscriptionOptions};
use graphql_stores_core::{Readable, observe};

/// Opens a GraphQL subscription on `client` as a lazy store.
///
/// The store holds `None` until the first event. The client subscription is
/// opened on the first store subscriber and closed after the last one leaves.
/// Every event is delivered, including repeats.
pub fn subscribe(
	client: &ClientHandle,
	options: &SubscriptionOptions,
) -> Readable<Option<SubscriptionEnvelope>> {
	tracing::debug!(client = %client.id(), subscription = options.query.label(), "subscribe");
	observe(client.subscribe(options), None)
}
