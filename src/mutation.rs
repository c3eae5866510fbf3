//! Mutation passthrough

use graphql_stores_client::{ClientHandle, ClientResult, MutationOptions, MutationResult};

/// Executes a mutation on `client`.
///
/// The client's result is returned unchanged: no retries, no batching and
/// no error translation.
pub async fn mutate(client: &ClientHandle, options: &MutationOptions) -> ClientResult<MutationResult> {
	tracing::debug!(client = %client.id(), mutation = options.mutation.label(), "mutate");
	client.mutate(options).await
}
