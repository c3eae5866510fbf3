//! rstest fixtures shared by graphql-stores tests

use graphql_stores_client::{GraphQLDocument, Variables, WriteQueryOptions};
use rstest::*;
use serde_json::{Value, json};

use crate::client::MockClient;

/// Fixture providing an empty [`MockClient`].
#[fixture]
pub fn mock_client() -> MockClient {
	MockClient::new()
}

/// Fixture providing a query for one user, keyed by `$id`.
#[fixture]
pub fn user_query() -> GraphQLDocument {
	document("query User($id: ID!) { user(id: $id) { id name } }")
}

/// Fixture providing variables `{ "id": 1 }`.
#[fixture]
pub fn user_variables() -> Variables {
	let mut variables = Variables::new();
	variables.insert("id".to_string(), json!(1));
	variables
}

/// Fixture providing the server-rendered answer to [`user_query`].
#[fixture]
pub fn user_data() -> Value {
	json!({ "user": { "id": 1, "name": "Ada" } })
}

/// Fixture providing a cache seed for [`user_query`] with [`user_variables`].
#[fixture]
pub fn user_seed(
	user_query: GraphQLDocument,
	user_variables: Variables,
	user_data: Value,
) -> WriteQueryOptions {
	WriteQueryOptions::new(user_query, user_data).variables(user_variables)
}

/// Fixture providing a mutation that adds a post.
#[fixture]
pub fn add_post_mutation() -> GraphQLDocument {
	document("mutation AddPost($title: String!) { addPost(title: $title) { id title } }")
}

/// Fixture providing a subscription to new posts.
#[fixture]
pub fn post_added_subscription() -> GraphQLDocument {
	document("subscription PostAdded { postAdded { id title } }")
}

/// Parses a document that is known to be valid.
///
/// # Panics
///
/// Panics when `source` is not a valid document.
pub fn document(source: &str) -> GraphQLDocument {
	match GraphQLDocument::parse(source) {
		Ok(doc) => doc,
		Err(e) => panic!("invalid test document {source:?}: {e}"),
	}
}
