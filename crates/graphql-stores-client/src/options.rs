//! Operation options

use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use serde_json::Value;

use crate::document::GraphQLDocument;
use crate::types::{FetchPolicy, Variables};

/// Rewrites a query's cached data; returning `None` leaves it untouched.
pub type UpdateQueryFn = Box<dyn FnOnce(Option<&Value>, &Variables) -> Option<Value>>;

/// Merges incoming data (second argument) into previous data (first argument).
pub type MergeFn = Rc<dyn Fn(&Value, &Value) -> Value>;

/// Options for watching or reading a query.
///
/// # Examples
///
/// ```
/// use graphql_stores_client::{FetchPolicy, GraphQLDocument, QueryOptions};
/// use serde_json::json;
///
/// let doc = GraphQLDocument::parse("query User($id: ID!) { user(id: $id) { id } }").unwrap();
/// let options = QueryOptions::new(doc)
///     .variable("id", json!(1))
///     .fetch_policy(FetchPolicy::CacheAndNetwork);
///
/// assert_eq!(options.variables["id"], json!(1));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct QueryOptions {
	/// The query document.
	pub query: GraphQLDocument,
	/// Operation variables.
	pub variables: Variables,
	/// Cache usage.
	pub fetch_policy: FetchPolicy,
	/// Poll interval, `None` to disable polling.
	pub poll_interval: Option<Duration>,
}

impl QueryOptions {
	/// Creates options with no variables and the default fetch policy.
	pub fn new(query: GraphQLDocument) -> Self {
		Self {
			query,
			variables: Variables::new(),
			fetch_policy: FetchPolicy::default(),
			poll_interval: None,
		}
	}

	/// Replaces all variables.
	pub fn variables(mut self, variables: Variables) -> Self {
		self.variables = variables;
		self
	}

	/// Sets one variable.
	pub fn variable(mut self, name: impl Into<String>, value: Value) -> Self {
		self.variables.insert(name.into(), value);
		self
	}

	/// Sets the fetch policy.
	pub fn fetch_policy(mut self, policy: FetchPolicy) -> Self {
		self.fetch_policy = policy;
		self
	}

	/// Enables polling.
	pub fn poll_interval(mut self, interval: Duration) -> Self {
		self.poll_interval = Some(interval);
		self
	}
}

/// A cache seed: query, variables and the data to store.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteQueryOptions {
	/// The query the data answers.
	pub query: GraphQLDocument,
	/// Variables the data was fetched with.
	pub variables: Variables,
	/// The data to write.
	pub data: Value,
}

impl WriteQueryOptions {
	/// Creates a seed with no variables.
	pub fn new(query: GraphQLDocument, data: Value) -> Self {
		Self {
			query,
			variables: Variables::new(),
			data,
		}
	}

	/// Replaces all variables.
	pub fn variables(mut self, variables: Variables) -> Self {
		self.variables = variables;
		self
	}

	/// Options to read back what this seed writes.
	pub fn as_query(&self) -> QueryOptions {
		QueryOptions::new(self.query.clone()).variables(self.variables.clone())
	}
}

/// Options for a mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct MutationOptions {
	/// The mutation document.
	pub mutation: GraphQLDocument,
	/// Operation variables.
	pub variables: Variables,
	/// Queries to refetch once the mutation settles.
	pub refetch_queries: Vec<GraphQLDocument>,
}

impl MutationOptions {
	/// Creates options with no variables.
	pub fn new(mutation: GraphQLDocument) -> Self {
		Self {
			mutation,
			variables: Variables::new(),
			refetch_queries: Vec::new(),
		}
	}

	/// Sets one variable.
	pub fn variable(mut self, name: impl Into<String>, value: Value) -> Self {
		self.variables.insert(name.into(), value);
		self
	}

	/// Adds a query to refetch after the mutation.
	pub fn refetch(mut self, query: GraphQLDocument) -> Self {
		self.refetch_queries.push(query);
		self
	}
}

/// Options for a GraphQL subscription.
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionOptions {
	/// The subscription document.
	pub query: GraphQLDocument,
	/// Operation variables.
	pub variables: Variables,
}

impl SubscriptionOptions {
	/// Creates options with no variables.
	pub fn new(query: GraphQLDocument) -> Self {
		Self {
			query,
			variables: Variables::new(),
		}
	}

	/// Sets one variable.
	pub fn variable(mut self, name: impl Into<String>, value: Value) -> Self {
		self.variables.insert(name.into(), value);
		self
	}
}

/// Options for loading another page into a watched query.
#[derive(Clone, Default)]
pub struct FetchMoreOptions {
	/// A different document for the page request; `None` reuses the watched one.
	pub query: Option<GraphQLDocument>,
	/// Variables merged over the watched query's variables.
	pub variables: Variables,
	/// Combines the previous result with the new page.
	pub update_query: Option<MergeFn>,
}

impl FetchMoreOptions {
	/// Creates options that reuse the watched document.
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets one variable.
	pub fn variable(mut self, name: impl Into<String>, value: Value) -> Self {
		self.variables.insert(name.into(), value);
		self
	}

	/// Sets the merge function.
	pub fn update_query<F>(mut self, merge: F) -> Self
	where
		F: Fn(&Value, &Value) -> Value + 'static,
	{
		self.update_query = Some(Rc::new(merge));
		self
	}
}

impl fmt::Debug for FetchMoreOptions {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("FetchMoreOptions")
			.field("query", &self.query.as_ref().map(GraphQLDocument::label))
			.field("variables", &self.variables)
			.field("update_query", &self.update_query.is_some())
			.finish()
	}
}

/// Options for merging a subscription's events into a watched query.
#[derive(Clone)]
pub struct SubscribeToMoreOptions {
	/// The subscription document.
	pub document: GraphQLDocument,
	/// Subscription variables.
	pub variables: Variables,
	/// Combines the previous query result with a subscription event's data.
	pub update_query: Option<MergeFn>,
}

impl SubscribeToMoreOptions {
	/// Creates options with no variables and no merge function.
	pub fn new(document: GraphQLDocument) -> Self {
		Self {
			document,
			variables: Variables::new(),
			update_query: None,
		}
	}

	/// Sets the merge function.
	pub fn update_query<F>(mut self, merge: F) -> Self
	where
		F: Fn(&Value, &Value) -> Value + 'static,
	{
		self.update_query = Some(Rc::new(merge));
		self
	}
}

impl fmt::Debug for SubscribeToMoreOptions {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("SubscribeToMoreOptions")
			.field("document", &self.document.label())
			.field("variables", &self.variables)
			.field("update_query", &self.update_query.is_some())
			.finish()
	}
}
