//! Validated GraphQL documents

use std::fmt;
use std::str::FromStr;

use async_graphql::parser::{
	parse_query,
	types::{DocumentOperations, OperationType},
};
use serde::{Deserialize, Serialize};

use crate::error::{ClientError, ClientResult};

/// Kind of the operation a document executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
	/// A read.
	Query,
	/// A write.
	Mutation,
	/// A server push stream.
	Subscription,
}

impl From<OperationType> for OperationKind {
	fn from(ty: OperationType) -> Self {
		match ty {
			OperationType::Query => Self::Query,
			OperationType::Mutation => Self::Mutation,
			OperationType::Subscription => Self::Subscription,
		}
	}
}

/// A GraphQL executable document that has passed syntax validation.
///
/// The source text is kept verbatim; it is what clients use as part of
/// their cache keys.
///
/// # Examples
///
/// ```
/// use graphql_stores_client::{GraphQLDocument, OperationKind};
///
/// let doc = GraphQLDocument::parse("query GetUser { user { id } }").unwrap();
/// assert_eq!(doc.operation_name(), Some("GetUser"));
/// assert_eq!(doc.kind(), OperationKind::Query);
///
/// assert!(GraphQLDocument::parse("query {").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GraphQLDocument {
	source: String,
	operation_name: Option<String>,
	kind: OperationKind,
}

impl GraphQLDocument {
	/// Parses and validates `source`.
	///
	/// # Errors
	///
	/// Returns [`ClientError::InvalidDocument`] when the text is not a valid
	/// executable document.
	pub fn parse(source: impl Into<String>) -> ClientResult<Self> {
		let source = source.into();
		let document =
			parse_query(&source).map_err(|e| ClientError::InvalidDocument(e.to_string()))?;

		let (operation_name, kind) = match &document.operations {
			DocumentOperations::Single(op) => (None, op.node.ty.into()),
			DocumentOperations::Multiple(ops) => {
				let mut iter = ops.iter();
				match (iter.next(), iter.next()) {
					(Some((name, op)), None) => (Some(name.to_string()), op.node.ty.into()),
					// Several named operations: the caller picks one at execution time
					_ => (None, OperationKind::Query),
				}
			}
		};

		Ok(Self {
			source,
			operation_name,
			kind,
		})
	}

	/// The document text.
	pub fn as_str(&self) -> &str {
		&self.source
	}

	/// Name of the operation, when the document has exactly one named operation.
	pub fn operation_name(&self) -> Option<&str> {
		self.operation_name.as_deref()
	}

	/// Kind of the operation.
	pub fn kind(&self) -> OperationKind {
		self.kind
	}

	/// A short label for logs: the operation name, or `<anonymous>`.
	pub fn label(&self) -> &str {
		self.operation_name().unwrap_or("<anonymous>")
	}
}

impl FromStr for GraphQLDocument {
	type Err = ClientError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::parse(s)
	}
}

impl fmt::Display for GraphQLDocument {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.source)
	}
}
