//! # graphql-stores testkit
//!
//! In-memory doubles for the client seam and rstest fixtures.
//!
//! - [`MockClient`]: a [`GraphQLClient`](graphql_stores_client::GraphQLClient)
//!   with a cache, scripted mutation results and a call log
//! - [`MockLiveQuery`]: a watched query the test pushes results into
//! - [`PushSource`]: a push source for subscription events
//!
//! ## Example
//!
//! ```rust,ignore
//! use graphql_stores_testkit::fixtures::*;
//! use rstest::rstest;
//!
//! #[rstest]
//! fn test_seeded_read(mock_client: MockClient, user_seed: WriteQueryOptions) {
//!     mock_client.write_query(&user_seed).unwrap();
//!     assert!(mock_client.cached(&user_seed.as_query()).is_some());
//! }
//! ```

#![warn(missing_docs)]

pub mod client;
pub mod fixtures;
pub mod live_query;
pub mod source;

pub use client::{ClientCall, MockClient};
pub use live_query::{LiveQueryCall, MockLiveQuery};
pub use source::PushSource;
