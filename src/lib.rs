//! # graphql-stores
//!
//! Reactive stores over a GraphQL client, with server-side rendering support.
//!
//! Queries become lazy [`Readable`] stores: the client starts watching at
//! once, but results are only relayed while something subscribes. After
//! server-side rendering, [`restore`] seeds the client's cache so the first
//! queries made while components set up answer synchronously instead of
//! flashing a loading state.
//!
//! ## Crates
//!
//! - `graphql-stores-core` - lazy push stores, component scopes, schedulers
//! - `graphql-stores-client` - the GraphQL client interface and value types
//! - `graphql-stores-testkit` - in-memory client and fixtures for tests
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use graphql_stores::{Bridge, GraphQLDocument, Scope, Settings, WriteQueryOptions};
//! use graphql_stores::registry::{get_client, set_client};
//!
//! let bridge = Bridge::new(Settings::default());
//! let app = Scope::root();
//! set_client(&app, client.clone())?;
//!
//! // Seed the cache with what the server rendered
//! let page = app.child();
//! let client = get_client(&page).expect("provided by the app scope");
//! bridge.restore_in(&page, &client, &seed)?;
//!
//! // Answers from the cache right away
//! let user = bridge.query(&client, &seed.as_query());
//! let _sub = user.subscribe(|envelope| render(envelope));
//!
//! page.mount()?; // restoring window closes
//! ```
//!
//! ## Configuration
//!
//! See [`settings`] for the TOML format.

pub mod bridge;
pub mod error;
pub mod hydration;
pub mod mutation;
pub mod query;
pub mod registry;
pub mod settings;
pub mod subscription;

pub use bridge::Bridge;
pub use error::{BridgeError, BridgeResult};
pub use hydration::{HydrationSession, restore};
pub use mutation::mutate;
pub use query::{Admission, DedupWindow, QueryHandle, query, query_with_settings};
pub use registry::{get_client, require_client, set_client};
pub use settings::{HydrationSettings, QuerySettings, Settings, SettingsError};
pub use subscription::subscribe;

// Re-export the building blocks applications touch directly
pub use graphql_stores_client::{
	ClientError, ClientHandle, ClientId, ClientResult, FetchMoreOptions, FetchPolicy, GraphQLClient,
	GraphQLDocument, GraphQLError, LiveQuery, MutationOptions, MutationResult, NetworkStatus,
	OperationKind, QueryEnvelope, QueryOptions, SubscribeToMoreOptions, SubscriptionEnvelope,
	SubscriptionOptions, UpdateQueryFn, Variables, WriteQueryOptions,
};
pub use graphql_stores_core::{
	DeferredScheduler, LifecycleScheduler, Observable, Readable, ScheduleError, Scheduler, Scope,
	ScopeError, Subscription, TimerScheduler,
};
