//! Bridge facade
//!
//! [`Bridge`] bundles a [`HydrationSession`], [`Settings`] and a standalone
//! scheduler so application code does not thread them through every call.

use std::fmt;

use graphql_stores_client::{
	ClientHandle, MutationOptions, MutationResult, QueryOptions, SubscriptionEnvelope,
	SubscriptionOptions, WriteQueryOptions,
};
use graphql_stores_core::{LifecycleScheduler, Readable, Scheduler, Scope, TimerScheduler};

use crate::error::BridgeResult;
use crate::hydration::{self, HydrationSession};
use crate::mutation;
use crate::query::{self, QueryHandle};
use crate::settings::Settings;
use crate::subscription;

/// Entry point for applications.
///
/// # Example
///
/// ```ignore
/// let bridge = Bridge::new(Settings::from_path("graphql-stores.toml")?);
///
/// bridge.restore_in(&app_scope, &client, &seed)?;
/// let user = bridge.query(&client, &seed.as_query());
/// ```
pub struct Bridge {
	session: HydrationSession,
	settings: Settings,
	scheduler: Box<dyn Scheduler>,
}

impl Bridge {
	/// Creates a bridge whose standalone restores close their window after
	/// `settings.hydration.defer_delay_ms`.
	///
	/// Standalone restores then spawn onto the current `tokio::task::LocalSet`;
	/// without a `tokio` runtime they fail with
	/// [`BridgeError::Schedule`](crate::BridgeError::Schedule).
	pub fn new(settings: Settings) -> Self {
		let scheduler = TimerScheduler::new(settings.hydration.defer_delay());
		Self::with_scheduler(settings, scheduler)
	}

	/// Creates a bridge with a custom standalone scheduler.
	pub fn with_scheduler<S>(settings: Settings, scheduler: S) -> Self
	where
		S: Scheduler + 'static,
	{
		Self {
			session: HydrationSession::new(),
			settings,
			scheduler: Box::new(scheduler),
		}
	}

	/// The session tracking restoring windows.
	pub fn session(&self) -> &HydrationSession {
		&self.session
	}

	/// The settings in effect.
	pub fn settings(&self) -> &Settings {
		&self.settings
	}

	/// Seeds `client` outside any component; the window closes on the
	/// standalone scheduler.
	pub fn restore(&self, client: &ClientHandle, options: &WriteQueryOptions) -> BridgeResult<()> {
		hydration::restore(&self.session, client, &self.scheduler, options)?;
		Ok(())
	}

	/// Seeds `client` while `scope` initializes; the window closes when
	/// `scope` mounts.
	///
	/// # Errors
	///
	/// Fails without touching the cache if `scope` has already mounted.
	pub fn restore_in(
		&self,
		scope: &Scope,
		client: &ClientHandle,
		options: &WriteQueryOptions,
	) -> BridgeResult<()> {
		let scheduler = LifecycleScheduler::new(scope)?;
		hydration::restore(&self.session, client, &scheduler, options)?;
		Ok(())
	}

	/// Bridges a query with the configured query settings.
	pub fn query(&self, client: &ClientHandle, options: &QueryOptions) -> QueryHandle {
		query::query_with_settings(&self.session, client, options, self.settings.query)
	}

	/// Executes a mutation.
	pub async fn mutate(
		&self,
		client: &ClientHandle,
		options: &MutationOptions,
	) -> BridgeResult<MutationResult> {
		Ok(mutation::mutate(client, options).await?)
	}

	/// Opens a subscription as a lazy store.
	pub fn subscribe(
		&self,
		client: &ClientHandle,
		options: &SubscriptionOptions,
	) -> Readable<Option<SubscriptionEnvelope>> {
		subscription::subscribe(client, options)
	}
}

impl Default for Bridge {
	fn default() -> Self {
		Self::new(Settings::default())
	}
}

impl fmt::Debug for Bridge {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Bridge")
			.field("session", &self.session)
			.field("settings", &self.settings)
			.finish_non_exhaustive()
	}
}
