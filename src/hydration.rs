//! SSR cache hydration
//!
//! [`restore`] seeds a client's cache with server-rendered data and opens a
//! restoring window for that client. While the window is open, [`query`]
//! answers synchronously from the cache instead of starting in a loading
//! state. The window closes once, through the scheduler passed to `restore`:
//! after the current component mounts, or after a short deferral outside
//! any component.
//!
//! Restoring state lives in a [`HydrationSession`], not in a global, so
//! independent applications and tests never observe each other's windows.
//!
//! ## Example
//!
//! ```ignore
//! let session = HydrationSession::new();
//! let scheduler = LifecycleScheduler::new(&scope)?;
//!
//! restore(&session, &client, &scheduler, &seed)?;
//! let user = query(&session, &client, &seed.as_query());
//! assert!(user.get().is_some());
//!
//! scope.mount()?; // closes the restoring window
//! ```
//!
//! [`query`]: crate::query::query

use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

use graphql_stores_client::{ClientHandle, ClientId, WriteQueryOptions};
use graphql_stores_core::Scheduler;
use tracing::{debug, warn};

use crate::error::BridgeResult;

/// The set of clients whose restoring window is open.
///
/// Clones share the same set.
#[derive(Clone, Default)]
pub struct HydrationSession {
	restoring: Rc<RefCell<HashSet<ClientId>>>,
}

impl HydrationSession {
	/// Creates a session with no open windows.
	pub fn new() -> Self {
		Self::default()
	}

	/// Opens `client`'s window. Returns `false` if it was already open.
	pub fn mark(&self, client: &ClientHandle) -> bool {
		self.restoring.borrow_mut().insert(client.id())
	}

	/// Closes `client`'s window. Returns `false` if it was not open.
	pub fn unmark(&self, client: &ClientHandle) -> bool {
		self.unmark_id(client.id())
	}

	fn unmark_id(&self, id: ClientId) -> bool {
		self.restoring.borrow_mut().remove(&id)
	}

	/// Whether `client`'s window is open.
	pub fn is_restoring(&self, client: &ClientHandle) -> bool {
		self.restoring.borrow().contains(&client.id())
	}

	/// Number of open windows.
	pub fn len(&self) -> usize {
		self.restoring.borrow().len()
	}

	/// Whether no window is open.
	pub fn is_empty(&self) -> bool {
		self.restoring.borrow().is_empty()
	}
}

impl fmt::Debug for HydrationSession {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("HydrationSession")
			.field("restoring", &self.restoring.borrow())
			.finish()
	}
}

/// Seeds `client`'s cache and opens its restoring window.
///
/// In order: the window opens, its closing is handed to `scheduler`, then
/// `options` is written to the cache. The write completes before this
/// returns.
///
/// Restoring a client whose window is already open does not nest: the
/// earlier restore's scheduled close still closes the window for both.
///
/// # Errors
///
/// Fails without writing if `scheduler` cannot take the close; a window this
/// call opened is closed again right away. Otherwise propagates the cache
/// write failure, and the window still closes on schedule.
pub fn restore<S>(
	session: &HydrationSession,
	client: &ClientHandle,
	scheduler: &S,
	options: &WriteQueryOptions,
) -> BridgeResult<()>
where
	S: Scheduler + ?Sized,
{
	let id = client.id();
	let opened = session.mark(client);
	if opened {
		debug!(client = %id, query = options.query.label(), "restoring window opened");
	} else {
		warn!(
			client = %id,
			query = options.query.label(),
			"restore called while the client is already restoring; the first scheduled close ends both"
		);
	}

	let pending = PendingClose {
		session,
		id: opened.then_some(id),
	};
	let window = session.clone();
	scheduler.after_current_phase(Box::new(move || {
		if window.unmark_id(id) {
			debug!(client = %id, "restoring window closed");
		}
	}))?;
	pending.scheduled();

	client.write_query(options)?;
	Ok(())
}

/// Closes a window opened by [`restore`] unless its close was scheduled,
/// including when the scheduler panics.
struct PendingClose<'a> {
	session: &'a HydrationSession,
	id: Option<ClientId>,
}

impl PendingClose<'_> {
	fn scheduled(mut self) {
		self.id = None;
	}
}

impl Drop for PendingClose<'_> {
	fn drop(&mut self) {
		if let Some(id) = self.id.take() {
			self.session.unmark_id(id);
			warn!(client = %id, "restoring window closed early: its close could not be scheduled");
		}
	}
}
