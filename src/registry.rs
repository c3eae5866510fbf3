//! Scoped client registry
//!
//! A client provided in a scope is visible to that scope and every
//! descendant. Providing is only allowed while the scope initializes.
//!
//! ## Example
//!
//! ```ignore
//! let app = Scope::root();
//! set_client(&app, client.handle())?;
//!
//! let page = app.child();
//! let client = get_client(&page).expect("provided by the app scope");
//! ```

use std::sync::LazyLock;

use graphql_stores_client::ClientHandle;
use graphql_stores_core::{Context, Scope, ScopeError};

use crate::error::{BridgeError, BridgeResult};

static CLIENT_CONTEXT: LazyLock<Context<ClientHandle>> = LazyLock::new(Context::new);

/// Provides `client` to `scope` and its descendants.
///
/// # Errors
///
/// Returns [`ScopeError::AlreadyMounted`] once `scope` has been mounted.
pub fn set_client(scope: &Scope, client: ClientHandle) -> Result<(), ScopeError> {
	tracing::debug!(scope = scope.id(), client = %client.id(), "client provided");
	scope.provide(&CLIENT_CONTEXT, client)
}

/// The client provided by `scope` or its nearest ancestor.
pub fn get_client(scope: &Scope) -> Option<ClientHandle> {
	scope.get(&CLIENT_CONTEXT)
}

/// Like [`get_client`], but reports a missing client as an error.
pub fn require_client(scope: &Scope) -> BridgeResult<ClientHandle> {
	get_client(scope).ok_or(BridgeError::NoClient(scope.id()))
}
