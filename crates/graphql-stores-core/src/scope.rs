//! Component scopes and typed context
//!
//! A [`Scope`] stands for one component instance in the UI tree. Scopes carry:
//!
//! - a context table, keyed by typed [`Context`] tokens, whose entries are
//!   inherited by descendant scopes
//! - a list of mount callbacks, run once when the component finishes its
//!   first render
//!
//! Context may only be provided while a scope is still initializing, the
//! same rule component frameworks apply to their context APIs.
//!
//! ## Example
//!
//! ```ignore
//! use graphql_stores_core::{Context, Scope};
//!
//! let theme: Context<String> = Context::new();
//!
//! let app = Scope::root();
//! app.provide(&theme, "dark".to_string())?;
//!
//! let button = app.child();
//! assert_eq!(button.get(&theme), Some("dark".to_string()));
//! ```

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};

use thiserror::Error;

use crate::scheduler::Task;

/// Errors raised by scope lifecycle rules.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ScopeError {
	/// The scope has already been mounted; the operation is only valid during initialization.
	#[error("scope {0} is already mounted")]
	AlreadyMounted(usize),
}

/// Unique key identifying a [`Context`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContextKey(usize);

impl ContextKey {
	fn next() -> Self {
		static COUNTER: AtomicUsize = AtomicUsize::new(0);
		Self(COUNTER.fetch_add(1, Ordering::Relaxed))
	}
}

/// A typed context token.
///
/// Each `Context::new()` call yields a distinct key, so two contexts of the
/// same value type never collide.
pub struct Context<T> {
	key: ContextKey,
	_marker: PhantomData<fn() -> T>,
}

impl<T> Context<T> {
	/// Allocates a new context key.
	pub fn new() -> Self {
		Self {
			key: ContextKey::next(),
			_marker: PhantomData,
		}
	}

	/// The key of this context.
	pub fn key(&self) -> ContextKey {
		self.key
	}
}

impl<T> Default for Context<T> {
	fn default() -> Self {
		Self::new()
	}
}

impl<T> Clone for Context<T> {
	fn clone(&self) -> Self {
		*self
	}
}

impl<T> Copy for Context<T> {}

impl<T> fmt::Debug for Context<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("Context").field(&self.key).finish()
	}
}

struct ScopeInner {
	id: usize,
	parent: Option<Scope>,
	contexts: RefCell<HashMap<ContextKey, Box<dyn Any>>>,
	mount_callbacks: RefCell<Vec<Task>>,
	mounted: Cell<bool>,
}

/// A component scope.
///
/// Cheap to clone; clones refer to the same scope.
#[derive(Clone)]
pub struct Scope {
	inner: Rc<ScopeInner>,
}

impl Scope {
	/// Creates a scope with no parent.
	pub fn root() -> Self {
		Self::with_parent(None)
	}

	/// Creates a child scope inheriting this scope's context.
	pub fn child(&self) -> Self {
		Self::with_parent(Some(self.clone()))
	}

	fn with_parent(parent: Option<Scope>) -> Self {
		static COUNTER: AtomicUsize = AtomicUsize::new(0);
		Self {
			inner: Rc::new(ScopeInner {
				id: COUNTER.fetch_add(1, Ordering::Relaxed),
				parent,
				contexts: RefCell::new(HashMap::new()),
				mount_callbacks: RefCell::new(Vec::new()),
				mounted: Cell::new(false),
			}),
		}
	}

	/// Numeric id of this scope, unique within the process.
	pub fn id(&self) -> usize {
		self.inner.id
	}

	/// The parent scope, if any.
	pub fn parent(&self) -> Option<&Scope> {
		self.inner.parent.as_ref()
	}

	/// Stores `value` under `ctx` for this scope and its descendants.
	///
	/// Providing the same context twice in one scope replaces the value.
	///
	/// # Errors
	///
	/// Returns [`ScopeError::AlreadyMounted`] once the scope has been mounted.
	pub fn provide<T: 'static>(&self, ctx: &Context<T>, value: T) -> Result<(), ScopeError> {
		self.ensure_initializing()?;
		self.inner
			.contexts
			.borrow_mut()
			.insert(ctx.key, Box::new(value));
		Ok(())
	}

	/// Looks up `ctx` in this scope, then in each ancestor.
	///
	/// Returns `None` if no scope on the path to the root provided it.
	pub fn get<T: Clone + 'static>(&self, ctx: &Context<T>) -> Option<T> {
		let mut scope = Some(self);
		while let Some(current) = scope {
			if let Some(value) = current
				.inner
				.contexts
				.borrow()
				.get(&ctx.key)
				.and_then(|value| value.downcast_ref::<T>())
			{
				return Some(value.clone());
			}
			scope = current.parent();
		}
		None
	}

	/// Registers a callback to run once when the scope mounts.
	///
	/// # Errors
	///
	/// Returns [`ScopeError::AlreadyMounted`] if the scope has already mounted.
	pub fn on_mount<F>(&self, callback: F) -> Result<(), ScopeError>
	where
		F: FnOnce() + 'static,
	{
		self.ensure_initializing()?;
		self.inner.mount_callbacks.borrow_mut().push(Box::new(callback));
		Ok(())
	}

	/// Queues a mount task, handing it back if the scope has already mounted.
	pub(crate) fn try_on_mount(&self, task: Task) -> Result<(), Task> {
		if self.is_mounted() {
			return Err(task);
		}
		self.inner.mount_callbacks.borrow_mut().push(task);
		Ok(())
	}

	/// Marks the scope as mounted and runs its mount callbacks in registration order.
	///
	/// # Errors
	///
	/// Returns [`ScopeError::AlreadyMounted`] if called twice.
	pub fn mount(&self) -> Result<(), ScopeError> {
		self.ensure_initializing()?;
		self.inner.mounted.set(true);
		let callbacks = std::mem::take(&mut *self.inner.mount_callbacks.borrow_mut());
		tracing::trace!(scope = self.inner.id, callbacks = callbacks.len(), "scope mounted");
		for callback in callbacks {
			callback();
		}
		Ok(())
	}

	/// Whether [`Scope::mount`] has run.
	pub fn is_mounted(&self) -> bool {
		self.inner.mounted.get()
	}

	fn ensure_initializing(&self) -> Result<(), ScopeError> {
		if self.is_mounted() {
			return Err(ScopeError::AlreadyMounted(self.inner.id));
		}
		Ok(())
	}
}

impl fmt::Debug for Scope {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Scope")
			.field("id", &self.inner.id)
			.field("parent", &self.parent().map(Scope::id))
			.field("mounted", &self.is_mounted())
			.finish()
	}
}
