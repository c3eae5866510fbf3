//! Readable - Lazy Push Store
//!
//! `Readable<T>` holds a value and pushes it to subscribers. It is built from
//! an initial value and an activation function:
//!
//! - The activation function runs when the store gains its **first**
//!   subscriber. It receives a [`Setter`] and returns a [`Subscription`]
//!   whose teardown runs when the **last** subscriber leaves.
//! - A new subscriber always receives the current value before anything the
//!   activation pushes, so seeded values are observed strictly first.
//! - [`Setter::set`] notifies only when the value actually changes;
//!   [`Setter::replace`] notifies on every call.
//!
//! ## Example
//!
//! ```ignore
//! use graphql_stores_core::{Readable, Subscription};
//!
//! let clock = Readable::new(0u64, |set| {
//!     let handle = start_ticker(move |tick| set.set(tick));
//!     Subscription::new(move || handle.stop())
//! });
//!
//! let sub = clock.subscribe(|tick| println!("tick {}", tick));
//! drop(sub); // ticker stops
//! ```

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::observable::Subscription;

type Subscriber<T> = Rc<dyn Fn(&T)>;
type StartFn<T> = Box<dyn Fn(Setter<T>) -> Subscription>;

struct StoreInner<T: 'static> {
	value: RefCell<T>,
	/// Ordered by subscription id so notification follows subscription order
	subscribers: RefCell<BTreeMap<u64, Subscriber<T>>>,
	next_id: Cell<u64>,
	start: Option<StartFn<T>>,
	/// Teardown of the running activation, `Some` while active
	active: RefCell<Option<Subscription>>,
}

impl<T: Clone + PartialEq + 'static> StoreInner<T> {
	fn set(&self, value: T) {
		{
			let mut current = self.value.borrow_mut();
			if *current == value {
				return;
			}
			*current = value;
		}
		self.notify();
	}

	fn replace(&self, value: T) {
		*self.value.borrow_mut() = value;
		self.notify();
	}

	fn notify(&self) {
		let snapshot = self.value.borrow().clone();
		let subscribers: Vec<(u64, Subscriber<T>)> = self
			.subscribers
			.borrow()
			.iter()
			.map(|(id, run)| (*id, run.clone()))
			.collect();

		for (id, run) in subscribers {
			// An earlier subscriber may have detached this one
			if self.subscribers.borrow().contains_key(&id) {
				run(&snapshot);
			}
		}
	}

	fn activate(this: &Rc<Self>) {
		let Some(start) = this.start.as_ref() else {
			return;
		};
		tracing::trace!("store activated");
		let teardown = start(Setter {
			inner: Rc::downgrade(this),
		});
		if this.subscribers.borrow().is_empty() {
			// Every subscriber left while the activation was still running
			drop(teardown);
			return;
		}
		*this.active.borrow_mut() = Some(teardown);
	}

	fn remove_subscriber(&self, id: u64) {
		let emptied = {
			let mut subscribers = self.subscribers.borrow_mut();
			subscribers.remove(&id).is_some() && subscribers.is_empty()
		};
		if emptied {
			let teardown = self.active.borrow_mut().take();
			if teardown.is_some() {
				tracing::trace!("store torn down");
			}
			drop(teardown);
		}
	}
}

/// A lazily activated push store.
///
/// Cloning a `Readable` is cheap; all clones share the same value,
/// subscribers and activation state.
pub struct Readable<T: 'static> {
	inner: Rc<StoreInner<T>>,
}

impl<T: 'static> Clone for Readable<T> {
	fn clone(&self) -> Self {
		Self {
			inner: self.inner.clone(),
		}
	}
}

impl<T: Clone + PartialEq + 'static> Readable<T> {
	/// Creates a store with an initial value and an activation function.
	///
	/// # Arguments
	///
	/// * `initial` - Value delivered to subscribers until the activation sets another
	/// * `start` - Runs on the first subscriber; the returned [`Subscription`]
	///   is cancelled when the last subscriber leaves
	pub fn new<F>(initial: T, start: F) -> Self
	where
		F: Fn(Setter<T>) -> Subscription + 'static,
	{
		Self::build(initial, Some(Box::new(start)))
	}

	/// Creates a store that never changes.
	pub fn constant(value: T) -> Self {
		Self::build(value, None)
	}

	fn build(initial: T, start: Option<StartFn<T>>) -> Self {
		Self {
			inner: Rc::new(StoreInner {
				value: RefCell::new(initial),
				subscribers: RefCell::new(BTreeMap::new()),
				next_id: Cell::new(0),
				start,
				active: RefCell::new(None),
			}),
		}
	}

	/// Subscribes to the store.
	///
	/// `run` is called immediately with the current value, then once per
	/// change. If this is the first subscriber the activation function runs
	/// right after that initial delivery.
	pub fn subscribe<F>(&self, run: F) -> Subscription
	where
		F: Fn(&T) + 'static,
	{
		let id = self.inner.next_id.get();
		self.inner.next_id.set(id + 1);

		let run: Subscriber<T> = Rc::new(run);
		let first = {
			let mut subscribers = self.inner.subscribers.borrow_mut();
			subscribers.insert(id, run.clone());
			subscribers.len() == 1
		};

		let current = self.inner.value.borrow().clone();
		run(&current);

		if first && self.inner.active.borrow().is_none() {
			StoreInner::activate(&self.inner);
		}

		let inner = self.inner.clone();
		Subscription::new(move || inner.remove_subscriber(id))
	}

	/// Returns the current value.
	///
	/// Like any consumer, this activates the store for the duration of the
	/// read, so a lazy store reports what its source delivers synchronously.
	pub fn get(&self) -> T {
		let value = Rc::new(RefCell::new(None));
		let slot = value.clone();
		let sub = self.subscribe(move |v| *slot.borrow_mut() = Some(v.clone()));
		sub.unsubscribe();
		let latest = value.borrow_mut().take();
		latest.unwrap_or_else(|| self.inner.value.borrow().clone())
	}

	/// Number of live subscribers.
	pub fn subscriber_count(&self) -> usize {
		self.inner.subscribers.borrow().len()
	}

	/// Whether the activation function is currently running.
	pub fn is_active(&self) -> bool {
		self.inner.active.borrow().is_some()
	}
}

impl<T: Clone + PartialEq + fmt::Debug + 'static> fmt::Debug for Readable<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Readable")
			.field("value", &*self.inner.value.borrow())
			.field("subscribers", &self.subscriber_count())
			.field("active", &self.is_active())
			.finish()
	}
}

/// Write access handed to a store's activation function.
///
/// Holds only a weak reference; setting a value on a store that no longer
/// exists does nothing.
pub struct Setter<T: 'static> {
	inner: Weak<StoreInner<T>>,
}

impl<T: 'static> Clone for Setter<T> {
	fn clone(&self) -> Self {
		Self {
			inner: self.inner.clone(),
		}
	}
}

impl<T: Clone + PartialEq + 'static> Setter<T> {
	/// Replaces the value, notifying subscribers if it changed.
	pub fn set(&self, value: T) {
		if let Some(inner) = self.inner.upgrade() {
			inner.set(value);
		}
	}

	/// Replaces the value and notifies subscribers even if it is unchanged.
	///
	/// For sources where every push is an event of its own.
	pub fn replace(&self, value: T) {
		if let Some(inner) = self.inner.upgrade() {
			inner.replace(value);
		}
	}

	/// Derives the next value from the current one.
	pub fn update<F>(&self, f: F)
	where
		F: FnOnce(&T) -> T,
	{
		if let Some(inner) = self.inner.upgrade() {
			let next = f(&inner.value.borrow());
			inner.set(next);
		}
	}
}

impl<T: 'static> fmt::Debug for Setter<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Setter")
			.field("alive", &(self.inner.strong_count() > 0))
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	fn recorder<T: Clone + 'static>() -> (Rc<RefCell<Vec<T>>>, impl Fn(&T) + 'static) {
		let log = Rc::new(RefCell::new(Vec::new()));
		let sink = log.clone();
		(log, move |v: &T| sink.borrow_mut().push(v.clone()))
	}

	#[rstest]
	fn test_constant_delivers_value() {
		let store = Readable::constant(42);
		let (log, run) = recorder();
		let _sub = store.subscribe(run);
		assert_eq!(*log.borrow(), vec![42]);
		assert!(!store.is_active());
	}

	#[rstest]
	fn test_activation_runs_after_initial_delivery() {
		let store = Readable::new(0, |set| {
			set.set(1);
			Subscription::empty()
		});
		let (log, run) = recorder();
		let _sub = store.subscribe(run);
		assert_eq!(*log.borrow(), vec![0, 1]);
	}

	#[rstest]
	fn test_set_skips_equal_values() {
		let setter = Rc::new(RefCell::new(None));
		let slot = setter.clone();
		let store = Readable::new(0, move |set| {
			*slot.borrow_mut() = Some(set);
			Subscription::empty()
		});
		let (log, run) = recorder();
		let _sub = store.subscribe(run);

		let set = setter.borrow().clone().unwrap();
		set.set(5);
		set.set(5);
		set.update(|n| n + 1);
		assert_eq!(*log.borrow(), vec![0, 5, 6]);

		set.replace(6);
		assert_eq!(*log.borrow(), vec![0, 5, 6, 6]);
	}

	#[rstest]
	fn test_teardown_on_last_unsubscribe() {
		let starts = Rc::new(Cell::new(0));
		let stops = Rc::new(Cell::new(0));
		let (s, t) = (starts.clone(), stops.clone());
		let store = Readable::new((), move |_set| {
			s.set(s.get() + 1);
			let t = t.clone();
			Subscription::new(move || t.set(t.get() + 1))
		});

		let a = store.subscribe(|_| {});
		let b = store.subscribe(|_| {});
		assert_eq!(starts.get(), 1);
		assert_eq!(store.subscriber_count(), 2);

		a.unsubscribe();
		assert_eq!(stops.get(), 0);
		b.unsubscribe();
		assert_eq!(stops.get(), 1);
		assert!(!store.is_active());
	}

	#[rstest]
	fn test_reactivation_after_teardown() {
		let starts = Rc::new(Cell::new(0));
		let s = starts.clone();
		let store = Readable::new((), move |_set| {
			s.set(s.get() + 1);
			Subscription::empty()
		});

		store.subscribe(|_| {}).unsubscribe();
		store.subscribe(|_| {}).unsubscribe();
		assert_eq!(starts.get(), 2);
	}

	#[rstest]
	fn test_setter_outlives_store() {
		let setter = Rc::new(RefCell::new(None));
		let slot = setter.clone();
		{
			let store = Readable::new(0, move |set| {
				*slot.borrow_mut() = Some(set);
				Subscription::empty()
			});
			store.subscribe(|_| {}).unsubscribe();
		}
		// Store is gone; this must be a no-op
		setter.borrow().as_ref().unwrap().set(9);
	}

	#[rstest]
	fn test_unsubscribe_inside_callback() {
		let setter = Rc::new(RefCell::new(None));
		let slot = setter.clone();
		let stops = Rc::new(Cell::new(0));
		let t = stops.clone();
		let store = Readable::new(0, move |set| {
			*slot.borrow_mut() = Some(set);
			let t = t.clone();
			Subscription::new(move || t.set(t.get() + 1))
		});

		let holder: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));
		let h = holder.clone();
		let sub = store.subscribe(move |v| {
			if *v == 1 {
				let detached = h.borrow_mut().take();
				drop(detached);
			}
		});
		*holder.borrow_mut() = Some(sub);
		assert_eq!(store.subscriber_count(), 1);

		let set = setter.borrow().clone().unwrap();
		set.set(1);
		assert_eq!(store.subscriber_count(), 0);
		assert_eq!(stops.get(), 1);
	}

	#[rstest]
	fn test_get_reads_synchronous_activation() {
		let store = Readable::new(0, |set| {
			set.set(3);
			Subscription::empty()
		});
		assert_eq!(store.get(), 3);
		assert_eq!(store.subscriber_count(), 0);
	}
}
