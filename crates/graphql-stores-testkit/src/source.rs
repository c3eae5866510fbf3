//! Manually driven push source

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use graphql_stores_core::{Next, Observable, Subscription};

type Observer<T> = Rc<RefCell<Next<T>>>;

/// A push source whose values are pushed by the test.
///
/// Tracks how many observers are attached and how many subscriptions were
/// ever opened.
pub struct PushSource<T> {
	observers: Rc<RefCell<BTreeMap<u64, Observer<T>>>>,
	next_id: Cell<u64>,
	opened: Cell<usize>,
	replay: RefCell<Option<T>>,
}

impl<T: Clone + 'static> PushSource<T> {
	/// Creates a source with no observers.
	pub fn new() -> Self {
		Self {
			observers: Rc::new(RefCell::new(BTreeMap::new())),
			next_id: Cell::new(0),
			opened: Cell::new(0),
			replay: RefCell::new(None),
		}
	}

	/// Pushes `value` to every attached observer.
	pub fn push(&self, value: T) {
		let observers: Vec<Observer<T>> = self.observers.borrow().values().cloned().collect();
		for observer in observers {
			(observer.borrow_mut())(value.clone());
		}
	}

	/// Value handed to each new observer as soon as it attaches, if any.
	pub fn set_replay(&self, value: Option<T>) {
		*self.replay.borrow_mut() = value;
	}

	/// The current replay value.
	pub fn replay(&self) -> Option<T> {
		self.replay.borrow().clone()
	}

	/// Observers currently attached.
	pub fn observer_count(&self) -> usize {
		self.observers.borrow().len()
	}

	/// Subscriptions opened so far, including cancelled ones.
	pub fn opened(&self) -> usize {
		self.opened.get()
	}
}

impl<T: Clone + 'static> Default for PushSource<T> {
	fn default() -> Self {
		Self::new()
	}
}

impl<T: Clone + 'static> Observable<T> for PushSource<T> {
	fn subscribe(&self, next: Next<T>) -> Subscription {
		let id = self.next_id.get();
		self.next_id.set(id + 1);
		self.opened.set(self.opened.get() + 1);

		let observer: Observer<T> = Rc::new(RefCell::new(next));
		self.observers.borrow_mut().insert(id, observer.clone());

		let replay = self.replay.borrow().clone();
		if let Some(value) = replay {
			(observer.borrow_mut())(value);
		}

		let observers = Rc::downgrade(&self.observers);
		Subscription::new(move || {
			if let Some(observers) = observers.upgrade() {
				observers.borrow_mut().remove(&id);
			}
		})
	}
}

impl<T> fmt::Debug for PushSource<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("PushSource")
			.field("observers", &self.observers.borrow().len())
			.field("opened", &self.opened.get())
			.finish()
	}
}
