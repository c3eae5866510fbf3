//! Push sources and subscription tokens
//!
//! An [`Observable`] is anything that pushes values to a callback over time:
//! a live GraphQL query, a subscription transport, a test double. Subscribing
//! returns a [`Subscription`] token; dropping or unsubscribing the token
//! cancels delivery.
//!
//! [`observe`] turns any push source into a lazy [`Readable`] store.

use std::fmt;
use std::rc::Rc;

use crate::store::Readable;

/// Callback receiving every pushed value.
pub type Next<T> = Box<dyn FnMut(T)>;

/// A cancellable subscription token.
///
/// The teardown runs exactly once: on [`Subscription::unsubscribe`] or when
/// the token is dropped, whichever comes first.
#[must_use = "dropping a Subscription cancels it immediately"]
pub struct Subscription {
	teardown: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
	/// Creates a token that runs `teardown` when cancelled.
	pub fn new<F>(teardown: F) -> Self
	where
		F: FnOnce() + 'static,
	{
		Self {
			teardown: Some(Box::new(teardown)),
		}
	}

	/// Creates a token with nothing to tear down.
	pub fn empty() -> Self {
		Self { teardown: None }
	}

	/// Cancels the subscription.
	pub fn unsubscribe(mut self) {
		self.cancel();
	}

	/// Returns `true` once the teardown has run (or if there never was one).
	pub fn is_closed(&self) -> bool {
		self.teardown.is_none()
	}

	fn cancel(&mut self) {
		if let Some(teardown) = self.teardown.take() {
			teardown();
		}
	}
}

impl Drop for Subscription {
	fn drop(&mut self) {
		self.cancel();
	}
}

impl fmt::Debug for Subscription {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Subscription")
			.field("closed", &self.is_closed())
			.finish()
	}
}

/// A source that pushes values of type `T` to subscribers.
///
/// Implementations decide when values arrive (synchronously during
/// `subscribe`, from a timer, from the network). The only contract is that
/// no value is delivered after the returned [`Subscription`] is cancelled.
pub trait Observable<T> {
	/// Starts delivering values to `next` until the returned token is cancelled.
	fn subscribe(&self, next: Next<T>) -> Subscription;
}

impl<T, O> Observable<T> for Rc<O>
where
	O: Observable<T> + ?Sized,
{
	fn subscribe(&self, next: Next<T>) -> Subscription {
		(**self).subscribe(next)
	}
}

impl<T, O> Observable<T> for Box<O>
where
	O: Observable<T> + ?Sized,
{
	fn subscribe(&self, next: Next<T>) -> Subscription {
		(**self).subscribe(next)
	}
}

/// Converts a push source into a lazy store.
///
/// The store starts at `initial` (`None` meaning "nothing yet"). The source is
/// subscribed when the store gains its first subscriber and cancelled when the
/// last one leaves. Every pushed value is stored as `Some(value)` and
/// delivered, even when it equals the previous one.
///
/// # Example
///
/// ```ignore
/// let store = observe(live_query, Some(cached));
/// let _sub = store.subscribe(|value| render(value));
/// ```
pub fn observe<T, O>(source: O, initial: Option<T>) -> Readable<Option<T>>
where
	T: Clone + PartialEq + 'static,
	O: Observable<T> + 'static,
{
	Readable::new(initial, move |set| {
		source.subscribe(Box::new(move |value| set.replace(Some(value))))
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use std::cell::{Cell, RefCell};

	/// Pushes whatever the test hands it to every live subscriber.
	#[derive(Default)]
	struct Manual {
		next: Rc<RefCell<Vec<(usize, Next<i32>)>>>,
		ids: Cell<usize>,
	}

	impl Manual {
		fn push(&self, value: i32) {
			for (_, next) in self.next.borrow_mut().iter_mut() {
				next(value);
			}
		}

		fn live(&self) -> usize {
			self.next.borrow().len()
		}
	}

	impl Observable<i32> for Manual {
		fn subscribe(&self, next: Next<i32>) -> Subscription {
			let id = self.ids.get();
			self.ids.set(id + 1);
			self.next.borrow_mut().push((id, next));
			let list = self.next.clone();
			Subscription::new(move || list.borrow_mut().retain(|(i, _)| *i != id))
		}
	}

	#[rstest]
	fn test_subscription_runs_teardown_once() {
		let count = Rc::new(Cell::new(0));
		let c = count.clone();
		let sub = Subscription::new(move || c.set(c.get() + 1));
		assert!(!sub.is_closed());
		sub.unsubscribe();
		assert_eq!(count.get(), 1);
	}

	#[rstest]
	fn test_subscription_drop_cancels() {
		let count = Rc::new(Cell::new(0));
		{
			let c = count.clone();
			let _sub = Subscription::new(move || c.set(c.get() + 1));
		}
		assert_eq!(count.get(), 1);
	}

	#[rstest]
	fn test_empty_subscription_is_closed() {
		assert!(Subscription::empty().is_closed());
	}

	#[rstest]
	fn test_observe_is_lazy() {
		let source = Rc::new(Manual::default());
		let store = observe(source.clone(), None);
		assert_eq!(source.live(), 0);

		let seen = Rc::new(RefCell::new(Vec::new()));
		let s = seen.clone();
		let sub = store.subscribe(move |v| s.borrow_mut().push(*v));
		assert_eq!(source.live(), 1);

		source.push(7);
		assert_eq!(*seen.borrow(), vec![None, Some(7)]);

		drop(sub);
		assert_eq!(source.live(), 0);
	}

	#[rstest]
	fn test_observe_seed_is_delivered_first() {
		let source = Rc::new(Manual::default());
		let store = observe(source.clone(), Some(1));

		let seen = Rc::new(RefCell::new(Vec::new()));
		let s = seen.clone();
		let _sub = store.subscribe(move |v| s.borrow_mut().push(*v));
		source.push(2);

		assert_eq!(*seen.borrow(), vec![Some(1), Some(2)]);
	}

	#[rstest]
	fn test_observe_forwards_repeated_pushes() {
		let source = Rc::new(Manual::default());
		let store = observe(source.clone(), Some(1));

		let seen = Rc::new(RefCell::new(Vec::new()));
		let s = seen.clone();
		let _sub = store.subscribe(move |v| s.borrow_mut().push(*v));
		source.push(1);
		source.push(1);

		assert_eq!(*seen.borrow(), vec![Some(1), Some(1), Some(1)]);
	}
}
