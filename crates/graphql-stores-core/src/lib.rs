//! graphql-stores-core - Store Runtime
//!
//! The reactive plumbing shared by every graphql-stores crate.
//!
//! ## Modules
//!
//! - [`store`]: [`Readable`] lazy push stores with activation and teardown
//! - [`observable`]: [`Observable`] push sources, cancellable [`Subscription`]
//!   tokens and the [`observe`] converter
//! - [`scope`]: explicit component scope tree with typed [`Context`] tokens
//!   and mount hooks
//! - [`scheduler`]: the [`Scheduler`] capability used to run work once the
//!   current component phase is over
//!
//! Everything here is single-threaded (`Rc` + `RefCell`), matching the
//! cooperative event loop the stores are driven from.
//!
//! ## Example
//!
//! ```ignore
//! use graphql_stores_core::{Readable, Subscription};
//!
//! let store = Readable::new(0, |set| {
//!     set.set(1);
//!     Subscription::empty()
//! });
//!
//! let _sub = store.subscribe(|value| println!("value: {}", value));
//! // Prints "value: 0", then "value: 1"
//! ```

#![warn(missing_docs)]

pub mod observable;
pub mod scheduler;
pub mod scope;
pub mod store;

pub use observable::{Next, Observable, Subscription, observe};
pub use scheduler::{
	DEFAULT_DEFER_DELAY, DeferredScheduler, LifecycleScheduler, ScheduleError, Scheduler, Task,
	TimerScheduler,
};
pub use scope::{Context, ContextKey, Scope, ScopeError};
pub use store::{Readable, Setter};
