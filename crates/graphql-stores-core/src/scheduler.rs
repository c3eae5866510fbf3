//! Post-phase scheduling
//!
//! Some work has to wait until the current component phase is over, e.g.
//! closing a hydration window once the restoring component has mounted.
//! The [`Scheduler`] capability expresses that, with one implementation per
//! environment:
//!
//! | Scheduler | Runs the task | Use when |
//! |-----------|---------------|----------|
//! | [`LifecycleScheduler`] | when the given scope mounts | inside component initialization |
//! | [`DeferredScheduler`] | on the host's next `run_pending()` | a host loop drives ticks explicitly |
//! | [`TimerScheduler`] | after a short `tokio` timer | standalone, inside a `LocalSet` |
//!
//! Callers choose explicitly; nothing looks for a component context.
//! Scheduling fails with [`ScheduleError`] when the environment cannot run
//! the task later, and the task is dropped unrun.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use thiserror::Error;

use crate::scope::{Scope, ScopeError};

/// A one-shot unit of deferred work.
pub type Task = Box<dyn FnOnce()>;

/// Delay used by [`TimerScheduler::default`]: the minimal deferred tick.
pub const DEFAULT_DEFER_DELAY: Duration = Duration::from_millis(1);

/// Errors raised when a task cannot be scheduled.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ScheduleError {
	/// No `tokio` runtime is running on this thread.
	#[error("no tokio runtime on this thread to run the deferred task")]
	NoRuntime,
}

/// Runs a task once the current phase has completed.
pub trait Scheduler {
	/// Schedules `task` to run exactly once, after the current phase.
	///
	/// # Errors
	///
	/// Returns [`ScheduleError`] if the task can never run; it is dropped.
	fn after_current_phase(&self, task: Task) -> Result<(), ScheduleError>;
}

impl<S: Scheduler + ?Sized> Scheduler for Rc<S> {
	fn after_current_phase(&self, task: Task) -> Result<(), ScheduleError> {
		(**self).after_current_phase(task)
	}
}

impl<S: Scheduler + ?Sized> Scheduler for Box<S> {
	fn after_current_phase(&self, task: Task) -> Result<(), ScheduleError> {
		(**self).after_current_phase(task)
	}
}

impl<S: Scheduler + ?Sized> Scheduler for &S {
	fn after_current_phase(&self, task: Task) -> Result<(), ScheduleError> {
		(**self).after_current_phase(task)
	}
}

/// Runs tasks when a component scope mounts.
#[derive(Debug, Clone)]
pub struct LifecycleScheduler {
	scope: Scope,
}

impl LifecycleScheduler {
	/// Binds the scheduler to `scope`.
	///
	/// # Errors
	///
	/// Returns [`ScopeError::AlreadyMounted`] if the scope has mounted already;
	/// there is no mount left to wait for, so use a standalone scheduler instead.
	pub fn new(scope: &Scope) -> Result<Self, ScopeError> {
		if scope.is_mounted() {
			return Err(ScopeError::AlreadyMounted(scope.id()));
		}
		Ok(Self {
			scope: scope.clone(),
		})
	}

	/// The scope this scheduler waits on.
	pub fn scope(&self) -> &Scope {
		&self.scope
	}
}

impl Scheduler for LifecycleScheduler {
	fn after_current_phase(&self, task: Task) -> Result<(), ScheduleError> {
		if let Err(task) = self.scope.try_on_mount(task) {
			// Mounted between construction and now: the phase is already over
			tracing::warn!(
				scope = self.scope.id(),
				"scope mounted before task was scheduled, running it now"
			);
			task();
		}
		Ok(())
	}
}

/// A local task queue drained by the host loop.
///
/// Clones share the queue, so the host can keep one clone to drain while
/// handing others to code that schedules work.
#[derive(Clone, Default)]
pub struct DeferredScheduler {
	queue: Rc<RefCell<VecDeque<Task>>>,
}

impl DeferredScheduler {
	/// Creates an empty queue.
	pub fn new() -> Self {
		Self::default()
	}

	/// Number of queued tasks.
	pub fn pending(&self) -> usize {
		self.queue.borrow().len()
	}

	/// Runs every task queued before this call and returns how many ran.
	///
	/// Tasks scheduled while draining wait for the next call.
	pub fn run_pending(&self) -> usize {
		let batch = std::mem::take(&mut *self.queue.borrow_mut());
		let ran = batch.len();
		for task in batch {
			task();
		}
		ran
	}
}

impl Scheduler for DeferredScheduler {
	fn after_current_phase(&self, task: Task) -> Result<(), ScheduleError> {
		self.queue.borrow_mut().push_back(task);
		Ok(())
	}
}

impl fmt::Debug for DeferredScheduler {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("DeferredScheduler")
			.field("pending", &self.pending())
			.finish()
	}
}

/// Runs tasks on the local `tokio` task set after a short delay.
///
/// Tasks are not `Send`, so they are spawned with
/// [`tokio::task::spawn_local`]. Without a runtime on the current thread
/// scheduling fails with [`ScheduleError::NoRuntime`]; inside a runtime the
/// caller must also be within a [`tokio::task::LocalSet`], since `tokio`
/// offers no way to check for one without panicking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerScheduler {
	delay: Duration,
}

impl TimerScheduler {
	/// Creates a scheduler that waits `delay` before running each task.
	pub fn new(delay: Duration) -> Self {
		Self { delay }
	}

	/// The configured delay.
	pub fn delay(&self) -> Duration {
		self.delay
	}
}

impl Default for TimerScheduler {
	fn default() -> Self {
		Self::new(DEFAULT_DEFER_DELAY)
	}
}

impl Scheduler for TimerScheduler {
	fn after_current_phase(&self, task: Task) -> Result<(), ScheduleError> {
		if tokio::runtime::Handle::try_current().is_err() {
			return Err(ScheduleError::NoRuntime);
		}
		let delay = self.delay;
		tokio::task::spawn_local(async move {
			tokio::time::sleep(delay).await;
			task();
		});
		Ok(())
	}
}
