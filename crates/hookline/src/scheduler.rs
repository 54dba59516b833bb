//! Tokio-backed timers.
//!
//! Each timer is a local task that sleeps for the requested delay and then
//! runs its callback. Cancelling a timer aborts the task. Tasks are spawned
//! with `spawn_local`, so timers must be started either inside a
//! [`LocalSet`] or through a scheduler created with
//! [`TokioScheduler::with_local_set`].

use hookline_core::{Scheduler, TimerCallback, TimerHandle};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;
use tokio::task::{AbortHandle, LocalSet};

/// A [`Scheduler`] running timers as tokio local tasks.
#[derive(Default)]
pub struct TokioScheduler {
    timers: Rc<RefCell<HashMap<TimerHandle, AbortHandle>>>,
    next_id: Cell<u64>,
    local: Option<Rc<LocalSet>>,
}

impl TokioScheduler {
    /// Spawn timers onto the `LocalSet` that is running the caller.
    ///
    /// Starting a timer outside a `LocalSet` panics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn timers onto `local`, which may be called from anywhere on the
    /// thread that owns it.
    pub fn with_local_set(local: Rc<LocalSet>) -> Self {
        Self {
            local: Some(local),
            ..Self::default()
        }
    }

    /// Number of timers that have neither fired nor been cancelled.
    pub fn pending_timers(&self) -> usize {
        self.timers.borrow().len()
    }
}

impl Scheduler for TokioScheduler {
    fn start(&self, delay: Duration, callback: TimerCallback) -> TimerHandle {
        let handle = TimerHandle::from_raw(self.next_id.get());
        self.next_id.set(handle.as_raw() + 1);

        let timers = Rc::clone(&self.timers);
        let task = async move {
            tokio::time::sleep(delay).await;
            // A timer removed by `cancel` must not run even if it already woke.
            let live = timers.borrow_mut().remove(&handle).is_some();
            if live {
                tracing::trace!(%handle, "timer fired");
                callback();
            }
        };

        let join = match &self.local {
            Some(local) => local.spawn_local(task),
            None => tokio::task::spawn_local(task),
        };
        self.timers
            .borrow_mut()
            .insert(handle, join.abort_handle());
        handle
    }

    fn cancel(&self, handle: TimerHandle) {
        let task = self.timers.borrow_mut().remove(&handle);
        if let Some(task) = task {
            tracing::trace!(%handle, "timer cancelled");
            task.abort();
        }
    }
}

impl std::fmt::Debug for TokioScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokioScheduler")
            .field("pending", &self.timers.borrow().len())
            .field("dedicated_local_set", &self.local.is_some())
            .finish()
    }
}
