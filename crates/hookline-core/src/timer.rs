//! Cancellable timers.
//!
//! Hooks never talk to a clock directly. They go through a [`Scheduler`],
//! which the owning [`Component`](crate::hooks::Component) is constructed
//! with. The facade crate provides a tokio-backed scheduler; this module
//! provides [`ManualScheduler`], a virtual clock that only moves when told
//! to, which makes timing behavior fully deterministic in tests.

use std::cell::RefCell;
use std::fmt;
use std::time::Duration;

/// Opaque identifier for a started timer.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct TimerHandle(u64);

impl TimerHandle {
    /// Build a handle from a scheduler-assigned id.
    pub fn from_raw(id: u64) -> Self {
        TimerHandle(id)
    }

    /// The scheduler-assigned id.
    pub fn as_raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TimerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer#{}", self.0)
    }
}

/// Callback run when a timer fires.
pub type TimerCallback = Box<dyn FnOnce() + 'static>;

/// A single-threaded cancellable-timer primitive.
///
/// Implementations must guarantee that:
/// - `callback` never runs inside `start`, even for a zero delay;
/// - a cancelled timer's callback never runs;
/// - timers fire in the order their delays expire.
pub trait Scheduler {
    /// Start a timer that runs `callback` once `delay` has elapsed.
    fn start(&self, delay: Duration, callback: TimerCallback) -> TimerHandle;

    /// Cancel a timer. Cancelling a fired or unknown timer is a no-op.
    fn cancel(&self, handle: TimerHandle);
}

struct ManualTimer {
    handle: TimerHandle,
    due: Duration,
    callback: TimerCallback,
}

#[derive(Default)]
struct ManualClock {
    now: Duration,
    next_id: u64,
    timers: Vec<ManualTimer>,
}

/// A virtual-clock scheduler driven by explicit calls to [`advance`](Self::advance).
///
/// # Example
///
/// ```ignore
/// let scheduler = ManualScheduler::new();
/// scheduler.start(Duration::from_millis(300), Box::new(|| println!("fired")));
///
/// scheduler.advance(Duration::from_millis(299)); // nothing
/// scheduler.advance(Duration::from_millis(1));   // Prints: "fired"
/// ```
#[derive(Default)]
pub struct ManualScheduler {
    clock: RefCell<ManualClock>,
}

impl ManualScheduler {
    /// Create a scheduler with its clock at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Time elapsed on the virtual clock.
    pub fn now(&self) -> Duration {
        self.clock.borrow().now
    }

    /// Number of timers that have been started but have neither fired nor
    /// been cancelled.
    pub fn pending_timers(&self) -> usize {
        self.clock.borrow().timers.len()
    }

    /// Move the clock forward, firing every timer that falls due on the way.
    ///
    /// Timers started by callbacks fire within the same call if they fall
    /// due before the target time.
    pub fn advance(&self, by: Duration) {
        let target = self.clock.borrow().now + by;
        while let Some(timer) = self.take_next_due(target) {
            tracing::trace!(handle = %timer.handle, due = ?timer.due, "manual timer fired");
            (timer.callback)();
        }
        self.clock.borrow_mut().now = target;
    }

    /// Fire the timers due at the current instant (zero-delay timers).
    pub fn run_due(&self) {
        self.advance(Duration::ZERO);
    }

    fn take_next_due(&self, target: Duration) -> Option<ManualTimer> {
        let mut clock = self.clock.borrow_mut();
        // Earliest due time first, start order breaks ties.
        let index = clock
            .timers
            .iter()
            .enumerate()
            .filter(|(_, timer)| timer.due <= target)
            .min_by_key(|(_, timer)| (timer.due, timer.handle.as_raw()))
            .map(|(index, _)| index)?;
        let timer = clock.timers.remove(index);
        clock.now = timer.due;
        Some(timer)
    }
}

impl Scheduler for ManualScheduler {
    fn start(&self, delay: Duration, callback: TimerCallback) -> TimerHandle {
        let mut clock = self.clock.borrow_mut();
        let handle = TimerHandle(clock.next_id);
        clock.next_id += 1;
        let due = clock.now + delay;
        clock.timers.push(ManualTimer {
            handle,
            due,
            callback,
        });
        handle
    }

    fn cancel(&self, handle: TimerHandle) {
        self.clock
            .borrow_mut()
            .timers
            .retain(|timer| timer.handle != handle);
    }
}

impl fmt::Debug for ManualScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let clock = self.clock.borrow();
        f.debug_struct("ManualScheduler")
            .field("now", &clock.now)
            .field("pending", &clock.timers.len())
            .finish()
    }
}
