//! Trailing debounce.
//!
//! [`Debouncer`] coalesces a burst of triggers into one action that runs
//! once a quiet period has elapsed with no further triggers. Each trigger
//! cancels the outstanding timer and starts a fresh one, so only the most
//! recent trigger's action ever runs. [`DebouncedValue`] and
//! [`DebouncedCallback`] build the value and function flavours on top of it,
//! and [`use_debounce_value`] / [`use_debounce_callback`] bind them to a
//! component.

use crate::hooks::{Teardown, current_scheduler, use_managed_hook, watched_signal};
use crate::reactive::{RefHandle, Signal};
use crate::timer::{Scheduler, TimerHandle};
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::time::Duration;

type Action = Box<dyn FnOnce()>;

#[derive(Default)]
struct DebounceState {
    timer: Option<TimerHandle>,
    pending: Option<Action>,
    /// Bumped on every schedule; a timer only acts if its cycle is current.
    cycle: u64,
    torn_down: bool,
}

/// A single-slot trailing debouncer.
///
/// Clones share the same timer and pending action. Timer callbacks only hold
/// a weak reference, so dropping every handle has the same effect as
/// [`teardown`](Self::teardown).
#[derive(Clone)]
pub struct Debouncer {
    scheduler: Rc<dyn Scheduler>,
    state: Rc<RefCell<DebounceState>>,
}

impl Debouncer {
    /// Create a debouncer whose timers run on `scheduler`.
    pub fn new(scheduler: Rc<dyn Scheduler>) -> Self {
        Self {
            scheduler,
            state: Rc::new(RefCell::new(DebounceState::default())),
        }
    }

    /// Replace any pending action with `action`, to run after `delay`.
    ///
    /// A zero delay still waits for the scheduler; the action never runs
    /// inside this call. Does nothing after teardown.
    pub fn schedule(&self, action: impl FnOnce() + 'static, delay: Duration) {
        let mut state = self.state.borrow_mut();
        if state.torn_down {
            tracing::trace!("debounce schedule ignored after teardown");
            return;
        }

        if let Some(timer) = state.timer.take() {
            tracing::trace!(%timer, "debounce timer superseded");
            self.scheduler.cancel(timer);
        }

        state.cycle += 1;
        state.pending = Some(Box::new(action));

        let cycle = state.cycle;
        let weak = Rc::downgrade(&self.state);
        let timer = self
            .scheduler
            .start(delay, Box::new(move || Self::fire(&weak, cycle)));
        tracing::trace!(%timer, ?delay, "debounce timer started");
        state.timer = Some(timer);
    }

    fn fire(state: &Weak<RefCell<DebounceState>>, cycle: u64) {
        let Some(state) = state.upgrade() else {
            return;
        };

        let action = {
            let mut state = state.borrow_mut();
            if state.torn_down || state.cycle != cycle {
                return;
            }
            state.timer = None;
            state.pending.take()
        };

        // Run without holding the borrow so the action may re-schedule.
        if let Some(action) = action {
            action();
        }
    }

    /// Discard the pending action, if any.
    pub fn cancel(&self) {
        let mut state = self.state.borrow_mut();
        state.pending = None;
        if let Some(timer) = state.timer.take() {
            tracing::trace!(%timer, "debounce timer cancelled");
            self.scheduler.cancel(timer);
        }
    }

    /// Run the pending action now instead of waiting for the timer.
    pub fn flush(&self) {
        let action = {
            let mut state = self.state.borrow_mut();
            if let Some(timer) = state.timer.take() {
                self.scheduler.cancel(timer);
            }
            state.pending.take()
        };

        if let Some(action) = action {
            action();
        }
    }

    /// Whether an action is waiting for its timer.
    pub fn is_pending(&self) -> bool {
        self.state.borrow().pending.is_some()
    }

    /// Whether [`teardown`](Self::teardown) has been called.
    pub fn is_torn_down(&self) -> bool {
        self.state.borrow().torn_down
    }
}

impl Teardown for Debouncer {
    /// Cancel the outstanding timer and ignore every later schedule.
    fn teardown(&self) {
        self.cancel();
        self.state.borrow_mut().torn_down = true;
    }
}

impl std::fmt::Debug for Debouncer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("Debouncer")
            .field("timer", &state.timer)
            .field("pending", &state.pending.is_some())
            .field("torn_down", &state.torn_down)
            .finish()
    }
}

// ============================================================================
// DebouncedValue
// ============================================================================

/// A value whose visible copy lags behind writes by a quiet period.
pub struct DebouncedValue<T> {
    visible: Signal<T>,
    debouncer: Debouncer,
}

impl<T: 'static> DebouncedValue<T> {
    /// Create a debounced value that starts out visible as `initial`.
    pub fn new(initial: T, scheduler: Rc<dyn Scheduler>) -> Self {
        Self::with_signal(Signal::new(initial), scheduler)
    }

    fn with_signal(visible: Signal<T>, scheduler: Rc<dyn Scheduler>) -> Self {
        Self {
            visible,
            debouncer: Debouncer::new(scheduler),
        }
    }

    /// Make `value` visible once `delay` passes without another update.
    pub fn update(&self, value: T, delay: Duration) {
        let visible = self.visible.clone();
        self.debouncer.schedule(move || visible.set(value), delay);
    }

    /// The signal holding the visible value.
    pub fn signal(&self) -> &Signal<T> {
        &self.visible
    }

    /// Drop the pending update.
    pub fn cancel(&self) {
        self.debouncer.cancel();
    }

    /// Apply the pending update now.
    pub fn flush(&self) {
        self.debouncer.flush();
    }

    /// Whether an update is waiting.
    pub fn is_pending(&self) -> bool {
        self.debouncer.is_pending()
    }
}

impl<T: Clone> DebouncedValue<T> {
    /// The currently visible value.
    pub fn get(&self) -> T {
        self.visible.get()
    }
}

impl<T> Clone for DebouncedValue<T> {
    fn clone(&self) -> Self {
        Self {
            visible: self.visible.clone(),
            debouncer: self.debouncer.clone(),
        }
    }
}

impl<T> Teardown for DebouncedValue<T> {
    fn teardown(&self) {
        self.debouncer.teardown();
    }
}

// ============================================================================
// DebouncedCallback
// ============================================================================

/// A function whose invocations are coalesced into one trailing call.
///
/// The callback is read from a slot when the timer fires, so a callback
/// swapped in with [`set_callback`](Self::set_callback) after a trigger is
/// the one that runs.
pub struct DebouncedCallback<A> {
    callback: RefHandle<Rc<dyn Fn(A)>>,
    delay: Rc<Cell<Duration>>,
    debouncer: Debouncer,
}

impl<A: 'static> DebouncedCallback<A> {
    /// Debounce `callback` by `delay`.
    pub fn new(
        callback: impl Fn(A) + 'static,
        delay: Duration,
        scheduler: Rc<dyn Scheduler>,
    ) -> Self {
        Self {
            callback: RefHandle::new(Rc::new(callback)),
            delay: Rc::new(Cell::new(delay)),
            debouncer: Debouncer::new(scheduler),
        }
    }

    /// Trigger the callback with `args`, superseding any pending trigger.
    pub fn call(&self, args: A) {
        let slot = self.callback.clone();
        self.debouncer.schedule(
            move || {
                let callback = slot.get();
                callback(args);
            },
            self.delay.get(),
        );
    }

    /// Point the slot at a new callback.
    pub fn set_callback(&self, callback: Rc<dyn Fn(A)>) {
        self.callback.set(callback);
    }

    /// Change the quiet period used by later calls.
    pub fn set_delay(&self, delay: Duration) {
        self.delay.set(delay);
    }

    /// The quiet period.
    pub fn delay(&self) -> Duration {
        self.delay.get()
    }

    /// Drop the pending invocation.
    pub fn cancel(&self) {
        self.debouncer.cancel();
    }

    /// Run the pending invocation now.
    pub fn flush(&self) {
        self.debouncer.flush();
    }

    /// Whether an invocation is waiting.
    pub fn is_pending(&self) -> bool {
        self.debouncer.is_pending()
    }
}

impl<A> Clone for DebouncedCallback<A> {
    fn clone(&self) -> Self {
        Self {
            callback: self.callback.clone(),
            delay: Rc::clone(&self.delay),
            debouncer: self.debouncer.clone(),
        }
    }
}

impl<A> Teardown for DebouncedCallback<A> {
    fn teardown(&self) {
        self.debouncer.teardown();
    }
}

// ============================================================================
// Hooks
// ============================================================================

#[derive(Clone)]
struct DebounceValueHook<T> {
    value: DebouncedValue<T>,
    last_input: RefHandle<(T, Duration)>,
}

impl<T> Teardown for DebounceValueHook<T> {
    fn teardown(&self) {
        self.value.teardown();
    }
}

/// Return a copy of `value` that only changes after `delay` passes without
/// `value` changing.
///
/// The first render returns `value` as-is. Changing `delay` also restarts the
/// quiet period.
///
/// # Example
///
/// ```ignore
/// let text = use_signal(String::new);
/// let query = use_debounce_value(text.get(), Duration::from_millis(300));
/// // `query` follows `text` once typing pauses for 300ms
/// ```
pub fn use_debounce_value<T>(value: T, delay: Duration) -> T
where
    T: Clone + PartialEq + 'static,
{
    let hook = use_managed_hook("use_debounce_value", || DebounceValueHook {
        value: DebouncedValue::with_signal(
            watched_signal("use_debounce_value", value.clone()),
            current_scheduler("use_debounce_value"),
        ),
        last_input: RefHandle::new((value.clone(), delay)),
    });

    let changed = {
        let last = hook.last_input.borrow();
        last.0 != value || last.1 != delay
    };
    if changed {
        hook.last_input.set((value.clone(), delay));
        hook.value.update(value, delay);
    }

    hook.value.get()
}

/// Return a debounced wrapper around `callback`.
///
/// The wrapper is stable across renders; each render re-points it at the
/// latest `callback` and `delay`. Pending calls are dropped on unmount.
///
/// # Example
///
/// ```ignore
/// let save = use_debounce_callback(move |text: String| store.save(text), Duration::from_millis(500));
/// save.call(current_text);
/// ```
pub fn use_debounce_callback<A, F>(callback: F, delay: Duration) -> DebouncedCallback<A>
where
    A: 'static,
    F: Fn(A) + 'static,
{
    let callback: Rc<dyn Fn(A)> = Rc::new(callback);
    let debounced = use_managed_hook("use_debounce_callback", || {
        let initial = Rc::clone(&callback);
        DebouncedCallback::new(
            move |args| initial(args),
            delay,
            current_scheduler("use_debounce_callback"),
        )
    });
    debounced.set_callback(callback);
    debounced.set_delay(delay);
    debounced
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::Component;
    use crate::timer::ManualScheduler;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn recorder() -> (Rc<RefCell<Vec<&'static str>>>, impl Fn(&'static str) + Clone) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let log_clone = Rc::clone(&log);
        (log, move |entry| log_clone.borrow_mut().push(entry))
    }

    #[test]
    fn only_the_last_trigger_runs() {
        let scheduler = Rc::new(ManualScheduler::new());
        let debouncer = Debouncer::new(scheduler.clone());
        let (log, record) = recorder();

        let record_a = record.clone();
        debouncer.schedule(move || record_a("a"), ms(300));
        scheduler.advance(ms(50));
        debouncer.schedule(move || record("b"), ms(300));

        assert_eq!(scheduler.pending_timers(), 1);
        scheduler.advance(ms(299));
        assert!(log.borrow().is_empty());
        scheduler.advance(ms(1));
        assert_eq!(*log.borrow(), vec!["b"]);
        assert!(!debouncer.is_pending());
    }

    #[test]
    fn zero_delay_is_trailing() {
        let scheduler = Rc::new(ManualScheduler::new());
        let debouncer = Debouncer::new(scheduler.clone());
        let (log, record) = recorder();

        debouncer.schedule(move || record("now"), Duration::ZERO);
        assert!(log.borrow().is_empty());
        assert!(debouncer.is_pending());

        scheduler.run_due();
        assert_eq!(*log.borrow(), vec!["now"]);
    }

    #[test]
    fn cancel_and_flush() {
        let scheduler = Rc::new(ManualScheduler::new());
        let debouncer = Debouncer::new(scheduler.clone());
        let (log, record) = recorder();

        let record_dropped = record.clone();
        debouncer.schedule(move || record_dropped("dropped"), ms(100));
        debouncer.cancel();
        assert!(!debouncer.is_pending());
        assert_eq!(scheduler.pending_timers(), 0);

        debouncer.schedule(move || record("flushed"), ms(100));
        debouncer.flush();
        assert_eq!(*log.borrow(), vec!["flushed"]);

        scheduler.advance(ms(500));
        assert_eq!(*log.borrow(), vec!["flushed"]);
    }

    #[test]
    fn teardown_discards_pending_action() {
        let scheduler = Rc::new(ManualScheduler::new());
        let debouncer = Debouncer::new(scheduler.clone());
        let (log, record) = recorder();

        let record_first = record.clone();
        debouncer.schedule(move || record_first("first"), ms(300));
        scheduler.advance(ms(100));
        debouncer.teardown();
        debouncer.schedule(move || record("after"), ms(10));

        scheduler.advance(ms(400));
        assert!(log.borrow().is_empty());
        assert!(debouncer.is_torn_down());
    }

    #[test]
    fn dropping_every_handle_disarms_the_timer() {
        let scheduler = Rc::new(ManualScheduler::new());
        let (log, record) = recorder();

        let debouncer = Debouncer::new(scheduler.clone());
        debouncer.schedule(move || record("orphan"), ms(10));
        drop(debouncer);

        scheduler.advance(ms(20));
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn debounced_value_skips_intermediate_values() {
        let scheduler = Rc::new(ManualScheduler::new());
        let value = DebouncedValue::new("initial", scheduler.clone());

        value.update("a", ms(300));
        scheduler.advance(ms(50));
        value.update("b", ms(300));

        scheduler.advance(ms(299));
        assert_eq!(value.get(), "initial");
        scheduler.advance(ms(1));
        assert_eq!(value.get(), "b");
    }

    #[test]
    fn debounced_callback_uses_latest_callback() {
        let scheduler = Rc::new(ManualScheduler::new());
        let seen = Rc::new(RefCell::new(Vec::new()));

        let stale_seen = Rc::clone(&seen);
        let debounced = DebouncedCallback::new(
            move |n: u32| stale_seen.borrow_mut().push(("stale", n)),
            ms(100),
            scheduler.clone(),
        );

        debounced.call(1);
        debounced.call(2);
        let fresh_seen = Rc::clone(&seen);
        debounced.set_callback(Rc::new(move |n: u32| {
            fresh_seen.borrow_mut().push(("fresh", n))
        }));

        scheduler.advance(ms(100));
        assert_eq!(*seen.borrow(), vec![("fresh", 2)]);
    }

    #[test]
    fn use_debounce_value_follows_input_after_quiet_period() {
        let scheduler = Rc::new(ManualScheduler::new());
        let component = Component::new(scheduler.clone());
        let render = |input: &'static str| {
            component.render(|| use_debounce_value(input, ms(300)))
        };

        assert_eq!(render("A0"), "A0");

        assert_eq!(render("A"), "A0");
        scheduler.advance(ms(50));
        assert_eq!(render("B"), "A0");

        scheduler.advance(ms(299));
        assert!(!component.needs_render());
        assert_eq!(render("B"), "A0");

        scheduler.advance(ms(1));
        assert!(component.needs_render());
        assert_eq!(render("B"), "B");
    }

    #[test]
    fn use_debounce_value_never_fires_after_unmount() {
        let scheduler = Rc::new(ManualScheduler::new());
        let component = Component::new(scheduler.clone());

        component.render(|| use_debounce_value(0, ms(300)));
        component.render(|| use_debounce_value(1, ms(300)));

        scheduler.advance(ms(100));
        component.unmount();
        scheduler.advance(ms(400));

        assert!(!component.needs_render());
        assert_eq!(scheduler.pending_timers(), 0);
    }

    #[test]
    fn use_debounce_callback_reads_latest_render() {
        let scheduler = Rc::new(ManualScheduler::new());
        let component = Component::new(scheduler.clone());
        let (log, record) = recorder();

        let first = component.render(|| {
            use_debounce_callback(move |_: ()| record("first render"), ms(200))
        });
        first.call(());

        let log_second = Rc::clone(&log);
        let second = component.render(move || {
            use_debounce_callback(
                move |_: ()| log_second.borrow_mut().push("second render"),
                ms(200),
            )
        });

        scheduler.advance(ms(200));
        assert_eq!(*log.borrow(), vec!["second render"]);

        second.call(());
        component.unmount();
        scheduler.advance(ms(200));
        assert_eq!(*log.borrow(), vec!["second render"]);
    }
}
