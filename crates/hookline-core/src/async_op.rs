//! Last-write-wins async operations.
//!
//! [`AsyncOperation`] wraps a function returning a future and exposes its
//! progress as `data` / `loading` / `error` state. Every call to
//! [`execute`](AsyncOperation::execute) advances a generation counter and
//! aborts the previous call; only the settlement of the current generation
//! is allowed to touch state. Superseded calls settle silently.
//!
//! # Example
//!
//! ```ignore
//! let search = AsyncOperation::new(|query: String| async move {
//!     fetch_results(&query).await
//! });
//!
//! let first = search.execute("ru".into());
//! let second = search.execute("rust".into());
//! // `first` resolves to Ok(None); only `second` may update `search.data()`
//! ```

use crate::error::{HookError, HookResult};
use crate::hooks::{Teardown, use_managed_hook, watched_signal};
use crate::reactive::Signal;
use futures_util::FutureExt;
use futures_util::future::{AbortHandle, Abortable, Aborted, LocalBoxFuture};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::future::Future;
use std::rc::Rc;

/// Externally visible progress of an [`AsyncOperation`].
#[derive(Clone, PartialEq)]
pub struct AsyncState<T> {
    /// Result of the last successful call. Cleared by a failure or reset.
    pub data: Option<T>,
    /// Whether the current call is still running.
    pub loading: bool,
    /// Failure of the last call.
    pub error: Option<HookError>,
}

impl<T> Default for AsyncState<T> {
    fn default() -> Self {
        Self {
            data: None,
            loading: false,
            error: None,
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for AsyncState<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncState")
            .field("data", &self.data)
            .field("loading", &self.loading)
            .field("error", &self.error)
            .finish()
    }
}

/// Callbacks invoked when the current call settles.
pub struct AsyncOptions<T> {
    on_success: Option<Rc<dyn Fn(&T)>>,
    on_error: Option<Rc<dyn Fn(&HookError)>>,
}

impl<T> AsyncOptions<T> {
    /// No callbacks.
    pub fn new() -> Self {
        Self {
            on_success: None,
            on_error: None,
        }
    }

    /// Run `callback` with the result of each successful current call.
    pub fn on_success(mut self, callback: impl Fn(&T) + 'static) -> Self {
        self.on_success = Some(Rc::new(callback));
        self
    }

    /// Run `callback` with the error of each failed current call.
    pub fn on_error(mut self, callback: impl Fn(&HookError) + 'static) -> Self {
        self.on_error = Some(Rc::new(callback));
        self
    }
}

impl<T> Default for AsyncOptions<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for AsyncOptions<T> {
    fn clone(&self) -> Self {
        Self {
            on_success: self.on_success.clone(),
            on_error: self.on_error.clone(),
        }
    }
}

type Operation<A, T> = Rc<dyn Fn(A) -> LocalBoxFuture<'static, HookResult<T>>>;

fn box_operation<A, T, E, F, Fut>(operation: F) -> Operation<A, T>
where
    F: Fn(A) -> Fut + 'static,
    Fut: Future<Output = Result<T, E>> + 'static,
    E: Into<HookError>,
{
    Rc::new(move |args| operation(args).map(|result| result.map_err(Into::into)).boxed_local())
}

struct AsyncInner<A, T> {
    operation: RefCell<Operation<A, T>>,
    options: RefCell<AsyncOptions<T>>,
    state: Signal<AsyncState<T>>,
    generation: Cell<u64>,
    in_flight: RefCell<Option<AbortHandle>>,
    torn_down: Cell<bool>,
}

impl<A, T: Clone> AsyncInner<A, T> {
    fn is_current(&self, generation: u64) -> bool {
        !self.torn_down.get() && self.generation.get() == generation
    }

    fn settle(
        &self,
        generation: u64,
        outcome: Result<HookResult<T>, Aborted>,
    ) -> HookResult<Option<T>> {
        if !self.is_current(generation) {
            tracing::debug!(generation, "discarding superseded async result");
            return Ok(None);
        }
        self.in_flight.borrow_mut().take();

        match outcome.unwrap_or_else(|aborted| Err(aborted.into())) {
            Ok(data) => {
                self.state.update(|state| {
                    state.data = Some(data.clone());
                    state.loading = false;
                    state.error = None;
                });
                let on_success = self.options.borrow().on_success.clone();
                if let Some(callback) = on_success {
                    callback(&data);
                }
                Ok(Some(data))
            }
            Err(err) if err.is_cancelled() => {
                tracing::debug!(generation, "async operation cancelled");
                Ok(None)
            }
            Err(err) => {
                tracing::warn!(generation, error = %err, "async operation failed");
                self.state.update(|state| {
                    state.data = None;
                    state.loading = false;
                    state.error = Some(err.clone());
                });
                let on_error = self.options.borrow().on_error.clone();
                if let Some(callback) = on_error {
                    callback(&err);
                }
                Err(err)
            }
        }
    }
}

/// An async operation whose visible state follows only its latest call.
///
/// Clones share the same state and generation counter.
pub struct AsyncOperation<A, T> {
    inner: Rc<AsyncInner<A, T>>,
}

impl<A: 'static, T: Clone + 'static> AsyncOperation<A, T> {
    /// Wrap `operation`. Its error type is normalized into [`HookError`].
    pub fn new<E, F, Fut>(operation: F) -> Self
    where
        F: Fn(A) -> Fut + 'static,
        Fut: Future<Output = Result<T, E>> + 'static,
        E: Into<HookError>,
    {
        Self::with_state(box_operation(operation), Signal::new(AsyncState::default()))
    }

    fn with_state(operation: Operation<A, T>, state: Signal<AsyncState<T>>) -> Self {
        Self {
            inner: Rc::new(AsyncInner {
                operation: RefCell::new(operation),
                options: RefCell::new(AsyncOptions::new()),
                state,
                generation: Cell::new(0),
                in_flight: RefCell::new(None),
                torn_down: Cell::new(false),
            }),
        }
    }

    /// Start a call, superseding any call still in flight.
    ///
    /// State switches to `loading` immediately; `data` is kept until the call
    /// settles. The returned future resolves to:
    /// - `Ok(Some(data))` when this call succeeded and was still current,
    /// - `Err(error)` when it failed and was still current,
    /// - `Ok(None)` when it was superseded, torn down or cancelled.
    pub fn execute(&self, args: A) -> impl Future<Output = HookResult<Option<T>>> + use<A, T> {
        let inner = Rc::clone(&self.inner);
        let started = if inner.torn_down.get() {
            tracing::debug!("execute ignored after teardown");
            None
        } else {
            Some(self.start(args))
        };

        async move {
            let Some((generation, call)) = started else {
                return Ok(None);
            };
            let outcome = call.await;
            inner.settle(generation, outcome)
        }
    }

    fn start(&self, args: A) -> (u64, Abortable<LocalBoxFuture<'static, HookResult<T>>>) {
        let inner = &self.inner;
        let generation = inner.generation.get() + 1;
        inner.generation.set(generation);

        let (handle, registration) = AbortHandle::new_pair();
        if let Some(previous) = inner.in_flight.replace(Some(handle)) {
            tracing::debug!(generation, "superseding in-flight async operation");
            previous.abort();
        }

        inner.state.update(|state| {
            state.loading = true;
            state.error = None;
        });

        let operation = Rc::clone(&*inner.operation.borrow());
        (generation, Abortable::new(operation(args), registration))
    }

    /// Clear `data`, `loading` and `error`.
    ///
    /// The generation is left alone: a call still in flight that has not been
    /// superseded will update state when it settles. Does nothing after
    /// teardown.
    pub fn reset(&self) {
        if self.inner.torn_down.get() {
            tracing::debug!("reset ignored after teardown");
            return;
        }
        self.inner.state.set(AsyncState::default());
    }

    /// Point the operation slot at a new function for later calls.
    pub fn set_operation<E, F, Fut>(&self, operation: F)
    where
        F: Fn(A) -> Fut + 'static,
        Fut: Future<Output = Result<T, E>> + 'static,
        E: Into<HookError>,
    {
        self.set_operation_boxed(box_operation(operation));
    }

    fn set_operation_boxed(&self, operation: Operation<A, T>) {
        *self.inner.operation.borrow_mut() = operation;
    }

    /// Replace the settlement callbacks.
    pub fn set_options(&self, options: AsyncOptions<T>) {
        *self.inner.options.borrow_mut() = options;
    }

    /// Snapshot of the visible state.
    pub fn state(&self) -> AsyncState<T> {
        self.inner.state.get()
    }

    /// The signal holding the visible state.
    pub fn signal(&self) -> &Signal<AsyncState<T>> {
        &self.inner.state
    }

    /// Result of the last successful call.
    pub fn data(&self) -> Option<T> {
        self.inner.state.with(|state| state.data.clone())
    }

    /// Whether the current call is running.
    pub fn loading(&self) -> bool {
        self.inner.state.with(|state| state.loading)
    }

    /// Error of the last failed call.
    pub fn error(&self) -> Option<HookError> {
        self.inner.state.with(|state| state.error.clone())
    }

    /// Generation of the most recent call.
    pub fn generation(&self) -> u64 {
        self.inner.generation.get()
    }
}

impl<A, T> AsyncOperation<A, T> {
    /// Whether [`teardown`](Teardown::teardown) has been called.
    pub fn is_torn_down(&self) -> bool {
        self.inner.torn_down.get()
    }
}

impl<A, T> Clone for AsyncOperation<A, T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<A, T> Teardown for AsyncOperation<A, T> {
    /// Abort the call in flight and freeze state.
    fn teardown(&self) {
        self.inner.torn_down.set(true);
        if let Some(handle) = self.inner.in_flight.borrow_mut().take() {
            handle.abort();
        }
    }
}

impl<A, T: fmt::Debug> fmt::Debug for AsyncOperation<A, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncOperation")
            .field("state", &self.inner.state)
            .field("generation", &self.inner.generation.get())
            .field("torn_down", &self.inner.torn_down.get())
            .finish()
    }
}

/// Bind an [`AsyncOperation`] to the current component.
///
/// The handle is stable across renders. Each render re-points it at the
/// latest `operation` and `options`, so calls started later never run a
/// stale closure. State changes mark the component for re-render; on
/// unmount the call in flight is aborted and its settlement ignored.
///
/// # Example
///
/// ```ignore
/// let user = use_async(
///     move |id: u32| api.fetch_user(id),
///     AsyncOptions::new().on_error(|err| tracing::error!(%err, "load failed")),
/// );
/// spawn_local(user.execute(42));
/// ```
pub fn use_async<A, T, E, F, Fut>(operation: F, options: AsyncOptions<T>) -> AsyncOperation<A, T>
where
    A: 'static,
    T: Clone + 'static,
    E: Into<HookError>,
    F: Fn(A) -> Fut + 'static,
    Fut: Future<Output = Result<T, E>> + 'static,
{
    let operation = box_operation(operation);
    let handle = use_managed_hook("use_async", || {
        AsyncOperation::with_state(
            Rc::clone(&operation),
            watched_signal("use_async", AsyncState::default()),
        )
    });
    handle.set_operation_boxed(operation);
    handle.set_options(options);
    handle
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::Component;
    use crate::timer::ManualScheduler;
    use futures::channel::oneshot;
    use futures::executor::{LocalPool, block_on};
    use futures::task::LocalSpawnExt;
    use std::collections::VecDeque;

    /// An operation whose calls each wait on the next queued channel.
    fn gated<T: 'static>(
        gates: Vec<oneshot::Receiver<Result<T, String>>>,
    ) -> impl Fn(()) -> LocalBoxFuture<'static, Result<T, String>> {
        let gates = Rc::new(RefCell::new(VecDeque::from(gates)));
        move |()| {
            let gate = gates.borrow_mut().pop_front();
            async move {
                match gate {
                    Some(gate) => gate.await.unwrap_or_else(|_| Err("gate dropped".into())),
                    None => Err("no gate queued".into()),
                }
            }
            .boxed_local()
        }
    }

    #[test]
    fn success_sets_data_and_returns_it() {
        let op = AsyncOperation::new(|n: u32| async move { Ok::<_, HookError>(n * 2) });

        let result = block_on(op.execute(21));

        assert_eq!(result, Ok(Some(42)));
        assert_eq!(op.data(), Some(42));
        assert!(!op.loading());
        assert_eq!(op.error(), None);
    }

    #[test]
    fn execute_marks_loading_and_keeps_previous_data() {
        let (tx, rx) = oneshot::channel();
        let op = AsyncOperation::new(gated(vec![rx]));
        op.signal().set(AsyncState {
            data: Some(1),
            loading: false,
            error: Some(HookError::from("old")),
        });

        let call = op.execute(());
        assert!(op.loading());
        assert_eq!(op.error(), None);
        assert_eq!(op.data(), Some(1));

        tx.send(Ok(2)).unwrap();
        assert_eq!(block_on(call), Ok(Some(2)));
        assert_eq!(op.data(), Some(2));
    }

    #[test]
    fn latest_call_wins_even_if_earlier_settles_last() {
        let (tx1, rx1) = oneshot::channel();
        let (tx2, rx2) = oneshot::channel();
        let op = AsyncOperation::new(gated(vec![rx1, rx2]));

        let results = Rc::new(RefCell::new(Vec::new()));
        let mut pool = LocalPool::new();
        let spawner = pool.spawner();
        for (label, call) in [("first", op.execute(())), ("second", op.execute(()))] {
            let results = Rc::clone(&results);
            spawner
                .spawn_local(async move {
                    let outcome = call.await;
                    results.borrow_mut().push((label, outcome));
                })
                .unwrap();
        }

        tx2.send(Ok(2)).unwrap();
        pool.run_until_stalled();
        let _ = tx1.send(Ok(1));
        pool.run();

        assert_eq!(op.data(), Some(2));
        assert!(!op.loading());
        let mut results = results.borrow().clone();
        results.sort_by_key(|(label, _)| *label);
        assert_eq!(results, vec![("first", Ok(None)), ("second", Ok(Some(2)))]);
    }

    #[test]
    fn superseded_call_resolves_to_none() {
        let op = AsyncOperation::new(|n: u32| async move { Ok::<_, HookError>(n) });

        let first = op.execute(1);
        let second = op.execute(2);

        assert_eq!(block_on(second), Ok(Some(2)));
        assert_eq!(block_on(first), Ok(None));
        assert_eq!(op.data(), Some(2));
        assert_eq!(op.generation(), 2);
    }

    #[test]
    fn string_rejection_becomes_error_and_clears_data() {
        let op = AsyncOperation::new(|fail: bool| async move {
            if fail { Err("boom") } else { Ok(7) }
        });
        block_on(op.execute(false)).unwrap();
        assert_eq!(op.data(), Some(7));

        let result = block_on(op.execute(true));

        let expected = HookError::Operation {
            message: "boom".into(),
        };
        assert_eq!(result, Err(expected.clone()));
        assert_eq!(op.error(), Some(expected));
        assert_eq!(op.data(), None);
        assert!(!op.loading());
    }

    #[test]
    fn cancellation_is_silent() {
        let errors = Rc::new(Cell::new(0));
        let op = AsyncOperation::new(|()| async { Err::<u32, _>(HookError::Cancelled) });
        let errors_clone = Rc::clone(&errors);
        op.set_options(
            AsyncOptions::new().on_error(move |_| errors_clone.set(errors_clone.get() + 1)),
        );

        let result = block_on(op.execute(()));

        assert_eq!(result, Ok(None));
        assert_eq!(op.error(), None);
        assert_eq!(errors.get(), 0);
    }

    #[test]
    fn callbacks_fire_for_current_call_only() {
        let successes = Rc::new(RefCell::new(Vec::new()));
        let failures = Rc::new(RefCell::new(Vec::new()));
        let op = AsyncOperation::new(|n: i32| async move {
            if n < 0 { Err(format!("negative: {n}")) } else { Ok(n) }
        });
        let (s, f) = (Rc::clone(&successes), Rc::clone(&failures));
        op.set_options(
            AsyncOptions::new()
                .on_success(move |n: &i32| s.borrow_mut().push(*n))
                .on_error(move |err| f.borrow_mut().push(err.message())),
        );

        let stale = op.execute(1);
        block_on(op.execute(2)).unwrap();
        block_on(stale).unwrap();
        assert!(block_on(op.execute(-1)).is_err());

        assert_eq!(*successes.borrow(), vec![2]);
        assert_eq!(*failures.borrow(), vec!["negative: -1".to_string()]);
    }

    #[test]
    fn reset_keeps_generation() {
        let (tx, rx) = oneshot::channel();
        let op = AsyncOperation::new(gated(vec![rx]));

        let call = op.execute(());
        op.reset();
        assert_eq!(op.state(), AsyncState::default());
        assert_eq!(op.generation(), 1);

        tx.send(Ok(5)).unwrap();
        assert_eq!(block_on(call), Ok(Some(5)));
        assert_eq!(op.data(), Some(5));
    }

    #[test]
    fn teardown_freezes_state() {
        let (tx, rx) = oneshot::channel();
        let op = AsyncOperation::new(gated(vec![rx]));

        let call = op.execute(());
        op.teardown();
        let _ = tx.send(Ok(9));

        assert_eq!(block_on(call), Ok(None));
        assert_eq!(op.data(), None);
        assert!(op.loading());
        assert_eq!(block_on(op.execute(())), Ok(None));
        assert_eq!(op.generation(), 1);
    }

    #[test]
    fn use_async_updates_component_and_disowns_on_unmount() {
        let component = Component::new(Rc::new(ManualScheduler::new()));
        let (tx, rx) = oneshot::channel();
        let gate = Rc::new(RefCell::new(Some(rx)));

        let render = || {
            let gate = Rc::clone(&gate);
            component.render(move || {
                use_async(
                    move |()| {
                        let rx = gate.borrow_mut().take();
                        async move {
                            match rx {
                                Some(rx) => rx.await.map_err(|_| HookError::from("dropped")),
                                None => Ok(0),
                            }
                        }
                    },
                    AsyncOptions::new(),
                )
            })
        };

        let op = render();
        let first = op.execute(());
        assert!(component.needs_render());

        let op = render();
        assert!(op.loading());
        assert_eq!(block_on(op.execute(())), Ok(Some(0)));
        assert!(component.needs_render());
        assert_eq!(render().data(), Some(0));

        let pending = op.execute(());
        component.unmount();
        drop(tx);
        assert_eq!(block_on(pending), Ok(None));
        assert_eq!(block_on(first), Ok(None));
        assert!(op.is_torn_down());
    }

    #[test]
    fn reset_after_unmount_leaves_state_alone() {
        let component = Component::new(Rc::new(ManualScheduler::new()));
        let render = || {
            component.render(|| {
                use_async(|n: u32| async move { Ok::<_, HookError>(n) }, AsyncOptions::new())
            })
        };

        let op = render();
        assert_eq!(block_on(op.execute(3)), Ok(Some(3)));
        let op = render();

        component.unmount();
        op.reset();

        assert!(!component.needs_render());
        assert_eq!(op.data(), Some(3));
    }
}
