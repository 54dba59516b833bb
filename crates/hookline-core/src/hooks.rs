//! React-style hooks bound to a component instance.
//!
//! A [`Component`] owns the state behind every hook it calls. Hooks are
//! identified by their position in the call sequence, so they must be called
//! in the same order on every render. When the component is unmounted, each
//! hook's teardown runs exactly once: timers are cancelled, in-flight async
//! operations are disowned and effect cleanups run.
//!
//! # Quick Start
//!
//! ```ignore
//! use hookline_core::hooks::{Component, use_signal, use_debounce_value};
//! use hookline_core::timer::ManualScheduler;
//! use std::rc::Rc;
//! use std::time::Duration;
//!
//! let component = Component::new(Rc::new(ManualScheduler::new()));
//!
//! let query = component.render(|| {
//!     let text = use_signal(|| String::from("rust"));
//!     use_debounce_value(text.get(), Duration::from_millis(300))
//! });
//! ```
//!
//! # Available Hooks
//!
//! | Hook | Purpose |
//! |------|---------|
//! | [`use_signal`] | Reactive state that marks the component for re-render |
//! | [`use_state`] | Simple state with a `(value, setter)` API |
//! | [`use_ref`] | Mutable slot that doesn't trigger re-renders |
//! | [`use_latest`] | Slot that always holds the value from the latest render |
//! | [`use_effect`] | Side effects that run when dependencies change |
//! | [`use_effect_cleanup`] | Effects with cleanup functions |
//! | [`use_mount`] | One-time effect on first render, cleanup on unmount |
//! | [`use_unmount`] | Run the latest callback on unmount |
//! | [`use_memo`] | Memoized computations |
//! | [`use_debounce_value`](crate::debounce::use_debounce_value) | Trailing-debounced copy of a value |
//! | [`use_debounce_callback`](crate::debounce::use_debounce_callback) | Trailing-debounced function |
//! | [`use_async`](crate::async_op::use_async) | Last-write-wins async operation state |
//! | [`use_undo_redo_state`](crate::undo_redo::use_undo_redo_state) | Value with linear undo/redo |
//!
//! # Rules of Hooks
//!
//! - Call hooks at the top level of the render function.
//! - Don't call hooks inside conditionals, loops, after early returns or in
//!   event handlers and timer callbacks.
//!
//! Violations panic with a message naming the hook:
//!
//! ```text
//! hookline hooks error: Hook order mismatch at index 1!
//! Previous render: `use_effect`
//! Current render: `use_signal`
//! ```

use crate::reactive::{RefHandle, Signal};
use crate::timer::Scheduler;
use std::any::Any;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Something that owns resources which must be released on unmount.
pub trait Teardown {
    /// Release resources. Must be safe to call more than once.
    fn teardown(&self);
}

// ============================================================================
// Hook Registry
// ============================================================================

/// Metadata about a hook for debugging purposes.
#[derive(Debug, Clone)]
pub struct HookMeta {
    /// The hook function name (e.g., "use_signal", "use_async")
    pub hook_type: &'static str,
    /// The type of value stored (from std::any::type_name)
    pub value_type: &'static str,
}

type TeardownFn = Box<dyn FnOnce()>;

/// Internal storage for a single hook.
struct HookEntry {
    value: Box<dyn Any>,
    meta: HookMeta,
    teardown: Option<TeardownFn>,
}

/// Per-component hook storage, indexed by call order.
struct HookRegistry {
    hooks: Vec<HookEntry>,
    /// Current hook index during rendering (reset to 0 each render)
    current_index: usize,
    is_rendering: bool,
    /// Hook count from previous render (for mismatch detection)
    expected_count: Option<usize>,
    render_count: usize,
    unmounted: bool,
}

impl HookRegistry {
    fn new() -> Self {
        Self {
            hooks: Vec::new(),
            current_index: 0,
            is_rendering: false,
            expected_count: None,
            render_count: 0,
            unmounted: false,
        }
    }

    fn begin_render(&mut self) {
        if self.unmounted {
            panic!(
                "\n\n\x1b[1;31mhookline hooks error: render called after unmount!\x1b[0m\n\
                A component cannot be rendered again once it has been unmounted.\n\
                Create a new Component instead.\n"
            );
        }
        self.current_index = 0;
        self.is_rendering = true;
    }

    fn end_render(&mut self) {
        if let Some(expected) = self.expected_count
            && self.current_index != expected
        {
            panic!(
                "\n\n\x1b[1;31mhookline hooks error: Hook count mismatch!\x1b[0m\n\
                Previous render had {} hooks, current render has {} hooks.\n\
                Render number: {}\n\n\
                This usually happens when:\n\
                - A hook is called inside a conditional (if/match)\n\
                - A hook is called inside a loop with varying iterations\n\
                - A hook is called inside an early return\n\n\
                Hooks must be called in the exact same order every render.\n",
                expected, self.current_index, self.render_count
            );
        }

        self.expected_count = Some(self.current_index);
        self.is_rendering = false;
        self.render_count += 1;
    }

    /// Get or create the hook at the current index.
    ///
    /// `teardown` is consulted only when the hook is created.
    fn use_hook<T: Clone + 'static>(
        &mut self,
        hook_type: &'static str,
        init: impl FnOnce() -> T,
        teardown: impl FnOnce(&T) -> Option<TeardownFn>,
    ) -> T {
        if !self.is_rendering {
            panic!(
                "\n\n\x1b[1;31mhookline hooks error: `{}` called outside of render!\x1b[0m\n\
                Hooks can only be called during component rendering.\n\
                Make sure you're not calling hooks in:\n\
                - Event handlers\n\
                - Timer or async callbacks\n\
                - Static initializers\n",
                hook_type
            );
        }

        let index = self.current_index;
        self.current_index += 1;

        if let Some(entry) = self.hooks.get(index) {
            if entry.meta.hook_type != hook_type {
                panic!(
                    "\n\n\x1b[1;31mhookline hooks error: Hook order mismatch at index {}!\x1b[0m\n\
                    Previous render: `{}`\n\
                    Current render: `{}`\n\n\
                    Hooks must be called in the exact same order every render.\n",
                    index, entry.meta.hook_type, hook_type
                );
            }

            entry
                .value
                .downcast_ref::<T>()
                .expect("Hook value type mismatch - this is a bug in hookline")
                .clone()
        } else {
            let value = init();
            let meta = HookMeta {
                hook_type,
                value_type: std::any::type_name::<T>(),
            };

            self.hooks.push(HookEntry {
                value: Box::new(value.clone()),
                meta,
                teardown: teardown(&value),
            });

            value
        }
    }

    /// Mark the registry unmounted and hand back every hook in creation order.
    fn unmount(&mut self) -> Vec<HookEntry> {
        self.unmounted = true;
        self.is_rendering = false;
        std::mem::take(&mut self.hooks)
    }
}

// ============================================================================
// Component
// ============================================================================

struct ComponentInner {
    registry: RefCell<HookRegistry>,
    scheduler: Rc<dyn Scheduler>,
    needs_render: Rc<Cell<bool>>,
}

impl ComponentInner {
    /// Mark the component for re-render whenever `signal` is written.
    fn watch<T>(&self, signal: &Signal<T>) {
        let needs_render = Rc::clone(&self.needs_render);
        signal.subscribe(move || {
            if !needs_render.replace(true) {
                tracing::trace!("component marked for re-render");
            }
        });
    }
}

// Stack of components currently rendering on this thread. Nested renders push
// on top; hooks always bind to the innermost one.
thread_local! {
    static RENDERING: RefCell<Vec<Rc<ComponentInner>>> = const { RefCell::new(Vec::new()) };
}

/// Pops the rendering stack even if the render function panics.
struct RenderGuard;

impl Drop for RenderGuard {
    fn drop(&mut self) {
        RENDERING.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

/// A component instance: the owner of all hook state for one piece of UI.
///
/// Cloning a `Component` yields another handle to the same instance.
#[derive(Clone)]
pub struct Component {
    inner: Rc<ComponentInner>,
}

impl Component {
    /// Create a component whose timers run on `scheduler`.
    pub fn new(scheduler: Rc<dyn Scheduler>) -> Self {
        Self {
            inner: Rc::new(ComponentInner {
                registry: RefCell::new(HookRegistry::new()),
                scheduler,
                needs_render: Rc::new(Cell::new(false)),
            }),
        }
    }

    /// Run one render pass.
    ///
    /// Hooks called inside `f` bind to this component.
    ///
    /// # Panics
    ///
    /// Panics if the component was unmounted, or if `f` calls a different
    /// number or order of hooks than the previous render did.
    pub fn render<R>(&self, f: impl FnOnce() -> R) -> R {
        self.inner.registry.borrow_mut().begin_render();
        self.inner.needs_render.set(false);

        let result = {
            RENDERING.with(|stack| stack.borrow_mut().push(Rc::clone(&self.inner)));
            let _guard = RenderGuard;
            f()
        };

        self.inner.registry.borrow_mut().end_render();
        result
    }

    /// Whether any hook state was written since the last render started.
    pub fn needs_render(&self) -> bool {
        self.inner.needs_render.get()
    }

    /// Whether [`unmount`](Self::unmount) has been called.
    pub fn is_unmounted(&self) -> bool {
        self.inner.registry.borrow().unmounted
    }

    /// Number of completed renders.
    pub fn render_count(&self) -> usize {
        self.inner.registry.borrow().render_count
    }

    /// The scheduler this component's timers run on.
    pub fn scheduler(&self) -> Rc<dyn Scheduler> {
        Rc::clone(&self.inner.scheduler)
    }

    /// Permanently remove the component.
    ///
    /// Runs every hook's teardown exactly once, most recently created hook
    /// first. Later calls are no-ops.
    pub fn unmount(&self) {
        let entries = {
            let mut registry = self.inner.registry.borrow_mut();
            if registry.unmounted {
                return;
            }
            registry.unmount()
        };

        let mut entries = entries;
        tracing::debug!(hooks = entries.len(), "unmounting component");
        for entry in entries.iter_mut().rev() {
            if let Some(teardown) = entry.teardown.take() {
                teardown();
            }
        }
    }

    /// Debug information about the hooks registered so far.
    pub fn hooks_debug_info(&self) -> Vec<HookMeta> {
        self.inner
            .registry
            .borrow()
            .hooks
            .iter()
            .map(|entry| entry.meta.clone())
            .collect()
    }
}

impl std::fmt::Debug for Component {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let registry = self.inner.registry.borrow();
        f.debug_struct("Component")
            .field("hooks", &registry.hooks.len())
            .field("render_count", &registry.render_count)
            .field("unmounted", &registry.unmounted)
            .field("needs_render", &self.inner.needs_render.get())
            .finish()
    }
}

fn current_component(hook_type: &'static str) -> Rc<ComponentInner> {
    let current = RENDERING.with(|stack| stack.borrow().last().cloned());
    match current {
        Some(component) => component,
        None => panic!(
            "\n\n\x1b[1;31mhookline hooks error: `{}` called outside of render!\x1b[0m\n\
            Hooks can only be called inside Component::render.\n",
            hook_type
        ),
    }
}

// ============================================================================
// Building blocks for hooks
// ============================================================================

/// Get or create plain hook state at the current position.
///
/// The building block for custom hooks whose state needs no teardown.
pub fn use_hook<T: Clone + 'static>(hook_type: &'static str, init: impl FnOnce() -> T) -> T {
    let component = current_component(hook_type);
    let mut registry = component.registry.borrow_mut();
    registry.use_hook(hook_type, init, |_| None)
}

/// Get or create hook state whose [`Teardown`] runs on unmount.
pub fn use_managed_hook<T>(hook_type: &'static str, init: impl FnOnce() -> T) -> T
where
    T: Clone + Teardown + 'static,
{
    let component = current_component(hook_type);
    let mut registry = component.registry.borrow_mut();
    registry.use_hook(hook_type, init, |value| {
        let value = value.clone();
        Some(Box::new(move || value.teardown()) as TeardownFn)
    })
}

/// Create a signal that marks the current component for re-render when written.
///
/// Only call this from inside a hook's `init` closure or at the top level of a
/// render; the signal is not itself stored in the registry.
pub fn watched_signal<T: 'static>(hook_type: &'static str, value: T) -> Signal<T> {
    let component = current_component(hook_type);
    let signal = Signal::new(value);
    component.watch(&signal);
    signal
}

/// The scheduler of the component currently rendering.
pub fn current_scheduler(hook_type: &'static str) -> Rc<dyn Scheduler> {
    Rc::clone(&current_component(hook_type).scheduler)
}

// ============================================================================
// Public API - Hook functions
// ============================================================================

/// Create or retrieve a persistent reactive signal.
///
/// The initializer only runs on the first render. Writing the signal marks
/// the component as needing a re-render.
///
/// # Example
///
/// ```ignore
/// let count = use_signal(|| 0);
/// count.update(|n| *n += 1);
/// ```
pub fn use_signal<T: 'static>(init: impl FnOnce() -> T) -> Signal<T> {
    let component = current_component("use_signal");
    let mut registry = component.registry.borrow_mut();
    registry.use_hook(
        "use_signal",
        || {
            let signal = Signal::new(init());
            component.watch(&signal);
            signal
        },
        |_| None,
    )
}

/// Create or retrieve a simple state value with a setter function.
///
/// # Example
///
/// ```ignore
/// let (count, set_count) = use_state(|| 0);
/// set_count(count + 1);
/// ```
pub fn use_state<T: Clone + 'static>(init: impl FnOnce() -> T) -> (T, impl Fn(T)) {
    let signal = use_signal(init);
    let value = signal.get();
    let setter = move |new_value: T| {
        signal.set(new_value);
    };
    (value, setter)
}

/// Create or retrieve a mutable slot that persists across renders.
///
/// Writes to the slot don't trigger re-renders.
pub fn use_ref<T: 'static>(init: impl FnOnce() -> T) -> RefHandle<T> {
    use_hook("use_ref", || RefHandle::new(init()))
}

/// Keep a slot pointed at the value passed on the latest render.
///
/// Timers and async completions that read the slot at fire time always see
/// the newest callback or value, never the one captured when they started.
///
/// # Example
///
/// ```ignore
/// let on_save = use_latest(Rc::new(move |text: String| save(text)) as Rc<dyn Fn(String)>);
/// // later, inside a timer: (on_save.get())(text)
/// ```
pub fn use_latest<T: 'static>(value: T) -> RefHandle<T> {
    let mut fresh = Some(value);
    let slot = use_hook("use_latest", || {
        RefHandle::new(fresh.take().expect("use_latest value is only taken once"))
    });
    if let Some(value) = fresh {
        slot.set(value);
    }
    slot
}

/// Storage for effect dependencies and cleanup function.
struct EffectState<D> {
    deps: Option<D>,
    cleanup: Option<Box<dyn FnOnce()>>,
}

struct EffectSlot<D>(Rc<RefCell<EffectState<D>>>);

impl<D> Clone for EffectSlot<D> {
    fn clone(&self) -> Self {
        Self(Rc::clone(&self.0))
    }
}

impl<D> Teardown for EffectSlot<D> {
    fn teardown(&self) {
        let cleanup = self.0.borrow_mut().cleanup.take();
        if let Some(cleanup) = cleanup {
            cleanup();
        }
    }
}

fn use_effect_slot<D: 'static>(hook_type: &'static str) -> EffectSlot<D> {
    use_managed_hook(hook_type, || {
        EffectSlot(Rc::new(RefCell::new(EffectState {
            deps: None,
            cleanup: None,
        })))
    })
}

/// Swap in new deps if they changed, returning the previous cleanup to run.
fn effect_should_run<D: PartialEq>(
    slot: &EffectSlot<D>,
    deps: D,
) -> Option<Option<Box<dyn FnOnce()>>> {
    let mut state = slot.0.borrow_mut();
    let should_run = match &state.deps {
        None => true,
        Some(old_deps) => old_deps != &deps,
    };
    if should_run {
        state.deps = Some(deps);
        Some(state.cleanup.take())
    } else {
        None
    }
}

/// Run a side effect when dependencies change.
///
/// The effect runs during render, on the first render and whenever `deps`
/// differs from the previous render's.
///
/// # Example
///
/// ```ignore
/// let count = use_signal(|| 0);
/// use_effect(move || println!("Count changed to: {}", count.get()), count.get());
/// ```
pub fn use_effect<F, D>(effect_fn: F, deps: D)
where
    F: FnOnce() + 'static,
    D: PartialEq + 'static,
{
    let slot = use_effect_slot::<D>("use_effect");
    if let Some(previous_cleanup) = effect_should_run(&slot, deps) {
        if let Some(cleanup) = previous_cleanup {
            cleanup();
        }
        effect_fn();
    }
}

/// Run a side effect with a cleanup function when dependencies change.
///
/// The cleanup runs before the next effect run and when the component is
/// unmounted.
///
/// # Example
///
/// ```ignore
/// use_effect_cleanup(|| {
///     let subscription = subscribe(id.get());
///     move || subscription.unsubscribe()
/// }, id.get());
/// ```
pub fn use_effect_cleanup<F, C, D>(effect_fn: F, deps: D)
where
    F: FnOnce() -> C + 'static,
    C: FnOnce() + 'static,
    D: PartialEq + 'static,
{
    let slot = use_effect_slot::<D>("use_effect_cleanup");
    if let Some(previous_cleanup) = effect_should_run(&slot, deps) {
        if let Some(cleanup) = previous_cleanup {
            cleanup();
        }
        let cleanup = effect_fn();
        slot.0.borrow_mut().cleanup = Some(Box::new(cleanup));
    }
}

/// Run a side effect only once when the component mounts.
///
/// The returned cleanup runs on unmount.
///
/// # Example
///
/// ```ignore
/// use_mount(|| {
///     println!("Component mounted!");
///     || println!("Component unmounted!")
/// });
/// ```
pub fn use_mount<F, C>(effect_fn: F)
where
    F: FnOnce() -> C + 'static,
    C: FnOnce() + 'static,
{
    use_effect_cleanup(effect_fn, ());
}

/// Run the callback passed on the latest render when the component unmounts.
pub fn use_unmount(callback: impl Fn() + 'static) {
    let latest = use_latest(Rc::new(callback) as Rc<dyn Fn()>);
    use_mount(move || move || (latest.get())());
}

/// Storage for memoized computation state.
struct MemoState<T, D> {
    value: Option<T>,
    deps: Option<D>,
}

/// Memoize a computation based on dependencies.
///
/// # Example
///
/// ```ignore
/// let sum = use_memo(|| items.iter().sum::<i32>(), items.clone());
/// ```
pub fn use_memo<T, F, D>(compute: F, deps: D) -> T
where
    T: Clone + 'static,
    F: FnOnce() -> T,
    D: PartialEq + 'static,
{
    let state_ref = use_hook::<Rc<RefCell<MemoState<T, D>>>>("use_memo", || {
        Rc::new(RefCell::new(MemoState {
            value: None,
            deps: None,
        }))
    });

    let mut state = state_ref.borrow_mut();

    let cached = match (&state.deps, &state.value) {
        (Some(old_deps), Some(value)) if old_deps == &deps => Some(value.clone()),
        _ => None,
    };

    match cached {
        Some(value) => value,
        None => {
            let value = compute();
            state.value = Some(value.clone());
            state.deps = Some(deps);
            value
        }
    }
}
