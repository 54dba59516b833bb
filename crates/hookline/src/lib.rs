//! Hookline - debounce, async and undo/redo hooks for Rust components.
//!
//! Hookline provides React-style hooks whose state lives in a [`Component`]
//! and survives across renders. The hook cores ([`Debouncer`],
//! [`AsyncOperation`], [`UndoRedo`]) are plain types that can also be used
//! without a component.
//!
//! # Quick Start
//!
//! ```ignore
//! use hookline::prelude::*;
//! use std::time::Duration;
//!
//! fn main() -> Result<(), RuntimeError> {
//!     let runtime = Runtime::new()?;
//!     let component = runtime.component();
//!
//!     let query = component.render(|| use_debounce_value("rust", Duration::from_millis(300)));
//!     println!("searching for {query}");
//!     Ok(())
//! }
//! ```
//!
//! # Hooks
//!
//! | Hook | Purpose |
//! |------|---------|
//! | [`use_debounce_value`] | Value that settles after a quiet period |
//! | [`use_debounce_callback`] | Callback invoked once input stops |
//! | [`use_async`] | Async operation where the latest call wins |
//! | [`use_undo_redo_state`] | Value with linear undo/redo |
//! | [`use_signal`] | Reactive state that triggers re-renders |
//! | [`use_state`] | Simple state with `(value, setter)` tuple |
//! | [`use_ref`] | Mutable reference (doesn't trigger re-renders) |
//! | [`use_latest`] | Reference always holding the newest value |
//! | [`use_effect`] | Side effects when dependencies change |
//! | [`use_effect_cleanup`] | Effects with cleanup functions |
//! | [`use_mount`] | One-time effect on first render |
//! | [`use_unmount`] | One-time effect when the component unmounts |
//! | [`use_memo`] | Memoized expensive computations |
//!
//! ## Rules of Hooks
//!
//! Hooks must be called in the **same order** on every render:
//!
//! - Call hooks at the top level of the render closure
//! - Don't call hooks inside conditionals or loops
//! - Don't call hooks after early returns
//! - Don't call hooks from timer callbacks or async tasks
//!
//! Breaking these rules panics with a message naming the offending hook.
//!
//! # Features
//!
//! - `tokio-runtime` (default): [`Runtime`] and [`TokioScheduler`].
//! - `tracing-init` (default): [`init_tracing`] installs a `tracing-subscriber`
//!   formatter.
//!
//! [`Runtime`]: runtime::Runtime
//! [`TokioScheduler`]: scheduler::TokioScheduler
//! [`init_tracing`]: runtime::init_tracing

#[cfg(feature = "tokio-runtime")]
pub mod runtime;
#[cfg(feature = "tokio-runtime")]
pub mod scheduler;

pub mod prelude {
    //! Common imports for hookline applications.
    pub use hookline_core::{
        AsyncOperation, AsyncOptions, AsyncState, Component, DebouncedCallback, DebouncedValue,
        HookError, HookResult, ManualScheduler, RefHandle, Scheduler, Signal, UndoRedo,
        UndoRedoHandle,
    };
    // Hooks
    pub use hookline_core::{
        use_async, use_debounce_callback, use_debounce_value, use_effect, use_effect_cleanup,
        use_latest, use_memo, use_mount, use_ref, use_signal, use_state, use_undo_redo_state,
        use_undo_redo_state_with_capacity, use_unmount,
    };

    #[cfg(feature = "tokio-runtime")]
    pub use crate::runtime::{Runtime, RuntimeConfig, RuntimeError, init_tracing};
    #[cfg(feature = "tokio-runtime")]
    pub use crate::scheduler::TokioScheduler;
}

// Re-export core types at crate root
pub use hookline_core::{
    AsyncOperation, AsyncOptions, AsyncState, Component, DebouncedCallback, DebouncedValue,
    Debouncer, HookError, HookResult, ManualScheduler, Scheduler, Teardown, TimerHandle, UndoRedo,
    UndoRedoHandle, use_async, use_debounce_callback, use_debounce_value, use_effect,
    use_effect_cleanup, use_latest, use_memo, use_mount, use_ref, use_signal, use_state,
    use_undo_redo_state, use_unmount,
};

pub use hookline_core as core;
