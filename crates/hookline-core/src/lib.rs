//! Core types and hooks for hookline.

pub mod async_op;
pub mod debounce;
pub mod error;
pub mod hooks;
pub mod reactive;
pub mod timer;
pub mod undo_redo;

// Re-export reactive types for convenience
pub use reactive::{RefHandle, Signal, SubscriptionId};

// Re-export hooks and the component lifecycle
pub use hooks::{
    Component, HookMeta, Teardown, current_scheduler, use_effect, use_effect_cleanup, use_hook,
    use_latest, use_managed_hook, use_memo, use_mount, use_ref, use_signal, use_state,
    use_unmount, watched_signal,
};

// Re-export the cores and their hooks
pub use async_op::{AsyncOperation, AsyncOptions, AsyncState, use_async};
pub use debounce::{
    DebouncedCallback, DebouncedValue, Debouncer, use_debounce_callback, use_debounce_value,
};
pub use error::{HookError, HookResult};
pub use timer::{ManualScheduler, Scheduler, TimerCallback, TimerHandle};
pub use undo_redo::{
    UndoRedo, UndoRedoHandle, use_undo_redo_state, use_undo_redo_state_with_capacity,
};
