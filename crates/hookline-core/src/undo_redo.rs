//! Linear undo/redo history.
//!
//! [`UndoRedo`] keeps a present value plus two stacks: `history` (values that
//! were current before, oldest first) and `future` (values that were undone,
//! nearest to the present first). A new write truncates the future branch.

use crate::hooks::{use_hook, watched_signal};
use crate::reactive::Signal;
use std::collections::VecDeque;

/// A value with bounded linear undo/redo.
///
/// Every operation is total: undo with nothing to undo and redo with nothing
/// to redo are no-ops.
///
/// # Example
///
/// ```ignore
/// let mut doc = UndoRedo::new(0);
/// doc.set(1);
/// doc.set(2);
/// doc.undo();
/// assert_eq!(*doc.current(), 1);
/// doc.redo();
/// assert_eq!(*doc.current(), 2);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct UndoRedo<T> {
    current: T,
    history: VecDeque<T>,
    future: VecDeque<T>,
    initial: T,
    capacity: Option<usize>,
}

impl<T: Clone> UndoRedo<T> {
    /// Start with `initial` as both the present value and the reset baseline.
    pub fn new(initial: T) -> Self {
        Self {
            current: initial.clone(),
            history: VecDeque::new(),
            future: VecDeque::new(),
            initial,
            capacity: None,
        }
    }

    /// Like [`new`](Self::new), keeping at most `capacity` undo steps.
    pub fn with_capacity(initial: T, capacity: usize) -> Self {
        Self {
            capacity: Some(capacity),
            ..Self::new(initial)
        }
    }

    /// Reset the present value to `value`, or to the baseline when `None`.
    ///
    /// An explicit value also becomes the new baseline. Both stacks are
    /// cleared.
    pub fn reset(&mut self, value: Option<T>) {
        if let Some(value) = value {
            self.initial = value;
        }
        self.current = self.initial.clone();
        self.history.clear();
        self.future.clear();
    }
}

impl<T> UndoRedo<T> {
    /// Replace the present value, recording the old one for undo.
    pub fn set(&mut self, value: T) {
        let previous = std::mem::replace(&mut self.current, value);
        self.push_history(previous);
        self.future.clear();
    }

    /// Replace the present value with `update(&current)`.
    pub fn set_with(&mut self, update: impl FnOnce(&T) -> T) {
        let value = update(&self.current);
        self.set(value);
    }

    /// Step back one value. Returns `false` if there was nothing to undo.
    pub fn undo(&mut self) -> bool {
        let Some(previous) = self.history.pop_back() else {
            return false;
        };
        let outgoing = std::mem::replace(&mut self.current, previous);
        self.future.push_front(outgoing);
        true
    }

    /// Step forward one value. Returns `false` if there was nothing to redo.
    pub fn redo(&mut self) -> bool {
        let Some(next) = self.future.pop_front() else {
            return false;
        };
        let outgoing = std::mem::replace(&mut self.current, next);
        self.push_history(outgoing);
        true
    }

    fn push_history(&mut self, value: T) {
        if self.capacity == Some(0) {
            return;
        }
        self.history.push_back(value);
        if let Some(capacity) = self.capacity
            && self.history.len() > capacity
        {
            self.history.pop_front();
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.history.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    pub fn current(&self) -> &T {
        &self.current
    }

    /// Past values, oldest first.
    pub fn history(&self) -> &VecDeque<T> {
        &self.history
    }

    /// Undone values, nearest to the present first.
    pub fn future(&self) -> &VecDeque<T> {
        &self.future
    }

    /// The value a parameterless [`reset`](Self::reset) returns to.
    pub fn initial(&self) -> &T {
        &self.initial
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }
}

/// Component-bound handle to an [`UndoRedo`] store.
///
/// Every mutation marks the component for re-render.
pub struct UndoRedoHandle<T> {
    store: Signal<UndoRedo<T>>,
}

impl<T: Clone> UndoRedoHandle<T> {
    /// The present value.
    pub fn get(&self) -> T {
        self.store.with(|store| store.current().clone())
    }

    /// Snapshot of the whole store.
    pub fn snapshot(&self) -> UndoRedo<T> {
        self.store.get()
    }

    pub fn set(&self, value: T) {
        self.store.update(|store| store.set(value));
    }

    /// Replace the present value with `update(&current)`.
    ///
    /// `update` runs before the store is borrowed for writing, so it may read
    /// this handle or any clone of it.
    pub fn set_with(&self, update: impl FnOnce(&T) -> T) {
        let current = self.get();
        self.set(update(&current));
    }

    /// Step back one value. Leaves the component alone when there is nothing
    /// to undo.
    pub fn undo(&self) -> bool {
        self.can_undo() && self.store.update(UndoRedo::undo)
    }

    /// Step forward one value. Leaves the component alone when there is
    /// nothing to redo.
    pub fn redo(&self) -> bool {
        self.can_redo() && self.store.update(UndoRedo::redo)
    }

    pub fn reset(&self, value: Option<T>) {
        self.store.update(|store| store.reset(value));
    }

    pub fn can_undo(&self) -> bool {
        self.store.with(UndoRedo::can_undo)
    }

    pub fn can_redo(&self) -> bool {
        self.store.with(UndoRedo::can_redo)
    }
}

impl<T> Clone for UndoRedoHandle<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

/// Keep a value with unbounded undo/redo across renders.
///
/// # Example
///
/// ```ignore
/// let text = use_undo_redo_state(|| String::new());
/// text.set("hello".into());
/// if text.can_undo() {
///     text.undo();
/// }
/// ```
pub fn use_undo_redo_state<T: Clone + 'static>(init: impl FnOnce() -> T) -> UndoRedoHandle<T> {
    use_hook("use_undo_redo_state", || UndoRedoHandle {
        store: watched_signal("use_undo_redo_state", UndoRedo::new(init())),
    })
}

/// Like [`use_undo_redo_state`], keeping at most `capacity` undo steps.
pub fn use_undo_redo_state_with_capacity<T: Clone + 'static>(
    init: impl FnOnce() -> T,
    capacity: usize,
) -> UndoRedoHandle<T> {
    use_hook("use_undo_redo_state", || UndoRedoHandle {
        store: watched_signal(
            "use_undo_redo_state",
            UndoRedo::with_capacity(init(), capacity),
        ),
    })
}
