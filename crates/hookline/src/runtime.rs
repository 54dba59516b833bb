//! Single-threaded runtime for hookline components.
//!
//! Hooks are `!Send` and expect every timer callback and async settlement to
//! arrive on the thread that owns the component. [`Runtime`] bundles a tokio
//! current-thread runtime with a [`LocalSet`] and a [`TokioScheduler`] bound
//! to it, which is all a component needs.

use crate::scheduler::TokioScheduler;
use hookline_core::{Component, Scheduler};
use std::future::Future;
use std::rc::Rc;
use std::time::Duration;
use tokio::task::{JoinHandle, LocalSet};

/// Errors raised while setting up a [`Runtime`].
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// The tokio runtime could not be built.
    #[error("failed to build tokio runtime: {0}")]
    Build(#[from] std::io::Error),
}

/// Configuration for [`Runtime`].
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Install a `tracing` subscriber when the runtime starts.
    pub init_tracing: bool,
    /// Name given to the runtime's blocking-pool threads.
    pub thread_name: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            init_tracing: true,
            thread_name: String::from("hookline-blocking"),
        }
    }
}

impl RuntimeConfig {
    /// Set whether to install a `tracing` subscriber.
    pub fn with_tracing(mut self, init_tracing: bool) -> Self {
        self.init_tracing = init_tracing;
        self
    }

    /// Set the blocking-pool thread name.
    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }
}

/// A current-thread tokio runtime plus the local task set components run on.
pub struct Runtime {
    runtime: tokio::runtime::Runtime,
    local: Rc<LocalSet>,
    scheduler: Rc<TokioScheduler>,
}

impl Runtime {
    /// Build a runtime with the default configuration.
    pub fn new() -> Result<Self, RuntimeError> {
        Self::with_config(RuntimeConfig::default())
    }

    /// Build a runtime from `config`.
    pub fn with_config(config: RuntimeConfig) -> Result<Self, RuntimeError> {
        if config.init_tracing {
            init_tracing();
        }

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .thread_name(config.thread_name)
            .build()?;
        let local = Rc::new(LocalSet::new());
        let scheduler = Rc::new(TokioScheduler::with_local_set(Rc::clone(&local)));

        tracing::debug!("hookline runtime started");
        Ok(Self {
            runtime,
            local,
            scheduler,
        })
    }

    /// The scheduler timers on this runtime use.
    pub fn scheduler(&self) -> Rc<dyn Scheduler> {
        self.scheduler.clone()
    }

    /// Create a component whose timers run on this runtime.
    pub fn component(&self) -> Component {
        Component::new(self.scheduler())
    }

    /// Spawn a local task, e.g. the future returned by
    /// [`AsyncOperation::execute`](hookline_core::AsyncOperation::execute).
    ///
    /// The task makes progress whenever [`block_on`](Self::block_on) runs.
    pub fn spawn<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + 'static,
        F::Output: 'static,
    {
        self.local.spawn_local(future)
    }

    /// Drive `future` and every local task until `future` completes.
    ///
    /// `future` is only polled inside the runtime, but it is built outside
    /// it: construct timers such as `tokio::time::sleep` inside an `async`
    /// block, or use [`sleep`](Self::sleep).
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.local.block_on(&self.runtime, future)
    }

    /// Run local tasks and timers for `duration`.
    pub fn sleep(&self, duration: Duration) {
        self.block_on(async move { tokio::time::sleep(duration).await });
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("scheduler", &self.scheduler)
            .finish()
    }
}

/// Install a `fmt` tracing subscriber, unless one is already installed.
pub fn init_tracing() {
    #[cfg(feature = "tracing-init")]
    {
        let _ = tracing_subscriber::fmt::try_init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hookline_core::{
        AsyncOptions, HookError, use_async, use_debounce_value, use_undo_redo_state,
    };

    fn runtime() -> Runtime {
        Runtime::with_config(RuntimeConfig::default().with_tracing(false)).unwrap()
    }

    #[test]
    fn debounce_fires_while_blocking_on() {
        let runtime = runtime();
        let component = runtime.component();

        component.render(|| use_debounce_value(1, Duration::from_millis(5)));
        component.render(|| use_debounce_value(2, Duration::from_millis(5)));
        assert!(!component.needs_render());

        runtime.sleep(Duration::from_millis(30));

        assert!(component.needs_render());
        let value = component.render(|| use_debounce_value(2, Duration::from_millis(5)));
        assert_eq!(value, 2);
    }

    #[test]
    fn block_on_builds_timers_inside_the_runtime() {
        let runtime = runtime();
        let component = runtime.component();

        component.render(|| use_debounce_value("a", Duration::from_millis(5)));
        component.render(|| use_debounce_value("b", Duration::from_millis(5)));

        runtime.block_on(async { tokio::time::sleep(Duration::from_millis(30)).await });

        let value = component.render(|| use_debounce_value("b", Duration::from_millis(5)));
        assert_eq!(value, "b");
    }

    #[test]
    fn spawned_execute_updates_state() {
        let runtime = runtime();
        let component = runtime.component();

        let render = || {
            component.render(|| {
                let history = use_undo_redo_state(Vec::<u32>::new);
                let fetch = use_async(
                    |n: u32| async move {
                        tokio::time::sleep(Duration::from_millis(1)).await;
                        if n == 0 {
                            Err(HookError::from("zero"))
                        } else {
                            Ok(n * 10)
                        }
                    },
                    AsyncOptions::new(),
                );
                (history, fetch)
            })
        };

        let (history, fetch) = render();
        let task = runtime.spawn(fetch.execute(4));
        let outcome = runtime.block_on(task).unwrap();
        assert_eq!(outcome, Ok(Some(40)));

        history.set_with(|items| {
            let mut items = items.clone();
            items.push(40);
            items
        });

        let (history, fetch) = render();
        assert_eq!(fetch.data(), Some(40));
        assert_eq!(history.get(), vec![40]);
        assert!(history.can_undo());
    }

    #[test]
    fn config_builder() {
        let config = RuntimeConfig::default()
            .with_tracing(false)
            .with_thread_name("worker");
        assert!(!config.init_tracing);
        assert_eq!(config.thread_name, "worker");
    }
}
