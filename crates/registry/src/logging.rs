//! Explicit logging handle.
//!
//! Components never touch the global `tracing` dispatcher. Each one is handed
//! a [`Logger`] at construction and emits its events inside
//! [`Logger::in_scope`], so the entry point alone decides where diagnostics go.

use std::fmt;

use tracing::Dispatch;
use tracing_subscriber::EnvFilter;

#[derive(Clone)]
pub struct Logger {
    dispatch: Dispatch,
}

impl Logger {
    pub fn new(dispatch: Dispatch) -> Self {
        Self { dispatch }
    }

    /// A logger that drops every event.
    pub fn disabled() -> Self {
        Self::new(Dispatch::none())
    }

    /// A human readable logger writing to stderr.
    ///
    /// `RUST_LOG` takes precedence over `default_directives` when set.
    pub fn stderr(default_directives: &str) -> Self {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_directives));

        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .finish();

        Self::new(Dispatch::new(subscriber))
    }

    /// Run `f` with this logger as the current dispatcher.
    pub fn in_scope<T>(&self, f: impl FnOnce() -> T) -> T {
        tracing::dispatcher::with_default(&self.dispatch, f)
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::disabled()
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger").finish_non_exhaustive()
    }
}
