//! Ordered best-effort lookups.
//!
//! A `FallbackChain` evaluates attempts in order and stops at the first one
//! that yields a value. Failed attempts are logged with their step name
//! instead of being dropped, so a degraded result can be traced back to the
//! step that failed.

use log::{debug, warn};
use std::fmt::Display;

type Attempt<'a, T, E> = Box<dyn FnOnce() -> Result<Option<T>, E> + 'a>;

/// Ordered list of `(step, attempt)` pairs.
pub struct FallbackChain<'a, T, E> {
    label: &'static str,
    steps: Vec<(&'static str, Attempt<'a, T, E>)>,
}

impl<'a, T, E: Display> FallbackChain<'a, T, E> {
    /// Creates an empty chain; `label` names the chain in log events.
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            steps: Vec::new(),
        }
    }

    /// Appends one attempt.
    ///
    /// `Ok(None)` means "nothing here, try the next step"; `Err` is logged
    /// and also moves on.
    pub fn then(
        mut self,
        step: &'static str,
        attempt: impl FnOnce() -> Result<Option<T>, E> + 'a,
    ) -> Self {
        self.steps.push((step, Box::new(attempt)));
        self
    }

    /// Runs the steps and returns the first value found.
    pub fn resolve(self) -> Option<T> {
        let label = self.label;
        for (step, attempt) in self.steps {
            match attempt() {
                Ok(Some(value)) => {
                    debug!("event=fallback module=access status=ok chain={label} step={step}");
                    return Some(value);
                }
                Ok(None) => {
                    debug!("event=fallback module=access status=skip chain={label} step={step}");
                }
                Err(err) => {
                    warn!(
                        "event=fallback module=access status=error chain={label} step={step} error={err}"
                    );
                }
            }
        }
        None
    }

    /// Like [`FallbackChain::resolve`] with a last-resort value.
    pub fn resolve_or(self, default: T) -> T {
        self.resolve().unwrap_or(default)
    }

    /// Like [`FallbackChain::resolve`] with a lazily built last resort.
    pub fn resolve_or_else(self, default: impl FnOnce() -> T) -> T {
        self.resolve().unwrap_or_else(default)
    }
}
