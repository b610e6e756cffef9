//! Diagnostic observers for resolution and scope events.
//!
//! Observers are called synchronously on the resolving thread; keep them
//! cheap. [`TracingObserver`] forwards every event to `tracing`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::{DiError, DiResult};
use crate::key::Key;

/// Observer trait for dependency injection events.
///
/// All methods have empty default implementations.
///
/// # Examples
///
/// ```
/// use ferrous_flow::{DiObserver, Key, ServiceCollection};
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::time::Duration;
///
/// #[derive(Default)]
/// struct CountingObserver { resolved: AtomicUsize }
///
/// impl DiObserver for CountingObserver {
///     fn resolved(&self, _key: &Key, _duration: Duration) {
///         self.resolved.fetch_add(1, Ordering::Relaxed);
///     }
/// }
///
/// let mut services = ServiceCollection::new();
/// services.add_observer(Arc::new(CountingObserver::default()));
/// ```
pub trait DiObserver: Send + Sync {
    /// A resolution of `key` is starting.
    fn resolving(&self, _key: &Key) {}

    /// `key` resolved successfully.
    fn resolved(&self, _key: &Key, _duration: Duration) {}

    /// Resolving `key` failed.
    fn resolution_failed(&self, _key: &Key, _error: &DiError, _duration: Duration) {}

    /// A scope was created.
    fn scope_created(&self, _scope: u64, _parent: Option<u64>) {}

    /// A scope was released; `failures` dispose hooks failed.
    fn scope_released(&self, _scope: u64, _failures: usize) {}
}

/// Observer that emits `tracing` events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl DiObserver for TracingObserver {
    fn resolving(&self, key: &Key) {
        tracing::trace!(service = key.display_name(), "resolving");
    }

    fn resolved(&self, key: &Key, duration: Duration) {
        tracing::trace!(service = key.display_name(), ?duration, "resolved");
    }

    fn resolution_failed(&self, key: &Key, error: &DiError, duration: Duration) {
        tracing::debug!(service = key.display_name(), %error, ?duration, "resolution failed");
    }

    fn scope_created(&self, scope: u64, parent: Option<u64>) {
        tracing::debug!(scope, ?parent, "scope created");
    }

    fn scope_released(&self, scope: u64, failures: usize) {
        if failures == 0 {
            tracing::debug!(scope, "scope released");
        } else {
            tracing::warn!(scope, failures, "scope released with disposal failures");
        }
    }
}

/// Observer registry held by the provider.
#[derive(Default, Clone)]
pub(crate) struct Observers {
    observers: Vec<Arc<dyn DiObserver>>,
}

impl Observers {
    pub(crate) fn add(&mut self, observer: Arc<dyn DiObserver>) {
        self.observers.push(observer);
    }

    #[inline(always)]
    pub(crate) fn has_observers(&self) -> bool {
        !self.observers.is_empty()
    }

    /// Runs `resolve`, reporting start, success and failure around it.
    #[inline]
    pub(crate) fn observe<T>(&self, key: &Key, resolve: impl FnOnce() -> DiResult<T>) -> DiResult<T> {
        if !self.has_observers() {
            return resolve();
        }

        let start = Instant::now();
        for observer in &self.observers {
            observer.resolving(key);
        }
        let result = resolve();
        let duration = start.elapsed();
        for observer in &self.observers {
            match &result {
                Ok(_) => observer.resolved(key, duration),
                Err(error) => observer.resolution_failed(key, error, duration),
            }
        }
        result
    }

    pub(crate) fn scope_created(&self, scope: u64, parent: Option<u64>) {
        for observer in &self.observers {
            observer.scope_created(scope, parent);
        }
    }

    pub(crate) fn scope_released(&self, scope: u64, failures: usize) {
        for observer in &self.observers {
            observer.scope_released(scope, failures);
        }
    }
}
