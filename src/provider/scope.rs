//! Resolver scopes: the unit of Scoped lifetime handed to the transport.

use std::any::Any;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use once_cell::sync::OnceCell;
use parking_lot::Mutex;

use crate::descriptors::AnyArc;
use crate::error::{DiError, DiResult, DisposalError, ReleaseError};
use crate::internal::Disposer;
use crate::key::Key;
use crate::traits::ResolverCore;

/// Backend half of a scope.
///
/// A container adapter implements this over its own nested-scope mechanism.
/// `release` must tear down only this scope's Scoped instances (children
/// first) and may be called more than once.
pub trait ScopeBackend: Send + Sync {
    /// Identifier used in logs and errors.
    fn id(&self) -> u64;

    /// Resolver bound to this scope.
    fn resolver(&self) -> &dyn ResolverCore;

    /// Tears the scope down, returning every dispose hook that failed.
    fn release(&self) -> Vec<DisposalError>;

    /// Whether the scope has been released, by its owner or by a parent.
    fn is_released(&self) -> bool;
}

/// Scoped acquisition-and-release handle.
///
/// Resolves through its backend while alive. Releasing it (explicitly, via
/// [`using`](Self::using), or by dropping it) tears down every Scoped
/// instance created through it and every chain materialized for it. Release
/// is idempotent.
///
/// # Examples
///
/// ```
/// use ferrous_flow::{Configurator, DiError, Lifetime, Resolver, ServiceCollection};
/// use std::sync::Arc;
///
/// struct RequestId(u32);
///
/// let mut services = ServiceCollection::new();
/// services.add_factory::<RequestId, _>(Lifetime::Scoped, |_| Ok(Arc::new(RequestId(7)))).unwrap();
/// let provider = services.build();
///
/// let scope = provider.create_scope().unwrap();
/// assert_eq!(scope.resolve::<RequestId>().unwrap().0, 7);
///
/// scope.release().unwrap();
/// scope.release().unwrap(); // second release is a no-op
/// assert!(matches!(scope.resolve::<RequestId>(), Err(DiError::ScopeReleased(_))));
/// ```
pub struct ResolverScope {
    backend: Box<dyn ScopeBackend>,
    locals: Mutex<HashMap<u64, Arc<OnceCell<AnyArc>>>>,
    released: AtomicBool,
}

impl ResolverScope {
    pub fn new(backend: impl ScopeBackend + 'static) -> Self {
        Self {
            backend: Box::new(backend),
            locals: Mutex::new(HashMap::new()),
            released: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> u64 {
        self.backend.id()
    }

    /// The resolver owned by this scope.
    pub fn resolver(&self) -> &dyn ResolverCore {
        self.backend.resolver()
    }

    /// Creates a nested scope. Its Scoped instances are distinct from this
    /// scope's, and it is released no later than this scope.
    pub fn create_scope(&self) -> DiResult<ResolverScope> {
        self.ensure_live()?;
        self.resolver().create_scope()
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire) || self.backend.is_released()
    }

    /// Releases the scope: cached chains are dropped, child scopes are
    /// released, then this scope's dispose hooks run in LIFO order and its
    /// Scoped instances are dropped.
    ///
    /// Calling it again is a no-op returning `Ok(())`.
    pub fn release(&self) -> Result<(), ReleaseError> {
        if self.released.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        let locals = std::mem::take(&mut *self.locals.lock());
        drop(locals);

        let failures = self.backend.release();
        if failures.is_empty() {
            Ok(())
        } else {
            Err(ReleaseError { scope: self.id(), failures })
        }
    }

    /// Runs `f` with this scope and releases it afterwards, whether `f`
    /// succeeded or not. Disposal failures are logged, the result of `f` is
    /// returned unchanged.
    pub fn using<R, E>(self, f: impl FnOnce(&ResolverScope) -> Result<R, E>) -> Result<R, E> {
        let result = f(&self);
        if let Err(error) = self.release() {
            log_release_failure(&error);
        }
        result
    }

    /// Per-scope value keyed by `id`, initialized at most once for the
    /// scope's lifetime even under concurrent first use. A failed
    /// initialization is not cached.
    pub(crate) fn local<T, F>(&self, id: u64, init: F) -> DiResult<Arc<T>>
    where
        T: Send + Sync + 'static,
        F: FnOnce(&dyn ResolverCore) -> DiResult<Arc<T>>,
    {
        if self.is_released() {
            return Err(DiError::ScopeReleased(self.id()));
        }

        let cell = self.locals.lock().entry(id).or_default().clone();
        let value = cell.get_or_try_init(|| init(self.resolver()).map(|v| v as AnyArc))?;
        value
            .clone()
            .downcast::<T>()
            .map_err(|_: Arc<dyn Any + Send + Sync>| DiError::TypeMismatch(std::any::type_name::<T>()))
    }

    fn ensure_live(&self) -> DiResult<()> {
        if self.is_released() {
            Err(DiError::ScopeReleased(self.id()))
        } else {
            Ok(())
        }
    }
}

impl ResolverCore for ResolverScope {
    fn resolve_any(&self, key: &Key) -> DiResult<AnyArc> {
        self.ensure_live()?;
        self.resolver().resolve_any(key)
    }

    fn resolve_all_any(&self, key: &Key) -> DiResult<Vec<AnyArc>> {
        self.ensure_live()?;
        self.resolver().resolve_all_any(key)
    }

    fn create_scope(&self) -> DiResult<ResolverScope> {
        ResolverScope::create_scope(self)
    }

    fn push_disposer(&self, service: &'static str, disposer: Disposer) {
        self.resolver().push_disposer(service, disposer);
    }
}

impl Drop for ResolverScope {
    fn drop(&mut self) {
        if let Err(error) = self.release() {
            log_release_failure(&error);
        }
    }
}

impl std::fmt::Debug for ResolverScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolverScope")
            .field("id", &self.id())
            .field("released", &self.is_released())
            .finish()
    }
}

pub(crate) fn log_release_failure(error: &ReleaseError) {
    for failure in &error.failures {
        tracing::warn!(
            scope = error.scope,
            service = failure.service,
            error = %failure.source,
            "dispose hook failed during scope release"
        );
    }
}
