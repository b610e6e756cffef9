//! Service provider module for dependency resolution.
//!
//! This module contains the [`ServiceProvider`], the built-in backend of the
//! resolver contract, together with the scope handle shared by every backend.

use std::sync::Arc;

use crate::config::ProviderOptions;
use crate::descriptors::AnyArc;
use crate::error::{DiError, DiResult, ReleaseError};
use crate::internal::{Disposer, InitTracker, StackGuard};
use crate::key::Key;
use crate::lifetime::Lifetime;
use crate::observer::Observers;
use crate::registration::{Registration, Registry};
use crate::traits::ResolverCore;

mod node;
mod scope;

use node::{ScopeNode, ServiceScope, ROOT_SCOPE_ID};
pub(crate) use scope::log_release_failure;
pub use scope::{ResolverScope, ScopeBackend};

/// Hook count at which the root starts warning, and again at each multiple.
const ROOT_HOOK_WARN_INTERVAL: usize = 1024;

/// Service provider for resolving dependencies.
///
/// Resolves services according to their registered lifetimes:
/// - **Singleton**: built once, on first request, shared by every scope
/// - **Scoped**: built once per [`ResolverScope`], dropped when it is released
/// - **Transient**: built on every request
///
/// # Thread Safety
///
/// `ServiceProvider` is thread-safe and cheap to clone (it uses `Arc`
/// internally). Concurrent first requests for a singleton or a Scoped
/// service build it exactly once.
///
/// # Examples
///
/// ```
/// use ferrous_flow::{Configurator, Lifetime, Resolver, ServiceCollection};
/// use std::sync::Arc;
///
/// struct Database { url: String }
/// struct UserService { db: Arc<Database> }
///
/// let mut services = ServiceCollection::new();
/// services.add_instance(Arc::new(Database { url: "postgres://localhost".to_string() }));
/// services.add_factory::<UserService, _>(Lifetime::Transient, |r| {
///     Ok(Arc::new(UserService { db: r.resolve::<Database>()? }))
/// }).unwrap();
///
/// let provider = services.build();
/// let users = provider.resolve::<UserService>().unwrap();
/// assert_eq!(users.db.url, "postgres://localhost");
/// ```
#[derive(Clone)]
pub struct ServiceProvider {
    inner: Arc<ProviderInner>,
}

struct ProviderInner {
    registry: Registry,
    options: ProviderOptions,
    observers: Observers,
    root: Arc<ScopeNode>,
    in_progress: InitTracker,
}

impl ServiceProvider {
    pub(crate) fn new(registry: Registry, options: ProviderOptions, observers: Observers) -> Self {
        // With scope validation off the root doubles as an implicit scope and
        // needs slots of its own.
        let root_slots = if options.validate_scopes { 0 } else { registry.scoped_count };
        Self {
            inner: Arc::new(ProviderInner {
                root: ScopeNode::root(root_slots),
                registry,
                options,
                observers,
                in_progress: InitTracker::default(),
            }),
        }
    }

    pub fn options(&self) -> &ProviderOptions {
        &self.inner.options
    }

    pub(crate) fn observers(&self) -> &Observers {
        &self.inner.observers
    }

    /// Creates a new scope for Scoped services.
    ///
    /// Scoped services resolved within the returned scope are cached for its
    /// lifetime; different scopes never share a Scoped instance.
    ///
    /// ```
    /// use ferrous_flow::{Configurator, Lifetime, Resolver, ServiceCollection};
    /// use std::sync::Arc;
    /// use std::sync::atomic::{AtomicU32, Ordering};
    ///
    /// struct RequestContext { id: u32 }
    ///
    /// let counter = Arc::new(AtomicU32::new(0));
    /// let mut services = ServiceCollection::new();
    /// let c = counter.clone();
    /// services.add_factory::<RequestContext, _>(Lifetime::Scoped, move |_| {
    ///     Ok(Arc::new(RequestContext { id: c.fetch_add(1, Ordering::SeqCst) }))
    /// }).unwrap();
    ///
    /// let provider = services.build();
    /// let scope1 = provider.create_scope().unwrap();
    /// let scope2 = provider.create_scope().unwrap();
    ///
    /// let a = scope1.resolve::<RequestContext>().unwrap();
    /// let b = scope1.resolve::<RequestContext>().unwrap();
    /// let c = scope2.resolve::<RequestContext>().unwrap();
    ///
    /// assert!(Arc::ptr_eq(&a, &b));
    /// assert!(!Arc::ptr_eq(&a, &c));
    /// ```
    pub fn create_scope(&self) -> DiResult<ResolverScope> {
        self.scope_under(&self.inner.root)
    }

    /// Releases the root: every live scope, then singleton dispose hooks in
    /// LIFO order. The provider refuses further resolutions afterwards.
    pub fn dispose_all(&self) -> Result<(), ReleaseError> {
        let failures = self.inner.root.release();
        self.inner.observers.scope_released(self.inner.root.id, failures.len());
        if failures.is_empty() {
            Ok(())
        } else {
            Err(ReleaseError {
                scope: self.inner.root.id,
                failures,
            })
        }
    }

    /// Builds every registration once: singletons from the root, everything
    /// else inside a throwaway scope. Returns the first failure.
    pub(crate) fn validate(&self) -> DiResult<()> {
        let scope = ServiceScope::new(self.clone(), self.inner.root.child(self.inner.registry.scoped_count)?);
        let result = self.inner.registry.iter().try_for_each(|(key, registration)| {
            let built = match registration.lifetime {
                Lifetime::Singleton => {
                    self.activate(&self.inner.root, self as &dyn ResolverCore, key, registration)
                }
                Lifetime::Scoped | Lifetime::Transient => {
                    self.activate(&scope.node, &scope, key, registration)
                }
            };
            built.map(drop)
        });

        let failures = scope.node.release();
        if !failures.is_empty() {
            log_release_failure(&ReleaseError { scope: scope.node.id, failures });
        }
        result
    }

    pub(crate) fn scope_under(&self, parent: &Arc<ScopeNode>) -> DiResult<ResolverScope> {
        let node = parent.child(self.inner.registry.scoped_count)?;
        let parent_id = (!parent.is_root()).then_some(parent.id);
        self.inner.observers.scope_created(node.id, parent_id);
        Ok(ResolverScope::new(ServiceScope::new(self.clone(), node)))
    }

    pub(crate) fn resolve_in(&self, node: &Arc<ScopeNode>, ctx: &dyn ResolverCore, key: &Key) -> DiResult<AnyArc> {
        if node.is_released() {
            return Err(DiError::ScopeReleased(node.id));
        }
        self.inner.observers.observe(key, || {
            let registration = self
                .inner
                .registry
                .get(key)
                .ok_or(DiError::NotFound(key.display_name()))?;
            self.activate(node, ctx, key, registration)
        })
    }

    pub(crate) fn resolve_all_in(
        &self,
        node: &Arc<ScopeNode>,
        ctx: &dyn ResolverCore,
        key: &Key,
    ) -> DiResult<Vec<AnyArc>> {
        if node.is_released() {
            return Err(DiError::ScopeReleased(node.id));
        }
        self.inner.observers.observe(key, || {
            self.inner
                .registry
                .get_all(key)
                .iter()
                .map(|registration| self.activate(node, ctx, key, registration))
                .collect()
        })
    }

    /// Builds or fetches one registration. `ctx` is the resolver handed to
    /// Scoped and Transient constructors; singletons always see the provider
    /// so they can never capture a Scoped instance.
    fn activate(
        &self,
        node: &Arc<ScopeNode>,
        ctx: &dyn ResolverCore,
        key: &Key,
        registration: &Registration,
    ) -> DiResult<AnyArc> {
        let name = key.display_name();
        let _guard = StackGuard::enter(name, self.inner.options.max_depth)?;
        let in_progress = &self.inner.in_progress;

        match registration.lifetime {
            Lifetime::Singleton => match &registration.singleton {
                Some(cell) => in_progress.get_or_try_init(cell, (ROOT_SCOPE_ID, registration.id), name, || {
                    (registration.ctor)(self as &dyn ResolverCore)
                }),
                None => (registration.ctor)(self as &dyn ResolverCore),
            },
            Lifetime::Scoped => {
                if node.is_root() && self.inner.options.validate_scopes {
                    return Err(DiError::WrongLifetime(
                        "Cannot resolve scoped service from root provider",
                    ));
                }
                let slot = registration
                    .scoped_slot
                    .ok_or(DiError::WrongLifetime("Scoped registration without a slot"))?;
                node.scoped(slot, |cell| {
                    in_progress.get_or_try_init(cell, (node.id, registration.id), name, || (registration.ctor)(ctx))
                })
            }
            Lifetime::Transient => (registration.ctor)(ctx),
        }
    }
}

impl ResolverCore for ServiceProvider {
    fn resolve_any(&self, key: &Key) -> DiResult<AnyArc> {
        self.resolve_in(&self.inner.root, self, key)
    }

    fn resolve_all_any(&self, key: &Key) -> DiResult<Vec<AnyArc>> {
        self.resolve_all_in(&self.inner.root, self, key)
    }

    fn create_scope(&self) -> DiResult<ResolverScope> {
        ServiceProvider::create_scope(self)
    }

    fn push_disposer(&self, service: &'static str, disposer: Disposer) {
        self.inner.root.push_disposer(service, disposer);
        let held = self.inner.root.disposer_count();
        if held % ROOT_HOOK_WARN_INTERVAL == 0 && held > 0 {
            tracing::warn!(
                service,
                held,
                "root provider keeps dispose hooks until dispose_all, resolve transient disposables from a scope"
            );
        }
    }
}

impl Drop for ProviderInner {
    fn drop(&mut self) {
        if self.root.is_released() {
            return;
        }
        if self.root.has_disposers() {
            tracing::debug!("provider dropped without dispose_all, disposing singletons");
        }
        let failures = self.root.release();
        if !failures.is_empty() {
            log_release_failure(&ReleaseError {
                scope: self.root.id,
                failures,
            });
        }
    }
}

impl std::fmt::Debug for ServiceProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceProvider")
            .field("options", &self.inner.options)
            .field("released", &self.inner.root.is_released())
            .finish_non_exhaustive()
    }
}
