//! Resolver traits for service resolution.

use std::sync::Arc;

use crate::descriptors::AnyArc;
use crate::error::{DiError, DiResult};
use crate::internal::Disposer;
use crate::key::Key;
use crate::provider::ResolverScope;
use crate::traits::Dispose;

/// Core resolver trait for object-safe service resolution.
///
/// This is the contract a container backend implements. Factories and
/// middleware factories receive it as `&dyn ResolverCore`, so nothing above
/// this trait depends on a particular container.
///
/// Most callers use the [`Resolver`] extension instead, which adds typed
/// generic methods on top of this trait.
pub trait ResolverCore: Send + Sync {
    /// Resolves the last registration for `key`.
    ///
    /// Fails with [`DiError::NotFound`] when nothing is registered for the
    /// key. The returned value holds an `Arc<S>` for service `S`.
    fn resolve_any(&self, key: &Key) -> DiResult<AnyArc>;

    /// Resolves every registration for `key`, in registration order.
    ///
    /// An unregistered key yields an empty vector.
    fn resolve_all_any(&self, key: &Key) -> DiResult<Vec<AnyArc>>;

    /// Creates a nested resolution scope.
    ///
    /// Must not resolve any Scoped service eagerly.
    fn create_scope(&self) -> DiResult<ResolverScope>;

    /// Registers a teardown hook with whoever owns the instance being built:
    /// the scope for Scoped and Transient services, the provider for
    /// Singletons.
    fn push_disposer(&self, service: &'static str, disposer: Disposer);
}

fn downcast<T: ?Sized + Send + Sync + 'static>(any: AnyArc) -> DiResult<Arc<T>> {
    any.downcast::<Arc<T>>()
        .map(|boxed| (*boxed).clone())
        .map_err(|_| DiError::TypeMismatch(std::any::type_name::<T>()))
}

/// Typed resolution on top of [`ResolverCore`].
///
/// Implemented for every resolver, including `dyn ResolverCore`.
///
/// # Examples
///
/// ```
/// use ferrous_flow::{Configurator, Resolver, ServiceCollection};
/// use std::sync::Arc;
///
/// trait Logger: Send + Sync {
///     fn log(&self, msg: &str) -> String;
/// }
///
/// struct ConsoleLogger;
/// impl Logger for ConsoleLogger {
///     fn log(&self, msg: &str) -> String { format!("LOG: {}", msg) }
/// }
///
/// let mut services = ServiceCollection::new();
/// services.add_instance(Arc::new(42usize));
/// services.add_instance::<dyn Logger>(Arc::new(ConsoleLogger));
///
/// let provider = services.build();
/// assert_eq!(*provider.resolve::<usize>().unwrap(), 42);
/// let logger = provider.resolve::<dyn Logger>().unwrap();
/// assert_eq!(logger.log("ready"), "LOG: ready");
/// ```
pub trait Resolver: ResolverCore {
    /// Resolves a service, concrete type or trait object.
    fn resolve<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Arc<T>> {
        downcast(self.resolve_any(&Key::of::<T>())?)
    }

    /// Resolves a service, mapping an absent registration to `None`.
    ///
    /// Every other failure, including a missing dependency of `T`, is still
    /// returned as an error.
    fn try_resolve<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Option<Arc<T>>> {
        match self.resolve::<T>() {
            Ok(service) => Ok(Some(service)),
            Err(DiError::NotFound(name)) if name == std::any::type_name::<T>() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Resolves every registration of a service, in registration order.
    fn resolve_all<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Vec<Arc<T>>> {
        self.resolve_all_any(&Key::of::<T>())?
            .into_iter()
            .map(downcast::<T>)
            .collect()
    }

    /// Resolves a service, panicking if it cannot be resolved.
    ///
    /// # Panics
    ///
    /// Panics with the resolution error when the service is missing or fails
    /// to build. Prefer [`resolve`](Self::resolve) outside of tests and
    /// startup code.
    fn resolve_required<T: ?Sized + Send + Sync + 'static>(&self) -> Arc<T> {
        match self.resolve::<T>() {
            Ok(service) => service,
            Err(e) => panic!("failed to resolve {}: {}", std::any::type_name::<T>(), e),
        }
    }

    /// Ties the teardown of `service` to the instance owner.
    ///
    /// The hook lives as long as the resolver it is registered on. A
    /// Transient that registers a hook while resolved from the root provider
    /// adds one hook per resolution, held until `dispose_all` or the
    /// provider is dropped. Resolve such services from a scope instead.
    ///
    /// # Examples
    ///
    /// ```
    /// use ferrous_flow::{BoxError, Configurator, Dispose, Lifetime, Resolver, ServiceCollection};
    /// use std::sync::Arc;
    /// use std::sync::atomic::{AtomicBool, Ordering};
    ///
    /// struct Connection { closed: AtomicBool }
    /// impl Dispose for Connection {
    ///     fn dispose(&self) -> Result<(), BoxError> {
    ///         self.closed.store(true, Ordering::SeqCst);
    ///         Ok(())
    ///     }
    /// }
    ///
    /// let mut services = ServiceCollection::new();
    /// services.add_factory::<Connection, _>(Lifetime::Scoped, |r| {
    ///     let connection = Arc::new(Connection { closed: AtomicBool::new(false) });
    ///     r.register_disposer(connection.clone());
    ///     Ok(connection)
    /// }).unwrap();
    ///
    /// let provider = services.build();
    /// let scope = provider.create_scope().unwrap();
    /// let connection = scope.resolve::<Connection>().unwrap();
    /// scope.release().unwrap();
    /// assert!(connection.closed.load(Ordering::SeqCst));
    /// ```
    fn register_disposer<T: Dispose>(&self, service: Arc<T>) {
        self.push_disposer(
            std::any::type_name::<T>(),
            Box::new(move || service.dispose()),
        );
    }
}

impl<R: ResolverCore + ?Sized> Resolver for R {}
