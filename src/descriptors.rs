//! Registration records handed from configurators to backends.

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

use crate::error::{DiError, DiResult};
use crate::key::Key;
use crate::lifetime::{IntoLifetime, Lifetime};
use crate::traits::ResolverCore;

/// Type-erased service storage. Every service `S` (sized or not) is stored as
/// an `Arc<S>` wrapped in this outer `Arc`.
pub type AnyArc = Arc<dyn Any + Send + Sync>;

/// Type-erased constructor invoked with the resolver of the resolving scope.
pub type Ctor = Arc<dyn Fn(&dyn ResolverCore) -> DiResult<AnyArc> + Send + Sync>;

/// A type the container can build on its own.
///
/// This is what type-based registrations (`add::<S, I>`, `add_transient::<T>`)
/// need from the implementation: a constructor that may resolve its own
/// dependencies from the resolver it is given.
///
/// # Examples
///
/// ```rust
/// use ferrous_flow::{Construct, DiResult, Resolver, ResolverCore};
/// use std::sync::Arc;
///
/// struct Settings { topic: String }
/// struct Publisher { settings: Arc<Settings> }
///
/// impl Construct for Publisher {
///     fn construct(resolver: &dyn ResolverCore) -> DiResult<Self> {
///         Ok(Publisher { settings: resolver.resolve::<Settings>()? })
///     }
/// }
/// ```
pub trait Construct: Sized + Send + Sync + 'static {
    fn construct(resolver: &dyn ResolverCore) -> DiResult<Self>;
}

/// Conversion of an implementation into the service it is registered as.
///
/// Every type upcasts to itself. Registering an implementation under a trait
/// object needs a one-line impl:
///
/// ```rust
/// use ferrous_flow::Upcast;
/// use std::sync::Arc;
///
/// trait Greeter: Send + Sync { fn greet(&self) -> String; }
/// struct English;
/// impl Greeter for English { fn greet(&self) -> String { "hello".into() } }
///
/// impl Upcast<dyn Greeter> for English {
///     fn upcast(self: Arc<Self>) -> Arc<dyn Greeter> { self }
/// }
/// ```
pub trait Upcast<S: ?Sized>: Send + Sync + 'static {
    fn upcast(self: Arc<Self>) -> Arc<S>;
}

impl<T: Send + Sync + 'static> Upcast<T> for T {
    fn upcast(self: Arc<Self>) -> Arc<T> {
        self
    }
}

pub(crate) fn erase<S: ?Sized + Send + Sync + 'static>(service: Arc<S>) -> AnyArc {
    Arc::new(service)
}

/// How a registered service gets its instance.
///
/// Every variant records the service type it produces, so a descriptor can
/// reject an implementation built for a different key.
#[derive(Clone)]
pub enum Implementation {
    /// A concrete implementation type built through [`Construct`]
    Type { service: TypeId, name: &'static str, ctor: Ctor },
    /// A fixed, already-built value
    Instance { service: TypeId, value: AnyArc },
    /// A user-supplied factory of a resolver
    Factory { service: TypeId, ctor: Ctor },
}

impl Implementation {
    /// Implementation type `I` registered as service `S`.
    pub fn of<S, I>() -> Self
    where
        S: ?Sized + Send + Sync + 'static,
        I: Construct + Upcast<S>,
    {
        Implementation::Type {
            service: TypeId::of::<S>(),
            name: std::any::type_name::<I>(),
            ctor: Arc::new(|resolver: &dyn ResolverCore| {
                let implementation = Arc::new(I::construct(resolver)?);
                Ok(erase::<S>(<I as Upcast<S>>::upcast(implementation)))
            }),
        }
    }

    pub fn instance<S: ?Sized + Send + Sync + 'static>(instance: Arc<S>) -> Self {
        Implementation::Instance {
            service: TypeId::of::<S>(),
            value: erase(instance),
        }
    }

    pub fn factory<S, F>(factory: F) -> Self
    where
        S: ?Sized + Send + Sync + 'static,
        F: Fn(&dyn ResolverCore) -> DiResult<Arc<S>> + Send + Sync + 'static,
    {
        Implementation::Factory {
            service: TypeId::of::<S>(),
            ctor: Arc::new(move |resolver: &dyn ResolverCore| factory(resolver).map(erase::<S>)),
        }
    }

    /// Service type the implementation produces.
    pub fn service_type_id(&self) -> TypeId {
        match self {
            Implementation::Type { service, .. }
            | Implementation::Instance { service, .. }
            | Implementation::Factory { service, .. } => *service,
        }
    }

    /// Name of the implementation type, when it is known.
    pub fn type_name(&self) -> Option<&'static str> {
        match self {
            Implementation::Type { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Constructor the backend invokes to produce an instance.
    pub fn ctor(&self) -> Ctor {
        match self {
            Implementation::Type { ctor, .. } | Implementation::Factory { ctor, .. } => ctor.clone(),
            Implementation::Instance { value, .. } => {
                let value = value.clone();
                Arc::new(move |_: &dyn ResolverCore| Ok(value.clone()))
            }
        }
    }
}

impl fmt::Debug for Implementation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Implementation::Type { name, .. } => write!(f, "Type({})", name),
            Implementation::Instance { .. } => f.write_str("Instance"),
            Implementation::Factory { .. } => f.write_str("Factory"),
        }
    }
}

/// One recorded registration: service key, implementation selector and
/// lifetime. Immutable once built.
///
/// # Examples
///
/// ```rust
/// use ferrous_flow::{DiError, Implementation, Key, Lifetime, ServiceDescriptor};
/// use std::sync::Arc;
///
/// let descriptor = ServiceDescriptor::new(
///     Key::of::<u32>(),
///     Implementation::instance(Arc::new(7u32)),
///     "singleton",
/// ).unwrap();
/// assert_eq!(descriptor.lifetime(), Lifetime::Singleton);
///
/// let invalid = ServiceDescriptor::new(
///     Key::of::<u32>(),
///     Implementation::instance(Arc::new(7u32)),
///     "per-request",
/// );
/// assert!(matches!(invalid, Err(DiError::InvalidLifetime(_))));
/// ```
#[derive(Clone, Debug)]
pub struct ServiceDescriptor {
    key: Key,
    implementation: Implementation,
    lifetime: Lifetime,
}

impl ServiceDescriptor {
    /// Validates and records a registration.
    ///
    /// Fails with [`DiError::InvalidLifetime`] for an unrecognized lifetime.
    /// Fails with [`DiError::Conflict`] when the implementation produces a
    /// different service than `key`, or when a fixed instance is given any
    /// lifetime other than Singleton.
    pub fn new(
        key: Key,
        implementation: Implementation,
        lifetime: impl IntoLifetime,
    ) -> DiResult<Self> {
        let lifetime = lifetime.into_lifetime()?;
        if implementation.service_type_id() != key.type_id() {
            return Err(DiError::Conflict {
                service: key.display_name(),
                reason: "the implementation is registered for a different service type",
            });
        }
        if matches!(implementation, Implementation::Instance { .. }) && lifetime != Lifetime::Singleton {
            return Err(DiError::Conflict {
                service: key.display_name(),
                reason: "a fixed instance can only be registered as a singleton",
            });
        }
        Ok(Self { key, implementation, lifetime })
    }

    pub(crate) fn singleton_instance(key: Key, implementation: Implementation) -> Self {
        Self { key, implementation, lifetime: Lifetime::Singleton }
    }

    pub(crate) fn with_lifetime(key: Key, implementation: Implementation, lifetime: Lifetime) -> Self {
        Self { key, implementation, lifetime }
    }

    pub fn key(&self) -> &Key {
        &self.key
    }

    pub fn implementation(&self) -> &Implementation {
        &self.implementation
    }

    pub fn lifetime(&self) -> Lifetime {
        self.lifetime
    }

    /// Get the service type name
    pub fn type_name(&self) -> &'static str {
        self.key.display_name()
    }
}
