//! Configurator traits for service registration.

use std::sync::Arc;

use crate::descriptors::{Construct, Implementation, ServiceDescriptor, Upcast};
use crate::error::DiResult;
use crate::key::Key;
use crate::lifetime::{IntoLifetime, Lifetime};
use crate::traits::ResolverCore;

/// Core configurator trait: the registration half of the backend contract.
///
/// A backend only has to record descriptors; every typed registration in
/// [`Configurator`] reduces to a single call of [`register`](Self::register).
/// Nothing is resolved at registration time.
pub trait ConfiguratorCore {
    /// Appends a registration. Registering a key again adds another entry;
    /// the last entry is the one `resolve` returns.
    fn register(&mut self, descriptor: ServiceDescriptor);
}

/// Typed registration on top of [`ConfiguratorCore`].
///
/// Methods that take a lifetime accept anything implementing
/// [`IntoLifetime`] and validate it on the spot, so a misconfigured lifetime
/// fails during startup:
///
/// ```
/// use ferrous_flow::{Configurator, DiError, ServiceCollection};
///
/// #[derive(Default)]
/// struct Cache;
/// impl ferrous_flow::Construct for Cache {
///     fn construct(_: &dyn ferrous_flow::ResolverCore) -> ferrous_flow::DiResult<Self> {
///         Ok(Cache)
///     }
/// }
///
/// let mut services = ServiceCollection::new();
/// assert!(services.add_self::<Cache>("scoped").is_ok());
/// assert!(matches!(
///     services.add_self::<Cache>("per-request"),
///     Err(DiError::InvalidLifetime(_))
/// ));
/// ```
pub trait Configurator: ConfiguratorCore {
    /// Runtime form: service key, implementation selector and lifetime.
    fn add_descriptor(
        &mut self,
        service: Key,
        implementation: Implementation,
        lifetime: impl IntoLifetime,
    ) -> DiResult<&mut Self> {
        let descriptor = ServiceDescriptor::new(service, implementation, lifetime)?;
        self.register(descriptor);
        Ok(self)
    }

    /// Registers implementation `I` as service `S`.
    fn add<S, I>(&mut self, lifetime: impl IntoLifetime) -> DiResult<&mut Self>
    where
        S: ?Sized + Send + Sync + 'static,
        I: Construct + Upcast<S>,
    {
        self.add_descriptor(Key::of::<S>(), Implementation::of::<S, I>(), lifetime)
    }

    /// Registers `S` as its own implementation.
    fn add_self<S: Construct>(&mut self, lifetime: impl IntoLifetime) -> DiResult<&mut Self> {
        self.add::<S, S>(lifetime)
    }

    /// Registers a fixed value. Always a singleton.
    fn add_instance<S: ?Sized + Send + Sync + 'static>(&mut self, instance: Arc<S>) -> &mut Self {
        self.register(ServiceDescriptor::singleton_instance(
            Key::of::<S>(),
            Implementation::instance(instance),
        ));
        self
    }

    /// Registers a factory invoked with the resolver of the resolving scope.
    fn add_factory<S, F>(&mut self, lifetime: impl IntoLifetime, factory: F) -> DiResult<&mut Self>
    where
        S: ?Sized + Send + Sync + 'static,
        F: Fn(&dyn ResolverCore) -> DiResult<Arc<S>> + Send + Sync + 'static,
    {
        self.add_descriptor(Key::of::<S>(), Implementation::factory(factory), lifetime)
    }

    fn add_singleton<T: Construct>(&mut self) -> &mut Self {
        register_self::<T, _>(self, Lifetime::Singleton);
        self
    }

    fn add_scoped<T: Construct>(&mut self) -> &mut Self {
        register_self::<T, _>(self, Lifetime::Scoped);
        self
    }

    fn add_transient<T: Construct>(&mut self) -> &mut Self {
        register_self::<T, _>(self, Lifetime::Transient);
        self
    }
}

impl<C: ConfiguratorCore + ?Sized> Configurator for C {}

/// Registers `T` as its own implementation with an already validated lifetime.
pub(crate) fn register_self<T, C>(configurator: &mut C, lifetime: Lifetime)
where
    T: Construct,
    C: ConfiguratorCore + ?Sized,
{
    configurator.register(ServiceDescriptor::with_lifetime(
        Key::of::<T>(),
        Implementation::of::<T, T>(),
        lifetime,
    ));
}
