//! Service collection module for registration.
//!
//! [`ServiceCollection`] is the configurator of the built-in backend: it
//! records descriptors and turns them into a [`ServiceProvider`].

use std::sync::Arc;

use crate::config::ProviderOptions;
use crate::descriptors::ServiceDescriptor;
use crate::error::DiResult;
use crate::key::Key;
use crate::observer::{DiObserver, Observers};
use crate::provider::ServiceProvider;
use crate::registration::Registry;
use crate::traits::ConfiguratorCore;

pub mod module_system;

pub use module_system::{ConfiguratorModuleExt, ServiceModule};

/// Collection of service registrations.
///
/// Registration never resolves anything. Typed registration methods come
/// from the [`Configurator`](crate::Configurator) extension trait.
///
/// # Examples
///
/// ```
/// use ferrous_flow::{Configurator, Lifetime, Resolver, ServiceCollection};
/// use std::sync::Arc;
///
/// let mut services = ServiceCollection::new();
/// services.add_instance(Arc::new(42u32));
/// services
///     .add_factory::<String, _>(Lifetime::Transient, |r| {
///         Ok(Arc::new(format!("value = {}", r.resolve::<u32>()?)))
///     })
///     .unwrap();
///
/// let provider = services.build();
/// assert_eq!(&*provider.resolve::<String>().unwrap(), "value = 42");
/// ```
#[derive(Default)]
pub struct ServiceCollection {
    descriptors: Vec<ServiceDescriptor>,
    observers: Observers,
}

impl ServiceCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded registrations, in registration order.
    pub fn descriptors(&self) -> &[ServiceDescriptor] {
        &self.descriptors
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Whether anything is registered for service `T`.
    pub fn contains<T: ?Sized + 'static>(&self) -> bool {
        let key = Key::of::<T>();
        self.descriptors.iter().any(|d| *d.key() == key)
    }

    /// Adds a diagnostic observer to the provider built from this collection.
    pub fn add_observer(&mut self, observer: Arc<dyn DiObserver>) -> &mut Self {
        self.observers.add(observer);
        self
    }

    /// Builds a provider with default options.
    pub fn build(self) -> ServiceProvider {
        self.build_with(ProviderOptions::default())
    }

    /// Builds a provider without validating registrations, whatever
    /// `validate_on_build` says.
    pub fn build_with(self, options: ProviderOptions) -> ServiceProvider {
        let registry = Registry::finalize(&self.descriptors);
        tracing::debug!(
            registrations = self.descriptors.len(),
            scoped = registry.scoped_count,
            "building service provider"
        );
        ServiceProvider::new(registry, options, self.observers)
    }

    /// Builds a provider with default options, validating if requested.
    pub fn try_build(self) -> DiResult<ServiceProvider> {
        self.try_build_with(ProviderOptions::default())
    }

    /// Builds a provider and, when `validate_on_build` is set, constructs
    /// every registration once so missing dependencies, cycles and lifetime
    /// violations surface here instead of on the first message.
    ///
    /// ```
    /// use ferrous_flow::{Configurator, DiError, Lifetime, ProviderOptions, Resolver, ServiceCollection};
    /// use std::sync::Arc;
    ///
    /// struct Missing;
    /// struct NeedsMissing;
    ///
    /// let mut services = ServiceCollection::new();
    /// services.add_factory::<NeedsMissing, _>(Lifetime::Singleton, |r| {
    ///     r.resolve::<Missing>()?;
    ///     Ok(Arc::new(NeedsMissing))
    /// }).unwrap();
    ///
    /// let options = ProviderOptions::new().validate_on_build(true);
    /// assert!(matches!(services.try_build_with(options), Err(DiError::NotFound(_))));
    /// ```
    pub fn try_build_with(self, options: ProviderOptions) -> DiResult<ServiceProvider> {
        let validate = options.validate_on_build;
        let provider = self.build_with(options);
        if validate {
            provider.validate()?;
        }
        Ok(provider)
    }
}

impl ConfiguratorCore for ServiceCollection {
    fn register(&mut self, descriptor: ServiceDescriptor) {
        tracing::trace!(
            service = descriptor.key().display_name(),
            implementation = ?descriptor.implementation(),
            lifetime = %descriptor.lifetime(),
            "registering service"
        );
        self.descriptors.push(descriptor);
    }
}

impl std::fmt::Debug for ServiceCollection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceCollection")
            .field("descriptors", &self.descriptors)
            .finish_non_exhaustive()
    }
}
