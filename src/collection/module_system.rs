//! Service module system for modular registration.
//!
//! A module bundles registrations that belong together (a serializer with
//! its type catalogue, a handler set) so an application can install them
//! with one call, on any configurator.

use crate::error::DiResult;
use crate::traits::ConfiguratorCore;

/// A bundle of registrations.
///
/// # Example
///
/// ```rust
/// use ferrous_flow::{Configurator, ConfiguratorCore, ConfiguratorModuleExt, DiResult, Lifetime,
///     Resolver, ServiceCollection, ServiceModule};
/// use std::sync::Arc;
///
/// struct BrokerSettings { servers: String }
/// struct ProducerName(String);
///
/// struct BrokerModule { servers: &'static str }
///
/// impl ServiceModule for BrokerModule {
///     fn register_services(self, services: &mut dyn ConfiguratorCore) -> DiResult<()> {
///         services.add_instance(Arc::new(BrokerSettings { servers: self.servers.to_string() }));
///         services.add_factory::<ProducerName, _>(Lifetime::Singleton, |r| {
///             let settings = r.resolve::<BrokerSettings>()?;
///             Ok(Arc::new(ProducerName(format!("producer@{}", settings.servers))))
///         })?;
///         Ok(())
///     }
/// }
///
/// # fn main() -> DiResult<()> {
/// let mut services = ServiceCollection::new();
/// services.add_module(BrokerModule { servers: "localhost:9092" })?;
/// let provider = services.build();
/// assert_eq!(provider.resolve::<ProducerName>()?.0, "producer@localhost:9092");
/// # Ok(())
/// # }
/// ```
pub trait ServiceModule {
    /// Registers this module's services.
    fn register_services(self, services: &mut dyn ConfiguratorCore) -> DiResult<()>;
}

/// Module installation for every configurator.
pub trait ConfiguratorModuleExt: ConfiguratorCore {
    /// Installs `module`, failing with the first registration error it hits.
    fn add_module<M: ServiceModule>(&mut self, module: M) -> DiResult<&mut Self>
    where
        Self: Sized,
    {
        module.register_services(self)?;
        Ok(self)
    }
}

impl<C: ConfiguratorCore> ConfiguratorModuleExt for C {}
