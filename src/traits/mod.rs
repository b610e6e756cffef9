//! Core traits for the dependency injection contract.

mod configurator;
mod dispose;
mod resolver;

pub(crate) use configurator::register_self;
pub use configurator::{Configurator, ConfiguratorCore};
pub use dispose::Dispose;
pub use resolver::{Resolver, ResolverCore};
