//! Declaration of middleware lists.

use std::marker::PhantomData;
use std::sync::Arc;

use crate::compressor::{CompressorConsumerMiddleware, CompressorProducerMiddleware, MessageCompressor};
use crate::descriptors::Construct;
use crate::error::DiResult;
use crate::lifetime::IntoLifetime;
use crate::middleware::{Middleware, MiddlewareConfiguration, MiddlewareFactory};
use crate::serializer::{
    MessageSerializer, MessageTypeResolver, SerializerConsumerMiddleware, SerializerProducerMiddleware,
};
use crate::traits::{Configurator, ConfiguratorCore, Resolver, ResolverCore};

mod sealed {
    pub trait Sealed {}
    impl Sealed for super::Producer {}
    impl Sealed for super::Consumer {}
}

/// Which way messages flow through a chain.
///
/// Selects the concrete serializer and compressor steps a builder appends.
pub trait Direction: sealed::Sealed + Send + Sync + 'static {
    const NAME: &'static str;

    fn serializer_middleware(
        serializer: Arc<dyn MessageSerializer>,
        type_resolver: Arc<dyn MessageTypeResolver>,
    ) -> Arc<dyn Middleware>;

    fn compressor_middleware(compressor: Arc<dyn MessageCompressor>) -> Arc<dyn Middleware>;
}

/// Outbound chains: application object to wire bytes.
#[derive(Debug)]
pub enum Producer {}

/// Inbound chains: wire bytes to application object.
#[derive(Debug)]
pub enum Consumer {}

impl Direction for Producer {
    const NAME: &'static str = "producer";

    fn serializer_middleware(
        serializer: Arc<dyn MessageSerializer>,
        type_resolver: Arc<dyn MessageTypeResolver>,
    ) -> Arc<dyn Middleware> {
        Arc::new(SerializerProducerMiddleware::new(serializer, type_resolver))
    }

    fn compressor_middleware(compressor: Arc<dyn MessageCompressor>) -> Arc<dyn Middleware> {
        Arc::new(CompressorProducerMiddleware::new(compressor))
    }
}

impl Direction for Consumer {
    const NAME: &'static str = "consumer";

    fn serializer_middleware(
        serializer: Arc<dyn MessageSerializer>,
        type_resolver: Arc<dyn MessageTypeResolver>,
    ) -> Arc<dyn Middleware> {
        Arc::new(SerializerConsumerMiddleware::new(serializer, type_resolver))
    }

    fn compressor_middleware(compressor: Arc<dyn MessageCompressor>) -> Arc<dyn Middleware> {
        Arc::new(CompressorConsumerMiddleware::new(compressor))
    }
}

/// Builder of an ordered middleware list.
///
/// Borrows the dependency configurator so typed helpers can register the
/// types they later resolve. Nothing is resolved until the resulting
/// [`MiddlewareConfiguration`] is materialized.
///
/// # Examples
///
/// ```
/// use ferrous_flow::{Lifetime, MessageContext, Middleware, MiddlewareBuilder, MiddlewareError,
///     Construct, DiResult, ResolverCore, ServiceCollection};
/// use std::sync::Arc;
///
/// struct Audit;
/// impl Construct for Audit {
///     fn construct(_: &dyn ResolverCore) -> DiResult<Self> { Ok(Audit) }
/// }
/// impl Middleware for Audit {
///     fn invoke(&self, ctx: &mut MessageContext) -> Result<(), MiddlewareError> {
///         ctx.headers_mut().add("audited", "yes");
///         Ok(())
///     }
/// }
///
/// let mut services = ServiceCollection::new();
/// let mut middlewares = MiddlewareBuilder::producer(&mut services);
/// middlewares.add_middleware::<Audit>(Lifetime::Scoped).unwrap();
/// let configuration = middlewares.build();
///
/// let provider = services.build();
/// let scope = provider.create_scope().unwrap();
/// let chain = configuration.chain_for(&scope).unwrap();
///
/// let mut ctx = MessageContext::outbound("audit", ());
/// chain.execute(&mut ctx).unwrap();
/// assert_eq!(ctx.headers().get_str("audited"), Some("yes"));
/// ```
pub struct MiddlewareBuilder<'a, D: Direction> {
    configurator: &'a mut dyn ConfiguratorCore,
    factories: Vec<MiddlewareFactory>,
    _direction: PhantomData<D>,
}

impl<'a> MiddlewareBuilder<'a, Producer> {
    pub fn producer(configurator: &'a mut dyn ConfiguratorCore) -> Self {
        Self::new(configurator)
    }
}

impl<'a> MiddlewareBuilder<'a, Consumer> {
    pub fn consumer(configurator: &'a mut dyn ConfiguratorCore) -> Self {
        Self::new(configurator)
    }
}

impl<'a, D: Direction> MiddlewareBuilder<'a, D> {
    pub fn new(configurator: &'a mut dyn ConfiguratorCore) -> Self {
        Self {
            configurator,
            factories: Vec::new(),
            _direction: PhantomData,
        }
    }

    /// The configurator this builder registers helper types with.
    pub fn dependency_configurator(&mut self) -> &mut dyn ConfiguratorCore {
        &mut *self.configurator
    }

    /// Appends a middleware factory.
    pub fn add<F>(&mut self, factory: F) -> &mut Self
    where
        F: Fn(&dyn ResolverCore) -> DiResult<Arc<dyn Middleware>> + Send + Sync + 'static,
    {
        self.factories.push(Arc::new(factory));
        self
    }

    /// Registers `M` with `lifetime` and appends a factory resolving it.
    pub fn add_middleware<M>(&mut self, lifetime: impl IntoLifetime) -> DiResult<&mut Self>
    where
        M: Middleware + Construct,
    {
        self.configurator.add_self::<M>(lifetime)?;
        Ok(self.add(|resolver| Ok(resolver.resolve::<M>()? as Arc<dyn Middleware>)))
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Finishes the declaration.
    pub fn build(self) -> MiddlewareConfiguration {
        tracing::debug!(direction = D::NAME, middlewares = self.factories.len(), "middleware chain declared");
        MiddlewareConfiguration::new(D::NAME, self.factories)
    }
}
