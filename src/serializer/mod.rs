//! Serializer middleware.
//!
//! A serializer step is always a pair: a [`MessageSerializer`] that converts
//! between objects and bytes, and a [`MessageTypeResolver`] that decides
//! which type an inbound payload becomes (and stamps outbound messages so
//! the other side can tell).

use std::any::Any;
use std::sync::Arc;

use crate::descriptors::Construct;
use crate::error::{DiResult, MiddlewareError};
use crate::middleware::{Direction, MessageContext, MessageType, MessageValue, Middleware, MiddlewareBuilder};
use crate::traits::{Configurator, Resolver, ResolverCore};

#[cfg(feature = "json")]
mod json;
mod resolver;

#[cfg(feature = "json")]
pub use json::{JsonMessageSerializer, JsonTypes};
pub use resolver::{DefaultMessageTypeResolver, SingleMessageTypeResolver, MESSAGE_TYPE_HEADER};

/// Converts message objects to bytes and back.
pub trait MessageSerializer: Send + Sync {
    fn serialize(
        &self,
        message: &(dyn Any + Send + Sync),
        message_type: &MessageType,
    ) -> Result<Vec<u8>, MiddlewareError>;

    fn deserialize(
        &self,
        bytes: &[u8],
        message_type: &MessageType,
    ) -> Result<Arc<dyn Any + Send + Sync>, MiddlewareError>;
}

/// Decides the payload type of inbound messages and marks outbound ones.
pub trait MessageTypeResolver: Send + Sync {
    fn on_consume(&self, ctx: &MessageContext) -> Result<MessageType, MiddlewareError>;

    fn on_produce(&self, ctx: &mut MessageContext) -> Result<(), MiddlewareError>;
}

/// Outbound serializer step: stamps the type, then object to bytes.
pub struct SerializerProducerMiddleware {
    serializer: Arc<dyn MessageSerializer>,
    type_resolver: Arc<dyn MessageTypeResolver>,
}

impl SerializerProducerMiddleware {
    pub fn new(serializer: Arc<dyn MessageSerializer>, type_resolver: Arc<dyn MessageTypeResolver>) -> Self {
        Self { serializer, type_resolver }
    }
}

impl Middleware for SerializerProducerMiddleware {
    fn invoke(&self, ctx: &mut MessageContext) -> Result<(), MiddlewareError> {
        self.type_resolver.on_produce(ctx)?;

        let bytes = match ctx.value() {
            MessageValue::Object { message_type, value } => {
                self.serializer.serialize(&**value, message_type)?
            }
            _ => {
                return Err(MiddlewareError::UnexpectedPayload {
                    middleware: self.name(),
                    expected: "object",
                })
            }
        };
        ctx.set_value(MessageValue::Bytes(bytes));
        Ok(())
    }
}

/// Inbound serializer step: resolves the type, then bytes to object.
pub struct SerializerConsumerMiddleware {
    serializer: Arc<dyn MessageSerializer>,
    type_resolver: Arc<dyn MessageTypeResolver>,
}

impl SerializerConsumerMiddleware {
    pub fn new(serializer: Arc<dyn MessageSerializer>, type_resolver: Arc<dyn MessageTypeResolver>) -> Self {
        Self { serializer, type_resolver }
    }
}

impl Middleware for SerializerConsumerMiddleware {
    fn invoke(&self, ctx: &mut MessageContext) -> Result<(), MiddlewareError> {
        let message_type = self.type_resolver.on_consume(ctx)?;
        let bytes = ctx.bytes().ok_or(MiddlewareError::UnexpectedPayload {
            middleware: self.name(),
            expected: "bytes",
        })?;
        let value = self.serializer.deserialize(bytes, &message_type)?;
        ctx.set_value(MessageValue::Object { message_type, value });
        Ok(())
    }
}

/// Serializer registration on middleware builders.
///
/// # Examples
///
/// ```
/// use ferrous_flow::{Construct, DiResult, MessageContext, MessageSerializer, MessageType,
///     MiddlewareBuilder, MiddlewareError, ResolverCore, ServiceCollection};
/// use std::any::Any;
/// use std::sync::Arc;
///
/// struct Utf8;
/// impl Construct for Utf8 {
///     fn construct(_: &dyn ResolverCore) -> DiResult<Self> { Ok(Utf8) }
/// }
/// impl MessageSerializer for Utf8 {
///     fn serialize(&self, m: &(dyn Any + Send + Sync), _: &MessageType) -> Result<Vec<u8>, MiddlewareError> {
///         Ok(m.downcast_ref::<String>().map(|s| s.clone().into_bytes()).unwrap_or_default())
///     }
///     fn deserialize(&self, b: &[u8], _: &MessageType) -> Result<Arc<dyn Any + Send + Sync>, MiddlewareError> {
///         Ok(Arc::new(String::from_utf8_lossy(b).into_owned()))
///     }
/// }
///
/// let mut services = ServiceCollection::new();
/// let mut consumer = MiddlewareBuilder::consumer(&mut services);
/// consumer.add_single_type_serializer::<String, Utf8>();
/// let configuration = consumer.build();
///
/// let provider = services.build();
/// let scope = provider.create_scope().unwrap();
/// let mut ctx = MessageContext::inbound("greetings", "hello");
/// configuration.chain_for(&scope).unwrap().execute(&mut ctx).unwrap();
/// assert_eq!(ctx.message::<String>().map(String::as_str), Some("hello"));
/// ```
impl<'a, D: Direction> MiddlewareBuilder<'a, D> {
    /// General form: both halves come from factories, nothing is registered.
    pub fn add_serializer_with<S, R, SF, RF>(&mut self, serializer_factory: SF, resolver_factory: RF) -> &mut Self
    where
        S: MessageSerializer + 'static,
        R: MessageTypeResolver + 'static,
        SF: Fn(&dyn ResolverCore) -> DiResult<Arc<S>> + Send + Sync + 'static,
        RF: Fn(&dyn ResolverCore) -> DiResult<Arc<R>> + Send + Sync + 'static,
    {
        self.add(move |resolver| {
            let serializer: Arc<dyn MessageSerializer> = serializer_factory(resolver)?;
            let type_resolver: Arc<dyn MessageTypeResolver> = resolver_factory(resolver)?;
            Ok(D::serializer_middleware(serializer, type_resolver))
        })
    }

    /// Serializer from a factory, paired with [`DefaultMessageTypeResolver`].
    pub fn add_serializer_factory<S, SF>(&mut self, serializer_factory: SF) -> &mut Self
    where
        S: MessageSerializer + 'static,
        SF: Fn(&dyn ResolverCore) -> DiResult<Arc<S>> + Send + Sync + 'static,
    {
        self.add_serializer_with(serializer_factory, |_| Ok(Arc::new(DefaultMessageTypeResolver)))
    }

    /// Registers `S` as Transient, paired with [`DefaultMessageTypeResolver`].
    pub fn add_serializer<S>(&mut self) -> &mut Self
    where
        S: MessageSerializer + Construct,
    {
        self.dependency_configurator().add_transient::<S>();
        self.add_serializer_factory(|resolver| resolver.resolve::<S>())
    }

    /// Registers `S` and `R` as Transient and resolves both per chain.
    pub fn add_serializer_with_resolver<S, R>(&mut self) -> &mut Self
    where
        S: MessageSerializer + Construct,
        R: MessageTypeResolver + Construct,
    {
        let configurator = self.dependency_configurator();
        configurator.add_transient::<R>();
        configurator.add_transient::<S>();
        self.add_serializer_with(|resolver| resolver.resolve::<S>(), |resolver| resolver.resolve::<R>())
    }

    /// Serializer for payloads that are always an `M`, whatever the headers
    /// say. Registers `S` and the fixed resolver as Transient.
    pub fn add_single_type_serializer<M, S>(&mut self) -> &mut Self
    where
        M: 'static,
        S: MessageSerializer + Construct,
    {
        self.add_serializer_with_resolver::<S, SingleMessageTypeResolver<M>>()
    }

    /// Serializer from a factory for payloads that are always an `M`. The
    /// fixed resolver is built directly and never registered.
    pub fn add_single_type_serializer_factory<M, S, SF>(&mut self, serializer_factory: SF) -> &mut Self
    where
        M: 'static,
        S: MessageSerializer + 'static,
        SF: Fn(&dyn ResolverCore) -> DiResult<Arc<S>> + Send + Sync + 'static,
    {
        self.add_serializer_with(serializer_factory, |_| {
            Ok(Arc::new(SingleMessageTypeResolver::<M>::new()))
        })
    }
}
