//! Typed message handlers.
//!
//! The last step of a consumer chain: dispatches the deserialized message to
//! every registered handler of its type.

use std::any::{Any, TypeId};
use std::sync::Arc;

use crate::descriptors::Construct;
use crate::error::{BoxError, DiResult, MiddlewareError};
use crate::lifetime::Lifetime;
use crate::middleware::{Consumer, MessageContext, MessageValue, Middleware, MiddlewareBuilder};
use crate::traits::{register_self, ConfiguratorCore, Resolver, ResolverCore};

/// Handles messages of type `M`.
///
/// # Examples
///
/// ```
/// use ferrous_flow::{BoxError, Construct, DiResult, MessageContext, MessageHandler, ResolverCore};
///
/// struct OrderPlaced { id: u32 }
///
/// struct PrintOrders;
/// impl Construct for PrintOrders {
///     fn construct(_: &dyn ResolverCore) -> DiResult<Self> { Ok(PrintOrders) }
/// }
/// impl MessageHandler<OrderPlaced> for PrintOrders {
///     fn handle(&self, ctx: &MessageContext, order: &OrderPlaced) -> Result<(), BoxError> {
///         println!("{}: order {}", ctx.topic(), order.id);
///         Ok(())
///     }
/// }
/// ```
pub trait MessageHandler<M>: Send + Sync {
    fn handle(&self, ctx: &MessageContext, message: &M) -> Result<(), BoxError>;
}

type Invoke = Box<dyn Fn(&MessageContext, &(dyn Any + Send + Sync)) -> Result<(), BoxError> + Send + Sync>;

/// One resolved handler, bound to the message type it accepts.
struct BoundHandler {
    message_type: TypeId,
    handler: &'static str,
    invoke: Invoke,
}

fn bind<H, M>(resolver: &dyn ResolverCore) -> DiResult<BoundHandler>
where
    H: MessageHandler<M> + Send + Sync + 'static,
    M: Send + Sync + 'static,
{
    let handler = resolver.resolve::<H>()?;
    Ok(BoundHandler {
        message_type: TypeId::of::<M>(),
        handler: std::any::type_name::<H>(),
        invoke: Box::new(move |ctx: &MessageContext, message: &(dyn Any + Send + Sync)| {
            match message.downcast_ref::<M>() {
                Some(message) => handler.handle(ctx, message),
                None => Ok(()),
            }
        }),
    })
}

fn register<H: Construct>(configurator: &mut dyn ConfiguratorCore, lifetime: Lifetime) {
    register_self::<H, _>(configurator, lifetime);
}

/// A declared handler. Registration waits until the builder is applied so
/// the final handler lifetime is used.
struct HandlerDeclaration {
    register: fn(&mut dyn ConfiguratorCore, Lifetime),
    bind: fn(&dyn ResolverCore) -> DiResult<BoundHandler>,
}

/// Declares the handlers of a typed-handler step.
pub struct TypedHandlerBuilder {
    lifetime: Lifetime,
    handlers: Vec<HandlerDeclaration>,
}

impl Default for TypedHandlerBuilder {
    fn default() -> Self {
        Self {
            lifetime: Lifetime::Singleton,
            handlers: Vec::new(),
        }
    }
}

impl TypedHandlerBuilder {
    /// Lifetime every handler of this step is registered with. Singleton
    /// unless set.
    pub fn with_handler_lifetime(mut self, lifetime: Lifetime) -> Self {
        self.lifetime = lifetime;
        self
    }

    /// Adds handler `H` for messages of type `M`.
    pub fn add_handler<H, M>(mut self) -> Self
    where
        H: MessageHandler<M> + Construct,
        M: Send + Sync + 'static,
    {
        self.handlers.push(HandlerDeclaration {
            register: register::<H>,
            bind: bind::<H, M>,
        });
        self
    }
}

/// Consumer step dispatching the message object to its handlers.
pub struct TypedHandlerMiddleware {
    handlers: Vec<BoundHandler>,
}

impl Middleware for TypedHandlerMiddleware {
    fn invoke(&self, ctx: &mut MessageContext) -> Result<(), MiddlewareError> {
        let message = match ctx.value() {
            MessageValue::Object { value, .. } => value.clone(),
            _ => {
                return Err(MiddlewareError::UnexpectedPayload {
                    middleware: self.name(),
                    expected: "object",
                })
            }
        };

        let message_type = Any::type_id(&*message);
        let mut handled = false;
        for bound in self.handlers.iter().filter(|h| h.message_type == message_type) {
            handled = true;
            (bound.invoke)(ctx, &*message).map_err(|source| MiddlewareError::Handler {
                handler: bound.handler,
                source,
            })?;
        }

        if !handled {
            tracing::debug!(
                topic = ctx.topic(),
                message_type = ?ctx.message_type(),
                "no handler registered for message type"
            );
        }
        Ok(())
    }
}

impl<'a> MiddlewareBuilder<'a, Consumer> {
    /// Registers the declared handlers and appends a step dispatching to
    /// them.
    ///
    /// ```
    /// use ferrous_flow::{BoxError, Construct, DiResult, Lifetime, MessageContext, MessageHandler,
    ///     MiddlewareBuilder, ResolverCore, ServiceCollection};
    /// use std::sync::atomic::{AtomicU32, Ordering};
    ///
    /// struct OrderPlaced { id: u32 }
    ///
    /// #[derive(Default)]
    /// struct LastOrder(AtomicU32);
    /// impl Construct for LastOrder {
    ///     fn construct(_: &dyn ResolverCore) -> DiResult<Self> { Ok(Self::default()) }
    /// }
    /// impl MessageHandler<OrderPlaced> for LastOrder {
    ///     fn handle(&self, _: &MessageContext, order: &OrderPlaced) -> Result<(), BoxError> {
    ///         self.0.store(order.id, Ordering::SeqCst);
    ///         Ok(())
    ///     }
    /// }
    ///
    /// let mut services = ServiceCollection::new();
    /// let mut consumer = MiddlewareBuilder::consumer(&mut services);
    /// consumer.add_typed_handlers(|handlers| {
    ///     handlers
    ///         .with_handler_lifetime(Lifetime::Scoped)
    ///         .add_handler::<LastOrder, OrderPlaced>()
    /// });
    /// let configuration = consumer.build();
    ///
    /// let provider = services.build();
    /// let scope = provider.create_scope().unwrap();
    /// let mut ctx = MessageContext::outbound("orders", OrderPlaced { id: 42 });
    /// configuration.chain_for(&scope).unwrap().execute(&mut ctx).unwrap();
    /// ```
    pub fn add_typed_handlers(
        &mut self,
        configure: impl FnOnce(TypedHandlerBuilder) -> TypedHandlerBuilder,
    ) -> &mut Self {
        let builder = configure(TypedHandlerBuilder::default());
        let configurator = self.dependency_configurator();
        for declaration in &builder.handlers {
            (declaration.register)(&mut *configurator, builder.lifetime);
        }

        let binders: Vec<_> = builder.handlers.iter().map(|d| d.bind).collect();
        self.add(move |resolver| {
            let handlers = binders
                .iter()
                .map(|binder| binder(resolver))
                .collect::<DiResult<Vec<_>>>()?;
            Ok(Arc::new(TypedHandlerMiddleware { handlers }) as Arc<dyn Middleware>)
        })
    }
}
