//! Built-in message type resolvers.

use std::fmt;
use std::marker::PhantomData;

use crate::descriptors::Construct;
use crate::error::{DiResult, MiddlewareError};
use crate::middleware::{MessageContext, MessageType};
use crate::serializer::MessageTypeResolver;
use crate::traits::ResolverCore;

/// Header carrying the payload type name.
pub const MESSAGE_TYPE_HEADER: &str = "Message-Type";

/// Resolver that reads and writes the [`MESSAGE_TYPE_HEADER`] header.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultMessageTypeResolver;

impl MessageTypeResolver for DefaultMessageTypeResolver {
    fn on_consume(&self, ctx: &MessageContext) -> Result<MessageType, MiddlewareError> {
        ctx.headers()
            .get_str(MESSAGE_TYPE_HEADER)
            .map(|name| MessageType::named(name.to_string()))
            .ok_or(MiddlewareError::MissingTypeHeader(MESSAGE_TYPE_HEADER))
    }

    fn on_produce(&self, ctx: &mut MessageContext) -> Result<(), MiddlewareError> {
        let name = ctx
            .message_type()
            .map(|message_type| message_type.name().to_string())
            .ok_or(MiddlewareError::UnexpectedPayload {
                middleware: "DefaultMessageTypeResolver",
                expected: "object",
            })?;
        ctx.headers_mut().set(MESSAGE_TYPE_HEADER, name);
        Ok(())
    }
}

impl Construct for DefaultMessageTypeResolver {
    fn construct(_: &dyn ResolverCore) -> DiResult<Self> {
        Ok(Self)
    }
}

/// Resolver fixed to message type `M`. Type headers are neither read nor
/// written.
pub struct SingleMessageTypeResolver<M> {
    _message: PhantomData<fn() -> M>,
}

impl<M> SingleMessageTypeResolver<M> {
    pub fn new() -> Self {
        Self { _message: PhantomData }
    }
}

impl<M> Default for SingleMessageTypeResolver<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> fmt::Debug for SingleMessageTypeResolver<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SingleMessageTypeResolver<{}>", std::any::type_name::<M>())
    }
}

impl<M: 'static> MessageTypeResolver for SingleMessageTypeResolver<M> {
    fn on_consume(&self, _: &MessageContext) -> Result<MessageType, MiddlewareError> {
        Ok(MessageType::of::<M>())
    }

    fn on_produce(&self, _: &mut MessageContext) -> Result<(), MiddlewareError> {
        Ok(())
    }
}

impl<M: 'static> Construct for SingleMessageTypeResolver<M> {
    fn construct(_: &dyn ResolverCore) -> DiResult<Self> {
        Ok(Self::new())
    }
}
