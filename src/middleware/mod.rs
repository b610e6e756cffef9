//! Middleware chains for producers and consumers.
//!
//! Configuration code declares an ordered list of middleware factories with a
//! [`MiddlewareBuilder`]. At runtime the transport materializes the list once
//! per [`ResolverScope`](crate::ResolverScope) and runs the resulting
//! [`MiddlewareChain`] over every message of that unit of work.
//!
//! Steps run in declaration order in both directions: on a consumer the
//! first declared middleware sees the raw inbound message, on a producer the
//! first declared middleware is the one closest to the application.

use std::sync::Arc;

use crate::error::{DiResult, MiddlewareError};
use crate::traits::ResolverCore;

mod builder;
mod chain;
mod context;

pub use builder::{Consumer, Direction, MiddlewareBuilder, Producer};
pub use chain::{MiddlewareChain, MiddlewareConfiguration};
pub use context::{MessageContext, MessageHeaders, MessageType, MessageValue};

/// A single transform step applied to a message.
///
/// # Examples
///
/// ```
/// use ferrous_flow::{MessageContext, Middleware, MiddlewareError};
///
/// struct StampTopic;
///
/// impl Middleware for StampTopic {
///     fn invoke(&self, ctx: &mut MessageContext) -> Result<(), MiddlewareError> {
///         let topic = ctx.topic().to_string();
///         ctx.headers_mut().set("X-Topic", topic);
///         Ok(())
///     }
/// }
/// ```
pub trait Middleware: Send + Sync {
    /// Applies the step. An error stops the chain.
    fn invoke(&self, ctx: &mut MessageContext) -> Result<(), MiddlewareError>;

    /// Name used in logs.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Deferred construction of one middleware from the resolver of a scope.
pub type MiddlewareFactory =
    Arc<dyn Fn(&dyn ResolverCore) -> DiResult<Arc<dyn Middleware>> + Send + Sync>;
