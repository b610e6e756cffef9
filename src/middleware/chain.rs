//! Declared middleware lists and their per-scope materializations.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::{DiResult, MiddlewareError};
use crate::middleware::{MessageContext, Middleware, MiddlewareFactory};
use crate::provider::ResolverScope;
use crate::traits::ResolverCore;

static NEXT_CONFIGURATION_ID: AtomicU64 = AtomicU64::new(1);

/// Ordered middleware factories for one producer or consumer.
///
/// Cheap to clone; clones share the per-scope chain cache.
#[derive(Clone)]
pub struct MiddlewareConfiguration {
    id: u64,
    direction: &'static str,
    factories: Arc<[MiddlewareFactory]>,
}

impl MiddlewareConfiguration {
    pub(crate) fn new(direction: &'static str, factories: Vec<MiddlewareFactory>) -> Self {
        Self {
            id: NEXT_CONFIGURATION_ID.fetch_add(1, Ordering::Relaxed),
            direction,
            factories: factories.into(),
        }
    }

    /// `"producer"` or `"consumer"`.
    pub fn direction(&self) -> &'static str {
        self.direction
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Invokes every factory once, in declaration order.
    ///
    /// The first failing factory aborts materialization; no partial chain is
    /// returned.
    pub fn materialize(&self, resolver: &dyn ResolverCore) -> DiResult<MiddlewareChain> {
        let middlewares = self
            .factories
            .iter()
            .map(|factory| factory(resolver))
            .collect::<DiResult<Vec<_>>>()
            .map_err(|error| {
                tracing::debug!(direction = self.direction, %error, "middleware chain materialization failed");
                error
            })?;

        tracing::debug!(
            direction = self.direction,
            middlewares = middlewares.len(),
            "middleware chain materialized"
        );
        Ok(MiddlewareChain { middlewares })
    }

    /// Chain for `scope`, materialized on first use and reused for the rest
    /// of the scope's lifetime.
    ///
    /// Concurrent first calls on one scope produce a single chain. A failed
    /// materialization is not cached, a later call tries again.
    ///
    /// ```
    /// use ferrous_flow::{Middleware, MiddlewareBuilder, MiddlewareError, MessageContext, ServiceCollection};
    /// use std::sync::Arc;
    ///
    /// struct Noop;
    /// impl Middleware for Noop {
    ///     fn invoke(&self, _: &mut MessageContext) -> Result<(), MiddlewareError> { Ok(()) }
    /// }
    ///
    /// let mut services = ServiceCollection::new();
    /// let mut middlewares = MiddlewareBuilder::consumer(&mut services);
    /// middlewares.add(|_| Ok(Arc::new(Noop)));
    /// let configuration = middlewares.build();
    ///
    /// let provider = services.build();
    /// let scope = provider.create_scope().unwrap();
    /// let first = configuration.chain_for(&scope).unwrap();
    /// let second = configuration.chain_for(&scope).unwrap();
    /// assert!(Arc::ptr_eq(&first, &second));
    /// ```
    pub fn chain_for(&self, scope: &ResolverScope) -> DiResult<Arc<MiddlewareChain>> {
        scope.local(self.id, |resolver| self.materialize(resolver).map(Arc::new))
    }
}

impl fmt::Debug for MiddlewareConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MiddlewareConfiguration")
            .field("direction", &self.direction)
            .field("middlewares", &self.factories.len())
            .finish()
    }
}

/// Materialized middleware, in execution order.
pub struct MiddlewareChain {
    middlewares: Vec<Arc<dyn Middleware>>,
}

impl MiddlewareChain {
    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Middleware>> {
        self.middlewares.iter()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.middlewares.iter().map(|m| m.name()).collect()
    }

    /// Runs every step over `ctx` in order, stopping at the first error.
    pub fn execute(&self, ctx: &mut MessageContext) -> Result<(), MiddlewareError> {
        for middleware in &self.middlewares {
            tracing::trace!(middleware = middleware.name(), topic = ctx.topic(), "invoking middleware");
            middleware.invoke(ctx)?;
        }
        Ok(())
    }
}

impl fmt::Debug for MiddlewareChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
