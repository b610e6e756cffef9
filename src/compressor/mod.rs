//! Compressor middleware: a pure transform of the payload bytes.

use std::sync::Arc;

use crate::descriptors::Construct;
use crate::error::{DiResult, MiddlewareError};
use crate::middleware::{Direction, MessageContext, MessageValue, Middleware, MiddlewareBuilder};
use crate::traits::{Configurator, Resolver, ResolverCore};

#[cfg(feature = "gzip")]
mod gzip;

#[cfg(feature = "gzip")]
pub use gzip::GzipMessageCompressor;

/// Compresses outbound payloads and decompresses inbound ones.
pub trait MessageCompressor: Send + Sync {
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, MiddlewareError>;

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, MiddlewareError>;
}

fn transform(
    ctx: &mut MessageContext,
    middleware: &'static str,
    f: impl FnOnce(&[u8]) -> Result<Vec<u8>, MiddlewareError>,
) -> Result<(), MiddlewareError> {
    let bytes = ctx.bytes().ok_or(MiddlewareError::UnexpectedPayload {
        middleware,
        expected: "bytes",
    })?;
    let transformed = f(bytes)?;
    ctx.set_value(MessageValue::Bytes(transformed));
    Ok(())
}

/// Outbound compressor step.
pub struct CompressorProducerMiddleware {
    compressor: Arc<dyn MessageCompressor>,
}

impl CompressorProducerMiddleware {
    pub fn new(compressor: Arc<dyn MessageCompressor>) -> Self {
        Self { compressor }
    }
}

impl Middleware for CompressorProducerMiddleware {
    fn invoke(&self, ctx: &mut MessageContext) -> Result<(), MiddlewareError> {
        transform(ctx, self.name(), |bytes| self.compressor.compress(bytes))
    }
}

/// Inbound compressor step.
pub struct CompressorConsumerMiddleware {
    compressor: Arc<dyn MessageCompressor>,
}

impl CompressorConsumerMiddleware {
    pub fn new(compressor: Arc<dyn MessageCompressor>) -> Self {
        Self { compressor }
    }
}

impl Middleware for CompressorConsumerMiddleware {
    fn invoke(&self, ctx: &mut MessageContext) -> Result<(), MiddlewareError> {
        transform(ctx, self.name(), |bytes| self.compressor.decompress(bytes))
    }
}

impl<'a, D: Direction> MiddlewareBuilder<'a, D> {
    /// Registers `C` as Transient and appends a compressor step using it.
    pub fn add_compressor<C>(&mut self) -> &mut Self
    where
        C: MessageCompressor + Construct,
    {
        self.dependency_configurator().add_transient::<C>();
        self.add_compressor_factory(|resolver| resolver.resolve::<C>())
    }

    /// Appends a compressor step built by `factory`.
    pub fn add_compressor_factory<C, F>(&mut self, factory: F) -> &mut Self
    where
        C: MessageCompressor + 'static,
        F: Fn(&dyn ResolverCore) -> DiResult<Arc<C>> + Send + Sync + 'static,
    {
        self.add(move |resolver| {
            let compressor: Arc<dyn MessageCompressor> = factory(resolver)?;
            Ok(D::compressor_middleware(compressor))
        })
    }
}
