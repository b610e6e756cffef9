//! Gzip compression backed by `flate2`.

use std::io::{Read, Write};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::compressor::MessageCompressor;
use crate::descriptors::Construct;
use crate::error::{DiResult, MiddlewareError};
use crate::traits::ResolverCore;

/// Gzip [`MessageCompressor`].
#[derive(Debug, Clone, Copy)]
pub struct GzipMessageCompressor {
    level: Compression,
}

impl GzipMessageCompressor {
    pub fn new(level: u32) -> Self {
        Self {
            level: Compression::new(level),
        }
    }
}

impl Default for GzipMessageCompressor {
    fn default() -> Self {
        Self {
            level: Compression::default(),
        }
    }
}

impl Construct for GzipMessageCompressor {
    fn construct(_: &dyn ResolverCore) -> DiResult<Self> {
        Ok(Self::default())
    }
}

impl MessageCompressor for GzipMessageCompressor {
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, MiddlewareError> {
        let mut encoder = GzEncoder::new(Vec::new(), self.level);
        encoder.write_all(data)?;
        Ok(encoder.finish()?)
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, MiddlewareError> {
        let mut decoded = Vec::new();
        GzDecoder::new(data).read_to_end(&mut decoded)?;
        Ok(decoded)
    }
}
