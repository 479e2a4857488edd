use anyhow::{Context, Result};

use crate::config::DEFAULT_JPEG_QUALITY;
use crate::pixels::PixelBuffer;

/// A hook invoked between embedding and extraction in a [`roundtrip`](super::roundtrip).
///
/// Implement this trait to put the watermarked image through whatever the
/// real distribution channel does to it (recompression, resizing, a trip
/// through an upload service) before it is decoded again.
///
/// # Example
///
/// ```rust
/// use anyhow::Result;
/// use lumamark::{PipelineHook, PixelBuffer};
///
/// struct Darken;
///
/// impl PipelineHook for Darken {
///     fn after_encode(&self, encoded: &PixelBuffer) -> Result<PixelBuffer> {
///         let mut out = encoded.clone();
///         for b in out.as_bytes_mut() {
///             *b = b.saturating_sub(2);
///         }
///         Ok(out)
///     }
/// }
/// ```
pub trait PipelineHook {
    /// Called with the freshly watermarked image. Return the image the
    /// extractor should read.
    fn after_encode(&self, encoded: &PixelBuffer) -> Result<PixelBuffer>;
}

/// Passes the watermarked image through unchanged.
pub struct NoopHook;

impl PipelineHook for NoopHook {
    fn after_encode(&self, encoded: &PixelBuffer) -> Result<PixelBuffer> {
        Ok(encoded.clone())
    }
}

/// Re-encodes the image through JPEG, as a typical re-upload would.
pub struct JpegRecompressHook {
    pub quality: u8,
}

impl Default for JpegRecompressHook {
    fn default() -> Self {
        Self {
            quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

impl PipelineHook for JpegRecompressHook {
    fn after_encode(&self, encoded: &PixelBuffer) -> Result<PixelBuffer> {
        encoded
            .recompress_jpeg(self.quality)
            .with_context(|| format!("JPEG recompression at quality {} failed", self.quality))
    }
}
