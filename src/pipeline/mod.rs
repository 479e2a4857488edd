pub mod decode;
pub mod encode;
pub mod hook;

use anyhow::Result;
use log::info;

use crate::config::WatermarkConfig;
use crate::phash;
use crate::pixels::PixelBuffer;
use crate::watermark::{self, DecodeResult};
use hook::PipelineHook;

/// Result of a full embed → hook → extract roundtrip.
#[derive(Debug, Clone)]
pub struct RoundtripResult {
    /// Extractor verdict on the image returned by the hook.
    pub decoded: DecodeResult,
    /// Perceptual-hash similarity between the watermarked and hooked images.
    pub hash_similarity: f64,
    /// `true` if the recovered message equals the embedded one.
    pub matched: bool,
}

/// Run a full embed → hook → extract roundtrip.
///
/// Steps:
/// 1. Embeds `message` into `image` under `key`.
/// 2. Calls `hook.after_encode`; recompression or upload/download happens here.
/// 3. Decodes the image returned by the hook.
/// 4. Compares the recovered message and the perceptual hashes.
///
/// # Example
///
/// ```rust
/// use lumamark::{roundtrip, JpegRecompressHook, PixelBuffer, WatermarkConfig};
///
/// let image = PixelBuffer::filled(128, 128, [128, 128, 128]).unwrap();
/// let result = roundtrip(
///     &image,
///     "hello",
///     "my-key",
///     &WatermarkConfig::default(),
///     &JpegRecompressHook::default(),
/// ).unwrap();
///
/// assert!(result.matched, "roundtrip failed: {:?}", result.decoded);
/// ```
pub fn roundtrip<H: PipelineHook>(
    image: &PixelBuffer,
    message: &str,
    key: &str,
    cfg: &WatermarkConfig,
    hook: &H,
) -> Result<RoundtripResult> {
    let encoded = watermark::encode(image, message, key, cfg);

    let received = hook.after_encode(&encoded.image)?;

    let decoded = watermark::decode_with(&received, key, cfg);
    let hash_similarity = phash::compute(&received).similarity(&encoded.perceptual_hash);
    let matched = decoded.message.as_deref() == Some(message);

    info!(
        "roundtrip: matched={} confidence={:.3} hash similarity={:.3}",
        matched, decoded.confidence, hash_similarity
    );

    Ok(RoundtripResult {
        decoded,
        hash_similarity,
        matched,
    })
}
