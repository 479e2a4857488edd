use std::path::Path;

use anyhow::{Context, Result};
use log::{info, warn};

use crate::config::WatermarkConfig;
use crate::lsb;
use crate::pixels::PixelBuffer;
use crate::watermark::{self, EncodeResult};

/// Load any image format the `image` crate understands as RGBA.
pub fn load_image(path: &Path) -> Result<PixelBuffer> {
    let img = image::open(path).with_context(|| format!("failed to open image {}", path.display()))?;
    Ok(PixelBuffer::from(&img))
}

/// Write `pixels` to `path`; the format follows the file extension.
pub fn save_image(pixels: &PixelBuffer, path: &Path) -> Result<()> {
    let is_lossy = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| matches!(e.to_ascii_lowercase().as_str(), "jpg" | "jpeg"))
        .unwrap_or(false);
    if is_lossy {
        warn!("writing {} with a lossy codec; LSB data will not survive", path.display());
    }

    let rgba = pixels
        .to_rgba_image()
        .context("pixel buffer does not match its dimensions")?;
    if is_lossy {
        image::DynamicImage::ImageRgba8(rgba)
            .to_rgb8()
            .save(path)
            .with_context(|| format!("failed to write {}", path.display()))?;
    } else {
        rgba.save(path)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }
    Ok(())
}

/// Full encode pipeline: load -> embed robust watermark -> save.
pub fn encode_file(
    input_path: &Path,
    output_path: &Path,
    message: &str,
    key: &str,
    cfg: &WatermarkConfig,
) -> Result<EncodeResult> {
    info!("loading image: {}", input_path.display());
    let pixels = load_image(input_path)?;
    info!(
        "embedding {} UTF-16 units into {}x{} image ({} blocks)",
        message.encode_utf16().count(),
        pixels.width(),
        pixels.height(),
        pixels.block_count()
    );

    let result = watermark::encode(&pixels, message, key, cfg);

    save_image(&result.image, output_path)?;
    info!(
        "encode complete: {} bits embedded, perceptual hash {}, output {}",
        result.bits_embedded,
        result.perceptual_hash,
        output_path.display()
    );
    Ok(result)
}

/// Hide `message` in the least significant bits of `input_path`.
pub fn lsb_encode_file(input_path: &Path, output_path: &Path, message: &str) -> Result<()> {
    let pixels = load_image(input_path)?;
    let encoded = lsb::encode(&pixels, message)?;
    save_image(&encoded, output_path)?;
    info!("lsb encode complete: {}", output_path.display());
    Ok(())
}
