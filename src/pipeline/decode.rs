use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use rayon::prelude::*;

use crate::config::WatermarkConfig;
use crate::lsb;
use crate::phash::{self, HashMatch, PerceptualHash};
use crate::pipeline::encode::load_image;
use crate::watermark::{self, DecodeResult};

/// Full decode pipeline: load -> extract robust watermark.
pub fn decode_file(input_path: &Path, key: &str, cfg: &WatermarkConfig) -> Result<DecodeResult> {
    info!("decoding image: {}", input_path.display());
    let pixels = load_image(input_path)?;
    let result = watermark::decode_with(&pixels, key, cfg);
    info!(
        "{}: found={} confidence={:.3}",
        input_path.display(),
        result.found,
        result.confidence
    );
    Ok(result)
}

/// Decode many images in parallel. Results keep the input order; a file
/// that cannot be read yields an error for that entry only.
pub fn decode_files(
    inputs: &[PathBuf],
    key: &str,
    cfg: &WatermarkConfig,
) -> Result<Vec<(PathBuf, Result<DecodeResult>)>> {
    let progress = ProgressBar::new(inputs.len() as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.green/black} {pos}/{len} images ({eta})")
            .context("invalid progress template")?
            .progress_chars("##-"),
    );

    let results = inputs
        .par_iter()
        .map(|path| {
            let result = load_image(path).map(|pixels| watermark::decode_with(&pixels, key, cfg));
            progress.inc(1);
            (path.clone(), result)
        })
        .collect();

    progress.finish_with_message("decoding complete");
    Ok(results)
}

/// Compare an image against a stored perceptual hash.
pub fn verify_file(input_path: &Path, stored: &PerceptualHash, threshold: f64) -> Result<HashMatch> {
    let pixels = load_image(input_path)?;
    let result = phash::verify_perceptual_hash(&pixels, stored, threshold);
    info!(
        "{}: similarity {:.3} (threshold {:.2})",
        input_path.display(),
        result.similarity,
        threshold
    );
    Ok(result)
}

/// Read an LSB message, if the image carries one.
pub fn lsb_decode_file(input_path: &Path) -> Result<Option<String>> {
    let pixels = load_image(input_path)?;
    if !lsb::has_hidden_data(&pixels) {
        info!("{}: no LSB header", input_path.display());
        return Ok(None);
    }
    Ok(lsb::decode(&pixels))
}
