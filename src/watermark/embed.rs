use log::{debug, warn};
use rayon::prelude::*;

use crate::config::{self, WatermarkConfig, PROTOCOL};
use crate::dct::{self, Block};
use crate::ecc::ReedSolomonCode;
use crate::phash;
use crate::pixels::PixelBuffer;
use crate::rng::RngSession;
use crate::watermark::frame;
use crate::watermark::EncodeResult;

/// Embed `message` into a copy of `image`, placing bits by `key`.
///
/// Never fails: an image too small for the requested redundancy receives as
/// many bits as fit, and one without a single 8x8 block is returned unchanged.
pub fn encode(image: &PixelBuffer, message: &str, key: &str, cfg: &WatermarkConfig) -> EncodeResult {
    let mut output = image.clone();

    let units = frame::message_units(message);
    let frame_bytes = frame::build_frame(&units);
    let rs = ReedSolomonCode::new(config::parity_symbols(frame_bytes.len(), cfg.ecc_level));
    let bits = frame::bytes_to_bits(&rs.encode(&frame_bytes));

    let block_count = image.block_count();
    if block_count == 0 {
        warn!(
            "{}x{} image has no {}x{} blocks; nothing embedded",
            image.width(),
            image.height(),
            PROTOCOL.block_size,
            PROTOCOL.block_size
        );
        return EncodeResult {
            perceptual_hash: phash::compute(&output),
            image: output,
            bits_embedded: 0,
        };
    }

    let slots = PROTOCOL.positions.len();
    let capacity = block_count * slots;
    let requested = bits.len() * cfg.redundancy;
    let total = requested.min(capacity);
    if total < requested {
        warn!(
            "image holds {:.2} of {} requested copies ({} of {} bits)",
            total as f64 / bits.len() as f64,
            cfg.redundancy,
            total,
            requested
        );
    }

    let mut session = RngSession::new(key, block_count);
    let spreads = session.spreads(total);
    let visits = total.div_ceil(slots);
    let strength = cfg.strength as f64;
    let quant_step = cfg.quant_step();

    let deltas: Vec<(usize, Block)> = session.block_order()[..visits]
        .par_iter()
        .enumerate()
        .map(|(visit, &block)| {
            let start = visit * slots;
            let end = (start + slots).min(total);

            let original = image.luma_block(block);
            let mut coeffs = dct::dct2d(&original);
            for (k, &(u, v)) in (start..end).zip(PROTOCOL.positions.iter()) {
                let sign = if bits[k % bits.len()] == 1 { 1.0 } else { -1.0 };
                let base = if quant_step > 0.0 {
                    (coeffs[u][v] / quant_step).round() * quant_step
                } else {
                    coeffs[u][v]
                };
                coeffs[u][v] = base + sign * spreads[k] * strength;
            }

            let modified = dct::idct2d(&coeffs);
            let mut delta = [[0.0f64; config::BLOCK_SIZE]; config::BLOCK_SIZE];
            for (row, d) in delta.iter_mut().enumerate() {
                for (col, value) in d.iter_mut().enumerate() {
                    *value = modified[row][col] - original[row][col];
                }
            }
            (block, delta)
        })
        .collect();

    for (block, delta) in &deltas {
        output.apply_luma_delta(*block, delta);
    }

    debug!(
        "embedded {} bits ({} per copy) across {} of {} blocks",
        total,
        bits.len(),
        visits,
        block_count
    );

    EncodeResult {
        perceptual_hash: phash::compute(&output),
        image: output,
        bits_embedded: total,
    }
}
