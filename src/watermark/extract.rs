use log::{debug, warn};
use rayon::prelude::*;

use crate::config::{self, WatermarkConfig, LENGTH_BITS, MAGIC_BITS, PROTOCOL};
use crate::dct;
use crate::ecc::ReedSolomonCode;
use crate::pixels::PixelBuffer;
use crate::rng::RngSession;
use crate::watermark::frame;
use crate::watermark::DecodeResult;

const HEADER_BITS: usize = MAGIC_BITS + LENGTH_BITS;

/// Confidence-weighted vote for one bit position.
#[derive(Debug, Clone, Copy, Default)]
struct Vote {
    ones: f64,
    zeros: f64,
}

impl Vote {
    fn add(&mut self, correlation: f64) {
        if correlation > 0.0 {
            self.ones += correlation;
        } else {
            self.zeros += -correlation;
        }
    }

    fn bit(&self) -> u8 {
        u8::from(self.ones > self.zeros)
    }

    fn margin(&self) -> f64 {
        (self.ones - self.zeros).abs()
    }
}

/// Vote bit `index` of a `stream_len`-bit stream over all copies present.
fn vote(correlations: &[f64], stream_len: usize, redundancy: usize, index: usize) -> Vote {
    let limit = correlations.len().min(stream_len * redundancy);
    let mut v = Vote::default();
    let mut k = index;
    while k < limit {
        v.add(correlations[k]);
        k += stream_len;
    }
    v
}

fn magic_matches(bits: &[u8]) -> usize {
    (0..MAGIC_BITS)
        .filter(|&i| bits[i] == ((PROTOCOL.magic >> (MAGIC_BITS - 1 - i)) & 1) as u8)
        .count()
}

fn bits_value(bits: &[u8]) -> usize {
    bits.iter().fold(0usize, |acc, &b| (acc << 1) | b as usize)
}

/// A message length together with the header voted at its copy spacing.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    units: usize,
    stream_len: usize,
    /// Bits by which the voted length field differs from `units`.
    length_distance: u32,
    matches: usize,
    margin: f64,
}

impl Candidate {
    fn beats(&self, other: &Candidate) -> bool {
        if self.length_distance != other.length_distance {
            return self.length_distance < other.length_distance;
        }
        (self.matches, self.margin) > (other.matches, other.margin)
    }
}

/// Pick the message length whose voted header agrees best with itself.
///
/// A length whose header declares that same length wins outright; under
/// heavy noise the nearest declaration is taken instead. Ties go to the best
/// magic match, then the strongest vote.
fn find_candidate(correlations: &[f64], cfg: &WatermarkConfig) -> Option<Candidate> {
    let mut best: Option<Candidate> = None;
    for units in 0..=PROTOCOL.max_message_units {
        let stream_len = cfg.stream_bits(units);
        if stream_len > correlations.len() {
            break;
        }

        let votes: Vec<Vote> = (0..HEADER_BITS)
            .map(|i| vote(correlations, stream_len, cfg.redundancy, i))
            .collect();
        let bits: Vec<u8> = votes.iter().map(Vote::bit).collect();
        let declared = bits_value(&bits[MAGIC_BITS..]);

        let candidate = Candidate {
            units,
            stream_len,
            length_distance: (declared ^ units).count_ones(),
            matches: magic_matches(&bits),
            margin: votes.iter().map(Vote::margin).sum(),
        };
        if best.map_or(true, |b| candidate.beats(&b)) {
            best = Some(candidate);
        }
    }
    best
}

/// Recover a watermark embedded with the default configuration.
pub fn decode(image: &PixelBuffer, key: &str) -> DecodeResult {
    decode_with(image, key, &WatermarkConfig::default())
}

/// Recover a watermark; `cfg.redundancy` and `cfg.ecc_level` must match the
/// values used at embed time.
pub fn decode_with(image: &PixelBuffer, key: &str, cfg: &WatermarkConfig) -> DecodeResult {
    let block_count = image.block_count();
    if block_count == 0 || cfg.redundancy == 0 {
        return DecodeResult::not_found(0.0);
    }

    let slots = PROTOCOL.positions.len();
    let capacity = block_count * slots;
    let longest = cfg.stream_bits(PROTOCOL.max_message_units) * cfg.redundancy;
    let total = capacity.min(longest);
    if total < HEADER_BITS {
        return DecodeResult::not_found(0.0);
    }

    let mut session = RngSession::new(key, block_count);
    let spreads = session.spreads(total);
    let visits = total.div_ceil(slots);

    let correlations: Vec<f64> = session.block_order()[..visits]
        .par_iter()
        .enumerate()
        .map(|(visit, &block)| {
            let start = visit * slots;
            let end = (start + slots).min(total);
            let coeffs = dct::dct2d(&image.luma_block(block));
            (start..end)
                .zip(PROTOCOL.positions.iter())
                .map(|(k, &(u, v))| coeffs[u][v] * spreads[k])
                .collect::<Vec<f64>>()
        })
        .collect::<Vec<Vec<f64>>>()
        .concat();

    read_stream(&correlations, cfg)
}

/// Vote, check the magic and error-correct a stream of per-slot correlations.
fn read_stream(correlations: &[f64], cfg: &WatermarkConfig) -> DecodeResult {
    let Some(candidate) = find_candidate(correlations, cfg) else {
        return DecodeResult::not_found(0.0);
    };

    let confidence = candidate.matches as f64 / MAGIC_BITS as f64;
    debug!(
        "header candidate: {} units ({} length bits off), {} bits per copy, magic confidence {:.3}",
        candidate.units, candidate.length_distance, candidate.stream_len, confidence
    );
    if confidence < PROTOCOL.magic_threshold {
        return DecodeResult::not_found(confidence);
    }

    let bits: Vec<u8> = (0..candidate.stream_len)
        .map(|i| vote(correlations, candidate.stream_len, cfg.redundancy, i).bit())
        .collect();
    let codeword = frame::bits_to_bytes(&bits);

    let frame_len = config::FRAME_HEADER_BYTES + 2 * candidate.units;
    let rs = ReedSolomonCode::new(config::parity_symbols(frame_len, cfg.ecc_level));
    let frame_bytes = match rs.decode(&codeword) {
        Ok(corrected) => corrected,
        Err(e) => {
            warn!("error correction failed ({}); using uncorrected bits", e);
            codeword[..frame_len].to_vec()
        }
    };

    DecodeResult {
        found: true,
        confidence,
        message: Some(frame::parse_frame(&frame_bytes)),
    }
}
