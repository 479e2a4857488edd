//! 63-bit DCT perceptual fingerprint.
//!
//! The image is box-averaged to a 32x32 luma thumbnail, the lowest 8x8 DCT
//! coefficients are taken (DC excluded) and each is thresholded against
//! their mean.

use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use thiserror::Error;

use crate::config::{PHASH_BITS, PHASH_DCT_SIZE, PHASH_SIZE};
use crate::pixels::PixelBuffer;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PhashError {
    #[error("invalid perceptual hash {0:?}: expected up to 16 hex digits with the top bit clear")]
    InvalidHex(String),

    #[error("perceptual hash {0:#x} has bits above bit {max}", max = PHASH_BITS - 1)]
    OutOfRange(u64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PerceptualHash(u64);

impl PerceptualHash {
    pub fn from_bits(bits: u64) -> Result<Self, PhashError> {
        if bits >> PHASH_BITS != 0 {
            return Err(PhashError::OutOfRange(bits));
        }
        Ok(Self(bits))
    }

    pub fn bits(&self) -> u64 {
        self.0
    }

    pub fn bit(&self, i: usize) -> bool {
        (self.0 >> i) & 1 == 1
    }

    /// Fraction of the 63 bits that agree.
    pub fn similarity(&self, other: &PerceptualHash) -> f64 {
        let differing = (self.0 ^ other.0).count_ones() as usize;
        (PHASH_BITS - differing) as f64 / PHASH_BITS as f64
    }

    pub fn to_hex(&self) -> String {
        format!("{:016x}", self.0)
    }
}

impl fmt::Display for PerceptualHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl FromStr for PerceptualHash {
    type Err = PhashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed.len() > 16 {
            return Err(PhashError::InvalidHex(s.to_string()));
        }
        let bits =
            u64::from_str_radix(trimmed, 16).map_err(|_| PhashError::InvalidHex(s.to_string()))?;
        Self::from_bits(bits).map_err(|_| PhashError::InvalidHex(s.to_string()))
    }
}

/// Outcome of [`verify_perceptual_hash`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HashMatch {
    pub is_match: bool,
    pub similarity: f64,
}

/// Row `u` holds the first 8 orthonormal cosine basis vectors of length 32.
fn partial_basis() -> &'static [[f64; PHASH_SIZE]; PHASH_DCT_SIZE] {
    static BASIS: OnceLock<[[f64; PHASH_SIZE]; PHASH_DCT_SIZE]> = OnceLock::new();
    BASIS.get_or_init(|| {
        let n = PHASH_SIZE as f64;
        let mut basis = [[0.0f64; PHASH_SIZE]; PHASH_DCT_SIZE];
        for (u, row) in basis.iter_mut().enumerate() {
            let scale = if u == 0 { (1.0 / n).sqrt() } else { (2.0 / n).sqrt() };
            for (k, v) in row.iter_mut().enumerate() {
                *v = scale * ((2 * k + 1) as f64 * u as f64 * PI / (2.0 * n)).cos();
            }
        }
        basis
    })
}

/// Box-average the luma plane down to 32x32.
fn downsample(image: &PixelBuffer) -> [[f64; PHASH_SIZE]; PHASH_SIZE] {
    let w = image.width() as usize;
    let h = image.height() as usize;
    let span = |cell: usize, len: usize| {
        let start = cell * len / PHASH_SIZE;
        let end = ((cell + 1) * len / PHASH_SIZE).max(start + 1).min(len);
        (start, end)
    };

    let mut thumb = [[0.0f64; PHASH_SIZE]; PHASH_SIZE];
    for (cy, row) in thumb.iter_mut().enumerate() {
        let (y0, y1) = span(cy, h);
        for (cx, cell) in row.iter_mut().enumerate() {
            let (x0, x1) = span(cx, w);
            let mut sum = 0.0;
            for y in y0..y1 {
                for x in x0..x1 {
                    sum += image.luma(x, y);
                }
            }
            *cell = sum / ((y1 - y0) * (x1 - x0)) as f64;
        }
    }
    thumb
}

pub fn compute(image: &PixelBuffer) -> PerceptualHash {
    let thumb = downsample(image);
    let c = partial_basis();

    // Rows first: tmp[u][x] = sum_y c[u][y] * thumb[y][x]
    let mut tmp = [[0.0f64; PHASH_SIZE]; PHASH_DCT_SIZE];
    for (u, tmp_row) in tmp.iter_mut().enumerate() {
        for (x, v) in tmp_row.iter_mut().enumerate() {
            *v = (0..PHASH_SIZE).map(|y| c[u][y] * thumb[y][x]).sum();
        }
    }

    let mut coeffs = Vec::with_capacity(PHASH_BITS);
    for tmp_row in &tmp {
        for basis_row in c.iter() {
            coeffs.push(
                tmp_row
                    .iter()
                    .zip(basis_row.iter())
                    .map(|(a, b)| a * b)
                    .sum::<f64>(),
            );
        }
    }
    coeffs.remove(0); // DC

    let mean = coeffs.iter().sum::<f64>() / coeffs.len() as f64;
    let bits = coeffs
        .iter()
        .enumerate()
        .filter(|&(_, &v)| v > mean)
        .fold(0u64, |acc, (i, _)| acc | (1 << i));
    PerceptualHash(bits)
}

/// Recompute the fingerprint of `image` and compare it with `stored`.
pub fn verify_perceptual_hash(image: &PixelBuffer, stored: &PerceptualHash, threshold: f64) -> HashMatch {
    let similarity = compute(image).similarity(stored);
    HashMatch {
        is_match: similarity >= threshold,
        similarity,
    }
}
