/// Fixed parameters shared by the embedder and the extractor.
///
/// Both sides read every layout constant from a single descriptor so that
/// editing one path cannot silently desynchronise the other.
#[derive(Debug, Clone, Copy)]
pub struct Protocol {
    pub version: u8,
    /// 16-bit frame signature, emitted MSB first.
    pub magic: u16,
    pub block_size: usize,
    /// Medium-frequency DCT coefficient positions as (row, col).
    pub positions: [(usize, usize); 15],
    /// Minimum fraction of matching magic bits to accept a watermark.
    pub magic_threshold: f64,
    /// Maximum message length in UTF-16 code units.
    pub max_message_units: usize,
}

pub const PROTOCOL: Protocol = Protocol {
    version: 1,
    magic: 0xAC35,
    block_size: BLOCK_SIZE,
    positions: EMBED_POSITIONS,
    magic_threshold: 0.7,
    max_message_units: 1000,
};

pub const BLOCK_SIZE: usize = 8;

/// Positions whose JPEG luminance quantisation steps stay small at moderate
/// quality, so a strength-sized offset survives recompression.
pub const EMBED_POSITIONS: [(usize, usize); 15] = [
    (0, 3),
    (0, 4),
    (1, 2),
    (1, 3),
    (1, 4),
    (2, 1),
    (2, 2),
    (2, 3),
    (3, 0),
    (3, 1),
    (3, 2),
    (3, 3),
    (4, 0),
    (4, 1),
    (4, 2),
];

pub const MAGIC_BITS: usize = 16;
pub const LENGTH_BITS: usize = 16;
/// Frame header: magic + length prefix, in bytes.
pub const FRAME_HEADER_BYTES: usize = (MAGIC_BITS + LENGTH_BITS) / 8;

// Luma weights (ITU-R BT.601)
pub const LUMA_R: f64 = 0.299;
pub const LUMA_G: f64 = 0.587;
pub const LUMA_B: f64 = 0.114;

// Embedding defaults
pub const DEFAULT_STRENGTH: u32 = 15;
pub const DEFAULT_ECC_LEVEL: f64 = 0.5;
pub const DEFAULT_REDUNDANCY: usize = 4;

// Perceptual hash
pub const PHASH_SIZE: usize = 32;
pub const PHASH_DCT_SIZE: usize = 8;
pub const PHASH_BITS: usize = PHASH_DCT_SIZE * PHASH_DCT_SIZE - 1;
pub const DEFAULT_PHASH_THRESHOLD: f64 = 0.8;

// LSB channel
pub const LSB_MAGIC: u16 = 0x4C53; // "LS"
pub const LSB_MAGIC_BITS: usize = 16;
pub const LSB_LENGTH_BITS: usize = 32;
pub const LSB_MAX_MESSAGE_BYTES: usize = 100_000;

// Lossy recompression used by the roundtrip hook
pub const DEFAULT_JPEG_QUALITY: u8 = 70;

/// Number of whole 8x8 blocks in an image.
pub fn blocks_per_image(width: u32, height: u32) -> usize {
    (width as usize / BLOCK_SIZE) * (height as usize / BLOCK_SIZE)
}

/// Number of coefficient slots (one bit each) available in an image.
pub fn bit_capacity(width: u32, height: u32) -> usize {
    blocks_per_image(width, height) * EMBED_POSITIONS.len()
}

/// Parity-symbol count for a payload of `byte_len` bytes.
pub fn parity_symbols(byte_len: usize, ecc_level: f64) -> usize {
    (byte_len as f64 * ecc_level).ceil() as usize
}

/// Runtime configuration for an encode/decode operation.
#[derive(Debug, Clone)]
pub struct WatermarkConfig {
    /// Offset added to each quantised coefficient; the quantisation step is twice this.
    pub strength: u32,
    /// Parity symbols per payload byte.
    pub ecc_level: f64,
    /// Number of full copies of the bitstream to embed.
    pub redundancy: usize,
}

impl WatermarkConfig {
    pub fn quant_step(&self) -> f64 {
        2.0 * self.strength as f64
    }

    /// Total embedded bits for a message of `units` UTF-16 code units.
    pub fn stream_bits(&self, units: usize) -> usize {
        let frame_bytes = FRAME_HEADER_BYTES + 2 * units;
        (frame_bytes + parity_symbols(frame_bytes, self.ecc_level)) * 8
    }
}

impl Default for WatermarkConfig {
    fn default() -> Self {
        Self {
            strength: DEFAULT_STRENGTH,
            ecc_level: DEFAULT_ECC_LEVEL,
            redundancy: DEFAULT_REDUNDANCY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_magic_is_balanced() {
        // An all-zero readout must not pass the magic threshold.
        let ones = PROTOCOL.magic.count_ones() as f64;
        assert!(ones / MAGIC_BITS as f64 <= 0.5);
        assert!((MAGIC_BITS as f64 - ones) / MAGIC_BITS as f64 <= 0.5);
    }

    #[test]
    fn test_positions_are_unique_and_not_dc() {
        for (i, a) in EMBED_POSITIONS.iter().enumerate() {
            assert_ne!(*a, (0, 0));
            assert!(a.0 < BLOCK_SIZE && a.1 < BLOCK_SIZE);
            for b in &EMBED_POSITIONS[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_stream_bits_for_short_message() {
        // "hi": 4 header bytes + 4 message bytes, 4 parity bytes.
        let cfg = WatermarkConfig::default();
        assert_eq!(cfg.stream_bits(2), 96);
    }

    #[test]
    fn test_capacity() {
        assert_eq!(blocks_per_image(64, 64), 64);
        assert_eq!(bit_capacity(64, 64), 960);
        assert_eq!(blocks_per_image(7, 100), 0);
    }
}
