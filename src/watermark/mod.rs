//! Robust DCT-domain watermark.
//!
//! A frame (`magic ‖ length ‖ UTF-16 message`) is Reed-Solomon protected,
//! unpacked to bits and spread over key-shuffled 8x8 luma blocks, one bit per
//! medium-frequency coefficient, `redundancy` times. Extraction replays the
//! same [`RngSession`](crate::rng::RngSession) and majority-votes the copies.

mod embed;
mod extract;
pub(crate) mod frame;

pub use embed::encode;
pub use extract::{decode, decode_with};

use crate::phash::PerceptualHash;
use crate::pixels::PixelBuffer;

/// Output of [`encode`].
#[derive(Debug, Clone)]
pub struct EncodeResult {
    /// Watermarked copy; the input buffer is never modified.
    pub image: PixelBuffer,
    /// Fingerprint of the watermarked image.
    pub perceptual_hash: PerceptualHash,
    /// Coefficient slots written (stream bits times copies that fit).
    pub bits_embedded: usize,
}

/// Verdict of [`decode`]. A missing or unreadable watermark is not an error.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodeResult {
    pub found: bool,
    /// Fraction of the 16 magic bits that matched.
    pub confidence: f64,
    pub message: Option<String>,
}

impl DecodeResult {
    pub fn not_found(confidence: f64) -> Self {
        Self {
            found: false,
            confidence,
            message: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{WatermarkConfig, DEFAULT_JPEG_QUALITY, PROTOCOL};
    use rand::distributions::Alphanumeric;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn gradient(width: u32, height: u32) -> PixelBuffer {
        let mut data = Vec::with_capacity((width * height * 4) as usize);
        for y in 0..height {
            for x in 0..width {
                let r = 60 + x * 100 / width;
                let g = 80 + y * 100 / height;
                data.extend_from_slice(&[r as u8, g as u8, 120, 255]);
            }
        }
        PixelBuffer::new(width, height, data).unwrap()
    }

    #[test]
    fn test_gray_64_scenario() {
        let img = PixelBuffer::filled(64, 64, [128, 128, 128]).unwrap();
        let cfg = WatermarkConfig::default();
        let encoded = encode(&img, "hi", "test", &cfg);
        assert_eq!(encoded.bits_embedded, 96 * 4);

        let result = decode(&encoded.image, "test");
        assert!(result.found);
        assert_eq!(result.message.as_deref(), Some("hi"));
        assert!(result.confidence > 0.6);
    }

    #[test]
    fn test_roundtrip_large_image() {
        let img = gradient(400, 400);
        let msg = "Captured 2026-10-17 by camera #3, ünïcödé ok";
        let encoded = encode(&img, msg, "studio-key", &WatermarkConfig::default());

        let result = decode(&encoded.image, "studio-key");
        assert!(result.found);
        assert!(result.confidence > 0.6);
        assert_eq!(result.message.as_deref(), Some(msg));
    }

    #[test]
    fn test_roundtrip_long_message() {
        let img = PixelBuffer::filled(800, 800, [140, 130, 120]).unwrap();
        let msg: String = "authentic-".repeat(100);
        assert_eq!(msg.len(), 1000);
        let encoded = encode(&img, &msg, "k", &WatermarkConfig::default());
        let result = decode(&encoded.image, "k");
        assert!(result.found);
        assert_eq!(result.message.as_deref(), Some(msg.as_str()));
    }

    #[test]
    fn test_input_is_not_mutated() {
        let img = gradient(64, 64);
        let copy = img.clone();
        let encoded = encode(&img, "x", "k", &WatermarkConfig::default());
        assert_eq!(img, copy);
        assert_ne!(encoded.image, img);
    }

    #[test]
    fn test_wrong_keys_are_rejected() {
        let img = gradient(400, 400);
        let encoded = encode(&img, "owner: alice", "right-key", &WatermarkConfig::default());

        let mut rng = StdRng::seed_from_u64(7);
        let mut false_positives = 0;
        for _ in 0..20 {
            let key: String = (&mut rng)
                .sample_iter(&Alphanumeric)
                .take(12)
                .map(char::from)
                .collect();
            let result = decode(&encoded.image, &key);
            assert_eq!(result.found, result.confidence >= PROTOCOL.magic_threshold);
            if result.found && result.message.as_deref() == Some("owner: alice") {
                panic!("wrong key {key} recovered the message");
            }
            if result.found {
                false_positives += 1;
            }
        }
        // A 16-bit magic at a 0.7 threshold passes by chance about 4% of the time.
        assert!(false_positives <= 3);
    }

    #[test]
    fn test_survives_jpeg_recompression() {
        let img = gradient(400, 400);
        let encoded = encode(&img, "survives q70", "jpeg-key", &WatermarkConfig::default());
        let recompressed = encoded.image.recompress_jpeg(DEFAULT_JPEG_QUALITY).unwrap();

        let result = decode(&recompressed, "jpeg-key");
        assert!(result.found);
        assert!(result.confidence > 0.6);
        assert_eq!(result.message.as_deref(), Some("survives q70"));
    }

    #[test]
    fn test_unmarked_image_is_not_found() {
        let img = gradient(128, 128);
        let mut found = 0;
        for i in 0..10 {
            let result = decode(&img, &format!("any-{i}"));
            assert_eq!(result.found, result.confidence >= PROTOCOL.magic_threshold);
            assert_eq!(result.found, result.message.is_some());
            if result.found {
                found += 1;
            }
        }
        assert!(found <= 2);
    }

    fn textured(width: u32, height: u32, amplitude: i32, seed: u64) -> PixelBuffer {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut data = Vec::with_capacity((width * height * 4) as usize);
        for y in 0..height {
            for x in 0..width {
                let base = 60 + (x + y) as i32 * 120 / (width + height) as i32;
                let v = (base + rng.gen_range(-amplitude..=amplitude)).clamp(0, 255) as u8;
                data.extend_from_slice(&[v, v, v, 255]);
            }
        }
        PixelBuffer::new(width, height, data).unwrap()
    }

    #[test]
    fn test_found_follows_magic_threshold_on_textured_images() {
        for (amplitude, seed) in [(20, 1), (20, 2), (35, 3), (60, 4)] {
            let img = textured(400, 400, amplitude, seed);
            let encoded = encode(&img, "hello world", "k", &WatermarkConfig::default());
            for candidate in [
                encoded.image.clone(),
                encoded.image.recompress_jpeg(DEFAULT_JPEG_QUALITY).unwrap(),
            ] {
                let result = decode(&candidate, "k");
                assert_eq!(
                    result.found,
                    result.confidence >= PROTOCOL.magic_threshold,
                    "amplitude {amplitude}: {result:?}"
                );
                assert_eq!(result.found, result.message.is_some());
            }
        }
    }

    #[test]
    fn test_degenerate_image() {
        let img = PixelBuffer::filled(7, 300, [10, 10, 10]).unwrap();
        let encoded = encode(&img, "hello", "k", &WatermarkConfig::default());
        assert_eq!(encoded.bits_embedded, 0);
        assert_eq!(encoded.image, img);
        assert_eq!(decode(&img, "k"), DecodeResult::not_found(0.0));
    }

    #[test]
    fn test_reduced_redundancy_still_decodes() {
        // 16x16 = 4 blocks = 60 slots: fewer than the 4 x 32 bits an empty
        // frame without parity asks for.
        let img = PixelBuffer::filled(16, 16, [100, 100, 100]).unwrap();
        let cfg = WatermarkConfig {
            ecc_level: 0.0,
            ..WatermarkConfig::default()
        };
        let encoded = encode(&img, "", "small", &cfg);
        assert_eq!(encoded.bits_embedded, 60);

        let result = decode_with(&encoded.image, "small", &cfg);
        assert!(result.found);
        assert_eq!(result.message.as_deref(), Some(""));
    }

    #[test]
    fn test_custom_strength_and_redundancy() {
        let img = gradient(200, 200);
        let cfg = WatermarkConfig {
            strength: 25,
            ecc_level: 1.0,
            redundancy: 6,
        };
        let encoded = encode(&img, "tuned", "k2", &cfg);
        let result = decode_with(&encoded.image, "k2", &cfg);
        assert!(result.found);
        assert_eq!(result.message.as_deref(), Some("tuned"));
    }

    #[test]
    fn test_hash_reported_for_output() {
        let img = gradient(96, 96);
        let encoded = encode(&img, "h", "k", &WatermarkConfig::default());
        assert_eq!(encoded.perceptual_hash, crate::phash::compute(&encoded.image));
    }

    #[test]
    fn test_random_keys_and_messages_roundtrip() {
        let img = gradient(160, 160);
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..5 {
            let key: String = (&mut rng).sample_iter(&Alphanumeric).take(8).map(char::from).collect();
            let len = rng.gen_range(1..20);
            let msg: String = (&mut rng).sample_iter(&Alphanumeric).take(len).map(char::from).collect();
            let encoded = encode(&img, &msg, &key, &WatermarkConfig::default());
            let result = decode(&encoded.image, &key);
            assert_eq!(result.message.as_deref(), Some(msg.as_str()), "key {key}");
        }
    }
}
