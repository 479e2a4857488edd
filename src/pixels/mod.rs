//! RGBA pixel buffers and the luma view the robust watermark works on.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::{ColorType, DynamicImage, RgbaImage};
use thiserror::Error;

use crate::config::{BLOCK_SIZE, LUMA_B, LUMA_G, LUMA_R};
use crate::dct::Block;

#[derive(Error, Debug)]
pub enum PixelError {
    #[error("buffer length mismatch: {width}x{height} RGBA needs {expected} bytes, got {got}")]
    BufferSize {
        width: u32,
        height: u32,
        expected: usize,
        got: usize,
    },
    #[error("image has zero width or height")]
    EmptyImage,
    #[error("image codec error: {0}")]
    Codec(#[from] image::ImageError),
}

/// Row-major RGBA image, 4 bytes per pixel. Alpha is carried but never read
/// by the robust path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl PixelBuffer {
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self, PixelError> {
        if width == 0 || height == 0 {
            return Err(PixelError::EmptyImage);
        }
        let expected = width as usize * height as usize * 4;
        if data.len() != expected {
            return Err(PixelError::BufferSize {
                width,
                height,
                expected,
                got: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Image filled with a single opaque colour.
    pub fn filled(width: u32, height: u32, rgb: [u8; 3]) -> Result<Self, PixelError> {
        let pixel = [rgb[0], rgb[1], rgb[2], 255];
        let data = pixel.repeat(width as usize * height as usize);
        Self::new(width, height, data)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    pub fn blocks_x(&self) -> usize {
        self.width as usize / BLOCK_SIZE
    }

    pub fn blocks_y(&self) -> usize {
        self.height as usize / BLOCK_SIZE
    }

    pub fn block_count(&self) -> usize {
        self.blocks_x() * self.blocks_y()
    }

    /// Luma at (x, y): `0.299 R + 0.587 G + 0.114 B`.
    pub fn luma(&self, x: usize, y: usize) -> f64 {
        let i = (y * self.width as usize + x) * 4;
        LUMA_R * self.data[i] as f64 + LUMA_G * self.data[i + 1] as f64 + LUMA_B * self.data[i + 2] as f64
    }

    /// Top-left pixel of block `index` in row-major block order.
    fn block_origin(&self, index: usize) -> (usize, usize) {
        let bx = index % self.blocks_x();
        let by = index / self.blocks_x();
        (bx * BLOCK_SIZE, by * BLOCK_SIZE)
    }

    /// 8x8 luma samples of block `index`.
    pub fn luma_block(&self, index: usize) -> Block {
        let (px, py) = self.block_origin(index);
        let mut block = [[0.0f64; BLOCK_SIZE]; BLOCK_SIZE];
        for (row, samples) in block.iter_mut().enumerate() {
            for (col, sample) in samples.iter_mut().enumerate() {
                *sample = self.luma(px + col, py + row);
            }
        }
        block
    }

    /// Add a luma delta to block `index`.
    ///
    /// The delta is split across R, G and B in proportion to the luma
    /// weights, normalised so the weighted sum reproduces the delta; since
    /// the weights sum to one each channel receives the same offset.
    /// Channels are rounded and clamped to [0, 255].
    pub fn apply_luma_delta(&mut self, index: usize, delta: &Block) {
        let (px, py) = self.block_origin(index);
        let weight_sum = LUMA_R + LUMA_G + LUMA_B;
        let width = self.width as usize;
        for (row, deltas) in delta.iter().enumerate() {
            for (col, &d) in deltas.iter().enumerate() {
                let i = ((py + row) * width + px + col) * 4;
                let offset = d / weight_sum;
                for channel in &mut self.data[i..i + 3] {
                    *channel = (*channel as f64 + offset).round().clamp(0.0, 255.0) as u8;
                }
            }
        }
    }

    pub fn to_rgba_image(&self) -> Option<RgbaImage> {
        RgbaImage::from_raw(self.width, self.height, self.data.clone())
    }

    /// Re-encode through JPEG at `quality` and decode again, as a lossy
    /// re-upload would.
    pub fn recompress_jpeg(&self, quality: u8) -> Result<Self, PixelError> {
        let rgb: Vec<u8> = self
            .data
            .chunks_exact(4)
            .flat_map(|p| [p[0], p[1], p[2]])
            .collect();

        let mut encoded = Vec::new();
        JpegEncoder::new_with_quality(&mut encoded, quality).encode(
            &rgb,
            self.width,
            self.height,
            ColorType::Rgb8,
        )?;

        let decoded = image::load(Cursor::new(encoded), image::ImageFormat::Jpeg)?;
        Ok(Self::from(&decoded))
    }
}

impl From<&DynamicImage> for PixelBuffer {
    fn from(img: &DynamicImage) -> Self {
        let rgba = img.to_rgba8();
        Self {
            width: rgba.width(),
            height: rgba.height(),
            data: rgba.into_raw(),
        }
    }
}

impl From<RgbaImage> for PixelBuffer {
    fn from(img: RgbaImage) -> Self {
        Self {
            width: img.width(),
            height: img.height(),
            data: img.into_raw(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_wrong_length() {
        let result = PixelBuffer::new(2, 2, vec![0; 15]);
        assert!(matches!(result, Err(PixelError::BufferSize { expected: 16, got: 15, .. })));
        assert!(matches!(PixelBuffer::new(0, 4, vec![]), Err(PixelError::EmptyImage)));
    }

    #[test]
    fn test_block_grid() {
        let img = PixelBuffer::filled(70, 33, [0, 0, 0]).unwrap();
        assert_eq!(img.blocks_x(), 8);
        assert_eq!(img.blocks_y(), 4);
        assert_eq!(img.block_count(), 32);
    }

    #[test]
    fn test_luma_of_gray_is_gray() {
        let img = PixelBuffer::filled(8, 8, [128, 128, 128]).unwrap();
        let block = img.luma_block(0);
        assert!((block[3][5] - 128.0).abs() < 1e-9);
    }

    #[test]
    fn test_luma_delta_moves_luma_and_keeps_alpha() {
        let mut img = PixelBuffer::filled(16, 8, [100, 150, 200]).unwrap();
        let before = img.luma(9, 2);
        let mut delta = [[0.0; BLOCK_SIZE]; BLOCK_SIZE];
        delta[2][1] = 10.0;
        img.apply_luma_delta(1, &delta);

        assert!((img.luma(9, 2) - before - 10.0).abs() < 1.0);
        assert_eq!(img.as_bytes()[(2 * 16 + 9) * 4 + 3], 255);
        // Block 0 untouched.
        assert!((img.luma(1, 2) - before).abs() < 1e-9);
    }

    #[test]
    fn test_luma_delta_clamps() {
        let mut img = PixelBuffer::filled(8, 8, [250, 5, 128]).unwrap();
        img.apply_luma_delta(0, &[[20.0; BLOCK_SIZE]; BLOCK_SIZE]);
        assert_eq!(&img.as_bytes()[..4], &[255, 25, 148, 255]);
        img.apply_luma_delta(0, &[[-100.0; BLOCK_SIZE]; BLOCK_SIZE]);
        assert_eq!(&img.as_bytes()[..4], &[155, 0, 48, 255]);
    }

    #[test]
    fn test_recompress_keeps_dimensions() {
        let img = PixelBuffer::filled(24, 16, [90, 120, 30]).unwrap();
        let out = img.recompress_jpeg(70).unwrap();
        assert_eq!((out.width(), out.height()), (24, 16));
        let p = &out.as_bytes()[..3];
        assert!((p[1] as i32 - 120).abs() < 8);
    }
}
