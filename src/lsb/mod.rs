//! Legacy least-significant-bit channel.
//!
//! Layout: 16-bit magic, 32-bit big-endian byte length, then the UTF-8
//! message, one bit per R, G and B byte (alpha bytes are skipped).

use byteorder::{BigEndian, ByteOrder};
use log::debug;
use thiserror::Error;

use crate::config::{LSB_LENGTH_BITS, LSB_MAGIC, LSB_MAGIC_BITS, LSB_MAX_MESSAGE_BYTES};
use crate::pixels::PixelBuffer;
use crate::watermark::frame::{bits_to_bytes, bytes_to_bits};

const HEADER_BITS: usize = LSB_MAGIC_BITS + LSB_LENGTH_BITS;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum LsbError {
    #[error("image too small: message needs {needed} pixels, image has {available}")]
    Capacity { needed: usize, available: usize },

    #[error("message of {0} bytes is outside 1..={max}", max = LSB_MAX_MESSAGE_BYTES)]
    InvalidLength(usize),
}

/// Indices of the bytes that carry data: every byte except alpha.
fn carrier_indices(image: &PixelBuffer) -> impl Iterator<Item = usize> {
    (0..image.as_bytes().len()).filter(|i| i % 4 != 3)
}

fn read_bits(image: &PixelBuffer, skip: usize, count: usize) -> Vec<u8> {
    let bytes = image.as_bytes();
    carrier_indices(image)
        .skip(skip)
        .take(count)
        .map(|i| bytes[i] & 1)
        .collect()
}

/// Hide `message` in the low bits of a copy of `image`.
///
/// Only messages of 1 to 100 000 UTF-8 bytes are accepted; [`decode`] treats
/// any other declared length as noise.
pub fn encode(image: &PixelBuffer, message: &str) -> Result<PixelBuffer, LsbError> {
    let payload = message.as_bytes();
    if payload.is_empty() || payload.len() > LSB_MAX_MESSAGE_BYTES {
        return Err(LsbError::InvalidLength(payload.len()));
    }
    let total_bits = HEADER_BITS + payload.len() * 8;
    let needed = total_bits.div_ceil(3);
    if needed > image.pixel_count() {
        return Err(LsbError::Capacity {
            needed,
            available: image.pixel_count(),
        });
    }

    let mut header = [0u8; HEADER_BITS / 8];
    BigEndian::write_u16(&mut header[0..2], LSB_MAGIC);
    BigEndian::write_u32(&mut header[2..6], payload.len() as u32);

    let mut bits = bytes_to_bits(&header);
    bits.extend(bytes_to_bits(payload));

    let mut output = image.clone();
    let indices: Vec<usize> = carrier_indices(image).take(bits.len()).collect();
    let data = output.as_bytes_mut();
    for (index, bit) in indices.into_iter().zip(bits) {
        data[index] = (data[index] & 0xFE) | bit;
    }

    debug!("lsb: embedded {} bits", total_bits);
    Ok(output)
}

pub fn decode(image: &PixelBuffer) -> Option<String> {
    let header = bits_to_bytes(&read_bits(image, 0, HEADER_BITS));
    if header.len() < HEADER_BITS / 8 || BigEndian::read_u16(&header[0..2]) != LSB_MAGIC {
        return None;
    }

    let len = BigEndian::read_u32(&header[2..6]) as usize;
    if len == 0 || len > LSB_MAX_MESSAGE_BYTES {
        debug!("lsb: implausible length {}", len);
        return None;
    }
    if HEADER_BITS + len * 8 > image.pixel_count() * 3 {
        return None;
    }

    let payload = bits_to_bytes(&read_bits(image, HEADER_BITS, len * 8));
    String::from_utf8(payload).ok()
}

/// Fast path: only the 16-bit magic is inspected.
pub fn has_hidden_data(image: &PixelBuffer) -> bool {
    let magic = bits_to_bytes(&read_bits(image, 0, LSB_MAGIC_BITS));
    magic.len() == 2 && BigEndian::read_u16(&magic) == LSB_MAGIC
}
