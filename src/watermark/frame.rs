use byteorder::{BigEndian, ByteOrder};
use log::warn;

use crate::config::{FRAME_HEADER_BYTES, PROTOCOL};

/// UTF-16 units of `message`, truncated to the protocol maximum.
pub fn message_units(message: &str) -> Vec<u16> {
    let mut units: Vec<u16> = message.encode_utf16().collect();
    if units.len() > PROTOCOL.max_message_units {
        warn!(
            "message of {} UTF-16 units truncated to {}",
            units.len(),
            PROTOCOL.max_message_units
        );
        units.truncate(PROTOCOL.max_message_units);
    }
    units
}

/// `magic ‖ u16 length ‖ UTF-16BE units`.
pub fn build_frame(units: &[u16]) -> Vec<u8> {
    let mut frame = vec![0u8; FRAME_HEADER_BYTES + 2 * units.len()];
    BigEndian::write_u16(&mut frame[0..2], PROTOCOL.magic);
    BigEndian::write_u16(&mut frame[2..4], units.len() as u16);
    BigEndian::write_u16_into(units, &mut frame[FRAME_HEADER_BYTES..]);
    frame
}

/// Recover the message text from frame bytes (header included).
///
/// A length field that overruns the available bytes is clipped.
pub fn parse_frame(frame: &[u8]) -> String {
    if frame.len() < FRAME_HEADER_BYTES {
        return String::new();
    }
    let declared = BigEndian::read_u16(&frame[2..4]) as usize;
    let available = (frame.len() - FRAME_HEADER_BYTES) / 2;
    let count = declared.min(available);

    let mut units = vec![0u16; count];
    BigEndian::read_u16_into(
        &frame[FRAME_HEADER_BYTES..FRAME_HEADER_BYTES + 2 * count],
        &mut units,
    );
    String::from_utf16_lossy(&units)
}

/// Unpack bytes MSB first.
pub fn bytes_to_bits(bytes: &[u8]) -> Vec<u8> {
    bytes
        .iter()
        .flat_map(|&byte| (0..8).map(move |i| (byte >> (7 - i)) & 1))
        .collect()
}

/// Pack bits MSB first; a trailing partial byte is zero-padded.
pub fn bits_to_bytes(bits: &[u8]) -> Vec<u8> {
    bits.chunks(8)
        .map(|chunk| {
            chunk
                .iter()
                .enumerate()
                .fold(0u8, |byte, (i, &bit)| byte | ((bit & 1) << (7 - i)))
        })
        .collect()
}
