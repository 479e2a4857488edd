pub mod config;
pub mod dct;
pub mod ecc;
pub mod gf;
pub mod lsb;
pub mod phash;
pub mod pipeline;
mod pixels;
pub mod rng;
pub mod watermark;

pub use config::WatermarkConfig;
pub use ecc::{EccError, ReedSolomonCode};
pub use gf::GfError;
pub use lsb::LsbError;
pub use phash::{verify_perceptual_hash, HashMatch, PerceptualHash};
pub use pipeline::hook::{JpegRecompressHook, NoopHook, PipelineHook};
pub use pipeline::{roundtrip, RoundtripResult};
pub use pixels::{PixelBuffer, PixelError};
pub use rng::{RngSession, SeededRng};
pub use watermark::{decode, decode_with, encode, DecodeResult, EncodeResult};
