use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use lumamark::config::{
    DEFAULT_ECC_LEVEL, DEFAULT_JPEG_QUALITY, DEFAULT_PHASH_THRESHOLD, DEFAULT_REDUNDANCY,
    DEFAULT_STRENGTH,
};
use lumamark::pipeline::{self, decode, encode};
use lumamark::{JpegRecompressHook, PerceptualHash, WatermarkConfig};

/// lumamark: robust, key-placed image watermarks that survive recompression.
#[derive(Parser)]
#[command(name = "lumamark", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct EmbedArgs {
    /// Quantisation offset per coefficient (default: 15)
    #[arg(long, default_value_t = DEFAULT_STRENGTH)]
    strength: u32,

    /// Reed-Solomon parity symbols per payload byte (default: 0.5)
    #[arg(long, default_value_t = DEFAULT_ECC_LEVEL)]
    ecc_level: f64,

    /// Copies of the bitstream to embed (default: 4)
    #[arg(long, default_value_t = DEFAULT_REDUNDANCY)]
    redundancy: usize,
}

impl EmbedArgs {
    fn config(&self) -> WatermarkConfig {
        WatermarkConfig {
            strength: self.strength,
            ecc_level: self.ecc_level,
            redundancy: self.redundancy,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Embed a robust watermark
    Encode {
        /// Input image path
        #[arg(short, long)]
        input: PathBuf,

        /// Output image path (use .png to keep the image lossless)
        #[arg(short, long)]
        output: PathBuf,

        /// Message to embed (at most 1000 UTF-16 units)
        #[arg(short, long)]
        message: String,

        /// Placement key
        #[arg(short, long)]
        key: String,

        #[command(flatten)]
        embed: EmbedArgs,
    },

    /// Extract a robust watermark from one or more images
    Decode {
        /// Input image paths
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Placement key used at encode time
        #[arg(short, long)]
        key: String,

        #[command(flatten)]
        embed: EmbedArgs,
    },

    /// Compare an image against a stored perceptual hash
    Verify {
        /// Input image path
        #[arg(short, long)]
        input: PathBuf,

        /// Perceptual hash printed by `encode` (16 hex digits)
        #[arg(long)]
        hash: String,

        /// Minimum similarity to report a match (default: 0.8)
        #[arg(long, default_value_t = DEFAULT_PHASH_THRESHOLD)]
        threshold: f64,
    },

    /// Hide a message in the least significant bits (lossless formats only)
    LsbEncode {
        #[arg(short, long)]
        input: PathBuf,

        #[arg(short, long)]
        output: PathBuf,

        #[arg(short, long)]
        message: String,
    },

    /// Read a least-significant-bit message
    LsbDecode {
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Embed, recompress as JPEG, and extract again
    Roundtrip {
        #[arg(short, long)]
        input: PathBuf,

        #[arg(short, long)]
        message: String,

        #[arg(short, long)]
        key: String,

        /// JPEG quality for the simulated re-upload (default: 70)
        #[arg(long, default_value_t = DEFAULT_JPEG_QUALITY)]
        quality: u8,

        #[command(flatten)]
        embed: EmbedArgs,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Encode {
            input,
            output,
            message,
            key,
            embed,
        } => {
            let result = encode::encode_file(&input, &output, &message, &key, &embed.config())?;
            println!("perceptual-hash: {}", result.perceptual_hash);
            println!("bits-embedded: {}", result.bits_embedded);
        }

        Commands::Decode { inputs, key, embed } => {
            let cfg = embed.config();
            if let [input] = inputs.as_slice() {
                let result = decode::decode_file(input, &key, &cfg)?;
                print_verdict(input, &result);
            } else {
                for (path, result) in decode::decode_files(&inputs, &key, &cfg)? {
                    match result {
                        Ok(result) => print_verdict(&path, &result),
                        Err(e) => eprintln!("{}: {:#}", path.display(), e),
                    }
                }
            }
        }

        Commands::Verify {
            input,
            hash,
            threshold,
        } => {
            let stored: PerceptualHash = hash.parse().context("invalid --hash")?;
            let result = decode::verify_file(&input, &stored, threshold)?;
            println!("match: {}", result.is_match);
            println!("similarity: {:.4}", result.similarity);
        }

        Commands::LsbEncode {
            input,
            output,
            message,
        } => {
            encode::lsb_encode_file(&input, &output, &message)?;
        }

        Commands::LsbDecode { input } => match decode::lsb_decode_file(&input)? {
            Some(message) => println!("{message}"),
            None => println!("no hidden message"),
        },

        Commands::Roundtrip {
            input,
            message,
            key,
            quality,
            embed,
        } => {
            let pixels = encode::load_image(&input)?;
            let result = pipeline::roundtrip(
                &pixels,
                &message,
                &key,
                &embed.config(),
                &JpegRecompressHook { quality },
            )?;
            println!("matched: {}", result.matched);
            println!("confidence: {:.4}", result.decoded.confidence);
            println!("hash-similarity: {:.4}", result.hash_similarity);
        }
    }

    Ok(())
}

fn print_verdict(path: &std::path::Path, result: &lumamark::DecodeResult) {
    match &result.message {
        Some(message) if result.found => println!(
            "{}: found (confidence {:.3}): {}",
            path.display(),
            result.confidence,
            message
        ),
        _ => println!(
            "{}: not found (confidence {:.3})",
            path.display(),
            result.confidence
        ),
    }
}
