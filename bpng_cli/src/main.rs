use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};
use log::{debug, error};

use bpng_cli::human_bytes;
use bpng_codecs::{compressor_by_name, DeflateCompressor};
use bpng_core::format::{DEFAULT_BLOCK_SIZE, DEFAULT_PIXELS_PER_UNIT};
use bpng_core::quant::DISCARD_NONE;
use bpng_core::{
    Container, ContainerWriter, EncoderConfig, Error, Frame, PhysicalPixels, PixelUnit,
    RoundingPolicy, TrailerPolicy, TrailerStatus,
};

const EXIT_IMPORT_FAILURE: u8 = 1;
const EXIT_WRITE_FAILURE: u8 = 2;

// ── CLI definition ─────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "bpng",
    about = "Block-transform image compressor writing PNG containers",
    version
)]
struct Cli {
    /// Log debug output (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compress an image and write it as a PNG container
    Encode {
        /// Source image (PNG, JPEG, BMP, GIF)
        input: PathBuf,
        /// Destination file
        output: PathBuf,
        /// Edge length of the square transform blocks, in pixels
        #[arg(short, long, default_value_t = DEFAULT_BLOCK_SIZE)]
        block_size: usize,
        /// Discard parameter: 10 keeps every coefficient, lower drops more
        #[arg(short, long, default_value_t = DISCARD_NONE,
              value_parser = clap::value_parser!(u8).range(0..=10))]
        discard: u8,
        /// Post-transform rounding: snap7 | nearest | none
        #[arg(short, long, default_value = "snap7")]
        rounding: String,
        /// zlib trailer: adler32 | zero
        #[arg(long, default_value = "adler32")]
        trailer: String,
        /// Compressor for the pixel payload: deflate | stored
        #[arg(short, long, default_value = "deflate")]
        compressor: String,
        /// Deflate level (0-9, only used with --compressor deflate)
        #[arg(long, default_value_t = 9)]
        level: u32,
        /// Pixels per unit, both axes
        #[arg(long, default_value_t = DEFAULT_PIXELS_PER_UNIT)]
        ppu: u64,
        /// Interpret --ppu as pixels per metre instead of an aspect ratio
        #[arg(long)]
        metre: bool,
        /// Transform block rows on all cores
        #[arg(short, long)]
        parallel: bool,
        /// Replace the output file if it already exists
        #[arg(short, long)]
        force: bool,
    },
    /// Print the header, chunk table and trailer status of a container
    Inspect {
        /// File to inspect
        file: PathBuf,
        /// Print per-chunk details
        #[arg(long)]
        chunks: bool,
    },
}

// ── Helpers ────────────────────────────────────────────────────────────────

/// Decode `path` into a frame. Every failure is an import error.
fn import_frame(path: &Path) -> Result<Frame, Error> {
    let img = image::open(path).map_err(|e| Error::Import(format!("{}: {}", path.display(), e)))?;
    let rgb = img.to_rgb8();
    let (w, h) = rgb.dimensions();
    debug!("imported {}: {}x{}", path.display(), w, h);
    Frame::from_rgb8(w as usize, h as usize, rgb.as_raw())
}

/// Map a failure onto the process exit code.
fn exit_code_for(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<Error>() {
        Some(Error::Import(_)) => EXIT_IMPORT_FAILURE,
        _ => EXIT_WRITE_FAILURE,
    }
}

// ── Subcommand implementations ─────────────────────────────────────────────

#[allow(clippy::too_many_arguments)]
fn run_encode(
    input: PathBuf,
    output: PathBuf,
    block_size: usize,
    discard: u8,
    rounding: &str,
    trailer: &str,
    compressor_name: &str,
    level: u32,
    ppu: u64,
    metre: bool,
    parallel: bool,
    force: bool,
) -> anyhow::Result<()> {
    let rounding = RoundingPolicy::from_name(rounding)
        .with_context(|| format!("unknown rounding '{}'. Valid options: snap7, nearest, none", rounding))?;
    let trailer = TrailerPolicy::from_name(trailer)
        .with_context(|| format!("unknown trailer '{}'. Valid options: adler32, zero", trailer))?;
    let compressor = compressor_by_name(compressor_name, level)?;
    let compressor_display = compressor.name();

    let config = EncoderConfig::default()
        .with_block_size(block_size)
        .with_discard(discard)
        .with_rounding(rounding)
        .with_trailer(trailer)
        .with_physical(PhysicalPixels {
            ppu_x: ppu,
            ppu_y: ppu,
            unit: if metre { PixelUnit::Metre } else { PixelUnit::Unknown },
        })
        .with_parallel(parallel);

    let mut frame = import_frame(&input)?;
    let raw_size = (frame.width() * frame.height() * 3) as u64;

    let t0 = Instant::now();
    let stats = config.transformer()?.run(&mut frame);
    let written = ContainerWriter::new(compressor)
        .with_trailer(config.trailer)
        .with_physical(config.physical)
        .write_to_path(&frame, &output, force)?;
    let elapsed = t0.elapsed();
    debug!("wrote {} bytes to {}", written, output.display());

    eprintln!("  image       : {}x{}", frame.width(), frame.height());
    eprintln!("  block size  : {}", block_size);
    eprintln!(
        "  blocks      : {} ({} cols, {} rows untouched)",
        stats.blocks(),
        stats.skipped_columns,
        stats.skipped_rows
    );
    eprintln!("  discard     : {}", discard);
    eprintln!("  rounding    : {}", rounding.name());
    eprintln!("  compressor  : {}", compressor_display);
    eprintln!("  trailer     : {}", trailer.name());
    eprintln!("  raw size    : {}", human_bytes(raw_size));
    eprintln!("  output      : {}", human_bytes(written));
    eprintln!("  ratio       : {:.2}x", raw_size as f64 / written.max(1) as f64);
    eprintln!("  elapsed     : {:.3}s", elapsed.as_secs_f64());
    Ok(())
}

fn run_inspect(file: PathBuf, show_chunks: bool) -> anyhow::Result<()> {
    let bytes = std::fs::read(&file).with_context(|| format!("reading {:?}", file))?;
    let container = Container::parse(&bytes)?;
    let header = &container.header;

    println!("=== {:?} ===", file);
    println!();
    println!("  dimensions     : {}x{}", header.width, header.height);
    println!("  bit depth      : {}", header.bit_depth);
    println!("  color type     : {}", header.color_type);
    println!(
        "  methods        : compression {} / filter {} / interlace {}",
        header.compression, header.filter, header.interlace
    );
    match container.physical {
        Some(p) => println!("  pixels/unit    : {} x {} ({:?})", p.ppu_x, p.ppu_y, p.unit),
        None => println!("  pixels/unit    : (no physical-pixel chunk)"),
    }
    println!("  file size      : {}", human_bytes(bytes.len() as u64));
    println!("  image data     : {}", human_bytes(container.image_data().len() as u64));

    let (raw, status) = container.decode_scanlines(&DeflateCompressor::default())?;
    println!("  scanlines      : {}", human_bytes(raw.len() as u64));
    match status {
        TrailerStatus::Valid => println!("  zlib trailer   : adler32 ok"),
        TrailerStatus::ZeroFilled => println!("  zlib trailer   : zero-filled"),
        TrailerStatus::Mismatch { stored, computed } => println!(
            "  zlib trailer   : MISMATCH stored {:08x}, computed {:08x}",
            stored, computed
        ),
    }

    if show_chunks {
        println!();
        println!("  {:>6}  {:>10}  {:>12}  {:>8}", "tag", "offset", "length", "crc");
        println!("  {}", "-".repeat(44));
        for c in container.chunks() {
            println!(
                "  {:>6}  {:>10}  {:>12}  {:08x}",
                c.tag.to_string(),
                c.offset,
                c.data.len(),
                c.declared_crc
            );
        }
    }

    Ok(())
}

// ── Entry point ────────────────────────────────────────────────────────────

fn main() -> ExitCode {
    let cli = Cli::parse();
    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

    let result = match cli.command {
        Commands::Encode {
            input,
            output,
            block_size,
            discard,
            rounding,
            trailer,
            compressor,
            level,
            ppu,
            metre,
            parallel,
            force,
        } => run_encode(
            input,
            output,
            block_size,
            discard,
            &rounding,
            &trailer,
            &compressor,
            level,
            ppu,
            metre,
            parallel,
            force,
        ),
        Commands::Inspect { file, chunks } => run_inspect(file, chunks),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{:#}", err);
            eprintln!("error: {:#}", err);
            ExitCode::from(exit_code_for(&err))
        }
    }
}
