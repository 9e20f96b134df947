//! bpng demo
//!
//! Synthesizes a test card, runs it through the block transform at every
//! discard setting, and prints container size and reconstruction error
//! next to a lossless PNG of the same pixels.

use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::Result;

use bpng_cli::human_bytes;
use bpng_codecs::{DeflateCompressor, StoredCompressor};
use bpng_core::format::DEFAULT_BLOCK_SIZE;
use bpng_core::{
    Channel, Compressor, Container, ContainerWriter, EncoderConfig, Frame, RoundingPolicy,
    TrailerStatus,
};

// ── constants ──────────────────────────────────────────────────────────────

const CARD_WIDTH: usize = 500;
const CARD_HEIGHT: usize = 375;

// ── test card ──────────────────────────────────────────────────────────────

/// Deterministic test card: smooth gradients on top, hard-edged bars in the
/// middle, fine checkerboard at the bottom. Width and height are deliberately
/// not multiples of every block size, so the untouched remainder shows up.
fn test_card(width: usize, height: usize) -> Result<Frame> {
    let mut rgb = Vec::with_capacity(width * height * 3);
    for y in 0..height {
        for x in 0..width {
            let px: [u8; 3] = if y < height / 2 {
                let fx = x as f64 / width as f64;
                let fy = y as f64 / (height / 2) as f64;
                [
                    (255.0 * fx) as u8,
                    (255.0 * (1.0 - fy) * 0.8 + 30.0) as u8,
                    (255.0 * (fx * fy).sqrt()) as u8,
                ]
            } else if y < height * 3 / 4 {
                const BARS: [[u8; 3]; 8] = [
                    [235, 235, 235],
                    [235, 235, 16],
                    [16, 235, 235],
                    [16, 235, 16],
                    [235, 16, 235],
                    [235, 16, 16],
                    [16, 16, 235],
                    [16, 16, 16],
                ];
                BARS[x * BARS.len() / width]
            } else if (x / 2 + y / 2) % 2 == 0 {
                [200, 200, 200]
            } else {
                [40, 40, 40]
            };
            rgb.extend_from_slice(&px);
        }
    }
    Ok(Frame::from_rgb8(width, height, &rgb)?)
}

// ── measurement ────────────────────────────────────────────────────────────

fn fmt_duration(d: Duration) -> String {
    let ms = d.as_secs_f64() * 1000.0;
    if ms < 1000.0 {
        format!("{:.1} ms", ms)
    } else {
        format!("{:.2} s", d.as_secs_f64())
    }
}

/// Peak signal-to-noise ratio over all three channels, on the 8-bit values
/// a decoder would see.
fn psnr(a: &Frame, b: &Frame) -> f64 {
    let mut sq = 0.0;
    let mut n = 0usize;
    for ch in Channel::ALL {
        for (&x, &y) in a.plane(ch).iter().zip(b.plane(ch)) {
            let d = x.round() - y.round();
            sq += d * d;
            n += 1;
        }
    }
    if sq == 0.0 {
        return f64::INFINITY;
    }
    let mse = sq / n as f64;
    10.0 * (255.0f64 * 255.0 / mse).log10()
}

struct Row {
    label: String,
    bytes: u64,
    psnr: f64,
    elapsed: Duration,
}

fn encode_row(
    label: String,
    source: &Frame,
    config: &EncoderConfig,
    compressor: Box<dyn Compressor>,
    out: &Path,
) -> Result<Row> {
    let mut frame = source.clone();
    let t0 = Instant::now();
    config.transformer()?.run(&mut frame);
    let bytes = ContainerWriter::new(compressor)
        .with_trailer(config.trailer)
        .with_physical(config.physical)
        .write_to_path(&frame, out, true)?;
    Ok(Row {
        label,
        bytes,
        psnr: psnr(source, &frame),
        elapsed: t0.elapsed(),
    })
}

fn print_row(row: &Row, raw: u64) {
    let psnr = if row.psnr.is_infinite() {
        "lossless".to_string()
    } else {
        format!("{:.2} dB", row.psnr)
    };
    println!(
        "  {:<30} {:>12}  {:>7.2}x  {:>10}  {:>10}",
        row.label,
        human_bytes(row.bytes),
        raw as f64 / row.bytes.max(1) as f64,
        psnr,
        fmt_duration(row.elapsed)
    );
}

fn section(title: &str) {
    println!();
    println!("── {title} {}", "─".repeat(66usize.saturating_sub(title.len())));
    println!();
}

fn table_header() {
    println!(
        "  {:<30} {:>12}  {:>8}  {:>10}  {:>10}",
        "Setting", "Size", "Ratio", "PSNR", "Time"
    );
    println!("  {}", "─".repeat(78));
}

// ── demo runner ────────────────────────────────────────────────────────────

fn run() -> Result<()> {
    let out_dir = std::env::temp_dir().join("bpng_demo");
    std::fs::create_dir_all(&out_dir)?;

    println!();
    println!("╔══════════════════════════════════════════════════════════════════╗");
    println!("║        bpng · block-transform compression into PNG containers    ║");
    println!("╚══════════════════════════════════════════════════════════════════╝");

    let card = test_card(CARD_WIDTH, CARD_HEIGHT)?;
    let raw = (CARD_WIDTH * CARD_HEIGHT * 3) as u64;

    // ── baseline ───────────────────────────────────────────────────────────
    section("0 · BASELINE");
    let baseline_path = out_dir.join("card.lossless.png");
    let t0 = Instant::now();
    let mut rgb = Vec::with_capacity(raw as usize);
    for y in 0..CARD_HEIGHT {
        for x in 0..CARD_WIDTH {
            rgb.extend_from_slice(&card.pixel_rgb8(x, y)?);
        }
    }
    image::save_buffer(
        &baseline_path,
        &rgb,
        CARD_WIDTH as u32,
        CARD_HEIGHT as u32,
        image::ColorType::Rgb8,
    )?;
    let baseline = Row {
        label: "image crate PNG (lossless)".into(),
        bytes: std::fs::metadata(&baseline_path)?.len(),
        psnr: f64::INFINITY,
        elapsed: t0.elapsed(),
    };
    println!("  test card      : {CARD_WIDTH}x{CARD_HEIGHT}");
    println!("  raw samples    : {}", human_bytes(raw));
    println!();
    table_header();
    print_row(&baseline, raw);

    // ── discard sweep ──────────────────────────────────────────────────────
    section("1 · DISCARD SWEEP (block 16, deflate)");
    table_header();
    for discard in (0..=10u8).rev() {
        let config = EncoderConfig::default().with_discard(discard).with_parallel(true);
        let path = out_dir.join(format!("card.d{discard}.png"));
        let row = encode_row(
            format!("discard {discard:>2}"),
            &card,
            &config,
            Box::new(DeflateCompressor::default()),
            &path,
        )?;
        print_row(&row, raw);
    }

    // ── block size ─────────────────────────────────────────────────────────
    section("2 · BLOCK SIZE (discard 5)");
    table_header();
    for size in [4usize, 8, DEFAULT_BLOCK_SIZE, 32, 64] {
        let config = EncoderConfig::default()
            .with_block_size(size)
            .with_discard(5)
            .with_parallel(true);
        let path = out_dir.join(format!("card.s{size}.png"));
        let row = encode_row(
            format!("block {size:>2}"),
            &card,
            &config,
            Box::new(DeflateCompressor::default()),
            &path,
        )?;
        print_row(&row, raw);
    }

    // ── rounding and compressor ────────────────────────────────────────────
    section("3 · ROUNDING x COMPRESSOR (discard 5)");
    table_header();
    for rounding in [RoundingPolicy::SnapToSeven, RoundingPolicy::Nearest, RoundingPolicy::None] {
        for stored in [false, true] {
            let compressor: Box<dyn Compressor> = if stored {
                Box::new(StoredCompressor)
            } else {
                Box::new(DeflateCompressor::default())
            };
            let name = compressor.name();
            let config = EncoderConfig::default()
                .with_discard(5)
                .with_rounding(rounding)
                .with_parallel(true);
            let path = out_dir.join(format!("card.{}.{name}.png", rounding.name()));
            let row = encode_row(
                format!("{:<8} / {name}", rounding.name()),
                &card,
                &config,
                compressor,
                &path,
            )?;
            print_row(&row, raw);
        }
    }

    // ── verification ───────────────────────────────────────────────────────
    section("4 · VERIFY");
    let check_path = out_dir.join("card.d5.png");
    let bytes = std::fs::read(&check_path)?;
    let container = Container::parse(&bytes)?;
    let (_, status) = container.decode_scanlines(&DeflateCompressor::default())?;
    let decoded = image::load_from_memory(&bytes)?.to_rgb8();
    println!("  file           : {}", check_path.display());
    println!("  chunks         : {}", container.chunks().len());
    println!(
        "  zlib trailer   : {}",
        if status == TrailerStatus::Valid { "✓ adler32 ok" } else { "⚠ not a valid adler32" }
    );
    println!(
        "  image crate    : {} decoded {}x{}",
        if decoded.dimensions() == (CARD_WIDTH as u32, CARD_HEIGHT as u32) { "✓" } else { "⚠" },
        decoded.width(),
        decoded.height()
    );
    println!();
    println!("  Output files in {}", out_dir.display());
    println!();
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    if let Err(e) = run() {
        eprintln!("demo failed: {e:#}");
        std::process::exit(1);
    }
}
