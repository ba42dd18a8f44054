//! Quill CLI
//!
//! Brings a text system up with the swash engine and system fonts, draws the
//! given strings for a number of frames and reports how both caches did.

use anyhow::{Context, Result};
use clap::Parser;
use quill_text::{
    CacheStats, FontSizeClass, Surface, SurfaceFormat, SwashEngine, SystemFontLocator, TextConfig,
    TextSystem,
};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Draw text through the Quill text cache and print cache statistics
#[derive(Parser, Debug)]
#[command(name = "quill")]
#[command(about = "Draw text through the Quill text cache and print cache statistics")]
#[command(version)]
struct Args {
    /// Text configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Font size class: small, medium, tiny or big
    #[arg(short, long, default_value = "medium")]
    size: FontSizeClass,

    /// Number of frames to draw
    #[arg(short, long, default_value = "1")]
    frames: u32,

    /// Write the first string's surface to this file as PGM
    #[arg(long)]
    dump: Option<PathBuf>,

    /// Strings to draw
    #[arg(required = true)]
    text: Vec<String>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => TextConfig::load(path)
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => TextConfig::default(),
    };

    let locator = SystemFontLocator::new(&config.font_dirs);
    let mut system = TextSystem::new(config, SwashEngine::new(), locator)
        .context("Invalid text configuration")?;
    system
        .initialize()
        .context("Failed to initialize text system")?;

    for _ in 0..args.frames {
        for text in &args.text {
            system.width_for(args.size, text);
            if let Err(e) = system.surface_for(args.size, text) {
                tracing::warn!("Frame {}: {}", system.frame(), e);
            }
        }
        system.advance_frame();
    }

    println!("Drew {} string(s) for {} frame(s)", args.text.len(), args.frames);
    print_stats("surfaces", &system.surface_stats());
    print_stats("widths", &system.width_stats());

    if let Some(path) = &args.dump {
        let text = &args.text[0];
        let surface = system
            .surface_for(args.size, text)
            .with_context(|| format!("Failed to render {:?}", text))?;
        write_pgm(path, surface)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!(
            "Wrote {}x{} surface to {}",
            surface.width(),
            surface.height(),
            path.display()
        );
    }

    system.shutdown();
    Ok(())
}

fn print_stats(name: &str, stats: &CacheStats) {
    println!(
        "{:<9} {:>5}/{:<5} live  {:>7} hits  {:>7} misses  {:>6} evictions  {:>5.1}% hit rate",
        name,
        stats.live,
        stats.capacity,
        stats.hits,
        stats.misses,
        stats.evictions,
        stats.hit_rate() * 100.0
    );
}

/// Write a binary (P5) PGM with ink drawn dark on white
fn write_pgm(path: &Path, surface: &Surface) -> std::io::Result<()> {
    let mut out = std::io::BufWriter::new(std::fs::File::create(path)?);
    write!(out, "P5\n{} {}\n255\n", surface.width(), surface.height())?;

    let pitch = surface.pitch() as usize;
    let width = surface.width() as usize;
    for row in surface.pixels().chunks(pitch.max(1)) {
        let gray: Vec<u8> = row[..width]
            .iter()
            .map(|&p| match surface.format() {
                SurfaceFormat::Mono => if p != 0 { 0 } else { 255 },
                SurfaceFormat::Gray => 255 - p,
            })
            .collect();
        out.write_all(&gray)?;
    }
    out.flush()
}
