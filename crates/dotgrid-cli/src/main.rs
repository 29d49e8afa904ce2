//! dotgrid CLI — detect overlapping dots, verify and calibrate radius bounds.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use image::RgbImage;
use serde_json::json;

use dotgrid::{
    calibrate_radius_for_reference, detect_overlapping_circles,
    detect_overlapping_circles_tiled_with_observer, verify_reference_color, DetectOptions,
    InkThresholds, MorphologyParams, Palette, ProgressObserver, Rgb, Sensitivity,
};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "dotgrid")]
#[command(about = "Detect overlapping circular dots of known palette colors in halftone images")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect circles for every palette color.
    Detect(DetectArgs),

    /// Verify reference-color detection quality for given radius bounds.
    Verify(VerifyArgs),

    /// Search for the tightest radius bounds that keep every reference dot.
    Calibrate(CalibrateArgs),
}

#[derive(Debug, Clone, Args)]
struct DetectArgs {
    /// Path to the input image.
    #[arg(long)]
    image: PathBuf,

    /// Palette preset (cmyk, rgb, grayscale) or a `R,G,B;R,G,B` list.
    #[arg(long, default_value = "cmyk")]
    palette: String,

    /// Minimum circle radius in pixels.
    #[arg(long, default_value = "80")]
    min_radius: u32,

    /// Maximum circle radius in pixels.
    #[arg(long, default_value = "350")]
    max_radius: u32,

    /// Process in overlapping tiles of this size (0 = whole image).
    #[arg(long, default_value = "0")]
    chunk_size: u32,

    /// Loosen voting thresholds for heavily occluded dots.
    #[arg(long)]
    sensitive: bool,

    /// Dilate/erode masks to reconnect fragmented regions.
    #[arg(long)]
    morphology: bool,

    /// Path to write detection results (JSON); stdout when omitted.
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
struct VerifyArgs {
    /// Path to the input image.
    #[arg(long)]
    image: PathBuf,

    /// Minimum circle radius in pixels.
    #[arg(long)]
    min_radius: u32,

    /// Maximum circle radius in pixels.
    #[arg(long)]
    max_radius: u32,

    /// Reference ink color as `R,G,B`.
    #[arg(long, default_value = "0,0,0")]
    reference: String,

    /// Euclidean tolerance for colored-ink separation.
    #[arg(long, default_value = "100")]
    ink_threshold: u8,

    /// Euclidean tolerance for dark-ink separation.
    #[arg(long, default_value = "60")]
    black_threshold: u8,

    /// Path to write the verification report (JSON); stdout when omitted.
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
struct CalibrateArgs {
    /// Path to the input image.
    #[arg(long)]
    image: PathBuf,

    /// Initial (wide) minimum radius bound.
    #[arg(long, default_value = "10")]
    initial_min: u32,

    /// Initial (wide) maximum radius bound.
    #[arg(long, default_value = "300")]
    initial_max: u32,

    /// Reference ink color as `R,G,B`.
    #[arg(long, default_value = "0,0,0")]
    reference: String,

    /// Euclidean tolerance for colored-ink separation.
    #[arg(long, default_value = "100")]
    ink_threshold: u8,

    /// Euclidean tolerance for dark-ink separation.
    #[arg(long, default_value = "60")]
    black_threshold: u8,

    /// Include the probe history in the output.
    #[arg(long)]
    verbose: bool,

    /// Path to write the calibration report (JSON); stdout when omitted.
    #[arg(long)]
    out: Option<PathBuf>,
}

struct StderrProgress;

impl ProgressObserver for StderrProgress {
    fn tile_completed(&self, completed: usize, total: usize) {
        eprintln!("tile {completed}/{total} done");
    }
}

fn load_image(path: &PathBuf) -> CliResult<RgbImage> {
    Ok(image::open(path)?.to_rgb8())
}

fn parse_color(spec: &str) -> CliResult<Rgb> {
    let parts: Vec<&str> = spec.split(',').collect();
    if parts.len() != 3 {
        return Err(format!("expected `R,G,B`, got `{spec}`").into());
    }
    let mut channels = [0u8; 3];
    for (slot, part) in channels.iter_mut().zip(&parts) {
        *slot = part.trim().parse()?;
    }
    Ok(Rgb(channels))
}

fn write_output(out: &Option<PathBuf>, value: &serde_json::Value) -> CliResult<()> {
    let text = serde_json::to_string_pretty(value)?;
    match out {
        Some(path) => std::fs::write(path, text)?,
        None => println!("{text}"),
    }
    Ok(())
}

fn run_detect(args: DetectArgs) -> CliResult<()> {
    let img = load_image(&args.image)?;
    let palette = Palette::parse(&args.palette)?;
    let options = DetectOptions {
        sensitivity: if args.sensitive {
            Sensitivity::Sensitive
        } else {
            Sensitivity::Normal
        },
        morphology: args.morphology.then(MorphologyParams::default),
        ..DetectOptions::default()
    };

    let circles = if args.chunk_size > 0 {
        detect_overlapping_circles_tiled_with_observer(
            &img,
            &palette,
            args.chunk_size,
            args.min_radius,
            args.max_radius,
            &options,
            Some(&StderrProgress),
        )?
    } else {
        detect_overlapping_circles(&img, &palette, args.min_radius, args.max_radius, &options)?
    };

    let (width, height) = img.dimensions();
    write_output(
        &args.out,
        &json!({
            "image_size": [width, height],
            "circle_count": circles.len(),
            "circles": circles,
        }),
    )
}

fn run_verify(args: VerifyArgs) -> CliResult<()> {
    let img = load_image(&args.image)?;
    let reference = parse_color(&args.reference)?;
    let thresholds = InkThresholds {
        ink_threshold: args.ink_threshold,
        black_threshold: args.black_threshold,
    };
    let result =
        verify_reference_color(&img, args.min_radius, args.max_radius, reference, &thresholds)?;
    write_output(&args.out, &serde_json::to_value(&result)?)
}

fn run_calibrate(args: CalibrateArgs) -> CliResult<()> {
    let img = load_image(&args.image)?;
    let reference = parse_color(&args.reference)?;
    let thresholds = InkThresholds {
        ink_threshold: args.ink_threshold,
        black_threshold: args.black_threshold,
    };
    let result = calibrate_radius_for_reference(
        &img,
        args.initial_min,
        args.initial_max,
        reference,
        &thresholds,
    )?;

    let mut value = serde_json::to_value(&result)?;
    if !args.verbose {
        if let Some(obj) = value.as_object_mut() {
            obj.remove("history");
        }
    }
    write_output(&args.out, &value)
}

fn main() -> CliResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    match Cli::parse().command {
        Commands::Detect(args) => run_detect(args),
        Commands::Verify(args) => run_verify(args),
        Commands::Calibrate(args) => run_calibrate(args),
    }
}
