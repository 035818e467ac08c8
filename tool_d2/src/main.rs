mod filemanager;
mod palfile;

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::mpsc;
use std::thread;

use clap::{Args, Parser, Subcommand, ValueEnum};
use lib_d2::constants::FORMAT_NAME;
use lib_d2::matcher::{MatchStrategy, Metric};
use lib_d2::pipeline::ConvertedTexture;
use lib_d2::quantize::QuantizeMethod;
use lib_d2::task::{Progress, TaskContext};
use lib_d2::texture::{DecodeError, Rotation};
use lib_d2::{PipelineError, TextureConverter, TextureFormat, TextureSettings};
use log::{error, info};
use thiserror::Error;

use crate::filemanager::FileError;

#[derive(Error, Debug)]
enum ToolError {
    #[error(transparent)]
    File(#[from] FileError),

    #[error("Conversion failed: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("Preview failed: {0}")]
    Preview(#[from] DecodeError),

    #[error("Could not set up logging: {0}")]
    Logging(#[from] io::Error),

    #[error("Conversion worker panicked")]
    WorkerPanicked,
}

#[derive(Copy, Clone, ValueEnum)]
enum CliStrategy {
    ForceMap,
    Fit,
    BestFit,
}

impl From<CliStrategy> for MatchStrategy {
    fn from(value: CliStrategy) -> Self {
        match value {
            CliStrategy::ForceMap => MatchStrategy::ForceMap,
            CliStrategy::Fit => MatchStrategy::Fit,
            CliStrategy::BestFit => MatchStrategy::BestFit,
        }
    }
}

#[derive(Copy, Clone, ValueEnum)]
enum CliMetric {
    Euclidean,
    Weighted,
    Manhattan,
    Lab,
}

impl From<CliMetric> for Metric {
    fn from(value: CliMetric) -> Self {
        match value {
            CliMetric::Euclidean => Metric::Euclidean,
            CliMetric::Weighted => Metric::WeightedRgb,
            CliMetric::Manhattan => Metric::Manhattan,
            CliMetric::Lab => Metric::LabDeltaE,
        }
    }
}

#[derive(Copy, Clone, ValueEnum)]
enum CliQuantizer {
    MedianCut,
    Sample,
}

impl From<CliQuantizer> for QuantizeMethod {
    fn from(value: CliQuantizer) -> Self {
        match value {
            CliQuantizer::MedianCut => QuantizeMethod::MedianCut,
            CliQuantizer::Sample => QuantizeMethod::SimpleSample,
        }
    }
}

fn parse_format(s: &str) -> Result<TextureFormat, String> {
    s.parse()
}

fn parse_rotation(s: &str) -> Result<Rotation, String> {
    let degrees: u32 = s.parse().map_err(|e| format!("{e}"))?;
    Rotation::from_degrees(degrees).ok_or_else(|| format!("{degrees} is not 0, 90, 180 or 270"))
}

fn parse_color_count(s: &str) -> Result<usize, String> {
    let count: usize = s.parse().map_err(|e| format!("{e}"))?;
    if (lib_d2::constants::MIN_COLOR_COUNT..=lib_d2::constants::MAX_COLOR_COUNT).contains(&count) {
        Ok(count)
    } else {
        Err(format!("color count must be between 2 and 256, got {count}"))
    }
}

#[derive(Args)]
struct EncodeArgs {
    /// Source image (png, jpg, bmp, webp, tga, gif)
    input: PathBuf,

    #[arg(short, long)]
    output: PathBuf,

    #[arg(short, long, default_value = "i8", value_parser = parse_format)]
    format: TextureFormat,

    /// Colors to quantize to when no palette file is given
    #[arg(short, long, value_parser = parse_color_count)]
    colors: Option<usize>,

    #[arg(long, value_enum, default_value_t = CliQuantizer::MedianCut)]
    quantizer: CliQuantizer,

    /// JASC-PAL palette to match against instead of quantizing
    #[arg(short, long)]
    palette: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = CliStrategy::Fit)]
    strategy: CliStrategy,

    /// First palette entry of the window for sub-8bpp formats
    #[arg(long, default_value_t = 0)]
    offset: usize,

    #[arg(long, value_enum, default_value_t = CliMetric::Euclidean)]
    metric: CliMetric,

    #[arg(long)]
    rle: bool,

    /// Embed the palette window even when matching an external palette
    #[arg(long)]
    embed_palette: bool,

    #[arg(long)]
    palette_name: Option<String>,

    #[arg(long, default_value = "0", value_parser = parse_rotation)]
    rotate: Rotation,
}

#[derive(Args)]
struct DecodeArgs {
    input: PathBuf,

    #[arg(short, long)]
    output: PathBuf,

    /// Palette for textures stored without one
    #[arg(short, long)]
    palette: Option<PathBuf>,

    /// Window offset into the external palette
    #[arg(long, default_value_t = 0)]
    offset: usize,

    /// Undo the stored rotation
    #[arg(long)]
    upright: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Convert an image to a D2 texture
    Encode(EncodeArgs),
    /// Render a D2 texture to PNG
    Decode(DecodeArgs),
    /// Print the header of a D2 texture
    Info { input: PathBuf },
}

#[derive(Parser)]
#[command(name = "d2-tool", version, about = "D2 texture converter")]
struct Cli {
    /// Log library activity to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log library activity to a file instead
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

fn print_progress(progress: &Progress) {
    eprint!("\r{:>3}% {:<40}", progress.percent, progress.status);
    let _ = io::stderr().flush();
}

fn encode(args: EncodeArgs) -> Result<(), ToolError> {
    let source = filemanager::open_image(&args.input)?;
    let palette = filemanager::open_palette(args.palette.as_deref())?;

    let settings = TextureSettings {
        format: args.format,
        color_count: args.colors,
        quantize_method: args.quantizer.into(),
        strategy: args.strategy.into(),
        metric: args.metric.into(),
        palette_offset: args.offset,
        rle: args.rle,
        embed_palette: args.embed_palette || palette.is_none(),
        palette_name: args.palette_name,
        rotation: args.rotate,
    };
    let converter = TextureConverter::from_settings(&settings);

    let (sender, receiver) = mpsc::channel();
    let ctx = TaskContext::new().with_progress(sender);

    let (bytes, converted) = thread::scope(|scope| {
        let worker = scope.spawn(|| {
            let ctx = ctx;
            converter.encode_d2(&source, &settings, palette.as_ref(), &ctx)
        });
        for progress in receiver {
            print_progress(&progress);
        }
        eprintln!();
        worker.join().map_err(|_| ToolError::WorkerPanicked)
    })??;

    filemanager::save_texture(&args.output, &bytes)?;
    report_conversion(&converted, bytes.len());
    Ok(())
}

fn report_conversion(converted: &ConvertedTexture, size: usize) {
    println!(
        "{} {}x{}, {} bytes",
        converted.format, converted.width, converted.height, size
    );
    if let Some(palette) = &converted.palette {
        println!(
            "Palette: {} colors, window offset {}, total error {:.2}",
            palette.len(),
            converted.palette_offset,
            converted.total_error
        );
    }
}

fn decode(args: DecodeArgs) -> Result<(), ToolError> {
    let texture = filemanager::open_texture(&args.input)?;
    let palette = filemanager::open_palette(args.palette.as_deref())?;

    let (rgba, width, height) = if args.upright {
        texture.to_rgba_upright(palette.as_ref(), args.offset)?
    } else {
        let rgba = texture.to_rgba(palette.as_ref(), args.offset)?;
        (rgba, texture.width as usize, texture.height as usize)
    };

    filemanager::save_preview(&args.output, width, height, &rgba)?;
    Ok(())
}

fn info(input: PathBuf) -> Result<(), ToolError> {
    let texture = filemanager::open_texture(&input)?;

    println!("{}: {}", FORMAT_NAME, input.display());
    println!("Format:   {} (tag {})", texture.format, texture.format.tag());
    println!("Size:     {}x{}", texture.width, texture.height);
    println!("Flags:    {:#010b}", texture.flags());
    println!("RLE:      {}", texture.rle);
    println!("Rotation: {} degrees", texture.rotation.quarter_turns() as u32 * 90);
    if let Some(name) = &texture.palette_name {
        println!("Palette:  {}", name);
    }
    match &texture.palette {
        Some(palette) => println!("Embedded: {} colors", palette.len()),
        None if texture.format.is_indexed() => {
            println!("Embedded: none (needs external palette)")
        }
        None => {}
    }
    println!("Payload:  {} bytes", texture.payload.len());
    Ok(())
}

fn run(cli: Cli) -> Result<(), ToolError> {
    if cli.verbose || cli.log_file.is_some() {
        lib_d2::init_logging(cli.log_file.as_deref())?;
    }

    match cli.command {
        Command::Encode(args) => encode(args),
        Command::Decode(args) => decode(args),
        Command::Info { input } => info(input),
    }
}

fn main() -> ExitCode {
    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("error: {}", e);
            let mut source = std::error::Error::source(&e);
            while let Some(cause) = source {
                eprintln!("  caused by: {}", cause);
                source = cause.source();
            }
            info!("Exiting with failure");
            ExitCode::FAILURE
        }
    }
}
