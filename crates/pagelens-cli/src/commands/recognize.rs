//! Single-image commands: boxes, text, text-boxes, hocr and orientation.

use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use tracing::{debug, info};

use pagelens_core::TextUnit;

use super::{create_engine, create_layout_engine, emit, load_config, open_image, run_with_progress};

/// Input image and recognition model.
#[derive(Args)]
pub struct ImageArgs {
    /// Input image (PNG, JPEG, TIFF, BMP, ...)
    #[arg(required = true)]
    input: PathBuf,

    /// ONNX recognition model (default: model.model_path from config)
    #[arg(short, long)]
    model: Option<PathBuf>,

    /// Model language, e.g. "eng" or "pol+eng" (default: model.lang from config)
    #[arg(short, long)]
    lang: Option<String>,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

/// Arguments for the boxes command.
#[derive(Args)]
pub struct BoxesArgs {
    #[command(flatten)]
    image: ImageArgs,

    /// Granularity: word or line
    #[arg(short, long, default_value = "word")]
    unit: TextUnit,
}

/// Arguments for the text and hocr commands.
#[derive(Args)]
pub struct TextArgs {
    #[command(flatten)]
    image: ImageArgs,
}

/// Arguments for the text-boxes command.
#[derive(Args)]
pub struct TextBoxesArgs {
    #[command(flatten)]
    image: ImageArgs,

    /// Granularity: word or line
    #[arg(short, long, default_value = "word")]
    unit: TextUnit,
}

/// Arguments for the orientation command.
#[derive(Args)]
pub struct OrientationArgs {
    /// Input image
    #[arg(required = true)]
    input: PathBuf,
}

pub async fn boxes(args: BoxesArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let mut engine = create_engine(&config, args.image.model.as_deref(), args.image.lang.as_deref())?;
    engine.load_image(open_image(&args.image.input)?)?;

    let boxes = engine.bounding_boxes(args.unit)?;
    info!("Found {} {} boxes", boxes.len(), args.unit);

    let json = serde_json::to_string_pretty(&boxes)?;
    emit(args.image.output.as_deref(), &format!("{}\n", json))
}

pub async fn text(args: TextArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let mut engine = create_engine(&config, args.image.model.as_deref(), args.image.lang.as_deref())?;
    engine.load_image(open_image(&args.image.input)?)?;

    let start = Instant::now();
    let text = run_with_progress(engine, |engine, progress| engine.text(progress)).await?;
    debug!("Recognition took {:?}", start.elapsed());

    emit(args.image.output.as_deref(), &text)
}

pub async fn text_boxes(args: TextBoxesArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let mut engine = create_engine(&config, args.image.model.as_deref(), args.image.lang.as_deref())?;
    engine.load_image(open_image(&args.image.input)?)?;

    let unit = args.unit;
    let items =
        run_with_progress(engine, move |engine, progress| engine.text_boxes(unit, progress))
            .await?;
    info!("Recognized {} {} regions", items.len(), unit);

    let json = serde_json::to_string_pretty(&items)?;
    emit(args.image.output.as_deref(), &format!("{}\n", json))
}

pub async fn hocr(args: TextArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let mut engine = create_engine(&config, args.image.model.as_deref(), args.image.lang.as_deref())?;
    engine.load_image(open_image(&args.image.input)?)?;

    let hocr = run_with_progress(engine, |engine, progress| engine.hocr(progress)).await?;
    emit(args.image.output.as_deref(), &hocr)
}

pub async fn orientation(args: OrientationArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let mut engine = create_layout_engine(&config)?;
    engine.load_image(open_image(&args.input)?)?;

    let orientation = engine.orientation()?;
    println!("{}", serde_json::to_string_pretty(&orientation)?);
    Ok(())
}
