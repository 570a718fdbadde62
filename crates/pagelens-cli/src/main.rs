//! Command-line OCR over page images.

mod commands;

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use commands::{batch, config, recognize, vars};

/// Page OCR - layout boxes, text, hOCR and orientation from page images
#[derive(Parser)]
#[command(name = "pagelens")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print word or line boxes found by layout analysis
    Boxes(recognize::BoxesArgs),

    /// Print the recognized text of an image
    Text(recognize::TextArgs),

    /// Print recognized words or lines with their boxes and confidence
    TextBoxes(recognize::TextBoxesArgs),

    /// Print the recognized page as an hOCR document
    Hocr(recognize::TextArgs),

    /// Estimate page orientation
    Orientation(recognize::OrientationArgs),

    /// Recognize many images in parallel
    Batch(batch::BatchArgs),

    /// Inspect or change backend variables
    Vars(vars::VarsArgs),

    /// Manage configuration
    Config(config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Boxes(args) => recognize::boxes(args, config_path).await,
        Commands::Text(args) => recognize::text(args, config_path).await,
        Commands::TextBoxes(args) => recognize::text_boxes(args, config_path).await,
        Commands::Hocr(args) => recognize::hocr(args, config_path).await,
        Commands::Orientation(args) => recognize::orientation(args, config_path).await,
        Commands::Batch(args) => batch::run(args, config_path).await,
        Commands::Vars(args) => vars::run(args, config_path).await,
        Commands::Config(args) => config::run(args, config_path).await,
    }
}
