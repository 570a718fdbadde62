//! Subcommands and the engine plumbing they share.

pub mod batch;
pub mod config;
pub mod recognize;
pub mod vars;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc;
use tracing::debug;

use pagelens_core::{
    NativeEngine, OcrEngine, OcrError, OrtBackend, PageBackend, PagelensConfig, PixelBuffer,
    ProgressSink,
};

/// Default location of the configuration file.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("pagelens")
        .join("config.json")
}

/// Resolve the config file: the explicit path, else the default location.
pub fn config_path(explicit: Option<&str>) -> PathBuf {
    explicit.map(PathBuf::from).unwrap_or_else(default_config_path)
}

/// Load configuration, falling back to defaults when no file exists.
pub fn load_config(explicit: Option<&str>) -> anyhow::Result<PagelensConfig> {
    let path = config_path(explicit);
    if path.exists() {
        debug!("Loading configuration from {}", path.display());
        PagelensConfig::from_file(&path)
            .with_context(|| format!("Failed to read config {}", path.display()))
    } else if explicit.is_some() {
        anyhow::bail!("Config file not found: {}", path.display());
    } else {
        Ok(PagelensConfig::default())
    }
}

/// Fresh engine with configured variables and no model.
pub fn create_layout_engine(config: &PagelensConfig) -> anyhow::Result<NativeEngine> {
    let mut engine = OcrEngine::new(PageBackend::<OrtBackend>::new());
    engine
        .configure(&config.engine)
        .context("Invalid engine.variables in config")?;
    Ok(engine)
}

/// Fresh engine with configured variables and, if one is known, a model.
///
/// `model` and `lang` override the configuration.
pub fn create_engine(
    config: &PagelensConfig,
    model: Option<&Path>,
    lang: Option<&str>,
) -> anyhow::Result<NativeEngine> {
    let mut engine = create_layout_engine(config)?;

    let model = model.or(config.model.model_path.as_deref());
    if let Some(path) = model {
        let bytes = read_model(path)?;
        let lang = lang.unwrap_or(&config.model.lang);
        engine
            .load_model(&bytes, lang)
            .with_context(|| format!("Failed to load model {}", path.display()))?;
    }

    Ok(engine)
}

pub fn read_model(path: &Path) -> anyhow::Result<Vec<u8>> {
    fs::read(path).with_context(|| format!("Failed to read model {}", path.display()))
}

/// Decode an image file into a pixel buffer.
pub fn open_image(path: &Path) -> anyhow::Result<PixelBuffer> {
    if !path.exists() {
        anyhow::bail!("Input file not found: {}", path.display());
    }
    let image =
        image::open(path).with_context(|| format!("Failed to decode {}", path.display()))?;
    Ok(PixelBuffer::from_image(&image)?)
}

/// Write to `output`, or print to stdout.
pub fn emit(output: Option<&Path>, content: &str) -> anyhow::Result<()> {
    match output {
        Some(path) => {
            fs::write(path, content)?;
            eprintln!(
                "{} Output written to {}",
                style("✓").green(),
                path.display()
            );
        }
        None => print!("{}", content),
    }
    Ok(())
}

/// Run a recognition job on a blocking worker, rendering its progress.
pub async fn run_with_progress<T, F>(engine: NativeEngine, job: F) -> anyhow::Result<T>
where
    T: Send + 'static,
    F: FnOnce(&mut NativeEngine, &mut dyn ProgressSink) -> Result<T, OcrError> + Send + 'static,
{
    let (tx, mut rx) = mpsc::unbounded_channel::<u8>();

    let worker = tokio::task::spawn_blocking(move || {
        let mut engine = engine;
        let mut sink = |percent: u8| {
            // The receiver only goes away if the caller gave up.
            let _ = tx.send(percent);
        };
        job(&mut engine, &mut sink)
    });

    let pb = ProgressBar::new(100);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {pos}% {msg}")?
            .progress_chars("##-"),
    );
    pb.set_message("Recognizing...");

    while let Some(percent) = rx.recv().await {
        pb.set_position(percent as u64);
    }
    pb.finish_and_clear();

    Ok(worker.await??)
}
