//! Batch recognition of many images.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::Semaphore;
use tracing::{debug, error, warn};

use pagelens_core::{EngineConfig, OcrEngine, OrtBackend, PageBackend};

use super::{load_config, open_image, read_model};

const IMAGE_EXTENSIONS: [&str; 8] = ["png", "jpg", "jpeg", "tif", "tiff", "bmp", "gif", "webp"];

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Glob pattern of input images
    #[arg(required = true)]
    input: String,

    /// ONNX recognition model (default: model.model_path from config)
    #[arg(short, long)]
    model: Option<PathBuf>,

    /// Model language (default: model.lang from config)
    #[arg(short, long)]
    lang: Option<String>,

    /// Directory for <image name>.txt outputs, e.g. scan.png.txt (default: print to stdout)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Also write a summary CSV
    #[arg(long)]
    summary: bool,

    /// Number of images recognized at once
    #[arg(short = 'j', long, default_value = "4")]
    jobs: usize,

    /// Continue on error
    #[arg(long)]
    continue_on_error: bool,
}

/// Result of processing a single file.
struct ProcessResult {
    path: PathBuf,
    text: Option<String>,
    error: Option<String>,
    processing_time_ms: u64,
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;

    let model_path = args
        .model
        .clone()
        .or_else(|| config.model.model_path.clone())
        .ok_or_else(|| anyhow::anyhow!("No recognition model: pass --model or set model.model_path"))?;
    let model = Arc::new(read_model(&model_path)?);
    let lang = args.lang.clone().unwrap_or_else(|| config.model.lang.clone());

    let files: Vec<PathBuf> = glob(&args.input)?
        .filter_map(|r| r.ok())
        .filter(|p| {
            let ext = p.extension().and_then(|e| e.to_str()).unwrap_or("");
            IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str())
        })
        .collect();

    if files.is_empty() {
        anyhow::bail!("No matching files found for pattern: {}", args.input);
    }

    eprintln!(
        "{} Found {} images to process",
        style("ℹ").blue(),
        files.len()
    );

    if let Some(ref output_dir) = args.output_dir {
        fs::create_dir_all(output_dir)?;
    }

    let overall_pb = ProgressBar::new(files.len() as u64);
    overall_pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} images")?
            .progress_chars("=>-"),
    );

    // One engine per image, at most `jobs` alive at a time.
    let semaphore = Arc::new(Semaphore::new(args.jobs.max(1)));
    let mut handles = Vec::with_capacity(files.len());

    for path in files {
        let permit = semaphore.clone().acquire_owned().await?;
        let model = Arc::clone(&model);
        let lang = lang.clone();
        let engine_config = config.engine.clone();
        let job_path = path.clone();

        let handle = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            let file_start = Instant::now();
            let result = recognize_file(&job_path, &model, &lang, &engine_config);
            (result, file_start.elapsed().as_millis() as u64)
        });
        handles.push((path, handle));
    }

    let mut results = Vec::with_capacity(handles.len());
    for (path, handle) in handles {
        let (result, processing_time_ms) = handle.await?;
        overall_pb.inc(1);

        match result {
            Ok(text) => results.push(ProcessResult {
                path,
                text: Some(text),
                error: None,
                processing_time_ms,
            }),
            Err(e) => {
                let error_msg = format!("{:#}", e);
                if args.continue_on_error {
                    warn!("Failed to process {}: {}", path.display(), error_msg);
                    results.push(ProcessResult {
                        path,
                        text: None,
                        error: Some(error_msg),
                        processing_time_ms,
                    });
                } else {
                    error!("Failed to process {}: {}", path.display(), error_msg);
                    overall_pb.abandon();
                    anyhow::bail!("Processing failed: {}", error_msg);
                }
            }
        }
    }

    overall_pb.finish_and_clear();

    for result in &results {
        let Some(text) = &result.text else {
            continue;
        };
        match &args.output_dir {
            Some(output_dir) => {
                let output_path = output_dir.join(output_name(&result.path));
                fs::write(&output_path, text)?;
                debug!("Wrote output to {}", output_path.display());
            }
            None => {
                println!("==> {} <==", result.path.display());
                print!("{}", text);
            }
        }
    }

    if args.summary {
        let summary_path = args
            .output_dir
            .as_ref()
            .map(|d| d.join("summary.csv"))
            .unwrap_or_else(|| PathBuf::from("summary.csv"));

        write_summary(&summary_path, &results)?;
        eprintln!(
            "{} Summary written to {}",
            style("✓").green(),
            summary_path.display()
        );
    }

    let failed: Vec<_> = results.iter().filter(|r| r.error.is_some()).collect();
    eprintln!();
    eprintln!(
        "{} Processed {} images in {:?}",
        style("✓").green(),
        results.len(),
        start.elapsed()
    );
    eprintln!(
        "   {} successful, {} failed",
        style(results.len() - failed.len()).green(),
        style(failed.len()).red()
    );

    if !failed.is_empty() {
        eprintln!();
        eprintln!("{}", style("Failed images:").red());
        for result in &failed {
            eprintln!(
                "  - {}: {}",
                result.path.display(),
                result.error.as_deref().unwrap_or("unknown error")
            );
        }
    }

    Ok(())
}

/// Recognize one image with a dedicated engine.
fn recognize_file(
    path: &Path,
    model: &[u8],
    lang: &str,
    engine_config: &EngineConfig,
) -> anyhow::Result<String> {
    let image = open_image(path)?;

    let mut engine = OcrEngine::new(PageBackend::<OrtBackend>::new());
    engine.configure(engine_config)?;
    engine.load_model(model, lang)?;
    engine.load_image(image)?;

    let text = engine.text(&mut |_: u8| {})?;
    debug!("{}: {} characters", path.display(), text.chars().count());
    Ok(text)
}

/// Text file name for an input image. The image extension is kept so that
/// `a.png` and `a.jpg` do not overwrite each other.
fn output_name(path: &Path) -> String {
    let name = path.file_name().and_then(|s| s.to_str()).unwrap_or("page");
    format!("{}.txt", name)
}

fn write_summary(path: &Path, results: &[ProcessResult]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record(["filename", "status", "characters", "processing_time_ms", "error"])?;

    for result in results {
        let filename = result
            .path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("");

        match &result.text {
            Some(text) => wtr.write_record([
                filename,
                "success",
                &text.chars().count().to_string(),
                &result.processing_time_ms.to_string(),
                "",
            ])?,
            None => wtr.write_record([
                filename,
                "error",
                "",
                &result.processing_time_ms.to_string(),
                result.error.as_deref().unwrap_or(""),
            ])?,
        }
    }

    wtr.flush()?;
    Ok(())
}
