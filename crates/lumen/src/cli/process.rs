//! The `lumen process` command: run the pipeline on a local file.
//!
//! Nothing is uploaded; the thumbnail (and optionally the JPEG original) are
//! written to disk and a JSON summary is printed on stdout.

use clap::Args;
use lumen_core::{Config, ImageProcessor, ProcessedImage, ProcessingRequest};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Arguments for the `process` command.
#[derive(Args, Debug)]
pub struct ProcessArgs {
    /// Image file to process
    #[arg(required = true)]
    pub input: PathBuf,

    /// Thumbnail size as HEIGHT WIDTH (defaults to processing.default_size)
    #[arg(short, long, num_args = 2, value_names = ["HEIGHT", "WIDTH"], allow_negative_numbers = true)]
    pub size: Option<Vec<i64>>,

    /// Where to write the thumbnail PNG (defaults to <input>.thumb.png)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Also write a JPEG re-encode of the original here
    #[arg(long)]
    pub original: Option<PathBuf>,
}

/// Summary printed after a local run.
#[derive(Debug, Serialize)]
struct ProcessSummary {
    input: PathBuf,
    source_format: String,
    dimensao_original: [u32; 2],
    dimensao_processada: [u32; 2],
    valor_min: f64,
    valor_max: f64,
    arquivo_salvo: PathBuf,
    arquivo_original: Option<PathBuf>,
}

/// Execute the process command.
pub async fn execute(args: ProcessArgs, config: Config) -> anyhow::Result<()> {
    if !args.input.is_file() {
        anyhow::bail!("Input is not a file: {}", args.input.display());
    }

    let processor = ImageProcessor::new(&config);
    let target = match args.size.as_deref() {
        Some(&[height, width]) => processor.target_size(height, width)?,
        Some(_) => anyhow::bail!("--size takes exactly two values: HEIGHT WIDTH"),
        None => processor.default_target(),
    };

    let image = std::fs::read(&args.input)?;
    tracing::info!(
        "Processing {} ({} bytes) -> {}x{}",
        args.input.display(),
        image.len(),
        target.height,
        target.width
    );

    let processed = processor
        .process(ProcessingRequest {
            image,
            media_type: None,
            target,
            save_original: args.original.is_some(),
        })
        .await?;

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&args.input));
    std::fs::write(&output, &processed.processed_png)?;
    tracing::debug!("Wrote thumbnail to {}", output.display());

    if let (Some(path), Some(jpeg)) = (&args.original, &processed.original_jpeg) {
        std::fs::write(path, jpeg)?;
        tracing::debug!("Wrote original to {}", path.display());
    }

    let summary = summarize(&args, &processed, output);
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn summarize(args: &ProcessArgs, processed: &ProcessedImage, output: PathBuf) -> ProcessSummary {
    ProcessSummary {
        input: args.input.clone(),
        source_format: processed.source_format.clone(),
        dimensao_original: [processed.original_dims.0, processed.original_dims.1],
        dimensao_processada: [processed.processed_dims.0, processed.processed_dims.1],
        valor_min: processed.valor_min,
        valor_max: processed.valor_max,
        arquivo_salvo: output,
        arquivo_original: args.original.clone(),
    }
}

/// `photo.jpg` → `photo.thumb.png`, next to the input.
fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    input.with_file_name(format!("{stem}.thumb.png"))
}
