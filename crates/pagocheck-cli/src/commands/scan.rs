//! Scan command - recognize a receipt image through the provider chain.

use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use pagocheck_core::models::config::PagoConfig;
use pagocheck_core::{create_orchestrator, FetchOptions, ImageSource, OcrResult, ProviderId};

use super::{format_result_text, image_source, load_config, OutputFormat};

/// Arguments for the scan command.
#[derive(Args)]
pub struct ScanArgs {
    /// Receipt image path or URL
    #[arg(required = true)]
    input: String,

    /// Provider fallback order (default: from config)
    #[arg(short, long, value_delimiter = ',')]
    providers: Vec<ProviderId>,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,
}

pub async fn run(args: ScanArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;
    let source = image_source(&args.input)?;

    info!("Scanning {}", source.describe());
    let result = recognize(&config, &source, &args.providers).await?;

    let output = match args.format {
        OutputFormat::Json => serde_json::to_string_pretty(&result)?,
        OutputFormat::Text => format_result_text(&result),
    };

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", output);
    }

    debug!("Total scan time: {:?}", start.elapsed());
    Ok(())
}

/// Run the provider chain with a spinner; shared with `reconcile`.
pub(crate) async fn recognize(
    config: &PagoConfig,
    source: &ImageSource,
    providers: &[ProviderId],
) -> anyhow::Result<OcrResult> {
    let orchestrator = create_orchestrator(config)?;
    let order = if providers.is_empty() {
        config.providers.order.clone()
    } else {
        providers.to_vec()
    };

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {msg}")?);
    pb.enable_steady_tick(Duration::from_millis(120));
    pb.set_message(format!("Running OCR via {}...", join_ids(&order)));

    let outcome = orchestrator
        .fetch_text(source, &order, &FetchOptions::default())
        .await;
    pb.finish_and_clear();

    match outcome {
        Ok(result) => Ok(result),
        Err(e) => {
            eprintln!("{} {}", style("✗").red(), e.customer_message());
            Err(e.into())
        }
    }
}

fn join_ids(order: &[ProviderId]) -> String {
    order.iter().map(|id| id.as_str()).collect::<Vec<_>>().join(", ")
}
