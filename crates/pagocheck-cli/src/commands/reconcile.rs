//! Reconcile command - compare a receipt against the order's expected total.

use std::fs;
use std::path::PathBuf;

use clap::Args;
use console::style;
use rust_decimal::Decimal;

use pagocheck_core::models::receipt::format_amount;
use pagocheck_core::{OrderExpectation, ProviderId, ReceiptParser, ReconciliationVerdict, Reconciler};

use super::scan::recognize;
use super::{image_source, load_config, read_text, OutputFormat};

/// Arguments for the reconcile command.
#[derive(Args)]
pub struct ReconcileArgs {
    /// Receipt image path or URL (or a text file with --text-file)
    #[arg(required = true)]
    input: String,

    /// Expected order total
    #[arg(short, long, conflicts_with = "order")]
    expected: Option<Decimal>,

    /// JSON file with the order expectation (expected_total and/or items)
    #[arg(long)]
    order: Option<PathBuf>,

    /// Relative tolerance for a close match (default: from config)
    #[arg(short, long)]
    tolerance: Option<f64>,

    /// Accept only an exact match
    #[arg(long)]
    exact: bool,

    /// Treat the input as already recognized text instead of an image
    #[arg(long)]
    text_file: bool,

    /// Provider fallback order (default: from config)
    #[arg(short, long, value_delimiter = ',')]
    providers: Vec<ProviderId>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    format: OutputFormat,
}

pub async fn run(args: ReconcileArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;

    let expectation = match (&args.expected, &args.order) {
        (Some(total), _) => OrderExpectation::with_total(*total),
        (None, Some(path)) => serde_json::from_str(&fs::read_to_string(path)?)?,
        (None, None) => OrderExpectation::default(),
    };

    let ocr = if args.text_file {
        let text = read_text(&args.input)?;
        let provider = args.providers.first().copied().unwrap_or(ProviderId::GoogleVision);
        ReceiptParser::new()
            .with_config(config.extraction.clone())
            .analyze_text(provider, &text, None)
    } else {
        let source = image_source(&args.input)?;
        recognize(&config, &source, &args.providers).await?
    };

    let reconciler = Reconciler::new(config.reconciliation.clone());
    let verdict = reconciler.reconcile(
        &ocr,
        &expectation,
        args.tolerance.unwrap_or(config.reconciliation.tolerance),
        args.exact || config.reconciliation.require_exact_match,
    )?;

    match args.format {
        OutputFormat::Json => {
            let report = serde_json::json!({ "ocr": ocr, "verdict": verdict });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Text => print_verdict(&verdict),
    }

    if !verdict.ok {
        std::process::exit(1);
    }
    Ok(())
}

fn print_verdict(verdict: &ReconciliationVerdict) {
    let mark = if verdict.ok {
        style("✓").green()
    } else {
        style("✗").red()
    };
    println!("{} {}", mark, style(verdict.outcome).bold());

    let amount = |value: Option<Decimal>| value.map(format_amount).unwrap_or_else(|| "-".to_string());
    println!("  Detected: {}", amount(verdict.detected_total));
    println!("  Expected: {}", amount(verdict.expected_total));
    if let Some(difference) = verdict.difference {
        println!("  Difference: {}", format_amount(difference));
    }
    if let Some(relative) = verdict.relative_difference {
        println!("  Relative: {:.2}%", relative * 100.0);
    }

    for note in &verdict.notes {
        println!("  - {}", note);
    }
}
