//! Analyze command - run extraction on text recognized elsewhere.

use clap::Args;

use pagocheck_core::{ProviderId, ReceiptParser};

use super::{format_result_text, load_config, read_text, OutputFormat};

/// Arguments for the analyze command.
#[derive(Args)]
pub struct AnalyzeArgs {
    /// Text file with the recognized receipt text, or `-` for stdin
    #[arg(required = true)]
    input: String,

    /// Provider the text came from
    #[arg(long, default_value = "google_vision")]
    provider: ProviderId,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,
}

pub async fn run(args: AnalyzeArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let text = read_text(&args.input)?;

    let result = ReceiptParser::new()
        .with_config(config.extraction)
        .analyze_text(args.provider, &text, None);

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
        OutputFormat::Text => print!("{}", format_result_text(&result)),
    }

    Ok(())
}
