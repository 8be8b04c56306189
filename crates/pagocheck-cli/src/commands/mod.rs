//! Subcommands and the helpers they share.

pub mod analyze;
pub mod config;
pub mod reconcile;
pub mod scan;

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use pagocheck_core::models::config::PagoConfig;
use pagocheck_core::models::receipt::format_amount;
use pagocheck_core::{ImageSource, OcrResult};

/// Environment variable holding the Google Vision API key.
pub const GOOGLE_VISION_KEY_ENV: &str = "PAGOCHECK_GOOGLE_VISION_KEY";

/// Environment variable holding the OCR.space API key.
pub const OCR_SPACE_KEY_ENV: &str = "PAGOCHECK_OCR_SPACE_KEY";

/// Output format shared by the reporting commands.
#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// Plain text summary
    Text,
}

pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("pagocheck")
        .join("config.json")
}

/// Load the config file (explicit path, else the default location when it
/// exists, else defaults) and fill provider keys from the environment.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<PagoConfig> {
    let mut config = match config_path {
        Some(path) => PagoConfig::from_file(Path::new(path))?,
        None => {
            let path = default_config_path();
            if path.exists() {
                PagoConfig::from_file(&path)?
            } else {
                PagoConfig::default()
            }
        }
    };

    if let Some(key) = env_key(GOOGLE_VISION_KEY_ENV) {
        debug!("Using Google Vision key from {}", GOOGLE_VISION_KEY_ENV);
        config.providers.google_vision.api_key = Some(key);
    }
    if let Some(key) = env_key(OCR_SPACE_KEY_ENV) {
        debug!("Using OCR.space key from {}", OCR_SPACE_KEY_ENV);
        config.providers.ocr_space.api_key = Some(key);
    }

    Ok(config)
}

fn env_key(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Treat `http(s)://` inputs as URLs and anything else as a local file.
pub fn image_source(input: &str) -> anyhow::Result<ImageSource> {
    if input.starts_with("http://") || input.starts_with("https://") {
        return Ok(ImageSource::Url(input.to_string()));
    }

    let path = Path::new(input);
    if !path.exists() {
        anyhow::bail!("Input file not found: {}", path.display());
    }

    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("receipt.jpg")
        .to_string();
    Ok(ImageSource::Bytes {
        data: fs::read(path)?,
        filename,
    })
}

/// Read text from a file, or stdin when the path is `-`.
pub fn read_text(input: &str) -> anyhow::Result<String> {
    if input == "-" {
        return Ok(std::io::read_to_string(std::io::stdin())?);
    }
    let path = Path::new(input);
    if !path.exists() {
        anyhow::bail!("Input file not found: {}", path.display());
    }
    Ok(fs::read_to_string(path)?)
}

pub fn format_result_text(result: &OcrResult) -> String {
    let mut output = String::new();

    output.push_str(&format!("Provider: {}\n", result.provider));
    if let Some(confidence) = result.provider_confidence {
        output.push_str(&format!("Provider confidence: {:.2}\n", confidence));
    }
    output.push('\n');

    match &result.selected_total {
        Some(total) => output.push_str(&format!(
            "Total: {}{} (confidence {:.2})\n",
            total.currency.symbol(),
            format_amount(total.value),
            total.confidence
        )),
        None => output.push_str("Total: not detected\n"),
    }

    if !result.candidates.is_empty() {
        output.push_str("\nCandidates:\n");
        for scored in &result.candidates {
            output.push_str(&format!(
                "  {:>12}  {:.2}  {:?}\n",
                format_amount(scored.candidate.value),
                scored.confidence,
                scored.candidate.raw_text
            ));
        }
    }

    if !result.operation_numbers.is_empty() {
        let ops: Vec<&str> = result.operation_numbers.iter().map(String::as_str).collect();
        output.push_str(&format!("\nOperations: {}\n", ops.join(", ")));
    }
    if !result.account_numbers.is_empty() {
        let accounts: Vec<&str> = result.account_numbers.iter().map(String::as_str).collect();
        output.push_str(&format!("Accounts: {}\n", accounts.join(", ")));
    }

    output
}
