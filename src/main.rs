//! SubCell batch inference.
//!
//! Reads `path_list.csv` from the working directory, runs the configured model
//! on every image set and logs the predicted locations to the console and to
//! `log.txt`.
//!
//! # Usage
//!
//! ```bash
//! subcell-infer [OPTIONS]
//! ```
//!
//! # Arguments
//!
//! * `-c, --model_channels` - Channels the model consumes, a subset of `rybg`
//! * `-t, --model_type` - Model variant (`mae_contrast_supcon_model` or `vit_supcon_model`)
//! * `-u, --update_model` - Download the model even if it is already present
//! * `-csv, --create_csv` - Write predictions and embeddings to `result.csv`
//! * `--config` - Run configuration file (default: `config.yaml`)
//!
//! Keys set in the configuration file take precedence over the command line.

use chrono::Local;
use clap::Parser;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use subcell_infer::core::constants::{DEFAULT_CONFIG_FILE, LOG_FILE};
use subcell_infer::core::{ConfigOverlay, RunConfig, init_tracing, parse_boolish_arg};
use subcell_infer::models::HttpFetcher;
use subcell_infer::pipeline::{report_outcome, run_batch};
use tracing::{error, info};

const TIMESTAMP_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

/// Command-line arguments for the batch driver
#[derive(Parser, Debug)]
#[command(name = "subcell-infer")]
#[command(about = "Run SubCell localization models over a list of cell images")]
struct Args {
    /// Channels the model consumes, any subset of r, y, b, g
    #[arg(short = 'c', long = "model_channels")]
    model_channels: Option<String>,

    /// Model variant
    #[arg(short = 't', long = "model_type")]
    model_type: Option<String>,

    /// Download the model even if it is already present
    #[arg(
        short = 'u',
        long = "update_model",
        num_args = 0..=1,
        default_missing_value = "true",
        value_parser = parse_boolish_arg
    )]
    update_model: Option<bool>,

    /// Write predictions and embeddings to the result table
    #[arg(
        long = "create_csv",
        num_args = 0..=1,
        default_missing_value = "true",
        value_parser = parse_boolish_arg
    )]
    create_csv: Option<bool>,

    /// Run configuration file
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,
}

impl From<&Args> for ConfigOverlay {
    fn from(args: &Args) -> Self {
        Self {
            model_channels: args.model_channels.clone(),
            model_type: args.model_type.clone(),
            update_model: args.update_model,
            create_csv: args.create_csv,
            ..Default::default()
        }
    }
}

/// Rewrites the single-dash `-csv` flag to its long form, which clap cannot
/// express as a short option.
fn normalize_args<I: IntoIterator<Item = OsString>>(args: I) -> Vec<OsString> {
    args.into_iter()
        .map(|arg| match arg.to_str() {
            Some("-csv") => OsString::from("--create_csv"),
            Some(text) if text.starts_with("-csv=") => {
                OsString::from(format!("--create_csv={}", &text["-csv=".len()..]))
            }
            _ => arg,
        })
        .collect()
}

fn timestamp() -> String {
    Local::now().format(TIMESTAMP_FORMAT).to_string()
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing(Path::new(LOG_FILE))?;

    let args = Args::parse_from(normalize_args(std::env::args_os()));
    let config = RunConfig::resolve(ConfigOverlay::from(&args), &args.config)
        .inspect_err(|e| error!("{}", e.chain_message()))?;

    info!("Start: {}", timestamp());
    info!("Parameters used:");
    info!("{}", config.summary());
    info!("----------");

    report_outcome(HttpFetcher::new().and_then(|fetcher| run_batch(&config, &fetcher)));

    info!("----------");
    info!("End: {}", timestamp());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Args {
        Args::parse_from(normalize_args(argv.iter().map(OsString::from)))
    }

    #[test]
    fn test_no_flags_leave_overlay_empty() {
        let args = parse(&["subcell-infer"]);
        assert_eq!(ConfigOverlay::from(&args), ConfigOverlay::default());
        assert_eq!(args.config, PathBuf::from("config.yaml"));
    }

    #[test]
    fn test_single_dash_csv_flag() {
        let args = parse(&["subcell-infer", "-csv"]);
        assert_eq!(args.create_csv, Some(true));

        let args = parse(&["subcell-infer", "-csv", "False"]);
        assert_eq!(args.create_csv, Some(false));
    }

    #[test]
    fn test_short_flags() {
        let args = parse(&["subcell-infer", "-c", "rbg", "-t", "vit_supcon_model", "-u"]);
        let overlay = ConfigOverlay::from(&args);
        assert_eq!(overlay.model_channels.as_deref(), Some("rbg"));
        assert_eq!(overlay.model_type.as_deref(), Some("vit_supcon_model"));
        assert_eq!(overlay.update_model, Some(true));
        assert_eq!(overlay.create_csv, None);
    }

    #[test]
    fn test_invalid_boolean_is_rejected() {
        let argv = normalize_args(["subcell-infer", "-u", "sometimes"].map(OsString::from));
        assert!(Args::try_parse_from(argv).is_err());
    }
}
