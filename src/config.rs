//! Configuration

use std::path::PathBuf;

use clap::{Args, Parser};
use rusty_money::iso::{self, Currency};

/// Log output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Compact, human-readable logs.
    Compact,

    /// Structured JSON logs.
    Json,
}

/// How cart and listing output is rendered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Box-drawn tables.
    Table,

    /// One JSON document per response.
    Json,
}

/// Logging settings.
#[derive(Debug, Args)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,

    /// Log format (compact, json)
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Compact)]
    pub log_format: LogFormat,
}

/// Bundle cart shell configuration
#[derive(Debug, Parser)]
#[command(name = "bundlecart", about = "Catalog, bundle and cart shell", long_about = None)]
pub struct AppConfig {
    /// Logging settings
    #[command(flatten)]
    pub logging: LoggingConfig,

    /// YAML seed catalog; the built-in catalog is used when omitted
    #[arg(short, long, env = "CATALOG_PATH")]
    pub catalog: Option<PathBuf>,

    /// Output format (table, json)
    #[arg(short, long, env = "OUTPUT_FORMAT", value_enum, default_value_t = OutputFormat::Table)]
    pub output: OutputFormat,

    /// ISO 4217 code of the currency amounts are displayed in
    #[arg(long, env = "CURRENCY", default_value = "USD", value_parser = parse_currency)]
    pub currency: &'static Currency,
}

fn parse_currency(code: &str) -> Result<&'static Currency, String> {
    iso::find(&code.to_ascii_uppercase()).ok_or_else(|| format!("unknown currency code: {code}"))
}

impl AppConfig {
    /// Load configuration from environment and CLI arguments
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be parsed
    pub fn load() -> Result<Self, clap::Error> {
        // Load .env file if present (ignore if missing)
        _ = dotenvy::dotenv();

        Self::try_parse()
    }
}
