use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, ValueEnum, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Terminal,
    Json,
    Csv,
    Html,
}

#[derive(Parser, Debug)]
#[command(
    name = "scanreports",
    version,
    about = "Normalize and aggregate security scan reports",
    long_about = "scanreports ingests Nessus, Nmap, MBSA, GFI LANguard, and Nipper \
reports, merges them into one host-keyed summary, and renders the combined \
findings as terminal, CSV, HTML, or JSON output."
)]
pub struct Cli {
    /// Report files to ingest
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Terminal)]
    pub format: OutputFormat,

    /// Write output to a file instead of stdout
    #[arg(short = 'O', long)]
    pub output: Option<PathBuf>,

    /// Sort keys, comma separated; prefix with '-' for descending
    /// (address, severity, port, plugin_id, name)
    #[arg(
        short,
        long,
        value_delimiter = ',',
        allow_hyphen_values = true,
        default_value = "address,-severity,port"
    )]
    pub order_by: Vec<String>,

    /// Only include findings for these addresses or CIDR networks
    #[arg(short, long = "address")]
    pub addresses: Vec<String>,

    /// Plugin filter list file; listed plugin ids are dropped
    #[arg(long)]
    pub filter_plugins: Option<PathBuf>,

    /// Minimum severity to include (name or level 0-3)
    #[arg(short = 'l', long)]
    pub min_level: Option<String>,

    /// Theme YAML file for HTML output colors
    #[arg(long)]
    pub theme: Option<PathBuf>,

    /// Delimiter for CSV output
    #[arg(long, default_value_t = ',')]
    pub delimiter: char,

    /// Title for HTML output
    #[arg(long, default_value = "Scan Report")]
    pub title: String,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,
}
