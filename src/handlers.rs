//! CLI command handlers, separated from main.rs to enable unit testing.

use crate::cli::{Cli, OutputFormat};
use crate::config::{resolve_level, Theme};
use crate::loader::load_path;
use crate::merge::Summary;
use crate::reporter::{CsvReporter, HtmlReporter, JsonReporter, Reporter, TerminalReporter};
use crate::resultset::{read_plugin_filter, ResultSet};
use std::fs;
use std::process::ExitCode;
use tracing::{info, warn};

/// Ingest every input file, render the merged result, and map failures to
/// exit codes: 0 on success, 2 when no input could be loaded or an option
/// was invalid.
pub fn run_normal_mode(cli: &Cli) -> ExitCode {
    let mut summary = Summary::new();
    let mut loaded = 0usize;

    for path in &cli.paths {
        match load_path(path) {
            Ok(report) => {
                let stats = summary.ingest(report);
                info!(
                    path = %path.display(),
                    added = stats.hosts_added,
                    merged = stats.hosts_merged,
                    duplicates = stats.duplicate_runs,
                    "ingested report"
                );
                loaded += 1;
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load report");
                eprintln!("Error loading {}: {}", path.display(), e);
            }
        }
    }

    if loaded == 0 {
        eprintln!("No input files could be loaded");
        return ExitCode::from(2);
    }

    let mut set = ResultSet::load(&summary);

    if let Some(ref raw) = cli.min_level {
        let floor = match resolve_level(raw) {
            Ok(severity) => severity,
            Err(e) => {
                eprintln!("{e}");
                return ExitCode::from(2);
            }
        };
        set.filter(|f| f.severity >= floor);
    }

    if let Some(ref path) = cli.filter_plugins {
        match read_plugin_filter(path) {
            Ok(ids) => set.filter_by_plugin_ids(&ids),
            Err(e) => {
                eprintln!("{e}");
                return ExitCode::from(2);
            }
        }
    }

    if !cli.addresses.is_empty() {
        let patterns: Vec<&str> = cli.addresses.iter().map(String::as_str).collect();
        if let Err(e) = set.filter_by_addresses(&patterns) {
            eprintln!("{e}");
            return ExitCode::from(2);
        }
    }

    let keys: Vec<&str> = cli.order_by.iter().map(String::as_str).collect();
    if let Err(e) = set.order_by(&keys) {
        eprintln!("{e}");
        return ExitCode::from(2);
    }

    let output = match render(cli, &summary, &set) {
        Ok(output) => output,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::from(2);
        }
    };

    match cli.output {
        Some(ref path) => match fs::write(path, &output) {
            Ok(()) => {
                println!("Output written to {}", path.display());
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Failed to write output to {}: {}", path.display(), e);
                ExitCode::from(2)
            }
        },
        None => {
            println!("{output}");
            ExitCode::SUCCESS
        }
    }
}

fn render(cli: &Cli, summary: &Summary, set: &ResultSet) -> crate::error::Result<String> {
    match cli.format {
        OutputFormat::Terminal => TerminalReporter::new(cli.verbose).report(summary, set),
        OutputFormat::Json => JsonReporter.report(summary, set),
        OutputFormat::Csv => CsvReporter::new(cli.delimiter).report(summary, set),
        OutputFormat::Html => {
            let theme = match cli.theme {
                Some(ref path) => Theme::load(path)?,
                None => Theme::default(),
            };
            HtmlReporter::new(theme, cli.title.clone()).report(summary, set)
        }
    }
}
