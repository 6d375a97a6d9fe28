pub mod address;
pub mod cli;
pub mod config;
pub mod error;
pub mod fields;
pub mod handlers;
pub mod loader;
pub mod merge;
pub mod model;
pub mod reporter;
pub mod resultset;
pub mod tree;

pub use address::{Address, AddressMatcher};
pub use cli::{Cli, OutputFormat};
pub use config::Theme;
pub use error::{ReportError, Result};
pub use fields::{FieldKind, FieldTable, FieldValue};
pub use loader::{load_path, load_report, ReportLoader};
pub use merge::{IngestStats, Summary};
pub use model::{Finding, Host, HostIdentity, Report, ReportFormat, ScanRun, Severity};
pub use reporter::{CsvReporter, HtmlReporter, JsonReporter, Reporter, TerminalReporter};
pub use resultset::{read_plugin_filter, ResultSet};
pub use tree::{Document, Node};
