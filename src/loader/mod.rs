//! Report loaders, one per supported tool format.
//!
//! Each loader validates the document's declared root, walks the tree
//! through the generic adapter, classifies and coerces native fields, and
//! produces one canonical [`Report`]. Formats never share parsing code
//! beyond the adapter and the field coercer.

pub mod gfi;
pub mod mbsa;
pub mod nessus;
pub mod nipper;
pub mod nmap;

use crate::error::{ReportError, Result};
use crate::model::{Report, ReportFormat};
use crate::tree::Document;
use std::fs;
use std::path::Path;
use tracing::debug;

pub use gfi::GfiLoader;
pub use mbsa::MbsaLoader;
pub use nessus::NessusLoader;
pub use nipper::NipperLoader;
pub use nmap::NmapLoader;

/// Capability interface for one tool format.
pub trait ReportLoader {
    fn format(&self) -> ReportFormat;

    /// Cheap root/format check so a driver can try loaders in sequence.
    fn matches(&self, doc: &Document) -> bool;

    /// Walk the document into a canonical report. The document is assumed
    /// to be well-formed markup already; "wrong format" is reported via
    /// `matches`, not here.
    fn load(&self, doc: &Document, path: &str) -> Result<Report>;
}

/// All supported loaders, in dispatch order.
pub fn loaders() -> Vec<Box<dyn ReportLoader>> {
    vec![
        Box::new(NessusLoader),
        Box::new(NmapLoader),
        Box::new(MbsaLoader),
        Box::new(GfiLoader),
        Box::new(NipperLoader),
    ]
}

/// Load a parsed document with the first loader whose format matches.
pub fn load_report(doc: &Document, path: &str) -> Result<Report> {
    for loader in loaders() {
        if loader.matches(doc) {
            debug!(path, format = loader.format().as_str(), "loading report");
            return loader.load(doc, path);
        }
    }
    Err(ReportError::UnsupportedFormat {
        path: path.to_string(),
        root: doc.root().tag().to_string(),
    })
}

/// Read and load a report file from disk.
///
/// File existence and readability are checked here; `.htm`/`.html` inputs
/// are parsed leniently, everything else as strict XML.
pub fn load_path(path: &Path) -> Result<Report> {
    if !path.is_file() {
        return Err(ReportError::FileNotFound(path.display().to_string()));
    }
    let content = fs::read_to_string(path).map_err(|source| ReportError::ReadError {
        path: path.display().to_string(),
        source,
    })?;
    let display = path.display().to_string();
    let is_html = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("html") || e.eq_ignore_ascii_case("htm"))
        .unwrap_or(false);
    let doc = if is_html {
        Document::parse_html(&content, &display)?
    } else {
        Document::parse_xml(&content, &display)?
    };
    load_report(&doc, &display)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_report_unsupported_root() {
        let doc = Document::parse_xml("<SomethingElse/>", "t.xml").unwrap();
        let err = load_report(&doc, "t.xml").unwrap_err();
        assert!(matches!(err, ReportError::UnsupportedFormat { .. }));
        assert!(err.to_string().contains("SomethingElse"));
    }

    #[test]
    fn test_load_path_missing_file() {
        let err = load_path(Path::new("/nonexistent/scan.xml")).unwrap_err();
        assert!(matches!(err, ReportError::FileNotFound(_)));
    }
}
