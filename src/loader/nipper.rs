//! Loader for Nipper device-audit HTML reports.
//!
//! Nipper audits network device configurations and reports per-device
//! issues, so there is no IP address to key on: the host identity is the
//! device type and name parsed from the document title.

use crate::error::{ReportError, Result};
use crate::loader::ReportLoader;
use crate::model::{
    Finding, Host, HostDiagnostic, HostIdentity, Report, ReportFormat, ScanFile, ScannerInfo,
    Severity,
};
use crate::tree::{Document, Node};
use regex::Regex;
use std::sync::LazyLock;
use tracing::warn;

// Ordered device-title patterns; first match wins.
static DEVICE_TITLES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"^(Juniper NetScreen) (.*) Security Report$",
        r"^(Cisco PIX Security Appliance) (.*) Security Report$",
        r"^(Cisco Router) (.*) Security Report$",
        r"^(Cisco Catalyst) (.*) Security Report$",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static ISSUE_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9.]+\s+(.*)$").unwrap());

// Structural divs that are not issue sections.
const SKIP_DIVS: &[&str] = &[
    "frontpage",
    "contents",
    "tableindex",
    "about",
    "security",
    "appendix",
    "GEN.SECINTRO.1",
    "GEN.SECCONCL.1",
    "GEN.SECRECOM.1",
    "ABOUTREPORTORGANISATION",
    "ABOUTREPORTCONVENTIONS",
    "APPENDIX-ABBREV",
    "APPENDIX-PORTS",
    "APPENDIX-PROTOCOLS",
    "APPENDIX-ICMPTYPES",
    "APPENDIX-NIPPERVER",
];

fn map_rating(class: &str) -> Result<Severity> {
    match class {
        "high" | "critical" => Ok(Severity::High),
        "medium" => Ok(Severity::Medium),
        "low" => Ok(Severity::Low),
        "info" | "informational" => Ok(Severity::Info),
        other => Err(ReportError::SeverityMapping {
            format: "nipper",
            value: other.to_string(),
        }),
    }
}

pub struct NipperLoader;

impl ReportLoader for NipperLoader {
    fn format(&self) -> ReportFormat {
        ReportFormat::Nipper
    }

    fn matches(&self, doc: &Document) -> bool {
        doc.root().tag() == "html"
    }

    fn load(&self, doc: &Document, path: &str) -> Result<Report> {
        let root = doc.root();

        let title = root
            .descendants()
            .find(|n| n.tag() == "title")
            .and_then(|n| n.text())
            .unwrap_or("");
        let identity = parse_device_title(title)?;

        if !root
            .descendants()
            .any(|n| n.tag() == "div" && n.attribute("id") == Some("contents"))
        {
            return Err(ReportError::MalformedDocument {
                path: path.to_string(),
                message: "no table of contents found".to_string(),
            });
        }

        let mut host = Host::new(identity.clone());
        host.names.push(identity.label());
        let mut skipped = Vec::new();

        for div in root.descendants().filter(|n| n.tag() == "div") {
            let Some(id) = div.attribute("id") else {
                continue;
            };
            if SKIP_DIVS.contains(&id) {
                continue;
            }
            match load_issue(div, id, &identity) {
                Ok(finding) => host.findings.push(finding),
                Err(e) => {
                    warn!(path, section = id, error = %e, "skipping issue section");
                    skipped.push(HostDiagnostic {
                        host: format!("{} ({id})", identity.label()),
                        message: e.to_string(),
                    });
                }
            }
        }

        Ok(Report {
            file: ScanFile {
                path: path.to_string(),
                format: ReportFormat::Nipper,
                scanner: Some(ScannerInfo {
                    name: Some("nipper".to_string()),
                    ..Default::default()
                }),
            },
            hosts: vec![host],
            skipped,
        })
    }
}

fn parse_device_title(title: &str) -> Result<HostIdentity> {
    for re in DEVICE_TITLES.iter() {
        if let Some(captures) = re.captures(title.trim()) {
            return Ok(HostIdentity::Device {
                device: captures[1].to_string(),
                name: captures[2].to_string(),
            });
        }
    }
    Err(ReportError::UnrecognizedDevice(title.to_string()))
}

fn load_issue(section: &Node, id: &str, identity: &HostIdentity) -> Result<Finding> {
    let header = section
        .descendants()
        .find(|n| n.tag() == "h3")
        .and_then(|n| n.text())
        .unwrap_or("");
    let name = ISSUE_HEADER
        .captures(header.trim())
        .map(|c| c[1].to_string())
        .ok_or_else(|| ReportError::MalformedDocument {
            path: id.to_string(),
            message: format!("could not parse issue header: {header}"),
        })?;

    let mut severity = None;
    let mut finding = Finding {
        plugin_id: id.to_string(),
        name,
        severity: Severity::Info,
        target: identity.clone(),
        port: None,
        protocol: None,
        service: None,
        description: Vec::new(),
        solution: None,
        impact: Vec::new(),
        extra: Vec::new(),
    };

    for sub in section.descendants().filter(|n| n.tag() == "div") {
        match sub.attribute("class") {
            Some("ratings") => severity = Some(rating_severity(sub)?),
            Some("finding") => finding.description = paragraphs(sub),
            Some("impact") => finding.impact = paragraphs(sub),
            Some("recommendation") => {
                let text = paragraphs(sub).join(" ");
                if !text.is_empty() {
                    finding.solution = Some(text);
                }
            }
            Some("ease") => {
                let lines = paragraphs(sub);
                if !lines.is_empty() {
                    finding.extra.push((
                        "ease".to_string(),
                        crate::fields::FieldValue::Text(lines),
                    ));
                }
            }
            _ => {}
        }
    }

    finding.severity = severity.ok_or_else(|| ReportError::SeverityMapping {
        format: "nipper",
        value: "<no rating>".to_string(),
    })?;
    Ok(finding)
}

// The overall rating renders as nested font elements; the inner font's
// class attribute carries the level.
fn rating_severity(section: &Node) -> Result<Severity> {
    let class = section
        .descendants()
        .find(|n| n.tag() == "font" && n.attribute("class") == Some("overallrating"))
        .and_then(|n| n.child("font"))
        .and_then(|n| n.attribute("class"))
        .ok_or_else(|| ReportError::SeverityMapping {
            format: "nipper",
            value: "<no rating>".to_string(),
        })?;
    map_rating(class)
}

fn paragraphs(section: &Node) -> Vec<String> {
    section
        .descendants()
        .filter(|n| n.tag() == "p")
        .filter_map(flat_text)
        .collect()
}

// Paragraphs may contain inline markup; flatten all text below the node.
fn flat_text(node: &Node) -> Option<String> {
    let parts: Vec<&str> = node
        .descendants()
        .filter_map(|n| n.text())
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" ").replace('\n', " "))
    }
}
