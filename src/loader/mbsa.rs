//! Loader for Microsoft Baseline Security Analyzer XML reports.
//!
//! One report file describes a single Windows host; each `Check` node
//! becomes a finding graded on the tool's 1..=5 scale.

use crate::address::Address;
use crate::error::{ReportError, Result};
use crate::fields::{coerce_value, FieldKind, FieldValue};
use crate::loader::ReportLoader;
use crate::model::{
    AddressFamily, Finding, Host, HostAddress, HostDiagnostic, Report, ReportFormat, ScanFile,
    ScannerInfo, Severity,
};
use crate::tree::{Document, Node};
use tracing::warn;

pub struct MbsaLoader;

fn map_grade(grade: i64) -> Result<Severity> {
    match grade {
        1 => Ok(Severity::High),
        2 => Ok(Severity::Medium),
        3 => Ok(Severity::Low),
        4 | 5 => Ok(Severity::Info),
        other => Err(ReportError::SeverityMapping {
            format: "mbsa",
            value: other.to_string(),
        }),
    }
}

impl ReportLoader for MbsaLoader {
    fn format(&self) -> ReportFormat {
        ReportFormat::Mbsa
    }

    fn matches(&self, doc: &Document) -> bool {
        doc.root().tag() == "SecScan"
    }

    fn load(&self, doc: &Document, path: &str) -> Result<Report> {
        let mut hosts = Vec::new();
        let mut skipped = Vec::new();

        match load_host(doc.root()) {
            Ok(host) => hosts.push(host),
            Err(e) => {
                let identity = doc
                    .root()
                    .attribute("DisplayName")
                    .or_else(|| doc.root().attribute("IP"))
                    .unwrap_or("<unknown host>")
                    .to_string();
                warn!(path, host = %identity, error = %e, "skipping host record");
                skipped.push(HostDiagnostic {
                    host: identity,
                    message: e.to_string(),
                });
            }
        }

        Ok(Report {
            file: ScanFile {
                path: path.to_string(),
                format: ReportFormat::Mbsa,
                scanner: Some(ScannerInfo {
                    name: Some("mbsa".to_string()),
                    ..Default::default()
                }),
            },
            hosts,
            skipped,
        })
    }
}

fn load_host(root: &Node) -> Result<Host> {
    let raw = root
        .attribute("IP")
        .ok_or_else(|| ReportError::AddressParse("<missing IP attribute>".to_string()))?;
    let address = Address::parse(raw)?;

    let mut host = Host::new(address);
    host.addresses
        .push(HostAddress::new(AddressFamily::Ipv4, raw.trim()));
    if let Some(name) = root.attribute("DisplayName") {
        host.names.push(name.to_string());
    }

    for check in root.children("Check") {
        host.findings.push(load_check(check, address)?);
    }
    host.findings.sort_by(|a, b| b.severity.cmp(&a.severity));

    Ok(host)
}

fn load_check(node: &Node, address: Address) -> Result<Finding> {
    let grade = attr_int(node, "Grade")?.ok_or_else(|| ReportError::SeverityMapping {
        format: "mbsa",
        value: "<missing grade>".to_string(),
    })?;
    let severity = map_grade(grade)?;

    let mut finding = Finding {
        plugin_id: attr_int(node, "ID")?
            .map(|id| id.to_string())
            .unwrap_or_default(),
        name: node.attribute("Name").unwrap_or_default().to_string(),
        severity,
        target: address.into(),
        port: None,
        protocol: None,
        service: None,
        description: Vec::new(),
        solution: None,
        impact: Vec::new(),
        extra: Vec::new(),
    };

    for advice in node.children("Advice") {
        if let Some(text) = advice.text() {
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                finding.description.push(trimmed.to_string());
            }
        }
    }

    // Detail tables list the security updates the tool checked; only the
    // ones not yet installed are worth surfacing.
    let mut missing = Vec::new();
    for detail in node.children("Detail") {
        for update in detail.children("UpdateData") {
            if let Some(update) = load_update(update)? {
                missing.push(update);
            }
        }
    }
    if !missing.is_empty() {
        finding
            .extra
            .push(("missing_updates".to_string(), FieldValue::Text(missing)));
    }

    Ok(finding)
}

// Returns the update's summary line, or None when it is already installed.
fn load_update(node: &Node) -> Result<Option<String>> {
    let installed = match node.attribute("IsInstalled") {
        Some(raw) => coerce_value(&FieldKind::Boolean, "IsInstalled", raw)?
            .and_then(|v| v.as_bool())
            .unwrap_or(false),
        None => false,
    };
    if installed {
        return Ok(None);
    }

    let kbid = attr_int(node, "KBID")?;
    let title = node
        .child("Title")
        .and_then(|t| t.text())
        .unwrap_or_default()
        .trim()
        .to_string();
    let line = match kbid {
        Some(id) => format!("KB{id} {title}"),
        None => title,
    };
    if line.is_empty() {
        Ok(None)
    } else {
        Ok(Some(line))
    }
}

fn attr_int(node: &Node, name: &str) -> Result<Option<i64>> {
    match node.attribute(name) {
        Some(raw) => {
            Ok(coerce_value(&FieldKind::Integer, name, raw)?.and_then(|v| v.as_integer()))
        }
        None => Ok(None),
    }
}
