//! Loader for GFI LANguard XML reports.
//!
//! LANguard output is a software inventory: hosts, their names, and the
//! applications installed on them. No findings are produced, so every
//! host from this format lands in the summary's no-findings bucket.

use crate::address::Address;
use crate::error::{ReportError, Result};
use crate::loader::ReportLoader;
use crate::model::{
    AddressFamily, Host, HostAddress, HostDiagnostic, Report, ReportFormat, ScanFile, ScannerInfo,
    SoftwarePackage,
};
use crate::tree::{Document, Node};
use tracing::warn;

pub struct GfiLoader;

impl ReportLoader for GfiLoader {
    fn format(&self) -> ReportFormat {
        ReportFormat::Gfi
    }

    fn matches(&self, doc: &Document) -> bool {
        doc.root().tag() == "scanreport"
    }

    fn load(&self, doc: &Document, path: &str) -> Result<Report> {
        let root = doc.root();
        let scanner = ScannerInfo {
            name: Some("gfi languard".to_string()),
            version: root.attribute("version").map(str::to_string),
            ..Default::default()
        };

        let mut hosts = Vec::new();
        let mut skipped = Vec::new();
        for host_node in root
            .child("hosts")
            .into_iter()
            .flat_map(|h| h.children("host"))
        {
            match load_host(host_node) {
                Ok(host) => hosts.push(host),
                Err(e) => {
                    let identity = host_node
                        .child("ip")
                        .and_then(|n| n.text())
                        .unwrap_or("<no ip>")
                        .to_string();
                    warn!(path, host = %identity, error = %e, "skipping host record");
                    skipped.push(HostDiagnostic {
                        host: identity,
                        message: e.to_string(),
                    });
                }
            }
        }

        Ok(Report {
            file: ScanFile {
                path: path.to_string(),
                format: ReportFormat::Gfi,
                scanner: Some(scanner),
            },
            hosts,
            skipped,
        })
    }
}

fn load_host(node: &Node) -> Result<Host> {
    let raw = node
        .child("ip")
        .and_then(|n| n.text())
        .ok_or_else(|| ReportError::AddressParse("<missing ip element>".to_string()))?;
    let address = Address::parse(raw)?;
    if !address.is_ipv4() {
        return Err(ReportError::AddressParse(raw.to_string()));
    }

    let mut host = Host::new(address);
    host.addresses
        .push(HostAddress::new(AddressFamily::Ipv4, raw.trim()));

    if let Some(hostname) = node.child("hostname").and_then(|n| n.text()) {
        let hostname = hostname.trim();
        if !hostname.is_empty() {
            host.names.push(hostname.to_string());
        }
    }
    for name in node
        .child("names")
        .into_iter()
        .flat_map(|n| n.children("name"))
    {
        if let Some(value) = name.attribute("serv") {
            if !value.is_empty() && !host.names.contains(&value.to_string()) {
                host.names.push(value.to_string());
            }
        }
    }

    for app in node
        .child("apps_installed")
        .into_iter()
        .flat_map(|a| a.children("app"))
    {
        let Some(name) = app.attribute("name") else {
            continue;
        };
        host.software.push(SoftwarePackage {
            name: name.to_string(),
            version: app.attribute("version").map(str::to_string),
            publisher: app.attribute("publisher").map(str::to_string),
        });
    }

    Ok(host)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCAN: &str = r#"<scanreport version="9.5" scandate="2011-03-14">
<hosts>
<host>
<ip>10.1.0.5</ip>
<hostname>ws05.example.com</hostname>
<names>
<name type="dns" serv="ws05.example.com"/>
<name type="netbios" serv="WS05"/>
</names>
<apps_installed>
<app name="Mozilla Firefox" version="3.6.15" publisher="Mozilla"/>
<app name="7-Zip" version="9.20"/>
</apps_installed>
</host>
<host>
<ip>10.1.0.6</ip>
<hostname>ws06.example.com</hostname>
</host>
</hosts>
</scanreport>"#;

    fn parse(xml: &str) -> Document {
        Document::parse_xml(xml, "scan.xml").unwrap()
    }

    #[test]
    fn test_matches_root() {
        assert!(GfiLoader.matches(&parse("<scanreport/>")));
        assert!(!GfiLoader.matches(&parse("<SecScan/>")));
    }

    #[test]
    fn test_load_inventory() {
        let report = GfiLoader.load(&parse(SCAN), "scan.xml").unwrap();
        assert_eq!(report.hosts.len(), 2);

        let host = &report.hosts[0];
        assert_eq!(host.identity.label(), "10.1.0.5");
        assert_eq!(host.names, vec!["ws05.example.com".to_string(), "WS05".to_string()]);
        assert_eq!(host.software.len(), 2);
        assert_eq!(host.software[0].name, "Mozilla Firefox");
        assert_eq!(host.software[0].publisher.as_deref(), Some("Mozilla"));
        assert_eq!(host.software[1].version.as_deref(), Some("9.20"));
        assert!(host.findings.is_empty());

        // A host with no installed apps still loads.
        assert!(report.hosts[1].software.is_empty());
    }

    #[test]
    fn test_bad_ip_reports_diagnostic() {
        let xml = r#"<scanreport><hosts>
<host><ip>fe80::1</ip></host>
<host><ip>10.1.0.7</ip></host>
</hosts></scanreport>"#;
        let report = GfiLoader.load(&parse(xml), "scan.xml").unwrap();
        assert_eq!(report.hosts.len(), 1);
        assert_eq!(report.hosts[0].identity.label(), "10.1.0.7");
        assert_eq!(report.skipped.len(), 1);
        assert!(report.skipped[0].message.contains("Error parsing address"));
    }
}
