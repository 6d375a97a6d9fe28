//! Loader for Nessus v2 vulnerability-scan XML exports.

use crate::address::Address;
use crate::error::{ReportError, Result};
use crate::fields::{coerce_value, derive_reference_urls, FieldKind, FieldTable, FieldValue};
use crate::loader::ReportLoader;
use crate::model::{
    AddressFamily, Finding, Host, HostAddress, HostDiagnostic, Report, ReportFormat, ScanFile,
    ScanRun, ScannerInfo, Severity,
};
use crate::tree::{Document, Node};
use chrono::NaiveDateTime;
use tracing::warn;

const REPORT_FORMATS: &[&str] = &["NessusClientData_v2"];

const PLUGIN_TYPES: &[&str] = &["combined", "local", "summary", "remote"];

const RISK_FACTORS: &[&str] = &["Low", "Medium", "High", "Critical"];

const PLUGIN_REVISION_PATTERNS: &[&str] = &[r"^\$Revision:\s+(.*)\s+\$$", r"^([0-9.]+)$"];

// Host timestamps as emitted in HostProperties, e.g. "Mon Mar 14 13:55:12 2011".
const HOST_TIME_FORMATS: &[&str] = &["%a %b %e %H:%M:%S %Y", "%a %b %d %H:%M:%S %Y"];

fn field_table() -> FieldTable {
    FieldTable::new(&[
        ("port", FieldKind::Integer),
        ("severity", FieldKind::Integer),
        ("pluginID", FieldKind::Integer),
        ("bid", FieldKind::Integer),
        ("cvss_base_score", FieldKind::Decimal),
        ("cvss_temporal_score", FieldKind::Decimal),
        ("exploit_available", FieldKind::Boolean),
        ("exploit_framework_metasploit", FieldKind::Boolean),
        ("exploit_framework_canvas", FieldKind::Boolean),
        ("exploit_framework_core", FieldKind::Boolean),
        ("description", FieldKind::Text),
        ("plugin_output", FieldKind::Text),
        ("synopsis", FieldKind::Text),
        ("plugin_modification_date", FieldKind::DateList),
        ("plugin_publication_date", FieldKind::DateList),
        ("vuln_publication_date", FieldKind::DateList),
        ("patch_publication_date", FieldKind::DateList),
        ("cve", FieldKind::Reference),
        ("cpe", FieldKind::Reference),
        ("xref", FieldKind::Reference),
        ("see_also", FieldKind::Reference),
        ("plugin_type", FieldKind::Enum(PLUGIN_TYPES)),
        ("plugin_version", FieldKind::Versioned(PLUGIN_REVISION_PATTERNS)),
        ("cvss_vector", FieldKind::String),
        ("cvss_temporal_vector", FieldKind::String),
        ("exploitability_ease", FieldKind::String),
        ("metasploit_name", FieldKind::String),
        ("canvas_package", FieldKind::String),
    ])
}

fn map_severity(level: i64) -> Result<Severity> {
    u8::try_from(level)
        .ok()
        .and_then(Severity::from_level)
        .ok_or_else(|| ReportError::SeverityMapping {
            format: "nessus",
            value: level.to_string(),
        })
}

pub struct NessusLoader;

impl ReportLoader for NessusLoader {
    fn format(&self) -> ReportFormat {
        ReportFormat::Nessus
    }

    fn matches(&self, doc: &Document) -> bool {
        REPORT_FORMATS.contains(&doc.root().tag())
    }

    fn load(&self, doc: &Document, path: &str) -> Result<Report> {
        let table = field_table();
        let mut hosts = Vec::new();
        let mut skipped = Vec::new();

        for report in doc.root().children("Report") {
            for host_node in report.children("ReportHost") {
                match load_host(host_node, &table) {
                    Ok(host) => hosts.push(host),
                    Err(e) => {
                        let identity = host_node
                            .attribute("name")
                            .unwrap_or("<missing name>")
                            .to_string();
                        warn!(path, host = %identity, error = %e, "skipping host record");
                        skipped.push(HostDiagnostic {
                            host: identity,
                            message: e.to_string(),
                        });
                    }
                }
            }
        }

        Ok(Report {
            file: ScanFile {
                path: path.to_string(),
                format: ReportFormat::Nessus,
                scanner: Some(ScannerInfo {
                    name: Some("nessus".to_string()),
                    ..Default::default()
                }),
            },
            hosts,
            skipped,
        })
    }
}

fn load_host(node: &Node, table: &FieldTable) -> Result<Host> {
    let raw = node
        .attribute("name")
        .ok_or_else(|| ReportError::AddressParse("<missing name attribute>".to_string()))?;
    let address = Address::parse(raw)?;

    let mut host = Host::new(address);
    let family = if address.is_ipv4() {
        AddressFamily::Ipv4
    } else {
        AddressFamily::Ipv6
    };
    host.addresses.push(HostAddress::new(family, raw.trim()));

    let mut started = None;
    let mut ended = None;
    if let Some(properties) = node.child("HostProperties") {
        for tag in properties.children("tag") {
            let (Some(name), Some(text)) = (tag.attribute("name"), tag.text()) else {
                continue;
            };
            match name.to_lowercase().as_str() {
                "host-fqdn" | "netbios-name" | "hostname" => {
                    if !host.names.contains(&text.to_string()) {
                        host.names.push(text.to_string());
                    }
                }
                "host_start" => started = parse_host_time(text),
                "host_end" => ended = parse_host_time(text),
                _ => {}
            }
        }
    }
    if let (Some(started), Some(ended)) = (started, ended) {
        host.runs.push(ScanRun::new(started, ended));
    }

    for item in node.children("ReportItem") {
        let finding = load_finding(item, address, table)
            .map_err(|e| host_scoped(address, e))?;
        host.findings.push(finding);
    }

    Ok(host)
}

// Keep the failing host's address in the diagnostic so the error is
// actionable without re-reading the file.
fn host_scoped(address: Address, error: ReportError) -> ReportError {
    match error {
        ReportError::FieldCoercion {
            field,
            value,
            expected,
        } => ReportError::FieldCoercion {
            field: format!("{address} {field}"),
            value,
            expected,
        },
        other => other,
    }
}

fn load_finding(item: &Node, address: Address, table: &FieldTable) -> Result<Finding> {
    let attr_int = |name: &str| -> Result<Option<i64>> {
        match item.attribute(name) {
            Some(raw) => Ok(coerce_value(&FieldKind::Integer, name, raw)?
                .and_then(|v| v.as_integer())),
            None => Ok(None),
        }
    };

    let severity_level = attr_int("severity")?.ok_or_else(|| ReportError::SeverityMapping {
        format: "nessus",
        value: "<missing severity>".to_string(),
    })?;
    let severity = map_severity(severity_level)?;

    let port = match attr_int("port")? {
        Some(p) => Some(u16::try_from(p).map_err(|_| ReportError::FieldCoercion {
            field: "port".to_string(),
            value: p.to_string(),
            expected: "integer",
        })?),
        None => None,
    };

    let plugin_id = match attr_int("pluginID")? {
        Some(id) => id.to_string(),
        None => String::new(),
    };

    let mut finding = Finding {
        plugin_id,
        name: item.attribute("pluginName").unwrap_or_default().to_string(),
        severity,
        target: address.into(),
        port,
        protocol: item.attribute("protocol").map(str::to_string),
        service: item.attribute("svc_name").map(str::to_string),
        description: Vec::new(),
        solution: None,
        impact: Vec::new(),
        extra: Vec::new(),
    };
    if let Some(family) = item.attribute("pluginFamily") {
        finding
            .extra
            .push(("plugin_family".to_string(), FieldValue::String(family.to_string())));
    }

    for child in item.all_children() {
        let tag = child.tag();
        let raw = child.text().unwrap_or("");

        match tag {
            "solution" => {
                let flattened = raw.replace('\n', " ").trim().to_string();
                if !(flattened.is_empty() || flattened.eq_ignore_ascii_case("n/a")) {
                    finding.solution = Some(flattened);
                }
                continue;
            }
            "risk_factor" => {
                // "None" and empty both mean no risk factor reported.
                if !(raw.is_empty() || raw == "None") {
                    let value = coerce_value(&FieldKind::Enum(RISK_FACTORS), tag, raw)?;
                    if let Some(value) = value {
                        push_extra(&mut finding.extra, tag, value)?;
                    }
                }
                continue;
            }
            "description" => {
                if let Some(FieldValue::Text(lines)) = table.coerce(tag, raw)? {
                    finding.description = lines;
                }
                continue;
            }
            _ => {}
        }

        if let Some(value) = table.coerce(tag, raw)? {
            push_extra(&mut finding.extra, tag, value)?;
        }
    }

    if let Some(FieldValue::References(refs)) = finding.extra_field("xref").cloned() {
        let urls = derive_reference_urls("xref", &refs)?;
        finding
            .extra
            .push(("xref_urls".to_string(), FieldValue::References(urls)));
    }

    Ok(finding)
}

fn push_extra(extra: &mut Vec<(String, FieldValue)>, name: &str, value: FieldValue) -> Result<()> {
    if let Some((_, existing)) = extra.iter_mut().find(|(k, _)| k == name) {
        match (existing, value) {
            // Reference fields repeat by design and accumulate in order.
            (FieldValue::References(list), FieldValue::References(new)) => {
                list.extend(new);
                Ok(())
            }
            (FieldValue::String(_), FieldValue::String(_)) => {
                Err(ReportError::DuplicateValue(name.to_string()))
            }
            (existing, value) => {
                *existing = value;
                Ok(())
            }
        }
    } else {
        extra.push((name.to_string(), value));
        Ok(())
    }
}

fn parse_host_time(raw: &str) -> Option<i64> {
    HOST_TIME_FORMATS.iter().find_map(|fmt| {
        NaiveDateTime::parse_from_str(raw.trim(), fmt)
            .ok()
            .map(|dt| dt.and_utc().timestamp())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(xml: &str) -> Document {
        Document::parse_xml(xml, "test.nessus").unwrap()
    }

    fn minimal_report(items: &str) -> String {
        format!(
            r#"<NessusClientData_v2>
<Report name="scan">
<ReportHost name="10.0.0.1">
<HostProperties>
<tag name="host-fqdn">web.example.com</tag>
<tag name="HOST_START">Mon Mar 14 13:55:12 2011</tag>
<tag name="HOST_END">Mon Mar 14 14:02:01 2011</tag>
</HostProperties>
{items}
</ReportHost>
</Report>
</NessusClientData_v2>"#
        )
    }

    const ITEM: &str = r#"<ReportItem port="443" svc_name="https" protocol="tcp" severity="3" pluginID="12345" pluginName="Test Plugin" pluginFamily="Web Servers">
<description>A vulnerable service.

Exploitation is trivial.</description>
<solution>Upgrade to
the latest release.</solution>
<risk_factor>High</risk_factor>
<cvss_base_score>7.5</cvss_base_score>
<cve>CVE-2011-0001</cve>
<cve>CVE-2011-0002</cve>
<xref>CWE:79</xref>
<xref>IAVA:2012-A-0004</xref>
<exploit_available>TRUE</exploit_available>
<plugin_type>remote</plugin_type>
<plugin_version>$Revision: 1.34 $</plugin_version>
</ReportItem>"#;

    #[test]
    fn test_matches_root() {
        assert!(NessusLoader.matches(&parse("<NessusClientData_v2/>")));
        assert!(!NessusLoader.matches(&parse("<NessusClientData_v1/>")));
    }

    #[test]
    fn test_load_minimal_report() {
        let doc = parse(&minimal_report(ITEM));
        let report = NessusLoader.load(&doc, "test.nessus").unwrap();

        assert_eq!(report.hosts.len(), 1);
        let host = &report.hosts[0];
        assert_eq!(host.identity.label(), "10.0.0.1");
        assert_eq!(host.names, vec!["web.example.com".to_string()]);
        assert_eq!(host.runs.len(), 1);

        let finding = &host.findings[0];
        assert_eq!(finding.plugin_id, "12345");
        assert_eq!(finding.severity, Severity::High);
        assert_eq!(finding.port, Some(443));
        assert_eq!(finding.protocol.as_deref(), Some("tcp"));
        assert_eq!(finding.description.len(), 2);
        assert_eq!(
            finding.solution.as_deref(),
            Some("Upgrade to the latest release.")
        );
    }

    #[test]
    fn test_references_accumulate_in_order() {
        let doc = parse(&minimal_report(ITEM));
        let report = NessusLoader.load(&doc, "test.nessus").unwrap();
        let finding = &report.hosts[0].findings[0];

        assert_eq!(
            finding.extra_field("cve"),
            Some(&FieldValue::References(vec![
                "CVE-2011-0001".to_string(),
                "CVE-2011-0002".to_string(),
            ]))
        );
        // Unknown xref target keeps its raw value but derives no URL.
        assert_eq!(
            finding.extra_field("xref_urls"),
            Some(&FieldValue::References(vec![
                "http://cwe.mitre.org/data/definitions/79.html".to_string()
            ]))
        );
    }

    #[test]
    fn test_boolean_and_decimal_coercion() {
        let doc = parse(&minimal_report(ITEM));
        let report = NessusLoader.load(&doc, "test.nessus").unwrap();
        let finding = &report.hosts[0].findings[0];

        assert_eq!(
            finding.extra_field("exploit_available").and_then(|v| v.as_bool()),
            Some(true)
        );
        assert_eq!(
            finding.extra_field("cvss_base_score").map(|v| v.display()),
            Some("7.5".to_string())
        );
    }

    #[test]
    fn test_unmapped_severity_fails_host() {
        let item = r#"<ReportItem port="80" severity="9" pluginID="1" pluginName="x"/>"#;
        let doc = parse(&minimal_report(item));
        let report = NessusLoader.load(&doc, "test.nessus").unwrap();

        assert!(report.hosts.is_empty());
        assert_eq!(report.skipped.len(), 1);
        assert!(report.skipped[0].message.contains("severity"));
    }

    #[test]
    fn test_missing_address_skips_only_that_host() {
        let xml = r#"<NessusClientData_v2>
<Report name="scan">
<ReportHost>
<ReportItem port="80" severity="0" pluginID="1" pluginName="x"/>
</ReportHost>
<ReportHost name="10.0.0.2">
<ReportItem port="80" severity="0" pluginID="1" pluginName="x"/>
</ReportHost>
</Report>
</NessusClientData_v2>"#;
        let report = NessusLoader.load(&parse(xml), "test.nessus").unwrap();

        assert_eq!(report.hosts.len(), 1);
        assert_eq!(report.hosts[0].identity.label(), "10.0.0.2");
        assert_eq!(report.skipped.len(), 1);
        assert!(report.skipped[0].message.contains("Error parsing address"));
    }

    #[test]
    fn test_unrecognized_field_fails_host() {
        let item = r#"<ReportItem port="80" severity="0" pluginID="1" pluginName="x">
<brand_new_vendor_field>surprise</brand_new_vendor_field>
</ReportItem>"#;
        let doc = parse(&minimal_report(item));
        let report = NessusLoader.load(&doc, "test.nessus").unwrap();

        assert!(report.hosts.is_empty());
        assert!(report.skipped[0].message.contains("brand_new_vendor_field"));
    }

    #[test]
    fn test_duplicate_single_valued_field_fails() {
        let item = r#"<ReportItem port="80" severity="0" pluginID="1" pluginName="x">
<cvss_vector>AV:N</cvss_vector>
<cvss_vector>AV:L</cvss_vector>
</ReportItem>"#;
        let doc = parse(&minimal_report(item));
        let report = NessusLoader.load(&doc, "test.nessus").unwrap();

        assert!(report.hosts.is_empty());
        assert!(report.skipped[0].message.contains("cvss_vector"));
    }

    #[test]
    fn test_solution_na_collapses_to_absent() {
        let item = r#"<ReportItem port="80" severity="0" pluginID="1" pluginName="x">
<solution>n/a</solution>
</ReportItem>"#;
        let doc = parse(&minimal_report(item));
        let report = NessusLoader.load(&doc, "test.nessus").unwrap();
        assert_eq!(report.hosts[0].findings[0].solution, None);
    }

    #[test]
    fn test_risk_factor_none_is_absent() {
        let item = r#"<ReportItem port="80" severity="0" pluginID="1" pluginName="x">
<risk_factor>None</risk_factor>
</ReportItem>"#;
        let doc = parse(&minimal_report(item));
        let report = NessusLoader.load(&doc, "test.nessus").unwrap();
        assert_eq!(report.hosts[0].findings[0].extra_field("risk_factor"), None);
    }
}
