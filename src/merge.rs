//! Cross-file host merge.
//!
//! Reports from different tools (or repeated runs of the same tool) are
//! folded into one summary keyed by host identity. Re-ingesting a file is
//! idempotent: a host whose (start, end) run pair is already recorded is
//! skipped entirely.

use crate::model::{Host, HostDiagnostic, HostIdentity, Report, ScanFile};
use serde::Serialize;
use tracing::{debug, warn};

/// Accumulated state across all ingested reports.
#[derive(Debug, Default, Serialize)]
pub struct Summary {
    pub files: Vec<ScanFile>,
    pub hosts: Vec<Host>,
    /// Hosts that have contributed no findings so far (inventory-only
    /// formats, or hosts that came back clean).
    pub no_findings: Vec<HostIdentity>,
    pub diagnostics: Vec<HostDiagnostic>,
}

/// Per-ingest accounting, for driver display and logs.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IngestStats {
    pub hosts_added: usize,
    pub hosts_merged: usize,
    pub duplicate_runs: usize,
}

impl Summary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one loaded report into the summary.
    pub fn ingest(&mut self, report: Report) -> IngestStats {
        let mut stats = IngestStats::default();

        for host in report.hosts {
            match self.hosts.iter_mut().find(|h| h.same_target(&host)) {
                None => {
                    debug!(host = %host.identity.label(), "new host");
                    stats.hosts_added += 1;
                    self.hosts.push(host);
                }
                Some(existing) => {
                    if host.runs.iter().any(|run| existing.has_run(run)) {
                        warn!(
                            host = %host.identity.label(),
                            "scan run already ingested, skipping"
                        );
                        stats.duplicate_runs += 1;
                        continue;
                    }
                    debug!(host = %host.identity.label(), "merging host");
                    stats.hosts_merged += 1;
                    merge_host(existing, host);
                }
            }
        }

        self.diagnostics.extend(report.skipped);
        self.files.push(report.file);
        self.refresh_no_findings();
        stats
    }

    fn refresh_no_findings(&mut self) {
        self.no_findings = self
            .hosts
            .iter()
            .filter(|h| h.findings.is_empty())
            .map(|h| h.identity.clone())
            .collect();
        self.no_findings.sort();
    }

    /// Total findings across all hosts.
    pub fn finding_count(&self) -> usize {
        self.hosts.iter().map(|h| h.findings.len()).sum()
    }
}

fn merge_host(existing: &mut Host, incoming: Host) {
    for address in incoming.addresses {
        let seen = existing
            .addresses
            .iter()
            .any(|a| a.family == address.family && a.value == address.value);
        if !seen {
            existing.addresses.push(address);
        }
    }

    for name in incoming.names {
        if !existing.names.contains(&name) {
            existing.names.push(name);
        }
    }

    for port in incoming.ports {
        let seen = existing
            .ports
            .iter()
            .any(|p| p.protocol == port.protocol && p.number == port.number);
        if !seen {
            existing.ports.push(port);
        }
    }

    for package in incoming.software {
        let seen = existing
            .software
            .iter()
            .any(|s| s.name == package.name && s.version == package.version);
        if !seen {
            existing.software.push(package);
        }
    }

    for finding in incoming.findings {
        let seen = existing.findings.iter().any(|f| {
            f.plugin_id == finding.plugin_id
                && f.port == finding.port
                && f.protocol == finding.protocol
                && f.name == finding.name
        });
        if !seen {
            existing.findings.push(finding);
        }
    }

    existing.runs.extend(incoming.runs);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::Address;
    use crate::fields::FieldValue;
    use crate::model::{
        AddressFamily, Finding, HostAddress, Port, Report, ReportFormat, ScanRun, Severity,
    };

    fn finding(plugin_id: &str, address: &str, severity: Severity, port: Option<u16>) -> Finding {
        Finding {
            plugin_id: plugin_id.to_string(),
            name: format!("plugin {plugin_id}"),
            severity,
            target: Address::parse(address).unwrap().into(),
            port,
            protocol: port.map(|_| "tcp".to_string()),
            service: None,
            description: Vec::new(),
            solution: None,
            impact: Vec::new(),
            extra: Vec::new(),
        }
    }

    fn host(address: &str, run: ScanRun, findings: Vec<Finding>) -> Host {
        let addr = Address::parse(address).unwrap();
        let mut host = Host::new(addr);
        host.addresses
            .push(HostAddress::new(AddressFamily::Ipv4, address));
        host.runs.push(run);
        host.findings = findings;
        host
    }

    fn report(hosts: Vec<Host>) -> Report {
        Report {
            file: ScanFile {
                path: "scan.xml".to_string(),
                format: ReportFormat::Nessus,
                scanner: None,
            },
            hosts,
            skipped: Vec::new(),
        }
    }

    #[test]
    fn test_ingest_new_hosts() {
        let mut summary = Summary::new();
        let stats = summary.ingest(report(vec![
            host("10.0.0.1", ScanRun::new(100, 200), vec![
                finding("1", "10.0.0.1", Severity::High, Some(443)),
            ]),
            host("10.0.0.2", ScanRun::new(100, 200), Vec::new()),
        ]));

        assert_eq!(stats.hosts_added, 2);
        assert_eq!(stats.hosts_merged, 0);
        assert_eq!(summary.hosts.len(), 2);
        assert_eq!(summary.finding_count(), 1);
        assert_eq!(summary.no_findings.len(), 1);
        assert_eq!(summary.no_findings[0].label(), "10.0.0.2");
    }

    #[test]
    fn test_double_ingest_is_idempotent() {
        let make = || {
            report(vec![host(
                "10.0.0.1",
                ScanRun::new(100, 200),
                vec![finding("1", "10.0.0.1", Severity::High, Some(443))],
            )])
        };

        let mut summary = Summary::new();
        summary.ingest(make());
        let stats = summary.ingest(make());

        assert_eq!(stats.duplicate_runs, 1);
        assert_eq!(summary.hosts.len(), 1);
        assert_eq!(summary.finding_count(), 1);
        assert_eq!(summary.hosts[0].runs.len(), 1);
    }

    #[test]
    fn test_disjoint_runs_union_findings() {
        let mut summary = Summary::new();
        summary.ingest(report(vec![host(
            "10.0.0.1",
            ScanRun::new(100, 200),
            vec![finding("1", "10.0.0.1", Severity::High, Some(443))],
        )]));
        let stats = summary.ingest(report(vec![host(
            "10.0.0.1",
            ScanRun::new(300, 400),
            vec![
                finding("1", "10.0.0.1", Severity::High, Some(443)),
                finding("2", "10.0.0.1", Severity::Low, Some(80)),
            ],
        )]));

        assert_eq!(stats.hosts_merged, 1);
        assert_eq!(summary.hosts.len(), 1);
        // Duplicate finding deduplicated, new one added.
        assert_eq!(summary.finding_count(), 2);
        assert_eq!(summary.hosts[0].runs.len(), 2);
    }

    #[test]
    fn test_merge_unions_addresses_names_ports() {
        let mut first = host("10.0.0.1", ScanRun::new(100, 200), Vec::new());
        first.names.push("web.example.com".to_string());
        first.ports.push(Port {
            protocol: "tcp".to_string(),
            number: 443,
            state: Some("open".to_string()),
            service: Some("https".to_string()),
        });

        let mut second = host("10.0.0.1", ScanRun::new(300, 400), Vec::new());
        second
            .addresses
            .push(HostAddress::new(AddressFamily::Mac, "00:11:22:33:44:55"));
        second.names.push("web.example.com".to_string());
        second.names.push("web".to_string());
        second.ports.push(Port {
            protocol: "tcp".to_string(),
            number: 443,
            state: Some("open".to_string()),
            service: Some("https".to_string()),
        });
        second.ports.push(Port {
            protocol: "tcp".to_string(),
            number: 22,
            state: Some("open".to_string()),
            service: Some("ssh".to_string()),
        });

        let mut summary = Summary::new();
        summary.ingest(report(vec![first]));
        summary.ingest(report(vec![second]));

        let host = &summary.hosts[0];
        assert_eq!(host.addresses.len(), 2);
        assert_eq!(host.names, vec!["web.example.com".to_string(), "web".to_string()]);
        assert_eq!(host.ports.len(), 2);
    }

    #[test]
    fn test_no_findings_clears_once_findings_arrive() {
        let mut summary = Summary::new();
        summary.ingest(report(vec![host("10.0.0.1", ScanRun::new(100, 200), Vec::new())]));
        assert_eq!(summary.no_findings.len(), 1);

        summary.ingest(report(vec![host(
            "10.0.0.1",
            ScanRun::new(300, 400),
            vec![finding("1", "10.0.0.1", Severity::Info, None)],
        )]));
        assert!(summary.no_findings.is_empty());
    }

    #[test]
    fn test_diagnostics_accumulate() {
        let mut summary = Summary::new();
        let mut r = report(Vec::new());
        r.skipped.push(HostDiagnostic {
            host: "10.0.0.9".to_string(),
            message: "bad record".to_string(),
        });
        summary.ingest(r);
        assert_eq!(summary.diagnostics.len(), 1);
        assert_eq!(summary.files.len(), 1);
    }

    #[test]
    fn test_extra_fields_survive_merge() {
        let mut f = finding("1", "10.0.0.1", Severity::High, Some(443));
        f.extra
            .push(("cvss_vector".to_string(), FieldValue::String("AV:N".to_string())));
        let mut summary = Summary::new();
        summary.ingest(report(vec![host("10.0.0.1", ScanRun::new(100, 200), vec![f])]));

        let merged = &summary.hosts[0].findings[0];
        assert!(merged.extra_field("cvss_vector").is_some());
    }
}
