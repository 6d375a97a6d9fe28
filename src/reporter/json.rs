use crate::error::Result;
use crate::merge::Summary;
use crate::model::Severity;
use crate::reporter::Reporter;
use crate::resultset::ResultSet;
use serde::Serialize;

#[derive(Serialize)]
struct JsonDocument<'a> {
    files: &'a [crate::model::ScanFile],
    counters: CounterRow,
    findings: &'a [crate::model::Finding],
    no_findings: Vec<String>,
    diagnostics: &'a [crate::model::HostDiagnostic],
}

#[derive(Serialize)]
struct CounterRow {
    high: usize,
    medium: usize,
    low: usize,
    info: usize,
}

#[derive(Default)]
pub struct JsonReporter;

impl Reporter for JsonReporter {
    fn report(&self, summary: &Summary, set: &ResultSet) -> Result<String> {
        let counters = set.counters();
        let doc = JsonDocument {
            files: &summary.files,
            counters: CounterRow {
                high: counters[&Severity::High],
                medium: counters[&Severity::Medium],
                low: counters[&Severity::Low],
                info: counters[&Severity::Info],
            },
            findings: set.findings(),
            no_findings: summary.no_findings.iter().map(|i| i.label()).collect(),
            diagnostics: &summary.diagnostics,
        };
        Ok(serde_json::to_string_pretty(&doc)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::Address;
    use crate::model::{Finding, Host, Report, ReportFormat, ScanFile, ScanRun};

    #[test]
    fn test_json_document_shape() {
        let address = Address::parse("10.0.0.1").unwrap();
        let mut host = Host::new(address);
        host.runs.push(ScanRun::new(0, 1));
        host.findings.push(Finding {
            plugin_id: "1".to_string(),
            name: "x".to_string(),
            severity: Severity::High,
            target: address.into(),
            port: None,
            protocol: None,
            service: None,
            description: Vec::new(),
            solution: None,
            impact: Vec::new(),
            extra: Vec::new(),
        });

        let mut summary = Summary::new();
        summary.ingest(Report {
            file: ScanFile {
                path: "scan.xml".to_string(),
                format: ReportFormat::Nessus,
                scanner: None,
            },
            hosts: vec![host],
            skipped: Vec::new(),
        });
        let set = ResultSet::load(&summary);

        let output = JsonReporter.report(&summary, &set).unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["counters"]["high"], 1);
        assert_eq!(value["findings"][0]["plugin_id"], "1");
        assert_eq!(value["files"][0]["format"], "nessus");
    }
}
