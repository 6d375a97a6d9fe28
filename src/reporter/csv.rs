use crate::error::Result;
use crate::merge::Summary;
use crate::reporter::Reporter;
use crate::resultset::ResultSet;

const COLUMNS: &[&str] = &[
    "address",
    "severity",
    "port",
    "protocol",
    "service",
    "plugin_id",
    "name",
    "description",
    "solution",
];

/// Spreadsheet-friendly renderer with a configurable delimiter.
pub struct CsvReporter {
    delimiter: char,
}

impl CsvReporter {
    pub fn new(delimiter: char) -> Self {
        Self { delimiter }
    }

    fn quote(&self, value: &str) -> String {
        if value.contains(self.delimiter)
            || value.contains('"')
            || value.contains('\n')
        {
            format!("\"{}\"", value.replace('"', "\"\""))
        } else {
            value.to_string()
        }
    }
}

impl Default for CsvReporter {
    fn default() -> Self {
        Self::new(',')
    }
}

impl Reporter for CsvReporter {
    fn report(&self, _summary: &Summary, set: &ResultSet) -> Result<String> {
        let delimiter = self.delimiter.to_string();
        let mut output = COLUMNS.join(&delimiter);
        output.push('\n');

        for finding in set.findings() {
            let row = [
                finding.target.label(),
                finding.severity.as_str().to_string(),
                finding.port.map(|p| p.to_string()).unwrap_or_default(),
                finding.protocol.clone().unwrap_or_default(),
                finding.service.clone().unwrap_or_default(),
                finding.plugin_id.clone(),
                finding.name.clone(),
                finding.description.join(" "),
                finding.solution.clone().unwrap_or_default(),
            ];
            let cells: Vec<String> = row.iter().map(|v| self.quote(v)).collect();
            output.push_str(&cells.join(&delimiter));
            output.push('\n');
        }

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::Address;
    use crate::model::{Finding, Host, Report, ReportFormat, ScanFile, ScanRun, Severity};

    fn summary() -> Summary {
        let address = Address::parse("10.0.0.1").unwrap();
        let mut host = Host::new(address);
        host.runs.push(ScanRun::new(0, 1));
        host.findings.push(Finding {
            plugin_id: "1".to_string(),
            name: "Issue, with a comma".to_string(),
            severity: Severity::Low,
            target: address.into(),
            port: Some(80),
            protocol: Some("tcp".to_string()),
            service: None,
            description: vec!["line one".to_string()],
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
        summary
    }

    #[test]
    fn test_header_and_quoting() {
        let summary = summary();
        let set = ResultSet::load(&summary);
        let output = CsvReporter::default().report(&summary, &set).unwrap();

        let mut lines = output.lines();
        assert_eq!(lines.next().unwrap().split(',').count(), 9);
        let row = lines.next().unwrap();
        assert!(row.starts_with("10.0.0.1,Low,80,tcp,,1,"));
        assert!(row.contains("\"Issue, with a comma\""));
    }

    #[test]
    fn test_alternate_delimiter() {
        let summary = summary();
        let set = ResultSet::load(&summary);
        let output = CsvReporter::new('\t').report(&summary, &set).unwrap();
        assert!(output.lines().next().unwrap().contains('\t'));
        // A comma in a cell needs no quoting when tabs delimit.
        assert!(output.contains("Issue, with a comma"));
    }
}
