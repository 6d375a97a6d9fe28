use crate::error::Result;
use crate::merge::Summary;
use crate::model::Severity;
use crate::reporter::Reporter;
use crate::resultset::ResultSet;
use colored::Colorize;

pub struct TerminalReporter {
    verbose: bool,
}

impl TerminalReporter {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    fn severity_label(&self, severity: Severity) -> colored::ColoredString {
        let label = format!("[{}]", severity.as_str());
        match severity {
            Severity::High => label.red().bold(),
            Severity::Medium => label.yellow().bold(),
            Severity::Low => label.cyan(),
            Severity::Info => label.white(),
        }
    }
}

impl Reporter for TerminalReporter {
    fn report(&self, summary: &Summary, set: &ResultSet) -> Result<String> {
        let mut output = String::new();

        for finding in set.findings() {
            let location = match (finding.port, &finding.protocol) {
                (Some(port), Some(protocol)) => format!("{} {port}/{protocol}", finding.target.label()),
                (Some(port), None) => format!("{} {port}", finding.target.label()),
                _ => finding.target.label(),
            };
            output.push_str(&format!(
                "{} {} {} {}\n",
                self.severity_label(finding.severity),
                location,
                finding.plugin_id,
                finding.name.bold(),
            ));
            if self.verbose {
                for line in &finding.description {
                    output.push_str(&format!("    {line}\n"));
                }
                if let Some(solution) = &finding.solution {
                    output.push_str(&format!("    {} {solution}\n", "fix:".green()));
                }
            }
        }

        let counters = set.counters();
        output.push('\n');
        output.push_str(&format!(
            "{} findings: {} high, {} medium, {} low, {} info\n",
            set.len(),
            counters[&Severity::High],
            counters[&Severity::Medium],
            counters[&Severity::Low],
            counters[&Severity::Info],
        ));
        if !summary.no_findings.is_empty() {
            output.push_str(&format!(
                "{} host(s) with no findings\n",
                summary.no_findings.len()
            ));
        }
        if !summary.diagnostics.is_empty() {
            output.push_str(&format!(
                "{} skipped record(s)\n",
                summary.diagnostics.len()
            ));
        }

        Ok(output)
    }
}
