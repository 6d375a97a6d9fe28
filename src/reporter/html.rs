use crate::config::Theme;
use crate::error::Result;
use crate::merge::Summary;
use crate::model::Severity;
use crate::reporter::Reporter;
use crate::resultset::ResultSet;

/// Single-document HTML renderer. Severity row colors come from the
/// theme so reports can be restyled without a rebuild.
pub struct HtmlReporter {
    theme: Theme,
    title: String,
}

impl HtmlReporter {
    pub fn new(theme: Theme, title: impl Into<String>) -> Self {
        Self {
            theme,
            title: title.into(),
        }
    }

    fn stylesheet(&self) -> String {
        let mut css = String::from(
            "body { font-family: sans-serif; }\n\
             table { border-collapse: collapse; width: 100%; }\n\
             td, th { padding: 4px 8px; text-align: left; }\n",
        );
        css.push_str(&format!(
            "th {{ background: {}; color: {}; }}\n",
            self.theme.header.background, self.theme.header.foreground
        ));
        for severity in Severity::ALL {
            let colors = self.theme.colors(severity);
            css.push_str(&format!(
                ".{} {{ background: {}; color: {}; }}\n",
                severity.as_str().to_lowercase(),
                colors.background,
                colors.foreground
            ));
        }
        css
    }
}

impl Default for HtmlReporter {
    fn default() -> Self {
        Self::new(Theme::default(), "Scan Report")
    }
}

fn escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

impl Reporter for HtmlReporter {
    fn report(&self, summary: &Summary, set: &ResultSet) -> Result<String> {
        let mut output = String::new();
        output.push_str("<!DOCTYPE html>\n<html>\n<head>\n");
        output.push_str(&format!("<title>{}</title>\n", escape(&self.title)));
        output.push_str(&format!("<style>\n{}</style>\n", self.stylesheet()));
        output.push_str("</head>\n<body>\n");
        output.push_str(&format!("<h1>{}</h1>\n", escape(&self.title)));

        let counters = set.counters();
        output.push_str("<p>");
        output.push_str(&format!(
            "{} findings: {} high, {} medium, {} low, {} info",
            set.len(),
            counters[&Severity::High],
            counters[&Severity::Medium],
            counters[&Severity::Low],
            counters[&Severity::Info],
        ));
        output.push_str("</p>\n");

        output.push_str("<table>\n<tr>");
        for column in ["Address", "Severity", "Port", "Plugin", "Finding", "Solution"] {
            output.push_str(&format!("<th>{column}</th>"));
        }
        output.push_str("</tr>\n");

        for finding in set.findings() {
            let class = finding.severity.as_str().to_lowercase();
            let port = match (finding.port, &finding.protocol) {
                (Some(port), Some(protocol)) => format!("{port}/{protocol}"),
                (Some(port), None) => port.to_string(),
                _ => String::new(),
            };
            output.push_str(&format!(
                "<tr class=\"{class}\"><td>{}</td><td>{}</td><td>{port}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
                escape(&finding.target.label()),
                finding.severity.as_str(),
                escape(&finding.plugin_id),
                escape(&finding.name),
                escape(finding.solution.as_deref().unwrap_or("")),
            ));
        }
        output.push_str("</table>\n");

        if !summary.no_findings.is_empty() {
            output.push_str("<h2>Hosts with no findings</h2>\n<ul>\n");
            for identity in &summary.no_findings {
                output.push_str(&format!("<li>{}</li>\n", escape(&identity.label())));
            }
            output.push_str("</ul>\n");
        }

        output.push_str("</body>\n</html>\n");
        Ok(output)
    }
}
