//! Canonical cross-tool data model.
//!
//! Every loader normalizes its tool's native schema into these types, and
//! every renderer consumes them. Nothing format-specific leaks out of the
//! loaders except the `ReportFormat` tag.

use crate::address::Address;
use crate::fields::FieldValue;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Canonical severity, independent of each tool's native scale.
///
/// Ordered: Info < Low < Medium < High. These four levels are the only
/// valid severities; loaders must fail on unmapped native values instead
/// of defaulting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Low,
    Medium,
    High,
}

impl Severity {
    pub const ALL: [Severity; 4] = [
        Severity::Info,
        Severity::Low,
        Severity::Medium,
        Severity::High,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "Info",
            Severity::Low => "Low",
            Severity::Medium => "Medium",
            Severity::High => "High",
        }
    }

    /// Numeric level, 0 (Info) through 3 (High).
    pub fn level(&self) -> u8 {
        match self {
            Severity::Info => 0,
            Severity::Low => 1,
            Severity::Medium => 2,
            Severity::High => 3,
        }
    }

    pub fn from_level(level: u8) -> Option<Self> {
        match level {
            0 => Some(Severity::Info),
            1 => Some(Severity::Low),
            2 => Some(Severity::Medium),
            3 => Some(Severity::High),
            _ => None,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One identified execution of a scan tool against a host, keyed by its
/// start/end timestamps. Used by the merge engine to skip re-ingested runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScanRun {
    pub started: i64,
    pub ended: i64,
}

impl ScanRun {
    pub fn new(started: i64, ended: i64) -> Self {
        Self { started, ended }
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.started, 0)
    }
}

/// Address family for per-host address list entries. Nmap reports MAC
/// addresses alongside IP addresses, so the family is wider than the
/// `Address` model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressFamily {
    Ipv4,
    Ipv6,
    Mac,
}

impl AddressFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            AddressFamily::Ipv4 => "ipv4",
            AddressFamily::Ipv6 => "ipv6",
            AddressFamily::Mac => "mac",
        }
    }
}

/// Identity key for a merged host.
///
/// Network and host scanners key hosts by a normalized address. The
/// device-audit format reports a device type and name instead of an
/// address, so identity is address-or-device; address-keyed hosts order
/// before device-keyed ones, addresses by numeric value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostIdentity {
    Address(Address),
    Device { device: String, name: String },
}

impl HostIdentity {
    pub fn address(&self) -> Option<Address> {
        match self {
            HostIdentity::Address(address) => Some(*address),
            HostIdentity::Device { .. } => None,
        }
    }

    /// Human-readable identity for display and diagnostics.
    pub fn label(&self) -> String {
        match self {
            HostIdentity::Address(address) => address.to_string(),
            HostIdentity::Device { device, name } => format!("{device} {name}"),
        }
    }
}

impl From<Address> for HostIdentity {
    fn from(address: Address) -> Self {
        HostIdentity::Address(address)
    }
}

impl std::fmt::Display for HostIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// One entry in a host's address list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostAddress {
    pub family: AddressFamily,
    pub value: String,
}

impl HostAddress {
    pub fn new(family: AddressFamily, value: impl Into<String>) -> Self {
        Self {
            family,
            value: value.into(),
        }
    }
}

/// An observed open port / service record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Port {
    pub protocol: String,
    pub number: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
}

/// An installed-software record (software-inventory formats only).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoftwarePackage {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
}

/// One reported issue/check/result, normalized to the canonical shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    /// Tool-specific plugin/check identifier.
    pub plugin_id: String,
    pub name: String,
    pub severity: Severity,
    /// Identity of the host this finding belongs to.
    pub target: HostIdentity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    /// Non-empty description lines; empty means no description reported.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub description: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub solution: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub impact: Vec<String>,
    /// Typed extra fields in order of appearance in the native record.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra: Vec<(String, FieldValue)>,
}

impl Finding {
    /// Address of the owning host, when it is address-keyed.
    pub fn address(&self) -> Option<Address> {
        self.target.address()
    }

    /// Look up a typed extra field by name.
    pub fn extra_field(&self, name: &str) -> Option<&FieldValue> {
        self.extra.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    /// Ordered `(field-name, display-value)` pairs for renderers, uniform
    /// across tool origins.
    pub fn display_fields(&self) -> Vec<(String, String)> {
        let mut fields = Vec::new();
        fields.push(("address".to_string(), self.target.label()));
        if let Some(port) = self.port {
            fields.push(("port".to_string(), port.to_string()));
        }
        if let Some(protocol) = &self.protocol {
            fields.push(("protocol".to_string(), protocol.clone()));
        }
        if let Some(service) = &self.service {
            fields.push(("service".to_string(), service.clone()));
        }
        if !self.description.is_empty() {
            fields.push(("description".to_string(), self.description.join("\n")));
        }
        if let Some(solution) = &self.solution {
            fields.push(("solution".to_string(), solution.clone()));
        }
        if !self.impact.is_empty() {
            fields.push(("impact".to_string(), self.impact.join("\n")));
        }
        for (name, value) in &self.extra {
            fields.push((name.clone(), value.display()));
        }
        fields
    }
}

/// A host as observed by one or more scan runs, keyed by its normalized
/// address. After merging, one `Host` aggregates data contributed by many
/// scan files for the same address.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Host {
    pub identity: HostIdentity,
    /// Family-scoped address list (a host may carry IPv4 + MAC + IPv6).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub addresses: Vec<HostAddress>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub names: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<Port>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub software: Vec<SoftwarePackage>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub findings: Vec<Finding>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub runs: Vec<ScanRun>,
}

impl Host {
    pub fn new(identity: impl Into<HostIdentity>) -> Self {
        Self {
            identity: identity.into(),
            addresses: Vec::new(),
            names: Vec::new(),
            ports: Vec::new(),
            software: Vec::new(),
            findings: Vec::new(),
            runs: Vec::new(),
        }
    }

    pub fn address(&self) -> Option<Address> {
        self.identity.address()
    }

    pub fn has_run(&self, run: &ScanRun) -> bool {
        self.runs.contains(run)
    }

    /// True when the identities are equal or any same-family address entry
    /// matches textually between the two hosts.
    pub fn same_target(&self, other: &Host) -> bool {
        if self.identity == other.identity {
            return true;
        }
        self.addresses.iter().any(|a| {
            other
                .addresses
                .iter()
                .any(|b| a.family == b.family && a.value == b.value)
        })
    }
}

/// Supported input formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    Nessus,
    Nmap,
    Mbsa,
    Gfi,
    Nipper,
}

impl ReportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportFormat::Nessus => "nessus",
            ReportFormat::Nmap => "nmap",
            ReportFormat::Mbsa => "mbsa",
            ReportFormat::Gfi => "gfi",
            ReportFormat::Nipper => "nipper",
        }
    }
}

impl std::fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Scan-level metadata extracted from a document, informational only.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScannerInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub args: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started: Option<i64>,
}

/// One parsed input document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanFile {
    pub path: String,
    pub format: ReportFormat,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scanner: Option<ScannerInfo>,
}

/// A host record that could not be loaded; siblings in the same file are
/// unaffected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostDiagnostic {
    /// Whatever identity the native record offered (raw address, name).
    pub host: String,
    pub message: String,
}

/// The canonical result of loading one scan file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub file: ScanFile,
    pub hosts: Vec<Host>,
    /// Per-host diagnostics surfaced to the caller, never swallowed.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<HostDiagnostic>,
}
