//! Loader for Nmap XML output (`-oX`).
//!
//! Nmap reports hosts, addresses, and services but no findings; merged
//! hosts from this format land in the summary's no-findings bucket.

use crate::address::Address;
use crate::error::{ReportError, Result};
use crate::loader::ReportLoader;
use crate::model::{
    AddressFamily, Host, HostAddress, HostDiagnostic, Port, Report, ReportFormat, ScanFile,
    ScanRun, ScannerInfo,
};
use crate::tree::{Document, Node};
use tracing::warn;

pub struct NmapLoader;

impl ReportLoader for NmapLoader {
    fn format(&self) -> ReportFormat {
        ReportFormat::Nmap
    }

    fn matches(&self, doc: &Document) -> bool {
        doc.root().tag() == "nmaprun"
    }

    fn load(&self, doc: &Document, path: &str) -> Result<Report> {
        let root = doc.root();
        let scanner = ScannerInfo {
            name: root.attribute("scanner").map(str::to_string),
            version: root.attribute("version").map(str::to_string),
            args: root.attribute("args").map(str::to_string),
            started: root.attribute("start").and_then(|s| s.parse().ok()),
        };

        let mut hosts = Vec::new();
        let mut skipped = Vec::new();
        for host_node in root.children("host") {
            match load_host(host_node) {
                Ok(host) => hosts.push(host),
                Err(e) => {
                    let identity = first_address_text(host_node)
                        .unwrap_or("<no address>")
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
                format: ReportFormat::Nmap,
                scanner: Some(scanner),
            },
            hosts,
            skipped,
        })
    }
}

fn first_address_text(node: &Node) -> Option<&str> {
    node.children("address").find_map(|a| a.attribute("addr"))
}

fn load_host(node: &Node) -> Result<Host> {
    // Addresses come in ipv4/ipv6/mac families; host identity is the
    // first IP address, tried v4 then v6.
    let mut addresses = Vec::new();
    for address_node in node.children("address") {
        let (Some(addr), Some(addrtype)) =
            (address_node.attribute("addr"), address_node.attribute("addrtype"))
        else {
            continue;
        };
        let family = match addrtype {
            "ipv4" => AddressFamily::Ipv4,
            "ipv6" => AddressFamily::Ipv6,
            "mac" => AddressFamily::Mac,
            _ => continue,
        };
        addresses.push(HostAddress::new(family, addr));
    }

    let identity_text = addresses
        .iter()
        .find(|a| a.family == AddressFamily::Ipv4)
        .or_else(|| addresses.iter().find(|a| a.family == AddressFamily::Ipv6))
        .map(|a| a.value.clone())
        .ok_or_else(|| ReportError::AddressParse("<no ip address>".to_string()))?;
    let address = Address::parse(&identity_text)?;

    let mut host = Host::new(address);
    host.addresses = addresses;

    let started = node
        .attribute("starttime")
        .ok_or_else(|| ReportError::MalformedDocument {
            path: identity_text.clone(),
            message: "no start time in host node".to_string(),
        })?
        .parse::<i64>()
        .map_err(|_| ReportError::FieldCoercion {
            field: "starttime".to_string(),
            value: node.attribute("starttime").unwrap_or_default().to_string(),
            expected: "integer",
        })?;
    let ended = match node.attribute("endtime") {
        Some(raw) => raw.parse::<i64>().map_err(|_| ReportError::FieldCoercion {
            field: "endtime".to_string(),
            value: raw.to_string(),
            expected: "integer",
        })?,
        None => started,
    };
    host.runs.push(ScanRun::new(started, ended));

    for hostname in node
        .child("hostnames")
        .into_iter()
        .flat_map(|h| h.children("hostname"))
    {
        if let Some(name) = hostname.attribute("name") {
            if !host.names.contains(&name.to_string()) {
                host.names.push(name.to_string());
            }
        }
    }

    if let Some(ports) = node.child("ports") {
        for port_node in ports.children("port") {
            host.ports.push(load_port(port_node)?);
        }
    }

    if let Some(os_summary) = os_guess(node) {
        host.names.push(os_summary);
    }

    Ok(host)
}

fn load_port(node: &Node) -> Result<Port> {
    let protocol = node.attribute("protocol").unwrap_or("tcp").to_string();
    let number = node
        .attribute("portid")
        .ok_or_else(|| ReportError::FieldCoercion {
            field: "portid".to_string(),
            value: "<missing>".to_string(),
            expected: "integer",
        })?
        .parse::<u16>()
        .map_err(|_| ReportError::FieldCoercion {
            field: "portid".to_string(),
            value: node.attribute("portid").unwrap_or_default().to_string(),
            expected: "integer",
        })?;
    Ok(Port {
        protocol,
        number,
        state: node
            .child("state")
            .and_then(|s| s.attribute("state"))
            .map(str::to_string),
        service: node
            .child("service")
            .and_then(|s| s.attribute("name"))
            .map(str::to_string),
    })
}

// A single osclass guess renders as "vendor family generation"; anything
// else is left unreported.
fn os_guess(node: &Node) -> Option<String> {
    let os = node.child("os")?;
    let classes: Vec<&Node> = os.children("osclass").collect();
    if classes.len() != 1 {
        return None;
    }
    let parts: Vec<&str> = ["vendor", "osfamily", "osgen"]
        .iter()
        .filter_map(|attr| classes[0].attribute(attr))
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" "))
    }
}
