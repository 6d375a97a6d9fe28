//! Flattened finding view with ordering, filtering, and counters.
//!
//! A [`ResultSet`] is a working copy of every finding in a summary; it
//! never deduplicates (the merge engine already did) and all operations
//! mutate the set in place.

use crate::address::AddressMatcher;
use crate::error::{ReportError, Result};
use crate::merge::Summary;
use crate::model::{Finding, HostIdentity, Severity};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

const SORT_KEYS: &[&str] = &["address", "severity", "port", "plugin_id", "name"];

#[derive(Debug, Default, Clone)]
pub struct ResultSet {
    findings: Vec<Finding>,
}

impl ResultSet {
    /// Flatten all findings from a merged summary.
    pub fn load(summary: &Summary) -> Self {
        Self {
            findings: summary
                .hosts
                .iter()
                .flat_map(|h| h.findings.iter().cloned())
                .collect(),
        }
    }

    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    pub fn len(&self) -> usize {
        self.findings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.findings.is_empty()
    }

    /// Stable multi-key sort. A `-` prefix reverses that key; ties keep
    /// their current relative order.
    pub fn order_by(&mut self, keys: &[&str]) -> Result<()> {
        let mut parsed = Vec::with_capacity(keys.len());
        for raw in keys {
            let (descending, key) = match raw.strip_prefix('-') {
                Some(rest) => (true, rest),
                None => (false, *raw),
            };
            if !SORT_KEYS.contains(&key) {
                return Err(ReportError::UnknownSortKey(raw.to_string()));
            }
            parsed.push((descending, key.to_string()));
        }

        // Decorate with the original index so equal keys stay put.
        let mut decorated: Vec<(usize, Finding)> = std::mem::take(&mut self.findings)
            .into_iter()
            .enumerate()
            .collect();
        decorated.sort_by(|(ia, a), (ib, b)| {
            for (descending, key) in &parsed {
                let ord = compare_by_key(a, b, key);
                let ord = if *descending { ord.reverse() } else { ord };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            ia.cmp(ib)
        });
        self.findings = decorated.into_iter().map(|(_, f)| f).collect();
        Ok(())
    }

    /// Keep only findings matching the predicate. Single in-place pass.
    pub fn filter<F>(&mut self, predicate: F)
    where
        F: FnMut(&Finding) -> bool,
    {
        self.findings.retain(predicate);
    }

    /// Findings per canonical severity; every severity is present even
    /// when its count is zero.
    pub fn counters(&self) -> BTreeMap<Severity, usize> {
        let mut counters: BTreeMap<Severity, usize> =
            Severity::ALL.iter().map(|s| (*s, 0)).collect();
        for finding in &self.findings {
            *counters.entry(finding.severity).or_default() += 1;
        }
        counters
    }

    /// Drop findings whose plugin id appears in `ids`.
    pub fn filter_by_plugin_ids(&mut self, ids: &[String]) {
        self.findings.retain(|f| !ids.contains(&f.plugin_id));
    }

    /// Keep findings whose host address matches any of the given
    /// addresses or CIDR networks. Device-keyed findings never match.
    pub fn filter_by_addresses(&mut self, patterns: &[&str]) -> Result<()> {
        let matchers = patterns
            .iter()
            .map(|p| AddressMatcher::parse(p))
            .collect::<Result<Vec<_>>>()?;
        self.findings.retain(|f| match f.address() {
            Some(address) => matchers.iter().any(|m| m.matches(&address)),
            None => false,
        });
        Ok(())
    }

    /// Sorted unique host identities reporting the given plugin.
    pub fn hosts_for_plugin(&self, plugin_id: &str) -> Vec<HostIdentity> {
        let mut hosts: Vec<HostIdentity> = self
            .findings
            .iter()
            .filter(|f| f.plugin_id == plugin_id)
            .map(|f| f.target.clone())
            .collect();
        hosts.sort();
        hosts.dedup();
        hosts
    }
}

fn compare_by_key(a: &Finding, b: &Finding, key: &str) -> Ordering {
    match key {
        "address" => a.target.cmp(&b.target),
        "severity" => a.severity.cmp(&b.severity),
        "port" => a.port.cmp(&b.port),
        "plugin_id" => a.plugin_id.cmp(&b.plugin_id),
        "name" => a.name.cmp(&b.name),
        _ => Ordering::Equal,
    }
}

/// Parse a plugin filter list: one plugin id per line with an optional
/// description, `#` starts a comment.
pub fn read_plugin_filter(path: &Path) -> Result<Vec<String>> {
    let display = path.display().to_string();
    let content = fs::read_to_string(path).map_err(|e| ReportError::PluginFilter {
        path: display.clone(),
        message: e.to_string(),
    })?;

    let mut ids = Vec::new();
    for (number, line) in content.lines().enumerate() {
        let line = line.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }
        let id = line.split_whitespace().next().unwrap_or("");
        if id.parse::<u64>().is_err() {
            return Err(ReportError::PluginFilter {
                path: display,
                message: format!("invalid plugin id on line {}: {id}", number + 1),
            });
        }
        ids.push(id.to_string());
    }
    Ok(ids)
}
