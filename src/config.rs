//! Report theme configuration.
//!
//! The HTML renderer colors rows per severity; the palette is loadable
//! from a YAML file so deployments can restyle reports without a rebuild.

use crate::error::{ReportError, Result};
use crate::model::Severity;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Foreground/background pair for one row class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorPair {
    pub background: String,
    pub foreground: String,
}

impl ColorPair {
    fn new(background: &str, foreground: &str) -> Self {
        Self {
            background: background.to_string(),
            foreground: foreground.to_string(),
        }
    }
}

/// Report color theme.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Theme {
    pub high: ColorPair,
    pub medium: ColorPair,
    pub low: ColorPair,
    pub info: ColorPair,
    pub header: ColorPair,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            high: ColorPair::new("#ff5050", "#eeeeee"),
            medium: ColorPair::new("#ffb565", "#000000"),
            low: ColorPair::new("#fdff6b", "#000000"),
            info: ColorPair::new("#aaffaa", "#000000"),
            header: ColorPair::new("#0082C8", "#ffffff"),
        }
    }
}

impl Theme {
    /// Load a theme from a YAML file; missing keys keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| ReportError::ReadError {
            path: path.display().to_string(),
            source,
        })?;
        serde_yaml::from_str(&content).map_err(|source| ReportError::ThemeParse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn colors(&self, severity: Severity) -> &ColorPair {
        match severity {
            Severity::High => &self.high,
            Severity::Medium => &self.medium,
            Severity::Low => &self.low,
            Severity::Info => &self.info,
        }
    }
}

/// Resolve a severity from user input: canonical name (case-insensitive)
/// or numeric level 0..=3.
pub fn resolve_level(raw: &str) -> Result<Severity> {
    let raw = raw.trim();
    if let Ok(level) = raw.parse::<u8>() {
        if let Some(severity) = Severity::from_level(level) {
            return Ok(severity);
        }
        return Err(ReportError::UnknownLevel(raw.to_string()));
    }
    match raw.to_lowercase().as_str() {
        "info" => Ok(Severity::Info),
        "low" => Ok(Severity::Low),
        "medium" => Ok(Severity::Medium),
        "high" => Ok(Severity::High),
        _ => Err(ReportError::UnknownLevel(raw.to_string())),
    }
}
