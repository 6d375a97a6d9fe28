//! Field classification and type coercion.
//!
//! Each tool format carries a table mapping native field names to a
//! semantic type. Coercion either produces a canonically typed value or
//! fails with an error naming the field and the offending raw value; raw
//! values are never silently defaulted. A field with no table entry is an
//! unrecognized-field error, which catches upstream format drift instead
//! of dropping new fields on the floor.

use crate::error::{ReportError, Result};
use chrono::NaiveDate;
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

/// Semantic type of a native field.
#[derive(Debug, Clone)]
pub enum FieldKind {
    /// Base-10 integer; non-numeric content fails.
    Integer,
    /// Exact decimal; never parsed through floating point.
    Decimal,
    /// {"true","yes"} case-insensitively -> true, everything else -> false.
    Boolean,
    /// Whitespace-separated `YYYY/MM/DD` dates; one bad token fails all.
    DateList,
    /// Multi-line text; blank lines dropped, empty result is absent.
    Text,
    /// Repeated fields accumulating into an ordered list.
    Reference,
    /// Value must be one of a fixed allowed set.
    Enum(&'static [&'static str]),
    /// Matched against ordered regex rules, first match wins.
    Versioned(&'static [&'static str]),
    /// Single free-form value; a second occurrence is a duplicate error.
    String,
}

/// A coerced, canonically typed field value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind", content = "value")]
pub enum FieldValue {
    Integer(i64),
    Decimal(Decimal),
    Boolean(bool),
    Dates(Vec<NaiveDate>),
    Text(Vec<String>),
    References(Vec<String>),
    String(String),
}

impl FieldValue {
    /// Parse an exact decimal value.
    pub fn decimal_from_str(raw: &str) -> Result<Self> {
        let value = Decimal::from_str(raw).map_err(|_| ReportError::FieldCoercion {
            field: "decimal".to_string(),
            value: raw.to_string(),
            expected: "decimal",
        })?;
        Ok(FieldValue::Decimal(value))
    }

    /// Render the value for display, regardless of its type.
    pub fn display(&self) -> String {
        match self {
            FieldValue::Integer(v) => v.to_string(),
            FieldValue::Decimal(v) => v.to_string(),
            FieldValue::Boolean(v) => v.to_string(),
            FieldValue::Dates(dates) => dates
                .iter()
                .map(|d| d.format("%Y/%m/%d").to_string())
                .collect::<Vec<_>>()
                .join(" "),
            FieldValue::Text(lines) => lines.join("\n"),
            FieldValue::References(refs) => refs.join(", "),
            FieldValue::String(v) => v.clone(),
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Boolean(v) => Some(*v),
            _ => None,
        }
    }
}

/// Per-tool mapping of field name to semantic type.
#[derive(Debug, Clone, Default)]
pub struct FieldTable {
    fields: HashMap<&'static str, FieldKind>,
}

impl FieldTable {
    pub fn new(entries: &[(&'static str, FieldKind)]) -> Self {
        Self {
            fields: entries.iter().cloned().collect(),
        }
    }

    pub fn kind(&self, name: &str) -> Option<&FieldKind> {
        self.fields.get(name)
    }

    /// Coerce a raw `(name, text)` pair through the table.
    ///
    /// `Ok(None)` means the field was validly absent (e.g. multi-line text
    /// with no non-blank lines), which is distinct from present-but-empty.
    pub fn coerce(&self, name: &str, raw: &str) -> Result<Option<FieldValue>> {
        let kind = self
            .fields
            .get(name)
            .ok_or_else(|| ReportError::UnrecognizedField {
                field: name.to_string(),
                value: raw.to_string(),
            })?;
        coerce_value(kind, name, raw)
    }
}

/// Coerce a raw value against a known field kind.
pub fn coerce_value(kind: &FieldKind, name: &str, raw: &str) -> Result<Option<FieldValue>> {
    let coercion_error = |expected: &'static str| ReportError::FieldCoercion {
        field: name.to_string(),
        value: raw.to_string(),
        expected,
    };

    match kind {
        FieldKind::Integer => raw
            .trim()
            .parse::<i64>()
            .map(|v| Some(FieldValue::Integer(v)))
            .map_err(|_| coercion_error("integer")),

        FieldKind::Decimal => Decimal::from_str(raw.trim())
            .map(|v| Some(FieldValue::Decimal(v)))
            .map_err(|_| coercion_error("decimal")),

        FieldKind::Boolean => {
            // Non-symmetric by design: absence of a recognized false token
            // is not an error.
            let truthy = matches!(raw.trim().to_lowercase().as_str(), "true" | "yes");
            Ok(Some(FieldValue::Boolean(truthy)))
        }

        FieldKind::DateList => {
            let mut dates = Vec::new();
            for token in raw.split_whitespace() {
                let date = NaiveDate::parse_from_str(token, "%Y/%m/%d")
                    .map_err(|_| coercion_error("date"))?;
                dates.push(date);
            }
            Ok(Some(FieldValue::Dates(dates)))
        }

        FieldKind::Text => {
            let lines: Vec<String> = raw
                .lines()
                .filter(|l| !l.trim().is_empty())
                .map(|l| l.to_string())
                .collect();
            if lines.is_empty() {
                Ok(None)
            } else {
                Ok(Some(FieldValue::Text(lines)))
            }
        }

        FieldKind::Reference => Ok(Some(FieldValue::References(vec![raw.to_string()]))),

        FieldKind::Enum(allowed) => {
            if allowed.contains(&raw) {
                Ok(Some(FieldValue::String(raw.to_string())))
            } else {
                Err(coercion_error("enumerated"))
            }
        }

        FieldKind::Versioned(patterns) => {
            for pattern in patterns.iter() {
                let re = Regex::new(pattern).map_err(|_| coercion_error("version"))?;
                if let Some(captures) = re.captures(raw) {
                    let version = captures
                        .get(1)
                        .map(|m| m.as_str())
                        .unwrap_or(raw)
                        .to_string();
                    return Ok(Some(FieldValue::String(version)));
                }
            }
            Err(coercion_error("version"))
        }

        FieldKind::String => Ok(Some(FieldValue::String(raw.to_string()))),
    }
}

// Cross-reference targets with known external URL templates. References to
// other targets keep their raw value but derive no URL.
const XREF_URL_TEMPLATES: &[(&str, &str, &str)] = &[
    ("CWE", "http://cwe.mitre.org/data/definitions/", ".html"),
    ("OSVDB", "http://osvdb.org/show/osvdb/", ""),
];

/// Derive external URLs from `TARGET:ID` references.
///
/// Unknown targets are silently dropped from the derived list; a reference
/// without the `:` separator is a coercion error.
pub fn derive_reference_urls(field: &str, references: &[String]) -> Result<Vec<String>> {
    let mut urls = Vec::new();
    for reference in references {
        let (target, id) =
            reference
                .split_once(':')
                .ok_or_else(|| ReportError::FieldCoercion {
                    field: field.to_string(),
                    value: reference.clone(),
                    expected: "reference",
                })?;
        if let Some((_, prefix, suffix)) = XREF_URL_TEMPLATES.iter().find(|(t, _, _)| *t == target)
        {
            urls.push(format!("{prefix}{id}{suffix}"));
        }
    }
    Ok(urls)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> FieldTable {
        FieldTable::new(&[
            ("port", FieldKind::Integer),
            ("cvss_base_score", FieldKind::Decimal),
            ("exploit_available", FieldKind::Boolean),
            ("plugin_publication_date", FieldKind::DateList),
            ("description", FieldKind::Text),
            ("xref", FieldKind::Reference),
            (
                "plugin_type",
                FieldKind::Enum(&["combined", "local", "summary", "remote"]),
            ),
            (
                "plugin_version",
                FieldKind::Versioned(&[r"^\$Revision:\s+(.*)\s+\$$", r"^([0-9.]+)$"]),
            ),
            ("cvss_vector", FieldKind::String),
        ])
    }

    #[test]
    fn test_integer_coercion() {
        let value = table().coerce("port", "443").unwrap().unwrap();
        assert_eq!(value, FieldValue::Integer(443));
    }

    #[test]
    fn test_integer_rejects_non_numeric() {
        let err = table().coerce("port", "https").unwrap_err();
        assert_eq!(err.to_string(), "Invalid integer value for port: https");
    }

    #[test]
    fn test_decimal_exact_round_trip() {
        let value = table().coerce("cvss_base_score", "7.5").unwrap().unwrap();
        assert_eq!(value.display(), "7.5");
    }

    #[test]
    fn test_decimal_rejects_garbage() {
        assert!(table().coerce("cvss_base_score", "high").is_err());
    }

    #[test]
    fn test_boolean_truthy_tokens() {
        for raw in ["true", "TRUE", "yes", "Yes"] {
            let value = table().coerce("exploit_available", raw).unwrap().unwrap();
            assert_eq!(value, FieldValue::Boolean(true), "raw: {raw}");
        }
    }

    #[test]
    fn test_boolean_everything_else_is_false() {
        for raw in ["false", "no", "maybe", "1", ""] {
            let value = table().coerce("exploit_available", raw).unwrap().unwrap();
            assert_eq!(value, FieldValue::Boolean(false), "raw: {raw}");
        }
    }

    #[test]
    fn test_date_list_multiple_tokens() {
        let value = table()
            .coerce("plugin_publication_date", "2011/03/14 2011/06/01")
            .unwrap()
            .unwrap();
        assert_eq!(value.display(), "2011/03/14 2011/06/01");
    }

    #[test]
    fn test_date_list_bad_token_fails_whole_field() {
        let err = table()
            .coerce("plugin_publication_date", "2011/03/14 notadate")
            .unwrap_err();
        assert!(err.to_string().contains("notadate"));
    }

    #[test]
    fn test_text_drops_blank_lines() {
        let value = table()
            .coerce("description", "first\n\n  \nsecond\n")
            .unwrap()
            .unwrap();
        assert_eq!(
            value,
            FieldValue::Text(vec!["first".to_string(), "second".to_string()])
        );
    }

    #[test]
    fn test_text_collapses_to_absent() {
        // All-blank text is "no data", not an empty list.
        assert_eq!(table().coerce("description", "\n  \n").unwrap(), None);
    }

    #[test]
    fn test_enum_accepts_known_value() {
        let value = table().coerce("plugin_type", "remote").unwrap().unwrap();
        assert_eq!(value, FieldValue::String("remote".to_string()));
    }

    #[test]
    fn test_enum_rejects_unknown_value() {
        assert!(table().coerce("plugin_type", "psychic").is_err());
    }

    #[test]
    fn test_versioned_revision_pattern() {
        let value = table()
            .coerce("plugin_version", "$Revision: 1.34 $")
            .unwrap()
            .unwrap();
        assert_eq!(value, FieldValue::String("1.34".to_string()));
    }

    #[test]
    fn test_versioned_plain_pattern() {
        let value = table().coerce("plugin_version", "1.2.3").unwrap().unwrap();
        assert_eq!(value, FieldValue::String("1.2.3".to_string()));
    }

    #[test]
    fn test_versioned_no_match_fails() {
        assert!(table().coerce("plugin_version", "rev-abc").is_err());
    }

    #[test]
    fn test_unrecognized_field() {
        let err = table().coerce("brand_new_field", "x").unwrap_err();
        assert!(matches!(err, ReportError::UnrecognizedField { .. }));
    }

    #[test]
    fn test_derive_reference_urls() {
        let refs = vec![
            "CWE:79".to_string(),
            "OSVDB:12345".to_string(),
            "IAVA:2012-A-0004".to_string(),
        ];
        let urls = derive_reference_urls("xref", &refs).unwrap();
        // Unknown target dropped from URLs, raw reference untouched.
        assert_eq!(
            urls,
            vec![
                "http://cwe.mitre.org/data/definitions/79.html".to_string(),
                "http://osvdb.org/show/osvdb/12345".to_string(),
            ]
        );
    }

    #[test]
    fn test_derive_reference_urls_missing_separator() {
        let refs = vec!["CWE79".to_string()];
        assert!(derive_reference_urls("xref", &refs).is_err());
    }
}
