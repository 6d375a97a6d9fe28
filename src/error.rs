use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("No such file: {0}")]
    FileNotFound(String),

    #[error("Failed to read file: {path}")]
    ReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Error parsing {path}: {message}")]
    MalformedDocument { path: String, message: String },

    #[error("Unsupported report format in {path}: {root}")]
    UnsupportedFormat { path: String, root: String },

    #[error("Invalid {expected} value for {field}: {value}")]
    FieldCoercion {
        field: String,
        value: String,
        expected: &'static str,
    },

    #[error("Unprocessed report field {field}: {value}")]
    UnrecognizedField { field: String, value: String },

    #[error("Multiple values for single-valued field {0}")]
    DuplicateValue(String),

    #[error("Error parsing address: {0}")]
    AddressParse(String),

    #[error("Unknown {format} severity: {value}")]
    SeverityMapping { format: &'static str, value: String },

    #[error("Could not parse device type and name from title: {0}")]
    UnrecognizedDevice(String),

    #[error("Unknown sort key: {0}")]
    UnknownSortKey(String),

    #[error("Invalid severity level: {0}")]
    UnknownLevel(String),

    #[error("Error reading plugin filter list {path}: {message}")]
    PluginFilter { path: String, message: String },

    #[error("Failed to parse theme config: {path}")]
    ThemeParse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ReportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_file_not_found() {
        let err = ReportError::FileNotFound("/tmp/scan.xml".to_string());
        assert_eq!(err.to_string(), "No such file: /tmp/scan.xml");
    }

    #[test]
    fn test_error_display_unsupported_format() {
        let err = ReportError::UnsupportedFormat {
            path: "scan.xml".to_string(),
            root: "NessusClientData_v1".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Unsupported report format in scan.xml: NessusClientData_v1"
        );
    }

    #[test]
    fn test_error_display_field_coercion() {
        let err = ReportError::FieldCoercion {
            field: "port".to_string(),
            value: "abc".to_string(),
            expected: "integer",
        };
        assert_eq!(err.to_string(), "Invalid integer value for port: abc");
    }

    #[test]
    fn test_error_display_severity_mapping() {
        let err = ReportError::SeverityMapping {
            format: "nessus",
            value: "7".to_string(),
        };
        assert_eq!(err.to_string(), "Unknown nessus severity: 7");
    }

    #[test]
    fn test_error_display_address_parse() {
        let err = ReportError::AddressParse("not-an-ip".to_string());
        assert_eq!(err.to_string(), "Error parsing address: not-an-ip");
    }

    #[test]
    fn test_error_display_unrecognized_field() {
        let err = ReportError::UnrecognizedField {
            field: "new_vendor_field".to_string(),
            value: "x".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Unprocessed report field new_vendor_field: x"
        );
    }
}
