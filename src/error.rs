use thiserror::Error;

/// Errors that abort an audit or prevent the engine from being built.
///
/// Documentation gaps are never errors: they surface as findings on the
/// result. Only an unresolvable admission date stops an audit.
#[derive(Error, Debug)]
pub enum AuditError {
    #[error("Admission date not found in document")]
    MissingAdmissionDate,

    #[error("Invalid pattern for {name}: {source}")]
    InvalidPattern {
        name: String,
        #[source]
        source: regex::Error,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid value for {field}: {value}")]
    InvalidEnum { field: String, value: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_admission_message() {
        assert_eq!(
            AuditError::MissingAdmissionDate.to_string(),
            "Admission date not found in document"
        );
    }

    #[test]
    fn invalid_pattern_names_the_criterion() {
        let source = regex::Regex::new("(unclosed").unwrap_err();
        let err = AuditError::InvalidPattern {
            name: "shock".into(),
            source,
        };
        assert!(err.to_string().starts_with("Invalid pattern for shock"));
    }

    #[test]
    fn io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: AuditError = io.into();
        assert!(matches!(err, AuditError::Io(_)));
    }
}
