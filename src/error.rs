use thiserror::Error;

/// Structural problems with an ingested table.
///
/// Per-value parse failures never surface here; they degrade to missing
/// fields on the affected record.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// A column the normalizer reads is absent from the header row.
    #[error("Missing required column: {0}")]
    MissingColumn(String),

    /// A column the normalizer reads appears more than once.
    #[error("Duplicate column: {0}")]
    DuplicateColumn(String),

    /// The header row has no columns at all.
    #[error("Header row is empty")]
    EmptyHeader,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_missing_column() {
        let err = SchemaError::MissingColumn("FAILDATE".to_string());
        assert_eq!(err.to_string(), "Missing required column: FAILDATE");
    }

    #[test]
    fn test_error_survives_anyhow() {
        let err: anyhow::Error = SchemaError::EmptyHeader.into();
        assert_eq!(err.downcast_ref::<SchemaError>(), Some(&SchemaError::EmptyHeader));
    }
}
