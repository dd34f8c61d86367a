use std::path::PathBuf;
use thiserror::Error;

/// Failures of a conversion run. Each variant is recovered at its own scope:
/// sources are skipped, rows are skipped, sink writes fail per format.
#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("could not read source {source_name}: {reason}")]
    SourceUnreadable { source_name: String, reason: String },

    #[error("missing required columns in {source_name}: {}", missing.join(", "))]
    SourceSchemaInvalid {
        source_name: String,
        missing: Vec<String>,
    },

    #[error("row {row}: {reason}")]
    RowConversion { row: usize, reason: String },

    #[error("failed to write {}: {source}", target.display())]
    SinkWrite {
        target: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no source could be loaded")]
    NoSourcesLoaded,
}

impl ConversionError {
    pub fn row(row: usize, reason: impl Into<String>) -> Self {
        ConversionError::RowConversion {
            row,
            reason: reason.into(),
        }
    }

    /// True for the errors that cause a whole source to be skipped.
    pub fn is_source_level(&self) -> bool {
        matches!(
            self,
            ConversionError::SourceUnreadable { .. } | ConversionError::SourceSchemaInvalid { .. }
        )
    }
}
