use thiserror::Error;
use tidyframe::FrameError;

pub type IoResult<T> = Result<T, IoError>;

#[derive(Debug, Error)]
pub enum IoError {
    /// A data row failed its declared schema. `row` is the 1-based data row (headers excluded).
    #[error("row {row}, column {column}: {reason}")]
    Validation {
        row: u64,
        column: String,
        reason: String,
    },

    #[error("csv parse error at row {row}: {reason}")]
    Parse { row: u64, reason: String },

    #[error("source has no column {0}, which the schema requires")]
    MissingField(String),

    #[error("column {0} is not declared in the schema")]
    UnknownColumn(String),

    #[error("column {column}: {reason}")]
    SchemaMismatch { column: String, reason: String },

    #[error(transparent)]
    Frame(#[from] FrameError),

    #[cfg(feature = "arrow")]
    #[error(transparent)]
    Arrow(#[from] arrow_schema::ArrowError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl IoError {
    pub(crate) fn validation(row: u64, column: &str, reason: impl Into<String>) -> Self {
        IoError::Validation {
            row,
            column: column.to_string(),
            reason: reason.into(),
        }
    }
}
