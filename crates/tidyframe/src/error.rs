use crate::value::DataType;

/// Error raised by a host-supplied callback.
///
/// Any error type converts into this with `?`, so callbacks can propagate their own failures.
pub type CallbackError = Box<dyn std::error::Error + Send + Sync>;

pub type CallbackResult<T> = Result<T, CallbackError>;

pub type FrameResult<T> = Result<T, FrameError>;

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("column length mismatch for {column}: expected {expected} values, got {actual}")]
    ColumnLengthMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },

    #[error("schema mismatch: expected {expected} values per row, got {actual}")]
    SchemaMismatch { expected: usize, actual: usize },

    #[error("duplicate column: {0}")]
    DuplicateColumn(String),

    #[error("unknown column: {0}")]
    UnknownColumn(String),

    #[error("row index {index} out of bounds for frame with {len} rows")]
    RowOutOfBounds { index: usize, len: usize },

    #[error("shift distance must be non-negative, got {0}")]
    NegativeShift(i64),

    #[error("invalid join keys: {0}")]
    InvalidJoinKeys(String),

    #[error("column {column} holds {found} values, which cannot be used as an ordered key")]
    UnorderableKey { column: String, found: DataType },

    #[error(
        "duplicate pivot cell for {name:?} in row {row_key}; supply an aggregator to combine values"
    )]
    DuplicatePivotCell { name: String, row_key: String },

    #[error("values {first} and {second} of column {column} both name the pivot column {name:?}")]
    PivotNameCollision {
        column: String,
        name: String,
        first: String,
        second: String,
    },

    #[error("pivot names {unexpected:?} in column {column} are not listed in expected_columns")]
    UnexpectedPivotNames {
        column: String,
        unexpected: Vec<String>,
    },

    #[error("transpose expected {expected} output rows, but the frame has {actual} columns")]
    TransposeRowCount { expected: usize, actual: usize },

    #[error("length mismatch: {left} has {left_len} values, {right} has {right_len}")]
    LengthMismatch {
        left: &'static str,
        left_len: usize,
        right: &'static str,
        right_len: usize,
    },

    #[error("{verb}: column {column} has an async callback; use the async variant of the verb")]
    AsyncCallback { verb: &'static str, column: String },

    #[error("{verb}: callback failed at position {position}: {source}")]
    Callback {
        verb: &'static str,
        position: usize,
        #[source]
        source: CallbackError,
    },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl FrameError {
    pub(crate) fn callback(verb: &'static str, position: usize, source: CallbackError) -> Self {
        FrameError::Callback {
            verb,
            position,
            source,
        }
    }
}
