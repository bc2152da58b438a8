use thiserror::Error;

/// Main error type for modeltune
#[derive(Error, Debug)]
pub enum MtError {
    #[error("Data error: {0}")]
    Data(#[from] DataError),

    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("Search error: {0}")]
    Search(#[from] SearchError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Dataset-related errors
#[derive(Error, Debug)]
pub enum DataError {
    #[error("Column not found: {column}")]
    ColumnNotFound { column: String },

    #[error("Shape mismatch: {message}")]
    ShapeMismatch { message: String },

    #[error("Insufficient data: {message}")]
    InsufficientData { message: String },

    #[error("Invalid label {value}: classification targets must be integer valued")]
    InvalidLabel { value: f64 },
}

/// Model construction and fitting errors
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Model not registered: {name}")]
    UnknownModel { name: String },

    #[error("Invalid parameter {parameter}: {message}")]
    InvalidParameter { parameter: String, message: String },

    #[error("Model {model} must be fitted before predicting")]
    NotFitted { model: String },

    #[error("Model fit failed: {message}")]
    FitFailed { message: String },

    #[error("Model {model} handles {expected} problems, but {actual} was requested")]
    ProblemTypeMismatch {
        model: String,
        expected: String,
        actual: String,
    },
}

/// Search space and study errors
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Invalid parameter spec for {parameter}: {message}")]
    InvalidSpec { parameter: String, message: String },

    #[error("Invalid range for {parameter}: {message}")]
    InvalidRange { parameter: String, message: String },

    #[error("Unknown search strategy: {name}")]
    UnknownStrategy { name: String },

    #[error("No trial completed successfully out of {attempted}")]
    NoCompletedTrials { attempted: usize },

    #[error("Worker pool could not be built: {message}")]
    WorkerPool { message: String },
}

/// Result type alias for modeltune operations
pub type MtResult<T> = Result<T, MtError>;

/// Macro for creating validation errors
#[macro_export]
macro_rules! validation_error {
    ($($arg:tt)*) => {
        $crate::MtError::Validation(format!($($arg)*))
    };
}

/// Macro for creating internal errors
#[macro_export]
macro_rules! internal_error {
    ($($arg:tt)*) => {
        $crate::MtError::Internal(format!($($arg)*))
    };
}

/// Macro for creating configuration errors
#[macro_export]
macro_rules! config_error {
    ($($arg:tt)*) => {
        $crate::MtError::Config(format!($($arg)*))
    };
}
