use thiserror::Error;

/// Error type shared by every polyreg crate.
#[derive(Debug, Error)]
pub enum RegressionError {
    #[error("Invalid degree: {degree}, polynomial degree must be >= 1")]
    InvalidDegree { degree: u32 },

    #[error("Dimension mismatch: expected {expected} features, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("Shape mismatch in {context}: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        context: &'static str,
        expected: Vec<usize>,
        got: Vec<usize>,
    },

    #[error("Empty input: {0}")]
    EmptyInput(&'static str),

    #[error("Empty model: cannot allocate theta with {features} features and {outputs} outputs")]
    EmptyModel { features: usize, outputs: usize },

    #[error("Model is not initialized, call initialize() first")]
    ModelNotInitialized,

    #[error("{0} is not fitted, call fit() first")]
    NotFitted(&'static str),

    #[error("Invalid classification threshold: {0}, must lie in [0, 1]")]
    InvalidThreshold(f64),

    #[error("Invalid link function: {0:?}, expected \"sigmoid\" or \"softmax\"")]
    InvalidLinkFunction(String),

    #[error("Invalid parameter {name}: {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: f64,
        reason: &'static str,
    },

    #[error("Division by zero while computing {metric}")]
    DivisionByZero { metric: &'static str },

    #[error("Unknown label {0}, not present in the class list")]
    UnknownLabel(f64),

    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type RegressionResult<T> = Result<T, RegressionError>;
