pub mod config;
pub mod error;
pub mod ops;

pub use config::*;
pub use error::{RegressionError, RegressionResult};
pub use ops::*;

pub use ndarray;

/// Feature matrix: one instance per row.
pub type Matrix = ndarray::Array2<f64>;

/// Target or statistics vector.
pub type Vector = ndarray::Array1<f64>;
