//! # polyreg
//!
//! Linear and logistic (sigmoid or softmax) regression on polynomial
//! features, fitted by full-batch gradient descent.
//!
//! ## Modules
//!
//! - **core**: Error type, matrix aliases, link functions, training configuration
//! - **pipeline**: Transformer and Estimator traits, Pipeline chaining them
//! - **preprocessing**: Exponent tables, map_features, StandardScaler, FeaturePipeline, split, one-hot
//! - **linear**: RegressionModel with LinearModel and LogisticModel families, trace sinks
//! - **metrics**: Confusion matrix, precision, recall, F1, accuracy, specificity
//! - **data**: Dataset with train/test splits, text and MNIST IDX readers
//! - **io**: Cost and penalty traces, fitted curves, JSON model snapshots
//! - **datasets**: Synthetic blobs, separable classes, noisy polynomials

/// Errors, matrix aliases and numeric kernels.
pub use polyreg_core as core;

/// Pipeline API.
pub use polyreg_pipeline as pipeline;

/// Feature expansion and normalization.
pub use polyreg_preprocessing as preprocessing;

/// Regression models.
pub use polyreg_linear as linear;

/// Evaluation metrics.
pub use polyreg_metrics as metrics;

/// Data sets and readers.
pub use polyreg_data as data;

/// Output artifacts and snapshots.
pub use polyreg_io as io;

/// Synthetic data.
pub use polyreg_datasets as datasets;
