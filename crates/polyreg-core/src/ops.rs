use crate::error::{RegressionError, RegressionResult};
use crate::{Matrix, Vector};
use ndarray::{s, Array2, ArrayView2, Axis, CowArray, Ix2};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Prepend a column of ones to a feature matrix.
pub fn prepend_bias(x: ArrayView2<'_, f64>) -> Matrix {
    let mut out = Array2::ones((x.nrows(), x.ncols() + 1));
    out.slice_mut(s![.., 1..]).assign(&x);
    out
}

/// Borrow `x` as a design matrix with a leading bias column.
///
/// `x` may carry either `n_features` columns, in which case the bias column is
/// synthesized into a fresh buffer, or `n_features + 1` columns whose first
/// column is already all ones, in which case it is borrowed as is.
pub fn with_bias(x: &Matrix, n_features: usize) -> RegressionResult<CowArray<'_, f64, Ix2>> {
    let cols = x.ncols();
    if cols == n_features {
        return Ok(CowArray::from(prepend_bias(x.view())));
    }
    if cols == n_features + 1 && x.column(0).iter().all(|&v| v == 1.0) {
        return Ok(CowArray::from(x.view()));
    }
    Err(RegressionError::ShapeMismatch {
        context: "feature matrix",
        expected: vec![x.nrows(), n_features],
        got: vec![x.nrows(), cols],
    })
}

/// View a vector as an (n, 1) matrix.
pub fn as_column(v: &Vector) -> Matrix {
    v.view().insert_axis(Axis(1)).to_owned()
}

/// View targets as an instance-major (m, outputs) matrix.
///
/// Accepts both (m, outputs) and the class-major (outputs, m) orientation.
pub fn orient_targets(y: &Matrix, m: usize, outputs: usize) -> RegressionResult<ArrayView2<'_, f64>> {
    if y.dim() == (m, outputs) {
        Ok(y.view())
    } else if y.dim() == (outputs, m) {
        Ok(y.t())
    } else {
        Err(RegressionError::ShapeMismatch {
            context: "targets",
            expected: vec![m, outputs],
            got: y.shape().to_vec(),
        })
    }
}

/// Logistic function, split on the sign of `z` to avoid overflow in `exp`.
pub fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// Axis of `scores` that runs over classes, given how many instances there are.
///
/// Instance-major layouts win when the matrix is square.
pub fn class_axis(scores: &Matrix, n_instances: usize) -> RegressionResult<Axis> {
    if scores.nrows() == n_instances {
        Ok(Axis(1))
    } else if scores.ncols() == n_instances {
        Ok(Axis(0))
    } else {
        Err(RegressionError::ShapeMismatch {
            context: "class scores",
            expected: vec![n_instances],
            got: scores.shape().to_vec(),
        })
    }
}

/// Normalized exponential over the class axis of `scores`.
pub fn softmax(scores: &Matrix, n_instances: usize) -> RegressionResult<Matrix> {
    let axis = class_axis(scores, n_instances)?;
    let mut out = scores.clone();
    for mut lane in out.lanes_mut(axis) {
        let max = lane.fold(f64::NEG_INFINITY, |acc, &v| acc.max(v));
        lane.mapv_inplace(|v| (v - max).exp());
        let sum = lane.sum();
        lane /= sum;
    }
    Ok(out)
}

/// Index of the largest score per instance. Ties go to the lowest index.
pub fn argmax(scores: &Matrix, n_instances: usize) -> RegressionResult<Vec<usize>> {
    let axis = class_axis(scores, n_instances)?;
    Ok(scores
        .lanes(axis)
        .into_iter()
        .map(|lane| {
            let mut best = 0;
            for (i, &v) in lane.iter().enumerate() {
                if v > lane[best] {
                    best = i;
                }
            }
            best
        })
        .collect())
}

/// Build an (m, k) one-hot matrix from class indices.
pub fn one_hot(indices: &[usize], k: usize) -> RegressionResult<Matrix> {
    let mut out = Matrix::zeros((indices.len(), k));
    for (row, &class) in indices.iter().enumerate() {
        if class >= k {
            return Err(RegressionError::DimensionMismatch { expected: k, got: class + 1 });
        }
        out[[row, class]] = 1.0;
    }
    Ok(out)
}

/// Link function of a logistic model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkFunction {
    /// Independent outputs, one probability per column.
    #[default]
    Sigmoid,
    /// Mutually exclusive classes.
    Softmax,
}

impl LinkFunction {
    pub fn apply(&self, scores: &Matrix, n_instances: usize) -> RegressionResult<Matrix> {
        match self {
            LinkFunction::Sigmoid => Ok(scores.mapv(sigmoid)),
            LinkFunction::Softmax => softmax(scores, n_instances),
        }
    }
}

impl FromStr for LinkFunction {
    type Err = RegressionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sigmoid" => Ok(LinkFunction::Sigmoid),
            "softmax" => Ok(LinkFunction::Softmax),
            _ => Err(RegressionError::InvalidLinkFunction(s.to_string())),
        }
    }
}

impl fmt::Display for LinkFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkFunction::Sigmoid => write!(f, "sigmoid"),
            LinkFunction::Softmax => write!(f, "softmax"),
        }
    }
}
