use polyreg_core::{one_hot, Matrix, RegressionError, RegressionResult};
use serde::{Deserialize, Serialize};

/// Map numeric class labels to dense indices `0..k`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LabelEncoder {
    classes: Vec<f64>,
}

impl LabelEncoder {
    pub fn new() -> Self {
        LabelEncoder { classes: Vec::new() }
    }

    /// Fit the encoder on the distinct labels, sorted ascending.
    pub fn fit(&mut self, labels: &[f64]) {
        let mut unique = labels.to_vec();
        unique.sort_by(f64::total_cmp);
        unique.dedup();
        self.classes = unique;
    }

    pub fn classes(&self) -> &[f64] {
        &self.classes
    }

    pub fn n_classes(&self) -> usize {
        self.classes.len()
    }

    /// Class index of every label.
    pub fn transform(&self, labels: &[f64]) -> RegressionResult<Vec<usize>> {
        labels
            .iter()
            .map(|&l| {
                self.classes
                    .binary_search_by(|c| c.total_cmp(&l))
                    .map_err(|_| RegressionError::UnknownLabel(l))
            })
            .collect()
    }

    /// Inverse transform: index -> label.
    pub fn inverse_transform(&self, indices: &[usize]) -> RegressionResult<Vec<f64>> {
        indices
            .iter()
            .map(|&i| {
                self.classes.get(i).copied().ok_or(RegressionError::DimensionMismatch {
                    expected: self.classes.len(),
                    got: i + 1,
                })
            })
            .collect()
    }

    /// One-hot matrix (m, k) of `labels` over the fitted classes.
    pub fn one_hot(&self, labels: &[f64]) -> RegressionResult<Matrix> {
        one_hot(&self.transform(labels)?, self.n_classes())
    }
}

/// One-hot encode labels that already are class indices `0..n_classes`.
pub fn one_hot_encode(labels: &[f64], n_classes: usize) -> RegressionResult<Matrix> {
    let indices = labels
        .iter()
        .map(|&l| {
            if l >= 0.0 && l.fract() == 0.0 && (l as usize) < n_classes {
                Ok(l as usize)
            } else {
                Err(RegressionError::UnknownLabel(l))
            }
        })
        .collect::<RegressionResult<Vec<_>>>()?;
    one_hot(&indices, n_classes)
}
