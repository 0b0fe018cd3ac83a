use ndarray::{Array2, Axis};
use polyreg_core::{argmax, Matrix, RegressionError, RegressionResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Per-class counts derived from a confusion matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassCounts {
    pub tp: usize,
    pub fp: usize,
    pub fn_: usize,
    pub tn: usize,
}

/// K×K table of counts: entry (i, j) is the number of instances of true
/// class i that were predicted as class j.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    counts: Array2<usize>,
}

impl ConfusionMatrix {
    /// Build from class indices.
    pub fn from_labels(truth: &[usize], predicted: &[usize], n_classes: usize) -> RegressionResult<Self> {
        if truth.len() != predicted.len() {
            return Err(RegressionError::DimensionMismatch {
                expected: truth.len(),
                got: predicted.len(),
            });
        }
        let mut counts = Array2::zeros((n_classes, n_classes));
        for (&t, &p) in truth.iter().zip(predicted) {
            let worst = t.max(p);
            if worst >= n_classes {
                return Err(RegressionError::DimensionMismatch {
                    expected: n_classes,
                    got: worst + 1,
                });
            }
            counts[[t, p]] += 1;
        }
        Ok(ConfusionMatrix { counts })
    }

    /// Build from (m, K) one-hot predictions and ground truth.
    ///
    /// Single-column inputs are read as 0/1 labels, giving a 2×2 matrix.
    pub fn from_one_hot(predictions: &Matrix, ground_truth: &Matrix) -> RegressionResult<Self> {
        if predictions.dim() != ground_truth.dim() {
            return Err(RegressionError::ShapeMismatch {
                context: "confusion matrix",
                expected: ground_truth.shape().to_vec(),
                got: predictions.shape().to_vec(),
            });
        }
        let m = predictions.nrows();
        if predictions.ncols() == 1 {
            let binary = |y: &Matrix| -> Vec<usize> {
                y.column(0).iter().map(|&v| usize::from(v >= 0.5)).collect()
            };
            return Self::from_labels(&binary(ground_truth), &binary(predictions), 2);
        }
        let truth = argmax(ground_truth, m)?;
        let predicted = argmax(predictions, m)?;
        Self::from_labels(&truth, &predicted, predictions.ncols())
    }

    /// Build a 2×2 matrix from thresholded outputs against 0/1 targets.
    ///
    /// Every entry is scored as an independent binary decision.
    pub fn from_binary(predictions: &Array2<bool>, ground_truth: &Matrix) -> RegressionResult<Self> {
        if predictions.dim() != ground_truth.dim() {
            return Err(RegressionError::ShapeMismatch {
                context: "confusion matrix",
                expected: ground_truth.shape().to_vec(),
                got: predictions.shape().to_vec(),
            });
        }
        let truth: Vec<usize> = ground_truth.iter().map(|&v| usize::from(v >= 0.5)).collect();
        let predicted: Vec<usize> = predictions.iter().map(|&v| usize::from(v)).collect();
        Self::from_labels(&truth, &predicted, 2)
    }

    pub fn n_classes(&self) -> usize {
        self.counts.nrows()
    }

    pub fn counts(&self) -> &Array2<usize> {
        &self.counts
    }

    /// Count for a `(truth, predicted)` cell, `None` outside the class range.
    pub fn get(&self, truth: usize, predicted: usize) -> Option<usize> {
        self.counts.get((truth, predicted)).copied()
    }

    pub fn total(&self) -> usize {
        self.counts.sum()
    }

    /// Number of correct predictions (the diagonal).
    pub fn correct(&self) -> usize {
        self.counts.diag().sum()
    }

    /// True per-class counts.
    pub fn row_sums(&self) -> Vec<usize> {
        self.counts.sum_axis(Axis(1)).to_vec()
    }

    /// Predicted per-class counts.
    pub fn col_sums(&self) -> Vec<usize> {
        self.counts.sum_axis(Axis(0)).to_vec()
    }

    pub fn class_counts(&self, class: usize) -> RegressionResult<ClassCounts> {
        if class >= self.n_classes() {
            return Err(RegressionError::DimensionMismatch {
                expected: self.n_classes(),
                got: class + 1,
            });
        }
        let tp = self.counts[[class, class]];
        let row = self.counts.row(class).sum();
        let col = self.counts.column(class).sum();
        Ok(ClassCounts {
            tp,
            fp: col - tp,
            fn_: row - tp,
            tn: self.total() + tp - row - col,
        })
    }

    /// Fraction of correct predictions.
    pub fn accuracy(&self) -> RegressionResult<f64> {
        let total = self.total();
        if total == 0 {
            return Err(RegressionError::DivisionByZero { metric: "accuracy" });
        }
        Ok(self.correct() as f64 / total as f64)
    }
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let widest = self.counts.iter().max().copied().unwrap_or(0);
        let width = widest
            .to_string()
            .len()
            .max(self.n_classes().saturating_sub(1).to_string().len())
            .max(4);
        write!(f, "{:>10}", "true\\pred")?;
        for j in 0..self.n_classes() {
            write!(f, " {:>width$}", j, width = width)?;
        }
        writeln!(f)?;
        for (i, row) in self.counts.rows().into_iter().enumerate() {
            write!(f, "{:>10}", i)?;
            for v in row {
                write!(f, " {:>width$}", v, width = width)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_from_labels() {
        let truth = [0, 1, 2, 2, 1, 0];
        let predicted = [0, 2, 2, 2, 1, 1];
        let cm = ConfusionMatrix::from_labels(&truth, &predicted, 3).unwrap();

        assert_eq!(cm.get(0, 0), Some(1));
        assert_eq!(cm.get(0, 1), Some(1));
        assert_eq!(cm.get(1, 2), Some(1));
        assert_eq!(cm.get(2, 2), Some(2));
        assert_eq!(cm.get(3, 0), None);
        assert_eq!(cm.get(0, 3), None);
        assert_eq!(cm.total(), 6);
        assert!(cm.correct() <= cm.total());
        assert_eq!(cm.row_sums(), vec![2, 2, 2]);
        assert_eq!(cm.col_sums(), vec![1, 2, 3]);
        assert!((cm.accuracy().unwrap() - 4.0 / 6.0).abs() < 1e-12);

        assert!(ConfusionMatrix::from_labels(&[0, 3], &[0, 0], 3).is_err());
        assert!(ConfusionMatrix::from_labels(&[0], &[0, 0], 3).is_err());
    }

    #[test]
    fn test_from_one_hot() {
        let truth = array![[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]];
        let pred = array![[1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]];
        let cm = ConfusionMatrix::from_one_hot(&pred, &truth).unwrap();
        assert_eq!(cm.n_classes(), 3);
        assert_eq!(cm.row_sums(), vec![1, 2, 1]);
        assert_eq!(cm.col_sums(), vec![1, 1, 2]);
        assert_eq!(cm.get(1, 2), Some(1));

        assert!(ConfusionMatrix::from_one_hot(&pred, &truth.t().to_owned()).is_err());
    }

    #[test]
    fn test_binary_layout() {
        let truth = array![[1.0], [1.0], [0.0], [0.0], [1.0]];
        let pred = array![[true], [false], [true], [false], [true]];
        let cm = ConfusionMatrix::from_binary(&pred, &truth).unwrap();

        let positive = cm.class_counts(1).unwrap();
        assert_eq!(positive, ClassCounts { tp: 2, fp: 1, fn_: 1, tn: 1 });
        assert_eq!(cm.get(1, 1), Some(2));
        assert_eq!(cm.get(1, 0), Some(1));
        assert_eq!(cm.get(0, 1), Some(1));
        assert_eq!(cm.get(0, 0), Some(1));

        let same = ConfusionMatrix::from_one_hot(&pred.mapv(|v| if v { 1.0 } else { 0.0 }), &truth)
            .unwrap();
        assert_eq!(same, cm);
    }

    #[test]
    fn test_class_counts_sum_to_total() {
        let cm = ConfusionMatrix::from_labels(&[0, 1, 2, 2, 0, 1, 1], &[0, 2, 2, 1, 0, 1, 0], 3).unwrap();
        for k in 0..3 {
            let c = cm.class_counts(k).unwrap();
            assert_eq!(c.tp + c.fp + c.fn_ + c.tn, cm.total());
        }
        assert!(cm.class_counts(3).is_err());
    }

    #[test]
    fn test_empty_accuracy() {
        let cm = ConfusionMatrix::from_labels(&[], &[], 2).unwrap();
        assert!(matches!(cm.accuracy(), Err(RegressionError::DivisionByZero { .. })));
    }

    #[test]
    fn test_display() {
        let cm = ConfusionMatrix::from_labels(&[0, 1, 1], &[0, 1, 0], 2).unwrap();
        let text = cm.to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("true\\pred"));
        assert!(lines[2].trim_start().starts_with('1'));
        assert!(lines[2].trim_end().ends_with('1'));
    }
}
