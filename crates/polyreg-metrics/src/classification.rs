use crate::confusion::ConfusionMatrix;
use log::warn;
use polyreg_core::{RegressionError, RegressionResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How per-class precision and recall are combined into one number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Averaging {
    /// Scores of a single positive class.
    Binary { positive: usize },
    /// Pool TP, FP and FN over every class first.
    Micro,
    /// Unweighted mean of per-class scores.
    Macro,
}

impl Default for Averaging {
    fn default() -> Self {
        Averaging::Binary { positive: 1 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Scores {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

fn ratio(num: usize, den: usize, metric: &'static str) -> RegressionResult<f64> {
    if den == 0 {
        Err(RegressionError::DivisionByZero { metric })
    } else {
        Ok(num as f64 / den as f64)
    }
}

fn harmonic(precision: f64, recall: f64) -> RegressionResult<f64> {
    if precision + recall == 0.0 {
        Err(RegressionError::DivisionByZero { metric: "f1" })
    } else {
        Ok(2.0 * precision * recall / (precision + recall))
    }
}

fn scores_from(tp: usize, fp: usize, fn_: usize) -> RegressionResult<Scores> {
    let precision = ratio(tp, tp + fp, "precision")?;
    let recall = ratio(tp, tp + fn_, "recall")?;
    Ok(Scores {
        precision,
        recall,
        f1: harmonic(precision, recall)?,
    })
}

/// Precision, recall and F1 of every class. Undefined values are NaN.
pub fn per_class_scores(cm: &ConfusionMatrix) -> Vec<Scores> {
    (0..cm.n_classes())
        .filter_map(|k| cm.class_counts(k).ok())
        .map(|c| {
            let precision = ratio(c.tp, c.tp + c.fp, "precision").unwrap_or(f64::NAN);
            let recall = ratio(c.tp, c.tp + c.fn_, "recall").unwrap_or(f64::NAN);
            let f1 = harmonic(precision, recall).unwrap_or(f64::NAN);
            Scores { precision, recall, f1 }
        })
        .collect()
}

/// Aggregate precision, recall and F1 of a confusion matrix.
pub fn precision_recall_f1(cm: &ConfusionMatrix, averaging: Averaging) -> RegressionResult<Scores> {
    match averaging {
        Averaging::Binary { positive } => {
            let c = cm.class_counts(positive)?;
            scores_from(c.tp, c.fp, c.fn_)
        }
        Averaging::Micro => {
            let (mut tp, mut fp, mut fn_) = (0, 0, 0);
            for k in 0..cm.n_classes() {
                let c = cm.class_counts(k)?;
                tp += c.tp;
                fp += c.fp;
                fn_ += c.fn_;
            }
            scores_from(tp, fp, fn_)
        }
        Averaging::Macro => {
            let per_class = per_class_scores(cm);
            if per_class.is_empty() {
                return Err(RegressionError::EmptyInput("confusion matrix has no classes"));
            }
            let undefined = per_class
                .iter()
                .filter(|s| s.precision.is_nan() || s.recall.is_nan() || s.f1.is_nan())
                .count();
            if undefined > 0 {
                warn!("{} of {} classes have undefined scores, counted as 0", undefined, per_class.len());
            }
            Ok(Scores {
                precision: mean_or_zero(&per_class, |s| s.precision),
                recall: mean_or_zero(&per_class, |s| s.recall),
                f1: mean_or_zero(&per_class, |s| s.f1),
            })
        }
    }
}

fn mean_or_zero(per_class: &[Scores], field: impl Fn(&Scores) -> f64) -> f64 {
    let sum: f64 = per_class
        .iter()
        .map(field)
        .map(|v| if v.is_nan() { 0.0 } else { v })
        .sum();
    sum / per_class.len() as f64
}

/// True negative rate of `class`.
pub fn specificity(cm: &ConfusionMatrix, class: usize) -> RegressionResult<f64> {
    let c = cm.class_counts(class)?;
    ratio(c.tn, c.tn + c.fp, "specificity")
}

/// Scores of a classifier on one data set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub confusion: ConfusionMatrix,
    pub averaging: Averaging,
    pub scores: Scores,
    pub accuracy: f64,
    /// Only reported for [`Averaging::Binary`].
    pub specificity: Option<f64>,
}

impl ClassificationReport {
    pub fn new(confusion: ConfusionMatrix, averaging: Averaging) -> RegressionResult<Self> {
        let scores = precision_recall_f1(&confusion, averaging)?;
        let accuracy = confusion.accuracy()?;
        let specificity = match averaging {
            Averaging::Binary { positive } => specificity(&confusion, positive).ok(),
            _ => None,
        };
        Ok(ClassificationReport {
            confusion,
            averaging,
            scores,
            accuracy,
            specificity,
        })
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Confusion matrix:")?;
        write!(f, "{}", self.confusion)?;
        writeln!(f, "Precision:   {:.4}", self.scores.precision)?;
        writeln!(f, "Recall:      {:.4}", self.scores.recall)?;
        if let Some(s) = self.specificity {
            writeln!(f, "Specificity: {:.4}", s)?;
        }
        writeln!(f, "Accuracy:    {:.4}", self.accuracy)?;
        write!(f, "F1 score:    {:.4}", self.scores.f1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binary_cm() -> ConfusionMatrix {
        // TP = 3, FN = 1, FP = 2, TN = 4
        let truth = [1, 1, 1, 1, 0, 0, 0, 0, 0, 0];
        let pred = [1, 1, 1, 0, 1, 1, 0, 0, 0, 0];
        ConfusionMatrix::from_labels(&truth, &pred, 2).unwrap()
    }

    #[test]
    fn test_binary_scores() {
        let s = precision_recall_f1(&binary_cm(), Averaging::default()).unwrap();
        assert!((s.precision - 0.6).abs() < 1e-12);
        assert!((s.recall - 0.75).abs() < 1e-12);
        assert!((s.f1 - 2.0 * 0.6 * 0.75 / 1.35).abs() < 1e-12);
        assert!((specificity(&binary_cm(), 1).unwrap() - 4.0 / 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_perfect_predictions() {
        let cm = ConfusionMatrix::from_labels(&[0, 1, 1, 0], &[0, 1, 1, 0], 2).unwrap();
        let s = precision_recall_f1(&cm, Averaging::default()).unwrap();
        assert_eq!(s, Scores { precision: 1.0, recall: 1.0, f1: 1.0 });
    }

    #[test]
    fn test_micro_equals_accuracy_for_multiclass() {
        let cm = ConfusionMatrix::from_labels(&[0, 1, 2, 2, 1, 0], &[0, 2, 2, 2, 1, 1], 3).unwrap();
        let s = precision_recall_f1(&cm, Averaging::Micro).unwrap();
        let acc = cm.accuracy().unwrap();
        assert!((s.precision - acc).abs() < 1e-12);
        assert!((s.recall - acc).abs() < 1e-12);
        assert!((s.f1 - acc).abs() < 1e-12);
    }

    #[test]
    fn test_division_by_zero() {
        // nothing predicted positive
        let cm = ConfusionMatrix::from_labels(&[1, 0, 0], &[0, 0, 0], 2).unwrap();
        assert!(matches!(
            precision_recall_f1(&cm, Averaging::default()),
            Err(RegressionError::DivisionByZero { metric: "precision" })
        ));

        // positives predicted, none correct
        let cm = ConfusionMatrix::from_labels(&[1, 0], &[0, 1], 2).unwrap();
        assert!(matches!(
            precision_recall_f1(&cm, Averaging::default()),
            Err(RegressionError::DivisionByZero { metric: "f1" })
        ));
    }

    #[test]
    fn test_macro_counts_undefined_as_zero() {
        // class 2 never appears and is never predicted
        let cm = ConfusionMatrix::from_labels(&[0, 1, 1], &[0, 1, 1], 3).unwrap();
        let per_class = per_class_scores(&cm);
        assert!(per_class[2].precision.is_nan());
        let s = precision_recall_f1(&cm, Averaging::Macro).unwrap();
        assert!((s.precision - 2.0 / 3.0).abs() < 1e-12);
        assert!((s.f1 - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_report() {
        let report = ClassificationReport::new(binary_cm(), Averaging::default()).unwrap();
        assert!((report.accuracy - 0.7).abs() < 1e-12);
        assert!(report.specificity.is_some());
        let text = report.to_string();
        assert!(text.contains("F1 score"));
        assert!(text.contains("Specificity"));

        assert!(ClassificationReport::new(binary_cm(), Averaging::Binary { positive: 2 }).is_err());
    }
}
