use crate::model::{ModelFamily, RegressionModel};
use ndarray::{Array2, ArrayView2, Zip};
use polyreg_core::{
    argmax, one_hot, validate_threshold, LinkFunction, Matrix, RegressionError, RegressionResult,
};
use serde::{Deserialize, Serialize};

/// Probabilities are clamped to `[EPS, 1 - EPS]` before taking logs.
const EPS: f64 = 1e-15;

/// Cross-entropy classification through a sigmoid or softmax link.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "LogisticFields")]
pub struct LogisticModel {
    link: LinkFunction,
    threshold: f64,
}

/// Deserialized form of [`LogisticModel`], checked before use.
#[derive(Deserialize)]
struct LogisticFields {
    link: LinkFunction,
    threshold: f64,
}

impl TryFrom<LogisticFields> for LogisticModel {
    type Error = RegressionError;

    fn try_from(fields: LogisticFields) -> RegressionResult<Self> {
        let mut model = LogisticModel::new(fields.link);
        model.set_classification_threshold(fields.threshold)?;
        Ok(model)
    }
}

impl LogisticModel {
    pub fn new(link: LinkFunction) -> Self {
        LogisticModel { link, threshold: 0.5 }
    }

    pub fn link(&self) -> LinkFunction {
        self.link
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Decision threshold of the sigmoid link. Must lie in [0, 1].
    pub fn set_classification_threshold(&mut self, threshold: f64) -> RegressionResult<()> {
        validate_threshold(threshold)?;
        self.threshold = threshold;
        Ok(())
    }
}

impl Default for LogisticModel {
    fn default() -> Self {
        Self::new(LinkFunction::Sigmoid)
    }
}

/// Class decisions of a logistic model.
#[derive(Debug, Clone, PartialEq)]
pub enum ClassPrediction {
    /// Sigmoid link: `h >= threshold` for every output column.
    Binary(Array2<bool>),
    /// Softmax link: one-hot of the most probable class per row.
    OneHot(Matrix),
}

impl ClassPrediction {
    pub fn n_instances(&self) -> usize {
        match self {
            ClassPrediction::Binary(b) => b.nrows(),
            ClassPrediction::OneHot(m) => m.nrows(),
        }
    }

    /// Decisions as a 0/1 matrix of shape (m, outputs).
    pub fn to_matrix(&self) -> Matrix {
        match self {
            ClassPrediction::Binary(b) => b.mapv(|v| if v { 1.0 } else { 0.0 }),
            ClassPrediction::OneHot(m) => m.clone(),
        }
    }

    /// One class index per instance.
    ///
    /// A single sigmoid output yields 0 or 1. Several sigmoid outputs yield the
    /// first positive column, or 0 when none fired.
    pub fn class_indices(&self) -> Vec<usize> {
        match self {
            ClassPrediction::Binary(b) if b.ncols() == 1 => {
                b.column(0).iter().map(|&v| usize::from(v)).collect()
            }
            ClassPrediction::Binary(b) => b
                .rows()
                .into_iter()
                .map(|row| row.iter().position(|&v| v).unwrap_or(0))
                .collect(),
            ClassPrediction::OneHot(m) => m
                .rows()
                .into_iter()
                .map(|row| row.iter().position(|&v| v == 1.0).unwrap_or(0))
                .collect(),
        }
    }
}

impl From<ClassPrediction> for Matrix {
    fn from(prediction: ClassPrediction) -> Matrix {
        match prediction {
            ClassPrediction::OneHot(m) => m,
            binary => binary.to_matrix(),
        }
    }
}

impl ModelFamily for LogisticModel {
    type Output = ClassPrediction;

    fn name(&self) -> &'static str {
        match self.link {
            LinkFunction::Sigmoid => "logistic (sigmoid)",
            LinkFunction::Softmax => "logistic (softmax)",
        }
    }

    fn hypothesis(&self, scores: Matrix, n_instances: usize) -> RegressionResult<Matrix> {
        self.link.apply(&scores, n_instances)
    }

    fn data_cost(&self, h: &Matrix, y: ArrayView2<'_, f64>) -> f64 {
        let m = h.nrows() as f64;
        let mut total = 0.0;
        match self.link {
            LinkFunction::Sigmoid => {
                Zip::from(h).and(&y).for_each(|&p, &t| {
                    let p = p.clamp(EPS, 1.0 - EPS);
                    total += t * p.ln() + (1.0 - t) * (1.0 - p).ln();
                });
            }
            LinkFunction::Softmax => {
                Zip::from(h).and(&y).for_each(|&p, &t| {
                    total += t * p.clamp(EPS, 1.0 - EPS).ln();
                });
            }
        }
        -total / m
    }

    /// Cross-entropy needs 0/1 (or probability) targets.
    fn check_targets(&self, y: ArrayView2<'_, f64>) -> RegressionResult<()> {
        match y.iter().find(|&&t| !(0.0..=1.0).contains(&t)) {
            Some(&t) => Err(RegressionError::UnknownLabel(t)),
            None => Ok(()),
        }
    }

    fn decide(&self, h: Matrix, n_instances: usize) -> RegressionResult<ClassPrediction> {
        match self.link {
            LinkFunction::Sigmoid => {
                let threshold = self.threshold;
                Ok(ClassPrediction::Binary(h.mapv(|p| p >= threshold)))
            }
            LinkFunction::Softmax => {
                let classes = argmax(&h, n_instances)?;
                Ok(ClassPrediction::OneHot(one_hot(&classes, h.ncols())?))
            }
        }
    }
}

/// Logistic regression by batch gradient descent.
pub type LogisticRegression = RegressionModel<LogisticModel>;

impl RegressionModel<LogisticModel> {
    pub fn logistic(link: LinkFunction) -> Self {
        RegressionModel::new(LogisticModel::new(link))
    }

    pub fn link(&self) -> LinkFunction {
        self.family().link()
    }

    pub fn set_classification_threshold(&mut self, threshold: f64) -> RegressionResult<()> {
        self.family_mut().set_classification_threshold(threshold)
    }

    /// Hypothesis matrix `h(XΘ)`, one row per instance.
    pub fn predict_proba(&self, x: &Matrix) -> RegressionResult<Matrix> {
        self.hypothesis(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;
    use polyreg_core::{DescentConfig, InitStrategy};

    fn separable() -> (Matrix, Matrix) {
        let x = array![[-1.5, -1.0], [-1.0, -1.2], [-1.2, -0.6], [1.1, 0.9], [0.8, 1.4], [1.3, 1.0]];
        let y = array![[0.0], [0.0], [0.0], [1.0], [1.0], [1.0]];
        (x, y)
    }

    #[test]
    fn test_logistic_regression_separates() {
        let (x, y) = separable();
        let mut model = LogisticRegression::logistic(LinkFunction::Sigmoid);
        model.initialize(2, 1, InitStrategy::Zeros).unwrap();
        let config = DescentConfig {
            learning_rate: 0.5,
            l2_penalty: 0.0,
            convergence_delta: 1e-6,
            max_iterations: 100_000,
        };
        model.fit(&x, &y, config).unwrap();

        let report = model.last_fit().unwrap();
        assert!(report.converged);
        assert!(report.last_delta <= 1e-6);

        let pred = model.predict(&x).unwrap();
        assert_eq!(pred.class_indices(), vec![0, 0, 0, 1, 1, 1]);
        assert_eq!(pred.to_matrix(), y);
    }

    #[test]
    fn test_softmax_predicts_argmax() {
        // scores equal the raw inputs
        let theta = array![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
        let model =
            LogisticRegression::from_theta(LogisticModel::new(LinkFunction::Softmax), theta).unwrap();
        let pred = model.predict(&array![[1.0, 2.0, 3.0]]).unwrap();
        assert_eq!(pred.class_indices(), vec![2]);
        assert_eq!(pred.to_matrix(), array![[0.0, 0.0, 1.0]]);

        let theta = array![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]];
        let model =
            LogisticRegression::from_theta(LogisticModel::new(LinkFunction::Softmax), theta).unwrap();
        let pred = model.predict(&array![[1.0, 1.0]]).unwrap();
        assert_eq!(pred.class_indices(), vec![0]);
    }

    #[test]
    fn test_softmax_fit_on_three_classes() {
        let x = array![[-2.0, 0.0], [-1.8, 0.3], [0.0, 2.0], [0.3, 1.7], [2.0, -0.2], [1.7, 0.1]];
        let y = array![
            [1.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, 0.0, 1.0],
            [0.0, 0.0, 1.0]
        ];
        let mut model = LogisticRegression::logistic(LinkFunction::Softmax);
        model
            .initialize(2, 3, InitStrategy::UniformRandom { seed: Some(11) })
            .unwrap();
        let config = DescentConfig {
            learning_rate: 0.5,
            l2_penalty: 0.01,
            convergence_delta: 1e-9,
            max_iterations: 20_000,
        };
        model.fit(&x, &y, config).unwrap();

        let proba = model.predict_proba(&x).unwrap();
        for row in proba.rows() {
            assert_abs_diff_eq!(row.sum(), 1.0, epsilon = 1e-9);
        }
        assert_eq!(model.predict(&x).unwrap().class_indices(), vec![0, 0, 1, 1, 2, 2]);
    }

    #[test]
    fn test_targets_outside_unit_interval() {
        let model = LogisticRegression::from_theta(LogisticModel::default(), array![[3.0], [0.0]])
            .unwrap();
        let x = array![[0.0], [1.0]];
        assert!(matches!(
            model.cost(&x, &array![[1.0], [2.0]]),
            Err(RegressionError::UnknownLabel(v)) if v == 2.0
        ));
        assert!(model.gradient(&x, &array![[-1.0], [1.0]]).is_err());

        let mut model = LogisticRegression::logistic(LinkFunction::Sigmoid);
        model.initialize(1, 1, InitStrategy::Zeros).unwrap();
        assert!(model.fit(&x, &array![[1.0], [2.0]], DescentConfig::default()).is_err());
        assert!(model.trace().is_empty());
        assert!(model.cost(&x, &array![[0.0], [1.0]]).unwrap() > 0.0);
    }

    #[test]
    fn test_threshold() {
        let theta = array![[0.0], [1.0]];
        let mut model = LogisticRegression::from_theta(LogisticModel::default(), theta).unwrap();
        let x = array![[0.5], [-0.5]];
        assert_eq!(model.predict(&x).unwrap().class_indices(), vec![1, 0]);

        model.set_classification_threshold(0.7).unwrap();
        assert_eq!(model.predict(&x).unwrap().class_indices(), vec![0, 0]);

        assert!(matches!(
            model.set_classification_threshold(1.2),
            Err(RegressionError::InvalidThreshold(_))
        ));
        assert!(model.set_classification_threshold(-0.1).is_err());
        assert_eq!(model.family().threshold(), 0.7);
    }

    #[test]
    fn test_cross_entropy_is_clamped() {
        let family = LogisticModel::default();
        let h = array![[1.0], [0.0]];
        let y = array![[0.0], [1.0]];
        let cost = family.data_cost(&h, y.view());
        assert!(cost.is_finite());
        assert!(cost > 30.0);
    }

    #[test]
    fn test_zero_theta_cost_is_log_two() {
        let (x, y) = separable();
        let mut model = LogisticRegression::logistic(LinkFunction::Sigmoid);
        model.initialize(2, 1, InitStrategy::Zeros).unwrap();
        assert_abs_diff_eq!(model.cost(&x, &y).unwrap(), 2f64.ln(), epsilon = 1e-12);
    }
}
