use crate::model::{ModelFamily, RegressionModel};
use ndarray::ArrayView2;
use polyreg_core::{Matrix, RegressionResult};
use serde::{Deserialize, Serialize};

/// Least-squares regression: `h(x) = Θᵗ·[1; x]`.
///
/// The data term of the cost is `(1/2m) ‖XΘ − Y‖²`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinearModel;

impl ModelFamily for LinearModel {
    type Output = Matrix;

    fn name(&self) -> &'static str {
        "linear"
    }

    fn hypothesis(&self, scores: Matrix, _n_instances: usize) -> RegressionResult<Matrix> {
        Ok(scores)
    }

    fn data_cost(&self, h: &Matrix, y: ArrayView2<'_, f64>) -> f64 {
        let m = h.nrows() as f64;
        let residual = h - &y;
        residual.mapv(|r| r * r).sum() / (2.0 * m)
    }

    fn decide(&self, h: Matrix, _n_instances: usize) -> RegressionResult<Matrix> {
        Ok(h)
    }
}

/// Linear regression by batch gradient descent.
pub type LinearRegression = RegressionModel<LinearModel>;

impl RegressionModel<LinearModel> {
    pub fn linear() -> Self {
        RegressionModel::new(LinearModel)
    }
}
