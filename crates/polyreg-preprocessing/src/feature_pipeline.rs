use crate::polynomial::PolynomialFeatures;
use crate::scaler::{FeatureStatistics, StandardScaler};
use log::debug;
use polyreg_core::{Matrix, PipelineOrder, RegressionResult};
use polyreg_pipeline::Transformer;
use serde::{Deserialize, Serialize};

/// Polynomial expansion and z-score normalization in a configurable order.
///
/// The scaler is always fitted on the matrix that feeds the model, so with
/// [`PipelineOrder::ExpandThenNormalize`] the statistics describe expanded
/// columns and with [`PipelineOrder::NormalizeThenExpand`] they describe the
/// raw ones.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeaturePipeline {
    order: PipelineOrder,
    poly: PolynomialFeatures,
    scaler: StandardScaler,
}

impl FeaturePipeline {
    pub fn new(degree: u32, order: PipelineOrder) -> RegressionResult<Self> {
        Ok(FeaturePipeline {
            order,
            poly: PolynomialFeatures::new(degree)?,
            scaler: StandardScaler::new(),
        })
    }

    pub fn degree(&self) -> u32 {
        self.poly.degree()
    }

    pub fn order(&self) -> PipelineOrder {
        self.order
    }

    /// Statistics of whichever matrix the scaler was fitted on.
    pub fn statistics(&self) -> Option<&FeatureStatistics> {
        self.scaler.statistics()
    }

    /// Width of the model-facing matrix, once fitted.
    pub fn n_output_features(&self) -> Option<usize> {
        self.poly.n_output_features()
    }
}

impl Transformer for FeaturePipeline {
    fn fit(&mut self, x: &Matrix) -> RegressionResult<()> {
        self.fit_transform(x).map(|_| ())
    }

    fn transform(&self, x: &Matrix) -> RegressionResult<Matrix> {
        match self.order {
            PipelineOrder::ExpandThenNormalize => self.scaler.normalize(&self.poly.transform(x)?),
            PipelineOrder::NormalizeThenExpand => self.poly.transform(&self.scaler.normalize(x)?),
        }
    }

    fn fit_transform(&mut self, x: &Matrix) -> RegressionResult<Matrix> {
        let out = match self.order {
            PipelineOrder::ExpandThenNormalize => {
                let expanded = self.poly.fit_transform(x)?;
                self.scaler.fit_transform(&expanded)?
            }
            PipelineOrder::NormalizeThenExpand => {
                let normalized = self.scaler.fit_transform(x)?;
                self.poly.fit_transform(&normalized)?
            }
        };
        debug!(
            "Feature pipeline fitted: {} -> {} columns ({:?}, degree {})",
            x.ncols(),
            out.ncols(),
            self.order,
            self.degree()
        );
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::polynomial::map_features;
    use polyreg_core::Vector;
    use approx::assert_abs_diff_eq;
    use ndarray::{array, Axis};

    fn sample() -> Matrix {
        array![[1.0, 2.0], [2.0, -1.0], [3.0, 0.5], [4.0, 1.5]]
    }

    #[test]
    fn test_expand_then_normalize() {
        let x = sample();
        let mut pipeline = FeaturePipeline::new(2, PipelineOrder::ExpandThenNormalize).unwrap();
        let out = pipeline.fit_transform(&x).unwrap();

        assert_eq!(out.ncols(), 5);
        assert_eq!(pipeline.statistics().unwrap().n_features(), 5);
        let mean = out.mean_axis(Axis(0)).unwrap();
        assert_abs_diff_eq!(mean, Vector::zeros(5), epsilon = 1e-10);
    }

    #[test]
    fn test_normalize_then_expand() {
        let x = sample();
        let mut pipeline = FeaturePipeline::new(2, PipelineOrder::NormalizeThenExpand).unwrap();
        let out = pipeline.fit_transform(&x).unwrap();

        assert_eq!(out.ncols(), 5);
        assert_eq!(pipeline.statistics().unwrap().n_features(), 2);
        // the linear terms are the normalized raw columns
        let mut scaler = StandardScaler::new();
        let normalized = scaler.fit_transform(&x).unwrap();
        assert_abs_diff_eq!(out, map_features(&normalized, 2).unwrap(), epsilon = 1e-12);
    }

    #[test]
    fn test_transform_replays_training_state() {
        let x = sample();
        for order in [PipelineOrder::ExpandThenNormalize, PipelineOrder::NormalizeThenExpand] {
            let mut pipeline = FeaturePipeline::new(3, order).unwrap();
            let fitted = pipeline.fit_transform(&x).unwrap();
            let replayed = pipeline.transform(&x).unwrap();
            assert_abs_diff_eq!(fitted, replayed, epsilon = 1e-12);

            let single = pipeline.transform(&array![[2.0, -1.0]]).unwrap();
            assert_abs_diff_eq!(single.row(0), fitted.row(1), epsilon = 1e-12);
        }
    }

    #[test]
    fn test_unfitted_pipeline() {
        let pipeline = FeaturePipeline::new(2, PipelineOrder::default()).unwrap();
        assert!(pipeline.transform(&sample()).is_err());
        assert!(FeaturePipeline::new(0, PipelineOrder::default()).is_err());
    }
}
