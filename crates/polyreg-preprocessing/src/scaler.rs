use ndarray::Axis;
use polyreg_core::{Matrix, RegressionError, RegressionResult, Vector};
use polyreg_pipeline::Transformer;
use serde::{Deserialize, Serialize};

/// Per-column statistics of a training matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureStatistics {
    pub mean: Vector,
    /// Sample standard deviation (n - 1), or population when there is one row.
    pub std: Vector,
    pub min: Vector,
    pub max: Vector,
}

impl FeatureStatistics {
    /// Compute mean, std, min and max of every column of `x`.
    pub fn fit(x: &Matrix) -> RegressionResult<Self> {
        if x.nrows() == 0 || x.ncols() == 0 {
            return Err(RegressionError::EmptyInput("cannot compute statistics of an empty matrix"));
        }
        let ddof = if x.nrows() > 1 { 1.0 } else { 0.0 };
        let mean = x
            .mean_axis(Axis(0))
            .ok_or(RegressionError::EmptyInput("cannot compute statistics of an empty matrix"))?;
        Ok(FeatureStatistics {
            mean,
            std: x.std_axis(Axis(0), ddof),
            min: x.fold_axis(Axis(0), f64::INFINITY, |&a, &b| a.min(b)),
            max: x.fold_axis(Axis(0), f64::NEG_INFINITY, |&a, &b| a.max(b)),
        })
    }

    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    /// Std with near-zero entries replaced by 1, so constant columns pass through centered.
    pub fn safe_std(&self) -> Vector {
        self.std.mapv(|s| if s.abs() < f64::EPSILON { 1.0 } else { s })
    }
}

/// Standardize features by removing the mean and scaling to unit variance.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StandardScaler {
    stats: Option<FeatureStatistics>,
}

impl StandardScaler {
    pub fn new() -> Self {
        StandardScaler { stats: None }
    }

    /// Scaler that reuses statistics computed elsewhere.
    pub fn from_statistics(stats: FeatureStatistics) -> Self {
        StandardScaler { stats: Some(stats) }
    }

    pub fn statistics(&self) -> Option<&FeatureStatistics> {
        self.stats.as_ref()
    }

    fn fitted(&self) -> RegressionResult<&FeatureStatistics> {
        self.stats.as_ref().ok_or(RegressionError::NotFitted("StandardScaler"))
    }

    fn check_width(stats: &FeatureStatistics, got: usize) -> RegressionResult<()> {
        if got == 0 {
            return Err(RegressionError::EmptyInput("nothing to normalize"));
        }
        if got != stats.n_features() {
            return Err(RegressionError::DimensionMismatch {
                expected: stats.n_features(),
                got,
            });
        }
        Ok(())
    }

    /// `(x - mean) / std`, column-wise.
    pub fn normalize(&self, x: &Matrix) -> RegressionResult<Matrix> {
        let stats = self.fitted()?;
        Self::check_width(stats, x.ncols())?;
        if x.nrows() == 0 {
            return Err(RegressionError::EmptyInput("nothing to normalize"));
        }
        Ok((x - &stats.mean) / &stats.safe_std())
    }

    /// Normalize a single instance.
    pub fn normalize_vector(&self, v: &Vector) -> RegressionResult<Vector> {
        let stats = self.fitted()?;
        Self::check_width(stats, v.len())?;
        Ok((v - &stats.mean) / &stats.safe_std())
    }

    /// `x * std + mean`, the inverse of [`normalize`](Self::normalize).
    pub fn denormalize(&self, x: &Matrix) -> RegressionResult<Matrix> {
        let stats = self.fitted()?;
        Self::check_width(stats, x.ncols())?;
        Ok(x * &stats.safe_std() + &stats.mean)
    }

    pub fn denormalize_vector(&self, v: &Vector) -> RegressionResult<Vector> {
        let stats = self.fitted()?;
        Self::check_width(stats, v.len())?;
        Ok(v * &stats.safe_std() + &stats.mean)
    }
}

impl Transformer for StandardScaler {
    fn fit(&mut self, x: &Matrix) -> RegressionResult<()> {
        self.stats = Some(FeatureStatistics::fit(x)?);
        Ok(())
    }

    fn transform(&self, x: &Matrix) -> RegressionResult<Matrix> {
        self.normalize(x)
    }
}

/// Scale every entry by one global range, as done for raw image pixels.
///
/// Maps `x` to `(x - (max - min) / 2) / max` using the min and max over the
/// whole fitted matrix.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlobalRangeScaler {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl GlobalRangeScaler {
    pub fn new() -> Self {
        GlobalRangeScaler { min: None, max: None }
    }
}

impl Transformer for GlobalRangeScaler {
    fn fit(&mut self, x: &Matrix) -> RegressionResult<()> {
        if x.is_empty() {
            return Err(RegressionError::EmptyInput("cannot compute the range of an empty matrix"));
        }
        self.min = Some(x.fold(f64::INFINITY, |a, &b| a.min(b)));
        self.max = Some(x.fold(f64::NEG_INFINITY, |a, &b| a.max(b)));
        Ok(())
    }

    fn transform(&self, x: &Matrix) -> RegressionResult<Matrix> {
        let (min, max) = match (self.min, self.max) {
            (Some(min), Some(max)) => (min, max),
            _ => return Err(RegressionError::NotFitted("GlobalRangeScaler")),
        };
        let center = (max - min) / 2.0;
        let scale = if max.abs() < f64::EPSILON { 1.0 } else { max };
        Ok(x.mapv(|v| (v - center) / scale))
    }
}
