use crate::text::read_text_file;
use log::{debug, info};
use ndarray::{concatenate, Axis};
use polyreg_core::{
    as_column, validate_split, Matrix, PipelineOrder, RegressionError, RegressionResult,
    TrainingConfig,
};
use polyreg_pipeline::Transformer;
use polyreg_preprocessing::{
    shuffled_indices, train_size, FeaturePipeline, FeatureStatistics, LabelEncoder,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// How a data set is shuffled and divided.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SplitOptions {
    pub train_percent: f64,
    pub test_percent: f64,
    pub seed: Option<u64>,
}

impl Default for SplitOptions {
    fn default() -> Self {
        SplitOptions {
            train_percent: 70.0,
            test_percent: 30.0,
            seed: None,
        }
    }
}

impl From<&TrainingConfig> for SplitOptions {
    fn from(config: &TrainingConfig) -> Self {
        SplitOptions {
            train_percent: config.train_percent,
            test_percent: config.test_percent,
            seed: config.seed,
        }
    }
}

/// Features and targets with a fixed train/test partition.
///
/// Targets hold one row per instance: a single column of raw values or
/// labels, or an already one-hot encoded matrix. Feature statistics are
/// only ever fitted on the training rows.
#[derive(Debug, Clone)]
pub struct Dataset {
    x: Matrix,
    y: Matrix,
    train: Vec<usize>,
    test: Vec<usize>,
    pipeline: Option<FeaturePipeline>,
}

impl Dataset {
    /// Shuffle the rows of `x` and `y` and split them.
    pub fn split(x: Matrix, y: Matrix, options: SplitOptions) -> RegressionResult<Self> {
        validate_split(options.train_percent, options.test_percent)?;
        check_pair(&x, &y)?;

        let m = x.nrows();
        let mut indices = shuffled_indices(m, options.seed);
        let test = indices.split_off(train_size(m, options.train_percent));
        if indices.is_empty() {
            return Err(RegressionError::EmptyInput("training split is empty"));
        }
        debug!("Split {} instances into {} train / {} test", m, indices.len(), test.len());

        Ok(Dataset {
            x,
            y,
            train: indices,
            test,
            pipeline: None,
        })
    }

    /// A data set whose partition is already given.
    pub fn from_parts(
        x_train: Matrix,
        y_train: Matrix,
        x_test: Matrix,
        y_test: Matrix,
    ) -> RegressionResult<Self> {
        check_pair(&x_train, &y_train)?;
        if x_test.nrows() != y_test.nrows() {
            return Err(RegressionError::ShapeMismatch {
                context: "test targets",
                expected: vec![x_test.nrows(), y_test.ncols()],
                got: y_test.shape().to_vec(),
            });
        }
        let shape_err = |context, a: &Matrix, b: &Matrix| RegressionError::ShapeMismatch {
            context,
            expected: vec![b.nrows(), a.ncols()],
            got: b.shape().to_vec(),
        };
        let n_train = x_train.nrows();
        let n_test = x_test.nrows();
        let x = concatenate(Axis(0), &[x_train.view(), x_test.view()])
            .map_err(|_| shape_err("test features", &x_train, &x_test))?;
        let y = concatenate(Axis(0), &[y_train.view(), y_test.view()])
            .map_err(|_| shape_err("test targets", &y_train, &y_test))?;

        Ok(Dataset {
            x,
            y,
            train: (0..n_train).collect(),
            test: (n_train..n_train + n_test).collect(),
            pipeline: None,
        })
    }

    /// Read a whitespace-delimited file and split it.
    pub fn from_text_file(path: impl AsRef<Path>, options: SplitOptions) -> RegressionResult<Self> {
        let path = path.as_ref();
        let (x, y) = read_text_file(path)?;
        info!("Loaded {} instances with {} features from {}", x.nrows(), x.ncols(), path.display());
        Self::split(x, as_column(&y), options)
    }

    pub fn n_instances(&self) -> usize {
        self.x.nrows()
    }

    /// Width of the raw feature matrix.
    pub fn n_features(&self) -> usize {
        self.x.ncols()
    }

    pub fn n_train(&self) -> usize {
        self.train.len()
    }

    pub fn n_test(&self) -> usize {
        self.test.len()
    }

    /// Raw features of every instance, in load order.
    pub fn features(&self) -> &Matrix {
        &self.x
    }

    pub fn targets(&self) -> &Matrix {
        &self.y
    }

    pub fn x_train(&self) -> Matrix {
        self.x.select(Axis(0), &self.train)
    }

    pub fn x_test(&self) -> Matrix {
        self.x.select(Axis(0), &self.test)
    }

    pub fn y_train(&self) -> Matrix {
        self.y.select(Axis(0), &self.train)
    }

    pub fn y_test(&self) -> Matrix {
        self.y.select(Axis(0), &self.test)
    }

    /// Fit the feature pipeline on the training rows.
    pub fn prepare(&mut self, degree: u32, order: PipelineOrder) -> RegressionResult<()> {
        let mut pipeline = FeaturePipeline::new(degree, order)?;
        pipeline.fit(&self.x_train())?;
        self.pipeline = Some(pipeline);
        Ok(())
    }

    pub fn pipeline(&self) -> Option<&FeaturePipeline> {
        self.pipeline.as_ref()
    }

    /// Normalization statistics of the fitted pipeline.
    pub fn statistics(&self) -> Option<&FeatureStatistics> {
        self.pipeline.as_ref().and_then(FeaturePipeline::statistics)
    }

    /// Replay the fitted feature pipeline on any raw matrix.
    pub fn map_features(&self, x: &Matrix) -> RegressionResult<Matrix> {
        self.pipeline
            .as_ref()
            .ok_or(RegressionError::NotFitted("dataset feature pipeline"))?
            .transform(x)
    }

    /// Model-facing training features.
    pub fn train_features(&self) -> RegressionResult<Matrix> {
        self.map_features(&self.x_train())
    }

    /// Model-facing test features.
    pub fn test_features(&self) -> RegressionResult<Matrix> {
        if self.test.is_empty() {
            return Err(RegressionError::EmptyInput("test split is empty"));
        }
        self.map_features(&self.x_test())
    }

    /// Distinct labels of a single-column target, sorted ascending.
    pub fn classes(&self) -> Vec<f64> {
        self.label_encoder().classes().to_vec()
    }

    fn label_encoder(&self) -> LabelEncoder {
        let mut encoder = LabelEncoder::new();
        encoder.fit(&self.y.column(0).to_vec());
        encoder
    }

    fn one_hot(&self, rows: &[usize]) -> RegressionResult<Matrix> {
        if self.y.ncols() > 1 {
            return Ok(self.y.select(Axis(0), rows));
        }
        let labels: Vec<f64> = rows.iter().map(|&i| self.y[[i, 0]]).collect();
        self.label_encoder().one_hot(&labels)
    }

    /// One-hot training targets over the classes of the whole data set.
    pub fn y_train_one_hot(&self) -> RegressionResult<Matrix> {
        self.one_hot(&self.train)
    }

    pub fn y_test_one_hot(&self) -> RegressionResult<Matrix> {
        self.one_hot(&self.test)
    }

    /// Label column as 0/1 targets for a single sigmoid output.
    ///
    /// Labels already in {0, 1} pass through. Any other pair of labels maps
    /// the smaller one to 0 and the larger to 1. More than two classes, or a
    /// target with several columns, is rejected.
    fn binary(&self, rows: &[usize]) -> RegressionResult<Matrix> {
        let encoder = self.label_encoder();
        if self.y.ncols() != 1 || encoder.n_classes() > 2 {
            return Err(RegressionError::InvalidParameter {
                name: "classes",
                value: encoder.n_classes().max(self.y.ncols()) as f64,
                reason: "binary targets need a single column with at most two labels",
            });
        }
        if encoder.classes().iter().all(|&c| c == 0.0 || c == 1.0) {
            return Ok(self.y.select(Axis(0), rows));
        }
        let labels: Vec<f64> = rows.iter().map(|&i| self.y[[i, 0]]).collect();
        let indices = encoder.transform(&labels)?;
        Ok(Matrix::from_shape_fn((indices.len(), 1), |(i, _)| indices[i] as f64))
    }

    pub fn y_train_binary(&self) -> RegressionResult<Matrix> {
        self.binary(&self.train)
    }

    pub fn y_test_binary(&self) -> RegressionResult<Matrix> {
        self.binary(&self.test)
    }
}

fn check_pair(x: &Matrix, y: &Matrix) -> RegressionResult<()> {
    if x.nrows() == 0 || x.ncols() == 0 {
        return Err(RegressionError::EmptyInput("data set has no features"));
    }
    if y.nrows() != x.nrows() || y.ncols() == 0 {
        return Err(RegressionError::ShapeMismatch {
            context: "targets",
            expected: vec![x.nrows(), y.ncols().max(1)],
            got: y.shape().to_vec(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array1};

    fn ten_rows() -> (Matrix, Matrix) {
        let x = Matrix::from_shape_fn((10, 2), |(i, j)| (i * 2 + j) as f64);
        let y = as_column(&Array1::from_iter((0..10).map(|i| (i % 3) as f64)));
        (x, y)
    }

    fn seeded() -> SplitOptions {
        SplitOptions {
            seed: Some(5),
            ..SplitOptions::default()
        }
    }

    #[test]
    fn test_split_sizes_and_pairing() {
        let (x, y) = ten_rows();
        let data = Dataset::split(x, y, seeded()).unwrap();
        assert_eq!(data.n_train(), 7);
        assert_eq!(data.n_test(), 3);

        let xt = data.x_train();
        let yt = data.y_train();
        for (row, target) in xt.rows().into_iter().zip(yt.rows()) {
            let original = (row[0] / 2.0) as usize;
            assert_eq!(target[0], (original % 3) as f64);
        }
    }

    #[test]
    fn test_statistics_come_from_training_rows() {
        let (x, y) = ten_rows();
        let mut data = Dataset::split(x, y, seeded()).unwrap();
        assert!(data.statistics().is_none());
        assert!(data.train_features().is_err());

        data.prepare(1, PipelineOrder::ExpandThenNormalize).unwrap();
        let mean = data.statistics().unwrap().mean.clone();
        let expected = data.x_train().mean_axis(Axis(0)).unwrap();
        assert_eq!(mean, expected);

        let train = data.train_features().unwrap();
        assert_eq!(train.dim(), (7, 2));
        assert_eq!(data.test_features().unwrap().dim(), (3, 2));
        assert_eq!(data.map_features(&array![[1.0, 2.0]]).unwrap().ncols(), 2);
    }

    #[test]
    fn test_one_hot_targets() {
        let (x, y) = ten_rows();
        let data = Dataset::split(x, y, seeded()).unwrap();
        assert_eq!(data.classes(), vec![0.0, 1.0, 2.0]);

        let oh = data.y_train_one_hot().unwrap();
        assert_eq!(oh.dim(), (7, 3));
        for (row, label) in oh.rows().into_iter().zip(data.y_train().column(0)) {
            assert_eq!(row.sum(), 1.0);
            assert_eq!(row[*label as usize], 1.0);
        }
    }

    #[test]
    fn test_binary_targets() {
        let x = Matrix::from_shape_fn((6, 1), |(i, _)| i as f64);
        let y = array![[-1.0], [1.0], [-1.0], [1.0], [1.0], [-1.0]];
        let data = Dataset::from_parts(x.clone(), y, array![[9.0]], array![[1.0]]).unwrap();
        assert_eq!(
            data.y_train_binary().unwrap(),
            array![[0.0], [1.0], [0.0], [1.0], [1.0], [0.0]]
        );
        assert_eq!(data.y_test_binary().unwrap(), array![[1.0]]);

        // a lone class of 1s stays positive
        let ones = Matrix::ones((6, 1));
        let data = Dataset::from_parts(x.clone(), ones.clone(), array![[9.0]], array![[1.0]]).unwrap();
        assert_eq!(data.y_train_binary().unwrap(), ones);

        let (x, y) = ten_rows();
        let data = Dataset::split(x, y, seeded()).unwrap();
        assert!(matches!(
            data.y_train_binary(),
            Err(RegressionError::InvalidParameter { name: "classes", .. })
        ));
    }

    #[test]
    fn test_from_parts() {
        let data = Dataset::from_parts(
            array![[1.0], [2.0]],
            array![[0.0], [1.0]],
            array![[3.0]],
            array![[1.0]],
        )
        .unwrap();
        assert_eq!(data.x_test(), array![[3.0]]);
        assert_eq!(data.n_instances(), 3);

        assert!(Dataset::from_parts(
            array![[1.0], [2.0]],
            array![[0.0], [1.0]],
            array![[3.0, 4.0]],
            array![[1.0]],
        )
        .is_err());
    }

    #[test]
    fn test_invalid_inputs() {
        let (x, _) = ten_rows();
        assert!(Dataset::split(x.clone(), Matrix::zeros((3, 1)), seeded()).is_err());
        let bad = SplitOptions {
            train_percent: 80.0,
            ..seeded()
        };
        assert!(Dataset::split(x, Matrix::zeros((10, 1)), bad).is_err());
        assert!(matches!(
            Dataset::split(array![[1.0]], array![[1.0]], seeded()),
            Err(RegressionError::EmptyInput(_))
        ));
    }
}
