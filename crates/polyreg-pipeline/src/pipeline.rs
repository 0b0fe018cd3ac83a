use polyreg_core::{Matrix, RegressionError, RegressionResult};

/// Unsupervised feature map: learns its state from a training matrix.
///
/// After `fit`, `transform` must replay exactly the same mapping on any
/// later input, so statistics learned on training rows are never refitted
/// on test rows.
pub trait Transformer {
    fn fit(&mut self, x: &Matrix) -> RegressionResult<()>;
    fn transform(&self, x: &Matrix) -> RegressionResult<Matrix>;
    fn fit_transform(&mut self, x: &Matrix) -> RegressionResult<Matrix> {
        self.fit(x)?;
        self.transform(x)
    }
}

/// Supervised model fitted on instance-major targets `(m, outputs)`.
///
/// `predict` returns one row per instance: raw responses for regressors,
/// 0/1 decisions for classifiers.
pub trait Estimator {
    fn fit(&mut self, x: &Matrix, y: &Matrix) -> RegressionResult<()>;
    fn predict(&self, x: &Matrix) -> RegressionResult<Matrix>;
}

struct Step {
    name: String,
    transformer: Box<dyn Transformer>,
}

/// Named transformer steps feeding an optional final estimator.
#[derive(Default)]
pub struct Pipeline {
    steps: Vec<Step>,
    estimator: Option<Box<dyn Estimator>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a transformer step.
    pub fn with_step(mut self, name: impl Into<String>, transformer: Box<dyn Transformer>) -> Self {
        self.steps.push(Step {
            name: name.into(),
            transformer,
        });
        self
    }

    pub fn with_estimator(mut self, estimator: Box<dyn Estimator>) -> Self {
        self.estimator = Some(estimator);
        self
    }

    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name.as_str()).collect()
    }

    /// Fit each step on the output of the one before it, then the estimator.
    pub fn fit(&mut self, x: &Matrix, y: &Matrix) -> RegressionResult<()> {
        let features = self.fit_steps(x)?;
        let estimator = self
            .estimator
            .as_mut()
            .ok_or(RegressionError::NotFitted("pipeline estimator"))?;
        estimator.fit(&features, y)
    }

    /// Fit the transformer steps only and return the training features they produce.
    pub fn fit_steps(&mut self, x: &Matrix) -> RegressionResult<Matrix> {
        self.steps
            .iter_mut()
            .try_fold(x.clone(), |current, step| step.transformer.fit_transform(&current))
    }

    /// Replay the fitted steps on a new matrix.
    pub fn transform(&self, x: &Matrix) -> RegressionResult<Matrix> {
        self.steps
            .iter()
            .try_fold(x.clone(), |current, step| step.transformer.transform(&current))
    }

    pub fn predict(&self, x: &Matrix) -> RegressionResult<Matrix> {
        let estimator = self
            .estimator
            .as_ref()
            .ok_or(RegressionError::NotFitted("pipeline estimator"))?;
        estimator.predict(&self.transform(x)?)
    }
}
