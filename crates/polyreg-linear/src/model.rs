use crate::trace::{FitReport, NullSink, TracePoint, TraceSink};
use log::{debug, info, trace, warn};
use ndarray::{s, ArrayView2, CowArray, Ix2};
use polyreg_core::{
    orient_targets, validate_l2_penalty, validate_learning_rate, with_bias, DescentConfig,
    InitStrategy, Matrix, RegressionError, RegressionResult,
};
use polyreg_pipeline::Estimator;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// The part of a regression model that differs between linear and logistic.
///
/// The descent loop in [`RegressionModel`] only needs the hypothesis, the
/// unregularized data cost and a way to turn hypotheses into predictions.
/// Every family shares the gradient `Xᵗ(h − Y) + λΘ'`.
pub trait ModelFamily {
    type Output: Into<Matrix>;

    fn name(&self) -> &'static str;

    /// `h` given the raw scores `XΘ` of `n_instances` rows.
    fn hypothesis(&self, scores: Matrix, n_instances: usize) -> RegressionResult<Matrix>;

    /// Data term of the cost, without the L2 penalty.
    fn data_cost(&self, h: &Matrix, y: ArrayView2<'_, f64>) -> f64;

    /// Turn a hypothesis matrix into the family's predictions.
    fn decide(&self, h: Matrix, n_instances: usize) -> RegressionResult<Self::Output>;

    /// Reject targets the cost is not defined for.
    fn check_targets(&self, _y: ArrayView2<'_, f64>) -> RegressionResult<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelState {
    Uninitialized,
    Initialized,
    Trained,
}

/// Parameter matrix Θ of shape (F+1, C) plus the batch gradient-descent loop.
///
/// Row 0 of Θ is the bias row and is never penalized.
#[derive(Debug, Clone)]
pub struct RegressionModel<F: ModelFamily> {
    family: F,
    theta: Option<Matrix>,
    state: ModelState,
    config: DescentConfig,
    init: InitStrategy,
    trace: Vec<TracePoint>,
    last_fit: Option<FitReport>,
}

impl<F: ModelFamily> RegressionModel<F> {
    pub fn new(family: F) -> Self {
        RegressionModel {
            family,
            theta: None,
            state: ModelState::Uninitialized,
            config: DescentConfig::default(),
            init: InitStrategy::default(),
            trace: Vec::new(),
            last_fit: None,
        }
    }

    /// Restore a model from a previously fitted Θ.
    pub fn from_theta(family: F, theta: Matrix) -> RegressionResult<Self> {
        if theta.nrows() < 2 || theta.ncols() == 0 {
            return Err(RegressionError::EmptyModel {
                features: theta.nrows().saturating_sub(1),
                outputs: theta.ncols(),
            });
        }
        let mut model = Self::new(family);
        model.theta = Some(theta);
        model.state = ModelState::Trained;
        Ok(model)
    }

    /// Allocate Θ for `feature_count` features and `output_count` outputs.
    ///
    /// Resets the trace; any previous Θ is discarded.
    pub fn initialize(
        &mut self,
        feature_count: usize,
        output_count: usize,
        init: InitStrategy,
    ) -> RegressionResult<()> {
        if feature_count == 0 || output_count == 0 {
            return Err(RegressionError::EmptyModel {
                features: feature_count,
                outputs: output_count,
            });
        }
        let shape = (feature_count + 1, output_count);
        let theta = match init {
            InitStrategy::Zeros => Matrix::zeros(shape),
            InitStrategy::UniformRandom { seed } => {
                let mut rng = match seed {
                    Some(s) => StdRng::seed_from_u64(s),
                    None => StdRng::from_entropy(),
                };
                Matrix::from_shape_fn(shape, |_| rng.gen::<f64>())
            }
        };
        debug!("Initialized {} model with theta {:?} ({:?})", self.family.name(), shape, init);

        self.theta = Some(theta);
        self.init = init;
        self.state = ModelState::Initialized;
        self.trace.clear();
        self.last_fit = None;
        Ok(())
    }

    /// Data cost plus `(λ / 2m) Σ Θ_j²` over every row but the bias row.
    pub fn cost(&self, x: &Matrix, y: &Matrix) -> RegressionResult<f64> {
        let theta = self.theta()?;
        let xb = design(x, theta)?;
        let y = orient_targets(y, xb.nrows(), theta.ncols())?;
        self.family.check_targets(y)?;
        cost_of(&self.family, theta, xb.view(), y, self.config.l2_penalty)
    }

    /// `Xᵗ(h(XΘ) − Y) + λΘ'`, where Θ' is Θ with the bias row zeroed. Not scaled by 1/m.
    pub fn gradient(&self, x: &Matrix, y: &Matrix) -> RegressionResult<Matrix> {
        let theta = self.theta()?;
        let xb = design(x, theta)?;
        let y = orient_targets(y, xb.nrows(), theta.ncols())?;
        self.family.check_targets(y)?;
        gradient_of(&self.family, theta, xb.view(), y, self.config.l2_penalty)
    }

    /// Run batch gradient descent from the current Θ. Returns the final cost.
    pub fn fit(&mut self, x: &Matrix, y: &Matrix, config: DescentConfig) -> RegressionResult<f64> {
        self.fit_with_sink(x, y, config, &mut NullSink)
    }

    /// Like [`fit`](Self::fit), also sending every trace point to `sink`.
    ///
    /// Stops once `|J_prev − J| <= convergence_delta`, or after
    /// `max_iterations` steps when that is non-zero.
    pub fn fit_with_sink(
        &mut self,
        x: &Matrix,
        y: &Matrix,
        config: DescentConfig,
        sink: &mut dyn TraceSink,
    ) -> RegressionResult<f64> {
        config.validate()?;
        let theta = self.theta.as_mut().ok_or(RegressionError::ModelNotInitialized)?;
        let xb = design(x, theta)?;
        let m = xb.nrows();
        let y = orient_targets(y, m, theta.ncols())?;
        self.family.check_targets(y)?;

        self.config = config;
        self.trace.clear();
        let l2 = config.l2_penalty;
        let step = config.learning_rate / m as f64;

        info!(
            "Training {} model: {} instances, {} features, {} outputs",
            self.family.name(),
            m,
            theta.nrows() - 1,
            theta.ncols()
        );

        let mut cost = cost_of(&self.family, theta, xb.view(), y, l2)?;
        let start = TracePoint { iteration: 0, cost };
        self.trace.push(start);
        sink.record(start)?;

        let mut iterations = 0;
        let mut delta;
        let mut converged = false;
        let mut reported_non_finite = false;
        loop {
            let grad = gradient_of(&self.family, theta, xb.view(), y, l2)?;
            theta.scaled_add(-step, &grad);
            iterations += 1;

            let next = cost_of(&self.family, theta, xb.view(), y, l2)?;
            delta = (cost - next).abs();
            cost = next;

            let point = TracePoint { iteration: iterations, cost };
            self.trace.push(point);
            sink.record(point)?;
            trace!("Iteration {}: J(Theta) = {}, Delta_J = {}", iterations, cost, delta);

            if !cost.is_finite() && !reported_non_finite {
                warn!(
                    "Cost is no longer finite at iteration {}, the learning rate {} may be too large",
                    iterations, config.learning_rate
                );
                reported_non_finite = true;
            }
            if delta <= config.convergence_delta {
                converged = true;
                break;
            }
            if config.max_iterations > 0 && iterations >= config.max_iterations {
                warn!(
                    "Stopped after {} iterations without converging (Delta_J = {:e})",
                    iterations, delta
                );
                break;
            }
        }

        self.state = ModelState::Trained;
        self.last_fit = Some(FitReport {
            iterations,
            final_cost: cost,
            last_delta: delta,
            converged,
        });
        info!(
            "Training finished after {} iterations: Delta_J = {:e}, J(Theta) = {}",
            iterations, delta, cost
        );
        Ok(cost)
    }

    /// Family-specific predictions for every row of `x`.
    pub fn predict(&self, x: &Matrix) -> RegressionResult<F::Output> {
        let h = self.hypothesis(x)?;
        let m = h.nrows();
        self.family.decide(h, m)
    }

    pub(crate) fn hypothesis(&self, x: &Matrix) -> RegressionResult<Matrix> {
        let theta = self.theta()?;
        let xb = design(x, theta)?;
        self.family.hypothesis(xb.dot(theta), xb.nrows())
    }

    pub fn theta(&self) -> RegressionResult<&Matrix> {
        self.theta.as_ref().ok_or(RegressionError::ModelNotInitialized)
    }

    pub fn state(&self) -> ModelState {
        self.state
    }

    pub fn family(&self) -> &F {
        &self.family
    }

    pub fn family_mut(&mut self) -> &mut F {
        &mut self.family
    }

    /// `(iteration, cost)` pairs of the last fit.
    pub fn trace(&self) -> &[TracePoint] {
        &self.trace
    }

    pub fn last_fit(&self) -> Option<&FitReport> {
        self.last_fit.as_ref()
    }

    pub fn config(&self) -> &DescentConfig {
        &self.config
    }

    /// Replace the configuration used by [`Estimator::fit`].
    pub fn set_config(&mut self, config: DescentConfig) -> RegressionResult<()> {
        config.validate()?;
        self.config = config;
        Ok(())
    }

    pub fn learning_rate(&self) -> f64 {
        self.config.learning_rate
    }

    pub fn set_learning_rate(&mut self, learning_rate: f64) -> RegressionResult<()> {
        validate_learning_rate(learning_rate)?;
        self.config.learning_rate = learning_rate;
        Ok(())
    }

    pub fn l2_penalty(&self) -> f64 {
        self.config.l2_penalty
    }

    pub fn set_l2_penalty(&mut self, l2_penalty: f64) -> RegressionResult<()> {
        validate_l2_penalty(l2_penalty)?;
        self.config.l2_penalty = l2_penalty;
        Ok(())
    }

    pub fn init_strategy(&self) -> InitStrategy {
        self.init
    }

    /// Strategy used when [`Estimator::fit`] has to allocate Θ.
    pub fn set_init_strategy(&mut self, init: InitStrategy) {
        self.init = init;
    }
}

/// `x` with its bias column, checked against Θ.
fn design<'a>(x: &'a Matrix, theta: &Matrix) -> RegressionResult<CowArray<'a, f64, Ix2>> {
    let xb = with_bias(x, theta.nrows() - 1)?;
    if xb.nrows() == 0 {
        return Err(RegressionError::EmptyInput("feature matrix has no instances"));
    }
    Ok(xb)
}

fn ridge(theta: &Matrix, l2: f64, m: usize) -> f64 {
    if l2 == 0.0 {
        return 0.0;
    }
    let weights = theta.slice(s![1.., ..]);
    l2 / (2.0 * m as f64) * weights.iter().map(|w| w * w).sum::<f64>()
}

fn cost_of<F: ModelFamily>(
    family: &F,
    theta: &Matrix,
    xb: ArrayView2<'_, f64>,
    y: ArrayView2<'_, f64>,
    l2: f64,
) -> RegressionResult<f64> {
    let m = xb.nrows();
    let h = family.hypothesis(xb.dot(theta), m)?;
    Ok(family.data_cost(&h, y) + ridge(theta, l2, m))
}

fn gradient_of<F: ModelFamily>(
    family: &F,
    theta: &Matrix,
    xb: ArrayView2<'_, f64>,
    y: ArrayView2<'_, f64>,
    l2: f64,
) -> RegressionResult<Matrix> {
    let h = family.hypothesis(xb.dot(theta), xb.nrows())?;
    let mut grad = xb.t().dot(&(h - &y));
    if l2 != 0.0 {
        grad.slice_mut(s![1.., ..])
            .scaled_add(l2, &theta.slice(s![1.., ..]));
    }
    Ok(grad)
}

impl<F: ModelFamily> Estimator for RegressionModel<F> {
    /// Fit with the stored configuration, allocating Θ first if its shape does not fit.
    fn fit(&mut self, x: &Matrix, y: &Matrix) -> RegressionResult<()> {
        let outputs = if y.nrows() == x.nrows() { y.ncols() } else { y.nrows() };
        let fits = match &self.theta {
            Some(t) => {
                (x.ncols() + 1 == t.nrows() || x.ncols() == t.nrows()) && t.ncols() == outputs
            }
            None => false,
        };
        if !fits {
            self.initialize(x.ncols(), outputs, self.init)?;
        }
        let config = self.config;
        RegressionModel::fit(self, x, y, config).map(|_| ())
    }

    fn predict(&self, x: &Matrix) -> RegressionResult<Matrix> {
        RegressionModel::predict(self, x).map(Into::into)
    }
}
