use polyreg_core::RegressionResult;
use serde::{Deserialize, Serialize};

/// Cost after a given number of descent steps. Iteration 0 is the starting cost.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TracePoint {
    pub iteration: usize,
    pub cost: f64,
}

/// Receives one point per iteration while a model is being fitted.
pub trait TraceSink {
    fn record(&mut self, point: TracePoint) -> RegressionResult<()>;
}

impl TraceSink for Vec<TracePoint> {
    fn record(&mut self, point: TracePoint) -> RegressionResult<()> {
        self.push(point);
        Ok(())
    }
}

/// Discards every point.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl TraceSink for NullSink {
    fn record(&mut self, _point: TracePoint) -> RegressionResult<()> {
        Ok(())
    }
}

/// Summary of the most recent call to `fit`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitReport {
    pub iterations: usize,
    pub final_cost: f64,
    /// `|J_prev - J|` of the last step.
    pub last_delta: f64,
    /// False when the iteration cap stopped the loop.
    pub converged: bool,
}
