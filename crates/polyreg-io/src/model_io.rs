use log::info;
use polyreg_core::{Matrix, RegressionError, RegressionResult};
use polyreg_linear::{LinearModel, LinearRegression, LogisticModel, LogisticRegression};
use polyreg_preprocessing::FeaturePipeline;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Which model family a snapshot holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "params", rename_all = "snake_case")]
pub enum SnapshotFamily {
    Linear(LinearModel),
    Logistic(LogisticModel),
}

/// Serializable fitted model: family, Θ and the feature pipeline it expects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSnapshot {
    pub family: SnapshotFamily,
    pub theta: Matrix,
    pub pipeline: Option<FeaturePipeline>,
}

impl ModelSnapshot {
    pub fn linear(model: &LinearRegression, pipeline: Option<&FeaturePipeline>) -> RegressionResult<Self> {
        Ok(ModelSnapshot {
            family: SnapshotFamily::Linear(*model.family()),
            theta: model.theta()?.clone(),
            pipeline: pipeline.cloned(),
        })
    }

    pub fn logistic(model: &LogisticRegression, pipeline: Option<&FeaturePipeline>) -> RegressionResult<Self> {
        Ok(ModelSnapshot {
            family: SnapshotFamily::Logistic(*model.family()),
            theta: model.theta()?.clone(),
            pipeline: pipeline.cloned(),
        })
    }

    pub fn to_linear(&self) -> RegressionResult<LinearRegression> {
        match &self.family {
            SnapshotFamily::Linear(family) => LinearRegression::from_theta(*family, self.theta.clone()),
            SnapshotFamily::Logistic(_) => Err(wrong_family("linear")),
        }
    }

    pub fn to_logistic(&self) -> RegressionResult<LogisticRegression> {
        match &self.family {
            SnapshotFamily::Logistic(family) => {
                LogisticRegression::from_theta(*family, self.theta.clone())
            }
            SnapshotFamily::Linear(_) => Err(wrong_family("logistic")),
        }
    }
}

fn wrong_family(wanted: &str) -> RegressionError {
    RegressionError::Parse {
        line: 0,
        message: format!("snapshot does not hold a {} model", wanted),
    }
}

/// Save a snapshot as pretty-printed JSON.
pub fn save_model(snapshot: &ModelSnapshot, path: impl AsRef<Path>) -> RegressionResult<()> {
    let path = path.as_ref();
    let json = serde_json::to_string_pretty(snapshot)?;
    fs::write(path, json)?;
    info!("Saved model snapshot to {}", path.display());
    Ok(())
}

/// Load a snapshot written by [`save_model`].
pub fn load_model(path: impl AsRef<Path>) -> RegressionResult<ModelSnapshot> {
    let json = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&json)?)
}
