use crate::error::{RegressionError, RegressionResult};
use crate::ops::LinkFunction;
use serde::{Deserialize, Serialize};

/// Order in which polynomial expansion and z-score normalization are applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineOrder {
    /// raw → expand → normalize; statistics describe the expanded columns.
    #[default]
    ExpandThenNormalize,
    /// raw → normalize → expand; statistics describe the raw columns.
    NormalizeThenExpand,
}

/// How theta is filled when a model is (re)initialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitStrategy {
    Zeros,
    /// Uniform in [0, 1). `None` seeds from entropy.
    UniformRandom { seed: Option<u64> },
}

impl Default for InitStrategy {
    fn default() -> Self {
        InitStrategy::UniformRandom { seed: None }
    }
}

/// Parameters of one batch gradient-descent run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DescentConfig {
    pub learning_rate: f64,
    pub l2_penalty: f64,
    pub convergence_delta: f64,
    /// 0 means no cap.
    pub max_iterations: usize,
}

impl Default for DescentConfig {
    fn default() -> Self {
        DescentConfig {
            learning_rate: 0.01,
            l2_penalty: 0.0,
            convergence_delta: 1e-6,
            max_iterations: 100_000,
        }
    }
}

impl DescentConfig {
    pub fn validate(&self) -> RegressionResult<()> {
        validate_learning_rate(self.learning_rate)?;
        validate_l2_penalty(self.l2_penalty)?;
        if !(self.convergence_delta >= 0.0) {
            return Err(RegressionError::InvalidParameter {
                name: "convergence_delta",
                value: self.convergence_delta,
                reason: "must be >= 0",
            });
        }
        Ok(())
    }
}

pub fn validate_learning_rate(learning_rate: f64) -> RegressionResult<()> {
    if learning_rate > 0.0 && learning_rate.is_finite() {
        Ok(())
    } else {
        Err(RegressionError::InvalidParameter {
            name: "learning_rate",
            value: learning_rate,
            reason: "must be > 0",
        })
    }
}

pub fn validate_l2_penalty(l2_penalty: f64) -> RegressionResult<()> {
    if l2_penalty >= 0.0 && l2_penalty.is_finite() {
        Ok(())
    } else {
        Err(RegressionError::InvalidParameter {
            name: "l2_penalty",
            value: l2_penalty,
            reason: "must be >= 0",
        })
    }
}

pub fn validate_threshold(threshold: f64) -> RegressionResult<()> {
    if (0.0..=1.0).contains(&threshold) {
        Ok(())
    } else {
        Err(RegressionError::InvalidThreshold(threshold))
    }
}

/// Full configuration surface of a training run, loadable from JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub degree: u32,
    pub learning_rate: f64,
    pub l2_penalty: f64,
    pub convergence_delta: f64,
    pub max_iterations: usize,
    pub classification_threshold: f64,
    pub link_function: LinkFunction,
    pub train_percent: f64,
    pub test_percent: f64,
    pub pipeline_order: PipelineOrder,
    pub init: InitStrategy,
    /// Seed for the train/test shuffle.
    pub seed: Option<u64>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        TrainingConfig {
            degree: 4,
            learning_rate: 0.01,
            l2_penalty: 1.0,
            convergence_delta: 1e-6,
            max_iterations: 100_000,
            classification_threshold: 0.5,
            link_function: LinkFunction::Sigmoid,
            train_percent: 70.0,
            test_percent: 30.0,
            pipeline_order: PipelineOrder::ExpandThenNormalize,
            init: InitStrategy::default(),
            seed: None,
        }
    }
}

impl TrainingConfig {
    pub fn from_json(json: &str) -> RegressionResult<Self> {
        let config: TrainingConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn descent(&self) -> DescentConfig {
        DescentConfig {
            learning_rate: self.learning_rate,
            l2_penalty: self.l2_penalty,
            convergence_delta: self.convergence_delta,
            max_iterations: self.max_iterations,
        }
    }

    pub fn validate(&self) -> RegressionResult<()> {
        if self.degree == 0 {
            return Err(RegressionError::InvalidDegree { degree: self.degree });
        }
        self.descent().validate()?;
        validate_threshold(self.classification_threshold)?;
        validate_split(self.train_percent, self.test_percent)
    }
}

/// Train share must be > 0, test share >= 0, and together they make 100%.
pub fn validate_split(train_percent: f64, test_percent: f64) -> RegressionResult<()> {
    if !(train_percent > 0.0) {
        return Err(RegressionError::InvalidParameter {
            name: "train_percent",
            value: train_percent,
            reason: "must be > 0",
        });
    }
    if !(test_percent >= 0.0) {
        return Err(RegressionError::InvalidParameter {
            name: "test_percent",
            value: test_percent,
            reason: "must be >= 0",
        });
    }
    if (train_percent + test_percent - 100.0).abs() > 1e-9 {
        return Err(RegressionError::InvalidParameter {
            name: "train_percent + test_percent",
            value: train_percent + test_percent,
            reason: "must equal 100",
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        TrainingConfig::default().validate().unwrap();
        DescentConfig::default().validate().unwrap();
    }

    #[test]
    fn test_config_from_json_fills_defaults() {
        let config = TrainingConfig::from_json(
            r#"{ "degree": 2, "link_function": "softmax", "init": "zeros" }"#,
        )
        .unwrap();
        assert_eq!(config.degree, 2);
        assert_eq!(config.link_function, LinkFunction::Softmax);
        assert_eq!(config.init, InitStrategy::Zeros);
        assert_eq!(config.train_percent, 70.0);
    }

    #[test]
    fn test_config_rejects_bad_values() {
        assert!(matches!(
            TrainingConfig::from_json(r#"{ "degree": 0 }"#),
            Err(RegressionError::InvalidDegree { .. })
        ));
        assert!(matches!(
            TrainingConfig::from_json(r#"{ "classification_threshold": 1.5 }"#),
            Err(RegressionError::InvalidThreshold(_))
        ));
        assert!(matches!(
            TrainingConfig::from_json(r#"{ "link_function": "relu" }"#),
            Err(RegressionError::Serialization(_))
        ));
        assert!(TrainingConfig::from_json(r#"{ "learning_rate": 0.0 }"#).is_err());
        assert!(TrainingConfig::from_json(r#"{ "l2_penalty": -1.0 }"#).is_err());
    }

    #[test]
    fn test_validate_split() {
        assert!(validate_split(70.0, 30.0).is_ok());
        assert!(validate_split(100.0, 0.0).is_ok());
        assert!(validate_split(0.0, 100.0).is_err());
        assert!(validate_split(60.0, 30.0).is_err());
    }
}
