use serde::{Serialize, Deserialize};

/// Element-wise activations available to dense layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivationFunction {
    #[serde(rename = "relu")]
    ReLU,
    /// Identity; used by the regression output unit.
    Linear,
}

impl ActivationFunction {
    pub fn function(&self, x: f64) -> f64 {
        match self {
            ActivationFunction::ReLU => if x > 0.0 { x } else { 0.0 },
            ActivationFunction::Linear => x,
        }
    }

    /// Derivative evaluated at the pre-activation value `z`.
    pub fn derivative(&self, z: f64) -> f64 {
        match self {
            ActivationFunction::ReLU => if z > 0.0 { 1.0 } else { 0.0 },
            ActivationFunction::Linear => 1.0,
        }
    }
}
