use rand::Rng;
use serde::{Serialize, Deserialize};

use crate::activation::activation::ActivationFunction;
use crate::layers::{Dense, Dropout};
use crate::network::network::{Network, NetworkLayer};

/// Units of the three hidden dense layers of the regressor.
pub const HIDDEN_UNITS: [usize; 3] = [128, 64, 32];
/// Drop probabilities after the first and second hidden layers.
pub const DROPOUT_RATES: [f64; 2] = [0.3, 0.2];
pub const LEARNING_RATE: f64 = 0.001;

/// Describes one layer in a network specification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LayerSpec {
    Dense {
        input_size: usize,
        units: usize,
        activation: ActivationFunction,
    },
    Dropout {
        rate: f64,
    },
}

/// A serializable description of the network architecture plus how it is
/// compiled for training. The dashboard shows it in the training panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkSpec {
    /// Ordered list of layer descriptions (input → output).
    pub layers: Vec<LayerSpec>,
    pub optimizer: String,
    pub learning_rate: f64,
    pub loss: String,
    pub metrics: Vec<String>,
}

impl NetworkSpec {
    /// The fixed feed-forward regressor:
    /// `n → 128 relu → dropout .3 → 64 relu → dropout .2 → 32 relu → 1 linear`.
    pub fn regressor(input_features: usize) -> NetworkSpec {
        let [h1, h2, h3] = HIDDEN_UNITS;
        let [d1, d2] = DROPOUT_RATES;
        let dense = |input_size, units, activation| LayerSpec::Dense { input_size, units, activation };
        NetworkSpec {
            layers: vec![
                dense(input_features, h1, ActivationFunction::ReLU),
                LayerSpec::Dropout { rate: d1 },
                dense(h1, h2, ActivationFunction::ReLU),
                LayerSpec::Dropout { rate: d2 },
                dense(h2, h3, ActivationFunction::ReLU),
                dense(h3, 1, ActivationFunction::Linear),
            ],
            optimizer: "adam".to_owned(),
            learning_rate: LEARNING_RATE,
            loss: "mean_squared_error".to_owned(),
            metrics: vec!["mse".to_owned()],
        }
    }

    /// Instantiates the layers, drawing initial weights from `rng`.
    pub fn instantiate<R: Rng + ?Sized>(&self, rng: &mut R) -> Network {
        let layers = self.layers.iter()
            .map(|spec| match *spec {
                LayerSpec::Dense { input_size, units, activation } => {
                    NetworkLayer::Dense(Dense::new(input_size, units, activation, rng))
                }
                LayerSpec::Dropout { rate } => NetworkLayer::Dropout(Dropout::new(rate)),
            })
            .collect();
        Network::new(layers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_wire_names() {
        let json = serde_json::to_value(NetworkSpec::regressor(3)).unwrap();
        assert_eq!(json["layers"][0]["kind"], "dense");
        assert_eq!(json["layers"][0]["activation"], "relu");
        assert_eq!(json["layers"][1]["kind"], "dropout");
        assert_eq!(json["layers"][5]["activation"], "linear");
        assert_eq!(json["optimizer"], "adam");
    }
}
