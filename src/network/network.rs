use rand::Rng;

use crate::layers::{Dense, DenseGradients, Dropout};
use crate::math::matrix::Matrix;

/// One stage of a sequential network.
#[derive(Debug, Clone)]
pub enum NetworkLayer {
    Dense(Dense),
    Dropout(Dropout),
}

/// A sequential stack of layers evaluated on `(batch, features)` matrices.
#[derive(Debug, Clone)]
pub struct Network {
    pub layers: Vec<NetworkLayer>,
}

impl Network {
    pub fn new(layers: Vec<NetworkLayer>) -> Network {
        Network { layers }
    }

    /// Training-mode forward pass: dropout is active and every layer caches
    /// what it needs for `backward`.
    pub fn forward_train<R: Rng + ?Sized>(&mut self, input: &Matrix, rng: &mut R) -> Matrix {
        let mut current = input.clone();
        for layer in &mut self.layers {
            current = match layer {
                NetworkLayer::Dense(dense) => dense.forward(&current),
                NetworkLayer::Dropout(dropout) => dropout.forward(&current, true, rng),
            };
        }
        current
    }

    /// Inference-mode forward pass; dropout is the identity.
    pub fn predict(&mut self, input: &Matrix) -> Matrix {
        let mut current = input.clone();
        for layer in &mut self.layers {
            if let NetworkLayer::Dense(dense) = layer {
                current = dense.forward(&current);
            }
        }
        current
    }

    /// Back-propagates ∂L/∂output through the stack. The result is indexed
    /// like `layers`; dropout positions hold `None`.
    pub fn backward(&self, grad_output: &Matrix) -> Vec<Option<DenseGradients>> {
        let mut grads: Vec<Option<DenseGradients>> = vec![None; self.layers.len()];
        let mut delta = grad_output.clone();
        for (i, layer) in self.layers.iter().enumerate().rev() {
            delta = match layer {
                NetworkLayer::Dense(dense) => {
                    let (g, grad_input) = dense.backward(&delta);
                    grads[i] = Some(g);
                    grad_input
                }
                NetworkLayer::Dropout(dropout) => dropout.backward(&delta),
            };
        }
        grads
    }

    /// Width of the first dense layer's input, 0 for an empty network.
    pub fn input_size(&self) -> usize {
        self.layers
            .iter()
            .find_map(|l| match l {
                NetworkLayer::Dense(d) => Some(d.input_size),
                NetworkLayer::Dropout(_) => None,
            })
            .unwrap_or(0)
    }

    pub fn param_count(&self) -> usize {
        self.layers
            .iter()
            .map(|l| match l {
                NetworkLayer::Dense(d) => d.param_count(),
                NetworkLayer::Dropout(_) => 0,
            })
            .sum()
    }
}
