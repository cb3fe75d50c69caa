use rand::rngs::StdRng;

use crate::loss::mse::MseLoss;
use crate::math::matrix::Matrix;
use crate::network::network::Network;
use crate::network::spec::NetworkSpec;
use crate::optim::adam::Adam;

/// A network paired with its optimizer and loss, ready for `train_on_batch`.
#[derive(Debug, Clone)]
pub struct CompiledModel {
    pub spec: NetworkSpec,
    pub network: Network,
    pub optimizer: Adam,
    /// Drives dropout masks.
    rng: StdRng,
}

impl CompiledModel {
    pub fn new(spec: NetworkSpec, network: Network, rng: StdRng) -> CompiledModel {
        let optimizer = Adam::new(spec.learning_rate);
        CompiledModel { spec, network, optimizer, rng }
    }

    pub fn input_size(&self) -> usize {
        self.network.input_size()
    }

    /// One optimizer step on a mini-batch. `targets` is `(batch, 1)`.
    /// Returns the batch MSE measured before the update.
    pub fn train_on_batch(&mut self, inputs: &Matrix, targets: &Matrix) -> f64 {
        let output = self.network.forward_train(inputs, &mut self.rng);
        let loss = MseLoss::loss(&output, targets);
        let grad = MseLoss::derivative(&output, targets);
        let grads = self.network.backward(&grad);
        self.optimizer.step(&mut self.network, grads);
        loss
    }

    /// Inference-mode MSE over a whole set; 0 for an empty set.
    pub fn evaluate(&mut self, inputs: &Matrix, targets: &Matrix) -> f64 {
        if inputs.rows == 0 {
            return 0.0;
        }
        let output = self.network.predict(inputs);
        MseLoss::loss(&output, targets)
    }
}
