use rand::Rng;

use crate::{math::matrix::Matrix, activation::activation::ActivationFunction};

/// Weight and bias gradients for one dense layer.
#[derive(Debug, Clone)]
pub struct DenseGradients {
    pub weights: Matrix,
    pub biases: Matrix,
}

/// Fully connected layer operating on a whole mini-batch at once.
#[derive(Debug, Clone)]
pub struct Dense {
    pub input_size: usize,
    pub units: usize,
    /// Shape `(input_size, units)`.
    pub weights: Matrix,
    /// Shape `(1, units)`.
    pub biases: Matrix,
    pub activator: ActivationFunction,
    input: Matrix,        // batch fed to the last forward pass
    pre_neurons: Matrix,  // z = xW + b, needed for the activation derivative
}

impl Dense {
    /// Glorot-uniform weights, zero biases.
    pub fn new<R: Rng + ?Sized>(
        input_size: usize,
        units: usize,
        activation: ActivationFunction,
        rng: &mut R,
    ) -> Dense {
        Dense {
            input_size,
            units,
            weights: Matrix::glorot_uniform(input_size, units, rng),
            biases: Matrix::zeros(1, units),
            activator: activation,
            input: Matrix::default(),
            pre_neurons: Matrix::default(),
        }
    }

    /// `(batch, input_size)` in, `(batch, units)` out.
    pub fn forward(&mut self, input: &Matrix) -> Matrix {
        let z = (input * &self.weights).add_row_vector(&self.biases);
        let a = z.map(|x| self.activator.function(x));
        self.input = input.clone();
        self.pre_neurons = z;
        a
    }

    /// Back-propagates `grad_output` (∂L/∂a for this layer's output).
    /// Returns the parameter gradients and ∂L/∂x for the previous layer.
    pub fn backward(&self, grad_output: &Matrix) -> (DenseGradients, Matrix) {
        // δ = ∂L/∂a ⊙ σ'(z)
        let act_derivative = self.pre_neurons.map(|z| self.activator.derivative(z));
        let delta = grad_output.hadamard(&act_derivative);

        let grads = DenseGradients {
            weights: &self.input.transpose() * &delta,
            biases: delta.sum_rows(),
        };
        let grad_input = &delta * &self.weights.transpose();
        (grads, grad_input)
    }

    pub fn param_count(&self) -> usize {
        self.weights.data.len() + self.biases.data.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn half_sum_of_squares(m: &Matrix) -> f64 {
        m.data.iter().map(|x| 0.5 * x * x).sum()
    }

    #[test]
    fn weight_gradient_matches_finite_difference() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut layer = Dense::new(3, 2, ActivationFunction::ReLU, &mut rng);
        // Positive biases keep every unit active so the check stays smooth.
        layer.biases = Matrix::from_rows(&[vec![2.0, 2.0]]).unwrap();
        let x = Matrix::from_rows(&[vec![0.5, -0.2, 0.1], vec![0.3, 0.4, -0.6]]).unwrap();

        // L = 0.5 * sum(a^2)  =>  dL/da = a
        let out = layer.forward(&x);
        let (grads, _) = layer.backward(&out);

        let eps = 1e-6;
        for idx in 0..layer.weights.data.len() {
            let mut plus = layer.clone();
            plus.weights.data[idx] += eps;
            let mut minus = layer.clone();
            minus.weights.data[idx] -= eps;
            let numeric = (half_sum_of_squares(&plus.forward(&x))
                - half_sum_of_squares(&minus.forward(&x)))
                / (2.0 * eps);
            assert!((numeric - grads.weights.data[idx]).abs() < 1e-5);
        }
    }

    #[test]
    fn relu_blocks_gradient_of_inactive_units() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut layer = Dense::new(1, 1, ActivationFunction::ReLU, &mut rng);
        layer.weights = Matrix::from_rows(&[vec![1.0]]).unwrap();
        layer.biases = Matrix::from_rows(&[vec![-5.0]]).unwrap();
        let out = layer.forward(&Matrix::from_rows(&[vec![1.0]]).unwrap());
        assert_eq!(out.data, vec![0.0]);
        let (grads, grad_in) = layer.backward(&Matrix::from_rows(&[vec![1.0]]).unwrap());
        assert_eq!(grads.weights.data, vec![0.0]);
        assert_eq!(grad_in.data, vec![0.0]);
    }
}
