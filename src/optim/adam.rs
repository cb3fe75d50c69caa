use crate::layers::DenseGradients;
use crate::math::matrix::Matrix;
use crate::network::network::{Network, NetworkLayer};

/// First and second moment estimates for one dense layer.
#[derive(Debug, Clone)]
struct Moments {
    m_w: Matrix,
    v_w: Matrix,
    m_b: Matrix,
    v_b: Matrix,
}

impl Moments {
    fn zeros_like(g: &DenseGradients) -> Moments {
        Moments {
            m_w: Matrix::zeros(g.weights.rows, g.weights.cols),
            v_w: Matrix::zeros(g.weights.rows, g.weights.cols),
            m_b: Matrix::zeros(g.biases.rows, g.biases.cols),
            v_b: Matrix::zeros(g.biases.rows, g.biases.cols),
        }
    }
}

/// Adam optimizer (Kingma & Ba) with bias-corrected step size:
/// `lr_t = lr · sqrt(1 - β2^t) / (1 - β1^t)`,
/// `w -= lr_t · m / (sqrt(v) + ε)`.
#[derive(Debug, Clone)]
pub struct Adam {
    pub learning_rate: f64,
    pub beta1: f64,
    pub beta2: f64,
    pub epsilon: f64,
    step: u64,
    moments: Vec<Option<Moments>>,
}

impl Adam {
    pub fn new(learning_rate: f64) -> Adam {
        Adam {
            learning_rate,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-7,
            step: 0,
            moments: Vec::new(),
        }
    }

    /// Number of updates applied so far.
    pub fn iterations(&self) -> u64 {
        self.step
    }

    /// Applies one update to every dense layer of `network`. `grads` is
    /// indexed like `network.layers` (as returned by `Network::backward`).
    pub fn step(&mut self, network: &mut Network, grads: Vec<Option<DenseGradients>>) {
        if self.moments.len() < grads.len() {
            self.moments.resize(grads.len(), None);
        }
        self.step += 1;
        let t = self.step as i32;
        let lr_t = self.learning_rate * (1.0 - self.beta2.powi(t)).sqrt() / (1.0 - self.beta1.powi(t));
        let (b1, b2, eps) = (self.beta1, self.beta2, self.epsilon);

        for (i, grad) in grads.into_iter().enumerate() {
            let (Some(grad), NetworkLayer::Dense(layer)) = (grad, &mut network.layers[i]) else {
                continue;
            };
            let moments = self.moments[i].get_or_insert_with(|| Moments::zeros_like(&grad));
            update(&mut layer.weights, &grad.weights, &mut moments.m_w, &mut moments.v_w, lr_t, b1, b2, eps);
            update(&mut layer.biases, &grad.biases, &mut moments.m_b, &mut moments.v_b, lr_t, b1, b2, eps);
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn update(param: &mut Matrix, grad: &Matrix, m: &mut Matrix, v: &mut Matrix, lr_t: f64, b1: f64, b2: f64, eps: f64) {
    for (((p, &g), m), v) in param.data.iter_mut()
        .zip(&grad.data)
        .zip(m.data.iter_mut())
        .zip(v.data.iter_mut())
    {
        *m = b1 * *m + (1.0 - b1) * g;
        *v = b2 * *v + (1.0 - b2) * g * g;
        *p -= lr_t * *m / (v.sqrt() + eps);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activation::ActivationFunction;
    use crate::layers::Dense;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn first_step_moves_each_weight_by_learning_rate() {
        let mut rng = StdRng::seed_from_u64(5);
        let dense = Dense::new(2, 2, ActivationFunction::Linear, &mut rng);
        let before = dense.weights.clone();
        let mut net = Network::new(vec![NetworkLayer::Dense(dense)]);

        let grads = vec![Some(DenseGradients {
            weights: Matrix::from_rows(&[vec![0.5, -3.0], vec![10.0, -0.01]]).unwrap(),
            biases: Matrix::from_rows(&[vec![1.0, -1.0]]).unwrap(),
        })];
        let mut adam = Adam::new(0.001);
        adam.step(&mut net, grads);

        let NetworkLayer::Dense(after) = &net.layers[0] else { unreachable!() };
        for ((b, a), g) in before.data.iter().zip(&after.weights.data).zip([0.5, -3.0, 10.0, -0.01]) {
            let moved = b - a;
            assert!((moved.abs() - 0.001).abs() < 1e-5, "moved {moved}");
            assert_eq!(moved.signum(), f64::signum(g));
        }
        assert!((after.biases.data[0] + 0.001).abs() < 1e-5);
        assert_eq!(adam.iterations(), 1);
    }
}
