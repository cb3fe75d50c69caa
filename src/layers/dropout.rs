use rand::Rng;

use crate::math::matrix::Matrix;

/// Inverted dropout: during training each activation is zeroed with
/// probability `rate` and survivors are scaled by `1 / (1 - rate)`, so
/// inference is the identity.
#[derive(Debug, Clone)]
pub struct Dropout {
    pub rate: f64,
    mask: Option<Matrix>,
}

impl Dropout {
    pub fn new(rate: f64) -> Dropout {
        Dropout { rate: rate.clamp(0.0, 1.0), mask: None }
    }

    pub fn keep_rate(&self) -> f64 {
        1.0 - self.rate
    }

    pub fn forward<R: Rng + ?Sized>(&mut self, input: &Matrix, training: bool, rng: &mut R) -> Matrix {
        if !training || self.rate == 0.0 {
            self.mask = None;
            return input.clone();
        }
        let keep = self.keep_rate();
        let scale = if keep > 0.0 { 1.0 / keep } else { 0.0 };
        let mask = Matrix {
            rows: input.rows,
            cols: input.cols,
            data: (0..input.data.len())
                .map(|_| if rng.gen::<f64>() < keep { scale } else { 0.0 })
                .collect(),
        };
        let out = input.hadamard(&mask);
        self.mask = Some(mask);
        out
    }

    pub fn backward(&self, grad_output: &Matrix) -> Matrix {
        match &self.mask {
            Some(mask) => grad_output.hadamard(mask),
            None => grad_output.clone(),
        }
    }
}
