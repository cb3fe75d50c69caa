use crate::math::matrix::Matrix;

pub struct MseLoss;

impl MseLoss {
    /// Scalar MSE over every element: mean((predicted - expected)²)
    pub fn loss(predicted: &Matrix, expected: &Matrix) -> f64 {
        (predicted - expected).map(|d| d * d).mean()
    }

    /// Gradient of `loss` w.r.t. `predicted`: 2·(predicted - expected) / n
    pub fn derivative(predicted: &Matrix, expected: &Matrix) -> Matrix {
        let n = predicted.data.len().max(1) as f64;
        (predicted - expected).map(|d| 2.0 * d / n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loss_and_gradient() {
        let p = Matrix::column(&[1.0, 3.0]);
        let y = Matrix::column(&[0.0, 1.0]);
        assert_eq!(MseLoss::loss(&p, &y), 2.5);
        assert_eq!(MseLoss::derivative(&p, &y).data, vec![1.0, 2.0]);
    }
}
