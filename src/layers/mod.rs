pub mod dense;
pub mod dropout;

pub use dense::{Dense, DenseGradients};
pub use dropout::Dropout;
