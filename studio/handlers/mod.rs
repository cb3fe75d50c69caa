pub mod dashboard;
pub mod dataset;
pub mod models;
pub mod train;
pub mod train_sse;
