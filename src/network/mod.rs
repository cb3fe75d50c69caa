pub mod builder;
pub mod model;
pub mod network;
pub mod spec;

pub use builder::build;
pub use model::CompiledModel;
pub use network::{Network, NetworkLayer};
pub use spec::{LayerSpec, NetworkSpec};
