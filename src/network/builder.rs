use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::debug;

use crate::error::{Error, Result};
use crate::network::model::CompiledModel;
use crate::network::spec::NetworkSpec;

/// Builds the fixed feed-forward regressor for `input_feature_count`
/// features. Weights are Glorot-uniform from a `StdRng` seeded with `seed`,
/// so the same seed always yields the same initial model.
pub fn build(input_feature_count: usize, seed: u64) -> Result<CompiledModel> {
    if input_feature_count == 0 {
        return Err(Error::Training(
            "the model needs at least one feature column besides the label".into(),
        ));
    }

    let spec = NetworkSpec::regressor(input_feature_count);
    let mut init_rng = StdRng::seed_from_u64(seed);
    let network = spec.instantiate(&mut init_rng);
    // Dropout masks draw from their own stream.
    let dropout_rng = StdRng::seed_from_u64(seed.wrapping_add(1));

    debug!(
        inputs = input_feature_count,
        params = network.param_count(),
        "built regressor"
    );
    Ok(CompiledModel::new(spec, network, dropout_rng))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activation::ActivationFunction;
    use crate::network::network::NetworkLayer;
    use crate::network::spec::LayerSpec;

    #[test]
    fn topology_matches_regressor() {
        let model = build(4, 1).unwrap();
        let shapes: Vec<String> = model.network.layers.iter().map(|l| match l {
            NetworkLayer::Dense(d) => format!("dense {}x{} {:?}", d.input_size, d.units, d.activator),
            NetworkLayer::Dropout(d) => format!("dropout {}", d.rate),
        }).collect();
        assert_eq!(shapes, vec![
            "dense 4x128 ReLU",
            "dropout 0.3",
            "dense 128x64 ReLU",
            "dropout 0.2",
            "dense 64x32 ReLU",
            "dense 32x1 Linear",
        ]);
        assert_eq!(model.spec.learning_rate, 0.001);
        assert_eq!(model.input_size(), 4);
        assert_eq!(model.network.param_count(), (4 * 128 + 128) + (128 * 64 + 64) + (64 * 32 + 32) + (32 + 1));
        assert_eq!(
            model.spec.layers.last(),
            Some(&LayerSpec::Dense { input_size: 32, units: 1, activation: ActivationFunction::Linear })
        );
    }

    #[test]
    fn same_seed_same_weights() {
        let a = build(3, 99).unwrap();
        let b = build(3, 99).unwrap();
        let c = build(3, 100).unwrap();
        let first = |m: &CompiledModel| match &m.network.layers[0] {
            NetworkLayer::Dense(d) => d.weights.clone(),
            NetworkLayer::Dropout(_) => unreachable!(),
        };
        assert_eq!(first(&a), first(&b));
        assert_ne!(first(&a), first(&c));
    }

    #[test]
    fn zero_features_is_a_training_failure() {
        assert!(matches!(build(0, 0), Err(Error::Training(_))));
    }
}
