use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::data::preprocess::PreparedTrainingSet;
use crate::error::{Error, Result};
use crate::math::matrix::Matrix;
use crate::network::model::CompiledModel;
use crate::train::epoch_stats::EpochLosses;
use crate::train::loop_fn::EpochRunner;
use crate::train::train_config::TrainConfig;

/// Mini-batch trainer for a `CompiledModel` over a prepared data set.
///
/// Split contract: the first `floor(n · (1 - validation_split))` rows train,
/// the rest validate. Only the training rows are shuffled, once per epoch.
pub struct SupervisedTrainer {
    model: CompiledModel,
    train_x: Matrix,
    train_y: Matrix,
    val_x: Matrix,
    val_y: Matrix,
    batch_size: usize,
    shuffle: bool,
    rng: StdRng,
}

impl SupervisedTrainer {
    pub fn new(
        model: CompiledModel,
        data: &PreparedTrainingSet,
        config: &TrainConfig,
        seed: u64,
    ) -> Result<SupervisedTrainer> {
        config.validate()?;

        let n = data.row_count();
        if data.labels.len() != n {
            return Err(Error::Training(format!(
                "{} feature rows but {} labels",
                n,
                data.labels.len()
            )));
        }
        if data.feature_count() != model.input_size() {
            return Err(Error::Training(format!(
                "model expects {} features, data has {}",
                model.input_size(),
                data.feature_count()
            )));
        }

        let split_at = (n as f64 * (1.0 - config.validation_split)).floor() as usize;
        if split_at == 0 {
            return Err(Error::Training(format!(
                "{} usable row(s) leave nothing to train on after the validation split",
                n
            )));
        }

        let labels = Matrix::column(&data.labels);
        let (train_x, val_x) = data.features.split_rows(split_at);
        let (train_y, val_y) = labels.split_rows(split_at);

        Ok(SupervisedTrainer {
            model,
            train_x,
            train_y,
            val_x,
            val_y,
            batch_size: config.batch_size,
            shuffle: config.shuffle,
            rng: StdRng::seed_from_u64(seed.wrapping_add(2)),
        })
    }

    pub fn train_rows(&self) -> usize {
        self.train_x.rows
    }

    pub fn validation_rows(&self) -> usize {
        self.val_x.rows
    }
}

impl EpochRunner for SupervisedTrainer {
    fn run_epoch(&mut self, _epoch_index: usize) -> Result<EpochLosses> {
        let n = self.train_x.rows;
        let mut indices: Vec<usize> = (0..n).collect();
        if self.shuffle {
            indices.shuffle(&mut self.rng);
        }

        let mut total_loss = 0.0;
        for batch in indices.chunks(self.batch_size) {
            let x = self.train_x.select_rows(batch);
            let y = self.train_y.select_rows(batch);
            total_loss += self.model.train_on_batch(&x, &y) * batch.len() as f64;
        }

        Ok(EpochLosses {
            loss: total_loss / n as f64,
            val_loss: self.model.evaluate(&self.val_x, &self.val_y),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::builder::build;

    fn data(rows: usize, features: usize) -> PreparedTrainingSet {
        let mut m = Matrix::zeros(rows, features);
        for (i, x) in m.data.iter_mut().enumerate() {
            *x = (i % 7) as f64 / 7.0;
        }
        let labels = (0..rows).map(|i| m.row(i).iter().sum()).collect();
        PreparedTrainingSet {
            feature_names: (0..features).map(|i| format!("x{}", i)).collect(),
            label_name: "y".into(),
            features: m,
            labels,
            dropped_rows: 0,
        }
    }

    #[test]
    fn leading_rows_train_trailing_rows_validate() {
        let trainer = SupervisedTrainer::new(build(3, 1).unwrap(), &data(10, 3), &TrainConfig::default(), 1).unwrap();
        assert_eq!(trainer.train_rows(), 8);
        assert_eq!(trainer.validation_rows(), 2);
    }

    #[test]
    fn feature_count_must_match_the_model() {
        let err = SupervisedTrainer::new(build(2, 1).unwrap(), &data(10, 3), &TrainConfig::default(), 1)
            .err()
            .unwrap();
        assert!(matches!(err, Error::Training(_)));
    }

    #[test]
    fn training_reduces_loss_on_a_simple_target() {
        let set = data(64, 2);
        let mut trainer = SupervisedTrainer::new(build(2, 9).unwrap(), &set, &TrainConfig::default(), 9).unwrap();
        let first = trainer.run_epoch(0).unwrap();
        let mut last = first;
        for epoch in 1..60 {
            last = trainer.run_epoch(epoch).unwrap();
        }
        assert!(first.loss.is_finite() && last.val_loss.is_finite());
        assert!(last.loss < first.loss);
    }
}
