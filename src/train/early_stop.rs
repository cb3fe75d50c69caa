use serde::{Serialize, Deserialize};

/// Trailing-window early stopping.
///
/// Evaluated at the start of every epoch whose 0-based index is greater than
/// `after_epoch`: if the last `window` recorded training losses are not
/// non-increasing, the run stops once the current epoch completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EarlyStopping {
    pub after_epoch: usize,
    pub window: usize,
}

impl Default for EarlyStopping {
    fn default() -> Self {
        EarlyStopping { after_epoch: 10, window: 5 }
    }
}

impl EarlyStopping {
    /// `losses` holds one training loss per completed epoch, oldest first.
    pub fn should_stop(&self, epoch_index: usize, losses: &[f64]) -> bool {
        if epoch_index <= self.after_epoch {
            return false;
        }
        let recent = &losses[losses.len().saturating_sub(self.window)..];
        // NaN compares false, so a NaN in the window also stops the run.
        !recent.windows(2).all(|w| w[1] <= w[0])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn never_fires_up_to_epoch_ten() {
        let es = EarlyStopping::default();
        let rising: Vec<f64> = (0..10).map(|i| i as f64).collect();
        assert!(!es.should_stop(10, &rising));
        assert!(es.should_stop(11, &rising));
    }

    #[test]
    fn plateau_counts_as_improving() {
        let es = EarlyStopping::default();
        let losses = [5.0, 4.0, 3.0, 2.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0];
        assert!(!es.should_stop(12, &losses));
    }

    #[test]
    fn only_the_trailing_window_matters() {
        let es = EarlyStopping::default();
        // A bump at index 5 falls outside the last five values.
        let losses = [9.0, 8.0, 7.0, 6.0, 5.0, 7.0, 6.0, 5.0, 4.0, 3.0, 2.0, 1.0];
        assert!(!es.should_stop(12, &losses));

        let bump_inside = [9.0, 8.0, 7.0, 6.0, 5.0, 4.0, 3.0, 2.0, 1.0, 1.5, 1.0, 0.5];
        assert!(es.should_stop(12, &bump_inside));
    }
}
