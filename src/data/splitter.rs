// ============================================================
// Layer 4 - Train/Validation Splitter
// ============================================================
// Shuffles samples and splits them into two sets:
//   - training set:   used to update model weights
//   - validation set: used for model selection (best_val_loss)
//
// Samples arrive grouped by category (the scan walks one
// category directory at a time). Without the shuffle the
// validation set would contain only the last categories.
//
// The shuffle is seeded so a resumed run sees the same split
// as the run that wrote the checkpoint.

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

/// Shuffle `samples` with `seed` and split into (train, validation).
/// `train_fraction` of the samples (rounded) go to training.
pub fn split_train_val<T>(mut samples: Vec<T>, train_fraction: f64, seed: u64) -> (Vec<T>, Vec<T>) {
    let mut rng = StdRng::seed_from_u64(seed);
    samples.shuffle(&mut rng);

    let total = samples.len();
    let n_train = ((total as f64) * train_fraction.clamp(0.0, 1.0)).round() as usize;

    // split_off(n) leaves [0..n] in `samples` and returns [n..]
    let val = samples.split_off(n_train.min(total));
    tracing::debug!("Split {} samples into {} train / {} validation", total, samples.len(), val.len());

    (samples, val)
}
