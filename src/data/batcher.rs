// ============================================================
// Layer 4 - Point Cloud Batcher
// ============================================================
// Implements Burn's Batcher trait to stack ShapeSamples into
// tensors the classifier can consume.
//
//   Input:  Vec of N ShapeSamples, each num_points * 3 floats
//   Output: PointCloudBatch
//             points  [N, num_points * 3]   (Float)
//             targets [N]                   (Int, class index)
//
// Every sample was produced by the same PointSampler, so all
// rows already have the same width and no padding is needed.

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::data::dataset::ShapeSample;

// ─── PointCloudBatch ──────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct PointCloudBatch<B: Backend> {
    /// Flattened clouds, one per row: [batch_size, num_points * 3]
    pub points: Tensor<B, 2>,

    /// Ground-truth class indices: [batch_size]
    pub targets: Tensor<B, 1, Int>,
}

// ─── PointCloudBatcher ────────────────────────────────────────────────────────
/// Holds the device so tensors are created where the model lives.
#[derive(Clone, Debug)]
pub struct PointCloudBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> PointCloudBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

impl<B: Backend> Batcher<ShapeSample, PointCloudBatch<B>> for PointCloudBatcher<B> {
    fn batch(&self, items: Vec<ShapeSample>) -> PointCloudBatch<B> {
        let batch_size = items.len();
        let width      = items.first().map_or(0, |s| s.points.len());

        // Vec<Vec<f32>> -> one flat Vec<f32>, row-major
        let flat: Vec<f32> = items
            .iter()
            .flat_map(|s| s.points.iter().copied())
            .collect();

        let targets: Vec<i32> = items.iter().map(|s| s.label as i32).collect();

        let points = Tensor::<B, 1>::from_floats(flat.as_slice(), &self.device)
            .reshape([batch_size, width]);
        let targets = Tensor::<B, 1, Int>::from_ints(targets.as_slice(), &self.device);

        PointCloudBatch { points, targets }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_batch_shapes_and_values() {
        let batcher = PointCloudBatcher::<TestBackend>::new(Default::default());
        let batch = batcher.batch(vec![
            ShapeSample { points: vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], label: 1 },
            ShapeSample { points: vec![7.0, 8.0, 9.0, 10.0, 11.0, 12.0], label: 0 },
        ]);

        assert_eq!(batch.points.dims(), [2, 6]);
        assert_eq!(batch.targets.dims(), [2]);

        let row1: Vec<f32> = batch.points.slice([1..2, 0..6]).into_data().to_vec().unwrap();
        assert_eq!(row1, vec![7.0, 8.0, 9.0, 10.0, 11.0, 12.0]);

        let targets: Vec<i64> = batch
            .targets
            .into_data()
            .convert::<i64>()
            .to_vec()
            .unwrap();
        assert_eq!(targets, vec![1, 0]);
    }
}
