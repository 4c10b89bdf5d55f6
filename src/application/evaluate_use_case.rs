// ============================================================
// Layer 2 - EvaluateUseCase
// ============================================================
// Scores a trained model on a data root. Categories are mapped
// through the model's own label map; directories the model was
// not trained on are skipped by the loader.

use anyhow::{bail, Result};
use std::path::PathBuf;
use burn::{data::dataloader::DataLoaderBuilder, prelude::Backend};

use crate::data::{batcher::PointCloudBatcher, dataset::ShapeDataset, loader::ShapeNetLoader};
use crate::domain::traits::ShapeSource;
use crate::ml::{
    inferencer::Inferencer,
    trainer::{evaluate_model, EvalMetrics},
};

pub struct EvaluateUseCase {
    model_dir:  PathBuf,
    data_dir:   PathBuf,
    batch_size: usize,
}

impl EvaluateUseCase {
    /// `batch_size` below 1 is raised to 1.
    pub fn new(model_dir: impl Into<PathBuf>, data_dir: impl Into<PathBuf>, batch_size: usize) -> Self {
        Self { model_dir: model_dir.into(), data_dir: data_dir.into(), batch_size: batch_size.max(1) }
    }

    /// Load the model, sample every mesh of a known category under
    /// `data_dir` and score them in one pass. Fails when nothing
    /// under the data root matches the model's label map.
    pub fn execute<B: Backend>(&self, device: B::Device) -> Result<EvalMetrics> {
        let inferencer = Inferencer::<B>::load(&self.model_dir, device.clone())?;

        let catalog = ShapeNetLoader::new(&self.data_dir)
            .with_label_map(inferencer.label_map().clone())
            .load_all()?;
        if catalog.records.is_empty() {
            bail!("No meshes of known categories under '{}'", self.data_dir.display());
        }

        let dataset = ShapeDataset::build(
            &catalog.records,
            inferencer.sampler(),
            inferencer.normalize(),
            inferencer.seed(),
        );
        tracing::info!("Evaluating on {} meshes", dataset.sample_count());

        let loader = DataLoaderBuilder::new(PointCloudBatcher::<B>::new(device))
            .batch_size(self.batch_size)
            .build(dataset);

        let metrics = evaluate_model(inferencer.model(), loader.as_ref());
        tracing::info!(
            "loss={:.4} accuracy={:.1}% over {} samples",
            metrics.loss,
            metrics.accuracy * 100.0,
            metrics.samples
        );
        Ok(metrics)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    use crate::data::loader::fixtures;
    use crate::domain::label_map::LabelMap;
    use crate::infra::export::{export_bundle, BundleManifest};
    use crate::ml::{backend::NdArrayBackend, model::PointCloudClassifierConfig};

    #[test]
    fn test_unknown_categories_are_skipped() {
        let model = tempfile::tempdir().unwrap();
        let data  = tempfile::tempdir().unwrap();

        // model only knows "tetra"
        let manifest = BundleManifest {
            model:     PointCloudClassifierConfig::new(16, 1, vec![]),
            labels:    LabelMap::from_categories(["tetra"]),
            normalize: true,
            seed:      1,
        };
        let m = manifest.model.init::<NdArrayBackend>(&Default::default());
        export_bundle(&m, &manifest, model.path()).unwrap();
        fixtures::write_tree(data.path(), 2);

        let metrics = EvaluateUseCase::new(model.path(), data.path(), 4)
            .execute::<NdArrayBackend>(Default::default())
            .unwrap();
        assert_eq!(metrics.samples, 2);
        // a single-class model is always right
        assert_eq!(metrics.accuracy, 1.0);
    }

    #[test]
    fn test_no_known_categories_is_error() {
        let model = tempfile::tempdir().unwrap();
        let data  = tempfile::tempdir().unwrap();
        let manifest = BundleManifest {
            model:     PointCloudClassifierConfig::new(16, 1, vec![]),
            labels:    LabelMap::from_categories(["chair"]),
            normalize: false,
            seed:      1,
        };
        let m = manifest.model.init::<NdArrayBackend>(&Default::default());
        export_bundle(&m, &manifest, model.path()).unwrap();
        fixtures::write_tree(data.path(), 1);

        let res = EvaluateUseCase::new(model.path(), data.path(), 4).execute::<NdArrayBackend>(Default::default());
        assert!(res.is_err());
    }
}
