// ============================================================
// Layer 2 - PredictUseCase
// ============================================================
// Classifies mesh files with a trained model. `model_dir` may be
// a checkpoint directory or an exported bundle.
//
// Prediction never fails from the caller's point of view: a
// missing or malformed mesh, or a failed forward pass, is logged
// and produces an empty result.

use anyhow::Result;
use std::path::{Path, PathBuf};
use burn::prelude::Backend;

use crate::domain::{shape::Prediction, traits::ShapeClassifier};
use crate::ml::inferencer::Inferencer;

pub struct PredictUseCase<B: Backend> {
    inferencer: Inferencer<B>,
    top_k:      usize,
}

impl<B: Backend> PredictUseCase<B> {
    /// Fails when the model cannot be loaded or its weights do not
    /// fit the saved configuration.
    pub fn new(model_dir: impl AsRef<Path>, device: B::Device, top_k: usize) -> Result<Self> {
        let inferencer = Inferencer::load(model_dir, device)?;
        Ok(Self { inferencer, top_k })
    }

    /// Top-k predictions for one mesh, best first. Empty on failure.
    pub fn predict(&self, mesh_path: &Path) -> Vec<Prediction> {
        self.classify(mesh_path, self.top_k)
    }

    /// One entry per input path, in input order.
    pub fn predict_many(&self, mesh_paths: &[PathBuf]) -> Vec<(PathBuf, Vec<Prediction>)> {
        mesh_paths
            .iter()
            .map(|p| (p.clone(), self.predict(p)))
            .collect()
    }
}

impl<B: Backend> ShapeClassifier for PredictUseCase<B> {
    fn classify(&self, mesh_path: &Path, top_k: usize) -> Vec<Prediction> {
        match self.inferencer.classify_mesh(mesh_path, top_k) {
            Ok(preds) => preds,
            Err(e) => {
                tracing::error!("Prediction failed for '{}': {:#}", mesh_path.display(), e);
                Vec::new()
            }
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    use crate::data::loader::{fixtures, MESH_RELATIVE_PATH};
    use crate::domain::label_map::LabelMap;
    use crate::infra::export::{export_bundle, BundleManifest};
    use crate::ml::{backend::NdArrayBackend, model::PointCloudClassifierConfig};

    fn bundle(dir: &Path) {
        let manifest = BundleManifest {
            model:     PointCloudClassifierConfig::new(32, 2, vec![8]),
            labels:    LabelMap::from_categories(["plane", "tetra"]),
            normalize: true,
            seed:      42,
        };
        let model = manifest.model.init::<NdArrayBackend>(&Default::default());
        export_bundle(&model, &manifest, dir).unwrap();
    }

    #[test]
    fn test_predicts_top_k() {
        let model = tempfile::tempdir().unwrap();
        let data  = tempfile::tempdir().unwrap();
        bundle(model.path());
        fixtures::write_model(data.path(), "tetra", "m0", fixtures::TETRA_OBJ);
        let mesh = data.path().join("tetra/m0").join(MESH_RELATIVE_PATH);

        let uc = PredictUseCase::<NdArrayBackend>::new(model.path(), Default::default(), 1).unwrap();
        let preds = uc.predict(&mesh);
        assert_eq!(preds.len(), 1);
        assert_eq!(uc.classify(&mesh, 5).len(), 2);
    }

    #[test]
    fn test_same_mesh_same_answer() {
        let model = tempfile::tempdir().unwrap();
        let data  = tempfile::tempdir().unwrap();
        bundle(model.path());
        fixtures::write_model(data.path(), "plane", "m0", fixtures::TRIANGLE_OBJ);
        let mesh = data.path().join("plane/m0").join(MESH_RELATIVE_PATH);

        let uc = PredictUseCase::<NdArrayBackend>::new(model.path(), Default::default(), 2).unwrap();
        assert_eq!(uc.predict(&mesh), uc.predict(&mesh));
    }

    #[test]
    fn test_bad_meshes_give_empty_results() {
        let model = tempfile::tempdir().unwrap();
        let data  = tempfile::tempdir().unwrap();
        bundle(model.path());
        let broken = data.path().join("broken.obj");
        fs::write(&broken, "v 0 0 0\nf 1 2 3\n").unwrap();

        let uc = PredictUseCase::<NdArrayBackend>::new(model.path(), Default::default(), 3).unwrap();
        let results = uc.predict_many(&[data.path().join("missing.obj"), broken]);
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|(_, preds)| preds.is_empty()));
    }

    #[test]
    fn test_missing_model_dir_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(PredictUseCase::<NdArrayBackend>::new(dir.path(), Default::default(), 3).is_err());
    }

    #[test]
    fn test_mismatched_checkpoint_is_rejected_up_front() {
        use crate::application::train_use_case::TrainConfig;
        use crate::infra::checkpoint::CheckpointManager;
        use crate::ml::backend::NdArrayTrainBackend;

        let dir = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path());
        ckpt.save_config(&TrainConfig { num_points: 32, hidden_sizes: vec![8], ..TrainConfig::default() }).unwrap();
        ckpt.save_label_map(&LabelMap::from_categories(["plane", "tetra"])).unwrap();
        let trained_on_16 = PointCloudClassifierConfig::new(16, 2, vec![8]).init::<NdArrayTrainBackend>(&Default::default());
        ckpt.save_best(&trained_on_16).unwrap();

        assert!(PredictUseCase::<NdArrayBackend>::new(dir.path(), Default::default(), 1).is_err());
    }
}
