// ============================================================
// Layer 5 - Inferencer
// ============================================================
// Rebuilds a trained classifier for prediction, from either
//
//   - a checkpoint dir: train_config.json + label_map.json +
//     best_model (or the latest epoch when no best was saved)
//   - an exported bundle: bundle.json + model.bin
//
// and turns a point cloud into softmax probabilities.
use std::path::Path;

use anyhow::{bail, ensure, Result};
use burn::{prelude::*, tensor::activation::softmax};

use crate::data::{dataset::load_point_cloud, sampler::PointSampler};
use crate::domain::{label_map::LabelMap, point_cloud::PointCloud, shape::Prediction};
use crate::infra::{checkpoint::CheckpointManager, export};
use crate::ml::model::{PointCloudClassifier, PointCloudClassifierConfig};

pub struct Inferencer<B: Backend> {
    model:     PointCloudClassifier<B>,
    model_cfg: PointCloudClassifierConfig,
    label_map: LabelMap,
    sampler:   PointSampler,
    normalize: bool,
    seed:      u64,
    device:    B::Device,
}

impl<B: Backend> Inferencer<B> {
    /// Load from a checkpoint dir or an export bundle, whichever `dir` is.
    pub fn load(dir: impl AsRef<Path>, device: B::Device) -> Result<Self> {
        let dir = dir.as_ref();
        if export::is_bundle(dir) {
            Self::from_bundle(dir, device)
        } else {
            Self::from_checkpoint(&CheckpointManager::new(dir), device)
        }
    }

    /// Rebuild the model from `train_config.json` and `label_map.json`,
    /// then load the best weights (or the latest epoch). Fails if the
    /// weights do not fit that configuration.
    pub fn from_checkpoint(ckpt_manager: &CheckpointManager, device: B::Device) -> Result<Self> {
        let cfg       = ckpt_manager.load_config()?;
        let label_map = ckpt_manager.load_label_map()?;
        if label_map.is_empty() {
            bail!("Label map in '{}' is empty", ckpt_manager.dir().display());
        }

        let model_cfg = PointCloudClassifierConfig::new(cfg.num_points, label_map.len(), cfg.hidden_sizes.clone())
            .with_dropout(cfg.dropout);
        let model = ckpt_manager.load_inference_model(model_cfg.init::<B>(&device), &device)?;
        tracing::info!("Model loaded from checkpoint '{}'", ckpt_manager.dir().display());

        Ok(Self {
            model,
            model_cfg,
            label_map,
            sampler:   PointSampler::new(cfg.num_points),
            normalize: cfg.normalize,
            seed:      cfg.seed,
            device,
        })
    }

    /// Load an exported bundle. The manifest's class count must match its labels.
    pub fn from_bundle(dir: impl AsRef<Path>, device: B::Device) -> Result<Self> {
        let dir = dir.as_ref();
        let (model, manifest) = export::load_bundle::<B>(dir, &device)?;
        ensure!(
            manifest.model.num_classes == manifest.labels.len(),
            "Bundle '{}' has {} outputs but {} labels",
            dir.display(),
            manifest.model.num_classes,
            manifest.labels.len(),
        );
        tracing::info!("Model loaded from bundle '{}'", dir.display());

        Ok(Self {
            model,
            sampler:   PointSampler::new(manifest.model.num_points),
            model_cfg: manifest.model,
            label_map: manifest.labels,
            normalize: manifest.normalize,
            seed:      manifest.seed,
            device,
        })
    }

    /// The loaded network.
    pub fn model(&self) -> &PointCloudClassifier<B> {
        &self.model
    }

    pub fn model_config(&self) -> &PointCloudClassifierConfig {
        &self.model_cfg
    }

    /// Class index <-> category id, with display names when known.
    pub fn label_map(&self) -> &LabelMap {
        &self.label_map
    }

    /// Sampler configured with the training point count.
    pub fn sampler(&self) -> &PointSampler {
        &self.sampler
    }

    /// Whether clouds are centred and scaled before prediction.
    pub fn normalize(&self) -> bool {
        self.normalize
    }

    /// Sampling seed, fixed so a mesh always gets the same cloud.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn device(&self) -> &B::Device {
        &self.device
    }

    /// Softmax probability per class index.
    pub fn predict_cloud(&self, cloud: &PointCloud) -> Result<Vec<f32>> {
        ensure!(
            cloud.len() == self.model_cfg.num_points,
            "Expected {} points, got {}",
            self.model_cfg.num_points,
            cloud.len(),
        );

        let flat  = cloud.flatten();
        let input = Tensor::<B, 1>::from_floats(flat.as_slice(), &self.device)
            .reshape([1, self.model_cfg.input_dim()]);
        let probs = softmax(self.model.forward(input), 1);

        probs
            .into_data()
            .to_vec::<f32>()
            .map_err(|e| anyhow::anyhow!("Cannot read probabilities: {e:?}"))
    }

    /// The `top_k` most likely classes, best first.
    pub fn classify_cloud(&self, cloud: &PointCloud, top_k: usize) -> Result<Vec<Prediction>> {
        let probs = self.predict_cloud(cloud)?;

        let mut ranked: Vec<(usize, f32)> = probs.into_iter().enumerate().collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked.truncate(top_k);

        Ok(ranked
            .into_iter()
            .map(|(label, probability)| Prediction {
                label,
                category: self.label_map.category(label).unwrap_or_default().to_string(),
                name:     self.label_map.display_name(label).unwrap_or_default().to_string(),
                probability,
            })
            .collect())
    }

    /// Sample a mesh file the way training did and classify it.
    pub fn classify_mesh(&self, path: &Path, top_k: usize) -> Result<Vec<Prediction>> {
        let cloud = load_point_cloud(path, &self.sampler, self.normalize, self.seed)?;
        self.classify_cloud(&cloud, top_k)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use crate::application::train_use_case::TrainConfig;
    use crate::data::loader::fixtures;
    use crate::infra::export::BundleManifest;
    use crate::ml::backend::NdArrayBackend;

    fn labels() -> LabelMap {
        let names = BTreeMap::from([("03001627".to_string(), "chair".to_string())]);
        LabelMap::from_categories(["02691156", "03001627", "04379243"]).with_names(names)
    }

    fn write_bundle(dir: &Path, num_points: usize) {
        let manifest = BundleManifest {
            model:     PointCloudClassifierConfig::new(num_points, 3, vec![4]),
            labels:    labels(),
            normalize: true,
            seed:      3,
        };
        let model = manifest.model.init::<NdArrayBackend>(&Default::default());
        export::export_bundle(&model, &manifest, dir).unwrap();
    }

    fn cloud(n: usize) -> PointCloud {
        PointCloud::new((0..n).map(|i| [i as f32, 0.5, -1.0]).collect())
    }

    #[test]
    fn test_probabilities_sum_to_one() {
        let dir = tempfile::tempdir().unwrap();
        write_bundle(dir.path(), 4);
        let inf = Inferencer::<NdArrayBackend>::load(dir.path(), Default::default()).unwrap();

        let probs = inf.predict_cloud(&cloud(4)).unwrap();
        assert_eq!(probs.len(), 3);
        assert!((probs.iter().sum::<f32>() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_classify_is_sorted_and_truncated() {
        let dir = tempfile::tempdir().unwrap();
        write_bundle(dir.path(), 4);
        let inf = Inferencer::<NdArrayBackend>::from_bundle(dir.path(), Default::default()).unwrap();

        let preds = inf.classify_cloud(&cloud(4), 2).unwrap();
        assert_eq!(preds.len(), 2);
        assert!(preds[0].probability >= preds[1].probability);

        let all = inf.classify_cloud(&cloud(4), 10).unwrap();
        assert_eq!(all.len(), 3);
        let chair = all.iter().find(|p| p.category == "03001627").unwrap();
        assert_eq!(chair.name, "chair");
    }

    #[test]
    fn test_wrong_point_count_is_error() {
        let dir = tempfile::tempdir().unwrap();
        write_bundle(dir.path(), 4);
        let inf = Inferencer::<NdArrayBackend>::load(dir.path(), Default::default()).unwrap();
        assert!(inf.predict_cloud(&cloud(5)).is_err());
    }

    #[test]
    fn test_from_checkpoint_uses_saved_config() {
        let dir = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path());
        let cfg = TrainConfig { num_points: 8, hidden_sizes: vec![6], ..TrainConfig::default() };
        ckpt.save_config(&cfg).unwrap();
        ckpt.save_label_map(&labels()).unwrap();

        // no weights yet
        assert!(Inferencer::<NdArrayBackend>::load(dir.path(), Default::default()).is_err());

        let model_cfg = PointCloudClassifierConfig::new(8, 3, vec![6]);
        let model = model_cfg.init::<crate::ml::backend::NdArrayTrainBackend>(&Default::default());
        ckpt.save_best(&model).unwrap();

        let inf = Inferencer::<NdArrayBackend>::load(dir.path(), Default::default()).unwrap();
        assert_eq!(inf.model_config().num_points, 8);
        assert_eq!(inf.label_map().len(), 3);
        assert_eq!(inf.sampler().num_points(), 8);
    }

    #[test]
    fn test_checkpoint_weights_must_match_config() {
        let dir = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path());
        let cfg = TrainConfig { num_points: 32, hidden_sizes: vec![8], ..TrainConfig::default() };
        ckpt.save_config(&cfg).unwrap();
        ckpt.save_label_map(&labels()).unwrap();

        // weights from a 16-point model next to a 32-point config
        let model = PointCloudClassifierConfig::new(16, 3, vec![8])
            .init::<crate::ml::backend::NdArrayTrainBackend>(&Default::default());
        ckpt.save_best(&model).unwrap();

        assert!(Inferencer::<NdArrayBackend>::load(dir.path(), Default::default()).is_err());
    }

    #[test]
    fn test_bundle_weights_must_match_manifest() {
        let dir = tempfile::tempdir().unwrap();
        write_bundle(dir.path(), 4);

        let mut manifest = export::load_manifest(dir.path()).unwrap();
        manifest.model.hidden_sizes = vec![4, 4];
        std::fs::write(dir.path().join("bundle.json"), serde_json::to_string(&manifest).unwrap()).unwrap();

        assert!(Inferencer::<NdArrayBackend>::load(dir.path(), Default::default()).is_err());
    }

    #[test]
    fn test_classify_mesh_file() {
        let dir = tempfile::tempdir().unwrap();
        write_bundle(dir.path(), 16);
        let inf = Inferencer::<NdArrayBackend>::load(dir.path(), Default::default()).unwrap();

        let data = tempfile::tempdir().unwrap();
        fixtures::write_model(data.path(), "x", "m0", fixtures::TETRA_OBJ);
        let mesh = data.path().join("x/m0").join(crate::data::loader::MESH_RELATIVE_PATH);

        let preds = inf.classify_mesh(&mesh, 1).unwrap();
        assert_eq!(preds.len(), 1);
        assert!(inf.classify_mesh(&data.path().join("missing.obj"), 1).is_err());
    }
}
