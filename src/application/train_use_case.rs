// ============================================================
// Layer 2 - TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Scan the data root            (Layer 4 - data)
//   Step 2: Attach label names            (Layer 6 - infra)
//   Step 3: Sample point clouds           (Layer 4 - data)
//   Step 4: Split train/validation        (Layer 4 - data)
//   Step 5: Save config + label map       (Layer 6 - infra)
//   Step 6: Run training loop             (Layer 5 - ml)

use anyhow::{bail, Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};
use serde::{Deserialize, Serialize};

use crate::data::{
    dataset::ShapeDataset,
    loader::ShapeNetLoader,
    sampler::PointSampler,
    splitter::split_train_val,
};
use crate::domain::{label_map::LabelMap, traits::ShapeSource};
use crate::infra::{checkpoint::CheckpointManager, label_store::load_label_names};
use crate::ml::{
    backend::BackendKind,
    trainer::{run_training, TrainingSummary},
};

// ─── Training Configuration ──────────────────────────────────────────────────
// All hyperparameters for a training run. Saved next to the
// checkpoints as train_config.json so inference can rebuild the
// same architecture and sample meshes the same way.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    pub data_dir:         PathBuf,
    pub checkpoint_dir:   PathBuf,
    /// JSON file mapping category ids to display names
    pub label_names:      Option<PathBuf>,
    pub num_points:       usize,
    pub hidden_sizes:     Vec<usize>,
    pub dropout:          f64,
    pub batch_size:       usize,
    pub epochs:           usize,
    pub lr:               f64,
    pub weight_decay:     f64,
    pub train_fraction:   f64,
    pub seed:             u64,
    /// Centre each cloud and scale it into the unit sphere
    pub normalize:        bool,
    pub max_per_category: Option<usize>,
    /// Only train on these category ids
    pub categories:       Option<Vec<String>>,
    /// Stop after this many epochs without improvement
    pub patience:         Option<usize>,
    pub num_workers:      usize,
    pub backend:          BackendKind,
    /// Continue from the checkpoint in checkpoint_dir
    pub resume:           bool,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            data_dir:         PathBuf::from("data/ShapeNetCore"),
            checkpoint_dir:   PathBuf::from("checkpoints"),
            label_names:      None,
            num_points:       1024,
            hidden_sizes:     vec![512, 256],
            dropout:          0.3,
            batch_size:       32,
            epochs:           20,
            lr:               1e-3,
            weight_decay:     1e-4,
            train_fraction:   0.8,
            seed:             42,
            normalize:        true,
            max_per_category: None,
            categories:       None,
            patience:         None,
            num_workers:      1,
            backend:          BackendKind::Wgpu,
            resume:           false,
        }
    }
}

impl TrainConfig {
    /// Read a full config from a JSON file. Missing fields take
    /// their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .with_context(|| format!("Cannot read config '{}'", path.display()))?;
        let cfg: Self = serde_json::from_str(&json)
            .with_context(|| format!("Invalid config '{}'", path.display()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject settings that cannot produce a training run.
    pub fn validate(&self) -> Result<()> {
        if self.num_points == 0 {
            bail!("num_points must be at least 1");
        }
        if self.batch_size == 0 {
            bail!("batch_size must be at least 1");
        }
        if !(0.0..=1.0).contains(&self.train_fraction) {
            bail!("train_fraction must be within [0, 1], got {}", self.train_fraction);
        }
        if !(0.0..1.0).contains(&self.dropout) {
            bail!("dropout must be within [0, 1), got {}", self.dropout);
        }
        if self.patience == Some(0) {
            bail!("patience must be at least 1 (leave it unset to disable early stopping)");
        }
        if self.max_per_category == Some(0) {
            bail!("max_per_category must be at least 1");
        }
        Ok(())
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    /// Create a new TrainUseCase with the given configuration
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Execute the full training pipeline end to end
    pub fn execute(&self) -> Result<TrainingSummary> {
        let cfg = &self.config;
        cfg.validate()?;

        // ── Step 1: Scan category / model directories ─────────────────────────
        tracing::info!("Scanning meshes under '{}'", cfg.data_dir.display());
        let mut loader = ShapeNetLoader::new(&cfg.data_dir)
            .with_categories(cfg.categories.clone())
            .with_max_per_category(cfg.max_per_category);

        // ── Step 2: Human-readable names ──────────────────────────────────────
        if let Some(path) = &cfg.label_names {
            loader = loader.with_label_names(load_label_names(path)?);
        }

        let catalog = loader.load_all()?;
        if catalog.records.is_empty() {
            bail!("No meshes found under '{}'", cfg.data_dir.display());
        }
        tracing::info!(
            "Found {} meshes in {} categories",
            catalog.records.len(),
            catalog.label_map.len()
        );
        for ((_, category), count) in catalog.label_map.iter().zip(catalog.class_counts()) {
            tracing::debug!("  {:<12} {}", category, count);
        }

        // Nothing in checkpoint_dir is written before a resume is known
        // to rebuild the saved model.
        let ckpt_manager = CheckpointManager::new(&cfg.checkpoint_dir);
        if cfg.resume {
            check_resume_compatible(&ckpt_manager, cfg, &catalog.label_map)?;
        }

        // ── Step 3: Sample one point cloud per mesh ───────────────────────────
        let sampler = PointSampler::new(cfg.num_points);
        let samples = ShapeDataset::build(&catalog.records, &sampler, cfg.normalize, cfg.seed).into_samples();
        if samples.is_empty() {
            bail!("None of the {} meshes could be sampled", catalog.records.len());
        }
        tracing::info!("Built {} point clouds of {} points", samples.len(), cfg.num_points);

        // ── Step 4: Train / validation split ──────────────────────────────────
        // Same seed on every run, so a resumed run sees the same split
        let (train_samples, val_samples) = split_train_val(samples, cfg.train_fraction, cfg.seed);
        tracing::info!(
            "Split: {} train, {} validation",
            train_samples.len(),
            val_samples.len()
        );
        if train_samples.is_empty() {
            bail!("train_fraction {} leaves no training samples", cfg.train_fraction);
        }

        // ── Step 5: Save config + label map for inference ─────────────────────
        ckpt_manager.save_config(cfg)?;
        ckpt_manager.save_label_map(&catalog.label_map)?;

        // ── Step 6: Run training loop (Layer 5) ───────────────────────────────
        let summary = run_training(
            cfg,
            ShapeDataset::new(train_samples),
            ShapeDataset::new(val_samples),
            catalog.label_map.len(),
            &ckpt_manager,
        )?;

        match (summary.best_epoch, summary.best_val_loss) {
            (Some(epoch), Some(loss)) => tracing::info!(
                "Ran {} epochs (last {}), best loss {:.4} at epoch {}",
                summary.epochs_run,
                summary.last_epoch,
                loss,
                epoch
            ),
            _ => tracing::info!("Ran {} epochs (last {})", summary.epochs_run, summary.last_epoch),
        }
        Ok(summary)
    }
}

// ─── Resume Guard ─────────────────────────────────────────────────────────────
// Architecture and categories of a resumed run must match what is
// already in the checkpoint dir. Files that were never written are
// fine (nothing to resume from); files that exist must parse.
fn check_resume_compatible(
    ckpt_manager: &CheckpointManager,
    cfg:          &TrainConfig,
    label_map:    &LabelMap,
) -> Result<()> {
    let dir = ckpt_manager.dir().display();

    if ckpt_manager.has_config() {
        let saved = ckpt_manager.load_config()?;
        if saved.num_points != cfg.num_points
            || saved.hidden_sizes != cfg.hidden_sizes
            || saved.dropout != cfg.dropout
        {
            bail!(
                "Cannot resume in '{}': it holds a model with num_points={} hidden_sizes={:?} dropout={}, \
                 this run asks for num_points={} hidden_sizes={:?} dropout={}. \
                 Use a new --checkpoint-dir or drop --resume.",
                dir,
                saved.num_points,
                saved.hidden_sizes,
                saved.dropout,
                cfg.num_points,
                cfg.hidden_sizes,
                cfg.dropout,
            );
        }
    }

    if ckpt_manager.has_label_map() {
        let saved = ckpt_manager.load_label_map()?;
        if !saved.iter().eq(label_map.iter()) {
            bail!(
                "Cannot resume in '{}': categories under '{}' differ from the saved label map",
                dir,
                cfg.data_dir.display()
            );
        }
    }
    Ok(())
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::fixtures;

    fn cpu_config(data: &Path, out: &Path) -> TrainConfig {
        TrainConfig {
            data_dir:       data.to_path_buf(),
            checkpoint_dir: out.to_path_buf(),
            num_points:     16,
            hidden_sizes:   vec![8],
            batch_size:     2,
            epochs:         2,
            backend:        BackendKind::NdArray,
            ..TrainConfig::default()
        }
    }

    #[test]
    fn test_defaults() {
        let cfg = TrainConfig::default();
        assert_eq!(cfg.num_points, 1024);
        assert_eq!(cfg.hidden_sizes, vec![512, 256]);
        assert_eq!(cfg.seed, 42);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_from_file_fills_missing_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cfg.json");
        fs::write(&path, r#"{"epochs": 5, "backend": "ndarray"}"#).unwrap();

        let cfg = TrainConfig::from_file(&path).unwrap();
        assert_eq!(cfg.epochs, 5);
        assert_eq!(cfg.backend, BackendKind::NdArray);
        assert_eq!(cfg.batch_size, 32);
    }

    #[test]
    fn test_from_file_rejects_bad_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cfg.json");
        fs::write(&path, r#"{"train_fraction": 1.5}"#).unwrap();
        assert!(TrainConfig::from_file(&path).is_err());
    }

    #[test]
    fn test_empty_data_root_fails_before_training() {
        let data = tempfile::tempdir().unwrap();
        let out  = tempfile::tempdir().unwrap();
        let err = TrainUseCase::new(cpu_config(data.path(), out.path())).execute();
        assert!(err.is_err());
        assert!(!out.path().join("checkpoint.json").exists());
    }

    #[test]
    fn test_end_to_end_on_cpu() {
        let data = tempfile::tempdir().unwrap();
        let out  = tempfile::tempdir().unwrap();
        fixtures::write_tree(data.path(), 3);

        let summary = TrainUseCase::new(cpu_config(data.path(), out.path())).execute().unwrap();
        assert_eq!(summary.epochs_run, 2);

        let ckpt = CheckpointManager::new(out.path());
        assert_eq!(ckpt.load_config().unwrap().num_points, 16);
        assert_eq!(ckpt.load_label_map().unwrap().len(), 2);
        assert_eq!(ckpt.load_state().unwrap().unwrap().epoch, 2);
    }

    #[test]
    fn test_validate_rejects_zero_limits() {
        let cfg = TrainConfig { patience: Some(0), ..TrainConfig::default() };
        assert!(cfg.validate().is_err());
        let cfg = TrainConfig { max_per_category: Some(0), ..TrainConfig::default() };
        assert!(cfg.validate().is_err());
        let cfg = TrainConfig { patience: Some(1), max_per_category: Some(1), ..TrainConfig::default() };
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_resume_with_other_architecture_keeps_checkpoint_intact() {
        let data = tempfile::tempdir().unwrap();
        let out  = tempfile::tempdir().unwrap();
        fixtures::write_tree(data.path(), 3);
        let first = TrainConfig { epochs: 1, ..cpu_config(data.path(), out.path()) };
        TrainUseCase::new(first).execute().unwrap();

        let wider = TrainConfig { num_points: 32, epochs: 2, resume: true, ..cpu_config(data.path(), out.path()) };
        assert!(TrainUseCase::new(wider).execute().is_err());

        let ckpt = CheckpointManager::new(out.path());
        assert_eq!(ckpt.load_config().unwrap().num_points, 16);
        assert_eq!(ckpt.load_state().unwrap().unwrap().epoch, 1);

        let deeper = TrainConfig { hidden_sizes: vec![8, 8], resume: true, ..cpu_config(data.path(), out.path()) };
        assert!(TrainUseCase::new(deeper).execute().is_err());
        assert_eq!(ckpt.load_config().unwrap().hidden_sizes, vec![8]);
    }

    #[test]
    fn test_resume_with_corrupt_label_map_fails() {
        let data = tempfile::tempdir().unwrap();
        let out  = tempfile::tempdir().unwrap();
        fixtures::write_tree(data.path(), 3);
        TrainUseCase::new(TrainConfig { epochs: 1, ..cpu_config(data.path(), out.path()) }).execute().unwrap();

        fs::write(out.path().join("label_map.json"), "{ not json").unwrap();
        let resumed = TrainConfig { resume: true, ..cpu_config(data.path(), out.path()) };
        assert!(TrainUseCase::new(resumed).execute().is_err());
    }

    #[test]
    fn test_resume_with_other_categories_fails() {
        let data = tempfile::tempdir().unwrap();
        let out  = tempfile::tempdir().unwrap();
        fixtures::write_tree(data.path(), 3);
        TrainUseCase::new(TrainConfig { epochs: 1, ..cpu_config(data.path(), out.path()) }).execute().unwrap();

        fixtures::write_model(data.path(), "chair", "m0", fixtures::TETRA_OBJ);
        let resumed = TrainConfig { resume: true, ..cpu_config(data.path(), out.path()) };
        assert!(TrainUseCase::new(resumed).execute().is_err());
    }

    #[test]
    fn test_resume_continues_same_run() {
        let data = tempfile::tempdir().unwrap();
        let out  = tempfile::tempdir().unwrap();
        fixtures::write_tree(data.path(), 3);
        TrainUseCase::new(TrainConfig { epochs: 1, ..cpu_config(data.path(), out.path()) }).execute().unwrap();

        let resumed = TrainConfig { resume: true, ..cpu_config(data.path(), out.path()) };
        let summary = TrainUseCase::new(resumed).execute().unwrap();
        assert_eq!(summary.epochs_run, 1);
        assert_eq!(summary.last_epoch, 2);
    }
}
