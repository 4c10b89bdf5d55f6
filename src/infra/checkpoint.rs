// ============================================================
// Layer 6 - Checkpoint Manager
// ============================================================
// Saves and restores training state with Burn's file recorders.
//
// What gets saved per epoch:
//   1. model_epoch_{n}.mpk.gz  - model parameters (state_dict)
//   2. optim_epoch_{n}.mpk.gz  - Adam moments per parameter
//   3. checkpoint.json         - CheckpointState: epoch, the two
//                                record names, best_val_loss
//
// Alongside, once per run or on improvement:
//   best_model.mpk.gz          - weights with the lowest val loss
//   train_config.json          - hyperparameters / architecture
//   label_map.json             - category <-> index mapping
//
// checkpoint.json is written to a temp file and renamed, so a
// crash mid-save leaves the previous pointer intact.
//
// Checkpoint records use full precision so a resumed run
// continues from exactly the saved parameters.

use anyhow::{Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};
use burn::{
    module::AutodiffModule,
    optim::Optimizer,
    prelude::*,
    record::{FullPrecisionSettings, NamedMpkGzFileRecorder, Recorder},
    tensor::backend::AutodiffBackend,
};
use serde::{Deserialize, Serialize};

use crate::application::train_use_case::TrainConfig;
use crate::domain::label_map::LabelMap;
use crate::ml::model::PointCloudClassifier;

type CheckpointRecorder = NamedMpkGzFileRecorder<FullPrecisionSettings>;

const STATE_FILE:     &str = "checkpoint.json";
const CONFIG_FILE:    &str = "train_config.json";
const LABEL_MAP_FILE: &str = "label_map.json";
const BEST_MODEL:     &str = "best_model";
const RECORD_EXT:     &str = "mpk.gz";

/// Pointer to the latest saved epoch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointState {
    /// Last completed epoch (1-based)
    pub epoch: usize,

    /// Record name of the model parameters, relative to the checkpoint dir
    pub state_dict: String,

    /// Record name of the optimizer state, relative to the checkpoint dir
    pub optimizer: String,

    /// Lowest validation loss seen so far; None until one is finite
    pub best_val_loss: Option<f64>,

    /// Epoch that produced best_val_loss
    #[serde(default)]
    pub best_epoch: Option<usize>,
}

/// Manages saving and loading of checkpoints in one directory.
pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Nothing is created on disk until the first save.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create checkpoint dir '{}'", self.dir.display()))
    }

    fn record_path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    fn record_exists(&self, name: &str) -> bool {
        self.dir.join(format!("{name}.{RECORD_EXT}")).is_file()
    }

    // ─── Epoch checkpoints ────────────────────────────────────────────────────

    /// Save model and optimizer for `epoch` and move the checkpoint
    /// pointer to it.
    pub fn save<B, O>(
        &self,
        epoch:         usize,
        model:         &PointCloudClassifier<B>,
        optim:         &O,
        best_val_loss: Option<f64>,
        best_epoch:    Option<usize>,
    ) -> Result<CheckpointState>
    where
        B: AutodiffBackend,
        O: Optimizer<PointCloudClassifier<B>, B>,
    {
        self.ensure_dir()?;
        let recorder = CheckpointRecorder::new();

        let state = CheckpointState {
            epoch,
            state_dict: format!("model_epoch_{epoch}"),
            optimizer:  format!("optim_epoch_{epoch}"),
            best_val_loss,
            best_epoch,
        };

        let model_path = self.record_path(&state.state_dict);
        Recorder::<B>::record(&recorder, model.clone().into_record(), model_path.clone())
            .with_context(|| format!("Failed to save model to '{}'", model_path.display()))?;

        let optim_path = self.record_path(&state.optimizer);
        Recorder::<B>::record(&recorder, optim.to_record(), optim_path.clone())
            .with_context(|| format!("Failed to save optimizer to '{}'", optim_path.display()))?;

        self.write_state(&state)?;
        tracing::debug!("Saved checkpoint: epoch {}", epoch);
        Ok(state)
    }

    fn write_state(&self, state: &CheckpointState) -> Result<()> {
        let path = self.dir.join(STATE_FILE);
        let tmp  = self.dir.join(format!("{STATE_FILE}.tmp"));
        fs::write(&tmp, serde_json::to_string_pretty(state)?)
            .with_context(|| format!("Cannot write '{}'", tmp.display()))?;
        fs::rename(&tmp, &path)
            .with_context(|| format!("Cannot replace '{}'", path.display()))?;
        Ok(())
    }

    /// Read the checkpoint pointer.
    ///
    /// A missing checkpoint is not an error: it is logged and None is
    /// returned so callers can start from scratch.
    pub fn load_state(&self) -> Result<Option<CheckpointState>> {
        let path = self.dir.join(STATE_FILE);
        if !path.is_file() {
            tracing::warn!("No checkpoint found at '{}'", path.display());
            return Ok(None);
        }

        let json = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read '{}'", path.display()))?;
        let state = serde_json::from_str(&json)
            .with_context(|| format!("Corrupt checkpoint pointer '{}'", path.display()))?;
        Ok(Some(state))
    }

    /// Restore model parameters recorded in `state`.
    pub fn load_model<B: Backend>(
        &self,
        model:  PointCloudClassifier<B>,
        state:  &CheckpointState,
        device: &B::Device,
    ) -> Result<PointCloudClassifier<B>> {
        self.load_model_record(model, &state.state_dict, device)
    }

    fn load_model_record<B: Backend>(
        &self,
        model:  PointCloudClassifier<B>,
        name:   &str,
        device: &B::Device,
    ) -> Result<PointCloudClassifier<B>> {
        let path = self.record_path(name);
        let record = Recorder::<B>::load(&CheckpointRecorder::new(), path.clone(), device)
            .with_context(|| {
                format!("Cannot load model '{}'. Does it match the saved config?", path.display())
            })?;
        model
            .load_record_checked(record)
            .with_context(|| format!("Model '{}' does not match the saved config", path.display()))
    }

    /// Restore optimizer state recorded in `state`.
    pub fn load_optimizer<B, O>(
        &self,
        optim:  O,
        state:  &CheckpointState,
        device: &B::Device,
    ) -> Result<O>
    where
        B: AutodiffBackend,
        O: Optimizer<PointCloudClassifier<B>, B>,
    {
        let path = self.record_path(&state.optimizer);
        let record: O::Record = Recorder::<B>::load(&CheckpointRecorder::new(), path.clone(), device)
            .with_context(|| format!("Cannot load optimizer state '{}'", path.display()))?;
        Ok(optim.load_record(record))
    }

    // ─── Best model ───────────────────────────────────────────────────────────

    /// Save the current weights as the best model so far. Only the
    /// inner (non-autodiff) module is recorded.
    pub fn save_best<B: AutodiffBackend>(&self, model: &PointCloudClassifier<B>) -> Result<()> {
        self.ensure_dir()?;
        let path = self.record_path(BEST_MODEL);
        Recorder::<B::InnerBackend>::record(
            &CheckpointRecorder::new(),
            model.valid().into_record(),
            path.clone(),
        )
        .with_context(|| format!("Failed to save best model to '{}'", path.display()))?;
        Ok(())
    }

    /// True once a best model has been saved.
    pub fn has_best(&self) -> bool {
        self.record_exists(BEST_MODEL)
    }

    /// Weights for inference: the best model when one was saved,
    /// otherwise the latest epoch.
    pub fn load_inference_model<B: Backend>(
        &self,
        model:  PointCloudClassifier<B>,
        device: &B::Device,
    ) -> Result<PointCloudClassifier<B>> {
        if self.has_best() {
            tracing::info!("Loading best model from '{}'", self.dir.display());
            return self.load_model_record(model, BEST_MODEL, device);
        }
        match self.load_state()? {
            Some(state) => {
                tracing::info!("No best model saved, loading epoch {}", state.epoch);
                self.load_model(model, &state, device)
            }
            None => anyhow::bail!(
                "No trained model in '{}'. Have you run 'train' first?",
                self.dir.display()
            ),
        }
    }

    // ─── Config and labels ────────────────────────────────────────────────────

    /// Save the training configuration so inference can rebuild the
    /// same architecture.
    pub fn save_config(&self, cfg: &TrainConfig) -> Result<()> {
        self.ensure_dir()?;
        let path = self.dir.join(CONFIG_FILE);
        fs::write(&path, serde_json::to_string_pretty(cfg)?)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;
        tracing::debug!("Saved training config to '{}'", path.display());
        Ok(())
    }

    /// True once a training run has written its config here.
    pub fn has_config(&self) -> bool {
        self.dir.join(CONFIG_FILE).is_file()
    }

    /// Read back the config saved by `save_config`.
    pub fn load_config(&self) -> Result<TrainConfig> {
        let path = self.dir.join(CONFIG_FILE);
        let json = fs::read_to_string(&path).with_context(|| {
            format!(
                "Cannot read config from '{}'. Make sure you have run 'train' first.",
                path.display()
            )
        })?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Persist the category <-> index mapping used for training.
    pub fn save_label_map(&self, label_map: &LabelMap) -> Result<()> {
        self.ensure_dir()?;
        let path = self.dir.join(LABEL_MAP_FILE);
        fs::write(&path, serde_json::to_string_pretty(label_map)?)
            .with_context(|| format!("Cannot write label map to '{}'", path.display()))?;
        Ok(())
    }

    /// True if a label map was saved, whether or not it parses.
    pub fn has_label_map(&self) -> bool {
        self.dir.join(LABEL_MAP_FILE).is_file()
    }

    /// Read back the label map. A file that exists but does not
    /// parse is an error.
    pub fn load_label_map(&self) -> Result<LabelMap> {
        let path = self.dir.join(LABEL_MAP_FILE);
        let json = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read label map from '{}'", path.display()))?;
        serde_json::from_str(&json)
            .with_context(|| format!("Invalid label map '{}'", path.display()))
    }
}
