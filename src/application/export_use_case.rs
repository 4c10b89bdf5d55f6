// ============================================================
// Layer 2 - ExportUseCase
// ============================================================
// Turns a training checkpoint directory into a standalone
// inference bundle: the best model (or latest epoch), its
// architecture, the label map and the sampling settings.

use anyhow::Result;
use std::path::PathBuf;

use crate::infra::{
    checkpoint::CheckpointManager,
    export::{export_bundle, BundleManifest},
};
use crate::ml::{backend::NdArrayBackend, inferencer::Inferencer};

pub struct ExportUseCase {
    checkpoint_dir: PathBuf,
    out_dir:        PathBuf,
}

impl ExportUseCase {
    pub fn new(checkpoint_dir: impl Into<PathBuf>, out_dir: impl Into<PathBuf>) -> Self {
        Self { checkpoint_dir: checkpoint_dir.into(), out_dir: out_dir.into() }
    }

    /// Write `bundle.json` and the weights into `out_dir`.
    /// Returns the manifest that was written.
    pub fn execute(&self) -> Result<BundleManifest> {
        // Weights are backend independent, the CPU backend is enough here
        let ckpt_manager = CheckpointManager::new(&self.checkpoint_dir);
        let inferencer   = Inferencer::<NdArrayBackend>::from_checkpoint(&ckpt_manager, Default::default())?;

        let manifest = BundleManifest {
            model:     inferencer.model_config().clone(),
            labels:    inferencer.label_map().clone(),
            normalize: inferencer.normalize(),
            seed:      inferencer.seed(),
        };
        export_bundle(inferencer.model(), &manifest, &self.out_dir)?;
        Ok(manifest)
    }
}
