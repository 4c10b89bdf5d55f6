// ============================================================
// Layer 6 - Exported Model Bundle
// ============================================================
// A self-contained directory for inference, independent of the
// training checkpoint layout:
//
//   <out>/
//     bundle.json   - architecture, label map, preprocessing
//     model.bin     - full-precision weights (BinFileRecorder)
//
// Everything needed to classify a mesh is in the bundle: the
// sampler settings come from bundle.json so predictions use
// the same input preparation as training did.

use anyhow::{Context, Result};
use std::{fs, path::Path};
use burn::{
    prelude::*,
    record::{BinFileRecorder, FullPrecisionSettings, Recorder},
};
use serde::{Deserialize, Serialize};

use crate::domain::label_map::LabelMap;
use crate::ml::model::{PointCloudClassifier, PointCloudClassifierConfig};

const MANIFEST_FILE: &str = "bundle.json";
const WEIGHTS_NAME:  &str = "model";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundleManifest {
    pub model:     PointCloudClassifierConfig,
    pub labels:    LabelMap,
    /// Whether clouds are centred and scaled to the unit sphere
    pub normalize: bool,
    /// Seed for point sampling at prediction time
    pub seed:      u64,
}

/// True if `dir` looks like an exported bundle.
pub fn is_bundle(dir: impl AsRef<Path>) -> bool {
    dir.as_ref().join(MANIFEST_FILE).is_file()
}

/// Write the manifest and weights into `out_dir`.
pub fn export_bundle<B: Backend>(
    model:    &PointCloudClassifier<B>,
    manifest: &BundleManifest,
    out_dir:  impl AsRef<Path>,
) -> Result<()> {
    let out_dir = out_dir.as_ref();
    fs::create_dir_all(out_dir)
        .with_context(|| format!("Cannot create export dir '{}'", out_dir.display()))?;

    let manifest_path = out_dir.join(MANIFEST_FILE);
    fs::write(&manifest_path, serde_json::to_string_pretty(manifest)?)
        .with_context(|| format!("Cannot write '{}'", manifest_path.display()))?;

    let weights_path = out_dir.join(WEIGHTS_NAME);
    Recorder::<B>::record(
        &BinFileRecorder::<FullPrecisionSettings>::new(),
        model.clone().into_record(),
        weights_path.clone(),
    )
    .with_context(|| format!("Cannot write weights to '{}'", weights_path.display()))?;

    tracing::info!("Exported model bundle to '{}'", out_dir.display());
    Ok(())
}

/// Read `bundle.json` without touching the weights.
pub fn load_manifest(dir: impl AsRef<Path>) -> Result<BundleManifest> {
    let path = dir.as_ref().join(MANIFEST_FILE);
    let json = fs::read_to_string(&path)
        .with_context(|| format!("Cannot read bundle manifest '{}'", path.display()))?;
    serde_json::from_str(&json)
        .with_context(|| format!("Invalid bundle manifest '{}'", path.display()))
}

/// Rebuild the model described by the bundle and load its weights.
pub fn load_bundle<B: Backend>(
    dir:    impl AsRef<Path>,
    device: &B::Device,
) -> Result<(PointCloudClassifier<B>, BundleManifest)> {
    let dir      = dir.as_ref();
    let manifest = load_manifest(dir)?;
    let model    = manifest.model.init::<B>(device);

    let weights_path = dir.join(WEIGHTS_NAME);
    let record = Recorder::<B>::load(
        &BinFileRecorder::<FullPrecisionSettings>::new(),
        weights_path.clone(),
        device,
    )
    .with_context(|| format!("Cannot load weights '{}'", weights_path.display()))?;

    let model = model
        .load_record_checked(record)
        .with_context(|| format!("Weights '{}' do not match bundle.json", weights_path.display()))?;
    Ok((model, manifest))
}
