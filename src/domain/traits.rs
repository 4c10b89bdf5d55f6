// ============================================================
// Layer 3 - Core Traits (Abstractions)
// ============================================================
// The application layer talks to these traits, not to the
// concrete ShapeNet loader or the burn-backed predictor:
//   - ShapeNetLoader implements ShapeSource
//   - PredictUseCase implements ShapeClassifier

use std::path::Path;

use anyhow::Result;

use crate::domain::shape::{Prediction, ShapeCatalog};

// ─── ShapeSource ──────────────────────────────────────────────────────────────
/// Anything that can enumerate labelled meshes.
pub trait ShapeSource {
    /// Scan the source and return the label map plus every mesh record.
    fn load_all(&self) -> Result<ShapeCatalog>;
}

// ─── ShapeClassifier ──────────────────────────────────────────────────────────
/// Anything that can rank categories for a mesh file.
pub trait ShapeClassifier {
    /// Return at most `top_k` predictions, best first.
    /// Failures are reported as an empty result, never as a panic.
    fn classify(&self, mesh_path: &Path, top_k: usize) -> Vec<Prediction>;
}
