// ============================================================
// Layer 5 - ML / Model Layer (Burn)
// ============================================================
// Model architecture, backend choice, the training loop and
// inference. Persistence of records lives in infra; this layer
// decides what gets trained and how.
//
//   model.rs      - PointCloudClassifier: flattened cloud ->
//                   [Linear -> ReLU -> Dropout]* -> Linear
//
//   backend.rs    - wgpu / ndarray selection and type aliases
//
//   trainer.rs    - train + validation loop, checkpoint per
//                   epoch, best model, early stopping, resume
//
//   inferencer.rs - rebuilds a model from a checkpoint dir or
//                   an exported bundle and ranks categories

/// Feed-forward point cloud classifier
pub mod model;

/// Backend selection
pub mod backend;

/// Full training loop with validation and checkpointing
pub mod trainer;

/// Inference engine
pub mod inferencer;
