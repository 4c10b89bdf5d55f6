// ============================================================
// Layer 6 - Infrastructure Layer
// ============================================================
// Cross-cutting persistence used by several other layers:
//
//   checkpoint.rs  - epoch checkpoints (model + optimizer +
//                    checkpoint.json), best model, training
//                    config and label map
//
//   export.rs      - self-contained inference bundle
//
//   label_store.rs - human-readable category names from the
//                    label JSON file
//
//   metrics.rs     - per-epoch CSV log

/// Model/optimizer checkpoint saving and loading
pub mod checkpoint;

/// Exported whole-model bundle
pub mod export;

/// Category id -> display name file
pub mod label_store;

/// Training metrics CSV logger
pub mod metrics;
