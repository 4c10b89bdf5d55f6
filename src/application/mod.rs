// ============================================================
// Layer 2 - Application / Use Cases
// ============================================================
// Workflow coordination only: each use case tells the data, ml
// and infra layers what to do, in order.
//
//   - No model math here (Layer 5)
//   - No printing here (Layer 1)
//   - No direct file formats here (Layers 4 and 6)

// The training workflow
pub mod train_use_case;

// Mesh classification with a trained model
pub mod predict_use_case;

// Checkpoint -> standalone bundle
pub mod export_use_case;

// Loss / accuracy of a trained model on a data root
pub mod evaluate_use_case;
