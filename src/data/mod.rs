// ============================================================
// Layer 4 - Data Pipeline
// ============================================================
// Everything from a data root on disk to tensor batches:
//
//   <root>/<category>/<model>/models/model_normalized.obj
//       │
//       ▼
//   ShapeNetLoader     → scans directories, builds the label map
//       │
//       ▼
//   obj::load_obj      → parses the mesh
//       │
//       ▼
//   PointSampler       → area-weighted surface sampling
//       │
//       ▼
//   preprocessor       → centre + unit-sphere normalisation
//       │
//       ▼
//   ShapeDataset       → implements Burn's Dataset trait
//       │
//       ▼
//   PointCloudBatcher  → stacks samples into tensor batches
//       │
//       ▼
//   DataLoader         → feeds batches to the training loop

/// Typed mesh reading/sampling errors
pub mod error;

/// Wavefront OBJ reader
pub mod obj;

/// Surface point sampling
pub mod sampler;

/// Point cloud normalisation
pub mod preprocessor;

/// Directory walk over a ShapeNet-style data root
pub mod loader;

/// Implements Burn's Dataset trait for sampled shapes
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;

/// Shuffles and splits data into train/validation sets
pub mod splitter;
