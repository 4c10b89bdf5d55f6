// ============================================================
// Layer 3 - Domain Layer
// ============================================================
// Plain structs and traits that describe the problem:
// meshes, point clouds, labels, records and predictions.
//
// Rules for this layer:
//   - no burn types
//   - no file I/O
//   - only data and the traits other layers implement

// Indexed triangle mesh
pub mod mesh;

// Fixed-size sampled point set
pub mod point_cloud;

// Category id <-> class index bijection
pub mod label_map;

// Mesh records, scan results and predictions
pub mod shape;

// Core abstractions (traits) that other layers implement
pub mod traits;
