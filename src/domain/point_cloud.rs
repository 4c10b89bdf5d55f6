// ============================================================
// Layer 3 - Point Cloud
// ============================================================
// A fixed-size set of 3D points sampled from a mesh surface.
// The model consumes it flattened as [x0, y0, z0, x1, y1, z1, ...]
// so point order is part of the input layout.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PointCloud {
    pub points: Vec<[f32; 3]>,
}

impl PointCloud {
    pub fn new(points: Vec<[f32; 3]>) -> Self {
        Self { points }
    }

    /// Rebuild a cloud from a flat xyz buffer.
    /// Returns None when the length is not a multiple of 3.
    pub fn from_flat(flat: &[f32]) -> Option<Self> {
        if flat.len() % 3 != 0 {
            return None;
        }
        let points = flat.chunks_exact(3).map(|p| [p[0], p[1], p[2]]).collect();
        Some(Self { points })
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Mean position, or None for an empty cloud.
    pub fn centroid(&self) -> Option<[f32; 3]> {
        if self.points.is_empty() {
            return None;
        }
        let n = self.points.len() as f32;
        let sum = self.points.iter().fold([0.0f32; 3], |acc, p| {
            [acc[0] + p[0], acc[1] + p[1], acc[2] + p[2]]
        });
        Some([sum[0] / n, sum[1] / n, sum[2] / n])
    }

    /// Points as x0, y0, z0, x1, ... (the model's input layout).
    pub fn flatten(&self) -> Vec<f32> {
        self.points.iter().flat_map(|p| p.iter().copied()).collect()
    }
}
