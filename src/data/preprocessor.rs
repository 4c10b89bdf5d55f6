// ============================================================
// Layer 4 - Point Cloud Preprocessor
// ============================================================
// Brings every sampled cloud into the same frame before it is
// flattened into a model input:
//
//   1. translate so the centroid sits at the origin
//   2. scale so the farthest point lies on the unit sphere
//
// ShapeNet's model_normalized.obj files are already roughly
// centred, but meshes passed to `predict` may come from
// anywhere, so inference applies the same step as training.

use crate::domain::point_cloud::PointCloud;

/// Centre the cloud and scale it into the unit sphere in place.
/// A cloud whose points all coincide is only centred.
pub fn normalize(cloud: &mut PointCloud) {
    let Some(c) = cloud.centroid() else {
        return;
    };

    let mut max_radius = 0.0f32;
    for p in &mut cloud.points {
        p[0] -= c[0];
        p[1] -= c[1];
        p[2] -= c[2];
        max_radius = max_radius.max((p[0] * p[0] + p[1] * p[1] + p[2] * p[2]).sqrt());
    }

    if max_radius > f32::EPSILON {
        for p in &mut cloud.points {
            p[0] /= max_radius;
            p[1] /= max_radius;
            p[2] /= max_radius;
        }
    }
}
