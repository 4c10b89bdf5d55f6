// ============================================================
// Layer 4 - Surface Point Sampler
// ============================================================
// Turns a triangle mesh into a fixed-size point cloud.
//
// Sampling is uniform over the surface:
//   1. pick a triangle with probability proportional to its area
//   2. pick a point inside it with uniform barycentric weights
//      (r1 = sqrt(u), r2 = v:
//       p = (1 - r1)a + r1(1 - r2)b + r1 r2 c)
//
// Meshes whose faces all have zero area (point sets, lines, or
// files with vertices but no faces) fall back to drawing
// vertices uniformly, so every mesh with at least one vertex
// yields exactly `num_points` points.

use rand::{
    distributions::{Distribution, WeightedIndex},
    rngs::StdRng,
    Rng, SeedableRng,
};

use crate::data::error::{MeshError, MeshResult};
use crate::domain::{mesh::TriangleMesh, point_cloud::PointCloud};

#[derive(Debug, Clone, Copy)]
pub struct PointSampler {
    num_points: usize,
}

impl PointSampler {
    pub fn new(num_points: usize) -> Self {
        Self { num_points }
    }

    pub fn num_points(&self) -> usize {
        self.num_points
    }

    /// Sample with a fresh RNG seeded from `seed`.
    /// The same mesh and seed always give the same cloud.
    pub fn sample_seeded(&self, mesh: &TriangleMesh, seed: u64) -> MeshResult<PointCloud> {
        let mut rng = StdRng::seed_from_u64(seed);
        self.sample(mesh, &mut rng)
    }

    /// Draw `num_points` points uniformly over the surface: a face is
    /// picked with probability proportional to its area, then a point
    /// inside it from two uniform numbers.
    pub fn sample<R: Rng>(&self, mesh: &TriangleMesh, rng: &mut R) -> MeshResult<PointCloud> {
        if mesh.is_empty() {
            return Err(MeshError::Empty);
        }

        let areas = mesh.triangle_areas();
        let points = match WeightedIndex::new(&areas) {
            Ok(dist) => (0..self.num_points)
                .map(|_| {
                    let [a, b, c] = mesh.triangle(dist.sample(rng));
                    let r1 = rng.gen::<f32>().sqrt();
                    let r2 = rng.gen::<f32>();
                    let p = a.coords * (1.0 - r1) + b.coords * (r1 * (1.0 - r2)) + c.coords * (r1 * r2);
                    [p.x, p.y, p.z]
                })
                .collect(),
            Err(_) => {
                tracing::debug!(
                    "Mesh has no positive-area faces ({} faces), sampling vertices",
                    mesh.faces.len()
                );
                (0..self.num_points)
                    .map(|_| {
                        let v = mesh.vertices[rng.gen_range(0..mesh.vertices.len())];
                        [v.x, v.y, v.z]
                    })
                    .collect()
            }
        };

        Ok(PointCloud::new(points))
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point3;

    fn unit_triangle() -> TriangleMesh {
        TriangleMesh::new(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ],
            vec![[0, 1, 2]],
        )
    }

    #[test]
    fn test_exact_point_count() {
        let cloud = PointSampler::new(256).sample_seeded(&unit_triangle(), 7).unwrap();
        assert_eq!(cloud.len(), 256);
    }

    #[test]
    fn test_points_lie_on_the_triangle() {
        let cloud = PointSampler::new(500).sample_seeded(&unit_triangle(), 1).unwrap();
        for [x, y, z] in cloud.points {
            assert!(x >= -1e-6 && y >= -1e-6);
            assert!(x + y <= 1.0 + 1e-5);
            assert_eq!(z, 0.0);
        }
    }

    #[test]
    fn test_same_seed_same_cloud() {
        let sampler = PointSampler::new(64);
        let a = sampler.sample_seeded(&unit_triangle(), 3).unwrap();
        let b = sampler.sample_seeded(&unit_triangle(), 3).unwrap();
        let c = sampler.sample_seeded(&unit_triangle(), 4).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_zero_area_faces_are_never_picked() {
        // second face is degenerate and far away
        let mesh = TriangleMesh::new(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
                Point3::new(10.0, 10.0, 10.0),
            ],
            vec![[0, 1, 2], [3, 3, 3]],
        );
        let cloud = PointSampler::new(200).sample_seeded(&mesh, 9).unwrap();
        assert!(cloud.points.iter().all(|p| p[2] == 0.0));
    }

    #[test]
    fn test_falls_back_to_vertices() {
        let mesh = TriangleMesh::new(vec![Point3::new(2.0, 3.0, 4.0)], Vec::new());
        let cloud = PointSampler::new(10).sample_seeded(&mesh, 0).unwrap();
        assert_eq!(cloud.len(), 10);
        assert!(cloud.points.iter().all(|p| *p == [2.0, 3.0, 4.0]));
    }

    #[test]
    fn test_empty_mesh_is_an_error() {
        let err = PointSampler::new(10).sample_seeded(&TriangleMesh::default(), 0);
        assert!(matches!(err, Err(MeshError::Empty)));
    }
}
