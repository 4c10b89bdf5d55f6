// ============================================================
// Layer 3 - Triangle Mesh
// ============================================================
// Indexed triangle mesh as read from an OBJ file. Polygons are
// already fan-triangulated by the parser, so every face is a
// triple of vertex indices.

use nalgebra::Point3;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TriangleMesh {
    pub vertices: Vec<Point3<f32>>,
    pub faces:    Vec<[u32; 3]>,
}

impl TriangleMesh {
    pub fn new(vertices: Vec<Point3<f32>>, faces: Vec<[u32; 3]>) -> Self {
        Self { vertices, faces }
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Corner positions of face `i`. Indices were validated at parse time.
    pub fn triangle(&self, i: usize) -> [Point3<f32>; 3] {
        let [a, b, c] = self.faces[i];
        [
            self.vertices[a as usize],
            self.vertices[b as usize],
            self.vertices[c as usize],
        ]
    }

    /// Area of every face, in face order.
    pub fn triangle_areas(&self) -> Vec<f32> {
        (0..self.faces.len())
            .map(|i| {
                let [a, b, c] = self.triangle(i);
                (b - a).cross(&(c - a)).norm() * 0.5
            })
            .collect()
    }

    /// Sum of all face areas.
    pub fn surface_area(&self) -> f32 {
        self.triangle_areas().iter().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_square() -> TriangleMesh {
        TriangleMesh::new(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(1.0, 1.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ],
            vec![[0, 1, 2], [0, 2, 3]],
        )
    }

    #[test]
    fn test_triangle_areas() {
        let areas = unit_square().triangle_areas();
        assert_eq!(areas.len(), 2);
        assert!((areas[0] - 0.5).abs() < 1e-6);
        assert!((areas[1] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_surface_area() {
        assert!((unit_square().surface_area() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_degenerate_face_has_zero_area() {
        let mesh = TriangleMesh::new(
            vec![Point3::origin(), Point3::new(1.0, 0.0, 0.0), Point3::new(2.0, 0.0, 0.0)],
            vec![[0, 1, 2]],
        );
        assert_eq!(mesh.surface_area(), 0.0);
    }
}
