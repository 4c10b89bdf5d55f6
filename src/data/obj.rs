// ============================================================
// Layer 4 - Wavefront OBJ Reader
// ============================================================
// Reads the geometry subset of OBJ needed for sampling:
//
//   v  x y z [w]        vertex position (w ignored)
//   f  a b c ...        face; each corner is i, i/t, i//n or i/t/n
//
// Indices are 1-based. Negative indices count back from the
// most recently defined vertex (-1 = last). Polygons with more
// than three corners are fan-triangulated around the first
// corner. Every other statement (vt, vn, g, o, usemtl, mtllib,
// s, l, ...) is ignored.

use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

use nalgebra::Point3;

use crate::data::error::{MeshError, MeshResult};
use crate::domain::mesh::TriangleMesh;

/// Load and parse an OBJ file from disk.
pub fn load_obj(path: impl AsRef<Path>) -> MeshResult<TriangleMesh> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            MeshError::FileNotFound { path: path.to_path_buf() }
        } else {
            MeshError::Io(e)
        }
    })?;

    let mesh = parse_obj(BufReader::new(file))?;
    tracing::debug!(
        "Parsed '{}': {} vertices, {} triangles",
        path.display(),
        mesh.vertices.len(),
        mesh.faces.len()
    );
    Ok(mesh)
}

/// Parse OBJ text from any buffered reader.
pub fn parse_obj<R: BufRead>(reader: R) -> MeshResult<TriangleMesh> {
    let mut vertices: Vec<Point3<f32>> = Vec::new();
    // Faces keep their source line and the indices as written so
    // out-of-range corners can be reported once all vertices are known.
    let mut faces: Vec<(usize, [Corner; 3])> = Vec::new();

    for (i, line) in reader.lines().enumerate() {
        let line_no = i + 1;
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let mut tokens = line.split_whitespace();
        match tokens.next() {
            Some("v") => {
                let coords: Vec<f32> = tokens
                    .take(3)
                    .map(|t| {
                        t.parse::<f32>().map_err(|e| {
                            MeshError::malformed(line_no, format!("bad coordinate '{t}': {e}"))
                        })
                    })
                    .collect::<MeshResult<_>>()?;
                if coords.len() < 3 {
                    return Err(MeshError::malformed(line_no, "vertex needs 3 coordinates"));
                }
                vertices.push(Point3::new(coords[0], coords[1], coords[2]));
            }
            Some("f") => {
                let corners: Vec<Corner> = tokens
                    .map(|t| resolve_index(t, vertices.len(), line_no))
                    .collect::<MeshResult<_>>()?;
                if corners.len() < 3 {
                    return Err(MeshError::malformed(line_no, "face needs at least 3 corners"));
                }
                for k in 1..corners.len() - 1 {
                    faces.push((line_no, [corners[0], corners[k], corners[k + 1]]));
                }
            }
            _ => {}
        }
    }

    if vertices.is_empty() {
        return Err(MeshError::Empty);
    }

    let count = vertices.len();
    let faces = faces
        .into_iter()
        .map(|(line, face)| {
            let mut out = [0u32; 3];
            for (slot, corner) in out.iter_mut().zip(face.iter()) {
                if corner.resolved < 0 || corner.resolved as usize >= count {
                    return Err(MeshError::IndexOutOfRange { line, index: corner.written, count });
                }
                *slot = corner.resolved as u32;
            }
            Ok(out)
        })
        .collect::<MeshResult<Vec<_>>>()?;

    Ok(TriangleMesh::new(vertices, faces))
}

/// A face corner: the index as written in the file and the 0-based
/// vertex it points at (possibly out of range).
#[derive(Debug, Clone, Copy)]
struct Corner {
    written:  i64,
    resolved: i64,
}

/// Turn one face corner ("7", "7/2", "7//3", "-1/2/3") into a
/// 0-based vertex index. Range is checked by the caller.
fn resolve_index(token: &str, defined: usize, line: usize) -> MeshResult<Corner> {
    let raw = token.split('/').next().unwrap_or_default();
    let index: i64 = raw
        .parse()
        .map_err(|_| MeshError::malformed(line, format!("bad face index '{token}'")))?;

    let resolved = match index {
        0 => return Err(MeshError::malformed(line, "face index 0 is not valid in OBJ")),
        i if i > 0 => i - 1,
        i => defined as i64 + i,
    };
    Ok(Corner { written: index, resolved })
}
