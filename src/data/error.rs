// ============================================================
// Layer 4 - Mesh Errors
// ============================================================
// Typed failures for reading and sampling meshes. Everything
// above the data layer converts these into anyhow::Error with
// file context attached.

use std::path::PathBuf;

use thiserror::Error;

pub type MeshResult<T> = Result<T, MeshError>;

#[derive(Debug, Error)]
pub enum MeshError {
    #[error("mesh file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("malformed OBJ at line {line}: {message}")]
    Malformed { line: usize, message: String },

    #[error("face at line {line} references vertex {index}, but only {count} vertices are defined")]
    IndexOutOfRange { line: usize, index: i64, count: usize },

    #[error("mesh has no vertices")]
    Empty,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl MeshError {
    /// Shorthand for a `Malformed` error at `line`.
    pub fn malformed(line: usize, message: impl Into<String>) -> Self {
        Self::Malformed { line, message: message.into() }
    }
}
