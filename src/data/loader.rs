// ============================================================
// Layer 4 - ShapeNet Directory Loader
// ============================================================
// Walks a ShapeNet-style data root:
//
//   <root>/
//     02691156/                      <- category directory
//       1a04e3eab45ca15dd86060f189eb133/   <- model directory
//         models/model_normalized.obj
//       ...
//     03001627/
//       ...
//
// Every category directory becomes one class. Indices follow
// the sorted directory names (see LabelMap). Model directories
// without the mesh file are skipped.
//
// Meshes are NOT read here. The scan only produces records;
// parsing and sampling happen when the dataset is built.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};

use crate::domain::{
    label_map::LabelMap,
    shape::{ShapeCatalog, ShapeRecord},
    traits::ShapeSource,
};

/// Location of the mesh inside each model directory.
pub const MESH_RELATIVE_PATH: &str = "models/model_normalized.obj";

pub struct ShapeNetLoader {
    root:             PathBuf,
    categories:       Option<Vec<String>>,
    max_per_category: Option<usize>,
    label_names:      BTreeMap<String, String>,
    label_map:        Option<LabelMap>,
}

impl ShapeNetLoader {
    /// Scan every category under `root`, without a cap.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root:             root.into(),
            categories:       None,
            max_per_category: None,
            label_names:      BTreeMap::new(),
            label_map:        None,
        }
    }

    /// Only keep these category directories.
    pub fn with_categories(mut self, categories: Option<Vec<String>>) -> Self {
        self.categories = categories;
        self
    }

    /// Keep at most `n` models per category (first n in sorted order).
    pub fn with_max_per_category(mut self, n: Option<usize>) -> Self {
        self.max_per_category = n;
        self
    }

    /// Human-readable names attached to the label map.
    pub fn with_label_names(mut self, names: BTreeMap<String, String>) -> Self {
        self.label_names = names;
        self
    }

    /// Reuse a label map from a previous run instead of building one.
    /// Categories the map does not know are skipped.
    pub fn with_label_map(mut self, label_map: LabelMap) -> Self {
        self.label_map = Some(label_map);
        self
    }

    fn category_dirs(&self) -> Result<Vec<String>> {
        let mut dirs = Vec::new();
        for entry in fs::read_dir(&self.root)
            .with_context(|| format!("Cannot read data root '{}'", self.root.display()))?
        {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                tracing::warn!("Skipping non UTF-8 directory '{}'", entry.path().display());
                continue;
            };
            if let Some(filter) = &self.categories {
                if !filter.contains(&name) {
                    continue;
                }
            }
            dirs.push(name);
        }
        dirs.sort();
        Ok(dirs)
    }

    fn model_meshes(&self, category_dir: &Path) -> Result<Vec<PathBuf>> {
        let mut model_dirs: Vec<PathBuf> = fs::read_dir(category_dir)
            .with_context(|| format!("Cannot read category '{}'", category_dir.display()))?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_dir())
            .collect();
        model_dirs.sort();

        let mut meshes = Vec::new();
        for dir in model_dirs {
            if self.max_per_category.is_some_and(|max| meshes.len() >= max) {
                break;
            }
            let mesh = dir.join(MESH_RELATIVE_PATH);
            if mesh.is_file() {
                meshes.push(mesh);
            } else {
                tracing::debug!("No mesh in '{}', skipping", dir.display());
            }
        }
        Ok(meshes)
    }
}

impl ShapeSource for ShapeNetLoader {
    fn load_all(&self) -> Result<ShapeCatalog> {
        if !self.root.is_dir() {
            bail!("Data root '{}' does not exist or is not a directory", self.root.display());
        }

        let dirs = self.category_dirs()?;
        let label_map = match &self.label_map {
            Some(map) => map.clone(),
            None => LabelMap::from_categories(dirs.iter().cloned())
                .with_names(self.label_names.clone()),
        };

        let mut records = Vec::new();
        for category in &dirs {
            let Some(label) = label_map.index_of(category) else {
                tracing::warn!("Category '{}' is not in the label map, skipping", category);
                continue;
            };
            let meshes = self.model_meshes(&self.root.join(category))?;
            tracing::debug!("Category '{}' (label {}): {} meshes", category, label, meshes.len());
            records.extend(meshes.into_iter().map(|path| ShapeRecord {
                path,
                category: category.clone(),
                label,
            }));
        }

        tracing::info!(
            "Scanned '{}': {} categories, {} meshes",
            self.root.display(),
            label_map.len(),
            records.len()
        );
        Ok(ShapeCatalog { label_map, records })
    }
}

// ─── Test Fixtures ────────────────────────────────────────────────────────────
// Shared by the loader, dataset and trainer tests: writes a tiny
// ShapeNet-style tree with one triangle or tetrahedron per model.
#[cfg(test)]
pub(crate) mod fixtures {
    use std::{fs, path::Path};

    use super::MESH_RELATIVE_PATH;

    pub const TRIANGLE_OBJ: &str = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";
    pub const TETRA_OBJ: &str =
        "v 0 0 0\nv 1 0 0\nv 0 1 0\nv 0 0 1\nf 1 3 2\nf 1 2 4\nf 1 4 3\nf 2 3 4\n";

    pub fn write_model(root: &Path, category: &str, model: &str, obj: &str) {
        let path = root.join(category).join(model).join(MESH_RELATIVE_PATH);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, obj).unwrap();
    }

    /// Two categories with `per_category` models each.
    pub fn write_tree(root: &Path, per_category: usize) {
        for i in 0..per_category {
            write_model(root, "plane", &format!("m{i}"), TRIANGLE_OBJ);
            write_model(root, "tetra", &format!("m{i}"), TETRA_OBJ);
        }
    }
}
