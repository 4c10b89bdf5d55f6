use std::path::Path;

use anyhow::{Context, Result};
use burn::data::dataset::Dataset;
use serde::{Deserialize, Serialize};

use crate::data::{obj::load_obj, preprocessor::normalize, sampler::PointSampler};
use crate::domain::{point_cloud::PointCloud, shape::ShapeRecord};

/// One sampled and flattened mesh with its class index.
/// `points` holds num_points * 3 floats: x0, y0, z0, x1, ...
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShapeSample {
    pub points: Vec<f32>,
    pub label:  usize,
}

impl ShapeSample {
    pub fn num_points(&self) -> usize {
        self.points.len() / 3
    }
}

/// Read a mesh, sample it and optionally normalise the cloud.
/// Training and inference both go through here so they see
/// identically prepared inputs.
pub fn load_point_cloud(
    path:            &Path,
    sampler:         &PointSampler,
    normalize_cloud: bool,
    seed:            u64,
) -> Result<PointCloud> {
    let mesh = load_obj(path).with_context(|| format!("Cannot load mesh '{}'", path.display()))?;
    let mut cloud = sampler
        .sample_seeded(&mesh, seed)
        .with_context(|| format!("Cannot sample mesh '{}'", path.display()))?;
    if normalize_cloud {
        normalize(&mut cloud);
    }
    Ok(cloud)
}

pub struct ShapeDataset {
    samples: Vec<ShapeSample>,
}

impl ShapeDataset {
    pub fn new(samples: Vec<ShapeSample>) -> Self { Self { samples } }

    /// Sample every record once. Record `i` uses seed `seed + i`, so a
    /// rebuild over the same records reproduces the same clouds.
    /// Meshes that fail to load are logged and left out.
    pub fn build(
        records:         &[ShapeRecord],
        sampler:         &PointSampler,
        normalize_cloud: bool,
        seed:            u64,
    ) -> Self {
        let mut samples = Vec::with_capacity(records.len());
        let mut skipped = 0usize;

        for (i, record) in records.iter().enumerate() {
            match load_point_cloud(&record.path, sampler, normalize_cloud, seed.wrapping_add(i as u64)) {
                Ok(cloud) => samples.push(ShapeSample { points: cloud.flatten(), label: record.label }),
                Err(e) => {
                    skipped += 1;
                    tracing::warn!("Skipping '{}': {:#}", record.path.display(), e);
                }
            }
            if (i + 1) % 500 == 0 {
                tracing::info!("Sampled {}/{} meshes", i + 1, records.len());
            }
        }

        if skipped > 0 {
            tracing::warn!("{} of {} meshes could not be sampled", skipped, records.len());
        }
        Self { samples }
    }

    pub fn sample_count(&self) -> usize { self.samples.len() }

    pub fn into_samples(self) -> Vec<ShapeSample> { self.samples }
}

impl Dataset<ShapeSample> for ShapeDataset {
    fn get(&self, index: usize) -> Option<ShapeSample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::{fixtures, ShapeNetLoader};
    use crate::domain::traits::ShapeSource;

    #[test]
    fn test_build_samples_every_mesh() {
        let dir = tempfile::tempdir().unwrap();
        fixtures::write_tree(dir.path(), 2);
        let catalog = ShapeNetLoader::new(dir.path()).load_all().unwrap();

        let dataset = ShapeDataset::build(&catalog.records, &PointSampler::new(32), true, 42);
        assert_eq!(dataset.len(), 4);
        for i in 0..dataset.len() {
            let s = dataset.get(i).unwrap();
            assert_eq!(s.points.len(), 32 * 3);
            assert_eq!(s.num_points(), 32);
        }
        assert!(dataset.get(4).is_none());
    }

    #[test]
    fn test_build_is_reproducible() {
        let dir = tempfile::tempdir().unwrap();
        fixtures::write_tree(dir.path(), 1);
        let catalog = ShapeNetLoader::new(dir.path()).load_all().unwrap();

        let a = ShapeDataset::build(&catalog.records, &PointSampler::new(16), false, 5);
        let b = ShapeDataset::build(&catalog.records, &PointSampler::new(16), false, 5);
        assert_eq!(a.get(0).unwrap().points, b.get(0).unwrap().points);
    }

    #[test]
    fn test_broken_meshes_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        fixtures::write_tree(dir.path(), 1);
        fixtures::write_model(dir.path(), "plane", "broken", "v 0 0\n");
        let catalog = ShapeNetLoader::new(dir.path()).load_all().unwrap();
        assert_eq!(catalog.records.len(), 3);

        let dataset = ShapeDataset::build(&catalog.records, &PointSampler::new(8), true, 0);
        assert_eq!(dataset.len(), 2);
    }
}
