// ============================================================
// Layer 6 - Label Names Store
// ============================================================
// Reads the label JSON that maps category folder ids to
// human-readable names. Two shapes are accepted:
//
//   { "02691156": "airplane", "03001627": "chair" }
//
//   [ { "synsetId": "02691156", "name": "airplane,aeroplane,plane", ... } ]
//
// The second is ShapeNet's taxonomy.json; only the first of the
// comma-separated synonyms is kept.

use anyhow::{Context, Result};
use std::{collections::BTreeMap, fs, path::Path};
use serde::Deserialize;

#[derive(Deserialize)]
struct TaxonomyEntry {
    #[serde(rename = "synsetId")]
    synset_id: String,
    name:      String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LabelNamesFile {
    Map(BTreeMap<String, String>),
    Taxonomy(Vec<TaxonomyEntry>),
}

/// Parse label names from JSON text.
pub fn parse_label_names(json: &str) -> Result<BTreeMap<String, String>> {
    let parsed: LabelNamesFile = serde_json::from_str(json)
        .context("Label names must be an id -> name object or a taxonomy list")?;

    Ok(match parsed {
        LabelNamesFile::Map(map) => map,
        LabelNamesFile::Taxonomy(entries) => entries
            .into_iter()
            .map(|e| {
                let name = e.name.split(',').next().unwrap_or_default().trim().to_string();
                (e.synset_id, name)
            })
            .collect(),
    })
}

/// Load label names from a file.
pub fn load_label_names(path: impl AsRef<Path>) -> Result<BTreeMap<String, String>> {
    let path = path.as_ref();
    let json = fs::read_to_string(path)
        .with_context(|| format!("Cannot read label names '{}'", path.display()))?;
    let names = parse_label_names(&json)
        .with_context(|| format!("Invalid label names file '{}'", path.display()))?;
    tracing::info!("Loaded {} label names from '{}'", names.len(), path.display());
    Ok(names)
}
