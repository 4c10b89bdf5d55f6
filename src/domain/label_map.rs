// ============================================================
// Layer 3 - Label Map
// ============================================================
// Bijection between category directory names (e.g. ShapeNet
// synset ids such as "02691156") and class indices 0..N.
//
// Indices follow the sorted directory listing, so the same
// data root always produces the same mapping regardless of the
// order the filesystem returns entries in.
//
// Human-readable names ("airplane") are optional metadata
// attached from the label JSON file. They never affect indices.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

/// Category id <-> class index mapping plus optional display names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelMap {
    /// categories[i] is the category id of class i
    categories: Vec<String>,

    /// category id -> human-readable name
    #[serde(default)]
    names: BTreeMap<String, String>,

    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl LabelMap {
    /// Build a label map from category ids.
    /// Ids are sorted and deduplicated before indices are assigned.
    pub fn from_categories<I, S>(categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut categories: Vec<String> = categories.into_iter().map(Into::into).collect();
        categories.sort();
        categories.dedup();

        let index = build_index(&categories);
        Self { categories, names: BTreeMap::new(), index }
    }

    /// Attach human-readable names. Names for ids that are not
    /// part of this map are dropped.
    pub fn with_names(mut self, names: BTreeMap<String, String>) -> Self {
        self.names = names
            .into_iter()
            .filter(|(id, _)| self.index.contains_key(id))
            .collect();
        self
    }

    /// Class index of a category id.
    pub fn index_of(&self, category: &str) -> Option<usize> {
        self.index.get(category).copied()
    }

    /// Category id of a class index.
    pub fn category(&self, index: usize) -> Option<&str> {
        self.categories.get(index).map(String::as_str)
    }

    /// Human-readable name for a class, falling back to the category id.
    pub fn display_name(&self, index: usize) -> Option<&str> {
        let category = self.category(index)?;
        Some(self.names.get(category).map_or(category, String::as_str))
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Iterate (index, category id) pairs in index order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> {
        self.categories.iter().enumerate().map(|(i, c)| (i, c.as_str()))
    }
}

fn build_index(categories: &[String]) -> HashMap<String, usize> {
    categories
        .iter()
        .enumerate()
        .map(|(i, c)| (c.clone(), i))
        .collect()
}

// Deserialisation goes through a raw mirror so the lookup index is
// rebuilt and duplicated ids are rejected instead of silently
// breaking the bijection.
#[derive(Deserialize)]
struct RawLabelMap {
    categories: Vec<String>,
    #[serde(default)]
    names: BTreeMap<String, String>,
}

impl<'de> Deserialize<'de> for LabelMap {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = RawLabelMap::deserialize(deserializer)?;
        let index = build_index(&raw.categories);
        if index.len() != raw.categories.len() {
            return Err(serde::de::Error::custom(
                "label map contains duplicated categories",
            ));
        }
        Ok(Self { categories: raw.categories, names: raw.names, index })
    }
}
