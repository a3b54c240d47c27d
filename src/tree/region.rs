//! Region catalog: interning of anatomical labels.
//!
//! Every tree owns a [`RegionCatalog`]. Nodes store a [`RegionId`] into it
//! rather than the label text, so many nodes share one entry.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::index::RegionId;
use crate::error::{MorphError, Result};

/// Ordered set of distinct region names with constant-time lookup.
///
/// Inserting the same name twice returns the same index.
///
/// # Example
/// ```
/// use dendron::tree::RegionCatalog;
///
/// let mut catalog = RegionCatalog::new();
/// let soma = catalog.get_or_insert("soma");
/// let axon = catalog.get_or_insert("axon[]");
/// assert_eq!(catalog.get_or_insert("soma"), soma);
/// assert_eq!(catalog.name(axon), Some("axon[]"));
/// assert_eq!(catalog.len(), 2);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct RegionCatalog {
    names: Vec<String>,
    lookup: HashMap<String, RegionId>,
}

impl RegionCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the index for a name, inserting it if it doesn't exist.
    pub fn get_or_insert(&mut self, name: &str) -> RegionId {
        if let Some(&id) = self.lookup.get(name) {
            return id;
        }
        let id = RegionId::new(self.names.len());
        self.names.push(name.to_string());
        self.lookup.insert(name.to_string(), id);
        id
    }

    /// Look up the index of a name.
    pub fn get(&self, name: &str) -> Option<RegionId> {
        self.lookup.get(name).copied()
    }

    /// Name of a region, if the index is valid.
    pub fn name(&self, id: RegionId) -> Option<&str> {
        self.names.get(id.index()).map(|s| s.as_str())
    }

    /// Whether the index refers to an entry of this catalog.
    pub fn contains(&self, id: RegionId) -> bool {
        id.index() < self.names.len()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Iterate over `(index, name)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (RegionId, &str)> {
        self.names
            .iter()
            .enumerate()
            .map(|(i, name)| (RegionId::new(i), name.as_str()))
    }
}

impl PartialEq for RegionCatalog {
    fn eq(&self, other: &Self) -> bool {
        self.names == other.names
    }
}

impl TryFrom<Vec<String>> for RegionCatalog {
    type Error = MorphError;

    /// Rebuild a catalog from its name list. Indices follow list positions,
    /// so a repeated name is rejected.
    fn try_from(names: Vec<String>) -> Result<Self> {
        let mut catalog = RegionCatalog::new();
        for (i, name) in names.iter().enumerate() {
            if catalog.get_or_insert(name).index() != i {
                return Err(MorphError::invalid_param(
                    "catalog",
                    name,
                    "region name listed twice",
                ));
            }
        }
        Ok(catalog)
    }
}

impl From<RegionCatalog> for Vec<String> {
    fn from(catalog: RegionCatalog) -> Self {
        catalog.names
    }
}

impl std::ops::Index<RegionId> for RegionCatalog {
    type Output = str;

    fn index(&self, id: RegionId) -> &Self::Output {
        &self.names[id.index()]
    }
}

impl fmt::Display for RegionCatalog {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "RegionCatalog ({} regions):", self.names.len())?;
        for (idx, name) in self.names.iter().enumerate() {
            writeln!(f, "  [{}] {}", idx, name)?;
        }
        Ok(())
    }
}

/// Fold a trailing bracketed decimal suffix into `[]`.
///
/// Repeated sections of one structure (`dend[0]`, `dend[1]`, ...) map to a
/// single region `dend[]`. Labels without such a suffix are returned as-is.
///
/// ```
/// use dendron::tree::fold_indexed_label;
///
/// assert_eq!(fold_indexed_label("axon[12]"), "axon[]");
/// assert_eq!(fold_indexed_label("soma"), "soma");
/// assert_eq!(fold_indexed_label("dend[x]"), "dend[x]");
/// ```
pub fn fold_indexed_label(label: &str) -> Cow<'_, str> {
    if let Some(body) = label.strip_suffix(']') {
        if let Some(open) = body.rfind('[') {
            let digits = &body[open + 1..];
            if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
                return Cow::Owned(format!("{}[]", &body[..open]));
            }
        }
    }
    Cow::Borrowed(label)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedup() {
        let mut catalog = RegionCatalog::new();
        let a = catalog.get_or_insert("1");
        let b = catalog.get_or_insert("3");
        assert_eq!(catalog.get_or_insert("1"), a);
        assert_ne!(a, b);
        assert_eq!(catalog.get("3"), Some(b));
        assert_eq!(catalog.get("4"), None);
        assert_eq!(&catalog[b], "3");
    }

    #[test]
    fn test_contains() {
        let mut catalog = RegionCatalog::new();
        catalog.get_or_insert("soma");
        assert!(catalog.contains(RegionId::new(0)));
        assert!(!catalog.contains(RegionId::new(1)));
    }

    #[test]
    fn test_fold_indexed_label() {
        assert_eq!(fold_indexed_label("dend[0]"), "dend[]");
        assert_eq!(fold_indexed_label("a[1][2]"), "a[1][]");
        assert_eq!(fold_indexed_label("dend[]"), "dend[]");
        assert_eq!(fold_indexed_label("[5]"), "[]");
        assert_eq!(fold_indexed_label("axon"), "axon");
    }

    #[test]
    fn test_serde_as_name_list() {
        let mut catalog = RegionCatalog::new();
        catalog.get_or_insert("soma");
        catalog.get_or_insert("axon[]");

        let json = serde_json::to_string(&catalog).unwrap();
        assert_eq!(json, r#"["soma","axon[]"]"#);

        let back: RegionCatalog = serde_json::from_str(&json).unwrap();
        assert_eq!(back, catalog);
        assert_eq!(back.get("axon[]"), Some(RegionId::new(1)));
    }

    #[test]
    fn test_repeated_name_rejected() {
        let names = vec!["soma".to_string(), "dend[]".to_string(), "soma".to_string()];
        assert!(matches!(
            RegionCatalog::try_from(names),
            Err(MorphError::InvalidParameter { name: "catalog", .. })
        ));
        assert!(serde_json::from_str::<RegionCatalog>(r#"["1","1"]"#).is_err());
    }
}
