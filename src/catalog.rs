//! Canonical tag catalog loading.
//!
//! The catalog is a pair of CSV tables maintained outside this crate, one
//! set per tag source under `<catalog_dir>/<tag_source>/`: `tags.csv`
//! (`name,category,post_count`, extra columns ignored) and `tag_aliases.csv`
//! (`antecedent_name,consequent_name`). A missing or unreadable catalog
//! degrades to an empty one; a malformed row is skipped with a log line.
//! Neither ever fails a model build.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

/// One canonical tag as shipped by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CatalogEntry {
    /// Numeric category code from the source site.
    pub category: i64,
    /// Number of posts carrying this tag on the source site.
    pub post_count: i64,
    /// Alternate names that resolve to this tag.
    pub aliases: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct TagRow {
    name: String,
    category: i64,
    post_count: i64,
}

#[derive(Debug, Deserialize)]
struct AliasRow {
    antecedent_name: String,
    consequent_name: String,
}

/// In-memory canonical tag catalog for one tag source.
///
/// Loaded once per analysis pass and owned by the model build; there is no
/// process-global memoization.
#[derive(Debug, Default)]
pub struct TagCatalog {
    entries: HashMap<String, CatalogEntry>,
}

impl TagCatalog {
    /// Loads the catalog for `tag_source` from `catalog_dir`.
    ///
    /// Tag and alias names are normalized (underscores become spaces) to
    /// match tokenizer output. Aliases whose canonical tag is absent from
    /// `tags.csv` are dropped. Missing files yield an empty catalog; file
    /// level read errors are logged and likewise yield an empty (or
    /// alias-less) catalog.
    #[must_use]
    pub fn load(catalog_dir: &Path, tag_source: &str) -> Self {
        let source_dir = catalog_dir.join(tag_source);

        let tags_path = source_dir.join("tags.csv");
        if !tags_path.exists() {
            return Self::default();
        }

        let mut entries = HashMap::new();
        if let Err(e) = load_tags(&tags_path, &mut entries) {
            eprintln!("tag catalog unavailable: {e:#}");
            return Self::default();
        }

        let aliases_path = source_dir.join("tag_aliases.csv");
        if aliases_path.exists() {
            if let Err(e) = load_aliases(&aliases_path, &mut entries) {
                eprintln!("tag aliases unavailable: {e:#}");
            }
        }

        Self { entries }
    }

    /// Builds a catalog directly from entries. Intended for tests and
    /// hosts that source catalog data elsewhere.
    #[must_use]
    pub fn from_entries(entries: HashMap<String, CatalogEntry>) -> Self {
        Self { entries }
    }

    /// Looks up one canonical tag.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&CatalogEntry> {
        self.entries.get(name)
    }

    /// Number of canonical tags.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Consumes the catalog, yielding its entries.
    #[must_use]
    pub fn into_entries(self) -> HashMap<String, CatalogEntry> {
        self.entries
    }
}

fn load_tags(path: &Path, entries: &mut HashMap<String, CatalogEntry>) -> Result<()> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open {}", path.display()))?;

    for row in reader.deserialize::<TagRow>() {
        let row = match row {
            Ok(row) => row,
            Err(e) => {
                eprintln!("skipping malformed tag row in {}: {e}", path.display());
                continue;
            }
        };
        entries.insert(
            row.name.replace('_', " "),
            CatalogEntry {
                category: row.category,
                post_count: row.post_count,
                aliases: Vec::new(),
            },
        );
    }

    Ok(())
}

fn load_aliases(path: &Path, entries: &mut HashMap<String, CatalogEntry>) -> Result<()> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open {}", path.display()))?;

    for row in reader.deserialize::<AliasRow>() {
        let row = match row {
            Ok(row) => row,
            Err(e) => {
                eprintln!("skipping malformed alias row in {}: {e}", path.display());
                continue;
            }
        };
        let canonical = row.consequent_name.replace('_', " ");
        if let Some(entry) = entries.get_mut(&canonical) {
            entry.aliases.push(row.antecedent_name.replace('_', " "));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn write_catalog(dir: &Path, source: &str, tags: &str, aliases: Option<&str>) {
        let source_dir = dir.join(source);
        fs::create_dir_all(&source_dir).unwrap();
        fs::write(source_dir.join("tags.csv"), tags).unwrap();
        if let Some(aliases) = aliases {
            fs::write(source_dir.join("tag_aliases.csv"), aliases).unwrap();
        }
    }

    #[test]
    fn loads_tags_with_normalized_names() {
        let dir = tempdir().unwrap();
        write_catalog(
            dir.path(),
            "site",
            "name,category,post_count\nblue_sky,0,5000\n1girl,0,100000\n",
            None,
        );

        let catalog = TagCatalog::load(dir.path(), "site");

        assert_eq!(catalog.len(), 2);
        let entry = catalog.get("blue sky").unwrap();
        assert_eq!(entry.post_count, 5000);
        assert_eq!(entry.category, 0);
    }

    #[test]
    fn extra_columns_are_ignored() {
        let dir = tempdir().unwrap();
        write_catalog(
            dir.path(),
            "site",
            "id,name,category,post_count,md5\n1,cat,0,42,abc\n",
            None,
        );

        let catalog = TagCatalog::load(dir.path(), "site");
        assert_eq!(catalog.get("cat").unwrap().post_count, 42);
    }

    #[test]
    fn aliases_attach_to_known_canonical_tags_only() {
        let dir = tempdir().unwrap();
        write_catalog(
            dir.path(),
            "site",
            "name,category,post_count\nlong_hair,0,900\n",
            Some(
                "antecedent_name,consequent_name\n\
                 longhair,long_hair\n\
                 orphan_alias,unknown_tag\n",
            ),
        );

        let catalog = TagCatalog::load(dir.path(), "site");

        assert_eq!(catalog.get("long hair").unwrap().aliases, vec!["longhair"]);
        assert!(catalog.get("unknown tag").is_none());
    }

    #[test]
    fn missing_catalog_directory_is_empty() {
        let dir = tempdir().unwrap();
        let catalog = TagCatalog::load(dir.path(), "nonexistent");
        assert!(catalog.is_empty());
    }

    #[test]
    fn missing_alias_file_keeps_tags() {
        let dir = tempdir().unwrap();
        write_catalog(dir.path(), "site", "name,category,post_count\na,0,1\n", None);

        let catalog = TagCatalog::load(dir.path(), "site");
        assert_eq!(catalog.len(), 1);
        assert!(catalog.get("a").unwrap().aliases.is_empty());
    }

    #[test]
    fn malformed_rows_are_skipped_not_fatal() {
        let dir = tempdir().unwrap();
        write_catalog(
            dir.path(),
            "site",
            "name,category,post_count\ngood,0,10\nbad,not_a_number,7\nalso_good,1,20\n",
            None,
        );

        let catalog = TagCatalog::load(dir.path(), "site");

        assert_eq!(catalog.len(), 2);
        assert!(catalog.get("good").is_some());
        assert!(catalog.get("also good").is_some());
    }
}
