//! Final tag dictionary and suggestion table.
//!
//! The model build merges the canonical catalog with the counters from one
//! analysis pass: catalog entries gain observed use counts (matched
//! directly or through aliases), tags the corpus uses but the catalog does
//! not know become `custom` entries, and a post-count threshold drops
//! catalog entries the corpus never touched. The resulting [`TagModels`]
//! value is handed to the caller whole; the host serializes it for its
//! completion UI.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::analyzer::FrequencyCounters;
use crate::catalog::TagCatalog;

/// Category of a dictionary entry.
///
/// Catalog entries carry the source site's numeric category code; tags
/// observed only in the local corpus are `Custom`. Serializes as the bare
/// number or the string `"custom"`, matching the catalog's JSON dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagCategory {
    Code(i64),
    Custom,
}

impl Serialize for TagCategory {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Code(code) => serializer.serialize_i64(*code),
            Self::Custom => serializer.serialize_str("custom"),
        }
    }
}

impl<'de> Deserialize<'de> for TagCategory {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Code(i64),
            Name(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Code(code) => Ok(Self::Code(code)),
            Repr::Name(name) if name == "custom" => Ok(Self::Custom),
            Repr::Name(name) => Err(serde::de::Error::custom(format!(
                "unknown tag category: {name}"
            ))),
        }
    }
}

impl fmt::Display for TagCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Code(code) => write!(f, "{code}"),
            Self::Custom => write!(f, "custom"),
        }
    }
}

/// One entry of the final tag dictionary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagDictionaryEntry {
    /// Post count from the catalog, 0 for corpus-only tags.
    pub post_count: i64,
    pub category: TagCategory,
    /// Alternate names resolving to this entry.
    pub aliases: Vec<String>,
    /// Occurrences observed across the analyzed corpus.
    pub use_count: u64,
}

/// The two models this crate produces.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagModels {
    /// Canonical tag name to merged dictionary entry.
    pub dictionary: HashMap<String, TagDictionaryEntry>,
    /// Tag to adjacent tag to co-occurrence count.
    pub suggestions: HashMap<String, HashMap<String, u64>>,
}

/// Merges catalog and counters into [`TagModels`].
pub struct ModelBuilder;

impl ModelBuilder {
    /// Builds the final models.
    ///
    /// An observed tag matching a shared alias increments every canonical
    /// entry the alias points at. The final filter drops entries whose
    /// post count is below `post_count_threshold` and whose use count is
    /// zero. The suggestion table passes the (already low-frequency
    /// filtered) adjacency counters through keyed by the observed tag.
    #[must_use]
    pub fn build(
        catalog: TagCatalog,
        counters: FrequencyCounters,
        post_count_threshold: i64,
    ) -> TagModels {
        let mut dictionary: HashMap<String, TagDictionaryEntry> = catalog
            .into_entries()
            .into_iter()
            .map(|(name, entry)| {
                (
                    name,
                    TagDictionaryEntry {
                        post_count: entry.post_count,
                        category: TagCategory::Code(entry.category),
                        aliases: entry.aliases,
                        use_count: 0,
                    },
                )
            })
            .collect();

        let mut alias_to_tags: HashMap<String, Vec<String>> = HashMap::new();
        for (name, entry) in &dictionary {
            for alias in &entry.aliases {
                alias_to_tags
                    .entry(alias.clone())
                    .or_default()
                    .push(name.clone());
            }
        }

        for (tag, use_count) in counters.uses {
            // Counters already hold normalized tags; the replace guards
            // against callers folding raw sequences.
            let tag = tag.replace('_', " ");
            if let Some(entry) = dictionary.get_mut(&tag) {
                entry.use_count = use_count;
            } else if let Some(canonicals) = alias_to_tags.get(&tag) {
                for canonical in canonicals {
                    if let Some(entry) = dictionary.get_mut(canonical) {
                        entry.use_count += use_count;
                    }
                }
            } else {
                dictionary.insert(
                    tag,
                    TagDictionaryEntry {
                        post_count: 0,
                        category: TagCategory::Custom,
                        aliases: Vec::new(),
                        use_count,
                    },
                );
            }
        }

        dictionary
            .retain(|_, entry| entry.post_count >= post_count_threshold || entry.use_count > 0);

        TagModels {
            dictionary,
            suggestions: counters.neighbors,
        }
    }
}
