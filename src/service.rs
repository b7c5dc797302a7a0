//! Model build orchestration.
//!
//! [`TagModelService`] owns the corpus cache, the metadata reader seam,
//! and the analysis configuration, and runs one complete build: load the
//! catalog, analyze the corpus, merge the two. It is UI-independent; the
//! CLI uses it directly and [`crate::worker::ModelWorker`] moves it onto a
//! background thread.

use std::sync::Arc;

use anyhow::Result;

use crate::analyzer::{CorpusAnalyzer, FrequencyCounters};
use crate::catalog::TagCatalog;
use crate::config::AnalysisConfig;
use crate::db::TagCache;
use crate::metadata::PromptReader;
use crate::model::{ModelBuilder, TagModels};

/// Service running complete model builds against one cache.
///
/// Builds are strictly sequential per service instance; `&self` methods
/// never mutate beyond the cache's own transactional writes, so repeating
/// a build over an unchanged corpus is idempotent.
pub struct TagModelService {
    cache: TagCache,
    reader: Arc<dyn PromptReader>,
    config: AnalysisConfig,
}

impl TagModelService {
    /// Creates a service owning the given cache.
    pub fn new(cache: TagCache, reader: Arc<dyn PromptReader>, config: AnalysisConfig) -> Self {
        Self {
            cache,
            reader,
            config,
        }
    }

    /// Returns a reference to the underlying cache.
    ///
    /// Useful for testing and for the stats surface.
    pub fn cache(&self) -> &TagCache {
        &self.cache
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Runs one full build: catalog load, corpus analysis, model merge.
    ///
    /// With suggestions disabled the corpus pass is skipped entirely and
    /// the models carry catalog data only. A missing catalog degrades to
    /// an empty one; per-file corpus errors are logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns an error only on cache query failures; everything else
    /// degrades per the best-effort rules.
    pub fn build_models(&self) -> Result<TagModels> {
        let catalog = TagCatalog::load(&self.config.catalog_dir, &self.config.tag_source);

        let counters = if self.config.suggestions_enabled {
            CorpusAnalyzer::new(&self.cache, self.reader.as_ref(), &self.config).analyze()?
        } else {
            FrequencyCounters::default()
        };

        Ok(ModelBuilder::build(
            catalog,
            counters,
            self.config.post_count_threshold,
        ))
    }
}
