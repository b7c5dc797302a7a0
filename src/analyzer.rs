//! Corpus analysis: file enumeration, cache-aware tokenization, and
//! frequency folding.
//!
//! One analysis pass walks every configured directory, asks the cache which
//! files are already tokenized, runs the metadata reader and parser only for
//! the misses, writes the new sequences back in batch transactions, and
//! folds every sequence (cached or fresh) into transient frequency and
//! adjacency counters. A single file that fails to read or parse is logged
//! and skipped; it is never cached, so the next pass retries it.

use std::collections::HashMap;
use std::path::Path;
use std::time::UNIX_EPOCH;

use anyhow::Result;
use walkdir::WalkDir;

use crate::config::AnalysisConfig;
use crate::db::{CorpusEntry, TagCache};
use crate::metadata::PromptReader;
use crate::parser;

/// Files per cache lookup / insert transaction.
const BATCH_SIZE: usize = 500;

/// File extensions treated as corpus images.
const IMAGE_EXTENSIONS: [&str; 2] = ["png", "webp"];

/// Transient per-pass tag statistics.
///
/// `uses` counts every occurrence of a tag across the analyzed files;
/// `neighbors` counts, for each tag, how often each other tag appears
/// immediately before or after it within one file's sequence. Rebuilt from
/// scratch each pass and never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrequencyCounters {
    pub uses: HashMap<String, u64>,
    pub neighbors: HashMap<String, HashMap<String, u64>>,
}

impl FrequencyCounters {
    /// Folds one file's tag sequence into the counters.
    ///
    /// The first and last tag contribute only one neighbor each.
    pub fn fold(&mut self, tags: &[String]) {
        for (i, tag) in tags.iter().enumerate() {
            *self.uses.entry(tag.clone()).or_default() += 1;
            if i > 0 {
                *self
                    .neighbors
                    .entry(tag.clone())
                    .or_default()
                    .entry(tags[i - 1].clone())
                    .or_default() += 1;
            }
            if i + 1 < tags.len() {
                *self
                    .neighbors
                    .entry(tag.clone())
                    .or_default()
                    .entry(tags[i + 1].clone())
                    .or_default() += 1;
            }
        }
    }

    /// Drops tags whose total count falls below `threshold`, along with
    /// every adjacency row or column that points at a dropped tag.
    ///
    /// A negative threshold (unlimited image count) keeps everything.
    pub fn prune_low_frequency(&mut self, threshold: f64) {
        let low: Vec<String> = self
            .uses
            .iter()
            .filter(|&(_, &count)| (count as f64) < threshold)
            .map(|(tag, _)| tag.clone())
            .collect();
        if low.is_empty() {
            return;
        }

        for tag in &low {
            self.uses.remove(tag);
            self.neighbors.remove(tag);
        }
        for nexts in self.neighbors.values_mut() {
            for tag in &low {
                nexts.remove(tag);
            }
        }
    }
}

/// One candidate image found during enumeration.
#[derive(Debug, Clone)]
struct ImageFile {
    path: std::path::PathBuf,
    name: String,
    mtime: f64,
}

/// Runs the corpus analysis for one configuration.
pub struct CorpusAnalyzer<'a> {
    cache: &'a TagCache,
    reader: &'a dyn PromptReader,
    config: &'a AnalysisConfig,
}

impl<'a> CorpusAnalyzer<'a> {
    pub fn new(cache: &'a TagCache, reader: &'a dyn PromptReader, config: &'a AnalysisConfig) -> Self {
        Self {
            cache,
            reader,
            config,
        }
    }

    /// Analyzes every configured directory and returns the folded,
    /// low-frequency-pruned counters.
    ///
    /// # Errors
    ///
    /// Only cache lookup failures propagate; per-file read errors and
    /// batch insert failures are logged and skipped (a failed batch leaves
    /// no rows and is retried naturally on the next pass).
    pub fn analyze(&self) -> Result<FrequencyCounters> {
        let mut counters = FrequencyCounters::default();

        for directory in &self.config.analysis_directories {
            // The configured path string is also the cache key for rows
            // recorded under this directory.
            let directory_key = directory.to_string_lossy().into_owned();
            let files = enumerate_images(directory, self.config.analysis_image_count);

            for batch in files.chunks(BATCH_SIZE) {
                self.process_batch(&directory_key, batch, &mut counters)?;
            }
        }

        counters.prune_low_frequency(self.config.low_frequency_threshold());
        Ok(counters)
    }

    fn process_batch(
        &self,
        directory_key: &str,
        batch: &[ImageFile],
        counters: &mut FrequencyCounters,
    ) -> Result<()> {
        let names: Vec<String> = batch.iter().map(|f| f.name.clone()).collect();
        let cached =
            self.cache
                .lookup(directory_key, &names, self.config.analysis_image_count)?;

        let mut fresh: Vec<CorpusEntry> = Vec::new();
        for file in batch {
            if cached.contains_key(&file.name) {
                continue;
            }
            let Some(tags) = self.read_tags(file) else {
                continue;
            };
            if tags.is_empty() {
                continue;
            }
            fresh.push(CorpusEntry {
                name: file.name.clone(),
                mtime: file.mtime,
                tags,
            });
        }

        if !fresh.is_empty() {
            if let Err(e) = self.cache.insert_batch(directory_key, &fresh) {
                // The batch rolled back; these files stay uncached and
                // will be re-read next pass. Their tags are still valid
                // for this pass's counters.
                eprintln!("cache insert failed for {directory_key}: {e:#}");
            }
        }

        for tags in cached.values() {
            counters.fold(tags);
        }
        for entry in &fresh {
            counters.fold(&entry.tags);
        }

        Ok(())
    }

    /// Reads and tokenizes one file, mapping every failure to `None`.
    fn read_tags(&self, file: &ImageFile) -> Option<Vec<String>> {
        match self.reader.read_prompt(&file.path) {
            Ok(Some(parameters)) => Some(parser::extract_tags(&parameters)),
            Ok(None) => None,
            Err(e) => {
                eprintln!("skipping {}: {e}", file.path.display());
                None
            }
        }
    }
}

/// Recursively collects image files under `directory`, newest first,
/// capped at `limit` files (`-1` = unlimited).
fn enumerate_images(directory: &Path, limit: i64) -> Vec<ImageFile> {
    let mut files: Vec<ImageFile> = WalkDir::new(directory)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry
                .path()
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| {
                    IMAGE_EXTENSIONS
                        .iter()
                        .any(|image| ext.eq_ignore_ascii_case(image))
                })
        })
        .filter_map(|entry| {
            let mtime = entry
                .metadata()
                .ok()?
                .modified()
                .ok()?
                .duration_since(UNIX_EPOCH)
                .ok()?
                .as_secs_f64();
            Some(ImageFile {
                name: entry.file_name().to_string_lossy().into_owned(),
                path: entry.into_path(),
                mtime,
            })
        })
        .collect();

    files.sort_by(|a, b| b.mtime.total_cmp(&a.mtime));
    if limit >= 0 {
        files.truncate(limit as usize);
    }
    files
}
