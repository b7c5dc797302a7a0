use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Result;
use tagmine::{AnalysisConfig, PromptReadError, PromptReader, TagCache, TagModelService};
use tempfile::TempDir;

/// Reader that serves a file's own contents as its parameters record.
///
/// Lets tests drive the analyzer with plain text files standing in for
/// images, without any metadata decoding.
struct FileTextReader;

impl PromptReader for FileTextReader {
    fn read_prompt(&self, path: &Path) -> Result<Option<String>, PromptReadError> {
        let text = fs::read_to_string(path).map_err(|source| PromptReadError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(Some(text))
    }
}

/// Reader that fails for one file name until told otherwise.
struct FlakyReader {
    failing_name: String,
    healed: AtomicBool,
}

impl PromptReader for FlakyReader {
    fn read_prompt(&self, path: &Path) -> Result<Option<String>, PromptReadError> {
        let name = path.file_name().unwrap().to_string_lossy();
        if name == self.failing_name && !self.healed.load(Ordering::SeqCst) {
            return Err(PromptReadError::Corrupt {
                path: path.display().to_string(),
                reason: "simulated corrupt image".to_string(),
            });
        }
        FileTextReader.read_prompt(path)
    }
}

fn record(positive: &str) -> String {
    format!("{positive}\nNegative prompt: lowres, bad hands\nSteps: 28, Sampler: Euler a")
}

fn write_image(dir: &Path, name: &str, positive: &str) {
    fs::write(dir.join(name), record(positive)).unwrap();
}

fn config(corpus: &TempDir) -> AnalysisConfig {
    AnalysisConfig {
        analysis_directories: vec![corpus.path().to_path_buf()],
        analysis_image_count: -1,
        low_frequency_threshold_percent: 0,
        post_count_threshold: 0,
        catalog_dir: corpus.path().join("no-catalog"),
        ..AnalysisConfig::default()
    }
}

fn open_service(db_path: &Path, reader: Arc<dyn PromptReader>, config: AnalysisConfig) -> Result<TagModelService> {
    Ok(TagModelService::new(TagCache::open(db_path)?, reader, config))
}

#[test]
fn test_analysis_is_idempotent_across_runs() -> Result<()> {
    // Arrange: a three-image corpus and a disk-backed cache
    let corpus = TempDir::new()?;
    write_image(corpus.path(), "a.png", "1girl, solo, blue_sky");
    write_image(corpus.path(), "b.png", "1girl, outdoors");
    write_image(corpus.path(), "c.png", "scenery, blue_sky");
    let db_path: PathBuf = corpus.path().join("cache.db");

    // Act: run the full build twice against the same cache
    let service = open_service(&db_path, Arc::new(FileTextReader), config(&corpus))?;
    let first = service.build_models()?;
    let rows_after_first = service.cache().file_count()?;
    let second = service.build_models()?;

    // Assert: identical outputs, no duplicate rows
    assert_eq!(first, second);
    assert_eq!(service.cache().file_count()?, rows_after_first);
    assert_eq!(rows_after_first, 3);
    assert_eq!(first.dictionary["1girl"].use_count, 2);
    assert_eq!(first.dictionary["blue sky"].use_count, 2);

    Ok(())
}

#[test]
fn test_second_run_reuses_cache_without_rereading() -> Result<()> {
    // Arrange: populate the cache with a working reader
    let corpus = TempDir::new()?;
    write_image(corpus.path(), "a.png", "1girl, solo");
    let db_path = corpus.path().join("cache.db");

    let service = open_service(&db_path, Arc::new(FileTextReader), config(&corpus))?;
    let first = service.build_models()?;
    drop(service);

    // Act: rerun with a reader that would fail for the cached file
    let reader = Arc::new(FlakyReader {
        failing_name: "a.png".to_string(),
        healed: AtomicBool::new(false),
    });
    let service = open_service(&db_path, reader, config(&corpus))?;
    let second = service.build_models()?;

    // Assert: the cached tags were used, the reader was never consulted
    assert_eq!(first, second);
    assert_eq!(second.dictionary["1girl"].use_count, 1);

    Ok(())
}

#[test]
fn test_reader_failure_leaves_file_uncached_and_retried() -> Result<()> {
    // Arrange: one readable and one corrupt image
    let corpus = TempDir::new()?;
    write_image(corpus.path(), "good.png", "1girl");
    write_image(corpus.path(), "bad.png", "scenery");
    let db_path = corpus.path().join("cache.db");

    let reader = Arc::new(FlakyReader {
        failing_name: "bad.png".to_string(),
        healed: AtomicBool::new(false),
    });

    // Act: first run fails for bad.png
    let service = open_service(&db_path, Arc::clone(&reader) as Arc<dyn PromptReader>, config(&corpus))?;
    let first = service.build_models()?;

    // Assert: the failing file never earned a cache row
    assert_eq!(service.cache().file_count()?, 1);
    assert!(!first.dictionary.contains_key("scenery"));

    // Act: the image becomes readable and the next run retries it
    reader.healed.store(true, Ordering::SeqCst);
    let second = service.build_models()?;

    // Assert: retried, cached, and counted
    assert_eq!(service.cache().file_count()?, 2);
    assert_eq!(second.dictionary["scenery"].use_count, 1);

    Ok(())
}

#[test]
fn test_low_frequency_tags_are_pruned_from_both_models() -> Result<()> {
    // Arrange: "common" appears in 4 of 4 images, "rare" in 1
    let corpus = TempDir::new()?;
    for i in 0..3 {
        write_image(corpus.path(), &format!("{i}.png"), "common, filler");
    }
    write_image(corpus.path(), "3.png", "common, rare");
    let db_path = corpus.path().join("cache.db");

    // 50% of 4 analyzed images = threshold 2: "rare" is noise
    let config = AnalysisConfig {
        analysis_image_count: 4,
        low_frequency_threshold_percent: 50,
        ..config(&corpus)
    };

    // Act
    let service = open_service(&db_path, Arc::new(FileTextReader), config)?;
    let models = service.build_models()?;

    // Assert: rare is gone from the dictionary and from adjacency rows
    assert!(models.dictionary.contains_key("common"));
    assert!(!models.dictionary.contains_key("rare"));
    assert!(!models.suggestions.contains_key("rare"));
    assert!(!models.suggestions["common"].contains_key("rare"));
    assert!(models.suggestions["common"].contains_key("filler"));

    Ok(())
}

#[test]
fn test_image_count_limit_keeps_newest_files() -> Result<()> {
    // Arrange: two images with distinct modification times
    let corpus = TempDir::new()?;
    write_image(corpus.path(), "old.png", "old_tag");
    std::thread::sleep(std::time::Duration::from_millis(20));
    write_image(corpus.path(), "new.png", "new_tag");
    let db_path = corpus.path().join("cache.db");

    let config = AnalysisConfig {
        analysis_image_count: 1,
        ..config(&corpus)
    };

    // Act
    let service = open_service(&db_path, Arc::new(FileTextReader), config)?;
    let models = service.build_models()?;

    // Assert: only the newest image was analyzed
    assert!(models.dictionary.contains_key("new tag"));
    assert!(!models.dictionary.contains_key("old tag"));
    assert_eq!(service.cache().file_count()?, 1);

    Ok(())
}

#[test]
fn test_multiple_directories_are_analyzed_independently() -> Result<()> {
    // Arrange: the same file name in two directories with different tags
    let corpus_a = TempDir::new()?;
    let corpus_b = TempDir::new()?;
    write_image(corpus_a.path(), "img.png", "from_a");
    write_image(corpus_b.path(), "img.png", "from_b");
    let db_path = corpus_a.path().join("cache.db");

    let config = AnalysisConfig {
        analysis_directories: vec![corpus_a.path().to_path_buf(), corpus_b.path().to_path_buf()],
        ..config(&corpus_a)
    };

    // Act
    let service = open_service(&db_path, Arc::new(FileTextReader), config)?;
    let models = service.build_models()?;

    // Assert: both rows cached under their own directory key
    assert_eq!(service.cache().file_count()?, 2);
    assert_eq!(models.dictionary["from a"].use_count, 1);
    assert_eq!(models.dictionary["from b"].use_count, 1);

    Ok(())
}
