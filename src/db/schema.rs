/// Complete schema for the tag corpus cache.
///
/// Uses CREATE TABLE/INDEX IF NOT EXISTS for idempotent execution.
/// All statements are designed to be run in a single batch.
pub const INITIAL_SCHEMA: &str = r#"
-- Corpus files: one row per image whose prompt produced at least one tag
CREATE TABLE IF NOT EXISTS corpus_files (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    directory TEXT NOT NULL,
    name TEXT NOT NULL,
    mtime REAL NOT NULL
);

-- Corpus tags: the file's tag sequence, tag_order counting from 1
CREATE TABLE IF NOT EXISTS corpus_tags (
    file_id INTEGER NOT NULL,
    tag TEXT NOT NULL,
    tag_order INTEGER NOT NULL,
    FOREIGN KEY (file_id) REFERENCES corpus_files(id) ON DELETE CASCADE
);

-- Identity guard: at most one cache row per (directory, name) pair
CREATE UNIQUE INDEX IF NOT EXISTS idx_corpus_files_directory_name
    ON corpus_files(directory, name);

-- Recency scans within a directory
CREATE INDEX IF NOT EXISTS idx_corpus_files_directory_mtime
    ON corpus_files(directory, mtime DESC);

-- Per-tag lookups
CREATE INDEX IF NOT EXISTS idx_corpus_tags_tag ON corpus_tags(tag);

-- Ordered reads of one file's sequence
CREATE INDEX IF NOT EXISTS idx_corpus_tags_file_order ON corpus_tags(file_id, tag_order);
"#;
