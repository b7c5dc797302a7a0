//! Persistent tag corpus cache.
//!
//! Stores the tag sequence extracted from each corpus image, keyed by
//! directory and file name. Rows are written once and never updated: the
//! stored mtime orders recency scans but is not compared against the file
//! system afterwards, so a cached file is never re-tokenized. The whole
//! store is a rebuildable cache and is tuned accordingly (WAL, relaxed
//! synchronous mode).

mod schema;

use std::collections::HashMap;
use std::path::Path;

use anyhow::Result;
use rusqlite::{Connection, ToSql};

use schema::INITIAL_SCHEMA;

/// One file's contribution to the corpus: its name within the directory,
/// its modification time in seconds, and its extracted tag sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct CorpusEntry {
    pub name: String,
    pub mtime: f64,
    pub tags: Vec<String>,
}

/// Cache wrapper providing connection management and schema initialization.
pub struct TagCache {
    conn: Connection,
}

impl TagCache {
    /// Opens an in-memory cache.
    ///
    /// Automatically initializes the schema on connection open.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let cache = Self { conn };
        cache.initialize()?;
        Ok(cache)
    }

    /// Opens a file-based cache at the given path.
    ///
    /// Creates the database file if it does not exist.
    /// Automatically initializes the schema on connection open.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        let cache = Self { conn };
        cache.initialize()?;
        Ok(cache)
    }

    /// Applies cache-profile pragmas and the schema.
    ///
    /// Durability is deliberately relaxed: every row can be regenerated
    /// from the image files, so losing the tail of a write on power
    /// failure only costs a re-tokenization.
    fn initialize(&self) -> Result<()> {
        self.conn.pragma_update(None, "journal_mode", "WAL")?;
        self.conn.pragma_update(None, "synchronous", "OFF")?;
        self.conn.pragma_update(None, "temp_store", "MEMORY")?;
        self.conn.pragma_update(None, "cache_size", -200_000)?;
        self.conn.execute("PRAGMA foreign_keys = ON", [])?;
        self.conn.execute_batch(INITIAL_SCHEMA)?;
        Ok(())
    }

    /// Returns a reference to the underlying database connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Fetches cached tag sequences for the given file names in one query.
    ///
    /// Only rows under `directory` are considered. When `limit` is
    /// non-negative, at most that many files are returned, most recent
    /// mtime first; `-1` means no limit. Names without a cached row are
    /// simply absent from the result map. Tags come back in recorded
    /// order.
    pub fn lookup(
        &self,
        directory: &str,
        names: &[String],
        limit: i64,
    ) -> Result<HashMap<String, Vec<String>>> {
        if names.is_empty() {
            return Ok(HashMap::new());
        }

        let placeholders = vec!["?"; names.len()].join(", ");
        let query = format!(
            "SELECT f.name, t.tag
             FROM (SELECT id, name
                   FROM corpus_files
                   WHERE directory = ? AND name IN ({placeholders})
                   ORDER BY mtime DESC
                   LIMIT ?) f
             INNER JOIN corpus_tags t ON t.file_id = f.id
             ORDER BY f.name, t.tag_order"
        );

        let mut params: Vec<&dyn ToSql> = Vec::with_capacity(names.len() + 2);
        params.push(&directory);
        for name in names {
            params.push(name);
        }
        params.push(&limit);

        let mut stmt = self.conn.prepare(&query)?;
        let rows = stmt.query_map(params.as_slice(), |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut tags_by_name: HashMap<String, Vec<String>> = HashMap::new();
        for row in rows {
            let (name, tag) = row?;
            tags_by_name.entry(name).or_default().push(tag);
        }

        Ok(tags_by_name)
    }

    /// Inserts a batch of entries in one transaction.
    ///
    /// Entries whose (directory, name) pair is already cached are skipped,
    /// so replaying a batch after a partial failure is safe. Entries with
    /// no tags are skipped as well: only files that produced tags earn a
    /// cache row. Returns the number of files actually inserted.
    ///
    /// # Errors
    ///
    /// On any statement failure the whole batch is rolled back and no rows
    /// remain.
    pub fn insert_batch(&self, directory: &str, entries: &[CorpusEntry]) -> Result<usize> {
        let conn = &self.conn;
        conn.execute("BEGIN TRANSACTION", [])?;

        let result: Result<usize> = (|| {
            let mut insert_file = conn.prepare(
                "INSERT OR IGNORE INTO corpus_files (directory, name, mtime) VALUES (?1, ?2, ?3)",
            )?;
            let mut insert_tag = conn
                .prepare("INSERT INTO corpus_tags (file_id, tag, tag_order) VALUES (?1, ?2, ?3)")?;

            let mut inserted = 0;
            for entry in entries {
                if entry.tags.is_empty() {
                    continue;
                }
                let changed = insert_file.execute((directory, &entry.name, entry.mtime))?;
                if changed == 0 {
                    continue;
                }
                let file_id = conn.last_insert_rowid();
                for (index, tag) in entry.tags.iter().enumerate() {
                    insert_tag.execute((file_id, tag, index as i64 + 1))?;
                }
                inserted += 1;
            }
            Ok(inserted)
        })();

        match result {
            Ok(inserted) => {
                conn.execute("COMMIT", [])?;
                Ok(inserted)
            }
            Err(e) => {
                conn.execute("ROLLBACK", []).ok();
                Err(e)
            }
        }
    }

    /// Inserts a single entry. Returns `true` when a new row was created.
    pub fn insert(&self, directory: &str, entry: &CorpusEntry) -> Result<bool> {
        Ok(self.insert_batch(directory, std::slice::from_ref(entry))? == 1)
    }

    /// Number of cached files.
    pub fn file_count(&self) -> Result<i64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM corpus_files", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Number of cached tag occurrences.
    pub fn tag_count(&self) -> Result<i64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM corpus_tags", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Modification time of the most recent cached file, if any.
    pub fn newest_mtime(&self) -> Result<Option<f64>> {
        let mtime = self
            .conn
            .query_row("SELECT MAX(mtime) FROM corpus_files", [], |row| row.get(0))?;
        Ok(mtime)
    }
}
