//! JSONL (JSON Lines) table files.
//!
//! Each line is a valid JSON object representing one row. Tables are small
//! and always rewritten whole, so readers load everything at open.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::marker::PhantomData;
use std::path::PathBuf;

use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use super::{StorageConfig, StorageError};

/// Cache tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Clans,
    ClanMembers,
    Matches,
    ModeStats,
}

impl Table {
    /// Get the filename for this table.
    pub fn filename(&self) -> &'static str {
        match self {
            Table::Clans => "clans.jsonl",
            Table::ClanMembers => "clan_members.jsonl",
            Table::Matches => "matches.jsonl",
            Table::ModeStats => "mode_stats.jsonl",
        }
    }
}

/// JSONL file writer.
pub struct JsonlWriter<T> {
    path: PathBuf,
    _marker: PhantomData<T>,
}

impl<T: Serialize> JsonlWriter<T> {
    /// Create a new JSONL writer for the given path.
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            _marker: PhantomData,
        }
    }

    /// Create a writer for a cache table.
    pub fn for_table(config: &StorageConfig, table: Table) -> Self {
        Self::new(config.table_path(table))
    }

    /// Ensure the parent directory exists.
    fn ensure_dir(&self) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(())
    }

    /// Write rows, replacing the entire file.
    ///
    /// Rows go to a sibling temp file first and are renamed into place, so a
    /// failed write leaves the previous table intact.
    pub fn write_all(&self, rows: &[T]) -> Result<usize, StorageError> {
        self.ensure_dir()?;

        let tmp_path = self.path.with_extension("jsonl.tmp");
        let file = File::create(&tmp_path)?;
        let mut writer = BufWriter::new(file);
        let mut count = 0;

        for row in rows {
            let json = serde_json::to_string(row)?;
            writeln!(writer, "{}", json)?;
            count += 1;
        }

        writer.flush()?;
        drop(writer);
        fs::rename(&tmp_path, &self.path)?;
        debug!("Wrote {} rows to {:?}", count, self.path);

        Ok(count)
    }
}

/// JSONL file reader.
pub struct JsonlReader<T> {
    path: PathBuf,
    _marker: PhantomData<T>,
}

impl<T: DeserializeOwned> JsonlReader<T> {
    /// Create a new JSONL reader for the given path.
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            _marker: PhantomData,
        }
    }

    /// Create a reader for a cache table.
    pub fn for_table(config: &StorageConfig, table: Table) -> Self {
        Self::new(config.table_path(table))
    }

    /// Check if the file exists.
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Read all rows from the file. Unparseable lines are skipped with a warning.
    pub fn read_all(&self) -> Result<Vec<T>, StorageError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.path)?;
        let reader = BufReader::new(file);
        let mut rows = Vec::new();

        for (idx, line) in reader.lines().enumerate() {
            let line = line?;

            if line.trim().is_empty() {
                continue;
            }

            match serde_json::from_str(&line) {
                Ok(row) => rows.push(row),
                Err(e) => {
                    warn!("Failed to parse line {} in {:?}: {}", idx + 1, self.path, e);
                }
            }
        }

        debug!("Read {} rows from {:?}", rows.len(), self.path);
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use tempfile::TempDir;

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    struct TestRow {
        id: String,
        name: String,
        value: u32,
    }

    fn row(id: &str, name: &str, value: u32) -> TestRow {
        TestRow {
            id: id.to_string(),
            name: name.to_string(),
            value,
        }
    }

    #[test]
    fn test_jsonl_write_and_read() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("test.jsonl");

        let rows = vec![row("1", "First", 100), row("2", "Second", 200)];

        let writer: JsonlWriter<TestRow> = JsonlWriter::new(path.clone());
        assert_eq!(writer.write_all(&rows).unwrap(), 2);

        let reader: JsonlReader<TestRow> = JsonlReader::new(path);
        assert_eq!(reader.read_all().unwrap(), rows);
    }

    #[test]
    fn test_jsonl_read_missing_file_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let reader: JsonlReader<TestRow> =
            JsonlReader::new(temp_dir.path().join("nonexistent.jsonl"));

        assert!(!reader.exists());
        assert!(reader.read_all().unwrap().is_empty());
    }

    #[test]
    fn test_write_all_overwrites_existing() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("overwrite.jsonl");

        let writer: JsonlWriter<TestRow> = JsonlWriter::new(path.clone());
        let reader: JsonlReader<TestRow> = JsonlReader::new(path.clone());

        writer.write_all(&[row("1", "Old", 1)]).unwrap();
        writer
            .write_all(&[row("2", "New1", 2), row("3", "New2", 3)])
            .unwrap();

        let read = reader.read_all().unwrap();
        assert_eq!(read.len(), 2);
        assert_eq!(read[0].name, "New1");
        assert!(!path.with_extension("jsonl.tmp").exists());
    }

    #[test]
    fn test_write_all_creates_parent_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("deeper").join("t.jsonl");

        let writer: JsonlWriter<TestRow> = JsonlWriter::new(path.clone());
        writer.write_all(&[row("1", "A", 1)]).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_read_all_skips_bad_lines() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("bad_lines.jsonl");

        std::fs::write(
            &path,
            r#"{"id":"1","name":"Good","value":1}
not-valid-json

{"id":"2","name":"Also Good","value":2}
"#,
        )
        .unwrap();

        let reader: JsonlReader<TestRow> = JsonlReader::new(path);
        let rows = reader.read_all().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].name, "Good");
        assert_eq!(rows[1].name, "Also Good");
    }

    #[test]
    fn test_for_table_path() {
        let temp_dir = TempDir::new().unwrap();
        let config = StorageConfig::new(temp_dir.path().to_path_buf());

        let writer: JsonlWriter<TestRow> = JsonlWriter::for_table(&config, Table::ClanMembers);
        assert_eq!(
            writer.path,
            temp_dir.path().join("cache").join("clan_members.jsonl")
        );
    }

    #[test]
    fn test_table_filenames() {
        assert_eq!(Table::Clans.filename(), "clans.jsonl");
        assert_eq!(Table::ModeStats.filename(), "mode_stats.jsonl");
    }
}
