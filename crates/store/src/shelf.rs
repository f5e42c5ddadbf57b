//! Durable per-process shelf cache
//!
//! The branch engine's views have a staleness window: a record created
//! moments ago may not be visible to the next tool invocation. The shelf
//! bridges it with a side-file per process under
//! `<library>/<sanitized-process-name>/`, holding the record id and
//! branch name with a write timestamp. Readers check the shelf before
//! creating anything, which is what makes record creation idempotent
//! across invocations.
//!
//! The shelf also carries an append-only `sessions.csv` log of every
//! session event for the process.

use std::fs;
use std::path::{Path, PathBuf};

use cadastre_core::{Error, ProcessName, RecordId, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

const SHELF_FILE: &str = "shelf.json";
const SESSION_LOG_FILE: &str = "sessions.csv";

/// The cached identity of an open process
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShelfEntry {
    /// Record id of the process
    pub record_id: RecordId,
    /// Branch the process is editing in
    pub branch: String,
    /// When this entry was written
    pub written_at: DateTime<Utc>,
}

/// Shelf cache for one process
#[derive(Debug, Clone)]
pub struct ShelfCache {
    dir: PathBuf,
    ttl: Duration,
}

impl ShelfCache {
    /// Open (creating if needed) the shelf directory for a process
    pub fn open(library: &Path, process: &ProcessName, ttl: Duration) -> Result<Self> {
        let dir = library.join(process.sanitized());
        fs::create_dir_all(&dir)?;
        Ok(Self { dir, ttl })
    }

    /// Directory holding this process's shelf files
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Read the cached entry, if present and not expired
    ///
    /// An expired or unreadable entry is treated as absent.
    pub fn load(&self) -> Option<ShelfEntry> {
        let path = self.dir.join(SHELF_FILE);
        let text = fs::read_to_string(&path).ok()?;
        let entry: ShelfEntry = serde_json::from_str(&text).ok()?;
        if Utc::now() - entry.written_at > self.ttl {
            debug!(path = %path.display(), "shelf entry expired");
            return None;
        }
        Some(entry)
    }

    /// Write the cached entry, stamping the current time
    pub fn store(&self, record_id: RecordId, branch: &str) -> Result<ShelfEntry> {
        let entry = ShelfEntry {
            record_id,
            branch: branch.to_string(),
            written_at: Utc::now(),
        };
        let text = serde_json::to_string_pretty(&entry)
            .map_err(|e| Error::Serialization(e.to_string()))?;
        fs::write(self.dir.join(SHELF_FILE), text)?;
        Ok(entry)
    }

    /// Append one line to the process's session log
    ///
    /// Columns: timestamp, branch, user, event.
    pub fn log_session(&self, branch: &str, user: &str, event: &str) -> Result<()> {
        use std::io::Write;
        let path = self.dir.join(SESSION_LOG_FILE);
        let mut file = fs::OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(file, "{},{},{},{}", Utc::now().to_rfc3339(), branch, user, event)?;
        Ok(())
    }

    /// Lines of the session log, oldest first
    pub fn session_log(&self) -> Result<Vec<String>> {
        let path = self.dir.join(SESSION_LOG_FILE);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let text = fs::read_to_string(path)?;
        Ok(text.lines().map(str::to_string).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn process() -> ProcessName {
        ProcessName::from_parts(15, 2024)
    }

    #[test]
    fn test_store_then_load() {
        let tmp = tempfile::tempdir().unwrap();
        let shelf = ShelfCache::open(tmp.path(), &process(), Duration::hours(1)).unwrap();
        let record = RecordId::new();
        shelf.store(record, "15/2024_surveyor_1").unwrap();
        let entry = shelf.load().unwrap();
        assert_eq!(entry.record_id, record);
        assert_eq!(entry.branch, "15/2024_surveyor_1");
    }

    #[test]
    fn test_missing_entry_is_none() {
        let tmp = tempfile::tempdir().unwrap();
        let shelf = ShelfCache::open(tmp.path(), &process(), Duration::hours(1)).unwrap();
        assert!(shelf.load().is_none());
    }

    #[test]
    fn test_expired_entry_is_none() {
        let tmp = tempfile::tempdir().unwrap();
        let shelf = ShelfCache::open(tmp.path(), &process(), Duration::seconds(0)).unwrap();
        shelf.store(RecordId::new(), "b").unwrap();
        // TTL of zero expires immediately.
        assert!(shelf.load().is_none());
    }

    #[test]
    fn test_shelf_dir_uses_sanitized_name() {
        let tmp = tempfile::tempdir().unwrap();
        let shelf = ShelfCache::open(tmp.path(), &process(), Duration::hours(1)).unwrap();
        assert!(shelf.dir().ends_with("15_2024"));
    }

    #[test]
    fn test_session_log_appends() {
        let tmp = tempfile::tempdir().unwrap();
        let shelf = ShelfCache::open(tmp.path(), &process(), Duration::hours(1)).unwrap();
        shelf.log_session("b1", "surveyor", "open").unwrap();
        shelf.log_session("b1", "surveyor", "close").unwrap();
        let lines = shelf.session_log().unwrap();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("b1,surveyor,open"));
        assert!(lines[1].ends_with("b1,surveyor,close"));
    }

    #[test]
    fn test_reopen_preserves_entry() {
        let tmp = tempfile::tempdir().unwrap();
        let record = RecordId::new();
        {
            let shelf = ShelfCache::open(tmp.path(), &process(), Duration::hours(1)).unwrap();
            shelf.store(record, "b").unwrap();
        }
        let shelf = ShelfCache::open(tmp.path(), &process(), Duration::hours(1)).unwrap();
        assert_eq!(shelf.load().unwrap().record_id, record);
    }
}
