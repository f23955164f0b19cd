//! Append-only file log backing the in-memory repository.

use std::path::{Path, PathBuf};

use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use super::codec::{decode_line, encode_line};
use crate::domain::entities::UrlRecord;
use crate::error::StoreError;

/// Append-only sink of encoded records.
///
/// The file is never rewritten or compacted. Replaying it from the start in
/// file order reproduces the in-memory index.
///
/// A failed append is cut back off the file so the next record starts on a
/// clean line. If even that fails, the log refuses further writes.
#[derive(Debug)]
pub struct DurableLog {
    path: PathBuf,
    file: File,
    /// Bytes known to hold complete lines.
    len: u64,
    failed: bool,
}

impl DurableLog {
    /// Opens the log for append, creating it if missing, and returns the
    /// records it already holds in file order.
    ///
    /// An undecodable last line without a trailing newline is the remains of a
    /// torn append; it is dropped from the file with a warning.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if the file cannot be opened or read,
    /// or if any other non-blank line cannot be decoded (the message names the line).
    pub async fn open(path: impl AsRef<Path>) -> Result<(Self, Vec<UrlRecord>), StoreError> {
        let path = path.as_ref().to_path_buf();

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| {
                StoreError::unavailable(format!("cannot open log {}: {e}", path.display()))
            })?;

        let contents = read_records(&path).await?;

        if contents.valid_len < contents.file_len {
            warn!(
                path = %path.display(),
                dropped_bytes = contents.file_len - contents.valid_len,
                "Dropping torn record at end of URL log"
            );
            file.set_len(contents.valid_len).await.map_err(|e| {
                StoreError::unavailable(format!("cannot truncate log {}: {e}", path.display()))
            })?;
        }

        let mut log = Self {
            path,
            file,
            len: contents.valid_len,
            failed: false,
        };
        if contents.missing_newline {
            log.write(b"\n").await?;
        }

        info!(
            path = %log.path.display(),
            records = contents.records.len(),
            "URL log opened"
        );

        Ok((log, contents.records))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one record and flushes it to the OS.
    pub async fn append(&mut self, record: &UrlRecord) -> Result<(), StoreError> {
        let line = encode_line(record)?;
        self.write(line.as_bytes()).await?;
        debug!(short_key = %record.short_key, deleted = record.deleted, "Record appended");
        Ok(())
    }

    /// Appends several records with a single write.
    pub async fn append_all(&mut self, records: &[UrlRecord]) -> Result<(), StoreError> {
        if records.is_empty() {
            return Ok(());
        }

        let mut buffer = String::new();
        for record in records {
            buffer.push_str(&encode_line(record)?);
        }
        self.write(buffer.as_bytes()).await?;
        debug!(count = records.len(), "Records appended");
        Ok(())
    }

    /// Flushes pending data and syncs it to disk.
    pub async fn sync(&mut self) -> Result<(), StoreError> {
        self.file.flush().await?;
        self.file.sync_all().await?;
        Ok(())
    }

    async fn write(&mut self, bytes: &[u8]) -> Result<(), StoreError> {
        if self.failed {
            return Err(StoreError::unavailable(format!(
                "log {} is unusable after a failed append",
                self.path.display()
            )));
        }

        if let Err(e) = write_and_flush(&mut self.file, bytes).await {
            self.rollback().await;
            return Err(StoreError::unavailable(format!(
                "cannot append to {}: {e}",
                self.path.display()
            )));
        }

        self.len += bytes.len() as u64;
        Ok(())
    }

    /// Cuts the file back to its last complete line.
    async fn rollback(&mut self) {
        if let Err(e) = self.file.set_len(self.len).await {
            warn!(
                error = %e,
                path = %self.path.display(),
                "Cannot remove partial append, refusing further writes"
            );
            self.failed = true;
        }
    }

    #[cfg(test)]
    pub(crate) async fn reopen_read_only(&mut self) {
        self.file = File::open(&self.path).await.unwrap();
    }
}

async fn write_and_flush(file: &mut File, bytes: &[u8]) -> std::io::Result<()> {
    file.write_all(bytes).await?;
    file.flush().await
}

#[derive(Debug)]
struct LogContents {
    records: Vec<UrlRecord>,
    file_len: u64,
    /// Length up to the end of the last line worth keeping.
    valid_len: u64,
    /// The kept data ends in a complete record that lacks its newline.
    missing_newline: bool,
}

async fn read_records(path: &Path) -> Result<LogContents, StoreError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| {
        StoreError::unavailable(format!("cannot read log {}: {e}", path.display()))
    })?;

    let mut records = Vec::new();
    let mut offset = 0usize;
    let mut line_no = 0usize;
    let mut valid_len = bytes.len();
    let mut missing_newline = false;

    while offset < bytes.len() {
        line_no += 1;
        let (end, terminated) = match bytes[offset..].iter().position(|b| *b == b'\n') {
            Some(pos) => (offset + pos, true),
            None => (bytes.len(), false),
        };
        let raw = &bytes[offset..end];
        let line_start = offset;
        offset = end + 1;

        let line = String::from_utf8_lossy(raw);
        if line.trim().is_empty() {
            continue;
        }

        match decode_line(&line) {
            Ok(record) => {
                records.push(record);
                missing_newline = !terminated;
            }
            Err(e) if !terminated => {
                warn!(path = %path.display(), line = line_no, error = %e, "Torn last line in URL log");
                valid_len = line_start;
            }
            Err(e) => {
                return Err(StoreError::unavailable(format!(
                    "{}: line {line_no}: {e}",
                    path.display()
                )));
            }
        }
    }

    Ok(LogContents {
        records,
        file_len: bytes.len() as u64,
        valid_len: valid_len as u64,
        missing_newline,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_open_creates_missing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("urls.log");

        let (log, records) = DurableLog::open(&path).await.unwrap();

        assert!(records.is_empty());
        assert!(path.exists());
        assert_eq!(log.path(), path.as_path());
    }

    #[tokio::test]
    async fn test_appended_records_are_replayed_in_order() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("urls.log");

        {
            let (mut log, _) = DurableLog::open(&path).await.unwrap();
            log.append(&UrlRecord::new("u1", "k1", "https://1.com"))
                .await
                .unwrap();
            log.append_all(&[
                UrlRecord::new("u1", "k2", "https://2.com"),
                UrlRecord::new("", "k3", "https://3.com"),
            ])
            .await
            .unwrap();
            log.sync().await.unwrap();
        }

        let (_, records) = DurableLog::open(&path).await.unwrap();
        let keys: Vec<_> = records.iter().map(|r| r.short_key.as_str()).collect();

        assert_eq!(keys, vec!["k1", "k2", "k3"]);
        assert_eq!(records[2].owner_id, "");
    }

    #[tokio::test]
    async fn test_blank_lines_are_skipped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("urls.log");
        std::fs::write(
            &path,
            "{\"short_url\":\"a\",\"original_url\":\"https://a.com\"}\n\n   \n",
        )
        .unwrap();

        let (_, records) = DurableLog::open(&path).await.unwrap();

        assert_eq!(records.len(), 1);
    }

    #[tokio::test]
    async fn test_corrupted_line_reports_line_number() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("urls.log");
        std::fs::write(
            &path,
            "{\"short_url\":\"a\",\"original_url\":\"https://a.com\"}\ngarbage\n",
        )
        .unwrap();

        let err = DurableLog::open(&path).await.unwrap_err();

        assert!(matches!(err, StoreError::Unavailable(_)));
        assert!(err.to_string().contains("line 2"));
    }

    #[tokio::test]
    async fn test_open_in_missing_directory_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing").join("urls.log");

        let err = DurableLog::open(&path).await.unwrap_err();

        assert!(matches!(err, StoreError::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_torn_last_line_is_dropped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("urls.log");
        std::fs::write(
            &path,
            "{\"uuid\":\"u1\",\"short_url\":\"a\",\"original_url\":\"https://a.com\"}\n{\"uuid\":\"u1\",\"short_",
        )
        .unwrap();

        let (mut log, records) = DurableLog::open(&path).await.unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].short_key, "a");

        log.append(&UrlRecord::new("u1", "b", "https://b.com"))
            .await
            .unwrap();
        drop(log);

        let (_, records) = DurableLog::open(&path).await.unwrap();
        let keys: Vec<_> = records.iter().map(|r| r.short_key.as_str()).collect();
        assert_eq!(keys, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_complete_last_line_without_newline_is_kept() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("urls.log");
        std::fs::write(
            &path,
            "{\"short_url\":\"a\",\"original_url\":\"https://a.com\"}",
        )
        .unwrap();

        let (mut log, records) = DurableLog::open(&path).await.unwrap();
        assert_eq!(records.len(), 1);

        log.append(&UrlRecord::new("", "b", "https://b.com"))
            .await
            .unwrap();
        drop(log);

        let (_, records) = DurableLog::open(&path).await.unwrap();
        assert_eq!(records.len(), 2);
    }

    #[tokio::test]
    async fn test_rollback_removes_partial_append() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("urls.log");
        let (mut log, _) = DurableLog::open(&path).await.unwrap();
        log.append(&UrlRecord::new("u1", "a", "https://a.com"))
            .await
            .unwrap();
        let good_len = std::fs::metadata(&path).unwrap().len();

        // Bytes of an append that failed half way.
        {
            use std::io::Write;
            let mut raw = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
            raw.write_all(b"{\"uuid\":\"u1\",\"sho").unwrap();
        }

        log.rollback().await;
        assert_eq!(std::fs::metadata(&path).unwrap().len(), good_len);

        log.append(&UrlRecord::new("u1", "b", "https://b.com"))
            .await
            .unwrap();
        drop(log);

        let (_, records) = DurableLog::open(&path).await.unwrap();
        assert_eq!(records.len(), 2);
    }

    #[tokio::test]
    async fn test_failed_append_blocks_later_writes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("urls.log");
        let (mut log, _) = DurableLog::open(&path).await.unwrap();
        log.append(&UrlRecord::new("u1", "a", "https://a.com"))
            .await
            .unwrap();

        log.reopen_read_only().await;

        let err = log
            .append(&UrlRecord::new("u1", "b", "https://b.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
        assert!(log.failed);

        let err = log
            .append_all(&[UrlRecord::new("u1", "c", "https://c.com")])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("unusable"));

        let (_, records) = DurableLog::open(&path).await.unwrap();
        assert_eq!(records.len(), 1);
    }
}
