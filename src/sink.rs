//! Newline-delimited JSON sinks and readers.
//!
//! The raw capture is append-only and flushed after every record, so an
//! interrupted run leaves a valid file. The filtered output is rewritten
//! whole through a temporary sibling and a rename.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use postsift_filter::{RawRecord, ScoredRecord};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{Result, SiftError};

/// Append-only writer for acquired records.
#[derive(Debug)]
pub struct RawSink {
    path: PathBuf,
    file: File,
    written: usize,
}

impl RawSink {
    /// Open `path` for appending, creating it and its parent directories.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be opened.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            file,
            written: 0,
        })
    }

    /// Append one record as a single line and flush it.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be encoded or written.
    pub fn append(&mut self, record: &RawRecord) -> Result<()> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');
        self.file.write_all(&line)?;
        self.file.flush()?;
        self.written += 1;
        Ok(())
    }

    /// Records appended through this handle.
    pub fn written(&self) -> usize {
        self.written
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Read every well-formed line of `path` as `T`.
///
/// Blank lines are ignored. Lines that are not valid UTF-8 or fail to
/// parse are logged at warn and counted in the second element of the result.
///
/// # Errors
///
/// Returns [`SiftError::Precondition`] if `path` does not exist, or an I/O
/// error if it cannot be read.
pub fn read_lines<T: DeserializeOwned>(path: &Path) -> Result<(Vec<T>, usize)> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(SiftError::Precondition(format!(
                "input file not found: {}",
                path.display()
            )));
        }
        Err(e) => return Err(e.into()),
    };

    let mut items = Vec::new();
    let mut skipped = 0usize;
    for (index, line) in BufReader::new(file).split(b'\n').enumerate() {
        let line = line?;
        let parsed = std::str::from_utf8(&line)
            .map_err(|e| e.to_string())
            .and_then(|text| {
                if text.trim().is_empty() {
                    Ok(None)
                } else {
                    serde_json::from_str::<T>(text)
                        .map(Some)
                        .map_err(|e| e.to_string())
                }
            });
        match parsed {
            Ok(Some(item)) => items.push(item),
            Ok(None) => {}
            Err(error) => {
                skipped += 1;
                tracing::warn!(
                    path = %path.display(),
                    line = index + 1,
                    %error,
                    "skipping malformed line"
                );
            }
        }
    }
    Ok((items, skipped))
}

/// Read a raw capture. See [`read_lines`].
///
/// # Errors
///
/// Same as [`read_lines`].
pub fn read_records(path: &Path) -> Result<(Vec<RawRecord>, usize)> {
    read_lines(path)
}

/// Read a filtered output file. See [`read_lines`].
///
/// # Errors
///
/// Same as [`read_lines`].
pub fn read_scored(path: &Path) -> Result<(Vec<ScoredRecord>, usize)> {
    read_lines(path)
}

/// Replace `path` with `records`, one per line, in the order given.
///
/// # Errors
///
/// Returns an error if the temporary file cannot be written or renamed.
/// The previous contents of `path` are untouched in that case.
pub fn write_filtered(path: &Path, records: &[ScoredRecord]) -> Result<()> {
    write_atomically(path, records)
}

fn write_atomically<T: Serialize>(path: &Path, items: &[T]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let tmp = temp_sibling(path);

    let result = (|| -> Result<()> {
        let mut writer = BufWriter::new(File::create(&tmp)?);
        for item in items {
            serde_json::to_writer(&mut writer, item)?;
            writer.write_all(b"\n")?;
        }
        let file = writer
            .into_inner()
            .map_err(|e| SiftError::Io(e.into_error()))?;
        file.sync_all()?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    })();

    if result.is_err() {
        let _ = std::fs::remove_file(&tmp);
    }
    result
}

fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_owned());
    path.with_file_name(format!(".{name}.tmp"))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[test]
    fn append_then_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("raw").join("posts.jsonl");

        let mut sink = RawSink::open(&path).unwrap();
        sink.append(&RawRecord::new("1", "first").with_source_keyword("defi"))
            .unwrap();
        sink.append(&RawRecord::new("2", "second")).unwrap();
        assert_eq!(sink.written(), 2);
        drop(sink);

        // Reopening appends rather than truncating.
        let mut sink = RawSink::open(&path).unwrap();
        sink.append(&RawRecord::new("3", "third")).unwrap();

        let (records, skipped) = read_records(&path).unwrap();
        assert_eq!(skipped, 0);
        let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
        assert_eq!(records[0].source_keyword.as_deref(), Some("defi"));
    }

    #[test]
    fn malformed_lines_are_counted_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("posts.jsonl");
        std::fs::write(
            &path,
            "{\"id\": \"1\", \"text\": \"ok\"}\n\nnot json\n{\"text\": \"no id\"}\n{\"id\": 2, \"text\": \"ok too\"}\n",
        )
        .unwrap();

        let (records, skipped) = read_records(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(skipped, 2);
        assert_eq!(records[1].id, "2");
    }

    #[test]
    fn non_utf8_line_is_skipped_like_bad_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("posts.jsonl");
        let mut bytes = b"{\"id\": \"1\", \"text\": \"before\"}\n".to_vec();
        bytes.extend_from_slice(b"{\"id\": \"2\", \"text\": \"\xff\xfe\"}\n");
        bytes.extend_from_slice(b"{\"id\": \"3\", \"text\": \"after\"}");
        std::fs::write(&path, bytes).unwrap();

        let (records, skipped) = read_records(&path).unwrap();
        assert_eq!(skipped, 1);
        let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "3"]);
    }

    #[test]
    fn missing_input_is_a_precondition_failure() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_records(&dir.path().join("nope.jsonl")).unwrap_err();
        assert!(matches!(err, SiftError::Precondition(_)));
        assert!(err.to_string().contains("nope.jsonl"));
    }

    #[test]
    fn write_filtered_replaces_previous_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("filtered.jsonl");
        std::fs::write(&path, "stale\nstale\nstale\n").unwrap();

        let records = vec![
            ScoredRecord {
                record: RawRecord::new("a", "exploit"),
                score: 15,
            },
            ScoredRecord {
                record: RawRecord::new("b", "sdk"),
                score: 5,
            },
        ];
        write_filtered(&path, &records).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);
        assert!(content.lines().next().unwrap().contains("\"score\":15"));

        let (back, skipped) = read_scored(&path).unwrap();
        assert_eq!(skipped, 0);
        assert_eq!(back, records);
        assert!(!temp_sibling(&path).exists());
    }

    #[test]
    fn write_filtered_with_no_records_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("filtered.jsonl");
        std::fs::write(&path, "stale\n").unwrap();
        write_filtered(&path, &[]).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
    }

    #[test]
    fn temp_sibling_is_hidden_next_to_target() {
        let tmp = temp_sibling(Path::new("out/filtered.jsonl"));
        assert_eq!(tmp, PathBuf::from("out/.filtered.jsonl.tmp"));
    }
}
