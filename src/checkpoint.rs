//! Per-batch checkpoint artifacts.
//!
//! Each attempted batch leaves one `_partNNNN.csv` file in the checkpoint
//! directory. The file's existence is what marks the batch as done; a file
//! with only a header is a completed attempt that produced nothing.
//!
//! Writes go to a sibling temporary file that is renamed into place, so a
//! crash mid-write never leaves a truncated artifact behind.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result, StorageError};
use crate::types::{COLUMNS, Record};

const ARTIFACT_PREFIX: &str = "_part";
const ARTIFACT_SUFFIX: &str = ".csv";

/// Directory of batch-indexed CSV artifacts
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    dir: PathBuf,
}

impl CheckpointStore {
    /// Use `dir` as the checkpoint namespace (created on first write)
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The checkpoint directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Location of the artifact for batch `index`
    pub fn artifact_path(&self, index: usize) -> PathBuf {
        self.dir
            .join(format!("{ARTIFACT_PREFIX}{index:04}{ARTIFACT_SUFFIX}"))
    }

    /// Whether batch `index` has already been attempted
    ///
    /// An artifact that cannot be checked counts as absent, so the batch is
    /// fetched again.
    pub async fn exists(&self, index: usize) -> bool {
        let path = self.artifact_path(index);
        match tokio::fs::try_exists(&path).await {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(batch = index, path = %path.display(), error = %e, "Cannot check checkpoint, treating batch as not attempted");
                false
            }
        }
    }

    /// Write the records for batch `index`, replacing any previous artifact
    pub async fn write(&self, index: usize, records: &[Record]) -> Result<PathBuf> {
        let path = self.artifact_path(index);
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| StorageError::CreateDir {
                path: self.dir.clone(),
                source,
            })?;

        let bytes = encode_records(records).map_err(|e| StorageError::Encode {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        write_atomically(&path, &bytes).await?;

        tracing::debug!(batch = index, records = records.len(), path = %path.display(), "Checkpoint written");
        Ok(path)
    }

    /// Indices of every artifact present, ascending
    ///
    /// A missing directory is an empty namespace. Files not named like
    /// artifacts are ignored.
    pub async fn indices(&self) -> Result<Vec<usize>> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Error::Io(e)),
        };

        let mut indices = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if let Some(index) = entry.file_name().to_str().and_then(parse_artifact_name) {
                indices.push(index);
            }
        }
        indices.sort_unstable();
        Ok(indices)
    }

    /// Read the records stored for batch `index`
    ///
    /// Any deviation from the record schema is a data integrity error naming
    /// the artifact.
    pub async fn read(&self, index: usize) -> Result<Vec<Record>> {
        let path = self.artifact_path(index);
        let bytes = tokio::fs::read(&path).await?;
        decode_records(&bytes).map_err(|reason| Error::DataIntegrity {
            artifact: path,
            reason,
        })
    }
}

fn parse_artifact_name(name: &str) -> Option<usize> {
    let digits = name
        .strip_prefix(ARTIFACT_PREFIX)?
        .strip_suffix(ARTIFACT_SUFFIX)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Encode records as CSV with the fixed header, even when there are none
pub(crate) fn encode_records(records: &[Record]) -> std::result::Result<Vec<u8>, csv::Error> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer.write_record(COLUMNS)?;
    for record in records {
        writer.serialize(record)?;
    }
    writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))
}

/// Decode CSV produced by [`encode_records`], checking the header first
pub(crate) fn decode_records(bytes: &[u8]) -> std::result::Result<Vec<Record>, String> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(bytes);

    let headers = reader.headers().map_err(|e| e.to_string())?;
    if headers.iter().ne(COLUMNS.iter().copied()) {
        return Err(format!(
            "expected columns [{}], found [{}]",
            COLUMNS.join(","),
            headers.iter().collect::<Vec<_>>().join(",")
        ));
    }

    reader
        .deserialize::<Record>()
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| e.to_string())
}

/// Write `bytes` to `path` via a temporary sibling and a rename
pub(crate) async fn write_atomically(path: &Path, bytes: &[u8]) -> std::result::Result<(), StorageError> {
    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp = path.with_file_name(tmp_name);

    tokio::fs::write(&tmp, bytes)
        .await
        .map_err(|source| StorageError::Write {
            path: path.to_path_buf(),
            source,
        })?;

    if let Err(source) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(StorageError::Write {
            path: path.to_path_buf(),
            source,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(title: &str) -> Record {
        Record {
            isbn13: Some(format!("978{title}")),
            title: Some(title.to_string()),
            authors: Some("A;B".into()),
            description: Some("line one, with comma\nline \"two\"".into()),
            ..Default::default()
        }
    }

    #[test]
    fn artifact_names_round_trip_through_parser() {
        let store = CheckpointStore::new("/ckpt");
        let path = store.artifact_path(12);
        assert_eq!(path, PathBuf::from("/ckpt/_part0012.csv"));
        let name = path.file_name().and_then(|n| n.to_str()).expect("name");
        assert_eq!(parse_artifact_name(name), Some(12));
    }

    #[test]
    fn unrelated_names_are_ignored() {
        assert_eq!(parse_artifact_name("_part.csv"), None);
        assert_eq!(parse_artifact_name("_part0001.csv.tmp"), None);
        assert_eq!(parse_artifact_name("notes.csv"), None);
        assert_eq!(parse_artifact_name("_part00a1.csv"), None);
        assert_eq!(parse_artifact_name("_part10000.csv"), Some(10000));
    }

    #[tokio::test]
    async fn write_then_read_preserves_order_and_absence() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = CheckpointStore::new(dir.path().join("tmp"));
        let records = vec![record("first"), Record::default(), record("third")];

        assert!(!store.exists(0).await);
        store.write(0, &records).await.expect("write");
        assert!(store.exists(0).await);

        let read = store.read(0).await.expect("read");
        assert_eq!(read, records);
        assert_eq!(read[1], Record::default(), "absent fields stay absent");
    }

    #[tokio::test]
    async fn empty_batch_still_marks_attempt_with_header() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = CheckpointStore::new(dir.path());

        let path = store.write(4, &[]).await.expect("write");

        assert!(store.exists(4).await);
        let contents = std::fs::read_to_string(path).expect("read file");
        assert_eq!(
            contents,
            "isbn10,isbn13,title,subtitle,authors,categories,thumbnail,description,published_year\n"
        );
        assert!(store.read(4).await.expect("read").is_empty());
    }

    #[tokio::test]
    async fn rewriting_same_index_overwrites() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = CheckpointStore::new(dir.path());

        store.write(1, &[record("old")]).await.expect("first write");
        let first = std::fs::read(store.artifact_path(1)).expect("bytes");
        store.write(1, &[record("new")]).await.expect("second write");
        store.write(1, &[record("new")]).await.expect("third write");
        let third = std::fs::read(store.artifact_path(1)).expect("bytes");

        assert_ne!(first, third);
        assert_eq!(store.read(1).await.expect("read"), vec![record("new")]);
        assert_eq!(store.indices().await.expect("indices"), vec![1]);
    }

    #[tokio::test]
    async fn indices_are_sorted_and_skip_foreign_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = CheckpointStore::new(dir.path());
        for index in [10, 2, 0] {
            store.write(index, &[]).await.expect("write");
        }
        std::fs::write(dir.path().join("README.txt"), "hello").expect("foreign file");
        std::fs::write(dir.path().join("_part0003.csv.tmp"), "partial").expect("leftover");

        assert_eq!(store.indices().await.expect("indices"), vec![0, 2, 10]);
    }

    #[tokio::test]
    async fn blocked_checkpoint_dir_counts_as_absent() {
        let dir = tempfile::tempdir().expect("tempdir");
        // A regular file where the checkpoint directory should be
        let blocker = dir.path().join("tmp");
        std::fs::write(&blocker, "not a directory").expect("blocker");
        let store = CheckpointStore::new(&blocker);

        assert!(tokio::fs::try_exists(store.artifact_path(0)).await.is_err());
        assert!(!store.exists(0).await);
    }

    #[tokio::test]
    async fn missing_directory_is_empty_namespace() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = CheckpointStore::new(dir.path().join("never-created"));
        assert!(store.indices().await.expect("indices").is_empty());
    }

    #[tokio::test]
    async fn header_mismatch_is_data_integrity_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = CheckpointStore::new(dir.path());
        std::fs::write(store.artifact_path(5), "isbn,title\n1,x\n").expect("write");

        match store.read(5).await {
            Err(Error::DataIntegrity { artifact, .. }) => {
                assert_eq!(artifact, store.artifact_path(5));
            }
            other => panic!("expected DataIntegrity, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn short_row_is_data_integrity_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = CheckpointStore::new(dir.path());
        let mut contents = COLUMNS.join(",");
        contents.push_str("\nonly,three,fields\n");
        std::fs::write(store.artifact_path(0), contents).expect("write");

        assert!(matches!(
            store.read(0).await,
            Err(Error::DataIntegrity { .. })
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn unwritable_directory_is_storage_error() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().expect("tempdir");
        let locked = dir.path().join("locked");
        std::fs::create_dir(&locked).expect("mkdir");
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o500)).expect("chmod");

        // Running as root bypasses permission bits; nothing to assert then
        if std::fs::write(locked.join("write-check"), b"x").is_ok() {
            return;
        }

        let store = CheckpointStore::new(&locked);
        let result = store.write(0, &[]).await;
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o700)).expect("chmod");

        assert!(matches!(result, Err(Error::Storage(_))), "got {result:?}");
        assert!(!store.exists(0).await, "failed write leaves no artifact");
    }
}
