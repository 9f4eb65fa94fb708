//! Consolidation of checkpoint artifacts into the final output.

use std::path::PathBuf;

use crate::checkpoint::{CheckpointStore, encode_records, write_atomically};
use crate::error::{Result, StorageError};

/// Outcome of a merge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeSummary {
    /// Artifacts read, ascending by batch index
    pub artifacts: usize,
    /// Rows written
    pub rows: usize,
    /// Output location
    pub path: PathBuf,
}

/// Concatenates every checkpoint artifact into one output file
#[derive(Debug, Clone)]
pub struct Merger {
    store: CheckpointStore,
    output_path: PathBuf,
}

impl Merger {
    /// Merge from `store` into `output_path`
    pub fn new(store: CheckpointStore, output_path: impl Into<PathBuf>) -> Self {
        Self {
            store,
            output_path: output_path.into(),
        }
    }

    /// Read all artifacts in batch order and write the output
    ///
    /// Every artifact is loaded before anything is written, so a malformed
    /// artifact aborts with no output at all. An empty namespace produces a
    /// header-only file. Any previous output is replaced.
    pub async fn merge(&self) -> Result<MergeSummary> {
        let indices = self.store.indices().await?;
        tracing::info!(artifacts = indices.len(), dir = %self.store.dir().display(), "Merging checkpoint artifacts");

        let mut rows = Vec::new();
        for &index in &indices {
            rows.extend(self.store.read(index).await?);
        }

        let bytes = encode_records(&rows).map_err(|e| StorageError::Encode {
            path: self.output_path.clone(),
            reason: e.to_string(),
        })?;

        if let Some(parent) = self
            .output_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| StorageError::CreateDir {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }
        write_atomically(&self.output_path, &bytes).await?;

        tracing::info!(rows = rows.len(), path = %self.output_path.display(), "Merged output written");
        Ok(MergeSummary {
            artifacts: indices.len(),
            rows: rows.len(),
            path: self.output_path.clone(),
        })
    }
}
