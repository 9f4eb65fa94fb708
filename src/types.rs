//! Core types and events

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use url::Url;

/// Column order shared by checkpoint artifacts and the merged output
pub const COLUMNS: [&str; 9] = [
    "isbn10",
    "isbn13",
    "title",
    "subtitle",
    "authors",
    "categories",
    "thumbnail",
    "description",
    "published_year",
];

/// Separator used when flattening authors and categories into one field
pub const LIST_DELIMITER: &str = ";";

/// A fixed-size slice of the input identifiers, fetched as one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    /// Position of the batch in the run; names its checkpoint artifact
    pub index: usize,
    /// Identifiers in input order
    pub members: Vec<String>,
}

/// The rendered request for one [`Batch`]
///
/// The URL never contains the API key, so it is safe to log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryUnit {
    /// Index of the batch this query was rendered from
    pub index: usize,
    /// Request URL without credentials
    pub url: Url,
}

impl QueryUnit {
    /// URL as a string, for logs and error messages
    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }
}

/// One normalized bibliographic row
///
/// Field order matches [`COLUMNS`]; the serde names are the column names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// ISBN-10 identifier
    pub isbn10: Option<String>,
    /// ISBN-13 identifier
    pub isbn13: Option<String>,
    /// Title
    pub title: Option<String>,
    /// Subtitle
    pub subtitle: Option<String>,
    /// Authors joined with [`LIST_DELIMITER`]
    pub authors: Option<String>,
    /// Categories joined with [`LIST_DELIMITER`]
    pub categories: Option<String>,
    /// Thumbnail image URL
    #[serde(rename = "thumbnail")]
    pub thumbnail_url: Option<String>,
    /// Description
    pub description: Option<String>,
    /// Four-digit publication year
    pub published_year: Option<String>,
}

/// Terminal state of one batch within a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOutcome {
    /// A checkpoint already existed; nothing was fetched
    Skipped,
    /// Fetched and checkpointed
    Succeeded {
        /// Number of records written
        records: usize,
    },
    /// Fetch failed; an empty checkpoint was written
    DegradedEmpty {
        /// Why the fetch failed
        reason: String,
    },
    /// The checkpoint could not be written; the batch runs again next time
    CheckpointFailed {
        /// Why the write failed
        reason: String,
    },
}

/// Summary of a completed run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Full batches derived from the input
    pub batches: usize,
    /// Batches skipped because a checkpoint already existed
    pub skipped: usize,
    /// Batches fetched and checkpointed
    pub succeeded: usize,
    /// Batches whose fetch failed and were checkpointed empty
    pub degraded: usize,
    /// Batches whose checkpoint write failed
    pub checkpoint_failed: usize,
    /// Trailing identifiers that did not fill a batch and were not fetched
    pub dropped_identifiers: usize,
    /// Rows in the merged output
    pub output_rows: usize,
    /// Where the merged output was written
    pub output_path: PathBuf,
}

impl RunReport {
    /// Record one batch outcome in the counters
    pub fn tally(&mut self, outcome: &BatchOutcome) {
        match outcome {
            BatchOutcome::Skipped => self.skipped += 1,
            BatchOutcome::Succeeded { .. } => self.succeeded += 1,
            BatchOutcome::DegradedEmpty { .. } => self.degraded += 1,
            BatchOutcome::CheckpointFailed { .. } => self.checkpoint_failed += 1,
        }
    }
}

/// Progress events emitted during a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Batch already checkpointed by an earlier run
    BatchSkipped {
        /// Batch index
        index: usize,
    },
    /// Batch fetched and checkpointed
    BatchFetched {
        /// Batch index
        index: usize,
        /// Records written
        records: usize,
    },
    /// Batch fetch failed and was checkpointed empty
    BatchDegraded {
        /// Batch index
        index: usize,
        /// Failure description
        reason: String,
    },
    /// Batch checkpoint could not be written
    CheckpointFailed {
        /// Batch index
        index: usize,
        /// Failure description
        error: String,
    },
    /// Output merged
    MergeCompleted {
        /// Rows written
        rows: usize,
        /// Output location
        path: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tally_counts_each_state() {
        let mut report = RunReport::default();
        report.tally(&BatchOutcome::Skipped);
        report.tally(&BatchOutcome::Succeeded { records: 3 });
        report.tally(&BatchOutcome::Succeeded { records: 0 });
        report.tally(&BatchOutcome::DegradedEmpty {
            reason: "timeout".into(),
        });
        report.tally(&BatchOutcome::CheckpointFailed {
            reason: "read-only".into(),
        });

        assert_eq!(report.skipped, 1);
        assert_eq!(report.succeeded, 2);
        assert_eq!(report.degraded, 1);
        assert_eq!(report.checkpoint_failed, 1);
    }

    #[test]
    fn record_fields_follow_column_order() {
        let record = Record {
            isbn10: Some("a".into()),
            isbn13: Some("b".into()),
            title: Some("c".into()),
            subtitle: Some("d".into()),
            authors: Some("e".into()),
            categories: Some("f".into()),
            thumbnail_url: Some("g".into()),
            description: Some("h".into()),
            published_year: Some("i".into()),
        };
        let json = serde_json::to_value(&record).expect("serialize");
        let keys: Vec<&str> = json
            .as_object()
            .expect("object")
            .keys()
            .map(String::as_str)
            .collect();
        let mut expected = COLUMNS.to_vec();
        expected.sort_unstable();
        let mut actual = keys.clone();
        actual.sort_unstable();
        assert_eq!(actual, expected, "serde names must be the column names");
    }
}
