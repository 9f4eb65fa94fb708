//! Identifier loading from a tabular source dataset.

use std::path::Path;

use crate::config::SourceConfig;
use crate::error::{Error, Result};

/// Read identifiers from `path`, keeping rows in the configured language
///
/// Rows are kept when the language column starts with
/// `language_prefix`; identifiers are returned in file order, untouched.
pub fn load_identifiers(path: &Path, source: &SourceConfig) -> Result<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .map_err(|e| source_error(path, e.to_string()))?;

    let headers = reader
        .headers()
        .map_err(|e| source_error(path, e.to_string()))?
        .clone();
    let isbn_col = column_index(&headers, &source.isbn_column)
        .ok_or_else(|| source_error(path, format!("missing column {:?}", source.isbn_column)))?;
    let lang_col = column_index(&headers, &source.language_column).ok_or_else(|| {
        source_error(path, format!("missing column {:?}", source.language_column))
    })?;

    let mut identifiers = Vec::new();
    let mut rejected = 0usize;
    for row in reader.records() {
        let row = row.map_err(|e| source_error(path, e.to_string()))?;
        let language = row.get(lang_col).unwrap_or_default();
        match row.get(isbn_col) {
            Some(isbn) if language.starts_with(&source.language_prefix) => {
                identifiers.push(isbn.to_string());
            }
            _ => rejected += 1,
        }
    }

    tracing::info!(
        path = %path.display(),
        kept = identifiers.len(),
        rejected,
        language_prefix = %source.language_prefix,
        "Loaded identifiers"
    );
    Ok(identifiers)
}

fn column_index(headers: &csv::StringRecord, name: &str) -> Option<usize> {
    headers.iter().position(|h| h.trim() == name)
}

fn source_error(path: &Path, reason: String) -> Error {
    Error::Source {
        path: path.to_path_buf(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_source(contents: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("goodreads.csv");
        std::fs::write(&path, contents).expect("write source");
        (dir, path)
    }

    #[test]
    fn keeps_matching_language_in_order() {
        let (_dir, path) = write_source(
            "bookID,title,isbn13,language_code\n\
             1,A,9780000000001,eng\n\
             2,B,9780000000002,spa\n\
             3,C,9780000000003,en-US\n\
             4,D,9780000000001,en-GB\n",
        );

        let ids = load_identifiers(&path, &SourceConfig::default()).expect("load");

        assert_eq!(
            ids,
            vec!["9780000000001", "9780000000003", "9780000000001"],
            "order kept, duplicates kept"
        );
    }

    #[test]
    fn empty_language_is_rejected() {
        let (_dir, path) = write_source("isbn13,language_code\n9780000000001,\n9780000000002,en\n");
        let ids = load_identifiers(&path, &SourceConfig::default()).expect("load");
        assert_eq!(ids, vec!["9780000000002"]);
    }

    #[test]
    fn custom_columns_and_prefix() {
        let (_dir, path) = write_source("code,lang\nX1,fr\nX2,fre\nX3,en\n");
        let source = SourceConfig {
            isbn_column: "code".into(),
            language_column: "lang".into(),
            language_prefix: "fr".into(),
            ..Default::default()
        };
        assert_eq!(
            load_identifiers(&path, &source).expect("load"),
            vec!["X1", "X2"]
        );
    }

    #[test]
    fn missing_column_is_source_error() {
        let (_dir, path) = write_source("title,language_code\nA,eng\n");
        let err = load_identifiers(&path, &SourceConfig::default()).expect_err("must fail");
        match err {
            Error::Source { reason, .. } => assert!(reason.contains("isbn13"), "got {reason}"),
            other => panic!("expected Source error, got {other:?}"),
        }
    }

    #[test]
    fn missing_file_is_source_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = load_identifiers(&dir.path().join("absent.csv"), &SourceConfig::default())
            .expect_err("must fail");
        assert!(matches!(err, Error::Source { .. }));
    }
}
