//! Identifier batching and query rendering.
//!
//! Batch `i` covers identifiers `[i * batch_size, (i + 1) * batch_size)`.
//! A trailing remainder shorter than `batch_size` is never turned into a
//! batch; [`QueryBatcher::dropped`] reports how many identifiers that leaves out.

use crate::error::{Error, Result};
use crate::types::{Batch, QueryUnit};
use url::Url;

/// Largest page the volume search API returns for one query
pub const MAX_RESULTS_PER_QUERY: usize = 40;

/// Splits identifiers into fixed-size batches and renders one query per batch
#[derive(Debug, Clone)]
pub struct QueryBatcher {
    endpoint: Url,
    batch_size: usize,
}

impl QueryBatcher {
    /// Create a batcher for `endpoint`
    ///
    /// Fails with a configuration error when `batch_size` is zero or larger
    /// than one result page.
    pub fn new(endpoint: Url, batch_size: usize) -> Result<Self> {
        if batch_size == 0 {
            return Err(Error::config(
                "batching.batch_size",
                "batch_size must be at least 1",
            ));
        }
        if batch_size > MAX_RESULTS_PER_QUERY {
            return Err(Error::config(
                "batching.batch_size",
                format!("batch_size must not exceed {MAX_RESULTS_PER_QUERY}"),
            ));
        }
        Ok(Self {
            endpoint,
            batch_size,
        })
    }

    /// Identifiers per batch
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Number of full batches `len` identifiers produce
    pub fn batch_count(&self, len: usize) -> usize {
        len / self.batch_size
    }

    /// Identifiers past the last full batch
    pub fn dropped(&self, len: usize) -> usize {
        len % self.batch_size
    }

    /// Lazily partition `identifiers`; calling again restarts from batch 0
    pub fn batches<'a>(&'a self, identifiers: &'a [String]) -> impl Iterator<Item = Batch> + 'a {
        identifiers
            .chunks_exact(self.batch_size)
            .enumerate()
            .map(|(index, chunk)| Batch {
                index,
                members: chunk.to_vec(),
            })
    }

    /// Lazily partition and render, yielding each batch with its query
    pub fn queries<'a>(
        &'a self,
        identifiers: &'a [String],
    ) -> impl Iterator<Item = (Batch, QueryUnit)> + 'a {
        self.batches(identifiers).map(|batch| {
            let query = self.render(&batch);
            (batch, query)
        })
    }

    /// Render the request for one batch
    ///
    /// Members are OR-joined into a single `q` parameter; form encoding keeps
    /// arbitrary identifier text from breaking out of the parameter. The page
    /// size is always the API maximum so identifiers matching several volumes
    /// are not cut short.
    pub fn render(&self, batch: &Batch) -> QueryUnit {
        let terms = batch
            .members
            .iter()
            .map(|id| format!("isbn:{id}"))
            .collect::<Vec<_>>()
            .join(" OR ");

        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("q", &terms)
            .append_pair("maxResults", &MAX_RESULTS_PER_QUERY.to_string());

        QueryUnit {
            index: batch.index,
            url,
        }
    }
}
