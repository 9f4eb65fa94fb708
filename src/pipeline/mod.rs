//! Run orchestration: batch, fetch under the concurrency ceiling, checkpoint, merge.
//!
//! A run moves through `Batching -> Fetching -> AllBatchesSettled -> Merging`.
//! Each batch ends in one of the [`BatchOutcome`] states; none of them stop
//! the run, so merging always happens once every scheduled batch has settled.
//! The only fatal errors are invalid configuration (before any I/O) and a
//! malformed artifact during merging.


use std::sync::Arc;

use tokio::sync::broadcast;

use crate::batcher::QueryBatcher;
use crate::checkpoint::CheckpointStore;
use crate::config::Config;
use crate::error::Result;
use crate::limiter::ConcurrencyLimiter;
use crate::lookup::{BookLookup, FetchOutcome, GoogleBooksClient};
use crate::merger::Merger;
use crate::types::{BatchOutcome, Event, QueryUnit, RunReport};

/// Capacity of the event broadcast channel
const EVENT_CHANNEL_CAPACITY: usize = 1000;

/// Enrichment pipeline (cloneable - all shared state is Arc-wrapped)
#[derive(Clone)]
pub struct Enricher {
    config: Arc<Config>,
    batcher: QueryBatcher,
    lookup: Arc<dyn BookLookup>,
    limiter: ConcurrencyLimiter,
    store: CheckpointStore,
    merger: Merger,
    event_tx: broadcast::Sender<Event>,
}

/// What a spawned batch task needs, owned so the task is `'static`
struct BatchContext {
    lookup: Arc<dyn BookLookup>,
    limiter: ConcurrencyLimiter,
    store: CheckpointStore,
    event_tx: broadcast::Sender<Event>,
}

impl Enricher {
    /// Build a pipeline talking to the configured remote API
    ///
    /// Fails with a configuration error before touching the network or disk.
    pub fn new(config: Config) -> Result<Self> {
        let lookup = Arc::new(GoogleBooksClient::new(&config.api)?);
        Self::with_lookup(config, lookup)
    }

    /// Build a pipeline around a custom [`BookLookup`]
    pub fn with_lookup(config: Config, lookup: Arc<dyn BookLookup>) -> Result<Self> {
        config.validate()?;
        let batcher = QueryBatcher::new(config.api.endpoint()?, config.batching.batch_size)?;
        let limiter = ConcurrencyLimiter::new(config.batching.max_concurrency);
        let store = CheckpointStore::new(&config.storage.checkpoint_dir);
        let merger = Merger::new(store.clone(), &config.storage.output_path);
        let (event_tx, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Ok(Self {
            config: Arc::new(config),
            batcher,
            lookup,
            limiter,
            store,
            merger,
            event_tx,
        })
    }

    /// Subscribe to progress events
    ///
    /// Events sent before subscribing are not replayed.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Get the current configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The checkpoint store this pipeline writes to
    pub fn checkpoints(&self) -> &CheckpointStore {
        &self.store
    }

    /// Enrich `identifiers` and write the merged output
    ///
    /// Batches with an existing checkpoint are skipped without any remote
    /// call. Every other full batch is fetched at most `max_concurrency` at a
    /// time and checkpointed, then all checkpoints are merged.
    pub async fn run(&self, identifiers: &[String]) -> Result<RunReport> {
        let mut report = RunReport {
            batches: self.batcher.batch_count(identifiers.len()),
            dropped_identifiers: self.batcher.dropped(identifiers.len()),
            ..Default::default()
        };

        tracing::info!(
            identifiers = identifiers.len(),
            batches = report.batches,
            batch_size = self.batcher.batch_size(),
            max_concurrency = self.limiter.max(),
            "Starting enrichment run"
        );
        if report.dropped_identifiers > 0 {
            tracing::warn!(
                dropped = report.dropped_identifiers,
                batch_size = self.batcher.batch_size(),
                "Trailing identifiers do not fill a batch and will not be fetched"
            );
        }

        let mut tasks = Vec::new();
        for (batch, query) in self.batcher.queries(identifiers) {
            // Checked before scheduling so earlier attempts are never re-fetched
            if self.store.exists(batch.index).await {
                tracing::info!(
                    batch = batch.index,
                    path = %self.store.artifact_path(batch.index).display(),
                    "Already downloaded, skipping"
                );
                self.event_tx
                    .send(Event::BatchSkipped { index: batch.index })
                    .ok();
                report.tally(&BatchOutcome::Skipped);
                continue;
            }

            let ctx = BatchContext {
                lookup: Arc::clone(&self.lookup),
                limiter: self.limiter.clone(),
                store: self.store.clone(),
                event_tx: self.event_tx.clone(),
            };
            tasks.push((batch.index, tokio::spawn(process_batch(ctx, query))));
        }

        let (indices, handles): (Vec<_>, Vec<_>) = tasks.into_iter().unzip();
        let results = futures::future::join_all(handles).await;
        for (index, result) in indices.into_iter().zip(results) {
            let outcome = match result {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::error!(batch = index, error = %e, "Batch task panicked");
                    BatchOutcome::CheckpointFailed {
                        reason: format!("batch task panicked: {e}"),
                    }
                }
            };
            report.tally(&outcome);
        }

        tracing::info!(
            skipped = report.skipped,
            succeeded = report.succeeded,
            degraded = report.degraded,
            checkpoint_failed = report.checkpoint_failed,
            "All batches settled"
        );

        let summary = self.merger.merge().await?;
        report.output_rows = summary.rows;
        report.output_path = summary.path.clone();
        self.event_tx
            .send(Event::MergeCompleted {
                rows: summary.rows,
                path: summary.path,
            })
            .ok();

        Ok(report)
    }
}

/// Fetch one batch under the limiter and checkpoint whatever came back
///
/// Fetch failures still produce an (empty) checkpoint; only a failed write
/// leaves the batch unmarked so a later run tries it again.
async fn process_batch(ctx: BatchContext, query: QueryUnit) -> BatchOutcome {
    let index = query.index;
    let outcome = ctx.limiter.run(ctx.lookup.fetch(&query)).await;

    let (records, failure) = match outcome {
        FetchOutcome::Success(records) => (records, None),
        FetchOutcome::Failed(e) if e.is_contract_drift() => {
            tracing::error!(
                batch = index,
                query = %e.query(),
                error = ?e,
                "Unexpected response body, batch degraded to empty"
            );
            (Vec::new(), Some(e.to_string()))
        }
        FetchOutcome::Failed(e) => {
            tracing::warn!(
                batch = index,
                query = %e.query(),
                status = ?e.status(),
                error = %e,
                "Lookup failed, batch degraded to empty"
            );
            (Vec::new(), Some(e.to_string()))
        }
    };

    match ctx.store.write(index, &records).await {
        Ok(path) => {
            tracing::info!(batch = index, records = records.len(), path = %path.display(), "Wrote results");
            match failure {
                Some(reason) => {
                    ctx.event_tx
                        .send(Event::BatchDegraded {
                            index,
                            reason: reason.clone(),
                        })
                        .ok();
                    BatchOutcome::DegradedEmpty { reason }
                }
                None => {
                    ctx.event_tx
                        .send(Event::BatchFetched {
                            index,
                            records: records.len(),
                        })
                        .ok();
                    BatchOutcome::Succeeded {
                        records: records.len(),
                    }
                }
            }
        }
        Err(e) => {
            tracing::error!(batch = index, error = %e, "Failed to write checkpoint, batch will run again next time");
            ctx.event_tx
                .send(Event::CheckpointFailed {
                    index,
                    error: e.to_string(),
                })
                .ok();
            BatchOutcome::CheckpointFailed {
                reason: e.to_string(),
            }
        }
    }
}
