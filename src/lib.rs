//! # isbn-enrich
//!
//! Resumable enrichment of ISBN lists with bibliographic metadata from a
//! paginated volume search API.
//!
//! ## How a run works
//!
//! - Identifiers are split into fixed-size batches; each batch becomes one request
//! - Requests run concurrently, never more than `max_concurrency` at once
//! - Every attempted batch is checkpointed to its own CSV artifact, even when
//!   the request failed, and checkpointed batches are skipped on the next run
//! - Once every batch has settled, the artifacts are merged into one output file
//!
//! ## Quick Start
//!
//! ```no_run
//! use isbn_enrich::{Config, Enricher};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut config = Config::default();
//!     config.api.api_key = "my-key".to_string();
//!     config.batching.max_concurrency = 4;
//!
//!     let enricher = Enricher::new(config)?;
//!
//!     // Subscribe to events
//!     let mut events = enricher.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let identifiers = vec!["9780441172719".to_string(); 40];
//!     let report = enricher.run(&identifiers).await?;
//!     println!("{} rows in {}", report.output_rows, report.output_path.display());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Identifier batching and query rendering
pub mod batcher;
/// Per-batch checkpoint artifacts
pub mod checkpoint;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Concurrency ceiling
pub mod limiter;
/// Remote volume lookups
pub mod lookup;
/// Checkpoint consolidation
pub mod merger;
/// Run orchestration
pub mod pipeline;
/// Identifier source loading
pub mod source;
/// Core types and events
pub mod types;

// Re-export commonly used types
pub use batcher::QueryBatcher;
pub use checkpoint::CheckpointStore;
pub use config::Config;
pub use error::{Error, FetchError, Result, StorageError};
pub use limiter::ConcurrencyLimiter;
pub use lookup::{BookLookup, FetchOutcome, GoogleBooksClient};
pub use merger::{MergeSummary, Merger};
pub use pipeline::Enricher;
pub use source::load_identifiers;
pub use types::{Batch, BatchOutcome, Event, QueryUnit, Record, RunReport};
