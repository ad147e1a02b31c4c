//! Parallel, fault-isolated batch processing of snippets.
//!
//! Every [`SnippetRecord`] is handed to the [`FeaturePipeline`] on a local
//! rayon pool. Workers share nothing mutable: each owns its record and its
//! result slot, and the thread-local parser cache gives every worker its own
//! parser. A failing record is logged, reported in
//! [`BatchOutput::failures`] and left out of the results; it never affects
//! another record.
//!
//! # Example
//!
//! ```
//! use codestyle::batch::{BatchConfig, BatchProcessor, SnippetRecord};
//!
//! let records = vec![
//!     SnippetRecord::new("alice", "class A { void f() {} }", 0),
//!     SnippetRecord::new("bob", "class B { void g( }", 1),
//! ];
//!
//! let processor = BatchProcessor::java(BatchConfig::new().with_threads(2));
//! let output = processor.process(&records).unwrap();
//!
//! assert_eq!(output.successful_count(), 1);
//! assert_eq!(output.failures[0].identifier, "bob");
//! ```

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rayon::prelude::*;
use thiserror::Error;
use tracing::{debug, info, trace, warn};

use crate::features::{ComputationError, FeatureMap};
use crate::pipeline::{FailureKind, FeaturePipeline, PipelineError};
use crate::syntax::{Frontend, JavaFrontend, Location};

/// One snippet to process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnippetRecord {
    /// Provenance, e.g. author or source file.
    pub identifier: String,
    pub text: String,
    /// Position in the original batch.
    pub index: usize,
}

impl SnippetRecord {
    pub fn new(identifier: impl Into<String>, text: impl Into<String>, index: usize) -> Self {
        Self {
            identifier: identifier.into(),
            text: text.into(),
            index,
        }
    }
}

/// Features of a successfully processed snippet.
#[derive(Debug, Clone, PartialEq)]
pub struct SnippetFeatures {
    pub identifier: String,
    pub features: FeatureMap,
    pub index: usize,
}

/// A snippet that was dropped from the batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnippetFailure {
    pub identifier: String,
    pub index: usize,
    pub kind: FailureKind,
    pub message: String,
    /// Offending location, for parse errors that carry one.
    pub location: Option<Location>,
}

impl SnippetFailure {
    fn new(record: &SnippetRecord, error: &PipelineError) -> Self {
        let (message, location) = match error {
            PipelineError::Parse(e) => (e.message.clone(), e.location),
            PipelineError::Computation(e) => (e.to_string(), None),
        };
        Self {
            identifier: record.identifier.clone(),
            index: record.index,
            kind: error.kind(),
            message,
            location,
        }
    }
}

/// Token for cancelling batch processing.
///
/// Cancellation stops records from being started; records already in flight
/// run to completion. Clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Safe to call from any thread.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Clear the flag. Only call while no batch is running.
    pub fn reset(&self) {
        self.cancelled.store(false, Ordering::SeqCst);
    }
}

/// Worker stack size used unless configured otherwise.
///
/// Trees up to [`MAX_TREE_DEPTH`](crate::syntax::MAX_TREE_DEPTH) levels are
/// converted and walked recursively, which needs more than rayon's 2 MiB.
pub const DEFAULT_STACK_SIZE: usize = 16 * 1024 * 1024;

/// Worker pool configuration.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Number of worker threads; `None` uses rayon's default (one per CPU).
    pub num_threads: Option<usize>,

    /// Stack size per worker in bytes; `None` leaves rayon's default.
    pub stack_size: Option<usize>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            num_threads: None,
            stack_size: Some(DEFAULT_STACK_SIZE),
        }
    }
}

impl BatchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use exactly `threads` workers. Zero leaves the choice to rayon.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.num_threads = (threads > 0).then_some(threads);
        self
    }

    pub fn with_stack_size(mut self, size: usize) -> Self {
        self.stack_size = Some(size);
        self
    }

    /// Configured worker count, or rayon's default.
    pub fn effective_threads(&self) -> usize {
        self.num_threads.unwrap_or_else(rayon::current_num_threads)
    }
}

/// Errors that fail a whole batch.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("failed to create worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Outcome of a batch run.
#[derive(Debug)]
pub struct BatchOutput {
    /// Successful snippets, in input order.
    pub results: Vec<SnippetFeatures>,

    /// Dropped snippets, in input order.
    pub failures: Vec<SnippetFailure>,

    /// Records never started because the batch was cancelled.
    pub skipped_count: usize,

    /// The token was cancelled by the time the map phase ended, even if
    /// every record had already started.
    pub was_cancelled: bool,

    /// Wall-clock time of the map phase.
    pub elapsed: Duration,

    pub threads_used: usize,
}

impl BatchOutput {
    pub fn successful_count(&self) -> usize {
        self.results.len()
    }

    pub fn failed_count(&self) -> usize {
        self.failures.len()
    }

    pub fn all_successful(&self) -> bool {
        self.failures.is_empty() && self.skipped_count == 0
    }

    /// Results sorted by their `index` field, which need not match input order.
    pub fn results_by_index(&self) -> Vec<&SnippetFeatures> {
        let mut sorted: Vec<_> = self.results.iter().collect();
        sorted.sort_by_key(|r| r.index);
        sorted
    }

    /// Feature maps only, dropping provenance.
    pub fn feature_maps(&self) -> Vec<&FeatureMap> {
        self.results.iter().map(|r| &r.features).collect()
    }
}

enum Outcome {
    Success(SnippetFeatures),
    Failure(SnippetFailure),
    Skipped,
}

/// Applies a [`FeaturePipeline`] to many snippets concurrently.
pub struct BatchProcessor<F = JavaFrontend> {
    pipeline: FeaturePipeline<F>,
    config: BatchConfig,
    cancellation_token: CancellationToken,
}

impl BatchProcessor<JavaFrontend> {
    /// Java pipeline with the default extractors.
    pub fn java(config: BatchConfig) -> Self {
        Self::new(FeaturePipeline::java(), config)
    }
}

impl<F: Frontend> BatchProcessor<F> {
    pub fn new(pipeline: FeaturePipeline<F>, config: BatchConfig) -> Self {
        Self {
            pipeline,
            config,
            cancellation_token: CancellationToken::new(),
        }
    }

    /// Share a cancellation token with other threads.
    pub fn with_cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = token;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation_token.clone()
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    pub fn pipeline(&self) -> &FeaturePipeline<F> {
        &self.pipeline
    }

    /// Process every record.
    ///
    /// Individual failures never make this return an error; only a batch
    /// wide problem (the worker pool cannot be built) does.
    pub fn process(&self, records: &[SnippetRecord]) -> Result<BatchOutput, BatchError> {
        let start = Instant::now();
        let threads_used = self.config.effective_threads();

        // A local pool so that processors with different worker counts can
        // coexist in one process.
        let mut builder = rayon::ThreadPoolBuilder::new().num_threads(threads_used);
        if let Some(stack_size) = self.config.stack_size {
            builder = builder.stack_size(stack_size);
        }
        let pool = builder.build()?;

        debug!(records = records.len(), threads = threads_used, "starting batch");

        // Workers log through the caller's dispatcher, scoped ones included.
        let dispatch = tracing::dispatcher::get_default(|d| d.clone());
        let outcomes: Vec<Outcome> = pool.install(|| {
            records
                .par_iter()
                .map(|record| {
                    tracing::dispatcher::with_default(&dispatch, || self.process_one(record))
                })
                .collect()
        });

        let mut results = Vec::new();
        let mut failures = Vec::new();
        let mut skipped_count = 0usize;
        for outcome in outcomes {
            match outcome {
                Outcome::Success(features) => results.push(features),
                Outcome::Failure(failure) => failures.push(failure),
                Outcome::Skipped => skipped_count += 1,
            }
        }

        let output = BatchOutput {
            results,
            failures,
            skipped_count,
            was_cancelled: skipped_count > 0 || self.cancellation_token.is_cancelled(),
            elapsed: start.elapsed(),
            threads_used,
        };

        info!(
            succeeded = output.successful_count(),
            failed = output.failed_count(),
            skipped = output.skipped_count,
            elapsed_ms = output.elapsed.as_millis() as u64,
            "batch finished"
        );

        Ok(output)
    }

    fn process_one(&self, record: &SnippetRecord) -> Outcome {
        if self.cancellation_token.is_cancelled() {
            return Outcome::Skipped;
        }

        trace!(identifier = %record.identifier, index = record.index, "processing snippet");

        // A panic inside one snippet's extraction must not tear down the batch.
        let result = panic::catch_unwind(AssertUnwindSafe(|| self.pipeline.extract(&record.text)))
            .unwrap_or_else(|payload| {
                Err(PipelineError::Computation(ComputationError::Panicked(
                    panic_message(payload.as_ref()),
                )))
            });

        match result {
            Ok(features) => Outcome::Success(SnippetFeatures {
                identifier: record.identifier.clone(),
                features,
                index: record.index,
            }),
            Err(error) => {
                let failure = SnippetFailure::new(record, &error);
                match failure.location {
                    Some(location) => warn!(
                        identifier = %failure.identifier,
                        index = failure.index,
                        kind = %failure.kind,
                        at = %location,
                        "dropping snippet: {}",
                        failure.message
                    ),
                    None => warn!(
                        identifier = %failure.identifier,
                        index = failure.index,
                        kind = %failure.kind,
                        "dropping snippet: {}",
                        failure.message
                    ),
                }
                Outcome::Failure(failure)
            }
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Process records on the Java pipeline with rayon's default worker count.
pub fn process_snippets(records: &[SnippetRecord]) -> Result<BatchOutput, BatchError> {
    BatchProcessor::java(BatchConfig::default()).process(records)
}
