//! Codestyle - stylometric feature extraction for Java source code.
//!
//! Codestyle tokenizes and parses code snippets, measures lexical, layout and
//! syntactic habits of their authors, and reconciles the sparse per-snippet
//! measurements into a dense dataset suitable for authorship attribution.
//!
//! # Quick Start
//!
//! ```no_run
//! use codestyle::builder::Codestyle;
//! use codestyle::walker::IdentifierSource;
//!
//! // One directory per author, one or more .java files inside each
//! let result = Codestyle::new("./authors")
//!     .identifier(IdentifierSource::ParentDir)
//!     .threads(8)
//!     .build()
//!     .unwrap();
//!
//! println!("{} snippets x {} features", result.dataset.n_rows(), result.dataset.n_cols());
//! println!("{} snippets dropped", result.batch.failed_count());
//! ```
//!
//! # Modules
//!
//! - [`syntax`] - Tokens, syntax trees and the Java front end
//! - [`features`] - Lexical, layout and syntactic feature extractors
//! - [`pipeline`] - Per-snippet extraction pipeline
//! - [`batch`] - Parallel, fault-isolated batch processing
//! - [`dataset`] - Sparse-to-dense reconciliation
//! - [`walker`] - Directory traversal with gitignore support
//! - [`output`] - CSV and JSON output
//! - [`builder`] - Fluent API for the whole run
//! - [`logging`] - `tracing` subscriber setup

pub mod syntax;
pub mod features;
pub mod pipeline;
pub mod batch;
pub mod dataset;
pub mod errors;
pub mod walker;
pub mod output;
pub mod builder;
pub mod logging;

// Re-export key types at crate root for convenience
pub use batch::{
    BatchConfig, BatchError, BatchOutput, BatchProcessor, CancellationToken, SnippetFailure,
    SnippetFeatures, SnippetRecord,
};
pub use builder::{Codestyle, CodestyleResult};
pub use dataset::{build_dataset, vocabulary, Dataset, RowProvenance, MISSING};
pub use errors::CodestyleError;
pub use features::{ComputationError, FeatureExtractor, FeatureMap, Snippet};
pub use output::{FeatureFormat, OutputError, OutputFormat};
pub use pipeline::{FailureKind, FeaturePipeline, PipelineError};
pub use syntax::{Frontend, JavaFrontend, Location, ParseError, SyntaxNode, Token, TokenKind};
pub use walker::{IdentifierSource, WalkError};
