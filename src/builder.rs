//! Fluent builder API for codestyle.
//!
//! Provides both function composition and builder-style APIs
//! for turning a directory of sources into a feature dataset.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::batch::{BatchConfig, BatchOutput, BatchProcessor, CancellationToken};
use crate::dataset::Dataset;
use crate::errors::CodestyleError;
use crate::pipeline::FeaturePipeline;
use crate::walker::{collect_snippets, IdentifierSource, WalkOptions};

/// Builder for extracting a style dataset from a codebase.
///
/// # Examples
///
/// ```no_run
/// use codestyle::builder::Codestyle;
/// use codestyle::walker::IdentifierSource;
///
/// let result = Codestyle::new("./authors")
///     .threads(4)
///     .identifier(IdentifierSource::ParentDir)
///     .build()
///     .unwrap();
/// println!("{} rows, {} dropped", result.dataset.n_rows(), result.batch.failed_count());
/// ```
pub struct Codestyle {
    root: PathBuf,
    walk_options: WalkOptions,
    batch_config: BatchConfig,
    cancellation_token: Option<CancellationToken>,
}

impl Codestyle {
    /// Create a new builder for the given root path.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            walk_options: WalkOptions::default(),
            batch_config: BatchConfig::default(),
            cancellation_token: None,
        }
    }

    /// Number of worker threads (0 = one per CPU).
    pub fn threads(mut self, threads: usize) -> Self {
        self.batch_config = self.batch_config.with_threads(threads);
        self
    }

    /// Include hidden files.
    pub fn include_hidden(mut self, include: bool) -> Self {
        self.walk_options.include_hidden = include;
        self
    }

    /// Set maximum directory depth.
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.walk_options.max_depth = Some(depth);
        self
    }

    pub fn identifier(mut self, source: IdentifierSource) -> Self {
        self.walk_options.identifier = source;
        self
    }

    /// File extensions to collect (default: `java`).
    pub fn extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.walk_options = self.walk_options.extensions(extensions);
        self
    }

    pub fn cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = Some(token);
        self
    }

    /// Walk, extract and reconcile.
    pub fn build(self) -> Result<CodestyleResult, CodestyleError> {
        if !self.root.exists() {
            return Err(CodestyleError::PathNotFound(self.root));
        }

        let records = collect_snippets(&self.root, &self.walk_options)?;
        if records.is_empty() {
            return Err(CodestyleError::NoSnippetsFound(self.root));
        }

        let mut processor = BatchProcessor::new(FeaturePipeline::java(), self.batch_config);
        if let Some(token) = self.cancellation_token {
            processor = processor.with_cancellation_token(token);
        }

        let batch = processor.process(&records)?;
        let dataset = Dataset::from_batch(&batch.results);

        info!(
            root = %self.root.display(),
            rows = dataset.n_rows(),
            columns = dataset.n_cols(),
            dropped = batch.failed_count(),
            "dataset ready"
        );

        Ok(CodestyleResult { batch, dataset })
    }
}

/// Result of a codestyle run.
#[derive(Debug)]
pub struct CodestyleResult {
    /// Per-snippet outcomes, failures included.
    pub batch: BatchOutput,
    /// One row per successful snippet.
    pub dataset: Dataset,
}

impl CodestyleResult {
    /// Identifiers of the dropped snippets.
    pub fn dropped(&self) -> impl Iterator<Item = &str> {
        self.batch.failures.iter().map(|f| f.identifier.as_str())
    }
}

// ============================================================================
// Functional API
// ============================================================================

/// Build a dataset from a path with default options.
///
/// # Examples
///
/// ```no_run
/// use codestyle::builder::dataset_from_path;
///
/// let dataset = dataset_from_path("./authors").unwrap();
/// println!("{} features", dataset.n_cols());
/// ```
pub fn dataset_from_path(root: impl AsRef<Path>) -> Result<Dataset, CodestyleError> {
    Codestyle::new(root.as_ref()).build().map(|r| r.dataset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn create_test_project() -> TempDir {
        let dir = TempDir::new().unwrap();

        fs::create_dir_all(dir.path().join("alice")).unwrap();
        fs::create_dir_all(dir.path().join("bob")).unwrap();
        fs::write(
            dir.path().join("alice/Main.java"),
            r#"
class Main {
	public static void main(String[] args) {
		int x = args.length > 0 ? 1 : 2;
	}
}
"#,
        )
        .unwrap();
        fs::write(
            dir.path().join("bob/Util.java"),
            r#"
class Util
{
    // helper
    static int add(int a, int b)
    {
        return a + b;
    }
}
"#,
        )
        .unwrap();
        fs::write(dir.path().join("bob/Broken.java"), "class Broken { void f( }").unwrap();

        dir
    }

    #[test]
    fn test_codestyle_builder() {
        let dir = create_test_project();

        let result = Codestyle::new(dir.path()).threads(2).build().unwrap();

        assert_eq!(result.dataset.n_rows(), 2);
        assert_eq!(result.batch.failed_count(), 1);
        assert_eq!(result.dropped().collect::<Vec<_>>(), ["bob"]);

        let ids: Vec<_> = result
            .dataset
            .provenance()
            .iter()
            .map(|p| p.identifier.as_str())
            .collect();
        assert_eq!(ids, ["alice", "bob"]);
    }

    #[test]
    fn test_union_of_features() {
        let dir = create_test_project();

        let dataset = dataset_from_path(dir.path()).unwrap();
        let columns = dataset.columns();
        assert!(columns.iter().any(|c| c == "WordUnigramTF_args"));
        assert!(columns.iter().any(|c| c == "WordUnigramTF_add"));

        // alice never uses `return`
        let col = dataset.column_index("javaKeywords_return").unwrap();
        assert!(dataset.values()[[0, col]].is_nan());
        assert!(dataset.values()[[1, col]] > 0.0);
    }

    #[test]
    fn test_missing_root() {
        let err = Codestyle::new("/nonexistent/codestyle/root").build().unwrap_err();
        assert!(matches!(err, CodestyleError::PathNotFound(_)));
    }

    #[test]
    fn test_no_sources() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("README.md"), "# nothing").unwrap();

        let err = Codestyle::new(dir.path()).build().unwrap_err();
        assert!(matches!(err, CodestyleError::NoSnippetsFound(_)));
    }

    #[test]
    fn test_cancelled_build() {
        let dir = create_test_project();
        let token = CancellationToken::new();
        token.cancel();

        let result = Codestyle::new(dir.path())
            .cancellation_token(token)
            .build()
            .unwrap();
        assert!(result.batch.was_cancelled);
        assert!(result.dataset.is_empty());
    }
}
