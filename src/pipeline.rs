//! Per-snippet feature pipeline.
//!
//! ```text
//! text -> Frontend::analyze -> (tokens, tree) -> Snippet
//!                                                  |
//!          lexical + layout + syntactic extractors v
//!                                              FeatureMap
//! ```

use std::fmt;

use thiserror::Error;

use crate::features::{
    default_extractors, ComputationError, FeatureExtractor, FeatureMap, Snippet,
};
use crate::syntax::{Frontend, JavaFrontend, ParseError};

/// Category of a per-snippet failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    Parse,
    Computation,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Parse => write!(f, "parse"),
            FailureKind::Computation => write!(f, "computation"),
        }
    }
}

/// Why a snippet produced no feature map.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("computation error: {0}")]
    Computation(#[from] ComputationError),
}

impl PipelineError {
    pub fn kind(&self) -> FailureKind {
        match self {
            PipelineError::Parse(_) => FailureKind::Parse,
            PipelineError::Computation(_) => FailureKind::Computation,
        }
    }
}

/// Runs a front end and a set of extractors over snippet text.
///
/// # Examples
///
/// ```
/// use codestyle::pipeline::FeaturePipeline;
///
/// let pipeline = FeaturePipeline::java();
/// let features = pipeline.extract("class A { void f() {} }").unwrap();
/// assert!(features.contains("MaxDepthASTNode"));
/// ```
pub struct FeaturePipeline<F = JavaFrontend> {
    frontend: F,
    extractors: Vec<Box<dyn FeatureExtractor>>,
}

impl FeaturePipeline<JavaFrontend> {
    /// Java front end with the default extractors.
    pub fn java() -> Self {
        Self::new(JavaFrontend)
    }
}

impl Default for FeaturePipeline<JavaFrontend> {
    fn default() -> Self {
        Self::java()
    }
}

impl<F: Frontend> FeaturePipeline<F> {
    /// Create a pipeline with the lexical, layout and syntactic extractors.
    pub fn new(frontend: F) -> Self {
        Self {
            frontend,
            extractors: default_extractors(),
        }
    }

    /// Replace the extractor set.
    pub fn with_extractors(mut self, extractors: Vec<Box<dyn FeatureExtractor>>) -> Self {
        self.extractors = extractors;
        self
    }

    /// Append an extractor; it runs after the existing ones.
    pub fn with_extractor(mut self, extractor: impl FeatureExtractor + 'static) -> Self {
        self.extractors.push(Box::new(extractor));
        self
    }

    pub fn frontend(&self) -> &F {
        &self.frontend
    }

    /// Names of the registered extractors, in run order.
    pub fn extractor_names(&self) -> Vec<&'static str> {
        self.extractors.iter().map(|e| e.name()).collect()
    }

    /// Compute the merged feature map of one snippet.
    ///
    /// When two extractors emit the same name the later one wins.
    pub fn extract(&self, text: &str) -> Result<FeatureMap, PipelineError> {
        let (tokens, tree) = self.frontend.analyze(text)?;
        let snippet = Snippet::new(text, &tokens, &tree)?;

        let mut features = FeatureMap::new();
        for extractor in &self.extractors {
            features.merge(extractor.extract(&snippet)?);
        }
        Ok(features)
    }
}

impl<F> fmt::Debug for FeaturePipeline<F>
where
    F: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeaturePipeline")
            .field("frontend", &self.frontend)
            .field(
                "extractors",
                &self.extractors.iter().map(|e| e.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}
