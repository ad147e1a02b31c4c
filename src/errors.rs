//! Error types for codestyle.

use std::path::PathBuf;

use crate::batch::BatchError;
use crate::output::OutputError;
use crate::pipeline::PipelineError;
use crate::walker::WalkError;

/// Top-level error type for codestyle operations.
///
/// Per-snippet failures never show up here; they are reported in
/// [`BatchOutput::failures`](crate::batch::BatchOutput::failures).
#[derive(Debug, thiserror::Error)]
pub enum CodestyleError {
    #[error("path not found: {0}")]
    PathNotFound(PathBuf),

    #[error("no source files found in {0}")]
    NoSnippetsFound(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("walk error: {0}")]
    Walk(#[from] WalkError),

    #[error("batch error: {0}")]
    Batch(#[from] BatchError),

    #[error("{0}")]
    Pipeline(#[from] PipelineError),

    #[error("output error: {0}")]
    Output(#[from] OutputError),
}

/// Map an error to its exit code.
pub fn exit_code(error: &CodestyleError) -> i32 {
    match error {
        CodestyleError::PathNotFound(_) => 3,
        CodestyleError::NoSnippetsFound(_) => 5,
        CodestyleError::Io(_) => 1,
        CodestyleError::Walk(WalkError::NotFound { .. }) => 3,
        CodestyleError::Walk(WalkError::PermissionDenied { .. }) => 4,
        CodestyleError::Walk(_) => 2,
        CodestyleError::Batch(_) => 1,
        CodestyleError::Pipeline(_) => 6,
        CodestyleError::Output(_) => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::{Location, ParseError};

    #[test]
    fn test_exit_codes() {
        let missing = CodestyleError::PathNotFound(PathBuf::from("nope"));
        assert_eq!(exit_code(&missing), 3);
        assert_eq!(missing.to_string(), "path not found: nope");

        let walk = CodestyleError::from(WalkError::PermissionDenied {
            path: PathBuf::from("/root"),
        });
        assert_eq!(exit_code(&walk), 4);

        let parse = CodestyleError::from(PipelineError::from(ParseError::new(
            "unexpected `}`",
            Some(Location::new(1, 3)),
        )));
        assert_eq!(exit_code(&parse), 6);
        assert_eq!(parse.to_string(), "parse error: unexpected `}` at 1:3");
    }
}
