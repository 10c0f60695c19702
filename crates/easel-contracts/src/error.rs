use std::path::PathBuf;

use thiserror::Error;

use crate::score::Metric;
use crate::state::IterationAction;

/// Failure taxonomy for the refinement core. Collaborator adapters report
/// `anyhow` cause chains; the core wraps them into these variants so callers
/// can tell a bad argument from a flaky oracle from a dead image backend.
#[derive(Debug, Error)]
pub enum EaselError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("evaluation failed for metric '{metric}'")]
    EvaluationFailure {
        metric: Metric,
        #[source]
        cause: anyhow::Error,
    },

    #[error("image synthesis failed")]
    SynthesisFailure(#[source] anyhow::Error),

    #[error("image edit failed")]
    EditFailure(#[source] anyhow::Error),

    #[error("failed writing {}", path.display())]
    IoFailure {
        path: PathBuf,
        #[source]
        cause: anyhow::Error,
    },

    #[error("iteration {index} ({action}) failed")]
    Iteration {
        index: u32,
        action: IterationAction,
        #[source]
        cause: Box<EaselError>,
    },
}

impl EaselError {
    /// Wraps a failure with the iteration it happened in. The loop never
    /// swallows a failed step; the caller sees exactly where it died.
    pub fn at_iteration(self, index: u32, action: IterationAction) -> EaselError {
        EaselError::Iteration {
            index,
            action,
            cause: Box::new(self),
        }
    }
}
