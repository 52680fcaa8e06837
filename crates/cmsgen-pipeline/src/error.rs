use std::path::PathBuf;
use std::time::Duration;

use cmsgen_core::SpecError;
use thiserror::Error;

/// Failures of a single external tool invocation.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("{0} was not found on PATH")]
    NotFound(String),

    #[error("{tool} did not finish within {}s", timeout.as_secs())]
    Timeout { tool: String, timeout: Duration },

    #[error("{tool} exited with {}: {stderr}", code.map_or_else(|| "a signal".to_string(), |c| format!("status {c}")))]
    Failed {
        tool: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("failed to run {tool}: {source}")]
    Io {
        tool: String,
        #[source]
        source: std::io::Error,
    },
}

/// Failures of the generation stages.
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("missing dependency: {0}")]
    MissingDependency(String),

    #[error("generation timed out: {0}")]
    GenerationTimeout(String),

    #[error("generation failed: {0}")]
    GenerationFailure(String),

    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to render template: {0}")]
    Template(#[from] minijinja::Error),
}

impl From<ToolError> for GenerateError {
    fn from(err: ToolError) -> Self {
        match err {
            ToolError::NotFound(tool) => GenerateError::MissingDependency(tool),
            err @ ToolError::Timeout { .. } => GenerateError::GenerationTimeout(err.to_string()),
            err @ (ToolError::Failed { .. } | ToolError::Io { .. }) => {
                GenerateError::GenerationFailure(err.to_string())
            }
        }
    }
}

/// Any failure that ends a module's run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Spec(#[from] SpecError),

    #[error(transparent)]
    Generate(#[from] GenerateError),
}

impl PipelineError {
    /// Whether no later module can succeed either.
    pub fn is_batch_fatal(&self) -> bool {
        matches!(self, PipelineError::Generate(GenerateError::MissingDependency(_)))
    }
}
