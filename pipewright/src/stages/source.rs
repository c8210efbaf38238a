//! Source stage: binds a repository and branch to a fresh artifact.

use crate::core::{ArtifactHandle, SourceAction};
use crate::errors::ConfigError;
use crate::params::PipelineParameters;
use crate::stack::{RepositoryRef, StackContext};
use tracing::debug;

/// Resolves the configured repository and allocates the source output
/// artifact handle.
#[derive(Debug, Clone)]
pub struct SourceStage {
    repository: RepositoryRef,
    branch: String,
    output: ArtifactHandle,
}

impl SourceStage {
    /// Stage name used for artifact provenance and descriptors.
    pub const NAME: &'static str = "Source";

    /// Creates the stage, resolving the repository from the stack
    /// context.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::RepositoryNotFound`] if the configured
    /// repository was never registered with the context.
    pub fn new(stack: &StackContext, params: &PipelineParameters) -> Result<Self, ConfigError> {
        let repository = stack.resolve_repository(&params.repository_name)?;
        debug!(repository = %repository.name, branch = %params.branch_name, "resolved source repository");

        Ok(Self {
            repository,
            branch: params.branch_name.clone(),
            output: ArtifactHandle::new(Self::NAME, "SourceOutput"),
        })
    }

    /// Produces the source action binding repository and branch to the
    /// stage's output artifact.
    #[must_use]
    pub fn produce_source_action(&self) -> SourceAction {
        SourceAction {
            action_name: Self::NAME.to_string(),
            repository: self.repository.clone(),
            branch: self.branch.clone(),
            output: self.output.clone(),
        }
    }

    /// Returns the stage's output artifact handle. The same handle is
    /// returned on every call.
    #[must_use]
    pub fn output_artifact(&self) -> &ArtifactHandle {
        &self.output
    }
}
