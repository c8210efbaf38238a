//! Build stage: turns the source artifact into a packaged build artifact.

use crate::buildspec::BuildProject;
use crate::core::{ArtifactHandle, BuildAction};
use crate::params::PipelineParameters;
use tracing::debug;

/// Defines the build project from configuration and allocates the build
/// output artifact handle.
#[derive(Debug, Clone)]
pub struct BuildStage {
    project: BuildProject,
    output: ArtifactHandle,
}

impl BuildStage {
    /// Stage name used for artifact provenance and descriptors.
    pub const NAME: &'static str = "Build";

    /// Creates the stage from pipeline parameters.
    #[must_use]
    pub fn new(params: &PipelineParameters) -> Self {
        let project = BuildProject::for_params(params);
        debug!(project = %project.project_name, "defined build project");

        Self {
            project,
            output: ArtifactHandle::new(Self::NAME, "BuildOutput"),
        }
    }

    /// Produces the build action consuming the upstream source artifact.
    ///
    /// `input` must be the handle produced by the immediately preceding
    /// source stage; the orchestrator wires this structurally.
    #[must_use]
    pub fn produce_build_action(&self, input: &ArtifactHandle) -> BuildAction {
        BuildAction {
            action_name: "BuildAction".to_string(),
            input: input.clone(),
            project: self.project.clone(),
            output: self.output.clone(),
        }
    }

    /// Returns the build project definition.
    #[must_use]
    pub fn project(&self) -> &BuildProject {
        &self.project
    }

    /// Returns the stage's output artifact handle. The same handle is
    /// returned on every call.
    #[must_use]
    pub fn output_artifact(&self) -> &ArtifactHandle {
        &self.output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn demo_params() -> PipelineParameters {
        PipelineParameters::new("lambda-demo", "main", "du-lambda-demo-bucket")
    }

    #[test]
    fn test_action_chains_input_handle() {
        let upstream = ArtifactHandle::new("Source", "SourceOutput");
        let stage = BuildStage::new(&demo_params());
        let action = stage.produce_build_action(&upstream);

        assert!(action.input.same_handle(&upstream));
        assert!(action.output.same_handle(stage.output_artifact()));
    }

    #[test]
    fn test_output_artifact_is_stable() {
        let stage = BuildStage::new(&demo_params());
        assert!(stage.output_artifact().same_handle(stage.output_artifact()));
        assert_eq!(stage.output_artifact().producer(), BuildStage::NAME);
    }

    #[test]
    fn test_project_spec_uses_params() {
        let stage = BuildStage::new(&demo_params());
        let commands = stage.project().build_spec.commands();

        assert!(commands.contains(&"export BUCKET=du-lambda-demo-bucket"));
    }
}
