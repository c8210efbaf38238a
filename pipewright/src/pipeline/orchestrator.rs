//! Sequential assembly of the three-stage pipeline.

use super::{PipelineDefinition, PipelineStages};
use crate::core::{PipelineAction, StageDescriptor};
use crate::errors::ConfigError;
use crate::params::PipelineParameters;
use crate::stack::StackContext;
use crate::stages::{BuildStage, DeployStage, SourceStage};
use tracing::info;

/// Composes the stages in fixed order, wiring each stage's output
/// artifact into the next stage's input, and finalizes deploy-stage
/// permissions once all stages are attached.
///
/// Assembly is purely sequential, single-threaded construction; running
/// the assembled pipeline is the job of the external engines.
#[derive(Debug, Clone)]
pub struct PipelineOrchestrator {
    name: String,
}

impl PipelineOrchestrator {
    /// Creates an orchestrator for the named pipeline.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Returns the pipeline name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Assembles the pipeline definition.
    ///
    /// Parameters are validated first, so configuration errors surface
    /// before any stage is constructed.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] on invalid parameters or an unresolved
    /// repository.
    pub fn assemble(
        &self,
        stack: &StackContext,
        params: &PipelineParameters,
    ) -> Result<PipelineDefinition, ConfigError> {
        params.validate()?;

        let source = SourceStage::new(stack, params)?;
        let source_action = source.produce_source_action();

        let build = BuildStage::new(params);
        let build_action = build.produce_build_action(source.output_artifact());

        let deploy = DeployStage::new();
        let mut proposed =
            deploy.propose(build.output_artifact(), &params.output_template_file);

        // All stages are attached; the propose action exists, so the
        // deployment role can now be finalized.
        proposed.set_permission_policies_for_cloudformation_role();

        let stages = PipelineStages {
            source: StageDescriptor::new(
                SourceStage::NAME,
                vec![PipelineAction::Source(source_action.clone())],
            ),
            build: StageDescriptor::new(
                BuildStage::NAME,
                vec![PipelineAction::Build(build_action.clone())],
            ),
            deploy: StageDescriptor::new(
                DeployStage::NAME,
                vec![
                    PipelineAction::CreateChangeSet(proposed.action().clone()),
                    PipelineAction::ExecuteChangeSet(proposed.execute_action()),
                ],
            ),
        };

        info!(pipeline = %self.name, stack = %stack.app_name(), "assembled pipeline");
        Ok(PipelineDefinition::new(
            &self.name,
            stages,
            source_action,
            build_action,
            proposed,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn demo_setup() -> (StackContext, PipelineParameters) {
        let mut stack = StackContext::new("demo-app");
        stack.register_repository("lambda-demo");
        let params = PipelineParameters::new("lambda-demo", "main", "du-lambda-demo-bucket");
        (stack, params)
    }

    #[test]
    fn test_assemble_stage_order() {
        let (stack, params) = demo_setup();
        let definition = PipelineOrchestrator::new("lambda-pipeline")
            .assemble(&stack, &params)
            .unwrap();

        assert_eq!(definition.stage_names(), vec!["Source", "Build", "Deploy"]);
    }

    #[test]
    fn test_assemble_rejects_invalid_params() {
        let (stack, _) = demo_setup();
        let params = PipelineParameters::new("lambda-demo", "", "bucket");

        let err = PipelineOrchestrator::new("p").assemble(&stack, &params).unwrap_err();
        assert_eq!(err, ConfigError::EmptyParameter { field: "branch_name" });
    }

    #[test]
    fn test_assemble_rejects_unknown_repository() {
        let stack = StackContext::new("demo-app");
        let params = PipelineParameters::new("lambda-demo", "main", "bucket");

        let err = PipelineOrchestrator::new("p").assemble(&stack, &params).unwrap_err();
        assert!(matches!(err, ConfigError::RepositoryNotFound { .. }));
    }

    #[test]
    fn test_artifact_chaining_is_reference_identical() {
        let (stack, params) = demo_setup();
        let definition = PipelineOrchestrator::new("p").assemble(&stack, &params).unwrap();
        let stages = definition.stages();

        let source_output = match &stages.source.actions[0] {
            PipelineAction::Source(a) => &a.output,
            other => panic!("unexpected action: {other:?}"),
        };
        let (build_input, build_output) = match &stages.build.actions[0] {
            PipelineAction::Build(a) => (&a.input, &a.output),
            other => panic!("unexpected action: {other:?}"),
        };
        let template_artifact = match &stages.deploy.actions[0] {
            PipelineAction::CreateChangeSet(a) => &a.template_path().artifact,
            other => panic!("unexpected action: {other:?}"),
        };

        assert!(source_output.same_handle(build_input));
        assert!(build_output.same_handle(template_artifact));
    }

    #[test]
    fn test_permissions_finalized_during_assembly() {
        let (stack, params) = demo_setup();
        let definition = PipelineOrchestrator::new("p").assemble(&stack, &params).unwrap();
        let role = definition.change_set().deployment_role();

        assert_eq!(role.managed_grants.len(), 2);
        assert_eq!(role.inline_policies.len(), 1);
    }
}
