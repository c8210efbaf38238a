//! Drives an assembled pipeline through the external collaborators.
//!
//! Execution is strictly sequential: fetch source, run the build,
//! propose the change set, execute it. A failure at any step halts the
//! run before any later step is attempted; in particular, execute is
//! never attempted when propose fails, and a failed apply is reported
//! without rollback.

use crate::engine::{
    ApplyResult, BuildExecutor, ChangeSetRecord, DeploymentEngine, PermissionStore,
    SourceProvider, SourceRevision,
};
use crate::errors::{PipewrightError, ProposalFailure};
use crate::pipeline::PipelineDefinition;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// Deploy-phase state of one pipeline run. Strictly forward; no state
/// is revisited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeployRunState {
    /// No change set has been proposed yet.
    Unstarted,
    /// The change set exists and awaits execution.
    ChangeSetProposed,
    /// The change set has been applied to the target stack.
    ChangeSetExecuted,
}

impl fmt::Display for DeployRunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unstarted => write!(f, "unstarted"),
            Self::ChangeSetProposed => write!(f, "change_set_proposed"),
            Self::ChangeSetExecuted => write!(f, "change_set_executed"),
        }
    }
}

/// The outcome of a completed pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Final deploy-phase state.
    pub state: DeployRunState,
    /// The source revision that was built.
    pub revision: SourceRevision,
    /// Files the build emitted.
    pub output_files: Vec<String>,
    /// The change set that was proposed and applied.
    pub change_set: ChangeSetRecord,
    /// The apply outcome.
    pub apply: ApplyResult,
}

/// Runs assembled pipeline definitions against the collaborator traits.
pub struct PipelineRunner {
    source: Arc<dyn SourceProvider>,
    build: Arc<dyn BuildExecutor>,
    deploy: Arc<dyn DeploymentEngine>,
    permissions: Arc<dyn PermissionStore>,
}

impl PipelineRunner {
    /// Creates a runner over the four collaborators.
    #[must_use]
    pub fn new(
        source: Arc<dyn SourceProvider>,
        build: Arc<dyn BuildExecutor>,
        deploy: Arc<dyn DeploymentEngine>,
        permissions: Arc<dyn PermissionStore>,
    ) -> Self {
        Self {
            source,
            build,
            deploy,
            permissions,
        }
    }

    /// Runs the definition end to end.
    ///
    /// # Errors
    ///
    /// Returns the first failure encountered; no later step runs after
    /// a failure and nothing is retried or rolled back.
    pub async fn run(&self, definition: &PipelineDefinition) -> Result<RunReport, PipewrightError> {
        let mut state = DeployRunState::Unstarted;
        info!(pipeline = %definition.name(), %state, "starting pipeline run");

        // Mirror the finalized role grants into the permission store so
        // the applying role is ready before the change set exists.
        let role = definition.change_set().deployment_role();
        for grant in &role.managed_grants {
            self.permissions
                .attach_managed_grant(&role.role_name, grant)
                .await?;
        }
        for policy in &role.inline_policies {
            self.permissions
                .attach_inline_policy(&role.role_name, policy)
                .await?;
        }

        let source_action = definition.source_action();
        let revision = self
            .source
            .fetch(&source_action.repository, &source_action.branch)
            .await?;
        debug!(commit = %revision.commit_id, "fetched source");

        let build_action = definition.build_action();
        let build_result = self
            .build
            .run_build(&build_action.project.build_spec, &revision)
            .await?;
        debug!(files = build_result.output_files.len(), "build completed");

        let propose_action = definition.change_set().action();
        let template = &propose_action.template_path().path;
        if !build_result.output_files.iter().any(|f| f == template) {
            return Err(ProposalFailure::TemplateNotFound {
                path: template.clone(),
                stack_name: propose_action.stack_name().to_string(),
            }
            .into());
        }

        let change_set = self.deploy.create_change_set(propose_action).await?;
        state = DeployRunState::ChangeSetProposed;
        debug!(change_set_id = %change_set.id, %state, "change set proposed");

        let execute_action = definition.change_set().execute_action();
        let apply = self
            .deploy
            .execute_change_set(&execute_action.stack_name, &execute_action.change_set_name)
            .await?;
        state = DeployRunState::ChangeSetExecuted;
        info!(stack = %apply.stack_name, %state, "change set executed");

        Ok(RunReport {
            state,
            revision,
            output_files: build_result.output_files,
            change_set,
            apply,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::memory::{
        MemoryBuildExecutor, MemoryDeploymentEngine, MemoryPermissionStore, MemorySourceProvider,
    };
    use crate::engine::{ChangeSetStatus, MockDeploymentEngine};
    use crate::params::PipelineParameters;
    use crate::pipeline::PipelineOrchestrator;
    use crate::stack::StackContext;

    fn demo_definition() -> PipelineDefinition {
        let mut stack = StackContext::new("demo-app");
        stack.register_repository("lambda-demo");
        let params = PipelineParameters::new("lambda-demo", "main", "du-lambda-demo-bucket");
        PipelineOrchestrator::new("lambda-pipeline")
            .assemble(&stack, &params)
            .unwrap()
    }

    fn memory_runner(deploy: MemoryDeploymentEngine) -> (PipelineRunner, Arc<MemoryDeploymentEngine>) {
        let deploy = Arc::new(deploy);
        let runner = PipelineRunner::new(
            Arc::new(MemorySourceProvider::new().with_revision("lambda-demo", "main", "abc123")),
            Arc::new(MemoryBuildExecutor::new()),
            Arc::clone(&deploy) as Arc<dyn DeploymentEngine>,
            Arc::new(MemoryPermissionStore::new()),
        );
        (runner, deploy)
    }

    #[tokio::test]
    async fn test_run_reaches_executed_state() {
        let (runner, engine) = memory_runner(MemoryDeploymentEngine::new());
        let definition = demo_definition();

        let report = runner.run(&definition).await.unwrap();

        assert_eq!(report.state, DeployRunState::ChangeSetExecuted);
        assert_eq!(report.revision.commit_id, "abc123");
        assert!(report.output_files.contains(&"outputtemplate.yml".to_string()));

        let record = engine
            .change_set("Codepipeline-Lambda-Stack", "StagedChangeSet")
            .unwrap();
        assert_eq!(record.status, ChangeSetStatus::Executed);
    }

    #[tokio::test]
    async fn test_build_failure_halts_before_deploy() {
        let deploy = Arc::new(MemoryDeploymentEngine::new());
        let runner = PipelineRunner::new(
            Arc::new(MemorySourceProvider::new().with_revision("lambda-demo", "main", "abc123")),
            Arc::new(MemoryBuildExecutor::failing_on("sam build", 1)),
            Arc::clone(&deploy) as Arc<dyn DeploymentEngine>,
            Arc::new(MemoryPermissionStore::new()),
        );
        let definition = demo_definition();

        let err = runner.run(&definition).await.unwrap_err();
        assert!(matches!(err, PipewrightError::Build(_)));
        assert!(deploy
            .change_set("Codepipeline-Lambda-Stack", "StagedChangeSet")
            .is_none());
    }

    #[tokio::test]
    async fn test_propose_failure_never_executes() {
        let mut deploy = MockDeploymentEngine::new();
        deploy.expect_create_change_set().times(1).returning(|action| {
            Err(ProposalFailure::MalformedTemplate {
                path: action.template_path().path.clone(),
                reason: "bad yaml".to_string(),
            })
        });
        // No expectation for execute_change_set: any call panics.
        deploy.expect_execute_change_set().times(0);

        let runner = PipelineRunner::new(
            Arc::new(MemorySourceProvider::new().with_revision("lambda-demo", "main", "abc123")),
            Arc::new(MemoryBuildExecutor::new()),
            Arc::new(deploy),
            Arc::new(MemoryPermissionStore::new()),
        );
        let definition = demo_definition();

        let err = runner.run(&definition).await.unwrap_err();
        assert!(matches!(err, PipewrightError::Proposal(_)));
    }

    #[tokio::test]
    async fn test_failed_apply_leaves_inspectable_state() {
        let (runner, engine) = memory_runner(MemoryDeploymentEngine::failing_apply("drift"));
        let definition = demo_definition();

        let err = runner.run(&definition).await.unwrap_err();
        assert!(matches!(err, PipewrightError::Apply(_)));

        let record = engine
            .change_set("Codepipeline-Lambda-Stack", "StagedChangeSet")
            .unwrap();
        assert_eq!(record.status, ChangeSetStatus::FailedApply);
    }

    #[tokio::test]
    async fn test_role_grants_mirrored_into_store() {
        let store = Arc::new(MemoryPermissionStore::new());
        let runner = PipelineRunner::new(
            Arc::new(MemorySourceProvider::new().with_revision("lambda-demo", "main", "abc123")),
            Arc::new(MemoryBuildExecutor::new()),
            Arc::new(MemoryDeploymentEngine::new()),
            Arc::clone(&store) as Arc<dyn PermissionStore>,
        );
        let definition = demo_definition();
        let role_name = definition.change_set().deployment_role().role_name.clone();

        runner.run(&definition).await.unwrap();

        assert_eq!(
            store.grants_for(&role_name),
            vec![
                "AWSLambdaExecute".to_string(),
                "AmazonEventBridgeFullAccess".to_string()
            ]
        );
        assert_eq!(
            store.policies_for(&role_name),
            vec!["CodePipelineLambdaDeployPermissionPolicy".to_string()]
        );
    }
}
