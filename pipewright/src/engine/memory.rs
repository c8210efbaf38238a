//! In-memory collaborator implementations for tests and local use.

use super::{
    ApplyResult, BuildExecutor, BuildResult, ChangeSetRecord, ChangeSetStatus, DeploymentEngine,
    PermissionStore, SourceProvider, SourceRevision,
};
use crate::buildspec::BuildSpecification;
use crate::core::CreateChangeSetAction;
use crate::errors::{ApplyFailure, BuildFailure, ConfigError, PipewrightError, ProposalFailure};
use crate::iam::{InlinePolicy, ManagedGrant};
use crate::stack::RepositoryRef;
use crate::utils::{generate_uuid, iso_timestamp};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

/// In-memory source provider seeded with known revisions.
#[derive(Debug, Default)]
pub struct MemorySourceProvider {
    revisions: HashMap<(String, String), String>,
    fetch_count: AtomicUsize,
}

impl MemorySourceProvider {
    /// Creates an empty provider.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a revision for a repository branch.
    #[must_use]
    pub fn with_revision(
        mut self,
        repository: impl Into<String>,
        branch: impl Into<String>,
        commit_id: impl Into<String>,
    ) -> Self {
        self.revisions
            .insert((repository.into(), branch.into()), commit_id.into());
        self
    }

    /// Returns how many fetches were performed.
    #[must_use]
    pub fn fetch_count(&self) -> usize {
        self.fetch_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceProvider for MemorySourceProvider {
    async fn fetch(
        &self,
        repository: &RepositoryRef,
        branch: &str,
    ) -> Result<SourceRevision, ConfigError> {
        self.fetch_count.fetch_add(1, Ordering::SeqCst);
        let key = (repository.name.clone(), branch.to_string());
        self.revisions
            .get(&key)
            .map(|commit_id| SourceRevision {
                repository: repository.name.clone(),
                branch: branch.to_string(),
                commit_id: commit_id.clone(),
            })
            .ok_or_else(|| ConfigError::BranchNotFound {
                repository: repository.name.clone(),
                branch: branch.to_string(),
            })
    }
}

/// In-memory build executor: succeeds by emitting exactly the declared
/// output files, or fails fast on a configured command.
#[derive(Debug, Default)]
pub struct MemoryBuildExecutor {
    fail_on: Option<(String, i32)>,
    build_count: AtomicUsize,
}

impl MemoryBuildExecutor {
    /// Creates an executor that succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an executor that fails when it reaches `command`.
    #[must_use]
    pub fn failing_on(command: impl Into<String>, exit_code: i32) -> Self {
        Self {
            fail_on: Some((command.into(), exit_code)),
            build_count: AtomicUsize::new(0),
        }
    }

    /// Returns how many builds were run.
    #[must_use]
    pub fn build_count(&self) -> usize {
        self.build_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BuildExecutor for MemoryBuildExecutor {
    async fn run_build(
        &self,
        spec: &BuildSpecification,
        _revision: &SourceRevision,
    ) -> Result<BuildResult, BuildFailure> {
        self.build_count.fetch_add(1, Ordering::SeqCst);

        if let Some((fail_command, exit_code)) = &self.fail_on {
            for command in spec.commands() {
                if command == fail_command {
                    return Err(BuildFailure::new(command, *exit_code));
                }
            }
        }

        Ok(BuildResult {
            output_files: spec.artifacts.files.clone(),
        })
    }
}

/// In-memory deployment engine tracking change-set lifecycles.
///
/// A proposal with the same stack and change-set name replaces the
/// existing change set, matching create-replace semantics.
#[derive(Debug, Default)]
pub struct MemoryDeploymentEngine {
    change_sets: Mutex<HashMap<(String, String), ChangeSetRecord>>,
    fail_apply_with: Option<String>,
}

impl MemoryDeploymentEngine {
    /// Creates an engine whose applies succeed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an engine whose applies fail with the given reason,
    /// leaving change sets in the failed-apply state.
    #[must_use]
    pub fn failing_apply(reason: impl Into<String>) -> Self {
        Self {
            change_sets: Mutex::new(HashMap::new()),
            fail_apply_with: Some(reason.into()),
        }
    }

    /// Returns the tracked change set, if any.
    #[must_use]
    pub fn change_set(&self, stack_name: &str, change_set_name: &str) -> Option<ChangeSetRecord> {
        let sets = self
            .change_sets
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        sets.get(&(stack_name.to_string(), change_set_name.to_string()))
            .cloned()
    }
}

#[async_trait]
impl DeploymentEngine for MemoryDeploymentEngine {
    async fn create_change_set(
        &self,
        action: &CreateChangeSetAction,
    ) -> Result<ChangeSetRecord, ProposalFailure> {
        // The engine refuses IAM-affecting changes without declared
        // capabilities.
        if action.capabilities().is_empty() {
            return Err(ProposalFailure::MissingCapability {
                stack_name: action.stack_name().to_string(),
                capability: "CAPABILITY_NAMED_IAM".to_string(),
            });
        }

        let record = ChangeSetRecord {
            id: generate_uuid().to_string(),
            stack_name: action.stack_name().to_string(),
            change_set_name: action.change_set_name().to_string(),
            template_location: action.template_path().location(),
            status: ChangeSetStatus::Created,
            created_at: iso_timestamp(),
        };

        let mut sets = self
            .change_sets
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        sets.insert(
            (record.stack_name.clone(), record.change_set_name.clone()),
            record.clone(),
        );
        Ok(record)
    }

    async fn execute_change_set(
        &self,
        stack_name: &str,
        change_set_name: &str,
    ) -> Result<ApplyResult, ApplyFailure> {
        let mut sets = self
            .change_sets
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let key = (stack_name.to_string(), change_set_name.to_string());

        let Some(record) = sets.get_mut(&key) else {
            return Err(ApplyFailure::new(
                stack_name,
                change_set_name,
                "change set was never proposed",
            ));
        };

        if let Some(reason) = &self.fail_apply_with {
            record.status = ChangeSetStatus::FailedApply;
            return Err(ApplyFailure::new(stack_name, change_set_name, reason));
        }

        record.status = ChangeSetStatus::Executed;
        Ok(ApplyResult {
            stack_name: stack_name.to_string(),
            change_set_name: change_set_name.to_string(),
            applied_at: iso_timestamp(),
        })
    }
}

/// In-memory permission store with idempotent attachment.
#[derive(Debug, Default)]
pub struct MemoryPermissionStore {
    grants: Mutex<HashMap<String, HashSet<String>>>,
    policies: Mutex<HashMap<String, HashMap<String, serde_json::Value>>>,
}

impl MemoryPermissionStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the managed grant names attached to a role.
    #[must_use]
    pub fn grants_for(&self, role_name: &str) -> Vec<String> {
        let grants = self.grants.lock().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = grants
            .get(role_name)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }

    /// Returns the inline policy names attached to a role.
    #[must_use]
    pub fn policies_for(&self, role_name: &str) -> Vec<String> {
        let policies = self.policies.lock().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = policies
            .get(role_name)
            .map(|map| map.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }
}

#[async_trait]
impl PermissionStore for MemoryPermissionStore {
    async fn attach_managed_grant(
        &self,
        role_name: &str,
        grant: &ManagedGrant,
    ) -> Result<(), PipewrightError> {
        let mut grants = self.grants.lock().unwrap_or_else(PoisonError::into_inner);
        grants
            .entry(role_name.to_string())
            .or_default()
            .insert(grant.policy_name.clone());
        Ok(())
    }

    async fn attach_inline_policy(
        &self,
        role_name: &str,
        policy: &InlinePolicy,
    ) -> Result<(), PipewrightError> {
        let mut policies = self.policies.lock().unwrap_or_else(PoisonError::into_inner);
        policies
            .entry(role_name.to_string())
            .or_default()
            .insert(policy.name.clone(), policy.to_document());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ArtifactHandle;
    use crate::params::PipelineParameters;

    fn propose_action() -> CreateChangeSetAction {
        let build_output = ArtifactHandle::new("Build", "BuildOutput");
        crate::stages::DeployStage::new()
            .propose(&build_output, "outputtemplate.yml")
            .action()
            .clone()
    }

    #[tokio::test]
    async fn test_source_provider_fetch() {
        let provider = MemorySourceProvider::new().with_revision("lambda-demo", "main", "abc123");
        let repo = RepositoryRef {
            name: "lambda-demo".to_string(),
            construct_id: "x".to_string(),
        };

        let revision = provider.fetch(&repo, "main").await.unwrap();
        assert_eq!(revision.commit_id, "abc123");
        assert_eq!(provider.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_source_provider_unknown_branch() {
        let provider = MemorySourceProvider::new();
        let repo = RepositoryRef {
            name: "lambda-demo".to_string(),
            construct_id: "x".to_string(),
        };

        let err = provider.fetch(&repo, "main").await.unwrap_err();
        assert!(matches!(err, ConfigError::BranchNotFound { .. }));
    }

    #[tokio::test]
    async fn test_build_executor_emits_declared_files() {
        let params = PipelineParameters::new("r", "main", "b");
        let spec = BuildSpecification::for_params(&params);
        let revision = SourceRevision {
            repository: "r".to_string(),
            branch: "main".to_string(),
            commit_id: "c".to_string(),
        };

        let result = MemoryBuildExecutor::new()
            .run_build(&spec, &revision)
            .await
            .unwrap();
        assert_eq!(result.output_files, spec.artifacts.files);
    }

    #[tokio::test]
    async fn test_build_executor_fails_fast() {
        let params = PipelineParameters::new("r", "main", "b");
        let spec = BuildSpecification::for_params(&params);
        let revision = SourceRevision {
            repository: "r".to_string(),
            branch: "main".to_string(),
            commit_id: "c".to_string(),
        };

        let err = MemoryBuildExecutor::failing_on("sam build", 2)
            .run_build(&spec, &revision)
            .await
            .unwrap_err();
        assert_eq!(err.command, "sam build");
        assert_eq!(err.exit_code, 2);
    }

    #[tokio::test]
    async fn test_change_set_lifecycle() {
        let engine = MemoryDeploymentEngine::new();
        let action = propose_action();

        let record = engine.create_change_set(&action).await.unwrap();
        assert_eq!(record.status, ChangeSetStatus::Created);

        engine
            .execute_change_set(action.stack_name(), action.change_set_name())
            .await
            .unwrap();
        let record = engine
            .change_set(action.stack_name(), action.change_set_name())
            .unwrap();
        assert_eq!(record.status, ChangeSetStatus::Executed);
    }

    #[tokio::test]
    async fn test_replace_semantics_on_same_name() {
        let engine = MemoryDeploymentEngine::new();
        let action = propose_action();

        let first = engine.create_change_set(&action).await.unwrap();
        let second = engine.create_change_set(&action).await.unwrap();

        assert_ne!(first.id, second.id);
        let tracked = engine
            .change_set(action.stack_name(), action.change_set_name())
            .unwrap();
        assert_eq!(tracked.id, second.id);
    }

    #[tokio::test]
    async fn test_execute_without_propose_fails() {
        let engine = MemoryDeploymentEngine::new();
        let err = engine
            .execute_change_set("stack", "never-proposed")
            .await
            .unwrap_err();
        assert!(err.reason.contains("never proposed"));
    }

    #[tokio::test]
    async fn test_failed_apply_is_inspectable() {
        let engine = MemoryDeploymentEngine::failing_apply("resource limit exceeded");
        let action = propose_action();

        engine.create_change_set(&action).await.unwrap();
        let err = engine
            .execute_change_set(action.stack_name(), action.change_set_name())
            .await
            .unwrap_err();
        assert_eq!(err.reason, "resource limit exceeded");

        let record = engine
            .change_set(action.stack_name(), action.change_set_name())
            .unwrap();
        assert_eq!(record.status, ChangeSetStatus::FailedApply);
    }

    #[tokio::test]
    async fn test_permission_store_is_idempotent() {
        let store = MemoryPermissionStore::new();
        let grant = ManagedGrant::from_managed_policy_name("AWSLambdaExecute");

        store.attach_managed_grant("role", &grant).await.unwrap();
        store.attach_managed_grant("role", &grant).await.unwrap();

        assert_eq!(store.grants_for("role"), vec!["AWSLambdaExecute".to_string()]);
    }
}
