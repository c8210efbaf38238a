//! External collaborator boundaries.
//!
//! The pipeline core describes the static shape of a delivery pipeline;
//! actually fetching source, running builds, and materializing change
//! sets is delegated to implementors of these traits. Cancellation and
//! timeout policy belong entirely to the implementors.

pub mod memory;

use crate::buildspec::BuildSpecification;
use crate::core::CreateChangeSetAction;
use crate::errors::{ApplyFailure, BuildFailure, ConfigError, PipewrightError, ProposalFailure};
use crate::iam::{InlinePolicy, ManagedGrant};
use crate::stack::RepositoryRef;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[cfg(test)]
use mockall::automock;

/// A readable snapshot of a repository branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRevision {
    /// The repository the snapshot came from.
    pub repository: String,
    /// The branch that was resolved.
    pub branch: String,
    /// Identifier of the resolved revision.
    pub commit_id: String,
}

/// The outcome of a successful build: exactly the declared output files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildResult {
    /// Files emitted into the result artifact.
    pub output_files: Vec<String>,
}

/// Lifecycle status of a change set held by the deployment engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeSetStatus {
    /// Proposed and awaiting execution.
    Created,
    /// Applied to the target stack.
    Executed,
    /// Apply failed; the change set stays inspectable in this state.
    FailedApply,
}

/// A change set created by the deployment engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSetRecord {
    /// Engine-assigned change-set id.
    pub id: String,
    /// The target stack.
    pub stack_name: String,
    /// The change-set name.
    pub change_set_name: String,
    /// Location of the template the change set was computed from.
    pub template_location: String,
    /// Current lifecycle status.
    pub status: ChangeSetStatus,
    /// When the change set was created (ISO 8601).
    pub created_at: String,
}

/// The outcome of a successful change-set apply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyResult {
    /// The target stack.
    pub stack_name: String,
    /// The change set that was applied.
    pub change_set_name: String,
    /// When the apply completed (ISO 8601).
    pub applied_at: String,
}

/// Resolves repository branches to readable source snapshots.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SourceProvider: Send + Sync {
    /// Fetches the current snapshot of `repository` at `branch`.
    ///
    /// # Errors
    ///
    /// Failure to resolve is a configuration-time error.
    async fn fetch(
        &self,
        repository: &RepositoryRef,
        branch: &str,
    ) -> Result<SourceRevision, ConfigError>;
}

/// Executes build specifications in an isolated environment.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait BuildExecutor: Send + Sync {
    /// Runs the specification's commands in order, failing fast on the
    /// first nonzero exit, and emits exactly the declared output files.
    ///
    /// # Errors
    ///
    /// Returns the first failing command.
    async fn run_build(
        &self,
        spec: &BuildSpecification,
        revision: &SourceRevision,
    ) -> Result<BuildResult, BuildFailure>;
}

/// Materializes change sets against live infrastructure.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait DeploymentEngine: Send + Sync {
    /// Computes a named change set from the action's template against
    /// its target stack.
    ///
    /// # Errors
    ///
    /// Returns a [`ProposalFailure`] for malformed templates or missing
    /// capability declarations.
    async fn create_change_set(
        &self,
        action: &CreateChangeSetAction,
    ) -> Result<ChangeSetRecord, ProposalFailure>;

    /// Applies the named, previously created change set.
    ///
    /// # Errors
    ///
    /// Returns an [`ApplyFailure`]; the change set remains inspectable
    /// in its failed state and is never rolled back by this core.
    async fn execute_change_set(
        &self,
        stack_name: &str,
        change_set_name: &str,
    ) -> Result<ApplyResult, ApplyFailure>;
}

/// Grants and denies permissions on roles. All operations are
/// idempotent no-ops when the grant is already attached.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait PermissionStore: Send + Sync {
    /// Attaches a managed grant to the named role.
    ///
    /// # Errors
    ///
    /// Returns an error if the store rejects the attachment.
    async fn attach_managed_grant(
        &self,
        role_name: &str,
        grant: &ManagedGrant,
    ) -> Result<(), PipewrightError>;

    /// Attaches an inline policy to the named role.
    ///
    /// # Errors
    ///
    /// Returns an error if the store rejects the attachment.
    async fn attach_inline_policy(
        &self,
        role_name: &str,
        policy: &InlinePolicy,
    ) -> Result<(), PipewrightError>;
}
