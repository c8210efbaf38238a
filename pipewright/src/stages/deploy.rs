//! Deploy stage: the two-phase change-set state machine.
//!
//! Proposing a change set and executing it are separate actions with
//! run-order ranks 1 and 2. The deployment role exists only as a
//! byproduct of the propose action, so everything downstream of propose
//! (the role, permission finalization, the execute action) lives on
//! [`ProposedChangeSet`] and is unreachable before [`DeployStage::propose`].

use crate::core::{ArtifactHandle, CreateChangeSetAction, ExecuteChangeSetAction};
use crate::iam::{cloudformation_deploy_grants, DeploymentRole};
use tracing::debug;

/// Target stack the change set is computed against.
pub const DEPLOY_STACK_NAME: &str = "Codepipeline-Lambda-Stack";

/// Name under which the proposed change set is staged.
pub const DEPLOY_CHANGE_SET_NAME: &str = "StagedChangeSet";

/// The deploy stage before a change set has been proposed.
///
/// Stack and change-set names are fixed for the stage's lifetime.
/// No role or execute action is accessible from this type; both require
/// proposing first.
///
/// Reading the deployment role before propose does not compile:
///
/// ```compile_fail
/// use pipewright::stages::DeployStage;
///
/// let stage = DeployStage::new();
/// let role = stage.deployment_role(); // no such method before propose
/// ```
///
/// Neither does finalizing permissions before propose:
///
/// ```compile_fail
/// use pipewright::stages::DeployStage;
///
/// let mut stage = DeployStage::new();
/// stage.set_permission_policies_for_cloudformation_role();
/// ```
#[derive(Debug, Clone)]
pub struct DeployStage {
    stack_name: String,
    change_set_name: String,
}

impl DeployStage {
    /// Stage name used in descriptors.
    pub const NAME: &'static str = "Deploy";

    /// Creates the stage with the default stack and change-set names.
    #[must_use]
    pub fn new() -> Self {
        Self::with_names(DEPLOY_STACK_NAME, DEPLOY_CHANGE_SET_NAME)
    }

    /// Creates the stage with explicit names. The names are fixed for
    /// the stage's lifetime.
    #[must_use]
    pub fn with_names(
        stack_name: impl Into<String>,
        change_set_name: impl Into<String>,
    ) -> Self {
        Self {
            stack_name: stack_name.into(),
            change_set_name: change_set_name.into(),
        }
    }

    /// Returns the target stack name.
    #[must_use]
    pub fn stack_name(&self) -> &str {
        &self.stack_name
    }

    /// Returns the change-set name.
    #[must_use]
    pub fn change_set_name(&self) -> &str {
        &self.change_set_name
    }

    /// Proposes the change set from the build artifact, consuming the
    /// stage.
    ///
    /// `template_file` is the deployment descriptor's relative path
    /// inside the build artifact. The deployment role is allocated here,
    /// as a byproduct of constructing the propose action.
    #[must_use]
    pub fn propose(self, build_output: &ArtifactHandle, template_file: &str) -> ProposedChangeSet {
        let action = CreateChangeSetAction::new(
            &self.stack_name,
            &self.change_set_name,
            build_output.at_path(template_file),
        );
        debug!(
            stack = %self.stack_name,
            change_set = %self.change_set_name,
            template = %action.template_path(),
            "proposed change set"
        );

        ProposedChangeSet {
            role: DeploymentRole::new(format!("{}-deploy-role", self.stack_name)),
            action,
            stack_name: self.stack_name,
            change_set_name: self.change_set_name,
        }
    }
}

impl Default for DeployStage {
    fn default() -> Self {
        Self::new()
    }
}

/// A proposed change set: the propose action plus the deployment role
/// it created.
///
/// This value is the only path to permission finalization and to the
/// execute action, which makes propose-before-execute and
/// role-after-propose structural rather than checked at runtime.
#[derive(Debug, Clone)]
pub struct ProposedChangeSet {
    action: CreateChangeSetAction,
    role: DeploymentRole,
    stack_name: String,
    change_set_name: String,
}

impl ProposedChangeSet {
    /// Returns the propose action descriptor.
    #[must_use]
    pub fn action(&self) -> &CreateChangeSetAction {
        &self.action
    }

    /// Returns the deployment role created by the proposal.
    #[must_use]
    pub fn deployment_role(&self) -> &DeploymentRole {
        &self.role
    }

    /// Attaches the deployment permission set to the role that will
    /// apply the change set.
    ///
    /// Attaches two broad managed grants (compute-unit execution
    /// environment, event-routing infrastructure) and the enumerated
    /// inline policy. Idempotent.
    pub fn set_permission_policies_for_cloudformation_role(&mut self) {
        cloudformation_deploy_grants().apply_to(&mut self.role);
        debug!(
            role = %self.role.role_name,
            managed = self.role.managed_grants.len(),
            inline = self.role.inline_policies.len(),
            "finalized deployment role permissions"
        );
    }

    /// Returns the execute action, run-ordered strictly after propose.
    #[must_use]
    pub fn execute_action(&self) -> ExecuteChangeSetAction {
        ExecuteChangeSetAction::new(&self.stack_name, &self.change_set_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ChangeSetCapability;
    use crate::iam::CLOUDFORMATION_DEPLOY_ACTIONS;

    fn build_output() -> ArtifactHandle {
        ArtifactHandle::new("Build", "BuildOutput")
    }

    #[test]
    fn test_propose_defaults() {
        let proposed = DeployStage::new().propose(&build_output(), "outputtemplate.yml");
        let action = proposed.action();

        assert_eq!(action.stack_name(), DEPLOY_STACK_NAME);
        assert_eq!(action.change_set_name(), DEPLOY_CHANGE_SET_NAME);
        assert!(!action.admin_permissions());
        assert_eq!(
            action.capabilities(),
            &[
                ChangeSetCapability::NamedIam,
                ChangeSetCapability::AutoExpand
            ]
        );
    }

    #[test]
    fn test_template_path_points_into_build_artifact() {
        let output = build_output();
        let proposed = DeployStage::new().propose(&output, "outputtemplate.yml");
        let path = proposed.action().template_path();

        assert!(path.artifact.same_handle(&output));
        assert_eq!(path.path, "outputtemplate.yml");
    }

    #[test]
    fn test_role_starts_empty() {
        let proposed = DeployStage::new().propose(&build_output(), "outputtemplate.yml");

        assert!(proposed.deployment_role().managed_grants.is_empty());
        assert!(proposed.deployment_role().inline_policies.is_empty());
    }

    #[test]
    fn test_permission_finalization() {
        let mut proposed = DeployStage::new().propose(&build_output(), "outputtemplate.yml");
        proposed.set_permission_policies_for_cloudformation_role();

        let role = proposed.deployment_role();
        assert_eq!(role.managed_grants.len(), 2);
        assert_eq!(role.inline_policies.len(), 1);
        assert_eq!(
            role.inline_policies[0].statements[0].actions,
            CLOUDFORMATION_DEPLOY_ACTIONS
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_finalization_is_idempotent() {
        let mut proposed = DeployStage::new().propose(&build_output(), "outputtemplate.yml");
        proposed.set_permission_policies_for_cloudformation_role();
        proposed.set_permission_policies_for_cloudformation_role();

        assert_eq!(proposed.deployment_role().managed_grants.len(), 2);
        assert_eq!(proposed.deployment_role().inline_policies.len(), 1);
    }

    #[test]
    fn test_execute_after_propose() {
        let proposed = DeployStage::new().propose(&build_output(), "outputtemplate.yml");
        let execute = proposed.execute_action();

        assert_eq!(execute.stack_name, DEPLOY_STACK_NAME);
        assert_eq!(execute.change_set_name, DEPLOY_CHANGE_SET_NAME);
        assert!(execute.run_order > proposed.action().run_order());
    }

    #[test]
    fn test_custom_names_fixed_for_lifetime() {
        let stage = DeployStage::with_names("my-stack", "my-change-set");
        assert_eq!(stage.stack_name(), "my-stack");

        let proposed = stage.propose(&build_output(), "t.yml");
        assert_eq!(proposed.action().stack_name(), "my-stack");
        assert_eq!(proposed.execute_action().change_set_name, "my-change-set");
    }
}
