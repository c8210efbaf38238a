//! Typed action descriptors emitted by the pipeline stages.
//!
//! Actions are declarative: they describe what the external engines
//! should do, they do not execute anything themselves.

use crate::buildspec::BuildProject;
use crate::core::{ArtifactHandle, ArtifactPath};
use crate::stack::RepositoryRef;
use serde::Serialize;
use std::fmt;

/// Run-order rank of the change-set propose action.
pub const PROPOSE_RUN_ORDER: u32 = 1;

/// Run-order rank of the change-set execute action.
pub const EXECUTE_RUN_ORDER: u32 = 2;

/// Capability flags a change-set proposal must declare before the
/// deployment engine will create IAM-affecting changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ChangeSetCapability {
    /// Allows creating resources that require named identity grants.
    #[serde(rename = "CAPABILITY_NAMED_IAM")]
    NamedIam,
    /// Allows auto-expansion of nested definitions (macros/transforms).
    #[serde(rename = "CAPABILITY_AUTO_EXPAND")]
    AutoExpand,
}

impl fmt::Display for ChangeSetCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NamedIam => write!(f, "CAPABILITY_NAMED_IAM"),
            Self::AutoExpand => write!(f, "CAPABILITY_AUTO_EXPAND"),
        }
    }
}

/// Binds a resolved repository and branch to the source output artifact.
#[derive(Debug, Clone, Serialize)]
pub struct SourceAction {
    /// The action name within its stage.
    pub action_name: String,
    /// The resolved repository reference.
    pub repository: RepositoryRef,
    /// The branch to track.
    pub branch: String,
    /// The artifact the fetched source lands in.
    pub output: ArtifactHandle,
}

/// Runs the build project against the source artifact.
#[derive(Debug, Clone, Serialize)]
pub struct BuildAction {
    /// The action name within its stage.
    pub action_name: String,
    /// The upstream source artifact.
    pub input: ArtifactHandle,
    /// The build project executed by the external build executor.
    pub project: BuildProject,
    /// The artifact the packaged build lands in.
    pub output: ArtifactHandle,
}

/// The propose half of the two-phase deploy: computes a named change
/// set from the build artifact against the target stack.
///
/// The action is restricted to exactly the capabilities it declares;
/// ambient admin rights are never requested.
#[derive(Debug, Clone, Serialize)]
pub struct CreateChangeSetAction {
    action_name: String,
    stack_name: String,
    change_set_name: String,
    template_path: ArtifactPath,
    capabilities: Vec<ChangeSetCapability>,
    admin_permissions: bool,
    run_order: u32,
}

impl CreateChangeSetAction {
    /// Creates the propose descriptor.
    ///
    /// Both capability flags are always declared and `admin_permissions`
    /// is always false; neither is caller-controlled.
    #[must_use]
    pub(crate) fn new(
        stack_name: impl Into<String>,
        change_set_name: impl Into<String>,
        template_path: ArtifactPath,
    ) -> Self {
        Self {
            action_name: "PrepareChanges".to_string(),
            stack_name: stack_name.into(),
            change_set_name: change_set_name.into(),
            template_path,
            capabilities: vec![
                ChangeSetCapability::NamedIam,
                ChangeSetCapability::AutoExpand,
            ],
            admin_permissions: false,
            run_order: PROPOSE_RUN_ORDER,
        }
    }

    /// Returns the action name.
    #[must_use]
    pub fn action_name(&self) -> &str {
        &self.action_name
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

    /// Returns the template path inside the build artifact.
    #[must_use]
    pub fn template_path(&self) -> &ArtifactPath {
        &self.template_path
    }

    /// Returns the declared capability flags.
    #[must_use]
    pub fn capabilities(&self) -> &[ChangeSetCapability] {
        &self.capabilities
    }

    /// Always false: the action holds only its declared capabilities.
    #[must_use]
    pub fn admin_permissions(&self) -> bool {
        self.admin_permissions
    }

    /// Returns the run-order rank (always 1).
    #[must_use]
    pub fn run_order(&self) -> u32 {
        self.run_order
    }
}

/// The apply half of the two-phase deploy: executes the already-proposed
/// change set. Carries no artifact reference.
#[derive(Debug, Clone, Serialize)]
pub struct ExecuteChangeSetAction {
    /// The action name within its stage.
    pub action_name: String,
    /// The target stack name.
    pub stack_name: String,
    /// The change set to execute.
    pub change_set_name: String,
    /// Run-order rank (always 2, strictly after propose).
    pub run_order: u32,
}

impl ExecuteChangeSetAction {
    pub(crate) fn new(stack_name: impl Into<String>, change_set_name: impl Into<String>) -> Self {
        Self {
            action_name: "ExecuteChanges".to_string(),
            stack_name: stack_name.into(),
            change_set_name: change_set_name.into(),
            run_order: EXECUTE_RUN_ORDER,
        }
    }
}

/// Any action that can appear in a stage's ordered action list.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PipelineAction {
    /// A source-retrieval action.
    Source(SourceAction),
    /// A build action.
    Build(BuildAction),
    /// A change-set propose action.
    CreateChangeSet(CreateChangeSetAction),
    /// A change-set execute action.
    ExecuteChangeSet(ExecuteChangeSetAction),
}

impl PipelineAction {
    /// Returns the action name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Source(a) => &a.action_name,
            Self::Build(a) => &a.action_name,
            Self::CreateChangeSet(a) => a.action_name(),
            Self::ExecuteChangeSet(a) => &a.action_name,
        }
    }

    /// Returns the run-order rank within the owning stage.
    #[must_use]
    pub fn run_order(&self) -> u32 {
        match self {
            Self::Source(_) | Self::Build(_) => 1,
            Self::CreateChangeSet(a) => a.run_order(),
            Self::ExecuteChangeSet(a) => a.run_order,
        }
    }
}

/// A named stage and its ordered action list.
#[derive(Debug, Clone, Serialize)]
pub struct StageDescriptor {
    /// The stage name.
    pub name: String,
    /// Actions in run order.
    pub actions: Vec<PipelineAction>,
}

impl StageDescriptor {
    /// Creates a stage descriptor.
    #[must_use]
    pub fn new(name: impl Into<String>, actions: Vec<PipelineAction>) -> Self {
        Self {
            name: name.into(),
            actions,
        }
    }
}
