//! Error types for pipeline assembly and execution.
//!
//! The taxonomy follows the failure classes of the delivery pipeline:
//! configuration errors surface synchronously at assembly time, build
//! failures halt the run before deploy, change-set proposal failures
//! prevent execution, and apply failures are reported without rollback.

use thiserror::Error;

/// The main error type for pipewright operations.
#[derive(Debug, Error)]
pub enum PipewrightError {
    /// A configuration error surfaced at assembly time.
    #[error("{0}")]
    Config(#[from] ConfigError),

    /// A build command failed.
    #[error("{0}")]
    Build(#[from] BuildFailure),

    /// A change-set proposal was rejected by the deployment engine.
    #[error("{0}")]
    Proposal(#[from] ProposalFailure),

    /// A change-set apply failed; the change set stays inspectable.
    #[error("{0}")]
    Apply(#[from] ApplyFailure),
}

/// Error raised when pipeline configuration is missing or invalid.
///
/// Configuration errors fail before any stage runs and are surfaced
/// synchronously to the caller assembling the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A required pipeline parameter is empty or whitespace-only.
    #[error("pipeline parameter '{field}' must not be empty")]
    EmptyParameter {
        /// The name of the offending parameter field.
        field: &'static str,
    },

    /// The named repository is not registered with the stack context.
    #[error("repository '{name}' not found in stack '{stack}'")]
    RepositoryNotFound {
        /// The repository name that failed to resolve.
        name: String,
        /// The stack context the lookup ran against.
        stack: String,
    },

    /// The source-control system could not resolve the branch.
    #[error("branch '{branch}' not found in repository '{repository}'")]
    BranchNotFound {
        /// The repository that was queried.
        repository: String,
        /// The branch that failed to resolve.
        branch: String,
    },
}

/// Error raised when a command in the build specification fails.
///
/// Any nonzero exit fails the whole build stage; the orchestrator does
/// not retry internally.
#[derive(Debug, Clone, Error)]
#[error("build command '{command}' exited with status {exit_code}")]
pub struct BuildFailure {
    /// The command that failed.
    pub command: String,
    /// The nonzero exit code.
    pub exit_code: i32,
}

impl BuildFailure {
    /// Creates a new build failure.
    #[must_use]
    pub fn new(command: impl Into<String>, exit_code: i32) -> Self {
        Self {
            command: command.into(),
            exit_code,
        }
    }
}

/// Error raised when the deployment engine rejects a change-set proposal.
///
/// When a proposal fails, the execute action must never run.
#[derive(Debug, Clone, Error)]
pub enum ProposalFailure {
    /// The template file was not present in the build artifact.
    #[error("template '{path}' not found in build artifact for stack '{stack_name}'")]
    TemplateNotFound {
        /// Relative path of the missing template.
        path: String,
        /// The target stack.
        stack_name: String,
    },

    /// The template could not be parsed by the deployment engine.
    #[error("malformed template '{path}': {reason}")]
    MalformedTemplate {
        /// Relative path of the template.
        path: String,
        /// Engine-reported parse failure.
        reason: String,
    },

    /// The proposal did not declare a capability the change requires.
    #[error("change set for stack '{stack_name}' requires undeclared capability '{capability}'")]
    MissingCapability {
        /// The target stack.
        stack_name: String,
        /// The capability flag that was required but absent.
        capability: String,
    },
}

/// Error raised when executing a proposed change set fails.
///
/// The change set remains in a failed-apply state inspectable through
/// the deployment engine; no automatic rollback is attempted.
#[derive(Debug, Clone, Error)]
#[error("apply of change set '{change_set_name}' on stack '{stack_name}' failed: {reason}")]
pub struct ApplyFailure {
    /// The target stack.
    pub stack_name: String,
    /// The change set that failed to apply.
    pub change_set_name: String,
    /// Engine-reported failure reason.
    pub reason: String,
}

impl ApplyFailure {
    /// Creates a new apply failure.
    #[must_use]
    pub fn new(
        stack_name: impl Into<String>,
        change_set_name: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            stack_name: stack_name.into(),
            change_set_name: change_set_name.into(),
            reason: reason.into(),
        }
    }
}
