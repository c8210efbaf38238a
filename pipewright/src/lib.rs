//! # Pipewright
//!
//! Typed assembly of a fixed three-stage continuous-delivery pipeline:
//! source retrieval, build, and a two-phase (propose/execute) change-set
//! deployment.
//!
//! Stages hand off immutable artifact handles in strict producer to
//! consumer order, enforced structurally: a build action cannot exist
//! without the source output handle, and a change set cannot be proposed
//! without the build output handle. The deploy stage separates computing
//! the effect of a change from applying it, and the authorization to
//! apply is scoped narrowly and attached only after the propose action
//! exists.
//!
//! ## Quick start
//!
//! ```rust
//! use pipewright::params::PipelineParameters;
//! use pipewright::pipeline::PipelineOrchestrator;
//! use pipewright::stack::StackContext;
//!
//! let mut stack = StackContext::new("demo-app");
//! stack.register_repository("lambda-demo");
//!
//! let params = PipelineParameters::new("lambda-demo", "main", "du-lambda-demo-bucket");
//! let definition = PipelineOrchestrator::new("lambda-pipeline")
//!     .assemble(&stack, &params)
//!     .expect("valid configuration");
//!
//! assert_eq!(definition.stage_names(), vec!["Source", "Build", "Deploy"]);
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod buildspec;
pub mod core;
pub mod engine;
pub mod errors;
pub mod iam;
pub mod observability;
pub mod params;
pub mod pipeline;
pub mod runner;
pub mod stack;
pub mod stages;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::buildspec::{BuildProject, BuildSpecification};
    pub use crate::core::{
        ArtifactHandle, ArtifactPath, BuildAction, ChangeSetCapability, CreateChangeSetAction,
        ExecuteChangeSetAction, PipelineAction, SourceAction, StageDescriptor,
    };
    pub use crate::engine::{
        ApplyResult, BuildExecutor, BuildResult, ChangeSetRecord, ChangeSetStatus,
        DeploymentEngine, PermissionStore, SourceProvider, SourceRevision,
    };
    pub use crate::errors::{
        ApplyFailure, BuildFailure, ConfigError, PipewrightError, ProposalFailure,
    };
    pub use crate::iam::{
        cloudformation_deploy_grants, DeployGrantSet, DeploymentRole, Effect, ExecutionRole,
        InlinePolicy, ManagedGrant, PolicyStatement,
    };
    pub use crate::params::PipelineParameters;
    pub use crate::pipeline::{PipelineDefinition, PipelineOrchestrator, PipelineStages};
    pub use crate::runner::{DeployRunState, PipelineRunner, RunReport};
    pub use crate::stack::{RepositoryRef, StackContext};
    pub use crate::stages::{BuildStage, DeployStage, ProposedChangeSet, SourceStage};
}
