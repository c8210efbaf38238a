//! Core descriptor types shared across pipeline stages.

mod action;
mod artifact;

pub use action::{
    BuildAction, ChangeSetCapability, CreateChangeSetAction, ExecuteChangeSetAction,
    PipelineAction, SourceAction, StageDescriptor, EXECUTE_RUN_ORDER, PROPOSE_RUN_ORDER,
};
pub use artifact::{ArtifactHandle, ArtifactPath};
