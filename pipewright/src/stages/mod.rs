//! The three pipeline stages: source retrieval, build, deploy.
//!
//! Stage execution order is enforced structurally: producing a build
//! action requires the source output handle, and proposing a change set
//! requires the build output handle. There is no path to a deploy
//! descriptor without first possessing a build artifact.

mod build;
mod deploy;
mod source;

pub use build::BuildStage;
pub use deploy::{DeployStage, ProposedChangeSet, DEPLOY_CHANGE_SET_NAME, DEPLOY_STACK_NAME};
pub use source::SourceStage;
