//! The assembled pipeline definition.

use crate::core::{BuildAction, SourceAction, StageDescriptor};
use crate::stages::ProposedChangeSet;
use serde::Serialize;

/// The fixed linear stage topology: always exactly source, build,
/// deploy, in that order. Non-extensible by construction.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineStages {
    /// The source stage descriptor.
    pub source: StageDescriptor,
    /// The build stage descriptor.
    pub build: StageDescriptor,
    /// The deploy stage descriptor.
    pub deploy: StageDescriptor,
}

impl PipelineStages {
    /// Returns the stage descriptors in execution order.
    #[must_use]
    pub fn ordered(&self) -> [&StageDescriptor; 3] {
        [&self.source, &self.build, &self.deploy]
    }
}

/// A fully assembled pipeline: the ordered stage descriptors, the typed
/// source and build actions, and the proposed change set with its
/// finalized deployment role.
#[derive(Debug, Clone)]
pub struct PipelineDefinition {
    name: String,
    stages: PipelineStages,
    source_action: SourceAction,
    build_action: BuildAction,
    change_set: ProposedChangeSet,
}

impl PipelineDefinition {
    pub(crate) fn new(
        name: impl Into<String>,
        stages: PipelineStages,
        source_action: SourceAction,
        build_action: BuildAction,
        change_set: ProposedChangeSet,
    ) -> Self {
        Self {
            name: name.into(),
            stages,
            source_action,
            build_action,
            change_set,
        }
    }

    /// Returns the pipeline name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the typed stage tuple.
    #[must_use]
    pub fn stages(&self) -> &PipelineStages {
        &self.stages
    }

    /// Returns the stage names in execution order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages
            .ordered()
            .iter()
            .map(|s| s.name.as_str())
            .collect()
    }

    /// Returns the source action.
    #[must_use]
    pub fn source_action(&self) -> &SourceAction {
        &self.source_action
    }

    /// Returns the build action.
    #[must_use]
    pub fn build_action(&self) -> &BuildAction {
        &self.build_action
    }

    /// Returns the proposed change set, including the deployment role.
    #[must_use]
    pub fn change_set(&self) -> &ProposedChangeSet {
        &self.change_set
    }
}
