//! Pipeline assembly: orchestrator and assembled definition.

mod definition;
mod orchestrator;

pub use definition::{PipelineDefinition, PipelineStages};
pub use orchestrator::PipelineOrchestrator;
