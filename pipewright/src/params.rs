//! Pipeline parameters resolved once before any stage is built.

use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};

/// Default filename of the deployment descriptor the build emits and
/// the deploy stage later reads out of the build artifact.
pub const DEFAULT_OUTPUT_TEMPLATE_FILE: &str = "outputtemplate.yml";

/// Immutable configuration for one pipeline assembly.
///
/// Parameters are resolved once, validated before stage construction,
/// and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineParameters {
    /// Name of the source repository.
    pub repository_name: String,
    /// Branch to track in the source repository.
    pub branch_name: String,
    /// Storage bucket the build uploads packaged artifacts to.
    pub artifact_bucket: String,
    /// Filename of the deployment descriptor inside the build artifact.
    #[serde(default = "default_output_template_file")]
    pub output_template_file: String,
}

fn default_output_template_file() -> String {
    DEFAULT_OUTPUT_TEMPLATE_FILE.to_string()
}

impl PipelineParameters {
    /// Creates parameters with the default output template filename.
    #[must_use]
    pub fn new(
        repository_name: impl Into<String>,
        branch_name: impl Into<String>,
        artifact_bucket: impl Into<String>,
    ) -> Self {
        Self {
            repository_name: repository_name.into(),
            branch_name: branch_name.into(),
            artifact_bucket: artifact_bucket.into(),
            output_template_file: default_output_template_file(),
        }
    }

    /// Overrides the output template filename.
    #[must_use]
    pub fn with_output_template_file(mut self, file: impl Into<String>) -> Self {
        self.output_template_file = file.into();
        self
    }

    /// Validates that every parameter is populated.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EmptyParameter`] naming the first empty or
    /// whitespace-only field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fields: [(&'static str, &str); 4] = [
            ("repository_name", &self.repository_name),
            ("branch_name", &self.branch_name),
            ("artifact_bucket", &self.artifact_bucket),
            ("output_template_file", &self.output_template_file),
        ];
        for (field, value) in fields {
            if value.trim().is_empty() {
                return Err(ConfigError::EmptyParameter { field });
            }
        }
        Ok(())
    }
}
