//! Build specification and build project descriptors.
//!
//! The build specification is the declarative recipe the external build
//! executor runs: an ordered command list plus declared output files.
//! Commands execute in listed order and any failure fails the stage.

use crate::iam::{ExecutionRole, ManagedGrant};
use crate::params::PipelineParameters;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Build image identifier for the executor's isolated environment.
pub const LINUX_BUILD_IMAGE_STANDARD_5_0: &str = "aws/codebuild/standard:5.0";

/// The runtime the install phase provisions.
const NODEJS_RUNTIME_VERSION: &str = "12";

/// Declarative recipe for turning a source artifact into a build
/// artifact. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildSpecification {
    /// Specification format version.
    pub version: String,
    /// Ordered build phases.
    pub phases: BuildPhases,
    /// Declared outputs of the build.
    pub artifacts: ArtifactsSpec,
}

/// The ordered phases of a build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildPhases {
    /// Runtime installation phase.
    pub install: InstallPhase,
    /// Commands run before the build proper.
    pub pre_build: CommandPhase,
    /// The build commands.
    pub build: CommandPhase,
}

/// Runtime provisioning for the build environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallPhase {
    /// Runtime name to version, e.g. `nodejs -> 12`.
    #[serde(rename = "runtime-versions")]
    pub runtime_versions: BTreeMap<String, String>,
}

/// An ordered list of shell-level commands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandPhase {
    /// Commands in execution order.
    pub commands: Vec<String>,
}

/// Declared output files of the build.
///
/// The declared files must include everything downstream stages will
/// reference by path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactsSpec {
    /// Packaging type of the result artifact.
    #[serde(rename = "type")]
    pub kind: String,
    /// The declared output filenames.
    pub files: Vec<String>,
}

impl BuildSpecification {
    /// Builds the specification for the given pipeline parameters.
    ///
    /// The command list installs the runtime, packages the source into a
    /// deployable unit against the configured artifact bucket, and emits
    /// the configured deployment descriptor file.
    #[must_use]
    pub fn for_params(params: &PipelineParameters) -> Self {
        let mut runtime_versions = BTreeMap::new();
        runtime_versions.insert("nodejs".to_string(), NODEJS_RUNTIME_VERSION.to_string());

        Self {
            version: "0.2".to_string(),
            phases: BuildPhases {
                install: InstallPhase { runtime_versions },
                pre_build: CommandPhase {
                    commands: vec!["echo build start".to_string()],
                },
                build: CommandPhase {
                    commands: vec![
                        "echo Build started on `date`".to_string(),
                        "sam build".to_string(),
                        format!("export BUCKET={}", params.artifact_bucket),
                        format!(
                            "sam package --s3-bucket $BUCKET --output-template-file {}",
                            params.output_template_file
                        ),
                        "echo Build completed on `date`".to_string(),
                    ],
                },
            },
            artifacts: ArtifactsSpec {
                kind: "zip".to_string(),
                files: vec![
                    "template.yml".to_string(),
                    params.output_template_file.clone(),
                ],
            },
        }
    }

    /// Returns all commands across phases, in execution order.
    #[must_use]
    pub fn commands(&self) -> Vec<&str> {
        self.phases
            .pre_build
            .commands
            .iter()
            .chain(&self.phases.build.commands)
            .map(String::as_str)
            .collect()
    }

    /// Returns true if `file` is a declared output of the build.
    #[must_use]
    pub fn declares_output(&self, file: &str) -> bool {
        self.artifacts.files.iter().any(|f| f == file)
    }
}

/// The build executor definition: project identity, isolated
/// environment, specification, and the executor's own role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildProject {
    /// The project name.
    pub project_name: String,
    /// The build environment image.
    pub build_image: String,
    /// The build specification.
    pub build_spec: BuildSpecification,
    /// The executor's role. Distinct from the deployment role.
    pub role: ExecutionRole,
}

impl BuildProject {
    /// Creates the build project for the given parameters.
    ///
    /// Grants the executor's role broad read/write access to the
    /// artifact store. The grant is deliberately coarse and scoped only
    /// to this role.
    #[must_use]
    pub fn for_params(params: &PipelineParameters) -> Self {
        let mut role = ExecutionRole::new("CodeBuild-Lambda-Role");
        role.add_managed_grant(ManagedGrant::from_managed_policy_name("AmazonS3FullAccess"));

        Self {
            project_name: "CodeBuild-Lambda".to_string(),
            build_image: LINUX_BUILD_IMAGE_STANDARD_5_0.to_string(),
            build_spec: BuildSpecification::for_params(params),
            role,
        }
    }
}
