//! Declarative permission model for the build and deployment roles.
//!
//! Grants are modeled as plain values so assembly can be asserted on
//! directly instead of inspecting mutated role state.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Policy statement effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    /// The statement allows the listed actions.
    Allow,
    /// The statement denies the listed actions.
    Deny,
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Allow => write!(f, "Allow"),
            Self::Deny => write!(f, "Deny"),
        }
    }
}

/// A single policy statement: effect, action verbs, resources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyStatement {
    /// Whether the statement allows or denies.
    #[serde(rename = "Effect")]
    pub effect: Effect,
    /// The action verbs the statement covers.
    #[serde(rename = "Action")]
    pub actions: Vec<String>,
    /// The resources the statement covers.
    #[serde(rename = "Resource")]
    pub resources: Vec<String>,
}

impl PolicyStatement {
    /// Creates an allow statement over all resources.
    #[must_use]
    pub fn allow(actions: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            effect: Effect::Allow,
            actions: actions.into_iter().map(Into::into).collect(),
            resources: vec!["*".to_string()],
        }
    }

    /// Restricts the statement to specific resources.
    #[must_use]
    pub fn with_resources(mut self, resources: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.resources = resources.into_iter().map(Into::into).collect();
        self
    }
}

/// A named inline policy: a precisely enumerated list of allowed action
/// verbs attached directly to one role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlinePolicy {
    /// The policy name.
    pub name: String,
    /// The policy statements.
    pub statements: Vec<PolicyStatement>,
}

impl InlinePolicy {
    /// Creates an inline policy.
    #[must_use]
    pub fn new(name: impl Into<String>, statements: Vec<PolicyStatement>) -> Self {
        Self {
            name: name.into(),
            statements,
        }
    }

    /// Renders the policy as a standard policy document.
    #[must_use]
    pub fn to_document(&self) -> serde_json::Value {
        serde_json::json!({
            "Version": "2012-10-17",
            "Statement": self.statements,
        })
    }
}

/// A broad, externally predefined permission bundle attachable to a
/// role as a unit, referenced by managed policy name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagedGrant {
    /// The managed policy name.
    pub policy_name: String,
}

impl ManagedGrant {
    /// References a managed policy by its well-known name.
    #[must_use]
    pub fn from_managed_policy_name(name: impl Into<String>) -> Self {
        Self {
            policy_name: name.into(),
        }
    }
}

/// The authorization identity a service executes under, carrying only
/// managed grants. Used for the build executor's role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionRole {
    /// The role name.
    pub role_name: String,
    /// Attached managed grants.
    pub managed_grants: Vec<ManagedGrant>,
}

impl ExecutionRole {
    /// Creates an execution role with no grants.
    #[must_use]
    pub fn new(role_name: impl Into<String>) -> Self {
        Self {
            role_name: role_name.into(),
            managed_grants: Vec::new(),
        }
    }

    /// Attaches a managed grant. No-op if already attached.
    pub fn add_managed_grant(&mut self, grant: ManagedGrant) {
        if !self.managed_grants.contains(&grant) {
            self.managed_grants.push(grant);
        }
    }
}

/// The authorization identity under which change-set apply occurs.
///
/// The role exists only as a byproduct of constructing the propose
/// action; it is mutated exactly once, by permission finalization.
/// Deliberately not deserializable: a role cannot be minted outside a
/// proposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeploymentRole {
    /// The role name.
    pub role_name: String,
    /// Attached managed grants.
    pub managed_grants: Vec<ManagedGrant>,
    /// Attached inline policies.
    pub inline_policies: Vec<InlinePolicy>,
}

impl DeploymentRole {
    pub(crate) fn new(role_name: impl Into<String>) -> Self {
        Self {
            role_name: role_name.into(),
            managed_grants: Vec::new(),
            inline_policies: Vec::new(),
        }
    }

    /// Attaches a managed grant. No-op if already attached.
    pub fn add_managed_grant(&mut self, grant: ManagedGrant) {
        if !self.managed_grants.contains(&grant) {
            self.managed_grants.push(grant);
        }
    }

    /// Attaches an inline policy. No-op if a policy with the same name
    /// is already attached.
    pub fn attach_inline_policy(&mut self, policy: InlinePolicy) {
        if !self.inline_policies.iter().any(|p| p.name == policy.name) {
            self.inline_policies.push(policy);
        }
    }
}

/// The finalization grant set for the change-set applying role, as an
/// explicit declarative value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployGrantSet {
    /// Broad managed grants attached as units.
    pub managed: Vec<ManagedGrant>,
    /// The enumerated inline policy.
    pub inline: InlinePolicy,
}

impl DeployGrantSet {
    /// Applies the grant set to a deployment role. Idempotent.
    pub fn apply_to(&self, role: &mut DeploymentRole) {
        for grant in &self.managed {
            role.add_managed_grant(grant.clone());
        }
        role.attach_inline_policy(self.inline.clone());
    }
}

/// Action verbs the change-set applying role may exercise: API-gateway
/// management, deployment orchestration, compute-unit management,
/// change-set creation, a narrow set of role lifecycle verbs, and
/// read-only object/versioning access to the artifact store.
pub const CLOUDFORMATION_DEPLOY_ACTIONS: [&str; 15] = [
    "apigateway:*",
    "codedeploy:*",
    "lambda:*",
    "cloudformation:CreateChangeSet",
    "iam:GetRole",
    "iam:CreateRole",
    "iam:DeleteRole",
    "iam:PutRolePolicy",
    "iam:AttachRolePolicy",
    "iam:DeleteRolePolicy",
    "iam:DetachRolePolicy",
    "iam:PassRole",
    "s3:GetObject",
    "s3:GetObjectVersion",
    "s3:GetBucketVersioning",
];

/// Returns the grant set permission finalization attaches to the
/// change-set applying role.
#[must_use]
pub fn cloudformation_deploy_grants() -> DeployGrantSet {
    DeployGrantSet {
        managed: vec![
            ManagedGrant::from_managed_policy_name("AWSLambdaExecute"),
            ManagedGrant::from_managed_policy_name("AmazonEventBridgeFullAccess"),
        ],
        inline: InlinePolicy::new(
            "CodePipelineLambdaDeployPermissionPolicy",
            vec![PolicyStatement::allow(CLOUDFORMATION_DEPLOY_ACTIONS)],
        ),
    }
}
