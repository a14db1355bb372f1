//! The organization policy graph: SCPs and RCPs attached to roots, OUs, and accounts.
//!
//! SCP/RCP semantics require at least one Allow per ancestor node, not per statement globally, so the graph can
//! materialize both the directly-attached statement list for a target and a per-ancestor mapping.

use {
    super::gaad::GaadPolicyDocument,
    crate::Statement,
    serde::{Deserialize, Serialize},
    std::collections::HashMap,
};

/// Organization policy kinds handled by the engine.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum OrgPolicyType {
    #[serde(rename = "SERVICE_CONTROL_POLICY", alias = "SCP")]
    ServiceControl,

    #[serde(rename = "RESOURCE_CONTROL_POLICY", alias = "RCP")]
    ResourceControl,
}

/// The kind of node a policy is attached to.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrgTargetType {
    Root,
    #[serde(rename = "ORGANIZATIONAL_UNIT", alias = "OU")]
    OrganizationalUnit,
    Account,
}

/// One attachment of an organization policy.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct OrgPolicyTarget {
    pub target_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "Type")]
    pub target_type: OrgTargetType,
}

/// An organization policy with its content and attachments.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct OrgPolicy {
    pub id: String,
    #[serde(default)]
    pub arn: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "Type")]
    pub policy_type: OrgPolicyType,
    pub content: GaadPolicyDocument,
    #[serde(default)]
    pub targets: Vec<OrgPolicyTarget>,
}

/// The organization tree as the engine needs it: policies plus, for each target, its ancestor chain.
#[derive(Clone, Debug, Default)]
pub struct OrgPolicyGraph {
    policies: Vec<OrgPolicy>,

    /// Target id to its ancestors, root first, nearest parent last. The target itself is not in the chain.
    parent_chains: HashMap<String, Vec<String>>,
}

impl OrgPolicyGraph {
    pub fn new(policies: Vec<OrgPolicy>, parent_chains: HashMap<String, Vec<String>>) -> Self {
        Self {
            policies,
            parent_chains,
        }
    }

    /// Indicates whether any policy of the given kind exists anywhere in the organization.
    pub fn has_policies(&self, kind: OrgPolicyType) -> bool {
        self.policies.iter().any(|policy| policy.policy_type == kind)
    }

    fn attached_statements(&self, target_id: &str, kind: OrgPolicyType) -> Vec<Statement> {
        let mut statements = Vec::new();
        for policy in &self.policies {
            if policy.policy_type != kind {
                continue;
            }

            if policy.targets.iter().any(|target| target.target_id == target_id) {
                for statement in policy.content.statement().iter() {
                    statements.push(statement.with_origin_arn(if policy.arn.is_empty() {
                        policy.id.clone()
                    } else {
                        policy.arn.clone()
                    }));
                }
            }
        }

        statements
    }

    /// The aggregated statements of all policies of the given kind attached directly to the target.
    pub fn direct_statements(&self, target_id: &str, kind: OrgPolicyType) -> Vec<Statement> {
        self.attached_statements(target_id, kind)
    }

    /// For each ancestor of the target that has attachments of the given kind, the ancestor id and its
    /// aggregated statements, ordered root first.
    pub fn parent_statements(&self, target_id: &str, kind: OrgPolicyType) -> Vec<(String, Vec<Statement>)> {
        let mut result = Vec::new();
        if let Some(chain) = self.parent_chains.get(target_id) {
            for ancestor in chain {
                let statements = self.attached_statements(ancestor, kind);
                if !statements.is_empty() {
                    result.push((ancestor.clone(), statements));
                }
            }
        }

        result
    }
}
