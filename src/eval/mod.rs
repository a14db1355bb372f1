//! Evaluation requests, results, and the policy evaluator.

mod engine;
mod statement;

pub use {
    engine::PolicyEvaluator,
    statement::{evaluate_statement, evaluate_statements, principal_matches, StatementEvaluation},
};

use {
    crate::{context::RequestContext, display_json, Statement},
    serde::{Deserialize, Serialize},
    std::{
        collections::BTreeMap,
        fmt::{Display, Formatter, Result as FmtResult},
        sync::Arc,
    },
};

/// The policy types that participate in a decision, in deny-scan order.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Ord, PartialEq, PartialOrd, Serialize)]
pub enum PolicyType {
    #[serde(rename = "RCP")]
    Rcp,

    #[serde(rename = "SCP")]
    Scp,

    Boundary,
    Identity,
    Resource,
}

impl Display for PolicyType {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        f.write_str(match self {
            Self::Rcp => "RCP",
            Self::Scp => "SCP",
            Self::Boundary => "permission boundary",
            Self::Identity => "identity policy",
            Self::Resource => "resource policy",
        })
    }
}

/// Per-policy-type statement evaluations collected while deciding one request.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct PolicyResult {
    #[serde(rename = "Evaluations")]
    pub evaluations: BTreeMap<PolicyType, Vec<StatementEvaluation>>,
}

impl PolicyResult {
    pub fn add(&mut self, policy_type: PolicyType, mut evaluations: Vec<StatementEvaluation>) {
        if !evaluations.is_empty() {
            self.evaluations.entry(policy_type).or_default().append(&mut evaluations);
        }
    }

    pub fn of_type(&self, policy_type: PolicyType) -> &[StatementEvaluation] {
        self.evaluations.get(&policy_type).map(|evaluations| evaluations.as_slice()).unwrap_or(&[])
    }

    /// Indicates whether any statement of any type produced an explicit deny.
    pub fn has_explicit_deny(&self) -> bool {
        self.evaluations.values().flatten().any(|evaluation| evaluation.explicit_deny)
    }
}

/// A fully materialized evaluation request.
#[derive(Clone, Debug)]
pub struct EvaluationRequest {
    pub action: String,

    /// The target's ARN, or a service pseudo-identifier for create-style actions.
    pub resource: String,

    pub context: RequestContext,

    /// The principal's merged identity statements (inline + attached managed + group), each annotated with its
    /// origin ARN.
    pub identity_statements: Arc<Vec<Statement>>,

    /// The permissions boundary statements; an empty list means no boundary applies.
    pub boundary_statements: Arc<Vec<Statement>>,
}

impl EvaluationRequest {
    pub fn new<A: Into<String>, R: Into<String>>(
        action: A,
        resource: R,
        context: RequestContext,
        identity_statements: Arc<Vec<Statement>>,
        boundary_statements: Arc<Vec<Statement>>,
    ) -> Self {
        Self {
            action: action.into(),
            resource: resource.into(),
            context,
            identity_statements,
            boundary_statements,
        }
    }
}

/// The decision for one request, with full provenance.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct EvaluationResult {
    #[serde(rename = "Allowed")]
    pub allowed: bool,

    #[serde(rename = "EvaluationDetails")]
    pub evaluation_details: String,

    #[serde(rename = "CrossAccountAccess")]
    pub cross_account_access: bool,

    #[serde(rename = "Action")]
    pub action: String,

    /// For SSM document-gated actions, the document ARN patterns the identity policy grants, regardless of the
    /// decision. Callers use this as a risk signal.
    #[serde(rename = "SSMDocumentRestrictions", skip_serializing_if = "Vec::is_empty", default)]
    pub ssm_document_restrictions: Vec<String>,

    #[serde(rename = "PolicyResult")]
    pub policy_result: PolicyResult,
}

display_json!(EvaluationResult);
