#![warn(clippy::all)]
//! An offline AWS IAM policy evaluation engine and permission enumerator.
//!
//! Given a static snapshot of an account's identities, policies, resources, and organization policies, the
//! engine answers "is principal P allowed to perform action A on resource R in context C?" with the same algebra
//! AWS applies at runtime: explicit deny beats allow, and RCPs, SCPs, permission boundaries, identity policies,
//! and resource policies compose under the documented precedence rules. On top of the evaluator, the
//! [analyzer](crate::analyzer) enumerates every principal's effective privilege-escalation surface and records it
//! in a thread-safe permission summary.
//!
//! The engine never talks to AWS: snapshots, resource inventories, and the action catalog are handed in as
//! materialized data structures (see [snapshot] and [catalog]).

pub mod analyzer;
pub mod catalog;
pub mod condition;
pub mod context;
pub mod eval;
pub mod snapshot;

mod action;
mod effect;
mod error;
mod glob;
mod policy;
mod principal;
mod resource;
mod serutil;
mod statement;

pub use {
    action::{Action, ActionList},
    condition::{Condition, ConditionDecision, ConditionEval, ConditionMap, ConditionOp, KeyEvaluation},
    context::{principal_type_of, ContextValue, PrincipalType, RequestContext},
    effect::Effect,
    error::EngineError,
    glob::{account_id_from_arn, arn_segments_compatible, glob_matches},
    policy::{PolicyDocument, PolicyDocumentBuilder, PolicyDocumentBuilderError},
    principal::{Principal, SpecifiedPrincipal, SpecifiedPrincipalBuilder, SpecifiedPrincipalBuilderError},
    resource::{Resource, ResourceList},
    serutil::{JsonRep, StringLikeList, StringList},
    statement::{Statement, StatementBuilder, StatementBuilderError, StatementList},
};
