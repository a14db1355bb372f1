//! The materialized input snapshot: GAAD, organization policies, resources, and the caches built from them.

mod cache;
mod gaad;
mod org;
mod resource;

pub use {
    cache::Caches,
    gaad::{
        AccountAuthorizationDetails, AttachedPermissionsBoundary, AttachedPolicy, GaadPolicyDocument, GroupDetail,
        InlinePolicy, ManagedPolicyDetail, PolicyVersionDetail, RoleDetail, Tag, UserDetail,
    },
    org::{OrgPolicy, OrgPolicyGraph, OrgPolicyTarget, OrgPolicyType, OrgTargetType},
    resource::{ResourceRecord, SERVICE_PSEUDO_TYPE},
};
