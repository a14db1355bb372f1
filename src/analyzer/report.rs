//! Output projections of the permissions summary.

use {
    super::summary::{ActionEvaluation, PermissionsSummary},
    crate::snapshot::{Caches, GroupDetail, ResourceRecord, RoleDetail, UserDetail},
    serde::Serialize,
    std::collections::BTreeMap,
};

/// The full permission map: every principal, every touched resource, allowed and denied actions with their
/// complete evaluation results.
#[derive(Debug, Serialize)]
pub struct PermissionMapReport {
    pub permissions: BTreeMap<String, PrincipalReport>,
}

#[derive(Debug, Serialize)]
pub struct PrincipalReport {
    pub principal_arn: String,
    pub account_id: String,
    pub resource_permissions: BTreeMap<String, ResourcePermissionReport>,
}

#[derive(Debug, Serialize)]
pub struct ResourcePermissionReport {
    #[serde(rename = "Resource", skip_serializing_if = "Option::is_none")]
    pub resource: Option<ResourceRecord>,

    #[serde(rename = "AllowedActions")]
    pub allowed_actions: Vec<ActionEvaluation>,

    #[serde(rename = "DeniedActions")]
    pub denied_actions: Vec<ActionEvaluation>,
}

/// Build the permission map, embedding the cached resource record for each touched resource.
pub fn permission_map(summary: &PermissionsSummary, caches: &Caches) -> PermissionMapReport {
    let mut permissions = BTreeMap::new();

    for principal in summary.principals() {
        let mut resource_permissions = BTreeMap::new();
        for resource_arn in principal.resource_arns() {
            if let Some(resource) = principal.resource(&resource_arn) {
                resource_permissions.insert(
                    resource_arn.clone(),
                    ResourcePermissionReport {
                        resource: caches.resource(&resource_arn).cloned(),
                        allowed_actions: resource.allowed_actions(),
                        denied_actions: resource.denied_actions(),
                    },
                );
            }
        }

        permissions.insert(
            principal.principal_arn().to_string(),
            PrincipalReport {
                principal_arn: principal.principal_arn().to_string(),
                account_id: principal.account_id().to_string(),
                resource_permissions,
            },
        );
    }

    PermissionMapReport {
        permissions,
    }
}

/// One principal's allowed actions per resource, with no evaluation detail.
#[derive(Debug, Serialize)]
pub struct CompactPrincipalResult {
    pub principal_arn: String,
    pub account_id: String,
    pub resource_permissions: BTreeMap<String, Vec<String>>,
}

/// The compact projection, sorted by principal ARN. Principals with no allowed edges are omitted.
pub fn compact_results(summary: &PermissionsSummary) -> Vec<CompactPrincipalResult> {
    let mut results = Vec::new();

    for principal in summary.principals() {
        let mut resource_permissions = BTreeMap::new();
        for resource_arn in principal.resource_arns() {
            if let Some(resource) = principal.resource(&resource_arn) {
                let names = resource.allowed_action_names();
                if !names.is_empty() {
                    resource_permissions.insert(resource_arn.clone(), names);
                }
            }
        }

        if !resource_permissions.is_empty() {
            results.push(CompactPrincipalResult {
                principal_arn: principal.principal_arn().to_string(),
                account_id: principal.account_id().to_string(),
                resource_permissions,
            });
        }
    }

    results
}

/// The full snapshot record behind a principal ARN, dispatched on principal type.
#[derive(Clone, Debug, Serialize)]
#[serde(untagged)]
pub enum PrincipalRecord {
    User(UserDetail),
    Role(RoleDetail),
    Group(GroupDetail),
    Arn(String),
}

/// One allowed (principal, resource, action) edge with the full principal and resource records embedded.
#[derive(Debug, Serialize)]
pub struct FullResultRecord {
    pub principal_arn: String,
    pub action: String,
    pub resource_arn: String,

    pub principal: PrincipalRecord,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<ResourceRecord>,
}

/// One record per allowed edge. The principal record resolves through a single type dispatch: user, then role,
/// then group, falling back to the bare ARN string.
pub fn full_results(summary: &PermissionsSummary, caches: &Caches) -> Vec<FullResultRecord> {
    let mut records = Vec::new();

    for principal in summary.principals() {
        let principal_arn = principal.principal_arn();
        let principal_record = if let Some(user) = caches.user(principal_arn) {
            PrincipalRecord::User(user.clone())
        } else if let Some(role) = caches.role(principal_arn) {
            PrincipalRecord::Role(role.clone())
        } else if let Some(group) = caches.group(principal_arn) {
            PrincipalRecord::Group(group.clone())
        } else {
            PrincipalRecord::Arn(principal_arn.to_string())
        };

        for resource_arn in principal.resource_arns() {
            if let Some(resource) = principal.resource(&resource_arn) {
                for entry in resource.allowed_actions() {
                    records.push(FullResultRecord {
                        principal_arn: principal_arn.to_string(),
                        action: entry.name,
                        resource_arn: resource_arn.clone(),
                        principal: principal_record.clone(),
                        resource: caches.resource(&resource_arn).cloned(),
                    });
                }
            }
        }
    }

    records
}

#[cfg(test)]
mod tests {
    use {
        super::{compact_results, full_results, permission_map},
        crate::{
            analyzer::PermissionsSummary,
            eval::EvaluationResult,
            snapshot::{AccountAuthorizationDetails, Caches},
        },
        pretty_assertions::assert_eq,
        std::{collections::HashMap, str::FromStr},
    };

    fn caches() -> Caches {
        let gaad = AccountAuthorizationDetails::from_str(
            r#"{
                "UserDetailList": [
                    {"UserName": "alice", "Arn": "arn:aws:iam::123456789012:user/alice"}
                ]
            }"#,
        )
        .unwrap();
        Caches::build(&gaad, vec![], HashMap::new())
    }

    fn summary() -> PermissionsSummary {
        let summary = PermissionsSummary::new();
        summary.add(
            "arn:aws:iam::123456789012:user/alice",
            "lambda.amazonaws.com",
            "lambda:CreateFunction",
            EvaluationResult {
                allowed: true,
                evaluation_details: "Allowed by identity policy".to_string(),
                action: "lambda:CreateFunction".to_string(),
                ..EvaluationResult::default()
            },
        );
        summary.add(
            "arn:aws:iam::123456789012:user/alice",
            "lambda.amazonaws.com",
            "lambda:CreateEventSourceMapping",
            EvaluationResult::default(),
        );
        summary
    }

    #[test_log::test]
    fn test_permission_map_shape() {
        let report = permission_map(&summary(), &caches());
        let json = serde_json::to_value(&report).unwrap();

        let principal = &json["permissions"]["arn:aws:iam::123456789012:user/alice"];
        assert_eq!(principal["principal_arn"], "arn:aws:iam::123456789012:user/alice");
        assert_eq!(principal["account_id"], "123456789012");

        let resource = &principal["resource_permissions"]["lambda.amazonaws.com"];
        assert_eq!(resource["AllowedActions"][0]["Name"], "lambda:CreateFunction");
        assert_eq!(resource["AllowedActions"][0]["EvaluationResult"]["Allowed"], true);
        assert_eq!(resource["DeniedActions"][0]["Name"], "lambda:CreateEventSourceMapping");
        assert_eq!(resource["Resource"]["TypeName"], "AWS::Service");
    }

    #[test_log::test]
    fn test_compact_results() {
        let results = compact_results(&summary());
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].principal_arn, "arn:aws:iam::123456789012:user/alice");
        assert_eq!(
            results[0].resource_permissions["lambda.amazonaws.com"],
            vec!["lambda:CreateFunction".to_string()]
        );
    }

    #[test_log::test]
    fn test_full_results_dispatch() {
        let records = full_results(&summary(), &caches());
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].action, "lambda:CreateFunction");

        let json = serde_json::to_value(&records[0]).unwrap();
        assert_eq!(json["principal"]["UserName"], "alice");
        assert_eq!(json["resource"]["TypeName"], "AWS::Service");
    }
}
