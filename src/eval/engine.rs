//! The policy evaluator: composes per-type evaluations under AWS precedence rules.

use {
    super::{
        statement::{evaluate_statements, principal_explicitly_named, StatementEvaluation},
        EvaluationRequest, EvaluationResult, PolicyResult, PolicyType,
    },
    crate::{
        catalog::is_valid_action_for_resource,
        snapshot::{Caches, OrgPolicyGraph, OrgPolicyType},
        Effect, Statement,
    },
    log::trace,
};

/// Decides one request against the full policy stack: RCPs, SCPs, permission boundary, identity policy, and
/// resource policy.
#[derive(Debug)]
pub struct PolicyEvaluator<'a> {
    caches: &'a Caches,
    org: &'a OrgPolicyGraph,
}

impl<'a> PolicyEvaluator<'a> {
    pub fn new(caches: &'a Caches, org: &'a OrgPolicyGraph) -> Self {
        Self {
            caches,
            org,
        }
    }

    pub fn evaluate(&self, request: &EvaluationRequest) -> EvaluationResult {
        let mut context = request.context.clone();
        context.populate_defaults(&request.resource);

        let action = request.action.as_str();
        let resource = request.resource.as_str();
        let cross_account_access = is_cross_account(context.principal_account(), context.resource_account());
        let ssm_document_restrictions = ssm_document_restrictions(action, &request.identity_statements);

        // A structural filter, not a policy decision: the action cannot target this kind of resource at all.
        if !is_valid_action_for_resource(action, resource) {
            return EvaluationResult {
                allowed: false,
                evaluation_details: "Action not valid for resource".to_string(),
                cross_account_access,
                action: action.to_string(),
                ssm_document_restrictions,
                policy_result: PolicyResult::default(),
            };
        }

        let service_linked = context.is_service_linked_role();

        let rcp_parents: Vec<(String, Vec<StatementEvaluation>)> = self
            .org
            .parent_statements(context.resource_account(), OrgPolicyType::ResourceControl)
            .into_iter()
            .map(|(id, statements)| (id, evaluate_statements(&statements, action, resource, &context)))
            .collect();
        let rcp_direct = evaluate_statements(
            &self.org.direct_statements(context.resource_account(), OrgPolicyType::ResourceControl),
            action,
            resource,
            &context,
        );

        // Service-linked roles bypass SCPs entirely; their statements all read as explicit allows.
        let scp_parents: Vec<(String, Vec<StatementEvaluation>)> = self
            .org
            .parent_statements(context.principal_account(), OrgPolicyType::ServiceControl)
            .into_iter()
            .map(|(id, statements)| {
                let evaluations = evaluate_statements(&statements, action, resource, &context);
                (id, if service_linked { bypass_as_allows(evaluations) } else { evaluations })
            })
            .collect();
        let scp_direct = {
            let evaluations = evaluate_statements(
                &self.org.direct_statements(context.principal_account(), OrgPolicyType::ServiceControl),
                action,
                resource,
                &context,
            );
            if service_linked {
                bypass_as_allows(evaluations)
            } else {
                evaluations
            }
        };

        let boundary_evals = evaluate_statements(&request.boundary_statements, action, resource, &context);
        let identity_evals = evaluate_statements(&request.identity_statements, action, resource, &context);

        let resource_policy = self.caches.resource_policy(resource);
        let resource_statements: Vec<Statement> = resource_policy
            .map(|policy| {
                policy
                    .statement()
                    .iter()
                    .map(|statement| statement.with_origin_arn(resource).with_default_resource(resource))
                    .collect()
            })
            .unwrap_or_default();
        let resource_evals = evaluate_statements(&resource_statements, action, resource, &context);

        let mut policy_result = PolicyResult::default();
        let mut all_rcp = rcp_parents.iter().flat_map(|(_, evaluations)| evaluations.clone()).collect::<Vec<_>>();
        all_rcp.extend(rcp_direct.clone());
        policy_result.add(PolicyType::Rcp, all_rcp.clone());
        let mut all_scp = scp_parents.iter().flat_map(|(_, evaluations)| evaluations.clone()).collect::<Vec<_>>();
        all_scp.extend(scp_direct.clone());
        policy_result.add(PolicyType::Scp, all_scp.clone());
        policy_result.add(PolicyType::Boundary, boundary_evals.clone());
        policy_result.add(PolicyType::Identity, identity_evals.clone());
        policy_result.add(PolicyType::Resource, resource_evals.clone());

        let finish = |allowed: bool, details: String| EvaluationResult {
            allowed,
            evaluation_details: details,
            cross_account_access,
            action: action.to_string(),
            ssm_document_restrictions: ssm_document_restrictions.clone(),
            policy_result: policy_result.clone(),
        };

        // Explicit deny beats everything, scanned in precedence order.
        for (policy_type, evaluations) in [
            (PolicyType::Rcp, &all_rcp),
            (PolicyType::Scp, &all_scp),
            (PolicyType::Boundary, &boundary_evals),
            (PolicyType::Identity, &identity_evals),
            (PolicyType::Resource, &resource_evals),
        ] {
            if has_explicit_deny(evaluations) {
                return finish(false, format!("Explicitly denied by {}", policy_type));
            }
        }

        // RCPs and SCPs require at least one allow per ancestor node, then per direct attachment set.
        for (ancestor, evaluations) in &rcp_parents {
            if !has_explicit_allow(evaluations) {
                return finish(false, format!("No explicit allow in parent RCP from {}", ancestor));
            }
        }
        if !rcp_direct.is_empty() && !has_explicit_allow(&rcp_direct) {
            return finish(false, "Denied by RCP".to_string());
        }

        for (ancestor, evaluations) in &scp_parents {
            if !has_explicit_allow(evaluations) {
                return finish(false, format!("No explicit allow in parent SCP from {}", ancestor));
            }
        }
        if !scp_direct.is_empty() && !has_explicit_allow(&scp_direct) {
            return finish(false, "Denied by SCP".to_string());
        }

        // An empty boundary list means no boundary applies; a present one must allow.
        if !boundary_evals.is_empty() && !has_explicit_allow(&boundary_evals) {
            return finish(false, "Denied by permission boundary".to_string());
        }

        let resource_allows = has_explicit_allow(&resource_evals);
        let explicitly_named = resource_policy
            .map(|policy| {
                policy.statement().iter().any(|statement| {
                    *statement.effect() == Effect::Allow
                        && statement
                            .principal()
                            .map(|principal| principal_explicitly_named(principal, &context))
                            .unwrap_or(false)
                })
            })
            .unwrap_or(false);

        let assume_role = is_assume_role(action, resource);

        if !assume_role && resource_allows && explicitly_named {
            return finish(true, "Explicitly allowed by resource policy".to_string());
        }

        let identity_allows = has_explicit_allow(&identity_evals);

        trace!(
            "decision inputs: action={} resource={} cross_account={} assume_role={} identity_allows={} resource_allows={} explicitly_named={}",
            action,
            resource,
            cross_account_access,
            assume_role,
            identity_allows,
            resource_allows,
            explicitly_named,
        );

        // AssumeRole always requires both halves; so does any cross-account access.
        let allowed = if assume_role || cross_account_access {
            identity_allows && resource_allows
        } else {
            identity_allows || (explicitly_named && resource_allows)
        };

        let details = if allowed {
            if resource_allows && (assume_role || cross_account_access) {
                "Allowed by identity and resource policy".to_string()
            } else {
                "Allowed by identity policy".to_string()
            }
        } else if identity_allows {
            "Implicitly denied by resource policy".to_string()
        } else {
            "Implicitly denied by identity policy".to_string()
        };

        finish(allowed, details)
    }
}

fn has_explicit_allow(evaluations: &[StatementEvaluation]) -> bool {
    evaluations.iter().any(|evaluation| evaluation.explicit_allow)
}

fn has_explicit_deny(evaluations: &[StatementEvaluation]) -> bool {
    evaluations.iter().any(|evaluation| evaluation.explicit_deny)
}

fn bypass_as_allows(evaluations: Vec<StatementEvaluation>) -> Vec<StatementEvaluation> {
    evaluations
        .into_iter()
        .map(|mut evaluation| {
            evaluation.explicit_allow = true;
            evaluation.explicit_deny = false;
            evaluation.implicit_deny = false;
            evaluation
        })
        .collect()
}

/// Accounts compare as different only when both are concrete; wildcards and empty accounts (global resources)
/// count as same-account.
fn is_cross_account(principal_account: &str, resource_account: &str) -> bool {
    if principal_account.is_empty() || resource_account.is_empty() {
        return false;
    }
    if principal_account == "*" || resource_account == "*" {
        return false;
    }

    principal_account != resource_account
}

/// AssumeRole detection is lexical: an sts:AssumeRole* action targeting a role ARN.
fn is_assume_role(action: &str, resource: &str) -> bool {
    action.to_lowercase().starts_with("sts:assumerole") && resource.contains(":role/")
}

/// For SSM document-gated actions, the document and automation-definition patterns (or `*`) the identity policy
/// grants for the requested action.
fn ssm_document_restrictions(action: &str, identity_statements: &[Statement]) -> Vec<String> {
    if !action.eq_ignore_ascii_case("ssm:SendCommand") && !action.eq_ignore_ascii_case("ssm:StartAutomationExecution")
    {
        return vec![];
    }

    let mut patterns = Vec::new();
    for statement in identity_statements {
        if *statement.effect() != Effect::Allow {
            continue;
        }

        let matches_action = statement
            .action()
            .map(|action_list| action_list.iter().any(|pattern| pattern.matches(action)))
            .unwrap_or(false);
        if !matches_action {
            continue;
        }

        if let Some(resource_list) = statement.resource() {
            for resource in resource_list.iter() {
                let pattern = resource.pattern();
                if pattern == "*" || pattern.contains(":document/") || pattern.contains(":automation-definition/") {
                    if !patterns.contains(&pattern.to_string()) {
                        patterns.push(pattern.to_string());
                    }
                }
            }
        }
    }

    patterns
}

#[cfg(test)]
mod tests {
    use {
        super::{is_assume_role, is_cross_account, ssm_document_restrictions, PolicyEvaluator},
        crate::{
            context::RequestContext,
            eval::{EvaluationRequest, PolicyType},
            snapshot::{AccountAuthorizationDetails, Caches, OrgPolicyGraph},
            Statement,
        },
        pretty_assertions::assert_eq,
        std::{collections::HashMap, str::FromStr, sync::Arc},
    };

    fn statements(texts: &[&str]) -> Arc<Vec<Statement>> {
        Arc::new(texts.iter().map(|text| Statement::from_str(text).unwrap()).collect())
    }

    fn empty_caches() -> Caches {
        Caches::build(&AccountAuthorizationDetails::default(), vec![], HashMap::new())
    }

    fn user_context(arn: &str) -> RequestContext {
        let mut context = RequestContext::new();
        context.set_principal_arn(arn);
        context
    }

    #[test_log::test]
    fn test_cross_account_flag() {
        assert!(!is_cross_account("", "123456789012"));
        assert!(!is_cross_account("123456789012", ""));
        assert!(!is_cross_account("*", "123456789012"));
        assert!(!is_cross_account("123456789012", "123456789012"));
        assert!(is_cross_account("123456789012", "999999999999"));

        // Symmetric regardless of lookup order.
        assert_eq!(is_cross_account("111111111111", "222222222222"), is_cross_account("222222222222", "111111111111"));
    }

    #[test_log::test]
    fn test_is_assume_role() {
        assert!(is_assume_role("sts:AssumeRole", "arn:aws:iam::123456789012:role/x"));
        assert!(is_assume_role("sts:assumerolewithsaml", "arn:aws:iam::123456789012:role/x"));
        assert!(!is_assume_role("sts:AssumeRole", "arn:aws:s3:::bucket"));
        assert!(!is_assume_role("s3:GetObject", "arn:aws:iam::123456789012:role/x"));
    }

    #[test_log::test]
    fn test_structural_invalid_action() {
        let caches = empty_caches();
        let org = OrgPolicyGraph::default();
        let evaluator = PolicyEvaluator::new(&caches, &org);

        let request = EvaluationRequest::new(
            "iam:PassRole",
            "arn:aws:iam::123456789012:user/alice",
            user_context("arn:aws:iam::123456789012:user/alice"),
            statements(&[r#"{"Effect": "Allow", "Action": "*", "Resource": "*"}"#]),
            Arc::new(vec![]),
        );
        let result = evaluator.evaluate(&request);
        assert!(!result.allowed);
        assert_eq!(result.evaluation_details, "Action not valid for resource");
    }

    #[test_log::test]
    fn test_identity_allow_and_explicit_deny() {
        let caches = empty_caches();
        let org = OrgPolicyGraph::default();
        let evaluator = PolicyEvaluator::new(&caches, &org);

        let request = EvaluationRequest::new(
            "s3:DeleteObject",
            "arn:aws:s3:::example-bucket/file.txt",
            user_context("arn:aws:iam::111122223333:user/u"),
            statements(&[
                r#"{"Effect": "Allow", "Action": "s3:*", "Resource": "*"}"#,
                r#"{"Effect": "Deny", "Action": "s3:DeleteObject", "Resource": "*"}"#,
            ]),
            Arc::new(vec![]),
        );
        let result = evaluator.evaluate(&request);
        assert!(!result.allowed);
        assert_eq!(result.evaluation_details, "Explicitly denied by identity policy");
        assert!(result.policy_result.of_type(PolicyType::Identity).iter().any(|e| e.explicit_deny));
    }

    #[test_log::test]
    fn test_ssm_document_restrictions() {
        let identity = statements(&[
            r#"{"Effect": "Allow", "Action": "ssm:SendCommand", "Resource": [
                "arn:aws:ssm:us-east-1::document/AWS-RunShellScript",
                "arn:aws:ec2:us-east-1:111122223333:instance/*"
            ]}"#,
            r#"{"Effect": "Allow", "Action": "s3:GetObject", "Resource": "*"}"#,
        ]);

        let restrictions = ssm_document_restrictions("ssm:SendCommand", &identity);
        assert_eq!(restrictions, vec!["arn:aws:ssm:us-east-1::document/AWS-RunShellScript".to_string()]);

        assert!(ssm_document_restrictions("s3:GetObject", &identity).is_empty());
    }
}
