//! End-to-end decision scenarios driven through the policy evaluator.

use {
    iam_sim::{
        condition::ConditionDecision,
        eval::{EvaluationRequest, PolicyEvaluator, PolicyType},
        snapshot::{AccountAuthorizationDetails, Caches, OrgPolicy, OrgPolicyGraph},
        RequestContext, Statement,
    },
    indoc::indoc,
    pretty_assertions::assert_eq,
    std::{collections::HashMap, str::FromStr, sync::Arc},
};

fn statements(texts: &[&str]) -> Arc<Vec<Statement>> {
    Arc::new(texts.iter().map(|text| Statement::from_str(text).unwrap()).collect())
}

fn no_statements() -> Arc<Vec<Statement>> {
    Arc::new(vec![])
}

fn empty_caches() -> Caches {
    Caches::build(&AccountAuthorizationDetails::default(), vec![], HashMap::new())
}

fn user_context(arn: &str) -> RequestContext {
    let mut context = RequestContext::new();
    context.set_principal_arn(arn);
    context
}

fn org_with_scp(account: &str, content: &str) -> OrgPolicyGraph {
    let policy: OrgPolicy = serde_json::from_str(&format!(
        r#"{{
            "Id": "p-guardrail",
            "Arn": "arn:aws:organizations::111111111111:policy/o-1/service_control_policy/p-guardrail",
            "Name": "guardrail",
            "Type": "SERVICE_CONTROL_POLICY",
            "Content": {},
            "Targets": [{{"TargetId": "{}", "Name": "workload", "Type": "ACCOUNT"}}]
        }}"#,
        content, account
    ))
    .unwrap();
    OrgPolicyGraph::new(vec![policy], HashMap::new())
}

fn org_with_rcp(account: &str, content: &str) -> OrgPolicyGraph {
    let policy: OrgPolicy = serde_json::from_str(&format!(
        r#"{{
            "Id": "p-rcp",
            "Name": "resource-guardrail",
            "Type": "RESOURCE_CONTROL_POLICY",
            "Content": {},
            "Targets": [{{"TargetId": "{}", "Name": "workload", "Type": "ACCOUNT"}}]
        }}"#,
        content, account
    ))
    .unwrap();
    OrgPolicyGraph::new(vec![policy], HashMap::new())
}

#[test_log::test]
fn basic_identity_allow() {
    let caches = empty_caches();
    let org = OrgPolicyGraph::default();
    let evaluator = PolicyEvaluator::new(&caches, &org);

    let request = EvaluationRequest::new(
        "s3:GetObject",
        "arn:aws:s3::111122223333:example-bucket/file.txt",
        user_context("arn:aws:iam::111122223333:user/u"),
        statements(&[
            r#"{"Effect": "Allow", "Action": "s3:GetObject", "Resource": "arn:aws:s3::111122223333:example-bucket/*"}"#,
        ]),
        no_statements(),
    );

    let result = evaluator.evaluate(&request);
    assert!(result.allowed);
    assert!(!result.cross_account_access);
    assert_eq!(result.evaluation_details, "Allowed by identity policy");
    assert_eq!(result.action, "s3:GetObject");

    let identity_evals = result.policy_result.of_type(PolicyType::Identity);
    assert!(identity_evals[0].explicit_allow);
    assert!(identity_evals[0].matched_action);
    assert!(identity_evals[0].matched_resource);
}

#[test_log::test]
fn explicit_deny_overrides_allow() {
    let caches = empty_caches();
    let org = OrgPolicyGraph::default();
    let evaluator = PolicyEvaluator::new(&caches, &org);

    let request = EvaluationRequest::new(
        "s3:DeleteObject",
        "arn:aws:s3::111122223333:example-bucket/file.txt",
        user_context("arn:aws:iam::111122223333:user/u"),
        statements(&[
            r#"{"Effect": "Allow", "Action": "s3:*", "Resource": "*"}"#,
            r#"{"Effect": "Deny", "Action": "s3:DeleteObject", "Resource": "*"}"#,
        ]),
        no_statements(),
    );

    let result = evaluator.evaluate(&request);
    assert!(!result.allowed);
    assert_eq!(result.evaluation_details, "Explicitly denied by identity policy");
}

#[test_log::test]
fn boundary_narrows_identity() {
    let caches = empty_caches();
    let org = OrgPolicyGraph::default();
    let evaluator = PolicyEvaluator::new(&caches, &org);

    let identity = statements(&[
        r#"{"Effect": "Allow", "Action": ["s3:*", "ec2:*"], "Resource": "*"}"#,
    ]);
    let boundary = statements(&[r#"{"Effect": "Allow", "Action": "s3:*", "Resource": "*"}"#]);

    let bounded = EvaluationRequest::new(
        "ec2:RunInstances",
        "ec2.amazonaws.com",
        user_context("arn:aws:iam::111122223333:user/u"),
        identity.clone(),
        boundary,
    );
    let result = evaluator.evaluate(&bounded);
    assert!(!result.allowed);
    assert_eq!(result.evaluation_details, "Denied by permission boundary");

    let unbounded = EvaluationRequest::new(
        "ec2:RunInstances",
        "ec2.amazonaws.com",
        user_context("arn:aws:iam::111122223333:user/u"),
        identity,
        no_statements(),
    );
    let result = evaluator.evaluate(&unbounded);
    assert!(result.allowed);
}

#[test_log::test]
fn scp_region_guardrail() {
    let caches = empty_caches();
    let scp = indoc! { r#"
        {
            "Statement": [
                {"Effect": "Allow", "Action": "*", "Resource": "*"},
                {
                    "Effect": "Deny",
                    "Action": "*",
                    "Resource": "*",
                    "Condition": {
                        "StringNotEquals": {
                            "aws:RequestedRegion": [
                                "us-east-1",
                                "us-east-2",
                                "us-west-1",
                                "us-west-2",
                                "us-gov-east-1",
                                "us-gov-west-1"
                            ]
                        }
                    }
                }
            ]
        }"# };
    let org = org_with_scp("111122223333", scp);
    let evaluator = PolicyEvaluator::new(&caches, &org);
    let identity = statements(&[r#"{"Effect": "Allow", "Action": "*", "Resource": "*"}"#]);

    // A us-east-1 (region-less, hence defaulted) resource passes the guardrail.
    let home_region = EvaluationRequest::new(
        "s3:GetObject",
        "arn:aws:s3::111122223333:b/f.txt",
        user_context("arn:aws:iam::111122223333:user/u"),
        identity.clone(),
        no_statements(),
    );
    let result = evaluator.evaluate(&home_region);
    assert!(result.allowed);

    let foreign_region = EvaluationRequest::new(
        "s3:GetObject",
        "arn:aws:s3:eu-west-1:111122223333:b/f.txt",
        user_context("arn:aws:iam::111122223333:user/u"),
        identity,
        no_statements(),
    );
    let result = evaluator.evaluate(&foreign_region);
    assert!(!result.allowed);
    assert_eq!(result.evaluation_details, "Explicitly denied by SCP");
}

#[test_log::test]
fn rcp_cross_org_deny() {
    let caches = empty_caches();
    let rcp = indoc! { r#"
        {
            "Statement": [
                {"Effect": "Allow", "Action": "*", "Resource": "*"},
                {
                    "Effect": "Deny",
                    "Action": "s3:PutObject",
                    "Resource": "*",
                    "Condition": {
                        "StringNotEquals": {
                            "aws:PrincipalOrgID": "o-1234567"
                        }
                    }
                }
            ]
        }"# };
    let org = org_with_rcp("444455556666", rcp);
    let evaluator = PolicyEvaluator::new(&caches, &org);

    let mut context = user_context("arn:aws:iam::111122223333:user/u");
    context.set_principal_org_id("o-9999999");

    let request = EvaluationRequest::new(
        "s3:PutObject",
        "arn:aws:s3::444455556666:protected-bucket/obj",
        context,
        statements(&[r#"{"Effect": "Allow", "Action": "*", "Resource": "*"}"#]),
        no_statements(),
    );
    let result = evaluator.evaluate(&request);
    assert!(!result.allowed);
    assert_eq!(result.evaluation_details, "Explicitly denied by RCP");
    assert!(result.cross_account_access);
}

fn caches_with_role(trusted_principal: &str) -> Caches {
    let gaad = AccountAuthorizationDetails::from_str(&format!(
        r#"{{
            "UserDetailList": [
                {{"UserName": "u", "Arn": "arn:aws:iam::111122223333:user/u"}}
            ],
            "RoleDetailList": [
                {{
                    "RoleName": "r",
                    "Arn": "arn:aws:iam::111122223333:role/r",
                    "AssumeRolePolicyDocument": {{
                        "Version": "2012-10-17",
                        "Statement": {{
                            "Effect": "Allow",
                            "Principal": {{"AWS": "{}"}},
                            "Action": "sts:AssumeRole"
                        }}
                    }}
                }}
            ]
        }}"#,
        trusted_principal
    ))
    .unwrap();
    Caches::build(&gaad, vec![], HashMap::new())
}

#[test_log::test]
fn same_account_assume_role_requires_both() {
    let org = OrgPolicyGraph::default();
    let identity = statements(&[r#"{"Effect": "Allow", "Action": "sts:AssumeRole", "Resource": "*"}"#]);

    // Trust names the user, identity allows: both halves present.
    let caches = caches_with_role("arn:aws:iam::111122223333:user/u");
    let evaluator = PolicyEvaluator::new(&caches, &org);
    let request = EvaluationRequest::new(
        "sts:AssumeRole",
        "arn:aws:iam::111122223333:role/r",
        user_context("arn:aws:iam::111122223333:user/u"),
        identity.clone(),
        no_statements(),
    );
    let result = evaluator.evaluate(&request);
    assert!(result.allowed);
    assert_eq!(result.evaluation_details, "Allowed by identity and resource policy");

    // Trust names someone else: denied despite the identity allow.
    let caches = caches_with_role("arn:aws:iam::111122223333:user/someone-else");
    let evaluator = PolicyEvaluator::new(&caches, &org);
    let request = EvaluationRequest::new(
        "sts:AssumeRole",
        "arn:aws:iam::111122223333:role/r",
        user_context("arn:aws:iam::111122223333:user/u"),
        identity,
        no_statements(),
    );
    let result = evaluator.evaluate(&request);
    assert!(!result.allowed);

    // Trust names the user but the identity policy is silent: denied.
    let caches = caches_with_role("arn:aws:iam::111122223333:user/u");
    let evaluator = PolicyEvaluator::new(&caches, &org);
    let request = EvaluationRequest::new(
        "sts:AssumeRole",
        "arn:aws:iam::111122223333:role/r",
        user_context("arn:aws:iam::111122223333:user/u"),
        no_statements(),
        no_statements(),
    );
    let result = evaluator.evaluate(&request);
    assert!(!result.allowed);
}

#[test_log::test]
fn service_linked_role_bypasses_scp() {
    let caches = empty_caches();
    let scp = r#"{"Statement": {"Effect": "Deny", "Action": "bedrock:*", "Resource": "*"}}"#;
    let org = org_with_scp("111122223333", scp);
    let evaluator = PolicyEvaluator::new(&caches, &org);
    let identity = statements(&[r#"{"Effect": "Allow", "Action": "bedrock:*", "Resource": "*"}"#]);

    let service_linked = EvaluationRequest::new(
        "bedrock:InvokeModel",
        "arn:aws:bedrock:us-east-1:111122223333:model/claude",
        user_context(
            "arn:aws:iam::111122223333:role/aws-service-role/bedrock.amazonaws.com/AWSServiceRoleForBedrock",
        ),
        identity.clone(),
        no_statements(),
    );
    let result = evaluator.evaluate(&service_linked);
    assert!(result.allowed);

    let ordinary_role = EvaluationRequest::new(
        "bedrock:InvokeModel",
        "arn:aws:bedrock:us-east-1:111122223333:model/claude",
        user_context("arn:aws:iam::111122223333:role/ordinary"),
        identity,
        no_statements(),
    );
    let result = evaluator.evaluate(&ordinary_role);
    assert!(!result.allowed);
    assert_eq!(result.evaluation_details, "Explicitly denied by SCP");
}

#[test_log::test]
fn missing_critical_key_is_inconclusive() {
    let caches = empty_caches();
    let org = OrgPolicyGraph::default();
    let evaluator = PolicyEvaluator::new(&caches, &org);

    let conditional = r#"{
        "Effect": "Allow",
        "Action": "s3:GetObject",
        "Resource": "*",
        "Condition": {"StringEquals": {"aws:SourceArn": "arn:aws:sns:us-east-1:111122223333:topic"}}
    }"#;

    // The conditional allow alone cannot grant: the condition is unprovable, not failed.
    let request = EvaluationRequest::new(
        "s3:GetObject",
        "arn:aws:s3::111122223333:b/f.txt",
        user_context("arn:aws:iam::111122223333:user/u"),
        statements(&[conditional]),
        no_statements(),
    );
    let result = evaluator.evaluate(&request);
    assert!(!result.allowed);

    let identity_evals = result.policy_result.of_type(PolicyType::Identity);
    let condition = identity_evals[0].condition.as_ref().unwrap();
    assert_eq!(condition.result, ConditionDecision::Inconclusive);
    assert!(!identity_evals[0].explicit_allow);
    assert!(!identity_evals[0].explicit_deny);

    // The decision falls through to other policies: an unconditional allow elsewhere wins.
    let request = EvaluationRequest::new(
        "s3:GetObject",
        "arn:aws:s3::111122223333:b/f.txt",
        user_context("arn:aws:iam::111122223333:user/u"),
        statements(&[conditional, r#"{"Effect": "Allow", "Action": "s3:GetObject", "Resource": "*"}"#]),
        no_statements(),
    );
    let result = evaluator.evaluate(&request);
    assert!(result.allowed);
}
