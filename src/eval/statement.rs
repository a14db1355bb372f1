//! Evaluation of a single policy statement against one request.

use {
    crate::{
        condition::ConditionEval,
        context::{PrincipalType, RequestContext},
        glob::{account_id_from_arn, glob_matches},
        Principal, SpecifiedPrincipal, Statement,
    },
    serde::{Deserialize, Serialize},
};

/// The outcome of evaluating one statement, with the diagnostic flags downstream tooling depends on.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct StatementEvaluation {
    #[serde(rename = "ExplicitAllow")]
    pub explicit_allow: bool,

    #[serde(rename = "ExplicitDeny")]
    pub explicit_deny: bool,

    #[serde(rename = "ImplicitDeny")]
    pub implicit_deny: bool,

    #[serde(rename = "MatchedAction")]
    pub matched_action: bool,

    #[serde(rename = "MatchedResource")]
    pub matched_resource: bool,

    #[serde(rename = "MatchedPrincipal")]
    pub matched_principal: bool,

    #[serde(rename = "Condition", skip_serializing_if = "Option::is_none")]
    pub condition: Option<ConditionEval>,

    #[serde(rename = "OriginArn", skip_serializing_if = "Option::is_none")]
    pub origin_arn: Option<String>,
}

impl StatementEvaluation {
    fn implicit_deny(origin_arn: Option<String>) -> Self {
        Self {
            implicit_deny: true,
            origin_arn,
            ..Self::default()
        }
    }
}

/// Evaluate one statement. The order is fixed: principal, action, resource, condition, then effect.
pub fn evaluate_statement(
    statement: &Statement,
    action: &str,
    resource: &str,
    context: &RequestContext,
) -> StatementEvaluation {
    let origin_arn = statement.origin_arn().map(|arn| arn.to_string());
    let mut evaluation = StatementEvaluation::implicit_deny(origin_arn);

    if let Some(principal) = statement.principal() {
        if !principal_matches(principal, context) {
            return evaluation;
        }
        evaluation.matched_principal = true;
    } else if let Some(not_principal) = statement.not_principal() {
        if principal_matches(not_principal, context) {
            return evaluation;
        }
        evaluation.matched_principal = true;
    }

    let action_matched = if let Some(action_list) = statement.action() {
        action_list.iter().any(|pattern| pattern.matches(action))
    } else if let Some(not_action_list) = statement.not_action() {
        !not_action_list.iter().any(|pattern| pattern.matches(action))
    } else {
        // Neither Action nor NotAction: the statement never matches.
        return evaluation;
    };

    if !action_matched {
        return evaluation;
    }
    evaluation.matched_action = true;

    let resource_matched = if let Some(resource_list) = statement.resource() {
        resource_list.iter().any(|pattern| pattern.matches(resource))
    } else if let Some(not_resource_list) = statement.not_resource() {
        !not_resource_list.iter().any(|pattern| pattern.matches(resource))
    } else {
        return evaluation;
    };

    if !resource_matched {
        return evaluation;
    }
    evaluation.matched_resource = true;

    if let Some(condition) = statement.condition() {
        let condition_eval = condition.evaluate(context);
        let inconclusive = condition_eval.result == crate::condition::ConditionDecision::Inconclusive;
        let passed = condition_eval.passed();
        evaluation.condition = Some(condition_eval);
        if !passed {
            return evaluation;
        }

        // An unprovable condition leans toward deny: it cannot grant, but a Deny statement still applies.
        if inconclusive && *statement.effect() == crate::Effect::Allow {
            return evaluation;
        }
    }

    match statement.effect() {
        crate::Effect::Allow => evaluation.explicit_allow = true,
        crate::Effect::Deny => evaluation.explicit_deny = true,
    }
    evaluation.implicit_deny = false;

    evaluation
}

/// Evaluate a list of statements in order, returning every statement's evaluation.
pub fn evaluate_statements(
    statements: &[Statement],
    action: &str,
    resource: &str,
    context: &RequestContext,
) -> Vec<StatementEvaluation> {
    statements.iter().map(|statement| evaluate_statement(statement, action, resource, context)).collect()
}

/// Indicates whether the requesting principal matches a principal element.
pub fn principal_matches(principal: &Principal, context: &RequestContext) -> bool {
    match principal {
        Principal::Any => true,
        Principal::Specified(specified) => specified_principal_matches(specified, context),
    }
}

fn specified_principal_matches(specified: &SpecifiedPrincipal, context: &RequestContext) -> bool {
    let principal_arn = context.principal_arn();

    if let Some(aws) = specified.aws() {
        if aws.iter().any(|entry| aws_principal_entry_matches(entry, principal_arn)) {
            return true;
        }
    }

    if let Some(services) = specified.service() {
        if context.principal_type() == PrincipalType::Service
            && services.iter().any(|entry| glob_matches(entry, principal_arn))
        {
            return true;
        }
    }

    if let Some(federated) = specified.federated() {
        if federated.iter().any(|entry| glob_matches(entry, principal_arn)) {
            return true;
        }
    }

    if let Some(canonical_users) = specified.canonical_user() {
        if canonical_users.iter().any(|entry| glob_matches(entry, principal_arn)) {
            return true;
        }
    }

    false
}

/// Match one Principal.AWS entry against a principal ARN.
///
/// An entry ending in `:root` (or a bare 12-digit account ID) is that account's wildcard: it matches every
/// principal whose ARN carries that account, including `sts:` session ARNs a literal glob would miss.
pub(crate) fn aws_principal_entry_matches(entry: &str, principal_arn: &str) -> bool {
    if entry == "*" {
        return true;
    }

    let entry_account = if entry.len() == 12 && entry.bytes().all(|b| b.is_ascii_digit()) {
        Some(entry)
    } else if entry.ends_with(":root") {
        account_id_from_arn(entry)
    } else {
        None
    };

    if let Some(account) = entry_account {
        if account_id_from_arn(principal_arn) == Some(account) {
            return true;
        }
        return glob_matches(&entry.replace(":root", "*"), principal_arn);
    }

    glob_matches(entry, principal_arn)
}

/// Indicates whether a principal element explicitly names the requesting principal: an exact AWS match, the
/// `:root` account expansion, a same-account `*`, or a service-principal match.
pub(crate) fn principal_explicitly_named(principal: &Principal, context: &RequestContext) -> bool {
    let principal_arn = context.principal_arn();
    let principal_account = context.principal_account();

    match principal {
        Principal::Any => !principal_account.is_empty() && principal_account == context.resource_account(),
        Principal::Specified(specified) => {
            if let Some(aws) = specified.aws() {
                for entry in aws.iter() {
                    if entry.eq_ignore_ascii_case(principal_arn) {
                        return true;
                    }

                    if entry == "*" && !principal_account.is_empty() && principal_account == context.resource_account()
                    {
                        return true;
                    }

                    let is_account = entry.len() == 12 && entry.bytes().all(|b| b.is_ascii_digit());
                    let account = if is_account {
                        Some(entry.as_str())
                    } else if entry.ends_with(":root") {
                        account_id_from_arn(entry)
                    } else {
                        None
                    };
                    if let Some(account) = account {
                        if account == principal_account {
                            return true;
                        }
                    }
                }
            }

            if let Some(services) = specified.service() {
                if context.principal_type() == PrincipalType::Service
                    && services.iter().any(|entry| entry.eq_ignore_ascii_case(principal_arn))
                {
                    return true;
                }
            }

            false
        }
    }
}

#[cfg(test)]
mod tests {
    use {
        super::{aws_principal_entry_matches, evaluate_statement},
        crate::{context::RequestContext, Statement},
        pretty_assertions::assert_eq,
        std::str::FromStr,
    };

    fn user_context() -> RequestContext {
        let mut context = RequestContext::new();
        context.set_principal_arn("arn:aws:iam::111122223333:user/u");
        context.populate_defaults("arn:aws:s3:::example-bucket/file.txt");
        context
    }

    #[test_log::test]
    fn test_allow_statement() {
        let statement = Statement::from_str(
            r#"{"Effect": "Allow", "Action": "s3:GetObject", "Resource": "arn:aws:s3:::example-bucket/*"}"#,
        )
        .unwrap();

        let evaluation = evaluate_statement(
            &statement,
            "s3:GetObject",
            "arn:aws:s3:::example-bucket/file.txt",
            &user_context(),
        );
        assert!(evaluation.explicit_allow);
        assert!(!evaluation.explicit_deny);
        assert!(!evaluation.implicit_deny);
        assert!(evaluation.matched_action);
        assert!(evaluation.matched_resource);
        assert!(!evaluation.matched_principal);
    }

    #[test_log::test]
    fn test_action_mismatch() {
        let statement = Statement::from_str(r#"{"Effect": "Allow", "Action": "s3:PutObject", "Resource": "*"}"#)
            .unwrap();
        let evaluation =
            evaluate_statement(&statement, "s3:GetObject", "arn:aws:s3:::example-bucket/f", &user_context());
        assert!(evaluation.implicit_deny);
        assert!(!evaluation.matched_action);
    }

    #[test_log::test]
    fn test_not_action_inverts() {
        let statement = Statement::from_str(r#"{"Effect": "Deny", "NotAction": "s3:Get*", "Resource": "*"}"#)
            .unwrap();

        let evaluation =
            evaluate_statement(&statement, "s3:DeleteObject", "arn:aws:s3:::example-bucket", &user_context());
        assert!(evaluation.explicit_deny);

        let evaluation =
            evaluate_statement(&statement, "s3:GetObject", "arn:aws:s3:::example-bucket", &user_context());
        assert!(evaluation.implicit_deny);
    }

    #[test_log::test]
    fn test_missing_action_and_resource_never_match() {
        let statement = Statement::from_str(r#"{"Effect": "Allow"}"#).unwrap();
        let evaluation = evaluate_statement(&statement, "s3:GetObject", "*", &user_context());
        assert!(evaluation.implicit_deny);

        let statement = Statement::from_str(r#"{"Effect": "Allow", "Action": "*"}"#).unwrap();
        let evaluation = evaluate_statement(&statement, "s3:GetObject", "*", &user_context());
        assert!(evaluation.implicit_deny);
        assert!(evaluation.matched_action);
        assert!(!evaluation.matched_resource);
    }

    #[test_log::test]
    fn test_principal_gate() {
        let statement = Statement::from_str(
            r#"{
                "Effect": "Allow",
                "Principal": {"AWS": "arn:aws:iam::111122223333:user/u"},
                "Action": "sts:AssumeRole",
                "Resource": "*"
            }"#,
        )
        .unwrap();

        let mut context = RequestContext::new();
        context.set_principal_arn("arn:aws:iam::111122223333:user/u");
        context.populate_defaults("arn:aws:iam::111122223333:role/target");
        let evaluation = evaluate_statement(
            &statement,
            "sts:AssumeRole",
            "arn:aws:iam::111122223333:role/target",
            &context,
        );
        assert!(evaluation.explicit_allow);
        assert!(evaluation.matched_principal);

        let mut other = RequestContext::new();
        other.set_principal_arn("arn:aws:iam::111122223333:user/someone-else");
        other.populate_defaults("arn:aws:iam::111122223333:role/target");
        let evaluation =
            evaluate_statement(&statement, "sts:AssumeRole", "arn:aws:iam::111122223333:role/target", &other);
        assert!(evaluation.implicit_deny);
        assert!(!evaluation.matched_principal);
    }

    #[test_log::test]
    fn test_condition_failure_is_implicit_deny() {
        let statement = Statement::from_str(
            r#"{
                "Effect": "Allow",
                "Action": "*",
                "Resource": "*",
                "Condition": {"StringEquals": {"aws:RequestedRegion": "us-east-1"}}
            }"#,
        )
        .unwrap();

        let mut context = user_context();
        context.set_requested_region("eu-west-1");
        let evaluation = evaluate_statement(&statement, "s3:GetObject", "arn:aws:s3:::b/f", &context);
        assert!(evaluation.implicit_deny);
        assert!(evaluation.matched_action);
        assert!(evaluation.matched_resource);
        assert!(!evaluation.condition.as_ref().unwrap().passed());
    }

    #[test_log::test]
    fn test_aws_principal_entry_matches() {
        let session = "arn:aws:sts::111122223333:assumed-role/deploy/ci";
        assert!(aws_principal_entry_matches("*", session));
        assert!(aws_principal_entry_matches("111122223333", session));
        assert!(aws_principal_entry_matches("arn:aws:iam::111122223333:root", session));
        assert!(!aws_principal_entry_matches("arn:aws:iam::999999999999:root", session));
        assert!(aws_principal_entry_matches(
            "arn:aws:iam::111122223333:user/u",
            "arn:aws:iam::111122223333:user/u"
        ));
        assert!(aws_principal_entry_matches("arn:aws:iam::111122223333:user/*", "arn:aws:iam::111122223333:user/u"));
        assert!(!aws_principal_entry_matches(
            "arn:aws:iam::111122223333:user/u",
            "arn:aws:iam::111122223333:user/other"
        ));
    }

    #[test_log::test]
    fn test_origin_arn_carried() {
        let statement = Statement::from_str(r#"{"Effect": "Allow", "Action": "*", "Resource": "*"}"#)
            .unwrap()
            .with_origin_arn("arn:aws:iam::111122223333:policy/Admin");
        let evaluation = evaluate_statement(&statement, "s3:GetObject", "*", &user_context());
        assert_eq!(evaluation.origin_arn.as_deref(), Some("arn:aws:iam::111122223333:policy/Admin"));
    }
}
