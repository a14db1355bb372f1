//! Create-then-use post-processing: edges the pure evaluator cannot discover because the attacker controls the
//! name of a resource that does not exist yet.

use {
    super::{identity_bundle_for, summary::PermissionsSummary},
    crate::{eval::EvaluationResult, glob::arn_segments_compatible, snapshot::Caches, Effect, Statement},
    log::debug,
};

struct CreateUsePattern {
    create_action: &'static str,
    use_actions: &'static [&'static str],
    service_resource: &'static str,
}

/// Known create-then-use pairs: being able to create the resource and separately to use resources of a
/// compatible ARN shape composes into effective use permission.
const CREATE_USE_PATTERNS: [CreateUsePattern; 5] = [
    CreateUsePattern {
        create_action: "codebuild:CreateProject",
        use_actions: &["codebuild:StartBuild", "codebuild:StartBuildBatch"],
        service_resource: "codebuild.amazonaws.com",
    },
    CreateUsePattern {
        create_action: "lambda:CreateFunction",
        use_actions: &["lambda:InvokeFunction"],
        service_resource: "lambda.amazonaws.com",
    },
    CreateUsePattern {
        create_action: "ecs:RegisterTaskDefinition",
        use_actions: &["ecs:RunTask", "ecs:StartTask"],
        service_resource: "ecs.amazonaws.com",
    },
    CreateUsePattern {
        create_action: "glue:CreateJob",
        use_actions: &["glue:StartJobRun"],
        service_resource: "glue.amazonaws.com",
    },
    CreateUsePattern {
        create_action: "datapipeline:CreatePipeline",
        use_actions: &["datapipeline:PutPipelineDefinition", "datapipeline:ActivatePipeline"],
        service_resource: "datapipeline.amazonaws.com",
    },
];

/// Add synthetic allow edges for each principal that can create a service's resources and separately use
/// resources whose granted ARN patterns are compatible with what it can create.
///
/// The raw identity policies are consulted, not the summary: the use grant may be scoped to ARNs that do not
/// exist yet, which the main run evaluated against nothing.
pub fn apply_create_then_use_edges(caches: &Caches, summary: &PermissionsSummary) {
    for pattern in &CREATE_USE_PATTERNS {
        for principal in summary.principals() {
            let principal_arn = principal.principal_arn();
            if !summary.has_allowed(principal_arn, pattern.service_resource, pattern.create_action) {
                continue;
            }

            let bundle = match identity_bundle_for(caches, principal_arn) {
                Some(bundle) => bundle,
                None => continue,
            };

            let create_patterns = granted_resource_patterns(&bundle, pattern.create_action);
            if create_patterns.is_empty() {
                continue;
            }

            for use_action in pattern.use_actions {
                if principal.has_allowed_action(use_action) {
                    continue;
                }

                for use_pattern in granted_resource_patterns(&bundle, use_action) {
                    let compatible = create_patterns
                        .iter()
                        .any(|create_pattern| arn_segments_compatible(create_pattern, &use_pattern));
                    if !compatible {
                        continue;
                    }

                    debug!("{}: synthetic {} edge via {}", principal_arn, use_action, pattern.create_action);
                    summary.add(
                        principal_arn,
                        &use_pattern,
                        use_action,
                        EvaluationResult {
                            allowed: true,
                            evaluation_details: "Synthetic: create-then-use pattern".to_string(),
                            cross_account_access: false,
                            action: use_action.to_string(),
                            ssm_document_restrictions: vec![],
                            policy_result: Default::default(),
                        },
                    );
                    break;
                }
            }
        }
    }
}

/// The resource patterns Allow statements in the bundle grant for an action.
fn granted_resource_patterns(bundle: &[Statement], action: &str) -> Vec<String> {
    let mut patterns = Vec::new();

    for statement in bundle {
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
                let pattern = resource.pattern().to_string();
                if !patterns.contains(&pattern) {
                    patterns.push(pattern);
                }
            }
        }
    }

    patterns
}
