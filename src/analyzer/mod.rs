//! The analyzer driver: expands each principal's privilege-escalation surface into evaluation requests and fans
//! them out to a worker pool.

mod privesc;
mod report;
mod summary;
mod synthetic;

pub use {
    privesc::{is_priv_esc_action, PRIV_ESC_ACTIONS},
    report::{
        compact_results, full_results, permission_map, CompactPrincipalResult, FullResultRecord, PermissionMapReport,
        PrincipalRecord,
    },
    summary::{ActionEvaluation, PermissionsSummary, PrincipalPermissions, ResourcePermission},
    synthetic::apply_create_then_use_edges,
};

use {
    crate::{
        catalog::{resource_patterns_for_action, ActionCatalog},
        context::{principal_type_of, PrincipalType, RequestContext},
        eval::{EvaluationRequest, PolicyEvaluator},
        glob::account_id_from_arn,
        snapshot::{Caches, GroupDetail, OrgPolicyGraph, RoleDetail, Tag, UserDetail},
        Action, Effect, Resource, Statement,
    },
    crossbeam_channel::{bounded, Sender},
    log::{debug, error},
    std::{
        collections::{BTreeSet, HashMap},
        sync::Arc,
        thread,
    },
};

/// Queue depth for in-flight evaluation requests; producers block when workers fall this far behind.
const REQUEST_QUEUE_DEPTH: usize = 1024;

/// ARN standing in for principals outside the snapshot (external accounts, `*` trust).
const EXTERNAL_PRINCIPAL_ORIGIN: &str = "external-principal";

/// Enumerates the effective permissions of every principal on every resource in the snapshot.
pub struct Analyzer<'a> {
    caches: &'a Caches,
    org: &'a OrgPolicyGraph,
    catalog: &'a ActionCatalog,
}

impl<'a> Analyzer<'a> {
    pub fn new(caches: &'a Caches, org: &'a OrgPolicyGraph, catalog: &'a ActionCatalog) -> Self {
        Self {
            caches,
            org,
            catalog,
        }
    }

    /// Run the full analysis: fan {principal, action, resource} candidates through the policy evaluator on a
    /// worker pool, then apply the create-then-use post-processing pass.
    pub fn analyze(&self) -> PermissionsSummary {
        let summary = PermissionsSummary::new();
        let worker_count = 3 * num_cpus::get();
        let (sender, receiver) = bounded::<EvaluationRequest>(REQUEST_QUEUE_DEPTH);
        let evaluator = PolicyEvaluator::new(self.caches, self.org);

        thread::scope(|scope| {
            let summary_ref = &summary;
            let evaluator_ref = &evaluator;

            for _ in 0..worker_count {
                let receiver = receiver.clone();
                scope.spawn(move || {
                    for request in receiver.iter() {
                        let result = evaluator_ref.evaluate(&request);
                        summary_ref.add(
                            request.context.principal_arn(),
                            &request.resource,
                            &request.action,
                            result,
                        );
                    }
                });
            }
            drop(receiver);

            self.produce_user_requests(&sender);
            self.produce_role_requests(&sender);
            self.produce_service_principal_requests(&sender);
            self.produce_trust_policy_requests(&sender);
            drop(sender);
        });

        apply_create_then_use_edges(self.caches, &summary);
        summary
    }

    fn produce_user_requests(&self, sender: &Sender<EvaluationRequest>) {
        for user in self.caches.users() {
            let (identity, boundary) = user_identity_bundle(self.caches, user);
            self.produce_for_principal(sender, &user.arn, tag_map(&user.tags), Arc::new(identity), Arc::new(boundary));
        }
    }

    fn produce_role_requests(&self, sender: &Sender<EvaluationRequest>) {
        for role in self.caches.roles() {
            let (identity, boundary) = role_identity_bundle(self.caches, role);
            self.produce_for_principal(sender, &role.arn, tag_map(&role.tags), Arc::new(identity), Arc::new(boundary));
        }
    }

    /// Pair every privilege-escalation action in the bundle with the resources it can target and emit one
    /// request per pair.
    fn produce_for_principal(
        &self,
        sender: &Sender<EvaluationRequest>,
        principal_arn: &str,
        principal_tags: HashMap<String, String>,
        identity: Arc<Vec<Statement>>,
        boundary: Arc<Vec<Statement>>,
    ) {
        let actions = self.privesc_actions_in(&identity);
        if actions.is_empty() {
            return;
        }
        debug!("{}: {} privilege-escalation actions in bundle", principal_arn, actions.len());

        for action in actions {
            let patterns = resource_patterns_for_action(&action);
            if patterns.is_empty() {
                continue;
            }

            for resource in self.caches.resources() {
                if !patterns.iter().any(|regex| regex.is_match(&resource.arn)) {
                    continue;
                }

                let mut context = RequestContext::new();
                context.set_principal_arn(principal_arn);
                context.set_principal_tags(principal_tags.clone());
                context.set_resource_tags(resource.tags.clone());

                let boundary_for_request = self.augment_boundary_for_assume_role(&action, &resource.arn, &boundary);

                let request = EvaluationRequest::new(
                    action.clone(),
                    resource.arn.clone(),
                    context,
                    identity.clone(),
                    boundary_for_request,
                );
                if let Err(e) = sender.send(request) {
                    error!("{}: failed to enqueue {} on {}: {}", principal_arn, action, resource.arn, e);
                    return;
                }
            }
        }
    }

    /// For sts:AssumeRole against a cached role, the target's trust policy also caps the request. The boundary
    /// list is deep-copied per request; the cached role record is never aliased or mutated.
    fn augment_boundary_for_assume_role(
        &self,
        action: &str,
        resource_arn: &str,
        boundary: &Arc<Vec<Statement>>,
    ) -> Arc<Vec<Statement>> {
        if !action.to_lowercase().starts_with("sts:assumerole") {
            return boundary.clone();
        }

        let trust_policy = match self.caches.role(resource_arn).and_then(|role| role.assume_role_policy_document.as_ref())
        {
            Some(trust_policy) => trust_policy,
            None => return boundary.clone(),
        };

        let mut augmented: Vec<Statement> = boundary.iter().cloned().collect();
        for statement in trust_policy.statement().iter() {
            augmented.push(statement.with_origin_arn(resource_arn).with_default_resource(resource_arn));
        }

        Arc::new(augmented)
    }

    /// The privilege-escalation actions granted anywhere in the bundle, expanded against the catalog.
    fn privesc_actions_in(&self, statements: &[Statement]) -> BTreeSet<String> {
        let mut actions = BTreeSet::new();

        for statement in statements {
            if *statement.effect() != Effect::Allow {
                continue;
            }

            if let Some(action_list) = statement.action() {
                for pattern in action_list.iter() {
                    for expanded in self.catalog.expand(&pattern.pattern()).iter() {
                        if is_priv_esc_action(expanded) {
                            actions.insert(expanded.clone());
                        }
                    }
                }
            }
        }

        actions
    }

    /// One request per service principal granted a privilege-escalation action by a resource policy.
    fn produce_service_principal_requests(&self, sender: &Sender<EvaluationRequest>) {
        for (resource_arn, policy) in self.caches.resource_policies() {
            for statement in policy.statement().iter() {
                if *statement.effect() != Effect::Allow {
                    continue;
                }

                let services = match statement.principal().and_then(|p| p.specified()).and_then(|sp| sp.service()) {
                    Some(services) => services,
                    None => continue,
                };

                let actions = self.privesc_actions_in(std::slice::from_ref(statement));
                if actions.is_empty() {
                    continue;
                }

                for service in services.iter() {
                    for action in &actions {
                        let mut context = RequestContext::new();
                        context.set_principal_arn(service);
                        context.set_principal_type(PrincipalType::Service);

                        let request = EvaluationRequest::new(
                            action.clone(),
                            resource_arn.clone(),
                            context,
                            Arc::new(vec![]),
                            Arc::new(vec![]),
                        );
                        if let Err(e) = sender.send(request) {
                            error!("{}: failed to enqueue service principal request: {}", resource_arn, e);
                            return;
                        }
                    }
                }
            }
        }
    }

    /// One sts:AssumeRole request per principal named in each role's trust policy. Principals covered by the
    /// per-user/per-role producers are skipped; principals outside the snapshot get a synthetic identity allow
    /// when nothing same-account would be bypassed by it.
    fn produce_trust_policy_requests(&self, sender: &Sender<EvaluationRequest>) {
        for role in self.caches.roles() {
            let trust_policy = match &role.assume_role_policy_document {
                Some(trust_policy) => trust_policy,
                None => continue,
            };
            let role_account = account_id_from_arn(&role.arn).unwrap_or_default().to_string();

            for statement in trust_policy.statement().iter() {
                if *statement.effect() != Effect::Allow {
                    continue;
                }

                for (identifier, federated) in named_principals(statement) {
                    if self.caches.user(&identifier).is_some() || self.caches.role(&identifier).is_some() {
                        continue;
                    }

                    let identifier_account = account_id_from_arn(&identifier);
                    let external = identifier_account.map(|account| account != role_account).unwrap_or(true);

                    let identity: Arc<Vec<Statement>> = if external {
                        Arc::new(vec![external_assume_role_statement(&role.arn)])
                    } else {
                        Arc::new(vec![])
                    };

                    let mut context = RequestContext::new();
                    context.set_principal_arn(identifier.as_str());
                    context.set_principal_type(principal_type_of(&identifier));
                    if federated {
                        context.set_federated_provider(identifier.as_str());
                    }

                    let request = EvaluationRequest::new(
                        "sts:AssumeRole",
                        role.arn.clone(),
                        context,
                        identity,
                        Arc::new(vec![]),
                    );
                    if let Err(e) = sender.send(request) {
                        error!("{}: failed to enqueue trust policy request: {}", role.arn, e);
                        return;
                    }
                }
            }
        }
    }
}

/// The (identifier, is-federated) pairs a trust statement names. Bare account IDs become root ARNs; a `*`
/// principal becomes the attacker stand-in.
fn named_principals(statement: &Statement) -> Vec<(String, bool)> {
    let mut identifiers = Vec::new();

    let principal = match statement.principal() {
        Some(principal) => principal,
        None => return identifiers,
    };

    match principal {
        crate::Principal::Any => {
            identifiers.push(("arn:aws:iam::999999999999:user/attacker".to_string(), false));
        }
        crate::Principal::Specified(specified) => {
            if let Some(aws) = specified.aws() {
                for entry in aws.iter() {
                    if entry.len() == 12 && entry.bytes().all(|b| b.is_ascii_digit()) {
                        identifiers.push((format!("arn:aws:iam::{}:root", entry), false));
                    } else if entry == "*" {
                        identifiers.push(("arn:aws:iam::999999999999:user/attacker".to_string(), false));
                    } else {
                        identifiers.push((entry.clone(), false));
                    }
                }
            }
            if let Some(services) = specified.service() {
                for entry in services.iter() {
                    identifiers.push((entry.clone(), false));
                }
            }
            if let Some(federated) = specified.federated() {
                for entry in federated.iter() {
                    identifiers.push((entry.clone(), true));
                }
            }
        }
    }

    identifiers
}

/// An external principal controls its own identity policy, so it is modeled as allowing the assume call.
fn external_assume_role_statement(role_arn: &str) -> Statement {
    Statement::builder()
        .effect(Effect::Allow)
        .action(Action::new("sts", "AssumeRole").expect("static action is valid"))
        .resource(Resource::Pattern(role_arn.to_string()))
        .origin_arn(EXTERNAL_PRINCIPAL_ORIGIN)
        .build()
        .expect("static statement is valid")
}

fn tag_map(tags: &[Tag]) -> HashMap<String, String> {
    tags.iter().map(|tag| (tag.key.clone(), tag.value.clone())).collect()
}

/// Gather a user's identity statements (inline + attached + all group policies) and boundary statements, each
/// annotated with its origin ARN.
pub(crate) fn user_identity_bundle(caches: &Caches, user: &UserDetail) -> (Vec<Statement>, Vec<Statement>) {
    let mut identity = Vec::new();

    for inline in &user.user_policy_list {
        for statement in inline.policy_document.statement().iter() {
            identity.push(statement.with_origin_arn(&user.arn));
        }
    }

    attach_managed(caches, &mut identity, &user.attached_managed_policies);

    for group_name in &user.group_list {
        match caches.group_by_name(group_name) {
            Some(group) => append_group_statements(caches, &mut identity, group),
            None => debug!("{}: group {} not in snapshot", user.arn, group_name),
        }
    }

    let boundary = boundary_statements(caches, user.permissions_boundary.as_ref().map(|b| b.permissions_boundary_arn.as_str()));
    (identity, boundary)
}

/// Same shape as the user bundle, without groups.
pub(crate) fn role_identity_bundle(caches: &Caches, role: &RoleDetail) -> (Vec<Statement>, Vec<Statement>) {
    let mut identity = Vec::new();

    for inline in &role.role_policy_list {
        for statement in inline.policy_document.statement().iter() {
            identity.push(statement.with_origin_arn(&role.arn));
        }
    }

    attach_managed(caches, &mut identity, &role.attached_managed_policies);

    let boundary = boundary_statements(caches, role.permissions_boundary.as_ref().map(|b| b.permissions_boundary_arn.as_str()));
    (identity, boundary)
}

/// The identity bundle for any principal ARN in the snapshot.
pub(crate) fn identity_bundle_for(caches: &Caches, principal_arn: &str) -> Option<Vec<Statement>> {
    if let Some(user) = caches.user(principal_arn) {
        return Some(user_identity_bundle(caches, user).0);
    }
    if let Some(role) = caches.role(principal_arn) {
        return Some(role_identity_bundle(caches, role).0);
    }

    None
}

fn append_group_statements(caches: &Caches, identity: &mut Vec<Statement>, group: &GroupDetail) {
    for inline in &group.group_policy_list {
        for statement in inline.policy_document.statement().iter() {
            identity.push(statement.with_origin_arn(&group.arn));
        }
    }

    attach_managed(caches, identity, &group.attached_managed_policies);
}

fn attach_managed(
    caches: &Caches,
    identity: &mut Vec<Statement>,
    attached: &[crate::snapshot::AttachedPolicy],
) {
    for policy in attached {
        match caches.managed_policy_document(&policy.policy_arn) {
            Some(document) => {
                for statement in document.statement().iter() {
                    identity.push(statement.with_origin_arn(&policy.policy_arn));
                }
            }
            None => debug!("attached policy {} not in snapshot", policy.policy_arn),
        }
    }
}

fn boundary_statements(caches: &Caches, boundary_arn: Option<&str>) -> Vec<Statement> {
    let mut statements = Vec::new();
    if let Some(boundary_arn) = boundary_arn {
        match caches.managed_policy_document(boundary_arn) {
            Some(document) => {
                for statement in document.statement().iter() {
                    statements.push(statement.with_origin_arn(boundary_arn));
                }
            }
            None => debug!("boundary policy {} not in snapshot", boundary_arn),
        }
    }

    statements
}
