//! The thread-safe accumulator of evaluation results.

use {
    crate::{eval::EvaluationResult, glob::account_id_from_arn},
    dashmap::DashMap,
    parking_lot::RwLock,
    serde::{Deserialize, Serialize},
    std::{collections::BTreeMap, sync::Arc},
};

/// One evaluated action on a resource.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ActionEvaluation {
    #[serde(rename = "Name")]
    pub name: String,

    #[serde(rename = "EvaluationResult")]
    pub evaluation: EvaluationResult,
}

/// The allowed and denied action lists for one (principal, resource) pair, guarded by a per-resource lock.
#[derive(Debug, Default)]
pub struct ResourcePermission {
    allowed: RwLock<Vec<ActionEvaluation>>,
    denied: RwLock<Vec<ActionEvaluation>>,
}

impl ResourcePermission {
    fn add(&self, name: &str, evaluation: EvaluationResult) {
        let entry = ActionEvaluation {
            name: name.to_string(),
            evaluation,
        };

        if entry.evaluation.allowed {
            self.allowed.write().push(entry);
        } else {
            self.denied.write().push(entry);
        }
    }

    pub fn allowed_actions(&self) -> Vec<ActionEvaluation> {
        self.allowed.read().clone()
    }

    pub fn denied_actions(&self) -> Vec<ActionEvaluation> {
        self.denied.read().clone()
    }

    /// Sorted names of allowed actions.
    pub fn allowed_action_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.allowed.read().iter().map(|entry| entry.name.clone()).collect();
        names.sort();
        names.dedup();
        names
    }

    fn has_allowed(&self, action: &str) -> bool {
        self.allowed.read().iter().any(|entry| entry.name.eq_ignore_ascii_case(action))
    }
}

/// Everything recorded for one principal.
#[derive(Debug)]
pub struct PrincipalPermissions {
    principal_arn: String,
    account_id: String,
    resources: DashMap<String, Arc<ResourcePermission>>,
}

impl PrincipalPermissions {
    fn new(principal_arn: &str) -> Self {
        Self {
            principal_arn: principal_arn.to_string(),
            account_id: account_id_from_arn(principal_arn).unwrap_or_default().to_string(),
            resources: DashMap::new(),
        }
    }

    #[inline]
    pub fn principal_arn(&self) -> &str {
        &self.principal_arn
    }

    #[inline]
    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    /// Resource ARNs recorded for this principal, sorted.
    pub fn resource_arns(&self) -> Vec<String> {
        let mut arns: Vec<String> = self.resources.iter().map(|entry| entry.key().clone()).collect();
        arns.sort();
        arns
    }

    pub fn resource(&self, resource_arn: &str) -> Option<Arc<ResourcePermission>> {
        self.resources.get(resource_arn).map(|entry| entry.value().clone())
    }

    fn resource_or_insert(&self, resource_arn: &str) -> Arc<ResourcePermission> {
        self.resources.entry(resource_arn.to_string()).or_default().clone()
    }

    /// Indicates whether the principal has the action allowed on any recorded resource.
    pub fn has_allowed_action(&self, action: &str) -> bool {
        self.resources.iter().any(|entry| entry.value().has_allowed(action))
    }
}

/// The thread-safe map of every principal's evaluated permissions.
///
/// Both map levels use lock-free load-or-store; only the per-resource action lists take a lock, so concurrent
/// workers recording different resources never contend.
#[derive(Debug, Default)]
pub struct PermissionsSummary {
    principals: DashMap<String, Arc<PrincipalPermissions>>,
}

impl PermissionsSummary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one evaluation. Nested containers are created on first touch.
    pub fn add(&self, principal_arn: &str, resource_arn: &str, action: &str, evaluation: EvaluationResult) {
        let principal = self
            .principals
            .entry(principal_arn.to_string())
            .or_insert_with(|| Arc::new(PrincipalPermissions::new(principal_arn)))
            .clone();

        principal.resource_or_insert(resource_arn).add(action, evaluation);
    }

    /// Indicates whether an allowed edge is already recorded.
    pub fn has_allowed(&self, principal_arn: &str, resource_arn: &str, action: &str) -> bool {
        self.principals
            .get(principal_arn)
            .and_then(|principal| principal.resource(resource_arn))
            .map(|resource| resource.has_allowed(action))
            .unwrap_or(false)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.principals.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.principals.len()
    }

    pub fn principal(&self, principal_arn: &str) -> Option<Arc<PrincipalPermissions>> {
        self.principals.get(principal_arn).map(|entry| entry.value().clone())
    }

    /// All principals, sorted by ARN.
    pub fn principals(&self) -> Vec<Arc<PrincipalPermissions>> {
        let mut principals: Vec<Arc<PrincipalPermissions>> =
            self.principals.iter().map(|entry| entry.value().clone()).collect();
        principals.sort_by(|a, b| a.principal_arn.cmp(&b.principal_arn));
        principals
    }

    /// The compact projection: principal to resource to sorted allowed action names.
    pub fn allowed_map(&self) -> BTreeMap<String, BTreeMap<String, Vec<String>>> {
        let mut map = BTreeMap::new();
        for principal in self.principals() {
            let mut resources = BTreeMap::new();
            for resource_arn in principal.resource_arns() {
                if let Some(resource) = principal.resource(&resource_arn) {
                    let names = resource.allowed_action_names();
                    if !names.is_empty() {
                        resources.insert(resource_arn, names);
                    }
                }
            }
            if !resources.is_empty() {
                map.insert(principal.principal_arn.clone(), resources);
            }
        }

        map
    }
}

#[cfg(test)]
mod tests {
    use {
        super::PermissionsSummary,
        crate::eval::EvaluationResult,
        pretty_assertions::assert_eq,
    };

    fn evaluation(allowed: bool) -> EvaluationResult {
        EvaluationResult {
            allowed,
            ..EvaluationResult::default()
        }
    }

    #[test_log::test]
    fn test_add_and_projections() {
        let summary = PermissionsSummary::new();
        let alice = "arn:aws:iam::123456789012:user/alice";
        let role = "arn:aws:iam::123456789012:role/deploy";

        summary.add(alice, role, "sts:AssumeRole", evaluation(true));
        summary.add(alice, role, "iam:PassRole", evaluation(true));
        summary.add(alice, role, "iam:UpdateAssumeRolePolicy", evaluation(false));

        assert_eq!(summary.len(), 1);
        assert!(summary.has_allowed(alice, role, "sts:AssumeRole"));
        assert!(summary.has_allowed(alice, role, "STS:assumerole"));
        assert!(!summary.has_allowed(alice, role, "iam:UpdateAssumeRolePolicy"));

        let principal = summary.principal(alice).unwrap();
        assert_eq!(principal.account_id(), "123456789012");
        assert!(principal.has_allowed_action("iam:PassRole"));
        assert!(!principal.has_allowed_action("lambda:CreateFunction"));

        let map = summary.allowed_map();
        assert_eq!(map[alice][role], vec!["iam:PassRole".to_string(), "sts:AssumeRole".to_string()]);

        let resource = principal.resource(role).unwrap();
        assert_eq!(resource.allowed_actions().len(), 2);
        assert_eq!(resource.denied_actions().len(), 1);
    }

    #[test_log::test]
    fn test_concurrent_adds() {
        let summary = std::sync::Arc::new(PermissionsSummary::new());
        let mut handles = Vec::new();

        for worker in 0..8 {
            let summary = summary.clone();
            handles.push(std::thread::spawn(move || {
                for i in 0..50 {
                    let principal = format!("arn:aws:iam::123456789012:user/u{}", i % 5);
                    let resource = format!("arn:aws:iam::123456789012:role/r{}", i % 3);
                    summary.add(&principal, &resource, &format!("action:N{}-{}", worker, i), evaluation(true));
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(summary.len(), 5);
        let total: usize = summary
            .principals()
            .iter()
            .flat_map(|p| p.resource_arns().into_iter().map(|arn| p.resource(&arn).unwrap().allowed_actions().len()))
            .sum();
        assert_eq!(total, 8 * 50);
    }
}
