//! ARN-keyed lookup tables built once from the input snapshot, read-only afterward.

use {
    super::{
        gaad::{AccountAuthorizationDetails, GroupDetail, ManagedPolicyDetail, RoleDetail, UserDetail},
        resource::ResourceRecord,
    },
    crate::PolicyDocument,
    log::debug,
    std::collections::HashMap,
};

/// Services that get a pseudo-resource entry so create-style actions always have a candidate target.
const PSEUDO_RESOURCE_SERVICES: [&str; 9] =
    ["iam", "ec2", "cloudformation", "lambda", "ecs", "ssm", "glue", "datapipeline", "codebuild"];

/// A reserved external account modeling surfaces exposed to everyone; nothing in a real snapshot shares it.
const ATTACKER_ACCOUNT: &str = "999999999999";

/// The ARN-keyed caches every other component reads from.
#[derive(Debug, Default)]
pub struct Caches {
    policies: HashMap<String, ManagedPolicyDetail>,
    roles: HashMap<String, RoleDetail>,
    users: HashMap<String, UserDetail>,
    groups: HashMap<String, GroupDetail>,
    groups_by_name: HashMap<String, String>,
    resources: HashMap<String, ResourceRecord>,
    resource_policies: HashMap<String, PolicyDocument>,
}

impl Caches {
    /// Build the caches from a materialized snapshot.
    ///
    /// The resource cache is augmented with a synthetic entry for every IAM entity and managed policy (so
    /// resource-policy lookups and cross-account checks uniformly succeed), the common service pseudo-resources,
    /// and the fixed attacker resources. Role trust policies are registered as resource policies on the role ARN
    /// unless the input already supplies one.
    pub fn build(
        gaad: &AccountAuthorizationDetails,
        resources: Vec<ResourceRecord>,
        resource_policies: HashMap<String, PolicyDocument>,
    ) -> Self {
        let mut caches = Self {
            resource_policies,
            ..Self::default()
        };

        for resource in resources {
            caches.resources.insert(resource.arn.clone(), resource);
        }

        for user in &gaad.user_detail_list {
            caches.add_synthetic_resource(&user.arn, "AWS::IAM::User");
            caches.users.insert(user.arn.clone(), user.clone());
        }

        for role in &gaad.role_detail_list {
            caches.add_synthetic_resource(&role.arn, "AWS::IAM::Role");
            if let Some(trust_policy) = &role.assume_role_policy_document {
                caches.resource_policies.entry(role.arn.clone()).or_insert_with(|| trust_policy.0.clone());
            }
            caches.roles.insert(role.arn.clone(), role.clone());
        }

        for group in &gaad.group_detail_list {
            caches.add_synthetic_resource(&group.arn, "AWS::IAM::Group");
            caches.groups_by_name.insert(group.group_name.clone(), group.arn.clone());
            caches.groups.insert(group.arn.clone(), group.clone());
        }

        for policy in &gaad.policies {
            caches.add_synthetic_resource(&policy.arn, "AWS::IAM::ManagedPolicy");
            caches.policies.insert(policy.arn.clone(), policy.clone());
        }

        for service in PSEUDO_RESOURCE_SERVICES {
            let record = ResourceRecord::service_pseudo(service);
            caches.resources.entry(record.arn.clone()).or_insert(record);
        }

        for attacker_arn in [
            format!("arn:aws:iam::{}:root", ATTACKER_ACCOUNT),
            format!("arn:aws:iam::{}:user/attacker", ATTACKER_ACCOUNT),
        ] {
            let record = ResourceRecord::new(attacker_arn, "AWS::IAM::External");
            caches.resources.entry(record.arn.clone()).or_insert(record);
        }

        debug!(
            "Built caches: {} users, {} roles, {} groups, {} policies, {} resources, {} resource policies",
            caches.users.len(),
            caches.roles.len(),
            caches.groups.len(),
            caches.policies.len(),
            caches.resources.len(),
            caches.resource_policies.len(),
        );

        caches
    }

    fn add_synthetic_resource(&mut self, arn: &str, type_name: &str) {
        self.resources.entry(arn.to_string()).or_insert_with(|| ResourceRecord::new(arn, type_name));
    }

    #[inline]
    pub fn policy(&self, arn: &str) -> Option<&ManagedPolicyDetail> {
        self.policies.get(arn)
    }

    #[inline]
    pub fn role(&self, arn: &str) -> Option<&RoleDetail> {
        self.roles.get(arn)
    }

    #[inline]
    pub fn user(&self, arn: &str) -> Option<&UserDetail> {
        self.users.get(arn)
    }

    #[inline]
    pub fn group(&self, arn: &str) -> Option<&GroupDetail> {
        self.groups.get(arn)
    }

    /// GAAD user records reference groups by name.
    pub fn group_by_name(&self, name: &str) -> Option<&GroupDetail> {
        self.groups_by_name.get(name).and_then(|arn| self.groups.get(arn))
    }

    #[inline]
    pub fn resource(&self, arn: &str) -> Option<&ResourceRecord> {
        self.resources.get(arn)
    }

    #[inline]
    pub fn resource_policy(&self, arn: &str) -> Option<&PolicyDocument> {
        self.resource_policies.get(arn)
    }

    /// The document of a managed policy, by policy ARN.
    pub fn managed_policy_document(&self, arn: &str) -> Option<&PolicyDocument> {
        self.policies.get(arn).and_then(|policy| policy.default_document())
    }

    pub fn users(&self) -> impl Iterator<Item = &UserDetail> {
        self.users.values()
    }

    pub fn roles(&self) -> impl Iterator<Item = &RoleDetail> {
        self.roles.values()
    }

    pub fn resources(&self) -> impl Iterator<Item = &ResourceRecord> {
        self.resources.values()
    }

    pub fn resource_policies(&self) -> impl Iterator<Item = (&String, &PolicyDocument)> {
        self.resource_policies.iter()
    }
}
