//! The request context: a typed bag of global and service condition keys.

use {
    chrono::{DateTime, Duration, Utc},
    scratchstack_arn::Arn,
    std::{
        collections::HashMap,
        fmt::{Display, Formatter, Result as FmtResult},
        net::IpAddr,
        str::FromStr,
    },
};

/// Services whose ARNs carry no region; requests against them default to us-east-1.
const GLOBAL_REGION_FALLBACK: &str = "us-east-1";

/// A value a condition key resolves to.
#[derive(Clone, Debug, PartialEq)]
pub enum ContextValue {
    String(String),
    StringList(Vec<String>),
    Bool(bool),
    Timestamp(DateTime<Utc>),
    IpAddr(IpAddr),
    Null,
}

impl ContextValue {
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl Display for ContextValue {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        match self {
            Self::String(s) => f.write_str(s),
            Self::StringList(items) => f.write_str(&items.join(", ")),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Timestamp(t) => f.write_str(&t.to_rfc3339()),
            Self::IpAddr(addr) => write!(f, "{}", addr),
            Self::Null => f.write_str("null"),
        }
    }
}

impl From<&str> for ContextValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for ContextValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<bool> for ContextValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<Vec<String>> for ContextValue {
    fn from(items: Vec<String>) -> Self {
        Self::StringList(items)
    }
}

impl From<IpAddr> for ContextValue {
    fn from(addr: IpAddr) -> Self {
        Self::IpAddr(addr)
    }
}

impl From<DateTime<Utc>> for ContextValue {
    fn from(t: DateTime<Utc>) -> Self {
        Self::Timestamp(t)
    }
}

/// The kind of principal making the request, derived from the shape of its ARN.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum PrincipalType {
    User,
    Role,
    Root,
    RoleSession,
    FederatedUser,
    Service,
    #[default]
    Unknown,
}

impl Display for PrincipalType {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        f.write_str(match self {
            Self::User => "User",
            Self::Role => "Role",
            Self::Root => "Root",
            Self::RoleSession => "RoleSession",
            Self::FederatedUser => "FederatedUser",
            Self::Service => "Service",
            Self::Unknown => "Unknown",
        })
    }
}

/// Derive the principal type from a principal identifier.
pub fn principal_type_of(identifier: &str) -> PrincipalType {
    if identifier.ends_with(".amazonaws.com") {
        return PrincipalType::Service;
    }

    let parts: Vec<&str> = identifier.splitn(6, ':').collect();
    if parts.len() != 6 || parts[0] != "arn" {
        return PrincipalType::Unknown;
    }

    let service = parts[2];
    let resource = parts[5];
    match service {
        "iam" => {
            if resource.starts_with("user/") {
                PrincipalType::User
            } else if resource.starts_with("role/") {
                PrincipalType::Role
            } else if resource == "root" {
                PrincipalType::Root
            } else {
                PrincipalType::Unknown
            }
        }
        "sts" => {
            if resource.starts_with("assumed-role/") {
                PrincipalType::RoleSession
            } else if resource.starts_with("federated-user/") {
                PrincipalType::FederatedUser
            } else {
                PrincipalType::Unknown
            }
        }
        _ => PrincipalType::Unknown,
    }
}

/// Everything known about a request when a policy is evaluated against it.
///
/// Unset string fields are empty; [RequestContext::key_value] reports them as absent so the condition evaluator
/// can distinguish "not in the snapshot" from "known to be empty".
#[derive(Clone, Debug, Default)]
pub struct RequestContext {
    principal_arn: String,
    principal_account: String,
    principal_org_id: String,
    principal_org_paths: Vec<String>,
    principal_tags: HashMap<String, String>,
    principal_type: PrincipalType,
    principal_username: String,
    session_name: String,
    federated_provider: String,
    mfa_present: Option<bool>,
    mfa_age_seconds: Option<f64>,
    token_issue_time: Option<DateTime<Utc>>,

    source_ip: Option<IpAddr>,
    source_vpc: String,
    source_vpce: String,

    resource_account: String,
    resource_org_id: String,
    resource_org_paths: Vec<String>,
    resource_tags: HashMap<String, String>,

    current_time: Option<DateTime<Utc>>,
    requested_region: String,
    secure_transport: Option<bool>,
    user_agent: String,
    referer: String,
    source_arn: String,
    source_account: String,
    request_tags: HashMap<String, String>,

    via_aws_service: Option<bool>,
    called_via: Vec<String>,

    /// Service-specific keys that have no typed field fall through to this map.
    params: HashMap<String, String>,
}

macro_rules! string_setter {
    ($setter:ident, $field:ident) => {
        pub fn $setter<S: Into<String>>(&mut self, value: S) {
            self.$field = value.into();
        }
    };
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    string_setter!(set_principal_arn, principal_arn);
    string_setter!(set_principal_account, principal_account);
    string_setter!(set_principal_org_id, principal_org_id);
    string_setter!(set_principal_username, principal_username);
    string_setter!(set_session_name, session_name);
    string_setter!(set_federated_provider, federated_provider);
    string_setter!(set_source_vpc, source_vpc);
    string_setter!(set_source_vpce, source_vpce);
    string_setter!(set_resource_account, resource_account);
    string_setter!(set_resource_org_id, resource_org_id);
    string_setter!(set_requested_region, requested_region);
    string_setter!(set_user_agent, user_agent);
    string_setter!(set_referer, referer);
    string_setter!(set_source_arn, source_arn);
    string_setter!(set_source_account, source_account);

    pub fn set_principal_org_paths(&mut self, paths: Vec<String>) {
        self.principal_org_paths = paths;
    }

    pub fn set_principal_tags(&mut self, tags: HashMap<String, String>) {
        self.principal_tags = tags;
    }

    pub fn set_principal_type(&mut self, principal_type: PrincipalType) {
        self.principal_type = principal_type;
    }

    pub fn set_mfa_present(&mut self, present: bool) {
        self.mfa_present = Some(present);
    }

    pub fn set_mfa_age_seconds(&mut self, age: f64) {
        self.mfa_age_seconds = Some(age);
    }

    pub fn set_token_issue_time(&mut self, time: DateTime<Utc>) {
        self.token_issue_time = Some(time);
    }

    pub fn set_source_ip(&mut self, addr: IpAddr) {
        self.source_ip = Some(addr);
    }

    pub fn set_resource_org_paths(&mut self, paths: Vec<String>) {
        self.resource_org_paths = paths;
    }

    pub fn set_resource_tags(&mut self, tags: HashMap<String, String>) {
        self.resource_tags = tags;
    }

    pub fn set_current_time(&mut self, time: DateTime<Utc>) {
        self.current_time = Some(time);
    }

    pub fn set_secure_transport(&mut self, secure: bool) {
        self.secure_transport = Some(secure);
    }

    pub fn set_request_tags(&mut self, tags: HashMap<String, String>) {
        self.request_tags = tags;
    }

    pub fn set_via_aws_service(&mut self, via: bool) {
        self.via_aws_service = Some(via);
    }

    pub fn set_called_via(&mut self, chain: Vec<String>) {
        self.called_via = chain;
    }

    pub fn set_param<K: Into<String>, V: Into<String>>(&mut self, key: K, value: V) {
        self.params.insert(key.into(), value.into());
    }

    #[inline]
    pub fn principal_arn(&self) -> &str {
        &self.principal_arn
    }

    #[inline]
    pub fn principal_account(&self) -> &str {
        &self.principal_account
    }

    #[inline]
    pub fn principal_type(&self) -> PrincipalType {
        self.principal_type
    }

    #[inline]
    pub fn resource_account(&self) -> &str {
        &self.resource_account
    }

    #[inline]
    pub fn requested_region(&self) -> &str {
        &self.requested_region
    }

    /// A role is service-linked iff its ARN path goes through `role/aws-service-role/`. Service control
    /// policies do not apply to those roles.
    pub fn is_service_linked_role(&self) -> bool {
        self.principal_arn.contains(":role/aws-service-role/")
    }

    /// Resolve a documented global condition key against this context. The key name is case-insensitive.
    /// Unknown keys fall through to the service-specific parameter map. Returns `None` when the key is absent.
    pub fn key_value(&self, key: &str) -> Option<ContextValue> {
        let lower = key.to_lowercase();

        if let Some(tag_key) = lower.strip_prefix("aws:principaltag/") {
            return tag_value(&self.principal_tags, tag_key);
        }
        if let Some(tag_key) = lower.strip_prefix("aws:resourcetag/") {
            return tag_value(&self.resource_tags, tag_key);
        }
        if let Some(tag_key) = lower.strip_prefix("aws:requesttag/") {
            return tag_value(&self.request_tags, tag_key);
        }

        match lower.as_str() {
            "aws:principalarn" => string_value(&self.principal_arn),
            "aws:principalaccount" => string_value(&self.principal_account),
            "aws:principalorgid" => string_value(&self.principal_org_id),
            "aws:principalorgpaths" => list_value(&self.principal_org_paths),
            "aws:principaltype" => match self.principal_type {
                PrincipalType::Unknown => None,
                other => Some(ContextValue::String(other.to_string())),
            },
            "aws:username" => string_value(&self.principal_username),
            "aws:rolesessionname" => string_value(&self.session_name),
            "aws:federatedprovider" => string_value(&self.federated_provider),
            "aws:multifactorauthpresent" => self.mfa_present.map(ContextValue::Bool),
            "aws:multifactorauthage" => self.mfa_age_seconds.map(|age| ContextValue::String(format_number(age))),
            "aws:tokenissuetime" => self.token_issue_time.map(ContextValue::Timestamp),
            "aws:sourceip" => self.source_ip.map(ContextValue::IpAddr),
            "aws:sourcevpc" => string_value(&self.source_vpc),
            "aws:sourcevpce" => string_value(&self.source_vpce),
            "aws:resourceaccount" => string_value(&self.resource_account),
            "aws:resourceorgid" => string_value(&self.resource_org_id),
            "aws:resourceorgpaths" => list_value(&self.resource_org_paths),
            "aws:currenttime" => self.current_time.map(ContextValue::Timestamp),
            "aws:epochtime" => self.current_time.map(|t| ContextValue::String(t.timestamp().to_string())),
            "aws:requestedregion" => string_value(&self.requested_region),
            "aws:securetransport" => self.secure_transport.map(ContextValue::Bool),
            "aws:useragent" => string_value(&self.user_agent),
            "aws:referer" => string_value(&self.referer),
            "aws:sourcearn" => string_value(&self.source_arn),
            "aws:sourceaccount" => string_value(&self.source_account),
            "aws:viaawsservice" => self.via_aws_service.map(ContextValue::Bool),
            "aws:calledvia" => list_value(&self.called_via),
            "aws:calledviafirst" => self.called_via.first().and_then(|s| string_value(s)),
            "aws:calledvialast" => self.called_via.last().and_then(|s| string_value(s)),
            "aws:tagkeys" => {
                let mut keys: Vec<String> = self
                    .principal_tags
                    .keys()
                    .chain(self.resource_tags.keys())
                    .chain(self.request_tags.keys())
                    .cloned()
                    .collect();
                keys.sort();
                keys.dedup();
                if keys.is_empty() {
                    None
                } else {
                    Some(ContextValue::StringList(keys))
                }
            }
            _ => self
                .params
                .iter()
                .find(|(k, _)| k.to_lowercase() == lower)
                .map(|(_, v)| ContextValue::String(v.clone())),
        }
    }

    /// Fill defaults derivable from the principal and target resource ARNs. Values already set by the caller are
    /// never overwritten, which also makes this idempotent.
    pub fn populate_defaults(&mut self, resource_arn: &str) {
        if self.principal_type == PrincipalType::Unknown && !self.principal_arn.is_empty() {
            self.principal_type = principal_type_of(&self.principal_arn);
        }

        if self.principal_account.is_empty() {
            if let Ok(arn) = Arn::from_str(&self.principal_arn) {
                self.principal_account = arn.account_id().to_string();
            }
        }

        if self.principal_username.is_empty() {
            self.principal_username = username_of(&self.principal_arn);
        }

        if self.session_name.is_empty() {
            if let Some(rest) = self.principal_arn.split(":assumed-role/").nth(1) {
                if let Some((_, session)) = rest.split_once('/') {
                    self.session_name = session.to_string();
                }
            }
        }

        let target = Arn::from_str(resource_arn).ok();

        if self.resource_account.is_empty() {
            if let Some(arn) = &target {
                self.resource_account = arn.account_id().to_string();
            }
        }

        if self.source_account.is_empty() {
            self.source_account = self.resource_account.clone();
        }

        if self.requested_region.is_empty() {
            let region = target.as_ref().map(|arn| arn.region().to_string()).unwrap_or_default();
            self.requested_region = if region.is_empty() {
                GLOBAL_REGION_FALLBACK.to_string()
            } else {
                region
            };
        }

        let now = Utc::now();
        if self.current_time.is_none() {
            self.current_time = Some(now);
        }

        if self.token_issue_time.is_none()
            && matches!(self.principal_type, PrincipalType::Role | PrincipalType::RoleSession)
        {
            self.token_issue_time = Some(now - Duration::hours(1));
        }
    }
}

fn string_value(s: &str) -> Option<ContextValue> {
    if s.is_empty() {
        None
    } else {
        Some(ContextValue::String(s.to_string()))
    }
}

fn list_value(items: &[String]) -> Option<ContextValue> {
    if items.is_empty() {
        None
    } else {
        Some(ContextValue::StringList(items.to_vec()))
    }
}

fn tag_value(tags: &HashMap<String, String>, key: &str) -> Option<ContextValue> {
    tags.iter().find(|(k, _)| k.to_lowercase() == key).map(|(_, v)| ContextValue::String(v.clone()))
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

/// The user or role name embedded in a principal ARN, if its shape carries one.
fn username_of(arn: &str) -> String {
    for marker in [":user/", ":role/"] {
        if let Some(rest) = arn.split(marker).nth(1) {
            return rest.rsplit('/').next().unwrap_or(rest).to_string();
        }
    }

    if let Some(rest) = arn.split(":assumed-role/").nth(1) {
        return rest.split('/').next().unwrap_or(rest).to_string();
    }

    String::new()
}
