//! Serde models for the `get-account-authorization-details` (GAAD) snapshot.
//!
//! Policy documents inside a GAAD are URL-encoded JSON strings on the wire, but materialized snapshots often
//! carry them inline as objects; [GaadPolicyDocument] accepts both.

use {
    crate::{from_str_json, PolicyDocument},
    percent_encoding::percent_decode_str,
    serde::{
        de::{self, value::MapAccessDeserializer, Deserializer, MapAccess, Visitor},
        Deserialize, Serialize, Serializer,
    },
    std::{
        fmt::{Formatter, Result as FmtResult},
        ops::Deref,
    },
};

/// A policy document as it appears inside a GAAD: inline JSON or a URL-encoded JSON string.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct GaadPolicyDocument(pub PolicyDocument);

impl Deref for GaadPolicyDocument {
    type Target = PolicyDocument;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<PolicyDocument> for GaadPolicyDocument {
    fn from(document: PolicyDocument) -> Self {
        Self(document)
    }
}

struct GaadPolicyDocumentVisitor;

impl<'de> Visitor<'de> for GaadPolicyDocumentVisitor {
    type Value = GaadPolicyDocument;

    fn expecting(&self, f: &mut Formatter) -> FmtResult {
        write!(f, "policy document or URL-encoded policy document string")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        let decoded = percent_decode_str(v).decode_utf8().map_err(E::custom)?;
        let document = serde_json::from_str::<PolicyDocument>(&decoded).map_err(E::custom)?;
        Ok(GaadPolicyDocument(document))
    }

    fn visit_map<A: MapAccess<'de>>(self, access: A) -> Result<Self::Value, A::Error> {
        let document = PolicyDocument::deserialize(MapAccessDeserializer::new(access))?;
        Ok(GaadPolicyDocument(document))
    }
}

impl<'de> Deserialize<'de> for GaadPolicyDocument {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(GaadPolicyDocumentVisitor)
    }
}

impl Serialize for GaadPolicyDocument {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

/// A tag on an IAM entity or resource.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Tag {
    pub key: String,
    pub value: String,
}

/// An inline policy entry (`UserPolicyList`, `RolePolicyList`, `GroupPolicyList`).
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct InlinePolicy {
    pub policy_name: String,
    pub policy_document: GaadPolicyDocument,
}

/// A managed policy attachment reference.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct AttachedPolicy {
    pub policy_name: String,
    pub policy_arn: String,
}

/// A permissions boundary reference on a user or role.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct AttachedPermissionsBoundary {
    #[serde(default)]
    pub permissions_boundary_type: Option<String>,
    pub permissions_boundary_arn: String,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct UserDetail {
    #[serde(default)]
    pub path: String,
    pub user_name: String,
    #[serde(default)]
    pub user_id: String,
    pub arn: String,
    #[serde(default)]
    pub user_policy_list: Vec<InlinePolicy>,
    #[serde(default)]
    pub group_list: Vec<String>,
    #[serde(default)]
    pub attached_managed_policies: Vec<AttachedPolicy>,
    #[serde(default)]
    pub permissions_boundary: Option<AttachedPermissionsBoundary>,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct RoleDetail {
    #[serde(default)]
    pub path: String,
    pub role_name: String,
    #[serde(default)]
    pub role_id: String,
    pub arn: String,
    #[serde(default)]
    pub assume_role_policy_document: Option<GaadPolicyDocument>,
    #[serde(default)]
    pub role_policy_list: Vec<InlinePolicy>,
    #[serde(default)]
    pub attached_managed_policies: Vec<AttachedPolicy>,
    #[serde(default)]
    pub permissions_boundary: Option<AttachedPermissionsBoundary>,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct GroupDetail {
    #[serde(default)]
    pub path: String,
    pub group_name: String,
    #[serde(default)]
    pub group_id: String,
    pub arn: String,
    #[serde(default)]
    pub group_policy_list: Vec<InlinePolicy>,
    #[serde(default)]
    pub attached_managed_policies: Vec<AttachedPolicy>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyVersionDetail {
    #[serde(default)]
    pub document: Option<GaadPolicyDocument>,
    #[serde(default)]
    pub version_id: String,
    #[serde(default)]
    pub is_default_version: bool,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ManagedPolicyDetail {
    pub policy_name: String,
    #[serde(default)]
    pub policy_id: String,
    pub arn: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub default_version_id: String,
    #[serde(default)]
    pub policy_version_list: Vec<PolicyVersionDetail>,
}

impl ManagedPolicyDetail {
    /// The document of the default policy version, falling back to the first version carrying a document.
    pub fn default_document(&self) -> Option<&PolicyDocument> {
        let by_flag = self.policy_version_list.iter().find(|version| version.is_default_version);
        let by_id = self.policy_version_list.iter().find(|version| version.version_id == self.default_version_id);
        let any = self.policy_version_list.iter().find(|version| version.document.is_some());

        by_flag
            .or(by_id)
            .or(any)
            .and_then(|version| version.document.as_ref())
            .map(|document| &document.0)
    }
}

/// The full GAAD snapshot of an account.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct AccountAuthorizationDetails {
    #[serde(default)]
    pub user_detail_list: Vec<UserDetail>,
    #[serde(default)]
    pub group_detail_list: Vec<GroupDetail>,
    #[serde(default)]
    pub role_detail_list: Vec<RoleDetail>,
    #[serde(default)]
    pub policies: Vec<ManagedPolicyDetail>,
}

from_str_json!(AccountAuthorizationDetails);
