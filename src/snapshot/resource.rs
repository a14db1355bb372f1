use {
    crate::{catalog::is_service_pseudo_resource, glob::account_id_from_arn},
    serde::{Deserialize, Serialize},
    std::collections::HashMap,
};

/// The type name given to service pseudo-resources.
pub const SERVICE_PSEUDO_TYPE: &str = "AWS::Service";

/// An enriched resource description from the inventory snapshot.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResourceRecord {
    pub arn: String,

    #[serde(default)]
    pub type_name: String,

    #[serde(default)]
    pub region: String,

    #[serde(default)]
    pub account: String,

    #[serde(default)]
    pub tags: HashMap<String, String>,
}

impl ResourceRecord {
    pub fn new<S: Into<String>, T: Into<String>>(arn: S, type_name: T) -> Self {
        let arn = arn.into();
        let account = account_id_from_arn(&arn).unwrap_or_default().to_string();

        Self {
            arn,
            type_name: type_name.into(),
            region: String::new(),
            account,
            tags: HashMap::new(),
        }
    }

    /// A pseudo-resource standing in for "any future resource of this service".
    pub fn service_pseudo(service: &str) -> Self {
        Self {
            arn: format!("{}.amazonaws.com", service),
            type_name: SERVICE_PSEUDO_TYPE.to_string(),
            region: String::new(),
            account: String::new(),
            tags: HashMap::new(),
        }
    }

    /// Indicates whether this record is a service pseudo-resource.
    pub fn is_service_pseudo(&self) -> bool {
        self.type_name == SERVICE_PSEUDO_TYPE || is_service_pseudo_resource(&self.arn)
    }
}
