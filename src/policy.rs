use {
    crate::{display_json, from_str_json, StatementList},
    derive_builder::Builder,
    serde::{
        de,
        de::{Deserializer, MapAccess, Visitor},
        ser::{SerializeMap, Serializer},
        Deserialize, Serialize,
    },
    std::fmt::{Formatter, Result as FmtResult},
};

const KNOWN_VERSIONS: [&str; 2] = ["2008-10-17", "2012-10-17"];

/// A parsed policy document: version, optional id, and statements.
///
/// This does not directly derive Deserialize/Serialize to prevent serde from allowing this to be represented as
/// an array.
#[derive(Builder, Clone, Debug, Eq, PartialEq)]
pub struct PolicyDocument {
    /// The version of the policy. Allowed values are `2008-10-17` and `2012-10-17`; omitting it is equivalent
    /// to `2008-10-17`.
    #[builder(setter(into, strip_option), default)]
    version: Option<String>,

    /// An optional identifier for the policy.
    #[builder(setter(into, strip_option), default)]
    id: Option<String>,

    /// One or more statements. A single statement may be encoded directly as a map instead of being enclosed in
    /// a list.
    #[builder(setter(into))]
    statement: StatementList,
}

impl PolicyDocument {
    #[inline]
    pub fn builder() -> PolicyDocumentBuilder {
        PolicyDocumentBuilder::default()
    }

    #[inline]
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    #[inline]
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    #[inline]
    pub fn statement(&self) -> &StatementList {
        &self.statement
    }
}

display_json!(PolicyDocument);
from_str_json!(PolicyDocument);

impl<'de> Visitor<'de> for PolicyDocumentBuilder {
    type Value = PolicyDocument;

    fn expecting(&self, formatter: &mut Formatter<'_>) -> FmtResult {
        formatter.write_str("policy document")
    }

    fn visit_map<A: MapAccess<'de>>(mut self, mut access: A) -> Result<Self::Value, A::Error> {
        let builder = &mut self;
        let mut version_seen = false;
        let mut id_seen = false;
        let mut statement_seen = false;

        while let Some(key) = access.next_key()? {
            match key {
                "Version" => {
                    if version_seen {
                        return Err(de::Error::duplicate_field("Version"));
                    }
                    version_seen = true;

                    let version = access.next_value::<String>()?;
                    if !KNOWN_VERSIONS.contains(&version.as_str()) {
                        return Err(de::Error::custom(format!("Invalid policy version: {}", version)));
                    }
                    builder.version(version);
                }
                "Id" => {
                    if id_seen {
                        return Err(de::Error::duplicate_field("Id"));
                    }
                    id_seen = true;
                    builder.id(access.next_value::<String>()?);
                }
                "Statement" => {
                    if statement_seen {
                        return Err(de::Error::duplicate_field("Statement"));
                    }
                    statement_seen = true;
                    builder.statement(access.next_value::<StatementList>()?);
                }
                _ => return Err(de::Error::unknown_field(key, &["Version", "Id", "Statement"])),
            }
        }

        if !statement_seen {
            return Err(de::Error::missing_field("Statement"));
        }

        self.build().map_err(de::Error::custom)
    }
}

impl<'de> Deserialize<'de> for PolicyDocument {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<PolicyDocument, D::Error> {
        d.deserialize_map(PolicyDocumentBuilder::default())
    }
}

impl Serialize for PolicyDocument {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_map(None)?;
        if let Some(version) = &self.version {
            state.serialize_entry("Version", version)?;
        }
        if let Some(id) = &self.id {
            state.serialize_entry("Id", id)?;
        }
        state.serialize_entry("Statement", &self.statement)?;
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use {
        crate::{Effect, PolicyDocument},
        indoc::indoc,
        pretty_assertions::assert_eq,
        std::str::FromStr,
    };

    #[test_log::test]
    fn test_typical_policy() {
        let policy_str = indoc! { r#"
        {
            "Version": "2012-10-17",
            "Id": "PolicyId",
            "Statement": [
                {
                    "Sid": "1",
                    "Effect": "Allow",
                    "Action": [
                        "ec2:Get*",
                        "ecs:*"
                    ],
                    "Resource": "*"
                },
                {
                    "Sid": "2",
                    "Effect": "Deny",
                    "Action": "*",
                    "Resource": [
                        "arn:aws:s3:::my-bucket",
                        "arn:aws:s3:::my-bucket/*"
                    ],
                    "Principal": "*"
                }
            ]
        }"# };
        let policy = PolicyDocument::from_str(policy_str).unwrap();

        assert_eq!(policy.version(), Some("2012-10-17"));
        assert_eq!(policy.id(), Some("PolicyId"));
        assert_eq!(policy.statement().len(), 2);
        assert_eq!(*policy.statement()[1].effect(), Effect::Deny);

        // Round-trip preserves formatting.
        assert_eq!(policy.to_string(), policy_str);
    }

    #[test_log::test]
    fn test_single_statement_as_map() {
        let policy = PolicyDocument::from_str(indoc! { r#"
            {
                "Statement": {
                    "Effect": "Allow",
                    "Action": "*",
                    "Resource": "*"
                }
            }"# })
        .unwrap();
        assert!(policy.version().is_none());
        assert_eq!(policy.statement().len(), 1);
    }

    #[test_log::test]
    fn test_structural_errors() {
        let e = PolicyDocument::from_str(r#"{"Version": "2012-10-17"}"#).unwrap_err();
        assert!(e.to_string().contains("missing field `Statement`"));

        let e = PolicyDocument::from_str(r#"{"Version": "2025-01-01", "Statement": []}"#).unwrap_err();
        assert!(e.to_string().contains("Invalid policy version: 2025-01-01"));

        let e = PolicyDocument::from_str(r#"{"Statement": [], "Statement": []}"#).unwrap_err();
        assert!(e.to_string().contains("duplicate field `Statement`"));

        let e = PolicyDocument::from_str(r#"{"Extra": 1, "Statement": []}"#).unwrap_err();
        assert!(e.to_string().contains("unknown field `Extra`"));
    }
}
