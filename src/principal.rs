use {
    crate::{display_json, serutil::StringList},
    derive_builder::Builder,
    log::debug,
    serde::{
        de::{self, value::MapAccessDeserializer, Deserializer, MapAccess, Unexpected, Visitor},
        ser::Serializer,
        Deserialize, Serialize,
    },
    std::fmt::{Formatter, Result as FmtResult},
};

/// A principal element in a policy statement.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Principal {
    /// Any principal (wildcard: `*`)
    Any,

    /// A set of principals specified by source.
    Specified(SpecifiedPrincipal),
}

impl Principal {
    #[inline]
    pub fn is_any(&self) -> bool {
        matches!(self, Principal::Any)
    }

    /// If this [Principal] is [Principal::Specified], returns the [SpecifiedPrincipal].
    #[inline]
    pub fn specified(&self) -> Option<&SpecifiedPrincipal> {
        match self {
            Principal::Any => None,
            Principal::Specified(sp) => Some(sp),
        }
    }
}

impl From<SpecifiedPrincipal> for Principal {
    fn from(sp: SpecifiedPrincipal) -> Self {
        Self::Specified(sp)
    }
}

/// The four disjoint identifier lists a principal element may carry.
///
/// Identifiers are kept as raw strings: principal matching in this engine is glob matching against the
/// requesting principal's ARN (or service identifier), and trust policies legitimately contain patterns that
/// are not themselves valid ARNs.
#[derive(Builder, Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub struct SpecifiedPrincipal {
    #[builder(setter(into, strip_option), default)]
    #[serde(rename = "AWS", skip_serializing_if = "Option::is_none")]
    aws: Option<StringList>,

    #[builder(setter(into, strip_option), default)]
    #[serde(rename = "CanonicalUser", skip_serializing_if = "Option::is_none")]
    canonical_user: Option<StringList>,

    #[builder(setter(into, strip_option), default)]
    #[serde(rename = "Federated", skip_serializing_if = "Option::is_none")]
    federated: Option<StringList>,

    #[builder(setter(into, strip_option), default)]
    #[serde(rename = "Service", skip_serializing_if = "Option::is_none")]
    service: Option<StringList>,
}

impl SpecifiedPrincipal {
    pub fn builder() -> SpecifiedPrincipalBuilder {
        SpecifiedPrincipalBuilder::default()
    }

    #[inline]
    pub fn aws(&self) -> Option<&StringList> {
        self.aws.as_ref()
    }

    #[inline]
    pub fn canonical_user(&self) -> Option<&StringList> {
        self.canonical_user.as_ref()
    }

    #[inline]
    pub fn federated(&self) -> Option<&StringList> {
        self.federated.as_ref()
    }

    #[inline]
    pub fn service(&self) -> Option<&StringList> {
        self.service.as_ref()
    }
}

display_json!(SpecifiedPrincipal);

struct PrincipalVisitor;

impl<'de> Visitor<'de> for PrincipalVisitor {
    type Value = Principal;

    fn expecting(&self, f: &mut Formatter) -> FmtResult {
        write!(f, "map of principal types to values or \"*\"")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        if v == "*" {
            Ok(Principal::Any)
        } else {
            Err(E::invalid_value(Unexpected::Str(v), &self))
        }
    }

    fn visit_map<A: MapAccess<'de>>(self, access: A) -> Result<Self::Value, A::Error> {
        let deserializer = MapAccessDeserializer::new(access);
        match SpecifiedPrincipal::deserialize(deserializer) {
            Ok(sp) => Ok(Principal::Specified(sp)),
            Err(e) => {
                debug!("Failed to deserialize principal: {:?}", e);
                Err(e)
            }
        }
    }
}

impl<'de> Deserialize<'de> for Principal {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(PrincipalVisitor)
    }
}

impl Serialize for Principal {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Any => serializer.serialize_str("*"),
            Self::Specified(specified) => specified.serialize(serializer),
        }
    }
}

display_json!(Principal);

#[cfg(test)]
mod tests {
    use {
        crate::{Principal, SpecifiedPrincipal},
        indoc::indoc,
        pretty_assertions::assert_eq,
    };

    #[test_log::test]
    fn test_any() {
        let p: Principal = serde_json::from_str(r#""*""#).unwrap();
        assert!(p.is_any());
        assert!(p.specified().is_none());
        assert_eq!(format!("{}", p), r#""*""#);
    }

    #[test_log::test]
    fn test_specified() {
        let p: Principal = serde_json::from_str(indoc! { r#"
            {
                "AWS": [
                    "arn:aws:iam::123456789012:root",
                    "arn:aws:iam::123456789012:user/alice"
                ],
                "Service": "lambda.amazonaws.com"
            }"# })
        .unwrap();

        let sp = p.specified().unwrap();
        assert_eq!(sp.aws().unwrap().len(), 2);
        assert_eq!(sp.aws().unwrap()[0], "arn:aws:iam::123456789012:root");
        assert_eq!(sp.service().unwrap().len(), 1);
        assert!(sp.federated().is_none());
        assert!(sp.canonical_user().is_none());
    }

    #[test_log::test]
    fn test_builder() {
        let sp = SpecifiedPrincipal::builder().aws("123456789012".to_string()).build().unwrap();
        assert_eq!(sp.aws().unwrap()[0], "123456789012");
        assert_eq!(Principal::from(sp.clone()), Principal::Specified(sp));
    }

    #[test_log::test]
    fn test_bad_principal() {
        let e = serde_json::from_str::<Principal>(r#""123456789012""#).unwrap_err();
        assert!(e.to_string().contains("map of principal types to values"));
    }
}
