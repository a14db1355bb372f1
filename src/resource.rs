use {
    crate::{glob::glob_matches, serutil::StringLikeList, EngineError},
    serde::{
        de::{self, Deserializer, Unexpected, Visitor},
        ser::Serializer,
        Deserialize, Serialize,
    },
    std::{
        fmt::{Display, Formatter, Result as FmtResult},
        str::FromStr,
    },
};

/// A list of resources. In JSON, this may be a string or an array of strings.
pub type ResourceList = StringLikeList<Resource>;

/// A resource entry in a policy statement.
///
/// Besides `*` and ARN patterns, statements in the wild name service pseudo-resources (`lambda.amazonaws.com`)
/// when a create-style action has no pre-existing target, so anything that is not `*` is kept as an opaque
/// pattern and matched with the glob matcher.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum Resource {
    /// Any resource. This is specified by the wildcard character `*`.
    Any,

    /// An ARN pattern or service pseudo-resource identifier.
    Pattern(String),
}

impl Resource {
    #[inline]
    pub fn is_any(&self) -> bool {
        matches!(self, Self::Any)
    }

    /// The raw pattern string (`*` for [Resource::Any]).
    pub fn pattern(&self) -> &str {
        match self {
            Self::Any => "*",
            Self::Pattern(pattern) => pattern,
        }
    }

    /// Indicates whether this entry matches the candidate resource identifier.
    pub fn matches(&self, candidate: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Pattern(pattern) => glob_matches(pattern, candidate),
        }
    }
}

impl FromStr for Resource {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "*" {
            return Ok(Self::Any);
        }

        if s.is_empty() {
            return Err(EngineError::InvalidResource(s.to_string()));
        }

        Ok(Self::Pattern(s.to_string()))
    }
}

impl Display for Resource {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        f.write_str(self.pattern())
    }
}

struct ResourceVisitor;

impl<'de> Visitor<'de> for ResourceVisitor {
    type Value = Resource;

    fn expecting(&self, f: &mut Formatter) -> FmtResult {
        write!(f, "resource ARN or \"*\"")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        Resource::from_str(v).map_err(|_| E::invalid_value(Unexpected::Str(v), &self))
    }
}

impl<'de> Deserialize<'de> for Resource {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_str(ResourceVisitor)
    }
}

impl Serialize for Resource {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.pattern())
    }
}

#[cfg(test)]
mod tests {
    use {
        crate::{Resource, ResourceList},
        pretty_assertions::assert_eq,
        std::str::FromStr,
    };

    #[test_log::test]
    fn test_parse() {
        assert_eq!(Resource::from_str("*").unwrap(), Resource::Any);
        assert_eq!(
            Resource::from_str("arn:aws:s3:::my-bucket/*").unwrap().pattern(),
            "arn:aws:s3:::my-bucket/*"
        );
        assert_eq!(Resource::from_str("lambda.amazonaws.com").unwrap().pattern(), "lambda.amazonaws.com");
        assert!(Resource::from_str("").is_err());
    }

    #[test_log::test]
    fn test_matches() {
        assert!(Resource::Any.matches("arn:aws:s3:::any-bucket"));

        let bucket = Resource::from_str("arn:aws:s3:::example-bucket/*").unwrap();
        assert!(bucket.matches("arn:aws:s3:::example-bucket/file.txt"));
        assert!(bucket.matches("ARN:AWS:S3:::Example-Bucket/File.txt"));
        assert!(!bucket.matches("arn:aws:s3:::other-bucket/file.txt"));

        let wildcard_account = Resource::from_str("arn:aws:iam::*:role/admin-?").unwrap();
        assert!(wildcard_account.matches("arn:aws:iam::123456789012:role/admin-1"));
        assert!(!wildcard_account.matches("arn:aws:iam::123456789012:role/admin-10"));
    }

    #[test_log::test]
    fn test_list_forms() {
        let single: ResourceList = serde_json::from_str(r#""*""#).unwrap();
        assert_eq!(single.to_vec(), vec![&Resource::Any]);

        let list: ResourceList =
            serde_json::from_str(r#"["arn:aws:s3:::my-bucket", "arn:aws:s3:::my-bucket/*"]"#).unwrap();
        assert_eq!(list.len(), 2);

        let e = serde_json::from_str::<ResourceList>("[2]").unwrap_err();
        assert!(e.to_string().contains("expected resource ARN"));
    }
}
