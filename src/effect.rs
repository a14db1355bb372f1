use {
    serde::{
        de::{self, Deserializer, Visitor},
        ser::Serializer,
        Deserialize, Serialize,
    },
    std::fmt::{Display, Formatter, Result as FmtResult},
};

const EFFECT_ELEMENTS: &[&str; 2] = &["Allow", "Deny"];

/// The effect of a statement. AWS accepts the element case-insensitively, so `"allow"` and `"ALLOW"` both parse.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Effect {
    Allow,
    Deny,
}

impl Display for Effect {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        match self {
            Self::Allow => f.write_str("Allow"),
            Self::Deny => f.write_str("Deny"),
        }
    }
}

struct EffectVisitor;

impl<'de> Visitor<'de> for EffectVisitor {
    type Value = Effect;

    fn expecting(&self, f: &mut Formatter) -> FmtResult {
        write!(f, "\"Allow\" or \"Deny\"")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        match v.to_lowercase().as_str() {
            "allow" => Ok(Effect::Allow),
            "deny" => Ok(Effect::Deny),
            _ => Err(E::unknown_variant(v, EFFECT_ELEMENTS)),
        }
    }
}

impl<'de> Deserialize<'de> for Effect {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_str(EffectVisitor)
    }
}

impl Serialize for Effect {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(match self {
            Self::Allow => "Allow",
            Self::Deny => "Deny",
        })
    }
}

#[cfg(test)]
mod tests {
    use {crate::Effect, pretty_assertions::assert_eq, std::collections::HashMap};

    #[test_log::test]
    fn test_case_insensitive() {
        assert_eq!(serde_json::from_str::<Effect>(r#""Allow""#).unwrap(), Effect::Allow);
        assert_eq!(serde_json::from_str::<Effect>(r#""allow""#).unwrap(), Effect::Allow);
        assert_eq!(serde_json::from_str::<Effect>(r#""DENY""#).unwrap(), Effect::Deny);

        let e = serde_json::from_str::<Effect>(r#""Grant""#).unwrap_err();
        assert!(e.to_string().contains("unknown variant"));
    }

    #[test_log::test]
    fn test_serialize() {
        assert_eq!(serde_json::to_string(&Effect::Allow).unwrap(), r#""Allow""#);
        assert_eq!(serde_json::to_string(&Effect::Deny).unwrap(), r#""Deny""#);
    }

    #[test_log::test]
    fn test_display_and_hash() {
        assert_eq!(format!("{}", Effect::Allow), "Allow");
        assert_eq!(format!("{}", Effect::Deny), "Deny");

        let mut hash_map = HashMap::new();
        hash_map.insert(Effect::Allow, 1);
        hash_map.insert(Effect::Deny, 2);
        assert_eq!(hash_map.get(&Effect::Allow), Some(&1));
        assert_eq!(hash_map.get(&Effect::Deny), Some(&2));
    }
}
