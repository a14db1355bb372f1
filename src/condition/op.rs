use {
    super::{
        arn::{arn_match, ArnCmp},
        binary::{binary_match, BINARY_DISPLAY_NAMES},
        boolean::{bool_match, BOOL_DISPLAY_NAMES},
        date::{date_match, DateCmp},
        ipaddr::{ip_address_match, IP_ADDRESS_DISPLAY_NAMES},
        null::{null_match, NULL_DISPLAY_NAME},
        numeric::{numeric_match, NumericCmp},
        string::{string_match, StringCmp},
        variant::{Quantifier, Variant},
    },
    crate::{context::ContextValue, serutil::StringList, EngineError},
    serde::{Deserialize, Serialize},
    std::{
        borrow::Borrow,
        cmp::Ordering,
        fmt::{Display, Formatter, Result as FmtResult},
        hash::{Hash, Hasher},
        str::FromStr,
    },
};

/// The base test of a condition operator, without any set quantifier.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum OpTest {
    Arn(ArnCmp, Variant),
    Binary(Variant),
    Bool(Variant),
    Date(DateCmp, Variant),
    IpAddress(Variant),
    Null,
    Numeric(NumericCmp, Variant),
    String(StringCmp, Variant),
}

impl OpTest {
    fn display_name(&self) -> &'static str {
        match self {
            Self::Arn(cmp, variant) => cmp.display_name(variant),
            Self::Binary(variant) => BINARY_DISPLAY_NAMES[variant.as_usize()],
            Self::Bool(variant) => BOOL_DISPLAY_NAMES[variant.as_usize()],
            Self::Date(cmp, variant) => cmp.display_name(variant),
            Self::IpAddress(variant) => IP_ADDRESS_DISPLAY_NAMES[variant.as_usize()],
            Self::Null => NULL_DISPLAY_NAME,
            Self::Numeric(cmp, variant) => cmp.display_name(variant),
            Self::String(cmp, variant) => cmp.display_name(variant),
        }
    }

    fn variant(&self) -> Variant {
        match self {
            Self::Arn(_, variant)
            | Self::Binary(variant)
            | Self::Bool(variant)
            | Self::Date(_, variant)
            | Self::IpAddress(variant)
            | Self::Numeric(_, variant)
            | Self::String(_, variant) => *variant,
            Self::Null => Variant::None,
        }
    }

    fn matches(&self, allowed: &StringList, value: &ContextValue) -> bool {
        match self {
            Self::Arn(cmp, variant) => arn_match(allowed, value, *cmp, *variant),
            Self::Binary(variant) => binary_match(allowed, value, *variant),
            Self::Bool(variant) => bool_match(allowed, value, *variant),
            Self::Date(cmp, variant) => date_match(allowed, value, *cmp, *variant),
            Self::IpAddress(variant) => ip_address_match(allowed, value, *variant),
            Self::Null => null_match(allowed, value),
            Self::Numeric(cmp, variant) => numeric_match(allowed, value, *cmp, *variant),
            Self::String(cmp, variant) => string_match(allowed, value, *cmp, *variant),
        }
    }
}

/// A condition operator as written in a policy: an optional `ForAllValues:`/`ForAnyValue:` quantifier prefix, a
/// base test, and optionally the `IfExists` suffix folded into the test's variant.
///
/// The original spelling is retained for diagnostics and round-tripping; two operators are equal iff they were
/// spelled the same, which the exact-match parser guarantees for semantically identical operators.
#[derive(Clone, Debug)]
pub struct ConditionOp {
    raw: String,
    quantifier: Quantifier,
    test: OpTest,
}

impl ConditionOp {
    pub fn new(quantifier: Quantifier, test: OpTest) -> Self {
        Self {
            raw: format!("{}{}", quantifier.prefix(), test.display_name()),
            quantifier,
            test,
        }
    }

    /// The operator exactly as written in the policy.
    #[inline]
    pub fn name(&self) -> &str {
        &self.raw
    }

    #[inline]
    pub fn quantifier(&self) -> Quantifier {
        self.quantifier
    }

    #[inline]
    pub fn test(&self) -> &OpTest {
        &self.test
    }

    /// Indicates whether this operator carries the `IfExists` suffix.
    #[inline]
    pub fn if_exists(&self) -> bool {
        self.test.variant().if_exists()
    }

    /// Indicates whether this is the `Null` presence test.
    #[inline]
    pub fn is_null_test(&self) -> bool {
        matches!(self.test, OpTest::Null)
    }

    /// Evaluate this operator against the resolved context value.
    ///
    /// Quantified operators coerce the value to a set: a string becomes a singleton, a multi-valued key
    /// contributes each of its values, an absent key contributes nothing. `ForAllValues` is vacuously true on the
    /// empty set; `ForAnyValue` requires at least one hit. An unquantified operator applied to a multi-valued key
    /// passes if any value passes.
    pub fn matches(&self, allowed: &StringList, value: &ContextValue) -> bool {
        match self.quantifier {
            Quantifier::None => match value {
                ContextValue::StringList(items) => {
                    items.iter().any(|item| self.test.matches(allowed, &ContextValue::String(item.clone())))
                }
                _ => self.test.matches(allowed, value),
            },
            Quantifier::ForAllValues => {
                scalar_values(value).iter().all(|item| self.test.matches(allowed, item))
            }
            Quantifier::ForAnyValue => {
                scalar_values(value).iter().any(|item| self.test.matches(allowed, item))
            }
        }
    }
}

/// Coerce a resolved context value to the set of scalars a quantifier ranges over.
fn scalar_values(value: &ContextValue) -> Vec<ContextValue> {
    match value {
        ContextValue::Null => vec![],
        ContextValue::StringList(items) => items.iter().map(|item| ContextValue::String(item.clone())).collect(),
        other => vec![other.clone()],
    }
}

impl PartialEq for ConditionOp {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for ConditionOp {}

impl Hash for ConditionOp {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl Borrow<str> for ConditionOp {
    fn borrow(&self) -> &str {
        &self.raw
    }
}

impl PartialOrd for ConditionOp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ConditionOp {
    fn cmp(&self, other: &Self) -> Ordering {
        self.raw.cmp(&other.raw)
    }
}

impl Display for ConditionOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for ConditionOp {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        ConditionOp::from_str(&s).map_err(serde::de::Error::custom)
    }
}

impl Serialize for ConditionOp {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.raw)
    }
}

impl FromStr for ConditionOp {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (quantifier, base) = if let Some(base) = s.strip_prefix("ForAllValues:") {
            (Quantifier::ForAllValues, base)
        } else if let Some(base) = s.strip_prefix("ForAnyValue:") {
            (Quantifier::ForAnyValue, base)
        } else {
            (Quantifier::None, s)
        };

        let test = parse_test(base).ok_or_else(|| EngineError::InvalidConditionOperator(s.to_string()))?;

        Ok(Self {
            raw: s.to_string(),
            quantifier,
            test,
        })
    }
}

fn parse_test(s: &str) -> Option<OpTest> {
    match s {
        "ArnEquals" => Some(OpTest::Arn(ArnCmp::Equals, Variant::None)),
        "ArnEqualsIfExists" => Some(OpTest::Arn(ArnCmp::Equals, Variant::IfExists)),
        "ArnNotEquals" => Some(OpTest::Arn(ArnCmp::Equals, Variant::Negated)),
        "ArnNotEqualsIfExists" => Some(OpTest::Arn(ArnCmp::Equals, Variant::IfExistsNegated)),
        "ArnLike" => Some(OpTest::Arn(ArnCmp::Like, Variant::None)),
        "ArnLikeIfExists" => Some(OpTest::Arn(ArnCmp::Like, Variant::IfExists)),
        "ArnNotLike" => Some(OpTest::Arn(ArnCmp::Like, Variant::Negated)),
        "ArnNotLikeIfExists" => Some(OpTest::Arn(ArnCmp::Like, Variant::IfExistsNegated)),
        "BinaryEquals" => Some(OpTest::Binary(Variant::None)),
        "BinaryEqualsIfExists" => Some(OpTest::Binary(Variant::IfExists)),
        "Bool" => Some(OpTest::Bool(Variant::None)),
        "BoolIfExists" => Some(OpTest::Bool(Variant::IfExists)),
        "DateEquals" => Some(OpTest::Date(DateCmp::Equals, Variant::None)),
        "DateEqualsIfExists" => Some(OpTest::Date(DateCmp::Equals, Variant::IfExists)),
        "DateNotEquals" => Some(OpTest::Date(DateCmp::Equals, Variant::Negated)),
        "DateNotEqualsIfExists" => Some(OpTest::Date(DateCmp::Equals, Variant::IfExistsNegated)),
        "DateLessThan" => Some(OpTest::Date(DateCmp::LessThan, Variant::None)),
        "DateLessThanIfExists" => Some(OpTest::Date(DateCmp::LessThan, Variant::IfExists)),
        "DateGreaterThanEquals" => Some(OpTest::Date(DateCmp::LessThan, Variant::Negated)),
        "DateGreaterThanEqualsIfExists" => Some(OpTest::Date(DateCmp::LessThan, Variant::IfExistsNegated)),
        "DateLessThanEquals" => Some(OpTest::Date(DateCmp::LessThanEquals, Variant::None)),
        "DateLessThanEqualsIfExists" => Some(OpTest::Date(DateCmp::LessThanEquals, Variant::IfExists)),
        "DateGreaterThan" => Some(OpTest::Date(DateCmp::LessThanEquals, Variant::Negated)),
        "DateGreaterThanIfExists" => Some(OpTest::Date(DateCmp::LessThanEquals, Variant::IfExistsNegated)),
        "IpAddress" => Some(OpTest::IpAddress(Variant::None)),
        "IpAddressIfExists" => Some(OpTest::IpAddress(Variant::IfExists)),
        "NotIpAddress" => Some(OpTest::IpAddress(Variant::Negated)),
        "NotIpAddressIfExists" => Some(OpTest::IpAddress(Variant::IfExistsNegated)),
        "Null" => Some(OpTest::Null),
        "NumericEquals" => Some(OpTest::Numeric(NumericCmp::Equals, Variant::None)),
        "NumericEqualsIfExists" => Some(OpTest::Numeric(NumericCmp::Equals, Variant::IfExists)),
        "NumericNotEquals" => Some(OpTest::Numeric(NumericCmp::Equals, Variant::Negated)),
        "NumericNotEqualsIfExists" => Some(OpTest::Numeric(NumericCmp::Equals, Variant::IfExistsNegated)),
        "NumericLessThan" => Some(OpTest::Numeric(NumericCmp::LessThan, Variant::None)),
        "NumericLessThanIfExists" => Some(OpTest::Numeric(NumericCmp::LessThan, Variant::IfExists)),
        "NumericGreaterThanEquals" => Some(OpTest::Numeric(NumericCmp::LessThan, Variant::Negated)),
        "NumericGreaterThanEqualsIfExists" => Some(OpTest::Numeric(NumericCmp::LessThan, Variant::IfExistsNegated)),
        "NumericLessThanEquals" => Some(OpTest::Numeric(NumericCmp::LessThanEquals, Variant::None)),
        "NumericLessThanEqualsIfExists" => Some(OpTest::Numeric(NumericCmp::LessThanEquals, Variant::IfExists)),
        "NumericGreaterThan" => Some(OpTest::Numeric(NumericCmp::LessThanEquals, Variant::Negated)),
        "NumericGreaterThanIfExists" => Some(OpTest::Numeric(NumericCmp::LessThanEquals, Variant::IfExistsNegated)),
        "StringEquals" => Some(OpTest::String(StringCmp::Equals, Variant::None)),
        "StringEqualsIfExists" => Some(OpTest::String(StringCmp::Equals, Variant::IfExists)),
        "StringNotEquals" => Some(OpTest::String(StringCmp::Equals, Variant::Negated)),
        "StringNotEqualsIfExists" => Some(OpTest::String(StringCmp::Equals, Variant::IfExistsNegated)),
        "StringEqualsIgnoreCase" => Some(OpTest::String(StringCmp::EqualsIgnoreCase, Variant::None)),
        "StringEqualsIgnoreCaseIfExists" => Some(OpTest::String(StringCmp::EqualsIgnoreCase, Variant::IfExists)),
        "StringNotEqualsIgnoreCase" => Some(OpTest::String(StringCmp::EqualsIgnoreCase, Variant::Negated)),
        "StringNotEqualsIgnoreCaseIfExists" => {
            Some(OpTest::String(StringCmp::EqualsIgnoreCase, Variant::IfExistsNegated))
        }
        "StringLike" => Some(OpTest::String(StringCmp::Like, Variant::None)),
        "StringLikeIfExists" => Some(OpTest::String(StringCmp::Like, Variant::IfExists)),
        "StringNotLike" => Some(OpTest::String(StringCmp::Like, Variant::Negated)),
        "StringNotLikeIfExists" => Some(OpTest::String(StringCmp::Like, Variant::IfExistsNegated)),
        _ => None,
    }
}
