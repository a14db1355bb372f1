use {
    super::variant::Variant,
    crate::{context::ContextValue, serutil::StringList},
    std::str::FromStr,
};

/// Numeric operation names.
pub(super) const NUMERIC_DISPLAY_NAMES: [&str; 12] = [
    "NumericEquals",
    "NumericEqualsIfExists",
    "NumericNotEquals",
    "NumericNotEqualsIfExists",
    "NumericLessThan",
    "NumericLessThanIfExists",
    "NumericGreaterThanEquals",
    "NumericGreaterThanEqualsIfExists",
    "NumericLessThanEquals",
    "NumericLessThanEqualsIfExists",
    "NumericGreaterThan",
    "NumericGreaterThanIfExists",
];

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[repr(u8)]
pub enum NumericCmp {
    Equals = 0,
    LessThan = 4,
    LessThanEquals = 8,
}

impl NumericCmp {
    pub(super) fn display_name(&self, variant: &Variant) -> &'static str {
        NUMERIC_DISPLAY_NAMES[*self as usize | variant.as_usize()]
    }
}

/// Both sides parse as 64-bit floats. A value that fails to parse matches nothing (which makes the negated
/// operations vacuously true).
pub(super) fn numeric_match(allowed: &StringList, value: &ContextValue, cmp: NumericCmp, variant: Variant) -> bool {
    let value = match value {
        ContextValue::Null => return variant.if_exists(),
        ContextValue::String(value) => match f64::from_str(value) {
            Ok(value) => value,
            Err(_) => return variant.negated(),
        },
        _ => return false,
    };

    let fn_op = match cmp {
        NumericCmp::Equals => |a: f64, b: f64| a == b,
        NumericCmp::LessThan => |a: f64, b: f64| a < b,
        NumericCmp::LessThanEquals => |a: f64, b: f64| a <= b,
    };

    let any_match = allowed.iter().any(|el| match f64::from_str(el) {
        Ok(parsed) => fn_op(value, parsed),
        Err(_) => false,
    });

    any_match != variant.negated()
}
