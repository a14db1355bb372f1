use {
    super::variant::Variant,
    crate::{context::ContextValue, glob::glob_matches, serutil::StringList},
};

/// String operation names.
pub(super) const STRING_DISPLAY_NAMES: [&str; 12] = [
    "StringEquals",
    "StringEqualsIfExists",
    "StringNotEquals",
    "StringNotEqualsIfExists",
    "StringEqualsIgnoreCase",
    "StringEqualsIgnoreCaseIfExists",
    "StringNotEqualsIgnoreCase",
    "StringNotEqualsIgnoreCaseIfExists",
    "StringLike",
    "StringLikeIfExists",
    "StringNotLike",
    "StringNotLikeIfExists",
];

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[repr(u8)]
pub enum StringCmp {
    Equals = 0,
    EqualsIgnoreCase = 4,
    Like = 8,
}

impl StringCmp {
    pub(super) fn display_name(&self, variant: &Variant) -> &'static str {
        STRING_DISPLAY_NAMES[*self as usize | variant.as_usize()]
    }
}

pub(super) fn string_match(allowed: &StringList, value: &ContextValue, cmp: StringCmp, variant: Variant) -> bool {
    let value = match value {
        ContextValue::Null => return variant.if_exists(),
        ContextValue::String(value) => value.as_str(),
        ContextValue::Bool(value) => {
            if *value {
                "true"
            } else {
                "false"
            }
        }
        _ => return false,
    };

    let any_match = allowed.iter().any(|el| match cmp {
        StringCmp::Equals => el == value,
        StringCmp::EqualsIgnoreCase => el.to_lowercase() == value.to_lowercase(),
        StringCmp::Like => glob_matches(el, value),
    });

    any_match != variant.negated()
}
