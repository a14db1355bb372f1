use {
    super::variant::Variant,
    crate::{context::ContextValue, glob::glob_matches, serutil::StringList},
};

/// ARN operation names.
///
/// The order is important here. For a given operation, the if-exists variant must follow, then the negated
/// variant, then the negated if-exists variant.
pub(super) const ARN_DISPLAY_NAMES: [&str; 8] = [
    "ArnEquals",
    "ArnEqualsIfExists",
    "ArnNotEquals",
    "ArnNotEqualsIfExists",
    "ArnLike",
    "ArnLikeIfExists",
    "ArnNotLike",
    "ArnNotLikeIfExists",
];

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[repr(u8)]
pub enum ArnCmp {
    Equals = 0,
    Like = 4,
}

impl ArnCmp {
    pub(super) fn display_name(&self, variant: &Variant) -> &'static str {
        ARN_DISPLAY_NAMES[*self as usize | variant.as_usize()]
    }
}

/// AWS treats `ArnEquals` identically to `ArnLike`, so both funnel through the glob matcher.
pub(super) fn arn_match(allowed: &StringList, value: &ContextValue, _cmp: ArnCmp, variant: Variant) -> bool {
    let value = match value {
        ContextValue::Null => return variant.if_exists(),
        ContextValue::String(value) => value.as_str(),
        _ => return false,
    };

    let any_match = allowed.iter().any(|el| glob_matches(el, value));
    any_match != variant.negated()
}
