use {
    super::variant::Variant,
    crate::{context::ContextValue, serutil::StringList},
};

/// Boolean operation names.
pub(super) const BOOL_DISPLAY_NAMES: [&str; 2] = ["Bool", "BoolIfExists"];

/// A missing value behaves like an unset boolean flag: `BoolIfExists` passes outright, the plain operator
/// compares against `false`.
pub(super) fn bool_match(allowed: &StringList, value: &ContextValue, variant: Variant) -> bool {
    let value = match value {
        ContextValue::Null => {
            if variant.if_exists() {
                return true;
            }
            false
        }
        ContextValue::Bool(value) => *value,
        ContextValue::String(value) => match value.to_lowercase().as_str() {
            "true" => true,
            "false" => false,
            _ => return false,
        },
        _ => return false,
    };

    allowed.iter().any(|el| match el.as_str() {
        "true" => value,
        "false" => !value,
        _ => false,
    })
}
