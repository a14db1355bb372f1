use crate::{context::ContextValue, serutil::StringList};

/// Null operation name.
pub(super) const NULL_DISPLAY_NAME: &str = "Null";

/// `"true"` means the key must be absent; `"false"` means the key must be present.
pub(super) fn null_match(allowed: &StringList, value: &ContextValue) -> bool {
    let mut allowed_bools = Vec::with_capacity(2);

    for el in allowed.iter() {
        match el.as_str() {
            "true" => allowed_bools.push(true),
            "false" => allowed_bools.push(false),
            _ => (),
        }
    }

    allowed_bools.contains(&value.is_null())
}
