use {
    super::variant::Variant,
    crate::{context::ContextValue, serutil::StringList},
};

/// Binary operation names.
pub(super) const BINARY_DISPLAY_NAMES: [&str; 2] = ["BinaryEquals", "BinaryEqualsIfExists"];

/// Candidates are base64; the context value is compared byte-for-byte. There is no negated variant of this
/// family.
pub(super) fn binary_match(allowed: &StringList, value: &ContextValue, variant: Variant) -> bool {
    match value {
        ContextValue::Null => variant.if_exists(),
        ContextValue::String(value) => {
            for el in allowed.iter() {
                if let Ok(el) = base64::decode(el) {
                    if el == value.as_bytes() {
                        return true;
                    }
                }
            }

            false
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use {
        super::binary_match,
        crate::{condition::Variant, context::ContextValue, serutil::StringList},
    };

    #[test_log::test]
    fn test_binary() {
        let allowed = StringList::from(base64::encode("payload"));
        assert!(binary_match(&allowed, &ContextValue::from("payload"), Variant::None));
        assert!(!binary_match(&allowed, &ContextValue::from("other"), Variant::None));
        assert!(!binary_match(&allowed, &ContextValue::Null, Variant::None));
        assert!(binary_match(&allowed, &ContextValue::Null, Variant::IfExists));

        let junk = StringList::from("not!base64!".to_string());
        assert!(!binary_match(&junk, &ContextValue::from("payload"), Variant::None));
    }
}
