use {
    super::variant::Variant,
    crate::{context::ContextValue, serutil::StringList},
    chrono::{DateTime, TimeZone, Utc},
    std::str::FromStr,
};

/// Date operation names.
pub(super) const DATE_DISPLAY_NAMES: [&str; 12] = [
    "DateEquals",
    "DateEqualsIfExists",
    "DateNotEquals",
    "DateNotEqualsIfExists",
    "DateLessThan",
    "DateLessThanIfExists",
    "DateGreaterThanEquals",
    "DateGreaterThanEqualsIfExists",
    "DateLessThanEquals",
    "DateLessThanEqualsIfExists",
    "DateGreaterThan",
    "DateGreaterThanIfExists",
];

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[repr(u8)]
pub enum DateCmp {
    Equals = 0,
    LessThan = 4,
    LessThanEquals = 8,
}

impl DateCmp {
    pub(super) fn display_name(&self, variant: &Variant) -> &'static str {
        DATE_DISPLAY_NAMES[*self as usize | variant.as_usize()]
    }
}

/// Candidate values parse as RFC3339 timestamps or unix epoch seconds.
fn parse_candidate(el: &str) -> Option<DateTime<Utc>> {
    match DateTime::parse_from_rfc3339(el) {
        Ok(parsed) => Some(DateTime::<Utc>::from(parsed)),
        Err(_) => match i64::from_str(el) {
            Ok(unix_seconds) => Utc.timestamp_opt(unix_seconds, 0).single(),
            Err(_) => None,
        },
    }
}

pub(super) fn date_match(allowed: &StringList, value: &ContextValue, cmp: DateCmp, variant: Variant) -> bool {
    let value = match value {
        ContextValue::Null => return variant.if_exists(),
        ContextValue::Timestamp(value) => *value,
        ContextValue::String(value) => match DateTime::parse_from_rfc3339(value) {
            Ok(value) => DateTime::<Utc>::from(value),
            Err(_) => return variant.negated(),
        },
        _ => return false,
    };

    let fn_op = match cmp {
        DateCmp::Equals => |a: DateTime<Utc>, b: DateTime<Utc>| a == b,
        DateCmp::LessThan => |a: DateTime<Utc>, b: DateTime<Utc>| a < b,
        DateCmp::LessThanEquals => |a: DateTime<Utc>, b: DateTime<Utc>| a <= b,
    };

    let any_match = allowed.iter().any(|el| match parse_candidate(el) {
        Some(parsed) => fn_op(value, parsed),
        None => false,
    });

    any_match != variant.negated()
}
