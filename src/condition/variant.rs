/// The variant on a condition operation: negation and/or the `IfExists` suffix.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[repr(u8)]
pub enum Variant {
    None = 0,
    IfExists = 1,
    Negated = 2,
    IfExistsNegated = 3,
}

impl Variant {
    #[inline]
    pub(super) fn as_usize(self) -> usize {
        self as usize
    }

    #[inline]
    pub(super) fn if_exists(self) -> bool {
        matches!(self, Self::IfExists | Self::IfExistsNegated)
    }

    #[inline]
    pub(super) fn negated(self) -> bool {
        matches!(self, Self::Negated | Self::IfExistsNegated)
    }
}

/// The set quantifier prefix on a condition operation.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Quantifier {
    None,

    /// `ForAllValues:` — every value of a multi-valued key must satisfy the operation; vacuously true when the
    /// key resolves to an empty set.
    ForAllValues,

    /// `ForAnyValue:` — at least one value of a multi-valued key must satisfy the operation.
    ForAnyValue,
}

impl Quantifier {
    pub(super) fn prefix(self) -> &'static str {
        match self {
            Self::None => "",
            Self::ForAllValues => "ForAllValues:",
            Self::ForAnyValue => "ForAnyValue:",
        }
    }
}
