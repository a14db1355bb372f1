use {
    serde::{
        de::{
            value::{MapAccessDeserializer, SeqAccessDeserializer},
            Deserializer, IntoDeserializer, MapAccess, SeqAccess, Visitor,
        },
        ser::{SerializeSeq, Serializer},
        Deserialize, Serialize,
    },
    std::{
        fmt::{Display, Formatter, Result as FmtResult},
        marker::PhantomData,
        ops::Index,
        slice::Iter,
    },
};

/// Implement Display for a given class by formatting it as pretty-printed JSON.
#[macro_export]
macro_rules! display_json {
    ($cls:ident) => {
        impl std::fmt::Display for $cls {
            fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                let buf = Vec::new();
                let serde_formatter = ::serde_json::ser::PrettyFormatter::with_indent(b"    ");
                let mut ser = ::serde_json::Serializer::with_formatter(buf, serde_formatter);
                match self.serialize(&mut ser) {
                    Ok(()) => (),
                    Err(e) => {
                        ::log::error!("Failed to serialize: {}", e);
                        return Err(::std::fmt::Error {});
                    }
                };
                match std::str::from_utf8(&ser.into_inner()) {
                    Ok(s) => write!(f, "{}", s),
                    Err(e) => {
                        ::log::error!("JSON serialization contained non-UTF-8 characters: {}", e);
                        Err(::std::fmt::Error {})
                    }
                }
            }
        }
    };
}

/// Implement FromStr for a given class by parsing it as JSON.
#[macro_export]
macro_rules! from_str_json {
    ($cls:ident) => {
        impl ::std::str::FromStr for $cls {
            type Err = ::serde_json::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match ::serde_json::from_str::<Self>(s) {
                    Ok(result) => Ok(result),
                    Err(e) => {
                        ::log::debug!("Failed to parse: {}: {:?}", s, e);
                        Err(e)
                    }
                }
            }
        }
    };
}

/// How a list-like element was represented in the source JSON.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum JsonRep {
    /// A bare element (`"s3:GetObject"`).
    Single,

    /// A JSON array of elements (`["s3:GetObject"]`).
    List,
}

/// A policy element that may be written as either a single value or a list of values.
///
/// Policy JSON allows `Action`, `Resource`, condition values, principal identifier lists, and `Statement` itself to
/// be encoded either way; `StringLikeList` preserves the original representation so documents round-trip.
#[derive(Clone, Debug)]
pub struct StringLikeList<T> {
    kind: JsonRep,
    items: Vec<T>,
}

impl<T> StringLikeList<T> {
    /// The JSON representation this list was created from.
    #[inline]
    pub fn kind(&self) -> JsonRep {
        self.kind
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn iter(&self) -> Iter<'_, T> {
        self.items.iter()
    }

    pub fn to_vec(&self) -> Vec<&T> {
        self.items.iter().collect()
    }
}

impl<T> From<T> for StringLikeList<T> {
    fn from(item: T) -> Self {
        Self {
            kind: JsonRep::Single,
            items: vec![item],
        }
    }
}

impl<T> From<Vec<T>> for StringLikeList<T> {
    fn from(items: Vec<T>) -> Self {
        Self {
            kind: JsonRep::List,
            items,
        }
    }
}

impl<T> Index<usize> for StringLikeList<T> {
    type Output = T;

    fn index(&self, index: usize) -> &Self::Output {
        &self.items[index]
    }
}

impl<'a, T> IntoIterator for &'a StringLikeList<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// Equality ignores the representation: a single element equals a one-element list.
impl<T: PartialEq> PartialEq for StringLikeList<T> {
    fn eq(&self, other: &Self) -> bool {
        self.items == other.items
    }
}

impl<T: Eq> Eq for StringLikeList<T> {}

impl<T: Display> Display for StringLikeList<T> {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        if self.kind == JsonRep::Single && self.items.len() == 1 {
            write!(f, "{}", self.items[0])
        } else {
            let mut first = true;
            f.write_str("[")?;
            for item in &self.items {
                if first {
                    first = false;
                } else {
                    f.write_str(", ")?;
                }
                write!(f, "{}", item)?;
            }
            f.write_str("]")
        }
    }
}

struct StringLikeListVisitor<T> {
    phantom: PhantomData<T>,
}

impl<'de, T: Deserialize<'de>> Visitor<'de> for StringLikeListVisitor<T> {
    type Value = StringLikeList<T>;

    fn expecting(&self, f: &mut Formatter) -> FmtResult {
        write!(f, "a string or a list of strings")
    }

    fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<Self::Value, E> {
        Ok(StringLikeList {
            kind: JsonRep::Single,
            items: vec![T::deserialize(v.into_deserializer())?],
        })
    }

    fn visit_map<A: MapAccess<'de>>(self, access: A) -> Result<Self::Value, A::Error> {
        Ok(StringLikeList {
            kind: JsonRep::Single,
            items: vec![T::deserialize(MapAccessDeserializer::new(access))?],
        })
    }

    fn visit_seq<A: SeqAccess<'de>>(self, access: A) -> Result<Self::Value, A::Error> {
        let items = Vec::<T>::deserialize(SeqAccessDeserializer::new(access))?;
        Ok(StringLikeList {
            kind: JsonRep::List,
            items,
        })
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for StringLikeList<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(StringLikeListVisitor {
            phantom: PhantomData,
        })
    }
}

impl<T: Serialize> Serialize for StringLikeList<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.kind == JsonRep::Single && self.items.len() == 1 {
            self.items[0].serialize(serializer)
        } else {
            let mut seq = serializer.serialize_seq(Some(self.items.len()))?;
            for item in &self.items {
                seq.serialize_element(item)?;
            }
            seq.end()
        }
    }
}

/// A list of plain strings in single-or-list representation.
pub type StringList = StringLikeList<String>;
