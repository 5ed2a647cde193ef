use std::borrow::Cow;

use ::serde::{Deserializer, Serialize, Serializer};

use super::Boc;
use crate::cell::{Cell, CellBuilder, Load, Store};

impl Serialize for Cell {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let boc = Boc::encode(self);
        if serializer.is_human_readable() {
            serializer.serialize_str(&crate::util::encode_base64(boc))
        } else {
            serializer.serialize_bytes(&boc)
        }
    }
}

impl<'de> ::serde::Deserialize<'de> for Cell {
    #[inline]
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Boc::deserialize(deserializer)
    }
}

impl Boc {
    /// Serializes cell into an encoded BOC (as base64 for human readable serializers).
    #[inline]
    pub fn serialize<S: Serializer>(cell: &Cell, serializer: S) -> Result<S::Ok, S::Error> {
        cell.serialize(serializer)
    }

    /// Deserializes cell from an encoded BOC (from base64 for human readable deserializers).
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Cell, D::Error>
    where
        D: Deserializer<'de>,
    {
        use ::serde::de::Error;

        let is_human_readable = deserializer.is_human_readable();
        let mut boc = ok!(borrow_cow_bytes(deserializer));

        if is_human_readable {
            match crate::util::decode_base64(boc) {
                Ok(bytes) => {
                    boc = Cow::Owned(bytes);
                }
                Err(_) => return Err(Error::custom("invalid base64 string")),
            }
        }

        match Boc::decode(boc) {
            Ok(cell) => Ok(cell),
            Err(e) => Err(Error::custom(e)),
        }
    }
}

/// Serde helper for types with a cell representation.
///
/// Use with `#[serde(with = "BocRepr")]`.
pub struct BocRepr;

impl BocRepr {
    /// Serializes the type into an encoded BOC (as base64 for human readable serializers).
    pub fn serialize<S, T>(data: &T, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        T: Store,
    {
        use ::serde::ser::Error;

        match CellBuilder::build_from(data) {
            Ok(cell) => cell.serialize(serializer),
            Err(e) => Err(Error::custom(e)),
        }
    }

    /// Deserializes the type from an encoded BOC (from base64 for human readable serializers).
    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: Load,
    {
        use ::serde::de::Error;

        let cell = ok!(Boc::deserialize(deserializer));
        let mut slice = cell.as_slice();
        let data = match T::load_from(&mut slice) {
            Ok(data) => data,
            Err(_) => return Err(Error::custom("failed to decode object from cells")),
        };
        if !slice.is_data_empty() || !slice.is_refs_empty() {
            return Err(Error::custom("unexpected data after the object"));
        }
        Ok(data)
    }
}

fn borrow_cow_bytes<'de: 'a, 'a, D>(deserializer: D) -> Result<Cow<'a, [u8]>, D::Error>
where
    D: Deserializer<'de>,
{
    use ::serde::de::{Error, Visitor};

    struct CowBytesVisitor;

    impl<'a> Visitor<'a> for CowBytesVisitor {
        type Value = Cow<'a, [u8]>;

        fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
            formatter.write_str("a byte array")
        }

        fn visit_str<E: Error>(self, v: &str) -> Result<Self::Value, E> {
            Ok(Cow::Owned(v.as_bytes().to_vec()))
        }

        fn visit_borrowed_str<E: Error>(self, v: &'a str) -> Result<Self::Value, E> {
            Ok(Cow::Borrowed(v.as_bytes()))
        }

        fn visit_string<E: Error>(self, v: String) -> Result<Self::Value, E> {
            Ok(Cow::Owned(v.into_bytes()))
        }

        fn visit_bytes<E: Error>(self, v: &[u8]) -> Result<Self::Value, E> {
            Ok(Cow::Owned(v.to_vec()))
        }

        fn visit_borrowed_bytes<E: Error>(self, v: &'a [u8]) -> Result<Self::Value, E> {
            Ok(Cow::Borrowed(v))
        }

        fn visit_byte_buf<E: Error>(self, v: Vec<u8>) -> Result<Self::Value, E> {
            Ok(Cow::Owned(v))
        }
    }

    deserializer.deserialize_bytes(CowBytesVisitor)
}
