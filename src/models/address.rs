//! Account address.

use std::str::FromStr;

use crate::cell::{CellBuilder, CellSlice, Load, Store};
use crate::error::{Error, ParseAddrError};
use crate::util::{crc_16, decode_base64, encode_base64, encode_base64_url};

const FLAG_BOUNCEABLE: u8 = 0x11;
const FLAG_NON_BOUNCEABLE: u8 = 0x51;
const FLAG_TEST_ONLY: u8 = 0x80;

/// Standard internal address (`addr_std` without anycast).
///
/// Flags are only used by the user-friendly representation and are not
/// taken into account when comparing addresses.
#[derive(Clone, Copy)]
pub struct Address {
    /// Workchain id (one-byte range).
    pub workchain: i8,
    /// Account id.
    pub hash: [u8; 32],
    /// Whether the user-friendly form is bounceable.
    pub bounceable: bool,
    /// Whether the user-friendly form is for testnet only.
    pub test_only: bool,
}

impl Address {
    /// The number of data bits that address occupies.
    ///
    /// - 2 bits id (`0b10`)
    /// - 1 bit Maybe None
    /// - 8 bits workchain
    /// - 256 bits address
    pub const BITS: u16 = 2 + 1 + 8 + 256;

    /// Length of the decoded user-friendly address.
    const ENCODED_LEN: usize = 36;

    /// Constructs a new non-bounceable address.
    #[inline]
    pub const fn new(workchain: i8, hash: [u8; 32]) -> Self {
        Self {
            workchain,
            hash,
            bounceable: false,
            test_only: false,
        }
    }

    /// Returns a copy of this address with the specified flags.
    #[inline]
    pub const fn with_flags(mut self, bounceable: bool, test_only: bool) -> Self {
        self.bounceable = bounceable;
        self.test_only = test_only;
        self
    }

    /// Parses `<workchain>:<hex account id>`.
    pub fn from_raw_str(s: &str) -> Result<Self, ParseAddrError> {
        let Some((workchain, hash)) = s.split_once(':') else {
            return Err(ParseAddrError::UnrecognizedFormat);
        };

        let Ok(workchain) = workchain.parse::<i8>() else {
            return Err(ParseAddrError::InvalidWorkchain);
        };

        let mut result = Self::new(workchain, [0; 32]);
        match hex::decode_to_slice(hash, &mut result.hash) {
            Ok(()) => Ok(result),
            Err(_) => Err(ParseAddrError::InvalidAccountId),
        }
    }

    /// Parses a 48-character user-friendly address (either alphabet).
    pub fn from_base64_str(s: &str) -> Result<Self, ParseAddrError> {
        let Ok(bytes) = decode_base64(s) else {
            return Err(ParseAddrError::UnrecognizedFormat);
        };
        let bytes: [u8; Self::ENCODED_LEN] = match bytes.try_into() {
            Ok(bytes) => bytes,
            Err(_) => return Err(ParseAddrError::UnrecognizedFormat),
        };

        let crc = crc_16(&bytes[..34]);
        if bytes[34..] != crc.to_be_bytes() {
            return Err(ParseAddrError::ChecksumMismatch);
        }

        let (bounceable, test_only) = ok!(decode_tag(bytes[0]));

        let mut hash = [0u8; 32];
        hash.copy_from_slice(&bytes[2..34]);

        Ok(Self {
            workchain: bytes[1] as i8,
            hash,
            bounceable,
            test_only,
        })
    }

    /// Returns the user-friendly representation.
    pub fn to_base64(&self, format: &AddressFormat) -> String {
        let bounceable = format.bounceable.unwrap_or(self.bounceable);
        let test_only = format.test_only.unwrap_or(self.test_only);
        let workchain = format.workchain.unwrap_or(self.workchain);

        let mut tag = if bounceable {
            FLAG_BOUNCEABLE
        } else {
            FLAG_NON_BOUNCEABLE
        };
        if test_only {
            tag |= FLAG_TEST_ONLY;
        }

        let mut bytes = [0u8; Self::ENCODED_LEN];
        bytes[0] = tag;
        bytes[1] = workchain as u8;
        bytes[2..34].copy_from_slice(&self.hash);
        let crc = crc_16(&bytes[..34]);
        bytes[34..].copy_from_slice(&crc.to_be_bytes());

        if format.url_safe {
            encode_base64_url(bytes)
        } else {
            encode_base64(bytes)
        }
    }

    /// Returns a helper to display the raw `<workchain>:<hex>` form.
    #[inline]
    pub fn display_raw(&self) -> DisplayRawAddress<'_> {
        DisplayRawAddress(self)
    }
}

fn decode_tag(tag: u8) -> Result<(bool, bool), ParseAddrError> {
    let test_only = tag & FLAG_TEST_ONLY != 0;
    match tag & !FLAG_TEST_ONLY {
        FLAG_BOUNCEABLE => Ok((true, test_only)),
        FLAG_NON_BOUNCEABLE => Ok((false, test_only)),
        _ => Err(ParseAddrError::InvalidTag),
    }
}

fn is_base64_like(s: &str) -> bool {
    let url_safe = s
        .bytes()
        .all(|c| c.is_ascii_alphanumeric() || c == b'-' || c == b'_');
    let standard = s
        .bytes()
        .all(|c| c.is_ascii_alphanumeric() || c == b'+' || c == b'/');
    s.len() == 48 && (url_safe || standard)
}

/// Overrides for the user-friendly address representation.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct AddressFormat {
    /// Use `-` and `_` instead of `+` and `/`.
    pub url_safe: bool,
    pub bounceable: Option<bool>,
    pub test_only: Option<bool>,
    pub workchain: Option<i8>,
}

impl Default for AddressFormat {
    #[inline]
    fn default() -> Self {
        Self {
            url_safe: true,
            bounceable: None,
            test_only: None,
            workchain: None,
        }
    }
}

impl Eq for Address {}
impl PartialEq for Address {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.workchain == other.workchain && self.hash == other.hash
    }
}

impl std::hash::Hash for Address {
    #[inline]
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.workchain.hash(state);
        self.hash.hash(state);
    }
}

impl std::fmt::Debug for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Address")
            .field("workchain", &self.workchain)
            .field("hash", &hex::encode(self.hash))
            .field("bounceable", &self.bounceable)
            .field("test_only", &self.test_only)
            .finish()
    }
}

/// Displays the address in the url-safe user-friendly form.
impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_base64(&AddressFormat::default()))
    }
}

impl FromStr for Address {
    type Err = ParseAddrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if is_base64_like(s) {
            Self::from_base64_str(s)
        } else if s.contains(':') {
            Self::from_raw_str(s)
        } else {
            Err(ParseAddrError::UnrecognizedFormat)
        }
    }
}

pub struct DisplayRawAddress<'a>(&'a Address);

impl std::fmt::Display for DisplayRawAddress<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.0.workchain, hex::encode(self.0.hash))
    }
}

/// Stored as `MsgAddressInt`.
impl Store for Address {
    #[inline]
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        builder.store_address(Some(self))
    }
}

/// Loaded from `MsgAddressInt`, `addr_none$00` is rejected.
impl Load for Address {
    fn load_from(slice: &mut CellSlice) -> Result<Self, Error> {
        match ok!(slice.preload_address()) {
            Some(address) => {
                ok!(slice.skip_bits(Self::BITS));
                Ok(address)
            }
            None => Err(Error::InvalidAddressTag),
        }
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Address {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::Serialize;

        if serializer.is_human_readable() {
            serializer.collect_str(self)
        } else {
            (self.workchain, &self.hash, self.bounceable, self.test_only).serialize(serializer)
        }
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Address {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::{Error, Unexpected, Visitor};

        struct AddressVisitor;

        impl<'de> Visitor<'de> for AddressVisitor {
            type Value = Address;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str("an address")
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: Error,
            {
                Address::from_str(value).map_err(Error::custom)
            }

            fn visit_bytes<E>(self, v: &[u8]) -> Result<Self::Value, E>
            where
                E: Error,
            {
                let Ok(string) = std::str::from_utf8(v) else {
                    return Err(Error::invalid_value(Unexpected::Bytes(v), &self));
                };
                self.visit_str(string)
            }
        }

        if deserializer.is_human_readable() {
            deserializer.deserialize_str(AddressVisitor)
        } else {
            let (workchain, hash, bounceable, test_only): (i8, [u8; 32], bool, bool) =
                serde::Deserialize::deserialize(deserializer)?;
            Ok(Address::new(workchain, hash).with_flags(bounceable, test_only))
        }
    }
}
