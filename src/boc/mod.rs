//! BOC (Bag Of Cells) implementation.

use crate::cell::Cell;

#[cfg(feature = "serde")]
pub use self::serde::BocRepr;

/// BOC decoder implementation.
pub mod de;
/// BOC encoder implementation.
pub mod ser;

mod fift;
#[cfg(feature = "serde")]
mod serde;

#[cfg(test)]
mod tests;

/// BOC file magic number.
#[derive(Default, Debug, Copy, Clone, Eq, PartialEq)]
pub enum BocTag {
    /// Single root, cells index, no CRC32.
    Indexed,
    /// Single root, cells index, with CRC32.
    IndexedCrc32,
    /// Multiple roots, optional cells index, optional CRC32.
    #[default]
    Generic,
}

impl BocTag {
    const INDEXED: [u8; 4] = [0x68, 0xff, 0x65, 0xf3];
    const INDEXED_CRC32: [u8; 4] = [0xac, 0xc3, 0xa7, 0x28];
    const GENERIC: [u8; 4] = [0xb5, 0xee, 0x9c, 0x72];

    /// Generic flags byte: offsets index table is present.
    pub const FLAG_HAS_INDEX: u8 = 0x80;
    /// Generic flags byte: CRC32C is appended.
    pub const FLAG_HAS_CRC: u8 = 0x40;
    /// Generic flags byte: index cache bits are present.
    pub const FLAG_HAS_CACHE_BITS: u8 = 0x20;
    /// Generic flags byte: cell reference size in bytes.
    pub const REF_SIZE_MASK: u8 = 0x07;

    /// Tries to match bytes with BOC tag.
    pub const fn from_bytes(data: [u8; 4]) -> Option<Self> {
        match data {
            Self::GENERIC => Some(Self::Generic),
            Self::INDEXED_CRC32 => Some(Self::IndexedCrc32),
            Self::INDEXED => Some(Self::Indexed),
            _ => None,
        }
    }

    /// Converts BOC tag to bytes.
    pub const fn to_bytes(self) -> [u8; 4] {
        match self {
            Self::Indexed => Self::INDEXED,
            Self::IndexedCrc32 => Self::INDEXED_CRC32,
            Self::Generic => Self::GENERIC,
        }
    }
}

/// BOC (Bag Of Cells) helper.
pub struct Boc;

impl Boc {
    /// Encodes the specified cell tree as BOC with the default options.
    pub fn encode(cell: &Cell) -> Vec<u8> {
        let mut result = Vec::new();
        ser::BocHeader::with_root(cell, ser::Options::default()).encode(&mut result);
        result
    }

    /// Encodes the specified cell tree as BOC and returns a hex string.
    #[inline]
    pub fn encode_hex(cell: &Cell) -> String {
        hex::encode(Self::encode(cell))
    }

    /// Encodes the specified cell tree as BOC and returns a base64 string.
    #[inline]
    pub fn encode_base64(cell: &Cell) -> String {
        crate::util::encode_base64(Self::encode(cell))
    }

    /// Encodes up to [`ser::MAX_ROOTS`] cell trees into one container.
    pub fn encode_roots(roots: &[Cell], options: ser::Options) -> Result<Vec<u8>, Error> {
        let header = ok!(ser::BocHeader::new(roots, options));
        tracing::debug!(
            roots = roots.len(),
            cells = header.cell_count(),
            with_index = options.with_index,
            with_crc = options.with_crc,
            "encoding boc"
        );

        let mut result = Vec::new();
        header.encode(&mut result);
        Ok(result)
    }

    /// Renders the roots as indented fift hex trees separated by newlines.
    pub fn encode_fift(roots: &[Cell]) -> String {
        roots
            .iter()
            .map(|root| root.display_tree().to_string())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Decodes a single-root BOC.
    pub fn decode<T: AsRef<[u8]>>(data: T) -> Result<Cell, Error> {
        let mut roots = ok!(Self::decode_roots(data, &de::Options::default()));
        match roots.pop() {
            Some(root) if roots.is_empty() => Ok(root),
            _ => Err(Error::InvalidRootCount),
        }
    }

    /// Decodes a single-root BOC from a hex string.
    pub fn decode_hex<T: AsRef<[u8]>>(data: T) -> Result<Cell, Error> {
        match hex::decode(data) {
            Ok(data) => Self::decode(data),
            Err(_) => Err(Error::UnrecognizedFormat),
        }
    }

    /// Decodes a single-root BOC from a base64 string.
    pub fn decode_base64<T: AsRef<[u8]>>(data: T) -> Result<Cell, Error> {
        match crate::util::decode_base64(data) {
            Ok(data) => Self::decode(data),
            Err(_) => Err(Error::UnrecognizedFormat),
        }
    }

    /// Decodes all roots of a BOC.
    pub fn decode_roots<T: AsRef<[u8]>>(data: T, options: &de::Options) -> Result<Vec<Cell>, Error> {
        fn decode_roots_impl(data: &[u8], options: &de::Options) -> Result<Vec<Cell>, Error> {
            let header = ok!(de::BocHeader::decode(data, options));
            let cells = ok!(header.finalize(options.check_merkle_proofs));

            let mut roots = Vec::with_capacity(header.roots().len());
            for index in header.roots() {
                match cells.get(*index) {
                    Some(root) => roots.push(root),
                    None => return Err(Error::RootOutOfBounds),
                }
            }

            tracing::debug!(
                roots = roots.len(),
                cells = header.cells().len(),
                ref_size = header.ref_size(),
                has_crc = header.has_crc(),
                "decoded boc"
            );
            Ok(roots)
        }
        decode_roots_impl(data.as_ref(), options)
    }

    /// Parses an indented fift hex dump into root cells.
    #[inline]
    pub fn decode_fift(s: &str) -> Result<Vec<Cell>, Error> {
        fift::parse(s)
    }

    /// Decodes roots from a string in one of the supported textual forms.
    ///
    /// Fift dumps start with `x{`, then hex and base64 are tried in order.
    pub fn decode_str(s: &str, options: &de::Options) -> Result<Vec<Cell>, Error> {
        let s = s.trim();

        if s.starts_with("x{") {
            tracing::trace!("decoding fift dump");
            if options.check_merkle_proofs {
                return Err(Error::UnsupportedOperation);
            }
            return Self::decode_fift(s);
        }

        if let Ok(data) = hex::decode(s) {
            tracing::trace!("decoding hex boc");
            return Self::decode_roots(data, options);
        }

        if let Ok(data) = crate::util::decode_base64(s) {
            tracing::trace!("decoding base64 boc");
            return Self::decode_roots(data, options);
        }

        Err(Error::UnrecognizedFormat)
    }
}

/// Error type for BOC related errors.
#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
pub enum Error {
    /// EOF encountered during another operation.
    #[error("unexpected EOF")]
    UnexpectedEof,
    /// Invalid magic bytes.
    #[error("unknown BOC tag")]
    UnknownBocTag,
    /// Invalid BOC header.
    #[error("invalid header")]
    InvalidHeader,
    /// References size is greater than 4.
    #[error("ref index does not fit in `u32` type")]
    InvalidRefSize,
    /// Cell offset size is greater than 8.
    #[error("cell offset does not fit in `usize` type")]
    InvalidOffsetSize,
    /// Root cells count is zero.
    #[error("root cell not found")]
    RootCellNotFound,
    /// Specified BOC tag doesn't support multiple roots.
    #[error("unexpected multiple roots")]
    UnexpectedMultipleRoots,
    /// The number of roots in the header is greater than allowed.
    #[error("too many root cells")]
    TooManyRootCells,
    /// The number of roots in the header is less than allowed.
    #[error("too few root cells")]
    TooFewRootCells,
    /// Absent cells are legacy therefore not supported.
    #[error("absent cells are not supported")]
    AbsentCellsNotSupported,
    /// Total cells size mismatch.
    #[error("invalid total cells size")]
    InvalidTotalSize,
    /// Invalid root cell index.
    #[error("root index out of bounds")]
    RootOutOfBounds,
    /// Invalid child reference.
    #[error("cell ref count not in range 0..=4")]
    InvalidRef,
    /// Suboptimal cells are treated as error.
    #[error("unnormalized cell")]
    UnnormalizedCell,
    /// Possible graph loop detected.
    #[error("invalid children order")]
    InvalidRefOrder,
    /// Stored checksum doesn't match the computed one.
    #[error("checksum mismatch")]
    ChecksumMismatch,
    /// A cell record can't be finalized.
    #[error("invalid cell: {0}")]
    InvalidCell(#[source] crate::error::Error),
    /// Malformed fift hex dump.
    #[error("invalid fift dump")]
    InvalidFift,
    /// Input is neither fift, hex nor base64.
    #[error("unrecognized BOC format")]
    UnrecognizedFormat,
    /// Operation is not available for this input form.
    #[error("unsupported operation")]
    UnsupportedOperation,
    /// Unexpected number of roots.
    #[error("invalid root count")]
    InvalidRootCount,
}
