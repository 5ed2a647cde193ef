//! General stuff.

use sha2::Digest;

use crate::error::Error;

/// Computes SHA-256 of the specified bytes.
#[inline]
pub fn sha256<T: AsRef<[u8]>>(data: T) -> [u8; 32] {
    sha2::Sha256::digest(data.as_ref()).into()
}

/// CRC32C (Castagnoli) checksum.
#[inline]
pub fn crc_32c<T: AsRef<[u8]>>(data: T) -> u32 {
    crc32c::crc32c(data.as_ref())
}

/// CRC16-XMODEM checksum (poly `0x1021`, init `0`).
pub fn crc_16(data: &[u8]) -> u16 {
    let mut crc: u32 = 0;
    for c in data {
        let t = c ^ ((crc >> 8) as u8);
        crc = (CRC16_TABLE[t as usize] ^ ((crc << 8) as u16)) as u32;
    }
    crc as u16
}

#[inline]
pub(crate) fn encode_base64<T: AsRef<[u8]>>(data: T) -> String {
    use base64::Engine;
    fn encode_base64_impl(data: &[u8]) -> String {
        base64::engine::general_purpose::STANDARD.encode(data)
    }
    encode_base64_impl(data.as_ref())
}

#[inline]
pub(crate) fn encode_base64_url<T: AsRef<[u8]>>(data: T) -> String {
    use base64::Engine;
    fn encode_base64_url_impl(data: &[u8]) -> String {
        base64::engine::general_purpose::URL_SAFE.encode(data)
    }
    encode_base64_url_impl(data.as_ref())
}

/// Decodes either standard or URL-safe padded base64.
pub(crate) fn decode_base64<T: AsRef<[u8]>>(data: T) -> Result<Vec<u8>, base64::DecodeError> {
    use base64::Engine;
    fn decode_base64_impl(data: &[u8]) -> Result<Vec<u8>, base64::DecodeError> {
        if data.iter().any(|c| matches!(c, b'-' | b'_')) {
            base64::engine::general_purpose::URL_SAFE.decode(data)
        } else {
            base64::engine::general_purpose::STANDARD.decode(data)
        }
    }
    decode_base64_impl(data.as_ref())
}

/// Appends a completion tag (a single `1` followed by zeros up to the byte boundary).
///
/// Byte-aligned data is returned unchanged.
pub fn augment(data: &[u8], bit_len: u16) -> Vec<u8> {
    let byte_len = (bit_len as usize).div_ceil(8);
    let mut result = data[..byte_len.min(data.len())].to_vec();
    result.resize(byte_len, 0);

    let rem = bit_len % 8;
    if let Some(last) = result.last_mut() {
        if rem != 0 {
            let tag_mask: u8 = 1 << (7 - rem);
            *last = (*last & !(tag_mask - 1)) | tag_mask;
        }
    }
    result
}

/// Strips the completion tag from the last byte and returns the remaining bit length.
///
/// The tag must lie within the last 7 bits.
pub fn rollback(data: &[u8]) -> Result<u16, Error> {
    let Some(&last) = data.last() else {
        return Err(Error::InvalidData);
    };
    if last & 0x7f == 0 {
        return Err(Error::InvalidData);
    }
    Ok(data.len() as u16 * 8 - last.trailing_zeros() as u16 - 1)
}

/// Returns the bit at the specified index (MSB first).
#[inline]
pub(crate) fn get_bit(data: &[u8], index: u16) -> bool {
    match data.get((index / 8) as usize) {
        Some(byte) => (byte >> (7 - index % 8)) & 1 != 0,
        None => false,
    }
}

/// A wrapper around arbitrary data with the specified bit length.
pub struct Bitstring<'a> {
    /// Underlying bytes (with or without termination bit).
    pub bytes: &'a [u8],
    /// Length of data in bits.
    pub bit_len: u16,
}

impl Bitstring<'_> {
    /// Parses a bitstring from a hex string.
    ///
    /// Returns the parsed data and the bit length.
    /// Tag bit is removed if present.
    pub fn from_hex_str(s: &str) -> Result<(Vec<u8>, u16), Error> {
        fn hex_char(c: u8) -> Result<u8, Error> {
            match c {
                b'A'..=b'F' => Ok(c - b'A' + 10),
                b'a'..=b'f' => Ok(c - b'a' + 10),
                b'0'..=b'9' => Ok(c - b'0'),
                _ => Err(Error::InvalidData),
            }
        }

        if !s.is_ascii() || s.len() > 128 * 2 + 1 {
            return Err(Error::InvalidData);
        }

        let s = s.as_bytes();
        let (mut s, with_tag) = match s.strip_suffix(b"_") {
            Some(s) => (s, true),
            None => (s, false),
        };

        let mut half_byte = None;
        if s.len() % 2 != 0 {
            if let Some((last, prefix)) = s.split_last() {
                half_byte = Some(ok!(hex_char(*last)));
                s = prefix;
            }
        }

        let Ok(mut data) = hex::decode(s) else {
            return Err(Error::InvalidData);
        };

        let mut bit_len = data.len() as u16 * 8;
        if let Some(half_byte) = half_byte {
            bit_len += 4;
            data.push(half_byte << 4);
        }

        if with_tag {
            bit_len = data.len() as u16 * 8;
            for byte in data.iter_mut().rev() {
                if *byte == 0 {
                    bit_len -= 8;
                } else {
                    let trailing = byte.trailing_zeros();
                    bit_len -= 1 + trailing as u16;

                    // NOTE: `trailing` is in range 0..=7,
                    // so we must split the shift in two parts.
                    *byte &= (0xff << trailing) << 1;
                    break;
                }
            }

            data.truncate((bit_len as usize).div_ceil(8));
        }

        if bit_len > 1023 {
            return Err(Error::InvalidData);
        }

        Ok((data, bit_len))
    }

    fn write_hex(&self, f: &mut std::fmt::Formatter<'_>, upper: bool) -> std::fmt::Result {
        let bit_len = std::cmp::min(self.bit_len as usize, self.bytes.len() * 8) as u16;
        let byte_len = (bit_len as usize).div_ceil(8);
        let bytes = &self.bytes[..byte_len];

        let rem = bit_len % 8;
        let (bytes, last_byte) = match bytes.split_last() {
            Some((last_byte, bytes)) if rem != 0 => {
                let tag_mask: u8 = 1 << (7 - rem);
                let data_mask = !(tag_mask - 1);
                let last_byte = (*last_byte & data_mask) | tag_mask;
                (bytes, Some(last_byte))
            }
            _ => (bytes, None),
        };

        let hex = if upper {
            hex::encode_upper(bytes)
        } else {
            hex::encode(bytes)
        };
        ok!(f.write_str(&hex));

        if let Some(mut last_byte) = last_byte {
            let tag = if rem != 4 { "_" } else { "" };
            let rem = 1 + (rem > 4) as usize;
            if rem == 1 {
                last_byte >>= 4;
            }
            if upper {
                ok!(write!(f, "{last_byte:0rem$X}{tag}"));
            } else {
                ok!(write!(f, "{last_byte:0rem$x}{tag}"));
            }
        }

        Ok(())
    }
}

impl std::fmt::Display for Bitstring<'_> {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.write_hex(f, false)
    }
}

impl std::fmt::UpperHex for Bitstring<'_> {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.write_hex(f, true)
    }
}

impl std::fmt::Binary for Bitstring<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let bit_len = std::cmp::min(self.bit_len as usize, self.bytes.len() * 8) as u16;
        let byte_len = (bit_len as usize).div_ceil(8);
        let bytes = &self.bytes[..byte_len];

        let rem = (bit_len % 8) as usize;
        let (bytes, last_byte) = match bytes.split_last() {
            Some((last_byte, bytes)) if rem != 0 => (bytes, Some(*last_byte)),
            _ => (bytes, None),
        };

        for byte in bytes {
            ok!(write!(f, "{byte:08b}"));
        }

        if let Some(mut last_byte) = last_byte {
            last_byte >>= 8 - rem;
            ok!(write!(f, "{last_byte:0rem$b}"))
        }

        Ok(())
    }
}

#[cfg(test)]
pub(crate) fn try_init_test_tracing(level_filter: tracing_subscriber::filter::LevelFilter) {
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(level_filter.into())
                .from_env_lossy(),
        )
        .with_test_writer()
        .compact()
        .try_init()
        .ok();
}

static CRC16_TABLE: [u16; 256] = [
    0x0000, 0x1021, 0x2042, 0x3063, 0x4084, 0x50a5, 0x60c6, 0x70e7, 0x8108, 0x9129, 0xa14a, 0xb16b,
    0xc18c, 0xd1ad, 0xe1ce, 0xf1ef, 0x1231, 0x0210, 0x3273, 0x2252, 0x52b5, 0x4294, 0x72f7, 0x62d6,
    0x9339, 0x8318, 0xb37b, 0xa35a, 0xd3bd, 0xc39c, 0xf3ff, 0xe3de, 0x2462, 0x3443, 0x0420, 0x1401,
    0x64e6, 0x74c7, 0x44a4, 0x5485, 0xa56a, 0xb54b, 0x8528, 0x9509, 0xe5ee, 0xf5cf, 0xc5ac, 0xd58d,
    0x3653, 0x2672, 0x1611, 0x0630, 0x76d7, 0x66f6, 0x5695, 0x46b4, 0xb75b, 0xa77a, 0x9719, 0x8738,
    0xf7df, 0xe7fe, 0xd79d, 0xc7bc, 0x48c4, 0x58e5, 0x6886, 0x78a7, 0x0840, 0x1861, 0x2802, 0x3823,
    0xc9cc, 0xd9ed, 0xe98e, 0xf9af, 0x8948, 0x9969, 0xa90a, 0xb92b, 0x5af5, 0x4ad4, 0x7ab7, 0x6a96,
    0x1a71, 0x0a50, 0x3a33, 0x2a12, 0xdbfd, 0xcbdc, 0xfbbf, 0xeb9e, 0x9b79, 0x8b58, 0xbb3b, 0xab1a,
    0x6ca6, 0x7c87, 0x4ce4, 0x5cc5, 0x2c22, 0x3c03, 0x0c60, 0x1c41, 0xedae, 0xfd8f, 0xcdec, 0xddcd,
    0xad2a, 0xbd0b, 0x8d68, 0x9d49, 0x7e97, 0x6eb6, 0x5ed5, 0x4ef4, 0x3e13, 0x2e32, 0x1e51, 0x0e70,
    0xff9f, 0xefbe, 0xdfdd, 0xcffc, 0xbf1b, 0xaf3a, 0x9f59, 0x8f78, 0x9188, 0x81a9, 0xb1ca, 0xa1eb,
    0xd10c, 0xc12d, 0xf14e, 0xe16f, 0x1080, 0x00a1, 0x30c2, 0x20e3, 0x5004, 0x4025, 0x7046, 0x6067,
    0x83b9, 0x9398, 0xa3fb, 0xb3da, 0xc33d, 0xd31c, 0xe37f, 0xf35e, 0x02b1, 0x1290, 0x22f3, 0x32d2,
    0x4235, 0x5214, 0x6277, 0x7256, 0xb5ea, 0xa5cb, 0x95a8, 0x8589, 0xf56e, 0xe54f, 0xd52c, 0xc50d,
    0x34e2, 0x24c3, 0x14a0, 0x0481, 0x7466, 0x6447, 0x5424, 0x4405, 0xa7db, 0xb7fa, 0x8799, 0x97b8,
    0xe75f, 0xf77e, 0xc71d, 0xd73c, 0x26d3, 0x36f2, 0x0691, 0x16b0, 0x6657, 0x7676, 0x4615, 0x5634,
    0xd94c, 0xc96d, 0xf90e, 0xe92f, 0x99c8, 0x89e9, 0xb98a, 0xa9ab, 0x5844, 0x4865, 0x7806, 0x6827,
    0x18c0, 0x08e1, 0x3882, 0x28a3, 0xcb7d, 0xdb5c, 0xeb3f, 0xfb1e, 0x8bf9, 0x9bd8, 0xabbb, 0xbb9a,
    0x4a75, 0x5a54, 0x6a37, 0x7a16, 0x0af1, 0x1ad0, 0x2ab3, 0x3a92, 0xfd2e, 0xed0f, 0xdd6c, 0xcd4d,
    0xbdaa, 0xad8b, 0x9de8, 0x8dc9, 0x7c26, 0x6c07, 0x5c64, 0x4c45, 0x3ca2, 0x2c83, 0x1ce0, 0x0cc1,
    0xef1f, 0xff3e, 0xcf5d, 0xdf7c, 0xaf9b, 0xbfba, 0x8fd9, 0x9ff8, 0x6e17, 0x7e36, 0x4e55, 0x5e74,
    0x2e93, 0x3eb2, 0x0ed1, 0x1ef0,
];
