use super::level_mask::LevelMask;
use super::CellType;

/// Two descriptor bytes which precede cell data in both
/// the hash representation and the BOC encoding.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[repr(C)]
pub struct CellDescriptor {
    /// Refs descriptor: `refs + 8 * is_exotic + 16 * store_hashes + 32 * level_mask`.
    pub d1: u8,
    /// Bits descriptor: `floor(bits / 8) + ceil(bits / 8)`.
    pub d2: u8,
}

impl CellDescriptor {
    pub const REF_COUNT_MASK: u8 = 0b0000_0111;
    pub const IS_EXOTIC_MASK: u8 = 0b0000_1000;
    pub const STORE_HASHES_MASK: u8 = 0b0001_0000;
    pub const LEVEL_MASK: u8 = 0b1110_0000;

    #[inline(always)]
    pub const fn new(bytes: [u8; 2]) -> Self {
        Self {
            d1: bytes[0],
            d2: bytes[1],
        }
    }

    /// Computes d1 descriptor byte from parts.
    pub const fn compute_d1(level_mask: LevelMask, is_exotic: bool, ref_count: u8) -> u8 {
        (level_mask.to_byte() << 5) | ((is_exotic as u8) << 3) | (ref_count & Self::REF_COUNT_MASK)
    }

    /// Computes d2 descriptor byte from the cell length in bits.
    pub const fn compute_d2(bit_len: u16) -> u8 {
        (((bit_len >> 2) as u8) & !0b1) | ((bit_len % 8 != 0) as u8)
    }

    #[inline(always)]
    pub const fn reference_count(&self) -> u8 {
        self.d1 & Self::REF_COUNT_MASK
    }

    #[inline(always)]
    pub const fn is_exotic(&self) -> bool {
        self.d1 & Self::IS_EXOTIC_MASK != 0
    }

    #[inline(always)]
    pub const fn store_hashes(&self) -> bool {
        self.d1 & Self::STORE_HASHES_MASK != 0
    }

    #[inline(always)]
    pub const fn level_mask(&self) -> LevelMask {
        LevelMask::new(self.d1 >> 5)
    }

    #[inline(always)]
    pub const fn is_aligned(&self) -> bool {
        self.d2 & 1 == 0
    }

    #[inline(always)]
    pub const fn byte_len(&self) -> u8 {
        (self.d2 & 1) + (self.d2 >> 1)
    }

    /// Absent cells are a legacy feature of BOC.
    #[inline(always)]
    pub const fn is_absent(&self) -> bool {
        self.d1 == (Self::REF_COUNT_MASK | Self::IS_EXOTIC_MASK)
    }

    /// Returns the same descriptor with the specified level mask.
    #[inline]
    pub const fn with_level_mask(self, level_mask: LevelMask) -> Self {
        Self {
            d1: (self.d1 & !(Self::LEVEL_MASK | Self::STORE_HASHES_MASK))
                | (level_mask.to_byte() << 5),
            d2: self.d2,
        }
    }

    /// Cell type of an exotic descriptor is stored in the first data byte.
    pub fn cell_type(&self, first_byte: Option<u8>) -> Option<CellType> {
        if self.is_exotic() {
            CellType::from_byte_exotic(first_byte?)
        } else {
            Some(CellType::Ordinary)
        }
    }
}
