use std::ops::{BitOr, BitOrAssign};

/// Cell level mask.
///
/// Bit `i` is set when Merkle level `i + 1` is significant for the cell.
#[derive(Default, Copy, Clone, Eq, PartialEq, Hash)]
pub struct LevelMask(u8);

impl LevelMask {
    /// Empty mask of an ordinary level-0 cell.
    pub const EMPTY: Self = LevelMask(0);
    /// Max cell level.
    pub const MAX_LEVEL: u8 = 3;

    /// Constructs new level mask, truncating extra bits.
    #[inline(always)]
    pub const fn new(mask: u8) -> Self {
        Self(mask & 0b111)
    }

    /// Creates a sufficient mask for the specified level.
    ///
    /// NOTE: levels > 3 has no effect (mask will always be `0b111`)
    #[inline(always)]
    pub const fn from_level(level: u8) -> Self {
        Self(match level {
            0 => 0,
            1 => 1,
            2 => 3,
            _ => 7,
        })
    }

    /// Highest significant level.
    #[inline]
    pub const fn level(&self) -> u8 {
        (8 - self.0.leading_zeros()) as u8
    }

    /// Number of significant levels above zero.
    #[inline]
    pub const fn hash_index(&self) -> u8 {
        self.0.count_ones() as u8
    }

    /// Number of hashes stored for this mask.
    #[inline]
    pub const fn hash_count(&self) -> u8 {
        self.hash_index() + 1
    }

    /// Restricts the mask to levels up to `level`.
    #[inline]
    pub const fn apply(&self, level: u8) -> Self {
        Self(self.0 & Self::from_level(level).0)
    }

    /// Whether the hash for the specified level is stored separately.
    #[inline]
    pub const fn is_significant(&self, level: u8) -> bool {
        level == 0 || (level <= Self::MAX_LEVEL && (self.0 >> (level - 1)) & 1 != 0)
    }

    /// Creates a new mask, shifted by the offset.
    #[inline(always)]
    pub const fn virtualize(&self, offset: u8) -> Self {
        Self(self.0 >> offset)
    }

    #[inline(always)]
    pub const fn to_byte(self) -> u8 {
        self.0
    }
}

impl PartialEq<u8> for LevelMask {
    #[inline]
    fn eq(&self, other: &u8) -> bool {
        self.0 == *other
    }
}

impl BitOr for LevelMask {
    type Output = Self;

    #[inline(always)]
    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for LevelMask {
    #[inline(always)]
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl From<LevelMask> for u8 {
    #[inline(always)]
    fn from(m: LevelMask) -> u8 {
        m.0
    }
}

impl std::fmt::Debug for LevelMask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!("{:03b}", self.0))
    }
}
