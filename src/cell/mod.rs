//! Cell tree implementation.

use std::sync::{Arc, OnceLock};

use smallvec::SmallVec;

pub use self::builder::CellBuilder;
pub use self::descriptor::CellDescriptor;
pub use self::finalizer::CellParts;
pub use self::level_mask::LevelMask;
pub use self::slice::CellSlice;

use crate::error::Error;
use crate::util::Bitstring;

mod builder;
mod descriptor;
mod finalizer;
mod level_mask;
mod slice;


/// Maximum number of child cells.
pub const MAX_REF_COUNT: usize = 4;
/// Maximum number of data bits.
pub const MAX_BIT_LEN: u16 = 1023;
/// Maximum cell depth.
pub const MAX_DEPTH: u16 = 1023;

/// Type alias for a cell hash.
pub type CellHash = [u8; 32];

/// Representation hash of an empty ordinary cell.
pub const EMPTY_CELL_HASH: CellHash = [
    0x96, 0xa2, 0x96, 0xd2, 0x24, 0xf2, 0x85, 0xc6, 0x7b, 0xee, 0x93, 0xc3, 0x0f, 0x8a, 0x30,
    0x91, 0x57, 0xf0, 0xda, 0xa3, 0x5d, 0xc5, 0xb8, 0x7e, 0x41, 0x0b, 0x78, 0x63, 0x0a, 0x09,
    0xcf, 0xc7,
];

/// A type with a known cell representation.
pub trait Store {
    /// Appends this value to the builder.
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error>;
}

impl<T: Store + ?Sized> Store for &T {
    #[inline]
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        <T as Store>::store_into(self, builder)
    }
}

/// A type which can be read from a cell slice.
pub trait Load: Sized {
    /// Reads this value from the slice, advancing it.
    fn load_from(slice: &mut CellSlice) -> Result<Self, Error>;
}

macro_rules! impl_primitive_store_load {
    ($($ty:ty => $bits:literal, $store:ident, $load:ident),*$(,)?) => {$(
        impl Store for $ty {
            #[inline]
            fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
                builder.$store(*self as _, $bits)
            }
        }

        impl Load for $ty {
            #[inline]
            fn load_from(slice: &mut CellSlice) -> Result<Self, Error> {
                Ok(ok!(slice.$load($bits)) as $ty)
            }
        }
    )*};
}

impl_primitive_store_load! {
    u8 => 8, store_uint, load_uint,
    u16 => 16, store_uint, load_uint,
    u32 => 32, store_uint, load_uint,
    u64 => 64, store_uint, load_uint,
    i8 => 8, store_int, load_int,
    i16 => 16, store_int, load_int,
    i32 => 32, store_int, load_int,
    i64 => 64, store_int, load_int,
}

impl Store for bool {
    #[inline]
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        builder.store_bit(*self)
    }
}

impl Load for bool {
    #[inline]
    fn load_from(slice: &mut CellSlice) -> Result<Self, Error> {
        slice.load_bit()
    }
}

impl Store for CellHash {
    #[inline]
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        builder.store_raw(self, 256)
    }
}

impl Load for CellHash {
    fn load_from(slice: &mut CellSlice) -> Result<Self, Error> {
        let mut hash = [0u8; 32];
        ok!(slice.load_raw(&mut hash, 256));
        Ok(hash)
    }
}

/// Cells are stored as references.
impl Store for Cell {
    #[inline]
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        builder.store_reference(self.clone())
    }
}

impl Load for Cell {
    #[inline]
    fn load_from(slice: &mut CellSlice) -> Result<Self, Error> {
        slice.load_reference()
    }
}

/// Cell type, derived from the first data byte of an exotic cell.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, Hash)]
pub enum CellType {
    /// Cell of this type just stores data and references.
    #[default]
    Ordinary,
    /// Exotic cell which was pruned from the original tree of cells
    /// when a Merkle proof has been created.
    PrunedBranch,
    /// Exotic cell with a reference to the cell with a library.
    LibraryReference,
    /// Exotic cell with one hash and one reference.
    MerkleProof,
    /// Exotic cell with two hashes and two references.
    MerkleUpdate,
}

impl CellType {
    /// Returns whether this cell type is Merkle proof or Merkle update.
    #[inline]
    pub const fn is_merkle(self) -> bool {
        matches!(self, Self::MerkleProof | Self::MerkleUpdate)
    }

    /// Returns whether the cell is not [`Ordinary`].
    ///
    /// [`Ordinary`]: CellType::Ordinary
    #[inline]
    pub const fn is_exotic(self) -> bool {
        !matches!(self, Self::Ordinary)
    }

    #[inline]
    pub const fn is_pruned_branch(self) -> bool {
        matches!(self, Self::PrunedBranch)
    }

    /// Encodes cell type as byte.
    pub const fn to_byte(self) -> u8 {
        match self {
            CellType::Ordinary => 0xff,
            CellType::PrunedBranch => 1,
            CellType::LibraryReference => 2,
            CellType::MerkleProof => 3,
            CellType::MerkleUpdate => 4,
        }
    }

    /// Decodes any cell type from byte.
    pub const fn from_byte(byte: u8) -> Option<Self> {
        Some(match byte {
            0xff => CellType::Ordinary,
            1 => CellType::PrunedBranch,
            2 => CellType::LibraryReference,
            3 => CellType::MerkleProof,
            4 => CellType::MerkleUpdate,
            _ => return None,
        })
    }

    /// Decodes exotic cell type from byte.
    pub const fn from_byte_exotic(byte: u8) -> Option<Self> {
        match Self::from_byte(byte) {
            Some(CellType::Ordinary) | None => None,
            ty => ty,
        }
    }
}

/// Immutable cell with shared ownership.
///
/// Hashes and depths for all significant levels are computed once
/// when the cell is finalized.
#[derive(Clone)]
pub struct Cell(Arc<CellInner>);

struct CellInner {
    descriptor: CellDescriptor,
    cell_type: CellType,
    bit_len: u16,
    /// Data bytes with the completion tag.
    data: Box<[u8]>,
    references: SmallVec<[Cell; MAX_REF_COUNT]>,
    hashes: SmallVec<[(CellHash, u16); 4]>,
}

impl Cell {
    /// Returns a shared empty ordinary cell.
    pub fn empty_cell() -> Self {
        static EMPTY: OnceLock<Cell> = OnceLock::new();
        EMPTY
            .get_or_init(|| {
                Cell(Arc::new(CellInner {
                    descriptor: CellDescriptor::new([0, 0]),
                    cell_type: CellType::Ordinary,
                    bit_len: 0,
                    data: Box::default(),
                    references: SmallVec::new(),
                    hashes: smallvec::smallvec![(EMPTY_CELL_HASH, 0)],
                }))
            })
            .clone()
    }

    pub(crate) fn from_parts(
        descriptor: CellDescriptor,
        cell_type: CellType,
        bit_len: u16,
        data: Box<[u8]>,
        references: SmallVec<[Cell; MAX_REF_COUNT]>,
        hashes: SmallVec<[(CellHash, u16); 4]>,
    ) -> Self {
        Self(Arc::new(CellInner {
            descriptor,
            cell_type,
            bit_len,
            data,
            references,
            hashes,
        }))
    }

    /// Returns cell descriptor bytes.
    #[inline]
    pub fn descriptor(&self) -> CellDescriptor {
        self.0.descriptor
    }

    #[inline]
    pub fn cell_type(&self) -> CellType {
        self.0.cell_type
    }

    #[inline]
    pub fn is_exotic(&self) -> bool {
        self.0.cell_type.is_exotic()
    }

    #[inline]
    pub fn level_mask(&self) -> LevelMask {
        self.0.descriptor.level_mask()
    }

    #[inline]
    pub fn level(&self) -> u8 {
        self.level_mask().level()
    }

    /// Cell data with the completion tag (if the cell is not byte-aligned).
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.0.data
    }

    /// Returns the data size of this cell in bits.
    #[inline]
    pub fn bit_len(&self) -> u16 {
        self.0.bit_len
    }

    #[inline]
    pub fn reference_count(&self) -> u8 {
        self.0.references.len() as u8
    }

    #[inline]
    pub fn reference(&self, index: u8) -> Option<&Cell> {
        self.0.references.get(index as usize)
    }

    #[inline]
    pub fn references(&self) -> &[Cell] {
        &self.0.references
    }

    /// Returns the hash of this cell at the specified level.
    ///
    /// Levels above the cell level return the representation hash.
    pub fn hash(&self, level: u8) -> &CellHash {
        let hash_index = self.level_mask().apply(level).hash_index();
        // NOTE: `hashes` always has `level_mask.hash_count()` items
        &self.0.hashes[hash_index as usize].0
    }

    /// Returns the depth of this cell at the specified level.
    pub fn depth(&self, level: u8) -> u16 {
        let hash_index = self.level_mask().apply(level).hash_index();
        self.0.hashes[hash_index as usize].1
    }

    /// Hash of the max level.
    #[inline]
    pub fn repr_hash(&self) -> &CellHash {
        self.hash(LevelMask::MAX_LEVEL)
    }

    /// Depth of the max level.
    #[inline]
    pub fn repr_depth(&self) -> u16 {
        self.depth(LevelMask::MAX_LEVEL)
    }

    /// Creates a slice over this cell.
    #[inline]
    pub fn as_slice(&self) -> CellSlice {
        CellSlice::new(self.clone())
    }

    /// Returns an object that implements [`Display`] for printing only the root cell.
    ///
    /// [`Display`]: std::fmt::Display
    pub fn display_root(&self) -> DisplayCellRoot<'_> {
        DisplayCellRoot(self)
    }

    /// Returns an object that implements [`Display`] for printing the whole tree
    /// in fift hex notation.
    ///
    /// [`Display`]: std::fmt::Display
    pub fn display_tree(&self) -> DisplayCellTree<'_> {
        DisplayCellTree(self)
    }

    /// Returns the data of this cell as a bitstring.
    #[inline]
    pub fn as_bitstring(&self) -> Bitstring<'_> {
        Bitstring {
            bytes: &self.0.data,
            bit_len: self.0.bit_len,
        }
    }
}

impl Default for Cell {
    #[inline]
    fn default() -> Self {
        Self::empty_cell()
    }
}

impl Eq for Cell {}

impl PartialEq for Cell {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.repr_hash() == other.repr_hash()
    }
}

impl std::hash::Hash for Cell {
    #[inline]
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.repr_hash().hash(state)
    }
}

impl std::fmt::Debug for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cell")
            .field("ty", &self.cell_type())
            .field("bits", &self.bit_len())
            .field("refs", &self.reference_count())
            .field("hash", &hex::encode(self.repr_hash()))
            .finish()
    }
}

#[derive(Clone, Copy)]
pub struct DisplayCellRoot<'a>(&'a Cell);

impl std::fmt::Display for DisplayCellRoot<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let data = self.0.as_bitstring();

        if f.alternate() {
            std::fmt::Display::fmt(&data, f)
        } else {
            f.write_fmt(format_args!(
                "{data}\nbits: {:>4}, refs: {}, hash: {}",
                self.0.bit_len(),
                self.0.reference_count(),
                hex::encode(self.0.repr_hash()),
            ))
        }
    }
}

/// Indented fift hex dump: one `x{...}` line per cell, children are
/// indented by one space per depth level.
#[derive(Clone, Copy)]
pub struct DisplayCellTree<'a>(&'a Cell);

impl std::fmt::Display for DisplayCellTree<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut stack = vec![(0, self.0)];

        while let Some((level, cell)) = stack.pop() {
            ok!(f.write_fmt(format_args!(
                "{:level$}x{{{:X}}}\n",
                "",
                cell.as_bitstring()
            )));

            for child in cell.references().iter().rev() {
                stack.push((level + 1, child));
            }
        }

        Ok(())
    }
}
