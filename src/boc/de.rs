use smallvec::SmallVec;

use super::{BocTag, Error};
use crate::cell::{Cell, CellDescriptor, CellParts, MAX_REF_COUNT};
use crate::util::rollback;

/// BOC deserialization options.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq)]
pub struct Options {
    /// The minimum allowed root count.
    pub min_roots: Option<usize>,
    /// The maximum allowed root count.
    pub max_roots: Option<usize>,
    /// Whether to compare hashes and depths embedded into Merkle proof and
    /// Merkle update cells with their children.
    pub check_merkle_proofs: bool,
}

impl Options {
    /// Constructs decoder options to expect exactly the specified number of roots.
    pub const fn exact(number: usize) -> Self {
        Self {
            min_roots: Some(number),
            max_roots: Some(number),
            check_merkle_proofs: false,
        }
    }

    /// Returns options with Merkle proofs checking enabled.
    pub const fn with_merkle_check(mut self) -> Self {
        self.check_merkle_proofs = true;
        self
    }
}

/// Parsed BOC header.
pub struct BocHeader<'a> {
    ref_size: usize,
    cells: SmallVec<[&'a [u8]; CELLS_ON_STACK]>,
    roots: SmallVec<[u32; ROOTS_ON_STACK]>,
    has_crc: bool,
}

impl<'a> BocHeader<'a> {
    /// Decodes boc info from the specified bytes.
    pub fn decode(data: &'a [u8], options: &Options) -> Result<Self, Error> {
        let mut reader = BocReader::new(data);

        // 4 bytes - tag
        // 1 byte - flags
        // 1 byte - offset size
        let boc_tag = ok!(reader.read_array::<4>());
        let [flags, offset_size] = ok!(reader.read_array::<2>());

        let has_index;
        let has_crc;
        let has_cache_bits;
        let ref_size;
        let supports_multiple_roots;

        match BocTag::from_bytes(boc_tag) {
            Some(BocTag::Indexed) => {
                has_index = true;
                has_crc = false;
                has_cache_bits = false;
                ref_size = flags as usize;
                supports_multiple_roots = false;
            }
            Some(BocTag::IndexedCrc32) => {
                has_index = true;
                has_crc = true;
                has_cache_bits = false;
                ref_size = flags as usize;
                supports_multiple_roots = false;
            }
            Some(BocTag::Generic) => {
                has_index = flags & BocTag::FLAG_HAS_INDEX != 0;
                has_crc = flags & BocTag::FLAG_HAS_CRC != 0;
                has_cache_bits = flags & BocTag::FLAG_HAS_CACHE_BITS != 0;
                ref_size = (flags & BocTag::REF_SIZE_MASK) as usize;
                supports_multiple_roots = true;
            }
            None => return Err(Error::UnknownBocTag),
        }

        if has_cache_bits && !has_index {
            return Err(Error::InvalidHeader);
        }
        if ref_size == 0 || ref_size > std::mem::size_of::<u32>() {
            return Err(Error::InvalidRefSize);
        }

        let offset_size = offset_size as usize;
        if offset_size == 0 || offset_size > std::mem::size_of::<u64>() {
            return Err(Error::InvalidOffsetSize);
        }

        // {ref_size} bytes - cell count
        // {ref_size} bytes - root count
        // {ref_size} bytes - absent cell count
        // {offset_size} bytes - total cells size
        if !reader.require(ref_size * 3 + offset_size) {
            return Err(Error::InvalidHeader);
        }
        let cell_count = ok!(reader.read_be_uint(ref_size)) as usize;
        let root_count = ok!(reader.read_be_uint(ref_size)) as usize;
        let absent_count = ok!(reader.read_be_uint(ref_size)) as usize;

        // Validate root or absent cells
        if root_count == 0 {
            return Err(Error::RootCellNotFound);
        }
        if !supports_multiple_roots && root_count > 1 {
            return Err(Error::UnexpectedMultipleRoots);
        }
        if root_count.saturating_add(absent_count) > cell_count {
            return Err(Error::TooManyRootCells);
        }
        if absent_count > 0 {
            return Err(Error::AbsentCellsNotSupported);
        }
        if let Some(min_roots) = options.min_roots {
            if root_count < min_roots {
                return Err(Error::TooFewRootCells);
            }
        }
        if root_count > options.max_roots.unwrap_or(MAX_ROOTS) {
            return Err(Error::TooManyRootCells);
        }

        let total_cells_size = ok!(reader.read_be_uint(offset_size));

        const MIN_CELL_SIZE: u64 = 2; // [d1, d2]

        // NOTE: `root_count` <= `cell_count`, so this expression doesn't overflow
        let min_total_cell_size = (cell_count as u64) * (MIN_CELL_SIZE + ref_size as u64)
            - (root_count * ref_size) as u64;
        if total_cells_size < min_total_cell_size {
            return Err(Error::InvalidTotalSize);
        }

        // 2 bytes - descriptor
        // 4 * (2 + 32) - inline hashes and depths if presented
        // 128 - max data length
        // 4*{ref_size} - max references
        let max_cell_size = 2 + 4 * (2 + 32) + 128 + (MAX_REF_COUNT as u64) * ref_size as u64;
        if total_cells_size > (cell_count as u64) * max_cell_size {
            return Err(Error::InvalidTotalSize);
        }

        if !reader.require(root_count * ref_size) {
            return Err(Error::UnexpectedEof);
        }

        let mut roots = SmallVec::with_capacity(root_count);
        if supports_multiple_roots {
            for _ in 0..root_count {
                let root_index = ok!(reader.read_be_uint(ref_size)) as usize;
                if root_index >= cell_count {
                    return Err(Error::RootOutOfBounds);
                }
                roots.push(root_index as u32);
            }
        } else {
            roots.push(0);
        }

        let index_size = has_index as u64 * cell_count as u64 * offset_size as u64;
        let required = index_size + total_cells_size + has_crc as u64 * 4;
        if (reader.remaining() as u64) < required {
            return Err(Error::UnexpectedEof);
        }

        if has_index {
            reader.advance(index_size as usize);
        }

        let cells_start_offset = reader.offset;

        let mut cells = SmallVec::with_capacity(cell_count);
        for _ in 0..cell_count {
            let start = reader.offset;

            let descriptor = CellDescriptor::new(ok!(reader.read_array::<2>()));
            if descriptor.is_absent() {
                return Err(Error::AbsentCellsNotSupported);
            }

            let data_len = descriptor.byte_len() as usize;
            let ref_count = descriptor.reference_count() as usize;
            if ref_count > MAX_REF_COUNT {
                return Err(Error::InvalidRef);
            }

            let mut data_offset = 0;
            if descriptor.store_hashes() {
                let level = descriptor.level_mask().level();
                if descriptor.is_exotic() && ref_count == 0 && level > 0 {
                    // Pruned branch with `store_hashes` is invalid
                    return Err(Error::UnnormalizedCell);
                }
                data_offset = (32 + 2) * (level as usize + 1);
            }

            let body_len = data_offset + data_len + ref_count * ref_size;
            let body = ok!(reader.read_bytes(body_len));

            if data_len > 0 && !descriptor.is_aligned() {
                let byte_with_tag = body[data_offset + data_len - 1];
                if byte_with_tag & 0x7f == 0 {
                    return Err(Error::UnnormalizedCell);
                }
            }

            cells.push(&data[start..reader.offset]);
        }

        // Check that `total_cells_size` is correct
        if (cells_start_offset as u64).saturating_add(total_cells_size) != reader.offset as u64 {
            return Err(Error::InvalidTotalSize);
        }

        // Verify checksum if specified
        if has_crc {
            let crc = u32::from_le_bytes(ok!(reader.read_array::<4>()));
            if crc != crate::util::crc_32c(&data[..reader.offset - 4]) {
                return Err(Error::ChecksumMismatch);
            }
        }

        Ok(Self {
            ref_size,
            cells,
            roots,
            has_crc,
        })
    }

    /// Assembles cell tree from the collected cell records.
    ///
    /// Cells are built back to front, so every reference must point to
    /// a cell with a greater index.
    pub fn finalize(&self, check_merkle: bool) -> Result<ProcessedCells, Error> {
        let ref_size = self.ref_size;
        let cell_count = self.cells.len() as u32;

        let mut res = Vec::new();
        if res.try_reserve_exact(cell_count as usize).is_err() {
            return Err(Error::InvalidTotalSize);
        }

        for (rev_index, cell) in self.cells.iter().rev().enumerate() {
            let parent_index = cell_count - rev_index as u32 - 1;

            let descriptor = CellDescriptor::new([cell[0], cell[1]]);
            let byte_len = descriptor.byte_len() as usize;

            let mut offset = 2;
            if descriptor.store_hashes() {
                let level = descriptor.level_mask().level();
                offset += (32 + 2) * (level as usize + 1);
            }

            let data = &cell[offset..offset + byte_len];
            offset += byte_len;

            let bit_len = if descriptor.is_aligned() {
                (byte_len * 8) as u16
            } else {
                match rollback(data) {
                    Ok(bit_len) => bit_len,
                    Err(_) => return Err(Error::UnnormalizedCell),
                }
            };

            let mut references = SmallVec::<[Cell; MAX_REF_COUNT]>::new();
            for _ in 0..descriptor.reference_count() {
                let child_index = read_be_uint(&cell[offset..offset + ref_size]) as u32;
                if child_index >= cell_count {
                    return Err(Error::InvalidRef);
                }
                if child_index <= parent_index {
                    return Err(Error::InvalidRefOrder);
                }

                match res.get((cell_count - child_index - 1) as usize) {
                    Some(child) => references.push(Cell::clone(child)),
                    None => return Err(Error::InvalidRefOrder),
                }
                offset += ref_size;
            }

            let parts = CellParts {
                bit_len,
                is_exotic: descriptor.is_exotic(),
                references,
                data,
            };
            let cell = match parts.finalize(check_merkle) {
                Ok(cell) => cell,
                Err(e) => return Err(Error::InvalidCell(e)),
            };
            if cell.level_mask() != descriptor.level_mask() {
                return Err(Error::InvalidCell(crate::error::Error::MalformedCell(
                    "level mask mismatch",
                )));
            }
            res.push(cell);
        }

        Ok(ProcessedCells(res))
    }

    /// Cell index size in bytes. Guaranteed to be 4 at max.
    pub fn ref_size(&self) -> usize {
        self.ref_size
    }

    /// Slices of the unique cells.
    pub fn cells(&self) -> &[&'a [u8]] {
        &self.cells
    }

    /// Root indices.
    pub fn roots(&self) -> &[u32] {
        &self.roots
    }

    /// Whether the container had a CRC32C checksum.
    pub fn has_crc(&self) -> bool {
        self.has_crc
    }
}

/// Array of processed cells.
pub struct ProcessedCells(Vec<Cell>);

impl ProcessedCells {
    /// Returns a processed cell by index.
    pub fn get(&self, index: u32) -> Option<Cell> {
        let index = self.0.len().checked_sub(index as usize + 1)?;
        self.0.get(index).cloned()
    }
}

/// Bounds checked cursor over the input bytes.
struct BocReader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> BocReader<'a> {
    #[inline]
    const fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    #[inline]
    const fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    #[inline]
    const fn require(&self, len: usize) -> bool {
        len <= self.remaining()
    }

    #[inline]
    fn advance(&mut self, bytes: usize) {
        self.offset += bytes;
    }

    fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], Error> {
        if !self.require(len) {
            return Err(Error::UnexpectedEof);
        }
        let bytes = &self.data[self.offset..self.offset + len];
        self.advance(len);
        Ok(bytes)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], Error> {
        let mut result = [0u8; N];
        result.copy_from_slice(ok!(self.read_bytes(N)));
        Ok(result)
    }

    /// Reads a big-endian integer of 1..=8 bytes.
    #[inline]
    fn read_be_uint(&mut self, size: usize) -> Result<u64, Error> {
        self.read_bytes(size).map(read_be_uint)
    }
}

#[inline]
fn read_be_uint(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0u64, |acc, &byte| (acc << 8) | byte as u64)
}

const CELLS_ON_STACK: usize = 16;
const ROOTS_ON_STACK: usize = 2;

const MAX_ROOTS: usize = 32;
