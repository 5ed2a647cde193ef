use ahash::HashMap;

use super::{BocTag, Error};
use crate::cell::{Cell, CellHash};

/// BOC serialization options.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Options {
    /// Whether to write the cell offsets index table.
    pub with_index: bool,
    /// Whether to append a CRC32C checksum.
    pub with_crc: bool,
}

impl Default for Options {
    #[inline]
    fn default() -> Self {
        Self {
            with_index: false,
            with_crc: true,
        }
    }
}

/// Maximum number of roots in an encoded BOC.
pub const MAX_ROOTS: usize = 4;

/// Unique cells of the roots, collected in reverse order (children first).
pub struct BocHeader<'a> {
    root_rev_indices: Vec<u32>,
    rev_indices: HashMap<&'a CellHash, u32>,
    rev_cells: Vec<&'a Cell>,
    total_data_size: u64,
    reference_count: u64,
    cell_count: u32,
    options: Options,
}

impl<'a> BocHeader<'a> {
    /// Collects all unique cells of the roots.
    ///
    /// Fails if there are no roots or more than [`MAX_ROOTS`].
    pub fn new<I>(roots: I, options: Options) -> Result<Self, Error>
    where
        I: IntoIterator<Item = &'a Cell>,
    {
        let mut res = Self {
            root_rev_indices: Vec::new(),
            rev_indices: HashMap::default(),
            rev_cells: Vec::new(),
            total_data_size: 0,
            reference_count: 0,
            cell_count: 0,
            options,
        };

        for root in roots {
            if res.root_rev_indices.len() >= MAX_ROOTS {
                return Err(Error::InvalidRootCount);
            }
            let root_rev_index = res.fill(root);
            res.root_rev_indices.push(root_rev_index);
        }

        if res.root_rev_indices.is_empty() {
            return Err(Error::InvalidRootCount);
        }
        Ok(res)
    }

    /// Collects all unique cells of a single root.
    pub fn with_root(root: &'a Cell, options: Options) -> Self {
        let mut res = Self {
            root_rev_indices: Vec::with_capacity(1),
            rev_indices: HashMap::default(),
            rev_cells: Vec::new(),
            total_data_size: 0,
            reference_count: 0,
            cell_count: 0,
            options,
        };
        let root_rev_index = res.fill(root);
        res.root_rev_indices.push(root_rev_index);
        res
    }

    /// Number of unique cells.
    #[inline]
    pub fn cell_count(&self) -> u32 {
        self.cell_count
    }

    /// Writes the container into the target buffer.
    pub fn encode(self, target: &mut Vec<u8>) {
        let root_count = self.root_rev_indices.len();
        let Options {
            with_index,
            with_crc,
        } = self.options;

        let ref_size = number_of_bytes_to_fit(self.cell_count as u64);
        let total_cells_size: u64 = self.total_data_size
            + (self.cell_count as u64 * 2) // all descriptor bytes
            + (ref_size as u64 * self.reference_count);
        let offset_size = number_of_bytes_to_fit(total_cells_size);

        debug_assert!((1..=4).contains(&ref_size));
        debug_assert!((1..=8).contains(&offset_size));

        let flags = (ref_size as u8)
            | (u8::from(with_index) * BocTag::FLAG_HAS_INDEX)
            | (u8::from(with_crc) * BocTag::FLAG_HAS_CRC);

        // 4 bytes - BOC tag
        // 1 byte - flags
        // 1 byte - offset size
        // {ref_size} - cell count
        // {ref_size} - root count
        // {ref_size} - absent cell count
        // {offset_size} - total cells size
        // root_count * {ref_size} - root indices
        // with_index * cell_count * {offset_size} - index table
        // {total_cells_size} - cells
        // with_crc * 4 - optional CRC32
        let total_size = 4
            + 2
            + (ref_size as u64) * (3 + root_count as u64)
            + (offset_size as u64)
            + u64::from(with_index) * self.cell_count as u64 * offset_size as u64
            + total_cells_size
            + u64::from(with_crc) * 4;

        let start = target.len();
        target.reserve(total_size as usize);

        target.extend_from_slice(&BocTag::Generic.to_bytes());
        target.extend_from_slice(&[flags, offset_size as u8]);
        target.extend_from_slice(&self.cell_count.to_be_bytes()[4 - ref_size..]);
        target.extend_from_slice(&(root_count as u32).to_be_bytes()[4 - ref_size..]);
        target.extend_from_slice(&[0; 4][4 - ref_size..]);
        target.extend_from_slice(&total_cells_size.to_be_bytes()[8 - offset_size..]);

        for rev_index in &self.root_rev_indices {
            let root_index = self.cell_count - rev_index - 1;
            target.extend_from_slice(&root_index.to_be_bytes()[4 - ref_size..]);
        }

        if with_index {
            // End offset of each cell relative to the start of the cells section
            let mut offset = 0u64;
            for cell in self.rev_cells.iter().rev() {
                let descriptor = cell.descriptor();
                offset += 2
                    + descriptor.byte_len() as u64
                    + descriptor.reference_count() as u64 * ref_size as u64;
                target.extend_from_slice(&offset.to_be_bytes()[8 - offset_size..]);
            }
        }

        for cell in self.rev_cells.iter().rev() {
            let descriptor = cell.descriptor();
            target.extend_from_slice(&[descriptor.d1, descriptor.d2]);
            target.extend_from_slice(cell.data());
            for child in cell.references() {
                // NOTE: all children were collected before their parents
                let rev_index = self.rev_indices[child.repr_hash()];
                let index = self.cell_count - rev_index - 1;
                target.extend_from_slice(&index.to_be_bytes()[4 - ref_size..]);
            }
        }

        if with_crc {
            let crc = crate::util::crc_32c(&target[start..]);
            target.extend_from_slice(&crc.to_le_bytes());
        }

        debug_assert_eq!((target.len() - start) as u64, total_size);
    }

    fn fill(&mut self, root: &'a Cell) -> u32 {
        if let Some(index) = self.rev_indices.get(root.repr_hash()) {
            return *index;
        }

        for child in root.references() {
            self.fill(child);
        }

        let index = self.cell_count;
        self.rev_indices.insert(root.repr_hash(), index);
        self.rev_cells.push(root);

        let descriptor = root.descriptor();
        self.total_data_size += descriptor.byte_len() as u64;
        self.reference_count += descriptor.reference_count() as u64;
        self.cell_count += 1;

        index
    }
}

fn number_of_bytes_to_fit(l: u64) -> usize {
    (8 - l.leading_zeros() / 8) as usize
}
