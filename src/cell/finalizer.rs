use sha2::Digest;
use smallvec::SmallVec;

use crate::cell::{
    Cell, CellDescriptor, CellHash, CellType, LevelMask, MAX_BIT_LEN, MAX_DEPTH, MAX_REF_COUNT,
};
use crate::error::Error;

const HASH_BITS: u16 = 256;
const DEPTH_BITS: u16 = 16;

/// Partially assembled cell.
pub struct CellParts<'a> {
    /// Length of this cell's data in bits.
    pub bit_len: u16,

    /// Whether the cell type must be read from the first data byte.
    pub is_exotic: bool,

    /// Array of child cells.
    pub references: SmallVec<[Cell; MAX_REF_COUNT]>,

    /// Cell data with the completion tag.
    ///
    /// NOTE: must be exactly `ceil(bit_len / 8)` bytes long.
    pub data: &'a [u8],
}

impl CellParts<'_> {
    /// Validates the layout, computes all hashes and builds the cell.
    ///
    /// When `check_merkle` is set, the hashes and depths embedded into Merkle
    /// proof and Merkle update cells are compared with their children.
    pub fn finalize(self, check_merkle: bool) -> Result<Cell, Error> {
        if self.bit_len > MAX_BIT_LEN {
            return Err(Error::MalformedCell("cell can't have more than 1023 bits"));
        }
        if self.references.len() > MAX_REF_COUNT {
            return Err(Error::MalformedCell("cell can't have more than 4 refs"));
        }
        if self.data.len() != (self.bit_len as usize).div_ceil(8) {
            return Err(Error::MalformedCell("cell data length mismatch"));
        }

        let cell_type = if self.is_exotic {
            match self.data.first() {
                Some(&byte) if self.bit_len >= 8 => match CellType::from_byte_exotic(byte) {
                    Some(cell_type) => cell_type,
                    None => return Err(Error::MalformedCell("unknown exotic cell type")),
                },
                _ => return Err(Error::MalformedCell("exotic cell must have a type byte")),
            }
        } else {
            CellType::Ordinary
        };

        let level_mask = ok!(self.validate(cell_type, check_merkle));
        let hashes = ok!(self.compute_hashes(cell_type, level_mask));

        let descriptor = CellDescriptor {
            d1: CellDescriptor::compute_d1(level_mask, self.is_exotic, self.references.len() as u8),
            d2: CellDescriptor::compute_d2(self.bit_len),
        };

        Ok(Cell::from_parts(
            descriptor,
            cell_type,
            self.bit_len,
            Box::from(self.data),
            self.references,
            hashes,
        ))
    }

    /// Checks type-specific constraints and derives the level mask.
    fn validate(&self, cell_type: CellType, check_merkle: bool) -> Result<LevelMask, Error> {
        let bit_len = self.bit_len;
        let references = self.references.as_slice();

        match cell_type {
            CellType::Ordinary => {
                let mut children_mask = LevelMask::EMPTY;
                for child in references {
                    children_mask |= child.level_mask();
                }
                Ok(children_mask)
            }
            // 8 bits type, 8 bits level mask, (hash, depth) for each lower level
            CellType::PrunedBranch => {
                const MIN_BIT_LEN: u16 = 8 + 8 + HASH_BITS + DEPTH_BITS;
                if bit_len < MIN_BIT_LEN {
                    return Err(Error::MalformedCell("pruned branch cell is too short"));
                }
                if !references.is_empty() {
                    return Err(Error::MalformedCell("pruned branch cell can't have refs"));
                }

                let level_mask = LevelMask::new(self.data[1]);
                if self.data[1] > 0b111 || !(1..=3).contains(&level_mask.level()) {
                    return Err(Error::MalformedCell(
                        "pruned branch level must be in range 1..=3",
                    ));
                }

                let hash_count = level_mask.apply(level_mask.level() - 1).hash_count() as u16;
                if bit_len != 8 + 8 + hash_count * (HASH_BITS + DEPTH_BITS) {
                    return Err(Error::MalformedCell("pruned branch cell has invalid size"));
                }

                Ok(level_mask)
            }
            // 8 bits type, hash
            CellType::LibraryReference => {
                if bit_len != 8 + HASH_BITS {
                    return Err(Error::MalformedCell(
                        "library reference cell must have exactly 264 bits",
                    ));
                }
                if !references.is_empty() {
                    return Err(Error::MalformedCell("library reference cell can't have refs"));
                }
                Ok(LevelMask::EMPTY)
            }
            // 8 bits type, hash, depth
            CellType::MerkleProof => {
                if bit_len != 8 + HASH_BITS + DEPTH_BITS {
                    return Err(Error::MalformedCell(
                        "merkle proof cell must have exactly 280 bits",
                    ));
                }
                let [child] = references else {
                    return Err(Error::MalformedCell("merkle proof cell must have exactly 1 ref"));
                };

                if check_merkle {
                    if self.data[1..33] != child.hash(0)[..] {
                        return Err(Error::MalformedCell("merkle proof hash mismatch"));
                    }
                    if read_depth(self.data, 33) != child.depth(0) {
                        return Err(Error::MalformedCell("merkle proof depth mismatch"));
                    }
                }

                Ok(child.level_mask().virtualize(1))
            }
            // 8 bits type, 2 x hash, 2 x depth
            CellType::MerkleUpdate => {
                if bit_len != 8 + 2 * (HASH_BITS + DEPTH_BITS) {
                    return Err(Error::MalformedCell(
                        "merkle update cell must have exactly 552 bits",
                    ));
                }
                let [old, new] = references else {
                    return Err(Error::MalformedCell(
                        "merkle update cell must have exactly 2 refs",
                    ));
                };

                if check_merkle {
                    if self.data[1..33] != old.hash(0)[..] || self.data[33..65] != new.hash(0)[..]
                    {
                        return Err(Error::MalformedCell("merkle update hash mismatch"));
                    }
                    if read_depth(self.data, 65) != old.depth(0)
                        || read_depth(self.data, 67) != new.depth(0)
                    {
                        return Err(Error::MalformedCell("merkle update depth mismatch"));
                    }
                }

                Ok((old.level_mask() | new.level_mask()).virtualize(1))
            }
        }
    }

    /// Computes hashes and depths for all significant levels.
    ///
    /// Pruned branches only compute their own top level hash, lower levels
    /// are taken from the cell data.
    fn compute_hashes(
        &self,
        cell_type: CellType,
        level_mask: LevelMask,
    ) -> Result<SmallVec<[(CellHash, u16); 4]>, Error> {
        let is_pruned = cell_type.is_pruned_branch();
        let level_offset = cell_type.is_merkle() as u8;
        let hash_count = level_mask.hash_count() as usize;
        let references = self.references.as_slice();

        let mut hashes = SmallVec::<[(CellHash, u16); 4]>::with_capacity(hash_count);

        let hash_index_offset = if is_pruned {
            let stored = hash_count - 1;
            for i in 0..stored {
                let mut hash = CellHash::default();
                hash.copy_from_slice(&self.data[2 + i * 32..2 + (i + 1) * 32]);
                let depth = read_depth(self.data, 2 + stored * 32 + i * 2);
                hashes.push((hash, depth));
            }
            stored
        } else {
            0
        };

        let d2 = CellDescriptor::compute_d2(self.bit_len);

        let mut hash_index = 0;
        for level in 0..=level_mask.level() {
            if !level_mask.is_significant(level) {
                continue;
            }
            if hash_index < hash_index_offset {
                hash_index += 1;
                continue;
            }

            if (hash_index == hash_index_offset && level != 0 && !is_pruned)
                || (hash_index != hash_index_offset && level == 0 && is_pruned)
            {
                return Err(Error::MalformedCell("invalid hash index for cell level"));
            }

            let mut hasher = sha2::Sha256::new();

            let d1 = CellDescriptor::compute_d1(
                level_mask.apply(level),
                self.is_exotic,
                references.len() as u8,
            );
            hasher.update([d1, d2]);

            if hash_index == hash_index_offset {
                hasher.update(self.data);
            } else {
                // NOTE: the previous level hash was pushed on the previous iteration
                hasher.update(hashes[hashes.len() - 1].0);
            }

            let child_level = level + level_offset;

            let mut depth = 0;
            for child in references {
                let child_depth = child.depth(child_level);
                let Some(next_depth) = child_depth.checked_add(1) else {
                    return Err(Error::MalformedCell("cell depth overflow"));
                };
                depth = std::cmp::max(depth, next_depth);
                hasher.update(child_depth.to_be_bytes());
            }
            if depth > MAX_DEPTH {
                return Err(Error::MalformedCell("cell depth overflow"));
            }

            for child in references {
                hasher.update(child.hash(child_level));
            }

            hashes.push((hasher.finalize().into(), depth));
            hash_index += 1;
        }

        debug_assert_eq!(hashes.len(), hash_count);
        Ok(hashes)
    }
}

#[inline]
fn read_depth(data: &[u8], offset: usize) -> u16 {
    u16::from_be_bytes([data[offset], data[offset + 1]])
}
