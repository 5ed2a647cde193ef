use num_bigint::{BigInt, BigUint, Sign};
use num_traits::Zero;
use smallvec::SmallVec;

use crate::cell::{Cell, CellParts, CellSlice, CellType, Store, MAX_BIT_LEN, MAX_REF_COUNT};
use crate::dict::{DictKey, HashmapE};
use crate::error::Error;
use crate::models::Address;
use crate::util::augment;

/// Builder for constructing cells with densely packed data.
#[derive(Clone)]
pub struct CellBuilder {
    data: [u8; 128],
    bit_len: u16,
    bit_capacity: u16,
    is_exotic: bool,
    references: SmallVec<[Cell; MAX_REF_COUNT]>,
}

impl Default for CellBuilder {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CellBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CellBuilder")
            .field("data", &format_args!("{}", self.as_bitstring()))
            .field("bit_len", &self.bit_len)
            .field("is_exotic", &self.is_exotic)
            .field("references", &self.references)
            .finish()
    }
}

impl CellBuilder {
    /// Creates an empty cell builder with the default capacity of 1023 bits.
    pub fn new() -> Self {
        Self {
            data: [0; 128],
            bit_len: 0,
            bit_capacity: MAX_BIT_LEN,
            is_exotic: false,
            references: SmallVec::new(),
        }
    }

    /// Creates an empty cell builder which accepts at most `bits` data bits.
    pub fn with_bit_capacity(bits: u16) -> Self {
        Self {
            bit_capacity: std::cmp::min(bits, MAX_BIT_LEN),
            ..Self::new()
        }
    }

    /// Builds a new ordinary cell with the value stored into it.
    pub fn build_from<T: Store>(value: T) -> Result<Cell, Error> {
        let mut builder = Self::new();
        ok!(value.store_into(&mut builder));
        builder.build()
    }

    /// Returns the data size of this cell in bits.
    #[inline]
    pub fn bit_len(&self) -> u16 {
        self.bit_len
    }

    /// Returns data bytes without the completion tag.
    #[inline]
    pub fn raw_data(&self) -> &[u8] {
        &self.data[..(self.bit_len as usize).div_ceil(8)]
    }

    #[inline]
    pub fn references(&self) -> &[Cell] {
        &self.references
    }

    #[inline]
    pub fn spare_bits_capacity(&self) -> u16 {
        self.bit_capacity - self.bit_len
    }

    #[inline]
    pub fn spare_refs_capacity(&self) -> u8 {
        (MAX_REF_COUNT - self.references.len()) as u8
    }

    #[inline]
    pub fn has_capacity(&self, bits: u16, refs: u8) -> bool {
        self.bit_len as usize + bits as usize <= self.bit_capacity as usize
            && self.references.len() + refs as usize <= MAX_REF_COUNT
    }

    /// Marks this cell as exotic. Its type is then read from the first data byte.
    #[inline]
    pub fn set_exotic(&mut self, is_exotic: bool) {
        self.is_exotic = is_exotic;
    }

    #[inline]
    fn require_bits(&self, bits: u16) -> Result<(), Error> {
        if self.bit_len as usize + bits as usize <= self.bit_capacity as usize {
            Ok(())
        } else {
            Err(Error::CapacityExceeded)
        }
    }

    #[inline]
    fn require_refs(&self, refs: usize) -> Result<(), Error> {
        if self.references.len() + refs <= MAX_REF_COUNT {
            Ok(())
        } else {
            Err(Error::RefLimitExceeded)
        }
    }

    /// Appends `bits` bits from the start of `value` (MSB first).
    pub fn store_raw(&mut self, value: &[u8], bits: u16) -> Result<(), Error> {
        let byte_len = (bits as usize).div_ceil(8);
        if value.len() < byte_len {
            return Err(Error::InvalidData);
        }
        ok!(self.require_bits(bits));
        if bits == 0 {
            return Ok(());
        }

        let q = (self.bit_len / 8) as usize;
        let r = (self.bit_len % 8) as u32;
        let new_bit_len = self.bit_len + bits;
        let end = (new_bit_len as usize).div_ceil(8);

        if r == 0 {
            self.data[q..q + byte_len].copy_from_slice(&value[..byte_len]);
        } else {
            // ___xxxxx|yyyyyyyy -> keep the first `r` bits of the current byte
            self.data[q] = (self.data[q] & !(0xff >> r)) | (value[0] >> r);
            for i in q + 1..end {
                let j = i - q - 1;
                let hi = value[j] << (8 - r);
                let lo = value.get(j + 1).map_or(0, |byte| byte >> r);
                self.data[i] = hi | lo;
            }
        }

        let rem = (new_bit_len % 8) as u32;
        if rem != 0 {
            self.data[end - 1] &= 0xff << (8 - rem);
        }

        self.bit_len = new_bit_len;
        Ok(())
    }

    pub fn store_zeros(&mut self, bits: u16) -> Result<(), Error> {
        ok!(self.require_bits(bits));
        self.bit_len += bits;
        Ok(())
    }

    pub fn store_bit_zero(&mut self) -> Result<(), Error> {
        self.store_zeros(1)
    }

    pub fn store_bit_one(&mut self) -> Result<(), Error> {
        ok!(self.require_bits(1));
        let q = (self.bit_len / 8) as usize;
        let r = self.bit_len % 8;
        self.data[q] |= 1 << (7 - r);
        self.bit_len += 1;
        Ok(())
    }

    #[inline]
    pub fn store_bit(&mut self, bit: bool) -> Result<(), Error> {
        if bit {
            self.store_bit_one()
        } else {
            self.store_bit_zero()
        }
    }

    /// Appends a sequence of bits.
    pub fn store_bits(&mut self, bits: &[bool]) -> Result<(), Error> {
        if bits.len() > u16::MAX as usize {
            return Err(Error::CapacityExceeded);
        }
        ok!(self.require_bits(bits.len() as u16));
        for bit in bits {
            ok!(self.store_bit(*bit));
        }
        Ok(())
    }

    /// Appends an unsigned integer of the specified width (up to 64 bits).
    pub fn store_uint(&mut self, value: u64, bits: u16) -> Result<(), Error> {
        if bits > 64 {
            return self.store_big_uint(&BigUint::from(value), bits);
        }
        if bits < 64 && value >> bits != 0 {
            return Err(Error::IntOverflow);
        }
        ok!(self.require_bits(bits));
        if bits == 0 {
            return Ok(());
        }
        self.store_raw(&(value << (64 - bits)).to_be_bytes(), bits)
    }

    /// Appends a two's complement signed integer of the specified width (up to 64 bits).
    pub fn store_int(&mut self, value: i64, bits: u16) -> Result<(), Error> {
        if bits > 64 {
            return self.store_big_int(&BigInt::from(value), bits);
        }
        let fits = match bits {
            0 => value == 0,
            64 => true,
            _ => {
                let min = -(1i64 << (bits - 1));
                (min..-min).contains(&value)
            }
        };
        if !fits {
            return Err(Error::IntOverflow);
        }
        ok!(self.require_bits(bits));
        if bits == 0 {
            return Ok(());
        }
        self.store_raw(&((value as u64) << (64 - bits)).to_be_bytes(), bits)
    }

    #[inline]
    pub fn store_u8(&mut self, value: u8) -> Result<(), Error> {
        self.store_raw(&[value], 8)
    }

    #[inline]
    pub fn store_u16(&mut self, value: u16) -> Result<(), Error> {
        self.store_raw(&value.to_be_bytes(), 16)
    }

    #[inline]
    pub fn store_u32(&mut self, value: u32) -> Result<(), Error> {
        self.store_raw(&value.to_be_bytes(), 32)
    }

    #[inline]
    pub fn store_u64(&mut self, value: u64) -> Result<(), Error> {
        self.store_raw(&value.to_be_bytes(), 64)
    }

    /// Appends an arbitrary width unsigned integer.
    pub fn store_big_uint(&mut self, value: &BigUint, bits: u16) -> Result<(), Error> {
        if value.bits() > bits as u64 {
            return Err(Error::IntOverflow);
        }
        ok!(self.require_bits(bits));
        if bits == 0 {
            return Ok(());
        }

        let byte_len = (bits as usize).div_ceil(8);
        let shift = byte_len * 8 - bits as usize;
        let bytes = (value << shift).to_bytes_be();

        let mut aligned = vec![0u8; byte_len];
        if !value.is_zero() {
            aligned[byte_len - bytes.len()..].copy_from_slice(&bytes);
        }
        self.store_raw(&aligned, bits)
    }

    /// Appends an arbitrary width two's complement signed integer.
    pub fn store_big_int(&mut self, value: &BigInt, bits: u16) -> Result<(), Error> {
        let fits = match bits {
            0 => value.is_zero(),
            _ => {
                let limit = BigInt::from(1) << (bits - 1);
                -&limit <= *value && *value < limit
            }
        };
        if !fits {
            return Err(Error::IntOverflow);
        }

        let unsigned = match value.sign() {
            Sign::Minus => (BigInt::from(1) << bits) + value,
            _ => value.clone(),
        };
        match unsigned.to_biguint() {
            Some(unsigned) => self.store_big_uint(&unsigned, bits),
            None => Err(Error::IntOverflow),
        }
    }

    /// Appends `VarUInteger max_len`: a `ceil(log2(max_len))`-bit byte count
    /// followed by the value itself.
    pub fn store_var_uint(&mut self, value: &BigUint, max_len: u16) -> Result<(), Error> {
        let len_bits = var_len_bits(max_len);
        let byte_len = value.bits().div_ceil(8) as u16;
        if byte_len >= max_len {
            return Err(Error::IntOverflow);
        }
        ok!(self.require_bits(len_bits + byte_len * 8));

        ok!(self.store_uint(byte_len as u64, len_bits));
        self.store_big_uint(value, byte_len * 8)
    }

    /// Appends `VarInteger max_len`.
    pub fn store_var_int(&mut self, value: &BigInt, max_len: u16) -> Result<(), Error> {
        let len_bits = var_len_bits(max_len);
        let byte_len = if value.is_zero() {
            0
        } else {
            value.to_signed_bytes_be().len() as u16
        };
        if byte_len >= max_len {
            return Err(Error::IntOverflow);
        }
        ok!(self.require_bits(len_bits + byte_len * 8));

        ok!(self.store_uint(byte_len as u64, len_bits));
        self.store_big_int(value, byte_len * 8)
    }

    /// Appends an amount of nanotokens as `VarUInteger 16`.
    pub fn store_coins(&mut self, amount: u128) -> Result<(), Error> {
        self.store_var_uint(&BigUint::from(amount), 16)
    }

    pub fn store_bytes(&mut self, bytes: &[u8]) -> Result<(), Error> {
        if bytes.len() * 8 > MAX_BIT_LEN as usize {
            return Err(Error::CapacityExceeded);
        }
        self.store_raw(bytes, (bytes.len() * 8) as u16)
    }

    /// Appends UTF-8 bytes of the string.
    #[inline]
    pub fn store_string(&mut self, value: &str) -> Result<(), Error> {
        self.store_bytes(value.as_bytes())
    }

    /// Appends `MsgAddressInt` (`addr_std$10`) or `addr_none$00` for `None`.
    pub fn store_address(&mut self, address: Option<&Address>) -> Result<(), Error> {
        match address {
            None => self.store_zeros(2),
            Some(address) => {
                ok!(self.require_bits(Address::BITS));
                // addr_std$10 anycast:(Maybe Anycast)
                ok!(self.store_uint(0b100, 3));
                ok!(self.store_u8(address.workchain as u8));
                self.store_raw(&address.hash, 256)
            }
        }
    }

    /// Appends remaining bits and refs of the slice.
    pub fn store_slice(&mut self, slice: &CellSlice) -> Result<(), Error> {
        let bits = slice.remaining_bits();
        let refs = slice.remaining_refs();
        ok!(self.require_refs(refs as usize));
        ok!(self.require_bits(bits));

        let mut buffer = [0u8; 128];
        let data = ok!(slice.get_raw(0, &mut buffer, bits));
        ok!(self.store_raw(data, bits));

        for i in 0..refs {
            if let Some(cell) = slice.get_reference(i) {
                self.references.push(cell.clone());
            }
        }
        Ok(())
    }

    /// Appends a child cell.
    pub fn store_reference(&mut self, cell: Cell) -> Result<(), Error> {
        ok!(self.require_refs(1));
        self.references.push(cell);
        Ok(())
    }

    /// Appends all child cells, failing before any of them is added.
    pub fn store_references<I>(&mut self, cells: I) -> Result<(), Error>
    where
        I: IntoIterator<Item = Cell>,
    {
        let cells = cells.into_iter().collect::<SmallVec<[Cell; MAX_REF_COUNT]>>();
        ok!(self.require_refs(cells.len()));
        self.references.extend(cells);
        Ok(())
    }

    /// Appends `Maybe ^Cell`.
    pub fn store_maybe_reference(&mut self, cell: Option<Cell>) -> Result<(), Error> {
        match cell {
            Some(cell) => {
                ok!(self.require_bits(1));
                ok!(self.require_refs(1));
                ok!(self.store_bit_one());
                self.store_reference(cell)
            }
            None => self.store_bit_zero(),
        }
    }

    /// Appends a dictionary (`HashmapE`), or a single zero bit if it is absent.
    pub fn store_dict<K, V>(&mut self, dict: Option<&HashmapE<K, V>>) -> Result<(), Error>
    where
        K: DictKey,
        V: Store,
    {
        match dict {
            Some(dict) => dict.store_into(self),
            None => self.store_bit_zero(),
        }
    }

    /// Returns the data of this builder as a bitstring.
    #[inline]
    pub fn as_bitstring(&self) -> crate::util::Bitstring<'_> {
        crate::util::Bitstring {
            bytes: self.raw_data(),
            bit_len: self.bit_len,
        }
    }

    /// Tries to build a new cell.
    ///
    /// The cell is exotic if [`set_exotic`] was called.
    ///
    /// [`set_exotic`]: CellBuilder::set_exotic
    pub fn build(self) -> Result<Cell, Error> {
        let data = augment(&self.data, self.bit_len);
        CellParts {
            bit_len: self.bit_len,
            is_exotic: self.is_exotic,
            references: self.references,
            data: &data,
        }
        .finalize(true)
    }

    /// Tries to build a new cell of the specified type.
    pub fn build_with_type(mut self, cell_type: CellType) -> Result<Cell, Error> {
        self.is_exotic = cell_type.is_exotic();
        let cell = ok!(self.build());
        if cell.cell_type() != cell_type {
            return Err(Error::MalformedCell("cell type byte mismatch"));
        }
        Ok(cell)
    }
}

/// Number of bits for the length prefix of `VarUInteger max_len`.
pub(crate) const fn var_len_bits(max_len: u16) -> u16 {
    if max_len <= 1 {
        0
    } else {
        (u16::BITS - (max_len - 1).leading_zeros()) as u16
    }
}
