use num_bigint::{BigInt, BigUint};

use super::builder::var_len_bits;
use crate::cell::{Cell, CellBuilder, CellType, Load, LevelMask};
use crate::dict::{DictKey, HashmapE};
use crate::error::Error;
use crate::models::Address;
use crate::util::get_bit;

/// A draining view over the data and references of a cell.
///
/// Every `load_*` method advances the window, `preload_*` and `get_*`
/// methods leave it untouched. Failed reads never advance the window.
#[derive(Debug, Clone)]
pub struct CellSlice {
    cell: Cell,
    bits_window_start: u16,
    bits_window_end: u16,
    refs_window_start: u8,
    refs_window_end: u8,
}

impl CellSlice {
    /// Constructs a new cell slice from the specified cell.
    pub fn new(cell: Cell) -> Self {
        Self {
            bits_window_start: 0,
            bits_window_end: cell.bit_len(),
            refs_window_start: 0,
            refs_window_end: cell.reference_count(),
            cell,
        }
    }

    /// Returns the underlying cell.
    #[inline]
    pub fn cell(&self) -> &Cell {
        &self.cell
    }

    #[inline]
    pub fn cell_type(&self) -> CellType {
        self.cell.cell_type()
    }

    #[inline]
    pub fn level_mask(&self) -> LevelMask {
        self.cell.level_mask()
    }

    /// Returns whether there are no bits of data left.
    #[inline]
    pub fn is_data_empty(&self) -> bool {
        self.bits_window_start >= self.bits_window_end
    }

    /// Returns whether there are no references left.
    #[inline]
    pub fn is_refs_empty(&self) -> bool {
        self.refs_window_start >= self.refs_window_end
    }

    /// Returns the number of remaining bits of data in the slice.
    #[inline]
    pub fn remaining_bits(&self) -> u16 {
        self.bits_window_end.saturating_sub(self.bits_window_start)
    }

    /// Returns the number of remaining references in the slice.
    #[inline]
    pub fn remaining_refs(&self) -> u8 {
        self.refs_window_end.saturating_sub(self.refs_window_start)
    }

    /// Returns the start of the data window.
    #[inline]
    pub fn bits_offset(&self) -> u16 {
        self.bits_window_start
    }

    #[inline]
    fn require_bits(&self, offset: u16, bits: u16) -> Result<u16, Error> {
        let index = self.bits_window_start as usize + offset as usize;
        if index + bits as usize <= self.bits_window_end as usize {
            Ok(index as u16)
        } else {
            Err(Error::BoundsExceeded)
        }
    }

    /// Advances the data window by `bits`.
    pub fn skip_bits(&mut self, bits: u16) -> Result<(), Error> {
        ok!(self.require_bits(0, bits));
        self.bits_window_start += bits;
        Ok(())
    }

    /// Alias for [`skip_bits`].
    ///
    /// [`skip_bits`]: CellSlice::skip_bits
    #[inline]
    pub fn skip(&mut self, bits: u16) -> Result<(), Error> {
        self.skip_bits(bits)
    }

    /// Advances the refs window by `refs`.
    pub fn skip_refs(&mut self, refs: u8) -> Result<(), Error> {
        if refs > self.remaining_refs() {
            return Err(Error::BoundsExceeded);
        }
        self.refs_window_start += refs;
        Ok(())
    }

    /// Skips `HashmapE`: one presence bit and a reference if it is set.
    pub fn skip_dict(&mut self) -> Result<(), Error> {
        if ok!(self.preload_bit()) {
            if self.is_refs_empty() {
                return Err(Error::BoundsExceeded);
            }
            self.refs_window_start += 1;
        }
        self.bits_window_start += 1;
        Ok(())
    }

    /// Reads the bit at the specified offset (relative to the current bits window).
    pub fn get_bit(&self, offset: u16) -> Result<bool, Error> {
        let index = ok!(self.require_bits(offset, 1));
        Ok(get_bit(self.cell.data(), index))
    }

    #[inline]
    pub fn preload_bit(&self) -> Result<bool, Error> {
        self.get_bit(0)
    }

    pub fn load_bit(&mut self) -> Result<bool, Error> {
        let bit = ok!(self.get_bit(0));
        self.bits_window_start += 1;
        Ok(bit)
    }

    /// Reads `bits` bits starting from the `offset` into the target buffer.
    ///
    /// Returns the filled part of the buffer, left-aligned with zero padding.
    pub fn get_raw<'b>(
        &self,
        offset: u16,
        target: &'b mut [u8],
        bits: u16,
    ) -> Result<&'b mut [u8], Error> {
        let byte_len = (bits as usize).div_ceil(8);
        if target.len() < byte_len {
            return Err(Error::InvalidData);
        }
        let index = ok!(self.require_bits(offset, bits));

        let data = self.cell.data();
        let q = (index / 8) as usize;
        let r = (index % 8) as u32;
        let target = &mut target[..byte_len];

        if r == 0 {
            target.copy_from_slice(&data[q..q + byte_len]);
        } else {
            // ___xxxxx|yyy_____ -> xxxxxyyy
            for (i, byte) in target.iter_mut().enumerate() {
                let hi = data.get(q + i).map_or(0, |byte| byte << r);
                let lo = data.get(q + i + 1).map_or(0, |byte| byte >> (8 - r));
                *byte = hi | lo;
            }
        }

        let rem = (bits % 8) as u32;
        if let Some(last) = target.last_mut() {
            if rem != 0 {
                *last &= 0xff << (8 - rem);
            }
        }

        Ok(target)
    }

    #[inline]
    pub fn preload_raw<'b>(&self, target: &'b mut [u8], bits: u16) -> Result<&'b mut [u8], Error> {
        self.get_raw(0, target, bits)
    }

    pub fn load_raw<'b>(&mut self, target: &'b mut [u8], bits: u16) -> Result<&'b mut [u8], Error> {
        let data = ok!(self.get_raw(0, target, bits));
        self.bits_window_start += bits;
        Ok(data)
    }

    /// Reads a sequence of bits.
    pub fn preload_bits(&self, bits: u16) -> Result<Vec<bool>, Error> {
        ok!(self.require_bits(0, bits));
        Ok((0..bits)
            .map(|i| get_bit(self.cell.data(), self.bits_window_start + i))
            .collect())
    }

    pub fn load_bits(&mut self, bits: u16) -> Result<Vec<bool>, Error> {
        let result = ok!(self.preload_bits(bits));
        self.bits_window_start += bits;
        Ok(result)
    }

    /// Reads an unsigned integer of the specified width (up to 64 bits).
    pub fn get_uint(&self, offset: u16, bits: u16) -> Result<u64, Error> {
        if bits > 64 {
            return Err(Error::IntOverflow);
        }
        let mut buffer = [0u8; 8];
        ok!(self.get_raw(offset, &mut buffer, bits));
        Ok(match bits {
            0 => 0,
            _ => u64::from_be_bytes(buffer) >> (64 - bits),
        })
    }

    #[inline]
    pub fn preload_uint(&self, bits: u16) -> Result<u64, Error> {
        self.get_uint(0, bits)
    }

    pub fn load_uint(&mut self, bits: u16) -> Result<u64, Error> {
        let value = ok!(self.get_uint(0, bits));
        self.bits_window_start += bits;
        Ok(value)
    }

    /// Reads a two's complement signed integer of the specified width (up to 64 bits).
    pub fn get_int(&self, offset: u16, bits: u16) -> Result<i64, Error> {
        if bits > 64 {
            return Err(Error::IntOverflow);
        }
        let mut buffer = [0u8; 8];
        ok!(self.get_raw(offset, &mut buffer, bits));
        Ok(match bits {
            0 => 0,
            // Arithmetic shift extends the sign bit
            _ => i64::from_be_bytes(buffer) >> (64 - bits),
        })
    }

    #[inline]
    pub fn preload_int(&self, bits: u16) -> Result<i64, Error> {
        self.get_int(0, bits)
    }

    pub fn load_int(&mut self, bits: u16) -> Result<i64, Error> {
        let value = ok!(self.get_int(0, bits));
        self.bits_window_start += bits;
        Ok(value)
    }

    #[inline]
    pub fn load_u8(&mut self) -> Result<u8, Error> {
        Ok(ok!(self.load_uint(8)) as u8)
    }

    #[inline]
    pub fn load_u16(&mut self) -> Result<u16, Error> {
        Ok(ok!(self.load_uint(16)) as u16)
    }

    #[inline]
    pub fn load_u32(&mut self) -> Result<u32, Error> {
        Ok(ok!(self.load_uint(32)) as u32)
    }

    #[inline]
    pub fn load_u64(&mut self) -> Result<u64, Error> {
        self.load_uint(64)
    }

    /// Reads an arbitrary width unsigned integer.
    pub fn get_big_uint(&self, offset: u16, bits: u16) -> Result<BigUint, Error> {
        let mut buffer = [0u8; 128];
        let data = ok!(self.get_raw(offset, &mut buffer, bits));
        let shift = data.len() * 8 - bits as usize;
        Ok(BigUint::from_bytes_be(data) >> shift)
    }

    #[inline]
    pub fn preload_big_uint(&self, bits: u16) -> Result<BigUint, Error> {
        self.get_big_uint(0, bits)
    }

    pub fn load_big_uint(&mut self, bits: u16) -> Result<BigUint, Error> {
        let value = ok!(self.get_big_uint(0, bits));
        self.bits_window_start += bits;
        Ok(value)
    }

    /// Reads an arbitrary width two's complement signed integer.
    pub fn get_big_int(&self, offset: u16, bits: u16) -> Result<BigInt, Error> {
        let unsigned = BigInt::from(ok!(self.get_big_uint(offset, bits)));
        if bits > 0 && ok!(self.get_bit(offset)) {
            Ok(unsigned - (BigInt::from(1) << bits))
        } else {
            Ok(unsigned)
        }
    }

    #[inline]
    pub fn preload_big_int(&self, bits: u16) -> Result<BigInt, Error> {
        self.get_big_int(0, bits)
    }

    pub fn load_big_int(&mut self, bits: u16) -> Result<BigInt, Error> {
        let value = ok!(self.get_big_int(0, bits));
        self.bits_window_start += bits;
        Ok(value)
    }

    /// Returns the total width and the payload width of a `VarUInteger max_len`.
    fn var_int_layout(&self, max_len: u16) -> Result<(u16, u16), Error> {
        let len_bits = var_len_bits(max_len);
        let byte_len = ok!(self.get_uint(0, len_bits)) as u16;
        let Some(value_bits) = byte_len.checked_mul(8) else {
            return Err(Error::BoundsExceeded);
        };
        let Some(total_bits) = len_bits.checked_add(value_bits) else {
            return Err(Error::BoundsExceeded);
        };
        ok!(self.require_bits(0, total_bits));
        Ok((len_bits, value_bits))
    }

    /// Reads `VarUInteger max_len`.
    pub fn preload_var_uint(&self, max_len: u16) -> Result<BigUint, Error> {
        let (len_bits, value_bits) = ok!(self.var_int_layout(max_len));
        self.get_big_uint(len_bits, value_bits)
    }

    pub fn load_var_uint(&mut self, max_len: u16) -> Result<BigUint, Error> {
        let (len_bits, value_bits) = ok!(self.var_int_layout(max_len));
        let value = ok!(self.get_big_uint(len_bits, value_bits));
        self.bits_window_start += len_bits + value_bits;
        Ok(value)
    }

    /// Reads `VarInteger max_len`.
    pub fn preload_var_int(&self, max_len: u16) -> Result<BigInt, Error> {
        let (len_bits, value_bits) = ok!(self.var_int_layout(max_len));
        self.get_big_int(len_bits, value_bits)
    }

    pub fn load_var_int(&mut self, max_len: u16) -> Result<BigInt, Error> {
        let (len_bits, value_bits) = ok!(self.var_int_layout(max_len));
        let value = ok!(self.get_big_int(len_bits, value_bits));
        self.bits_window_start += len_bits + value_bits;
        Ok(value)
    }

    /// Reads an amount of nanotokens (`VarUInteger 16`).
    pub fn preload_coins(&self) -> Result<u128, Error> {
        let value = ok!(self.preload_var_uint(16));
        u128::try_from(value).map_err(|_| Error::IntOverflow)
    }

    pub fn load_coins(&mut self) -> Result<u128, Error> {
        let value = ok!(self.preload_coins());
        let (len_bits, value_bits) = ok!(self.var_int_layout(16));
        self.bits_window_start += len_bits + value_bits;
        Ok(value)
    }

    /// Reads `len` bytes.
    pub fn preload_bytes(&self, len: usize) -> Result<Vec<u8>, Error> {
        if len > (self.remaining_bits() / 8) as usize {
            return Err(Error::BoundsExceeded);
        }
        let mut bytes = vec![0u8; len];
        ok!(self.get_raw(0, &mut bytes, (len * 8) as u16));
        Ok(bytes)
    }

    pub fn load_bytes(&mut self, len: usize) -> Result<Vec<u8>, Error> {
        let bytes = ok!(self.preload_bytes(len));
        self.bits_window_start += (len * 8) as u16;
        Ok(bytes)
    }

    /// Reads an UTF-8 string of `len` bytes or of all remaining whole bytes.
    pub fn preload_string(&self, len: Option<usize>) -> Result<String, Error> {
        let len = len.unwrap_or(self.remaining_bits() as usize / 8);
        let bytes = ok!(self.preload_bytes(len));
        String::from_utf8(bytes).map_err(|_| Error::InvalidData)
    }

    pub fn load_string(&mut self, len: Option<usize>) -> Result<String, Error> {
        let value = ok!(self.preload_string(len));
        self.bits_window_start += (value.len() * 8) as u16;
        Ok(value)
    }

    /// Reads `MsgAddressInt`, returning `None` for `addr_none$00`.
    ///
    /// Anycast is not supported and its presence bit is ignored.
    pub fn preload_address(&self) -> Result<Option<Address>, Error> {
        match ok!(self.get_uint(0, 2)) {
            0b00 => Ok(None),
            0b10 => {
                ok!(self.require_bits(0, Address::BITS));
                let workchain = ok!(self.get_int(3, 8)) as i8;
                let mut hash = [0u8; 32];
                ok!(self.get_raw(11, &mut hash, 256));
                Ok(Some(Address::new(workchain, hash)))
            }
            _ => Err(Error::InvalidAddressTag),
        }
    }

    pub fn load_address(&mut self) -> Result<Option<Address>, Error> {
        let address = ok!(self.preload_address());
        self.bits_window_start += match address {
            Some(_) => Address::BITS,
            None => 2,
        };
        Ok(address)
    }

    /// Returns a reference relative to the refs window.
    #[inline]
    pub fn get_reference(&self, index: u8) -> Option<&Cell> {
        if self.refs_window_start as usize + (index as usize) < self.refs_window_end as usize {
            self.cell.reference(self.refs_window_start + index)
        } else {
            None
        }
    }

    pub fn preload_reference(&self) -> Result<Cell, Error> {
        match self.get_reference(0) {
            Some(cell) => Ok(cell.clone()),
            None => Err(Error::BoundsExceeded),
        }
    }

    pub fn load_reference(&mut self) -> Result<Cell, Error> {
        let cell = ok!(self.preload_reference());
        self.refs_window_start += 1;
        Ok(cell)
    }

    /// Reads `Maybe ^Cell`.
    pub fn preload_maybe_reference(&self) -> Result<Option<Cell>, Error> {
        if ok!(self.preload_bit()) {
            self.preload_reference().map(Some)
        } else {
            Ok(None)
        }
    }

    pub fn load_maybe_reference(&mut self) -> Result<Option<Cell>, Error> {
        let cell = ok!(self.preload_maybe_reference());
        self.bits_window_start += 1;
        if cell.is_some() {
            self.refs_window_start += 1;
        }
        Ok(cell)
    }

    /// Reads `HashmapE n X`.
    pub fn preload_dict<K, V>(&self, key_bit_len: u16) -> Result<HashmapE<K, V>, Error>
    where
        K: DictKey,
        V: Load,
    {
        self.clone().load_dict(key_bit_len)
    }

    pub fn load_dict<K, V>(&mut self, key_bit_len: u16) -> Result<HashmapE<K, V>, Error>
    where
        K: DictKey,
        V: Load,
    {
        let mut slice = self.clone();
        let dict = ok!(HashmapE::load_from(&mut slice, key_bit_len));
        *self = slice;
        Ok(dict)
    }

    /// Reads a value which implements [`Load`].
    #[inline]
    pub fn load<T: Load>(&mut self) -> Result<T, Error> {
        T::load_from(self)
    }

    /// Copies remaining bits and refs into a new ordinary cell.
    pub fn load_remaining_as_cell(&mut self) -> Result<Cell, Error> {
        let mut builder = CellBuilder::new();
        ok!(builder.store_slice(self));
        let cell = ok!(builder.build());
        self.bits_window_start = self.bits_window_end;
        self.refs_window_start = self.refs_window_end;
        Ok(cell)
    }
}
