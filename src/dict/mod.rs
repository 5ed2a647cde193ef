//! Dictionary implementation.
//!
//! `Hashmap n X` is a binary trie (Patricia tree) over `n`-bit keys, stored
//! in cells: every node starts with a label (a common key prefix), followed
//! either by the value (when the key is complete) or by two references to the
//! left (`0`) and right (`1`) subtrees. `HashmapE n X` adds a presence bit.

use std::collections::BTreeMap;

use num_bigint::BigUint;

use crate::cell::*;
use crate::error::Error;
use crate::util::get_bit;

#[cfg(test)]
mod tests;

/// Type which can be used as a dictionary key.
pub trait DictKey: Ord + Sized {
    /// Writes the key as exactly `key_bit_len` bits.
    fn store_key(&self, key_bit_len: u16, builder: &mut CellBuilder) -> Result<(), Error>;

    /// Reads the key from exactly `key_bit_len` bits.
    fn load_key(key_bit_len: u16, slice: &mut CellSlice) -> Result<Self, Error>;
}

macro_rules! impl_dict_key_int {
    ($($ty:ty => $store:ident, $load:ident),*$(,)?) => {$(
        impl DictKey for $ty {
            #[inline]
            fn store_key(&self, key_bit_len: u16, builder: &mut CellBuilder) -> Result<(), Error> {
                builder.$store(*self as _, key_bit_len)
            }

            fn load_key(key_bit_len: u16, slice: &mut CellSlice) -> Result<Self, Error> {
                let value = ok!(slice.$load(key_bit_len));
                <$ty>::try_from(value).map_err(|_| Error::IntOverflow)
            }
        }
    )*};
}

impl_dict_key_int! {
    u8 => store_uint, load_uint,
    u16 => store_uint, load_uint,
    u32 => store_uint, load_uint,
    u64 => store_uint, load_uint,
    i8 => store_int, load_int,
    i16 => store_int, load_int,
    i32 => store_int, load_int,
    i64 => store_int, load_int,
}

impl DictKey for CellHash {
    fn store_key(&self, key_bit_len: u16, builder: &mut CellBuilder) -> Result<(), Error> {
        if key_bit_len != 256 {
            return Err(Error::InvalidData);
        }
        builder.store_raw(self, 256)
    }

    fn load_key(key_bit_len: u16, slice: &mut CellSlice) -> Result<Self, Error> {
        if key_bit_len != 256 {
            return Err(Error::InvalidData);
        }
        CellHash::load_from(slice)
    }
}

impl DictKey for BigUint {
    #[inline]
    fn store_key(&self, key_bit_len: u16, builder: &mut CellBuilder) -> Result<(), Error> {
        builder.store_big_uint(self, key_bit_len)
    }

    #[inline]
    fn load_key(key_bit_len: u16, slice: &mut CellSlice) -> Result<Self, Error> {
        slice.load_big_uint(key_bit_len)
    }
}

/// Dictionary with fixed-width keys (`Hashmap n X`).
///
/// Entries are kept in key order. An empty `Hashmap` has no cell
/// representation, use [`HashmapE`] for possibly empty dictionaries.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Hashmap<K, V> {
    key_bit_len: u16,
    entries: BTreeMap<K, V>,
}

impl<K: Ord, V> Hashmap<K, V> {
    /// Creates an empty dictionary with the specified key width.
    pub const fn new(key_bit_len: u16) -> Self {
        Self {
            key_bit_len,
            entries: BTreeMap::new(),
        }
    }

    /// Creates a dictionary from key-value pairs. Later duplicates win.
    pub fn from_entries<I>(key_bit_len: u16, entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
    {
        Self {
            key_bit_len,
            entries: entries.into_iter().collect(),
        }
    }

    #[inline]
    pub fn key_bit_len(&self) -> u16 {
        self.key_bit_len
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn get(&self, key: &K) -> Option<&V> {
        self.entries.get(key)
    }

    #[inline]
    pub fn contains_key(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Inserts a value, returning the previous one.
    #[inline]
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        self.entries.insert(key, value)
    }

    #[inline]
    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.entries.remove(key)
    }

    #[inline]
    pub fn iter(&self) -> std::collections::btree_map::Iter<'_, K, V> {
        self.entries.iter()
    }

    #[inline]
    pub fn keys(&self) -> std::collections::btree_map::Keys<'_, K, V> {
        self.entries.keys()
    }

    #[inline]
    pub fn values(&self) -> std::collections::btree_map::Values<'_, K, V> {
        self.entries.values()
    }
}

impl<K: DictKey, V: Store> Hashmap<K, V> {
    /// Writes the root node of the trie into the builder.
    ///
    /// Fails with [`Error::InvalidData`] for an empty dictionary.
    pub fn store_root(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        if self.entries.is_empty() {
            return Err(Error::InvalidData);
        }

        let mut entries = Vec::with_capacity(self.entries.len());
        for (key, value) in &self.entries {
            let mut key_bits = CellBuilder::new();
            ok!(key.store_key(self.key_bit_len, &mut key_bits));
            if key_bits.bit_len() != self.key_bit_len {
                return Err(Error::InvalidData);
            }
            entries.push((key_bits, value));
        }
        // Trie order is the lexicographic order of key bits
        entries.sort_unstable_by(|(a, _), (b, _)| a.raw_data().cmp(b.raw_data()));

        write_node(builder, &entries, 0, self.key_bit_len)
    }

    /// Builds a cell with the root node of the trie.
    pub fn build_root(&self) -> Result<Cell, Error> {
        let mut builder = CellBuilder::new();
        ok!(self.store_root(&mut builder));
        builder.build()
    }
}

impl<K: DictKey, V: Load> Hashmap<K, V> {
    /// Reads the whole trie starting from the root node in the slice.
    pub fn load_root(slice: &mut CellSlice, key_bit_len: u16) -> Result<Self, Error> {
        let mut entries = BTreeMap::new();
        ok!(read_node(
            slice,
            key_bit_len,
            &CellBuilder::new(),
            key_bit_len,
            &mut entries
        ));
        Ok(Self {
            key_bit_len,
            entries,
        })
    }

    /// Reads the whole trie from the cell with the root node.
    #[inline]
    pub fn parse(key_bit_len: u16, root: &Cell) -> Result<Self, Error> {
        Self::load_root(&mut root.as_slice(), key_bit_len)
    }
}

impl<'a, K, V> IntoIterator for &'a Hashmap<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = std::collections::btree_map::Iter<'a, K, V>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Dictionary which may be empty (`HashmapE n X`).
///
/// Serialized as `hme_empty$0` or `hme_root$1 root:^(Hashmap n X)`.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct HashmapE<K, V>(Hashmap<K, V>);

impl<K: Ord, V> HashmapE<K, V> {
    /// Creates an empty dictionary with the specified key width.
    pub const fn new(key_bit_len: u16) -> Self {
        Self(Hashmap::new(key_bit_len))
    }

    /// Returns the underlying dictionary.
    #[inline]
    pub fn into_inner(self) -> Hashmap<K, V> {
        self.0
    }
}

impl<K, V> From<Hashmap<K, V>> for HashmapE<K, V> {
    #[inline]
    fn from(value: Hashmap<K, V>) -> Self {
        Self(value)
    }
}

impl<K, V> std::ops::Deref for HashmapE<K, V> {
    type Target = Hashmap<K, V>;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<K, V> std::ops::DerefMut for HashmapE<K, V> {
    #[inline]
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl<K: DictKey, V: Store> HashmapE<K, V> {
    /// Returns the root cell, or `None` for an empty dictionary.
    pub fn root(&self) -> Result<Option<Cell>, Error> {
        if self.0.is_empty() {
            Ok(None)
        } else {
            self.0.build_root().map(Some)
        }
    }
}

impl<K: DictKey, V: Store> Store for HashmapE<K, V> {
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        let root = ok!(self.root());
        builder.store_maybe_reference(root)
    }
}

impl<K: DictKey, V: Load> HashmapE<K, V> {
    /// Reads the presence bit and, if it is set, the referenced trie.
    ///
    /// Nothing is consumed on failure.
    pub fn load_from(slice: &mut CellSlice, key_bit_len: u16) -> Result<Self, Error> {
        let Some(root) = ok!(slice.preload_maybe_reference()) else {
            ok!(slice.skip_bits(1));
            return Ok(Self::new(key_bit_len));
        };

        let map = ok!(Hashmap::parse(key_bit_len, &root));
        ok!(slice.skip_dict());
        Ok(Self(map))
    }
}

/// Serializes a subtree of entries which all share the first `offset` key bits.
fn write_node<V: Store>(
    builder: &mut CellBuilder,
    entries: &[(CellBuilder, &V)],
    offset: u16,
    key_bit_len: u16,
) -> Result<(), Error> {
    let (Some((first, value)), Some((last, _))) = (entries.first(), entries.last()) else {
        return Err(Error::InvalidData);
    };
    let first = first.raw_data();
    let last = last.raw_data();

    let mut prefix_len = 0;
    while offset + prefix_len < key_bit_len
        && get_bit(first, offset + prefix_len) == get_bit(last, offset + prefix_len)
    {
        prefix_len += 1;
    }

    ok!(write_label(first, offset, prefix_len, key_bit_len - offset, builder));

    let offset = offset + prefix_len;
    if offset == key_bit_len {
        if entries.len() != 1 {
            // Distinct keys produced equal bits
            return Err(Error::InvalidData);
        }
        return value.store_into(builder);
    }

    let split = entries.partition_point(|(key, _)| !get_bit(key.raw_data(), offset));
    for branch in [&entries[..split], &entries[split..]] {
        let mut child = CellBuilder::new();
        ok!(write_node(&mut child, branch, offset + 1, key_bit_len));
        ok!(builder.store_reference(ok!(child.build())));
    }
    Ok(())
}

/// Parses a subtree which has `remaining` key bits left after `prefix`.
fn read_node<K: DictKey, V: Load>(
    slice: &mut CellSlice,
    remaining: u16,
    prefix: &CellBuilder,
    key_bit_len: u16,
    entries: &mut BTreeMap<K, V>,
) -> Result<(), Error> {
    let mut prefix = prefix.clone();
    let label_len = ok!(read_label(slice, remaining, &mut prefix));
    let remaining = remaining - label_len;

    if remaining == 0 {
        let key = {
            let key = ok!(prefix.build());
            ok!(K::load_key(key_bit_len, &mut key.as_slice()))
        };
        let value = ok!(V::load_from(slice));
        entries.insert(key, value);
        return Ok(());
    }

    let left = ok!(slice.load_reference());
    let right = ok!(slice.load_reference());
    for (bit, child) in [(false, left), (true, right)] {
        let mut child_prefix = prefix.clone();
        ok!(child_prefix.store_bit(bit));
        ok!(read_node(
            &mut child.as_slice(),
            remaining - 1,
            &child_prefix,
            key_bit_len,
            entries
        ));
    }
    Ok(())
}

/// Number of bits for the label length (`#<= m`).
#[inline]
const fn bits_for_len(max_len: u16) -> u16 {
    (16 - max_len.leading_zeros()) as u16
}

/// Writes `len` bits of the key starting from `offset` as the most compact label.
fn write_label(
    key: &[u8],
    offset: u16,
    len: u16,
    max_len: u16,
    label: &mut CellBuilder,
) -> Result<(), Error> {
    let bits_for_len = bits_for_len(max_len);

    let hml_short_len = 2 + 2 * len;
    let hml_long_len = 2 + bits_for_len + len;
    let hml_same_len = 3 + bits_for_len;

    if len > 0 && hml_same_len < hml_long_len && hml_same_len < hml_short_len {
        let bit = get_bit(key, offset);
        if (offset..offset + len).all(|i| get_bit(key, i) == bit) {
            // hml_same$11 v:Bit n:(#<= m)
            ok!(label.store_uint(0b110 | bit as u64, 3));
            return label.store_uint(len as u64, bits_for_len);
        }
    }

    if hml_short_len <= hml_long_len {
        // hml_short$0 len:(Unary ~n) s:(n * Bit)
        ok!(label.store_bit_zero());
        for _ in 0..len {
            ok!(label.store_bit_one());
        }
        ok!(label.store_bit_zero());
    } else {
        // hml_long$10 n:(#<= m) s:(n * Bit)
        ok!(label.store_uint(0b10, 2));
        ok!(label.store_uint(len as u64, bits_for_len));
    }

    for i in offset..offset + len {
        ok!(label.store_bit(get_bit(key, i)));
    }
    Ok(())
}

/// Reads a label, appends its bits to the key prefix and returns its length.
fn read_label(label: &mut CellSlice, max_len: u16, prefix: &mut CellBuilder) -> Result<u16, Error> {
    let bits_for_len = bits_for_len(max_len);

    let len = if !ok!(label.load_bit()) {
        let mut len = 0;
        while ok!(label.load_bit()) {
            len += 1;
        }
        if len > max_len {
            return Err(Error::InvalidData);
        }
        let mut buffer = [0u8; 128];
        ok!(prefix.store_raw(ok!(label.load_raw(&mut buffer, len)), len));
        len
    } else if !ok!(label.load_bit()) {
        let len = ok!(label.load_uint(bits_for_len)) as u16;
        if len > max_len {
            return Err(Error::InvalidData);
        }
        let mut buffer = [0u8; 128];
        ok!(prefix.store_raw(ok!(label.load_raw(&mut buffer, len)), len));
        len
    } else {
        let bit = ok!(label.load_bit());
        let len = ok!(label.load_uint(bits_for_len)) as u16;
        if len > max_len {
            return Err(Error::InvalidData);
        }
        for _ in 0..len {
            ok!(prefix.store_bit(bit));
        }
        len
    };

    Ok(len)
}
