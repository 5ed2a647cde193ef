use rand::{Rng, SeedableRng};

use super::*;
use crate::boc::Boc;

fn read_label_bits(label: &Cell, max_len: u16) -> anyhow::Result<(u16, Cell)> {
    let mut prefix = CellBuilder::new();
    let len = read_label(&mut label.as_slice(), max_len, &mut prefix)?;
    Ok((len, prefix.build()?))
}

#[test]
fn labels() -> anyhow::Result<()> {
    // Short label for a mixed prefix
    let key = [0b0100_0000];
    let mut builder = CellBuilder::new();
    write_label(&key, 0, 2, 6, &mut builder)?;
    assert_eq!(builder.bit_len(), 2 + 2 * 2);
    let label = builder.build()?;

    let (len, prefix) = read_label_bits(&label, 6)?;
    assert_eq!(len, 2);
    assert_eq!(prefix.data(), &[0b0110_0000]);
    assert_eq!(prefix.bit_len(), 2);

    // Long label is shorter for the whole key
    let key = [0b0000_0100];
    let mut builder = CellBuilder::new();
    write_label(&key, 0, 6, 6, &mut builder)?;
    assert_eq!(builder.bit_len(), 2 + 3 + 6);
    let label = builder.build()?;

    let (len, prefix) = read_label_bits(&label, 6)?;
    assert_eq!(len, 6);
    assert_eq!(prefix.data(), &[0b0000_0110]);
    assert_eq!(prefix.bit_len(), 6);

    // Same label for uniform bits
    let key = [0xff; 4];
    let mut builder = CellBuilder::new();
    write_label(&key, 0, 32, 32, &mut builder)?;
    assert_eq!(builder.bit_len(), 3 + 6);
    let label = builder.build()?;

    let (len, prefix) = read_label_bits(&label, 32)?;
    assert_eq!(len, 32);
    assert_eq!(prefix.data(), &[0xff; 4]);

    // Long label for mixed bits
    let key = [0xaa; 4];
    let mut builder = CellBuilder::new();
    write_label(&key, 0, 32, 32, &mut builder)?;
    assert_eq!(builder.bit_len(), 2 + 6 + 32);
    let label = builder.build()?;

    let (len, prefix) = read_label_bits(&label, 32)?;
    assert_eq!(len, 32);
    assert_eq!(prefix.data(), &[0xaa; 4]);

    // Empty label
    let mut builder = CellBuilder::new();
    write_label(&[], 0, 0, 8, &mut builder)?;
    assert_eq!(builder.bit_len(), 2);

    Ok(())
}

#[test]
fn label_longer_than_key() -> anyhow::Result<()> {
    // hml_long$10 with n = 7 while only 4 key bits remain
    let mut builder = CellBuilder::new();
    builder.store_uint(0b10, 2)?;
    builder.store_uint(7, 3)?;
    builder.store_uint(0, 7)?;
    let label = builder.build()?;

    let mut prefix = CellBuilder::new();
    let res = read_label(&mut label.as_slice(), 4, &mut prefix);
    assert_eq!(res, Err(Error::InvalidData));
    Ok(())
}

#[test]
fn empty_dict() -> anyhow::Result<()> {
    let dict = HashmapE::<u32, u32>::new(32);
    assert!(dict.root()?.is_none());

    let mut builder = CellBuilder::new();
    dict.store_into(&mut builder)?;
    assert_eq!(builder.bit_len(), 1);
    assert!(builder.references().is_empty());

    let cell = builder.build()?;
    let mut slice = cell.as_slice();
    let parsed = HashmapE::<u32, u32>::load_from(&mut slice, 32)?;
    assert!(parsed.is_empty());
    assert_eq!(parsed.key_bit_len(), 32);
    assert!(slice.is_data_empty());

    let empty = Hashmap::<u32, u32>::new(32);
    assert_eq!(empty.build_root().unwrap_err(), Error::InvalidData);
    Ok(())
}

#[test]
fn single_entry() -> anyhow::Result<()> {
    let mut dict = Hashmap::<u16, u8>::new(16);
    dict.insert(0x1234, 0xab);

    let root = dict.build_root()?;
    // Whole key fits into one label, value follows it
    assert_eq!(root.reference_count(), 0);

    let parsed = Hashmap::<u16, u8>::parse(16, &root)?;
    assert_eq!(parsed, dict);
    Ok(())
}

#[test]
fn dict_iter() -> anyhow::Result<()> {
    let root = Boc::decode_base64("te6ccgEBFAEAeAABAcABAgPOQAUCAgHUBAMACQAAAI3gAAkAAACjoAIBIA0GAgEgCgcCASAJCAAJAAAAciAACQAAAIfgAgEgDAsACQAAAFZgAAkAAABsIAIBIBEOAgEgEA8ACQAAADqgAAkAAABQYAIBIBMSAAkAAAAe4AAJAAAAv2A=")?;
    let dict = HashmapE::<u32, u32>::load_from(&mut root.as_slice(), 32)?;

    assert_eq!(dict.len(), 10);
    for (i, key) in dict.keys().enumerate() {
        assert_eq!(*key, i as u32);
    }

    // Rebuilt dictionary must contain the same entries
    let mut builder = CellBuilder::new();
    dict.store_into(&mut builder)?;
    let rebuilt = builder.build()?;
    let parsed = HashmapE::<u32, u32>::load_from(&mut rebuilt.as_slice(), 32)?;
    assert_eq!(parsed, dict);
    Ok(())
}

#[test]
fn signed_keys() -> anyhow::Result<()> {
    let dict = Hashmap::from_entries(8, (-5i8..5).map(|i| (i, i as i64 * 1000)));

    let root = dict.build_root()?;
    let parsed = Hashmap::<i8, i64>::parse(8, &root)?;
    assert_eq!(parsed, dict);
    assert_eq!(parsed.get(&-5), Some(&-5000));
    Ok(())
}

#[test]
fn narrow_keys() -> anyhow::Result<()> {
    // Keys narrower than their Rust type
    let dict = Hashmap::from_entries(5, (0u32..32).map(|i| (i, i % 2 == 0)));
    let root = dict.build_root()?;
    let parsed = Hashmap::<u32, bool>::parse(5, &root)?;
    assert_eq!(parsed, dict);

    // Key does not fit the declared width
    let dict = Hashmap::from_entries(4, [(16u32, true)]);
    assert_eq!(dict.build_root().unwrap_err(), Error::IntOverflow);
    Ok(())
}

#[test]
fn cell_values() -> anyhow::Result<()> {
    let mut dict = HashmapE::<CellHash, Cell>::new(256);
    for i in 0..4u32 {
        let mut builder = CellBuilder::new();
        builder.store_u32(i)?;
        let cell = builder.build()?;
        dict.insert(*cell.repr_hash(), cell);
    }

    let mut builder = CellBuilder::new();
    builder.store_dict(Some(&dict))?;
    let cell = builder.build()?;

    let mut slice = cell.as_slice();
    let parsed = slice.load_dict::<CellHash, Cell>(256)?;
    assert!(slice.is_data_empty());
    assert!(slice.is_refs_empty());
    assert_eq!(parsed, dict);

    for (hash, value) in parsed.iter() {
        assert_eq!(value.repr_hash(), hash);
    }
    Ok(())
}

#[test]
fn big_uint_keys() -> anyhow::Result<()> {
    let dict = Hashmap::from_entries(
        200,
        (0u32..20).map(|i| (BigUint::from(i) << (i * 9), i as u16)),
    );
    let root = dict.build_root()?;
    let parsed = Hashmap::<BigUint, u16>::parse(200, &root)?;
    assert_eq!(parsed, dict);
    Ok(())
}

#[test]
fn random_round_trip() -> anyhow::Result<()> {
    crate::util::try_init_test_tracing(tracing_subscriber::filter::LevelFilter::INFO);

    let mut rng = rand_xorshift::XorShiftRng::seed_from_u64(123);
    for _ in 0..20 {
        let count = rng.gen_range(1..200);
        let dict = Hashmap::from_entries(32, (0..count).map(|_| (rng.gen::<u32>(), rng.gen::<u64>())));

        let root = dict.build_root()?;
        let parsed = Hashmap::<u32, u64>::parse(32, &root)?;
        assert_eq!(parsed, dict);
    }
    Ok(())
}

#[test]
fn truncated_node() -> anyhow::Result<()> {
    let dict = Hashmap::from_entries(32, [(1u32, 1u32), (2, 2)]);
    let root = dict.build_root()?;

    // Fork node without its second branch
    let mut builder = CellBuilder::new();
    let mut slice = root.as_slice();
    builder.store_raw(slice.load_raw(&mut [0u8; 128], root.bit_len())?, root.bit_len())?;
    builder.store_reference(slice.load_reference()?)?;
    let broken = builder.build()?;

    let res = Hashmap::<u32, u32>::parse(32, &broken);
    assert_eq!(res.unwrap_err(), Error::BoundsExceeded);
    Ok(())
}
