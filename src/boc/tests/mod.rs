use rand::{Rng, SeedableRng};

use super::*;
use crate::cell::{CellBuilder, CellType, MAX_BIT_LEN};
use crate::util::decode_base64;

const SINGLE_CELL_BOC: &str = "te6ccgEBAQEAWwAAsUgBUkKKaORs1v/d2CpkdS1rueLjL5EbgaivG/SlIBcUZ5cAKkhRTRyNmt/7uwVMjqWtdzxcZfIjcDUV436UpALijPLQ7msoAAYUWGAAAD6o4PtmhMeK8nJA";

const MERKLE_PROOF_BOC: &str = "te6ccgECBQEAARwACUYDcijLZ4hNbjcLQiThSx8fvxTaVufKbXsXRYbyiUZApXoADQEiccAJ2Y4sgpswmr6/odN0WmKosRtoIzobXRBE9uCeOA1nuXKSo06DG3E/cAAAdbacX3gRQHLHOx0TQAQCAdURYfZ8pYDdK5k1lnsEEJ4OmIYB/AiU4UX3zVZTToFyVwAAAYRmS/s2iLD7PlLAbpXMmss9gghPB0xDAP4ESnCi++arKadAuSuAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAACAsAMARaACLD7PlLAbpXMmss9gghPB0xDAP4ESnCi++arKadAuSuAQKEgBAYDWxHxKJVQ8mzl7cXFvP64eLF0kcXTFLiwZvYlkQrEFAAw=";

const CONTRACT_BOC: &str = "te6ccgECTAEADjkAAgaK2zVLAQQkiu1TIOMDIMD/4wIgwP7jAvILQgMCRwO+7UTQ10nDAfhmifhpIds80wABjhqBAgDXGCD5AQHTAAGU0/8DAZMC+ELi+RDyqJXTAAHyeuLTPwH4QyG58rQg+COBA+iogggbd0CgufK0+GPTHwH4I7zyudMfAds88jxIDwQEfO1E0NdJwwH4ZiLQ0wP6QDD4aak4APhEf29xggiYloBvcm1vc3BvdPhk4wIhxwDjAiHXDR/yvCHjAwHbPPI8Pz4+BAIoIIIQZ6C5X7vjAiCCEH1v8lS74wISBQM8IIIQaLVfP7rjAiCCEHPiIUO64wIgghB9b/JUuuMCDggGAzYw+Eby4Ez4Qm7jACGT1NHQ3vpA0ds8MNs88gBBB0YAaPhL+EnHBfLj6PhL+E34SnDIz4WAygBzz0DOcc8LblUgyM+QU/a2gssfzgHIzs3NyYBA+wADTjD4RvLgTPhCbuMAIZPU0dDe03/6QNN/1NHQ+kDSANTR2zww2zzyAEEJRgRu+Ev4SccF8uPoJcIA8uQaJfhMu/LkJCT6Qm8T1wv/wwAl+EvHBbOw8uQG2zxw+wJVA9s8iSXCAEktSAoBmo6AnCH5AMjPigBAy//J0OIx+EwnobV/+GxVIQL4S1UGVQR/yM+FgMoAc89AznHPC25VQMjPkZ6C5X7Lf85VIMjOygDMzc3JgQCA+wBbCwEKVHFU2zwMArj4S/hN+EGIyM+OK2zWzM7JVQQg+QD4KPpCbxLIz4ZAygfL/8nQBibIz4WIzgH6AovQAAAAAAAAAAAAAAAAB88WIds8zM+DVTDIz5BWgOPuzMsfzgHIzs3NyXH7AEsNADTQ0gABk9IEMd7SAAGT0gEx3vQE9AT0BNFfAwEcMPhCbuMA+Ebyc9HywGQPAhbtRNDXScIBjoDjDRBBA2Zw7UTQ9AVxIYBA9A6OgN9yIoBA9A6OgN9wIIj4bvht+Gz4a/hqgED0DvK91wv/+GJw+GMREUcBAolIBFAgghAPAliqu+MCIIIQIOvHbbvjAiCCEEap1+y74wIgghBnoLlfu+MCMCUcEwRQIIIQSWlYf7rjAiCCEFYlSK264wIgghBmXc6fuuMCIIIQZ6C5X7rjAhoYFhQDSjD4RvLgTPhCbuMAIZPU0dDe03/6QNTR0PpA0gDU0ds8MNs88gBBFUYC5PhJJNs8+QDIz4oAQMv/ydDHBfLkTNs8cvsC+EwloLV/+GwBjjVTAfhJU1b4SvhLcMjPhYDKAHPPQM5xzwtuVVDIz5HDYn8mzst/VTDIzlUgyM5ZyM7Mzc3NzZohyM+FCM6Ab89A4smBAICmArUH+wBfBC1JA+ww+Eby4Ez4Qm7jANMf+ERYb3X4ZNHbPCGOJSPQ0wH6QDAxyM+HIM6NBAAAAAAAAAAAAAAAAA5l3On4zxbMyXCOLvhEIG8TIW8S+ElVAm8RyHLPQMoAc89AzgH6AvQAgGrPQPhEbxXPCx/MyfhEbxTi+wDjAPIAQRc8ATT4RHBvcoBAb3Rwb3H4ZPhBiMjPjits1szOyUsDRjD4RvLgTPhCbuMAIZPU0dDe03/6QNTR0PpA1NHbPDDbPPIAQRlGARb4S/hJxwXy4+jbPDUD8DD4RvLgTPhCbuMA0x/4RFhvdfhk0ds8IY4mI9DTAfpAMDHIz4cgzo0EAAAAAAAAAAAAAAAADJaVh/jPFst/yXCOL/hEIG8TIW8S+ElVAm8RyHLPQMoAc89AzgH6AvQAgGrPQPhEbxXPCx/Lf8n4RG8U4vsA4wDyAEEbPAAg+ERwb3KAQG90cG9x+GT4TARQIIIQMgTsKbrjAiCCEEOE8pi64wIgghBEV0KEuuMCIIIQRqnX7LrjAiMhHx0DSjD4RvLgTPhCbuMAIZPU0dDe03/6QNTR0PpA0gDU0ds8MNs88gBBHkYBzPhL+EnHBfLj6CTCAPLkGiT4TLvy5CQj+kJvE9cL/8MAJPgoxwWzsPLkBts8cPsC+EwlobV/+GwC+EtVE3/Iz4WAygBzz0DOcc8LblVAyM+RnoLlfst/zlUgyM7KAMzNzcmBAID7AEkD4jD4RvLgTPhCbuMA0x/4RFhvdfhk0ds8IY4dI9DTAfpAMDHIz4cgznHPC2EByM+TEV0KEs7NyXCOMfhEIG8TIW8S+ElVAm8RyHLPQMoAc89AzgH6AvQAcc8LaQHI+ERvFc8LH87NyfhEbxTi+wDjAPIAQSA8ACD4RHBvcoBAb3Rwb3H4ZPhKA0Aw+Eby4Ez4Qm7jACGT1NHQ3tN/+kDSANTR2zww2zzyAEEiRgHw+Er4SccF8uPy2zxy+wL4TCSgtX/4bAGOMlRwEvhK+EtwyM+FgMoAc89AznHPC25VMMjPkep7eK7Oy39ZyM7Mzc3JgQCApgK1B/sAjigh+kJvE9cL/8MAIvgoxwWzsI4UIcjPhQjOgG/PQMmBAICmArUH+wDe4l8DSQP0MPhG8uBM+EJu4wDTH/hEWG91+GTTH9HbPCGOJiPQ0wH6QDAxyM+HIM6NBAAAAAAAAAAAAAAAAAsgTsKYzxbKAMlwji/4RCBvEyFvEvhJVQJvEchyz0DKAHPPQM4B+gL0AIBqz0D4RG8VzwsfygDJ+ERvFOL7AOMA8gBBJDwAmvhEcG9ygEBvdHBvcfhkIIIQMgTsKbohghBPR5+juiKCECpKxD66I4IQViVIrbokghAML/INuiWCEH7cHTe6VQWCEA8CWKq6sbGxsbGxBFAgghATMqkxuuMCIIIQFaA4+7rjAiCCEB8BMpG64wIgghAg68dtuuMCLiooJgM0MPhG8uBM+EJu4wAhk9TR0N76QNHbPOMA8gBBJzwBQvhL+EnHBfLj6Ns8cPsCyM+FCM6Ab89AyYEAgKYCtQf7AEoD4jD4RvLgTPhCbuMA0x/4RFhvdfhk0ds8IY4dI9DTAfpAMDHIz4cgznHPC2EByM+SfATKRs7NyXCOMfhEIG8TIW8S+ElVAm8RyHLPQMoAc89AzgH6AvQAcc8LaQHI+ERvFc8LH87NyfhEbxTi+wDjAPIAQSk8ACD4RHBvcoBAb3Rwb3H4ZPhLA0ww+Eby4Ez4Qm7jACGW1NMf1NHQk9TTH+L6QNTR0PpA0ds84wDyAEErPAJ4+En4SscFII6A3/LgZNs8cPsCIPpCbxPXC//DACH4KMcFs7COFCDIz4UIzoBvz0DJgQCApgK1B/sA3l8ELEkBJjAh2zz5AMjPigBAy//J0PhJxwUtAFRwyMv/cG2AQPRD+EpxWIBA9BYBcliAQPQWyPQAyfhOyM+EgPQA9ADPgckD8DD4RvLgTPhCbuMA0x/4RFhvdfhk0ds8IY4mI9DTAfpAMDHIz4cgzo0EAAAAAAAAAAAAAAAACTMqkxjPFssfyXCOL/hEIG8TIW8S+ElVAm8RyHLPQMoAc89AzgH6AvQAgGrPQPhEbxXPCx/LH8n4RG8U4vsA4wDyAEEvPAAg+ERwb3KAQG90cG9x+GT4TQRMIIIIhX76uuMCIIILNpGZuuMCIIIQDC/yDbrjAiCCEA8CWKq64wI7NjMxAzYw+Eby4Ez4Qm7jACGT1NHQ3vpA0ds8MNs88gBBMkYAQvhL+EnHBfLj6PhM8tQuyM+FCM6Ab89AyYEAgKYgtQf7AANGMPhG8uBM+EJu4wAhk9TR0N7Tf/pA1NHQ+kDU0ds8MNs88gBBNEYBFvhK+EnHBfLj8ts8NQGaI8IA8uQaI/hMu/LkJNs8cPsC+EwkobV/+GwC+EtVA/hKf8jPhYDKAHPPQM5xzwtuVUDIz5BkrUbGy3/OVSDIzlnIzszNzc3JgQCA+wBJA0Qw+Eby4Ez4Qm7jACGW1NMf1NHQk9TTH+L6QNHbPDDbPPIAQTdGAij4SvhJxwXy4/L4TSK6joCOgOJfAzo4AXL4SsjO+EsBzvhMAct/+E0Byx9SIMsfUhDO+E4BzCP7BCPQIIs4rbNYxwWT103Q3tdM0O0e7VPJ2zw5AATwAgEy2zxw+wIgyM+FCM6Ab89AyYEAgKYCtQf7AEkD7DD4RvLgTPhCbuMA0x/4RFhvdfhk0ds8IY4lI9DTAfpAMDHIz4cgzo0EAAAAAAAAAAAAAAAACAhX76jPFszJcI4u+EQgbxMhbxL4SVUCbxHIcs9AygBzz0DOAfoC9ACAas9A+ERvFc8LH8zJ+ERvFOL7AOMA8gBBPTwAKO1E0NP/0z8x+ENYyMv/yz/Oye1UACD4RHBvcoBAb3Rwb3H4ZPhOAAr4RvLgTAO8IdYfMfhG8uBM+EJu4wDbPHL7AiDTHzIgghBnoLlfuo49IdN/M/hMIaC1f/hs+EkB+Er4S3DIz4WAygBzz0DOcc8LblUgyM+Qn0I3ps7LfwHIzs3NyYEAgKYCtQf7AEFJQAGMjkAgghAZK1Gxuo41IdN/M/hMIaC1f/hs+Er4S3DIz4WAygBzz0DOcc8LblnIz5BwyoK2zst/zcmBAICmArUH+wDe4lvbPEYASu1E0NP/0z/TADH6QNTR0PpA03/TH9TR+G74bfhs+Gv4avhj+GICCvSkIPShREMAFHNvbCAwLjU3LjEELKAAAAAC2zxy+wKJ+GqJ+Gtw+Gxw+G1JSEhFA6aI+G6JAdAg+kD6QNN/0x/TH/pAN15A+Gr4a/hsMPhtMtQw+G4g+kJvE9cL/8MAIfgoxwWzsI4UIMjPhQjOgG/PQMmBAICmArUH+wDeMNs8+A/yAEdIRgBG+E74TfhM+Ev4SvhD+ELIy//LP8+DzlUwyM7Lf8sfzM3J7VQAAABDgAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAEAEe+CdvEGim/mChtX/bPLYJSgAMghAF9eEAAAwg+GHtHtk=";

fn simple_cell(value: u16) -> anyhow::Result<Cell> {
    let mut builder = CellBuilder::new();
    builder.store_u16(value)?;
    Ok(builder.build()?)
}

fn random_tree(rng: &mut rand_xorshift::XorShiftRng, depth: u8) -> anyhow::Result<Cell> {
    let mut data = [0u8; 128];
    rng.fill(&mut data[..]);

    let mut builder = CellBuilder::new();
    builder.store_raw(&data, rng.gen_range(0..=MAX_BIT_LEN))?;
    if depth > 0 {
        for _ in 0..rng.gen_range(0..=4) {
            builder.store_reference(random_tree(rng, depth - 1)?)?;
        }
    }
    Ok(builder.build()?)
}

#[test]
fn single_cell_golden() -> anyhow::Result<()> {
    let data = decode_base64(SINGLE_CELL_BOC)?;
    let cell = Boc::decode(&data)?;
    assert_eq!(cell.reference_count(), 0);
    assert_eq!(cell.bit_len(), 705);

    let options = ser::Options {
        with_index: false,
        with_crc: false,
    };
    let encoded = Boc::encode_roots(std::slice::from_ref(&cell), options)?;
    assert_eq!(encoded, data);
    Ok(())
}

#[test]
fn boc_with_crc() -> anyhow::Result<()> {
    crate::util::try_init_test_tracing(tracing_subscriber::filter::LevelFilter::TRACE);

    let boc_without_crc = decode_base64(CONTRACT_BOC)?;
    let cell = Boc::decode(&boc_without_crc)?;

    let mut boc_with_crc = Boc::encode(&cell);
    assert_eq!(boc_without_crc.len() + 4, boc_with_crc.len());
    assert_eq!(boc_with_crc[4] & BocTag::FLAG_HAS_CRC, BocTag::FLAG_HAS_CRC);

    let decoded = Boc::decode(&boc_with_crc)?;
    assert_eq!(decoded.repr_hash(), cell.repr_hash());

    if let Some(last_byte) = boc_with_crc.last_mut() {
        *last_byte = !*last_byte;
    }
    assert_eq!(Boc::decode(&boc_with_crc), Err(Error::ChecksumMismatch));
    Ok(())
}

#[test]
fn with_index() -> anyhow::Result<()> {
    let cell = simple_cell(0xbeef)?;

    let options = ser::Options {
        with_index: true,
        with_crc: true,
    };
    let encoded = Boc::encode_roots(std::slice::from_ref(&cell), options)?;

    // tag, flags, offset size, cell count, root count, absent count, total size, root
    assert_eq!(
        encoded[4],
        BocTag::FLAG_HAS_INDEX | BocTag::FLAG_HAS_CRC | 0x01
    );
    assert_eq!(encoded[9], 4);
    // End offset of the only cell
    assert_eq!(encoded[11], 4);

    assert_eq!(Boc::decode(&encoded)?, cell);
    Ok(())
}

#[test]
fn legacy_tags() -> anyhow::Result<()> {
    let child = simple_cell(1)?;
    let cell = {
        let mut builder = CellBuilder::new();
        builder.store_u8(0xaa)?;
        builder.store_reference(child)?;
        builder.build()?
    };

    let generic = Boc::encode_roots(
        std::slice::from_ref(&cell),
        ser::Options {
            with_index: true,
            with_crc: false,
        },
    )?;

    // Single byte refs and offsets: header is 10 bytes with one root index
    let ref_size = generic[4] & BocTag::REF_SIZE_MASK;
    assert_eq!(ref_size, 1);

    for tag in [BocTag::Indexed, BocTag::IndexedCrc32] {
        let mut legacy = Vec::new();
        legacy.extend_from_slice(&tag.to_bytes());
        legacy.push(ref_size);
        legacy.extend_from_slice(&generic[5..10]);
        legacy.extend_from_slice(&generic[11..]);
        if tag == BocTag::IndexedCrc32 {
            let crc = crate::util::crc_32c(&legacy);
            legacy.extend_from_slice(&crc.to_le_bytes());
        }

        let decoded = Boc::decode(&legacy)?;
        assert_eq!(decoded, cell);
    }
    Ok(())
}

#[test]
fn multiple_roots() -> anyhow::Result<()> {
    let shared = simple_cell(0xffff)?;
    let roots = (0..3u16)
        .map(|i| {
            let mut builder = CellBuilder::new();
            builder.store_u16(i)?;
            builder.store_reference(shared.clone())?;
            Ok(builder.build()?)
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    let header = ser::BocHeader::new(&roots, ser::Options::default())?;
    assert_eq!(header.cell_count(), 4);

    let encoded = Boc::encode_roots(&roots, ser::Options::default())?;
    let decoded = Boc::decode_roots(&encoded, &de::Options::default())?;
    assert_eq!(decoded, roots);

    assert_eq!(Boc::decode(&encoded), Err(Error::InvalidRootCount));
    assert_eq!(
        Boc::decode_roots(&encoded, &de::Options::exact(1)).unwrap_err(),
        Error::TooManyRootCells
    );
    assert_eq!(
        Boc::decode_roots(&encoded, &de::Options::exact(4)).unwrap_err(),
        Error::TooFewRootCells
    );
    Ok(())
}

#[test]
fn invalid_root_count() -> anyhow::Result<()> {
    let cell = simple_cell(0)?;

    assert_eq!(
        Boc::encode_roots(&[], ser::Options::default()),
        Err(Error::InvalidRootCount)
    );

    let roots = vec![cell; ser::MAX_ROOTS + 1];
    assert_eq!(
        Boc::encode_roots(&roots, ser::Options::default()),
        Err(Error::InvalidRootCount)
    );
    assert!(Boc::encode_roots(&roots[..ser::MAX_ROOTS], ser::Options::default()).is_ok());
    Ok(())
}

#[test]
fn dedup_shared_cells() -> anyhow::Result<()> {
    let child = simple_cell(0x1234)?;
    let cell = {
        let mut builder = CellBuilder::new();
        builder.store_reference(child.clone())?;
        builder.store_reference(child.clone())?;
        builder.store_reference(child)?;
        builder.build()?
    };

    let header = ser::BocHeader::with_root(&cell, ser::Options::default());
    assert_eq!(header.cell_count(), 2);

    let decoded = Boc::decode(Boc::encode(&cell))?;
    assert_eq!(decoded.repr_hash(), cell.repr_hash());
    assert_eq!(decoded.reference_count(), 3);
    Ok(())
}

#[test]
fn merkle_proof() -> anyhow::Result<()> {
    let data = decode_base64(MERKLE_PROOF_BOC)?;

    let options = de::Options::exact(1).with_merkle_check();
    let roots = Boc::decode_roots(&data, &options)?;
    let [proof] = roots.as_slice() else {
        anyhow::bail!("expected a single root");
    };

    assert_eq!(proof.cell_type(), CellType::MerkleProof);
    assert_eq!(proof.level(), 0);

    let child = proof.reference(0).unwrap();
    assert_eq!(child.level(), 1);
    assert_eq!(&proof.data()[1..33], child.hash(0));
    assert_ne!(child.hash(0), child.repr_hash());
    assert_eq!(child.depth(0), 13);

    // Corrupt the embedded hash
    let mut corrupted = data.clone();
    corrupted[20] ^= 0xff;

    assert_eq!(
        Boc::decode_roots(&corrupted, &options).unwrap_err(),
        Error::InvalidCell(crate::error::Error::MalformedCell(
            "merkle proof hash mismatch"
        ))
    );
    assert!(Boc::decode(&corrupted).is_ok());
    Ok(())
}

#[test]
fn invalid_ref_order() {
    #[rustfmt::skip]
    let data = [
        0xb5, 0xee, 0x9c, 0x72, // tag
        0x01, 0x01,             // flags, offset size
        0x02, 0x01, 0x00,       // cells, roots, absent
        0x06,                   // total cells size
        0x00,                   // root index
        0x01, 0x00, 0x01,       // cell 0 -> cell 1
        0x01, 0x00, 0x00,       // cell 1 -> cell 0
    ];
    assert_eq!(Boc::decode(data), Err(Error::InvalidRefOrder));
}

#[test]
fn malformed_headers() -> anyhow::Result<()> {
    let encoded = Boc::encode(&simple_cell(0xabcd)?);

    let mut unknown_tag = encoded.clone();
    unknown_tag[0] = 0;
    assert_eq!(Boc::decode(&unknown_tag), Err(Error::UnknownBocTag));

    assert_eq!(Boc::decode(&encoded[..3]), Err(Error::UnexpectedEof));
    assert_eq!(
        Boc::decode(&encoded[..encoded.len() - 1]),
        Err(Error::UnexpectedEof)
    );

    let mut no_refs = encoded.clone();
    no_refs[4] &= !BocTag::REF_SIZE_MASK;
    assert_eq!(Boc::decode(&no_refs), Err(Error::InvalidRefSize));
    Ok(())
}

#[test]
fn text_forms() -> anyhow::Result<()> {
    let child = simple_cell(0x0f0f)?;
    let cell = {
        let mut builder = CellBuilder::new();
        builder.store_bit_one()?;
        builder.store_reference(child)?;
        builder.build()?
    };

    let hex = Boc::encode_hex(&cell);
    assert_eq!(Boc::decode_hex(&hex)?, cell);

    let base64 = Boc::encode_base64(&cell);
    assert!(base64.starts_with("te6cc"));
    assert_eq!(Boc::decode_base64(&base64)?, cell);

    let options = de::Options::default();
    assert_eq!(Boc::decode_str(&hex, &options)?, [cell.clone()]);
    assert_eq!(Boc::decode_str(&format!("  {base64}\n"), &options)?, [cell.clone()]);

    let fift = Boc::encode_fift(std::slice::from_ref(&cell));
    assert_eq!(fift, "x{C_}\n x{0F0F}\n");
    assert_eq!(Boc::decode_str(&fift, &options)?, [cell.clone()]);
    assert_eq!(
        Boc::decode_str(&fift, &options.with_merkle_check()),
        Err(Error::UnsupportedOperation)
    );

    assert_eq!(
        Boc::decode_str("not a boc!", &options),
        Err(Error::UnrecognizedFormat)
    );
    assert_eq!(Boc::decode_hex("zz"), Err(Error::UnrecognizedFormat));
    Ok(())
}

#[test]
fn fift_dump() -> anyhow::Result<()> {
    let roots = Boc::decode_fift("x{ABC_}\n x{}\n x{C_}\n  x{FF}\nx{1234}")?;
    assert_eq!(roots.len(), 2);

    let first = &roots[0];
    assert_eq!(first.bit_len(), 9);
    assert_eq!(first.reference_count(), 2);
    assert_eq!(first.reference(0).unwrap().repr_hash(), &crate::cell::EMPTY_CELL_HASH);

    let second_child = first.reference(1).unwrap();
    assert_eq!(second_child.bit_len(), 1);
    assert_eq!(second_child.reference(0).unwrap().data(), &[0xff]);

    assert_eq!(roots[1].bit_len(), 16);
    assert_eq!(
        Boc::encode_fift(&roots),
        "x{ABC_}\n x{}\n x{C_}\n  x{FF}\n\nx{1234}\n"
    );

    // Skipped indentation level
    assert_eq!(Boc::decode_fift("x{}\n  x{}"), Err(Error::InvalidFift));
    // Indented root
    assert_eq!(Boc::decode_fift(" x{}"), Err(Error::InvalidFift));
    // Too many children
    assert_eq!(
        Boc::decode_fift("x{}\n x{1}\n x{2}\n x{3}\n x{4}\n x{5}"),
        Err(Error::InvalidFift)
    );
    // Not a hex cell
    assert_eq!(Boc::decode_fift("x{GG}"), Err(Error::InvalidFift));
    assert_eq!(Boc::decode_fift("y{}"), Err(Error::InvalidFift));
    assert_eq!(Boc::decode_fift(""), Err(Error::InvalidFift));
    Ok(())
}

#[test]
fn random_trees() -> anyhow::Result<()> {
    let mut rng = rand_xorshift::XorShiftRng::seed_from_u64(123);

    for _ in 0..50 {
        let root_count = rng.gen_range(1..=ser::MAX_ROOTS);
        let roots = (0..root_count)
            .map(|_| random_tree(&mut rng, 3))
            .collect::<anyhow::Result<Vec<_>>>()?;

        let options = ser::Options {
            with_index: rng.gen(),
            with_crc: rng.gen(),
        };
        let encoded = Boc::encode_roots(&roots, options)?;

        let decoded = Boc::decode_roots(&encoded, &de::Options::default())?;
        assert_eq!(decoded.len(), roots.len());
        for (decoded, root) in decoded.iter().zip(&roots) {
            assert_eq!(decoded.repr_hash(), root.repr_hash());
            assert_eq!(decoded.repr_depth(), root.repr_depth());
        }

        let fift = Boc::encode_fift(&roots);
        let parsed = Boc::decode_fift(&fift)?;
        assert_eq!(parsed, roots);
    }
    Ok(())
}

#[cfg(feature = "serde")]
mod serde {
    use super::*;
    use crate::models::{CommonMsgInfo, IntMsgInfo, Message};

    #[derive(::serde::Serialize, ::serde::Deserialize)]
    struct SerdeWithCellContainer {
        #[serde(with = "Boc")]
        some_cell: Cell,
    }

    #[derive(::serde::Serialize, ::serde::Deserialize)]
    struct SerdeWithRepr {
        #[serde(with = "BocRepr")]
        message: Message,
    }

    #[test]
    fn struct_with_cell() -> anyhow::Result<()> {
        let test = format!(r#"{{"some_cell":"{SINGLE_CELL_BOC}"}}"#);
        let SerdeWithCellContainer { some_cell } = serde_json::from_str(&test)?;

        let original = Boc::decode_base64(SINGLE_CELL_BOC)?;
        assert_eq!(some_cell, original);

        let serialized = serde_json::to_string(&SerdeWithCellContainer { some_cell })?;
        let SerdeWithCellContainer { some_cell } = serde_json::from_str(&serialized)?;
        assert_eq!(some_cell, original);
        Ok(())
    }

    #[test]
    fn struct_with_repr() -> anyhow::Result<()> {
        let message = Message {
            info: CommonMsgInfo::Int(IntMsgInfo {
                bounce: true,
                value: 1_000_000_000,
                created_lt: 42,
                ..Default::default()
            }),
            init: None,
            body: Some(simple_cell(0xdead)?),
        };

        let serialized = serde_json::to_string(&SerdeWithRepr {
            message: message.clone(),
        })?;
        let SerdeWithRepr { message: parsed } = serde_json::from_str(&serialized)?;
        assert_eq!(parsed, message);
        Ok(())
    }

    #[derive(::serde::Serialize, ::serde::Deserialize)]
    struct SerdeWithSeqno {
        #[serde(with = "BocRepr")]
        seqno: u32,
    }

    #[test]
    fn repr_rejects_trailing_data() -> anyhow::Result<()> {
        let serialized = serde_json::to_string(&SerdeWithSeqno { seqno: 123 })?;
        let SerdeWithSeqno { seqno } = serde_json::from_str(&serialized)?;
        assert_eq!(seqno, 123);

        let mut builder = CellBuilder::new();
        builder.store_u32(123)?;
        builder.store_bit_one()?;
        let with_bits = Boc::encode_base64(&builder.build()?);
        let res = serde_json::from_str::<SerdeWithSeqno>(&format!(r#"{{"seqno":"{with_bits}"}}"#));
        assert!(res.is_err());

        let mut builder = CellBuilder::new();
        builder.store_u32(123)?;
        builder.store_reference(Cell::empty_cell())?;
        let with_refs = Boc::encode_base64(&builder.build()?);
        let res = serde_json::from_str::<SerdeWithSeqno>(&format!(r#"{{"seqno":"{with_refs}"}}"#));
        assert!(res.is_err());
        Ok(())
    }
}
