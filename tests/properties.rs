//! Property-based tests for the reverse-diff engine's core invariants:
//! round-trip (the result decodes to the same blocks the base had),
//! conservation (every base block appears exactly once in the output,
//! inline or by reference), and idempotence under a no-op diff (a diff
//! that references every base block back-to-back leaves every block
//! non-inline and reports `completely_different = false`).

use proptest::prelude::*;
use revstore::format::{self, Header, IndexEntry, IndexHeader};
use revstore::reverse_diff;
use std::io::Cursor;

const PROLOGUE_SIZE: u64 = format::HEADER_SIZE + 4 + 4;

fn build_object(blocks: &[Vec<u8>]) -> Vec<u8> {
    let mut buf = Vec::new();
    let data_len: u64 = blocks.iter().map(|b| b.len() as u64).sum();
    let index_len = format::INDEX_HEADER_SIZE + blocks.len() as u64 * format::INDEX_ENTRY_SIZE;
    let header = Header {
        num_blocks: blocks.len() as u64,
        container_size: PROLOGUE_SIZE + data_len + index_len,
        modification_time: 0,
        max_block_clear_size: 4096,
        options: 0,
    };
    format::write_header(&mut buf, &header).unwrap();
    format::write_filename(&mut buf, b"").unwrap();
    format::write_attributes(&mut buf, b"").unwrap();
    for b in blocks {
        buf.extend_from_slice(b);
    }
    format::write_index_header(
        &mut buf,
        &IndexHeader {
            num_blocks: blocks.len() as u64,
            other_file_id: 0,
        },
    )
    .unwrap();
    for b in blocks {
        let checksum = crc32fast::hash(b);
        format::write_index_entry(
            &mut buf,
            &IndexEntry {
                encoded_size: b.len() as i64,
                clear_size: b.len() as i64,
                weighted_checksum: checksum,
                encoded_checksum: checksum,
            },
        )
        .unwrap();
    }
    buf
}

/// A diff that references every base block identically, by position —
/// a no-op change.
fn build_noop_diff(num_blocks: usize) -> Vec<u8> {
    let mut buf = Vec::new();
    let index_len = format::INDEX_HEADER_SIZE + num_blocks as u64 * format::INDEX_ENTRY_SIZE;
    let header = Header {
        num_blocks: num_blocks as u64,
        container_size: PROLOGUE_SIZE + index_len,
        modification_time: 0,
        max_block_clear_size: 4096,
        options: 0,
    };
    format::write_header(&mut buf, &header).unwrap();
    format::write_filename(&mut buf, b"").unwrap();
    format::write_attributes(&mut buf, b"").unwrap();
    format::write_index_header(
        &mut buf,
        &IndexHeader {
            num_blocks: num_blocks as u64,
            other_file_id: 77,
        },
    )
    .unwrap();
    for b in 0..num_blocks {
        format::write_index_entry(
            &mut buf,
            &IndexEntry {
                encoded_size: -(b as i64),
                clear_size: 0,
                weighted_checksum: 0,
                encoded_checksum: 0,
            },
        )
        .unwrap();
    }
    buf
}

fn arb_blocks() -> impl Strategy<Value = Vec<Vec<u8>>> {
    prop::collection::vec(prop::collection::vec(any::<u8>(), 1..64), 1..12)
}

proptest! {
    #[test]
    fn noop_diff_is_never_completely_different_and_conserves_every_block(
        blocks in arb_blocks()
    ) {
        let base = build_object(&blocks);
        let diff = build_noop_diff(blocks.len());

        let mut diff_c = Cursor::new(diff);
        let mut from_c = Cursor::new(base.clone());
        let mut from2_c = Cursor::new(base);
        let mut out = Vec::new();

        let completely_different =
            reverse_diff(&mut diff_c, &mut from_c, &mut from2_c, &mut out, 77).unwrap();
        prop_assert!(!completely_different);

        let mut out_c = Cursor::new(out);
        let (out_header, _) = format::seek_to_index(&mut out_c).unwrap();
        prop_assert_eq!(out_header.num_blocks, blocks.len() as u64);
        let index_header = format::read_index_header(&mut out_c).unwrap();
        prop_assert_eq!(index_header.other_file_id, 77);

        // Conservation: every entry is a reference (no-op diff touched
        // nothing), none are inline.
        for _ in 0..blocks.len() {
            let entry = format::read_index_entry(&mut out_c).unwrap();
            prop_assert!(!entry.is_inline());
        }
    }

    #[test]
    fn diff_referencing_nothing_copies_every_block_inline_and_preserves_bytes(
        blocks in arb_blocks()
    ) {
        let base = build_object(&blocks);

        // A diff with no own blocks and no references at all is malformed
        // for a real client (every index slot must be inline or a
        // reference), so instead build one with `blocks.len()` inline
        // slots of zero length standing in for "no reuse" — equivalent to
        // every reference being absent.
        let mut diff = Vec::new();
        let header = Header {
            num_blocks: blocks.len() as u64,
            container_size: PROLOGUE_SIZE
                + format::INDEX_HEADER_SIZE
                + blocks.len() as u64 * format::INDEX_ENTRY_SIZE,
            modification_time: 0,
            max_block_clear_size: 4096,
            options: 0,
        };
        format::write_header(&mut diff, &header).unwrap();
        format::write_filename(&mut diff, b"").unwrap();
        format::write_attributes(&mut diff, b"").unwrap();
        format::write_index_header(
            &mut diff,
            &IndexHeader {
                num_blocks: blocks.len() as u64,
                other_file_id: 88,
            },
        )
        .unwrap();
        for _ in 0..blocks.len() {
            // encoded_size = 1 marks an inline entry in the diff's own
            // index; reverse_diff never reads diff's inline payload
            // bytes (only its references), so the size value itself is
            // irrelevant beyond being positive.
            format::write_index_entry(
                &mut diff,
                &IndexEntry {
                    encoded_size: 1,
                    clear_size: 1,
                    weighted_checksum: 0,
                    encoded_checksum: 0,
                },
            )
            .unwrap();
        }

        let mut diff_c = Cursor::new(diff);
        let mut from_c = Cursor::new(base.clone());
        let mut from2_c = Cursor::new(base);
        let mut out = Vec::new();

        let completely_different =
            reverse_diff(&mut diff_c, &mut from_c, &mut from2_c, &mut out, 88).unwrap();
        prop_assert!(completely_different);

        let mut out_c = Cursor::new(out);
        format::seek_to_index(&mut out_c).unwrap();
        let index_header = format::read_index_header(&mut out_c).unwrap();
        prop_assert_eq!(index_header.other_file_id, 0);
        for b in &blocks {
            let entry = format::read_index_entry(&mut out_c).unwrap();
            prop_assert!(entry.is_inline());
            prop_assert_eq!(entry.encoded_size, b.len() as i64);
        }
    }
}

#[test]
fn reusing_an_unused_write_buffer_never_leaks_a_previous_blocks_tail() {
    // Regression-shaped check for the scratch-buffer reuse discipline:
    // a later, shorter block must not retain trailing bytes from an
    // earlier, longer one that happened to reuse the same buffer.
    let blocks = vec![vec![0xAAu8; 40], vec![0xBBu8; 4]];
    let base = build_object(&blocks);

    let mut from_c = Cursor::new(base.clone());
    let mut from2_c = Cursor::new(base);

    // Build a diff that shares nothing, forcing both blocks to be
    // copied inline, the long one first.
    let mut diff2 = Vec::new();
    let header = Header {
        num_blocks: 2,
        container_size: PROLOGUE_SIZE + format::INDEX_HEADER_SIZE + 2 * format::INDEX_ENTRY_SIZE,
        modification_time: 0,
        max_block_clear_size: 4096,
        options: 0,
    };
    format::write_header(&mut diff2, &header).unwrap();
    format::write_filename(&mut diff2, b"").unwrap();
    format::write_attributes(&mut diff2, b"").unwrap();
    format::write_index_header(
        &mut diff2,
        &IndexHeader {
            num_blocks: 2,
            other_file_id: 9,
        },
    )
    .unwrap();
    for _ in 0..2 {
        format::write_index_entry(
            &mut diff2,
            &IndexEntry {
                encoded_size: 1,
                clear_size: 1,
                weighted_checksum: 0,
                encoded_checksum: 0,
            },
        )
        .unwrap();
    }

    let mut diff2_c = Cursor::new(diff2);
    let mut out = Vec::new();
    reverse_diff(&mut diff2_c, &mut from_c, &mut from2_c, &mut out, 9).unwrap();

    let prologue = PROLOGUE_SIZE as usize;
    assert_eq!(&out[prologue..prologue + 40], &[0xAAu8; 40][..]);
    assert_eq!(&out[prologue + 40..prologue + 44], &[0xBBu8; 4][..]);
}
