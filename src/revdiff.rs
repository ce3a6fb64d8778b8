//! Reverse-diff engine.
//!
//! Converts a self-contained "base" object into a diff against a newer
//! "delta" object, so storage of the pair flips which of the two is the
//! self-contained one without re-encoding any block payload.
//!
//! Four handles are involved, matching `BackupStoreFile::ReverseDiffFile`'s
//! signature exactly:
//!
//! - `diff`: the delta object uploaded against the base (read-only; only
//!   its block index is consulted, to learn which base blocks it reuses).
//! - `from`: the base object, read purely sequentially — header, filename,
//!   attributes, then one pass over its data blocks in order. Because the
//!   object's own trailing index immediately follows its data area, this
//!   sequential walk lands `from` exactly at the start of its own index
//!   with no seek, where it is read a second time (this time for
//!   checksums) in the final pass.
//! - `from2`: a second, independent handle on the same base object, opened
//!   purely to seek ahead to the index and learn block sizes before `from`
//!   reaches them — seeking `from` itself there would destroy the
//!   sequential position the data-copy pass depends on.
//! - `out`: the new base-relative diff this call produces.
//!
//! `base_object_id` is the object ID callers should use to identify `from`
//! if any of its blocks turn out to be shared with `diff` (i.e. the result
//! is not completely different); `out`'s index header points back at it.

use crate::format::{self, FormatError, IndexHeader};
use std::io::{Read, Seek, Write};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RevDiffError {
    /// A diff index entry referenced a base block index outside the base
    /// object's block count — the two objects cannot have been diffed
    /// against each other.
    #[error("diff references a base block index out of range for the base object")]
    IncompatibleFromAndDiffFiles,
    /// A base object ("from"/"from2") failed one of its own self-
    /// containment invariants: it must be self-contained and its index's
    /// block count must match its header's.
    #[error("base object is not a valid self-contained stored object")]
    BadBackupStoreFile,
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Perform the reverse-diff, writing the result to `out`.
///
/// Returns `true` if none of the base object's blocks were shared with the
/// diff (the result is a full copy, self-contained), `false` if at least
/// one block was shared (the result's index points back at `base_object_id`
/// for those blocks).
pub fn reverse_diff<D, F, F2, O>(
    diff: &mut D,
    from: &mut F,
    from2: &mut F2,
    out: &mut O,
    base_object_id: u64,
) -> Result<bool, RevDiffError>
where
    D: Read + Seek,
    F: Read + Seek,
    F2: Read + Seek,
    O: Write,
{
    // Step 1: copy the prologue (header, filename, attributes) verbatim.
    let header = format::read_header(from)?;
    format::write_header(out, &header)?;
    let filename = format::read_filename(from)?;
    format::write_filename(out, &filename)?;
    let attributes = format::read_attributes(from)?;
    format::write_attributes(out, &attributes)?;

    let from_num_blocks = header.num_blocks;

    // Step 2: build the reference map. A nonzero entry marks a base block
    // the diff reuses; the value `-1 - b` records which diff index slot
    // `b` reused it, recoverable later as `s + 1` (always `<= -1`, so it
    // never collides with a positive inline size).
    let mut from_index_info = vec![0i64; from_num_blocks as usize];

    format::seek_to_index(diff)?;
    let diff_index_header = format::read_index_header(diff)?;
    for b in 0..diff_index_header.num_blocks {
        let entry = format::read_index_entry(diff)?;
        if let Some(ref_idx) = entry.reference_index() {
            if ref_idx < 0 || ref_idx as u64 >= from_num_blocks {
                return Err(RevDiffError::IncompatibleFromAndDiffFiles);
            }
            from_index_info[ref_idx as usize] = -1 - b as i64;
        }
    }

    // Step 3: walk the base object's data blocks in order, copying each
    // one `from` carries that the diff does not already reference.
    format::seek_to_index(from2)?;
    let from2_index_header = format::read_index_header(from2)?;
    if !from2_index_header.is_self_contained() || from2_index_header.num_blocks != from_num_blocks
    {
        return Err(RevDiffError::BadBackupStoreFile);
    }

    let mut is_completely_different = true;
    let mut scratch: Vec<u8> = Vec::new();

    for b in 0..from_num_blocks as usize {
        let entry = format::read_index_entry(from2)?;
        if entry.encoded_size < 0 {
            return Err(RevDiffError::BadBackupStoreFile);
        }
        let block_size = entry.encoded_size as usize;
        if scratch.len() < block_size {
            scratch.resize(block_size, 0);
        }
        from.read_exact(&mut scratch[..block_size])?;

        if from_index_info[b] == 0 {
            out.write_all(&scratch[..block_size])?;
            from_index_info[b] = entry.encoded_size;
        } else {
            is_completely_different = false;
        }
    }

    // Step 4: write the output index. `from`'s stream position is now
    // exactly at the start of its own index, having walked the prologue
    // and every data block in order above.
    format::write_index_header(
        out,
        &IndexHeader {
            num_blocks: from_num_blocks,
            other_file_id: if is_completely_different {
                0
            } else {
                base_object_id
            },
        },
    )?;

    let from_own_index_header = format::read_index_header(from)?;
    if !from_own_index_header.is_self_contained()
        || from_own_index_header.num_blocks != from_num_blocks
    {
        return Err(RevDiffError::BadBackupStoreFile);
    }

    for b in 0..from_num_blocks as usize {
        let mut entry = format::read_index_entry(from)?;
        let mut s = from_index_info[b];
        if s < 0 {
            s += 1;
        }
        entry.encoded_size = s;
        format::write_index_entry(out, &entry)?;
    }

    Ok(is_completely_different)
}
