//! Stored-object binary format — header, filename/attributes blocks, and the
//! trailing block index.
//!
//! # On-disk layout (all multi-byte integers big-endian)
//!
//! ```text
//! Header            magic(4) num_blocks(8) container_size(8)
//!                   modification_time(8) max_block_clear_size(4) options(4)
//! Filename          length-prefixed opaque bytes
//! Attributes        length-prefixed opaque bytes
//! Data area         num_blocks consecutive encoded blocks
//! Index header      magic(4) num_blocks(8) other_file_id(8)
//! Index entries     num_blocks fixed-width entries
//! ```
//!
//! The codec only reads and writes these regions; it never interprets
//! filename or attribute bytes, and it never decodes block payloads. Higher
//! layers (the reverse-diff engine, a future packer) sequence these
//! operations explicitly — there is no single `read_object`/`write_object`
//! entry point here, mirroring the absence of caching or composed state in
//! the wire-level codec.

use crate::wire::{
    read_i64, read_length_prefixed, read_u32, read_u64, write_i64, write_length_prefixed,
    write_u32, write_u64,
};
use std::io::{self, Read, Seek, SeekFrom, Write};
use thiserror::Error;

/// Header magic: `OBJECTMAGIC_FILE_MAGIC_VALUE_V1`.
pub const FILE_MAGIC: u32 = 0x4246_5631; // "BFV1"

/// Index header magic: `OBJECTMAGIC_FILE_BLOCKS_MAGIC_VALUE_V1`.
pub const FILE_BLOCKS_MAGIC: u32 = 0x4246_4931; // "BFI1"

/// Byte size of [`Header`] on disk: magic(4) + num_blocks(8) + container_size(8)
/// + modification_time(8) + max_block_clear_size(4) + options(4).
pub const HEADER_SIZE: u64 = 4 + 8 + 8 + 8 + 4 + 4;

/// Byte size of [`IndexHeader`] on disk: magic(4) + num_blocks(8) + other_file_id(8).
pub const INDEX_HEADER_SIZE: u64 = 4 + 8 + 8;

/// Byte size of one [`IndexEntry`] on disk: encoded_size(8) + clear_size(8)
/// + weighted_checksum(4) + encoded_checksum(4).
pub const INDEX_ENTRY_SIZE: u64 = 8 + 8 + 4 + 4;

/// Bit in [`Header::options`] marking block payloads as independently
/// compressed (set by the packer this core does not implement; carried
/// through unchanged by the reverse-diff engine).
pub const OPTION_COMPRESSED: u32 = 0x0001;

#[derive(Error, Debug)]
pub enum FormatError {
    #[error("bad magic value: expected {expected:#010x}, got {got:#010x}")]
    BadMagic { expected: u32, got: u32 },
    #[error("short read: stream ended before the requested data was available")]
    ShortRead,
    #[error("stream does not support seeking to an absolute position")]
    NotSeekable,
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl FormatError {
    fn from_io(e: io::Error) -> Self {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            FormatError::ShortRead
        } else {
            FormatError::Io(e)
        }
    }
}

/// Fixed-size file header, present once at the start of every stored object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub num_blocks: u64,
    /// Total byte size of the container once fully written, i.e. the offset
    /// one past the last index entry. Lets [`seek_to_index`] locate the
    /// index trailer without scanning the data area.
    pub container_size: u64,
    pub modification_time: u64,
    pub max_block_clear_size: u32,
    pub options: u32,
}

impl Header {
    pub fn is_compressed(&self) -> bool {
        self.options & OPTION_COMPRESSED != 0
    }
}

/// Header of the trailing block index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexHeader {
    pub num_blocks: u64,
    /// 0 if this object is self-contained; otherwise the object ID this
    /// index's negative `encoded_size` entries refer into.
    pub other_file_id: u64,
}

impl IndexHeader {
    #[inline]
    pub fn is_self_contained(&self) -> bool {
        self.other_file_id == 0
    }
}

/// One block-index entry.
///
/// `encoded_size > 0` means the block is stored inline in this object's data
/// area, `encoded_size` bytes long. `encoded_size <= 0` means the block is
/// not stored here; `-encoded_size` is the 0-based index of the block inside
/// the object named by the enclosing [`IndexHeader::other_file_id`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexEntry {
    pub encoded_size: i64,
    /// Size of the block before encoding (0 when unknown, e.g. for a pure
    /// reference entry produced by reverse-diff, which never recomputes it).
    pub clear_size: i64,
    pub weighted_checksum: u32,
    pub encoded_checksum: u32,
}

impl IndexEntry {
    #[inline]
    pub fn is_inline(&self) -> bool {
        self.encoded_size > 0
    }

    #[inline]
    pub fn reference_index(&self) -> Option<i64> {
        if self.encoded_size > 0 {
            None
        } else {
            Some(-self.encoded_size)
        }
    }
}

// ── Header ───────────────────────────────────────────────────────────────────

pub fn read_header<R: Read>(r: &mut R) -> Result<Header, FormatError> {
    let magic = read_u32(r).map_err(FormatError::from_io)?;
    if magic != FILE_MAGIC {
        return Err(FormatError::BadMagic {
            expected: FILE_MAGIC,
            got: magic,
        });
    }
    let num_blocks = read_u64(r).map_err(FormatError::from_io)?;
    let container_size = read_u64(r).map_err(FormatError::from_io)?;
    let modification_time = read_u64(r).map_err(FormatError::from_io)?;
    let max_block_clear_size = read_u32(r).map_err(FormatError::from_io)?;
    let options = read_u32(r).map_err(FormatError::from_io)?;
    Ok(Header {
        num_blocks,
        container_size,
        modification_time,
        max_block_clear_size,
        options,
    })
}

pub fn write_header<W: Write>(w: &mut W, h: &Header) -> Result<(), FormatError> {
    write_u32(w, FILE_MAGIC)?;
    write_u64(w, h.num_blocks)?;
    write_u64(w, h.container_size)?;
    write_u64(w, h.modification_time)?;
    write_u32(w, h.max_block_clear_size)?;
    write_u32(w, h.options)?;
    Ok(())
}

// ── Filename / attributes ───────────────────────────────────────────────────
//
// Both blocks share the same wire shape (length-prefixed opaque bytes); the
// encoding of their contents belongs to components outside this core.

pub fn read_filename<R: Read>(r: &mut R) -> Result<Vec<u8>, FormatError> {
    read_length_prefixed(r).map_err(FormatError::from_io)
}

pub fn write_filename<W: Write>(w: &mut W, name: &[u8]) -> Result<(), FormatError> {
    write_length_prefixed(w, name).map_err(FormatError::from_io)
}

pub fn read_attributes<R: Read>(r: &mut R) -> Result<Vec<u8>, FormatError> {
    read_length_prefixed(r).map_err(FormatError::from_io)
}

pub fn write_attributes<W: Write>(w: &mut W, attr: &[u8]) -> Result<(), FormatError> {
    write_length_prefixed(w, attr).map_err(FormatError::from_io)
}

// ── Index header / entries ──────────────────────────────────────────────────

pub fn read_index_header<R: Read>(r: &mut R) -> Result<IndexHeader, FormatError> {
    let magic = read_u32(r).map_err(FormatError::from_io)?;
    if magic != FILE_BLOCKS_MAGIC {
        return Err(FormatError::BadMagic {
            expected: FILE_BLOCKS_MAGIC,
            got: magic,
        });
    }
    let num_blocks = read_u64(r).map_err(FormatError::from_io)?;
    let other_file_id = read_u64(r).map_err(FormatError::from_io)?;
    Ok(IndexHeader {
        num_blocks,
        other_file_id,
    })
}

pub fn write_index_header<W: Write>(w: &mut W, h: &IndexHeader) -> Result<(), FormatError> {
    write_u32(w, FILE_BLOCKS_MAGIC)?;
    write_u64(w, h.num_blocks)?;
    write_u64(w, h.other_file_id)?;
    Ok(())
}

pub fn read_index_entry<R: Read>(r: &mut R) -> Result<IndexEntry, FormatError> {
    let encoded_size = read_i64(r).map_err(FormatError::from_io)?;
    let clear_size = read_i64(r).map_err(FormatError::from_io)?;
    let weighted_checksum = read_u32(r).map_err(FormatError::from_io)?;
    let encoded_checksum = read_u32(r).map_err(FormatError::from_io)?;
    Ok(IndexEntry {
        encoded_size,
        clear_size,
        weighted_checksum,
        encoded_checksum,
    })
}

pub fn write_index_entry<W: Write>(w: &mut W, e: &IndexEntry) -> Result<(), FormatError> {
    write_i64(w, e.encoded_size)?;
    write_i64(w, e.clear_size)?;
    write_u32(w, e.weighted_checksum)?;
    write_u32(w, e.encoded_checksum)?;
    Ok(())
}

/// Position a seekable stream at the start of the index header.
///
/// The header's `container_size` field is the total byte length of the
/// object, so the index trailer's offset is `container_size -
/// (index header size + num_blocks * index entry size)` — no scan of the
/// data area is needed. Fails with [`FormatError::NotSeekable`] if the
/// underlying stream rejects an absolute seek.
pub fn seek_to_index<S: Read + Seek>(stream: &mut S) -> Result<(Header, u64), FormatError> {
    stream.seek(SeekFrom::Start(0)).map_err(|_| FormatError::NotSeekable)?;
    let header = read_header(stream)?;
    let trailer_size = INDEX_HEADER_SIZE + header.num_blocks * INDEX_ENTRY_SIZE;
    let index_offset = header
        .container_size
        .checked_sub(trailer_size)
        .ok_or(FormatError::ShortRead)?;
    stream
        .seek(SeekFrom::Start(index_offset))
        .map_err(|_| FormatError::NotSeekable)?;
    Ok((header, index_offset))
}
