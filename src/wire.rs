//! Fixed-width big-endian integer primitives for the on-disk object format.
//!
//! Every multi-byte field in a stored object is big-endian. This module is
//! the single place that encodes that choice so the rest of the crate never
//! calls `to_be_bytes`/`from_be_bytes` directly.

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Read, Write};

#[inline]
pub fn read_u32<R: Read>(r: &mut R) -> io::Result<u32> {
    r.read_u32::<BigEndian>()
}

#[inline]
pub fn read_i32<R: Read>(r: &mut R) -> io::Result<i32> {
    r.read_i32::<BigEndian>()
}

#[inline]
pub fn read_u64<R: Read>(r: &mut R) -> io::Result<u64> {
    r.read_u64::<BigEndian>()
}

#[inline]
pub fn read_i64<R: Read>(r: &mut R) -> io::Result<i64> {
    r.read_i64::<BigEndian>()
}

#[inline]
pub fn write_u32<W: Write>(w: &mut W, v: u32) -> io::Result<()> {
    w.write_u32::<BigEndian>(v)
}

#[inline]
pub fn write_i32<W: Write>(w: &mut W, v: i32) -> io::Result<()> {
    w.write_i32::<BigEndian>(v)
}

#[inline]
pub fn write_u64<W: Write>(w: &mut W, v: u64) -> io::Result<()> {
    w.write_u64::<BigEndian>(v)
}

#[inline]
pub fn write_i64<W: Write>(w: &mut W, v: i64) -> io::Result<()> {
    w.write_i64::<BigEndian>(v)
}

/// Read a length-prefixed opaque byte block: a big-endian `u32` length
/// followed by that many bytes. Used for the filename and attributes blocks,
/// whose contents this crate never interprets.
pub fn read_length_prefixed<R: Read>(r: &mut R) -> io::Result<Vec<u8>> {
    let len = read_u32(r)? as usize;
    let mut buf = vec![0u8; len];
    r.read_exact(&mut buf)?;
    Ok(buf)
}

/// Write a length-prefixed opaque byte block (see [`read_length_prefixed`]).
pub fn write_length_prefixed<W: Write>(w: &mut W, data: &[u8]) -> io::Result<()> {
    write_u32(w, data.len() as u32)?;
    w.write_all(data)
}
