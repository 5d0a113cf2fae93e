//! Low-level I/O primitives shared by all decoders.
//!
//! Everything in a `.dat` file is big-endian. Each reader consumes exactly
//! the bytes it promises or returns an error; a short read surfaces as
//! [`Error::TruncatedInput`].

use std::fmt::Write;
use std::io::{Cursor, Read};

use crate::{Error, Result};

/// Read one byte.
#[inline]
pub(crate) fn u8<R: Read>(r: &mut R) -> Result<u8> {
    let mut b = [0u8; 1];
    r.read_exact(&mut b)?;
    Ok(b[0])
}

/// Read a big-endian `u16`.
#[inline]
pub(crate) fn be_u16<R: Read>(r: &mut R) -> Result<u16> {
    let mut b = [0u8; 2];
    r.read_exact(&mut b)?;
    Ok(u16::from_be_bytes(b))
}

/// Read a big-endian `u32`.
#[inline]
pub(crate) fn be_u32<R: Read>(r: &mut R) -> Result<u32> {
    let mut b = [0u8; 4];
    r.read_exact(&mut b)?;
    Ok(u32::from_be_bytes(b))
}

/// Read a big-endian `i32`.
#[inline]
pub(crate) fn be_i32<R: Read>(r: &mut R) -> Result<i32> {
    let mut b = [0u8; 4];
    r.read_exact(&mut b)?;
    Ok(i32::from_be_bytes(b))
}

/// Read a big-endian IEEE-754 `f32`.
#[inline]
pub(crate) fn be_f32<R: Read>(r: &mut R) -> Result<f32> {
    let mut b = [0u8; 4];
    r.read_exact(&mut b)?;
    Ok(f32::from_be_bytes(b))
}

/// Borrow `len` bytes of `buf` starting at `offset`.
///
/// Returns [`Error::TruncatedInput`] if the region runs past the end of
/// `buf`, or [`Error::InvalidRange`] if `offset + len` overflows.
#[inline]
pub(crate) fn region(buf: &[u8], offset: usize, len: usize) -> Result<&[u8]> {
    let end = offset.checked_add(len).ok_or(Error::InvalidRange)?;
    buf.get(offset..end).ok_or(Error::TruncatedInput)
}

/// Cursor over `buf` positioned at `offset`, for sequential field reads.
///
/// Seeking past the end is allowed; the first read then fails.
#[inline]
pub(crate) fn cursor_at(buf: &[u8], offset: usize) -> Cursor<&[u8]> {
    let mut c = Cursor::new(buf);
    c.set_position(offset as u64);
    c
}

/// Extract a NUL-terminated string from a byte slice at `offset`.
///
/// A string without a terminator runs to the end of `buf`. Returns
/// [`Error::TruncatedInput`] if `offset` lies past the end.
#[inline]
pub(crate) fn null_string(buf: &[u8], offset: usize) -> Result<String> {
    let slice = buf.get(offset..).ok_or(Error::TruncatedInput)?;
    let end = slice.iter().position(|&b| b == 0).unwrap_or(slice.len());
    Ok(String::from_utf8_lossy(&slice[..end]).into_owned())
}

/// Format bytes as lowercase hex pairs separated by single spaces.
pub(crate) fn hex_bytes(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 3);
    for (i, b) in bytes.iter().enumerate() {
        if i > 0 {
            s.push(' ');
        }
        let _ = write!(s, "{b:02x}");
    }
    s
}
