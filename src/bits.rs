//! Bit-packed field codec for event records.
//!
//! An event record is a fixed byte span whose first six bits select the
//! opcode family. The remaining bits are carved MSB-first into the fields of
//! a [`BitField`] layout:
//!
//! ```text
//! byte 0          byte 1          byte 2          byte 3
//! 7 6 5 4 3 2 1 0 7 6 5 4 3 2 1 0 7 6 5 4 3 2 1 0 7 6 5 4 3 2 1 0
//! [  opcode  ][ field 0 ][      field 1      ][pad][  field 2   ]
//! ```
//!
//! Prefix, fields and padding together must cover the span exactly. The
//! opcode table is checked for this once at construction, so a mismatch at
//! decode time means the table itself is wrong.

use bitreader::{BitReader, BitReaderError};
use bitvec::prelude::*;
use serde::{Serialize, Serializer};

use crate::{Error, Result};

/// Width of the opcode selector at the start of every record.
pub const PREFIX_BITS: u32 = 6;

/// One entry of a bit-field layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitField {
    /// `n` bits that are consumed and discarded.
    Pad(u8),
    /// `n`-bit unsigned integer.
    Unsigned(u8),
    /// `n`-bit two's-complement integer.
    Signed(u8),
    /// Single-bit flag.
    Bool,
}

impl BitField {
    /// Number of bits this entry consumes.
    pub const fn width(self) -> u32 {
        match self {
            BitField::Pad(n) | BitField::Unsigned(n) | BitField::Signed(n) => n as u32,
            BitField::Bool => 1,
        }
    }

    /// Whether decoding this entry produces a value.
    pub const fn is_value(self) -> bool {
        !matches!(self, BitField::Pad(_))
    }
}

/// Total bits consumed by `layout`, including the opcode prefix.
pub fn layout_bits(layout: &[BitField]) -> u32 {
    PREFIX_BITS + layout.iter().map(|f| f.width()).sum::<u32>()
}

/// Number of values `layout` produces (padding excluded).
pub fn value_count(layout: &[BitField]) -> usize {
    layout.iter().filter(|f| f.is_value()).count()
}

/// A decoded event field.
///
/// Raw decoding only produces [`Int`](FieldValue::Int) and
/// [`Bool`](FieldValue::Bool); the other variants come from opcode
/// post-processing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    /// An integer code and its symbolic name. Serializes as the name only.
    Label(i64, &'static str),
}

impl FieldValue {
    /// Integer payload, if this is an integer or labelled field.
    pub fn as_int(&self) -> Option<i64> {
        match *self {
            FieldValue::Int(v) | FieldValue::Label(v, _) => Some(v),
            _ => None,
        }
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        match *self {
            FieldValue::Int(v) => s.serialize_i64(v),
            FieldValue::Float(v) => s.serialize_f64(v),
            FieldValue::Bool(v) => s.serialize_bool(v),
            FieldValue::Label(_, name) => s.serialize_str(name),
        }
    }
}

/// Decode the values of `layout` from `bytes`, skipping the opcode prefix.
///
/// Values come back in declaration order with padding omitted.
pub fn decode(bytes: &[u8], layout: &[BitField]) -> Result<Vec<FieldValue>> {
    let overrun = |_: BitReaderError| Error::Parse("bit layout overruns event record");

    let mut r = BitReader::new(bytes);
    r.skip(PREFIX_BITS as u64).map_err(overrun)?;

    let mut values = Vec::with_capacity(value_count(layout));
    for field in layout {
        match *field {
            BitField::Pad(n) => r.skip(n as u64).map_err(overrun)?,
            BitField::Unsigned(n) => {
                values.push(FieldValue::Int(r.read_u64(n).map_err(overrun)? as i64))
            }
            BitField::Signed(n) => values.push(FieldValue::Int(r.read_i64(n).map_err(overrun)?)),
            BitField::Bool => values.push(FieldValue::Bool(r.read_bool().map_err(overrun)?)),
        }
    }

    if r.remaining() != 0 {
        return Err(Error::Parse("bit layout leaves event record bits unread"));
    }
    Ok(values)
}

/// Pack `values` back into a record of `len` bytes for opcode `id`.
///
/// Inverse of [`decode`]: the prefix is taken from the high six bits of `id`,
/// padding is written as zero bits, and signed values are truncated to their
/// two's-complement width. Labels pack their integer code; floats cannot be
/// packed.
pub fn encode(id: u8, layout: &[BitField], values: &[FieldValue], len: usize) -> Result<Vec<u8>> {
    if layout_bits(layout) as usize != len * 8 {
        return Err(Error::Parse("bit layout does not span the record"));
    }
    if values.len() != value_count(layout) {
        return Err(Error::Parse("value count does not match bit layout"));
    }

    let mut bits: BitVec<u8, Msb0> = BitVec::with_capacity(len * 8);
    push_bits(&mut bits, (id >> 2) as u64, PREFIX_BITS);

    let mut values = values.iter();
    for field in layout {
        match *field {
            BitField::Pad(n) => push_bits(&mut bits, 0, n as u32),
            BitField::Unsigned(n) | BitField::Signed(n) => match values.next() {
                Some(FieldValue::Int(v) | FieldValue::Label(v, _)) => {
                    push_bits(&mut bits, *v as u64, n as u32)
                }
                _ => return Err(Error::Parse("expected an integer field value")),
            },
            BitField::Bool => match values.next() {
                Some(FieldValue::Bool(v)) => bits.push(*v),
                _ => return Err(Error::Parse("expected a boolean field value")),
            },
        }
    }

    Ok(bits.into_vec())
}

/// Append the low `width` bits of `value`, most significant first.
fn push_bits(bits: &mut BitVec<u8, Msb0>, value: u64, width: u32) {
    for i in (0..width).rev() {
        bits.push((value >> i) & 1 == 1);
    }
}

#[cfg(test)]
mod tests {
    use super::BitField::*;
    use super::*;
    use test_log::test;

    #[test]
    fn unsigned_fields_follow_prefix() {
        // 0x30 = 001100|00: hitbox id picks up the two low bits of byte 0.
        let values = decode(&[0x30, 0x12, 0x34, 0x56], &[Unsigned(3), Unsigned(23)]).unwrap();
        assert_eq!(values, vec![FieldValue::Int(0), FieldValue::Int(0x12_3456)]);

        let values = decode(&[0x33, 0x80, 0x00, 0x01], &[Unsigned(3), Unsigned(23)]).unwrap();
        assert_eq!(values, vec![FieldValue::Int(0b111), FieldValue::Int(1)]);
    }

    #[test]
    fn signed_fields_sign_extend() {
        let values = decode(&[0x00, 0x00, 0xff, 0xfe], &[Pad(10), Signed(16)]).unwrap();
        assert_eq!(values, vec![FieldValue::Int(-2)]);
    }

    #[test]
    fn padding_is_not_surfaced() {
        let values = decode(&[0x04, 0x00, 0x00, 0x3c], &[Pad(2), Unsigned(24)]).unwrap();
        assert_eq!(values, vec![FieldValue::Int(60)]);
    }

    #[test]
    fn booleans_take_one_bit() {
        let values = decode(&[0x02, 0x00, 0x00, 0x00], &[Bool, Pad(25)]).unwrap();
        assert_eq!(values, vec![FieldValue::Bool(true)]);
    }

    #[test]
    fn short_or_long_layouts_are_rejected() {
        assert!(decode(&[0x30, 0, 0, 0], &[Unsigned(3), Unsigned(20)]).is_err());
        assert!(decode(&[0x30, 0, 0, 0], &[Unsigned(3), Unsigned(24)]).is_err());
    }

    #[test]
    fn encode_inverts_decode_for_full_layouts() {
        let layout = [Unsigned(3), Pad(5), Unsigned(7), Pad(2), Signed(9)];
        let raw = [0x2d, 0x80, 0x39, 0xff];
        let values = decode(&raw, &layout).unwrap();
        assert_eq!(encode(0x2c, &layout, &values, raw.len()).unwrap(), raw);
    }

    #[test]
    fn encode_rejects_mismatched_input() {
        let layout = [Unsigned(3), Unsigned(23)];
        assert!(encode(0x30, &layout, &[FieldValue::Int(1)], 4).is_err());
        assert!(encode(0x30, &layout, &[FieldValue::Int(1), FieldValue::Int(2)], 8).is_err());
        assert!(encode(0x30, &layout, &[FieldValue::Int(1), FieldValue::Float(0.5)], 4).is_err());
    }

    #[test]
    fn labels_pack_their_code() {
        let layout = [Unsigned(3), Unsigned(23)];
        let values = [FieldValue::Int(2), FieldValue::Label(5, "ice")];
        assert_eq!(encode(0x30, &layout, &values, 4).unwrap(), [0x31, 0x00, 0x00, 0x05]);
    }

    #[test]
    fn labels_serialize_as_names() {
        let values = [FieldValue::Int(-3), FieldValue::Bool(true), FieldValue::Label(2, "electric")];
        assert_eq!(
            serde_json::to_string(&values).unwrap(),
            r#"[-3,true,"electric"]"#
        );
    }

    #[test]
    fn layout_bits_counts_prefix() {
        assert_eq!(layout_bits(&[Pad(2), Unsigned(24)]), 32);
        assert_eq!(layout_bits(&[]), PREFIX_BITS);
        assert_eq!(value_count(&[Pad(2), Unsigned(24), Bool]), 2);
    }
}
