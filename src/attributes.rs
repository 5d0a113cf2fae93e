//! Fighter attribute table.
//!
//! The attribute block of an `ftData` node is a flat run of big-endian
//! words with no self-description. Its schema is domain knowledge: the list
//! below names each word in file order. Words whose meaning is unknown are
//! named [`PLACEHOLDER`]; they are read so later offsets stay correct but
//! are left out of the decoded mapping.
//!
//! Some fighters carry a longer block than the common schema describes; the
//! trailing bytes are ignored.

use indexmap::IndexMap;
use serde::Serialize;

use self::AttrType::{F32, U32};
use crate::utils::{be_f32, be_i32, be_u16, be_u32, cursor_at, u8};
use crate::{Error, Result};

/// Name used for attribute slots whose meaning is unknown.
pub const PLACEHOLDER: &str = "?";

/// Storage type of one attribute slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrType {
    F32,
    U32,
    I32,
    U16,
    U8,
}

impl AttrType {
    /// Width in bytes.
    pub const fn size(self) -> usize {
        match self {
            AttrType::F32 | AttrType::U32 | AttrType::I32 => 4,
            AttrType::U16 => 2,
            AttrType::U8 => 1,
        }
    }
}

/// A decoded attribute value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AttrValue {
    Int(i64),
    Float(f32),
}

/// Decoded attributes in schema order.
pub type Attributes = IndexMap<&'static str, AttrValue>;

/// Common fighter attributes (0x184 bytes).
pub const FIGHTER_ATTRIBUTES: &[(AttrType, &str)] = &[
    (F32, "walk_initial_velocity"),               // 0x000
    (F32, "walk_acceleration"),                   // 0x004
    (F32, "walk_max_velocity"),                   // 0x008
    (F32, "slow_walk_max"),                       // 0x00C
    (F32, "mid_walk_point"),                      // 0x010
    (F32, "fast_walk_min"),                       // 0x014
    (F32, "ground_friction"),                     // 0x018
    (F32, "dash_initial_velocity"),               // 0x01C
    (F32, "dash_run_acceleration_a"),             // 0x020
    (F32, "dash_run_acceleration_b"),             // 0x024
    (F32, "dash_run_terminal_velocity"),          // 0x028
    (F32, "run_animation_scaling"),               // 0x02C
    (F32, PLACEHOLDER),                           // 0x030
    (F32, "grounded_max_horizontal_velocity"),    // 0x034
    (F32, "jump_startup_lag"),                    // 0x038
    (F32, "jump_h_initial_velocity"),             // 0x03C
    (F32, "jump_v_initial_velocity"),             // 0x040
    (F32, "jump_momentum_multiplier"),            // 0x044
    (F32, "jump_h_max_velocity"),                 // 0x048
    (F32, "hop_v_initial_velocity"),              // 0x04C
    (F32, "air_jump_v_multiplier"),               // 0x050
    (F32, "air_jump_h_multiplier"),               // 0x054
    (U32, "max_jumps"),                           // 0x058
    (F32, "gravity"),                             // 0x05C
    (F32, "terminal_velocity"),                   // 0x060
    (F32, "air_mobility_a"),                      // 0x064
    (F32, "air_mobility_b"),                      // 0x068
    (F32, "max_aerial_h_velocity"),               // 0x06C
    (F32, "air_friction"),                        // 0x070
    (F32, "fast_fall_terminal_velocity"),         // 0x074
    (F32, PLACEHOLDER),                           // 0x078
    (F32, "jab_2_window"),                        // 0x07C
    (F32, "jab_3_window"),                        // 0x080
    (F32, "turnaround_frames"),                   // 0x084
    (F32, "weight"),                              // 0x088
    (F32, "model_scaling"),                       // 0x08C
    (F32, "shield_size"),                         // 0x090
    (F32, "shield_break_initial_velocity"),       // 0x094
    (U32, "rapid_jab_window"),                    // 0x098
    (F32, PLACEHOLDER),                           // 0x09C
    (F32, PLACEHOLDER),                           // 0x0A0
    (F32, PLACEHOLDER),                           // 0x0A4
    (F32, "ledge_jump_h_velocity"),               // 0x0A8
    (F32, "ledge_jump_v_velocity"),               // 0x0AC
    (F32, "item_throw_velocity_multiplier"),      // 0x0B0
    (F32, PLACEHOLDER),                           // 0x0B4
    (F32, PLACEHOLDER),                           // 0x0B8
    (F32, PLACEHOLDER),                           // 0x0BC
    (F32, PLACEHOLDER),                           // 0x0C0
    (F32, PLACEHOLDER),                           // 0x0C4
    (F32, PLACEHOLDER),                           // 0x0C8
    (F32, PLACEHOLDER),                           // 0x0CC
    (F32, PLACEHOLDER),                           // 0x0D0
    (F32, PLACEHOLDER),                           // 0x0D4
    (F32, PLACEHOLDER),                           // 0x0D8
    (F32, PLACEHOLDER),                           // 0x0DC
    (F32, PLACEHOLDER),                           // 0x0E0
    (F32, "kirby_b_star_damage"),                 // 0x0E4
    (F32, "normal_landing_lag"),                  // 0x0E8
    (F32, "nair_landing_lag"),                    // 0x0EC
    (F32, "fair_landing_lag"),                    // 0x0F0
    (F32, "bair_landing_lag"),                    // 0x0F4
    (F32, "uair_landing_lag"),                    // 0x0F8
    (F32, "dair_landing_lag"),                    // 0x0FC
    (F32, "victory_screen_model_scale"),          // 0x100
    (F32, PLACEHOLDER),                           // 0x104
    (F32, "walljump_h_velocity"),                 // 0x108
    (F32, "walljump_v_velocity"),                 // 0x10C
    (F32, PLACEHOLDER),                           // 0x110
    (F32, PLACEHOLDER),                           // 0x114
    (F32, PLACEHOLDER),                           // 0x118
    (F32, PLACEHOLDER),                           // 0x11C
    (F32, PLACEHOLDER),                           // 0x120
    (F32, PLACEHOLDER),                           // 0x124
    (F32, PLACEHOLDER),                           // 0x128
    (F32, PLACEHOLDER),                           // 0x12C
    (F32, PLACEHOLDER),                           // 0x130
    (F32, PLACEHOLDER),                           // 0x134
    (F32, PLACEHOLDER),                           // 0x138
    (F32, PLACEHOLDER),                           // 0x13C
    (F32, PLACEHOLDER),                           // 0x140
    (F32, PLACEHOLDER),                           // 0x144
    (F32, PLACEHOLDER),                           // 0x148
    (F32, PLACEHOLDER),                           // 0x14C
    (F32, PLACEHOLDER),                           // 0x150
    (F32, PLACEHOLDER),                           // 0x154
    (F32, PLACEHOLDER),                           // 0x158
    (F32, PLACEHOLDER),                           // 0x15C
    (F32, PLACEHOLDER),                           // 0x160
    (F32, PLACEHOLDER),                           // 0x164
    (F32, PLACEHOLDER),                           // 0x168
    (F32, "bubble_ratio"),                        // 0x16C
    (F32, PLACEHOLDER),                           // 0x170
    (F32, PLACEHOLDER),                           // 0x174
    (F32, PLACEHOLDER),                           // 0x178
    (F32, "ice_traction"),                        // 0x17C
    (F32, PLACEHOLDER),                           // 0x180
];

/// Total byte size of `schema`.
pub fn schema_size(schema: &[(AttrType, &str)]) -> usize {
    schema.iter().map(|(ty, _)| ty.size()).sum()
}

/// Decode `blob` against the common fighter schema.
pub fn decode_attributes(blob: &[u8]) -> Result<Attributes> {
    decode_with_schema(blob, FIGHTER_ATTRIBUTES)
}

/// Decode `blob` against `schema`, in schema order.
///
/// Returns [`Error::SchemaMismatch`] if `blob` is shorter than the schema.
/// Bytes past the end of the schema are ignored.
pub fn decode_with_schema(
    blob: &[u8],
    schema: &'static [(AttrType, &'static str)],
) -> Result<Attributes> {
    let expected = schema_size(schema);
    if blob.len() < expected {
        return Err(Error::SchemaMismatch {
            expected,
            actual: blob.len(),
        });
    }

    let mut r = cursor_at(blob, 0);
    let mut attributes = Attributes::with_capacity(schema.len());
    for &(ty, name) in schema {
        let value = match ty {
            AttrType::F32 => AttrValue::Float(be_f32(&mut r)?),
            AttrType::U32 => AttrValue::Int(be_u32(&mut r)? as i64),
            AttrType::I32 => AttrValue::Int(be_i32(&mut r)? as i64),
            AttrType::U16 => AttrValue::Int(be_u16(&mut r)? as i64),
            AttrType::U8 => AttrValue::Int(u8(&mut r)? as i64),
        };
        if name != PLACEHOLDER {
            attributes.insert(name, value);
        }
    }
    Ok(attributes)
}
