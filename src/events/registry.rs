//! Static opcode table for subaction event scripts.
//!
//! Keyed by the masked command id (`byte & 0xFC`), so there are at most 64
//! entries. Ids that have no entry decode as raw 4-byte records; see
//! [`Registry::get`].
//!
//! ## Sources
//! Event names and layouts follow the community documentation of Melee
//! subaction scripts (melee.langdef, the OpenSA wiki, Melee Workshop notes).
//! Entries whose meaning is only guessed at are registered with
//! `speculative` set and no field layout.

use indexmap::IndexMap;
use lazy_static::lazy_static;

use crate::bits::BitField::{Pad as P, Signed as S, Unsigned as U};
use crate::bits::{self, BitField, FieldValue};

/// Decoded event fields in declaration order.
pub type Fields = IndexMap<&'static str, FieldValue>;

/// Pure transform applied to an event's fields after bit decoding.
pub type PostProcess = fn(&mut Fields);

/// Bit layout of an event record plus the names of its value fields.
#[derive(Debug, Clone, Copy)]
pub struct FieldLayout {
    pub bits: &'static [BitField],
    pub names: &'static [&'static str],
}

/// Role an opcode plays in script control flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ControlFlow {
    #[default]
    None,
    /// Script end (`exit`).
    Exit,
    /// Call into another script; the callee runs to its own `exit`.
    Call,
    /// Jump into another script that comes back with `return`.
    Jump,
    /// End of a jumped-to block.
    Return,
}

/// Static metadata for one opcode.
#[derive(Debug, Clone, Copy)]
pub struct OpcodeMeta {
    /// Record length in bytes, opcode byte included.
    pub length: usize,
    pub name: Option<&'static str>,
    /// Set when `name` is a guess.
    pub speculative: bool,
    pub layout: Option<FieldLayout>,
    pub post_process: Option<PostProcess>,
    pub flow: ControlFlow,
}

impl OpcodeMeta {
    /// Entry returned for ids missing from the table.
    pub const UNKNOWN: OpcodeMeta = OpcodeMeta::unnamed(4);

    pub const fn named(length: usize, name: &'static str) -> Self {
        Self {
            name: Some(name),
            ..Self::unnamed(length)
        }
    }

    pub const fn unnamed(length: usize) -> Self {
        Self {
            length,
            name: None,
            speculative: false,
            layout: None,
            post_process: None,
            flow: ControlFlow::None,
        }
    }

    pub const fn speculative(length: usize, name: &'static str) -> Self {
        Self {
            speculative: true,
            ..Self::named(length, name)
        }
    }

    pub const fn fields(self, bits: &'static [BitField], names: &'static [&'static str]) -> Self {
        Self {
            layout: Some(FieldLayout { bits, names }),
            ..self
        }
    }

    pub const fn post_process(self, f: PostProcess) -> Self {
        Self {
            post_process: Some(f),
            ..self
        }
    }

    pub const fn flow(self, flow: ControlFlow) -> Self {
        Self { flow, ..self }
    }
}

/// Immutable opcode table.
///
/// Build once (or use [`registry`]) and share by reference.
#[derive(Debug, Clone)]
pub struct Registry {
    entries: [Option<OpcodeMeta>; 64],
}

lazy_static! {
    static ref MELEE: Registry = Registry::melee();
}

/// The process-wide Melee opcode table.
pub fn registry() -> &'static Registry {
    &MELEE
}

impl Registry {
    /// An empty table: every id decodes as [`OpcodeMeta::UNKNOWN`].
    pub fn empty() -> Self {
        Self {
            entries: [None; 64],
        }
    }

    /// Look up the metadata for a command id.
    ///
    /// The low two bits of `id` are ignored. Missing ids fall back to
    /// [`OpcodeMeta::UNKNOWN`].
    pub fn get(&self, id: u8) -> &OpcodeMeta {
        self.entries[(id >> 2) as usize]
            .as_ref()
            .unwrap_or(&OpcodeMeta::UNKNOWN)
    }

    /// Whether `id` has an explicit entry.
    pub fn contains(&self, id: u8) -> bool {
        self.entries[(id >> 2) as usize].is_some()
    }

    /// Register `meta` under command id `id`.
    ///
    /// # Panics
    /// Panics if `id` has either of its low two bits set, or if `meta`'s
    /// layout does not span exactly `meta.length` bytes. Both indicate a
    /// broken table, not bad input.
    pub fn insert(&mut self, id: u8, meta: OpcodeMeta) {
        assert_eq!(id & 0x03, 0, "opcode id {id:#04x} is not a multiple of 4");
        if let Some(layout) = meta.layout {
            assert_eq!(
                bits::layout_bits(layout.bits) as usize,
                meta.length * 8,
                "layout of opcode {id:#04x} does not span its record"
            );
            assert_eq!(
                bits::value_count(layout.bits),
                layout.names.len(),
                "layout of opcode {id:#04x} has mismatched field names"
            );
        }
        self.entries[(id >> 2) as usize] = Some(meta);
    }

    /// Build the Melee subaction event table.
    pub fn melee() -> Self {
        const FRAMES: &[BitField] = &[P(2), U(24)];
        const LOCATION: &[BitField] = &[P(26), U(32)];
        const HITBOX_ADJUST: &[BitField] = &[U(3), U(23)];

        let mut r = Self::empty();

        r.insert(0x00, OpcodeMeta::named(0x04, "exit").flow(ControlFlow::Exit));

        // Timing
        r.insert(0x04, OpcodeMeta::named(0x04, "wait_until").fields(FRAMES, &["frames"]));
        r.insert(0x08, OpcodeMeta::named(0x04, "wait_for").fields(FRAMES, &["frames"]));
        r.insert(0x0C, OpcodeMeta::named(0x04, "set_loop").fields(FRAMES, &["loop_count"]));
        r.insert(0x10, OpcodeMeta::named(0x04, "execute_loop"));

        // Control flow
        r.insert(
            0x14,
            OpcodeMeta::named(0x08, "goto")
                .fields(LOCATION, &["location"])
                .flow(ControlFlow::Jump),
        );
        r.insert(0x18, OpcodeMeta::named(0x04, "return").flow(ControlFlow::Return));
        r.insert(
            0x1C,
            OpcodeMeta::named(0x08, "subroutine")
                .fields(LOCATION, &["location"])
                .flow(ControlFlow::Call),
        );

        r.insert(0x20, OpcodeMeta::speculative(0x04, "set_timer_looping_animation"));

        // Graphics and hitboxes
        r.insert(
            0x28,
            OpcodeMeta::named(0x14, "graphic_common").fields(
                &[P(26), U(16), P(16), S(16), S(16), S(16), S(16), S(16), S(16)],
                &["id", "z", "y", "x", "z_range", "y_range", "x_range"],
            ),
        );
        r.insert(
            0x2C,
            OpcodeMeta::named(0x14, "hitbox")
                .fields(
                    &[
                        U(3),
                        P(5),
                        U(7),
                        P(2),
                        U(9),
                        U(16),
                        S(16),
                        S(16),
                        S(16),
                        U(9),
                        U(9),
                        U(9),
                        P(3),
                        U(2),
                        U(9),
                        U(5),
                        P(1),
                        U(7),
                        U(8),
                        U(2),
                    ],
                    &[
                        "id",
                        "bone",
                        "damage",
                        "size",
                        "z",
                        "y",
                        "x",
                        "angle",
                        "kb_growth",
                        "weight_dep_kb",
                        "hitbox_interaction",
                        "base_kb",
                        "element",
                        "shield_damage",
                        "sfx",
                        "hurtbox_interaction",
                    ],
                )
                .post_process(label_hitbox_element),
        );
        r.insert(
            0x30,
            OpcodeMeta::named(0x04, "adjust_hitbox_damage")
                .fields(HITBOX_ADJUST, &["hitbox_id", "damage"]),
        );
        r.insert(
            0x34,
            OpcodeMeta::named(0x04, "adjust_hitbox_size")
                .fields(HITBOX_ADJUST, &["hitbox_id", "size"]),
        );
        r.insert(0x38, OpcodeMeta::speculative(0x04, "roll"));
        r.insert(
            0x3C,
            OpcodeMeta::named(0x04, "end_one_collision").fields(&[U(26)], &["hitbox_id"]),
        );
        r.insert(0x40, OpcodeMeta::named(0x04, "end_all_collisions"));

        // Sound
        r.insert(0x44, OpcodeMeta::named(0x0C, "sfx"));
        r.insert(0x48, OpcodeMeta::named(0x04, "random_smash_sfx"));

        // Cancels and state flags
        // Sometimes listed as an 11-byte "airstop"; records are word aligned,
        // so that length cannot be right.
        r.insert(0x4C, OpcodeMeta::named(0x04, "autocancel"));
        r.insert(0x50, OpcodeMeta::named(0x04, "reverse_direction"));
        r.insert(0x5C, OpcodeMeta::named(0x04, "allow_iasa"));
        r.insert(0x60, OpcodeMeta::speculative(0x04, "shootitem1/projectile flag"));
        r.insert(
            0x68,
            OpcodeMeta::named(0x04, "body_collision_state")
                .fields(&[P(24), U(2)], &["state"])
                .post_process(label_collision_state),
        );
        r.insert(
            0x70,
            OpcodeMeta::named(0x04, "bone_collision_state")
                .fields(&[U(8), U(18)], &["bone", "state"]),
        );
        r.insert(0x74, OpcodeMeta::named(0x04, "enable_jab_followup"));
        r.insert(0x78, OpcodeMeta::named(0x04, "toggle_jab_followup"));

        // Models
        r.insert(
            0x7C,
            OpcodeMeta::named(0x04, "model_state")
                .fields(&[U(6), P(12), U(8)], &["struct_id", "temp_object_id"]),
        );
        r.insert(0x80, OpcodeMeta::named(0x04, "revert_models"));
        r.insert(0x84, OpcodeMeta::named(0x04, "remove_models"));
        r.insert(0x88, OpcodeMeta::named(0x10, "throw"));

        r.insert(0x98, OpcodeMeta::unnamed(0x14));
        r.insert(0x9C, OpcodeMeta::unnamed(0x10));
        r.insert(0xA0, OpcodeMeta::named(0x04, "animate_texture"));
        r.insert(0xA8, OpcodeMeta::unnamed(0x08));
        r.insert(0xAC, OpcodeMeta::speculative(0x04, "gen_article/rumble"));
        r.insert(0xB4, OpcodeMeta::unnamed(0x0C));
        // First bit appears to select body aura group 1 or 2.
        r.insert(0xB8, OpcodeMeta::named(0x08, "bodyaura"));
        r.insert(
            0xCC,
            OpcodeMeta::named(0x04, "self_damage").fields(&[P(10), U(16)], &["damage"]),
        );
        // 0 = earliest next, 3 = open continuation window
        r.insert(0xD0, OpcodeMeta::speculative(0x04, "continuation_control"));
        r.insert(0xD8, OpcodeMeta::unnamed(0x0C));
        r.insert(0xDC, OpcodeMeta::unnamed(0x0C));
        r.insert(0xE0, OpcodeMeta::named(0x08, "start_smash_charge"));
        r.insert(0xE8, OpcodeMeta::unnamed(0x10));

        r
    }
}

/// Hitbox element codes, indexed by value.
pub const HITBOX_ELEMENTS: &[&str] = &[
    "normal",
    "fire",
    "electric",
    "slash",
    "coin",
    "ice",
    "sleep",
    "sleep_long",
    "grounded",
    "grounded_short",
    "cape",
    "empty",
    "disable",
    "darkness",
    "screw_attack",
    "flower",
    "nothing",
];

/// Body collision states, indexed by value.
pub const COLLISION_STATES: &[&str] = &["normal", "invulnerable", "intangible"];

/// Replace the integer in `fields[key]` with its entry in `labels`.
///
/// The code is kept alongside the label. Codes without a label are left as
/// raw integers.
pub fn label_field(fields: &mut Fields, key: &str, labels: &[&'static str]) {
    if let Some(value) = fields.get_mut(key)
        && let FieldValue::Int(code) = *value
        && let Some(label) = usize::try_from(code).ok().and_then(|i| labels.get(i).copied())
    {
        *value = FieldValue::Label(code, label);
    }
}

fn label_hitbox_element(fields: &mut Fields) {
    label_field(fields, "element", HITBOX_ELEMENTS);
}

fn label_collision_state(fields: &mut Fields) {
    label_field(fields, "state", COLLISION_STATES);
}
