//! Figatree - per-animation joint track tree.
//!
//! Root nodes named `*_figatree` point at this header. Only the header is
//! decoded; the bone table and track data are left as raw offsets.
//!
//! ## Header (0x14 bytes)
//! ```text
//! [0x00] Always 1            (u32 BE)
//! [0x04] Always 0            (u32 BE)
//! [0x08] FrameCount          (f32 BE)
//! [0x0C] BoneTableOffset     (u32 BE)
//! [0x10] AnimDataOffset      (u32 BE)
//! ```
//!
//! ## Names
//! Animation names look like `PlyFox5K_Share_ACTION_AttackHi4_figatree`; the
//! token between `ACTION_` and `_figatree` is the animation's short name.

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

use crate::utils::{be_f32, be_u32, cursor_at};
use crate::{Error, Result};

lazy_static! {
    static ref ACTION_NAME: Regex = Regex::new(r"^.*ACTION_(.*?)_figatree").unwrap();
}

/// Decoded figatree header.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimationTree {
    pub num_frames: f32,
    pub bone_table_offset: u32,
    pub anim_data_offset: u32,
}

impl AnimationTree {
    /// Size of the header in bytes.
    pub const SIZE: usize = 0x14;

    /// Parse the header at `offset` within the data block.
    pub fn parse(data: &[u8], offset: u32) -> Result<Self> {
        let mut r = cursor_at(data, offset as usize);
        if be_u32(&mut r)? != 1 || be_u32(&mut r)? != 0 {
            return Err(Error::Parse("unexpected figatree header words"));
        }
        Ok(Self {
            num_frames: be_f32(&mut r)?,
            bone_table_offset: be_u32(&mut r)?,
            anim_data_offset: be_u32(&mut r)?,
        })
    }
}

/// Short animation name: the token between `ACTION_` and `_figatree`.
///
/// Names without that pattern are returned unchanged.
pub fn short_name(name: &str) -> String {
    ACTION_NAME
        .captures(name)
        .and_then(|c| c.get(1))
        .map_or(name, |m| m.as_str())
        .to_owned()
}
