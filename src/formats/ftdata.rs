//! ftData - fighter attributes and subaction table.
//!
//! Found as the `ftData<Name>` root node of a fighter file (`Pl<xx>.dat`).
//! Animations live in a separate archive (`Pl<xx>AJ.dat`); subactions refer
//! into it by offset and size.
//!
//! ## Header (0x18 bytes, all u32 BE, offsets into the data block)
//! ```text
//! [0x00] AttributesOffset
//! [0x04] AttributesEnd
//! [0x08] Reserved
//! [0x0C] SubactionsOffset
//! [0x10] Reserved
//! [0x14] SubactionsEnd
//! ```
//!
//! ## Subaction (0x18 bytes)
//! ```text
//! [0x00] NameOffset         - into the data block (u32 BE)
//! [0x04] AnimationOffset    - into the AJ archive (u32 BE)
//! [0x08] AnimationSize      (u32 BE)
//! [0x0C] EventsOffset       - into the data block (u32 BE)
//! [0x10] PositionFlags      (u16 BE)
//! [0x12] CharacterId        (u16 BE)
//! [0x14] Runtime pointer    (u32, always 0 on disk)
//! ```

use std::collections::BTreeMap;

use log::debug;
use serde::Serialize;

use super::dat::DatFile;
use super::figatree::short_name;
use crate::attributes::{Attributes, decode_attributes};
use crate::events::{Event, EventDecoder, Subroutine};
use crate::utils::{be_u16, be_u32, cursor_at, null_string, region};
use crate::{Error, Result};

/// Size of one subaction record.
pub const SUBACTION_SIZE: usize = 0x18;

/// The fixed ftData header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FighterDataHeader {
    pub attributes_offset: u32,
    pub attributes_end: u32,
    pub reserved1: u32,
    pub subactions_offset: u32,
    pub reserved2: u32,
    pub subactions_end: u32,
}

impl FighterDataHeader {
    fn parse(data: &[u8], offset: u32) -> Result<Self> {
        let mut r = cursor_at(data, offset as usize);
        Ok(Self {
            attributes_offset: be_u32(&mut r)?,
            attributes_end: be_u32(&mut r)?,
            reserved1: be_u32(&mut r)?,
            subactions_offset: be_u32(&mut r)?,
            reserved2: be_u32(&mut r)?,
            subactions_end: be_u32(&mut r)?,
        })
    }
}

/// Decoded fighter data.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FighterData {
    #[serde(skip)]
    pub header: FighterDataHeader,
    pub attributes: Attributes,
    pub subactions: Vec<Subaction>,
    /// Every script reached from a subaction through `subroutine` or `goto`,
    /// keyed by data-block offset.
    pub subroutines: BTreeMap<u32, Subroutine>,
}

/// One subaction (move script) of a fighter.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Subaction {
    pub short_name: String,
    pub name: String,
    #[serde(rename = "animOffset")]
    pub animation_offset: u32,
    #[serde(rename = "animSize")]
    pub animation_size: u32,
    /// The subaction's animation, parsed from the companion archive.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub animation_file: Option<Box<DatFile>>,
    pub events_offset: u32,
    pub events: Vec<Event>,
    #[serde(skip)]
    pub name_offset: u32,
    #[serde(skip)]
    pub position_flags: u16,
    #[serde(skip)]
    pub character_id: u16,
}

impl FighterData {
    /// Parse the ftData node at `offset` within the data block.
    pub fn parse(data: &[u8], offset: u32, anim: Option<&[u8]>) -> Result<Self> {
        let header = FighterDataHeader::parse(data, offset)?;

        let attributes = decode_attributes(span(
            data,
            header.attributes_offset,
            header.attributes_end,
        )?)?;

        let table = span(data, header.subactions_offset, header.subactions_end)?;
        if table.len() % SUBACTION_SIZE != 0 {
            return Err(Error::Parse("subaction table is not a whole number of records"));
        }

        let mut decoder = EventDecoder::new(data);
        let subactions = table
            .chunks_exact(SUBACTION_SIZE)
            .map(|record| Subaction::parse(record, data, anim, &mut decoder))
            .collect::<Result<Vec<_>>>()?;
        debug!(
            "{} subactions, {} subroutines",
            subactions.len(),
            decoder.subroutines().len()
        );

        Ok(Self {
            header,
            attributes,
            subactions,
            subroutines: decoder.into_subroutines(),
        })
    }

    /// Find a subaction by its short name.
    pub fn get_subaction(&self, short_name: &str) -> Option<&Subaction> {
        self.subactions.iter().find(|s| s.short_name == short_name)
    }
}

impl Subaction {
    fn parse(
        record: &[u8],
        data: &[u8],
        anim: Option<&[u8]>,
        decoder: &mut EventDecoder<'_>,
    ) -> Result<Self> {
        let mut r = cursor_at(record, 0);
        let name_offset = be_u32(&mut r)?;
        let animation_offset = be_u32(&mut r)?;
        let animation_size = be_u32(&mut r)?;
        let events_offset = be_u32(&mut r)?;
        let position_flags = be_u16(&mut r)?;
        let character_id = be_u16(&mut r)?;
        let _runtime_ptr = be_u32(&mut r)?;

        // Unnamed subactions have a null name pointer.
        let name = if name_offset == 0 {
            String::new()
        } else {
            null_string(data, name_offset as usize)?
        };
        let events = decoder.decode_script(events_offset)?;

        let animation_file = match anim {
            Some(anim) if animation_size > 0 => {
                debug!("{name}: animation at {animation_offset:#x}+{animation_size:#x}");
                let bytes = region(anim, animation_offset as usize, animation_size as usize)?;
                Some(Box::new(DatFile::parse(bytes, None)?))
            }
            _ => None,
        };

        Ok(Self {
            short_name: short_name(&name),
            name,
            animation_offset,
            animation_size,
            animation_file,
            events_offset,
            events,
            name_offset,
            position_flags,
            character_id,
        })
    }

    /// Raw animation bytes of this subaction within the companion archive.
    pub fn animation_bytes<'a>(&self, anim: &'a [u8]) -> Result<&'a [u8]> {
        region(
            anim,
            self.animation_offset as usize,
            self.animation_size as usize,
        )
    }
}

/// Borrow `data[start..end]`.
fn span(data: &[u8], start: u32, end: u32) -> Result<&[u8]> {
    let len = end.checked_sub(start).ok_or(Error::InvalidRange)?;
    region(data, start as usize, len as usize)
}
