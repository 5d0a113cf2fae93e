//! Subaction event scripts.
//!
//! A script is a run of variable-length event records, each starting with a
//! command byte whose high six bits select the opcode. Records are laid end to
//! end and the script ends at the first `exit` (command id `0x00`):
//!
//! ```text
//! [04 00 00 0a] wait_until frames=10
//! [2c 00 ...  ] hitbox (0x14 bytes)
//! [08 00 00 05] wait_for frames=5
//! [40 00 00 00] end_all_collisions
//! [00 00 00 00] exit
//! ```
//!
//! `subroutine` and `goto` events carry a data-block offset of another
//! script. [`EventDecoder`] follows those offsets and keeps every script it
//! reaches in an offset-keyed table.

pub mod registry;

use std::collections::BTreeMap;

use log::{debug, trace};
use serde::{Serialize, Serializer};

use crate::bits;
use crate::utils::{hex_bytes, region};
use crate::{Error, Result};

use self::registry::{ControlFlow, Fields, Registry};

/// Mask that turns a command byte into a command id.
pub const COMMAND_MASK: u8 = 0xFC;

/// One decoded event record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// Masked command id (`byte & 0xFC`).
    #[serde(serialize_with = "hex_id")]
    pub command_id: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<&'static str>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub speculative: bool,
    /// Bytes consumed, equal to the opcode's declared length.
    pub length: usize,
    /// The raw record.
    #[serde(serialize_with = "hex_record")]
    pub bytes: Vec<u8>,
    #[serde(skip_serializing_if = "Fields::is_empty")]
    pub fields: Fields,
    #[serde(skip)]
    pub flow: ControlFlow,
}

fn hex_id<S: Serializer>(id: &u8, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_str(&format!("{id:#x}"))
}

fn hex_record<S: Serializer>(bytes: &[u8], s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_str(&hex_bytes(bytes))
}

impl Event {
    /// Whether this event ends a script.
    pub fn is_exit(&self) -> bool {
        self.command_id == 0x00
    }

    /// Target offset of a `subroutine` or `goto` event.
    pub fn target(&self) -> Option<u32> {
        match self.flow {
            ControlFlow::Call | ControlFlow::Jump => self
                .fields
                .get("location")
                .and_then(|v| v.as_int())
                .and_then(|v| u32::try_from(v).ok()),
            _ => None,
        }
    }
}

/// Decode the single event that starts at `offset` in `data`.
///
/// Unknown command ids decode as 4-byte raw records. Returns
/// [`Error::TruncatedInput`] if the record runs past the end of `data`.
pub fn decode_event(data: &[u8], offset: usize, registry: &Registry) -> Result<Event> {
    let command_id = *data.get(offset).ok_or(Error::TruncatedInput)? & COMMAND_MASK;
    let meta = registry.get(command_id);
    let bytes = region(data, offset, meta.length)?;

    let mut fields = Fields::new();
    if let Some(layout) = meta.layout {
        let values = bits::decode(bytes, layout.bits)?;
        fields.extend(layout.names.iter().copied().zip(values));
    }
    if let Some(post_process) = meta.post_process {
        post_process(&mut fields);
    }

    Ok(Event {
        command_id,
        name: meta.name,
        speculative: meta.speculative,
        length: meta.length,
        bytes: bytes.to_vec(),
        fields,
        flow: meta.flow,
    })
}

/// Decode a script starting at `offset`.
///
/// Stops after the first `exit` event, or when the cursor lands exactly on
/// the end of `data`. The returned events are in script order.
pub fn decode_stream(data: &[u8], offset: usize, registry: &Registry) -> Result<Vec<Event>> {
    if offset > data.len() {
        return Err(Error::TruncatedInput);
    }

    let mut events = Vec::new();
    let mut cursor = offset;
    while cursor < data.len() {
        let event = decode_event(data, cursor, registry)?;
        trace!("{cursor:#x}: {:?} {:?}", event.name, event.fields);
        cursor += event.length;
        let done = event.is_exit();
        events.push(event);
        if done {
            break;
        }
    }
    Ok(events)
}

/// Scripts decoded from one offset, by how they were reached.
///
/// The same offset can be both called and jumped to; the two decodings
/// differ in where they stop, so each is kept.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Subroutine {
    /// Reached through `subroutine`: runs to `exit`.
    #[serde(rename = "subroutine", skip_serializing_if = "Option::is_none")]
    pub call: Option<Vec<Event>>,
    /// Reached through `goto`: ends with its first `return`.
    #[serde(rename = "goto", skip_serializing_if = "Option::is_none")]
    pub jump: Option<Vec<Event>>,
}

impl Subroutine {
    /// The script decoded for `flow`, which is `Call` or `Jump`.
    pub fn get(&self, flow: ControlFlow) -> Option<&[Event]> {
        match flow {
            ControlFlow::Call => self.call.as_deref(),
            ControlFlow::Jump => self.jump.as_deref(),
            _ => None,
        }
    }

    fn slot(&mut self, flow: ControlFlow) -> &mut Option<Vec<Event>> {
        if flow == ControlFlow::Jump {
            &mut self.jump
        } else {
            &mut self.call
        }
    }
}

/// Script decoder for one data block that also collects every script reached
/// through `subroutine` and `goto` events.
///
/// Scripts reached via `goto` are cut after their first `return`. Each
/// (offset, flow) pair is decoded once, so the collected table does not
/// depend on the order scripts are decoded in.
pub struct EventDecoder<'a> {
    data: &'a [u8],
    registry: &'a Registry,
    subroutines: BTreeMap<u32, Subroutine>,
}

impl<'a> EventDecoder<'a> {
    /// Decoder over `data` using the global opcode table.
    pub fn new(data: &'a [u8]) -> Self {
        Self::with_registry(data, registry::registry())
    }

    pub fn with_registry(data: &'a [u8], registry: &'a Registry) -> Self {
        Self {
            data,
            registry,
            subroutines: BTreeMap::new(),
        }
    }

    /// Decode the script at `offset` and every script it reaches.
    ///
    /// Returns the script itself; reached scripts are available from
    /// [`subroutines`](Self::subroutines).
    pub fn decode_script(&mut self, offset: u32) -> Result<Vec<Event>> {
        let events = decode_stream(self.data, offset as usize, self.registry)?;
        self.discover(&events)?;
        Ok(events)
    }

    /// Scripts reached so far, keyed by data-block offset.
    pub fn subroutines(&self) -> &BTreeMap<u32, Subroutine> {
        &self.subroutines
    }

    pub fn into_subroutines(self) -> BTreeMap<u32, Subroutine> {
        self.subroutines
    }

    fn discover(&mut self, events: &[Event]) -> Result<()> {
        let mut pending: Vec<(u32, ControlFlow)> = branch_targets(events).collect();

        while let Some((target, flow)) = pending.pop() {
            let slot = self.subroutines.entry(target).or_default().slot(flow);
            if slot.is_some() {
                continue;
            }
            debug!("decoding {flow:?} target at {target:#x}");

            let mut script = decode_stream(self.data, target as usize, self.registry)?;
            if flow == ControlFlow::Jump {
                let end = script
                    .iter()
                    .position(|e| e.flow == ControlFlow::Return)
                    .ok_or(Error::MalformedControlFlow { offset: target })?;
                script.truncate(end + 1);
            }

            pending.extend(branch_targets(&script));
            *slot = Some(script);
        }
        Ok(())
    }
}

fn branch_targets(events: &[Event]) -> impl Iterator<Item = (u32, ControlFlow)> + '_ {
    events
        .iter()
        .filter_map(|e| e.target().map(|target| (target, e.flow)))
}
