//! HSD `.dat` - relocatable archive used for Melee fighter and animation data.
//!
//! All internal pointers are offsets into the data block, which starts right
//! after the file header. Root nodes name the entry points into that block.
//!
//! ## Layout
//! ```text
//! [0x00] File header            (0x20 bytes)
//! [0x20] Data block             (DataBlockSize bytes)
//! [...]  Relocation table       (RelocationCount × u32)
//! [...]  Root node directory    ((RootCount + RootCount2) × 0x08 bytes)
//! [...]  String table           (NUL-terminated names, to end of file)
//! ```
//!
//! ## File Header (0x20 bytes, all u32 BE)
//! ```text
//! [0x00] FileSize
//! [0x04] DataBlockSize
//! [0x08] RelocationCount
//! [0x0C] RootCount
//! [0x10] RootCount2
//! [0x14] Reserved (3 words)
//! ```
//!
//! ## Root Node (0x08 bytes)
//! ```text
//! [0x00] RootOffset        - into the data block (u32 BE)
//! [0x04] StringTableOffset - into the string table (u32 BE)
//! ```
//!
//! ## Node types
//! Nodes are typed by name: `ftData*` is fighter data
//! ([`super::ftdata`]), `*_figatree` is an animation tree
//! ([`super::figatree`]). Other nodes are kept as [`NodeData::Unknown`].
//!
//! The relocation table is read but not applied; offsets are resolved
//! directly against the data block.

use std::io::Read;

use log::{debug, warn};
use serde::Serialize;

use super::figatree::{AnimationTree, short_name};
use super::ftdata::FighterData;
use crate::Result;
use crate::utils::{be_u32, cursor_at, null_string, region};

/// Absolute file offset of the data block.
pub const DATA_BLOCK_OFFSET: usize = 0x20;

/// Name prefix of fighter data root nodes.
pub const FIGHTER_DATA_PREFIX: &str = "ftData";

/// Name suffix of animation tree root nodes.
pub const ANIMATION_TREE_SUFFIX: &str = "_figatree";

/// The fixed file header.
///
/// Region offsets are derived from the counts, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileHeader {
    pub file_size: u32,
    pub data_block_size: u32,
    pub relocation_count: u32,
    pub root_count: u32,
    pub root_count2: u32,
    pub reserved: [u32; 3],
}

impl FileHeader {
    /// Size of the header in bytes.
    pub const SIZE: usize = 0x20;

    /// Parse the header from the start of `file`.
    pub fn parse(file: &[u8]) -> Result<Self> {
        let mut r = cursor_at(file, 0);
        Ok(Self {
            file_size: be_u32(&mut r)?,
            data_block_size: be_u32(&mut r)?,
            relocation_count: be_u32(&mut r)?,
            root_count: be_u32(&mut r)?,
            root_count2: be_u32(&mut r)?,
            reserved: [be_u32(&mut r)?, be_u32(&mut r)?, be_u32(&mut r)?],
        })
    }

    pub fn data_block_offset(&self) -> usize {
        DATA_BLOCK_OFFSET
    }

    pub fn relocation_table_offset(&self) -> usize {
        DATA_BLOCK_OFFSET + self.data_block_size as usize
    }

    pub fn relocation_table_size(&self) -> usize {
        self.relocation_count as usize * 4
    }

    pub fn root_nodes_offset(&self) -> usize {
        self.relocation_table_offset() + self.relocation_table_size()
    }

    /// Number of root node records (both counts together).
    pub fn root_node_count(&self) -> usize {
        self.root_count as usize + self.root_count2 as usize
    }

    pub fn root_nodes_size(&self) -> usize {
        self.root_node_count() * 8
    }

    /// The string table runs from here to the end of the file.
    pub fn string_table_offset(&self) -> usize {
        self.root_nodes_offset() + self.root_nodes_size()
    }
}

/// Payload type of a root node, chosen from its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    FighterData,
    AnimationTree,
    Unknown,
}

impl NodeKind {
    pub fn classify(name: &str) -> Self {
        if name.starts_with(FIGHTER_DATA_PREFIX) {
            NodeKind::FighterData
        } else if name.ends_with(ANIMATION_TREE_SUFFIX) {
            NodeKind::AnimationTree
        } else {
            NodeKind::Unknown
        }
    }
}

/// Decoded payload of a root node.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum NodeData {
    FighterData(FighterData),
    AnimationTree(AnimationTree),
    /// Node type not understood; serialized as `null`.
    Unknown,
}

/// A named entry point into the data block.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RootNode {
    /// Short animation name, for animation tree nodes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub short_name: Option<String>,
    pub name: String,
    pub root_offset: u32,
    #[serde(skip)]
    pub string_table_offset: u32,
    pub data: NodeData,
}

/// Parsed `.dat` file.
///
/// Serializes as `{ "nodes": [...] }`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatFile {
    #[serde(skip)]
    pub header: FileHeader,
    /// Relocation table entries (absolute data-block offsets of pointers).
    #[serde(skip)]
    pub relocations: Vec<u32>,
    #[serde(rename = "nodes")]
    pub root_nodes: Vec<RootNode>,
}

impl DatFile {
    /// Parse a complete `.dat` file held in memory.
    ///
    /// `anim` is the companion animation archive (`Pl**AJ.dat`). When given,
    /// each fighter subaction with a non-empty animation range gets that
    /// range parsed as a nested [`DatFile`].
    pub fn parse(file: &[u8], anim: Option<&[u8]>) -> Result<Self> {
        let header = FileHeader::parse(file)?;
        let data = region(file, DATA_BLOCK_OFFSET, header.data_block_size as usize)?;

        let reloc_data = region(
            file,
            header.relocation_table_offset(),
            header.relocation_table_size(),
        )?;
        let mut r = cursor_at(reloc_data, 0);
        let relocations = (0..header.relocation_count)
            .map(|_| be_u32(&mut r))
            .collect::<Result<Vec<_>>>()?;

        let dir = region(file, header.root_nodes_offset(), header.root_nodes_size())?;
        let strings = region(
            file,
            header.string_table_offset(),
            file.len().saturating_sub(header.string_table_offset()),
        )?;

        let mut r = cursor_at(dir, 0);
        let mut root_nodes = Vec::with_capacity(header.root_node_count());
        for _ in 0..header.root_node_count() {
            let root_offset = be_u32(&mut r)?;
            let string_table_offset = be_u32(&mut r)?;
            let name = null_string(strings, string_table_offset as usize)?;
            root_nodes.push(RootNode::parse(
                name,
                root_offset,
                string_table_offset,
                data,
                anim,
            )?);
        }

        Ok(Self {
            header,
            relocations,
            root_nodes,
        })
    }

    /// Read a whole `.dat` stream and parse it.
    pub fn read<R: Read>(mut r: R, anim: Option<&[u8]>) -> Result<Self> {
        let mut file = Vec::new();
        r.read_to_end(&mut file)?;
        Self::parse(&file, anim)
    }

    /// Iterate over all root nodes.
    pub fn nodes(&self) -> impl Iterator<Item = &RootNode> {
        self.root_nodes.iter()
    }

    /// Find a root node by its exact name.
    pub fn get_node_by_name(&self, name: &str) -> Option<&RootNode> {
        self.root_nodes.iter().find(|n| n.name == name)
    }

    /// The first fighter data payload, if any.
    pub fn fighter_data(&self) -> Option<&FighterData> {
        self.root_nodes.iter().find_map(|n| match &n.data {
            NodeData::FighterData(ft) => Some(ft),
            _ => None,
        })
    }
}

impl RootNode {
    fn parse(
        name: String,
        root_offset: u32,
        string_table_offset: u32,
        data: &[u8],
        anim: Option<&[u8]>,
    ) -> Result<Self> {
        let kind = NodeKind::classify(&name);
        debug!("root node {name:?} at {root_offset:#x}: {kind:?}");

        let (short_name, data) = match kind {
            NodeKind::FighterData => (
                None,
                NodeData::FighterData(FighterData::parse(data, root_offset, anim)?),
            ),
            NodeKind::AnimationTree => (
                Some(short_name(&name)),
                NodeData::AnimationTree(AnimationTree::parse(data, root_offset)?),
            ),
            NodeKind::Unknown => {
                warn!("unknown root node type: {name:?}");
                (None, NodeData::Unknown)
            }
        };

        Ok(Self {
            short_name,
            name,
            root_offset,
            string_table_offset,
            data,
        })
    }
}
