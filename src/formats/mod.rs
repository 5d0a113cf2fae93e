//! Parsers for the HSD `.dat` archive and the payloads it carries.
//!
//! All parsers follow the same conventions:
//!
//! * **In-memory** - a `.dat` file is relocatable: every pointer is an
//!   offset into the data block, so parsers take the whole file as a byte
//!   slice rather than a stream.
//! * **Owned output** - the decoded model borrows nothing from the input
//!   buffers; it can outlive them and be serialized with `serde`.
//! * **Fail whole** - any read outside a buffer aborts the file. The only
//!   soft failure is an unrecognised root node, which is kept as
//!   [`dat::NodeData::Unknown`].
//!
//! ## Format overview
//!
//! | Module       | Structure  | Description |
//! |--------------|------------|-------------|
//! | [`dat`]      | `.dat`     | Outer archive: header, data block, relocations, root nodes, strings |
//! | [`ftdata`]   | `ftData*`  | Fighter attributes and subaction table with event scripts |
//! | [`figatree`] | `*_figatree` | Animation header: frame count and track offsets |

pub mod dat;
pub mod figatree;
pub mod ftdata;
