//! **datkit** - a decoder for HSD `.dat` fighter files from Super Smash
//! Bros. Melee.
//!
//! # Modules
//! | Module | Contents |
//! |--------|----------|
//! | [`formats::dat`]      | `.dat` archive: header, relocation table, root nodes |
//! | [`formats::ftdata`]   | Fighter data: attributes, subactions |
//! | [`formats::figatree`] | Animation tree headers |
//! | [`events`]            | Subaction event scripts and subroutine discovery |
//! | [`events::registry`]  | Opcode table for event scripts |
//! | [`attributes`]        | Fighter attribute schema |
//! | [`bits`]              | Bit-packed event field codec |
//!
//! # Example
//! ```no_run
//! use datkit::formats::dat::DatFile;
//!
//! let fighter = std::fs::read("PlFx.dat")?;
//! let anims = std::fs::read("PlFxAJ.dat").ok();
//! let dat = DatFile::parse(&fighter, anims.as_deref())?;
//!
//! if let Some(ft) = dat.fighter_data() {
//!     for sub in &ft.subactions {
//!         println!("{}: {} events", sub.short_name, sub.events.len());
//!     }
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod attributes;
pub mod bits;
pub mod error;
pub mod events;
pub mod formats;
pub mod utils;

pub use error::{Error, Result};
