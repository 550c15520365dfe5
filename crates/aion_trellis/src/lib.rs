//! Device database for Lattice ECP5 and MachXO2-class FPGAs.
//!
//! This crate resolves device names and IDCODEs against a
//! [Project Trellis](https://github.com/YosysHQ/prjtrellis-db) style
//! database and serves the per-device and per-tile-type data that placers,
//! routers and bitstream generators need: chip geometry, the tile grid,
//! global routing topology, and tile bit databases.
//!
//! # Database files
//!
//! - `devices.json`: families, devices, frame geometry and IDCODEs
//! - `<family>/<device>/tilegrid.json`: tiles with their bit windows and sites
//! - `<family>/<device>/globals.json`: family-specific global network layout
//! - `<family>/tiledata/<tiletype>/bits.db`: feature-to-bit mapping per tile type
//!
//! Tilegrids and bit databases are parsed at most once per key and cached
//! for the lifetime of the [`Database`]; both caches are safe to use from
//! many threads at once.
//!
//! # Usage
//!
//! Point `AION_TRELLIS_DB` to a clone of the database, or set `root` in the
//! `[database]` table of a configuration file, then:
//!
//! ```no_run
//! use aion_trellis::{Database, TileLocator};
//!
//! # fn main() -> aion_trellis::DatabaseResult<()> {
//! let db = Database::initialize("/path/to/prjtrellis-db")?;
//! let device = db.find_by_name("LFE5U-25F")?;
//! let chip = db.chip_info(&device)?;
//! for tile in db.tile_grid(&device)? {
//!     let bits = db.tile_bit_database(&TileLocator::new(&chip.family, &tile.tile_type))?;
//!     let _ = bits;
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod bitdb;
pub mod bitdb_cache;
pub mod catalog;
pub mod chip;
pub mod config;
pub mod database;
mod entries;
pub mod error;
pub mod globals;
pub mod locator;
pub mod tilegrid;

pub use bitdb::{ConfigBit, TileBitDatabase};
pub use bitdb_cache::{FileBitDatabaseLoader, TileBitDatabaseLoader};
pub use chip::{parse_uint32, ChipInfo};
pub use database::Database;
pub use error::{DatabaseError, DatabaseResult};
pub use globals::{Ecp5Globals, Family, GlobalsInfo, MachXO2Globals};
pub use locator::{DeviceLocator, TileLocator};
pub use tilegrid::{SiteInfo, TileInfo};
