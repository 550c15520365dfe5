//! Parser and cache for per-device `tilegrid.json` files.
//!
//! The tilegrid lists every tile of a device with its frame/bit window in the
//! configuration memory, its tile type, and the placement sites it contains.
//! Tile records keep the order they have in the file.
//!
//! ```text
//! {
//!   "R2C2:PLC2": {
//!     "cols": 48, "rows": 94, "start_bit": 0, "start_frame": 0,
//!     "type": "PLC2",
//!     "sites": [ { "name": "SLICEA", "pos_row": 2, "pos_col": 2 } ]
//!   }
//! }
//! ```

use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use indexmap::IndexMap;
use serde::Deserialize;

use crate::chip::ChipInfo;
use crate::error::{read_file, DatabaseError, DatabaseResult};
use crate::locator::DeviceLocator;

/// A placement site inside a tile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteInfo {
    /// Site type, e.g. `SLICEA`.
    pub site_type: String,
    /// Grid row of the site.
    pub row: i32,
    /// Grid column of the site.
    pub col: i32,
}

/// One physical tile of a device.
///
/// Carries a copy of the device's grid dimensions so consumers handling a
/// single tile need not look up the chip again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileInfo {
    /// Family name.
    pub family: String,
    /// Device name.
    pub device: String,
    /// Largest tile row index of the device.
    pub max_row: i32,
    /// Largest tile column index of the device.
    pub max_col: i32,
    /// Column bias of the device.
    pub col_bias: i32,
    /// Tile name, e.g. `R2C2:PLC2`.
    pub name: String,
    /// Tile type, e.g. `PLC2`.
    pub tile_type: String,
    /// Number of frames the tile spans.
    pub num_frames: usize,
    /// Number of bits the tile occupies in each frame.
    pub bits_per_frame: usize,
    /// First bit of the tile within each frame.
    pub bit_offset: usize,
    /// First frame of the tile.
    pub frame_offset: usize,
    /// Sites in file order.
    pub sites: Vec<SiteInfo>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawTile {
    cols: usize,
    rows: usize,
    start_bit: usize,
    start_frame: usize,
    #[serde(rename = "type")]
    tile_type: String,
    #[serde(default)]
    sites: Vec<RawSite>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawSite {
    name: String,
    pos_row: i32,
    pos_col: i32,
}

/// The parsed contents of one `tilegrid.json`, as stored in the cache.
#[derive(Debug, Clone, Default)]
pub struct TileGridTable {
    tiles: IndexMap<String, RawTile>,
}

impl TileGridTable {
    /// Reads and parses a `tilegrid.json` file.
    pub fn load(path: &Path) -> DatabaseResult<Self> {
        let json = read_file(path)?;
        Self::from_json(&json).map_err(|e| e.at_path(path))
    }

    /// Parses tilegrid JSON from a string.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::Parse`] if the JSON is malformed or a tile
    /// record is missing a field.
    pub fn from_json(json: &str) -> DatabaseResult<Self> {
        let tiles: IndexMap<String, RawTile> =
            serde_json::from_str(json).map_err(|e| DatabaseError::parse(e.to_string()))?;
        Ok(Self { tiles })
    }

    /// Returns the number of tiles.
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    /// Returns `true` if the grid has no tiles.
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Returns the distinct tile types in the grid, sorted.
    pub fn tile_types(&self) -> Vec<String> {
        self.tiles
            .values()
            .map(|t| t.tile_type.as_str())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    /// Builds one [`TileInfo`] per tile, in file order.
    pub fn tile_infos(&self, chip: &ChipInfo) -> Vec<TileInfo> {
        self.tiles
            .iter()
            .map(|(name, tile)| TileInfo {
                family: chip.family.clone(),
                device: chip.name.clone(),
                max_row: chip.max_row,
                max_col: chip.max_col,
                col_bias: chip.col_bias,
                name: name.clone(),
                tile_type: tile.tile_type.clone(),
                num_frames: tile.cols,
                bits_per_frame: tile.rows,
                bit_offset: tile.start_bit,
                frame_offset: tile.start_frame,
                sites: tile
                    .sites
                    .iter()
                    .map(|s| SiteInfo {
                        site_type: s.name.clone(),
                        row: s.pos_row,
                        col: s.pos_col,
                    })
                    .collect(),
            })
            .collect()
    }
}

/// Memoizes parsed tilegrids per device.
///
/// One lock guards the whole check-and-insert sequence, so a tilegrid is
/// read at most once per device even when several threads ask for it at the
/// same time. Failed loads insert nothing.
#[derive(Debug, Default)]
pub struct TileGridCache {
    tables: Mutex<HashMap<DeviceLocator, Arc<TileGridTable>>>,
}

impl TileGridCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached table for `locator`, calling `load` on a miss.
    pub fn get_or_load(
        &self,
        locator: &DeviceLocator,
        load: impl FnOnce() -> DatabaseResult<TileGridTable>,
    ) -> DatabaseResult<Arc<TileGridTable>> {
        let mut tables = self.tables.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(table) = tables.get(locator) {
            log::debug!("tilegrid cache hit for {locator}");
            return Ok(Arc::clone(table));
        }
        log::debug!("tilegrid cache miss for {locator}");
        let table = Arc::new(load()?);
        tables.insert(locator.clone(), Arc::clone(&table));
        Ok(table)
    }

    /// Returns the number of cached tilegrids.
    pub fn len(&self) -> usize {
        self.tables
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns `true` if nothing has been cached yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
