//! The database context object.
//!
//! A [`Database`] owns the device catalog and both caches. It is created once
//! per process (or per test) and shared by reference or `Arc` with every
//! worker that needs device facts. All methods take `&self`.
//!
//! ```text
//! <root>/
//! ├── devices.json
//! └── ECP5/
//!     ├── LFE5U-25F/
//!     │   ├── globals.json
//!     │   └── tilegrid.json
//!     └── tiledata/
//!         └── PLC2/
//!             └── bits.db
//! ```

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use crate::bitdb::TileBitDatabase;
use crate::bitdb_cache::{FileBitDatabaseLoader, TileBitDatabaseCache, TileBitDatabaseLoader};
use crate::catalog::DeviceCatalog;
use crate::chip::ChipInfo;
use crate::error::{read_file, DatabaseError, DatabaseResult};
use crate::globals::{parse_globals, Family, GlobalsInfo};
use crate::locator::{DeviceLocator, TileLocator};
use crate::tilegrid::{TileGridCache, TileGridTable, TileInfo};

/// Catalog file name at the database root.
const DEVICES_FILE: &str = "devices.json";

/// Per-device globals file name.
const GLOBALS_FILE: &str = "globals.json";

/// Per-device tilegrid file name.
const TILEGRID_FILE: &str = "tilegrid.json";

/// Per-tile-type bit database file name.
const BITDB_FILE: &str = "bits.db";

/// Device database rooted at one directory.
#[derive(Debug)]
pub struct Database {
    root: PathBuf,
    catalog: DeviceCatalog,
    tilegrids: TileGridCache,
    bitdbs: TileBitDatabaseCache,
}

impl Database {
    /// Opens the database at `root` and parses its `devices.json`.
    ///
    /// # Errors
    ///
    /// Fails if the catalog is missing or malformed. A database that cannot
    /// be initialized must not be used.
    pub fn initialize(root: impl Into<PathBuf>) -> DatabaseResult<Self> {
        Self::with_loader(root, Box::new(FileBitDatabaseLoader))
    }

    /// Opens the database at `root`, constructing bit databases through
    /// `loader`.
    pub fn with_loader(
        root: impl Into<PathBuf>,
        loader: Box<dyn TileBitDatabaseLoader>,
    ) -> DatabaseResult<Self> {
        let root = root.into();
        let catalog = DeviceCatalog::load(&root.join(DEVICES_FILE))?;
        log::info!(
            "opened device database at {} ({} families, {} devices)",
            root.display(),
            catalog.families().count(),
            catalog.device_count()
        );
        Ok(Self {
            root,
            catalog,
            tilegrids: TileGridCache::new(),
            bitdbs: TileBitDatabaseCache::new(loader),
        })
    }

    /// Returns the database root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the device catalog.
    pub fn catalog(&self) -> &DeviceCatalog {
        &self.catalog
    }

    /// Iterates over every device in catalog order.
    pub fn devices(&self) -> impl Iterator<Item = DeviceLocator> + '_ {
        self.catalog.devices()
    }

    /// Finds a device by exact name.
    pub fn find_by_name(&self, name: &str) -> DatabaseResult<DeviceLocator> {
        self.catalog.find_by_name(name)
    }

    /// Finds a device by JTAG IDCODE.
    pub fn find_by_idcode(&self, idcode: u32) -> DatabaseResult<DeviceLocator> {
        self.catalog.find_by_idcode(idcode)
    }

    /// Returns the chip facts of a device.
    pub fn chip_info(&self, locator: &DeviceLocator) -> DatabaseResult<ChipInfo> {
        self.catalog.chip_info(locator)
    }

    fn device_dir(&self, locator: &DeviceLocator) -> PathBuf {
        self.root.join(&locator.family).join(&locator.device)
    }

    fn check_device(&self, locator: &DeviceLocator) -> DatabaseResult<()> {
        if self.catalog.contains(locator) {
            Ok(())
        } else {
            Err(DatabaseError::not_found(format!("locator {locator}")))
        }
    }

    /// Reads and parses the device's `globals.json`.
    ///
    /// The layout is chosen from the locator's family. The result is not
    /// cached; callers that need it repeatedly should keep it.
    ///
    /// # Errors
    ///
    /// [`DatabaseError::UnsupportedFamily`] for families without a globals
    /// layout, plus the usual I/O, parse and consistency errors.
    pub fn load_globals(&self, locator: &DeviceLocator) -> DatabaseResult<GlobalsInfo> {
        self.check_device(locator)?;
        let family =
            Family::from_name(&locator.family).ok_or_else(|| DatabaseError::UnsupportedFamily {
                family: locator.family.clone(),
            })?;
        let path = self.device_dir(locator).join(GLOBALS_FILE);
        let json = read_file(&path)?;
        parse_globals(family, &json).map_err(|e| e.at_path(&path))
    }

    fn tile_grid_table(&self, locator: &DeviceLocator) -> DatabaseResult<Arc<TileGridTable>> {
        self.check_device(locator)?;
        let path = self.device_dir(locator).join(TILEGRID_FILE);
        self.tilegrids
            .get_or_load(locator, || TileGridTable::load(&path))
    }

    /// Returns every tile of the device, in `tilegrid.json` order.
    ///
    /// The file is read once per device; later calls rebuild the tile list
    /// from the cached table.
    pub fn tile_grid(&self, locator: &DeviceLocator) -> DatabaseResult<Vec<TileInfo>> {
        let chip = self.chip_info(locator)?;
        let table = self.tile_grid_table(locator)?;
        Ok(table.tile_infos(&chip))
    }

    /// Returns the distinct tile types used by the device, sorted.
    pub fn unique_tile_types(&self, locator: &DeviceLocator) -> DatabaseResult<Vec<String>> {
        Ok(self.tile_grid_table(locator)?.tile_types())
    }

    /// Returns the shared bit database of a tile type.
    ///
    /// The first request for a locator loads
    /// `<root>/<family>/tiledata/<tiletype>/bits.db`; every request for the
    /// same locator, from any thread, returns the same `Arc`.
    ///
    /// # Errors
    ///
    /// [`DatabaseError::InvalidLocator`] if the family or tile type is not a
    /// single plain path component, plus the errors of the loader.
    pub fn tile_bit_database(&self, tile: &TileLocator) -> DatabaseResult<Arc<TileBitDatabase>> {
        check_path_component(tile, "family", &tile.family)?;
        check_path_component(tile, "tile type", &tile.tiletype)?;
        let path = self
            .root
            .join(&tile.family)
            .join("tiledata")
            .join(&tile.tiletype)
            .join(BITDB_FILE);
        self.bitdbs.get_or_load(tile, &path)
    }
}

/// Rejects locator parts that would resolve outside their directory.
fn check_path_component(tile: &TileLocator, kind: &str, part: &str) -> DatabaseResult<()> {
    let mut components = Path::new(part).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(name)), None)
            if name == part && !part.contains(|c| c == '/' || c == '\\') =>
        {
            Ok(())
        }
        _ => Err(DatabaseError::InvalidLocator {
            locator: tile.to_string(),
            reason: format!("{kind} '{part}' is not a plain name"),
        }),
    }
}
