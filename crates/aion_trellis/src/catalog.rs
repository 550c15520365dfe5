//! The device catalog loaded from `devices.json`.
//!
//! The catalog lists every family and, per family, every device with its
//! frame geometry and IDCODE. It is parsed once when the database is opened
//! and is read-only afterwards, so lookups need no locking.
//!
//! ```text
//! {
//!   "families": {
//!     "ECP5": {
//!       "devices": {
//!         "LFE5U-25F": {
//!           "idcode": "0x41111043",
//!           "frames": 7562,
//!           "bits_per_frame": 592,
//!           "pad_bits_before_frame": 0,
//!           "pad_bits_after_frame": 0,
//!           "max_row": 50,
//!           "max_col": 72,
//!           "col_bias": 0
//!         }
//!       }
//!     }
//!   }
//! }
//! ```

use std::path::Path;

use indexmap::IndexMap;
use serde::Deserialize;

use crate::chip::{parse_uint32, ChipInfo};
use crate::entries::Entries;
use crate::error::{read_file, DatabaseError, DatabaseResult};
use crate::locator::DeviceLocator;

/// Raw JSON structure of `devices.json`.
#[derive(Deserialize)]
struct RawCatalog {
    families: Entries<RawFamily>,
}

#[derive(Deserialize)]
struct RawFamily {
    devices: Entries<RawDevice>,
}

/// Raw JSON structure of one device record. Unknown fields are ignored.
#[derive(Deserialize)]
struct RawDevice {
    idcode: String,
    frames: usize,
    #[serde(default)]
    bits_per_frame: usize,
    #[serde(default)]
    pad_bits_before_frame: usize,
    #[serde(default)]
    pad_bits_after_frame: usize,
    #[serde(default)]
    max_row: i32,
    #[serde(default)]
    max_col: i32,
    #[serde(default)]
    col_bias: i32,
}

/// A validated device record with its IDCODE already parsed.
#[derive(Debug, Clone)]
struct DeviceRecord {
    idcode: u32,
    frames: usize,
    bits_per_frame: usize,
    pad_bits_before_frame: usize,
    pad_bits_after_frame: usize,
    max_row: i32,
    max_col: i32,
    col_bias: i32,
}

impl DeviceRecord {
    fn from_raw(device: &str, raw: RawDevice) -> DatabaseResult<Self> {
        let idcode = parse_uint32(&raw.idcode).ok_or_else(|| {
            DatabaseError::parse(format!(
                "device '{device}': invalid idcode '{}'",
                raw.idcode
            ))
        })?;
        Ok(Self {
            idcode,
            frames: raw.frames,
            bits_per_frame: raw.bits_per_frame,
            pad_bits_before_frame: raw.pad_bits_before_frame,
            pad_bits_after_frame: raw.pad_bits_after_frame,
            max_row: raw.max_row,
            max_col: raw.max_col,
            col_bias: raw.col_bias,
        })
    }
}

/// Index of all families and devices, in the order `devices.json` declares them.
#[derive(Debug, Clone, Default)]
pub struct DeviceCatalog {
    families: IndexMap<String, IndexMap<String, DeviceRecord>>,
}

impl DeviceCatalog {
    /// Reads and parses a `devices.json` file.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::Io`] if the file cannot be read and
    /// [`DatabaseError::Parse`] if it is malformed or any IDCODE is invalid.
    pub fn load(path: &Path) -> DatabaseResult<Self> {
        let json = read_file(path)?;
        Self::from_json(&json).map_err(|e| e.at_path(path))
    }

    /// Parses catalog JSON from a string.
    ///
    /// A family or device declared more than once keeps its first position,
    /// and the first record of a repeated (family, device) pair wins. Later
    /// duplicates are still validated.
    pub fn from_json(json: &str) -> DatabaseResult<Self> {
        let raw: RawCatalog =
            serde_json::from_str(json).map_err(|e| DatabaseError::parse(e.to_string()))?;

        let mut families: IndexMap<String, IndexMap<String, DeviceRecord>> =
            IndexMap::with_capacity(raw.families.len());
        for (family, raw_family) in raw.families {
            let devices = families.entry(family.clone()).or_default();
            for (device, raw_device) in raw_family.devices {
                let record = DeviceRecord::from_raw(&device, raw_device)?;
                if devices.contains_key(&device) {
                    log::warn!("ignoring duplicate device {family}/{device} in catalog");
                    continue;
                }
                devices.insert(device, record);
            }
        }
        Ok(Self { families })
    }

    /// Scans every (family, device) pair in catalog order and returns the
    /// first one accepted by `pred`.
    fn find_device(&self, pred: impl Fn(&str, &DeviceRecord) -> bool) -> Option<DeviceLocator> {
        self.families.iter().find_map(|(family, devices)| {
            devices
                .iter()
                .find(|(device, record)| pred(device, record))
                .map(|(device, _)| DeviceLocator::new(family.as_str(), device.as_str()))
        })
    }

    /// Finds a device by exact name. The first match in declared order wins.
    pub fn find_by_name(&self, name: &str) -> DatabaseResult<DeviceLocator> {
        self.find_device(|device, _| device == name)
            .ok_or_else(|| DatabaseError::not_found(format!("name {name}")))
    }

    /// Finds a device by JTAG IDCODE. The first match in declared order wins.
    pub fn find_by_idcode(&self, idcode: u32) -> DatabaseResult<DeviceLocator> {
        self.find_device(|_, record| record.idcode == idcode)
            .ok_or_else(|| DatabaseError::not_found(format!("IDCODE 0x{idcode:08x}")))
    }

    /// Returns the chip facts for a locator obtained from this catalog.
    pub fn chip_info(&self, locator: &DeviceLocator) -> DatabaseResult<ChipInfo> {
        let record = self
            .families
            .get(&locator.family)
            .and_then(|devices| devices.get(&locator.device))
            .ok_or_else(|| DatabaseError::not_found(format!("locator {locator}")))?;
        Ok(ChipInfo {
            family: locator.family.clone(),
            name: locator.device.clone(),
            num_frames: record.frames,
            bits_per_frame: record.bits_per_frame,
            pad_bits_before_frame: record.pad_bits_before_frame,
            pad_bits_after_frame: record.pad_bits_after_frame,
            idcode: record.idcode,
            max_row: record.max_row,
            max_col: record.max_col,
            col_bias: record.col_bias,
        })
    }

    /// Returns `true` if the locator names a device in this catalog.
    pub fn contains(&self, locator: &DeviceLocator) -> bool {
        self.families
            .get(&locator.family)
            .is_some_and(|devices| devices.contains_key(&locator.device))
    }

    /// Iterates over every device in catalog order.
    pub fn devices(&self) -> impl Iterator<Item = DeviceLocator> + '_ {
        self.families.iter().flat_map(|(family, devices)| {
            devices
                .keys()
                .map(move |device| DeviceLocator::new(family.as_str(), device.as_str()))
        })
    }

    /// Iterates over family names in catalog order.
    pub fn families(&self) -> impl Iterator<Item = &str> + '_ {
        self.families.keys().map(String::as_str)
    }

    /// Returns the total number of devices across all families.
    pub fn device_count(&self) -> usize {
        self.families.values().map(IndexMap::len).sum()
    }
}
