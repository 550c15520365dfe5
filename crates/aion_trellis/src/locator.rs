//! Value-typed keys identifying devices and tile types.

use std::fmt;

/// Identifies one device within one family, e.g. `ECP5/LFE5U-25F`.
///
/// Obtained from [`Database::find_by_name`](crate::Database::find_by_name) or
/// [`Database::find_by_idcode`](crate::Database::find_by_idcode) and used as
/// the key for every per-device lookup.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceLocator {
    /// The family name as it appears in `devices.json`.
    pub family: String,
    /// The device name as it appears in `devices.json`.
    pub device: String,
}

impl DeviceLocator {
    /// Creates a device locator.
    pub fn new(family: impl Into<String>, device: impl Into<String>) -> Self {
        Self {
            family: family.into(),
            device: device.into(),
        }
    }
}

impl fmt::Display for DeviceLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.family, self.device)
    }
}

/// Identifies a tile type within a family.
///
/// Bit databases are shared by every device of a family, so this key
/// deliberately carries no device name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileLocator {
    /// The family name.
    pub family: String,
    /// The tile type, e.g. `PLC2`.
    pub tiletype: String,
}

impl TileLocator {
    /// Creates a tile locator.
    pub fn new(family: impl Into<String>, tiletype: impl Into<String>) -> Self {
        Self {
            family: family.into(),
            tiletype: tiletype.into(),
        }
    }
}

impl fmt::Display for TileLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.family, self.tiletype)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn equal_values_hash_equal() {
        let mut set = HashSet::new();
        set.insert(DeviceLocator::new("ECP5", "LFE5U-25F"));
        assert!(set.contains(&DeviceLocator::new("ECP5", "LFE5U-25F")));
        assert!(!set.contains(&DeviceLocator::new("ECP5", "LFE5U-45F")));
    }

    #[test]
    fn display_formats() {
        assert_eq!(
            DeviceLocator::new("MachXO2", "LCMXO2-1200HC").to_string(),
            "MachXO2/LCMXO2-1200HC"
        );
        assert_eq!(TileLocator::new("ECP5", "PLC2").to_string(), "ECP5/PLC2");
    }

    #[test]
    fn tile_locator_ignores_device() {
        let a = TileLocator::new("ECP5", "PLC2");
        let b = TileLocator::new("ECP5".to_string(), "PLC2".to_string());
        assert_eq!(a, b);
        assert_ne!(a, TileLocator::new("MachXO2", "PLC2"));
    }
}
