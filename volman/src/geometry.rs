//! Pure logical-sector → physical-address mapping (rotating left-symmetric
//! parity). Nothing in this module touches a [`crate::BlockDevice`]; every
//! other component obtains addresses through [`Geometry::locate`] rather
//! than recomputing the mapping itself.

use crate::error::Error;
use crate::{MAX_DEVICES, MAX_SECTORS, MIN_DEVICES, MIN_SECTORS};

/// The fixed shape of an array: device count and sectors per device.
///
/// Sector size is not part of `Geometry`; it is always
/// [`crate::SECTOR_SIZE`], so a `Geometry` is just the two numbers the
/// distilled design calls D and S.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    device_count: u8,
    sectors_per_device: u64,
}

/// The physical address a logical sector maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectorAddress {
    /// The device holding this logical sector's data.
    pub data_device: u8,
    /// The device holding this row's parity.
    pub parity_device: u8,
    /// The physical sector (identical on every device in the row).
    pub row: u64,
}

impl Geometry {
    /// Validates `device_count` and `sectors_per_device` against the
    /// design's limits (3..=16 devices, 2048..=2097152 sectors/device).
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidGeometry`] if either bound is violated.
    pub fn new(device_count: u8, sectors_per_device: u64) -> Result<Self, Error> {
        let devices_in_range = (MIN_DEVICES..=MAX_DEVICES as u8).contains(&device_count);
        let sectors_in_range = (MIN_SECTORS..=MAX_SECTORS).contains(&sectors_per_device);

        if !devices_in_range || !sectors_in_range {
            return Err(Error::InvalidGeometry {
                device_count,
                sector_count: sectors_per_device,
            });
        }

        Ok(Self {
            device_count,
            sectors_per_device,
        })
    }

    /// Number of devices in the array (D).
    #[must_use]
    pub const fn device_count(&self) -> u8 {
        self.device_count
    }

    /// Sectors per device (S).
    #[must_use]
    pub const fn sectors_per_device(&self) -> u64 {
        self.sectors_per_device
    }

    /// Data+parity columns per row (D - 1).
    #[must_use]
    pub const fn columns(&self) -> u64 {
        self.device_count as u64 - 1
    }

    /// Rows usable for data/parity, excluding the service record and the
    /// reserved alignment sector (S - 2).
    #[must_use]
    pub const fn data_rows(&self) -> u64 {
        self.sectors_per_device - 2
    }

    /// Logical capacity in sectors: `(D - 1) * (S - 2)`.
    #[must_use]
    pub const fn capacity(&self) -> u64 {
        self.columns() * self.data_rows()
    }

    /// Physical sector holding the per-device service record (`S - 1`).
    #[must_use]
    pub const fn service_record_sector(&self) -> u64 {
        self.sectors_per_device - 1
    }

    /// Physical sector reserved for future use and left zeroed (`S - 2`).
    #[must_use]
    pub const fn reserved_sector(&self) -> u64 {
        self.sectors_per_device - 2
    }

    /// Maps a logical sector to its physical address.
    ///
    /// Total for `0 <= logical_sector < capacity()`; left-symmetric RAID-5
    /// rotates the parity device by one per row (`row % D`), and the data
    /// device is the column shifted past the parity slot.
    ///
    /// # Panics
    ///
    /// Debug builds panic if `logical_sector >= capacity()`. The design
    /// does not require a runtime range check, but out-of-range addressing
    /// is always a caller bug, so callers must range-check `size()`
    /// themselves (see the boundary behaviors in the design doc).
    #[must_use]
    pub fn locate(&self, logical_sector: u64) -> SectorAddress {
        debug_assert!(
            logical_sector < self.capacity(),
            "logical sector {logical_sector} is out of range (capacity {})",
            self.capacity()
        );

        let cols = self.columns();
        let row = logical_sector / cols;
        let col = logical_sector % cols;
        let parity_device = (row % u64::from(self.device_count)) as u8;
        let data_device = if col < u64::from(parity_device) {
            col as u8
        } else {
            (col + 1) as u8
        };

        SectorAddress {
            data_device,
            parity_device,
            row,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_too_few_devices() {
        assert!(Geometry::new(2, 2048).is_err());
    }

    #[test]
    fn rejects_too_many_devices() {
        assert!(Geometry::new(17, 2048).is_err());
    }

    #[test]
    fn rejects_out_of_range_sectors() {
        assert!(Geometry::new(3, 2047).is_err());
        assert!(Geometry::new(3, 2 * 1024 * 1024 + 1).is_err());
    }

    #[test]
    fn accepts_boundary_values() {
        assert!(Geometry::new(3, 2048).is_ok());
        assert!(Geometry::new(16, 2 * 1024 * 1024).is_ok());
    }

    #[test]
    fn capacity_matches_formula() {
        let geometry = Geometry::new(3, 2048).unwrap();
        assert_eq!(geometry.capacity(), 2 * 2046);
    }

    #[test]
    fn row_zero_parity_is_device_zero_for_three_disks() {
        // D=3: row 0 parity is device 0, so logical sectors 0 and 1 land on
        // devices 1 and 2 respectively. This is the scenario from the design
        // doc's concrete walkthrough.
        let geometry = Geometry::new(3, 2048).unwrap();

        let first = geometry.locate(0);
        assert_eq!(first.row, 0);
        assert_eq!(first.parity_device, 0);
        assert_eq!(first.data_device, 1);

        let second = geometry.locate(1);
        assert_eq!(second.row, 0);
        assert_eq!(second.parity_device, 0);
        assert_eq!(second.data_device, 2);
    }

    #[test]
    fn parity_rotates_one_device_per_row() {
        let geometry = Geometry::new(4, 2048).unwrap();
        for row in 0..8u64 {
            let logical = row * geometry.columns();
            let addr = geometry.locate(logical);
            assert_eq!(addr.row, row);
            assert_eq!(addr.parity_device, (row % 4) as u8);
        }
    }

    #[test]
    fn every_row_touches_distinct_data_and_parity_devices() {
        let geometry = Geometry::new(5, 2048).unwrap();
        for logical in 0..geometry.capacity() {
            let addr = geometry.locate(logical);
            assert_ne!(addr.data_device, addr.parity_device);
            assert!(addr.data_device < geometry.device_count());
            assert!(addr.parity_device < geometry.device_count());
        }
    }
}
