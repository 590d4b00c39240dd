use volman::BlockDevice;

use crate::FaultInjector;

/// An in-memory simulated block device.
///
/// Backed by a single flat `Vec<u8>`; sector `n` occupies bytes
/// `[n * sector_size, (n + 1) * sector_size)`. Dropped along with the
/// `MemBlockDevice` value, so this device cannot be used to exercise a
/// restart across separate `Volume` instances; use [`crate::FileBlockDevice`]
/// for that.
#[derive(Debug)]
pub struct MemBlockDevice {
    sector_size: usize,
    sectors: Vec<u8>,
    sector_count: u64,
    fault: FaultInjector,
}

impl MemBlockDevice {
    /// Creates a new zeroed device with `sector_count` sectors of
    /// `sector_size` bytes each.
    #[must_use]
    pub fn new(sector_count: u64, sector_size: usize) -> Self {
        Self {
            sector_size,
            sectors: vec![0u8; sector_count as usize * sector_size],
            sector_count,
            fault: FaultInjector::healthy(),
        }
    }

    /// Mutable access to this device's fault injector.
    pub fn fault_mut(&mut self) -> &mut FaultInjector {
        &mut self.fault
    }

    fn byte_range(&self, first_sector: u64, sectors: usize) -> std::ops::Range<usize> {
        let start = first_sector as usize * self.sector_size;
        let end = start + sectors * self.sector_size;
        start..end
    }
}

impl BlockDevice for MemBlockDevice {
    fn sector_size(&self) -> usize {
        self.sector_size
    }

    fn sector_count(&self) -> u64 {
        self.sector_count
    }

    fn read(&mut self, first_sector: u64, buf: &mut [u8]) -> usize {
        let sectors = buf.len() / self.sector_size;
        if !self.fault.poll() {
            return 0;
        }

        let range = self.byte_range(first_sector, sectors);
        let Some(source) = self.sectors.get(range) else {
            return 0;
        };
        buf[..source.len()].copy_from_slice(source);

        sectors
    }

    fn write(&mut self, first_sector: u64, buf: &[u8]) -> usize {
        let sectors = buf.len() / self.sector_size;
        if !self.fault.poll() {
            return 0;
        }

        let range = self.byte_range(first_sector, sectors);
        let Some(dest) = self.sectors.get_mut(range) else {
            return 0;
        };
        dest.copy_from_slice(&buf[..dest.len()]);

        sectors
    }
}
