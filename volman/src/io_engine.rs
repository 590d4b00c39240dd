//! Logical read/write and on-the-fly reconstruction (§4.4). Implemented as
//! further `impl` blocks on [`crate::Volume`].

use crate::device::{xor_sector, BlockDevice};
use crate::state::VolumeStatus;
use crate::volume::Volume;
use crate::SECTOR_SIZE;

impl<Dev: BlockDevice> Volume<Dev> {
    /// Reads `buf.len() / SECTOR_SIZE` consecutive logical sectors starting
    /// at `first_logical_sector` into `buf`, reconstructing from parity on
    /// the fly for any sector whose data device is currently dead.
    ///
    /// `count == 0` (an empty `buf`) is a no-op that always succeeds. A
    /// second device failing while reconstructing a sector fails the whole
    /// call and transitions the array to `Failed`.
    pub fn read(&mut self, first_logical_sector: u64, buf: &mut [u8]) -> bool {
        for (index, sector) in buf.chunks_mut(SECTOR_SIZE).enumerate() {
            if sector.len() != SECTOR_SIZE || !self.read_sector(first_logical_sector + index as u64, sector) {
                return false;
            }
        }

        true
    }

    /// Writes `buf.len() / SECTOR_SIZE` consecutive logical sectors starting
    /// at `first_logical_sector`, updating parity for each row as described
    /// in §4.4.
    ///
    /// `count == 0` (an empty `buf`) is a no-op that always succeeds.
    pub fn write(&mut self, first_logical_sector: u64, buf: &[u8]) -> bool {
        for (index, sector) in buf.chunks(SECTOR_SIZE).enumerate() {
            if sector.len() != SECTOR_SIZE || !self.write_sector(first_logical_sector + index as u64, sector) {
                return false;
            }
        }

        true
    }

    fn read_sector(&mut self, logical_sector: u64, dest: &mut [u8]) -> bool {
        if self.status == VolumeStatus::Failed {
            return false;
        }

        let addr = self.geometry.locate(logical_sector);
        let target = addr.data_device as usize;

        if !self.alive[target] {
            return self.reconstruct(addr.data_device, addr.row, dest);
        }

        let transferred = self.devices[target].read(addr.row, dest);
        if transferred == 1 {
            return true;
        }

        self.fail_device(target);
        if self.status == VolumeStatus::Failed {
            return false;
        }

        self.reconstruct(addr.data_device, addr.row, dest)
    }

    fn write_sector(&mut self, logical_sector: u64, new_data: &[u8]) -> bool {
        if self.status == VolumeStatus::Failed {
            return false;
        }

        let addr = self.geometry.locate(logical_sector);

        // Step 1: old data, via the logical-read path so a dead data device
        // is transparently reconstructed from peers.
        let mut old_data = [0u8; SECTOR_SIZE];
        if !self.read_sector(logical_sector, &mut old_data) {
            return false;
        }

        // Steps 2-3: parity update, skipped entirely if parity is already
        // dead (it is not consulted for reads from surviving data devices).
        let parity = addr.parity_device as usize;
        if self.alive[parity] {
            let mut old_parity = [0u8; SECTOR_SIZE];
            if self.devices[parity].read(addr.row, &mut old_parity) == 1 {
                let mut new_parity = old_parity;
                xor_sector(&mut new_parity, &old_data);
                xor_sector(&mut new_parity, new_data);

                if self.devices[parity].write(addr.row, &new_parity) != 1 {
                    self.fail_device(parity);
                }
            } else {
                self.fail_device(parity);
            }

            if self.status == VolumeStatus::Failed {
                return false;
            }
        }

        // Step 4: data write, skipped if the data device is dead (the
        // parity update above already accounts for the new value).
        let data = addr.data_device as usize;
        if self.alive[data] && self.devices[data].write(addr.row, new_data) != 1 {
            self.fail_device(data);
            if self.status == VolumeStatus::Failed {
                return false;
            }
        }

        true
    }

    /// Marks `device` dead and advances the state machine (§4.3): the first
    /// failure on an `Ok` array degrades it; a failure on an already
    /// `Degraded` array fails it outright.
    pub(crate) fn fail_device(&mut self, device: usize) {
        let was_ok = self.status == VolumeStatus::Ok;
        self.alive[device] = false;
        self.status = if was_ok {
            VolumeStatus::Degraded
        } else {
            VolumeStatus::Failed
        };

        log::warn!("device {device} failed; volume is now {:?}", self.status);
    }

    /// Reconstructs the sector at `(target_device, row)` by XOR-ing the
    /// corresponding sector off every other live device (§4.4). A dead peer
    /// encountered along the way is a second fault: the array fails and the
    /// call returns `false`.
    pub(crate) fn reconstruct(&mut self, target_device: u8, row: u64, dest: &mut [u8]) -> bool {
        dest.fill(0);

        let mut scratch = [0u8; SECTOR_SIZE];
        for peer in 0..self.geometry.device_count() {
            if peer == target_device {
                continue;
            }

            let peer_index = peer as usize;
            if !self.alive[peer_index] {
                self.status = VolumeStatus::Failed;
                log::error!("reconstruction of device {target_device} row {row} failed: device {peer_index} is also dead");
                return false;
            }

            if self.devices[peer_index].read(row, &mut scratch) != 1 {
                self.fail_device(peer_index);
                return false;
            }

            xor_sector(dest, &scratch);
        }

        true
    }
}
