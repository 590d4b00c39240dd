//! The `Volume` type: owns the device set and array state, and implements
//! the lifecycle operations (`create`, `start`, `stop`). The I/O engine
//! (`read`/`write`) and the resync engine live in sibling modules as
//! further `impl` blocks on this same type, matching the distilled design's
//! component split while keeping one coherent public type.

use crate::device::BlockDevice;
use crate::error::Error;
use crate::geometry::Geometry;
use crate::metadata;
use crate::state::VolumeStatus;
use crate::{MAX_DEVICES, SECTOR_SIZE};

/// An assembled RAID-5 array over `D` devices of type `Dev`.
///
/// A `Volume` only exists between a successful [`Volume::start`] and a call
/// to [`Volume::stop`]; `stop` consumes `self`, so there is no way to invoke
/// an operation on a stopped volume. The distilled design's "operation on a
/// stopped volume fails immediately" error kind is a compile error here
/// instead of a runtime check.
pub struct Volume<Dev: BlockDevice> {
    pub(crate) devices: Vec<Dev>,
    pub(crate) geometry: Geometry,
    pub(crate) generation: u32,
    pub(crate) alive: [bool; MAX_DEVICES],
    pub(crate) status: VolumeStatus,
}

impl<Dev: BlockDevice> Volume<Dev> {
    /// One-shot initialization of a fresh set of devices: writes an initial
    /// service record (generation 1) to every device. Must be called before
    /// the first [`Volume::start`]; underlying data sectors are assumed to
    /// already be zero, which trivially satisfies the parity invariant.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidGeometry`] if `devices.len()` does not match
    /// `geometry.device_count()`, or [`Error::DeviceWrite`] if any device
    /// reports a short write while committing the service record.
    pub fn create(devices: &mut [Dev], geometry: Geometry) -> Result<(), Error> {
        if devices.len() != geometry.device_count() as usize {
            return Err(Error::InvalidGeometry {
                device_count: devices.len() as u8,
                sector_count: geometry.sectors_per_device(),
            });
        }

        let record = metadata::encode_generation(1);
        for (index, device) in devices.iter_mut().enumerate() {
            let transferred = device.write(geometry.service_record_sector(), &record);
            if transferred != 1 {
                log::error!("create failed: device {index} rejected the initial service record");
                return Err(Error::DeviceWrite);
            }
        }

        log::info!(
            "created volume: {} devices x {} sectors/device, generation=1",
            geometry.device_count(),
            geometry.sectors_per_device()
        );

        Ok(())
    }

    /// Assembles the volume: reads every device's service record, elects the
    /// authoritative generation by plurality vote, and marks any device that
    /// disagrees dead. Resulting status is `Ok`, `Degraded`, or `Failed`
    /// depending on how many devices disagreed (§4.3).
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidGeometry`] if `devices.len()` does not match
    /// `geometry.device_count()`.
    pub fn start(devices: Vec<Dev>, geometry: Geometry) -> Result<Self, Error> {
        if devices.len() != geometry.device_count() as usize {
            return Err(Error::InvalidGeometry {
                device_count: devices.len() as u8,
                sector_count: geometry.sectors_per_device(),
            });
        }

        let mut devices = devices;
        let mut readings = Vec::with_capacity(devices.len());
        for device in devices.iter_mut() {
            let mut record = [0u8; SECTOR_SIZE];
            let transferred = device.read(geometry.service_record_sector(), &mut record);
            readings.push(if transferred == 1 {
                Some(metadata::decode_generation(&record))
            } else {
                None
            });
        }

        let generation = metadata::elect(&readings);

        let mut alive = [false; MAX_DEVICES];
        let mut mismatched = 0usize;
        for (index, reading) in readings.iter().enumerate() {
            let agrees = *reading == Some(generation);
            alive[index] = agrees;
            if !agrees {
                mismatched += 1;
                log::warn!(
                    "device {index} disagrees at assembly (read {reading:?}, elected generation {generation})"
                );
            }
        }

        let status = VolumeStatus::from_mismatch_count(mismatched);
        log::info!(
            "volume assembled: generation={generation}, mismatched={mismatched}, status={status:?}"
        );

        Ok(Self {
            devices,
            geometry,
            generation,
            alive,
            status,
        })
    }

    /// Persists the next generation counter to every currently-live device
    /// and hands the devices back to the caller. Write failures here are
    /// tolerated silently; per the distilled design, a device that rejects
    /// the commit simply loses the next plurality vote rather than aborting
    /// the shutdown.
    #[must_use]
    pub fn stop(mut self) -> (Vec<Dev>, VolumeStatus) {
        let next_generation = self.generation.wrapping_add(1);
        let record = metadata::encode_generation(next_generation);

        for (index, device) in self.devices.iter_mut().enumerate() {
            if self.alive[index] {
                let transferred = device.write(self.geometry.service_record_sector(), &record);
                if transferred != 1 {
                    log::warn!(
                        "device {index} rejected the generation commit on stop; \
                         it will lose the next assembly's plurality vote"
                    );
                }
            }
        }

        self.generation = next_generation;
        self.status = VolumeStatus::Stopped;

        (self.devices, VolumeStatus::Stopped)
    }

    /// The current array status.
    #[must_use]
    pub const fn status(&self) -> VolumeStatus {
        self.status
    }

    /// Logical capacity in sectors: `(D - 1) * (S - 2)`.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.geometry.capacity()
    }

    /// The geometry this volume was assembled with.
    #[must_use]
    pub const fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    /// Whether device `index` is currently considered alive. Mainly useful
    /// to tests and to `volctl`'s `status` command.
    #[must_use]
    pub fn is_alive(&self, index: usize) -> bool {
        index < self.geometry.device_count() as usize && self.alive[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct StubDevice {
        sectors: Vec<[u8; SECTOR_SIZE]>,
        fail: bool,
    }

    impl StubDevice {
        fn zeroed(count: u64) -> Self {
            Self {
                sectors: vec![[0u8; SECTOR_SIZE]; count as usize],
                fail: false,
            }
        }
    }

    impl BlockDevice for StubDevice {
        fn sector_size(&self) -> usize {
            SECTOR_SIZE
        }

        fn sector_count(&self) -> u64 {
            self.sectors.len() as u64
        }

        fn read(&mut self, first_sector: u64, buf: &mut [u8]) -> usize {
            if self.fail {
                return 0;
            }
            buf.copy_from_slice(&self.sectors[first_sector as usize]);
            1
        }

        fn write(&mut self, first_sector: u64, buf: &[u8]) -> usize {
            if self.fail {
                return 0;
            }
            self.sectors[first_sector as usize].copy_from_slice(buf);
            1
        }
    }

    fn fresh_devices(geometry: Geometry) -> Vec<StubDevice> {
        (0..geometry.device_count())
            .map(|_| StubDevice::zeroed(geometry.sectors_per_device()))
            .collect()
    }

    #[test]
    fn create_then_start_is_ok() {
        let geometry = Geometry::new(3, 2048).unwrap();
        let mut devices = fresh_devices(geometry);
        Volume::create(&mut devices, geometry).unwrap();

        let volume = Volume::start(devices, geometry).unwrap();
        assert_eq!(volume.status(), VolumeStatus::Ok);
        assert_eq!(volume.size(), 2 * 2046);
    }

    #[test]
    fn create_rejects_device_count_mismatch() {
        let geometry = Geometry::new(3, 2048).unwrap();
        let mut devices = fresh_devices(geometry);
        devices.pop();

        assert!(Volume::create(&mut devices, geometry).is_err());
    }

    #[test]
    fn start_stop_start_round_trips_to_ok() {
        let geometry = Geometry::new(3, 2048).unwrap();
        let mut devices = fresh_devices(geometry);
        Volume::create(&mut devices, geometry).unwrap();

        let volume = Volume::start(devices, geometry).unwrap();
        let (devices, stopped_status) = volume.stop();
        assert_eq!(stopped_status, VolumeStatus::Stopped);

        let volume = Volume::start(devices, geometry).unwrap();
        assert_eq!(volume.status(), VolumeStatus::Ok);
    }

    #[test]
    fn replaced_device_comes_up_degraded() {
        let geometry = Geometry::new(3, 2048).unwrap();
        let mut devices = fresh_devices(geometry);
        Volume::create(&mut devices, geometry).unwrap();

        let volume = Volume::start(devices, geometry).unwrap();
        let (mut devices, _) = volume.stop();

        // Device 0 is replaced off-line with a freshly zeroed device: its
        // service record reads back as generation 0, the rest as 2.
        devices[0] = StubDevice::zeroed(geometry.sectors_per_device());

        let volume = Volume::start(devices, geometry).unwrap();
        assert_eq!(volume.status(), VolumeStatus::Degraded);
        assert!(!volume.is_alive(0));
        assert!(volume.is_alive(1));
        assert!(volume.is_alive(2));
    }
}
