//! Errors the core reports as distinct values, as opposed to in-band device
//! faults, which are always absorbed into [`crate::VolumeStatus`]
//! transitions instead (see the propagation policy in the design doc).

use thiserror::Error as ThisError;

/// Errors `volman` can return directly.
///
/// These only ever arise at points the design explicitly carves out as not
/// being in-band device faults: bad geometry at creation time, and a device
/// rejecting the initial service-record write. Every other failure mode
/// (a device going short mid-read or mid-write, a second device failing
/// while the array is already degraded) is reported through
/// [`crate::VolumeStatus`] and a boolean return, never through this enum.
#[derive(ThisError, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The device count or sector count falls outside the supported range,
    /// or the number of devices supplied does not match the geometry.
    #[error(
        "invalid geometry: {device_count} devices, {sector_count} sectors/device \
         (expected 3..=16 devices and 2048..=2097152 sectors/device)"
    )]
    InvalidGeometry {
        /// The device count that was rejected.
        device_count: u8,
        /// The sector count that was rejected.
        sector_count: u64,
    },

    /// A device reported a short write while committing a service record.
    #[error("a device reported a short write while committing the service record")]
    DeviceWrite,
}
