//! Software RAID-5 volume manager core.
//!
//! `volman` maps a logical block device onto `D` (3..=16) equal-sized
//! physical devices with rotating parity, tolerates the loss of any single
//! device while running, and tracks enough per-device metadata to tell a
//! stale (previously replaced) device apart from an up-to-date peer when the
//! array is reassembled after a restart.
//!
//! The crate deliberately knows nothing about *how* a sector gets to disk;
//! see [`BlockDevice`]. That lets it be exercised against an in-memory or
//! file-backed simulation (the `volman-sim` crate) exactly the way it would
//! be exercised against real hardware.

pub mod device;
pub mod error;
pub mod geometry;
mod io_engine;
pub mod metadata;
mod resync;
pub mod state;
pub mod volume;

pub use device::BlockDevice;
pub use error::Error;
pub use geometry::{Geometry, SectorAddress};
pub use state::VolumeStatus;
pub use volume::Volume;

/// Sector size in bytes. Fixed by the design; every `BlockDevice` call moves
/// whole multiples of this many bytes.
pub const SECTOR_SIZE: usize = 512;

/// Minimum number of devices a valid [`Geometry`] may name.
pub const MIN_DEVICES: u8 = 3;

/// Maximum number of devices a valid [`Geometry`] may name. Also the fixed
/// size of `Volume`'s in-memory `alive` table, which is kept stack-allocated
/// rather than growing a `Vec<bool>` per instance.
pub const MAX_DEVICES: usize = 16;

/// Minimum sectors per device a valid [`Geometry`] may name.
pub const MIN_SECTORS: u64 = 2048;

/// Maximum sectors per device a valid [`Geometry`] may name (2 * 2^20).
pub const MAX_SECTORS: u64 = 2 * 1024 * 1024;
