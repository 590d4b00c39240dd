use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::fs::FileExt;
use std::path::Path;

use volman::BlockDevice;

use crate::FaultInjector;

/// A file-backed simulated block device.
///
/// Sector `n` lives at byte offset `n * sector_size` in the underlying file,
/// read and written with positioned I/O (`pread`/`pwrite`) so concurrent
/// seeks on the same file descriptor are never an issue. Unlike
/// [`crate::MemBlockDevice`], a `FileBlockDevice` can be dropped, reopened
/// from the same path, and still hand back what was last written, which is
/// what lets the `create -> start -> stop -> start` round trip be tested
/// across genuinely separate process-level device instances rather than
/// just across method calls on one.
#[derive(Debug)]
pub struct FileBlockDevice {
    file: File,
    sector_size: usize,
    sector_count: u64,
    fault: FaultInjector,
}

impl FileBlockDevice {
    /// Creates (or truncates and zero-fills) a file at `path` sized to hold
    /// `sector_count` sectors of `sector_size` bytes.
    ///
    /// # Errors
    ///
    /// Returns any [`io::Error`] from opening, truncating, or zero-filling
    /// the file.
    pub fn create(path: impl AsRef<Path>, sector_count: u64, sector_size: usize) -> io::Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;

        let total_bytes = sector_count * sector_size as u64;
        file.set_len(total_bytes)?;

        Ok(Self {
            file,
            sector_size,
            sector_count,
            fault: FaultInjector::healthy(),
        })
    }

    /// Opens an existing file-backed device, inferring `sector_count` from
    /// the file's current length.
    ///
    /// # Errors
    ///
    /// Returns any [`io::Error`] from opening or stat-ing the file.
    pub fn open(path: impl AsRef<Path>, sector_size: usize) -> io::Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        let sector_count = file.metadata()?.len() / sector_size as u64;

        Ok(Self {
            file,
            sector_size,
            sector_count,
            fault: FaultInjector::healthy(),
        })
    }

    /// Mutable access to this device's fault injector.
    pub fn fault_mut(&mut self) -> &mut FaultInjector {
        &mut self.fault
    }
}

impl BlockDevice for FileBlockDevice {
    fn sector_size(&self) -> usize {
        self.sector_size
    }

    fn sector_count(&self) -> u64 {
        self.sector_count
    }

    fn read(&mut self, first_sector: u64, buf: &mut [u8]) -> usize {
        let sectors = buf.len() / self.sector_size;
        if !self.fault.poll() || first_sector + sectors as u64 > self.sector_count {
            return 0;
        }

        let offset = first_sector * self.sector_size as u64;
        match self.file.read_exact_at(buf, offset) {
            Ok(()) => sectors,
            Err(error) => {
                log::warn!("file-backed device read at sector {first_sector} failed: {error}");
                0
            }
        }
    }

    fn write(&mut self, first_sector: u64, buf: &[u8]) -> usize {
        let sectors = buf.len() / self.sector_size;
        if !self.fault.poll() || first_sector + sectors as u64 > self.sector_count {
            return 0;
        }

        let offset = first_sector * self.sector_size as u64;
        match self.file.write_all_at(buf, offset) {
            Ok(()) => sectors,
            Err(error) => {
                log::warn!("file-backed device write at sector {first_sector} failed: {error}");
                0
            }
        }
    }
}
