//! The block-I/O contract the core consumes from its host.

/// A single physical block device, addressed by sector.
///
/// This is the Rust expression of the distilled design's "capability object
/// carrying two function pointers" (§9): the core never assumes anything
/// about a device beyond this trait, so it can run unmodified against real
/// hardware, a file, or an in-memory buffer.
///
/// # Contract
///
/// * `read`/`write` operate on whole sectors; `buf.len()` must be a multiple
///   of [`sector_size`](Self::sector_size). The return value is the number
///   of whole sectors actually transferred, not a byte count.
/// * A return value less than `buf.len() / sector_size()` means the device
///   has failed for this call. The core treats *any* short transfer as a
///   device failure; it never retries.
/// * `first_sector` is always `< sector_count()` for calls the core makes,
///   though an implementation is free to also fail out-of-range calls.
pub trait BlockDevice {
    /// Sector size in bytes. `volman` only ever constructs devices with
    /// `sector_size() == volman::SECTOR_SIZE`, but the trait does not bake
    /// that assumption in.
    fn sector_size(&self) -> usize;

    /// Total number of addressable sectors on this device.
    fn sector_count(&self) -> u64;

    /// Reads consecutive sectors starting at `first_sector` into `buf`.
    ///
    /// Returns the number of whole sectors transferred before any failure.
    fn read(&mut self, first_sector: u64, buf: &mut [u8]) -> usize;

    /// Writes consecutive sectors starting at `first_sector` from `buf`.
    ///
    /// Returns the number of whole sectors transferred before any failure.
    fn write(&mut self, first_sector: u64, buf: &[u8]) -> usize;
}

/// XORs `src` into `dest` byte-by-byte. Both buffers must be one sector
/// long; used wherever the I/O and resync engines fold a peer's sector into
/// a reconstruction in progress.
pub(crate) fn xor_sector(dest: &mut [u8], src: &[u8]) {
    for (d, s) in dest.iter_mut().zip(src.iter()) {
        *d ^= s;
    }
}
