//! The service-record codec and the plurality vote used to elect the
//! authoritative generation counter at assembly time. Everything here is
//! pure, with no [`crate::BlockDevice`] calls, so it is unit-tested directly;
//! [`crate::Volume::start`] drives the device I/O around it.

use crate::SECTOR_SIZE;

const GENERATION_OFFSET: usize = 0;
const GENERATION_WIDTH: usize = 4;

/// Builds a full 512-byte service-record sector carrying `generation` as a
/// little-endian u32 at offset 0, with the remaining bytes zeroed.
#[must_use]
pub fn encode_generation(generation: u32) -> [u8; SECTOR_SIZE] {
    let mut record = [0u8; SECTOR_SIZE];
    record[GENERATION_OFFSET..GENERATION_OFFSET + GENERATION_WIDTH]
        .copy_from_slice(&generation.to_le_bytes());
    record
}

/// Reads the generation counter back out of a service-record sector.
///
/// # Panics
///
/// Panics if `record` is shorter than [`crate::SECTOR_SIZE`]; callers always
/// pass a full sector buffer.
#[must_use]
pub fn decode_generation(record: &[u8]) -> u32 {
    let mut bytes = [0u8; GENERATION_WIDTH];
    bytes.copy_from_slice(&record[GENERATION_OFFSET..GENERATION_OFFSET + GENERATION_WIDTH]);
    u32::from_le_bytes(bytes)
}

/// Elects the authoritative generation counter by plurality vote across the
/// service-record readings from each device.
///
/// `None` stands for a device whose service-record read failed outright and
/// so contributes no vote. Ties are broken by first occurrence among the
/// readings, matching the distilled design's assembly rule.
///
/// Returns `0` if every reading is `None` (every device failed to produce a
/// reading); callers then see every device mismatch and the array comes up
/// FAILED, which is the correct outcome for an array with no readable
/// metadata at all.
#[must_use]
pub fn elect(readings: &[Option<u32>]) -> u32 {
    let mut tally: Vec<(u32, usize)> = Vec::new();

    for value in readings.iter().flatten() {
        match tally.iter_mut().find(|(seen, _)| seen == value) {
            Some((_, count)) => *count += 1,
            None => tally.push((*value, 1)),
        }
    }

    let mut best: Option<(u32, usize)> = None;
    for (value, count) in tally {
        let should_replace = match best {
            Some((_, best_count)) => count > best_count,
            None => true,
        };
        if should_replace {
            best = Some((value, count));
        }
    }

    best.map_or(0, |(value, _)| value)
}
