//! Raw sector-level reads against a block device node.
//!
//! Reads are positional and sector-granular: byte offset = LBA * sector
//! size. The device is opened read-only per call and closed on return, so
//! no handle ever spans two reads. A short read (device yanked, end of
//! medium) comes back as a shorter buffer for the caller to inspect, not
//! as an error.

use crate::error::DeviceError;
use std::fs::OpenOptions;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

/// Logical block size of the target MSC devices.
pub const SECTOR_SIZE: usize = 512;

/// Byte offset of the ClusterHeapOffset field in an exFAT boot sector.
pub const CLUSTER_HEAP_OFFSET_FIELD: usize = 88;

/// Reads up to `sector_size` bytes at the given LBA.
///
/// Loops over partial reads until the buffer is full or the device reports
/// end-of-medium, so the result is short only when the device genuinely had
/// fewer bytes to give.
pub fn read_sector(
    device: impl AsRef<Path>,
    lba: u64,
    sector_size: usize,
) -> io::Result<Vec<u8>> {
    let mut file = OpenOptions::new().read(true).open(device.as_ref())?;
    file.seek(SeekFrom::Start(lba * sector_size as u64))?;

    let mut buf = vec![0u8; sector_size];
    let mut filled = 0;

    while filled < buf.len() {
        match file.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }

    buf.truncate(filled);
    Ok(buf)
}

/// Decodes the ClusterHeapOffset LBA from a boot sector.
///
/// Reads the little-endian u32 at byte offset 88. This is the exFAT layout;
/// no signature check is performed, so on a volume that is not actually
/// exFAT the result is garbage the caller will chase. `None` only when the
/// buffer is too short to contain the field.
pub fn cluster_heap_offset(boot_sector: &[u8]) -> Option<u32> {
    let field = boot_sector.get(CLUSTER_HEAP_OFFSET_FIELD..CLUSTER_HEAP_OFFSET_FIELD + 4)?;
    Some(u32::from_le_bytes(field.try_into().ok()?))
}

/// Result of the boot-sector probe: the decoded heap LBA and how many bytes
/// each of the two reads actually returned.
#[derive(Debug, Clone, Copy)]
pub struct ClusterHeapProbe {
    pub heap_lba: u32,
    pub boot_bytes: usize,
    pub heap_bytes: usize,
}

/// Reads the boot sector, decodes the ClusterHeapOffset, then reads the
/// sector at that derived LBA.
///
/// The two reads are independent opens; if the device disappears between
/// them the second read fails on its own. The decoded offset is not bounds
/// checked against device capacity.
pub fn probe_cluster_heap(device: impl AsRef<Path>) -> Result<ClusterHeapProbe, DeviceError> {
    let device = device.as_ref();

    let boot = read_sector(device, 0, SECTOR_SIZE)?;
    let heap_lba =
        cluster_heap_offset(&boot).ok_or(DeviceError::TruncatedBootSector(boot.len()))?;

    let heap = read_sector(device, heap_lba as u64, SECTOR_SIZE)?;

    Ok(ClusterHeapProbe {
        heap_lba,
        boot_bytes: boot.len(),
        heap_bytes: heap.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cluster_heap_offset_le_decode() {
        let mut boot = vec![0u8; SECTOR_SIZE];
        boot[88..92].copy_from_slice(&[0x00, 0x08, 0x00, 0x00]);
        assert_eq!(cluster_heap_offset(&boot), Some(2048));
    }

    #[test]
    fn test_cluster_heap_offset_truncated_buffer() {
        assert_eq!(cluster_heap_offset(&[0u8; 91]), None);
        assert_eq!(cluster_heap_offset(&[]), None);
    }

    #[test]
    fn test_cluster_heap_offset_exact_length() {
        let mut boot = vec![0u8; 92];
        boot[88..92].copy_from_slice(&[0xFF, 0xFF, 0xFF, 0xFF]);
        assert_eq!(cluster_heap_offset(&boot), Some(u32::MAX));
    }
}
