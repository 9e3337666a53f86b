use mscprobe::sector::{
    cluster_heap_offset, probe_cluster_heap, read_sector, CLUSTER_HEAP_OFFSET_FIELD, SECTOR_SIZE,
};
use std::io::Write;
use tempfile::NamedTempFile;

fn fake_device(contents: &[u8]) -> NamedTempFile {
    let mut temp = NamedTempFile::new().unwrap();
    temp.write_all(contents).unwrap();
    temp.flush().unwrap();
    temp
}

#[test]
fn test_read_sector_seeks_to_lba_times_sector_size() {
    // 16 sectors of 4 bytes, each filled with its own index
    let mut data = Vec::new();
    for i in 0u8..16 {
        data.extend_from_slice(&[i; 4]);
    }
    let temp = fake_device(&data);

    let sector = read_sector(temp.path(), 2, 4).unwrap();
    assert_eq!(sector, vec![2, 2, 2, 2]);

    let sector = read_sector(temp.path(), 15, 4).unwrap();
    assert_eq!(sector, vec![15, 15, 15, 15]);
}

#[test]
fn test_read_sector_short_read_at_end_of_medium() {
    let temp = fake_device(&[0xAA; 5]);

    let sector = read_sector(temp.path(), 0, SECTOR_SIZE).unwrap();
    assert_eq!(sector.len(), 5);
    assert_eq!(sector, vec![0xAA; 5]);
}

#[test]
fn test_read_sector_past_end_is_empty_not_error() {
    let temp = fake_device(&[0xAA; SECTOR_SIZE]);

    let sector = read_sector(temp.path(), 10, SECTOR_SIZE).unwrap();
    assert!(sector.is_empty());
}

#[test]
fn test_read_sector_never_over_reads() {
    let temp = fake_device(&[0xBB; SECTOR_SIZE * 4]);

    let sector = read_sector(temp.path(), 1, SECTOR_SIZE).unwrap();
    assert_eq!(sector.len(), SECTOR_SIZE);
}

#[test]
fn test_probe_round_trip_through_derived_read() {
    // Synthetic exFAT-ish volume: heap LBA 4, marker bytes in that sector.
    let heap_lba = 4u32;
    let mut volume = vec![0u8; SECTOR_SIZE * 5];
    volume[CLUSTER_HEAP_OFFSET_FIELD..CLUSTER_HEAP_OFFSET_FIELD + 4]
        .copy_from_slice(&heap_lba.to_le_bytes());
    let heap_start = heap_lba as usize * SECTOR_SIZE;
    volume[heap_start..heap_start + 4].copy_from_slice(b"HEAP");
    let temp = fake_device(&volume);

    let probe = probe_cluster_heap(temp.path()).unwrap();
    assert_eq!(probe.heap_lba, heap_lba);
    assert_eq!(probe.boot_bytes, SECTOR_SIZE);
    assert_eq!(probe.heap_bytes, SECTOR_SIZE);

    let heap_sector = read_sector(temp.path(), probe.heap_lba as u64, SECTOR_SIZE).unwrap();
    assert_eq!(&heap_sector[..4], b"HEAP");
}

#[test]
fn test_probe_decode_matches_known_byte_pattern() {
    let mut boot = vec![0u8; SECTOR_SIZE];
    boot[88..92].copy_from_slice(&[0x00, 0x08, 0x00, 0x00]);
    assert_eq!(cluster_heap_offset(&boot), Some(2048));
}
